use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::auth::AccessTokens;
use crate::workflows::applications::domain::{
    Actor, ActorRole, ApplicationId, ApplicationSubmission, Job, JobDraft, JobId, JobType,
    StatusChangeRequest, StatusEntry,
};
use crate::workflows::applications::repository::{
    ApplicationRecord, ApplicationRepository, JobRepository, RepositoryError,
};
use crate::workflows::applications::{ApplicationRegistry, ApplicationStatus, InMemoryStore};
use crate::workflows::bot_mimic::{AutoProcessScheduler, BotMimicProcessor};

pub(super) const TIMEOUT: Duration = Duration::from_secs(1);

pub(super) const BOT_TOKEN: &str = "bot-token";
pub(super) const ADMIN_TOKEN: &str = "admin-token";

pub(super) fn admin() -> Actor {
    Actor::new("admin-1", "Ops Admin", ActorRole::Admin)
}

pub(super) fn applicant() -> Actor {
    Actor::new("user-7", "Grace Hopper", ActorRole::Applicant)
}

pub(super) fn tokens() -> AccessTokens {
    AccessTokens::new()
        .with_token(BOT_TOKEN, Actor::bot_mimic())
        .with_token(ADMIN_TOKEN, admin())
}

/// Shared store plus a registry used to seed jobs and applications.
pub(super) struct Fixture {
    pub(super) store: Arc<InMemoryStore>,
    pub(super) registry: ApplicationRegistry<InMemoryStore, InMemoryStore>,
}

impl Fixture {
    pub(super) fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let registry = ApplicationRegistry::new(store.clone(), store.clone(), TIMEOUT);
        Self { store, registry }
    }

    pub(super) fn processor(&self) -> BotMimicProcessor<InMemoryStore, InMemoryStore> {
        BotMimicProcessor::new(self.store.clone(), self.store.clone(), TIMEOUT)
    }

    pub(super) fn scheduler(
        &self,
        default_interval_minutes: u32,
    ) -> Arc<AutoProcessScheduler<InMemoryStore, InMemoryStore>> {
        Arc::new(AutoProcessScheduler::new(
            Arc::new(self.processor()),
            default_interval_minutes,
        ))
    }

    pub(super) async fn job(&self, job_type: JobType) -> Job {
        self.registry
            .create_job(
                &admin(),
                JobDraft {
                    title: "Site Reliability Engineer".to_string(),
                    company: "Northwind".to_string(),
                    job_type,
                },
            )
            .await
            .expect("job created")
    }

    pub(super) async fn application(&self, job: &Job) -> ApplicationRecord {
        self.registry
            .submit(
                &applicant(),
                ApplicationSubmission {
                    job_id: job.id.clone(),
                    answers: Vec::new(),
                    resume: None,
                    expected_salary: Some(110_000),
                },
            )
            .await
            .expect("application submitted")
    }

    pub(super) async fn withdraw(&self, id: &ApplicationId) -> ApplicationRecord {
        self.registry
            .change_status(
                &applicant(),
                id,
                StatusChangeRequest {
                    status: ApplicationStatus::Withdrawn,
                    comment: None,
                },
            )
            .await
            .expect("withdrawal succeeds")
    }

    pub(super) async fn current(&self, id: &ApplicationId) -> ApplicationRecord {
        self.registry.get(id).await.expect("record present")
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// Reads a snapshot, then yields before handing it back so concurrent passes interleave.
pub(super) struct YieldingStore {
    pub(super) inner: Arc<InMemoryStore>,
}

#[async_trait]
impl JobRepository for YieldingStore {
    async fn insert(&self, job: Job) -> Result<Job, RepositoryError> {
        JobRepository::insert(self.inner.as_ref(), job).await
    }

    async fn fetch(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        JobRepository::fetch(self.inner.as_ref(), id).await
    }

    async fn list(&self) -> Result<Vec<Job>, RepositoryError> {
        JobRepository::list(self.inner.as_ref()).await
    }
}

#[async_trait]
impl ApplicationRepository for YieldingStore {
    async fn insert(
        &self,
        record: ApplicationRecord,
    ) -> Result<ApplicationRecord, RepositoryError> {
        ApplicationRepository::insert(self.inner.as_ref(), record).await
    }

    async fn fetch(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let snapshot = ApplicationRepository::fetch(self.inner.as_ref(), id).await;
        tokio::task::yield_now().await;
        snapshot
    }

    async fn list(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        ApplicationRepository::list(self.inner.as_ref()).await
    }

    async fn append_status(
        &self,
        id: &ApplicationId,
        expected_version: u64,
        entry: StatusEntry,
    ) -> Result<ApplicationRecord, RepositoryError> {
        self.inner.append_status(id, expected_version, entry).await
    }
}

/// Reports a version mismatch on the first append without touching the record.
pub(super) struct FlakyStore {
    pub(super) inner: Arc<InMemoryStore>,
    pub(super) tripped: AtomicBool,
}

impl FlakyStore {
    pub(super) fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            tripped: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ApplicationRepository for FlakyStore {
    async fn insert(
        &self,
        record: ApplicationRecord,
    ) -> Result<ApplicationRecord, RepositoryError> {
        ApplicationRepository::insert(self.inner.as_ref(), record).await
    }

    async fn fetch(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        ApplicationRepository::fetch(self.inner.as_ref(), id).await
    }

    async fn list(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        ApplicationRepository::list(self.inner.as_ref()).await
    }

    async fn append_status(
        &self,
        id: &ApplicationId,
        expected_version: u64,
        entry: StatusEntry,
    ) -> Result<ApplicationRecord, RepositoryError> {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            return Err(RepositoryError::VersionMismatch {
                expected: expected_version,
                actual: expected_version + 1,
            });
        }
        self.inner.append_status(id, expected_version, entry).await
    }
}

/// Every read takes longer than any sensible persistence timeout.
pub(super) struct SlowStore {
    pub(super) inner: Arc<InMemoryStore>,
    pub(super) delay: Duration,
}

#[async_trait]
impl ApplicationRepository for SlowStore {
    async fn insert(
        &self,
        record: ApplicationRecord,
    ) -> Result<ApplicationRecord, RepositoryError> {
        ApplicationRepository::insert(self.inner.as_ref(), record).await
    }

    async fn fetch(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        tokio::time::sleep(self.delay).await;
        ApplicationRepository::fetch(self.inner.as_ref(), id).await
    }

    async fn list(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        tokio::time::sleep(self.delay).await;
        ApplicationRepository::list(self.inner.as_ref()).await
    }

    async fn append_status(
        &self,
        id: &ApplicationId,
        expected_version: u64,
        entry: StatusEntry,
    ) -> Result<ApplicationRecord, RepositoryError> {
        self.inner.append_status(id, expected_version, entry).await
    }
}

/// Every status write takes `delay`; tracks how many writes overlap.
pub(super) struct SlowWriteStore {
    pub(super) inner: Arc<InMemoryStore>,
    pub(super) delay: Duration,
    active: AtomicUsize,
    pub(super) peak: AtomicUsize,
}

impl SlowWriteStore {
    pub(super) fn new(inner: Arc<InMemoryStore>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ApplicationRepository for SlowWriteStore {
    async fn insert(
        &self,
        record: ApplicationRecord,
    ) -> Result<ApplicationRecord, RepositoryError> {
        ApplicationRepository::insert(self.inner.as_ref(), record).await
    }

    async fn fetch(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        ApplicationRepository::fetch(self.inner.as_ref(), id).await
    }

    async fn list(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        ApplicationRepository::list(self.inner.as_ref()).await
    }

    async fn append_status(
        &self,
        id: &ApplicationId,
        expected_version: u64,
        entry: StatusEntry,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let result = self.inner.append_status(id, expected_version, entry).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
