use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::auth::AccessTokens;
use crate::workflows::applications::domain::{
    Actor, ActorRole, ApplicationId, ApplicationSubmission, Job, JobDraft, JobId, JobType,
    ScreeningAnswer, StatusEntry,
};
use crate::workflows::applications::repository::{
    ApplicationRecord, ApplicationRepository, JobRepository, RepositoryError,
};
use crate::workflows::applications::{application_router, ApplicationRegistry, InMemoryStore};

pub(super) const TIMEOUT: Duration = Duration::from_secs(1);

pub(super) const ADMIN_TOKEN: &str = "admin-token";
pub(super) const APPLICANT_TOKEN: &str = "applicant-token";
pub(super) const BOT_TOKEN: &str = "bot-token";

pub(super) fn admin() -> Actor {
    Actor::new("admin-1", "Ops Admin", ActorRole::Admin)
}

pub(super) fn applicant() -> Actor {
    Actor::new("user-42", "Ada Lovelace", ActorRole::Applicant)
}

pub(super) fn other_applicant() -> Actor {
    Actor::new("user-43", "Charles Babbage", ActorRole::Applicant)
}

pub(super) fn tokens() -> AccessTokens {
    AccessTokens::new()
        .with_token(ADMIN_TOKEN, admin())
        .with_token(APPLICANT_TOKEN, applicant())
        .with_token(BOT_TOKEN, Actor::bot_mimic())
}

pub(super) fn draft(job_type: JobType) -> JobDraft {
    JobDraft {
        title: "Backend Engineer".to_string(),
        company: "Acme Robotics".to_string(),
        job_type,
    }
}

pub(super) fn submission(job_id: &JobId) -> ApplicationSubmission {
    ApplicationSubmission {
        job_id: job_id.clone(),
        answers: vec![ScreeningAnswer {
            question: "Why this role?".to_string(),
            answer: "I enjoy distributed systems.".to_string(),
        }],
        resume: Some("resumes/ada.pdf".to_string()),
        expected_salary: Some(120_000),
    }
}

pub(super) type MemoryRegistry = ApplicationRegistry<InMemoryStore, InMemoryStore>;

pub(super) fn build_registry() -> (MemoryRegistry, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let registry = ApplicationRegistry::new(store.clone(), store.clone(), TIMEOUT);
    (registry, store)
}

pub(super) async fn seeded_job(registry: &MemoryRegistry, job_type: JobType) -> Job {
    registry
        .create_job(&admin(), draft(job_type))
        .await
        .expect("admin can post jobs")
}

pub(super) fn router_with_registry<R, J>(registry: ApplicationRegistry<R, J>) -> axum::Router
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    application_router(Arc::new(registry), tokens())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) struct UnavailableStore;

#[async_trait]
impl JobRepository for UnavailableStore {
    async fn insert(&self, _job: Job) -> Result<Job, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn fetch(&self, _id: &JobId) -> Result<Option<Job>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn list(&self) -> Result<Vec<Job>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[async_trait]
impl ApplicationRepository for UnavailableStore {
    async fn insert(
        &self,
        _record: ApplicationRecord,
    ) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn fetch(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn list(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn append_status(
        &self,
        _id: &ApplicationId,
        _expected_version: u64,
        _entry: StatusEntry,
    ) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}
