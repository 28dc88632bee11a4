use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::domain::{ApplicationId, Job, JobId, StatusEntry};
use super::repository::{ApplicationRecord, ApplicationRepository, JobRepository, RepositoryError};

/// Process-local store backing both repositories.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    jobs: Arc<Mutex<BTreeMap<JobId, Job>>>,
    applications: Arc<Mutex<BTreeMap<ApplicationId, ApplicationRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn jobs(&self) -> MutexGuard<'_, BTreeMap<JobId, Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn applications(&self) -> MutexGuard<'_, BTreeMap<ApplicationId, ApplicationRecord>> {
        self.applications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl JobRepository for InMemoryStore {
    async fn insert(&self, job: Job) -> Result<Job, RepositoryError> {
        let mut guard = self.jobs();
        if guard.contains_key(&job.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    async fn fetch(&self, id: &JobId) -> Result<Option<Job>, RepositoryError> {
        Ok(self.jobs().get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Job>, RepositoryError> {
        Ok(self.jobs().values().cloned().collect())
    }
}

#[async_trait]
impl ApplicationRepository for InMemoryStore {
    async fn insert(
        &self,
        record: ApplicationRecord,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.applications();
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn fetch(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Ok(self.applications().get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Ok(self.applications().values().cloned().collect())
    }

    async fn append_status(
        &self,
        id: &ApplicationId,
        expected_version: u64,
        entry: StatusEntry,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.applications();
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if record.version() != expected_version {
            return Err(RepositoryError::VersionMismatch {
                expected: expected_version,
                actual: record.version(),
            });
        }
        record.record_transition(entry);
        Ok(record.clone())
    }
}
