use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Actor, ApplicationId, ApplicationStatus, ApplicationSubmission, Job, JobId, ScreeningAnswer,
    StatusEntry,
};

/// Repository record for one applicant's submission.
///
/// `status` and `status_history` are only changed together through
/// [`ApplicationRecord::record_transition`], so the current status always
/// matches the last history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub applicant_id: String,
    pub answers: Vec<ScreeningAnswer>,
    pub resume: Option<String>,
    pub expected_salary: Option<u32>,
    status: ApplicationStatus,
    status_history: Vec<StatusEntry>,
    version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApplicationRecord {
    pub fn submitted(
        id: ApplicationId,
        applicant: &Actor,
        submission: ApplicationSubmission,
    ) -> Self {
        let entry = StatusEntry::new(
            ApplicationStatus::Submitted,
            applicant.clone(),
            Some("Application submitted".to_string()),
        );
        let created_at = entry.timestamp;

        Self {
            id,
            job_id: submission.job_id,
            applicant_id: applicant.id.clone(),
            answers: submission.answers,
            resume: submission.resume,
            expected_salary: submission.expected_salary,
            status: ApplicationStatus::Submitted,
            status_history: vec![entry],
            version: 1,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn status(&self) -> ApplicationStatus {
        self.status
    }

    pub fn status_history(&self) -> &[StatusEntry] {
        &self.status_history
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Status held before the most recent transition, if any.
    pub fn previous_status(&self) -> Option<ApplicationStatus> {
        let len = self.status_history.len();
        len.checked_sub(2)
            .and_then(|index| self.status_history.get(index))
            .map(|entry| entry.status)
    }

    /// Append a history entry and move the current status with it.
    pub fn record_transition(&mut self, entry: StatusEntry) {
        self.status = entry.status;
        self.updated_at = entry.timestamp;
        self.status_history.push(entry);
        self.version += 1;
    }
}

/// Storage abstraction for job postings.
#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn insert(&self, job: Job) -> Result<Job, RepositoryError>;
    async fn fetch(&self, id: &JobId) -> Result<Option<Job>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Job>, RepositoryError>;
}

/// Storage abstraction for applications.
///
/// Status changes go through `append_status`, which must apply the entry only
/// when the stored version still equals `expected_version` and must persist the
/// status and its history entry together.
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    async fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError>;
    async fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError>;
    async fn list(&self) -> Result<Vec<ApplicationRecord>, RepositoryError>;
    async fn append_status(
        &self,
        id: &ApplicationId,
        expected_version: u64,
        entry: StatusEntry,
    ) -> Result<ApplicationRecord, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record version changed (expected {expected}, found {actual})")]
    VersionMismatch { expected: u64, actual: u64 },
    #[error("repository call timed out after {0:?}")]
    Timeout(Duration),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Run a repository call with an upper bound on how long it may take.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RepositoryError::Timeout(limit)),
    }
}
