use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use super::domain::{
    Actor, ActorRole, ApplicationId, ApplicationStatus, ApplicationSubmission, Job, JobDraft,
    JobId, StatusChangeRequest, StatusEntry,
};
use super::repository::{
    bounded, ApplicationRecord, ApplicationRepository, JobRepository, RepositoryError,
};

/// Service fronting job postings, submissions, and manual status changes.
pub struct ApplicationRegistry<R, J> {
    applications: Arc<R>,
    jobs: Arc<J>,
    timeout: Duration,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static JOB_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

fn next_job_id() -> JobId {
    let id = JOB_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    JobId(format!("job-{id:04}"))
}

impl<R, J> ApplicationRegistry<R, J>
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    pub fn new(applications: Arc<R>, jobs: Arc<J>, timeout: Duration) -> Self {
        Self {
            applications,
            jobs,
            timeout,
        }
    }

    /// Publish a new job posting. Admin only.
    pub async fn create_job(&self, actor: &Actor, draft: JobDraft) -> Result<Job, RegistryError> {
        if actor.role != ActorRole::Admin {
            return Err(RegistryError::Forbidden {
                role: actor.role,
                action: "create jobs",
            });
        }

        let title = draft.title.trim();
        if title.is_empty() {
            return Err(RegistryError::InvalidInput(
                "job title must not be empty".to_string(),
            ));
        }

        let job = Job {
            id: next_job_id(),
            title: title.to_string(),
            company: draft.company.trim().to_string(),
            job_type: draft.job_type,
            created_at: Utc::now(),
        };

        let stored = bounded(self.timeout, self.jobs.insert(job)).await?;
        info!(job_id = %stored.id, job_type = stored.job_type.label(), "job posted");
        Ok(stored)
    }

    pub async fn list_jobs(&self) -> Result<Vec<Job>, RegistryError> {
        Ok(bounded(self.timeout, self.jobs.list()).await?)
    }

    /// Submit a new application; it starts as `submitted` with a single history entry.
    pub async fn submit(
        &self,
        actor: &Actor,
        submission: ApplicationSubmission,
    ) -> Result<ApplicationRecord, RegistryError> {
        if actor.role == ActorRole::Bot {
            return Err(RegistryError::Forbidden {
                role: actor.role,
                action: "submit applications",
            });
        }

        let job = bounded(self.timeout, self.jobs.fetch(&submission.job_id))
            .await?
            .ok_or_else(|| RegistryError::JobNotFound(submission.job_id.clone()))?;

        let record = ApplicationRecord::submitted(next_application_id(), actor, submission);
        let stored = bounded(self.timeout, self.applications.insert(record)).await?;
        info!(application_id = %stored.id, job_id = %job.id, "application submitted");
        Ok(stored)
    }

    pub async fn get(&self, id: &ApplicationId) -> Result<ApplicationRecord, RegistryError> {
        bounded(self.timeout, self.applications.fetch(id))
            .await?
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Apply a manual transition.
    ///
    /// Applicants may withdraw their own application; admins may reject or move an
    /// application one step along the progression. Terminal applications never change.
    pub async fn change_status(
        &self,
        actor: &Actor,
        id: &ApplicationId,
        request: StatusChangeRequest,
    ) -> Result<ApplicationRecord, RegistryError> {
        let record = self.get(id).await?;
        let from = record.status();
        let to = request.status;

        let permitted = match actor.role {
            ActorRole::Applicant => {
                if record.applicant_id != actor.id {
                    return Err(RegistryError::Forbidden {
                        role: actor.role,
                        action: "change another applicant's application",
                    });
                }
                to == ApplicationStatus::Withdrawn
            }
            ActorRole::Admin => to == ApplicationStatus::Rejected || from.next() == Some(to),
            ActorRole::Bot => {
                return Err(RegistryError::Forbidden {
                    role: actor.role,
                    action: "change status manually",
                })
            }
        };

        if from.is_terminal() || !permitted {
            return Err(RegistryError::InvalidTransition { from, to });
        }

        let entry = StatusEntry::new(to, actor.clone(), request.comment);
        let updated = bounded(
            self.timeout,
            self.applications.append_status(id, record.version(), entry),
        )
        .await
        .map_err(|err| match err {
            RepositoryError::VersionMismatch { .. } => RegistryError::Conflict(id.clone()),
            RepositoryError::NotFound => RegistryError::NotFound(id.clone()),
            other => RegistryError::Repository(other),
        })?;

        debug!(application_id = %id, %from, %to, actor = %actor.id, "manual status change");
        Ok(updated)
    }
}

/// Error raised by the application registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("role '{}' may not {action}", role.label())]
    Forbidden {
        role: ActorRole,
        action: &'static str,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("job {0} not found")]
    JobNotFound(JobId),
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("cannot move application from {from} to {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("application {0} was modified concurrently")]
    Conflict(ApplicationId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
