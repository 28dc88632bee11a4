use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::activity::{self, ActivityEntry, BotMimicStats};
use crate::workflows::applications::domain::{
    Actor, ApplicationId, ApplicationStatus, Job, JobId, JobType, StatusEntry,
};
use crate::workflows::applications::repository::{
    bounded, ApplicationRecord, ApplicationRepository, JobRepository, RepositoryError,
};

const AUTOMATED_COMMENT: &str = "Automated progression by Bot Mimic";

/// Why an application cannot be advanced automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligible {
    NonTechnicalJob,
    TerminalStatus(ApplicationStatus),
}

impl fmt::Display for Ineligible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ineligible::NonTechnicalJob => write!(f, "job is not a technical posting"),
            Ineligible::TerminalStatus(status) => {
                write!(f, "status '{status}' cannot be advanced")
            }
        }
    }
}

/// Next status for `record`, or the reason it may not be advanced.
pub fn eligibility(job: &Job, record: &ApplicationRecord) -> Result<ApplicationStatus, Ineligible> {
    if job.job_type != JobType::Technical {
        return Err(Ineligible::NonTechnicalJob);
    }
    record
        .status()
        .next()
        .ok_or(Ineligible::TerminalStatus(record.status()))
}

/// Error raised while processing a single application.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("job {job_id} referenced by application {application_id} not found")]
    JobNotFound {
        application_id: ApplicationId,
        job_id: JobId,
    },
    #[error("application {id} is not eligible: {reason}")]
    NotEligible {
        id: ApplicationId,
        reason: Ineligible,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("application {0} is being modified concurrently")]
    Conflict(ApplicationId),
    #[error("storage failure: {0}")]
    Storage(#[from] RepositoryError),
}

impl ProcessError {
    pub const fn kind(&self) -> &'static str {
        match self {
            ProcessError::NotFound(_) | ProcessError::JobNotFound { .. } => "not_found",
            ProcessError::NotEligible { .. } => "not_eligible",
            ProcessError::InvalidInput(_) => "invalid_input",
            ProcessError::Conflict(_) => "conflict",
            ProcessError::Storage(_) => "storage",
        }
    }
}

/// Outcome of one item inside a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub application_id: ApplicationId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_status: Option<ApplicationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<ApplicationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate result of a batch, items in request order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
}

impl BatchReport {
    fn push(&mut self, item: BatchItemResult) {
        self.total += 1;
        if item.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(item);
    }
}

/// Ids with a processing pass currently running.
#[derive(Default)]
struct InFlight {
    ids: Mutex<HashSet<ApplicationId>>,
}

impl InFlight {
    fn claim(&self, id: &ApplicationId) -> Option<InFlightClaim<'_>> {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        if !ids.insert(id.clone()) {
            return None;
        }
        Some(InFlightClaim {
            table: self,
            id: id.clone(),
        })
    }
}

struct InFlightClaim<'a> {
    table: &'a InFlight,
    id: ApplicationId,
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        self.table
            .ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

/// Advances technical applications along `submitted -> under-review -> shortlisted -> accepted`.
///
/// Only one pass per application id runs at a time; a concurrent pass on the same id
/// fails with [`ProcessError::Conflict`]. Writes use compare-and-swap on the record
/// version and are retried once when the version moved without a status change.
pub struct BotMimicProcessor<R, J> {
    applications: Arc<R>,
    jobs: Arc<J>,
    in_flight: InFlight,
    timeout: Duration,
    actor: Actor,
}

impl<R, J> BotMimicProcessor<R, J>
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    pub fn new(applications: Arc<R>, jobs: Arc<J>, timeout: Duration) -> Self {
        Self {
            applications,
            jobs,
            in_flight: InFlight::default(),
            timeout,
            actor: Actor::bot_mimic(),
        }
    }

    /// Builder: attribute automatic transitions to `actor` instead of the default bot identity.
    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = actor;
        self
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Advance one application a single step.
    pub async fn process_one(&self, id: &ApplicationId) -> Result<ApplicationRecord, ProcessError> {
        let (_, updated) = self.advance(id).await?;
        Ok(updated)
    }

    /// Advance each id independently; item failures, blank ids included, are reported
    /// in the item's result. Only an empty list fails the call.
    pub async fn process_batch(&self, ids: &[ApplicationId]) -> Result<BatchReport, ProcessError> {
        if ids.is_empty() {
            return Err(ProcessError::InvalidInput(
                "applicationIds must contain at least one id".to_string(),
            ));
        }

        Ok(self.run_batch(ids).await)
    }

    /// Run one pass over every currently eligible application.
    pub async fn process_eligible(&self) -> Result<BatchReport, ProcessError> {
        let ids: Vec<ApplicationId> = self
            .eligible_applications()
            .await?
            .into_iter()
            .map(|record| record.id)
            .collect();
        Ok(self.run_batch(&ids).await)
    }

    /// Applications on technical jobs that are not yet terminal, ordered by id.
    pub async fn eligible_applications(&self) -> Result<Vec<ApplicationRecord>, ProcessError> {
        let jobs = self.job_index().await?;
        let mut records: Vec<ApplicationRecord> = bounded(self.timeout, self.applications.list())
            .await?
            .into_iter()
            .filter(|record| {
                jobs.get(&record.job_id)
                    .is_some_and(|job| eligibility(job, record).is_ok())
            })
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    pub async fn stats(&self) -> Result<BotMimicStats, ProcessError> {
        let jobs = self.job_index().await?;
        let records = bounded(self.timeout, self.applications.list()).await?;
        Ok(activity::stats(&records, &jobs))
    }

    pub async fn activity_log(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<ActivityEntry>, ProcessError> {
        let records = bounded(self.timeout, self.applications.list()).await?;
        Ok(activity::activity_log(&records, activity::clamp_limit(limit)))
    }

    async fn run_batch(&self, ids: &[ApplicationId]) -> BatchReport {
        let mut report = BatchReport::default();
        for id in ids {
            let item = match self.advance(id).await {
                Ok((previous, updated)) => BatchItemResult {
                    application_id: id.clone(),
                    success: true,
                    previous_status: Some(previous),
                    new_status: Some(updated.status()),
                    error_kind: None,
                    error: None,
                },
                Err(err) => {
                    debug!(application_id = %id, error = %err, "batch item failed");
                    BatchItemResult {
                        application_id: id.clone(),
                        success: false,
                        previous_status: None,
                        new_status: None,
                        error_kind: Some(err.kind()),
                        error: Some(err.to_string()),
                    }
                }
            };
            report.push(item);
        }

        info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            "bot mimic batch finished"
        );
        report
    }

    async fn advance(
        &self,
        id: &ApplicationId,
    ) -> Result<(ApplicationStatus, ApplicationRecord), ProcessError> {
        if id.0.trim().is_empty() {
            return Err(ProcessError::InvalidInput(
                "application id must not be blank".to_string(),
            ));
        }
        let _claim = self
            .in_flight
            .claim(id)
            .ok_or_else(|| ProcessError::Conflict(id.clone()))?;

        let record = self.load(id).await?;
        let next = self.next_status(&record).await?;
        let previous = record.status();

        let updated = match self.append(&record, next).await {
            Ok(updated) => updated,
            Err(RepositoryError::VersionMismatch { expected, actual }) => {
                debug!(application_id = %id, expected, actual, "version moved, re-reading once");
                let fresh = self.load(id).await?;
                if fresh.status() != previous {
                    return Err(ProcessError::Conflict(id.clone()));
                }
                self.append(&fresh, next)
                    .await
                    .map_err(|err| classify(id, err))?
            }
            Err(err) => return Err(classify(id, err)),
        };

        info!(
            application_id = %id,
            from = %previous,
            to = %next,
            "bot mimic advanced application"
        );
        Ok((previous, updated))
    }

    async fn load(&self, id: &ApplicationId) -> Result<ApplicationRecord, ProcessError> {
        bounded(self.timeout, self.applications.fetch(id))
            .await?
            .ok_or_else(|| ProcessError::NotFound(id.clone()))
    }

    async fn next_status(
        &self,
        record: &ApplicationRecord,
    ) -> Result<ApplicationStatus, ProcessError> {
        let job = bounded(self.timeout, self.jobs.fetch(&record.job_id))
            .await?
            .ok_or_else(|| ProcessError::JobNotFound {
                application_id: record.id.clone(),
                job_id: record.job_id.clone(),
            })?;

        eligibility(&job, record).map_err(|reason| ProcessError::NotEligible {
            id: record.id.clone(),
            reason,
        })
    }

    async fn append(
        &self,
        record: &ApplicationRecord,
        next: ApplicationStatus,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let entry = StatusEntry::new(
            next,
            self.actor.clone(),
            Some(AUTOMATED_COMMENT.to_string()),
        );
        bounded(
            self.timeout,
            self.applications
                .append_status(&record.id, record.version(), entry),
        )
        .await
    }

    async fn job_index(&self) -> Result<HashMap<JobId, Job>, ProcessError> {
        let jobs = bounded(self.timeout, self.jobs.list()).await?;
        Ok(jobs.into_iter().map(|job| (job.id.clone(), job)).collect())
    }
}

fn classify(id: &ApplicationId, err: RepositoryError) -> ProcessError {
    match err {
        RepositoryError::VersionMismatch { .. } => ProcessError::Conflict(id.clone()),
        RepositoryError::NotFound => ProcessError::NotFound(id.clone()),
        other => {
            warn!(application_id = %id, error = %other, "bot mimic storage failure");
            ProcessError::Storage(other)
        }
    }
}
