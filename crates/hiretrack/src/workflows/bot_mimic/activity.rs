//! Read-only projections over application history: the automated activity log and stats.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::processor::eligibility;
use crate::workflows::applications::domain::{
    Actor, ActorRole, ApplicationId, ApplicationStatus, Job, JobId, JobType,
};
use crate::workflows::applications::repository::ApplicationRecord;

pub const DEFAULT_ACTIVITY_LIMIT: usize = 50;
pub const MAX_ACTIVITY_LIMIT: usize = 500;

pub fn clamp_limit(limit: Option<usize>) -> usize {
    limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT)
}

/// A history entry attributed to an automated actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub application_id: ApplicationId,
    pub job_id: JobId,
    pub status: ApplicationStatus,
    pub changed_by: Actor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Most recent bot-attributed history entries, newest first.
pub fn activity_log(records: &[ApplicationRecord], limit: usize) -> Vec<ActivityEntry> {
    let mut entries: Vec<ActivityEntry> = records
        .iter()
        .flat_map(|record| {
            record
                .status_history()
                .iter()
                .filter(|entry| entry.changed_by.role == ActorRole::Bot)
                .map(move |entry| ActivityEntry {
                    application_id: record.id.clone(),
                    job_id: record.job_id.clone(),
                    status: entry.status,
                    changed_by: entry.changed_by.clone(),
                    comment: entry.comment.clone(),
                    timestamp: entry.timestamp,
                })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.application_id.cmp(&b.application_id))
    });
    entries.truncate(limit);
    entries
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotMimicStats {
    pub total_applications: usize,
    pub technical_applications: usize,
    pub eligible_applications: usize,
    pub automated_transitions: usize,
    pub by_status: BTreeMap<&'static str, usize>,
}

pub fn stats(records: &[ApplicationRecord], jobs: &HashMap<JobId, Job>) -> BotMimicStats {
    let mut by_status: BTreeMap<&'static str, usize> = ApplicationStatus::ALL
        .iter()
        .map(|status| (status.label(), 0))
        .collect();

    let mut technical_applications = 0;
    let mut eligible_applications = 0;
    let mut automated_transitions = 0;

    for record in records {
        *by_status.entry(record.status().label()).or_default() += 1;

        if let Some(job) = jobs.get(&record.job_id) {
            if job.job_type == JobType::Technical {
                technical_applications += 1;
            }
            if eligibility(job, record).is_ok() {
                eligible_applications += 1;
            }
        }

        automated_transitions += record
            .status_history()
            .iter()
            .filter(|entry| entry.changed_by.role == ActorRole::Bot)
            .count();
    }

    BotMimicStats {
        total_applications: records.len(),
        technical_applications,
        eligible_applications,
        automated_transitions,
        by_status,
    }
}
