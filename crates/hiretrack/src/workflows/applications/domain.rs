use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for submitted applications.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for job postings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job category. Only technical postings are handled by the Bot Mimic processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    Technical,
    NonTechnical,
}

impl JobType {
    pub const fn label(self) -> &'static str {
        match self {
            JobType::Technical => "technical",
            JobType::NonTechnical => "non-technical",
        }
    }
}

/// A job posting applications are submitted against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub title: String,
    pub company: String,
    pub job_type: JobType,
    pub created_at: DateTime<Utc>,
}

/// Payload accepted when an admin publishes a new posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDraft {
    pub title: String,
    pub company: String,
    pub job_type: JobType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Admin,
    Applicant,
    Bot,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            ActorRole::Admin => "admin",
            ActorRole::Applicant => "applicant",
            ActorRole::Bot => "bot",
        }
    }
}

/// Identity attributed to a status change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }

    /// The system identity used for automatic transitions.
    pub fn bot_mimic() -> Self {
        Self::new("bot-mimic", "Bot Mimic", ActorRole::Bot)
    }
}

/// Status tracked throughout an application's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    Shortlisted,
    Rejected,
    Withdrawn,
    Accepted,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 6] = [
        ApplicationStatus::Submitted,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
        ApplicationStatus::Accepted,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under-review",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
            ApplicationStatus::Accepted => "accepted",
        }
    }

    /// Next step of `submitted -> under-review -> shortlisted -> accepted`.
    ///
    /// Returns `None` for terminal statuses; rejection and withdrawal are never
    /// produced by advancement.
    pub const fn next(self) -> Option<ApplicationStatus> {
        match self {
            ApplicationStatus::Submitted => Some(ApplicationStatus::UnderReview),
            ApplicationStatus::UnderReview => Some(ApplicationStatus::Shortlisted),
            ApplicationStatus::Shortlisted => Some(ApplicationStatus::Accepted),
            ApplicationStatus::Rejected
            | ApplicationStatus::Withdrawn
            | ApplicationStatus::Accepted => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One append-only row of an application's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub status: ApplicationStatus,
    pub changed_by: Actor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl StatusEntry {
    pub fn new(status: ApplicationStatus, changed_by: Actor, comment: Option<String>) -> Self {
        Self {
            status,
            changed_by,
            comment,
            timestamp: Utc::now(),
        }
    }
}

/// Free-text answer to a screening question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningAnswer {
    pub question: String,
    pub answer: String,
}

/// Applicant supplied payload for a new application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSubmission {
    pub job_id: JobId,
    #[serde(default)]
    pub answers: Vec<ScreeningAnswer>,
    #[serde(default)]
    pub resume: Option<String>,
    #[serde(default)]
    pub expected_salary: Option<u32>,
}

/// Manual transition requested by an admin or the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeRequest {
    pub status: ApplicationStatus,
    #[serde(default)]
    pub comment: Option<String>,
}
