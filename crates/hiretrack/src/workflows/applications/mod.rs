//! Job postings, applicant submissions, and manual status changes.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    Actor, ActorRole, ApplicationId, ApplicationStatus, ApplicationSubmission, Job, JobDraft,
    JobId, JobType, ScreeningAnswer, StatusChangeRequest, StatusEntry,
};
pub use repository::{
    bounded, ApplicationRecord, ApplicationRepository, JobRepository, RepositoryError,
};
pub use router::application_router;
pub use service::{ApplicationRegistry, RegistryError};
pub use store::InMemoryStore;
