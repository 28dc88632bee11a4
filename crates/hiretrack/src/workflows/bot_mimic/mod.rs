//! Bot Mimic: automated status progression for technical-job applications.
//!
//! The processor advances applications one step at a time and records each change in
//! the application's status history; the scheduler repeats a pass over all eligible
//! applications on a fixed interval.

pub mod activity;
pub mod processor;
pub mod router;
pub mod scheduler;

#[cfg(test)]
mod tests;

pub use activity::{ActivityEntry, BotMimicStats};
pub use processor::{
    eligibility, BatchItemResult, BatchReport, BotMimicProcessor, Ineligible, ProcessError,
};
pub use router::bot_mimic_router;
pub use scheduler::{AutoProcessScheduler, AutoProcessStatus, SchedulerError};
