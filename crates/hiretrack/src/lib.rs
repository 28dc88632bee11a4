//! Application tracking: job postings, applicant submissions, and the Bot Mimic
//! processor that walks technical applications through their status progression.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
