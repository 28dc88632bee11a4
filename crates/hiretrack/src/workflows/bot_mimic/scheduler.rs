use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::processor::BotMimicProcessor;
use crate::workflows::applications::repository::{ApplicationRepository, JobRepository};

pub const MIN_INTERVAL_MINUTES: u32 = 1;
pub const MAX_INTERVAL_MINUTES: u32 = 24 * 60;

/// Snapshot returned by the auto-process status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoProcessStatus {
    pub is_running: bool,
    pub interval_minutes: u32,
    pub last_run_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("intervalMinutes must be between 1 and 1440, got {0}")]
    InvalidInterval(u32),
}

enum SchedulerState {
    Stopped {
        interval_minutes: u32,
    },
    Running {
        interval_minutes: u32,
        cancel: watch::Sender<bool>,
        _handle: JoinHandle<()>,
    },
}

impl SchedulerState {
    fn interval_minutes(&self) -> u32 {
        match self {
            SchedulerState::Stopped { interval_minutes }
            | SchedulerState::Running {
                interval_minutes, ..
            } => *interval_minutes,
        }
    }
}

/// Owns the single recurring Bot Mimic trigger.
///
/// Each tick runs one batch over the currently eligible applications. Ticks run
/// inline in the background task, so a slow batch delays the next tick instead of
/// overlapping it. Disabling stops any tick that has not started its batch; a batch
/// already in progress runs to completion.
pub struct AutoProcessScheduler<R, J> {
    processor: Arc<BotMimicProcessor<R, J>>,
    state: Mutex<SchedulerState>,
    last_run: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl<R, J> AutoProcessScheduler<R, J>
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    /// `default_interval_minutes` is reported by the status query until the trigger is
    /// first enabled.
    pub fn new(processor: Arc<BotMimicProcessor<R, J>>, default_interval_minutes: u32) -> Self {
        Self {
            processor,
            state: Mutex::new(SchedulerState::Stopped {
                interval_minutes: default_interval_minutes,
            }),
            last_run: Arc::new(RwLock::new(None)),
        }
    }

    pub fn processor(&self) -> &Arc<BotMimicProcessor<R, J>> {
        &self.processor
    }

    /// Start the trigger, or replace the running one with a new interval.
    ///
    /// Must be called from within a tokio runtime.
    pub fn enable(&self, interval_minutes: u32) -> Result<AutoProcessStatus, SchedulerError> {
        if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&interval_minutes) {
            return Err(SchedulerError::InvalidInterval(interval_minutes));
        }

        let (cancel, cancel_rx) = watch::channel(false);
        let period = Duration::from_secs(u64::from(interval_minutes) * 60);
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.processor),
            period,
            cancel_rx,
            Arc::clone(&self.last_run),
        ));

        let mut state = self.lock_state();
        let previous = std::mem::replace(
            &mut *state,
            SchedulerState::Running {
                interval_minutes,
                cancel,
                _handle: handle,
            },
        );
        drop(state);

        match previous {
            SchedulerState::Running {
                interval_minutes: old,
                cancel,
                ..
            } => {
                let _ = cancel.send(true);
                info!(from = old, to = interval_minutes, "auto-process interval replaced");
            }
            SchedulerState::Stopped { .. } => {
                info!(interval_minutes, "auto-process enabled");
            }
        }

        Ok(self.status())
    }

    /// Stop the trigger. A no-op when it is not running.
    pub fn disable(&self) -> AutoProcessStatus {
        let mut state = self.lock_state();
        let interval_minutes = state.interval_minutes();
        let previous = std::mem::replace(&mut *state, SchedulerState::Stopped { interval_minutes });
        drop(state);

        match previous {
            SchedulerState::Running { cancel, .. } => {
                let _ = cancel.send(true);
                info!(interval_minutes, "auto-process disabled");
            }
            SchedulerState::Stopped { .. } => debug!("auto-process already disabled"),
        }

        self.status()
    }

    pub fn status(&self) -> AutoProcessStatus {
        let state = self.lock_state();
        let is_running = matches!(*state, SchedulerState::Running { .. });
        let interval_minutes = state.interval_minutes();
        drop(state);

        AutoProcessStatus {
            is_running,
            interval_minutes,
            last_run_time: *self.last_run.read().unwrap_or_else(PoisonError::into_inner),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R, J> Drop for AutoProcessScheduler<R, J> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let SchedulerState::Running { cancel, .. } = state {
            let _ = cancel.send(true);
        }
    }
}

async fn run_loop<R, J>(
    processor: Arc<BotMimicProcessor<R, J>>,
    period: Duration,
    mut cancel: watch::Receiver<bool>,
    last_run: Arc<RwLock<Option<DateTime<Utc>>>>,
) where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                if *cancel.borrow() {
                    break;
                }

                match processor.process_eligible().await {
                    Ok(report) => info!(
                        total = report.total,
                        succeeded = report.succeeded,
                        failed = report.failed,
                        "auto-process pass complete"
                    ),
                    Err(err) => warn!(error = %err, "auto-process pass failed"),
                }

                *last_run.write().unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
            }
        }
    }

    debug!("auto-process loop stopped");
}
