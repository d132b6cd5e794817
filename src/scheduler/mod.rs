//! Adaptive polling scheduler.
//!
//! Decides how often the caller's status check runs, based on how many jobs
//! are still running and whether recent checks saw changes.
//!
//! This module is split into:
//! - `mod.rs` - Configuration, state and the interval algorithm (pure, no timers)
//! - `actor.rs` - Timer loop that arms, fires and re-arms the poll

mod actor;

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

pub use actor::{PollFn, SchedulerHandle, spawn_scheduler};

/// Polling cadence configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerConfig {
    pub default_interval: Duration,
    pub min_interval: Duration,
    pub max_interval: Duration,
    /// Used whenever no job is running
    pub idle_interval: Duration,
    pub backoff_multiplier: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_interval: Duration::from_millis(3000),
            min_interval: Duration::from_millis(2000),
            max_interval: Duration::from_millis(30000),
            idle_interval: Duration::from_millis(30000),
            backoff_multiplier: 1.5,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SchedulerConfigError {
    #[error("min interval {min:?} is greater than default interval {default:?}")]
    MinAboveDefault { min: Duration, default: Duration },
    #[error("default interval {default:?} is greater than max interval {max:?}")]
    DefaultAboveMax { default: Duration, max: Duration },
    #[error("idle interval must be greater than zero")]
    ZeroIdle,
    #[error("backoff multiplier must be at least 1.0 (got {0})")]
    BackoffBelowOne(f64),
    #[error("backoff multiplier must be finite")]
    BackoffNotFinite,
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), SchedulerConfigError> {
        if self.min_interval > self.default_interval {
            return Err(SchedulerConfigError::MinAboveDefault {
                min: self.min_interval,
                default: self.default_interval,
            });
        }
        if self.default_interval > self.max_interval {
            return Err(SchedulerConfigError::DefaultAboveMax {
                default: self.default_interval,
                max: self.max_interval,
            });
        }
        if self.idle_interval.is_zero() {
            return Err(SchedulerConfigError::ZeroIdle);
        }
        if self.backoff_multiplier.is_infinite() {
            return Err(SchedulerConfigError::BackoffNotFinite);
        }
        if !(self.backoff_multiplier >= 1.0) {
            return Err(SchedulerConfigError::BackoffBelowOne(self.backoff_multiplier));
        }
        Ok(())
    }
}

/// Where the scheduler is in its poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// No timer armed
    #[default]
    Idle,
    /// Timer armed, waiting to fire
    Scheduled,
    /// Poll function in flight
    Executing,
}

/// What one status check observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    pub running: usize,
    pub has_changes: bool,
}

#[derive(Debug, Clone)]
pub struct SchedulerState {
    config: SchedulerConfig,
    pub current_interval: Duration,
    pub is_polling: bool,
    /// `None` until the first status report arrives
    pub running_task_count: Option<usize>,
    pub consecutive_no_change_count: u32,
    pub last_update_time: Option<Instant>,
    pub phase: SchedulerPhase,
    /// Number of polls executed so far
    pub polls: u64,
}

impl SchedulerState {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            current_interval: config.default_interval,
            is_polling: false,
            running_task_count: None,
            consecutive_no_change_count: 0,
            last_update_time: None,
            phase: SchedulerPhase::Idle,
            polls: 0,
        }
    }

    /// Record a status observation.
    ///
    /// Returns true when the running count just dropped from non-zero to zero,
    /// meaning an immediate out-of-band poll is due.
    pub fn update_task_status(&mut self, running: usize, has_changes: bool, now: Instant) -> bool {
        let previous = self.running_task_count;
        self.running_task_count = Some(running);
        self.last_update_time = Some(now);

        if running > 0 {
            if has_changes {
                self.current_interval = self.config.default_interval;
                self.consecutive_no_change_count = 0;
            } else {
                self.consecutive_no_change_count += 1;
            }
        } else {
            self.current_interval = self.config.idle_interval;
        }

        matches!(previous, Some(count) if count > 0) && running == 0
    }

    /// Interval until the next poll. Evaluated once per scheduled poll; the
    /// result becomes the new `current_interval` so backoff compounds.
    pub fn next_interval(&mut self) -> Duration {
        let config = self.config;

        let next = match self.running_task_count {
            Some(0) => config.idle_interval,
            _ if self.consecutive_no_change_count > 3 => {
                // Clamp in f64 so a large multiplier cannot overflow Duration
                let secs = (self.current_interval.as_secs_f64() * config.backoff_multiplier)
                    .min(config.max_interval.as_secs_f64());
                Duration::try_from_secs_f64(secs).unwrap_or(config.max_interval)
            }
            _ => self
                .current_interval
                .clamp(config.min_interval, config.max_interval),
        };

        self.current_interval = next;
        next
    }

    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        self.running_task_count == Some(0)
    }
}
