//! Scheduler service
//!
//! Long-lived background task that re-evaluates time-dependent
//! transitions on a fixed interval: organizer prompts for events
//! crossing into the review window, and the edit-lock refresh for
//! started events that were never finalized. Each tick re-derives its
//! work from persisted state, so a process restart loses nothing but
//! the current tick.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info};

use crate::services::validation::ValidationService;

/// Default sweep period. A tunable, not a correctness requirement.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(600);

#[derive(Clone)]
pub struct Scheduler {
    validation: ValidationService,
    tick_interval: Duration,
}

impl Scheduler {
    pub fn new(validation: ValidationService, tick_interval: Duration) -> Self {
        Self {
            validation,
            tick_interval,
        }
    }

    /// Run the sweep loop until the task is dropped.
    pub async fn run(&self) {
        info!(interval_secs = self.tick_interval.as_secs(), "Scheduler started");
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of tokio's interval fires immediately; that is
        // fine here, a sweep at startup just catches up after downtime.
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    /// One sweep pass. The two sweeps are independent; a failure in
    /// either is logged and never stops the loop.
    pub async fn tick(&self) {
        let now = Utc::now();
        debug!(%now, "Scheduler tick");

        if let Err(err) = self.validation.process_validation_prompts(now).await {
            error!(error = %err, "Validation prompt sweep failed");
        }
        if let Err(err) = self.validation.process_edit_lock(now).await {
            error!(error = %err, "Edit-lock sweep failed");
        }
    }
}
