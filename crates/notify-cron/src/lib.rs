// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cron scheduler for the Notify fan-out service.
//!
//! Each [`PeriodicTask`] runs in its own loop: sleep until the next cron
//! fire time, run, repeat. A run that outlasts its interval delays the next
//! fire instead of overlapping it. Loops exit when the cancellation token
//! fires.

pub mod tasks;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use croner::Cron;
use notify_config::model::ScheduleConfig;
use notify_core::NotifyError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

pub use tasks::{CleanupJobsTask, ProcessJobsTask, ResetQuotasTask};

/// Work run on a cron schedule.
#[async_trait]
pub trait PeriodicTask: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self) -> Result<(), NotifyError>;
}

struct Entry {
    expr: String,
    cron: Cron,
    task: Arc<dyn PeriodicTask>,
}

/// A set of cron-scheduled tasks.
#[derive(Default)]
pub struct Scheduler {
    entries: Vec<Entry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three service tasks on the schedules from `[schedule]`.
    pub fn from_config(
        config: &ScheduleConfig,
        process: Arc<dyn PeriodicTask>,
        cleanup: Arc<dyn PeriodicTask>,
        reset: Arc<dyn PeriodicTask>,
    ) -> Result<Self, NotifyError> {
        let mut scheduler = Self::new();
        scheduler.add(&config.process_jobs, process)?;
        scheduler.add(&config.cleanup_jobs, cleanup)?;
        scheduler.add(&config.reset_quotas, reset)?;
        Ok(scheduler)
    }

    /// Schedule `task` on the cron expression `expr`.
    pub fn add(&mut self, expr: &str, task: Arc<dyn PeriodicTask>) -> Result<(), NotifyError> {
        let cron = parse_cron(expr)?;
        self.entries.push(Entry {
            expr: expr.to_string(),
            cron,
            task,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Spawn one loop per task onto `tracker`. Loops stop when `cancel` fires.
    pub fn spawn(self, tracker: &TaskTracker, cancel: CancellationToken) {
        for entry in self.entries {
            let cancel = cancel.clone();
            info!(task = entry.task.name(), schedule = %entry.expr, "scheduled task registered");
            tracker.spawn(run_loop(entry, cancel));
        }
    }
}

/// Parse a cron expression, reporting failures as configuration errors.
pub fn parse_cron(expr: &str) -> Result<Cron, NotifyError> {
    Cron::from_str(expr)
        .map_err(|e| NotifyError::Config(format!("invalid cron expression `{expr}`: {e}")))
}

/// The first fire time strictly after `after`.
pub fn next_fire(cron: &Cron, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    cron.find_next_occurrence(&after, false).ok()
}

async fn run_loop(entry: Entry, cancel: CancellationToken) {
    let name = entry.task.name();
    loop {
        let now = Utc::now();
        let Some(next) = next_fire(&entry.cron, now) else {
            warn!(task = name, "schedule has no future fire time, stopping");
            return;
        };
        let wait = (next - now).to_std().unwrap_or_default();
        debug!(task = name, next = %next, "waiting for next fire time");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = cancel.cancelled() => {
                info!(task = name, "scheduled task shutting down");
                return;
            }
        }

        run_once(entry.task.as_ref()).await;
    }
}

/// Run a task once, logging the outcome. Task errors never stop the schedule.
pub async fn run_once(task: &dyn PeriodicTask) -> bool {
    let started = std::time::Instant::now();
    match task.run().await {
        Ok(()) => {
            debug!(task = task.name(), elapsed_ms = started.elapsed().as_millis() as u64, "scheduled task finished");
            true
        }
        Err(e) => {
            error!(task = task.name(), error = %e, "scheduled task failed");
            false
        }
    }
}
