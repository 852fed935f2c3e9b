// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch processor for the durable job queue.
//!
//! One batch: recover stuck jobs, claim due jobs, run them with bounded
//! concurrency, and record each outcome. Invoked periodically by the
//! scheduler or once by `notify process`.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::{stream, FutureExt, StreamExt};
use notify_config::model::QueueConfig;
use notify_core::{Job, NotifyError, SendError};
use notify_storage::queries::jobs;
use notify_storage::{Database, RetryOutcome};
use tracing::{debug, info, info_span, instrument, warn, Instrument};

use crate::senders::Senders;

/// Tally of one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Jobs claimed and run.
    pub processed: usize,
    pub succeeded: usize,
    /// Jobs whose attempt failed, whether or not they will be retried.
    pub failed: usize,
    /// Stuck `processing` jobs returned to `pending` before the claim.
    pub recovered: usize,
}

/// Source of the current time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Retries queued channel deliveries.
pub struct QueueProcessor {
    db: Database,
    senders: Senders,
    config: QueueConfig,
    clock: Clock,
}

impl QueueProcessor {
    pub fn new(db: Database, senders: Senders, config: &QueueConfig) -> Self {
        Self {
            db,
            senders,
            config: config.clone(),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock used by [`process_batch`](Self::process_batch)
    /// and [`cleanup`](Self::cleanup).
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Run one batch against the live clock. Each job's outcome is stamped
    /// with the time it was recorded, not the time the batch started.
    pub async fn process_batch(&self) -> Result<BatchReport, NotifyError> {
        self.run_batch((self.clock)(), true).await
    }

    /// Run one batch with every timestamp pinned to `now`.
    pub async fn process_batch_at(&self, now: DateTime<Utc>) -> Result<BatchReport, NotifyError> {
        self.run_batch(now, false).await
    }

    /// Store failures abort the batch; send failures never do.
    #[instrument(skip(self), fields(batch_size = self.config.batch_size))]
    async fn run_batch(&self, now: DateTime<Utc>, live: bool) -> Result<BatchReport, NotifyError> {
        let stale_before = now - Duration::seconds(self.config.stale_after_secs as i64);
        let recovered = jobs::recover_stuck(&self.db, stale_before, now).await?;
        if recovered > 0 {
            warn!(recovered, "recovered stuck jobs");
        }

        let claimed = jobs::claim_due(&self.db, self.config.batch_size, now).await?;
        let mut report = BatchReport {
            recovered,
            ..BatchReport::default()
        };
        if claimed.is_empty() {
            debug!("no due jobs");
            return Ok(report);
        }

        let results: Vec<Result<bool, NotifyError>> = stream::iter(claimed)
            .map(|job| self.run_job(job, now, live))
            .buffer_unordered(self.config.workers.max(1))
            .collect()
            .await;

        for result in results {
            report.processed += 1;
            if result? {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
        }

        info!(
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failed,
            "job batch complete"
        );
        Ok(report)
    }

    /// Run one claimed job. `Ok(true)` when it completed.
    async fn run_job(&self, job: Job, batch_now: DateTime<Utc>, live: bool) -> Result<bool, NotifyError> {
        let stamp = move || if live { (self.clock)() } else { batch_now };
        let span = info_span!("job", job_id = job.id, kind = %job.kind, attempts = job.attempts);

        async move {
            let outcome = match job.delivery() {
                Ok((config, outbound)) => {
                    AssertUnwindSafe(self.senders.send(&config, &outbound))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| Err(SendError::retryable("sender panicked")))
                }
                Err(e) => Err(SendError::permanent(e.to_string())),
            };

            let err = match outcome {
                Ok(()) => {
                    if !jobs::complete(&self.db, job.id, stamp()).await? {
                        warn!("job left processing before completion was recorded");
                    }
                    info!("job completed");
                    return Ok(true);
                }
                Err(err) => err,
            };

            let give_up = self.config.fail_fast_on_permanent && err.is_permanent();
            match jobs::fail_or_retry(&self.db, job.id, &err.to_string(), stamp(), give_up).await {
                Ok(RetryOutcome::Retrying { attempts, run_at }) => {
                    warn!(attempts, %run_at, error = %err, "job failed, retry scheduled");
                }
                Ok(RetryOutcome::Failed { attempts }) => {
                    warn!(attempts, error = %err, "job failed permanently");
                }
                Ok(RetryOutcome::AlreadyTerminal(status)) => {
                    debug!(%status, "job already terminal, failure not recorded");
                }
                Ok(RetryOutcome::NotClaimed) => {
                    warn!("job was returned to pending while running, failure not recorded");
                }
                Err(NotifyError::NotFound { .. }) => {
                    warn!("job deleted while running, failure not recorded");
                }
                Err(e) => return Err(e),
            }
            Ok::<bool, NotifyError>(false)
        }
        .instrument(span)
        .await
    }

    /// Delete completed jobs older than `days`.
    pub async fn cleanup(&self, days: u32) -> Result<usize, NotifyError> {
        self.cleanup_at(days, (self.clock)()).await
    }

    pub async fn cleanup_at(&self, days: u32, now: DateTime<Utc>) -> Result<usize, NotifyError> {
        let older_than = now - Duration::days(i64::from(days));
        let deleted = jobs::cleanup(&self.db, older_than).await?;
        info!(deleted, days, "completed jobs cleaned up");
        Ok(deleted)
    }
}
