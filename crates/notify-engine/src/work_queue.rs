// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded work queue that runs dispatches off the caller's path.
//!
//! `submit` hands an event to a fixed pool of worker tasks and returns
//! at once. A full queue is reported to the caller instead of growing without
//! bound. `shutdown` stops intake, then waits for queued and in-flight
//! dispatches, reporting how many finished and how many were abandoned.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use notify_config::model::DispatchConfig;
use notify_core::NotifyError;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::dispatcher::{DispatchOutcome, Dispatcher};

/// One notification event waiting to be dispatched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DispatchRequest {
    pub app_id: i64,
    pub user_id: i64,
    pub message: String,
    #[serde(default)]
    pub details: Option<Value>,
}

/// How the queue ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Dispatches that ran to completion (including ones that returned an error).
    pub completed: u64,
    /// Dispatches still queued or running when the drain timed out.
    pub abandoned: u64,
}

#[derive(Default)]
struct Counters {
    accepted: AtomicU64,
    finished: AtomicU64,
}

/// Bounded dispatch queue backed by tracked worker tasks.
pub struct DispatchQueue {
    tx: mpsc::Sender<DispatchRequest>,
    tracker: TaskTracker,
    counters: Arc<Counters>,
    drain_timeout: Duration,
}

impl DispatchQueue {
    /// Spawn `config.workers` workers draining a queue of `config.queue_capacity`.
    pub fn start(dispatcher: Arc<Dispatcher>, config: &DispatchConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let tracker = TaskTracker::new();
        let counters = Arc::new(Counters::default());

        for worker in 0..config.workers.max(1) {
            let rx = rx.clone();
            let dispatcher = dispatcher.clone();
            let counters = counters.clone();
            tracker.spawn(async move {
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some(request) = next else {
                        break;
                    };
                    run_one(&dispatcher, request).await;
                    counters.finished.fetch_add(1, Ordering::Relaxed);
                }
                debug!(worker, "dispatch worker stopped");
            });
        }
        tracker.close();

        info!(
            workers = config.workers.max(1),
            capacity = config.queue_capacity.max(1),
            "dispatch queue started"
        );
        Self {
            tx,
            tracker,
            counters,
            drain_timeout: Duration::from_secs(config.drain_timeout_secs),
        }
    }

    /// Enqueue a dispatch without waiting for it.
    pub fn submit(&self, request: DispatchRequest) -> Result<(), NotifyError> {
        self.tx.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(request) => {
                warn!(app_id = request.app_id, "dispatch queue full, event rejected");
                NotifyError::QueueFull
            }
            mpsc::error::TrySendError::Closed(_) => NotifyError::QueueClosed,
        })?;
        self.counters.accepted.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Events accepted but not yet finished.
    pub fn pending(&self) -> u64 {
        let accepted = self.counters.accepted.load(Ordering::Relaxed);
        accepted.saturating_sub(self.counters.finished.load(Ordering::Relaxed))
    }

    /// Stop accepting events and wait for the queue to drain.
    pub async fn shutdown(self) -> DrainReport {
        let Self {
            tx,
            tracker,
            counters,
            drain_timeout,
        } = self;
        drop(tx);

        let drained = tokio::time::timeout(drain_timeout, tracker.wait()).await.is_ok();
        let accepted = counters.accepted.load(Ordering::Relaxed);
        let completed = counters.finished.load(Ordering::Relaxed);
        let report = DrainReport {
            completed,
            abandoned: accepted.saturating_sub(completed),
        };

        if drained {
            info!(completed = report.completed, "dispatch queue drained");
        } else {
            warn!(
                completed = report.completed,
                abandoned = report.abandoned,
                "dispatch queue drain timed out, remaining dispatches dropped"
            );
        }
        report
    }
}

async fn run_one(dispatcher: &Dispatcher, request: DispatchRequest) {
    let DispatchRequest {
        app_id,
        user_id,
        message,
        details,
    } = request;
    match dispatcher.dispatch(app_id, user_id, &message, details).await {
        Ok(DispatchOutcome::Delivered { queued, .. }) if queued > 0 => {
            debug!(app_id, queued, "dispatch finished with queued retries");
        }
        Ok(outcome) => debug!(app_id, ?outcome, "dispatch finished"),
        Err(e) => error!(app_id, error = %e, "dispatch failed"),
    }
}
