// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `notify serve`: scheduler plus dispatch queue until shutdown.

use std::sync::Arc;

use notify_config::NotifyConfig;
use notify_core::NotifyError;
use notify_cron::{CleanupJobsTask, ProcessJobsTask, ResetQuotasTask, Scheduler};
use notify_engine::{DispatchQueue, DispatchRequest};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::runtime::Runtime;
use crate::shutdown;

pub async fn run_serve(config: NotifyConfig, read_stdin: bool) -> Result<(), NotifyError> {
    info!(name = %config.service.name, "starting notify serve");

    let runtime = Runtime::build(&config).await?;
    let processor = Arc::new(runtime.processor(&config));
    let dispatcher = Arc::new(runtime.dispatcher(&config));

    let cancel = shutdown::install_signal_handler();
    let tracker = TaskTracker::new();

    if config.schedule.enabled {
        let scheduler = Scheduler::from_config(
            &config.schedule,
            Arc::new(ProcessJobsTask::new(processor.clone())),
            Arc::new(CleanupJobsTask::new(processor.clone(), config.queue.retention_days)),
            Arc::new(ResetQuotasTask::new(runtime.db.clone(), runtime.notices.clone())),
        )?;
        scheduler.spawn(&tracker, cancel.clone());
    } else {
        info!("scheduler disabled by configuration");
    }

    let queue = Arc::new(DispatchQueue::start(dispatcher, &config.dispatch));
    if read_stdin {
        tracker.spawn(read_events(queue.clone(), cancel.clone()));
    }
    tracker.close();

    cancel.cancelled().await;
    tracker.wait().await;

    match Arc::try_unwrap(queue) {
        Ok(queue) => {
            queue.shutdown().await;
        }
        Err(_) => warn!("dispatch queue still shared at shutdown, not drained"),
    }
    runtime.db.close().await?;

    info!("notify serve shutdown complete");
    Ok(())
}

/// Feed JSON-lines dispatch events from stdin into the queue until EOF or shutdown.
async fn read_events(queue: Arc<DispatchQueue>, cancel: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = cancel.cancelled() => break,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("stdin closed, no more dispatch events");
                break;
            }
            Err(e) => {
                warn!(error = %e, "failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<DispatchRequest>(&line) {
            Ok(request) => {
                if let Err(e) = queue.submit(request) {
                    warn!(error = %e, "dispatch event rejected");
                }
            }
            Err(e) => warn!(error = %e, "malformed dispatch event"),
        }
    }
}
