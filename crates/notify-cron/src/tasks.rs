// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The service's periodic tasks.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use notify_core::{NoticeSender, NotifyError};
use notify_engine::quota::reset_monthly_quotas;
use notify_engine::QueueProcessor;
use notify_storage::Database;

use crate::PeriodicTask;

/// Retry due jobs.
pub struct ProcessJobsTask {
    processor: Arc<QueueProcessor>,
}

impl ProcessJobsTask {
    pub fn new(processor: Arc<QueueProcessor>) -> Self {
        Self { processor }
    }
}

#[async_trait]
impl PeriodicTask for ProcessJobsTask {
    fn name(&self) -> &'static str {
        "process_jobs"
    }

    async fn run(&self) -> Result<(), NotifyError> {
        self.processor.process_batch().await.map(|_| ())
    }
}

/// Delete completed jobs past the retention window.
pub struct CleanupJobsTask {
    processor: Arc<QueueProcessor>,
    retention_days: u32,
}

impl CleanupJobsTask {
    pub fn new(processor: Arc<QueueProcessor>, retention_days: u32) -> Self {
        Self {
            processor,
            retention_days,
        }
    }
}

#[async_trait]
impl PeriodicTask for CleanupJobsTask {
    fn name(&self) -> &'static str {
        "cleanup_jobs"
    }

    async fn run(&self) -> Result<(), NotifyError> {
        self.processor.cleanup(self.retention_days).await.map(|_| ())
    }
}

/// Zero monthly counters that are due.
pub struct ResetQuotasTask {
    db: Database,
    notices: Arc<dyn NoticeSender>,
}

impl ResetQuotasTask {
    pub fn new(db: Database, notices: Arc<dyn NoticeSender>) -> Self {
        Self { db, notices }
    }
}

#[async_trait]
impl PeriodicTask for ResetQuotasTask {
    fn name(&self) -> &'static str {
        "reset_quotas"
    }

    async fn run(&self) -> Result<(), NotifyError> {
        reset_monthly_quotas(&self.db, self.notices.as_ref(), Utc::now())
            .await
            .map(|_| ())
    }
}
