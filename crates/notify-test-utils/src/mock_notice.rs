// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock notice sender that captures owner notices.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use notify_core::{Notice, NoticeSender, NotifyError};

/// Records every notice. A failing instance still records the attempt.
#[derive(Clone, Default)]
pub struct MockNoticeSender {
    sent: Arc<Mutex<Vec<Notice>>>,
    fail: bool,
}

impl MockNoticeSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender whose every attempt errors, as an unreachable relay would.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn notices(&self) -> Vec<Notice> {
        self.sent.lock().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl NoticeSender for MockNoticeSender {
    async fn send_notice(&self, notice: &Notice) -> Result<(), NotifyError> {
        self.sent.lock().await.push(notice.clone());
        if self.fail {
            return Err(NotifyError::Internal("mock relay unavailable".into()));
        }
        Ok(())
    }
}
