// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service mail to app owners.

use async_trait::async_trait;

use crate::error::NotifyError;
use crate::types::Notice;

/// Delivers service notices (quota reached, monthly reset) to an app owner
/// through the system mailer rather than the app's own channels.
#[async_trait]
pub trait NoticeSender: Send + Sync {
    async fn send_notice(&self, notice: &Notice) -> Result<(), NotifyError>;
}
