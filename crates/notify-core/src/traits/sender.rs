// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel sender trait for email, SMS, and Discord delivery.

use async_trait::async_trait;

use crate::error::SendError;
use crate::types::Outbound;

/// Sends one notification through one channel, given that channel's stored config.
///
/// Implementations decrypt credentials immediately before use, never retry
/// internally, and never touch the job store. Retrying is the queue's job.
#[async_trait]
pub trait ChannelSender<C: Sync>: Send + Sync {
    async fn send(&self, outbound: &Outbound, config: &C) -> Result<(), SendError>;
}
