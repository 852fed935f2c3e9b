// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel sender for deterministic testing.
//!
//! `MockSender` implements `ChannelSender` for all three config types. Each
//! call pops the next scripted outcome; once the script runs out, the
//! fallback outcome is returned.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use notify_core::{
    ChannelSender, DiscordConfig, EmailConfig, JobKind, Outbound, SendError, SmsConfig,
};

/// One captured `send` call.
#[derive(Debug, Clone, PartialEq)]
pub struct SentCall {
    pub kind: JobKind,
    pub config_id: i64,
    pub outbound: Outbound,
}

/// A scripted channel sender.
#[derive(Clone)]
pub struct MockSender {
    script: Arc<Mutex<VecDeque<Result<(), SendError>>>>,
    fallback: Result<(), SendError>,
    calls: Arc<Mutex<Vec<SentCall>>>,
}

impl MockSender {
    /// A sender that always succeeds.
    pub fn new() -> Self {
        Self::with_fallback(Ok(()))
    }

    /// A sender that always fails with `err`.
    pub fn failing(err: SendError) -> Self {
        Self::with_fallback(Err(err))
    }

    /// A sender that returns `outcomes` in order, then succeeds.
    pub fn scripted(outcomes: Vec<Result<(), SendError>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(outcomes.into())),
            ..Self::new()
        }
    }

    fn with_fallback(fallback: Result<(), SendError>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue one more outcome behind the current script.
    pub async fn push_outcome(&self, outcome: Result<(), SendError>) {
        self.script.lock().await.push_back(outcome);
    }

    /// All calls made so far, in order.
    pub async fn calls(&self) -> Vec<SentCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    async fn record(&self, kind: JobKind, config_id: i64, outbound: &Outbound) -> Result<(), SendError> {
        self.calls.lock().await.push(SentCall {
            kind,
            config_id,
            outbound: outbound.clone(),
        });
        let next = self.script.lock().await.pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for MockSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelSender<EmailConfig> for MockSender {
    async fn send(&self, outbound: &Outbound, config: &EmailConfig) -> Result<(), SendError> {
        self.record(JobKind::Email, config.id, outbound).await
    }
}

#[async_trait]
impl ChannelSender<SmsConfig> for MockSender {
    async fn send(&self, outbound: &Outbound, config: &SmsConfig) -> Result<(), SendError> {
        self.record(JobKind::Sms, config.id, outbound).await
    }
}

#[async_trait]
impl ChannelSender<DiscordConfig> for MockSender {
    async fn send(&self, outbound: &Outbound, config: &DiscordConfig) -> Result<(), SendError> {
        self.record(JobKind::Discord, config.id, outbound).await
    }
}
