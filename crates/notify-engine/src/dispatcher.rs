// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Immediate fan-out of one notification event to an app's channels.
//!
//! A dispatch records the notification and bumps the monthly counter in one
//! transaction, sends to every active channel concurrently, and enqueues a
//! job for each send that failed. Only store failures reach the caller.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use notify_config::model::QueueConfig;
use notify_core::{JobPayload, NoticeSender, Notification, NotifyError, Outbound};
use notify_storage::queries::{apps, jobs, notifications};
use notify_storage::Database;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::quota::{check_quota, QuotaBlock, QuotaDecision};
use crate::senders::Senders;

/// What a dispatch call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No active app with that id belongs to the user.
    AppNotFound,
    /// The app's owner row is missing.
    UserNotFound,
    /// The quota guard stopped the dispatch; the owner was sent a notice.
    Blocked(QuotaBlock),
    /// The notification was recorded. `sent` channels succeeded immediately;
    /// `queued` failed and were handed to the job queue.
    Delivered {
        notification_id: String,
        sent: usize,
        queued: usize,
    },
}

/// Fans notification events out to app channels.
pub struct Dispatcher {
    db: Database,
    senders: Senders,
    notices: Arc<dyn NoticeSender>,
    max_attempts: u32,
}

impl Dispatcher {
    pub fn new(
        db: Database,
        senders: Senders,
        notices: Arc<dyn NoticeSender>,
        queue: &QueueConfig,
    ) -> Self {
        Self {
            db,
            senders,
            notices,
            max_attempts: queue.max_attempts,
        }
    }

    /// Dispatch `message` for `app_id` on behalf of `user_id`.
    pub async fn dispatch(
        &self,
        app_id: i64,
        user_id: i64,
        message: &str,
        details: Option<Value>,
    ) -> Result<DispatchOutcome, NotifyError> {
        self.dispatch_at(app_id, user_id, message, details, Utc::now())
            .await
    }

    #[instrument(skip(self, message, details, now))]
    pub async fn dispatch_at(
        &self,
        app_id: i64,
        user_id: i64,
        message: &str,
        details: Option<Value>,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, NotifyError> {
        let Some(app) = apps::get_active_app(&self.db, app_id, user_id).await? else {
            info!("no active app for this user, skipping dispatch");
            return Ok(DispatchOutcome::AppNotFound);
        };
        let Some(user) = apps::get_user(&self.db, user_id).await? else {
            warn!("app owner not found, skipping dispatch");
            return Ok(DispatchOutcome::UserNotFound);
        };

        if let QuotaDecision::Blocked(block) = check_quota(&app, &user) {
            info!(?block, sent = app.alerts_sent_this_month, "dispatch blocked by quota");
            let notice = block.notice(&app, &user);
            if let Err(e) = self.notices.send_notice(&notice).await {
                warn!(error = %e, "quota notice failed");
            }
            return Ok(DispatchOutcome::Blocked(block));
        }

        let notification = Notification {
            id: uuid::Uuid::new_v4().to_string(),
            app_id,
            message: message.to_string(),
            details: details.clone(),
            created_at: now,
            read_at: None,
        };
        notifications::record_dispatch(&self.db, &notification).await?;

        let configs = apps::active_channel_configs(&self.db, app_id).await?;
        if configs.is_empty() {
            info!("no active channels for app");
        }

        let outbound = Outbound::new(message, details).with_username(user.username.clone());
        let results = join_all(configs.iter().map(|config| self.senders.send(config, &outbound))).await;

        let mut sent = 0;
        let mut queued = 0;
        for (config, result) in configs.iter().zip(results) {
            let kind = config.kind();
            let config_id = config.id();
            let err = match result {
                Ok(()) => {
                    debug!(%kind, config_id, "sent");
                    sent += 1;
                    continue;
                }
                Err(err) => err,
            };
            warn!(%kind, config_id, error = %err, "immediate send failed, queueing retry");

            let payload = match JobPayload::new(config, &outbound).and_then(|p| p.to_json()) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(%kind, config_id, error = %e, "could not encode job payload, send dropped");
                    continue;
                }
            };
            let job_id = jobs::enqueue(&self.db, kind, &payload, self.max_attempts, now).await?;
            debug!(%kind, config_id, job_id, "retry job queued");
            queued += 1;
        }

        info!(
            notification_id = %notification.id,
            sent,
            queued,
            "notification dispatched"
        );
        Ok(DispatchOutcome::Delivered {
            notification_id: notification.id,
            sent,
            queued,
        })
    }
}
