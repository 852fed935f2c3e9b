// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System mailer for owner notices.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use notify_config::model::SmtpConfig;
use notify_core::{Notice, NoticeSender, NotifyError};
use tracing::{info, warn};

use crate::{classify_smtp_error, template};

/// Sends owner notices through the relay in the `[smtp]` config section.
pub struct SmtpNoticeSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpNoticeSender {
    /// Build the system mailer. Returns `Ok(None)` when no relay host is configured.
    pub fn from_config(config: &SmtpConfig) -> Result<Option<Self>, NotifyError> {
        let Some(host) = config.host.as_deref() else {
            return Ok(None);
        };

        let builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        }
        .map_err(|e| NotifyError::Config(format!("smtp relay `{host}`: {e}")))?;

        let mut builder = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)));
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let from = config
            .from
            .parse()
            .map_err(|e| NotifyError::Config(format!("smtp.from `{}`: {e}", config.from)))?;

        Ok(Some(Self {
            transport: builder.build(),
            from,
        }))
    }

    fn build_message(&self, notice: &Notice) -> Result<Message, NotifyError> {
        let to: Mailbox = notice
            .email
            .parse()
            .map_err(|e| NotifyError::Internal(format!("invalid owner address: {e}")))?;
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notice.subject.as_str())
            .header(ContentType::TEXT_HTML)
            .body(template::render(&notice.username, &notice.message, None))
            .map_err(|e| NotifyError::Internal(format!("failed to build notice: {e}")))
    }
}

#[async_trait]
impl NoticeSender for SmtpNoticeSender {
    async fn send_notice(&self, notice: &Notice) -> Result<(), NotifyError> {
        let message = self.build_message(notice)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyError::Send(classify_smtp_error(&e)))?;
        info!(to = %notice.email, subject = %notice.subject, "notice sent");
        Ok(())
    }
}

/// Stand-in when no system relay is configured: notices go to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNoticeSender;

#[async_trait]
impl NoticeSender for LogNoticeSender {
    async fn send_notice(&self, notice: &Notice) -> Result<(), NotifyError> {
        warn!(
            to = %notice.email,
            subject = %notice.subject,
            message = %notice.message,
            "no smtp relay configured, notice not mailed"
        );
        Ok(())
    }
}
