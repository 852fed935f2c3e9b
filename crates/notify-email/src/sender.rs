// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email channel: delivers through the channel's own SMTP account.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use notify_core::{ChannelSender, EmailConfig, Outbound, SendError};
use notify_vault::SecretCodec;
use tracing::{debug, warn};

use crate::{classify_smtp_error, template};

/// Port that speaks TLS from the first byte; every other port upgrades via STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

/// Decrypted SMTP settings for one send. Dropped as soon as the send completes.
struct SmtpAccount {
    host: String,
    port: u16,
    alias: String,
    auth_email: String,
    auth_pass: String,
}

/// Sends notifications through each email channel's configured SMTP account.
///
/// The message goes from the channel's alias to its own login address with
/// the notification message as the subject.
pub struct EmailSender {
    codec: Arc<SecretCodec>,
    timeout: Duration,
}

impl EmailSender {
    pub fn new(codec: Arc<SecretCodec>, timeout: Duration) -> Self {
        Self { codec, timeout }
    }

    fn decrypt_account(&self, config: &EmailConfig) -> Result<SmtpAccount, SendError> {
        let port = self.codec.decrypt(&config.port)?;
        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| SendError::permanent(format!("invalid smtp port `{port}`")))?;
        Ok(SmtpAccount {
            host: self.codec.decrypt(&config.host)?,
            port,
            alias: self.codec.decrypt(&config.alias)?,
            auth_email: self.codec.decrypt(&config.auth_email)?,
            auth_pass: self.codec.decrypt(&config.auth_pass)?,
        })
    }

    fn build_message(account: &SmtpAccount, outbound: &Outbound) -> Result<Message, SendError> {
        let from: Mailbox = account
            .alias
            .parse()
            .map_err(|e| SendError::permanent(format!("invalid sender alias: {e}")))?;
        let to: Mailbox = account
            .auth_email
            .parse()
            .map_err(|e| SendError::permanent(format!("invalid recipient address: {e}")))?;
        let username = outbound.username.as_deref().unwrap_or("there");

        Message::builder()
            .from(from)
            .to(to)
            .subject(outbound.message.as_str())
            .header(ContentType::TEXT_HTML)
            .body(template::render(
                username,
                &outbound.message,
                outbound.details.as_ref(),
            ))
            .map_err(|e| SendError::permanent(format!("failed to build email: {e}")))
    }

    fn transport(&self, account: &SmtpAccount) -> Result<AsyncSmtpTransport<Tokio1Executor>, SendError> {
        let builder = if account.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&account.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&account.host)
        }
        .map_err(|e| classify_smtp_error(&e))?;

        Ok(builder
            .port(account.port)
            .credentials(Credentials::new(
                account.auth_email.clone(),
                account.auth_pass.clone(),
            ))
            .timeout(Some(self.timeout))
            .build())
    }
}

#[async_trait]
impl ChannelSender<EmailConfig> for EmailSender {
    async fn send(&self, outbound: &Outbound, config: &EmailConfig) -> Result<(), SendError> {
        let account = self.decrypt_account(config)?;
        let message = Self::build_message(&account, outbound)?;
        let transport = self.transport(&account)?;

        match transport.send(message).await {
            Ok(_) => {
                debug!(config_id = config.id, "email sent");
                Ok(())
            }
            Err(e) => {
                let err = classify_smtp_error(&e);
                warn!(
                    config_id = config.id,
                    host = %account.host,
                    permanent = err.is_permanent(),
                    error = %e,
                    "email send failed"
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codec() -> Arc<SecretCodec> {
        Arc::new(SecretCodec::from_key([3u8; 32]))
    }

    fn config(codec: &SecretCodec, host: &str, port: &str, alias: &str) -> EmailConfig {
        EmailConfig {
            id: 1,
            app_channel_id: 1,
            name: "mail".into(),
            host: codec.encrypt(host).unwrap(),
            port: codec.encrypt(port).unwrap(),
            alias: codec.encrypt(alias).unwrap(),
            auth_email: codec.encrypt("ops@example.com").unwrap(),
            auth_pass: codec.encrypt("hunter2").unwrap(),
        }
    }

    fn sender(codec: Arc<SecretCodec>) -> EmailSender {
        EmailSender::new(codec, Duration::from_secs(2))
    }

    #[tokio::test]
    async fn undecryptable_config_is_permanent() {
        let codec = codec();
        let mut cfg = config(&codec, "127.0.0.1", "587", "Notify <n@example.com>");
        cfg.auth_pass = "not-a-ciphertext".into();

        let err = sender(codec).send(&Outbound::new("m", None), &cfg).await.unwrap_err();
        assert!(err.is_permanent());
        assert!(err.message.starts_with("decryption failed"));
    }

    #[tokio::test]
    async fn bad_port_is_permanent() {
        let codec = codec();
        let cfg = config(&codec, "127.0.0.1", "smtp", "Notify <n@example.com>");
        let err = sender(codec).send(&Outbound::new("m", None), &cfg).await.unwrap_err();
        assert!(err.is_permanent());
        assert!(err.message.contains("invalid smtp port"));
    }

    #[tokio::test]
    async fn malformed_alias_is_permanent() {
        let codec = codec();
        let cfg = config(&codec, "127.0.0.1", "587", "not an address");
        let err = sender(codec).send(&Outbound::new("m", None), &cfg).await.unwrap_err();
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn refused_connection_is_retryable() {
        let codec = codec();
        // Nothing listens on port 1.
        let cfg = config(&codec, "localhost", "1", "Notify <n@example.com>");
        let err = sender(codec).send(&Outbound::new("m", None), &cfg).await.unwrap_err();
        assert!(!err.is_permanent(), "expected retryable, got {err:?}");
    }

    #[test]
    fn message_uses_alias_recipient_and_subject() {
        let account = SmtpAccount {
            host: "smtp.example.com".into(),
            port: 587,
            alias: "Notify <alerts@example.com>".into(),
            auth_email: "ops@example.com".into(),
            auth_pass: "pw".into(),
        };
        let outbound = Outbound::new("disk full", Some(json!({"host": "db-1"}))).with_username("ada");
        let message = EmailSender::build_message(&account, &outbound).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("From: Notify <alerts@example.com>"));
        assert!(raw.contains("To: ops@example.com"));
        assert!(raw.contains("Subject: disk full"));
        assert!(raw.contains("Content-Type: text/html"));
    }
}
