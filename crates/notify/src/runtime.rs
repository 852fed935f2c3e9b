// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wires the store, codec, senders, and mailer from configuration.
//!
//! Each command builds exactly the pieces it needs and closes the database
//! itself; nothing here is global.

use std::sync::Arc;
use std::time::Duration;

use notify_config::NotifyConfig;
use notify_core::{NoticeSender, NotifyError};
use notify_discord::DiscordSender;
use notify_email::{EmailSender, LogNoticeSender, SmtpNoticeSender};
use notify_engine::{Dispatcher, QueueProcessor, Senders};
use notify_sms::SmsSender;
use notify_storage::Database;
use notify_vault::SecretCodec;
use secrecy::SecretString;
use tracing::{info, warn};

/// The environment variable that usually carries `vault.secret_salt`.
pub const SECRET_SALT_ENV_VAR: &str = "NOTIFY_VAULT_SECRET_SALT";

/// Derive the credential codec from the configured secret salt.
pub fn codec(config: &NotifyConfig) -> Result<Arc<SecretCodec>, NotifyError> {
    let salt = config.vault.secret_salt.clone().ok_or_else(|| {
        NotifyError::Config(format!(
            "vault.secret_salt is not set. Set {SECRET_SALT_ENV_VAR} or add it to notify.toml."
        ))
    })?;
    let codec = SecretCodec::from_salt(&SecretString::from(salt), &config.vault)?;
    Ok(Arc::new(codec))
}

/// Real senders for all three channel types.
pub fn senders(config: &NotifyConfig, codec: Arc<SecretCodec>) -> Result<Senders, NotifyError> {
    let email = EmailSender::new(codec.clone(), Duration::from_secs(config.smtp.timeout_secs));
    let sms = SmsSender::new(codec.clone(), &config.sms)?;
    let discord = DiscordSender::new(codec, &config.discord)?;
    Ok(Senders::new(Arc::new(email), Arc::new(sms), Arc::new(discord)))
}

/// The system mailer, or a logging stand-in when no relay is configured.
pub fn notices(config: &NotifyConfig) -> Result<Arc<dyn NoticeSender>, NotifyError> {
    match SmtpNoticeSender::from_config(&config.smtp)? {
        Some(mailer) => {
            info!("owner notices go through the configured smtp relay");
            Ok(Arc::new(mailer))
        }
        None => {
            warn!("smtp.host is not set, owner notices will only be logged");
            Ok(Arc::new(LogNoticeSender))
        }
    }
}

/// Everything the engine needs, built once per process.
pub struct Runtime {
    pub db: Database,
    pub senders: Senders,
    pub notices: Arc<dyn NoticeSender>,
}

impl Runtime {
    pub async fn build(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let codec = codec(config)?;
        let senders = senders(config, codec)?;
        let notices = notices(config)?;
        let db = Database::from_config(&config.storage).await?;
        Ok(Self {
            db,
            senders,
            notices,
        })
    }

    pub fn dispatcher(&self, config: &NotifyConfig) -> Dispatcher {
        Dispatcher::new(
            self.db.clone(),
            self.senders.clone(),
            self.notices.clone(),
            &config.queue,
        )
    }

    pub fn processor(&self, config: &NotifyConfig) -> QueueProcessor {
        QueueProcessor::new(self.db.clone(), self.senders.clone(), &config.queue)
    }
}
