// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routes a [`ChannelConfig`] to the sender for its channel type.

use std::sync::Arc;

use notify_core::{
    ChannelConfig, ChannelSender, DiscordConfig, EmailConfig, Outbound, SendError, SmsConfig,
};

/// The three channel senders, one per [`ChannelConfig`] variant.
#[derive(Clone)]
pub struct Senders {
    email: Arc<dyn ChannelSender<EmailConfig>>,
    sms: Arc<dyn ChannelSender<SmsConfig>>,
    discord: Arc<dyn ChannelSender<DiscordConfig>>,
}

impl Senders {
    pub fn new(
        email: Arc<dyn ChannelSender<EmailConfig>>,
        sms: Arc<dyn ChannelSender<SmsConfig>>,
        discord: Arc<dyn ChannelSender<DiscordConfig>>,
    ) -> Self {
        Self {
            email,
            sms,
            discord,
        }
    }

    /// Use one sender for every channel type.
    pub fn uniform<S>(sender: Arc<S>) -> Self
    where
        S: ChannelSender<EmailConfig>
            + ChannelSender<SmsConfig>
            + ChannelSender<DiscordConfig>
            + 'static,
    {
        Self {
            email: sender.clone(),
            sms: sender.clone(),
            discord: sender,
        }
    }

    pub async fn send(&self, config: &ChannelConfig, outbound: &Outbound) -> Result<(), SendError> {
        match config {
            ChannelConfig::Email(c) => self.email.send(outbound, c).await,
            ChannelConfig::Sms(c) => self.sms.send(outbound, c).await,
            ChannelConfig::Discord(c) => self.discord.send(outbound, c).await,
        }
    }
}

impl std::fmt::Debug for Senders {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Senders").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify_core::JobKind;
    use notify_test_utils::MockSender;

    #[tokio::test]
    async fn routes_each_variant_to_its_sender() {
        let email = Arc::new(MockSender::new());
        let discord = Arc::new(MockSender::failing(SendError::retryable("500")));
        let senders = Senders::new(email.clone(), Arc::new(MockSender::new()), discord.clone());
        let outbound = Outbound::new("m", None);

        let email_config = ChannelConfig::Email(EmailConfig {
            id: 1,
            app_channel_id: 1,
            name: "mail".into(),
            host: "h".into(),
            port: "587".into(),
            alias: "a".into(),
            auth_email: "e".into(),
            auth_pass: "p".into(),
        });
        let discord_config = ChannelConfig::Discord(DiscordConfig {
            id: 2,
            app_channel_id: 2,
            name: "hook".into(),
            webhook_url: "w".into(),
        });

        assert!(senders.send(&email_config, &outbound).await.is_ok());
        assert!(senders.send(&discord_config, &outbound).await.is_err());

        assert_eq!(email.calls().await[0].kind, JobKind::Email);
        assert_eq!(discord.calls().await[0].kind, JobKind::Discord);
        assert_eq!(email.call_count().await, 1);
    }
}
