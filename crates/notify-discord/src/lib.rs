// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discord webhook channel for the Notify fan-out service.
//!
//! Discord answers a successful webhook execution with `204 No Content`;
//! every other status is treated as a failed send.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notify_config::model::DiscordWebhookConfig;
use notify_core::{ChannelSender, DiscordConfig, NotifyError, Outbound, SendError};
use notify_vault::{mask_secret, SecretCodec};
use reqwest::{StatusCode, Url};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Posts notifications to each channel's Discord webhook.
pub struct DiscordSender {
    client: reqwest::Client,
    codec: Arc<SecretCodec>,
    username: String,
}

impl DiscordSender {
    pub fn new(codec: Arc<SecretCodec>, config: &DiscordWebhookConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            codec,
            username: config.username.clone(),
        })
    }

    /// Webhook body. The embed carries the details and is omitted without them.
    pub fn build_payload(&self, outbound: &Outbound) -> Value {
        let mut payload = json!({
            "username": self.username,
            "content": outbound.message,
        });
        if outbound.details.is_some() {
            payload["embeds"] = json!([{
                "title": outbound.message,
                "description": outbound.details_json(),
            }]);
        }
        payload
    }
}

#[async_trait]
impl ChannelSender<DiscordConfig> for DiscordSender {
    async fn send(&self, outbound: &Outbound, config: &DiscordConfig) -> Result<(), SendError> {
        let webhook_url = self.codec.decrypt(&config.webhook_url)?;
        let url = Url::parse(&webhook_url).map_err(|e| {
            SendError::permanent(format!("invalid webhook url {}: {e}", mask_secret(&webhook_url)))
        })?;

        let response = self
            .client
            .post(url)
            .json(&self.build_payload(outbound))
            .send()
            .await
            .map_err(|e| SendError::retryable(format!("discord request: {e}")))?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            debug!(config_id = config.id, "discord notification sent");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(
            config_id = config.id,
            webhook = %mask_secret(&webhook_url),
            status = status.as_u16(),
            "discord webhook failed"
        );
        Err(SendError::from_status(
            status.as_u16(),
            format!("discord webhook failed with status {status}: {body}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify_core::SendErrorKind;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn codec() -> Arc<SecretCodec> {
        Arc::new(SecretCodec::from_key([9u8; 32]))
    }

    fn sender(codec: Arc<SecretCodec>) -> DiscordSender {
        DiscordSender::new(codec, &DiscordWebhookConfig::default()).unwrap()
    }

    fn config(codec: &SecretCodec, url: &str) -> DiscordConfig {
        DiscordConfig {
            id: 1,
            app_channel_id: 1,
            name: "ops".into(),
            webhook_url: codec.encrypt(url).unwrap(),
        }
    }

    #[test]
    fn payload_omits_embeds_without_details() {
        let s = sender(codec());
        let payload = s.build_payload(&Outbound::new("deploy done", None));
        assert_eq!(payload, json!({"username": "notify", "content": "deploy done"}));
    }

    #[tokio::test]
    async fn no_content_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/webhooks/1/abc"))
            .and(body_json(json!({
                "username": "notify",
                "content": "disk full",
                "embeds": [{"title": "disk full", "description": "{\"host\":\"db-1\"}"}]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let codec = codec();
        let cfg = config(&codec, &format!("{}/api/webhooks/1/abc", server.uri()));
        let outbound = Outbound::new("disk full", Some(json!({"host": "db-1"})));
        sender(codec).send(&outbound, &cfg).await.unwrap();
    }

    #[tokio::test]
    async fn ok_with_body_is_not_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let codec = codec();
        let cfg = config(&codec, &server.uri());
        let err = sender(codec).send(&Outbound::new("m", None), &cfg).await.unwrap_err();
        assert_eq!(err.status, Some(200));
    }

    #[tokio::test]
    async fn status_classification() {
        for (status, kind) in [
            (500, SendErrorKind::Retryable),
            (429, SendErrorKind::Retryable),
            (404, SendErrorKind::Permanent),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let codec = codec();
            let cfg = config(&codec, &server.uri());
            let err = sender(codec).send(&Outbound::new("m", None), &cfg).await.unwrap_err();
            assert_eq!(err.kind, kind, "status {status}");
            assert_eq!(err.status, Some(status));
        }
    }

    #[tokio::test]
    async fn unreachable_host_is_retryable() {
        let codec = codec();
        let cfg = config(&codec, "http://127.0.0.1:1/api/webhooks/1/abc");
        let err = sender(codec).send(&Outbound::new("m", None), &cfg).await.unwrap_err();
        assert_eq!(err.kind, SendErrorKind::Retryable);
        assert_eq!(err.status, None);
    }

    #[tokio::test]
    async fn garbage_url_is_permanent() {
        let codec = codec();
        let cfg = config(&codec, "not a url");
        let err = sender(codec).send(&Outbound::new("m", None), &cfg).await.unwrap_err();
        assert!(err.is_permanent());
        assert!(err.message.contains("invalid webhook url"));
    }

    #[tokio::test]
    async fn undecryptable_url_is_permanent() {
        let codec = codec();
        let cfg = DiscordConfig {
            webhook_url: "garbage".into(),
            ..config(&codec, "http://example.com")
        };
        let err = sender(codec).send(&Outbound::new("m", None), &cfg).await.unwrap_err();
        assert!(err.is_permanent());
        assert!(err.message.starts_with("decryption failed"));
    }
}
