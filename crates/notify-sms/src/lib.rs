// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMS channel for the Notify fan-out service, backed by the Twilio
//! Messages REST API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notify_config::model::TwilioConfig;
use notify_core::{ChannelSender, NotifyError, Outbound, SendError, SmsConfig};
use notify_vault::{mask_secret, SecretCodec};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Form fields of a Twilio "create message" request.
#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    #[serde(rename = "To")]
    to: &'a str,
    #[serde(rename = "From")]
    from: &'a str,
    #[serde(rename = "Body")]
    body: &'a str,
}

/// The part of Twilio's response we log.
#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

/// Sends notifications as text messages through the channel's Twilio account.
pub struct SmsSender {
    client: reqwest::Client,
    codec: Arc<SecretCodec>,
    api_base: String,
}

impl SmsSender {
    pub fn new(codec: Arc<SecretCodec>, config: &TwilioConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            codec,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Message text: the notification followed by its details as JSON.
    pub fn body(outbound: &Outbound) -> String {
        format!("{}\n\n{}", outbound.message, outbound.details_json())
    }
}

#[async_trait]
impl ChannelSender<SmsConfig> for SmsSender {
    async fn send(&self, outbound: &Outbound, config: &SmsConfig) -> Result<(), SendError> {
        let account_sid = self.codec.decrypt(&config.account_sid)?;
        let auth_token = self.codec.decrypt(&config.auth_token)?;
        let from = self.codec.decrypt(&config.from_phone_number)?;
        let to = self.codec.decrypt(&config.phone_number)?;

        let body = Self::body(outbound);
        let form = serde_urlencoded::to_string(CreateMessage {
            to: &to,
            from: &from,
            body: &body,
        })
        .map_err(|e| SendError::permanent(format!("failed to encode sms form: {e}")))?;

        let url = format!("{}/2010-04-01/Accounts/{account_sid}/Messages.json", self.api_base);
        let response = self
            .client
            .post(&url)
            .basic_auth(&account_sid, Some(&auth_token))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    SendError::permanent(format!("twilio request: {e}"))
                } else {
                    SendError::retryable(format!("twilio request: {e}"))
                }
            })?;

        let status = response.status();
        if status.is_success() {
            match response.json::<MessageResource>().await {
                Ok(resource) => debug!(config_id = config.id, sid = %resource.sid, "sms sent"),
                Err(_) => debug!(config_id = config.id, "sms sent"),
            }
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        warn!(
            config_id = config.id,
            account = %mask_secret(&account_sid),
            status = status.as_u16(),
            "twilio rejected sms"
        );
        Err(SendError::from_status(
            status.as_u16(),
            format!("twilio returned {status}: {text}"),
        ))
    }
}
