// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the storage, channel, and engine crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::error::NotifyError;

/// Channel type of a job, matching the `channel_types.name` and `jobs.type` columns.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Email,
    Sms,
    Discord,
}

/// Lifecycle state of a job row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// `completed` and `failed` admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A durable, retryable unit of deferred channel delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: i64,
    pub kind: JobKind,
    /// Serialized [`JobPayload`].
    pub payload: String,
    pub status: JobStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub error: Option<String>,
    pub run_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Decode the payload into the channel config variant for this job's kind.
    pub fn delivery(&self) -> Result<(ChannelConfig, Outbound), NotifyError> {
        let payload: JobPayload = serde_json::from_str(&self.payload)
            .map_err(|e| NotifyError::Payload(format!("job {}: {e}", self.id)))?;
        payload.into_delivery(self.kind)
    }
}

/// The message being delivered, independent of the channel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Outbound {
    pub message: String,
    #[serde(default)]
    pub details: Option<Value>,
    /// Owner's username, used by the email greeting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Outbound {
    pub fn new(message: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            message: message.into(),
            details,
            username: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Compact JSON rendering of the details, `"null"` when absent.
    pub fn details_json(&self) -> String {
        match &self.details {
            Some(details) => details.to_string(),
            None => "null".to_string(),
        }
    }
}

/// SMTP credentials for an email channel. Every string field is stored encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailConfig {
    pub id: i64,
    pub app_channel_id: i64,
    pub name: String,
    pub host: String,
    pub port: String,
    pub alias: String,
    pub auth_email: String,
    pub auth_pass: String,
}

/// Twilio credentials for an SMS channel. Every string field is stored encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsConfig {
    pub id: i64,
    pub app_channel_id: i64,
    pub name: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from_phone_number: String,
    pub phone_number: String,
}

/// Discord webhook channel. `webhook_url` is stored encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub id: i64,
    pub app_channel_id: i64,
    pub name: String,
    pub webhook_url: String,
}

/// One configured delivery destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelConfig {
    Email(EmailConfig),
    Sms(SmsConfig),
    Discord(DiscordConfig),
}

impl ChannelConfig {
    pub fn kind(&self) -> JobKind {
        match self {
            ChannelConfig::Email(_) => JobKind::Email,
            ChannelConfig::Sms(_) => JobKind::Sms,
            ChannelConfig::Discord(_) => JobKind::Discord,
        }
    }

    /// Config row id, used in log fields.
    pub fn id(&self) -> i64 {
        match self {
            ChannelConfig::Email(c) => c.id,
            ChannelConfig::Sms(c) => c.id,
            ChannelConfig::Discord(c) => c.id,
        }
    }

    fn to_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            ChannelConfig::Email(c) => serde_json::to_value(c),
            ChannelConfig::Sms(c) => serde_json::to_value(c),
            ChannelConfig::Discord(c) => serde_json::to_value(c),
        }
    }
}

/// Stored form of a job's work: the full config reference plus the message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPayload {
    pub config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub message: String,
    #[serde(default)]
    pub details: Option<Value>,
}

impl JobPayload {
    pub fn new(config: &ChannelConfig, outbound: &Outbound) -> Result<Self, NotifyError> {
        let config = config
            .to_value()
            .map_err(|e| NotifyError::Payload(e.to_string()))?;
        Ok(Self {
            config,
            username: outbound.username.clone(),
            message: outbound.message.clone(),
            details: outbound.details.clone(),
        })
    }

    pub fn to_json(&self) -> Result<String, NotifyError> {
        serde_json::to_string(self).map_err(|e| NotifyError::Payload(e.to_string()))
    }

    /// Rebuild the typed config for `kind`. A config that does not match the
    /// job's kind is a payload error.
    pub fn into_delivery(self, kind: JobKind) -> Result<(ChannelConfig, Outbound), NotifyError> {
        let bad = |e: serde_json::Error| NotifyError::Payload(format!("{kind} config: {e}"));
        let config = match kind {
            JobKind::Email => ChannelConfig::Email(serde_json::from_value(self.config).map_err(bad)?),
            JobKind::Sms => ChannelConfig::Sms(serde_json::from_value(self.config).map_err(bad)?),
            JobKind::Discord => {
                ChannelConfig::Discord(serde_json::from_value(self.config).map_err(bad)?)
            }
        };
        let outbound = Outbound {
            message: self.message,
            details: self.details,
            username: self.username,
        };
        Ok((config, outbound))
    }
}

/// A tenant-registered notification source.
#[derive(Debug, Clone, PartialEq)]
pub struct App {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub is_active: bool,
    pub max_monthly_alerts_allowed: i64,
    pub user_monthly_limit_threshold: Option<i64>,
    pub alerts_sent_this_month: i64,
    pub alerts_reset_date: DateTime<Utc>,
}

/// The owner of one or more apps.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    /// IANA timezone name used for the monthly reset boundary.
    pub timezone: String,
}

/// Immutable record of a dispatch event.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub app_id: i64,
    pub message: String,
    pub details: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// A service email to an app owner (quota notices, monthly reset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub email: String,
    pub username: String,
    pub subject: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn discord() -> ChannelConfig {
        ChannelConfig::Discord(DiscordConfig {
            id: 7,
            app_channel_id: 3,
            name: "alerts".into(),
            webhook_url: "ciphertext".into(),
        })
    }

    #[test]
    fn payload_rebuilds_the_same_delivery() {
        let outbound = Outbound::new("disk full", Some(json!({"host": "db-1"})));
        let payload = JobPayload::new(&discord(), &outbound).unwrap();
        let (config, decoded) = payload.into_delivery(JobKind::Discord).unwrap();
        assert_eq!(config, discord());
        assert_eq!(decoded, outbound);
    }

    #[test]
    fn payload_with_mismatched_kind_is_rejected() {
        let payload = JobPayload::new(&discord(), &Outbound::new("x", None)).unwrap();
        let err = payload.into_delivery(JobKind::Email).unwrap_err();
        assert!(matches!(err, NotifyError::Payload(_)));
    }

    #[test]
    fn username_is_omitted_when_absent() {
        let payload = JobPayload::new(&discord(), &Outbound::new("x", None)).unwrap();
        let json = payload.to_json().unwrap();
        assert!(!json.contains("username"));

        let with_user = Outbound::new("x", None).with_username("ada");
        let json = JobPayload::new(&discord(), &with_user).unwrap().to_json().unwrap();
        assert!(json.contains(r#""username":"ada""#));
    }

    #[test]
    fn details_json_renders_null_when_absent() {
        assert_eq!(Outbound::new("x", None).details_json(), "null");
        assert_eq!(
            Outbound::new("x", Some(json!({"a": 1}))).details_json(),
            r#"{"a":1}"#
        );
    }
}
