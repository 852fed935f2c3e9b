// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Notify service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Notify configuration.
///
/// Every section is optional and defaults to values that run a single local
/// instance against `notify.db`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Channel credential encryption settings.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Durable job queue tuning.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Immediate dispatch work queue.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// System mailer used for owner notices.
    #[serde(default)]
    pub smtp: SmtpConfig,

    /// SMS provider settings.
    #[serde(default)]
    pub sms: TwilioConfig,

    /// Discord webhook settings.
    #[serde(default)]
    pub discord: DiscordWebhookConfig,

    /// Periodic task schedules.
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in log lines and service mail.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "notify".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("notify").join("notify.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("notify.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Channel credential encryption configuration.
///
/// The encryption key is derived from `secret_salt` with Argon2id. Changing
/// the salt or any KDF parameter makes previously stored credentials
/// undecryptable.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Shared secret the credential key is derived from. Usually supplied via
    /// `NOTIFY_VAULT_SECRET_SALT`.
    #[serde(default)]
    pub secret_salt: Option<String>,

    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB).
    #[serde(default = "default_kdf_memory_cost")]
    pub kdf_memory_cost: u32,

    /// Argon2id iteration count (default: 3).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Argon2id parallelism lanes (default: 4).
    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            secret_salt: None,
            kdf_memory_cost: default_kdf_memory_cost(),
            kdf_iterations: default_kdf_iterations(),
            kdf_parallelism: default_kdf_parallelism(),
        }
    }
}

fn default_kdf_memory_cost() -> u32 {
    65536
}

fn default_kdf_iterations() -> u32 {
    3
}

fn default_kdf_parallelism() -> u32 {
    4
}

/// Durable job queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Maximum jobs claimed per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Attempt ceiling for newly enqueued jobs.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// A `processing` job untouched for this long is presumed abandoned.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,

    /// Completed jobs older than this are deleted by cleanup.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Jobs executed concurrently within one batch. 1 keeps strict claim order.
    #[serde(default = "default_queue_workers")]
    pub workers: usize,

    /// Mark a job failed on its first permanent send error instead of
    /// spending the remaining attempts.
    #[serde(default)]
    pub fail_fast_on_permanent: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            stale_after_secs: default_stale_after_secs(),
            retention_days: default_retention_days(),
            workers: default_queue_workers(),
            fail_fast_on_permanent: false,
        }
    }
}

fn default_batch_size() -> usize {
    100
}

fn default_max_attempts() -> u32 {
    5
}

fn default_stale_after_secs() -> u64 {
    300
}

fn default_retention_days() -> u32 {
    7
}

fn default_queue_workers() -> usize {
    1
}

/// Immediate dispatch work queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Pending dispatch events held before `submit` reports backpressure.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Dispatch events processed concurrently.
    #[serde(default = "default_dispatch_workers")]
    pub workers: usize,

    /// Seconds to wait for in-flight dispatches on shutdown.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            workers: default_dispatch_workers(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_dispatch_workers() -> usize {
    4
}

fn default_drain_timeout_secs() -> u64 {
    30
}

/// System mailer configuration (owner notices, not app channels).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmtpConfig {
    /// SMTP relay host. `None` disables owner notices (they are logged instead).
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Sender mailbox, e.g. `Notify <noreply@example.com>`.
    #[serde(default = "default_smtp_from")]
    pub from: String,

    /// Use STARTTLS instead of implicit TLS.
    #[serde(default = "default_starttls")]
    pub starttls: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_smtp_port(),
            username: None,
            password: None,
            from: default_smtp_from(),
            starttls: default_starttls(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_from() -> String {
    "Notify <noreply@localhost>".to_string()
}

fn default_starttls() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

/// SMS provider (Twilio) configuration. Credentials live per channel.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TwilioConfig {
    /// Base URL of the Twilio REST API.
    #[serde(default = "default_twilio_api_base")]
    pub api_base: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            api_base: default_twilio_api_base(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_twilio_api_base() -> String {
    "https://api.twilio.com".to_string()
}

/// Discord webhook configuration. Webhook URLs live per channel.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiscordWebhookConfig {
    /// Username shown on webhook posts.
    #[serde(default = "default_discord_username")]
    pub username: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DiscordWebhookConfig {
    fn default() -> Self {
        Self {
            username: default_discord_username(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_discord_username() -> String {
    "notify".to_string()
}

/// Cron expressions (5-field, UTC) for the periodic tasks run by `serve`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Run the scheduler inside `serve`. Disable when an external cron
    /// invokes `notify process` instead.
    #[serde(default = "default_schedule_enabled")]
    pub enabled: bool,

    #[serde(default = "default_process_jobs")]
    pub process_jobs: String,

    #[serde(default = "default_cleanup_jobs")]
    pub cleanup_jobs: String,

    #[serde(default = "default_reset_quotas")]
    pub reset_quotas: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: default_schedule_enabled(),
            process_jobs: default_process_jobs(),
            cleanup_jobs: default_cleanup_jobs(),
            reset_quotas: default_reset_quotas(),
        }
    }
}

fn default_schedule_enabled() -> bool {
    true
}

fn default_process_jobs() -> String {
    "* * * * *".to_string()
}

fn default_cleanup_jobs() -> String {
    "0 1 * * *".to_string()
}

fn default_reset_quotas() -> String {
    "0 0 * * *".to_string()
}
