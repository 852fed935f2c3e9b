// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Notify configuration system.

use notify_config::diagnostic::ConfigError;
use notify_config::model::NotifyConfig;
use notify_config::{load_and_validate_str, load_config_from_str};

#[test]
fn valid_toml_deserializes_into_notify_config() {
    let toml = r#"
[service]
name = "notify-test"
log_level = "debug"

[storage]
database_path = "/tmp/notify.db"
wal_mode = false

[vault]
secret_salt = "pepper"

[queue]
batch_size = 50
max_attempts = 3
stale_after_secs = 120
retention_days = 14
workers = 4
fail_fast_on_permanent = true

[dispatch]
queue_capacity = 16
workers = 2

[smtp]
host = "smtp.example.com"
port = 465
starttls = false
from = "Notify <noreply@example.com>"

[sms]
api_base = "http://localhost:9000"

[discord]
username = "notify.example"

[schedule]
enabled = false
process_jobs = "*/2 * * * *"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.name, "notify-test");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/notify.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.vault.secret_salt.as_deref(), Some("pepper"));
    assert_eq!(config.queue.batch_size, 50);
    assert_eq!(config.queue.max_attempts, 3);
    assert_eq!(config.queue.stale_after_secs, 120);
    assert_eq!(config.queue.retention_days, 14);
    assert_eq!(config.queue.workers, 4);
    assert!(config.queue.fail_fast_on_permanent);
    assert_eq!(config.dispatch.queue_capacity, 16);
    assert_eq!(config.smtp.host.as_deref(), Some("smtp.example.com"));
    assert_eq!(config.smtp.port, 465);
    assert!(!config.smtp.starttls);
    assert_eq!(config.sms.api_base, "http://localhost:9000");
    assert_eq!(config.discord.username, "notify.example");
    assert!(!config.schedule.enabled);
    assert_eq!(config.schedule.process_jobs, "*/2 * * * *");
    assert_eq!(config.schedule.cleanup_jobs, "0 1 * * *");
}

#[test]
fn empty_toml_uses_queue_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.service.name, "notify");
    assert_eq!(config.queue.batch_size, 100);
    assert_eq!(config.queue.max_attempts, 5);
    assert_eq!(config.queue.stale_after_secs, 300);
    assert_eq!(config.queue.retention_days, 7);
    assert_eq!(config.queue.workers, 1);
    assert!(!config.queue.fail_fast_on_permanent);
    assert!(config.vault.secret_salt.is_none());
    assert!(config.smtp.host.is_none());
    assert_eq!(config.sms.api_base, "https://api.twilio.com");
    assert_eq!(config.schedule.process_jobs, "* * * * *");
    assert_eq!(config.schedule.reset_quotas, "0 0 * * *");
}

#[test]
fn unknown_field_in_queue_is_rejected() {
    let toml = r#"
[queue]
batch_sise = 10
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("batch_sise"),
        "error should mention the bad key, got: {err_str}"
    );
}

#[test]
fn unknown_key_diagnostic_suggests_correction() {
    let toml = r#"
[queue]
batch_sise = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => {
            assert_eq!(key, "batch_sise");
            assert_eq!(suggestion.as_deref(), Some("batch_size"));
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

#[test]
fn wrong_type_produces_invalid_type() {
    let toml = r#"
[queue]
max_attempts = "five"
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail");
    assert!(matches!(errors[0], ConfigError::InvalidType { .. }));
}

#[test]
fn unknown_section_is_rejected() {
    let errors = load_and_validate_str("[telegram]\nbot_token = \"x\"\n").expect_err("should fail");
    assert!(matches!(errors[0], ConfigError::UnknownKey { .. }));
}

#[test]
fn validation_errors_surface_through_load_and_validate() {
    let toml = r#"
[queue]
batch_size = 0

[schedule]
reset_quotas = "not a cron"
"#;

    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert_eq!(errors.len(), 2);
    assert!(
        errors
            .iter()
            .all(|e| matches!(e, ConfigError::Validation { .. }))
    );
}

#[test]
fn defaults_round_trip_through_figment() {
    use figment::{Figment, providers::Serialized};

    let config: NotifyConfig = Figment::new()
        .merge(Serialized::defaults(NotifyConfig::default()))
        .merge(("queue.max_attempts", 8))
        .extract()
        .expect("dot-notation override should apply");

    assert_eq!(config.queue.max_attempts, 8);
    assert_eq!(config.queue.batch_size, 100);
}
