// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, positive queue limits, and parseable cron schedules.

use std::str::FromStr;

use croner::Cron;

use crate::diagnostic::ConfigError;
use crate::model::NotifyConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &NotifyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        invalid(format!(
            "service.log_level `{}` must be one of: {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        invalid("storage.database_path must not be empty".to_string());
    }

    if let Some(salt) = &config.vault.secret_salt
        && salt.trim().is_empty()
    {
        invalid("vault.secret_salt must not be empty when set".to_string());
    }

    if config.vault.kdf_memory_cost < 32768 {
        invalid(format!(
            "vault.kdf_memory_cost must be at least 32768 (32 MiB), got {}",
            config.vault.kdf_memory_cost
        ));
    }

    if config.vault.kdf_iterations < 2 {
        invalid(format!(
            "vault.kdf_iterations must be at least 2, got {}",
            config.vault.kdf_iterations
        ));
    }

    if config.vault.kdf_parallelism < 1 {
        invalid(format!(
            "vault.kdf_parallelism must be at least 1, got {}",
            config.vault.kdf_parallelism
        ));
    }

    for (key, value) in [
        ("queue.batch_size", config.queue.batch_size),
        ("queue.workers", config.queue.workers),
        ("dispatch.queue_capacity", config.dispatch.queue_capacity),
        ("dispatch.workers", config.dispatch.workers),
    ] {
        if value == 0 {
            invalid(format!("{key} must be at least 1"));
        }
    }

    if config.queue.max_attempts == 0 {
        invalid("queue.max_attempts must be at least 1".to_string());
    }

    if config.queue.retention_days == 0 {
        invalid("queue.retention_days must be at least 1".to_string());
    }

    if config.smtp.from.trim().is_empty() {
        invalid("smtp.from must not be empty".to_string());
    }

    if !config.sms.api_base.starts_with("http://") && !config.sms.api_base.starts_with("https://")
    {
        invalid(format!(
            "sms.api_base `{}` must be an http(s) URL",
            config.sms.api_base
        ));
    }

    for (key, expr) in [
        ("schedule.process_jobs", &config.schedule.process_jobs),
        ("schedule.cleanup_jobs", &config.schedule.cleanup_jobs),
        ("schedule.reset_quotas", &config.schedule.reset_quotas),
    ] {
        if let Err(e) = Cron::from_str(expr) {
            invalid(format!("{key} `{expr}` is not a valid cron expression: {e}"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
