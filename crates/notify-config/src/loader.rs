// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./notify.toml` > `~/.config/notify/notify.toml` > `/etc/notify/notify.toml`,
//! with environment variable overrides via the `NOTIFY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::NotifyConfig;

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/notify/notify.toml";

/// Config sections that env vars can address. `NOTIFY_QUEUE_BATCH_SIZE`
/// becomes `queue.batch_size`.
const SECTIONS: &[&str] = &[
    "service", "storage", "vault", "queue", "dispatch", "smtp", "sms", "discord", "schedule",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/notify/notify.toml`
/// 3. `~/.config/notify/notify.toml`
/// 4. `./notify.toml`
/// 5. `NOTIFY_*` environment variables
pub fn load_config() -> Result<NotifyConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<NotifyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NotifyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<NotifyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NotifyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(NotifyConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("notify/notify.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("notify.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `NOTIFY_QUEUE_MAX_ATTEMPTS` must map to `queue.max_attempts`,
/// not `queue.max.attempts`.
fn env_provider() -> Env {
    Env::prefixed("NOTIFY_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("queue_batch_size"), "queue.batch_size");
        assert_eq!(map_env_key("vault_secret_salt"), "vault.secret_salt");
        assert_eq!(
            map_env_key("queue_fail_fast_on_permanent"),
            "queue.fail_fast_on_permanent"
        );
        assert_eq!(map_env_key("unknown_key"), "unknown_key");
    }

    #[test]
    fn env_override_wins_over_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("notify.toml", "[queue]\nbatch_size = 10\n")?;
            jail.set_env("NOTIFY_QUEUE_BATCH_SIZE", "25");
            let config = load_config_from_path(Path::new("notify.toml"))?;
            assert_eq!(config.queue.batch_size, 25);
            Ok(())
        });
    }
}
