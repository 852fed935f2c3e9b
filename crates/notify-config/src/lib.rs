// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Notify fan-out service.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, `NOTIFY_*` environment variable overrides, and
//! miette diagnostic rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use notify_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("queue batch size: {}", config.queue.batch_size);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError, SourceFile};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::NotifyConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// On a Figment error the TOML sources are re-read so diagnostics can point
/// at the offending span.
pub fn load_and_validate() -> Result<NotifyConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let toml_sources = collect_toml_sources();
            Err(diagnostic::figment_to_config_errors(err, &toml_sources))
        }
    }
}

/// Load configuration from an explicit file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &std::path::Path) -> Result<NotifyConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = std::fs::read_to_string(path)
                .map(|content| vec![SourceFile::new(path.display().to_string(), content)])
                .unwrap_or_default();
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<NotifyConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![SourceFile::new(diagnostic::INLINE_SOURCE, toml_content)];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

fn collect_toml_sources() -> Vec<SourceFile> {
    let mut sources = Vec::new();

    if let Ok(content) = std::fs::read_to_string("notify.toml") {
        let path = std::env::current_dir()
            .map(|d| d.join("notify.toml").display().to_string())
            .unwrap_or_else(|_| "notify.toml".to_string());
        sources.push(SourceFile::new(path, content));
    }

    if let Some(config_dir) = dirs::config_dir() {
        let path = config_dir.join("notify/notify.toml");
        if let Ok(content) = std::fs::read_to_string(&path) {
            sources.push(SourceFile::new(path.display().to_string(), content));
        }
    }

    let system_path = std::path::Path::new(loader::SYSTEM_CONFIG_PATH);
    if let Ok(content) = std::fs::read_to_string(system_path) {
        sources.push(SourceFile::new(system_path.display().to_string(), content));
    }

    sources
}
