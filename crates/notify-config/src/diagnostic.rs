// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns figment extraction failures into miette diagnostics.
//!
//! Unknown keys get a Jaro-Winkler "did you mean" hint. When the offending
//! TOML file is known, the diagnostic carries a span pointing at the key.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Scores at or below this are not worth suggesting.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Path given to a [`SourceFile`] built from a string rather than a file.
pub const INLINE_SOURCE: &str = "<inline>";

/// A TOML file that took part in the merge, kept for span lookup.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    fn label(&self, section: Option<&str>, key: &str) -> Option<(SourceSpan, NamedSource<String>)> {
        let offset = locate_key(&self.content, section, key)?;
        Some((
            SourceSpan::new(offset.into(), key.len()),
            NamedSource::new(&self.path, self.content.clone()),
        ))
    }
}

/// One problem found while loading configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(code(notify::config::unknown_key), help("{}", unknown_key_help(suggestion.as_deref(), valid_keys)))]
    UnknownKey {
        key: String,
        /// Closest valid key, if any is close enough.
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(notify::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(code(notify::config::missing_key), help("add `{key} = <value>` to notify.toml"))]
    MissingKey { key: String },

    /// A value that parsed but is not acceptable.
    #[error("validation error: {message}")]
    #[diagnostic(code(notify::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(notify::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Split every error inside a `figment::Error` into a [`ConfigError`].
pub fn figment_to_config_errors(err: figment::Error, sources: &[SourceFile]) -> Vec<ConfigError> {
    err.into_iter().map(|e| convert(&e, sources)).collect()
}

fn convert(error: &figment::Error, sources: &[SourceFile]) -> ConfigError {
    let section = error.path.first().map(String::as_str);
    let file = origin(error, sources);

    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let (span, src) = file.and_then(|f| f.label(section, field)).unzip();
            ConfigError::UnknownKey {
                key: field.clone(),
                suggestion: suggest_key(field, expected),
                valid_keys: expected.join(", "),
                span,
                src,
            }
        }
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: dotted(&error.path, field),
        },
        Kind::InvalidType(found, expected) => {
            let leaf = error.path.last().map(String::as_str).unwrap_or_default();
            let parent = (error.path.len() > 1).then_some(section).flatten();
            let (span, src) = file.and_then(|f| f.label(parent, leaf)).unzip();
            ConfigError::InvalidType {
                key: error.path.join("."),
                found: found.to_string(),
                expected: expected.clone(),
                span,
                src,
            }
        }
        _ => ConfigError::Other(error.to_string()),
    }
}

fn dotted(path: &[String], field: &str) -> String {
    path.iter()
        .map(String::as_str)
        .chain(std::iter::once(field))
        .collect::<Vec<_>>()
        .join(".")
}

/// The merged file an error came from. Errors without a file origin are
/// attributed to an inline source, if one was given.
fn origin<'a>(error: &figment::Error, sources: &'a [SourceFile]) -> Option<&'a SourceFile> {
    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });
    let wanted = file.as_deref().unwrap_or(INLINE_SOURCE);
    sources.iter().find(|s| s.path == wanted)
}

/// Byte offset of `key` at the start of a line inside `[section]`, or at top
/// level when `section` is `None`.
pub fn locate_key(content: &str, section: Option<&str>, key: &str) -> Option<usize> {
    let mut current: Option<&str> = None;
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            current = Some(header.trim());
        } else if current == section {
            let indent = line.len() - line.trim_start().len();
            let rest = line.trim_start().strip_prefix(key);
            if rest.is_some_and(|r| r.trim_start().starts_with('=')) {
                return Some(offset + indent);
            }
        }
        offset += line.len();
    }
    None
}

/// Closest candidate to `unknown` by Jaro-Winkler similarity.
pub fn suggest_key(unknown: &str, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|c| (strsim::jaro_winkler(unknown, c), *c))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c.to_string())
}

/// Print each error to stderr with miette's graphical renderer.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUEUE_KEYS: &[&str] = &["batch_size", "max_attempts", "stale_after_secs", "workers"];

    #[test]
    fn suggests_batch_size_for_transposed_typo() {
        assert_eq!(suggest_key("batch_sise", QUEUE_KEYS).as_deref(), Some("batch_size"));
    }

    #[test]
    fn suggests_webhook_section_key() {
        assert_eq!(
            suggest_key("usernme", &["username", "timeout_secs"]).as_deref(),
            Some("username")
        );
    }

    #[test]
    fn distant_typo_gets_no_suggestion() {
        assert_eq!(suggest_key("zzzzzz", QUEUE_KEYS), None);
    }

    #[test]
    fn key_is_located_inside_its_section_only() {
        let content = "workers = 1\n[dispatch]\nworkers = 2\n[queue]\n  workers = 3\n";
        let at = locate_key(content, Some("queue"), "workers").unwrap();
        assert_eq!(&content[at..at + 11], "workers = 3");
        assert_eq!(locate_key(content, None, "workers"), Some(0));
    }

    #[test]
    fn key_prefix_does_not_match_longer_key() {
        let content = "[queue]\nworkers_extra = 1\n";
        assert_eq!(locate_key(content, Some("queue"), "workers"), None);
    }

    #[test]
    fn missing_section_locates_nothing() {
        assert_eq!(locate_key("[service]\nname = \"n\"\n", Some("queue"), "workers"), None);
    }

    #[test]
    fn unknown_key_carries_span_into_inline_source() {
        let toml = "[queue]\nbatch_sise = 10\n";
        let err = crate::loader::load_config_from_str(toml).unwrap_err();
        let errors = figment_to_config_errors(err, &[SourceFile::new(INLINE_SOURCE, toml)]);
        match &errors[0] {
            ConfigError::UnknownKey { span, .. } => assert_eq!(span.map(|s| s.offset()), Some(8)),
            other => panic!("expected UnknownKey, got {other:?}"),
        }
    }
}
