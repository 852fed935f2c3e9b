// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Notify fan-out service.

use strum::Display;
use thiserror::Error;

/// The primary error type used across Notify crates.
///
/// Only [`NotifyError::Storage`] is allowed to abort a dispatch or a queue
/// batch; every other failure is contained to a single channel or job.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database unavailable, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An app, user, channel, or job row that the caller referenced does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A stored credential could not be decrypted (tampered, foreign key, bad encoding).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Key derivation or encryption failure.
    #[error("vault error: {0}")]
    Vault(String),

    /// A channel send failed.
    #[error(transparent)]
    Send(#[from] SendError),

    /// A job payload could not be serialized or decoded for its job type.
    #[error("invalid job payload: {0}")]
    Payload(String),

    /// The dispatch work queue is at capacity.
    #[error("dispatch queue is full")]
    QueueFull,

    /// The dispatch work queue has been shut down.
    #[error("dispatch queue is closed")]
    QueueClosed,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Classification of a channel send failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SendErrorKind {
    /// Transient transport failure: timeout, refused connection, 5xx, rate limit.
    Retryable,
    /// Failure that will not resolve by retrying: rejected credentials,
    /// malformed address, undecryptable config.
    Permanent,
}

/// A failed send through one channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} send failure: {message}")]
pub struct SendError {
    pub kind: SendErrorKind,
    pub message: String,
    /// HTTP status returned by the provider, when there was one.
    pub status: Option<u16>,
}

impl SendError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            kind: SendErrorKind::Retryable,
            message: message.into(),
            status: None,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: SendErrorKind::Permanent,
            message: message.into(),
            status: None,
        }
    }

    /// Classify an HTTP status: 429 and 5xx are retryable, everything else permanent.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let err = if status == 429 || status >= 500 {
            Self::retryable(message)
        } else {
            Self::permanent(message)
        };
        err.with_status(status)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_permanent(&self) -> bool {
        self.kind == SendErrorKind::Permanent
    }
}

impl From<NotifyError> for SendError {
    /// Any non-send error surfacing inside a sender (decryption, config) aborts
    /// that one channel and is not worth retrying.
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::Send(inner) => inner,
            other => SendError::permanent(other.to_string()),
        }
    }
}
