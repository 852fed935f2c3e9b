// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Notify fan-out service.
//!
//! This crate provides the error types, domain types, and sender traits used
//! throughout the Notify workspace. Channel crates implement the traits defined
//! here; the engine crate consumes them.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{NotifyError, SendError, SendErrorKind};
pub use types::{
    App, ChannelConfig, DiscordConfig, EmailConfig, Job, JobKind, JobPayload, JobStatus, Notice,
    Notification, Outbound, SmsConfig, User,
};

pub use traits::{ChannelSender, NoticeSender};
