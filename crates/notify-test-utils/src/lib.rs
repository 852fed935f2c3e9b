// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Notify integration tests.
//!
//! Provides mock senders and a seeded temp database for fast, deterministic
//! tests without SMTP relays, Twilio, or Discord.
//!
//! # Components
//!
//! - [`MockSender`] - channel sender with scripted outcomes and captured calls
//! - [`MockNoticeSender`] - captures owner notices
//! - [`TestDb`] - temp SQLite database with row seeding helpers

pub mod mock_notice;
pub mod mock_sender;
pub mod seed;

pub use mock_notice::MockNoticeSender;
pub use mock_sender::{MockSender, SentCall};
pub use seed::TestDb;
