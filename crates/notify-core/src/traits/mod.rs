// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the engine and the outside world.
//!
//! Both traits use `#[async_trait]` so implementations can be held as
//! `Arc<dyn ...>` and swapped for mocks in tests.

pub mod notice;
pub mod sender;

pub use notice::NoticeSender;
pub use sender::ChannelSender;
