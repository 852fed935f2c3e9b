// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch and delivery engine for the Notify fan-out service.
//!
//! - [`Dispatcher`] records a notification, applies the quota guard, sends to
//!   every active channel at once, and turns failed sends into queued jobs.
//! - [`QueueProcessor`] retries queued jobs in batches with backoff.
//! - [`DispatchQueue`] runs dispatches on a bounded pool of worker tasks.
//! - [`quota`] holds the quota guard and the monthly counter reset.

pub mod dispatcher;
pub mod processor;
pub mod quota;
pub mod senders;
pub mod work_queue;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use processor::{BatchReport, Clock, QueueProcessor};
pub use quota::{QuotaBlock, QuotaDecision};
pub use senders::Senders;
pub use work_queue::{DispatchQueue, DispatchRequest, DrainReport};
