// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the job queue, the notification log, and the app tables.

pub mod apps;
pub mod jobs;
pub mod notifications;

#[cfg(test)]
pub(crate) mod fixtures;
