// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage-side model types and row conversion helpers.
//!
//! The domain types live in `notify-core::types`; this module re-exports them
//! and adds the shapes only the store produces.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;

pub use notify_core::types::{
    App, ChannelConfig, DiscordConfig, EmailConfig, Job, JobKind, JobStatus, Notification,
    SmsConfig, User,
};

/// Column format for every timestamp. Fixed width, so text order is time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Render a timestamp in the stored column format.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp, reporting failures against column `idx`.
pub fn parse_ts(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_ts_opt(idx: usize, value: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|v| parse_ts(idx, &v)).transpose()
}

/// Parse a strum-backed enum column.
pub(crate) fn parse_enum<T>(idx: usize, value: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = strum::ParseError>,
{
    value
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Result of recording one failed attempt against a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Back to `pending`, eligible again at `run_at`.
    Retrying { attempts: u32, run_at: DateTime<Utc> },
    /// Attempts exhausted (or the failure was final); the job is `failed`.
    Failed { attempts: u32 },
    /// The job had already reached a terminal state; nothing changed.
    AlreadyTerminal(JobStatus),
    /// The job is `pending`, so no attempt was in flight; nothing changed.
    NotClaimed,
}

/// Job counts per status, for inspection and the CLI summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobCounts {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
}

impl JobCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.processing + self.completed + self.failed
    }
}

/// An app whose monthly counter is due for reset, joined with its owner.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaResetCandidate {
    pub app_id: i64,
    pub app_name: String,
    pub alerts_reset_date: DateTime<Utc>,
    pub email: String,
    pub username: String,
    pub timezone: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn format_is_fixed_width_utc() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(format_ts(ts), "2026-03-04T05:06:07.000Z");
    }

    #[test]
    fn parse_accepts_sqlite_default_format() {
        let ts = parse_ts(0, "2026-03-04T05:06:07.123Z").unwrap();
        assert_eq!(format_ts(ts), "2026-03-04T05:06:07.123Z");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_ts(3, "yesterday").is_err());
    }

    proptest! {
        #[test]
        fn text_order_matches_time_order(a in 0i64..4_000_000_000_000, b in 0i64..4_000_000_000_000) {
            let ta = DateTime::<Utc>::from_timestamp_millis(a).unwrap();
            let tb = DateTime::<Utc>::from_timestamp_millis(b).unwrap();
            prop_assert_eq!(format_ts(ta).cmp(&format_ts(tb)), ta.cmp(&tb));
        }
    }
}
