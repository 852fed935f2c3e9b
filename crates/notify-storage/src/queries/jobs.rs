// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable job queue operations.
//!
//! Every state change carries a status predicate in its `WHERE` clause, so a
//! `completed` or `failed` job is never moved again, whatever the caller does.
//! All operations take `now` explicitly; the store never reads the clock.

use chrono::{DateTime, Duration, Utc};
use notify_core::NotifyError;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};

use crate::database::Database;
use crate::models::{
    format_ts, parse_enum, parse_ts, parse_ts_opt, Job, JobCounts, JobKind, JobStatus,
    RetryOutcome,
};

/// Retry delays in minutes, indexed by attempt number (1-based, clamped).
const BACKOFF_MINUTES: [i64; 5] = [1, 5, 15, 30, 60];

/// Delay before retrying a job that has now failed `attempt` times.
///
/// 1 → 1m, 2 → 5m, 3 → 15m, 4 → 30m, 5 and beyond → 60m.
pub fn backoff(attempt: u32) -> Duration {
    let index = (attempt.max(1) as usize - 1).min(BACKOFF_MINUTES.len() - 1);
    Duration::minutes(BACKOFF_MINUTES[index])
}

const JOB_COLUMNS: &str = "id, type, payload, status, attempts, max_attempts, error, \
                           run_at, completed_at, created_at, updated_at";

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<Job> {
    let kind: String = row.get(1)?;
    let status: String = row.get(3)?;
    let run_at: String = row.get(7)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;
    Ok(Job {
        id: row.get(0)?,
        kind: parse_enum(1, &kind)?,
        payload: row.get(2)?,
        status: parse_enum(3, &status)?,
        attempts: row.get(4)?,
        max_attempts: row.get(5)?,
        error: row.get(6)?,
        run_at: parse_ts(7, &run_at)?,
        completed_at: parse_ts_opt(8, row.get(8)?)?,
        created_at: parse_ts(9, &created_at)?,
        updated_at: parse_ts(10, &updated_at)?,
    })
}

/// Insert a `pending` job due immediately. Returns the new job id.
pub async fn enqueue(
    db: &Database,
    kind: JobKind,
    payload: &str,
    max_attempts: u32,
    now: DateTime<Utc>,
) -> Result<i64, NotifyError> {
    let kind = kind.to_string();
    let payload = payload.to_string();
    let now = format_ts(now);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO jobs (type, payload, status, attempts, max_attempts, run_at, \
                 created_at, updated_at) VALUES (?1, ?2, 'pending', 0, ?3, ?4, ?4, ?4)",
                params![kind, payload, max_attempts, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Claim up to `limit` due jobs, oldest first, and mark them `processing`.
///
/// Selection and marking run in one `BEGIN IMMEDIATE` transaction, so two
/// processors sharing the database file never claim the same job.
pub async fn claim_due(
    db: &Database,
    limit: usize,
    now: DateTime<Utc>,
) -> Result<Vec<Job>, NotifyError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let now_str = format_ts(now);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let due: Vec<Job> = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {JOB_COLUMNS} FROM jobs
                     WHERE status = 'pending' AND run_at <= ?1
                     ORDER BY created_at ASC, id ASC
                     LIMIT ?2"
                ))?;
                let rows = stmt.query_map(params![now_str, limit], job_from_row)?;
                rows.collect::<Result<_, _>>()?
            };

            let mut claimed = Vec::with_capacity(due.len());
            for job in due {
                let changed = tx.execute(
                    "UPDATE jobs SET status = 'processing', updated_at = ?1
                     WHERE id = ?2 AND status = 'pending'",
                    params![now_str, job.id],
                )?;
                if changed == 1 {
                    claimed.push(Job {
                        status: JobStatus::Processing,
                        updated_at: now,
                        ..job
                    });
                }
            }

            tx.commit()?;
            Ok(claimed)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Return `processing` jobs untouched since `stale_before` to `pending`.
///
/// Attempts are left alone: an abandoned run is not a failed attempt.
pub async fn recover_stuck(
    db: &Database,
    stale_before: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<usize, NotifyError> {
    let stale_before = format_ts(stale_before);
    let now = format_ts(now);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE jobs SET status = 'pending', updated_at = ?1
                 WHERE status = 'processing' AND updated_at < ?2",
                params![now, stale_before],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a `processing` job `completed`. Returns `false` when the job was not
/// in `processing` (already terminal, recovered, or missing).
pub async fn complete(db: &Database, id: i64, now: DateTime<Utc>) -> Result<bool, NotifyError> {
    let now = format_ts(now);
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE jobs SET status = 'completed', completed_at = ?1, updated_at = ?1, \
                 error = NULL
                 WHERE id = ?2 AND status = 'processing'",
                params![now, id],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(changed == 1)
}

/// Record a failed attempt of a `processing` job.
///
/// Jobs in any other state are left untouched. Increments `attempts` exactly once. When the ceiling is reached, or
/// `give_up` is set, the job becomes `failed` with `run_at` untouched;
/// otherwise it returns to `pending` with `run_at = now + backoff(attempts)`.
pub async fn fail_or_retry(
    db: &Database,
    id: i64,
    error: &str,
    now: DateTime<Utc>,
    give_up: bool,
) -> Result<RetryOutcome, NotifyError> {
    let error = error.to_string();
    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let current: Option<(u32, u32, String)> = tx
                .query_row(
                    "SELECT attempts, max_attempts, status FROM jobs WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;

            let Some((attempts, max_attempts, status)) = current else {
                tx.commit()?;
                return Ok(None);
            };
            let status: JobStatus = parse_enum(2, &status)?;
            if status.is_terminal() {
                tx.commit()?;
                return Ok(Some(RetryOutcome::AlreadyTerminal(status)));
            }
            if status != JobStatus::Processing {
                tx.commit()?;
                return Ok(Some(RetryOutcome::NotClaimed));
            }

            let attempts = attempts + 1;
            let now_str = format_ts(now);
            let outcome = if give_up || attempts >= max_attempts {
                tx.execute(
                    "UPDATE jobs SET status = 'failed', attempts = ?1, error = ?2, updated_at = ?3
                     WHERE id = ?4 AND status = 'processing'",
                    params![attempts, error, now_str, id],
                )?;
                RetryOutcome::Failed { attempts }
            } else {
                let run_at = now + backoff(attempts);
                tx.execute(
                    "UPDATE jobs SET status = 'pending', attempts = ?1, error = ?2,
                     run_at = ?3, updated_at = ?4
                     WHERE id = ?5 AND status = 'processing'",
                    params![attempts, error, format_ts(run_at), now_str, id],
                )?;
                RetryOutcome::Retrying { attempts, run_at }
            };

            tx.commit()?;
            Ok(Some(outcome))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    outcome.ok_or_else(|| NotifyError::NotFound {
        entity: "job",
        id: id.to_string(),
    })
}

/// Delete `completed` jobs whose `completed_at` is before `older_than`.
/// Pending, processing, and failed jobs are never deleted.
pub async fn cleanup(db: &Database, older_than: DateTime<Utc>) -> Result<usize, NotifyError> {
    let older_than = format_ts(older_than);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM jobs WHERE status = 'completed' AND completed_at < ?1",
                params![older_than],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a job by id.
pub async fn get_job(db: &Database, id: i64) -> Result<Option<Job>, NotifyError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
                params![id],
                job_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count jobs per status.
pub async fn count_by_status(db: &Database) -> Result<JobCounts, NotifyError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM jobs GROUP BY status")?;
            let rows = stmt.query_map([], |row| {
                let status: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((parse_enum::<JobStatus>(0, &status)?, count as u64))
            })?;

            let mut counts = JobCounts::default();
            for row in rows {
                let (status, count) = row?;
                match status {
                    JobStatus::Pending => counts.pending = count,
                    JobStatus::Processing => counts.processing = count,
                    JobStatus::Completed => counts.completed = count,
                    JobStatus::Failed => counts.failed = count,
                }
            }
            Ok(counts)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
