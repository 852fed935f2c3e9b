// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification log writes and reads.

use notify_core::NotifyError;
use rusqlite::{params, OptionalExtension, Row};

use crate::database::Database;
use crate::models::{format_ts, parse_ts, parse_ts_opt, Notification};

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    let details: Option<String> = row.get(3)?;
    let details = details
        .map(|d| serde_json::from_str(&d))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;
    let created_at: String = row.get(4)?;
    Ok(Notification {
        id: row.get(0)?,
        app_id: row.get(1)?,
        message: row.get(2)?,
        details,
        created_at: parse_ts(4, &created_at)?,
        read_at: parse_ts_opt(5, row.get(5)?)?,
    })
}

/// Insert the notification row and bump the app's monthly counter in one
/// transaction. Either both happen or neither does.
pub async fn record_dispatch(db: &Database, notification: &Notification) -> Result<(), NotifyError> {
    let id = notification.id.clone();
    let app_id = notification.app_id;
    let message = notification.message.clone();
    let details = notification.details.as_ref().map(|d| d.to_string());
    let created_at = format_ts(notification.created_at);

    let updated = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO notifications (id, app_id, message, details, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![id, app_id, message, details, created_at],
            )?;
            let updated = tx.execute(
                "UPDATE apps SET alerts_sent_this_month = alerts_sent_this_month + 1,
                 updated_at = ?1 WHERE id = ?2",
                params![created_at, app_id],
            )?;
            tx.commit()?;
            Ok(updated)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    if updated == 0 {
        tracing::warn!(app_id, "notification recorded for an app with no counter row");
    }
    Ok(())
}

/// Fetch one notification by id.
pub async fn get_notification(db: &Database, id: &str) -> Result<Option<Notification>, NotifyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, app_id, message, details, created_at, read_at
                 FROM notifications WHERE id = ?1",
                params![id],
                notification_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Most recent notifications for an app, newest first.
pub async fn list_for_app(
    db: &Database,
    app_id: i64,
    limit: usize,
) -> Result<Vec<Notification>, NotifyError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, app_id, message, details, created_at, read_at
                 FROM notifications WHERE app_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![app_id, limit], notification_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
