// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row builders for query tests.

use rusqlite::params;

use crate::database::Database;

pub(crate) async fn user(db: &Database, username: &str, is_admin: bool, timezone: &str) -> i64 {
    let username = username.to_string();
    let timezone = timezone.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO users (username, email, is_admin, timezone) VALUES (?1, ?2, ?3, ?4)",
                params![username, format!("{username}@example.com"), is_admin, timezone],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .unwrap()
}

pub(crate) async fn app(db: &Database, user_id: i64, name: &str, reset_date: &str) -> i64 {
    let name = name.to_string();
    let reset_date = reset_date.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO apps (user_id, name, alerts_reset_date) VALUES (?1, ?2, ?3)",
                params![user_id, name, reset_date],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .unwrap()
}

pub(crate) async fn channel(db: &Database, app_id: i64, kind: &str, active: bool) -> i64 {
    let kind = kind.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO app_channels (app_id, channel_type_id, is_active)
                 SELECT ?1, id, ?3 FROM channel_types WHERE name = ?2",
                params![app_id, kind, active],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .unwrap()
}

pub(crate) async fn exec(db: &Database, sql: &str) {
    let sql = sql.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> { conn.execute_batch(&sql) })
        .await
        .unwrap();
}
