// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Temp database with seeding helpers for users, apps, and channels.
//!
//! Channel credential columns are written verbatim. Engine tests pair them
//! with [`MockSender`](crate::MockSender), which never decrypts.

use chrono::{DateTime, Utc};
use rusqlite::params;

use notify_core::{JobKind, NotifyError};
use notify_storage::database::map_tr_err;
use notify_storage::{format_ts, Database};

/// A migrated database in its own temp directory.
pub struct TestDb {
    pub db: Database,
    _dir: tempfile::TempDir,
}

impl TestDb {
    pub async fn new() -> Result<Self, NotifyError> {
        let dir = tempfile::TempDir::new().map_err(|e| NotifyError::Storage { source: e.into() })?;
        let path = dir.path().join("notify-test.db");
        let db = Database::open(&path.to_string_lossy()).await?;
        Ok(Self { db, _dir: dir })
    }

    /// Insert a user in the UTC timezone.
    pub async fn user(&self, username: &str, is_admin: bool) -> Result<i64, NotifyError> {
        self.user_in_tz(username, is_admin, "UTC").await
    }

    pub async fn user_in_tz(
        &self,
        username: &str,
        is_admin: bool,
        timezone: &str,
    ) -> Result<i64, NotifyError> {
        let username = username.to_string();
        let timezone = timezone.to_string();
        self.insert(move |conn| {
            conn.execute(
                "INSERT INTO users (username, email, is_admin, timezone) VALUES (?1, ?2, ?3, ?4)",
                params![username, format!("{username}@example.com"), is_admin, timezone],
            )
        })
        .await
    }

    /// Insert an active app with the default quota (100, no custom limit).
    pub async fn app(&self, user_id: i64, name: &str) -> Result<i64, NotifyError> {
        let name = name.to_string();
        self.insert(move |conn| {
            conn.execute(
                "INSERT INTO apps (user_id, name) VALUES (?1, ?2)",
                params![user_id, name],
            )
        })
        .await
    }

    /// Overwrite an app's quota columns.
    pub async fn set_quota(
        &self,
        app_id: i64,
        max_monthly: i64,
        custom_limit: Option<i64>,
        sent_this_month: i64,
    ) -> Result<(), NotifyError> {
        self.execute(move |conn| {
            conn.execute(
                "UPDATE apps SET max_monthly_alerts_allowed = ?1,
                 user_monthly_limit_threshold = ?2, alerts_sent_this_month = ?3
                 WHERE id = ?4",
                params![max_monthly, custom_limit, sent_this_month, app_id],
            )
        })
        .await
    }

    pub async fn set_reset_date(&self, app_id: i64, at: DateTime<Utc>) -> Result<(), NotifyError> {
        let at = format_ts(at);
        self.execute(move |conn| {
            conn.execute(
                "UPDATE apps SET alerts_reset_date = ?1 WHERE id = ?2",
                params![at, app_id],
            )
        })
        .await
    }

    /// Attach a channel of `kind` to the app. Returns the `app_channels` id.
    pub async fn channel(&self, app_id: i64, kind: JobKind, active: bool) -> Result<i64, NotifyError> {
        let kind = kind.to_string();
        self.insert(move |conn| {
            conn.execute(
                "INSERT INTO app_channels (app_id, channel_type_id, is_active)
                 SELECT ?1, id, ?3 FROM channel_types WHERE name = ?2",
                params![app_id, kind, active],
            )
        })
        .await
    }

    pub async fn email_config(&self, app_channel_id: i64, name: &str) -> Result<i64, NotifyError> {
        let name = name.to_string();
        self.insert(move |conn| {
            conn.execute(
                "INSERT INTO email_configs
                 (app_channel_id, name, host, port, alias, auth_email, auth_pass)
                 VALUES (?1, ?2, 'smtp.example.com', '587', 'Alerts', 'ops@example.com', 'pw')",
                params![app_channel_id, name],
            )
        })
        .await
    }

    pub async fn sms_config(&self, app_channel_id: i64, name: &str) -> Result<i64, NotifyError> {
        let name = name.to_string();
        self.insert(move |conn| {
            conn.execute(
                "INSERT INTO sms_configs
                 (app_channel_id, name, account_sid, auth_token, from_phone_number, phone_number)
                 VALUES (?1, ?2, 'AC123', 'token', '+15550000001', '+15550000002')",
                params![app_channel_id, name],
            )
        })
        .await
    }

    pub async fn discord_config(
        &self,
        app_channel_id: i64,
        name: &str,
        webhook_url: &str,
    ) -> Result<i64, NotifyError> {
        let name = name.to_string();
        let webhook_url = webhook_url.to_string();
        self.insert(move |conn| {
            conn.execute(
                "INSERT INTO discord_configs (app_channel_id, name, webhook_url) VALUES (?1, ?2, ?3)",
                params![app_channel_id, name, webhook_url],
            )
        })
        .await
    }

    /// Force a job into `processing`, last touched at `since`.
    pub async fn mark_processing(&self, job_id: i64, since: DateTime<Utc>) -> Result<(), NotifyError> {
        let since = format_ts(since);
        self.execute(move |conn| {
            conn.execute(
                "UPDATE jobs SET status = 'processing', updated_at = ?1 WHERE id = ?2",
                params![since, job_id],
            )
        })
        .await
    }

    /// Number of rows in `table`.
    pub async fn count(&self, table: &str) -> Result<i64, NotifyError> {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        self.db
            .connection()
            .call(move |conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(&sql, [], |row| row.get(0))
            })
            .await
            .map_err(map_tr_err)
    }

    pub async fn close(self) -> Result<(), NotifyError> {
        self.db.close().await
    }

    async fn insert<F>(&self, f: F) -> Result<i64, NotifyError>
    where
        F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<usize> + Send + 'static,
    {
        self.db
            .connection()
            .call(move |conn| -> Result<i64, rusqlite::Error> {
                f(conn)?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn execute<F>(&self, f: F) -> Result<(), NotifyError>
    where
        F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<usize> + Send + 'static,
    {
        self.db
            .connection()
            .call(move |conn| -> Result<(), rusqlite::Error> {
                f(conn)?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}
