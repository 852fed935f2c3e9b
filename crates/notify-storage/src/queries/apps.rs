// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read side of the app, user, and channel tables, plus the monthly
//! counter reset.
//!
//! Channel credential columns are returned exactly as stored (encrypted);
//! decryption happens in the senders, immediately before use.

use chrono::{DateTime, Utc};
use notify_core::NotifyError;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::database::Database;
use crate::models::{
    format_ts, parse_ts, App, ChannelConfig, DiscordConfig, EmailConfig, QuotaResetCandidate,
    SmsConfig, User,
};

fn app_from_row(row: &Row<'_>) -> rusqlite::Result<App> {
    let reset: String = row.get(7)?;
    Ok(App {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        is_active: row.get(3)?,
        max_monthly_alerts_allowed: row.get(4)?,
        user_monthly_limit_threshold: row.get(5)?,
        alerts_sent_this_month: row.get(6)?,
        alerts_reset_date: parse_ts(7, &reset)?,
    })
}

/// Load an active app owned by `user_id`.
pub async fn get_active_app(
    db: &Database,
    app_id: i64,
    user_id: i64,
) -> Result<Option<App>, NotifyError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, user_id, name, is_active, max_monthly_alerts_allowed,
                        user_monthly_limit_threshold, alerts_sent_this_month, alerts_reset_date
                 FROM apps
                 WHERE id = ?1 AND user_id = ?2 AND is_active = 1",
                params![app_id, user_id],
                app_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Load a user by id.
pub async fn get_user(db: &Database, user_id: i64) -> Result<Option<User>, NotifyError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, username, email, is_admin, timezone FROM users WHERE id = ?1",
                params![user_id],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        email: row.get(2)?,
                        is_admin: row.get(3)?,
                        timezone: row.get(4)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Every active config row under the app's active channels, in channel order.
pub async fn active_channel_configs(
    db: &Database,
    app_id: i64,
) -> Result<Vec<ChannelConfig>, NotifyError> {
    db.connection()
        .call(move |conn| {
            let channels: Vec<(i64, String)> = {
                let mut stmt = conn.prepare(
                    "SELECT app_channels.id, channel_types.name
                     FROM app_channels
                     JOIN channel_types ON channel_types.id = app_channels.channel_type_id
                     WHERE app_channels.app_id = ?1 AND app_channels.is_active = 1
                     ORDER BY app_channels.id",
                )?;
                let rows = stmt.query_map(params![app_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
                rows.collect::<Result<_, _>>()?
            };

            let mut configs = Vec::new();
            for (app_channel_id, channel_type) in channels {
                match channel_type.as_str() {
                    "email" => configs.extend(email_configs(conn, app_channel_id)?),
                    "sms" => configs.extend(sms_configs(conn, app_channel_id)?),
                    "discord" => configs.extend(discord_configs(conn, app_channel_id)?),
                    other => {
                        tracing::warn!(app_id, app_channel_id, channel_type = other, "unsupported channel type");
                    }
                }
            }
            Ok(configs)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn email_configs(conn: &Connection, app_channel_id: i64) -> rusqlite::Result<Vec<ChannelConfig>> {
    let mut stmt = conn.prepare(
        "SELECT id, app_channel_id, name, host, port, alias, auth_email, auth_pass
         FROM email_configs WHERE app_channel_id = ?1 AND is_active = 1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![app_channel_id], |row| {
        Ok(ChannelConfig::Email(EmailConfig {
            id: row.get(0)?,
            app_channel_id: row.get(1)?,
            name: row.get(2)?,
            host: row.get(3)?,
            port: row.get(4)?,
            alias: row.get(5)?,
            auth_email: row.get(6)?,
            auth_pass: row.get(7)?,
        }))
    })?;
    rows.collect()
}

fn sms_configs(conn: &Connection, app_channel_id: i64) -> rusqlite::Result<Vec<ChannelConfig>> {
    let mut stmt = conn.prepare(
        "SELECT id, app_channel_id, name, account_sid, auth_token, from_phone_number, phone_number
         FROM sms_configs WHERE app_channel_id = ?1 AND is_active = 1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![app_channel_id], |row| {
        Ok(ChannelConfig::Sms(SmsConfig {
            id: row.get(0)?,
            app_channel_id: row.get(1)?,
            name: row.get(2)?,
            account_sid: row.get(3)?,
            auth_token: row.get(4)?,
            from_phone_number: row.get(5)?,
            phone_number: row.get(6)?,
        }))
    })?;
    rows.collect()
}

fn discord_configs(conn: &Connection, app_channel_id: i64) -> rusqlite::Result<Vec<ChannelConfig>> {
    let mut stmt = conn.prepare(
        "SELECT id, app_channel_id, name, webhook_url
         FROM discord_configs WHERE app_channel_id = ?1 AND is_active = 1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![app_channel_id], |row| {
        Ok(ChannelConfig::Discord(DiscordConfig {
            id: row.get(0)?,
            app_channel_id: row.get(1)?,
            name: row.get(2)?,
            webhook_url: row.get(3)?,
        }))
    })?;
    rows.collect()
}

/// Apps whose `alerts_reset_date` is at or before `now`, with owner details.
pub async fn apps_due_for_reset(
    db: &Database,
    now: DateTime<Utc>,
) -> Result<Vec<QuotaResetCandidate>, NotifyError> {
    let now = format_ts(now);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT apps.id, apps.name, apps.alerts_reset_date,
                        users.email, users.username, users.timezone
                 FROM apps
                 JOIN users ON users.id = apps.user_id
                 WHERE apps.alerts_reset_date <= ?1
                 ORDER BY apps.id",
            )?;
            let rows = stmt.query_map(params![now], |row| {
                let reset: String = row.get(2)?;
                Ok(QuotaResetCandidate {
                    app_id: row.get(0)?,
                    app_name: row.get(1)?,
                    alerts_reset_date: parse_ts(2, &reset)?,
                    email: row.get(3)?,
                    username: row.get(4)?,
                    timezone: row.get(5)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Zero the app's monthly counter and move its next reset to `next_reset`.
pub async fn reset_app_quota(
    db: &Database,
    app_id: i64,
    next_reset: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<bool, NotifyError> {
    let next_reset = format_ts(next_reset);
    let now = format_ts(now);
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE apps SET alerts_sent_this_month = 0, alerts_reset_date = ?1, updated_at = ?2
                 WHERE id = ?3",
                params![next_reset, now, app_id],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(changed == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::fixtures;
    use chrono::TimeZone;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("apps.db").to_str().unwrap())
            .await
            .unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn active_app_must_match_owner_and_be_active() {
        let (db, _dir) = setup_db().await;
        let owner = fixtures::user(&db, "ada", false, "UTC").await;
        let other = fixtures::user(&db, "bob", false, "UTC").await;
        let app_id = fixtures::app(&db, owner, "billing", "2026-06-01T00:00:00.000Z").await;

        let app = get_active_app(&db, app_id, owner).await.unwrap().unwrap();
        assert_eq!(app.name, "billing");
        assert_eq!(app.max_monthly_alerts_allowed, 100);
        assert_eq!(app.user_monthly_limit_threshold, None);
        assert_eq!(app.alerts_sent_this_month, 0);

        assert!(get_active_app(&db, app_id, other).await.unwrap().is_none());

        fixtures::exec(&db, &format!("UPDATE apps SET is_active = 0 WHERE id = {app_id}")).await;
        assert!(get_active_app(&db, app_id, owner).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_user_reads_timezone_and_admin_flag() {
        let (db, _dir) = setup_db().await;
        let id = fixtures::user(&db, "root", true, "Europe/Berlin").await;
        let user = get_user(&db, id).await.unwrap().unwrap();
        assert!(user.is_admin);
        assert_eq!(user.timezone, "Europe/Berlin");
        assert_eq!(user.email, "root@example.com");
        assert!(get_user(&db, id + 1).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn active_channel_configs_skip_inactive_rows() {
        let (db, _dir) = setup_db().await;
        let owner = fixtures::user(&db, "ada", false, "UTC").await;
        let app_id = fixtures::app(&db, owner, "billing", "2026-06-01T00:00:00.000Z").await;

        let discord = fixtures::channel(&db, app_id, "discord", true).await;
        let email = fixtures::channel(&db, app_id, "email", true).await;
        let muted_sms = fixtures::channel(&db, app_id, "sms", false).await;
        fixtures::exec(
            &db,
            &format!(
                "INSERT INTO discord_configs (app_channel_id, name, webhook_url) VALUES ({discord}, 'ops', 'enc-url');
                 INSERT INTO discord_configs (app_channel_id, name, webhook_url, is_active) VALUES ({discord}, 'old', 'enc-old', 0);
                 INSERT INTO email_configs (app_channel_id, name, host, port, alias, auth_email, auth_pass)
                   VALUES ({email}, 'mail', 'h', 'p', 'a', 'e', 'pw');
                 INSERT INTO sms_configs (app_channel_id, name, account_sid, auth_token, from_phone_number, phone_number)
                   VALUES ({muted_sms}, 'pager', 'sid', 'tok', '+1', '+2');"
            ),
        )
        .await;

        let configs = active_channel_configs(&db, app_id).await.unwrap();
        assert_eq!(configs.len(), 2);
        match &configs[0] {
            ChannelConfig::Discord(c) => {
                assert_eq!(c.name, "ops");
                assert_eq!(c.webhook_url, "enc-url");
            }
            other => panic!("expected discord, got {other:?}"),
        }
        match &configs[1] {
            ChannelConfig::Email(c) => assert_eq!(c.auth_pass, "pw"),
            other => panic!("expected email, got {other:?}"),
        }

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn deleting_a_channel_cascades_to_configs() {
        let (db, _dir) = setup_db().await;
        let owner = fixtures::user(&db, "ada", false, "UTC").await;
        let app_id = fixtures::app(&db, owner, "billing", "2026-06-01T00:00:00.000Z").await;
        let discord = fixtures::channel(&db, app_id, "discord", true).await;
        fixtures::exec(
            &db,
            &format!(
                "INSERT INTO discord_configs (app_channel_id, name, webhook_url) VALUES ({discord}, 'ops', 'u');
                 DELETE FROM app_channels WHERE id = {discord};"
            ),
        )
        .await;

        let remaining: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM discord_configs", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(remaining, 0);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn due_apps_and_reset() {
        let (db, _dir) = setup_db().await;
        let owner = fixtures::user(&db, "ada", false, "America/New_York").await;
        let due = fixtures::app(&db, owner, "due", "2026-05-01T04:00:00.000Z").await;
        let later = fixtures::app(&db, owner, "later", "2026-06-01T04:00:00.000Z").await;
        fixtures::exec(&db, "UPDATE apps SET alerts_sent_this_month = 42").await;

        let now = Utc.with_ymd_and_hms(2026, 5, 1, 5, 0, 0).unwrap();
        let candidates = apps_due_for_reset(&db, now).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].app_id, due);
        assert_eq!(candidates[0].timezone, "America/New_York");
        assert_eq!(candidates[0].username, "ada");

        let next = Utc.with_ymd_and_hms(2026, 6, 1, 4, 0, 0).unwrap();
        assert!(reset_app_quota(&db, due, next, now).await.unwrap());

        let app = get_active_app(&db, due, owner).await.unwrap().unwrap();
        assert_eq!(app.alerts_sent_this_month, 0);
        assert_eq!(app.alerts_reset_date, next);
        let untouched = get_active_app(&db, later, owner).await.unwrap().unwrap();
        assert_eq!(untouched.alerts_sent_this_month, 42);

        db.close().await.unwrap();
    }
}
