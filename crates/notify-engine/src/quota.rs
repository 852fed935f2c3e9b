// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Monthly quota guard and the monthly counter reset.
//!
//! The guard blocks on exact equality with a limit, so the owner notice goes
//! out once, on the call that lands on the limit.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use notify_core::{App, Notice, NoticeSender, NotifyError, User};
use notify_storage::queries::apps;
use notify_storage::Database;
use tracing::{error, info, warn};

/// Why a dispatch was blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaBlock {
    /// `alerts_sent_this_month` hit the plan's `max_monthly_alerts_allowed`.
    MonthlyQuota,
    /// `alerts_sent_this_month` hit the owner's own threshold.
    CustomLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Allowed,
    Blocked(QuotaBlock),
}

/// Decide whether `app` may send this month. Admin owners are never blocked.
pub fn check_quota(app: &App, user: &User) -> QuotaDecision {
    if user.is_admin {
        return QuotaDecision::Allowed;
    }
    let sent = app.alerts_sent_this_month;
    if sent == app.max_monthly_alerts_allowed {
        return QuotaDecision::Blocked(QuotaBlock::MonthlyQuota);
    }
    if app.user_monthly_limit_threshold == Some(sent) {
        return QuotaDecision::Blocked(QuotaBlock::CustomLimit);
    }
    QuotaDecision::Allowed
}

impl QuotaBlock {
    /// The notice mailed to the owner when this block fires.
    pub fn notice(self, app: &App, user: &User) -> Notice {
        let (subject, message) = match self {
            QuotaBlock::MonthlyQuota => (
                format!("Monthly Quota Reached on {} 🔔 Notify", app.name),
                format!(
                    "You have reached your monthly notification quota for the app \"{}\". \
                     Notifications will continue to be available in the app, but we will stop \
                     sending them to your channels. Please wait until next month to resume \
                     channel notifications. Thank you for using Notify!",
                    app.name
                ),
            ),
            QuotaBlock::CustomLimit => (
                format!("Custom Alert Limit Reached on {} 🔔 Notify", app.name),
                format!(
                    "You have reached your custom notification limit for the app \"{}\". \
                     Notifications will continue to be available in the app, but we will stop \
                     sending them to your channels until you update your limit in your \
                     settings. Thank you for using Notify!",
                    app.name
                ),
            ),
        };
        Notice {
            email: user.email.clone(),
            username: user.username.clone(),
            subject,
            message,
        }
    }
}

fn parse_timezone(name: &str) -> Tz {
    name.parse::<Tz>().unwrap_or_else(|_| {
        warn!(timezone = name, "unknown timezone, using UTC");
        Tz::UTC
    })
}

fn start_of_next_month<Z: TimeZone>(now: DateTime<Utc>, tz: &Z) -> Option<DateTime<Utc>> {
    let local = now.with_timezone(tz);
    let (year, month) = if local.month() == 12 {
        (local.year() + 1, 1)
    } else {
        (local.year(), local.month() + 1)
    };
    let midnight = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
    // Zones that skip midnight on a DST change start the month an hour later.
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

/// First instant of the month after `now`, as seen in `timezone`.
pub fn next_reset(now: DateTime<Utc>, timezone: &str) -> DateTime<Utc> {
    let tz = parse_timezone(timezone);
    start_of_next_month(now, &tz)
        .or_else(|| start_of_next_month(now, &Utc))
        .unwrap_or(now)
}

fn long_date(ts: DateTime<Utc>, tz: &Tz) -> String {
    ts.with_timezone(tz).format("%B %-d, %Y").to_string()
}

/// Zero the counter of every app whose reset date has passed, move the reset
/// date to the start of the owner's next month, and mail the owner.
///
/// A failed reset for one app is logged and skipped. Returns the number of
/// apps reset.
pub async fn reset_monthly_quotas(
    db: &Database,
    notices: &dyn NoticeSender,
    now: DateTime<Utc>,
) -> Result<usize, NotifyError> {
    let due = apps::apps_due_for_reset(db, now).await?;
    if due.is_empty() {
        info!("no apps due for a quota reset");
        return Ok(0);
    }
    info!(count = due.len(), "resetting monthly quotas");

    let mut reset = 0;
    for app in due {
        let tz = parse_timezone(&app.timezone);
        let next = next_reset(now, &app.timezone);

        match apps::reset_app_quota(db, app.app_id, next, now).await {
            Ok(true) => reset += 1,
            Ok(false) => {
                warn!(app_id = app.app_id, "app vanished before its quota reset");
                continue;
            }
            Err(e) => {
                error!(app_id = app.app_id, error = %e, "quota reset failed");
                continue;
            }
        }
        info!(app_id = app.app_id, next_reset = %next, "monthly quota reset");

        let notice = Notice {
            email: app.email.clone(),
            username: app.username.clone(),
            subject: "Monthly Alert Limit Reset".to_string(),
            message: format!(
                "Your monthly alert limit for the app \"{}\" has been reset on {}. \
                 Your alert count has been set back to 0, and you can now send new alerts \
                 for this month. The next reset will occur on {}.",
                app.app_name,
                long_date(now, &tz),
                long_date(next, &tz)
            ),
        };
        if let Err(e) = notices.send_notice(&notice).await {
            warn!(app_id = app.app_id, error = %e, "quota reset notice failed");
        }
    }
    Ok(reset)
}
