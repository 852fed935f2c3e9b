// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot subcommands. Each opens the database, does one thing, and closes it.

use std::io::IsTerminal;

use chrono::Utc;
use notify_config::NotifyConfig;
use notify_core::NotifyError;
use notify_engine::quota::reset_monthly_quotas;
use notify_engine::DispatchOutcome;
use notify_storage::queries::jobs;
use notify_storage::Database;
use serde_json::Value;

use crate::runtime::{self, Runtime};

pub async fn process(config: &NotifyConfig) -> Result<(), NotifyError> {
    let runtime = Runtime::build(config).await?;
    let report = runtime.processor(config).process_batch().await;
    runtime.db.close().await?;
    let report = report?;
    println!(
        "processed {} job(s): {} succeeded, {} failed, {} recovered from processing",
        report.processed, report.succeeded, report.failed, report.recovered
    );
    Ok(())
}

pub async fn cleanup(config: &NotifyConfig, days: Option<u32>) -> Result<(), NotifyError> {
    let days = days.unwrap_or(config.queue.retention_days);
    let runtime = Runtime::build(config).await?;
    let deleted = runtime.processor(config).cleanup(days).await;
    runtime.db.close().await?;
    println!("deleted {} completed job(s) older than {days} day(s)", deleted?);
    Ok(())
}

pub async fn reset_quotas(config: &NotifyConfig) -> Result<(), NotifyError> {
    let notices = runtime::notices(config)?;
    let db = Database::from_config(&config.storage).await?;
    let reset = reset_monthly_quotas(&db, notices.as_ref(), Utc::now()).await;
    db.close().await?;
    println!("reset {} app(s)", reset?);
    Ok(())
}

pub async fn dispatch(
    config: &NotifyConfig,
    app_id: i64,
    user_id: i64,
    message: &str,
    details: Option<&str>,
) -> Result<(), NotifyError> {
    let details = details.map(parse_details).transpose()?;
    let runtime = Runtime::build(config).await?;
    let outcome = runtime
        .dispatcher(config)
        .dispatch(app_id, user_id, message, details)
        .await;
    runtime.db.close().await?;

    match outcome? {
        DispatchOutcome::AppNotFound => println!("no active app {app_id} for user {user_id}"),
        DispatchOutcome::UserNotFound => println!("user {user_id} not found"),
        DispatchOutcome::Blocked(block) => println!("blocked by quota ({block:?}), owner notified"),
        DispatchOutcome::Delivered {
            notification_id,
            sent,
            queued,
        } => println!("notification {notification_id}: {sent} sent, {queued} queued for retry"),
    }
    Ok(())
}

/// Details must be a JSON value; an object is typical.
fn parse_details(raw: &str) -> Result<Value, NotifyError> {
    serde_json::from_str(raw).map_err(|e| NotifyError::Config(format!("--details is not valid JSON: {e}")))
}

pub fn encrypt(config: &NotifyConfig, value: Option<String>) -> Result<(), NotifyError> {
    let value = match value {
        Some(value) => value,
        None => read_value()?,
    };
    if value.is_empty() {
        return Err(NotifyError::Config("refusing to encrypt an empty value".to_string()));
    }
    let codec = runtime::codec(config)?;
    println!("{}", codec.encrypt(&value)?);
    Ok(())
}

fn read_value() -> Result<String, NotifyError> {
    if !std::io::stdin().is_terminal() {
        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .map_err(|e| NotifyError::Internal(format!("failed to read stdin: {e}")))?;
        return Ok(line.trim_end_matches(['\r', '\n']).to_string());
    }
    eprint!("Value to encrypt: ");
    rpassword::read_password().map_err(|e| NotifyError::Internal(format!("failed to read value: {e}")))
}

pub async fn status(config: &NotifyConfig) -> Result<(), NotifyError> {
    let db = Database::from_config(&config.storage).await?;
    let counts = jobs::count_by_status(&db).await;
    db.close().await?;
    let counts = counts?;
    println!("pending     {}", counts.pending);
    println!("processing  {}", counts.processing);
    println!("completed   {}", counts.completed);
    println!("failed      {}", counts.failed);
    println!("total       {}", counts.total());
    Ok(())
}
