// SPDX-FileCopyrightText: 2026 Notify Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue processor behaviour against a real database and scripted senders.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use notify_config::model::QueueConfig;
use notify_core::{
    ChannelConfig, ChannelSender, DiscordConfig, EmailConfig, JobKind, JobPayload, JobStatus,
    Outbound, SendError,
};
use notify_engine::{BatchReport, Clock, QueueProcessor, Senders};
use notify_storage::queries::jobs;
use notify_storage::Database;
use notify_test_utils::{MockSender, TestDb};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap()
}

fn discord() -> ChannelConfig {
    ChannelConfig::Discord(DiscordConfig {
        id: 11,
        app_channel_id: 3,
        name: "ops".into(),
        webhook_url: "ciphertext".into(),
    })
}

fn email() -> ChannelConfig {
    ChannelConfig::Email(EmailConfig {
        id: 12,
        app_channel_id: 4,
        name: "mail".into(),
        host: "h".into(),
        port: "p".into(),
        alias: "a".into(),
        auth_email: "e".into(),
        auth_pass: "pw".into(),
    })
}

async fn enqueue(db: &Database, config: &ChannelConfig, max_attempts: u32, at: DateTime<Utc>) -> i64 {
    let outbound = Outbound::new("disk full", None).with_username("ada");
    let payload = JobPayload::new(config, &outbound).unwrap().to_json().unwrap();
    jobs::enqueue(db, config.kind(), &payload, max_attempts, at)
        .await
        .unwrap()
}

fn processor(db: &Database, sender: &Arc<MockSender>, config: QueueConfig) -> QueueProcessor {
    QueueProcessor::new(db.clone(), Senders::uniform(sender.clone()), &config)
}

#[tokio::test]
async fn retried_job_completes_after_three_failures() {
    let test = TestDb::new().await.unwrap();
    let sender = Arc::new(MockSender::scripted(vec![
        Err(SendError::from_status(500, "server error")),
        Err(SendError::from_status(500, "server error")),
        Err(SendError::from_status(500, "server error")),
    ]));
    let processor = processor(&test.db, &sender, QueueConfig::default());
    let id = enqueue(&test.db, &discord(), 5, t0()).await;

    // Each retry becomes due after its backoff: 1m, 5m, 15m.
    let mut now = t0();
    for wait in [0, 1, 5, 15] {
        now += Duration::minutes(wait);
        let report = processor.process_batch_at(now).await.unwrap();
        assert_eq!(report.processed, 1, "batch at +{wait}m");
    }

    let job = jobs::get_job(&test.db, id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.attempts, 3);
    assert_eq!(job.completed_at, Some(now));
    assert_eq!(sender.call_count().await, 4);

    let later = processor.process_batch_at(now + Duration::hours(2)).await.unwrap();
    assert_eq!(later, BatchReport::default());
    assert_eq!(sender.call_count().await, 4);

    test.close().await.unwrap();
}

#[tokio::test]
async fn job_fails_when_attempts_run_out() {
    let test = TestDb::new().await.unwrap();
    let sender = Arc::new(MockSender::failing(SendError::retryable("connection refused")));
    let processor = processor(&test.db, &sender, QueueConfig::default());
    let id = enqueue(&test.db, &email(), 2, t0()).await;

    let first = processor.process_batch_at(t0()).await.unwrap();
    assert_eq!((first.processed, first.failed), (1, 1));
    let job = jobs::get_job(&test.db, id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.run_at, t0() + Duration::minutes(1));

    // Not yet due.
    let early = processor.process_batch_at(t0() + Duration::seconds(30)).await.unwrap();
    assert_eq!(early.processed, 0);

    let second = processor.process_batch_at(t0() + Duration::minutes(1)).await.unwrap();
    assert_eq!((second.processed, second.failed), (1, 1));
    let job = jobs::get_job(&test.db, id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.attempts, 2);
    assert!(job.error.unwrap().contains("connection refused"));

    let claimed = jobs::claim_due(&test.db, 100, t0() + Duration::days(1)).await.unwrap();
    assert!(claimed.is_empty());
    assert_eq!(sender.call_count().await, 2);

    test.close().await.unwrap();
}

#[tokio::test]
async fn stuck_job_is_recovered_and_run_in_the_same_batch() {
    let test = TestDb::new().await.unwrap();
    let sender = Arc::new(MockSender::new());
    let processor = processor(&test.db, &sender, QueueConfig::default());

    let id = enqueue(&test.db, &discord(), 5, t0()).await;
    let now = t0() + Duration::minutes(10);
    test.mark_processing(id, now - Duration::minutes(10)).await.unwrap();

    let report = processor.process_batch_at(now).await.unwrap();
    assert_eq!(report.recovered, 1);
    assert_eq!(report.processed, 1);
    assert_eq!(report.succeeded, 1);

    let job = jobs::get_job(&test.db, id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.attempts, 0);

    test.close().await.unwrap();
}

#[tokio::test]
async fn recently_claimed_job_is_left_alone() {
    let test = TestDb::new().await.unwrap();
    let sender = Arc::new(MockSender::new());
    let processor = processor(&test.db, &sender, QueueConfig::default());

    let id = enqueue(&test.db, &discord(), 5, t0()).await;
    let now = t0() + Duration::minutes(10);
    test.mark_processing(id, now - Duration::minutes(2)).await.unwrap();

    let report = processor.process_batch_at(now).await.unwrap();
    assert_eq!(report, BatchReport::default());
    let job = jobs::get_job(&test.db, id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(sender.call_count().await, 0);

    test.close().await.unwrap();
}

#[tokio::test]
async fn permanent_errors_retry_unless_fail_fast() {
    let test = TestDb::new().await.unwrap();
    let sender = Arc::new(MockSender::failing(SendError::permanent("invalid webhook url")));

    let uniform = processor(&test.db, &sender, QueueConfig::default());
    let retried = enqueue(&test.db, &discord(), 5, t0()).await;
    uniform.process_batch_at(t0()).await.unwrap();
    let job = jobs::get_job(&test.db, retried).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.attempts, 1);

    let fail_fast = processor(
        &test.db,
        &sender,
        QueueConfig {
            fail_fast_on_permanent: true,
            ..QueueConfig::default()
        },
    );
    let dropped = enqueue(&test.db, &discord(), 5, t0()).await;
    fail_fast.process_batch_at(t0()).await.unwrap();
    let job = jobs::get_job(&test.db, dropped).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.attempts, 1);

    test.close().await.unwrap();
}

#[tokio::test]
async fn undecodable_payload_counts_as_a_failed_attempt() {
    let test = TestDb::new().await.unwrap();
    let sender = Arc::new(MockSender::new());
    let processor = processor(&test.db, &sender, QueueConfig::default());

    let id = jobs::enqueue(&test.db, JobKind::Sms, "{not json", 5, t0())
        .await
        .unwrap();
    let report = processor.process_batch_at(t0()).await.unwrap();
    assert_eq!((report.processed, report.failed), (1, 1));

    let job = jobs::get_job(&test.db, id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.attempts, 1);
    assert!(job.error.unwrap().contains("invalid job payload"));
    assert_eq!(sender.call_count().await, 0);

    test.close().await.unwrap();
}

#[tokio::test]
async fn sequential_batch_runs_jobs_in_creation_order() {
    let test = TestDb::new().await.unwrap();
    let sender = Arc::new(MockSender::new());
    let processor = processor(
        &test.db,
        &sender,
        QueueConfig {
            batch_size: 2,
            ..QueueConfig::default()
        },
    );

    enqueue(&test.db, &discord(), 5, t0()).await;
    enqueue(&test.db, &email(), 5, t0() + Duration::seconds(1)).await;
    enqueue(&test.db, &discord(), 5, t0() + Duration::seconds(2)).await;

    let now = t0() + Duration::minutes(1);
    let report = processor.process_batch_at(now).await.unwrap();
    assert_eq!(report.processed, 2);
    let kinds: Vec<JobKind> = sender.calls().await.iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec![JobKind::Discord, JobKind::Email]);

    let counts = jobs::count_by_status(&test.db).await.unwrap();
    assert_eq!(counts.completed, 2);
    assert_eq!(counts.pending, 1);

    test.close().await.unwrap();
}

#[tokio::test]
async fn concurrent_workers_process_every_job_once() {
    let test = TestDb::new().await.unwrap();
    let sender = Arc::new(MockSender::new());
    let processor = processor(
        &test.db,
        &sender,
        QueueConfig {
            workers: 4,
            ..QueueConfig::default()
        },
    );

    for i in 0..10 {
        enqueue(&test.db, &discord(), 5, t0() + Duration::seconds(i)).await;
    }
    let report = processor.process_batch_at(t0() + Duration::minutes(1)).await.unwrap();
    assert_eq!(report.processed, 10);
    assert_eq!(report.succeeded, 10);
    assert_eq!(sender.call_count().await, 10);

    test.close().await.unwrap();
}

#[tokio::test]
async fn cleanup_removes_only_old_completed_jobs() {
    let test = TestDb::new().await.unwrap();
    let sender = Arc::new(MockSender::scripted(vec![Ok(()), Err(SendError::retryable("x"))]));
    let processor = processor(&test.db, &sender, QueueConfig::default());

    let done = enqueue(&test.db, &discord(), 5, t0()).await;
    let pending = enqueue(&test.db, &discord(), 5, t0() + Duration::seconds(1)).await;
    processor.process_batch_at(t0() + Duration::seconds(5)).await.unwrap();

    let deleted = processor.cleanup_at(7, t0() + Duration::days(3)).await.unwrap();
    assert_eq!(deleted, 0);

    let deleted = processor.cleanup_at(7, t0() + Duration::days(8)).await.unwrap();
    assert_eq!(deleted, 1);
    assert!(jobs::get_job(&test.db, done).await.unwrap().is_none());
    assert!(jobs::get_job(&test.db, pending).await.unwrap().is_some());

    test.close().await.unwrap();
}

/// Discord sender that takes 61 seconds of simulated time per call.
struct SlowSender {
    now: Arc<Mutex<DateTime<Utc>>>,
    outcomes: Mutex<VecDeque<Result<(), SendError>>>,
}

#[async_trait]
impl ChannelSender<DiscordConfig> for SlowSender {
    async fn send(&self, _outbound: &Outbound, _config: &DiscordConfig) -> Result<(), SendError> {
        *self.now.lock().unwrap() += Duration::seconds(61);
        self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

#[tokio::test]
async fn live_batch_stamps_each_outcome_when_it_is_recorded() {
    let test = TestDb::new().await.unwrap();
    let now = Arc::new(Mutex::new(t0()));
    let slow = Arc::new(SlowSender {
        now: now.clone(),
        outcomes: Mutex::new(VecDeque::from(vec![Ok(()), Err(SendError::from_status(500, "down"))])),
    });
    let mock = Arc::new(MockSender::new());
    let clock_now = now.clone();
    let clock: Clock = Arc::new(move || *clock_now.lock().unwrap());
    let processor = QueueProcessor::new(
        test.db.clone(),
        Senders::new(mock.clone(), mock, slow),
        &QueueConfig::default(),
    )
    .with_clock(clock);

    let done = enqueue(&test.db, &discord(), 5, t0()).await;
    let retried = enqueue(&test.db, &discord(), 5, t0()).await;
    let report = processor.process_batch().await.unwrap();
    assert_eq!((report.succeeded, report.failed), (1, 1));

    let job = jobs::get_job(&test.db, done).await.unwrap().unwrap();
    assert_eq!(job.completed_at, Some(t0() + Duration::seconds(61)));

    // The failure is recorded 122s into the batch; its retry must still lie ahead.
    let failed_at = t0() + Duration::seconds(122);
    let job = jobs::get_job(&test.db, retried).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.run_at > failed_at);
    assert_eq!(job.run_at, failed_at + Duration::minutes(1));

    test.close().await.unwrap();
}
