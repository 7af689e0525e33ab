//! Scheduler: arming, due ticks, single-winner runs, pause/block and error recording.

use super::support::{
    automation, gateway, test_config, writer, FailingImageEngine, Route, ScriptedProvider,
};
use autoscribe::content::{ContentPipeline, PipelineOutcome, PipelineSettings};
use autoscribe::error::StorageError;
use autoscribe::media::ImageEngine;
use autoscribe::notify::NoopNotifier;
use autoscribe::provider::{ModelProviderClient, ProviderMode};
use autoscribe::runtime::Automation;
use autoscribe::scheduler::{AutomationScheduler, DrainOutcome, SchedulerSettings, TickOutcome};
use autoscribe::status::{AutomationState, JobClass, StateLabel, StatusPatch, StatusStore};
use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use std::sync::Arc;
use tempfile::TempDir;

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

fn with_provider(temp: &TempDir, provider: ScriptedProvider) -> Automation {
    let provider: Arc<dyn ModelProviderClient> = Arc::new(provider);
    automation(
        temp,
        test_config(),
        gateway(Some(provider), None, ProviderMode::Primary),
        Arc::new(NoopNotifier),
    )
}

fn make_due(automation: &Automation) {
    automation
        .status
        .merge(StatusPatch::new().next_run_at(now() - Duration::minutes(1)))
        .unwrap();
}

#[tokio::test]
async fn test_first_tick_arms_within_window() {
    let temp = TempDir::new().unwrap();
    let automation = with_provider(&temp, writer("a"));

    let TickOutcome::Armed(next) = automation.scheduler.tick(now()).await.unwrap() else {
        panic!("first tick should arm the schedule");
    };
    assert!(next >= now() + Duration::hours(72));
    assert!(next <= now() + Duration::hours(168) + Duration::days(1));
    let slot = (next.hour(), next.minute());
    assert!(slot == (9, 0) || slot == (11, 30));

    assert_eq!(automation.status.all().unwrap().next_run_at, Some(next));
    assert_eq!(automation.content.item_count(), 0);
}

#[tokio::test]
async fn test_due_tick_runs_once_then_waits() {
    let temp = TempDir::new().unwrap();
    let automation = with_provider(&temp, writer("a"));
    make_due(&automation);

    let TickOutcome::Ran { outcome, next_run_at } = automation.scheduler.tick(now()).await.unwrap()
    else {
        panic!("due tick should run");
    };
    assert!(matches!(outcome, PipelineOutcome::Produced { .. }));
    assert!(next_run_at >= now() + Duration::hours(72));

    let state = automation.status.all().unwrap();
    assert_eq!(state.last_run_at, Some(now()));
    assert_eq!(state.next_run_at, Some(next_run_at));

    let again = automation.scheduler.tick(now()).await.unwrap();
    assert!(matches!(again, TickOutcome::NotDue(next) if next == next_run_at));
    assert_eq!(automation.content.item_count(), 1);
}

#[tokio::test]
async fn test_concurrent_ticks_have_one_winner() {
    let temp = TempDir::new().unwrap();
    let provider = writer("a").with_delay(std::time::Duration::from_millis(50));
    let automation = with_provider(&temp, provider);
    make_due(&automation);

    let (first, second) = tokio::join!(
        automation.scheduler.tick(now()),
        automation.scheduler.tick(now())
    );
    let outcomes = [first.unwrap(), second.unwrap()];
    let ran = outcomes
        .iter()
        .filter(|o| matches!(o, TickOutcome::Ran { .. }))
        .count();
    assert_eq!(ran, 1);
    assert_eq!(automation.content.item_count(), 1);
}

#[tokio::test]
async fn test_paused_skips_generation_and_drain() {
    let temp = TempDir::new().unwrap();
    let automation = with_provider(&temp, writer("a"));
    make_due(&automation);
    automation.scheduler.pause().unwrap();

    assert!(matches!(
        automation.scheduler.tick(now()).await.unwrap(),
        TickOutcome::Paused
    ));
    assert!(matches!(
        automation.scheduler.run_now(now()).await.unwrap(),
        TickOutcome::Paused
    ));
    assert!(matches!(
        automation.scheduler.drain_queues(now()).await.unwrap(),
        DrainOutcome::Paused
    ));
    assert_eq!(automation.content.item_count(), 0);

    automation.scheduler.resume().unwrap();
    assert!(matches!(
        automation.scheduler.tick(now()).await.unwrap(),
        TickOutcome::Ran { .. }
    ));
}

#[tokio::test]
async fn test_block_wins_over_pause() {
    let temp = TempDir::new().unwrap();
    let automation = with_provider(&temp, writer("a"));
    make_due(&automation);
    automation.scheduler.pause().unwrap();
    automation.scheduler.block("maintenance").unwrap();

    assert!(matches!(
        automation.scheduler.tick(now()).await.unwrap(),
        TickOutcome::Blocked(ref reason) if reason == "maintenance"
    ));
    assert!(matches!(
        automation.scheduler.drain_queues(now()).await.unwrap(),
        DrainOutcome::Blocked(_)
    ));
    assert_eq!(automation.scheduler.snapshot().unwrap().state, StateLabel::Blocked);

    automation.scheduler.unblock().unwrap();
    assert_eq!(automation.scheduler.snapshot().unwrap().state, StateLabel::Paused);
}

#[tokio::test]
async fn test_failed_run_records_error_and_reschedules() {
    let temp = TempDir::new().unwrap();
    let automation = with_provider(&temp, ScriptedProvider::new("a").failing(Route::Item, "503"));
    make_due(&automation);

    let TickOutcome::Ran { outcome, next_run_at } = automation.scheduler.tick(now()).await.unwrap()
    else {
        panic!("due tick should run");
    };
    assert!(matches!(outcome, PipelineOutcome::NothingProduced(_)));
    assert!(next_run_at > now());

    let state = automation.status.all().unwrap();
    assert!(state.last_error.as_deref().unwrap_or("").contains("503"));
    assert_eq!(state.last_error_at, Some(now()));
    assert_eq!(state.next_run_at, Some(next_run_at));
    assert!(!state.paused);
}

#[tokio::test]
async fn test_success_clears_previous_error() {
    let temp = TempDir::new().unwrap();
    let automation = with_provider(&temp, writer("a"));
    automation
        .status
        .merge(StatusPatch::new().error("earlier failure", now() - Duration::days(3)))
        .unwrap();

    let outcome = automation.scheduler.run_now(now()).await.unwrap();
    assert!(matches!(outcome, TickOutcome::Ran { .. }));
    assert!(automation.status.all().unwrap().last_error.is_none());
}

#[tokio::test]
async fn test_drain_queues_uses_global_budget() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config();
    config.comments.min = 5;
    config.comments.max = 5;
    let provider: Arc<dyn ModelProviderClient> = Arc::new(writer("a"));
    let automation = automation(
        &temp,
        config,
        gateway(Some(provider), None, ProviderMode::Primary),
        Arc::new(NoopNotifier),
    );
    automation.scheduler.run_now(now()).await.unwrap();
    assert_eq!(automation.queue.pending_count().unwrap(), 5);

    let DrainOutcome::Drained(report) = automation
        .scheduler
        .drain_queues(now() + Duration::days(30))
        .await
        .unwrap()
    else {
        panic!("expected a drain");
    };
    assert_eq!(report.executed, 3);
    assert_eq!(automation.scheduler.snapshot().unwrap().pending_action_count, 2);
}

/// Rejects the combined post-run record (last run plus next run) and passes
/// every other write through.
struct RejectRunRecord {
    inner: Arc<dyn StatusStore>,
}

impl StatusStore for RejectRunRecord {
    fn all(&self) -> Result<AutomationState, StorageError> {
        self.inner.all()
    }

    fn merge(&self, patch: StatusPatch) -> Result<AutomationState, StorageError> {
        let mut touched = AutomationState::default();
        patch.apply(&mut touched);
        if touched.last_run_at.is_some() && touched.next_run_at.is_some() {
            return Err(StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "status tree unavailable",
            )));
        }
        self.inner.merge(patch)
    }

    fn try_acquire_guard(
        &self,
        job: JobClass,
        token: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool, StorageError> {
        self.inner.try_acquire_guard(job, token, now, ttl)
    }

    fn release_guard(&self, job: JobClass, token: &str) -> Result<(), StorageError> {
        self.inner.release_guard(job, token)
    }
}

fn scheduler_with(
    automation: &Automation,
    images: Option<Arc<dyn ImageEngine>>,
    status: Arc<dyn StatusStore>,
) -> AutomationScheduler {
    let pipeline = ContentPipeline::new(
        PipelineSettings::from_config(&automation.config),
        automation.gateway.clone(),
        automation.content.clone(),
        automation.content.clone(),
        automation.content.clone(),
        images,
        automation.queue.clone(),
        status.clone(),
        Arc::new(NoopNotifier),
    );
    AutomationScheduler::new(
        SchedulerSettings::from_config(&automation.config),
        Arc::new(pipeline),
        automation.queue.clone(),
        status,
    )
}

#[tokio::test]
async fn test_image_failure_is_kept_as_run_error() {
    let temp = TempDir::new().unwrap();
    let automation = with_provider(&temp, writer("a"));
    let images: Arc<dyn ImageEngine> = Arc::new(FailingImageEngine);
    let scheduler = scheduler_with(&automation, Some(images), automation.status.clone());

    let TickOutcome::Ran { outcome, .. } = scheduler.run_now(now()).await.unwrap() else {
        panic!("manual run should run");
    };
    assert!(outcome.item_id().is_some());
    assert_eq!(outcome.warnings().len(), 1);

    let state = automation.status.all().unwrap();
    let error = state.last_error.unwrap_or_default();
    assert!(error.contains("featured image"), "{}", error);
    assert_eq!(state.last_error_at, Some(now()));
    assert_eq!(state.last_item_id, outcome.item_id());
}

#[tokio::test]
async fn test_next_run_survives_failed_run_record() {
    let temp = TempDir::new().unwrap();
    let automation = with_provider(&temp, writer("a"));
    make_due(&automation);
    let status: Arc<dyn StatusStore> = Arc::new(RejectRunRecord {
        inner: automation.status.clone(),
    });
    let scheduler = scheduler_with(&automation, None, status);

    let TickOutcome::Ran { next_run_at, .. } = scheduler.tick(now()).await.unwrap() else {
        panic!("due tick should run");
    };
    assert_eq!(automation.status.all().unwrap().next_run_at, Some(next_run_at));

    let again = scheduler.tick(now()).await.unwrap();
    assert!(matches!(again, TickOutcome::NotDue(next) if next == next_run_at));
    assert_eq!(automation.content.item_count(), 1);
}
