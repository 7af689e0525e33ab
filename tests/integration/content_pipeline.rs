//! Content pipeline: generation, persistence, linking, preview and failure paths.

use super::support::{
    automation, gateway, test_config, writer, FailingContentStore, RecordingNotifier, Route,
    ScriptedProvider,
};
use autoscribe::content::{ContentPipeline, GeneratedItem, PipelineOutcome, PipelineSettings};
use autoscribe::error::AutomationError;
use autoscribe::notify::NoopNotifier;
use autoscribe::provider::{ModelProviderClient, ProviderMode};
use autoscribe::store::{ContentStore, ItemStatus, NewItem};
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

fn single(provider: ScriptedProvider) -> autoscribe::provider::ProviderGateway {
    let provider: Arc<dyn ModelProviderClient> = Arc::new(provider);
    gateway(Some(provider), None, ProviderMode::Primary)
}

#[tokio::test]
async fn test_run_persists_item_and_creates_plan() {
    let temp = TempDir::new().unwrap();
    let automation = automation(&temp, test_config(), single(writer("a")), Arc::new(NoopNotifier));

    let outcome = automation.pipeline.run(now()).await;
    let item_id = outcome.item_id().expect("item produced");

    let record = automation.content.get_item(item_id).unwrap().unwrap();
    assert_eq!(record.title, "Rust Ownership Basics");
    assert_eq!(record.slug, "rust-ownership-basics");
    assert_eq!(record.generated_at, now());

    let plan = automation.plans.get(item_id).unwrap().expect("plan created");
    assert_eq!(plan.context.title, "Rust Ownership Basics");
    assert_eq!(plan.actions.len(), 2);

    let state = automation.status.all().unwrap();
    assert_eq!(state.last_item_id, Some(item_id));
    assert_eq!(state.pending_action_count, 2);
}

#[tokio::test]
async fn test_preview_mode_persists_nothing() {
    let temp = TempDir::new().unwrap();
    let mut config = test_config();
    config.content.preview_mode = true;
    let automation = automation(&temp, config, single(writer("a")), Arc::new(NoopNotifier));

    let outcome = automation.pipeline.run(now()).await;
    assert!(matches!(outcome, PipelineOutcome::Previewed(ref item) if item.title == "Rust Ownership Basics"));
    assert_eq!(automation.content.item_count(), 0);
    assert!(automation.status.all().unwrap().last_item_id.is_none());
    assert_eq!(automation.queue.pending_count().unwrap(), 0);
}

#[tokio::test]
async fn test_both_providers_failing_produces_nothing() {
    let temp = TempDir::new().unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let a: Arc<dyn ModelProviderClient> =
        Arc::new(ScriptedProvider::new("alpha").failing(Route::Item, "timeout"));
    let b: Arc<dyn ModelProviderClient> =
        Arc::new(ScriptedProvider::new("beta").failing(Route::Item, "quota"));
    let automation = automation(
        &temp,
        test_config(),
        gateway(Some(a), Some(b), ProviderMode::Auto),
        notifier.clone(),
    );

    let outcome = automation.pipeline.run(now()).await;
    let Some(AutomationError::ProviderFailure(reason)) = outcome.error() else {
        panic!("expected provider failure, got {:?}", outcome);
    };
    assert!(reason.contains("alpha") && reason.contains("beta"));
    assert_eq!(automation.content.item_count(), 0);
    // Provider failures are not fatal-class.
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_unconfigured_gateway_is_configuration_missing() {
    let temp = TempDir::new().unwrap();
    let automation = automation(
        &temp,
        test_config(),
        gateway(None, None, ProviderMode::Auto),
        Arc::new(NoopNotifier),
    );

    let outcome = automation.pipeline.run(now()).await;
    assert!(matches!(
        outcome.error(),
        Some(AutomationError::ConfigurationMissing(_))
    ));
}

#[tokio::test]
async fn test_persistence_failure_notifies_operator() {
    let temp = TempDir::new().unwrap();
    let config = test_config();
    let automation = automation(&temp, config.clone(), single(writer("a")), Arc::new(NoopNotifier));
    let notifier = Arc::new(RecordingNotifier::default());

    let pipeline = ContentPipeline::new(
        PipelineSettings::from_config(&config),
        automation.gateway.clone(),
        automation.content.clone(),
        automation.content.clone(),
        Arc::new(FailingContentStore),
        None,
        automation.queue.clone(),
        automation.status.clone(),
        notifier.clone(),
    );

    let outcome = pipeline.run(now()).await;
    assert!(matches!(
        outcome.error(),
        Some(AutomationError::PersistenceFailure(_))
    ));
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "autoscribe: persistence_failure");
    assert!(automation.status.all().unwrap().last_item_id.is_none());
}

#[tokio::test]
async fn test_links_only_point_at_offered_items() {
    let temp = TempDir::new().unwrap();
    let provider = writer("a").text(
        Route::Links,
        r#"{"links":[
            {"anchor":"memory safe","url":"https://blog.example.org/garbage-collection"},
            {"anchor":"collector","url":"https://elsewhere.example/spam"}
        ]}"#,
    );
    let automation = automation(&temp, test_config(), single(provider), Arc::new(NoopNotifier));

    let mut older = GeneratedItem::new("Garbage Collection", "<p>Older post.</p>");
    older.slug = Some("garbage-collection".to_string());
    automation
        .content
        .create_item(&NewItem::from_generated(&older, ItemStatus::Publish, None, now()))
        .unwrap();

    let item_id = automation.pipeline.run(now()).await.item_id().unwrap();
    let body = automation.content.get_item(item_id).unwrap().unwrap().body;
    assert!(body.contains(r#"<a href="https://blog.example.org/garbage-collection">memory safe</a>"#));
    assert!(!body.contains("elsewhere.example"));
}

#[tokio::test]
async fn test_link_failure_keeps_original_body() {
    let temp = TempDir::new().unwrap();
    let provider = writer("a").failing(Route::Links, "overloaded");
    let automation = automation(&temp, test_config(), single(provider), Arc::new(NoopNotifier));

    let older = GeneratedItem::new("Older", "<p>Older post.</p>");
    automation
        .content
        .create_item(&NewItem::from_generated(&older, ItemStatus::Publish, None, now()))
        .unwrap();

    let item_id = automation.pipeline.run(now()).await.item_id().unwrap();
    let body = automation.content.get_item(item_id).unwrap().unwrap().body;
    assert_eq!(body, "<p>Ownership keeps memory safe without a collector.</p>");
}

#[tokio::test]
async fn test_preview_does_not_touch_store() {
    let temp = TempDir::new().unwrap();
    let automation = automation(&temp, test_config(), single(writer("a")), Arc::new(NoopNotifier));

    let item = automation.pipeline.preview().await.unwrap();
    assert_eq!(item.summary.as_deref(), Some("Why ownership matters."));
    assert_eq!(automation.content.item_count(), 0);
}
