//! Integration tests for layered configuration loading.

use autoscribe::comments::Frequency;
use autoscribe::config::{CommentApproval, ConfigLoader, ImageMode};
use autoscribe::provider::ProviderMode;
use std::sync::Mutex;
use tempfile::TempDir;

/// Serializes tests that read or write process environment variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn write_workspace_file(root: &std::path::Path, name: &str, body: &str) {
    let dir = root.join("config");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(name), body).unwrap();
}

#[test]
fn test_load_from_file_reads_every_section() {
    let _env = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("autoscribe.toml");

    std::fs::write(
        &config_file,
        r#"
[providers]
mode = "gemini"
call_timeout_secs = 20

[providers.gemini]
api_key = "g-key"
model = "gemini-test"

[content]
word_count_min = 800
word_count_max = 1500
categories = ["Guides", "News"]
target_category = "Guides"
site_url = "https://blog.example.org"

[schedule]
interval_hours = 96
preferred_times = ["08:15"]

[comments]
min = 2
max = 4
frequency = "dense"
status = "hold"
author_prefix = "reader"

[images]
enabled = true
mode = "remote"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    assert!(config.validate().is_ok());

    assert_eq!(config.providers.mode, ProviderMode::Secondary);
    assert_eq!(config.providers.call_timeout_secs, 20);
    assert_eq!(config.providers.gemini.model, "gemini-test");
    assert_eq!(config.providers.openai.model, "gpt-4.1-mini");
    assert_eq!(config.content.categories, vec!["Guides", "News"]);
    assert_eq!(config.content.site_host(), "blog.example.org");
    assert_eq!(config.schedule.interval_hours, 96);
    assert_eq!(config.schedule.preferred_times, vec!["08:15"]);
    assert_eq!(config.comments.frequency(), Frequency::Dense);
    assert_eq!(config.comments.status, CommentApproval::Hold);
    assert_eq!(config.images.mode, ImageMode::Remote);
}

#[test]
fn test_missing_file_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = ConfigLoader::load_from_file(&temp_dir.path().join("absent.toml")).unwrap_err();
    assert_eq!(err.kind(), "config_error");
}

#[test]
fn test_defaults_when_workspace_has_no_files() {
    let _env = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = TempDir::new().unwrap();
    let config = ConfigLoader::load(temp_dir.path()).unwrap();

    assert_eq!(config.providers.mode, ProviderMode::Auto);
    assert_eq!(config.providers.call_timeout_secs, 15);
    assert_eq!(config.schedule.interval_hours, 72);
    assert_eq!(config.schedule.preferred_times, vec!["09:00", "11:30"]);
    assert_eq!(config.comments.drain_budget, 3);
    assert_eq!(config.comments.drain_batch, 5);
    // No api keys anywhere: auto mode cannot reach a provider.
    assert!(config.validate().is_err());
}

#[test]
fn test_env_file_overrides_base_file() {
    let _env = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = TempDir::new().unwrap();
    write_workspace_file(
        temp_dir.path(),
        "config.toml",
        r#"
[comments]
min = 2
max = 3

[schedule]
interval_hours = 100
"#,
    );
    write_workspace_file(
        temp_dir.path(),
        "staging.toml",
        r#"
[comments]
max = 8
"#,
    );

    std::env::set_var("AUTOSCRIBE_ENV", "staging");
    let config = ConfigLoader::load(temp_dir.path());
    std::env::remove_var("AUTOSCRIBE_ENV");
    let config = config.unwrap();

    assert_eq!(config.comments.min, 2);
    assert_eq!(config.comments.max, 8);
    assert_eq!(config.schedule.interval_hours, 100);
}

#[test]
fn test_environment_overrides_files() {
    let _env = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = TempDir::new().unwrap();
    write_workspace_file(
        temp_dir.path(),
        "config.toml",
        r#"
[schedule]
interval_hours = 100
"#,
    );

    std::env::set_var("AUTOSCRIBE__SCHEDULE__INTERVAL_HOURS", "120");
    std::env::set_var("AUTOSCRIBE__PROVIDERS__OPENAI__API_KEY", "sk-env");
    let config = ConfigLoader::load(temp_dir.path());
    std::env::remove_var("AUTOSCRIBE__SCHEDULE__INTERVAL_HOURS");
    std::env::remove_var("AUTOSCRIBE__PROVIDERS__OPENAI__API_KEY");
    let config = config.unwrap();

    assert_eq!(config.schedule.interval_hours, 120);
    assert_eq!(config.providers.openai.api_key.as_deref(), Some("sk-env"));
    assert!(config.validate().is_ok());
}

#[test]
fn test_validation_collects_every_violation() {
    let _env = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("bad.toml");
    std::fs::write(
        &config_file,
        r#"
[providers]
mode = "primary"

[schedule]
interval_hours = 24
preferred_times = ["9am"]

[comments]
min = 5
max = 2
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    let errors = config.validate().unwrap_err();
    let sections: Vec<&str> = errors.iter().map(|e| e.section).collect();
    assert!(sections.contains(&"providers"));
    assert!(sections.contains(&"comments"));
    assert_eq!(sections.iter().filter(|s| **s == "schedule").count(), 2);
}
