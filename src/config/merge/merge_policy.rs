//! Merge rules: defaults first, later sources override earlier ones key by key.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Only the knobs the scheduler and queue depend on are seeded here; every other
/// field falls back to its serde default.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("providers.mode", "auto")?
        .set_default("providers.call_timeout_secs", 15)?
        .set_default("schedule.interval_hours", 72)?
        .set_default("schedule.preferred_times", vec!["09:00", "11:30"])?
        .set_default("comments.drain_budget", 3)?
        .set_default("comments.drain_batch", 5)
}
