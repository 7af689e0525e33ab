//! Configuration System
//!
//! Layered configuration for the automation engine: built-in defaults, the global
//! config file, workspace files, then `AUTOSCRIBE__*` environment variables. The
//! resulting [`AutomationConfig`] is an explicit value handed to every component at
//! construction; nothing reads settings from ambient state afterwards.

use crate::comments::{Frequency, MAX_ACTIONS_PER_PLAN};
use crate::error::AutomationError;
use crate::logging::LoggingConfig;
use crate::media::photo::Orientation;
use crate::provider::ProviderMode;
use crate::scheduler::timing::parse_time_of_day;
use crate::store::ItemStatus;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutomationConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub content: ContentConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub comments: CommentConfig,

    #[serde(default)]
    pub images: ImageConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub system: SystemConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Generation provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// primary, secondary or auto (aliases: openai, gemini)
    #[serde(default)]
    pub mode: ProviderMode,

    /// Upper bound for a single provider attempt.
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Provider A
    #[serde(default = "default_openai")]
    pub openai: ProviderConfig,

    /// Provider B
    #[serde(default = "default_gemini")]
    pub gemini: ProviderConfig,
}

/// One provider slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    #[serde(default)]
    pub image_model: Option<String>,
    /// Base URL override (proxies, test servers)
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl ProviderConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }
}

fn default_call_timeout_secs() -> u64 {
    15
}

fn default_system_prompt() -> String {
    "You are an experienced editor. You write well-structured, factual articles as clean HTML \
     and always answer with the exact JSON shape you are asked for."
        .to_string()
}

fn default_openai() -> ProviderConfig {
    ProviderConfig {
        api_key: None,
        model: "gpt-4.1-mini".to_string(),
        image_model: Some("gpt-image-1".to_string()),
        endpoint: None,
    }
}

fn default_gemini() -> ProviderConfig {
    ProviderConfig {
        api_key: None,
        model: "gemini-2.0-flash".to_string(),
        image_model: Some("gemini-2.0-flash-preview-image-generation".to_string()),
        endpoint: None,
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            mode: ProviderMode::default(),
            call_timeout_secs: default_call_timeout_secs(),
            system_prompt: default_system_prompt(),
            openai: default_openai(),
            gemini: default_gemini(),
        }
    }
}

/// What gets written and how it is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_topic_strategy")]
    pub topic_strategy: String,
    #[serde(default = "default_word_count_min")]
    pub word_count_min: u32,
    #[serde(default = "default_word_count_max")]
    pub word_count_max: u32,
    /// Taxonomy offered to the model as context.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Category assigned to new items.
    #[serde(default)]
    pub target_category: Option<String>,
    #[serde(default)]
    pub default_status: ItemStatus,
    #[serde(default)]
    pub link_keywords: Vec<String>,
    #[serde(default = "default_true")]
    pub internal_linking: bool,
    /// Generate and log, never persist.
    #[serde(default)]
    pub preview_mode: bool,
    #[serde(default = "default_site_url")]
    pub site_url: String,
}

fn default_topic_strategy() -> String {
    "Practical guides and news for the site's audience, one clear topic per article".to_string()
}

fn default_word_count_min() -> u32 {
    600
}

fn default_word_count_max() -> u32 {
    1200
}

fn default_site_url() -> String {
    "https://example.com".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            topic_strategy: default_topic_strategy(),
            word_count_min: default_word_count_min(),
            word_count_max: default_word_count_max(),
            categories: Vec::new(),
            target_category: None,
            default_status: ItemStatus::default(),
            link_keywords: Vec::new(),
            internal_linking: true,
            preview_mode: false,
            site_url: default_site_url(),
        }
    }
}

impl ContentConfig {
    /// Host part of `site_url`, used for synthesized comment e-mails.
    pub fn site_host(&self) -> String {
        let without_scheme = self
            .site_url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.site_url);
        without_scheme
            .split(['/', ':'])
            .next()
            .filter(|h| !h.is_empty())
            .unwrap_or("localhost")
            .to_string()
    }
}

/// Generation cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Target interval; values below 72 are raised to 72.
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u32,
    /// Preferred publication times of day, `HH:MM`.
    #[serde(default = "default_preferred_times")]
    pub preferred_times: Vec<String>,
    /// Offset applied when interpreting preferred times.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Daemon cadence for generation ticks.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// Daemon cadence for comment drains.
    #[serde(default = "default_drain_interval_secs")]
    pub drain_interval_secs: u64,
}

fn default_interval_hours() -> u32 {
    72
}

fn default_preferred_times() -> Vec<String> {
    vec!["09:00".to_string(), "11:30".to_string()]
}

fn default_tick_interval_secs() -> u64 {
    300
}

fn default_drain_interval_secs() -> u64 {
    900
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_hours: default_interval_hours(),
            preferred_times: default_preferred_times(),
            utc_offset_minutes: 0,
            tick_interval_secs: default_tick_interval_secs(),
            drain_interval_secs: default_drain_interval_secs(),
        }
    }
}

/// Approval state for inserted comments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentApproval {
    #[default]
    Approve,
    Hold,
}

/// Follow-up comment queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_comment_min")]
    pub min: u32,
    #[serde(default = "default_comment_max")]
    pub max: u32,
    /// dense, normal; anything else spreads over a week
    #[serde(default = "default_frequency")]
    pub frequency: String,
    #[serde(default)]
    pub status: CommentApproval,
    #[serde(default)]
    pub author_prefix: String,
    /// Maximum actions completed per drain call, across all plans.
    #[serde(default = "default_drain_budget")]
    pub drain_budget: usize,
    /// Maximum plans examined per drain call.
    #[serde(default = "default_drain_batch")]
    pub drain_batch: usize,
}

fn default_comment_min() -> u32 {
    3
}

fn default_comment_max() -> u32 {
    6
}

fn default_frequency() -> String {
    "normal".to_string()
}

fn default_drain_budget() -> usize {
    3
}

fn default_drain_batch() -> usize {
    5
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min: default_comment_min(),
            max: default_comment_max(),
            frequency: default_frequency(),
            status: CommentApproval::default(),
            author_prefix: String::new(),
            drain_budget: default_drain_budget(),
            drain_batch: default_drain_batch(),
        }
    }
}

impl CommentConfig {
    pub fn frequency(&self) -> Frequency {
        Frequency::from_label(&self.frequency)
    }
}

/// Featured image engine selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMode {
    /// Stock photo search plus local overlay.
    #[default]
    Server,
    /// Provider image generation.
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub mode: ImageMode,
    /// Caption template; `{{title}}` and `{{summary}}` are substituted.
    #[serde(default = "default_image_template")]
    pub template: String,
    #[serde(default = "default_overlay_color")]
    pub overlay_color: String,
    #[serde(default)]
    pub pixabay_api_key: Option<String>,
    #[serde(default = "default_pixabay_query")]
    pub pixabay_query: String,
    #[serde(default)]
    pub pixabay_orientation: Orientation,
    #[serde(default)]
    pub pixabay_endpoint: Option<String>,
    /// Bound on each photo search and photo download.
    #[serde(default = "default_image_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_image_request_timeout() -> u64 {
    15
}

fn default_image_template() -> String {
    "{{title}}".to_string()
}

fn default_overlay_color() -> String {
    "1b1f3b".to_string()
}

fn default_pixabay_query() -> String {
    "technology".to_string()
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: ImageMode::default(),
            template: default_image_template(),
            overlay_color: default_overlay_color(),
            pixabay_api_key: None,
            pixabay_query: default_pixabay_query(),
            pixabay_orientation: Orientation::default(),
            pixabay_endpoint: None,
            request_timeout_secs: default_image_request_timeout(),
        }
    }
}

/// Operator notifications for fatal-class errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub email: Option<String>,
    /// HTTP mail relay receiving `{to, subject, body}`.
    #[serde(default)]
    pub relay_url: Option<String>,
}

/// System-wide configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Sled directory; relative paths resolve against the workspace root.
    #[serde(default)]
    pub store_path: Option<PathBuf>,
}

impl SystemConfig {
    pub fn resolve_store_path(&self, workspace_root: &Path) -> PathBuf {
        match &self.store_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => workspace_root.join(path),
            None => workspace_root.join(".autoscribe").join("store"),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub section: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(section: &'static str, message: impl Into<String>) -> Self {
        Self {
            section,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.section, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl AutomationConfig {
    /// Validate the entire configuration, collecting every violation.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        let providers = &self.providers;
        let needs_primary = providers.mode == ProviderMode::Primary;
        let needs_secondary = providers.mode == ProviderMode::Secondary;
        if needs_primary && !providers.openai.is_configured() {
            errors.push(ValidationError::new(
                "providers",
                "mode 'primary' requires providers.openai.api_key",
            ));
        }
        if needs_secondary && !providers.gemini.is_configured() {
            errors.push(ValidationError::new(
                "providers",
                "mode 'secondary' requires providers.gemini.api_key",
            ));
        }
        if providers.mode == ProviderMode::Auto
            && !providers.openai.is_configured()
            && !providers.gemini.is_configured()
        {
            errors.push(ValidationError::new(
                "providers",
                "mode 'auto' requires at least one provider api_key",
            ));
        }
        if providers.call_timeout_secs == 0 {
            errors.push(ValidationError::new("providers", "call_timeout_secs must be > 0"));
        }

        let content = &self.content;
        if content.word_count_min < 200 {
            errors.push(ValidationError::new("content", "word_count_min must be >= 200"));
        }
        if content.word_count_max < content.word_count_min {
            errors.push(ValidationError::new(
                "content",
                "word_count_max must be >= word_count_min",
            ));
        }

        let schedule = &self.schedule;
        if schedule.interval_hours < 72 {
            errors.push(ValidationError::new("schedule", "interval_hours must be >= 72"));
        }
        if schedule.preferred_times.is_empty() {
            errors.push(ValidationError::new("schedule", "preferred_times cannot be empty"));
        }
        for raw in &schedule.preferred_times {
            if parse_time_of_day(raw).is_none() {
                errors.push(ValidationError::new(
                    "schedule",
                    format!("preferred time '{}' is not HH:MM", raw),
                ));
            }
        }

        let comments = &self.comments;
        if comments.min < 1 {
            errors.push(ValidationError::new("comments", "min must be >= 1"));
        }
        if comments.max < comments.min {
            errors.push(ValidationError::new("comments", "max must be >= min"));
        }
        if comments.max > MAX_ACTIONS_PER_PLAN {
            errors.push(ValidationError::new(
                "comments",
                format!("max must be <= {}", MAX_ACTIONS_PER_PLAN),
            ));
        }
        if comments.drain_budget == 0 || comments.drain_batch == 0 {
            errors.push(ValidationError::new(
                "comments",
                "drain_budget and drain_batch must be >= 1",
            ));
        }

        let images = &self.images;
        if crate::media::compose::parse_hex_color(&images.overlay_color).is_none() {
            errors.push(ValidationError::new(
                "images",
                format!("overlay_color '{}' is not a hex color", images.overlay_color),
            ));
        }
        if images.request_timeout_secs == 0 {
            errors.push(ValidationError::new("images", "request_timeout_secs must be >= 1"));
        }
        if images.enabled && images.mode == ImageMode::Server && images.pixabay_api_key.is_none()
        {
            errors.push(ValidationError::new(
                "images",
                "server mode requires images.pixabay_api_key",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validation folded into a single error, as used by the CLI.
    pub fn ensure_valid(&self) -> Result<(), AutomationError> {
        self.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            AutomationError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                msgs.join("\n")
            ))
        })
    }
}
