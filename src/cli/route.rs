//! CLI route: single route table and run context. Dispatches to the automation
//! components and presentation.

use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_drain_outcome, format_item_json, format_item_text, format_status_json,
    format_status_text, format_tick_outcome, format_validation_errors,
};
use crate::config::{AutomationConfig, ConfigLoader};
use crate::error::{AutomationError, StorageError};
use crate::runtime::Automation;
use chrono::Utc;
use std::path::PathBuf;
use tracing::info;

/// Runtime context for CLI execution: workspace, config path and loaded configuration.
/// The store and providers are opened per command, so `validate` works without them.
pub struct RunContext {
    workspace_root: PathBuf,
    config_path: Option<PathBuf>,
    config: AutomationConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
    ) -> Result<Self, AutomationError> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Ok(Self {
            workspace_root,
            config_path,
            config,
        })
    }

    pub fn config(&self) -> &AutomationConfig {
        &self.config
    }

    fn open(&self) -> Result<Automation, AutomationError> {
        Automation::open(self.config.clone(), &self.workspace_root)
    }

    /// Execute a CLI command via the single route table.
    pub async fn execute(&self, command: &Commands) -> Result<String, AutomationError> {
        match command {
            Commands::Validate => self.handle_validate(),
            Commands::Init { force } => self.handle_init(*force),
            Commands::Status { format } => {
                let automation = self.open()?;
                let snapshot = automation.scheduler.snapshot()?;
                if format == "json" {
                    format_status_json(&snapshot)
                } else {
                    Ok(format_status_text(&snapshot))
                }
            }
            Commands::Pause => {
                self.open()?.scheduler.pause()?;
                Ok("Automation paused".to_string())
            }
            Commands::Resume => {
                self.open()?.scheduler.resume()?;
                Ok("Automation resumed".to_string())
            }
            Commands::Block { reason } => {
                let state = self.open()?.scheduler.block(reason)?;
                Ok(format!(
                    "Automation blocked: {}",
                    state.block_reason.unwrap_or_default()
                ))
            }
            Commands::Unblock => {
                self.open()?.scheduler.unblock()?;
                Ok("Automation unblocked".to_string())
            }
            Commands::Tick => {
                self.config.ensure_valid()?;
                let outcome = self.open()?.scheduler.tick(Utc::now()).await?;
                Ok(format_tick_outcome(&outcome))
            }
            Commands::RunNow => {
                self.config.ensure_valid()?;
                let outcome = self.open()?.scheduler.run_now(Utc::now()).await?;
                Ok(format_tick_outcome(&outcome))
            }
            Commands::Drain => {
                self.config.ensure_valid()?;
                let outcome = self.open()?.scheduler.drain_queues(Utc::now()).await?;
                Ok(format_drain_outcome(&outcome))
            }
            Commands::Preview { format } => {
                self.config.ensure_valid()?;
                let item = self.open()?.pipeline.preview().await?;
                if format == "json" {
                    format_item_json(&item)
                } else {
                    Ok(format_item_text(&item))
                }
            }
            Commands::Run => self.handle_run().await,
        }
    }

    fn handle_validate(&self) -> Result<String, AutomationError> {
        match self.config.validate() {
            Ok(()) => {
                let source = self
                    .config_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| self.workspace_root.display().to_string());
                Ok(format!("Configuration is valid ({})", source))
            }
            Err(errors) => Err(AutomationError::ConfigError(format_validation_errors(
                &errors,
            ))),
        }
    }

    fn handle_init(&self, force: bool) -> Result<String, AutomationError> {
        let config_dir = self.workspace_root.join("config");
        let path = config_dir.join("config.toml");
        if path.exists() && !force {
            return Ok(format!(
                "Configuration already exists at {} (use --force to overwrite)",
                path.display()
            ));
        }

        let body = toml::to_string_pretty(&AutomationConfig::default()).map_err(|e| {
            AutomationError::ConfigError(format!("Failed to serialize default config: {}", e))
        })?;
        std::fs::create_dir_all(&config_dir).map_err(StorageError::IoError)?;
        std::fs::write(&path, body).map_err(StorageError::IoError)?;
        info!(path = %path.display(), "Default configuration written");
        Ok(format!("Wrote default configuration to {}", path.display()))
    }

    async fn handle_run(&self) -> Result<String, AutomationError> {
        self.config.ensure_valid()?;
        let automation = self.open()?;
        info!(workspace = %self.workspace_root.display(), "Starting scheduler daemon");
        automation
            .scheduler
            .run_until(async {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %err, "Failed to listen for shutdown signal");
                }
            })
            .await;
        Ok("Scheduler stopped".to_string())
    }
}
