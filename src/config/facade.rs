//! Config loader: assembles sources in precedence order and deserializes once.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::AutomationConfig;
use crate::error::AutomationError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads [`AutomationConfig`] from layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, global file, workspace files, then environment.
    pub fn load(workspace_root: &Path) -> Result<AutomationConfig, AutomationError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder);

        let config: AutomationConfig = builder.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Defaults, one explicit file, then environment. Global and workspace files are skipped.
    pub fn load_from_file(path: &Path) -> Result<AutomationConfig, AutomationError> {
        if !path.exists() {
            return Err(AutomationError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let builder = merge_policy::builder_with_defaults()?.add_source(File::from(path));
        let builder = environment::add_to_builder(builder);

        let config: AutomationConfig = builder.build()?.try_deserialize()?;
        debug!(config_path = %path.display(), "Configuration loaded from file");
        Ok(config)
    }

    /// Location of the user-level config file, if a home directory is known.
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
