//! Project file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// Name of the project file at the project root.
pub const CONFIG_FILE: &str = "socman.toml";

/// Loads and validates `socman.toml` from a project directory.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `socman.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.project.build_dir.is_empty() {
        return Err(ConfigError::MissingField("project.build_dir".to_string()));
    }
    if config.scan.preprocessor.is_empty() {
        return Err(ConfigError::MissingField("scan.preprocessor".to_string()));
    }
    if let Some(top) = &config.project.top_level {
        if top.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "project.top_level must not be empty".to_string(),
            ));
        }
    }
    crate::resolve::validate_views(&config.project.views)?;
    Ok(())
}
