//! Option resolution: merging `socman.toml` with command-line overrides.

use crate::backend::Backend;
use crate::error::ConfigError;
use crate::types::ProjectConfig;
use socman_common::to_list;

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Default)]
pub struct Overrides {
    /// `--top-level`.
    pub top_level: Option<String>,
    /// `--views`, comma separated.
    pub views: Option<String>,
    /// `--check`; can only switch check mode on.
    pub check: bool,
    /// Value of [`SIM_ENV_VAR`](crate::SIM_ENV_VAR), if set.
    pub simulator: Option<String>,
}

/// The effective options for one configure run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    /// Root unit of the design.
    pub top_level: String,
    /// Ordered view priority list, `+name` entries additive.
    pub views: Vec<String>,
    /// Whether every view of every unit is checked first.
    pub check: bool,
    /// The selected simulator backend.
    pub backend: Backend,
}

/// Resolves the effective options for a configure run.
///
/// Command-line values replace file values. The top level must be set in
/// one of the two places.
pub fn resolve_options(
    config: &ProjectConfig,
    overrides: &Overrides,
) -> Result<ResolvedOptions, ConfigError> {
    let top_level = overrides
        .top_level
        .clone()
        .or_else(|| config.project.top_level.clone())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ConfigError::MissingField(
                "project.top_level (set it in socman.toml or pass --top-level)".to_string(),
            )
        })?;

    let views = match &overrides.views {
        Some(raw) => to_list(raw),
        None => config.project.views.clone(),
    };
    validate_views(&views)?;

    let simulator = overrides
        .simulator
        .as_deref()
        .or(config.backend.simulator.as_deref());

    Ok(ResolvedOptions {
        top_level,
        views,
        check: overrides.check || config.project.check,
        backend: Backend::select(simulator),
    })
}

/// Rejects empty view entries (`"a,,b"`, `"+"`) and an empty list.
pub(crate) fn validate_views(views: &[String]) -> Result<(), ConfigError> {
    if views.is_empty() {
        return Err(ConfigError::ValidationError(
            "the view list must name at least one view".to_string(),
        ));
    }
    for view in views {
        let name = view.trim().strip_prefix('+').unwrap_or(view.trim());
        if name.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "empty entry in view list {views:?}"
            )));
        }
    }
    Ok(())
}
