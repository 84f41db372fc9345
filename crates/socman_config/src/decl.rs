//! Unit declaration files (`unit.toml`).
//!
//! Each directory of a project may carry a `unit.toml` describing the units
//! it contributes. The file's location is the unit's declaring script: it
//! names the unit by default and anchors every relative path in its views.
//!
//! ```toml
//! [[unit]]
//! unit = "uart"          # optional, defaults to the directory
//! use = "fifo, baud_gen"
//! src_dir = "rtl"
//!
//! [[view]]
//! unit = "uart"
//! view = "fpga"
//! use = ["fifo_bram"]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::error::ConfigError;
use crate::types::StringList;

/// File name of a unit declaration file.
pub const DECL_FILE: &str = "unit.toml";

/// The parsed contents of one `unit.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct DeclFile {
    /// Units created by this file, each with its initial view.
    #[serde(default, rename = "unit")]
    pub units: Vec<UnitDecl>,
    /// Additional views attached to already declared units.
    #[serde(default, rename = "view")]
    pub views: Vec<ViewDecl>,
}

/// A `[[unit]]` table.
#[derive(Debug, Deserialize)]
pub struct UnitDecl {
    /// Unit name; derived from the file location when absent.
    #[serde(default)]
    pub unit: Option<String>,
    /// Name of the initial view; `default` when absent.
    #[serde(default)]
    pub view: Option<String>,
    /// Declared attributes, keyed by their declaration spelling.
    #[serde(flatten)]
    pub attrs: BTreeMap<String, StringList>,
}

/// A `[[view]]` table.
#[derive(Debug, Deserialize)]
pub struct ViewDecl {
    /// The unit receiving the view.
    pub unit: String,
    /// The view name.
    pub view: String,
    /// Declared attributes, keyed by their declaration spelling.
    #[serde(flatten)]
    pub attrs: BTreeMap<String, StringList>,
}

/// Reads and parses one declaration file.
pub fn load_decl_file(path: &Path) -> Result<DeclFile, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_decl_from_str(&content).map_err(|e| match e {
        ConfigError::ParseError(reason) => ConfigError::DeclParseError {
            path: path.to_path_buf(),
            reason,
        },
        other => other,
    })
}

/// Parses declarations from a string.
pub fn load_decl_from_str(content: &str) -> Result<DeclFile, ConfigError> {
    let decl: DeclFile =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    for unit in &decl.units {
        if unit.unit.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "[[unit]] has an empty unit name".to_string(),
            ));
        }
        if unit.view.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "[[unit]] has an empty view name".to_string(),
            ));
        }
    }
    for view in &decl.views {
        if view.unit.trim().is_empty() || view.view.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "[[view]] needs a non-empty unit and view".to_string(),
            ));
        }
    }
    Ok(decl)
}

/// Finds and parses every `unit.toml` below `root`, in sorted path order.
///
/// Hidden directories and any directory listed in `skip` (typically the
/// build directory) are not entered.
pub fn discover_declarations(
    root: &Path,
    skip: &[PathBuf],
) -> Result<Vec<(PathBuf, DeclFile)>, ConfigError> {
    let mut found = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 {
                return true;
            }
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            !hidden && !skip.iter().any(|s| s == entry.path())
        });

    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() && entry.file_name() == DECL_FILE {
            let path = entry.into_path();
            let decl = load_decl_file(&path)?;
            tracing::debug!(
                "{}: {} unit(s), {} view(s)",
                path.display(),
                decl.units.len(),
                decl.views.len()
            );
            found.push((path, decl));
        }
    }
    Ok(found)
}
