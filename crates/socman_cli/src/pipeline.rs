//! Shared pipeline helpers for CLI commands.
//!
//! Project root resolution, declaration loading and snapshot access used by
//! every subcommand.

use std::error::Error;
use std::path::{Path, PathBuf};

use socman_config::{discover_declarations, load_config, ProjectConfig, CONFIG_FILE};
use socman_units::{ProjectContext, UnitRegistry};

use crate::GlobalArgs;

/// Name of the registry snapshot inside the build directory.
pub const SNAPSHOT_FILE: &str = "socman.snapshot";

/// Name of the scan cache directory inside the build directory.
pub const SCAN_CACHE_DIR: &str = ".scan-cache";

/// A loaded project: its root, configuration and resolution context.
pub struct Project {
    /// Directory containing `socman.toml`.
    pub root: PathBuf,
    /// The parsed configuration.
    pub config: ProjectConfig,
    /// Context units are resolved against.
    pub ctx: ProjectContext,
}

impl Project {
    /// Locates and loads the project selected by the global flags.
    pub fn open(global: &GlobalArgs) -> Result<Self, Box<dyn Error>> {
        let root = resolve_project_root(global)?;
        let config = load_config(&root)?;
        let ctx = ProjectContext::new(&root, config.hdl.clone());
        Ok(Self {
            root: ctx.root().to_path_buf(),
            config,
            ctx,
        })
    }

    /// The build directory.
    pub fn build_dir(&self) -> PathBuf {
        self.root.join(&self.config.project.build_dir)
    }

    /// Where `configure` writes the registry snapshot.
    pub fn snapshot_path(&self) -> PathBuf {
        self.build_dir().join(SNAPSHOT_FILE)
    }

    /// Builds a registry from every `unit.toml` below the root.
    ///
    /// All units are declared before any extra views, so a `[[view]]` may
    /// refer to a unit declared in another file.
    pub fn declare(&self) -> Result<UnitRegistry, Box<dyn Error>> {
        let decls = discover_declarations(&self.root, &[self.build_dir()])?;
        let mut registry = UnitRegistry::new();
        for (script, decl) in &decls {
            for unit in &decl.units {
                let attrs = unit.attrs.iter().map(|(k, v)| (k.as_str(), v.0.clone()));
                registry.add(
                    &self.ctx,
                    script,
                    unit.unit.as_deref(),
                    unit.view.as_deref(),
                    attrs,
                )?;
            }
        }
        for (_, decl) in &decls {
            for view in &decl.views {
                let attrs = view.attrs.iter().map(|(k, v)| (k.as_str(), v.0.clone()));
                registry.add_view(&view.unit, &view.view, attrs)?;
            }
        }
        tracing::debug!(
            "declared {} unit(s) from {} file(s)",
            registry.len(),
            decls.len()
        );
        Ok(registry)
    }

    /// Reattaches the snapshot written by the last `configure`.
    pub fn load_registry(&self) -> Result<UnitRegistry, Box<dyn Error>> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Err(format!(
                "no snapshot at {}; run `socman configure` first",
                path.display()
            )
            .into());
        }
        let snapshot = socman_units::Snapshot::read_from(&path)?;
        Ok(UnitRegistry::unpack(&snapshot, &self.ctx)?)
    }
}

/// Walks up from `start` looking for the nearest directory containing `socman.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the project root directory from global CLI args.
///
/// If `--config` is specified, uses that path (file → parent dir, dir → itself).
/// Otherwise walks up from the current directory. The result is absolute.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn Error>> {
    let cwd = std::env::current_dir()?;
    match &global.config {
        Some(config_path) => {
            let p = cwd.join(config_path);
            if p.is_file() {
                Ok(p.parent().map(Path::to_path_buf).unwrap_or(cwd))
            } else {
                Ok(p)
            }
        }
        None => find_project_root(&cwd),
    }
}

/// Formats a list of unit names for status output.
pub fn join_names(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}
