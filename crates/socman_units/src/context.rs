//! The filesystem context a registry is resolved against.
//!
//! Units never hold a back-reference to a phase. Code that touches the
//! filesystem takes a `&ProjectContext` explicitly, and the snapshot boundary
//! uses it to turn absolute paths into portable strings and back.

use std::path::{Path, PathBuf};

use socman_common::{normalize, HdlExtensions};

/// Project root plus the extension tables used to find sources.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    root: PathBuf,
    hdl: HdlExtensions,
}

impl ProjectContext {
    /// Creates a context rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, hdl: HdlExtensions) -> Self {
        Self {
            root: normalize(&root.into()),
            hdl,
        }
    }

    /// The project root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The HDL extension tables.
    pub fn hdl(&self) -> &HdlExtensions {
        &self.hdl
    }

    /// Converts a path into a portable string.
    ///
    /// Paths under the root become `/`-separated relative strings (`"."` for
    /// the root itself); anything else is kept absolute.
    pub fn detach_path(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => path.to_string_lossy().into_owned(),
        }
    }

    /// Inverse of [`detach_path`](Self::detach_path) against this root.
    pub fn attach_path(&self, portable: &str) -> PathBuf {
        let path = Path::new(portable);
        if path.is_absolute() {
            path.to_path_buf()
        } else if portable == "." {
            self.root.clone()
        } else {
            self.root.join(path)
        }
    }

    /// Default unit name for a declaring script: its directory relative to
    /// the root, or the root directory's own name for scripts at the root.
    pub fn default_unit_name(&self, script: &Path) -> String {
        let dir = script.parent().unwrap_or(script);
        match self.detach_path(dir).as_str() {
            "." => self
                .root
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| ".".to_string()),
            rel => rel.to_string(),
        }
    }
}
