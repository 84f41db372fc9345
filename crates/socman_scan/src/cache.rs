//! Persistent cache of scan results.
//!
//! Scans are keyed by the scanner's fingerprint plus the request (work
//! directory, include directories, source paths and their contents). A hit is
//! only trusted after every recorded dependency still hashes to the value it
//! had when the entry was stored; a missing dependency counts as changed
//! unless it was already missing then.
//!
//! The manifest is stored as `scan-cache.json` in the cache directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use socman_common::{ContentHash, ContentHasher};

use crate::error::ScanError;
use crate::preproc::{DependencyScanner, ScanRequest};

/// Name of the manifest file within the cache directory.
pub const MANIFEST_FILE: &str = "scan-cache.json";

/// Current manifest layout; manifests with another version are discarded.
const MANIFEST_FORMAT_VERSION: u32 = 1;

/// Stored scan results, keyed by the hex form of the request key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanManifest {
    /// Layout version of this manifest.
    pub format_version: u32,
    /// One entry per distinct scan request.
    pub entries: BTreeMap<String, ScanEntry>,
}

/// The result of one scan plus what it was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEntry {
    /// Dependency files, in the order the scanner reported them.
    pub deps: Vec<PathBuf>,
    /// Content hash of each dependency at scan time, `None` if unreadable.
    pub hashes: Vec<Option<ContentHash>>,
}

impl Default for ScanManifest {
    fn default() -> Self {
        Self {
            format_version: MANIFEST_FORMAT_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

impl ScanManifest {
    /// Loads the manifest from `cache_dir`.
    ///
    /// Returns `None` if the file is absent, unparsable, or written by an
    /// incompatible version. Callers treat that as an empty cache.
    pub fn load(cache_dir: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(cache_dir.join(MANIFEST_FILE)).ok()?;
        let manifest: Self = serde_json::from_str(&content).ok()?;
        (manifest.format_version == MANIFEST_FORMAT_VERSION).then_some(manifest)
    }

    /// Saves the manifest, creating `cache_dir` if needed.
    pub fn save(&self, cache_dir: &Path) -> Result<(), ScanError> {
        std::fs::create_dir_all(cache_dir).map_err(|e| ScanError::Io {
            path: cache_dir.to_path_buf(),
            source: e,
        })?;
        let path = cache_dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|e| ScanError::Serialization {
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| ScanError::Io { path, source: e })
    }
}

/// Hashes the contents of a file.
pub fn hash_file(path: &Path) -> Result<ContentHash, ScanError> {
    let content = std::fs::read(path).map_err(|e| ScanError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(ContentHash::from_bytes(&content))
}

/// A [`DependencyScanner`] that remembers the results of another one.
///
/// New results are kept in memory until [`CachedScanner::save`] is called.
pub struct CachedScanner<S> {
    inner: S,
    cache_dir: PathBuf,
    manifest: ScanManifest,
    dirty: bool,
    hits: usize,
    misses: usize,
}

impl<S: DependencyScanner> CachedScanner<S> {
    /// Wraps `inner`, loading any manifest already present in `cache_dir`.
    pub fn new(inner: S, cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        let manifest = ScanManifest::load(&cache_dir).unwrap_or_default();
        tracing::debug!(
            "scan cache at {} holds {} entr(ies)",
            cache_dir.display(),
            manifest.entries.len()
        );
        Self {
            inner,
            cache_dir,
            manifest,
            dirty: false,
            hits: 0,
            misses: 0,
        }
    }

    /// Writes the manifest if anything changed since it was loaded.
    pub fn save(&mut self) -> Result<(), ScanError> {
        if self.dirty {
            self.manifest.save(&self.cache_dir)?;
            self.dirty = false;
        }
        Ok(())
    }

    /// The wrapped scanner.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of requests answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Number of requests passed to the wrapped scanner.
    pub fn misses(&self) -> usize {
        self.misses
    }

    fn key(&self, req: &ScanRequest) -> Result<String, ScanError> {
        let mut hasher = ContentHasher::new();
        self.inner.fingerprint(&mut hasher);
        hasher.str_field(&req.work_dir.to_string_lossy());
        hasher.field(&(req.includes.len() as u64).to_le_bytes());
        for dir in &req.includes {
            hasher.str_field(&dir.to_string_lossy());
        }
        for src in &req.sources {
            let hash = hash_file(&req.work_dir.join(src))?;
            hasher.str_field(&src.to_string_lossy());
            hasher.str_field(&hash.to_string());
        }
        Ok(hasher.finish().to_string())
    }

    fn lookup(&self, key: &str) -> Option<Vec<PathBuf>> {
        let entry = self.manifest.entries.get(key)?;
        if entry.deps.len() != entry.hashes.len() {
            return None;
        }
        let fresh = entry
            .deps
            .iter()
            .zip(&entry.hashes)
            .all(|(dep, stored)| hash_file(dep).ok() == *stored);
        fresh.then(|| entry.deps.clone())
    }
}

impl<S: DependencyScanner> DependencyScanner for CachedScanner<S> {
    fn scan(&mut self, req: &ScanRequest) -> Result<Vec<PathBuf>, ScanError> {
        let key = self.key(req)?;
        if let Some(deps) = self.lookup(&key) {
            tracing::debug!("scan cache hit {}", key);
            self.hits += 1;
            return Ok(deps);
        }

        self.misses += 1;
        let deps = self.inner.scan(req)?;
        let hashes = deps.iter().map(|dep| hash_file(dep).ok()).collect();
        self.manifest.entries.insert(
            key,
            ScanEntry {
                deps: deps.clone(),
                hashes,
            },
        );
        self.dirty = true;
        Ok(deps)
    }

    fn fingerprint(&self, hasher: &mut ContentHasher) {
        self.inner.fingerprint(hasher);
    }
}
