//! Views: named bags of declared attributes with lazy default derivation.
//!
//! A view stores only what was declared. Everything else is derived on read
//! from the unit name and the declaring script's directory:
//!
//! | key           | default                                          |
//! |---------------|--------------------------------------------------|
//! | `name`        | the unit name                                    |
//! | `unit_top`    | the unit name                                    |
//! | `use`         | empty                                            |
//! | `tb_use`      | empty                                            |
//! | `src_dir`     | `src`, if it exists                              |
//! | `src`         | HDL files found under the source directories     |
//! | `includes`    | the source directories                           |
//! | `tb_dir`      | `tb`, if it exists                               |
//! | `tb_src`      | HDL files found under the testbench directories  |
//! | `tb_includes` | the source and testbench directories             |
//! | `tb`          | `tb_` followed by the unit name                  |
//!
//! Declared paths must exist. Default directories that are absent simply
//! resolve to nothing.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use socman_common::normalize;
use walkdir::WalkDir;

use crate::attr::{AttrKey, MergeMode};
use crate::context::ProjectContext;
use crate::error::AttrError;

/// Default source directory, relative to the declaring script.
pub const DEFAULT_SRC_DIR: &str = "src";
/// Default testbench directory, relative to the declaring script.
pub const DEFAULT_TB_DIR: &str = "tb";
/// Prefix of the default testbench module name.
pub const TB_PREFIX: &str = "tb_";

/// Where a view was declared: the owning unit and its script directory.
#[derive(Clone, Copy, Debug)]
pub struct Origin<'a> {
    /// The owning unit's name.
    pub unit: &'a str,
    /// Directory of the declaring script; relative paths are joined to it.
    pub dir: &'a Path,
}

/// A resolved attribute value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttrValue {
    /// Unit or module names, in declaration order.
    Names(Vec<String>),
    /// Files or directories.
    Paths(BTreeSet<PathBuf>),
}

/// A named bag of declared attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    attrs: BTreeMap<AttrKey, Vec<String>>,
}

impl View {
    /// Creates a view with nothing declared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a view from declaration-spelled keys.
    ///
    /// Fails on the first key that is not a recognized attribute.
    pub fn from_decl<I, K>(attrs: I) -> Result<Self, AttrError>
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: AsRef<str>,
    {
        let mut view = Self::new();
        for (key, values) in attrs {
            let key: AttrKey = key.as_ref().parse()?;
            view.declare(key, values);
        }
        Ok(view)
    }

    /// Declares `key`, replacing any previous declaration.
    pub fn declare(&mut self, key: AttrKey, values: Vec<String>) {
        self.attrs.insert(key, values);
    }

    /// The declared values of `key`, if it was declared.
    pub fn get(&self, key: AttrKey) -> Option<&[String]> {
        self.attrs.get(&key).map(Vec::as_slice)
    }

    /// Whether `key` was declared.
    pub fn is_declared(&self, key: AttrKey) -> bool {
        self.attrs.contains_key(&key)
    }

    /// The declared keys, in key order.
    pub fn keys(&self) -> impl Iterator<Item = AttrKey> + '_ {
        self.attrs.keys().copied()
    }

    /// Combines `values` into the declaration of `key`.
    ///
    /// [`MergeMode::Override`] replaces whatever is there. [`MergeMode::Additive`]
    /// appends after the existing values, or initializes the key when absent.
    pub fn merge(&mut self, key: AttrKey, values: &[String], mode: MergeMode) {
        match mode {
            MergeMode::Override => {
                self.attrs.insert(key, values.to_vec());
            }
            MergeMode::Additive => {
                self.attrs.entry(key).or_default().extend_from_slice(values);
            }
        }
    }

    /// Forgets every declaration.
    pub fn clear(&mut self) {
        self.attrs.clear();
    }

    /// Resolves `key`, falling back to its default rule.
    pub fn resolve(
        &self,
        key: AttrKey,
        origin: Origin<'_>,
        ctx: &ProjectContext,
    ) -> Result<AttrValue, AttrError> {
        if key.is_path() {
            self.paths(key, origin, ctx).map(AttrValue::Paths)
        } else {
            self.names(key, origin).map(AttrValue::Names)
        }
    }

    /// Resolves a name-valued key (`name`, `unit_top`, `use`, `tb_use`, `tb`).
    ///
    /// For path keys this returns the raw declared strings.
    pub fn names(&self, key: AttrKey, origin: Origin<'_>) -> Result<Vec<String>, AttrError> {
        match key {
            AttrKey::Name | AttrKey::UnitTop => match self.scalar(key)? {
                Some(v) => Ok(vec![v]),
                None => Ok(vec![origin.unit.to_string()]),
            },
            AttrKey::Tb => match self.scalar(key)? {
                Some(v) => Ok(vec![v]),
                None => Ok(vec![format!("{TB_PREFIX}{}", origin.unit)]),
            },
            AttrKey::Use | AttrKey::TbUse => {
                let values = self.get(key).unwrap_or_default();
                if values.iter().any(|v| v.trim().is_empty()) {
                    return Err(AttrError::Malformed {
                        key,
                        reason: "empty unit name in list".to_string(),
                    });
                }
                Ok(values.to_vec())
            }
            _ => Ok(self.get(key).unwrap_or_default().to_vec()),
        }
    }

    /// Resolves a path-valued key to absolute, lexically normalized paths.
    pub fn paths(
        &self,
        key: AttrKey,
        origin: Origin<'_>,
        ctx: &ProjectContext,
    ) -> Result<BTreeSet<PathBuf>, AttrError> {
        match key {
            AttrKey::SrcDir => self.dirs(AttrKey::SrcDir, DEFAULT_SRC_DIR, origin.dir),
            AttrKey::TbDir => self.dirs(AttrKey::TbDir, DEFAULT_TB_DIR, origin.dir),
            AttrKey::Src => self.files(AttrKey::Src, AttrKey::SrcDir, DEFAULT_SRC_DIR, origin.dir, ctx),
            AttrKey::TbSrc => self.files(AttrKey::TbSrc, AttrKey::TbDir, DEFAULT_TB_DIR, origin.dir, ctx),
            AttrKey::Includes => match self.get(AttrKey::Includes) {
                Some(declared) => find_paths(declared, origin.dir, true),
                None => self.paths(AttrKey::SrcDir, origin, ctx),
            },
            AttrKey::TbIncludes => match self.get(AttrKey::TbIncludes) {
                Some(declared) => find_paths(declared, origin.dir, true),
                None => {
                    let mut dirs = self.paths(AttrKey::SrcDir, origin, ctx)?;
                    dirs.extend(self.paths(AttrKey::TbDir, origin, ctx)?);
                    Ok(dirs)
                }
            },
            other => Err(AttrError::Malformed {
                key: other,
                reason: "not a path attribute".to_string(),
            }),
        }
    }

    fn scalar(&self, key: AttrKey) -> Result<Option<String>, AttrError> {
        match self.get(key) {
            None => Ok(None),
            Some([value]) if !value.trim().is_empty() => Ok(Some(value.clone())),
            Some([_]) | Some([]) => Err(AttrError::Malformed {
                key,
                reason: "expected exactly one non-empty value".to_string(),
            }),
            Some(values) => Err(AttrError::Malformed {
                key,
                reason: format!("expected a single value, got {}", values.len()),
            }),
        }
    }

    fn dirs(&self, key: AttrKey, default: &str, dir: &Path) -> Result<BTreeSet<PathBuf>, AttrError> {
        match self.get(key) {
            Some(declared) => find_paths(declared, dir, true),
            None => find_paths(&[default.to_string()], dir, false),
        }
    }

    fn files(
        &self,
        key: AttrKey,
        dir_key: AttrKey,
        default: &str,
        dir: &Path,
        ctx: &ProjectContext,
    ) -> Result<BTreeSet<PathBuf>, AttrError> {
        if let Some(declared) = self.get(key) {
            return find_paths(declared, dir, true);
        }
        match self.get(dir_key) {
            Some(declared) => search(&find_paths(declared, dir, true)?, ctx, true),
            None => search(&find_paths(&[default.to_string()], dir, false)?, ctx, false),
        }
    }
}

/// Resolves declared names against `dir`.
///
/// In strict mode a missing path is an error; otherwise it is skipped. Two
/// names that land on the same file are always an error.
fn find_paths(names: &[String], dir: &Path, strict: bool) -> Result<BTreeSet<PathBuf>, AttrError> {
    let mut found = BTreeSet::new();
    let mut seen = BTreeSet::new();
    for name in names {
        let path = normalize(&dir.join(name));
        let canonical = match std::fs::canonicalize(&path) {
            Ok(c) => c,
            Err(_) if strict => return Err(AttrError::PathNotFound(path)),
            Err(_) => continue,
        };
        if !seen.insert(canonical) {
            return Err(AttrError::DuplicatePath(path));
        }
        found.insert(path);
    }
    Ok(found)
}

/// Collects HDL sources below each directory, recursively.
///
/// In strict mode a directory holding no sources is an error.
fn search(
    dirs: &BTreeSet<PathBuf>,
    ctx: &ProjectContext,
    strict: bool,
) -> Result<BTreeSet<PathBuf>, AttrError> {
    let mut files = BTreeSet::new();
    for dir in dirs {
        let mut found = 0usize;
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|source| AttrError::Search {
                path: dir.clone(),
                source,
            })?;
            if entry.file_type().is_file() && ctx.hdl().is_source(entry.path()) {
                files.insert(entry.into_path());
                found += 1;
            }
        }
        if strict && found == 0 {
            return Err(AttrError::EmptySourceDirectory {
                path: dir.clone(),
                exts: ctx
                    .hdl()
                    .source_extensions()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            });
        }
    }
    Ok(files)
}
