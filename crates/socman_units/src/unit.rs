//! Units: one HDL design block with its declared views and resolved state.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::attr::{AttrKey, KeySet};
use crate::context::ProjectContext;
use crate::error::{AttrError, UnitError};
use crate::inherit::{apply_inheritance, ViewSelector};
use crate::view::{AttrValue, Origin, View};

/// Name of the view created when a declaration does not name one.
pub const DEFAULT_VIEW: &str = "default";

/// Label used in errors raised while resolving the merged view.
const MERGED_VIEW: &str = "(resolved)";

/// A value in a unit's extension bag.
///
/// Backend adapters attach their own per-unit data here. `Path` values are
/// carried across the snapshot boundary like every other path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtValue {
    /// Free text.
    Text(String),
    /// An ordered list of strings.
    List(Vec<String>),
    /// A file or directory.
    Path(PathBuf),
}

/// The fully resolved attributes of a finalized unit.
///
/// `includes` and `tb_includes` are the transitive sets: the unit's own
/// directories plus those of its dependencies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedAttrs {
    /// Library name.
    pub name: String,
    /// HDL top module of the unit.
    pub unit_top: String,
    /// Testbench module name.
    pub tb: String,
    /// Synthesis dependency names, as declared.
    pub uses: Vec<String>,
    /// Testbench dependency names, as declared.
    pub tb_uses: Vec<String>,
    /// Source directories.
    pub src_dirs: BTreeSet<PathBuf>,
    /// Source files.
    pub src: BTreeSet<PathBuf>,
    /// Include directories, including those of synthesis dependencies.
    pub includes: BTreeSet<PathBuf>,
    /// Testbench directories.
    pub tb_dirs: BTreeSet<PathBuf>,
    /// Testbench files.
    pub tb_src: BTreeSet<PathBuf>,
    /// Testbench include directories, including `includes` and those of
    /// simulation dependencies.
    pub tb_includes: BTreeSet<PathBuf>,
}

/// One HDL design block.
#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    pub(crate) name: String,
    pub(crate) script: PathBuf,
    pub(crate) views: BTreeMap<String, View>,
    pub(crate) merged: View,
    pub(crate) attrs: Option<ResolvedAttrs>,
    pub(crate) synth_deps: Vec<String>,
    pub(crate) sim_deps: Vec<String>,
    pub(crate) checked: bool,
    pub(crate) ext: BTreeMap<String, ExtValue>,
}

impl Unit {
    pub(crate) fn new(name: String, script: PathBuf, view_name: String, view: View) -> Self {
        let mut views = BTreeMap::new();
        views.insert(view_name, view);
        Self {
            name,
            script,
            views,
            merged: View::new(),
            attrs: None,
            synth_deps: Vec::new(),
            sim_deps: Vec::new(),
            checked: false,
            ext: BTreeMap::new(),
        }
    }

    /// The unit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declaring script.
    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Directory of the declaring script; relative paths resolve against it.
    pub fn script_dir(&self) -> &Path {
        self.script.parent().unwrap_or(&self.script)
    }

    /// The declared views by name.
    pub fn views(&self) -> &BTreeMap<String, View> {
        &self.views
    }

    /// A declared view.
    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.get(name)
    }

    /// The merged view produced by finalize.
    pub fn merged(&self) -> &View {
        &self.merged
    }

    /// The resolved attributes, present once the unit has been finalized.
    pub fn attrs(&self) -> Option<&ResolvedAttrs> {
        self.attrs.as_ref()
    }

    /// Leaf-first synthesis dependencies, ending with this unit.
    pub fn synth_deps(&self) -> &[String] {
        &self.synth_deps
    }

    /// Leaf-first simulation dependencies not already in [`synth_deps`](Self::synth_deps).
    pub fn sim_deps(&self) -> &[String] {
        &self.sim_deps
    }

    /// Whether check mode has validated this unit.
    pub fn is_checked(&self) -> bool {
        self.checked
    }

    /// The extension bag.
    pub fn ext(&self) -> &BTreeMap<String, ExtValue> {
        &self.ext
    }

    /// Looks up one extension value.
    pub fn ext_value(&self, key: &str) -> Option<&ExtValue> {
        self.ext.get(key)
    }

    /// Attaches an extension value, returning the previous one.
    pub fn set_ext(&mut self, key: impl Into<String>, value: ExtValue) -> Option<ExtValue> {
        self.ext.insert(key.into(), value)
    }

    /// Resolves `key` on the merged view.
    pub fn resolve(&self, key: AttrKey, ctx: &ProjectContext) -> Result<AttrValue, UnitError> {
        self.merged
            .resolve(key, self.origin(), ctx)
            .map_err(|e| self.attr_error(MERGED_VIEW, e))
    }

    /// The merged `use` or `tb_use` edges.
    pub(crate) fn edges(&self, key: AttrKey) -> Result<Vec<String>, UnitError> {
        self.merged
            .names(key, self.origin())
            .map_err(|e| self.attr_error(MERGED_VIEW, e))
    }

    pub(crate) fn add_view(&mut self, name: String, view: View) -> Result<(), UnitError> {
        if self.views.contains_key(&name) {
            return Err(UnitError::DuplicateView {
                unit: self.name.clone(),
                view: name,
                script: self.script.clone(),
            });
        }
        self.views.insert(name, view);
        Ok(())
    }

    /// Resolves every recognized key of every declared view.
    pub(crate) fn check_all(&mut self, ctx: &ProjectContext) -> Result<(), UnitError> {
        if self.checked {
            return Err(UnitError::AlreadyChecked {
                unit: self.name.clone(),
            });
        }
        for (view_name, view) in &self.views {
            for key in AttrKey::ALL {
                view.resolve(key, self.origin(), ctx)
                    .map_err(|e| self.attr_error(view_name, e))?;
            }
        }
        self.checked = true;
        Ok(())
    }

    /// Merges the declared views into the merged view.
    pub(crate) fn inherit(&mut self, selectors: &[ViewSelector], keys: KeySet<'_>) {
        apply_inheritance(&self.views, &mut self.merged, selectors, keys);
    }

    /// Resolves the unit's own attributes, without dependency include sets.
    pub(crate) fn resolve_own(&self, ctx: &ProjectContext) -> Result<ResolvedAttrs, UnitError> {
        let origin = self.origin();
        let wrap = |e| self.attr_error(MERGED_VIEW, e);
        let scalar = |key| -> Result<String, UnitError> {
            let names = self.merged.names(key, origin).map_err(wrap)?;
            Ok(names.into_iter().next().unwrap_or_default())
        };
        let paths = |key| self.merged.paths(key, origin, ctx).map_err(wrap);

        Ok(ResolvedAttrs {
            name: scalar(AttrKey::Name)?,
            unit_top: scalar(AttrKey::UnitTop)?,
            tb: scalar(AttrKey::Tb)?,
            uses: self.edges(AttrKey::Use)?,
            tb_uses: self.edges(AttrKey::TbUse)?,
            src_dirs: paths(AttrKey::SrcDir)?,
            src: paths(AttrKey::Src)?,
            includes: paths(AttrKey::Includes)?,
            tb_dirs: paths(AttrKey::TbDir)?,
            tb_src: paths(AttrKey::TbSrc)?,
            tb_includes: paths(AttrKey::TbIncludes)?,
        })
    }

    fn origin(&self) -> Origin<'_> {
        Origin {
            unit: &self.name,
            dir: self.script_dir(),
        }
    }

    fn attr_error(&self, view: &str, source: AttrError) -> UnitError {
        UnitError::Attribute {
            unit: self.name.clone(),
            view: view.to_string(),
            script: self.script.clone(),
            source,
        }
    }
}
