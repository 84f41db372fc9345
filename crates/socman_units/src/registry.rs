//! The unit registry and its finalize pass.
//!
//! Units are declared one at a time while the project's `unit.toml` files
//! are read. [`UnitRegistry::finalize`] then merges views, orders
//! dependencies from the top level, drops every unit the top level does not
//! reach, resolves the survivors and packs the result into a [`Snapshot`].
//! The build phase gets the registry back with [`UnitRegistry::unpack`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::attr::{AttrKey, KeySet};
use crate::context::ProjectContext;
use crate::deps;
use crate::error::{RegistryState, UnitError};
use crate::inherit::ViewSelector;
use crate::snapshot::{Detach, RegistryRecord, Snapshot};
use crate::unit::{ResolvedAttrs, Unit, DEFAULT_VIEW};
use crate::view::View;

/// Parameters of one finalize pass.
#[derive(Clone, Debug)]
pub struct FinalizeOptions {
    /// Active views, highest priority last.
    pub views: Vec<ViewSelector>,
    /// The root unit of the design.
    pub top_level: String,
    /// Resolve every attribute of every view before anything else.
    pub check: bool,
}

/// All units of a project, keyed by name.
#[derive(Clone, Debug)]
pub struct UnitRegistry {
    units: BTreeMap<String, Unit>,
    views: Vec<ViewSelector>,
    top_level: Option<String>,
    synth_deps: Vec<String>,
    sim_deps: Vec<String>,
    checked: bool,
    state: RegistryState,
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitRegistry {
    /// Creates an empty registry accepting declarations.
    pub fn new() -> Self {
        Self {
            units: BTreeMap::new(),
            views: Vec::new(),
            top_level: None,
            synth_deps: Vec::new(),
            sim_deps: Vec::new(),
            checked: false,
            state: RegistryState::Declaring,
        }
    }

    /// Declares a unit with its initial view.
    ///
    /// `script` is the declaring `unit.toml`. Without `name` the unit is named
    /// after the script's directory; without `view` the initial view is
    /// `default`.
    pub fn add<I, K>(
        &mut self,
        ctx: &ProjectContext,
        script: &Path,
        name: Option<&str>,
        view: Option<&str>,
        attrs: I,
    ) -> Result<&Unit, UnitError>
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: AsRef<str>,
    {
        self.ensure_declaring()?;
        let name = match name {
            Some(n) => n.to_string(),
            None => ctx.default_unit_name(script),
        };
        let view_name = view.unwrap_or(DEFAULT_VIEW).to_string();

        if let Some(existing) = self.units.get(&name) {
            return Err(UnitError::DuplicateUnit {
                name,
                script: script.to_path_buf(),
                existing: existing.script.clone(),
            });
        }

        let declared = View::from_decl(attrs).map_err(|source| UnitError::Attribute {
            unit: name.clone(),
            view: view_name.clone(),
            script: script.to_path_buf(),
            source,
        })?;

        tracing::debug!("declared unit '{}' from {}", name, script.display());
        let unit = Unit::new(name.clone(), script.to_path_buf(), view_name, declared);
        Ok(self.units.entry(name).or_insert(unit))
    }

    /// Adds a view to an already declared unit.
    pub fn add_view<I, K>(&mut self, unit: &str, view: &str, attrs: I) -> Result<(), UnitError>
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: AsRef<str>,
    {
        self.ensure_declaring()?;
        let target = self
            .units
            .get_mut(unit)
            .ok_or_else(|| UnitError::UnitNotFound {
                name: unit.to_string(),
            })?;
        if target.views.contains_key(view) {
            return Err(UnitError::DuplicateView {
                unit: unit.to_string(),
                view: view.to_string(),
                script: target.script.clone(),
            });
        }
        let declared = View::from_decl(attrs).map_err(|source| UnitError::Attribute {
            unit: unit.to_string(),
            view: view.to_string(),
            script: target.script.clone(),
            source,
        })?;
        tracing::debug!("added view '{}' to unit '{}'", view, unit);
        target.add_view(view.to_string(), declared)
    }

    /// Resolves every recognized attribute of every view of every unit.
    ///
    /// Nothing is marked checked unless every unit passes.
    pub fn check_all(&mut self, ctx: &ProjectContext) -> Result<(), UnitError> {
        self.ensure_declaring()?;
        let mut units = self.units.clone();
        for unit in units.values_mut() {
            unit.check_all(ctx)?;
        }
        tracing::info!("checked {} unit(s)", units.len());
        self.units = units;
        self.checked = true;
        Ok(())
    }

    /// Merges, orders, prunes, resolves and packs the registry.
    ///
    /// All work happens on a staged copy: on error the registry is exactly
    /// as it was before the call. On success it is left packed.
    pub fn finalize(
        &mut self,
        ctx: &ProjectContext,
        opts: &FinalizeOptions,
    ) -> Result<Snapshot, UnitError> {
        self.ensure_declaring()?;
        let top_name = opts.top_level.as_str();
        if !self.units.contains_key(top_name) {
            return Err(UnitError::TopLevelNotFound {
                name: opts.top_level.clone(),
            });
        }

        let mut units = self.units.clone();
        if opts.check {
            tracing::info!("checking every view of {} unit(s)", units.len());
            for unit in units.values_mut() {
                unit.check_all(ctx)?;
            }
        }

        for unit in units.values_mut() {
            unit.merged.clear();
            unit.inherit(&opts.views, KeySet::Only(&AttrKey::DEPENDENCY_KEYS));
        }

        let (synth, sim) = top_deps(&units, top_name)?;
        let keep: BTreeSet<String> = synth.iter().chain(&sim).cloned().collect();
        for name in &keep {
            if let Some(unit) = units.get(name) {
                for target in unit.edges(AttrKey::TbUse)? {
                    if !units.contains_key(&target) {
                        return Err(UnitError::MissingDependency {
                            missing: target,
                            required_by: unit.name.clone(),
                            script: unit.script.clone(),
                        });
                    }
                }
            }
        }

        let declared = units.len();
        units.retain(|name, _| keep.contains(name));
        tracing::debug!(
            "pruned {} of {} unit(s) not reached from '{}'",
            declared - units.len(),
            declared,
            top_name
        );

        for unit in units.values_mut() {
            unit.merged.clear();
            unit.inherit(&opts.views, KeySet::All);
        }

        let mut orders = BTreeMap::new();
        for unit in units.values() {
            let unit_synth = deps::synth_deps(&units, unit)?;
            let roots: Vec<String> = unit
                .edges(AttrKey::TbUse)?
                .into_iter()
                .filter(|target| {
                    let kept = units.contains_key(target);
                    if !kept {
                        tracing::debug!(
                            "unit '{}': testbench dependency '{}' is outside the design of '{}'",
                            unit.name,
                            target,
                            top_name
                        );
                    }
                    kept
                })
                .collect();
            let unit_sim = deps::sim_deps(&units, unit, &roots, &unit_synth)?;
            orders.insert(unit.name.clone(), (unit_synth, unit_sim));
        }

        let mut own = BTreeMap::new();
        for unit in units.values() {
            own.insert(unit.name.clone(), unit.resolve_own(ctx)?);
        }

        for (name, (unit_synth, unit_sim)) in orders {
            let attrs = transitive_includes(&own, &name, &unit_synth, &unit_sim);
            if let Some(unit) = units.get_mut(&name) {
                unit.attrs = attrs;
                unit.synth_deps = unit_synth;
                unit.sim_deps = unit_sim;
            }
        }

        tracing::info!("top level set to '{}'", top_name);
        tracing::info!("units for simulation: {:?}", sim);
        tracing::info!("units for synthesis: {:?}", synth);

        let staged = UnitRegistry {
            units,
            views: opts.views.clone(),
            top_level: Some(opts.top_level.clone()),
            synth_deps: synth,
            sim_deps: sim,
            checked: self.checked || opts.check,
            state: RegistryState::Packed,
        };
        let snapshot = staged.pack(ctx)?;
        *self = staged;
        Ok(snapshot)
    }

    /// Serializes the registry in its detached form.
    pub fn pack(&self, ctx: &ProjectContext) -> Result<Snapshot, UnitError> {
        Ok(Snapshot::encode(&self.detach(ctx))?)
    }

    /// Rebuilds a registry from a snapshot, resolving paths against `ctx`.
    ///
    /// The result no longer accepts declarations.
    pub fn unpack(snapshot: &Snapshot, ctx: &ProjectContext) -> Result<Self, UnitError> {
        let record: RegistryRecord = snapshot.decode()?;
        record.validate()?;
        let registry = Self::reattach(record, ctx);
        tracing::debug!("unpacked {} unit(s)", registry.units.len());
        Ok(registry)
    }

    /// Looks up a unit.
    pub fn get_unit(&self, name: &str) -> Result<&Unit, UnitError> {
        self.units.get(name).ok_or_else(|| UnitError::UnitNotFound {
            name: name.to_string(),
        })
    }

    /// Looks up several units, in the order given.
    pub fn get_units<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&Unit>, UnitError> {
        names.iter().map(|n| self.get_unit(n.as_ref())).collect()
    }

    /// Mutable access to a unit, for attaching extension values.
    pub fn unit_mut(&mut self, name: &str) -> Result<&mut Unit, UnitError> {
        self.units.get_mut(name).ok_or_else(|| UnitError::UnitNotFound {
            name: name.to_string(),
        })
    }

    /// All units, in name order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the registry has no units.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// The active views of the last finalize.
    pub fn views(&self) -> &[ViewSelector] {
        &self.views
    }

    /// The top-level unit of the last finalize.
    pub fn top_level(&self) -> Option<&str> {
        self.top_level.as_deref()
    }

    /// Leaf-first synthesis order of the top level.
    pub fn synth_deps(&self) -> &[String] {
        &self.synth_deps
    }

    /// Leaf-first simulation order of the top level, disjoint from [`synth_deps`](Self::synth_deps).
    pub fn sim_deps(&self) -> &[String] {
        &self.sim_deps
    }

    /// Whether check mode ran.
    pub fn is_checked(&self) -> bool {
        self.checked
    }

    /// The lifecycle state.
    pub fn state(&self) -> RegistryState {
        self.state
    }

    fn ensure_declaring(&self) -> Result<(), UnitError> {
        match self.state {
            RegistryState::Declaring => Ok(()),
            state => Err(UnitError::Sealed { state }),
        }
    }
}

/// Synthesis and simulation order of the top level over the edge-only merge.
fn top_deps(
    units: &BTreeMap<String, Unit>,
    top: &str,
) -> Result<(Vec<String>, Vec<String>), UnitError> {
    let unit = units.get(top).ok_or_else(|| UnitError::TopLevelNotFound {
        name: top.to_string(),
    })?;
    let synth = deps::synth_deps(units, unit)?;
    let sim = deps::sim_deps(units, unit, &unit.edges(AttrKey::TbUse)?, &synth)?;
    Ok((synth, sim))
}

/// A unit's own attributes widened with its dependencies' include sets.
fn transitive_includes(
    own: &BTreeMap<String, ResolvedAttrs>,
    name: &str,
    synth: &[String],
    sim: &[String],
) -> Option<ResolvedAttrs> {
    let mut attrs = own.get(name)?.clone();
    for dep in synth.iter().filter_map(|d| own.get(d)) {
        attrs.includes.extend(dep.includes.iter().cloned());
    }
    let includes = attrs.includes.clone();
    attrs.tb_includes.extend(includes);
    for dep in sim.iter().filter_map(|d| own.get(d)) {
        attrs.tb_includes.extend(dep.tb_includes.iter().cloned());
    }
    Some(attrs)
}

impl Detach for UnitRegistry {
    type Record = RegistryRecord;

    fn detach(&self, ctx: &ProjectContext) -> RegistryRecord {
        RegistryRecord {
            units: self.units.values().map(|u| u.detach(ctx)).collect(),
            views: self.views.clone(),
            top_level: self.top_level.clone(),
            synth_deps: self.synth_deps.clone(),
            sim_deps: self.sim_deps.clone(),
            checked: self.checked,
        }
    }

    fn reattach(record: RegistryRecord, ctx: &ProjectContext) -> Self {
        UnitRegistry {
            units: record
                .units
                .into_iter()
                .map(|r| {
                    let unit = Unit::reattach(r, ctx);
                    (unit.name.clone(), unit)
                })
                .collect(),
            views: record.views,
            top_level: record.top_level,
            synth_deps: record.synth_deps,
            sim_deps: record.sim_deps,
            checked: record.checked,
            state: RegistryState::Unpacked,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttrError;
    use socman_common::HdlExtensions;
    use std::path::PathBuf;

    fn ctx() -> ProjectContext {
        ProjectContext::new("/p", HdlExtensions::default())
    }

    fn decl(pairs: &[(&str, &str)]) -> Vec<(String, Vec<String>)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), socman_common::to_list(v)))
            .collect()
    }

    fn script(dir: &str) -> PathBuf {
        PathBuf::from(format!("/p/{dir}/unit.toml"))
    }

    fn opts(top: &str, views: &[&str]) -> FinalizeOptions {
        FinalizeOptions {
            views: ViewSelector::parse_list(views).unwrap(),
            top_level: top.to_string(),
            check: false,
        }
    }

    fn example() -> UnitRegistry {
        let ctx = ctx();
        let mut reg = UnitRegistry::new();
        reg.add(&ctx, &script("a"), Some("A"), None, decl(&[])).unwrap();
        reg.add(&ctx, &script("b"), Some("B"), None, decl(&[("use", "A")]))
            .unwrap();
        reg.add(
            &ctx,
            &script("top"),
            Some("TOP"),
            None,
            decl(&[("use", "B"), ("tb_use", "B")]),
        )
        .unwrap();
        reg.add(&ctx, &script("spare"), Some("SPARE"), None, decl(&[]))
            .unwrap();
        reg
    }

    #[test]
    fn default_unit_name_from_script() {
        let mut reg = UnitRegistry::new();
        let unit = reg
            .add(&ctx(), &script("cores/uart"), None, None, decl(&[]))
            .unwrap();
        assert_eq!(unit.name(), "cores/uart");
        assert!(unit.view(DEFAULT_VIEW).is_some());
    }

    #[test]
    fn duplicate_unit_rejected() {
        let mut reg = example();
        let err = reg
            .add(&ctx(), &script("other"), Some("A"), None, decl(&[]))
            .unwrap_err();
        match err {
            UnitError::DuplicateUnit { name, script: s, existing } => {
                assert_eq!(name, "A");
                assert_eq!(s, script("other"));
                assert_eq!(existing, script("a"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unknown_key_rejected_at_declaration() {
        let mut reg = UnitRegistry::new();
        let err = reg
            .add(&ctx(), &script("a"), Some("A"), None, decl(&[("sources", "a.v")]))
            .unwrap_err();
        assert!(matches!(
            err,
            UnitError::Attribute { source: AttrError::Unrecognized(_), .. }
        ));
        assert!(reg.is_empty());
    }

    #[test]
    fn add_view_errors() {
        let mut reg = example();
        let err = reg.add_view("NOPE", "fpga", decl(&[])).unwrap_err();
        assert!(matches!(err, UnitError::UnitNotFound { .. }));

        reg.add_view("A", "fpga", decl(&[("use", "B")])).unwrap();
        let err = reg.add_view("A", "fpga", decl(&[])).unwrap_err();
        assert!(matches!(err, UnitError::DuplicateView { .. }));
        assert_eq!(reg.get_unit("A").unwrap().views().len(), 2);
        assert_eq!(
            reg.get_unit("A").unwrap().view("fpga").unwrap().get(AttrKey::Use),
            Some(&["B".to_string()][..])
        );
    }

    #[test]
    fn finalize_example_graph() {
        let ctx = ctx();
        let mut reg = example();
        reg.finalize(&ctx, &opts("TOP", &["default"])).unwrap();
        assert_eq!(reg.state(), RegistryState::Packed);
        assert_eq!(reg.top_level(), Some("TOP"));
        assert_eq!(reg.synth_deps(), ["A", "B", "TOP"]);
        assert!(reg.sim_deps().is_empty());
        assert!(reg.get_unit("SPARE").is_err());
        assert_eq!(reg.len(), 3);

        let b = reg.get_unit("B").unwrap();
        assert_eq!(b.synth_deps(), ["A", "B"]);
        assert!(b.sim_deps().is_empty());
        assert_eq!(b.attrs().unwrap().tb, "tb_B");
    }

    #[test]
    fn unknown_top_level_leaves_registry_untouched() {
        let ctx = ctx();
        let mut reg = example();
        let err = reg.finalize(&ctx, &opts("MISSING", &["default"])).unwrap_err();
        assert!(matches!(err, UnitError::TopLevelNotFound { .. }));
        assert_eq!(reg.len(), 4);
        assert_eq!(reg.state(), RegistryState::Declaring);
    }

    #[test]
    fn failed_finalize_leaves_registry_untouched() {
        let ctx = ctx();
        let mut reg = example();
        reg.add(&ctx, &script("bad"), Some("BAD"), None, decl(&[("use", "GHOST")]))
            .unwrap();
        let err = reg.finalize(&ctx, &opts("BAD", &["default"])).unwrap_err();
        assert!(matches!(err, UnitError::MissingDependency { .. }));
        assert_eq!(reg.len(), 5);
        assert_eq!(reg.state(), RegistryState::Declaring);
        assert!(reg.get_unit("A").unwrap().merged().get(AttrKey::Use).is_none());
    }

    #[test]
    fn additive_and_override_views() {
        let ctx = ctx();
        let mut reg = example();
        reg.add(&ctx, &script("c"), Some("C"), None, decl(&[])).unwrap();
        reg.add_view("TOP", "more", decl(&[("use", "C")])).unwrap();

        let mut additive = reg.clone();
        additive.finalize(&ctx, &opts("TOP", &["default", "+more"])).unwrap();
        assert_eq!(
            additive.get_unit("TOP").unwrap().attrs().unwrap().uses,
            vec!["B", "C"]
        );
        assert_eq!(additive.synth_deps(), ["A", "B", "C", "TOP"]);

        let mut over = reg.clone();
        over.finalize(&ctx, &opts("TOP", &["default", "more"])).unwrap();
        assert_eq!(over.get_unit("TOP").unwrap().attrs().unwrap().uses, vec!["C"]);
        assert_eq!(over.synth_deps(), ["C", "TOP"]);
        assert_eq!(over.sim_deps(), ["A", "B"]);
    }

    #[test]
    fn sealed_after_finalize() {
        let ctx = ctx();
        let mut reg = example();
        reg.finalize(&ctx, &opts("TOP", &["default"])).unwrap();
        let err = reg.add(&ctx, &script("late"), None, None, decl(&[])).unwrap_err();
        assert!(matches!(err, UnitError::Sealed { state: RegistryState::Packed }));
        let err = reg.finalize(&ctx, &opts("TOP", &["default"])).unwrap_err();
        assert!(matches!(err, UnitError::Sealed { .. }));
    }

    #[test]
    fn pruned_tb_target_is_skipped_per_unit() {
        let ctx = ctx();
        let mut reg = UnitRegistry::new();
        reg.add(&ctx, &script("top"), Some("TOP"), None, decl(&[("use", "B")]))
            .unwrap();
        reg.add(&ctx, &script("b"), Some("B"), None, decl(&[("tb_use", "BFM")]))
            .unwrap();
        reg.add(&ctx, &script("bfm"), Some("BFM"), None, decl(&[])).unwrap();
        reg.finalize(&ctx, &opts("TOP", &["default"])).unwrap();
        assert_eq!(reg.synth_deps(), ["B", "TOP"]);
        assert!(reg.get_unit("BFM").is_err());
        assert!(reg.get_unit("B").unwrap().sim_deps().is_empty());
    }

    #[test]
    fn tb_target_of_kept_unit_must_exist() {
        let ctx = ctx();
        let mut reg = UnitRegistry::new();
        reg.add(&ctx, &script("top"), Some("TOP"), None, decl(&[("use", "B")]))
            .unwrap();
        reg.add(&ctx, &script("b"), Some("B"), None, decl(&[("tb_use", "GHOST")]))
            .unwrap();
        let err = reg.finalize(&ctx, &opts("TOP", &["default"])).unwrap_err();
        match err {
            UnitError::MissingDependency { missing, required_by, .. } => {
                assert_eq!(missing, "GHOST");
                assert_eq!(required_by, "B");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn check_twice_fails() {
        let ctx = ctx();
        let mut reg = example();
        reg.check_all(&ctx).unwrap();
        assert!(reg.is_checked());
        let mut o = opts("TOP", &["default"]);
        o.check = true;
        let err = reg.finalize(&ctx, &o).unwrap_err();
        assert!(matches!(err, UnitError::AlreadyChecked { .. }));
    }

    #[test]
    fn get_units_in_order() {
        let reg = example();
        let names: Vec<_> = reg
            .get_units(&["TOP", "A"])
            .unwrap()
            .iter()
            .map(|u| u.name().to_string())
            .collect();
        assert_eq!(names, vec!["TOP", "A"]);
        assert!(reg.get_units(&["A", "Z"]).is_err());
    }
}
