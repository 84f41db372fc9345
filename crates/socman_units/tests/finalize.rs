//! End-to-end tests for finalize → snapshot → reattach on on-disk projects.
//!
//! Each test lays out a small project in a temporary directory, declares its
//! units the way the CLI does, finalizes against a top level and checks what
//! the build phase sees after unpacking.

use std::fs;
use std::path::{Path, PathBuf};

use socman_common::{to_list, HdlExtensions};
use socman_units::{
    AttrError, AttrKey, BuildPlan, ErrorCategory, ExtValue, FinalizeOptions, ProjectContext,
    RegistryState, Snapshot, SnapshotError, UnitError, UnitRegistry, ViewSelector,
};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn touch(root: &Path, rel: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "// hdl\n").unwrap();
}

fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, Vec<String>)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), to_list(v)))
        .collect()
}

fn options(top: &str, views: &[&str]) -> FinalizeOptions {
    FinalizeOptions {
        views: ViewSelector::parse_list(views).unwrap(),
        top_level: top.to_string(),
        check: false,
    }
}

/// A three-level SoC: `fifo` <- `uart` <- `soc`, with a `bfm` testbench unit.
fn soc_project() -> (TempDir, ProjectContext, UnitRegistry) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(root, "ip/fifo/src/fifo.v");
    touch(root, "ip/fifo/inc/fifo_defs.vh");
    touch(root, "cores/uart/rtl/uart.sv");
    touch(root, "cores/uart/rtl/uart_rx.sv");
    touch(root, "cores/uart/tb/tb_uart.sv");
    touch(root, "soc/src/soc.v");
    touch(root, "soc/tb/tb_soc.sv");
    touch(root, "verif/bfm/tb/bfm.sv");
    touch(root, "legacy/src/old.v");

    let ctx = ProjectContext::new(root, HdlExtensions::default());
    let mut reg = UnitRegistry::new();
    reg.add(
        &ctx,
        &root.join("ip/fifo/unit.toml"),
        Some("fifo"),
        None,
        attrs(&[("includes", "src, inc")]),
    )
    .unwrap();
    reg.add(
        &ctx,
        &root.join("cores/uart/unit.toml"),
        Some("uart"),
        None,
        attrs(&[("use", "fifo"), ("src_dir", "rtl")]),
    )
    .unwrap();
    reg.add(
        &ctx,
        &root.join("soc/unit.toml"),
        Some("soc"),
        None,
        attrs(&[("use", "uart"), ("tb_use", "bfm")]),
    )
    .unwrap();
    reg.add(&ctx, &root.join("verif/bfm/unit.toml"), None, None, attrs(&[]))
        .unwrap();
    reg.add(&ctx, &root.join("legacy/unit.toml"), Some("legacy"), None, attrs(&[]))
        .unwrap();
    (dir, ctx, reg)
}

fn rel(root: &Path, paths: impl IntoIterator<Item = PathBuf>) -> Vec<String> {
    paths
        .into_iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().into_owned())
        .collect()
}

// ---------------------------------------------------------------------------
// Finalize
// ---------------------------------------------------------------------------

#[test]
fn finalize_orders_prunes_and_resolves() {
    let (dir, ctx, mut reg) = soc_project();
    let root = dir.path();
    // The bfm unit was named after its directory.
    reg.add_view("verif/bfm", "fast", attrs(&[])).unwrap();
    let mut reg2 = reg.clone();

    // Unknown testbench target first: the tb_use names the directory name.
    let err = reg2
        .finalize(&ctx, &options("soc", &["default"]))
        .unwrap_err();
    assert!(matches!(err, UnitError::MissingDependency { ref missing, .. } if missing == "bfm"));
    assert_eq!(reg2.state(), RegistryState::Declaring);

    // Point soc at the real name through an additive view.
    reg.add_view("soc", "sim", attrs(&[("tb_use", "verif/bfm")]))
        .unwrap();
    let err = reg
        .finalize(&ctx, &options("soc", &["default", "+sim"]))
        .unwrap_err();
    assert!(matches!(err, UnitError::MissingDependency { .. }));

    reg.add_view("soc", "sim_only", attrs(&[("tb_use", "verif/bfm")]))
        .unwrap();
    reg.finalize(&ctx, &options("soc", &["default", "sim_only"]))
        .unwrap();

    assert_eq!(reg.synth_deps(), ["fifo", "uart", "soc"]);
    assert_eq!(reg.sim_deps(), ["verif/bfm"]);
    assert!(reg.get_unit("legacy").is_err());

    let uart = reg.get_unit("uart").unwrap().attrs().unwrap().clone();
    assert_eq!(
        rel(root, uart.src.clone()),
        vec!["cores/uart/rtl/uart.sv", "cores/uart/rtl/uart_rx.sv"]
    );
    assert_eq!(
        rel(root, uart.includes.clone()),
        vec!["cores/uart/rtl", "ip/fifo/inc", "ip/fifo/src"]
    );
    assert_eq!(rel(root, uart.tb_src.clone()), vec!["cores/uart/tb/tb_uart.sv"]);
    assert_eq!(
        rel(root, uart.tb_includes),
        vec!["cores/uart/rtl", "cores/uart/tb", "ip/fifo/inc", "ip/fifo/src"]
    );

    let soc = reg.get_unit("soc").unwrap().attrs().unwrap().clone();
    assert_eq!(soc.unit_top, "soc");
    assert_eq!(soc.tb, "tb_soc");
    assert_eq!(soc.tb_uses, vec!["verif/bfm"]);
    assert_eq!(
        rel(root, soc.tb_includes),
        vec![
            "cores/uart/rtl",
            "ip/fifo/inc",
            "ip/fifo/src",
            "soc/src",
            "soc/tb",
            "verif/bfm/tb",
        ]
    );
}

#[test]
fn missing_declared_src_dir_is_a_path_error() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let ctx = ProjectContext::new(root, HdlExtensions::default());
    let mut reg = UnitRegistry::new();
    reg.add(&ctx, &root.join("a/unit.toml"), Some("a"), None, attrs(&[("src_dir", "rtl")]))
        .unwrap();

    let err = reg.finalize(&ctx, &options("a", &["default"])).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Path);
    match err {
        UnitError::Attribute { unit, script, source, .. } => {
            assert_eq!(unit, "a");
            assert_eq!(script, root.join("a/unit.toml"));
            assert!(matches!(source, AttrError::PathNotFound(p) if p == root.join("a/rtl")));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn unit_without_sources_resolves_empty() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let ctx = ProjectContext::new(root, HdlExtensions::default());
    let mut reg = UnitRegistry::new();
    reg.add(&ctx, &root.join("a/unit.toml"), Some("a"), None, attrs(&[]))
        .unwrap();
    reg.finalize(&ctx, &options("a", &["default"])).unwrap();

    let a = reg.get_unit("a").unwrap().attrs().unwrap();
    assert!(a.src.is_empty());
    assert!(a.includes.is_empty());
    assert!(a.tb_src.is_empty());
}

#[test]
fn check_mode_surfaces_errors_in_unused_views() {
    let (_dir, ctx, mut reg) = soc_project();
    reg.add_view("legacy", "broken", attrs(&[("src", "missing.v")]))
        .unwrap();

    let mut checked = reg.clone();
    let mut opts = options("uart", &["default"]);
    opts.check = true;
    let err = checked.finalize(&ctx, &opts).unwrap_err();
    match err {
        UnitError::Attribute { unit, view, .. } => {
            assert_eq!(unit, "legacy");
            assert_eq!(view, "broken");
        }
        other => panic!("unexpected error {other:?}"),
    }

    // Without check mode the broken view is never looked at.
    reg.finalize(&ctx, &options("uart", &["default"])).unwrap();
    assert_eq!(reg.synth_deps(), ["fifo", "uart"]);
}

#[test]
fn cyclic_use_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let ctx = ProjectContext::new(root, HdlExtensions::default());
    let mut reg = UnitRegistry::new();
    for (name, uses) in [("a", "b"), ("b", "c"), ("c", "b")] {
        reg.add(
            &ctx,
            &root.join(name).join("unit.toml"),
            Some(name),
            None,
            attrs(&[("use", uses)]),
        )
        .unwrap();
    }
    let err = reg.finalize(&ctx, &options("a", &["default"])).unwrap_err();
    match err {
        UnitError::CyclicDependency { cycle } => assert_eq!(cycle, vec!["b", "c", "b"]),
        other => panic!("unexpected error {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[test]
fn snapshot_roundtrip_is_lossless() {
    let (_dir, ctx, mut reg) = soc_project();
    reg.add_view("soc", "sim", attrs(&[("tb_use", "verif/bfm")]))
        .unwrap();
    let snapshot = reg
        .finalize(&ctx, &options("soc", &["default", "sim"]))
        .unwrap();

    let back = UnitRegistry::unpack(&snapshot, &ctx).unwrap();
    assert_eq!(back.state(), RegistryState::Unpacked);
    assert_eq!(back.top_level(), Some("soc"));
    assert_eq!(back.synth_deps(), reg.synth_deps());
    assert_eq!(back.sim_deps(), reg.sim_deps());
    assert_eq!(back.views(), reg.views());
    assert_eq!(back.len(), reg.len());
    for unit in reg.units() {
        let other = back.get_unit(unit.name()).unwrap();
        assert_eq!(other, unit);
    }

    let err = UnitRegistry::unpack(&snapshot, &ctx)
        .unwrap()
        .add(&ctx, Path::new("x/unit.toml"), None, None, attrs(&[]))
        .map(|_| ())
        .unwrap_err();
    assert!(matches!(err, UnitError::Sealed { state: RegistryState::Unpacked }));
}

#[test]
fn snapshot_reattaches_against_a_moved_project() {
    let (dir, ctx, mut reg) = soc_project();
    reg.unit_mut("uart")
        .unwrap()
        .set_ext("work_dir", ExtValue::Path(dir.path().join("build/uart")));
    let snapshot = reg.finalize(&ctx, &options("uart", &["default"])).unwrap();

    let path = dir.path().join("build/socman.snapshot");
    snapshot.write_to(&path).unwrap();

    let moved = PathBuf::from("/elsewhere/checkout");
    let moved_ctx = ProjectContext::new(&moved, HdlExtensions::default());
    let back = UnitRegistry::unpack(&Snapshot::read_from(&path).unwrap(), &moved_ctx).unwrap();

    let uart = back.get_unit("uart").unwrap();
    assert_eq!(uart.script(), moved.join("cores/uart/unit.toml"));
    assert!(uart
        .attrs()
        .unwrap()
        .src
        .contains(&moved.join("cores/uart/rtl/uart.sv")));
    assert_eq!(
        uart.ext_value("work_dir"),
        Some(&ExtValue::Path(moved.join("build/uart")))
    );
}

#[test]
fn corrupted_snapshot_is_rejected() {
    let (_dir, ctx, mut reg) = soc_project();
    let snapshot = reg.finalize(&ctx, &options("uart", &["default"])).unwrap();
    let mut bytes = snapshot.into_bytes();
    let mid = bytes.len() - 3;
    bytes[mid] ^= 0x5A;

    let err = UnitRegistry::unpack(&Snapshot::from_bytes(bytes), &ctx).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Snapshot);
    assert!(matches!(
        err,
        UnitError::Snapshot(SnapshotError::ChecksumMismatch { .. })
    ));
}

// ---------------------------------------------------------------------------
// Build plan
// ---------------------------------------------------------------------------

#[test]
fn build_plan_from_unpacked_registry() {
    let (_dir, ctx, mut reg) = soc_project();
    reg.add_view("soc", "sim", attrs(&[("tb_use", "verif/bfm")]))
        .unwrap();
    let snapshot = reg
        .finalize(&ctx, &options("soc", &["default", "sim"]))
        .unwrap();
    let back = UnitRegistry::unpack(&snapshot, &ctx).unwrap();

    let plan = BuildPlan::for_top(&back).unwrap();
    assert_eq!(plan.unit_count(), 4);
    assert_eq!(plan.waves()[0], vec!["fifo".to_string(), "verif/bfm".to_string()]);
    assert_eq!(plan.waves()[2], vec!["soc".to_string()]);
    assert!(back
        .get_unit("uart")
        .unwrap()
        .merged()
        .is_declared(AttrKey::SrcDir));
}
