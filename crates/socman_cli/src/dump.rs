//! `socman dump-source`: write per-unit source and include lists.
//!
//! Every unit in the synthesis and simulation orders gets its design sources
//! appended to `srcs.dump` and its include directories to `incs.dump`, one
//! build-relative path per line, under `<build>/<script dir>/work_dump/`.
//! Units declared by the same script share one pair of files.

use std::collections::BTreeSet;
use std::error::Error;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use socman_common::relative_to;
use socman_units::{Unit, UnitRegistry};

use crate::pipeline::Project;
use crate::GlobalArgs;

/// File receiving a unit's source list.
pub const SRC_DUMP: &str = "srcs.dump";
/// File receiving a unit's include list.
pub const INC_DUMP: &str = "incs.dump";
/// Directory, below the unit's build directory, holding the dump files.
pub const DUMP_DIR: &str = "work_dump";

/// Runs the `dump-source` command.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project = Project::open(global)?;
    let registry = project.load_registry()?;
    let written = dump_all(&registry, &project.root, &project.build_dir())?;
    if !global.quiet {
        for dir in &written {
            eprintln!("     Dumped {}", dir.display());
        }
    }
    Ok(0)
}

/// Writes the dump files of every finalized unit and returns the
/// directories written to.
///
/// Stale dump files are removed before anything is written so repeated
/// runs do not accumulate entries.
pub fn dump_all(
    registry: &UnitRegistry,
    root: &Path,
    build_dir: &Path,
) -> Result<BTreeSet<PathBuf>, Box<dyn Error>> {
    let names: Vec<&String> = registry
        .synth_deps()
        .iter()
        .chain(registry.sim_deps())
        .collect();
    let units = registry.get_units(&names)?;

    for unit in &units {
        let dir = dump_dir(unit, root, build_dir);
        for file in [SRC_DUMP, INC_DUMP] {
            match std::fs::remove_file(dir.join(file)) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
        }
    }

    let mut written = BTreeSet::new();
    for unit in &units {
        let Some(attrs) = unit.attrs() else {
            tracing::warn!("unit '{}' has no resolved attributes, skipped", unit.name());
            continue;
        };
        let dir = dump_dir(unit, root, build_dir);
        std::fs::create_dir_all(&dir)?;
        append_list(&dir.join(SRC_DUMP), &attrs.src, build_dir)?;
        append_list(&dir.join(INC_DUMP), &attrs.includes, build_dir)?;
        tracing::debug!("dumped '{}' to {}", unit.name(), dir.display());
        written.insert(dir);
    }
    Ok(written)
}

/// The dump directory of a unit: its script directory mirrored below the
/// build directory. Scripts outside the root fall back to the unit name.
fn dump_dir(unit: &Unit, root: &Path, build_dir: &Path) -> PathBuf {
    let rel = relative_to(unit.script_dir(), root);
    let mirrored = if rel.is_absolute() || rel.starts_with("..") {
        build_dir.join(unit.name())
    } else {
        build_dir.join(rel)
    };
    mirrored.join(DUMP_DIR)
}

fn append_list(file: &Path, paths: &BTreeSet<PathBuf>, build_dir: &Path) -> std::io::Result<()> {
    let mut out = OpenOptions::new().create(true).append(true).open(file)?;
    for path in paths {
        writeln!(out, "{}", relative_to(path, build_dir).display())?;
    }
    Ok(())
}
