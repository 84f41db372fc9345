//! `socman configure`: resolve the design and write the snapshot.

use std::error::Error;

use socman_config::{resolve_options, Overrides, SIM_ENV_VAR};
use socman_units::{FinalizeOptions, ViewSelector};

use crate::pipeline::{join_names, Project};
use crate::{ConfigureArgs, GlobalArgs};

/// Runs the `configure` command.
pub fn run(args: &ConfigureArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project = Project::open(global)?;
    let overrides = Overrides {
        top_level: args.top_level.clone(),
        views: args.views.clone(),
        check: args.check,
        simulator: std::env::var(SIM_ENV_VAR).ok(),
    };
    let resolved = resolve_options(&project.config, &overrides)?;

    if !global.quiet {
        eprintln!("   Project {}", project.config.project.name);
        eprintln!("   Backend {}", resolved.backend);
    }

    let mut registry = project.declare()?;
    let opts = FinalizeOptions {
        views: ViewSelector::parse_list(&resolved.views)?,
        top_level: resolved.top_level,
        check: resolved.check,
    };
    let snapshot = registry.finalize(&project.ctx, &opts)?;
    let path = project.snapshot_path();
    snapshot.write_to(&path)?;

    if !global.quiet {
        eprintln!("  Top level {}", opts.top_level);
        eprintln!("  Synthesis {}", join_names(registry.synth_deps()));
        eprintln!(" Simulation {}", join_names(registry.sim_deps()));
        eprintln!("   Snapshot {}", path.display());
    }
    Ok(0)
}
