//! `socman check`: validate every view of every declared unit.

use std::error::Error;

use crate::pipeline::Project;
use crate::GlobalArgs;

/// Runs the `check` command.
///
/// Unlike `configure --check` this does not need a top level and writes
/// nothing.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project = Project::open(global)?;
    let mut registry = project.declare()?;
    registry.check_all(&project.ctx)?;
    if global.verbose {
        for unit in registry.units() {
            eprintln!(
                "    Checked {} ({} view(s))",
                unit.name(),
                unit.views().len()
            );
        }
    }
    if !global.quiet {
        eprintln!("    Checked {} unit(s)", registry.len());
    }
    Ok(0)
}
