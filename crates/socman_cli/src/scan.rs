//! `socman scan`: list the files a unit's sources pull in.

use std::error::Error;
use std::path::PathBuf;

use socman_scan::{CachedScanner, DependencyScanner, Preprocessor, ScanRequest};
use socman_units::ResolvedAttrs;

use crate::pipeline::{Project, SCAN_CACHE_DIR};
use crate::{GlobalArgs, ScanArgs};

/// Runs the `scan` command.
pub fn run(args: &ScanArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project = Project::open(global)?;
    let registry = project.load_registry()?;
    let unit = registry.get_unit(&args.unit)?;
    let attrs = unit
        .attrs()
        .ok_or_else(|| format!("unit '{}' has no resolved attributes", unit.name()))?;

    let build_dir = project.build_dir();
    std::fs::create_dir_all(&build_dir)?;
    let req = request(attrs, args.tb, build_dir.clone());
    if req.sources.is_empty() {
        if !global.quiet {
            eprintln!("    Nothing to scan for '{}'", unit.name());
        }
        return Ok(0);
    }

    let scan = &project.config.scan;
    let pp = Preprocessor::new(scan.preprocessor.clone())
        .include_flag(scan.include_flag.clone())
        .args(scan.args.clone())
        .env(scan.env.clone());

    let deps = if args.no_cache {
        let mut pp = pp;
        pp.scan(&req)?
    } else {
        let mut cached = CachedScanner::new(pp, build_dir.join(SCAN_CACHE_DIR));
        let deps = cached.scan(&req)?;
        cached.save()?;
        deps
    };

    for dep in &deps {
        println!("{}", dep.display());
    }
    if !global.quiet {
        eprintln!(
            "    Scanned {} source(s) of '{}', {} dependency file(s)",
            req.sources.len(),
            unit.name(),
            deps.len()
        );
    }
    Ok(0)
}

/// Builds the scan request for a unit's design or testbench sources.
pub fn request(attrs: &ResolvedAttrs, tb: bool, work_dir: PathBuf) -> ScanRequest {
    let (sources, includes) = if tb {
        (&attrs.tb_src, &attrs.tb_includes)
    } else {
        (&attrs.src, &attrs.includes)
    };
    ScanRequest {
        sources: sources.iter().cloned().collect(),
        includes: includes.iter().cloned().collect(),
        work_dir,
    }
}
