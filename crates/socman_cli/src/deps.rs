//! `socman deps`: print the dependency orders from the snapshot.

use std::error::Error;

use socman_units::{BuildPlan, UnitRegistry};

use crate::pipeline::Project;
use crate::{DepsArgs, GlobalArgs, OutputFormat};

/// Runs the `deps` command.
pub fn run(args: &DepsArgs, global: &GlobalArgs) -> Result<i32, Box<dyn Error>> {
    let project = Project::open(global)?;
    let registry = project.load_registry()?;
    println!("{}", render(&registry, args)?);
    Ok(0)
}

/// Renders the requested orders in the requested format.
pub fn render(registry: &UnitRegistry, args: &DepsArgs) -> Result<String, Box<dyn Error>> {
    let (unit, synth, sim) = match &args.unit {
        Some(name) => {
            let unit = registry.get_unit(name)?;
            (unit.name(), unit.synth_deps(), unit.sim_deps())
        }
        None => (
            registry.top_level().unwrap_or_default(),
            registry.synth_deps(),
            registry.sim_deps(),
        ),
    };
    let plan = if args.waves {
        Some(BuildPlan::for_top(registry)?)
    } else {
        None
    };

    match args.format {
        OutputFormat::Json => {
            let mut doc = serde_json::json!({
                "unit": unit,
                "synthesis": synth,
                "simulation": sim,
            });
            if let Some(plan) = &plan {
                doc["waves"] = serde_json::to_value(plan.waves())?;
            }
            Ok(serde_json::to_string_pretty(&doc)?)
        }
        OutputFormat::Text => {
            let mut out = format!(
                "unit: {unit}\nsynthesis: {}\nsimulation: {}",
                synth.join(" "),
                sim.join(" ")
            );
            if let Some(plan) = &plan {
                for (i, wave) in plan.waves().iter().enumerate() {
                    out.push_str(&format!("\nwave {}: {}", i + 1, wave.join(" ")));
                }
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socman_common::HdlExtensions;
    use socman_units::{FinalizeOptions, ProjectContext, ViewSelector};

    /// a <- b <- top, with top's testbench using sim_model.
    fn finalized(root: &std::path::Path) -> UnitRegistry {
        let ctx = ProjectContext::new(root, HdlExtensions::default());
        let mut registry = UnitRegistry::new();
        let decls: [(&str, &str, &str); 4] = [
            ("a", "", ""),
            ("b", "a", ""),
            ("sim_model", "", ""),
            ("top", "b", "sim_model"),
        ];
        for (name, uses, tb_uses) in decls {
            let mut attrs = Vec::new();
            if !uses.is_empty() {
                attrs.push(("use", vec![uses.to_string()]));
            }
            if !tb_uses.is_empty() {
                attrs.push(("tb_use", vec![tb_uses.to_string()]));
            }
            registry
                .add(&ctx, &root.join(name).join("unit.toml"), Some(name), None, attrs)
                .unwrap();
        }
        registry
            .finalize(
                &ctx,
                &FinalizeOptions {
                    views: vec![ViewSelector::over("default")],
                    top_level: "top".to_string(),
                    check: false,
                },
            )
            .unwrap();
        registry
    }

    fn args(unit: Option<&str>, format: OutputFormat, waves: bool) -> DepsArgs {
        DepsArgs {
            unit: unit.map(str::to_string),
            format,
            waves,
        }
    }

    #[test]
    fn text_for_top_level() {
        let dir = tempfile::tempdir().unwrap();
        let registry = finalized(dir.path());
        let out = render(&registry, &args(None, OutputFormat::Text, false)).unwrap();
        assert_eq!(out, "unit: top\nsynthesis: a b top\nsimulation: sim_model");
    }

    #[test]
    fn text_with_waves() {
        let dir = tempfile::tempdir().unwrap();
        let registry = finalized(dir.path());
        let out = render(&registry, &args(None, OutputFormat::Text, true)).unwrap();
        assert!(out.ends_with("wave 1: a sim_model\nwave 2: b\nwave 3: top"), "{out}");
    }

    #[test]
    fn json_for_named_unit() {
        let dir = tempfile::tempdir().unwrap();
        let registry = finalized(dir.path());
        let out = render(&registry, &args(Some("b"), OutputFormat::Json, false)).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(doc["unit"], "b");
        assert_eq!(doc["synthesis"], serde_json::json!(["a", "b"]));
        assert_eq!(doc["simulation"], serde_json::json!([]));
        assert!(doc.get("waves").is_none());
    }

    #[test]
    fn unknown_unit_errors() {
        let dir = tempfile::tempdir().unwrap();
        let registry = finalized(dir.path());
        assert!(render(&registry, &args(Some("nope"), OutputFormat::Text, false)).is_err());
    }
}
