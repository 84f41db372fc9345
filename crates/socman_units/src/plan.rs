//! Build waves: grouping the finalized units for parallel execution.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::UnitError;
use crate::registry::UnitRegistry;

/// The top level's units grouped into waves.
///
/// Every `use` target of a unit lies in an earlier wave, so the units of a
/// single wave may be built concurrently once all earlier waves are done.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    waves: Vec<Vec<String>>,
}

impl BuildPlan {
    /// Plans the synthesis and simulation units of a finalized registry.
    pub fn for_top(registry: &UnitRegistry) -> Result<Self, UnitError> {
        let order = registry.synth_deps().iter().chain(registry.sim_deps());
        let mut levels: HashMap<&str, usize> = HashMap::new();
        let mut waves: Vec<Vec<String>> = Vec::new();

        for name in order {
            let unit = registry.get_unit(name)?;
            let uses = unit.attrs().map(|a| a.uses.as_slice()).unwrap_or_default();
            let level = uses
                .iter()
                .filter_map(|u| levels.get(u.as_str()))
                .max()
                .map_or(0, |l| l + 1);
            levels.insert(name.as_str(), level);
            if waves.len() <= level {
                waves.resize_with(level + 1, Vec::new);
            }
            waves[level].push(name.clone());
        }
        Ok(Self { waves })
    }

    /// The waves, leaves first.
    pub fn waves(&self) -> &[Vec<String>] {
        &self.waves
    }

    /// Number of units across all waves.
    pub fn unit_count(&self) -> usize {
        self.waves.iter().map(Vec::len).sum()
    }
}
