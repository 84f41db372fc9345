//! Leaf-first dependency ordering over `use` edges.
//!
//! The walk is an explicit-stack depth-first traversal with three states per
//! unit (unvisited, visiting, done). Reaching a unit that is still being
//! visited means the `use` edges form a cycle, which is reported at once.

use std::collections::{BTreeMap, HashMap};

use crate::attr::AttrKey;
use crate::error::UnitError;
use crate::unit::Unit;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

struct Frame<'a> {
    unit: &'a Unit,
    edges: Vec<String>,
    next: usize,
}

/// Accumulates a leaf-first order across one or more roots.
struct Walker<'a> {
    units: &'a BTreeMap<String, Unit>,
    marks: HashMap<&'a str, Mark>,
    order: Vec<String>,
}

impl<'a> Walker<'a> {
    fn new(units: &'a BTreeMap<String, Unit>) -> Self {
        Self {
            units,
            marks: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn lookup(&self, name: &str, referrer: &Unit) -> Result<&'a Unit, UnitError> {
        self.units
            .get(name)
            .ok_or_else(|| UnitError::MissingDependency {
                missing: name.to_string(),
                required_by: referrer.name().to_string(),
                script: referrer.script().to_path_buf(),
            })
    }

    /// Appends `root` and everything it transitively uses, root last.
    fn visit(&mut self, root: &'a Unit) -> Result<(), UnitError> {
        if self.marks.contains_key(root.name()) {
            return Ok(());
        }
        self.marks.insert(root.name(), Mark::Visiting);
        let mut stack = vec![Frame {
            unit: root,
            edges: root.edges(AttrKey::Use)?,
            next: 0,
        }];

        while let Some(top) = stack.last_mut() {
            if top.next == top.edges.len() {
                let unit = top.unit;
                stack.pop();
                self.marks.insert(unit.name(), Mark::Done);
                self.order.push(unit.name().to_string());
                continue;
            }

            let name = top.edges[top.next].clone();
            top.next += 1;
            let referrer = top.unit;

            match self.marks.get(name.as_str()).copied() {
                Some(Mark::Done) => {}
                Some(Mark::Visiting) => {
                    let start = stack
                        .iter()
                        .position(|f| f.unit.name() == name)
                        .unwrap_or(0);
                    let mut cycle: Vec<String> =
                        stack[start..].iter().map(|f| f.unit.name().to_string()).collect();
                    cycle.push(name);
                    return Err(UnitError::CyclicDependency { cycle });
                }
                None => {
                    let dep = self.lookup(&name, referrer)?;
                    self.marks.insert(dep.name(), Mark::Visiting);
                    stack.push(Frame {
                        unit: dep,
                        edges: dep.edges(AttrKey::Use)?,
                        next: 0,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Leaf-first synthesis dependencies of `unit`, ending with `unit` itself.
pub(crate) fn synth_deps(
    units: &BTreeMap<String, Unit>,
    unit: &Unit,
) -> Result<Vec<String>, UnitError> {
    let mut walker = Walker::new(units);
    let root = walker.lookup(unit.name(), unit)?;
    walker.visit(root)?;
    Ok(walker.order)
}

/// Leaf-first simulation dependencies of `unit`, starting from `roots`.
///
/// Everything already in `synth` is filtered out.
pub(crate) fn sim_deps(
    units: &BTreeMap<String, Unit>,
    unit: &Unit,
    roots: &[String],
    synth: &[String],
) -> Result<Vec<String>, UnitError> {
    let mut walker = Walker::new(units);
    for name in roots {
        let root = walker.lookup(name, unit)?;
        walker.visit(root)?;
    }
    let mut order = walker.order;
    order.retain(|name| !synth.contains(name));
    Ok(order)
}
