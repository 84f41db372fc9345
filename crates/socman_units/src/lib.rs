//! Units, views and the dependency-resolution engine.
//!
//! A project declares units, each with one or more named views. Finalizing
//! the [`UnitRegistry`] against a top-level unit and an ordered view list
//! merges every unit's views into one, orders dependencies leaf-first for
//! synthesis and simulation, drops whatever the top level does not reach,
//! and packs the result into a [`Snapshot`] that a later build phase can
//! [`unpack`](UnitRegistry::unpack) against its own project root.

#![warn(missing_docs)]

pub mod attr;
pub mod context;
mod deps;
pub mod error;
pub mod inherit;
pub mod plan;
pub mod registry;
pub mod snapshot;
pub mod unit;
pub mod view;

pub use attr::{AttrKey, KeySet, MergeMode};
pub use context::ProjectContext;
pub use error::{AttrError, ErrorCategory, RegistryState, SnapshotError, UnitError};
pub use inherit::{apply_inheritance, ViewSelector};
pub use plan::BuildPlan;
pub use registry::{FinalizeOptions, UnitRegistry};
pub use snapshot::{Detach, Snapshot, SNAPSHOT_FORMAT_VERSION};
pub use unit::{ExtValue, ResolvedAttrs, Unit, DEFAULT_VIEW};
pub use view::{AttrValue, Origin, View};
