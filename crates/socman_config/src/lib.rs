//! Parsing and validation of `socman.toml` and `unit.toml` files.
//!
//! This crate reads the project configuration and the per-directory unit
//! declaration files, and resolves the effective options (top level, view
//! priority list, check mode, simulator backend) for a configure run.

#![warn(missing_docs)]

pub mod backend;
pub mod decl;
pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use backend::{Backend, SIM_ENV_VAR};
pub use decl::{discover_declarations, load_decl_file, load_decl_from_str, DeclFile, UnitDecl, ViewDecl, DECL_FILE};
pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use resolve::{resolve_options, Overrides, ResolvedOptions};
pub use types::*;
