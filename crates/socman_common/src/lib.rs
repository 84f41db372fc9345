//! Shared foundational types used across the socman crates.
//!
//! This crate provides content hashing for scan-cache keys and snapshot
//! checksums, the HDL extension tables used to discover source files, the
//! comma-list normalisation applied to declared attribute values, and lexical
//! path helpers.

#![warn(missing_docs)]

pub mod hash;
pub mod hdl;
pub mod list;
pub mod path;

pub use hash::{ContentHash, ContentHasher};
pub use hdl::{HdlExtensions, HdlLanguage};
pub use list::to_list;
pub use path::{normalize, relative_to};
