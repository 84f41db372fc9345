//! Implicit dependency discovery for HDL sources.
//!
//! A unit's sources may pull in headers and other files through
//! `` `include `` directives. This crate runs an external Verilog
//! preprocessor over the sources, reads the `` `line `` markers it emits to
//! learn which files it visited, and caches the answer keyed by content so
//! that unchanged units are not rescanned.

#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod markers;
pub mod preproc;

pub use cache::{hash_file, CachedScanner, ScanEntry, ScanManifest};
pub use error::ScanError;
pub use markers::{parse_marker, visited_files, LineMarker};
pub use preproc::{
    DependencyScanner, Preprocessor, ScanRequest, DEFAULT_INCLUDE_FLAG, DEFAULT_PREPROCESSOR,
};
