//! Error types for unit declaration, finalize, and the snapshot boundary.

use std::fmt;
use std::path::PathBuf;

use crate::attr::AttrKey;

/// Broad class of a [`UnitError`], used by callers to pick an exit path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed or inconsistent declarations.
    Configuration,
    /// A declared file or directory is absent, duplicated, or unreadable.
    Path,
    /// A snapshot could not be written, read, or validated.
    Snapshot,
}

/// Lifecycle state of a [`UnitRegistry`](crate::UnitRegistry).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistryState {
    /// Accepting `add` / `add_view`.
    Declaring,
    /// Finalized and detached into a snapshot.
    Packed,
    /// Reattached from a snapshot in a later phase.
    Unpacked,
}

impl fmt::Display for RegistryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegistryState::Declaring => "declaring",
            RegistryState::Packed => "packed",
            RegistryState::Unpacked => "unpacked",
        })
    }
}

/// Errors raised while resolving a single view attribute.
#[derive(Debug, thiserror::Error)]
pub enum AttrError {
    /// The attribute key is not one of the recognized keys.
    #[error("attribute '{0}' not understood")]
    Unrecognized(String),

    /// The attribute value has the wrong shape.
    #[error("attribute '{key}' is malformed: {reason}")]
    Malformed {
        /// The offending attribute.
        key: AttrKey,
        /// What is wrong with it.
        reason: String,
    },

    /// A declared file or directory does not exist.
    #[error("file or directory '{}' not found", .0.display())]
    PathNotFound(PathBuf),

    /// Two declared names resolve to the same file or directory.
    #[error("file or directory '{}' already specified", .0.display())]
    DuplicatePath(PathBuf),

    /// A declared source directory holds no HDL sources.
    #[error("directory '{}' contains no sources ending in {}", path.display(), exts.join(", "))]
    EmptySourceDirectory {
        /// The searched directory.
        path: PathBuf,
        /// The extensions searched for.
        exts: Vec<String>,
    },

    /// Walking a source directory failed.
    #[error("failed to search '{}': {source}", path.display())]
    Search {
        /// The directory being searched.
        path: PathBuf,
        /// The underlying walk error.
        source: walkdir::Error,
    },
}

impl AttrError {
    /// Returns the error class of this attribute error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            AttrError::Unrecognized(_) | AttrError::Malformed { .. } => {
                ErrorCategory::Configuration
            }
            AttrError::PathNotFound(_)
            | AttrError::DuplicatePath(_)
            | AttrError::EmptySourceDirectory { .. }
            | AttrError::Search { .. } => ErrorCategory::Path,
        }
    }
}

/// Errors raised by the snapshot (detach/reattach) boundary.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Reading or writing the snapshot file failed.
    #[error("snapshot I/O error at {}: {source}", path.display())]
    Io {
        /// The snapshot path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The snapshot header is missing or not a socman header.
    #[error("invalid snapshot header: {reason}")]
    InvalidHeader {
        /// What is wrong with the header.
        reason: String,
    },

    /// The snapshot was written by an incompatible format version.
    #[error("snapshot version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The format version this build reads.
        expected: u32,
        /// The format version found in the snapshot.
        actual: u32,
    },

    /// The payload does not match the checksum in the header.
    #[error("snapshot checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Checksum stored in the header.
        expected: String,
        /// Checksum of the payload read.
        actual: String,
    },

    /// Encoding or decoding the payload failed.
    #[error("snapshot serialization error: {reason}")]
    Serialization {
        /// Description of the failure.
        reason: String,
    },

    /// A dependency list names a unit that is not in the snapshot.
    #[error("snapshot unit '{unit}' refers to unknown unit '{missing}'")]
    DanglingReference {
        /// The unit (or `<registry>`) holding the reference.
        unit: String,
        /// The unresolvable name.
        missing: String,
    },
}

/// Errors raised by the unit registry.
///
/// Every variant that stems from a declaration carries the unit name and the
/// declaring script, so it can be reported without further context.
#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    /// A unit with this name already exists.
    #[error(
        "unit names must be unique: unit '{name}' from {} already defined by {}",
        script.display(),
        existing.display()
    )]
    DuplicateUnit {
        /// The clashing name.
        name: String,
        /// Script attempting the second declaration.
        script: PathBuf,
        /// Script that declared the unit first.
        existing: PathBuf,
    },

    /// No unit with this name exists.
    #[error("cannot find unit '{name}'")]
    UnitNotFound {
        /// The requested name.
        name: String,
    },

    /// The unit already has a view with this name.
    #[error(
        "view names must be unique: unit '{unit}' from {} already has view '{view}'",
        script.display()
    )]
    DuplicateView {
        /// The unit.
        unit: String,
        /// The clashing view name.
        view: String,
        /// The unit's declaring script.
        script: PathBuf,
    },

    /// The requested top-level unit was never declared.
    #[error("top level '{name}' not found; check the top-level name and the unit declarations")]
    TopLevelNotFound {
        /// The requested top level.
        name: String,
    },

    /// A `use` or `tb_use` edge names an undeclared unit.
    #[error(
        "unit '{missing}' required by '{required_by}' defined in {} has not been defined",
        script.display()
    )]
    MissingDependency {
        /// The undeclared name.
        missing: String,
        /// The unit whose edge names it.
        required_by: String,
        /// The referencing unit's declaring script.
        script: PathBuf,
    },

    /// The `use` edges form a cycle.
    #[error("cyclic dependency: {}", cycle.join(" -> "))]
    CyclicDependency {
        /// The units on the cycle; the first name is repeated at the end.
        cycle: Vec<String>,
    },

    /// Check mode was requested twice for the same unit.
    #[error("unit '{unit}' has already been checked")]
    AlreadyChecked {
        /// The unit.
        unit: String,
    },

    /// Resolving an attribute of one of the unit's views failed.
    #[error("unit '{unit}' ({}), view '{view}': {source}", script.display())]
    Attribute {
        /// The unit.
        unit: String,
        /// The view, or `(resolved)` for the merged view.
        view: String,
        /// The unit's declaring script.
        script: PathBuf,
        /// The attribute failure.
        #[source]
        source: AttrError,
    },

    /// The registry no longer accepts declarations.
    #[error("unit registry is {state} and can no longer be modified")]
    Sealed {
        /// The current state.
        state: RegistryState,
    },

    /// The snapshot boundary failed.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl UnitError {
    /// Returns the error class of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            UnitError::Attribute { source, .. } => source.category(),
            UnitError::Snapshot(_) => ErrorCategory::Snapshot,
            _ => ErrorCategory::Configuration,
        }
    }
}
