//! Error types for include-dependency scanning.

use std::path::PathBuf;

/// Errors raised while scanning a unit's sources for implicit dependencies.
///
/// A failed scan never yields a partial dependency list.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The preprocessor could not be started.
    #[error("failed to run '{program}': {source}")]
    Spawn {
        /// The program that was invoked.
        program: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The preprocessor exited unsuccessfully.
    #[error("command '{command}' failed ({status}):\n{output}")]
    ToolFailed {
        /// The full command line.
        command: String,
        /// The exit status, as reported by the OS.
        status: String,
        /// Captured standard output and error.
        output: String,
    },

    /// The preprocessor's output could not be interpreted.
    #[error("unparsable output from '{command}': {reason}")]
    Unparsable {
        /// The full command line.
        command: String,
        /// What could not be parsed.
        reason: String,
    },

    /// A line starting with `` `line `` is not a valid file-boundary marker.
    #[error("malformed line marker: {line}")]
    MalformedMarker {
        /// The offending output line.
        line: String,
    },

    /// Reading a source or the cache failed.
    #[error("scan I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The scan cache could not be written.
    #[error("scan cache serialization error: {reason}")]
    Serialization {
        /// Description of the failure.
        reason: String,
    },
}
