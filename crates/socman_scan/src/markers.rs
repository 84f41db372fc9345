//! Parsing of `` `line `` file-boundary markers in preprocessor output.
//!
//! A Verilog preprocessor marks every switch between files with
//!
//! ```text
//! `line <number> "<file>" <level>
//! ```
//!
//! where the level is optional. Every line whose first word is `` `line ``
//! must follow this grammar; anything else in the output, including longer
//! directives such as `` `line_width ``, is ignored.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ScanError;

/// Prefix of a file-boundary marker.
const MARKER_PREFIX: &str = "`line";

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^`line\s+(\d+)\s+"([^"]*)"(?:\s+(\d+))?\s*$"#)
            .expect("line marker regex must compile")
    })
}

/// One parsed marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineMarker {
    /// Line number in `file` that the following text starts at.
    pub line: u32,
    /// The file name as written by the preprocessor.
    pub file: String,
    /// Include nesting change (0 none, 1 entering, 2 leaving), if given.
    pub level: Option<u8>,
}

/// Parses one output line.
///
/// Returns `Ok(None)` for lines that are not markers.
pub fn parse_marker(line: &str) -> Result<Option<LineMarker>, ScanError> {
    let trimmed = line.trim_start();
    let is_marker = trimmed
        .strip_prefix(MARKER_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace));
    if !is_marker {
        return Ok(None);
    }
    let malformed = || ScanError::MalformedMarker {
        line: line.to_string(),
    };
    let caps = marker_regex().captures(trimmed).ok_or_else(malformed)?;
    let number = caps[1].parse().map_err(|_| malformed())?;
    let level = match caps.get(3) {
        Some(m) => Some(m.as_str().parse().map_err(|_| malformed())?),
        None => None,
    };
    Ok(Some(LineMarker {
        line: number,
        file: caps[2].to_string(),
        level,
    }))
}

/// Collects the distinct file names mentioned by markers, in first-seen order.
///
/// Empty names are dropped.
pub fn visited_files(output: &str) -> Result<Vec<String>, ScanError> {
    let mut files: Vec<String> = Vec::new();
    for line in output.lines() {
        if let Some(marker) = parse_marker(line)? {
            if !marker.file.is_empty() && !files.contains(&marker.file) {
                files.push(marker.file);
            }
        }
    }
    Ok(files)
}
