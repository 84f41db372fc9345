//! Lexical path helpers shared by the registry and the scanner.
//!
//! Neither function touches the filesystem, so both work for paths that do
//! not exist yet (build directories, reattached snapshots).

use std::path::{Component, Path, PathBuf};

/// Lexically normalizes a path: drops `.` and folds `..` into its parent.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Expresses `path` relative to `base`, climbing with `..` where needed.
///
/// Relative inputs, or paths sharing nothing but the root with `base`, are
/// returned unchanged.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    if !path.is_absolute() || !base.is_absolute() {
        return path.to_path_buf();
    }
    let path = normalize(path);
    let base = normalize(base);
    let mut ours = path.components().peekable();
    let mut theirs = base.components().peekable();
    let mut shared = 0;
    while let (Some(a), Some(b)) = (ours.peek(), theirs.peek()) {
        if a != b {
            break;
        }
        ours.next();
        theirs.next();
        shared += 1;
    }
    if shared <= 1 {
        return path;
    }
    let mut rel = PathBuf::new();
    for _ in theirs {
        rel.push("..");
    }
    rel.extend(ours);
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}
