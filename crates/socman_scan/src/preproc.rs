//! Running an external preprocessor to discover included files.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use socman_common::{normalize, relative_to, ContentHash, ContentHasher};

use crate::error::ScanError;
use crate::markers::visited_files;

/// Default preprocessor program.
pub const DEFAULT_PREPROCESSOR: &str = "vppreproc";
/// Default flag preceding each include directory.
pub const DEFAULT_INCLUDE_FLAG: &str = "-y";

/// The inputs of one scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanRequest {
    /// Source files to preprocess.
    pub sources: Vec<PathBuf>,
    /// Include directories searched by the preprocessor.
    pub includes: Vec<PathBuf>,
    /// Directory the preprocessor runs in; arguments are relative to it.
    pub work_dir: PathBuf,
}

/// Something that can list the files a set of sources depends on.
pub trait DependencyScanner {
    /// Returns the files visited while processing `req.sources`, excluding
    /// the sources themselves.
    fn scan(&mut self, req: &ScanRequest) -> Result<Vec<PathBuf>, ScanError>;

    /// Feeds everything besides the request that determines the scan result
    /// (tool identity, flags, relevant environment) into `hasher`.
    fn fingerprint(&self, hasher: &mut ContentHasher);
}

/// A scanner that spawns a Verilog preprocessor and reads its line markers.
#[derive(Clone, Debug)]
pub struct Preprocessor {
    program: String,
    include_flag: String,
    args: Vec<String>,
    env: Vec<String>,
    identity: OnceLock<Vec<Option<ContentHash>>>,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_PREPROCESSOR)
    }
}

impl Preprocessor {
    /// A preprocessor running `program` with the default include flag.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            include_flag: DEFAULT_INCLUDE_FLAG.to_string(),
            args: Vec::new(),
            env: Vec::new(),
            identity: OnceLock::new(),
        }
    }

    /// Sets the flag that precedes each include directory.
    pub fn include_flag(mut self, flag: impl Into<String>) -> Self {
        self.include_flag = flag.into();
        self
    }

    /// Sets extra arguments placed before the include directories.
    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self.identity = OnceLock::new();
        self
    }

    /// Names environment variables whose values affect the tool's output.
    pub fn env(mut self, names: Vec<String>) -> Self {
        self.env = names;
        self
    }

    /// The program name.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Content hashes of the resolved executable and of every argument
    /// naming an existing file (wrapper scripts, option files).
    ///
    /// Computed once per scanner. `None` marks a file that could not be read.
    fn identity(&self) -> &[Option<ContentHash>] {
        self.identity.get_or_init(|| {
            let mut hashes = vec![resolve_program(&self.program).and_then(|p| hash_contents(&p))];
            for arg in &self.args {
                let path = Path::new(arg);
                if path.is_file() {
                    hashes.push(hash_contents(path));
                }
            }
            hashes
        })
    }

    /// Builds `program args… (flag dir)… source…` for `req`.
    pub fn command_line(&self, req: &ScanRequest) -> Vec<String> {
        let mut cmd = vec![self.program.clone()];
        cmd.extend(self.args.iter().cloned());
        for dir in &req.includes {
            cmd.push(self.include_flag.clone());
            cmd.push(relative_to(dir, &req.work_dir).to_string_lossy().into_owned());
        }
        for src in &req.sources {
            cmd.push(relative_to(src, &req.work_dir).to_string_lossy().into_owned());
        }
        cmd
    }
}

impl DependencyScanner for Preprocessor {
    fn scan(&mut self, req: &ScanRequest) -> Result<Vec<PathBuf>, ScanError> {
        let cmd = self.command_line(req);
        let shown = cmd.join(" ");
        tracing::debug!("scan: {}", shown);

        let output = Command::new(&cmd[0])
            .args(&cmd[1..])
            .current_dir(&req.work_dir)
            .output()
            .map_err(|source| ScanError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
            captured.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(ScanError::ToolFailed {
                command: shown,
                status: output.status.to_string(),
                output: captured,
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|e| ScanError::Unparsable {
            command: shown.clone(),
            reason: e.to_string(),
        })?;
        let names = visited_files(&stdout).map_err(|e| ScanError::Unparsable {
            command: shown.clone(),
            reason: e.to_string(),
        })?;

        let inputs: Vec<PathBuf> = req
            .sources
            .iter()
            .map(|s| normalize(&req.work_dir.join(s)))
            .collect();
        let mut deps = Vec::new();
        for name in names {
            let path = normalize(&req.work_dir.join(&name));
            if !inputs.contains(&path) && !deps.contains(&path) {
                deps.push(path);
            }
        }
        tracing::debug!("scan found {} dependency file(s)", deps.len());
        Ok(deps)
    }

    fn fingerprint(&self, hasher: &mut ContentHasher) {
        hasher.str_field(&self.program).str_field(&self.include_flag);
        for hash in self.identity() {
            match hash {
                Some(hash) => hasher.str_field(&hash.to_string()),
                None => hasher.field(&[]),
            };
        }
        for arg in &self.args {
            hasher.str_field(arg);
        }
        for name in &self.env {
            hasher.str_field(name);
            match std::env::var_os(name) {
                Some(value) => hasher.str_field(&value.to_string_lossy()),
                None => hasher.field(&[]),
            };
        }
    }
}

/// Finds the file `program` runs: a path as given, or the first match on `PATH`.
fn resolve_program(program: &str) -> Option<PathBuf> {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }
    std::env::split_paths(&std::env::var_os("PATH")?)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

fn hash_contents(path: &Path) -> Option<ContentHash> {
    std::fs::read(path).ok().map(|bytes| ContentHash::from_bytes(&bytes))
}
