//! socman CLI: configure, inspect and scan an HDL unit hierarchy.
//!
//! `socman configure` discovers every `unit.toml` below the project root,
//! finalizes the registry against the top-level unit and writes a snapshot
//! to the build directory. The other commands reattach that snapshot:
//! `deps` prints the dependency orders, `scan` lists a unit's included
//! files, `dump-source` writes per-unit source and include lists, and
//! `check` validates every view of every unit without finalizing.

#![warn(missing_docs)]

mod check;
mod configure;
mod deps;
mod dump;
mod pipeline;
mod scan;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// socman: HDL unit dependency resolution.
#[derive(Parser, Debug)]
#[command(name = "socman", version, about = "HDL unit dependency manager")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `socman.toml`, or the directory holding it.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve dependencies and write the registry snapshot.
    Configure(ConfigureArgs),
    /// Print the dependency orders recorded in the snapshot.
    Deps(DepsArgs),
    /// List the files a unit's sources include.
    Scan(ScanArgs),
    /// Write `srcs.dump` and `incs.dump` for every unit in the design.
    DumpSource,
    /// Validate every view of every declared unit.
    Check,
}

/// Arguments for `socman configure`.
#[derive(Parser, Debug)]
pub struct ConfigureArgs {
    /// Top-level unit; overrides `project.top_level`.
    #[arg(short, long)]
    pub top_level: Option<String>,

    /// Comma-separated view list; `+name` entries are additive.
    #[arg(long, allow_hyphen_values = true)]
    pub views: Option<String>,

    /// Check every view of every unit before finalizing.
    #[arg(long)]
    pub check: bool,
}

/// Arguments for `socman deps`.
#[derive(Parser, Debug)]
pub struct DepsArgs {
    /// Show the orders of this unit instead of the top level.
    pub unit: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also print the build waves.
    #[arg(long)]
    pub waves: bool,
}

/// Arguments for `socman scan`.
#[derive(Parser, Debug)]
pub struct ScanArgs {
    /// The unit whose sources are scanned.
    pub unit: String,

    /// Scan the testbench sources with the testbench include path.
    #[arg(long)]
    pub tb: bool,

    /// Bypass the scan cache.
    #[arg(long)]
    pub no_cache: bool,
}

/// Output format for printed results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines.
    Text,
    /// A single JSON document.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Configure(ref args) => configure::run(args, &global),
        Command::Deps(ref args) => deps::run(args, &global),
        Command::Scan(ref args) => scan::run(args, &global),
        Command::DumpSource => dump::run(&global),
        Command::Check => check::run(&global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs a stderr subscriber. `RUST_LOG` wins over the flags.
fn init_tracing(quiet: bool, verbose: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
