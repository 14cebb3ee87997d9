//! Command-line interface: argument parsing with clap.
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI entry point for the configuration backup engine.
#[derive(Parser, Debug)]
#[command(
    name = "myconfig",
    about = "Detect, back up and restore developer configuration",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options accepted by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// List what would be processed, without copying anything
    #[arg(long, global = true)]
    pub preview: bool,

    /// Show every action without writing anything
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Restore even if the backup fails verification
    #[arg(long, global = true)]
    pub force: bool,

    /// Configuration file (default: $XDG_CONFIG_HOME/myconfig/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Worker threads for per-component work (default: from config, then CPU count)
    #[arg(short, long, global = true)]
    pub jobs: Option<usize>,

    /// Process components one at a time (parallel is enabled by default)
    #[arg(long = "no-parallel", global = true, action = clap::ArgAction::SetFalse)]
    pub parallel: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Detect components and back up their configuration
    Export(ExportOpts),
    /// Restore a backup, preserving anything it would overwrite
    Restore(RestoreOpts),
    /// Detect components and report what was found
    Scan,
    /// Check a backup against its manifest
    Verify(VerifyOpts),
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the per-command log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Export(_) => "export",
            Self::Restore(_) => "restore",
            Self::Scan => "scan",
            Self::Verify(_) => "verify",
            Self::Version => "version",
        }
    }
}

/// Options for the `export` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ExportOpts {
    /// Backup directory (default: `<backup_root>/<host>-<timestamp>`)
    pub outdir: Option<PathBuf>,
}

/// Options for the `restore` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct RestoreOpts {
    /// Backup directory to restore from
    pub backup: PathBuf,

    /// Restore only these components
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Feed saved command output (Brewfile, defaults domains, pip
    /// requirements) back to the tool that produced it
    #[arg(long)]
    pub replay: bool,
}

/// Options for the `verify` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct VerifyOpts {
    /// Backup directory to verify
    pub backup: PathBuf,
}
