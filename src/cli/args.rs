//! CLI argument definitions (clap derive), SPEC_FULL.md §4.0e.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// redletters - reproducible scholarly-translation pipeline
#[derive(Parser)]
#[command(name = "redletters")]
#[command(about = "Variant aggregation, gated acknowledgement, and hash-verified scholarly output")]
#[command(long_about = r#"
redletters installs critical-apparatus source packs, aggregates textual
variants against a spine, gates translation on explicit acknowledgement of
significant readings, and produces hash-verified, schema-versioned output
bundles suitable for citation.

EXAMPLES:
  # Install a source pack
  redletters source install na28 --accept-eula

  # Generate a lockfile pinning the installed pack set
  redletters lock generate

  # Translate a passage (may return a pending-acknowledgement gate)
  redletters translate "John 1:18" --session scholar-1

  # Acknowledge a pending variant reading
  redletters ack scholar-1 John.1.18 0

  # Run the full scholarly pipeline for a passage
  redletters run "John 1:18" --session scholar-1 --out ./output

  # Verify a produced bundle
  redletters bundle verify ./output/bundle

CONFIGURATION:
  Configuration is loaded with precedence: defaults < user config
  (~/.redletters/config.toml) < project config (.redletters.toml,
  nearest ancestor) < environment variables < CLI flags.
"#)]
#[command(version)]
pub struct Cli {
    /// Override the data root (default: ~/.redletters/data)
    #[arg(long, global = true)]
    pub data_root: Option<PathBuf>,

    /// Override the workspace root (default: ~/.redletters/workspaces)
    #[arg(long, global = true)]
    pub workspace_root: Option<PathBuf>,

    /// tracing env-filter string (default: info); overrides REDLETTERS_LOG
    #[arg(long, global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum SourceCommands {
    /// Install a source pack from the catalog
    Install {
        pack_id: String,
        /// Accept the pack's EULA, required for non-permissive licenses
        #[arg(long)]
        accept_eula: bool,
        /// Reinstall even if already installed
        #[arg(long)]
        force: bool,
    },
    /// Remove an installed source pack
    Uninstall { pack_id: String },
    /// Show installed-pack status
    Status {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum LockCommands {
    /// Write lockfile.json from the currently installed pack set
    Generate {
        #[arg(long, default_value = "lockfile.json")]
        out: PathBuf,
    },
    /// Verify a lockfile against the installed pack set
    Verify {
        #[arg(long, default_value = "lockfile.json")]
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Reinstall/remove packs so the installed set matches a lockfile
    Sync {
        #[arg(long, default_value = "lockfile.json")]
        path: PathBuf,
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum JobCommands {
    /// Show a job's current state
    Status { job_id: String },
    /// Request cooperative cancellation of a running job
    Cancel { job_id: String },
    /// List all known jobs
    List {
        #[arg(long)]
        json: bool,
    },
}

/// Translation mode: `readable` (reader-facing, escalates on strong
/// claims) or `traceable`.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ModeArg {
    Readable,
    Traceable,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install/uninstall/inspect source packs
    Source {
        #[command(subcommand)]
        command: SourceCommands,
    },
    /// Generate/verify/sync the pack lockfile
    Lock {
        #[command(subcommand)]
        command: LockCommands,
    },
    /// Translate a passage, returning a translation or a pending gate
    Translate {
        reference: String,
        #[arg(long, default_value = "scholar")]
        session: String,
        #[arg(long, value_enum, default_value = "readable")]
        mode: ModeArg,
        #[arg(long)]
        json: bool,
    },
    /// Acknowledge a pending variant reading for a session
    Ack {
        session: String,
        #[arg(value_name = "REF")]
        reference: String,
        #[arg(value_name = "READING_INDEX")]
        reading_index: usize,
    },
    /// Background job engine introspection
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Run the full scholarly pipeline for a passage
    Run {
        reference: String,
        #[arg(long, default_value = "scholar")]
        session: String,
        #[arg(long, value_enum, default_value = "readable")]
        mode: ModeArg,
        #[arg(long, default_value = "output")]
        out: PathBuf,
        /// Bypass pending gate acknowledgements, recording a forced-
        /// responsibility note in run_log.json
        #[arg(long)]
        force: bool,
        /// Copy JSON Schema documents into the produced bundle
        #[arg(long)]
        include_schemas: bool,
        /// Skip running the output validator over produced artifacts
        #[arg(long)]
        no_validate: bool,
        #[arg(long)]
        json: bool,
    },
    /// Verify a produced bundle's hashes and manifest
    Bundle {
        #[command(subcommand)]
        command: BundleCommands,
    },
    /// Diagnose configuration and environment
    Doctor {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum BundleCommands {
    Verify {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
}
