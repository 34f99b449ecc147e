//! CLI entry point and dispatch.
//!
//! Parses arguments, discovers layered configuration, installs the
//! tracing subscriber, and dispatches to the `commands::*` handlers. All
//! output, including error reporting, happens here; `main.rs` only maps
//! the returned exit code to a process exit.

use clap::Parser;

use redletters_config::{CliOverrides, RedlettersConfig};
use redletters_utils::error::{ExitCode, UserFriendlyError};

use super::args::{BundleCommands, Cli, Commands, JobCommands, LockCommands, SourceCommands};
use super::commands;
use crate::error::RedlettersError;

pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        data_root: cli.data_root.as_ref().and_then(|p| camino::Utf8PathBuf::from_path_buf(p.clone()).ok()),
        workspace_root: cli.workspace_root.as_ref().and_then(|p| camino::Utf8PathBuf::from_path_buf(p.clone()).ok()),
        integrity_size_threshold: None,
        integrity_timeout_secs: None,
        log_filter: cli.log_filter.clone(),
    };

    let config = match RedlettersConfig::discover(&overrides) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("✗ failed to load configuration: {err}");
            return Err(ExitCode::INTERNAL);
        }
    };

    crate::logging::init(&config.log_filter);

    let result = dispatch(&cli, &config);

    if let Err(error) = result {
        if let Some(rl_error) = error.downcast_ref::<RedlettersError>() {
            eprintln!("✗ {}", rl_error.user_message());
            if let Some(context) = rl_error.context() {
                eprintln!("  {context}");
            }
            for suggestion in rl_error.suggestions() {
                eprintln!("  - {suggestion}");
            }
            return Err(rl_error.exit_code());
        }
        eprintln!("✗ {error}");
        return Err(ExitCode::INTERNAL);
    }

    Ok(())
}

fn dispatch(cli: &Cli, config: &RedlettersConfig) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Source { command } => match command {
            SourceCommands::Install { pack_id, accept_eula, force } => {
                commands::source::install(config, pack_id, *accept_eula, *force)
            }
            SourceCommands::Uninstall { pack_id } => commands::source::uninstall(config, pack_id),
            SourceCommands::Status { json } => commands::source::status(config, *json),
        },
        Commands::Lock { command } => match command {
            LockCommands::Generate { out } => commands::lock::generate(config, out),
            LockCommands::Verify { path, json } => commands::lock::verify(config, path, *json),
            LockCommands::Sync { path, force } => commands::lock::sync(config, path, *force),
        },
        Commands::Translate { reference, session, mode, json } => {
            commands::translate::translate(config, reference, session, *mode, *json)
        }
        Commands::Ack { session, reference, reading_index } => {
            commands::ack::ack(config, session, reference, *reading_index)
        }
        Commands::Job { command } => match command {
            JobCommands::Status { job_id } => commands::job::status(config, job_id),
            JobCommands::Cancel { job_id } => commands::job::cancel(config, job_id),
            JobCommands::List { json } => commands::job::list(config, *json),
        },
        Commands::Run { reference, session, mode, out, force, include_schemas, no_validate, json } => {
            commands::run::run(config, reference, session, *mode, out, *force, *include_schemas, *no_validate, *json)
        }
        Commands::Bundle { command } => match command {
            BundleCommands::Verify { path, json } => commands::bundle::verify(path, *json),
        },
        Commands::Doctor { json } => commands::doctor::doctor(config, *json),
    }
}
