//! Command-line interface (SPEC_FULL.md §4.0e).
//!
//! - `args`: clap argument/subcommand definitions
//! - `commands`: one module per subcommand group, doing the actual work
//! - `run`: parses args, discovers config, installs logging, dispatches

pub mod args;
pub mod commands;
mod run;

pub use run::run;
