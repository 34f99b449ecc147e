//! Tracing subscriber installation (SPEC_FULL.md §4.0).
//!
//! One call at process startup, env-filter syntax, default `info`. CLI
//! `--log-filter` and `REDLETTERS_LOG` both feed the same filter string;
//! the CLI flag wins (see `redletters_config::RedlettersConfig`).

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber writing to stderr. Safe to call
/// once per process; a second call is a no-op (subscriber already set).
pub fn init(filter: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).try_init();
}
