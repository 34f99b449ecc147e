//! Layered configuration discovery.
//!
//! Precedence, lowest to highest: built-in defaults → user config
//! (`~/.redletters/config.toml`) → project config (nearest-ancestor
//! `.redletters.toml`) → environment variables → explicit CLI overrides.
//! Each resolved field records which layer it came from.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Which layer a config value was ultimately resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    Defaults,
    UserFile,
    ProjectFile,
    Env,
    Cli,
}

/// CLI-supplied overrides. `None` means "not specified on the command line".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub data_root: Option<Utf8PathBuf>,
    pub workspace_root: Option<Utf8PathBuf>,
    pub integrity_size_threshold: Option<u64>,
    pub integrity_timeout_secs: Option<u64>,
    pub log_filter: Option<String>,
}

/// On-disk TOML shape for `config.toml` / `.redletters.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct TomlConfig {
    data_root: Option<String>,
    workspace_root: Option<String>,
    integrity_size_threshold: Option<u64>,
    integrity_timeout_secs: Option<u64>,
    log_filter: Option<String>,
}

/// Resolved, effective configuration plus attribution of where each field
/// came from, for `redletters doctor`-style introspection.
#[derive(Debug, Clone)]
pub struct RedlettersConfig {
    pub data_root: Utf8PathBuf,
    pub workspace_root: Utf8PathBuf,
    pub integrity_size_threshold: u64,
    pub integrity_timeout_secs: u64,
    pub log_filter: String,
    pub sources: HashMap<&'static str, ConfigSource>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("could not determine home directory for default data root")]
    NoHomeDir,
}

const DEFAULT_INTEGRITY_SIZE_THRESHOLD: u64 = 50 * 1024 * 1024;
const DEFAULT_INTEGRITY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LOG_FILTER: &str = "info";
const PROJECT_CONFIG_FILE: &str = ".redletters.toml";

impl RedlettersConfig {
    /// Discover configuration starting from the current working directory.
    pub fn discover(cli: &CliOverrides) -> Result<Self, ConfigError> {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::discover_from(&cwd, cli)
    }

    /// Path-driven variant used by tests to avoid depending on process CWD.
    pub fn discover_from(start_dir: &Path, cli: &CliOverrides) -> Result<Self, ConfigError> {
        let mut sources = HashMap::new();

        let home = dirs::home_dir();
        let mut data_root = home
            .as_ref()
            .map(|h| Utf8PathBuf::from_path_buf(h.join(".redletters").join("data")).unwrap_or_default())
            .ok_or(ConfigError::NoHomeDir)?;
        let mut workspace_root = home
            .as_ref()
            .map(|h| Utf8PathBuf::from_path_buf(h.join(".redletters").join("workspaces")).unwrap_or_default())
            .ok_or(ConfigError::NoHomeDir)?;
        let mut integrity_size_threshold = DEFAULT_INTEGRITY_SIZE_THRESHOLD;
        let mut integrity_timeout_secs = DEFAULT_INTEGRITY_TIMEOUT_SECS;
        let mut log_filter = DEFAULT_LOG_FILTER.to_string();

        sources.insert("data_root", ConfigSource::Defaults);
        sources.insert("workspace_root", ConfigSource::Defaults);
        sources.insert("integrity_size_threshold", ConfigSource::Defaults);
        sources.insert("integrity_timeout_secs", ConfigSource::Defaults);
        sources.insert("log_filter", ConfigSource::Defaults);

        if let Some(home) = &home {
            let user_file = home.join(".redletters").join("config.toml");
            if let Some(toml_cfg) = load_toml(&user_file)? {
                apply_toml(
                    &toml_cfg,
                    ConfigSource::UserFile,
                    &mut data_root,
                    &mut workspace_root,
                    &mut integrity_size_threshold,
                    &mut integrity_timeout_secs,
                    &mut log_filter,
                    &mut sources,
                );
            }
        }

        if let Some(project_file) = discover_upward(start_dir, PROJECT_CONFIG_FILE) {
            if let Some(toml_cfg) = load_toml(&project_file)? {
                apply_toml(
                    &toml_cfg,
                    ConfigSource::ProjectFile,
                    &mut data_root,
                    &mut workspace_root,
                    &mut integrity_size_threshold,
                    &mut integrity_timeout_secs,
                    &mut log_filter,
                    &mut sources,
                );
            }
        }

        if let Ok(v) = env::var("REDLETTERS_DATA_ROOT") {
            data_root = Utf8PathBuf::from(v);
            sources.insert("data_root", ConfigSource::Env);
        }
        if let Ok(v) = env::var("REDLETTERS_WORKSPACE_ROOT") {
            workspace_root = Utf8PathBuf::from(v);
            sources.insert("workspace_root", ConfigSource::Env);
        }
        if let Ok(v) = env::var("REDLETTERS_INTEGRITY_SIZE_THRESHOLD") {
            if let Ok(v) = v.parse() {
                integrity_size_threshold = v;
                sources.insert("integrity_size_threshold", ConfigSource::Env);
            }
        }
        if let Ok(v) = env::var("REDLETTERS_INTEGRITY_TIMEOUT") {
            if let Ok(v) = v.parse() {
                integrity_timeout_secs = v;
                sources.insert("integrity_timeout_secs", ConfigSource::Env);
            }
        }
        if let Ok(v) = env::var("REDLETTERS_LOG") {
            log_filter = v;
            sources.insert("log_filter", ConfigSource::Env);
        }

        if let Some(v) = &cli.data_root {
            data_root = v.clone();
            sources.insert("data_root", ConfigSource::Cli);
        }
        if let Some(v) = &cli.workspace_root {
            workspace_root = v.clone();
            sources.insert("workspace_root", ConfigSource::Cli);
        }
        if let Some(v) = cli.integrity_size_threshold {
            integrity_size_threshold = v;
            sources.insert("integrity_size_threshold", ConfigSource::Cli);
        }
        if let Some(v) = cli.integrity_timeout_secs {
            integrity_timeout_secs = v;
            sources.insert("integrity_timeout_secs", ConfigSource::Cli);
        }
        if let Some(v) = &cli.log_filter {
            log_filter = v.clone();
            sources.insert("log_filter", ConfigSource::Cli);
        }

        Ok(RedlettersConfig {
            data_root,
            workspace_root,
            integrity_size_threshold,
            integrity_timeout_secs,
            log_filter,
            sources,
        })
    }
}

fn load_toml(path: &Path) -> Result<Option<TomlConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let parsed: TomlConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    Ok(Some(parsed))
}

#[allow(clippy::too_many_arguments)]
fn apply_toml(
    cfg: &TomlConfig,
    source: ConfigSource,
    data_root: &mut Utf8PathBuf,
    workspace_root: &mut Utf8PathBuf,
    integrity_size_threshold: &mut u64,
    integrity_timeout_secs: &mut u64,
    log_filter: &mut String,
    sources: &mut HashMap<&'static str, ConfigSource>,
) {
    if let Some(v) = &cfg.data_root {
        *data_root = Utf8PathBuf::from(v);
        sources.insert("data_root", source);
    }
    if let Some(v) = &cfg.workspace_root {
        *workspace_root = Utf8PathBuf::from(v);
        sources.insert("workspace_root", source);
    }
    if let Some(v) = cfg.integrity_size_threshold {
        *integrity_size_threshold = v;
        sources.insert("integrity_size_threshold", source);
    }
    if let Some(v) = cfg.integrity_timeout_secs {
        *integrity_timeout_secs = v;
        sources.insert("integrity_timeout_secs", source);
    }
    if let Some(v) = &cfg.log_filter {
        *log_filter = v.clone();
        sources.insert("log_filter", source);
    }
}

/// Search upward from `start_dir` for `file_name`, first match wins.
fn discover_upward(start_dir: &Path, file_name: &str) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let candidate = current.join(file_name);
        if candidate.is_file() {
            return Some(candidate);
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_apply_when_nothing_overrides() {
        let dir = TempDir::new().unwrap();
        let cfg = RedlettersConfig::discover_from(dir.path(), &CliOverrides::default()).unwrap();
        assert_eq!(cfg.integrity_size_threshold, DEFAULT_INTEGRITY_SIZE_THRESHOLD);
        assert_eq!(cfg.sources["integrity_size_threshold"], ConfigSource::Defaults);
    }

    #[test]
    fn project_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "integrity_timeout_secs = 99\n",
        )
        .unwrap();

        let cfg = RedlettersConfig::discover_from(dir.path(), &CliOverrides::default()).unwrap();
        assert_eq!(cfg.integrity_timeout_secs, 99);
        assert_eq!(cfg.sources["integrity_timeout_secs"], ConfigSource::ProjectFile);
    }

    #[test]
    fn project_file_discovered_from_nested_subdirectory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(PROJECT_CONFIG_FILE), "log_filter = \"debug\"\n").unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let cfg = RedlettersConfig::discover_from(&nested, &CliOverrides::default()).unwrap();
        assert_eq!(cfg.log_filter, "debug");
    }

    #[test]
    fn cli_override_wins_over_everything() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "integrity_timeout_secs = 99\n",
        )
        .unwrap();

        let cli = CliOverrides {
            integrity_timeout_secs: Some(5),
            ..Default::default()
        };
        let cfg = RedlettersConfig::discover_from(dir.path(), &cli).unwrap();
        assert_eq!(cfg.integrity_timeout_secs, 5);
        assert_eq!(cfg.sources["integrity_timeout_secs"], ConfigSource::Cli);
    }
}
