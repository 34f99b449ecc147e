//! Shared command-handler plumbing: opening the sqlite-backed stores and
//! the installed spine under the resolved config's `data_root`.

use camino::Utf8PathBuf;

use redletters_catalog::Installer;
use redletters_config::RedlettersConfig;
use redletters_engine::JobEngine;
use redletters_gate::GateLedger;
use redletters_orchestrator::{Confidence, FixedConfidenceStrategy, FixtureTranslator};
use redletters_spine::{InstalledSpineProvider, SpineError};
use redletters_utils::PackId;
use redletters_variants::VariantStore;

use crate::error::RedlettersError;

/// The pack this binary treats as the translation spine; installed-pack verse text is expected at
/// `<install_path>/verses.jsonl`.
pub const SPINE_PACK_ID: &str = "sblgnt";
const SPINE_VERSES_FILE: &str = "verses.jsonl";

pub fn ensure_data_root(config: &RedlettersConfig) -> std::io::Result<()> {
    std::fs::create_dir_all(config.data_root.as_std_path())
}

pub fn installer(config: &RedlettersConfig) -> Installer {
    Installer::new(crate::catalog_seed::seed_catalog(), config.data_root.clone())
}

pub fn variant_store_path(config: &RedlettersConfig) -> Utf8PathBuf {
    config.data_root.join("variants.sqlite3")
}

pub fn variant_store(config: &RedlettersConfig) -> Result<VariantStore, RedlettersError> {
    ensure_data_root(config)?;
    Ok(VariantStore::open(variant_store_path(config).as_std_path())?)
}

pub fn gate_ledger_path(config: &RedlettersConfig) -> Utf8PathBuf {
    config.data_root.join("gate.sqlite3")
}

pub fn gate_ledger(config: &RedlettersConfig) -> Result<GateLedger, RedlettersError> {
    ensure_data_root(config)?;
    Ok(GateLedger::open(gate_ledger_path(config).as_std_path())?)
}

pub fn job_engine_path(config: &RedlettersConfig) -> Utf8PathBuf {
    config.data_root.join("engine.sqlite3")
}

pub fn job_engine(config: &RedlettersConfig) -> Result<JobEngine, RedlettersError> {
    ensure_data_root(config)?;
    Ok(JobEngine::open(job_engine_path(config).as_std_path())?)
}

/// Load the installed spine's verse text off disk. Returns
/// [`SpineError::NotInstalled`] (with install instructions baked into its
/// message) when the pack hasn't been installed from a `Local` source,
/// since `Installer::install` has no transport for `Git`/`Zip` sources.
pub fn spine_provider(installer: &Installer) -> Result<InstalledSpineProvider, RedlettersError> {
    let pack_id = PackId::from(SPINE_PACK_ID);
    let verses_path = installer.install_path(&pack_id).join(SPINE_VERSES_FILE);
    if !verses_path.exists() {
        return Err(RedlettersError::Spine(SpineError::NotInstalled { pack_id: SPINE_PACK_ID.to_string() }));
    }
    Ok(InstalledSpineProvider::load(SPINE_PACK_ID, verses_path.as_std_path())?)
}

/// Default translator/confidence plug-ins for the CLI. Translation
/// generation itself is a pluggable seam (the `Translator` trait); the
/// binary ships a baseline descriptive-claim translator so `translate`/
/// `run` are usable without wiring an external model.
pub fn default_translator() -> FixtureTranslator {
    FixtureTranslator::new(vec![0])
}

pub fn default_confidence_strategy() -> FixedConfidenceStrategy {
    FixedConfidenceStrategy(Confidence { textual: 0.9, grammatical: 0.9, lexical: 0.9, interpretive: 0.7 })
}

pub fn parse_mode(mode: crate::cli::args::ModeArg) -> redletters_orchestrator::Mode {
    match mode {
        crate::cli::args::ModeArg::Readable => redletters_orchestrator::Mode::Readable,
        crate::cli::args::ModeArg::Traceable => redletters_orchestrator::Mode::Traceable,
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
