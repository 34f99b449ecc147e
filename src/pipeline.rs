//! Scholarly run orchestrator.
//!
//! Wires C2-C13 into the fixed stage sequence `lockfile, gates_check,
//! translate, export_apparatus, export_translation, export_citations,
//! export_quote, export_dossier, snapshot, bundle, finalize`: saves a
//! lockfile, checks gates, translates, writes all five payload artifacts
//! (apparatus/translation/citations/quote/dossier per SPEC_FULL.md's C10
//! row), snapshots, bundles, and writes a `run_log.json`. A progress
//! callback fires with a monotonic percent at each stage label; a
//! cancellation check runs between every stage.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;

use redletters_catalog::Installer;
use redletters_gate::GateLedger;
use redletters_orchestrator::{
    translate_passage, ConfidenceStrategy, GateResponse, Mode, Response, Translator,
};
use redletters_receipt::Artifact;
use redletters_spine::SpineProvider;
use redletters_variants::VariantStore;

use crate::error::RedlettersError;
use crate::run_log::{GateDisposition, RunLog};

/// Fixed stage labels, in pipeline order.
pub const STAGES: &[&str] = &[
    "lockfile",
    "gates_check",
    "translate",
    "export_apparatus",
    "export_translation",
    "export_citations",
    "export_quote",
    "export_dossier",
    "snapshot",
    "bundle",
    "finalize",
];

/// Inputs a scholarly run needs beyond the reference string itself.
pub struct RunRequest<'a> {
    pub reference: String,
    pub mode: Mode,
    pub session_id: String,
    pub lexicon_packs: Vec<String>,
    pub output_dir: Utf8PathBuf,
    pub force: bool,
    pub include_schemas: bool,
    pub validate_outputs: bool,
    pub spine: &'a dyn SpineProvider,
    pub variant_store: &'a VariantStore,
    pub gate_ledger: &'a GateLedger,
    pub translator: &'a dyn Translator,
    pub confidence_strategy: &'a dyn ConfidenceStrategy,
    pub installer: &'a Installer,
}

/// Outcome of a run: either the completed `RunLog`, or the blocked gate
/// response when `force` was false and acknowledgements are still
/// pending.
pub enum RunOutcome {
    Completed(RunLog),
    Blocked(GateResponse),
}

/// `progress(stage_label, percent)`; `cancelled()` polled between stages.
#[allow(clippy::too_many_arguments)]
pub fn run(
    request: &RunRequest<'_>,
    mut progress: impl FnMut(&str, f64),
    mut cancelled: impl FnMut() -> bool,
) -> Result<RunOutcome, RedlettersError> {
    let started_at = Utc::now();
    let stage_count = STAGES.len() as f64;
    let mut stage_index = 0usize;
    let mut files_created: Vec<Artifact> = Vec::new();
    let mut errors: Vec<String> = Vec::new();

    let mut fire = |label: &str| {
        stage_index += 1;
        progress(label, (stage_index as f64 / stage_count) * 100.0);
    };
    let check_cancel = |cancelled: &mut dyn FnMut() -> bool| -> Result<(), RedlettersError> {
        if cancelled() {
            Err(RedlettersError::UserInput("run cancelled".to_string()))
        } else {
            Ok(())
        }
    };

    std::fs::create_dir_all(request.output_dir.as_std_path())?;

    // Stage: lockfile.
    fire("lockfile");
    let manifest = request.installer.manifest()?;
    let lockfile = redletters_lock::LockfileGenerator::generate(&manifest)?;
    let lockfile_path = request.output_dir.join("lockfile.json");
    lockfile.save(&lockfile_path)?;
    check_cancel(&mut cancelled)?;

    // Stage: gates_check + translate.
    fire("gates_check");
    check_cancel(&mut cancelled)?;
    fire("translate");
    let mut response = translate_passage(
        &request.reference,
        request.mode,
        &request.session_id,
        serde_json::Map::new(),
        &request.lexicon_packs,
        request.spine,
        request.variant_store,
        request.gate_ledger,
        request.translator,
        request.confidence_strategy,
    )?;

    let mut gate_disposition = GateDisposition::clean(Vec::new());

    if let Response::Gate(gate) = &response {
        if !request.force {
            return Ok(RunOutcome::Blocked(gate.clone()));
        }

        // `--force`: acknowledge every pending reading under an explicit
        // forced-responsibility note, then re-run once.
        let responsibility =
            format!("forced by --force at {}: bypassing {} pending acknowledgement(s)", Utc::now(), gate.required_acks.len());
        for verse_id in &gate.required_acks {
            request.gate_ledger.acknowledge_variant(&request.session_id, verse_id, 0, &responsibility)?;
        }
        gate_disposition = GateDisposition::forced(
            gate.required_acks.iter().map(std::string::ToString::to_string).collect(),
            Vec::new(),
            responsibility,
        );

        response = translate_passage(
            &request.reference,
            request.mode,
            &request.session_id,
            serde_json::Map::new(),
            &request.lexicon_packs,
            request.spine,
            request.variant_store,
            request.gate_ledger,
            request.translator,
            request.confidence_strategy,
        )?;
    }

    let translation = match &response {
        Response::Translation(t) => t.clone(),
        Response::Gate(gate) => {
            // Escalation gate (readable-mode claim too strong) survives a
            // forced variant-ack retry; still a block, not an error.
            return Ok(RunOutcome::Blocked(gate.clone()));
        }
    };
    if gate_disposition.gates_satisfied.is_empty() {
        gate_disposition.gates_satisfied = translation.receipts.gates_satisfied.clone();
    }
    check_cancel(&mut cancelled)?;

    // Stage: export_apparatus.
    fire("export_apparatus");
    let apparatus_path = request.output_dir.join("apparatus.jsonl");
    files_created.push(redletters_export::write_apparatus(&apparatus_path, &translation.verses)?);
    check_cancel(&mut cancelled)?;

    // Stage: export_translation.
    fire("export_translation");
    let translation_path = request.output_dir.join("translation.jsonl");
    files_created.push(redletters_export::write_translation(&translation_path, &translation)?);
    check_cancel(&mut cancelled)?;

    // Stage: export_citations.
    fire("export_citations");
    let citations_path = request.output_dir.join("citations.json");
    let installed_packs: Vec<_> = manifest.packs.values().cloned().collect();
    files_created.push(redletters_export::write_citations(&citations_path, &installed_packs)?);
    check_cancel(&mut cancelled)?;

    // Stage: export_quote.
    fire("export_quote");
    let quote_path = request.output_dir.join("quote.json");
    files_created.push(redletters_export::write_quote(&quote_path, &response, request.mode)?);
    check_cancel(&mut cancelled)?;

    // Stage: export_dossier.
    fire("export_dossier");
    let dossier_path = request.output_dir.join("dossier.json");
    let (_dossier, dossier_artifact) = redletters_export::write_dossier(
        &dossier_path,
        &request.reference,
        &translation.reference,
        &translation.provenance.spine_source,
        &translation.verses,
        &request.session_id,
    )?;
    files_created.push(dossier_artifact);
    check_cancel(&mut cancelled)?;

    // Stage: snapshot.
    fire("snapshot");
    let snapshot_path = request.output_dir.join("snapshot.json");
    let export_file_refs: Vec<&Utf8Path> = vec![
        apparatus_path.as_path(),
        translation_path.as_path(),
        citations_path.as_path(),
        quote_path.as_path(),
        dossier_path.as_path(),
    ];
    let schema_versions = std::collections::BTreeMap::from([
        ("apparatus".to_string(), "1.0.0".to_string()),
        ("translation".to_string(), "1.0.0".to_string()),
        ("citations".to_string(), "1.0.0".to_string()),
        ("quote".to_string(), "1.0.0".to_string()),
        ("dossier".to_string(), "1.0.0".to_string()),
    ]);
    let snapshot =
        redletters_snapshot::generate(&export_file_refs, &manifest, schema_versions, lockfile.lockfile_hash.clone())?;
    snapshot.save(&snapshot_path)?;
    check_cancel(&mut cancelled)?;

    // Stage: bundle.
    fire("bundle");
    let bundle_dir = request.output_dir.join("bundle");
    let bundle_options = redletters_bundle::BundleOptions {
        include_schemas: request.include_schemas,
        schema_dir: None,
        zip: false,
        notes: String::new(),
    };
    let input_paths = vec![
        apparatus_path.clone(),
        translation_path.clone(),
        citations_path.clone(),
        quote_path.clone(),
        dossier_path.clone(),
    ];
    redletters_bundle::produce(&bundle_dir, &lockfile_path, &snapshot_path, &input_paths, &bundle_options)?;
    let verify_result = redletters_bundle::verify(&bundle_dir)?;
    if !verify_result.valid {
        for failure in &verify_result.failures {
            errors.push(format!("{failure:?}"));
        }
    }
    check_cancel(&mut cancelled)?;

    // Stage: finalize.
    fire("finalize");
    let mut validation_outcomes = Vec::new();
    if request.validate_outputs {
        for path in [&apparatus_path, &translation_path, &citations_path, &quote_path, &dossier_path, &snapshot_path] {
            let result = redletters_validate::validate_output(path, None);
            if !result.valid {
                errors.push(format!("{path}: {} error(s)", result.errors.len()));
            }
            validation_outcomes.push(result);
        }
    }

    let completed_at = Utc::now();
    let verse_ids: Vec<String> = translation.verses.iter().map(|v| v.verse_id.to_string()).collect();
    let packs: Vec<String> = installed_packs.iter().map(|p| p.pack.pack_id.to_string()).collect();
    let success = errors.is_empty();

    let run_log = RunLog::new(
        "run".to_string(),
        started_at,
        completed_at,
        request.reference.clone(),
        verse_ids,
        packs,
        files_created,
        validation_outcomes,
        gate_disposition,
        success,
        errors,
    );

    let run_log_path = request.output_dir.join("run_log.json");
    let run_log_bytes = redletters_utils::canonical_json(&run_log)?;
    redletters_utils::atomic_write::write_file_atomic(&run_log_path, &run_log_bytes)?;

    Ok(RunOutcome::Completed(run_log))
}
