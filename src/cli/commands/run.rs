//! `run`: CLI wrapper around [`crate::pipeline::run`],
//! tracked as one job in the engine so `job status`/`job list` can observe
//! a run in progress and its terminal receipt.

use std::path::Path;

use camino::Utf8PathBuf;
use chrono::Utc;

use redletters_config::RedlettersConfig;
use redletters_engine::types::{JobError, Progress};
use redletters_receipt::{Receipt, ReceiptTimestamps, RECEIPT_SCHEMA_VERSION};

use super::common::{
    default_confidence_strategy, default_translator, gate_ledger, installer, job_engine, parse_mode, print_json,
    spine_provider, variant_store,
};
use crate::cli::args::ModeArg;
use crate::error::RedlettersError;
use crate::pipeline::{self, RunOutcome, RunRequest};
use crate::workspace::JobWorkspace;

#[allow(clippy::too_many_arguments)]
pub fn run(
    config: &RedlettersConfig,
    reference: &str,
    session: &str,
    mode: ModeArg,
    out: &Path,
    force: bool,
    include_schemas: bool,
    no_validate: bool,
    json: bool,
) -> anyhow::Result<()> {
    let out_dir = Utf8PathBuf::from_path_buf(out.to_path_buf())
        .map_err(|p| anyhow::anyhow!("--out is not valid UTF-8: {}", p.display()))?;

    let inst = installer(config);
    let spine = spine_provider(&inst)?;
    let variants = variant_store(config)?;
    let gates = gate_ledger(config)?;
    let translator = default_translator();
    let confidence = default_confidence_strategy();
    let mut engine = job_engine(config)?;

    let job_id = format!("run-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default());
    let workspace = JobWorkspace::create(&config.workspace_root, &job_id)?;
    let config_json = serde_json::json!({ "reference": reference, "session": session, "out": out_dir.to_string() });
    let config_hash = redletters_utils::hash_canonical_json(&config_json).map_err(RedlettersError::from)?;
    engine.submit(&job_id, &config_json, &config_hash, workspace.root.as_str(), None).map_err(RedlettersError::from)?;
    let cancel_token = engine.claim(&job_id).map_err(RedlettersError::from)?;

    let request = RunRequest {
        reference: reference.to_string(),
        mode: parse_mode(mode),
        session_id: session.to_string(),
        lexicon_packs: Vec::new(),
        output_dir: out_dir.clone(),
        force,
        include_schemas,
        validate_outputs: !no_validate,
        spine: &spine,
        variant_store: &variants,
        gate_ledger: &gates,
        translator: &translator,
        confidence_strategy: &confidence,
        installer: &inst,
    };

    let outcome = pipeline::run(
        &request,
        |stage, percent| {
            let _ = engine.update_progress(
                &job_id,
                &Progress { percent, phase: Some(stage.to_string()), items_done: None, items_total: None },
            );
        },
        || cancel_token.is_cancelled(),
    );

    match outcome {
        Ok(RunOutcome::Completed(run_log)) => {
            let receipt = Receipt {
                schema_version: RECEIPT_SCHEMA_VERSION.to_string(),
                job_id: job_id.clone(),
                run_id: job_id.clone(),
                status: if run_log.success { "completed".to_string() } else { "completed_with_errors".to_string() },
                exit_code: Some(0),
                timestamps: ReceiptTimestamps {
                    created: run_log.started_at,
                    started: Some(run_log.started_at),
                    completed: Some(run_log.completed_at),
                },
                config_snapshot: config_json,
                source_pins: std::collections::BTreeMap::new(),
                inputs_summary: serde_json::json!({ "reference": run_log.reference }),
                outputs: run_log.files_created.clone(),
                error: None,
            };
            engine.complete_job(&job_id, &receipt, &workspace.receipt_path()).map_err(RedlettersError::from)?;

            if json {
                return print_json(&run_log);
            }
            println!("run_log written to {}/run_log.json (success={})", out_dir, run_log.success);
            if !run_log.success {
                anyhow::bail!("run completed with errors; see run_log.json");
            }
            Ok(())
        }
        Ok(RunOutcome::Blocked(gate)) => {
            engine
                .fail_job(
                    &job_id,
                    JobError {
                        code: "gate_pending".to_string(),
                        message: format!("{} pending acknowledgement(s)", gate.required_acks.len()),
                        details: serde_json::to_value(&gate).ok(),
                    },
                )
                .map_err(RedlettersError::from)?;
            if json {
                print_json(&gate)?;
            } else {
                println!("gate pending ({:?}): {} reading(s) need acknowledgement", gate.kind, gate.required_acks.len());
            }
            Err(RedlettersError::GateBlocked(gate.required_acks.len()).into())
        }
        Err(err) => {
            engine
                .fail_job(&job_id, JobError { code: "run_failed".to_string(), message: err.to_string(), details: None })
                .map_err(RedlettersError::from)?;
            Err(err.into())
        }
    }
}
