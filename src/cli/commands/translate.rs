//! `translate`.

use redletters_config::RedlettersConfig;
use redletters_orchestrator::{translate_passage, Response};

use super::common::{default_confidence_strategy, default_translator, gate_ledger, parse_mode, print_json, spine_provider, variant_store};
use super::common::installer;
use crate::cli::args::ModeArg;
use crate::error::RedlettersError;

pub fn translate(config: &RedlettersConfig, reference: &str, session: &str, mode: ModeArg, json: bool) -> anyhow::Result<()> {
    let inst = installer(config);
    let spine = spine_provider(&inst)?;
    let variants = variant_store(config)?;
    let gates = gate_ledger(config)?;
    let translator = default_translator();
    let confidence = default_confidence_strategy();

    let response = translate_passage(
        reference,
        parse_mode(mode),
        session,
        serde_json::Map::new(),
        &[],
        &spine,
        &variants,
        &gates,
        &translator,
        &confidence,
    )
    .map_err(RedlettersError::from)?;

    if json {
        return print_json(&response);
    }

    match &response {
        Response::Translation(t) => {
            println!("{}", t.combined_spine_text);
            println!("confidence: textual={:.2} grammatical={:.2} lexical={:.2} interpretive={:.2}",
                t.confidence.textual, t.confidence.grammatical, t.confidence.lexical, t.confidence.interpretive);
        }
        Response::Gate(gate) => {
            println!("gate pending ({:?}): {} reading(s) need acknowledgement for {}", gate.kind, gate.required_acks.len(), gate.reference);
            for verse_id in &gate.required_acks {
                println!("  redletters ack {session} {verse_id} <reading_index>");
            }
        }
    }
    Ok(())
}
