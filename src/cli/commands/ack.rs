//! `ack`.

use redletters_config::RedlettersConfig;

use super::common::gate_ledger;
use crate::error::RedlettersError;

pub fn ack(config: &RedlettersConfig, session: &str, reference: &str, reading_index: usize) -> anyhow::Result<()> {
    let verse_id: redletters_utils::VerseId =
        reference.parse().map_err(|e| RedlettersError::UserInput(format!("{e}")))?;
    let ledger = gate_ledger(config)?;
    let context = format!("acknowledged via `redletters ack` by session {session}");
    ledger.acknowledge_variant(session, &verse_id, reading_index, &context).map_err(RedlettersError::from)?;
    println!("acknowledged reading {reading_index} for {verse_id} (session {session})");
    Ok(())
}
