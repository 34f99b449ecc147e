//! Sqlite-backed acknowledgement ledger.
//!
//! Two tables: `variant_acks` unique on `(session_id, variant_ref)` so
//! `acknowledge_variant` is INSERT OR REPLACE, and `escalation_acks` unique
//! on `(session_id, to_mode)` for the same reason. Mirrors the persistence
//! shape used by `redletters-variants::store`.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use redletters_utils::VerseId;

use crate::types::{EscalationAck, SessionState, VariantAck};

#[derive(Debug, thiserror::Error)]
pub enum GateStoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid stored verse id: {0}")]
    InvalidVerseId(String),
    #[error("invalid stored timestamp: {0}")]
    InvalidTimestamp(i64),
}

pub struct GateLedger {
    conn: Connection,
}

impl GateLedger {
    pub fn open_in_memory() -> Result<Self, GateStoreError> {
        let conn = Connection::open_in_memory()?;
        let ledger = Self { conn };
        ledger.ensure_schema()?;
        Ok(ledger)
    }

    pub fn open(path: &std::path::Path) -> Result<Self, GateStoreError> {
        let conn = Connection::open(path)?;
        let ledger = Self { conn };
        ledger.ensure_schema()?;
        Ok(ledger)
    }

    fn ensure_schema(&self) -> Result<(), GateStoreError> {
        self.conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS variant_acks (
                id INTEGER PRIMARY KEY,
                session_id TEXT NOT NULL,
                variant_ref TEXT NOT NULL,
                reading_chosen INTEGER NOT NULL,
                ts INTEGER NOT NULL,
                context TEXT NOT NULL,
                UNIQUE(session_id, variant_ref)
            );

            CREATE TABLE IF NOT EXISTS escalation_acks (
                id INTEGER PRIMARY KEY,
                session_id TEXT NOT NULL,
                from_mode TEXT NOT NULL,
                to_mode TEXT NOT NULL,
                ts INTEGER NOT NULL,
                UNIQUE(session_id, to_mode)
            );

            CREATE INDEX IF NOT EXISTS idx_variant_acks_session ON variant_acks(session_id);
            CREATE INDEX IF NOT EXISTS idx_escalation_acks_session ON escalation_acks(session_id);
            ",
        )?;
        Ok(())
    }

    /// `acknowledge_variant(session, variant_ref, reading_index, context)`
    /// — INSERT OR REPLACE on `(session, variant_ref)`.
    pub fn acknowledge_variant(
        &self,
        session_id: &str,
        variant_ref: &VerseId,
        reading_chosen: usize,
        context: &str,
    ) -> Result<(), GateStoreError> {
        self.conn.execute(
            "INSERT INTO variant_acks (session_id, variant_ref, reading_chosen, ts, context)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(session_id, variant_ref) DO UPDATE SET
               reading_chosen = excluded.reading_chosen,
               ts = excluded.ts,
               context = excluded.context",
            params![session_id, variant_ref.to_string(), reading_chosen as i64, Utc::now().timestamp(), context],
        )?;
        Ok(())
    }

    pub fn acknowledge_escalation(
        &self,
        session_id: &str,
        from_mode: &str,
        to_mode: &str,
    ) -> Result<(), GateStoreError> {
        self.conn.execute(
            "INSERT INTO escalation_acks (session_id, from_mode, to_mode, ts)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(session_id, to_mode) DO UPDATE SET
               from_mode = excluded.from_mode,
               ts = excluded.ts",
            params![session_id, from_mode, to_mode, Utc::now().timestamp()],
        )?;
        Ok(())
    }

    /// `load_session_state(session) -> { acked_variants, escalations }`
    ///, used directly by the orchestrator's gate check.
    pub fn load_session_state(&self, session_id: &str) -> Result<SessionState, GateStoreError> {
        let mut state = SessionState::default();

        let mut stmt = self
            .conn
            .prepare("SELECT variant_ref, reading_chosen FROM variant_acks WHERE session_id = ?1")?;
        let rows: Vec<(String, i64)> = stmt
            .query_map(params![session_id], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<_, _>>()?;
        for (variant_ref, reading_chosen) in rows {
            let verse_id: VerseId = variant_ref
                .parse()
                .map_err(|_| GateStoreError::InvalidVerseId(variant_ref))?;
            state.acked_variants.insert(verse_id, reading_chosen as usize);
        }

        let mut stmt = self
            .conn
            .prepare("SELECT to_mode, ts FROM escalation_acks WHERE session_id = ?1")?;
        let rows: Vec<(String, i64)> = stmt
            .query_map(params![session_id], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<_, _>>()?;
        for (to_mode, ts) in rows {
            state.escalations.insert(to_mode, timestamp_from_unix(ts)?);
        }

        Ok(state)
    }

    /// `get_session_acks(session) -> map`: the variant side
    /// of [`load_session_state`] alone.
    pub fn get_session_acks(
        &self,
        session_id: &str,
    ) -> Result<std::collections::HashMap<VerseId, usize>, GateStoreError> {
        Ok(self.load_session_state(session_id)?.acked_variants)
    }

    pub fn list_variant_acks(&self, session_id: &str) -> Result<Vec<VariantAck>, GateStoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT session_id, variant_ref, reading_chosen, ts, context FROM variant_acks WHERE session_id = ?1 ORDER BY ts ASC",
        )?;
        let rows: Vec<(String, String, i64, i64, String)> = stmt
            .query_map(params![session_id], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?))
            })?
            .collect::<Result<_, _>>()?;
        rows.into_iter()
            .map(|(session_id, variant_ref, reading_chosen, ts, context)| {
                Ok(VariantAck {
                    session_id,
                    variant_ref: variant_ref
                        .parse()
                        .map_err(|_| GateStoreError::InvalidVerseId(variant_ref.clone()))?,
                    reading_chosen: reading_chosen as usize,
                    ts: timestamp_from_unix(ts)?,
                    context,
                })
            })
            .collect()
    }

    pub fn list_escalation_acks(&self, session_id: &str) -> Result<Vec<EscalationAck>, GateStoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT session_id, from_mode, to_mode, ts FROM escalation_acks WHERE session_id = ?1 ORDER BY ts ASC",
        )?;
        let rows: Vec<(String, String, String, i64)> = stmt
            .query_map(params![session_id], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))?
            .collect::<Result<_, _>>()?;
        rows.into_iter()
            .map(|(session_id, from_mode, to_mode, ts)| {
                Ok(EscalationAck { session_id, from_mode, to_mode, ts: timestamp_from_unix(ts)? })
            })
            .collect()
    }

    /// Direct `(session, variant_ref)` lookup, used by the orchestrator
    /// when it only needs a single variant's ack state.
    pub fn is_variant_acked(&self, session_id: &str, variant_ref: &VerseId) -> Result<bool, GateStoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT 1 FROM variant_acks WHERE session_id = ?1 AND variant_ref = ?2",
                params![session_id, variant_ref.to_string()],
                |_| Ok(()),
            )
            .optional()?
            .is_some())
    }
}

fn timestamp_from_unix(ts: i64) -> Result<DateTime<Utc>, GateStoreError> {
    Utc.timestamp_opt(ts, 0).single().ok_or(GateStoreError::InvalidTimestamp(ts))
}
