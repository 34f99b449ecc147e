//! Durable job table and persist-before-send event log.
//!
//! Schema/persistence idiom mirrors `redletters-variants::store` and
//! `redletters-gate::store`: one `rusqlite::Connection`, schema created on
//! open, `thiserror` wrapping `rusqlite::Error`. The one thing unique to
//! this store is the sequence counter: every event insert first advances a
//! singleton row under the same transaction as the insert, so
//! `sequence_number` is gap-free by construction.

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::types::{Event, Job, JobError, JobState, JobTimestamps, Progress};

#[derive(Debug, thiserror::Error)]
pub enum EngineStoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("job not found: {0}")]
    JobNotFound(String),
    #[error("invalid stored timestamp: {0}")]
    InvalidTimestamp(i64),
    #[error("invalid stored job state: {0}")]
    InvalidState(String),
}

pub struct EngineStore {
    conn: Connection,
}

impl EngineStore {
    pub fn open_in_memory() -> Result<Self, EngineStoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn open(path: &std::path::Path) -> Result<Self, EngineStoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<(), EngineStoreError> {
        self.conn.execute_batch(
            r"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS sequence_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                last_sequence INTEGER NOT NULL
            );
            INSERT OR IGNORE INTO sequence_state (id, last_sequence) VALUES (1, 0);

            CREATE TABLE IF NOT EXISTS job_sequences (
                job_id TEXT PRIMARY KEY,
                last_job_sequence INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS jobs (
                job_id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                config_json TEXT NOT NULL,
                config_hash TEXT NOT NULL,
                workspace_path TEXT NOT NULL,
                idempotency_key TEXT,
                progress_percent REAL NOT NULL DEFAULT 0,
                progress_phase TEXT,
                progress_items_done INTEGER,
                progress_items_total INTEGER,
                error_code TEXT,
                error_message TEXT,
                error_details TEXT,
                receipt_json TEXT,
                receipt_hash TEXT,
                created_at INTEGER NOT NULL,
                queued_at INTEGER,
                started_at INTEGER,
                completed_at INTEGER,
                updated_at INTEGER NOT NULL,
                claim_attempts INTEGER NOT NULL DEFAULT 0,
                last_heartbeat_at INTEGER
            );

            CREATE TABLE IF NOT EXISTS events (
                row_id INTEGER PRIMARY KEY AUTOINCREMENT,
                sequence_number INTEGER NOT NULL UNIQUE,
                job_id TEXT,
                job_sequence INTEGER,
                event_type TEXT NOT NULL,
                timestamp_utc INTEGER NOT NULL,
                payload_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_events_sequence ON events(sequence_number);
            CREATE INDEX IF NOT EXISTS idx_events_job ON events(job_id, job_sequence);
            CREATE INDEX IF NOT EXISTS idx_jobs_state ON jobs(state);
            ",
        )?;
        Ok(())
    }

    /// Insert a new job in the `queued` state.
    pub fn create_job(
        &self,
        job_id: &str,
        config_json: &serde_json::Value,
        config_hash: &str,
        workspace_path: &str,
        idempotency_key: Option<&str>,
    ) -> Result<(), EngineStoreError> {
        let now = Utc::now().timestamp();
        self.conn.execute(
            "INSERT INTO jobs (job_id, state, config_json, config_hash, workspace_path, idempotency_key,
                                created_at, queued_at, updated_at, claim_attempts)
             VALUES (?1, 'queued', ?2, ?3, ?4, ?5, ?6, ?6, ?6, 0)",
            params![
                job_id,
                serde_json::to_string(config_json)?,
                config_hash,
                workspace_path,
                idempotency_key,
                now
            ],
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO job_sequences (job_id, last_job_sequence) VALUES (?1, 0)",
            params![job_id],
        )?;
        Ok(())
    }

    /// Atomic claim: `UPDATE ... WHERE state='queued' RETURNING job_id`.
    /// Whichever caller's `RETURNING` row is non-empty owns the job.
    pub fn claim_job(&self, job_id: &str) -> Result<bool, EngineStoreError> {
        let now = Utc::now().timestamp();
        let claimed: Option<String> = self
            .conn
            .query_row(
                "UPDATE jobs SET state='running', started_at=?2, updated_at=?2,
                    claim_attempts = claim_attempts + 1, last_heartbeat_at = ?2
                 WHERE job_id = ?1 AND state = 'queued'
                 RETURNING job_id",
                params![job_id, now],
                |r| r.get(0),
            )
            .optional()?;
        Ok(claimed.is_some())
    }

    /// Release a claim back to `queued`.
    pub fn release_claim(&self, job_id: &str) -> Result<(), EngineStoreError> {
        let now = Utc::now().timestamp();
        self.conn.execute(
            "UPDATE jobs SET state='queued', updated_at=?2 WHERE job_id = ?1 AND state IN ('running','cancelling')",
            params![job_id, now],
        )?;
        Ok(())
    }

    pub fn heartbeat(&self, job_id: &str) -> Result<(), EngineStoreError> {
        let now = Utc::now().timestamp();
        self.conn.execute(
            "UPDATE jobs SET last_heartbeat_at = ?2, updated_at = ?2 WHERE job_id = ?1",
            params![job_id, now],
        )?;
        Ok(())
    }

    pub fn update_progress(&self, job_id: &str, progress: &Progress) -> Result<(), EngineStoreError> {
        let now = Utc::now().timestamp();
        self.conn.execute(
            "UPDATE jobs SET progress_percent=?2, progress_phase=?3, progress_items_done=?4,
                progress_items_total=?5, updated_at=?6, last_heartbeat_at=?6
             WHERE job_id = ?1",
            params![
                job_id,
                progress.percent,
                progress.phase,
                progress.items_done.map(|v| v as i64),
                progress.items_total.map(|v| v as i64),
                now
            ],
        )?;
        Ok(())
    }

    pub fn set_state(&self, job_id: &str, state: JobState) -> Result<(), EngineStoreError> {
        let now = Utc::now().timestamp();
        let completed_at = matches!(state, JobState::Completed | JobState::Failed | JobState::Cancelled)
            .then_some(now);
        self.conn.execute(
            "UPDATE jobs SET state=?2, updated_at=?3, completed_at = COALESCE(?4, completed_at) WHERE job_id = ?1",
            params![job_id, state.as_str(), now, completed_at],
        )?;
        Ok(())
    }

    pub fn set_error(&self, job_id: &str, error: &JobError) -> Result<(), EngineStoreError> {
        self.conn.execute(
            "UPDATE jobs SET error_code=?2, error_message=?3, error_details=?4 WHERE job_id = ?1",
            params![
                job_id,
                error.code,
                error.message,
                error.details.as_ref().map(serde_json::to_string).transpose()?
            ],
        )?;
        Ok(())
    }

    pub fn set_receipt(&self, job_id: &str, receipt_json: &serde_json::Value, receipt_hash: &str) -> Result<(), EngineStoreError> {
        self.conn.execute(
            "UPDATE jobs SET receipt_json=?2, receipt_hash=?3 WHERE job_id = ?1",
            params![job_id, serde_json::to_string(receipt_json)?, receipt_hash],
        )?;
        Ok(())
    }

    pub fn get_job(&self, job_id: &str) -> Result<Job, EngineStoreError> {
        self.conn
            .query_row("SELECT * FROM jobs WHERE job_id = ?1", params![job_id], row_to_job)
            .optional()?
            .ok_or_else(|| EngineStoreError::JobNotFound(job_id.to_string()))
    }

    pub fn list_jobs(&self) -> Result<Vec<Job>, EngineStoreError> {
        let mut stmt = self.conn.prepare("SELECT * FROM jobs ORDER BY created_at ASC")?;
        let rows = stmt.query_map([], row_to_job)?;
        rows.collect::<Result<_, _>>().map_err(EngineStoreError::from)
    }

    /// Re-queue jobs whose `running` state has exceeded `timeout_secs`
    /// since the last heartbeat.
    pub fn reap_stale_claims(&self, timeout_secs: i64) -> Result<Vec<String>, EngineStoreError> {
        let cutoff = Utc::now().timestamp() - timeout_secs;
        let mut stmt = self.conn.prepare(
            "SELECT job_id FROM jobs WHERE state = 'running' AND (last_heartbeat_at IS NULL OR last_heartbeat_at < ?1)",
        )?;
        let stale: Vec<String> = stmt.query_map(params![cutoff], |r| r.get(0))?.collect::<Result<_, _>>()?;
        for job_id in &stale {
            self.release_claim(job_id)?;
        }
        Ok(stale)
    }

    /// On engine start: orphan jobs stuck `running`/`cancelling` from a
    /// prior process are failed with `E_ENGINE_CRASH`.
    pub fn recover_orphans(&self) -> Result<Vec<String>, EngineStoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT job_id FROM jobs WHERE state IN ('running', 'cancelling')")?;
        let orphans: Vec<String> = stmt.query_map([], |r| r.get(0))?.collect::<Result<_, _>>()?;
        for job_id in &orphans {
            self.set_state(job_id, JobState::Failed)?;
            self.set_error(
                job_id,
                &JobError {
                    code: "E_ENGINE_CRASH".to_string(),
                    message: "job was running when the engine last stopped; recovered as failed".to_string(),
                    details: None,
                },
            )?;
        }
        Ok(orphans)
    }

    /// Persist-before-send commit: advance the
    /// global sequence counter and, if job-scoped, the per-job counter,
    /// insert the event row, and return it. The caller (the broadcaster)
    /// only fans out after this returns, so no subscriber ever observes an
    /// event the store hasn't durably committed.
    pub fn commit_event(
        &mut self,
        job_id: Option<&str>,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<Event, EngineStoreError> {
        let tx = self.conn.transaction()?;

        let sequence_number: i64 = tx.query_row(
            "UPDATE sequence_state SET last_sequence = last_sequence + 1 WHERE id = 1 RETURNING last_sequence",
            [],
            |r| r.get(0),
        )?;

        let job_sequence: Option<i64> = match job_id {
            Some(job_id) => {
                tx.execute(
                    "INSERT OR IGNORE INTO job_sequences (job_id, last_job_sequence) VALUES (?1, 0)",
                    params![job_id],
                )?;
                let seq: i64 = tx.query_row(
                    "UPDATE job_sequences SET last_job_sequence = last_job_sequence + 1 WHERE job_id = ?1
                     RETURNING last_job_sequence",
                    params![job_id],
                    |r| r.get(0),
                )?;
                Some(seq)
            }
            None => None,
        };

        let timestamp = Utc::now();
        let payload_json = serde_json::to_string(&payload)?;

        tx.execute(
            "INSERT INTO events (sequence_number, job_id, job_sequence, event_type, timestamp_utc, payload_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![sequence_number, job_id, job_sequence, event_type, timestamp.timestamp(), payload_json],
        )?;

        tx.commit()?;

        Ok(Event {
            sequence_number,
            job_id: job_id.map(str::to_string),
            job_sequence,
            timestamp_utc: timestamp,
            event_type: event_type.to_string(),
            payload,
        })
    }

    /// Replay: all events with `sequence_number > after`, optionally
    /// filtered to one job, ascending order. Gap-free by construction.
    pub fn events_after(&self, after: i64, job_id: Option<&str>) -> Result<Vec<Event>, EngineStoreError> {
        let mut stmt = match job_id {
            Some(_) => self.conn.prepare(
                "SELECT sequence_number, job_id, job_sequence, event_type, timestamp_utc, payload_json
                 FROM events WHERE sequence_number > ?1 AND job_id = ?2 ORDER BY sequence_number ASC",
            )?,
            None => self.conn.prepare(
                "SELECT sequence_number, job_id, job_sequence, event_type, timestamp_utc, payload_json
                 FROM events WHERE sequence_number > ?1 ORDER BY sequence_number ASC",
            )?,
        };

        let rows = if let Some(job_id) = job_id {
            stmt.query_map(params![after, job_id], row_to_event)?
                .collect::<Result<Vec<_>, _>>()?
        } else {
            stmt.query_map(params![after], row_to_event)?
                .collect::<Result<Vec<_>, _>>()?
        };
        Ok(rows)
    }

    pub fn last_sequence(&self) -> Result<i64, EngineStoreError> {
        Ok(self
            .conn
            .query_row("SELECT last_sequence FROM sequence_state WHERE id = 1", [], |r| r.get(0))?)
    }
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<Event> {
    let ts: i64 = row.get(4)?;
    let payload_json: String = row.get(5)?;
    Ok(Event {
        sequence_number: row.get(0)?,
        job_id: row.get(1)?,
        job_sequence: row.get(2)?,
        event_type: row.get(3)?,
        timestamp_utc: timestamp_from_unix(ts).map_err(|_| {
            rusqlite::Error::InvalidColumnType(4, "timestamp_utc".to_string(), rusqlite::types::Type::Integer)
        })?,
        payload: serde_json::from_str(&payload_json).unwrap_or(serde_json::Value::Null),
    })
}

fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<Job> {
    let state_str: String = row.get("state")?;
    let state = JobState::from_str_opt(&state_str).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(0, "state".to_string(), rusqlite::types::Type::Text)
    })?;
    let config_json: String = row.get("config_json")?;
    let error_code: Option<String> = row.get("error_code")?;
    let error_message: Option<String> = row.get("error_message")?;
    let error_details: Option<String> = row.get("error_details")?;
    let receipt_json: Option<String> = row.get("receipt_json")?;

    let error = error_code.zip(error_message).map(|(code, message)| JobError {
        code,
        message,
        details: error_details.and_then(|d| serde_json::from_str(&d).ok()),
    });

    Ok(Job {
        job_id: row.get("job_id")?,
        state,
        config_json: serde_json::from_str(&config_json).unwrap_or(serde_json::Value::Null),
        config_hash: row.get("config_hash")?,
        workspace_path: row.get("workspace_path")?,
        idempotency_key: row.get("idempotency_key")?,
        progress: Progress {
            percent: row.get("progress_percent")?,
            phase: row.get("progress_phase")?,
            items_done: row.get::<_, Option<i64>>("progress_items_done")?.map(|v| v as u64),
            items_total: row.get::<_, Option<i64>>("progress_items_total")?.map(|v| v as u64),
        },
        error,
        receipt_json: receipt_json.and_then(|r| serde_json::from_str(&r).ok()),
        receipt_hash: row.get("receipt_hash")?,
        timestamps: JobTimestamps {
            created: row.get::<_, Option<i64>>("created_at")?.map(opt_ts).transpose().unwrap_or(None),
            queued: row.get::<_, Option<i64>>("queued_at")?.map(opt_ts).transpose().unwrap_or(None),
            started: row.get::<_, Option<i64>>("started_at")?.map(opt_ts).transpose().unwrap_or(None),
            completed: row.get::<_, Option<i64>>("completed_at")?.map(opt_ts).transpose().unwrap_or(None),
            updated: row.get::<_, Option<i64>>("updated_at")?.map(opt_ts).transpose().unwrap_or(None),
        },
        claim_attempts: row.get::<_, i64>("claim_attempts")? as u32,
        last_heartbeat_at: row
            .get::<_, Option<i64>>("last_heartbeat_at")?
            .map(opt_ts)
            .transpose()
            .unwrap_or(None),
    })
}

fn opt_ts(ts: i64) -> Result<DateTime<Utc>, ()> {
    Ok(Utc.timestamp_opt(ts, 0).single().unwrap_or_else(|| timestamp_from_unix(ts).unwrap()))
}

fn timestamp_from_unix(ts: i64) -> Result<DateTime<Utc>, EngineStoreError> {
    Utc.timestamp_opt(ts, 0).single().ok_or(EngineStoreError::InvalidTimestamp(ts))
}
