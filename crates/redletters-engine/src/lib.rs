//! Durable background job engine.
//!
//! Ties together [`store::EngineStore`] (durable job/event log),
//! [`bus::EventBus`] (in-process fan-out over that log), and
//! [`cancel::CancelRegistry`] (cooperative cancellation flags). Every
//! state-changing operation here follows the same order: write to the
//! store, THEN publish to the bus — a subscriber can lag or disconnect
//! without losing anything, because `events_after` always has the full
//! history.

pub mod bus;
pub mod cancel;
pub mod diagnostics;
pub mod store;
pub mod types;

use camino::Utf8Path;
use redletters_utils::error::{ErrorCategory, UserFriendlyError};

use bus::EventBus;
use cancel::{CancelRegistry, CancelToken};
use store::{EngineStore, EngineStoreError};
use types::{Event, Job, JobError, JobState, Progress};

pub use redletters_receipt::{Artifact, Receipt};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] EngineStoreError),
    #[error("job {0} is not claimable (already running or terminal)")]
    NotClaimable(String),
    #[error(transparent)]
    Receipt(#[from] redletters_receipt::ReceiptWriteError),
}

impl UserFriendlyError for EngineError {
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Engine
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            EngineError::NotClaimable(_) => {
                vec!["check job status before claiming; another worker may already own it".to_string()]
            }
            EngineError::Store(_) | EngineError::Receipt(_) => Vec::new(),
        }
    }
}

/// The default staleness window after which a claimed-but-silent job is
/// reaped back to `queued`.
pub const DEFAULT_CLAIM_TIMEOUT_SECS: i64 = 30;

pub struct JobEngine {
    store: EngineStore,
    bus: EventBus,
    cancel: CancelRegistry,
}

impl JobEngine {
    pub fn open_in_memory() -> Result<Self, EngineError> {
        Ok(Self::new(EngineStore::open_in_memory()?))
    }

    pub fn open(path: &std::path::Path) -> Result<Self, EngineError> {
        Ok(Self::new(EngineStore::open(path)?))
    }

    fn new(store: EngineStore) -> Self {
        Self {
            store,
            bus: EventBus::new(),
            cancel: CancelRegistry::new(),
        }
    }

    /// Recover orphaned jobs left `running`/`cancelling` by a previous
    /// process, emitting a `job.crashed` event for each.
    pub fn start(&mut self) -> Result<Vec<String>, EngineError> {
        let orphans = self.store.recover_orphans()?;
        for job_id in &orphans {
            self.emit(Some(job_id), "job.crashed", serde_json::json!({ "reason": "engine_restart" }))?;
        }
        Ok(orphans)
    }

    pub fn submit(
        &mut self,
        job_id: &str,
        config_json: &serde_json::Value,
        config_hash: &str,
        workspace_path: &str,
        idempotency_key: Option<&str>,
    ) -> Result<(), EngineError> {
        self.store.create_job(job_id, config_json, config_hash, workspace_path, idempotency_key)?;
        self.emit(Some(job_id), "job.submitted", serde_json::json!({ "config_hash": config_hash }))?;
        Ok(())
    }

    /// Attempt to claim `job_id`. Returns the cancellation token the
    /// running stage should poll if the claim succeeds.
    pub fn claim(&mut self, job_id: &str) -> Result<CancelToken, EngineError> {
        if !self.store.claim_job(job_id)? {
            return Err(EngineError::NotClaimable(job_id.to_string()));
        }
        let token = self.cancel.register(job_id);
        self.emit(Some(job_id), "job.started", serde_json::json!({}))?;
        Ok(token)
    }

    pub fn heartbeat(&mut self, job_id: &str) -> Result<(), EngineError> {
        self.store.heartbeat(job_id)?;
        Ok(())
    }

    pub fn update_progress(&mut self, job_id: &str, progress: &Progress) -> Result<(), EngineError> {
        self.store.update_progress(job_id, progress)?;
        self.emit(Some(job_id), "job.progress", serde_json::to_value(progress).unwrap_or_default())?;
        Ok(())
    }

    /// Request cooperative cancellation. The job transitions to
    /// `cancelling`; it is the running stage's responsibility to observe
    /// the [`CancelToken`] and call [`Self::mark_cancelled`] once it has
    /// unwound to a safe stopping point.
    pub fn request_cancel(&mut self, job_id: &str) -> Result<bool, EngineError> {
        let requested = self.cancel.request_cancel(job_id);
        if requested {
            self.store.set_state(job_id, JobState::Cancelling)?;
            self.emit(Some(job_id), "job.cancel_requested", serde_json::json!({}))?;
        }
        Ok(requested)
    }

    pub fn mark_cancelled(&mut self, job_id: &str) -> Result<(), EngineError> {
        self.store.set_state(job_id, JobState::Cancelled)?;
        self.cancel.unregister(job_id);
        self.emit(Some(job_id), "job.cancelled", serde_json::json!({}))?;
        Ok(())
    }

    /// Complete a job and atomically emit its receipt to `receipt_path`.
    /// The receipt is written before the
    /// job row or the `job.completed` event is committed, so a crash
    /// between the two can never leave a `completed` job without a
    /// receipt.
    pub fn complete_job(
        &mut self,
        job_id: &str,
        receipt: &Receipt,
        receipt_path: &Utf8Path,
    ) -> Result<Artifact, EngineError> {
        let artifact = redletters_receipt::write_receipt(receipt, receipt_path)?;

        let receipt_json = serde_json::to_value(receipt).unwrap_or_default();
        self.store.set_receipt(job_id, &receipt_json, &artifact.sha256)?;
        self.store.set_state(job_id, JobState::Completed)?;
        self.cancel.unregister(job_id);
        self.emit(Some(job_id), "job.completed", serde_json::json!({ "receipt_sha256": artifact.sha256 }))?;
        Ok(artifact)
    }

    pub fn fail_job(&mut self, job_id: &str, error: JobError) -> Result<(), EngineError> {
        self.store.set_error(job_id, &error)?;
        self.store.set_state(job_id, JobState::Failed)?;
        self.cancel.unregister(job_id);
        self.emit(Some(job_id), "job.failed", serde_json::to_value(&error).unwrap_or_default())?;
        Ok(())
    }

    pub fn get_job(&self, job_id: &str) -> Result<Job, EngineError> {
        Ok(self.store.get_job(job_id)?)
    }

    pub fn list_jobs(&self) -> Result<Vec<Job>, EngineError> {
        Ok(self.store.list_jobs()?)
    }

    /// Release any claim whose last heartbeat is older than
    /// `timeout_secs`, emitting `job.reaped` for each. Intended to be polled periodically by the runtime.
    pub fn reap_stale(&mut self, timeout_secs: i64) -> Result<Vec<String>, EngineError> {
        let stale = self.store.reap_stale_claims(timeout_secs)?;
        for job_id in &stale {
            self.cancel.unregister(job_id);
            self.emit(Some(job_id), "job.reaped", serde_json::json!({}))?;
        }
        Ok(stale)
    }

    pub fn subscribe(&self) -> bus::EventSubscription {
        self.bus.subscribe()
    }

    pub fn bus_stats(&self) -> bus::BusStatsSnapshot {
        self.bus.stats()
    }

    /// Replay: every event after `after`, optionally scoped to one job
    ///. Used both to answer `job status --follow`
    /// reconnects and to seed the diagnostics bundle's recent-events
    /// section.
    pub fn events_after(&self, after: i64, job_id: Option<&str>) -> Result<Vec<Event>, EngineError> {
        Ok(self.store.events_after(after, job_id)?)
    }

    pub fn last_sequence(&self) -> Result<i64, EngineError> {
        Ok(self.store.last_sequence()?)
    }

    fn emit(
        &mut self,
        job_id: Option<&str>,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<Event, EngineError> {
        let event = self.store.commit_event(job_id, event_type, payload)?;
        self.bus.publish(event.clone());
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> serde_json::Value {
        serde_json::json!({ "mode": "study" })
    }

    #[test]
    fn submit_claim_complete_cycle_emits_events_in_order() {
        let mut engine = JobEngine::open_in_memory().unwrap();
        engine.start().unwrap();

        engine.submit("job-1", &sample_config(), "hash1", "/tmp/ws", None).unwrap();
        let job = engine.get_job("job-1").unwrap();
        assert_eq!(job.state, JobState::Queued);

        let token = engine.claim("job-1").unwrap();
        assert!(!token.is_cancelled());
        assert_eq!(engine.get_job("job-1").unwrap().state, JobState::Running);

        let dir = tempfile::tempdir().unwrap();
        let receipt_path = camino::Utf8PathBuf::from_path_buf(dir.path().join("receipt.json")).unwrap();
        let receipt = Receipt {
            schema_version: redletters_receipt::RECEIPT_SCHEMA_VERSION.to_string(),
            job_id: "job-1".to_string(),
            run_id: "run-1".to_string(),
            status: "completed".to_string(),
            exit_code: Some(0),
            timestamps: redletters_receipt::ReceiptTimestamps {
                created: chrono::Utc::now(),
                started: Some(chrono::Utc::now()),
                completed: Some(chrono::Utc::now()),
            },
            config_snapshot: sample_config(),
            source_pins: std::collections::BTreeMap::new(),
            inputs_summary: serde_json::json!({}),
            outputs: Vec::new(),
            error: None,
        };

        engine.complete_job("job-1", &receipt, &receipt_path).unwrap();
        let job = engine.get_job("job-1").unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert!(job.receipt_hash.is_some());

        let events = engine.events_after(0, Some("job-1")).unwrap();
        let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["job.submitted", "job.started", "job.completed"]);

        for (i, e) in events.iter().enumerate() {
            assert_eq!(e.job_sequence, Some((i + 1) as i64));
        }
    }

    #[test]
    fn claim_on_already_running_job_fails() {
        let mut engine = JobEngine::open_in_memory().unwrap();
        engine.submit("job-1", &sample_config(), "hash1", "/tmp/ws", None).unwrap();
        engine.claim("job-1").unwrap();

        assert!(matches!(engine.claim("job-1"), Err(EngineError::NotClaimable(_))));
    }

    #[test]
    fn cancel_request_sets_cancelling_and_token_observes_it() {
        let mut engine = JobEngine::open_in_memory().unwrap();
        engine.submit("job-1", &sample_config(), "hash1", "/tmp/ws", None).unwrap();
        let token = engine.claim("job-1").unwrap();

        assert!(engine.request_cancel("job-1").unwrap());
        assert!(token.is_cancelled());
        assert_eq!(engine.get_job("job-1").unwrap().state, JobState::Cancelling);

        engine.mark_cancelled("job-1").unwrap();
        assert_eq!(engine.get_job("job-1").unwrap().state, JobState::Cancelled);
    }

    #[test]
    fn reap_stale_requeues_silent_jobs() {
        let mut engine = JobEngine::open_in_memory().unwrap();
        engine.submit("job-1", &sample_config(), "hash1", "/tmp/ws", None).unwrap();
        engine.claim("job-1").unwrap();

        let reaped = engine.reap_stale(-1).unwrap();
        assert_eq!(reaped, vec!["job-1".to_string()]);
        assert_eq!(engine.get_job("job-1").unwrap().state, JobState::Queued);
    }

    #[test]
    fn orphan_recovery_fails_jobs_left_running_across_restart() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("engine.sqlite3");

        {
            let mut engine = JobEngine::open(&db_path).unwrap();
            engine.submit("job-1", &sample_config(), "hash1", "/tmp/ws", None).unwrap();
            engine.claim("job-1").unwrap();
        }

        let mut engine = JobEngine::open(&db_path).unwrap();
        let recovered = engine.start().unwrap();
        assert_eq!(recovered, vec!["job-1".to_string()]);

        let job = engine.get_job("job-1").unwrap();
        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error.as_ref().unwrap().code, "E_ENGINE_CRASH");
    }

    #[test]
    fn idempotency_key_is_stored_on_job() {
        let mut engine = JobEngine::open_in_memory().unwrap();
        engine.submit("job-1", &sample_config(), "hash1", "/tmp/ws", Some("idem-key-1")).unwrap();
        let job = engine.get_job("job-1").unwrap();
        assert_eq!(job.idempotency_key.as_deref(), Some("idem-key-1"));
    }
}
