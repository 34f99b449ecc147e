//! Cooperative cancellation registry.
//!
//! Pipeline stages poll a shared flag between steps rather than being
//! killed outright, so a cancelled job always leaves a coherent partial
//! state behind for the receipt writer. One `AtomicBool` per job, looked
//! up by id; no new dependency pulled in for this (the example pack's
//! `abp-runtime` crate doesn't carry `dashmap` either, so a
//! `Mutex<HashMap<..>>` matches the stack already in use).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
pub struct CancelRegistry {
    flags: Mutex<HashMap<String, Arc<AtomicBool>>>,
}

/// A handle a running job polls between pipeline stages.
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh, unset flag for `job_id`, returning the token the
    /// running stage will poll.
    pub fn register(&self, job_id: &str) -> CancelToken {
        let flag = Arc::new(AtomicBool::new(false));
        self.flags.lock().unwrap().insert(job_id.to_string(), flag.clone());
        CancelToken { flag }
    }

    /// Signal cancellation for `job_id`. Returns `false` if no job with
    /// that id is currently registered (e.g. already completed).
    pub fn request_cancel(&self, job_id: &str) -> bool {
        match self.flags.lock().unwrap().get(job_id) {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    pub fn is_cancelled(&self, job_id: &str) -> bool {
        self.flags
            .lock()
            .unwrap()
            .get(job_id)
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Drop the flag once a job reaches a terminal state.
    pub fn unregister(&self, job_id: &str) {
        self.flags.lock().unwrap().remove(job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_cancel_is_observed_by_token() {
        let registry = CancelRegistry::new();
        let token = registry.register("job-1");
        assert!(!token.is_cancelled());

        assert!(registry.request_cancel("job-1"));
        assert!(token.is_cancelled());
        assert!(registry.is_cancelled("job-1"));
    }

    #[test]
    fn request_cancel_on_unknown_job_returns_false() {
        let registry = CancelRegistry::new();
        assert!(!registry.request_cancel("nonexistent"));
    }

    #[test]
    fn unregister_forgets_job() {
        let registry = CancelRegistry::new();
        registry.register("job-1");
        registry.unregister("job-1");
        assert!(!registry.request_cancel("job-1"));
    }
}
