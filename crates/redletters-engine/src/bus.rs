//! In-process event fan-out over a persisted log.
//!
//! A `tokio::sync::broadcast` channel wrapped with drop/lag counters, plus
//! a receiver wrapper that turns `Lagged`/`Closed` into an explicit enum
//! instead of bubbling `broadcast::error::RecvError` to callers. `publish`
//! here is never the durability boundary — `EngineStore::commit_event`
//! always runs first, so a dropped broadcast receiver only means "use
//! `events_after` to catch up," never lost data.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::types::Event;

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct BusStats {
    published: AtomicU64,
    dropped_sends: AtomicU64,
}

/// Snapshot of bus activity, surfaced via diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct BusStatsSnapshot {
    pub published: u64,
    pub dropped_sends: u64,
    pub subscriber_count: usize,
}

pub struct EventBus {
    sender: broadcast::Sender<Event>,
    stats: Arc<BusStats>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            stats: Arc::new(BusStats::default()),
        }
    }

    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Fan out an already-persisted event. Never the source of truth:
    /// `EngineStore::events_after` is.
    pub fn publish(&self, event: Event) {
        self.stats.published.fetch_add(1, Ordering::Relaxed);
        if self.sender.send(event).is_err() {
            self.stats.dropped_sends.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn stats(&self) -> BusStatsSnapshot {
        BusStatsSnapshot {
            published: self.stats.published.load(Ordering::Relaxed),
            dropped_sends: self.stats.dropped_sends.load(Ordering::Relaxed),
            subscriber_count: self.subscriber_count(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a single `recv` on an [`EventSubscription`].
#[derive(Debug)]
pub enum RecvOutcome {
    Event(Event),
    /// The subscriber fell behind by `skipped` events; call
    /// `EngineStore::events_after` to catch up before resuming.
    Lagged { skipped: u64 },
    Closed,
}

pub struct EventSubscription {
    receiver: broadcast::Receiver<Event>,
}

impl EventSubscription {
    pub async fn recv(&mut self) -> RecvOutcome {
        match self.receiver.recv().await {
            Ok(event) => RecvOutcome::Event(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => RecvOutcome::Lagged { skipped },
            Err(broadcast::error::RecvError::Closed) => RecvOutcome::Closed,
        }
    }

    pub fn try_recv(&mut self) -> Option<RecvOutcome> {
        match self.receiver.try_recv() {
            Ok(event) => Some(RecvOutcome::Event(event)),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => Some(RecvOutcome::Lagged { skipped }),
            Err(broadcast::error::TryRecvError::Closed) => Some(RecvOutcome::Closed),
            Err(broadcast::error::TryRecvError::Empty) => None,
        }
    }
}

/// Wraps an [`EventSubscription`], yielding only events matching `filter`.
pub struct FilteredSubscription<F: Fn(&Event) -> bool> {
    inner: EventSubscription,
    filter: F,
}

impl<F: Fn(&Event) -> bool> FilteredSubscription<F> {
    pub fn new(inner: EventSubscription, filter: F) -> Self {
        Self { inner, filter }
    }

    pub async fn recv(&mut self) -> RecvOutcome {
        loop {
            match self.inner.recv().await {
                RecvOutcome::Event(event) if !(self.filter)(&event) => continue,
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_event(sequence_number: i64) -> Event {
        Event {
            sequence_number,
            job_id: Some("job-1".to_string()),
            job_sequence: Some(sequence_number),
            timestamp_utc: chrono::Utc::now(),
            event_type: "job.progress".to_string(),
            payload: json!({}),
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();

        bus.publish(sample_event(1));

        match sub.recv().await {
            RecvOutcome::Event(e) => assert_eq!(e.sequence_number, 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stats_count_publishes() {
        let bus = EventBus::new();
        let _sub = bus.subscribe();
        bus.publish(sample_event(1));
        bus.publish(sample_event(2));

        let stats = bus.stats();
        assert_eq!(stats.published, 2);
        assert_eq!(stats.subscriber_count, 1);
    }

    #[tokio::test]
    async fn filtered_subscription_skips_non_matching_events() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        let mut filtered = FilteredSubscription::new(sub, |e| e.sequence_number == 2);

        bus.publish(sample_event(1));
        bus.publish(sample_event(2));

        match filtered.recv().await {
            RecvOutcome::Event(e) => assert_eq!(e.sequence_number, 2),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}

impl std::fmt::Debug for RecvOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecvOutcome::Event(e) => write!(f, "Event({})", e.sequence_number),
            RecvOutcome::Lagged { skipped } => write!(f, "Lagged({skipped})"),
            RecvOutcome::Closed => write!(f, "Closed"),
        }
    }
}
