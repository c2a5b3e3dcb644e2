//! Debounced, coalescing event queue.
//!
//! Events are keyed by note id: a newer event replaces the pending one for
//! the same note. Every enqueue restarts one queue-wide debounce timer;
//! when it fires the pending batch is drained in timestamp order through
//! the processor, one event at a time. Only one drain runs at a time.
//!
//! Enqueueing spawns tasks, so it must happen inside a tokio runtime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use vault_types::IndexEvent;

use crate::error::IndexingError;

/// Handles one drained event.
#[async_trait]
pub trait EventProcessor: Send + Sync + 'static {
    async fn process(&self, event: IndexEvent) -> Result<(), IndexingError>;
}

/// Queue counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    /// Events currently pending
    pub queued: usize,
    pub processed: u64,
    pub dropped_as_duplicate: u64,
    pub failed: u64,
    pub last_processed_at: Option<DateTime<Utc>>,
}

struct PendingEntry {
    event: IndexEvent,
    /// Insertion order of the note id, kept across replacements
    seq: u64,
}

#[derive(Default)]
struct Pending {
    entries: HashMap<String, PendingEntry>,
    next_seq: u64,
}

struct QueueInner {
    processor: Arc<dyn EventProcessor>,
    debounce: Duration,
    pending: Mutex<Pending>,
    timer: Mutex<Option<JoinHandle<()>>>,
    draining: Arc<AtomicBool>,
    stats: Mutex<QueueStats>,
}

/// Clears the draining flag when dropped.
struct DrainGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl QueueInner {
    fn try_acquire(&self) -> Option<DrainGuard> {
        self.draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| DrainGuard {
                flag: Arc::clone(&self.draining),
            })
    }

    fn cancel_timer(&self) {
        if let Some(handle) = lock(&self.timer).take() {
            handle.abort();
        }
    }

    /// Take the pending batch, ordered by timestamp then insertion.
    fn take_batch(&self) -> Vec<IndexEvent> {
        let mut pending = lock(&self.pending);
        let mut entries: Vec<PendingEntry> =
            pending.entries.drain().map(|(_, entry)| entry).collect();
        lock(&self.stats).queued = 0;
        drop(pending);

        entries.sort_by_key(|entry| (entry.event.timestamp_ms, entry.seq));
        entries.into_iter().map(|entry| entry.event).collect()
    }

    fn has_pending(&self) -> bool {
        !lock(&self.pending).entries.is_empty()
    }
}

/// (Re)start the debounce timer.
///
/// The timer task hands the drain to a separate task, so cancelling the
/// timer never interrupts a drain that has already started.
fn schedule(inner: &Arc<QueueInner>) {
    let mut timer = lock(&inner.timer);
    if let Some(previous) = timer.take() {
        previous.abort();
    }
    let task_inner = Arc::clone(inner);
    *timer = Some(tokio::spawn(async move {
        tokio::time::sleep(task_inner.debounce).await;
        tokio::spawn(drain(task_inner));
    }));
}

async fn drain(inner: Arc<QueueInner>) {
    let Some(guard) = inner.try_acquire() else {
        debug!("Drain already running, leaving events pending");
        return;
    };

    let batch = inner.take_batch();
    if batch.is_empty() {
        return;
    }
    debug!(count = batch.len(), "Draining event batch");

    for event in batch {
        let label = event.label();
        match inner.processor.process(event).await {
            Ok(()) => lock(&inner.stats).processed += 1,
            Err(e) => {
                warn!(event = %label, error = %e, "Event processing failed");
                lock(&inner.stats).failed += 1;
            }
        }
    }
    lock(&inner.stats).last_processed_at = Some(Utc::now());
    drop(guard);

    if inner.has_pending() {
        schedule(&inner);
    }
}

/// Coalescing event queue with a single debounce timer.
#[derive(Clone)]
pub struct EventQueue {
    inner: Arc<QueueInner>,
}

impl EventQueue {
    pub fn new(processor: Arc<dyn EventProcessor>, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                processor,
                debounce,
                pending: Mutex::new(Pending::default()),
                timer: Mutex::new(None),
                draining: Arc::new(AtomicBool::new(false)),
                stats: Mutex::new(QueueStats::default()),
            }),
        }
    }

    /// Add an event, replacing any pending event for the same note.
    pub fn enqueue(&self, event: IndexEvent) {
        {
            let mut pending = lock(&self.inner.pending);
            let mut stats = lock(&self.inner.stats);
            let pending = &mut *pending;
            match pending.entries.get_mut(&event.note_id) {
                Some(entry) => {
                    stats.dropped_as_duplicate += 1;
                    entry.event = event;
                }
                None => {
                    let seq = pending.next_seq;
                    pending.next_seq += 1;
                    pending
                        .entries
                        .insert(event.note_id.clone(), PendingEntry { event, seq });
                }
            }
            stats.queued = pending.entries.len();
        }
        schedule(&self.inner);
    }

    /// Drain now, bypassing the timer.
    ///
    /// Returns immediately if another drain is already running.
    pub async fn flush_now(&self) {
        self.inner.cancel_timer();
        drain(Arc::clone(&self.inner)).await;
    }

    /// Cancel the timer and discard pending events unprocessed.
    pub fn clear(&self) {
        self.inner.cancel_timer();
        lock(&self.inner.pending).entries.clear();
        lock(&self.inner.stats).queued = 0;
    }

    pub fn stats(&self) -> QueueStats {
        lock(&self.inner.stats).clone()
    }

    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::sync::Notify;
    use vault_types::IndexEventType;

    /// Records event labels; optionally fails or blocks.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
        fail_on: Option<String>,
        gate: Option<Arc<Notify>>,
    }

    impl Recorder {
        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventProcessor for Recorder {
        async fn process(&self, event: IndexEvent) -> Result<(), IndexingError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.seen.lock().unwrap().push(event.label());
            if self.fail_on.as_deref() == Some(event.note_id.as_str()) {
                return Err(IndexingError::Source("boom".to_string()));
            }
            Ok(())
        }
    }

    fn event(kind: IndexEventType, note: &str, ts: i64) -> IndexEvent {
        IndexEvent::new(kind, note, ts)
    }

    #[tokio::test]
    async fn test_coalescing_and_timestamp_order() {
        let recorder = Arc::new(Recorder::default());
        let queue = EventQueue::new(recorder.clone(), Duration::from_secs(60));

        queue.enqueue(event(IndexEventType::Modify, "a", 1));
        queue.enqueue(event(IndexEventType::Modify, "a", 2));
        queue.enqueue(event(IndexEventType::Delete, "b", 3));
        queue.flush_now().await;

        assert_eq!(recorder.seen(), vec!["modify:a", "delete:b"]);
        let stats = queue.stats();
        assert_eq!(stats.dropped_as_duplicate, 1);
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.queued, 0);
        assert!(stats.last_processed_at.is_some());
    }

    #[tokio::test]
    async fn test_latest_event_wins() {
        let recorder = Arc::new(Recorder::default());
        let queue = EventQueue::new(recorder.clone(), Duration::from_secs(60));

        queue.enqueue(event(IndexEventType::Create, "a", 5));
        queue.enqueue(event(IndexEventType::Delete, "a", 6));
        queue.flush_now().await;

        assert_eq!(recorder.seen(), vec!["delete:a"]);
    }

    #[tokio::test]
    async fn test_equal_timestamps_keep_insertion_order() {
        let recorder = Arc::new(Recorder::default());
        let queue = EventQueue::new(recorder.clone(), Duration::from_secs(60));

        queue.enqueue(event(IndexEventType::Modify, "z", 7));
        queue.enqueue(event(IndexEventType::Modify, "a", 7));
        queue.flush_now().await;

        assert_eq!(recorder.seen(), vec!["modify:z", "modify:a"]);
    }

    #[tokio::test]
    async fn test_failure_does_not_abort_batch() {
        let recorder = Arc::new(Recorder {
            fail_on: Some("a".to_string()),
            ..Default::default()
        });
        let queue = EventQueue::new(recorder.clone(), Duration::from_secs(60));

        queue.enqueue(event(IndexEventType::Modify, "a", 1));
        queue.enqueue(event(IndexEventType::Modify, "b", 2));
        queue.flush_now().await;

        assert_eq!(recorder.seen(), vec!["modify:a", "modify:b"]);
        let stats = queue.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.processed, 1);
    }

    #[tokio::test]
    async fn test_clear_discards_pending() {
        let recorder = Arc::new(Recorder::default());
        let queue = EventQueue::new(recorder.clone(), Duration::from_secs(60));

        queue.enqueue(event(IndexEventType::Modify, "a", 1));
        assert_eq!(queue.stats().queued, 1);
        queue.clear();
        queue.flush_now().await;

        assert!(recorder.seen().is_empty());
        assert_eq!(queue.stats().queued, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_restarts_on_enqueue() {
        let recorder = Arc::new(Recorder::default());
        let queue = EventQueue::new(recorder.clone(), Duration::from_millis(600));

        queue.enqueue(event(IndexEventType::Modify, "a", 1));
        tokio::time::sleep(Duration::from_millis(400)).await;
        queue.enqueue(event(IndexEventType::Modify, "b", 2));
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(recorder.seen().is_empty());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(recorder.seen(), vec!["modify:a", "modify:b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_during_drain_starts_new_batch() {
        let gate = Arc::new(Notify::new());
        let recorder = Arc::new(Recorder {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let queue = EventQueue::new(recorder.clone(), Duration::from_millis(100));

        queue.enqueue(event(IndexEventType::Modify, "a", 1));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(queue.is_draining());

        // Timer fires while the first drain is blocked; that drain attempt is a no-op.
        queue.enqueue(event(IndexEventType::Modify, "b", 2));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(queue.stats().queued, 1);

        gate.notify_one();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(recorder.seen(), vec!["modify:a"]);

        // Rescheduled after the first drain; the second event is released here.
        gate.notify_one();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(recorder.seen(), vec!["modify:a", "modify:b"]);
        assert_eq!(queue.stats().processed, 2);
    }
}
