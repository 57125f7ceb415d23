//! In-memory event queue with size- and time-triggered bulk flushes.

use std::mem;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use super::sink::EventSink;

/// Queue length at which a flush fires immediately.
pub const FLUSH_THRESHOLD: usize = 10;

/// Debounce delay before a partial queue is flushed. Each enqueue below the
/// threshold pushes the flush out again; the timer is a debounce, not an
/// interval.
pub const FLUSH_DELAY: Duration = Duration::from_millis(5000);

/// A queued event awaiting flush.
#[derive(Debug)]
struct PendingEvent {
    table: String,
    payload: JsonValue,
}

/// Buffers analytics events and flushes them to the sink in bulk.
///
/// Decouples user-interaction tracking from the analytics store's
/// availability and latency. Events have no durability: anything still
/// queued when the process dies is gone, and a failed flush drops its batch
/// permanently. Cheaply cloneable; clones share the queue and timer.
#[derive(Clone)]
pub struct EventBatcher {
    inner: Arc<BatcherInner>,
}

struct BatcherInner {
    /// `None` means analytics is not configured: enqueue drops events
    /// immediately instead of queueing them.
    sink: Option<Arc<dyn EventSink>>,
    queue: Mutex<Vec<PendingEvent>>,
    /// At most one pending debounce timer at a time.
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl EventBatcher {
    /// Create a batcher flushing into `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::build(Some(sink))
    }

    /// Create a disabled batcher: every enqueue is a no-op.
    #[must_use]
    pub fn disabled() -> Self {
        Self::build(None)
    }

    fn build(sink: Option<Arc<dyn EventSink>>) -> Self {
        Self {
            inner: Arc::new(BatcherInner {
                sink,
                queue: Mutex::new(Vec::new()),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Whether analytics is configured at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inner.sink.is_some()
    }

    /// Number of events currently awaiting flush.
    pub async fn pending_len(&self) -> usize {
        self.inner.queue.lock().await.len()
    }

    /// Queue an event for the given target table.
    ///
    /// Reaching [`FLUSH_THRESHOLD`] fires an immediate flush (in the
    /// background, never blocking the caller) and cancels the pending
    /// timer; otherwise the debounce timer is (re)scheduled.
    pub async fn enqueue(&self, table: impl Into<String>, payload: JsonValue) {
        if !self.is_enabled() {
            return;
        }

        let len = {
            let mut queue = self.inner.queue.lock().await;
            queue.push(PendingEvent {
                table: table.into(),
                payload,
            });
            queue.len()
        };

        if len >= FLUSH_THRESHOLD {
            self.cancel_timer().await;
            let batcher = self.clone();
            tokio::spawn(async move { batcher.flush().await });
        } else {
            self.schedule_flush().await;
        }
    }

    /// Drain the queue and bulk-insert the drained events, one request per
    /// target table.
    ///
    /// The queue is swapped for an empty one before any network call, so an
    /// event enqueued during the flush lands in the next flush - never
    /// duplicated, never lost mid-flight. Per-table failures are logged and
    /// dropped without affecting other tables.
    #[instrument(skip(self))]
    pub async fn flush(&self) {
        let Some(sink) = &self.inner.sink else {
            return;
        };

        let drained = {
            let mut queue = self.inner.queue.lock().await;
            mem::take(&mut *queue)
        };
        if drained.is_empty() {
            return;
        }

        // Group by target table, preserving first-seen order.
        let mut groups: Vec<(String, Vec<JsonValue>)> = Vec::new();
        for event in drained {
            match groups.iter_mut().find(|(table, _)| *table == event.table) {
                Some((_, rows)) => rows.push(event.payload),
                None => groups.push((event.table, vec![event.payload])),
            }
        }

        for (table, rows) in groups {
            let count = rows.len();
            match sink.insert_batch(&table, rows).await {
                Ok(()) => debug!(table = %table, count, "flushed event batch"),
                Err(e) => {
                    warn!(table = %table, count, error = %e, "dropping failed event batch");
                }
            }
        }
    }

    /// Cancel any pending timer and perform one final best-effort drain.
    pub async fn shutdown(&self) {
        self.cancel_timer().await;
        self.flush().await;
    }

    /// (Re)schedule the debounced flush, replacing any previous timer.
    async fn schedule_flush(&self) {
        let batcher = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(FLUSH_DELAY).await;
            batcher.flush().await;
        });

        let mut timer = self.inner.timer.lock().await;
        if let Some(previous) = timer.replace(handle) {
            previous.abort();
        }
    }

    async fn cancel_timer(&self) {
        if let Some(handle) = self.inner.timer.lock().await.take() {
            handle.abort();
        }
    }
}
