//! Per-key coalescing/batching layer bridging high-frequency producers to
//! slower consumers, with debounce, drop-oldest overflow, and a manual or
//! timer-driven flush.
//!
//! Timer state is modeled explicitly as `idle -> armed -> firing -> idle`
//! (§9 Design Notes) rather than a one-shot-then-reschedule loop: `enqueue`
//! arms a timer only if none is pending, and `flush`/`stop` always cancel
//! it first.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::config::BatcherConfig;

#[derive(Debug, Clone)]
struct Entry {
    key: String,
    event: Value,
    enqueued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatcherStats {
    pub queue_size: usize,
    pub dropped_count: u64,
    pub last_flush_time: Option<DateTime<Utc>>,
}

/// Sink invoked with a drained batch, in insertion order of keys.
pub type Sink = Arc<dyn Fn(Vec<(String, Value)>) + Send + Sync>;

struct Inner {
    // Insertion-ordered: VecDeque of keys backs ordering, HashMap would
    // lose it on re-insertion, so we keep a parallel Vec<Entry> and locate
    // by key — queues here are small (bounded by max_events_per_batch).
    queue: VecDeque<Entry>,
    dropped_count: u64,
    last_flush_time: Option<DateTime<Utc>>,
    timer: Option<JoinHandle<()>>,
}

pub struct ThrottledEventBatcher {
    inner: Mutex<Inner>,
    config: BatcherConfig,
    sink: Sink,
}

impl ThrottledEventBatcher {
    pub fn new(config: BatcherConfig, sink: Sink) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                dropped_count: 0,
                last_flush_time: None,
                timer: None,
            }),
            config,
            sink,
        })
    }

    pub async fn enqueue(self: &Arc<Self>, key: &str, event: Value) {
        let now = Utc::now();
        let mut inner = self.inner.lock().await;

        let existing_idx = inner.queue.iter().position(|e| e.key == key);
        let debounce = self.config.debounce_ms;

        match existing_idx {
            Some(idx) if debounce > 0 => {
                let within_window = (now - inner.queue[idx].enqueued_at)
                    .num_milliseconds()
                    .max(0) as u64
                    <= debounce;
                if within_window {
                    // Coalesce: replace the event, keep the original enqueued_at.
                    inner.queue[idx].event = event;
                } else {
                    // Outside the debounce window: treat as a fresh enqueue.
                    inner.queue.remove(idx);
                    inner.queue.push_back(Entry {
                        key: key.to_string(),
                        event,
                        enqueued_at: now,
                    });
                }
            }
            Some(idx) => {
                // debounce == 0: no debouncing, always treated as a new event
                // that simply replaces the prior one for this key.
                inner.queue.remove(idx);
                inner.queue.push_back(Entry {
                    key: key.to_string(),
                    event,
                    enqueued_at: now,
                });
            }
            None => {
                inner.queue.push_back(Entry {
                    key: key.to_string(),
                    event,
                    enqueued_at: now,
                });
            }
        }

        while inner.queue.len() > self.config.max_events_per_batch {
            if let Some(dropped) = inner.queue.pop_front() {
                inner.dropped_count += 1;
                debug!(key = %dropped.key, "batcher dropped oldest entry on overflow");
            }
        }

        if inner.timer.is_none() {
            let weak_self = Arc::downgrade(self);
            let window = std::time::Duration::from_millis(self.config.batch_window_ms);
            inner.timer = Some(tokio::spawn(async move {
                tokio::time::sleep(window).await;
                if let Some(strong) = weak_self.upgrade() {
                    strong.flush().await;
                }
            }));
        }
    }

    /// Drain the queue and invoke the sink. Safe to call manually or let
    /// the armed timer call it. Clears queue state before invoking the
    /// sink so a panicking/misbehaving sink cannot corrupt internal state.
    pub async fn flush(self: &Arc<Self>) {
        let drained = {
            let mut inner = self.inner.lock().await;
            if let Some(timer) = inner.timer.take() {
                timer.abort();
            }
            let drained: Vec<(String, Value)> = inner
                .queue
                .drain(..)
                .map(|e| (e.key, e.event))
                .collect();
            inner.last_flush_time = Some(Utc::now());
            drained
        };

        if drained.is_empty() {
            return;
        }

        let sink = Arc::clone(&self.sink);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            sink(drained);
        }));
        if let Err(panic) = result {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            error!(panic = %msg, "batcher sink panicked during flush");
        }
    }

    /// Flush synchronously and cancel any pending timer. Idempotent.
    pub async fn stop(self: &Arc<Self>) {
        self.flush().await;
        let mut inner = self.inner.lock().await;
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
    }

    pub async fn get_stats(&self) -> BatcherStats {
        let inner = self.inner.lock().await;
        BatcherStats {
            queue_size: inner.queue.len(),
            dropped_count: inner.dropped_count,
            last_flush_time: inner.last_flush_time,
        }
    }

    pub async fn reset_dropped_count(&self) {
        self.inner.lock().await.dropped_count = 0;
    }
}
