//! Subscriber Hub (C7, §4.7): fans a persisted `Signal` out to every
//! streaming subscriber whose filter matches, with bounded per-subscriber
//! queues and drop-newest-on-full semantics. `broadcast` never awaits —
//! `mpsc::Sender::try_send` is synchronous, so a slow subscriber can never
//! stall the hub (per §5's "broadcast enqueue (C7) may suspend" is the
//! *caller's* spawn point, not this call itself).

use std::collections::HashSet;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use futures::Stream;
use parking_lot::RwLock;
use signal_core::Signal;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::warn;
use uuid::Uuid;

/// Minimum queue bound per §4.7 ("Queue bound >= 256").
pub const MIN_QUEUE_BOUND: usize = 256;

/// A subscriber's `(strategy, symbol)` filter. Empty means "any".
#[derive(Debug, Clone, Default)]
pub struct SignalFilter {
    pub strategy_ids: Vec<String>,
    pub symbols: Vec<String>,
}

impl SignalFilter {
    fn matches(&self, signal: &Signal) -> bool {
        if !self.strategy_ids.is_empty() && !self.strategy_ids.iter().any(|id| id == &signal.strategy_id) {
            return false;
        }
        if !self.symbols.is_empty() && !self.symbols.iter().any(|sym| sym == &signal.symbol) {
            return false;
        }
        true
    }
}

struct SubscriberEntry {
    id: Uuid,
    filter: SignalFilter,
    sender: mpsc::Sender<Signal>,
    dropped: Arc<AtomicU64>,
    last_activity: Arc<parking_lot::Mutex<DateTime<Utc>>>,
}

/// A live stream handle returned by [`SubscriberHub::subscribe`]. Removes
/// its entry from the hub when dropped — client disconnection or
/// cancellation both manifest as this handle going out of scope.
pub struct SignalSubscription {
    id: Uuid,
    stream: ReceiverStream<Signal>,
    dropped: Arc<AtomicU64>,
    hub: Weak<SubscriberHub>,
}

impl SignalSubscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Monotonic per-subscriber dropped-signal counter, surfaced in metrics
    /// per §4.7.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Stream for SignalSubscription {
    type Item = Signal;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.stream).poll_next(cx)
    }
}

impl Drop for SignalSubscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.remove(self.id);
        }
    }
}

/// The fan-out hub itself (C7). Always constructed behind an `Arc` since
/// subscriptions hold a [`Weak`] back-reference for self-removal on drop.
pub struct SubscriberHub {
    entries: RwLock<Vec<SubscriberEntry>>,
    queue_bound: usize,
}

impl SubscriberHub {
    pub fn new(queue_bound: usize) -> Arc<Self> {
        Arc::new(SubscriberHub {
            entries: RwLock::new(Vec::new()),
            queue_bound: queue_bound.max(MIN_QUEUE_BOUND),
        })
    }

    /// Registers a new subscriber behind `filter`. Lifetime is tied to the
    /// returned [`SignalSubscription`] — dropping it (stream end, client
    /// cancellation) unregisters the entry.
    pub fn subscribe(self: &Arc<Self>, filter: SignalFilter) -> SignalSubscription {
        let (tx, rx) = mpsc::channel(self.queue_bound);
        let id = Uuid::new_v4();
        let dropped = Arc::new(AtomicU64::new(0));
        let last_activity = Arc::new(parking_lot::Mutex::new(Utc::now()));
        self.entries.write().push(SubscriberEntry {
            id,
            filter,
            sender: tx,
            dropped: dropped.clone(),
            last_activity,
        });
        SignalSubscription {
            id,
            stream: ReceiverStream::new(rx),
            dropped,
            hub: Arc::downgrade(self),
        }
    }

    /// Fans `signal` out to every matching subscriber (4.7). Never blocks:
    /// a full queue drops the newest signal and bumps that subscriber's
    /// counter rather than waiting.
    pub fn broadcast(&self, signal: &Signal) {
        let entries = self.entries.read();
        for entry in entries.iter() {
            if !entry.filter.matches(signal) {
                continue;
            }
            match entry.sender.try_send(signal.clone()) {
                Ok(()) => {
                    *entry.last_activity.lock() = Utc::now();
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    entry.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(subscriber = %entry.id, "subscriber queue full, dropping newest signal");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    // Receiver already gone; the Drop impl will remove this
                    // entry shortly, nothing to do here.
                }
            }
        }
    }

    fn remove(&self, id: Uuid) {
        self.entries.write().retain(|entry| entry.id != id);
    }

    /// Removes subscribers whose queue has not received a delivery in
    /// `max_idle` (§4.7: "a period of inactivity exceeds a server-configured
    /// limit"). Intended to be called periodically by the orchestrator.
    pub fn prune_idle(&self, max_idle: chrono::Duration) {
        let now = Utc::now();
        self.entries.write().retain(|entry| {
            let idle_for = now - *entry.last_activity.lock();
            idle_for < max_idle
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.entries.read().len()
    }

    /// Union of currently-subscribed strategy ids, exposed for tests and
    /// diagnostics; not part of the core C7 contract.
    pub fn subscribed_strategy_ids(&self) -> HashSet<String> {
        self.entries
            .read()
            .iter()
            .flat_map(|entry| entry.filter.strategy_ids.iter().cloned())
            .collect()
    }
}
