//! Progress event stream.
//!
//! A single poll loop reads every `download` record from the registry each
//! tick, runs it through the [`Aggregator`] and fans the resulting events out
//! to subscriber channels. The loop is started by the first `subscribe` and
//! stops once the last subscriber is gone.

mod aggregator;

pub use aggregator::Aggregator;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::registry::{JobState, Registry, DOWNLOAD_TAG};

/// One announcement for a content id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub content_id: String,
    pub downloaded_pages: usize,
    pub total_pages: usize,
    pub status: JobState,
    /// Bytes per second since the previous observation.
    pub download_speed: u64,
}

pub type SubscriptionId = u64;

/// Receiving side handed to a subscriber.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub events: mpsc::Receiver<ProgressEvent>,
}

#[derive(Default)]
struct HubState {
    subscribers: HashMap<SubscriptionId, mpsc::Sender<ProgressEvent>>,
    poller: Option<JoinHandle<()>>,
}

/// Subscriber registry plus the poll loop that feeds it.
pub struct EventHub {
    registry: Registry,
    aggregator: Arc<Aggregator>,
    interval: Duration,
    buffer: usize,
    clock: Instant,
    next_id: AtomicU64,
    state: Arc<Mutex<HubState>>,
}

impl EventHub {
    pub fn new(registry: Registry, aggregator: Arc<Aggregator>, interval: Duration, buffer: usize) -> Self {
        Self {
            registry,
            aggregator,
            interval,
            buffer: buffer.max(1),
            clock: Instant::now(),
            next_id: AtomicU64::new(1),
            state: Arc::new(Mutex::new(HubState::default())),
        }
    }

    /// Register a subscriber, starting the poll loop if it is not running.
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.subscribers.insert(id, tx);
        let running = state.poller.as_ref().is_some_and(|h| !h.is_finished());
        if !running {
            tracing::debug!("starting event poll loop");
            state.poller = Some(tokio::spawn(poll_loop(
                self.registry.clone(),
                Arc::clone(&self.aggregator),
                Arc::clone(&self.state),
                self.interval,
                self.clock,
            )));
        }
        Subscription { id, events: rx }
    }

    /// Drop a subscriber; the poll loop stops when none remain.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.subscribers.remove(&id);
        if state.subscribers.is_empty() {
            if let Some(handle) = state.poller.take() {
                tracing::debug!("stopping event poll loop");
                handle.abort();
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .len()
    }

    pub fn is_polling(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .poller
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for EventHub {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = state.poller.take() {
            handle.abort();
        }
    }
}

async fn poll_loop(
    registry: Registry,
    aggregator: Arc<Aggregator>,
    state: Arc<Mutex<HubState>>,
    interval: Duration,
    clock: Instant,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;

        let senders: Vec<(SubscriptionId, mpsc::Sender<ProgressEvent>)> = {
            let mut st = state.lock().unwrap_or_else(PoisonError::into_inner);
            if st.subscribers.is_empty() {
                st.poller = None;
                return;
            }
            st.subscribers
                .iter()
                .map(|(id, tx)| (*id, tx.clone()))
                .collect()
        };

        let records = match registry.jobs_by_tag(DOWNLOAD_TAG).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("event poll skipped: {}", e);
                continue;
            }
        };
        let now_millis = clock.elapsed().as_millis() as u64;
        let events = aggregator.process(&records, now_millis);

        let mut closed = Vec::new();
        for event in events {
            for (id, tx) in &senders {
                if closed.contains(id) {
                    continue;
                }
                if tx.send(event.clone()).await.is_err() {
                    closed.push(*id);
                }
            }
        }
        if !closed.is_empty() {
            let mut st = state.lock().unwrap_or_else(PoisonError::into_inner);
            for id in closed {
                tracing::debug!(subscription = id, "dropping closed subscriber");
                st.subscribers.remove(&id);
            }
        }
    }
}
