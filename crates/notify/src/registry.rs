//! Correlation-keyed push channel registry.
//!
//! Maps correlation ids to open SSE subscriptions. Subscription happens on
//! the gateway-facing side, fulfillment on the pipeline-facing side; the
//! mutex-guarded map is the only shared state between the two flows. Each
//! channel delivers exactly one terminal event and is removed from the map
//! atomically with that terminal transition.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Terminal status pushed to the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompletionStatus {
    /// Pipeline stored the output; `path` points at the blob download URL.
    Complete,
    /// The subscription outlived its TTL without a fulfillment.
    TimedOut,
}

/// The single terminal event a push channel ever carries.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionEvent {
    /// Download URL for the stored blob (absent on timeout).
    pub path: Option<String>,
    pub status: CompletionStatus,
}

struct Subscription {
    sender: mpsc::Sender<CompletionEvent>,
    registered_at: Instant,
}

/// Thread-safe registry of open push channels.
///
/// No buffering, no redelivery: a fulfillment with no matching subscriber
/// is a silent no-op, so notification is inherently best-effort against
/// subscription timing.
pub struct NotificationRegistry {
    channels: Mutex<HashMap<Uuid, Subscription>>,
}

impl NotificationRegistry {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Register an open channel for `id` and return its receiving end.
    ///
    /// A second subscribe for the same id overwrites the first; the
    /// replaced sender drops and its receiver observes a closed stream.
    pub fn subscribe(&self, id: Uuid) -> mpsc::Receiver<CompletionEvent> {
        // Capacity 1: a channel only ever carries its terminal event.
        let (tx, rx) = mpsc::channel(1);
        let replaced = self.channels.lock().unwrap().insert(
            id,
            Subscription {
                sender: tx,
                registered_at: Instant::now(),
            },
        );
        if replaced.is_some() {
            warn!(correlation_id = %id, "Subscription overwritten by re-subscribe");
        }
        debug!(correlation_id = %id, "Push channel registered");
        rx
    }

    /// Remove the channel for `id` without sending anything (client
    /// disconnected before fulfillment).
    pub fn unsubscribe(&self, id: Uuid) {
        if self.channels.lock().unwrap().remove(&id).is_some() {
            debug!(correlation_id = %id, "Push channel unregistered");
        }
    }

    /// Push the terminal event for `id` and close its channel.
    ///
    /// The registry entry is removed atomically with the terminal
    /// transition. Returns `false` (a silent no-op) when no channel is
    /// registered: the client never subscribed, already timed out, or
    /// disconnected.
    pub fn fulfill(&self, id: Uuid, event: CompletionEvent) -> bool {
        let subscription = self.channels.lock().unwrap().remove(&id);

        match subscription {
            Some(sub) => {
                // Capacity 1 and exactly one terminal event per channel, so
                // try_send can only fail if the receiver already hung up.
                match sub.sender.try_send(event) {
                    Ok(()) => {
                        info!(correlation_id = %id, "Completion event delivered");
                        true
                    }
                    Err(_) => {
                        debug!(correlation_id = %id, "Subscriber gone before delivery");
                        false
                    }
                }
            }
            None => {
                debug!(correlation_id = %id, "Fulfill with no subscriber, dropped");
                false
            }
        }
    }

    /// Close every subscription older than `max_age` with a `TimedOut`
    /// terminal event. Returns the number of channels reaped.
    ///
    /// Without this sweep an unfulfilled subscription is a lasting leak;
    /// only the client's own disconnect would ever end it.
    pub fn reap(&self, max_age: Duration) -> usize {
        let expired: Vec<(Uuid, Subscription)> = {
            let mut map = self.channels.lock().unwrap();
            let ids: Vec<Uuid> = map
                .iter()
                .filter(|(_, sub)| sub.registered_at.elapsed() > max_age)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| map.remove(&id).map(|sub| (id, sub)))
                .collect()
        };

        let count = expired.len();
        for (id, sub) in expired {
            warn!(correlation_id = %id, "Reaping expired subscription");
            let _ = sub.sender.try_send(CompletionEvent {
                path: None,
                status: CompletionStatus::TimedOut,
            });
        }
        count
    }

    /// Number of currently open channels.
    pub fn open_channels(&self) -> usize {
        self.channels.lock().unwrap().len()
    }
}

impl Default for NotificationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_event() -> CompletionEvent {
        CompletionEvent {
            path: Some("http://blobs.local/api/blobs/abc/file".to_string()),
            status: CompletionStatus::Complete,
        }
    }

    #[tokio::test]
    async fn test_subscribe_then_fulfill_delivers_exactly_one_event() {
        let registry = NotificationRegistry::new();
        let id = Uuid::new_v4();
        let mut rx = registry.subscribe(id);

        assert!(registry.fulfill(id, complete_event()));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.status, CompletionStatus::Complete);
        assert!(event.path.unwrap().contains("/file"));

        // Channel is closed and the registry entry is gone.
        assert!(rx.recv().await.is_none());
        assert_eq!(registry.open_channels(), 0);
    }

    #[tokio::test]
    async fn test_unfulfilled_subscription_stays_open() {
        let registry = NotificationRegistry::new();
        let id = Uuid::new_v4();
        let mut rx = registry.subscribe(id);

        assert_eq!(registry.open_channels(), 1);
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_fulfill_unknown_id_is_a_noop() {
        let registry = NotificationRegistry::new();
        assert!(!registry.fulfill(Uuid::new_v4(), complete_event()));
        assert_eq!(registry.open_channels(), 0);
    }

    #[tokio::test]
    async fn test_resubscribe_overwrites_previous_channel() {
        let registry = NotificationRegistry::new();
        let id = Uuid::new_v4();

        let mut first = registry.subscribe(id);
        let mut second = registry.subscribe(id);
        assert_eq!(registry.open_channels(), 1);

        // The replaced sender dropped: the first receiver sees a closed stream.
        assert!(first.recv().await.is_none());

        assert!(registry.fulfill(id, complete_event()));
        assert!(second.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_fulfill_after_subscriber_dropped_is_not_delivered() {
        let registry = NotificationRegistry::new();
        let id = Uuid::new_v4();

        let rx = registry.subscribe(id);
        drop(rx);

        assert!(!registry.fulfill(id, complete_event()));
    }

    #[tokio::test]
    async fn test_reap_closes_only_expired_channels() {
        let registry = NotificationRegistry::new();
        let old_id = Uuid::new_v4();
        let mut old_rx = registry.subscribe(old_id);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let fresh_id = Uuid::new_v4();
        let _fresh_rx = registry.subscribe(fresh_id);

        let reaped = registry.reap(Duration::from_millis(25));
        assert_eq!(reaped, 1);
        assert_eq!(registry.open_channels(), 1);

        let event = old_rx.recv().await.unwrap();
        assert_eq!(event.status, CompletionStatus::TimedOut);
        assert!(event.path.is_none());
    }
}
