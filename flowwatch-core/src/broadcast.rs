//! Topic-addressed fan-out of JSON payloads.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Default per-subscriber queue depth.
pub const DEFAULT_CAPACITY: usize = 64;

/// One published payload, as delivered to a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub topic: String,
    pub payload: serde_json::Value,
}

/// The publishing side of the broadcast channel.
///
/// Publishing is best effort and never blocks: implementations drop rather
/// than wait, and never report per-subscriber failures to the caller.
pub trait Publish: Send + Sync {
    fn publish(&self, topic: &str, payload: serde_json::Value);
}

/// Serialize `value` and publish it. A value that fails to serialize is
/// logged and skipped.
pub fn publish_json<P, T>(publisher: &P, topic: &str, value: &T)
where
    P: Publish + ?Sized,
    T: Serialize + ?Sized,
{
    match serde_json::to_value(value) {
        Ok(payload) => publisher.publish(topic, payload),
        Err(e) => warn!(topic, error = %e, "dropping unserializable payload"),
    }
}

/// In-process broadcaster backed by bounded tokio channels.
///
/// Each subscriber gets its own queue. A subscriber whose queue is full
/// misses the message; one that has been dropped is removed on the next
/// publish to its topic. Late subscribers get no replay.
///
/// # Example
///
/// ```rust
/// use flowwatch_core::{Broadcaster, Publish};
///
/// # tokio_test::block_on(async {
/// let broadcaster = Broadcaster::new();
/// let mut sub = broadcaster.subscribe("kpi-summary");
///
/// broadcaster.publish("kpi-summary", serde_json::json!({"total": 1}));
///
/// let message = sub.recv().await.unwrap();
/// assert_eq!(message.payload["total"], 1);
/// # });
/// ```
#[derive(Debug)]
pub struct Broadcaster {
    subscribers: RwLock<BTreeMap<String, Vec<mpsc::Sender<Message>>>>,
    capacity: usize,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a broadcaster whose subscriber queues hold `capacity` messages.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(BTreeMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self, topic: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscribers
            .write()
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        debug!(topic, "subscriber added");
        Subscription {
            topic: topic.to_string(),
            receiver: rx,
        }
    }

    /// Number of live subscribers on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscribers
            .read()
            .get(topic)
            .map_or(0, |subs| subs.iter().filter(|tx| !tx.is_closed()).count())
    }

    fn prune(&self, topic: &str) {
        let mut subscribers = self.subscribers.write();
        if let Some(subs) = subscribers.get_mut(topic) {
            subs.retain(|tx| !tx.is_closed());
            if subs.is_empty() {
                subscribers.remove(topic);
            }
        }
    }
}

impl Publish for Broadcaster {
    fn publish(&self, topic: &str, payload: serde_json::Value) {
        let mut closed = false;
        {
            let subscribers = self.subscribers.read();
            let Some(subs) = subscribers.get(topic) else {
                return;
            };

            let message = Message {
                topic: topic.to_string(),
                payload,
            };
            for tx in subs {
                match tx.try_send(message.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!(topic, "subscriber queue full, dropping message");
                    }
                    Err(TrySendError::Closed(_)) => closed = true,
                }
            }
            debug!(topic, subscribers = subs.len(), "published");
        }

        if closed {
            self.prune(topic);
        }
    }
}

/// Receiving end of a topic subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    receiver: mpsc::Receiver<Message>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Wait for the next message. Returns `None` once the broadcaster is gone.
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }

    /// Take a queued message without waiting.
    pub fn try_recv(&mut self) -> Option<Message> {
        self.receiver.try_recv().ok()
    }
}
