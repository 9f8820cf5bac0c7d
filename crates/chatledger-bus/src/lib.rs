// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process topic bus.
//!
//! One `tokio::sync::broadcast` channel per topic, created on first use by either
//! side. Subscribers only see messages published after they subscribed; a
//! subscriber that falls more than `capacity` messages behind loses the oldest
//! ones and observes `RecvError::Lagged`.

use std::collections::HashMap;

use chatledger_core::{BusMessage, EventBus, LedgerError};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::trace;

/// Default per-topic buffer.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug)]
pub struct LocalBus {
    capacity: usize,
    topics: RwLock<HashMap<String, broadcast::Sender<BusMessage>>>,
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LocalBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            topics: RwLock::new(HashMap::new()),
        }
    }

    fn sender_for(&self, topic: &str) -> broadcast::Sender<BusMessage> {
        if let Some(sender) = self.topics.read().get(topic) {
            return sender.clone();
        }
        self.topics
            .write()
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Number of live subscribers on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .read()
            .get(topic)
            .map_or(0, |sender| sender.receiver_count())
    }
}

impl EventBus for LocalBus {
    fn publish(&self, topic: &str, payload: Value) -> Result<(), LedgerError> {
        let message = BusMessage {
            topic: topic.to_string(),
            payload,
        };
        // `send` only fails when nobody is subscribed, which is not an error here.
        match self.sender_for(topic).send(message) {
            Ok(receivers) => trace!(topic, receivers, "published"),
            Err(_) => trace!(topic, "published with no subscribers"),
        }
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> broadcast::Receiver<BusMessage> {
        self.sender_for(topic).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatledger_core::events::{BusEvent, SyncChat, TOPIC_SYNC_CHAT};
    use serde_json::json;

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = LocalBus::default();
        let mut sub = bus.subscribe("telegram.update");
        bus.publish("telegram.update", json!({"event_id": "e1"}))
            .unwrap();

        let msg = sub.recv().await.unwrap();
        assert_eq!(msg.topic, "telegram.update");
        assert_eq!(msg.payload["event_id"], "e1");
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let bus = LocalBus::new(4);
        assert!(bus.publish("analytics.ledger", json!({})).is_ok());
        assert_eq!(bus.subscriber_count("analytics.ledger"), 0);
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let bus = LocalBus::default();
        let mut users = bus.subscribe("telegram.sync.user");
        let mut chats = bus.subscribe(TOPIC_SYNC_CHAT);

        bus.emit(BusEvent::SyncChat(SyncChat { chat_id: -100 }))
            .unwrap();

        let msg = chats.recv().await.unwrap();
        assert_eq!(msg.payload, json!({"chat_id": -100}));
        assert!(matches!(
            users.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn every_subscriber_gets_a_copy() {
        let bus = LocalBus::default();
        let mut a = bus.subscribe("t");
        let mut b = bus.subscribe("t");
        assert_eq!(bus.subscriber_count("t"), 2);

        bus.publish("t", json!(1)).unwrap();
        assert_eq!(a.recv().await.unwrap().payload, json!(1));
        assert_eq!(b.recv().await.unwrap().payload, json!(1));
    }

    #[tokio::test]
    async fn slow_subscriber_lags() {
        let bus = LocalBus::new(2);
        let mut sub = bus.subscribe("t");
        for i in 0..4 {
            bus.publish("t", json!(i)).unwrap();
        }
        assert!(matches!(
            sub.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        assert_eq!(sub.recv().await.unwrap().payload, json!(2));
    }
}
