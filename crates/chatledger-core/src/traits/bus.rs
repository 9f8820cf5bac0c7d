// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Publish/subscribe transport.

use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::LedgerError;
use crate::events::BusEvent;

/// One delivered bus message.
#[derive(Debug, Clone, PartialEq)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Value,
}

/// Topic-addressed event transport with at-least-once delivery.
pub trait EventBus: Send + Sync {
    /// Publish a JSON payload. A topic nobody listens on is not an error.
    fn publish(&self, topic: &str, payload: Value) -> Result<(), LedgerError>;

    /// Subscribe to every future message on `topic`.
    fn subscribe(&self, topic: &str) -> broadcast::Receiver<BusMessage>;

    /// Publish a typed pipeline event on its topic.
    fn emit(&self, event: BusEvent) -> Result<(), LedgerError> {
        let payload = event
            .payload()
            .map_err(|e| LedgerError::bus(format!("encode {}: {e}", event.topic())))?;
        self.publish(event.topic(), payload)
    }
}
