// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bus topics and the payloads published on them.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::types::{ChatId, UserId};

pub const TOPIC_UPDATE: &str = "telegram.update";
pub const TOPIC_UPDATE_PROCESSED: &str = "telegram.update.processed";
pub const TOPIC_UPDATE_FAILED: &str = "telegram.update.error_processing";
pub const TOPIC_SYNC_USER: &str = "telegram.sync.user";
pub const TOPIC_SYNC_CHAT: &str = "telegram.sync.chat";
pub const TOPIC_SYNC_CHATMEMBER: &str = "telegram.sync.chatmember";
pub const TOPIC_LEDGER: &str = "analytics.ledger";
pub const TOPIC_QUERY: &str = "youtube.query";
pub const TOPIC_CALLBACK: &str = "telegram.callback";

/// Ledger type for a resolved reply.
pub const LEDGER_REPLY: &str = "reply";
/// Ledger type for a new reaction.
pub const LEDGER_REACTION: &str = "reaction";

/// Timestamps on the bus are RFC 3339 with millisecond precision.
pub mod timestamp {
    use super::*;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    /// Accepts RFC 3339 and the offset-less ISO form some producers emit.
    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid timestamp {raw:?}: {e}"))
    }
}

/// `telegram.update.processed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateProcessed {
    pub event_id: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// `telegram.update.error_processing`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateFailed {
    pub event_id: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    pub error_message: String,
}

/// `telegram.sync.user`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncUser {
    pub user_id: UserId,
}

/// `telegram.sync.chat`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncChat {
    pub chat_id: ChatId,
}

/// `telegram.sync.chatmember`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncChatMember {
    pub user_id: UserId,
    pub chat_id: ChatId,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub performer: Option<UserId>,
}

/// `analytics.ledger`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub user_id: UserId,
    pub chat_id: ChatId,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub ledger_type: String,
}

/// `youtube.query`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequested {
    pub user_id: UserId,
    pub query: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Every event the pipeline publishes.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    Update(crate::update::Envelope),
    Processed(UpdateProcessed),
    Failed(UpdateFailed),
    SyncUser(SyncUser),
    SyncChat(SyncChat),
    SyncChatMember(SyncChatMember),
    Ledger(LedgerEntry),
    Query(QueryRequested),
    Callback(Value),
}

impl BusEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            Self::Update(_) => TOPIC_UPDATE,
            Self::Processed(_) => TOPIC_UPDATE_PROCESSED,
            Self::Failed(_) => TOPIC_UPDATE_FAILED,
            Self::SyncUser(_) => TOPIC_SYNC_USER,
            Self::SyncChat(_) => TOPIC_SYNC_CHAT,
            Self::SyncChatMember(_) => TOPIC_SYNC_CHATMEMBER,
            Self::Ledger(_) => TOPIC_LEDGER,
            Self::Query(_) => TOPIC_QUERY,
            Self::Callback(_) => TOPIC_CALLBACK,
        }
    }

    /// JSON payload as published on [`BusEvent::topic`].
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Update(e) => serde_json::to_value(e),
            Self::Processed(e) => serde_json::to_value(e),
            Self::Failed(e) => serde_json::to_value(e),
            Self::SyncUser(e) => serde_json::to_value(e),
            Self::SyncChat(e) => serde_json::to_value(e),
            Self::SyncChatMember(e) => serde_json::to_value(e),
            Self::Ledger(e) => serde_json::to_value(e),
            Self::Query(e) => serde_json::to_value(e),
            Self::Callback(v) => Ok(v.clone()),
        }
    }
}
