// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store records and the pure merge rules applied when an entity is observed again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Platform user identifier.
pub type UserId = i64;

/// Platform chat identifier (negative for groups and supergroups).
pub type ChatId = i64;

/// Kind of chat an update was observed in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    Private,
    Group,
    Supergroup,
    Channel,
    #[serde(other)]
    Unknown,
}

impl ChatType {
    /// Group and supergroup chats are the only ones whose traffic is recorded.
    pub fn is_group(self) -> bool {
        matches!(self, Self::Group | Self::Supergroup)
    }
}

/// Membership status as reported by the platform.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl MembershipStatus {
    /// Whether the status means "currently present in the chat".
    pub fn is_member_class(self) -> bool {
        matches!(self, Self::Creator | Self::Administrator | Self::Member)
    }
}

/// Classified content type of a recorded message.
///
/// Declaration order is the classification priority.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Audio,
    Video,
    VideoNote,
    Voice,
    Animation,
    Document,
    Photo,
    Sticker,
    Other,
}

/// Processing status of a raw event row.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RawEventStatus {
    Pending,
    Done,
    Failed,
}

/// Result of an insert-or-update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No row existed before; the entity is first-seen.
    Inserted,
    /// An existing row was merged with the incoming values.
    Updated,
}

/// Result of a duplicate-safe insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The row was written; carries its row id.
    Inserted(i64),
    /// A row with the same unique key already existed; nothing was written.
    AlreadyExists,
}

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub is_bot: bool,
    /// Relative asset path of the stored profile photo.
    pub photo: Option<String>,
    pub photo_file_id: Option<String>,
}

impl UserRecord {
    /// Merge an incoming observation into the stored row.
    ///
    /// Non-empty names win, empty or missing names keep the stored value.
    /// `username` and `is_bot` always take the incoming value, absence included.
    /// Photo fields are only written by the sync path and are kept as stored.
    pub fn merge(existing: Option<&UserRecord>, incoming: UserRecord) -> UserRecord {
        let Some(existing) = existing else {
            return incoming;
        };
        UserRecord {
            id: existing.id,
            first_name: if incoming.first_name.is_empty() {
                existing.first_name.clone()
            } else {
                incoming.first_name
            },
            last_name: prefer_non_empty(incoming.last_name, existing.last_name.clone()),
            username: incoming.username,
            is_bot: incoming.is_bot,
            photo: existing.photo.clone(),
            photo_file_id: existing.photo_file_id.clone(),
        }
    }
}

/// A platform chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: ChatId,
    pub chat_type: ChatType,
    pub title: Option<String>,
    pub invite_link: Option<String>,
    /// Relative asset path of the stored chat photo.
    pub photo: Option<String>,
    pub photo_file_id: Option<String>,
    /// Dominant colour of the chat photo as `#rrggbb`.
    pub accent_color: Option<String>,
}

impl ChatRecord {
    /// Merge an incoming observation into the stored row.
    ///
    /// `title` and `invite_link` follow non-empty-wins, `chat_type` always
    /// replaces, photo fields are kept as stored.
    pub fn merge(existing: Option<&ChatRecord>, incoming: ChatRecord) -> ChatRecord {
        let Some(existing) = existing else {
            return incoming;
        };
        ChatRecord {
            id: existing.id,
            chat_type: incoming.chat_type,
            title: prefer_non_empty(incoming.title, existing.title.clone()),
            invite_link: prefer_non_empty(incoming.invite_link, existing.invite_link.clone()),
            photo: existing.photo.clone(),
            photo_file_id: existing.photo_file_id.clone(),
            accent_color: existing.accent_color.clone(),
        }
    }
}

/// Returns `incoming` when it holds a non-empty string, otherwise `existing`.
pub fn prefer_non_empty(incoming: Option<String>, existing: Option<String>) -> Option<String> {
    match incoming {
        Some(value) if !value.is_empty() => Some(value),
        _ => existing,
    }
}

/// Relation between one user and one chat.
///
/// `id` is assigned by the store; it is ignored on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: i64,
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub status: MembershipStatus,
    pub custom_title: Option<String>,
    pub joined_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
    pub added_by: Option<UserId>,
    pub removed_by: Option<UserId>,
}

impl Membership {
    /// A fresh membership row observed at `observed_at` with the given status.
    ///
    /// Rows created while the user is already gone get `left_at = observed_at`.
    pub fn observed(
        user_id: UserId,
        chat_id: ChatId,
        status: MembershipStatus,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            user_id,
            chat_id,
            status,
            custom_title: None,
            joined_at: None,
            left_at: (!status.is_member_class()).then_some(observed_at),
            added_by: None,
            removed_by: None,
        }
    }

    /// Timestamp of the most recent recorded class transition, if any.
    pub fn last_transition_at(&self) -> Option<DateTime<Utc>> {
        match (self.joined_at, self.left_at) {
            (Some(j), Some(l)) => Some(j.max(l)),
            (j, l) => j.or(l),
        }
    }
}

/// A recorded group message. Immutable once inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Store row id; ignored on insert.
    pub id: i64,
    pub chat_id: ChatId,
    /// Platform message id, unique within the chat.
    pub message_id: i64,
    pub membership_id: i64,
    pub user_id: UserId,
    pub date: DateTime<Utc>,
    /// Row id of the replied-to message, when it was recorded.
    pub reply_to_id: Option<i64>,
    pub message_type: MessageType,
    pub is_external_forward: bool,
}

/// A recorded reaction on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRecord {
    /// Store row id; ignored on insert.
    pub id: i64,
    pub chat_id: ChatId,
    /// Row id of the reacted-to message.
    pub message_row_id: i64,
    pub membership_id: i64,
    pub user_id: UserId,
    pub date: DateTime<Utc>,
    pub is_deleted: bool,
}

/// `source` of raw events that came from the chat platform. Only these are
/// replayed onto the update topic.
pub const TELEGRAM_SOURCE: &str = "telegram";

/// Durable record of one inbound envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: String,
    pub source: String,
    /// The platform update JSON as received.
    pub payload: String,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub status: RawEventStatus,
    pub error_message: Option<String>,
    pub retry_count: u32,
    /// Replay lease; a claimed row is not re-claimed before this instant.
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
