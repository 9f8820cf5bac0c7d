// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound envelope and the Bot API update shapes the pipeline understands.
//!
//! The envelope keeps each update component as raw JSON. Components are decoded
//! one at a time by [`Update::components`], so a malformed reaction never prevents
//! the message in the same update from being recorded.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::Display;

use crate::error::LedgerError;
use crate::types::{ChatRecord, ChatType, MembershipStatus, UserRecord};

/// One unit of inbound work: a correlation id plus one platform update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Raw event id, echoed on the outcome event.
    pub event_id: String,
    #[serde(default)]
    pub update: Update,
}

/// A platform update with its sub-components still undecoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Update {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_reaction: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub my_chat_member: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_member: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<Value>,
}

/// Which sub-component of an update a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ComponentKind {
    Message,
    MessageReaction,
    MyChatMember,
    ChatMember,
    CallbackQuery,
}

/// A decoded update component.
#[derive(Debug, Clone)]
pub enum UpdateComponent {
    Message(Box<Message>),
    Reaction(MessageReactionUpdated),
    MyChatMember(ChatMemberUpdated),
    ChatMember(ChatMemberUpdated),
    /// Forwarded verbatim; never decoded.
    CallbackQuery(Value),
}

impl UpdateComponent {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::Message(_) => ComponentKind::Message,
            Self::Reaction(_) => ComponentKind::MessageReaction,
            Self::MyChatMember(_) => ComponentKind::MyChatMember,
            Self::ChatMember(_) => ComponentKind::ChatMember,
            Self::CallbackQuery(_) => ComponentKind::CallbackQuery,
        }
    }
}

/// A component that was present but could not be decoded.
#[derive(Debug)]
pub struct InvalidComponent {
    pub kind: ComponentKind,
    pub error: LedgerError,
}

impl Update {
    /// Decode the present components in processing order: message, reaction,
    /// my_chat_member, chat_member, callback_query.
    ///
    /// Absent components are omitted. Present but undecodable ones are returned
    /// as `Err` in their slot so the caller can log and skip them.
    pub fn components(&self) -> Vec<Result<UpdateComponent, InvalidComponent>> {
        let mut out = Vec::new();
        if let Some(raw) = &self.message {
            out.push(decode(ComponentKind::Message, raw).map(|m| UpdateComponent::Message(Box::new(m))));
        }
        if let Some(raw) = &self.message_reaction {
            out.push(decode(ComponentKind::MessageReaction, raw).map(UpdateComponent::Reaction));
        }
        if let Some(raw) = &self.my_chat_member {
            out.push(decode(ComponentKind::MyChatMember, raw).map(UpdateComponent::MyChatMember));
        }
        if let Some(raw) = &self.chat_member {
            out.push(decode(ComponentKind::ChatMember, raw).map(UpdateComponent::ChatMember));
        }
        if let Some(raw) = &self.callback_query {
            out.push(Ok(UpdateComponent::CallbackQuery(raw.clone())));
        }
        out
    }

    /// True when the update carries none of the components the pipeline handles.
    pub fn is_empty(&self) -> bool {
        self.message.is_none()
            && self.message_reaction.is_none()
            && self.my_chat_member.is_none()
            && self.chat_member.is_none()
            && self.callback_query.is_none()
    }
}

fn decode<T: DeserializeOwned>(kind: ComponentKind, raw: &Value) -> Result<T, InvalidComponent> {
    T::deserialize(raw).map_err(|e| InvalidComponent {
        kind,
        error: LedgerError::decode(format!("{kind}: {e}")),
    })
}

/// Convert a platform unix timestamp (seconds) to UTC.
pub fn unix_time(secs: i64) -> Result<DateTime<Utc>, LedgerError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| LedgerError::decode(format!("timestamp out of range: {secs}")))
}

/// Platform user as embedded in updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl User {
    /// The incoming side of a user merge. Photo fields are left empty.
    pub fn to_record(&self) -> UserRecord {
        UserRecord {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            username: self.username.clone(),
            is_bot: self.is_bot,
            photo: None,
            photo_file_id: None,
        }
    }
}

/// Platform chat as embedded in updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub invite_link: Option<String>,
}

impl Chat {
    pub fn to_record(&self) -> ChatRecord {
        ChatRecord {
            id: self.id,
            chat_type: self.chat_type,
            title: self.title.clone(),
            invite_link: self.invite_link.clone(),
            photo: None,
            photo_file_id: None,
            accent_color: None,
        }
    }
}

/// A chat message. Content fields stay raw; only their presence matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    pub date: i64,

    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub audio: Option<Value>,
    #[serde(default)]
    pub video: Option<Value>,
    #[serde(default)]
    pub video_note: Option<Value>,
    #[serde(default)]
    pub voice: Option<Value>,
    #[serde(default)]
    pub animation: Option<Value>,
    #[serde(default)]
    pub document: Option<Value>,
    #[serde(default)]
    pub photo: Option<Value>,
    #[serde(default)]
    pub sticker: Option<Value>,

    #[serde(default)]
    pub forward_origin: Option<Value>,
    #[serde(default)]
    pub forward_from: Option<Value>,
    #[serde(default)]
    pub reply_to_message: Option<Value>,

    #[serde(default)]
    pub new_chat_members: Option<Vec<User>>,
    #[serde(default)]
    pub left_chat_member: Option<User>,
    #[serde(default)]
    pub new_chat_title: Option<String>,
    #[serde(default)]
    pub new_chat_photo: Option<Value>,
    #[serde(default)]
    pub delete_chat_photo: bool,
}

impl Message {
    pub fn sent_at(&self) -> Result<DateTime<Utc>, LedgerError> {
        unix_time(self.date)
    }

    /// User id of the original sender of a forwarded message.
    ///
    /// Reads `forward_origin` of type `user` first, then the legacy
    /// `forward_from`. Any shape mismatch yields `None`.
    pub fn forward_origin_user_id(&self) -> Option<i64> {
        if let Some(origin) = &self.forward_origin {
            if origin.get("type").and_then(Value::as_str) == Some("user") {
                return origin
                    .get("sender_user")
                    .and_then(|u| u.get("id"))
                    .and_then(Value::as_i64);
            }
            return None;
        }
        self.forward_from
            .as_ref()
            .and_then(|u| u.get("id"))
            .and_then(Value::as_i64)
    }

    /// Platform message id of the replied-to message.
    pub fn reply_to_message_id(&self) -> Option<i64> {
        self.reply_to_message
            .as_ref()
            .and_then(|m| m.get("message_id"))
            .and_then(Value::as_i64)
    }
}

/// A change to one user's reactions on one message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReactionUpdated {
    pub chat: Chat,
    pub message_id: i64,
    /// Absent for anonymous reactions.
    #[serde(default)]
    pub user: Option<User>,
    pub date: i64,
    #[serde(default)]
    pub old_reaction: Vec<Value>,
    #[serde(default)]
    pub new_reaction: Vec<Value>,
}

impl MessageReactionUpdated {
    pub fn reacted_at(&self) -> Result<DateTime<Utc>, LedgerError> {
        unix_time(self.date)
    }

    /// An update that leaves the user with no reactions on the message.
    pub fn is_removal(&self) -> bool {
        self.new_reaction.is_empty()
    }
}

/// A membership status change, either of the bot itself or of another user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMemberUpdated {
    pub chat: Chat,
    /// The user who performed the change.
    pub from: User,
    pub date: i64,
    pub old_chat_member: ChatMember,
    pub new_chat_member: ChatMember,
}

impl ChatMemberUpdated {
    pub fn changed_at(&self) -> Result<DateTime<Utc>, LedgerError> {
        unix_time(self.date)
    }
}

/// A user's membership in a chat as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMember {
    pub user: User,
    pub status: MembershipStatus,
    #[serde(default)]
    pub custom_title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn group_message(extra: Value) -> Value {
        let mut base = json!({
            "message_id": 7,
            "from": {"id": 42, "is_bot": false, "first_name": "Ana"},
            "chat": {"id": -100, "type": "supergroup", "title": "Rustaceans"},
            "date": 1_700_000_000
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        base
    }

    #[test]
    fn components_follow_fixed_order() {
        let envelope: Envelope = serde_json::from_value(json!({
            "event_id": "e1",
            "update": {
                "callback_query": {"id": "cb"},
                "message": group_message(json!({"text": "hi"})),
            }
        }))
        .unwrap();
        let kinds: Vec<_> = envelope
            .update
            .components()
            .into_iter()
            .map(|c| c.map(|c| c.kind()).unwrap())
            .collect();
        assert_eq!(kinds, vec![ComponentKind::Message, ComponentKind::CallbackQuery]);
    }

    #[test]
    fn undecodable_component_does_not_hide_others() {
        let update: Update = serde_json::from_value(json!({
            "message": group_message(json!({"text": "hi"})),
            "message_reaction": {"chat": {"id": -100, "type": "group"}},
        }))
        .unwrap();
        let components = update.components();
        assert_eq!(components.len(), 2);
        assert!(components[0].is_ok());
        let err = components[1].as_ref().unwrap_err();
        assert_eq!(err.kind, ComponentKind::MessageReaction);
        assert!(!err.error.is_infrastructure());
    }

    #[test]
    fn empty_update_has_no_components() {
        let envelope: Envelope = serde_json::from_value(json!({"event_id": "e2"})).unwrap();
        assert!(envelope.update.is_empty());
        assert!(envelope.update.components().is_empty());
    }

    #[test]
    fn forward_origin_user_is_extracted() {
        let msg: Message = serde_json::from_value(group_message(json!({
            "forward_origin": {"type": "user", "date": 1, "sender_user": {"id": 99, "first_name": "B"}}
        })))
        .unwrap();
        assert_eq!(msg.forward_origin_user_id(), Some(99));
    }

    #[test]
    fn hidden_or_malformed_origin_is_not_a_user() {
        let hidden: Message = serde_json::from_value(group_message(json!({
            "forward_origin": {"type": "hidden_user", "sender_user_name": "x"}
        })))
        .unwrap();
        assert_eq!(hidden.forward_origin_user_id(), None);

        let malformed: Message = serde_json::from_value(group_message(json!({
            "forward_origin": {"type": "user", "sender_user": "nope"}
        })))
        .unwrap();
        assert_eq!(malformed.forward_origin_user_id(), None);

        let legacy: Message =
            serde_json::from_value(group_message(json!({"forward_from": {"id": 42}}))).unwrap();
        assert_eq!(legacy.forward_origin_user_id(), Some(42));
    }

    #[test]
    fn reply_reference_is_read_from_nested_message() {
        let msg: Message = serde_json::from_value(group_message(json!({
            "reply_to_message": {"message_id": 3, "chat": {"id": -100, "type": "supergroup"}, "date": 1}
        })))
        .unwrap();
        assert_eq!(msg.reply_to_message_id(), Some(3));
    }

    #[test]
    fn chat_member_update_decodes_statuses() {
        let update: ChatMemberUpdated = serde_json::from_value(json!({
            "chat": {"id": -100, "type": "group"},
            "from": {"id": 1, "first_name": "Admin"},
            "date": 1_700_000_000,
            "old_chat_member": {"user": {"id": 5, "first_name": "E"}, "status": "left"},
            "new_chat_member": {"user": {"id": 5, "first_name": "E"}, "status": "administrator", "custom_title": "ops"}
        }))
        .unwrap();
        assert_eq!(update.old_chat_member.status, MembershipStatus::Left);
        assert_eq!(update.new_chat_member.custom_title.as_deref(), Some("ops"));
    }

    #[test]
    fn out_of_range_timestamp_is_a_decode_error() {
        let err = unix_time(i64::MAX).unwrap_err();
        assert!(matches!(err, LedgerError::Decode { .. }));
    }
}
