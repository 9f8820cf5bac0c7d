// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for Bot API shaped updates.
//!
//! JSON builders produce what the platform would send; typed builders produce
//! the decoded wire structs.

use chatledger_core::update::{Chat, User};
use chatledger_core::{ChatType, Envelope};
use serde_json::{Value, json};

/// Unix time used for every fixture that does not take one.
pub const DATE: i64 = 1_700_000_000;

pub fn user(id: i64) -> User {
    User {
        id,
        is_bot: false,
        first_name: format!("User{id}"),
        last_name: None,
        username: None,
    }
}

/// A supergroup.
pub fn group(id: i64) -> Chat {
    Chat {
        id,
        chat_type: ChatType::Supergroup,
        title: Some(format!("Group {id}")),
        invite_link: None,
    }
}

pub fn user_json(id: i64) -> Value {
    json!({ "id": id, "is_bot": false, "first_name": format!("User{id}") })
}

pub fn group_json(id: i64) -> Value {
    json!({ "id": id, "type": "supergroup", "title": format!("Group {id}") })
}

pub fn private_json(id: i64) -> Value {
    json!({ "id": id, "type": "private", "first_name": format!("User{id}") })
}

/// A message from `user_id` in `chat`, with `content` fields merged in.
pub fn message(chat: Value, user_id: i64, message_id: i64, content: Value) -> Value {
    let mut msg = json!({
        "message_id": message_id,
        "from": user_json(user_id),
        "chat": chat,
        "date": DATE,
    });
    if let (Some(target), Value::Object(extra)) = (msg.as_object_mut(), content) {
        target.extend(extra);
    }
    msg
}

/// A text message in supergroup `chat_id`.
pub fn text_message(chat_id: i64, user_id: i64, message_id: i64, text: &str) -> Value {
    message(group_json(chat_id), user_id, message_id, json!({ "text": text }))
}

/// A `message_reaction` body. `emoji: None` clears the user's reactions.
pub fn reaction(chat_id: i64, user_id: i64, message_id: i64, emoji: Option<&str>) -> Value {
    let new_reaction: Vec<Value> = emoji
        .map(|e| json!({ "type": "emoji", "emoji": e }))
        .into_iter()
        .collect();
    json!({
        "chat": group_json(chat_id),
        "message_id": message_id,
        "user": user_json(user_id),
        "date": DATE + 60,
        "old_reaction": [],
        "new_reaction": new_reaction,
    })
}

/// A `chat_member` body: `performer` moved `user_id` from `old` to `new`.
pub fn member_update(
    chat_id: i64,
    user_id: i64,
    performer: i64,
    old: &str,
    new: &str,
    date: i64,
) -> Value {
    json!({
        "chat": group_json(chat_id),
        "from": user_json(performer),
        "date": date,
        "old_chat_member": { "user": user_json(user_id), "status": old },
        "new_chat_member": { "user": user_json(user_id), "status": new },
    })
}

/// Wrap one component under `field` (e.g. `"message"`) into an update.
pub fn update(field: &str, body: Value) -> Value {
    let mut update = json!({ "update_id": 1 });
    if let Some(map) = update.as_object_mut() {
        map.insert(field.to_string(), body);
    }
    update
}

/// Decode an envelope; panics on malformed fixtures.
pub fn envelope(event_id: &str, update: Value) -> Envelope {
    serde_json::from_value(json!({ "event_id": event_id, "update": update }))
        .expect("fixture envelope decodes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatledger_core::UpdateComponent;

    #[test]
    fn text_message_envelope_decodes() {
        let env = envelope("e1", update("message", text_message(-100, 42, 7, "hi")));
        let components = env.update.components();
        assert_eq!(components.len(), 1);
        let Ok(UpdateComponent::Message(msg)) = &components[0] else {
            panic!("expected message");
        };
        assert_eq!(msg.text.as_deref(), Some("hi"));
        assert_eq!(msg.from.as_ref().map(|u| u.id), Some(42));
    }

    #[test]
    fn cleared_reaction_has_empty_list() {
        let body = reaction(-100, 42, 7, None);
        assert_eq!(body["new_reaction"], json!([]));
    }
}
