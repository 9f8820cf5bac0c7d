// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deduplicated recording of messages and reactions.

use chatledger_core::events::{
    LEDGER_REACTION, LEDGER_REPLY, LedgerEntry, QueryRequested, SyncChat, SyncChatMember,
};
use chatledger_core::update::{Message, MessageReactionUpdated};
use chatledger_core::{
    BusEvent, ChatId, ChatType, InsertOutcome, LedgerError, MembershipStatus, MessageRecord,
    ReactionRecord, UserId,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::classify::{classify, is_external_forward};
use crate::context::{Emitter, PipelineContext};
use crate::dispatcher::StepOutcome;
use crate::membership::{
    MembershipChange, apply_membership_update, resolve_membership, seed_membership,
};
use crate::resolver::{resolve_chat, resolve_user};

fn ledger(user_id: UserId, chat_id: ChatId, timestamp: DateTime<Utc>, kind: &str) -> BusEvent {
    BusEvent::Ledger(LedgerEntry {
        user_id,
        chat_id,
        timestamp,
        ledger_type: kind.to_string(),
    })
}

/// Record one message component.
pub async fn record_message(
    ctx: &PipelineContext,
    out: &mut Emitter<'_>,
    msg: &Message,
) -> Result<StepOutcome, LedgerError> {
    let Some(author) = &msg.from else {
        return Ok(StepOutcome::skipped("message without author"));
    };
    let at = msg.sent_at()?;
    let user_id = resolve_user(ctx, out, author).await?;

    match msg.chat.chat_type {
        ChatType::Private => {
            return Ok(match msg.text.as_deref().filter(|t| !t.is_empty()) {
                Some(text) => {
                    info!(user_id, "private query received");
                    out.emit(BusEvent::Query(QueryRequested {
                        user_id,
                        query: text.to_string(),
                        timestamp: Utc::now(),
                    }));
                    StepOutcome::Completed
                }
                None => StepOutcome::skipped("private message without text"),
            });
        }
        ChatType::Group | ChatType::Supergroup => {}
        ChatType::Channel | ChatType::Unknown => {
            return Ok(StepOutcome::skipped("message outside a group"));
        }
    }

    let chat_id = resolve_chat(ctx, out, &msg.chat).await?;
    let membership_id =
        resolve_membership(ctx, user_id, chat_id, at, MembershipStatus::Member).await?;

    if ctx.store.get_message(chat_id, msg.message_id).await?.is_some() {
        debug!(chat_id, message_id = msg.message_id, "duplicate message");
        return Ok(StepOutcome::skipped("duplicate message"));
    }

    let message_type = classify(msg);
    let external_forward = is_external_forward(msg, user_id);
    let reply_to_id = match msg.reply_to_message_id() {
        Some(parent) => ctx.store.get_message(chat_id, parent).await?.map(|m| m.id),
        None => None,
    };

    let record = MessageRecord {
        id: 0,
        chat_id,
        message_id: msg.message_id,
        membership_id,
        user_id,
        date: at,
        reply_to_id,
        message_type,
        is_external_forward: external_forward,
    };
    if ctx.store.insert_message(&record).await? == InsertOutcome::AlreadyExists {
        debug!(chat_id, message_id = msg.message_id, "message inserted concurrently");
        return Ok(StepOutcome::skipped("duplicate message"));
    }

    if !external_forward {
        out.emit(ledger(user_id, chat_id, at, &message_type.to_string()));
        if reply_to_id.is_some() {
            out.emit(ledger(user_id, chat_id, at, LEDGER_REPLY));
        }
    }

    record_service_fields(ctx, out, msg, chat_id, user_id, at).await?;
    Ok(StepOutcome::Completed)
}

/// Membership and chat metadata side effects of service messages.
///
/// A join or leave is applied as a class crossing attributed to the author.
/// A missing row is seeded on the other side of the crossing first.
async fn record_service_fields(
    ctx: &PipelineContext,
    out: &mut Emitter<'_>,
    msg: &Message,
    chat_id: ChatId,
    author_id: UserId,
    at: DateTime<Utc>,
) -> Result<(), LedgerError> {
    let joined = msg.new_chat_members.iter().flatten();
    let left = msg.left_chat_member.iter();
    let changes = joined
        .map(|u| (u, MembershipStatus::Member))
        .chain(left.map(|u| (u, MembershipStatus::Left)));

    for (member, status) in changes {
        let member_id = resolve_user(ctx, out, member).await?;
        let before = match status {
            MembershipStatus::Member => MembershipStatus::Left,
            _ => MembershipStatus::Member,
        };
        let current = seed_membership(ctx, member_id, chat_id, at, before).await?;
        if current.status.is_member_class() != status.is_member_class() {
            let change = MembershipChange {
                status,
                custom_title: current.custom_title,
                at,
                performer: Some(author_id),
            };
            apply_membership_update(ctx, member_id, chat_id, &change).await?;
        }
        out.emit(BusEvent::SyncChatMember(SyncChatMember {
            user_id: member_id,
            chat_id,
            timestamp: at,
            performer: Some(author_id),
        }));
    }

    if msg.new_chat_title.is_some() || msg.new_chat_photo.is_some() || msg.delete_chat_photo {
        out.emit(BusEvent::SyncChat(SyncChat { chat_id }));
    }
    Ok(())
}

/// Record one reaction component.
///
/// An update with an empty `new_reaction` list removes the stored reaction.
pub async fn record_reaction(
    ctx: &PipelineContext,
    out: &mut Emitter<'_>,
    reaction: &MessageReactionUpdated,
) -> Result<StepOutcome, LedgerError> {
    let Some(author) = &reaction.user else {
        return Ok(StepOutcome::skipped("anonymous reaction"));
    };
    if !reaction.chat.chat_type.is_group() {
        return Ok(StepOutcome::skipped("reaction outside a group"));
    }
    let at = reaction.reacted_at()?;
    let chat_id = reaction.chat.id;

    let Some(message) = ctx.store.get_message(chat_id, reaction.message_id).await? else {
        debug!(chat_id, message_id = reaction.message_id, "reaction on unknown message");
        return Ok(StepOutcome::skipped("reaction on unknown message"));
    };

    let user_id = resolve_user(ctx, out, author).await?;

    if reaction.is_removal() {
        let removed = ctx.store.delete_reaction(chat_id, message.id, user_id).await?;
        return Ok(if removed {
            StepOutcome::Completed
        } else {
            StepOutcome::skipped("no reaction to remove")
        });
    }

    if ctx
        .store
        .get_reaction(chat_id, message.id, user_id)
        .await?
        .is_some_and(|r| !r.is_deleted)
    {
        return Ok(StepOutcome::skipped("duplicate reaction"));
    }

    let membership_id =
        resolve_membership(ctx, user_id, chat_id, at, MembershipStatus::Member).await?;
    let record = ReactionRecord {
        id: 0,
        chat_id,
        message_row_id: message.id,
        membership_id,
        user_id,
        date: at,
        is_deleted: false,
    };
    match ctx.store.insert_reaction(&record).await? {
        InsertOutcome::Inserted(_) => {
            out.emit(ledger(user_id, chat_id, at, LEDGER_REACTION));
            Ok(StepOutcome::Completed)
        }
        InsertOutcome::AlreadyExists => Ok(StepOutcome::skipped("duplicate reaction")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyncWorker;
    use crate::testing;
    use chatledger_core::events::{TOPIC_LEDGER, TOPIC_QUERY, TOPIC_SYNC_CHAT, TOPIC_SYNC_CHATMEMBER};
    use chatledger_core::platform::ChatMemberInfo;
    use chatledger_core::{EntityStore, MessageType};
    use chatledger_test_utils::TestHarness;
    use chatledger_test_utils::fixtures::{self, group_json, private_json};
    use serde_json::{Value, json};

    async fn record(h: &TestHarness, msg: Value) -> StepOutcome {
        let ctx = testing::context(h);
        let mut out = Emitter::new(ctx.bus.as_ref());
        let msg: Message = serde_json::from_value(msg).unwrap();
        record_message(&ctx, &mut out, &msg).await.unwrap()
    }

    async fn react(h: &TestHarness, body: Value) -> StepOutcome {
        let ctx = testing::context(h);
        let mut out = Emitter::new(ctx.bus.as_ref());
        let body: MessageReactionUpdated = serde_json::from_value(body).unwrap();
        record_reaction(&ctx, &mut out, &body).await.unwrap()
    }

    fn ledger_types(h: &TestHarness) -> Vec<String> {
        h.bus
            .on(TOPIC_LEDGER)
            .iter()
            .map(|p| p["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test]
    async fn group_text_is_recorded_once() {
        let h = TestHarness::new().await;
        let msg = fixtures::text_message(-100, 42, 7, "hello");

        assert_eq!(record(&h, msg.clone()).await, StepOutcome::Completed);
        assert_eq!(
            record(&h, msg).await,
            StepOutcome::skipped("duplicate message")
        );

        let stored = h.store.get_message(-100, 7).await.unwrap().unwrap();
        assert_eq!(stored.message_type, MessageType::Text);
        assert_eq!(ledger_types(&h), vec!["text"]);
    }

    #[tokio::test]
    async fn missing_author_is_skipped() {
        let h = TestHarness::new().await;
        let mut msg = fixtures::text_message(-100, 42, 7, "hello");
        msg.as_object_mut().unwrap().remove("from");

        assert!(matches!(record(&h, msg).await, StepOutcome::Skipped { .. }));
        assert!(h.bus.published().is_empty());
    }

    #[tokio::test]
    async fn private_text_becomes_query() {
        let h = TestHarness::new().await;
        let msg = fixtures::message(private_json(42), 42, 1, json!({"text": "lofi beats"}));

        assert_eq!(record(&h, msg).await, StepOutcome::Completed);
        let queries = h.bus.on(TOPIC_QUERY);
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0]["query"], "lofi beats");
        assert_eq!(queries[0]["user_id"], 42);
        assert!(h.store.get_chat(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn private_sticker_is_skipped() {
        let h = TestHarness::new().await;
        let msg = fixtures::message(private_json(42), 42, 1, json!({"sticker": {}}));
        assert!(matches!(record(&h, msg).await, StepOutcome::Skipped { .. }));
        assert_eq!(h.bus.count(TOPIC_QUERY), 0);
    }

    #[tokio::test]
    async fn external_forward_emits_no_ledger() {
        let h = TestHarness::new().await;
        let msg = fixtures::message(
            group_json(-100),
            42,
            7,
            json!({"text": "fwd", "forward_origin": {"type": "user", "sender_user": {"id": 99}}}),
        );

        assert_eq!(record(&h, msg).await, StepOutcome::Completed);
        assert!(h.store.get_message(-100, 7).await.unwrap().unwrap().is_external_forward);
        assert!(ledger_types(&h).is_empty());
    }

    #[tokio::test]
    async fn reply_resolves_parent_and_emits_reply_ledger() {
        let h = TestHarness::new().await;
        record(&h, fixtures::text_message(-100, 42, 1, "parent")).await;
        let reply = fixtures::message(
            group_json(-100),
            43,
            2,
            json!({"text": "child", "reply_to_message": {"message_id": 1}}),
        );
        record(&h, reply).await;

        let parent = h.store.get_message(-100, 1).await.unwrap().unwrap();
        let child = h.store.get_message(-100, 2).await.unwrap().unwrap();
        assert_eq!(child.reply_to_id, Some(parent.id));
        assert_eq!(ledger_types(&h), vec!["text", "text", "reply"]);
    }

    #[tokio::test]
    async fn reply_to_unknown_message_is_tolerated() {
        let h = TestHarness::new().await;
        let reply = fixtures::message(
            group_json(-100),
            43,
            2,
            json!({"text": "child", "reply_to_message": {"message_id": 999}}),
        );
        assert_eq!(record(&h, reply).await, StepOutcome::Completed);
        assert_eq!(h.store.get_message(-100, 2).await.unwrap().unwrap().reply_to_id, None);
        assert_eq!(ledger_types(&h), vec!["text"]);
    }

    #[tokio::test]
    async fn join_message_requests_member_sync() {
        let h = TestHarness::new().await;
        let msg = fixtures::message(
            group_json(-100),
            7,
            3,
            json!({"new_chat_members": [fixtures::user_json(42), fixtures::user_json(43)]}),
        );

        record(&h, msg).await;

        let syncs = h.bus.on(TOPIC_SYNC_CHATMEMBER);
        assert_eq!(syncs.len(), 2);
        assert_eq!(syncs[0]["user_id"], 42);
        assert_eq!(syncs[0]["performer"], 7);
        let m = h.store.get_membership(43, -100).await.unwrap().unwrap();
        assert_eq!(m.status, MembershipStatus::Member);
    }

    #[tokio::test]
    async fn join_message_attributes_author_after_member_sync() {
        let h = TestHarness::new().await;
        h.platform.set_chat_member(
            -100,
            42,
            ChatMemberInfo {
                user: fixtures::user(42),
                status: MembershipStatus::Member,
                custom_title: None,
            },
        );
        let msg = fixtures::message(
            group_json(-100),
            7,
            3,
            json!({"new_chat_members": [fixtures::user_json(42)]}),
        );
        record(&h, msg).await;

        let request: SyncChatMember =
            serde_json::from_value(h.bus.on(TOPIC_SYNC_CHATMEMBER)[0].clone()).unwrap();
        SyncWorker::new(testing::context(&h))
            .sync_chat_member(&request)
            .await;

        let m = h.store.get_membership(42, -100).await.unwrap().unwrap();
        assert_eq!(m.status, MembershipStatus::Member);
        assert_eq!(m.joined_at, DateTime::from_timestamp(fixtures::DATE, 0));
        assert_eq!(m.added_by, Some(7));
    }

    #[tokio::test]
    async fn left_message_attributes_remover() {
        let h = TestHarness::new().await;
        let msg = fixtures::message(
            group_json(-100),
            7,
            3,
            json!({"left_chat_member": fixtures::user_json(42)}),
        );
        record(&h, msg).await;

        let m = h.store.get_membership(42, -100).await.unwrap().unwrap();
        assert_eq!(m.status, MembershipStatus::Left);
        assert_eq!(m.left_at, DateTime::from_timestamp(fixtures::DATE, 0));
        assert_eq!(m.removed_by, Some(7));
    }

    #[tokio::test]
    async fn join_message_keeps_existing_admin() {
        let h = TestHarness::new().await;
        h.platform.set_chat_member(
            -100,
            42,
            ChatMemberInfo {
                user: fixtures::user(42),
                status: MembershipStatus::Administrator,
                custom_title: None,
            },
        );
        record(&h, fixtures::text_message(-100, 42, 1, "hi")).await;
        let msg = fixtures::message(
            group_json(-100),
            7,
            3,
            json!({"new_chat_members": [fixtures::user_json(42)]}),
        );
        record(&h, msg).await;

        let m = h.store.get_membership(42, -100).await.unwrap().unwrap();
        assert_eq!(m.status, MembershipStatus::Administrator);
        assert_eq!(m.added_by, None);
    }

    #[tokio::test]
    async fn left_message_falls_back_to_left() {
        let h = TestHarness::new().await;
        let msg = fixtures::message(
            group_json(-100),
            7,
            3,
            json!({"left_chat_member": fixtures::user_json(42)}),
        );
        record(&h, msg).await;

        let m = h.store.get_membership(42, -100).await.unwrap().unwrap();
        assert_eq!(m.status, MembershipStatus::Left);
        assert!(m.left_at.is_some());
        assert_eq!(h.bus.count(TOPIC_SYNC_CHATMEMBER), 1);
    }

    #[tokio::test]
    async fn title_change_requests_chat_sync() {
        let h = TestHarness::new().await;
        record(&h, fixtures::text_message(-100, 42, 1, "hi")).await;
        h.bus.clear();

        let msg = fixtures::message(group_json(-100), 42, 2, json!({"new_chat_title": "New"}));
        record(&h, msg).await;
        assert_eq!(h.bus.count(TOPIC_SYNC_CHAT), 1);
    }

    #[tokio::test]
    async fn reaction_on_unknown_message_is_dropped() {
        let h = TestHarness::new().await;
        let outcome = react(&h, fixtures::reaction(-100, 42, 7, Some("👍"))).await;

        assert!(matches!(outcome, StepOutcome::Skipped { .. }));
        assert!(ledger_types(&h).is_empty());
    }

    #[tokio::test]
    async fn reaction_is_deduplicated_and_removable() {
        let h = TestHarness::new().await;
        record(&h, fixtures::text_message(-100, 42, 7, "hi")).await;
        h.bus.clear();

        assert_eq!(
            react(&h, fixtures::reaction(-100, 43, 7, Some("👍"))).await,
            StepOutcome::Completed
        );
        assert!(matches!(
            react(&h, fixtures::reaction(-100, 43, 7, Some("🔥"))).await,
            StepOutcome::Skipped { .. }
        ));
        assert_eq!(ledger_types(&h), vec!["reaction"]);

        assert_eq!(
            react(&h, fixtures::reaction(-100, 43, 7, None)).await,
            StepOutcome::Completed
        );
        let row = h.store.get_message(-100, 7).await.unwrap().unwrap();
        let reaction = h.store.get_reaction(-100, row.id, 43).await.unwrap().unwrap();
        assert!(reaction.is_deleted);
        assert_eq!(ledger_types(&h), vec!["reaction"]);

        // Reacting again after removal counts as a new reaction.
        react(&h, fixtures::reaction(-100, 43, 7, Some("👍"))).await;
        assert_eq!(ledger_types(&h), vec!["reaction", "reaction"]);
    }
}
