// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity resolution: idempotent upsert of users and chats.
//!
//! The first time an id is seen a sync request is published so the sync
//! workers can backfill photos and metadata.

use chatledger_core::events::{SyncChat, SyncUser};
use chatledger_core::update::{Chat, User};
use chatledger_core::{BusEvent, ChatId, LedgerError, UpsertOutcome, UserId};
use tracing::debug;

use crate::context::{Emitter, PipelineContext};

/// Upsert `user` and return its id. Publishes `telegram.sync.user` when new.
pub async fn resolve_user(
    ctx: &PipelineContext,
    out: &mut Emitter<'_>,
    user: &User,
) -> Result<UserId, LedgerError> {
    let outcome = ctx.store.upsert_user(&user.to_record()).await?;
    if outcome == UpsertOutcome::Inserted {
        debug!(user_id = user.id, "first-seen user");
        out.emit(BusEvent::SyncUser(SyncUser { user_id: user.id }));
    }
    Ok(user.id)
}

/// Upsert `chat` and return its id. Publishes `telegram.sync.chat` when new.
pub async fn resolve_chat(
    ctx: &PipelineContext,
    out: &mut Emitter<'_>,
    chat: &Chat,
) -> Result<ChatId, LedgerError> {
    let outcome = ctx.store.upsert_chat(&chat.to_record()).await?;
    if outcome == UpsertOutcome::Inserted {
        debug!(chat_id = chat.id, "first-seen chat");
        out.emit(BusEvent::SyncChat(SyncChat { chat_id: chat.id }));
    }
    Ok(chat.id)
}
