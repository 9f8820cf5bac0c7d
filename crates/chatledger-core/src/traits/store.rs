// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relational entity store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::LedgerError;
use crate::types::{
    ChatId, ChatRecord, InsertOutcome, Membership, MessageRecord, RawEvent, ReactionRecord,
    UpsertOutcome, UserId, UserRecord,
};

/// Row store for users, chats, memberships, messages, reactions and raw events.
///
/// Each method is atomic on its own. Uniqueness is enforced by the store:
/// one membership per (user, chat), one message per (chat, message_id), one
/// reaction per (chat, message row, user), one raw event per id.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // --- users ---

    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>, LedgerError>;

    /// Insert, or merge into the existing row with [`UserRecord::merge`].
    async fn upsert_user(&self, incoming: &UserRecord) -> Result<UpsertOutcome, LedgerError>;

    async fn set_user_photo(
        &self,
        id: UserId,
        photo: &str,
        photo_file_id: &str,
    ) -> Result<(), LedgerError>;

    // --- chats ---

    async fn get_chat(&self, id: ChatId) -> Result<Option<ChatRecord>, LedgerError>;

    /// Insert, or merge into the existing row with [`ChatRecord::merge`].
    async fn upsert_chat(&self, incoming: &ChatRecord) -> Result<UpsertOutcome, LedgerError>;

    async fn set_chat_details(
        &self,
        id: ChatId,
        title: Option<&str>,
        invite_link: Option<&str>,
    ) -> Result<(), LedgerError>;

    async fn set_chat_photo(
        &self,
        id: ChatId,
        photo: &str,
        photo_file_id: &str,
        accent_color: Option<&str>,
    ) -> Result<(), LedgerError>;

    // --- memberships ---

    async fn get_membership(
        &self,
        user_id: UserId,
        chat_id: ChatId,
    ) -> Result<Option<Membership>, LedgerError>;

    /// Insert unless a row for the (user, chat) pair already exists.
    async fn insert_membership(&self, membership: &Membership)
    -> Result<InsertOutcome, LedgerError>;

    /// Overwrite status, title, timestamps and attribution of row `membership.id`.
    async fn update_membership(&self, membership: &Membership) -> Result<(), LedgerError>;

    // --- messages ---

    async fn get_message(
        &self,
        chat_id: ChatId,
        message_id: i64,
    ) -> Result<Option<MessageRecord>, LedgerError>;

    async fn insert_message(&self, message: &MessageRecord) -> Result<InsertOutcome, LedgerError>;

    // --- reactions ---

    async fn get_reaction(
        &self,
        chat_id: ChatId,
        message_row_id: i64,
        user_id: UserId,
    ) -> Result<Option<ReactionRecord>, LedgerError>;

    async fn insert_reaction(&self, reaction: &ReactionRecord)
    -> Result<InsertOutcome, LedgerError>;

    /// Mark the reaction deleted. Returns whether a live row was changed.
    async fn delete_reaction(
        &self,
        chat_id: ChatId,
        message_row_id: i64,
        user_id: UserId,
    ) -> Result<bool, LedgerError>;

    // --- raw events ---

    async fn insert_raw_event(&self, event: &RawEvent) -> Result<InsertOutcome, LedgerError>;

    async fn get_raw_event(&self, id: &str) -> Result<Option<RawEvent>, LedgerError>;

    /// Record a successful dispatch. Returns false when the id is unknown.
    async fn mark_raw_event_processed(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, LedgerError>;

    /// Record a failed dispatch and bump the retry count. Returns false when the
    /// id is unknown.
    async fn mark_raw_event_failed(
        &self,
        id: &str,
        at: DateTime<Utc>,
        error_message: &str,
    ) -> Result<bool, LedgerError>;

    /// Atomically lease up to `limit` unprocessed platform rows that are pending,
    /// or failed with fewer than `max_retries` attempts, and whose lease is free.
    async fn claim_raw_events(
        &self,
        limit: usize,
        max_retries: u32,
        lease: Duration,
    ) -> Result<Vec<RawEvent>, LedgerError>;
}
