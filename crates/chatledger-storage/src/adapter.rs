// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of [`EntityStore`].

use std::time::Duration;

use async_trait::async_trait;
use chatledger_config::model::StorageConfig;
use chatledger_core::{
    ChatId, ChatRecord, EntityStore, InsertOutcome, LedgerError, Membership, MessageRecord,
    RawEvent, ReactionRecord, UpsertOutcome, UserId, UserRecord,
};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::database::Database;
use crate::queries;

/// Entity store over one SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the configured database, running migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, LedgerError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite store ready");
        Ok(Self::new(db))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn close(&self) -> Result<(), LedgerError> {
        self.db.close().await
    }
}

#[async_trait]
impl EntityStore for SqliteStore {
    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>, LedgerError> {
        queries::users::get_user(&self.db, id).await
    }

    async fn upsert_user(&self, incoming: &UserRecord) -> Result<UpsertOutcome, LedgerError> {
        queries::users::upsert_user(&self.db, incoming).await
    }

    async fn set_user_photo(
        &self,
        id: UserId,
        photo: &str,
        photo_file_id: &str,
    ) -> Result<(), LedgerError> {
        queries::users::set_user_photo(&self.db, id, photo, photo_file_id).await
    }

    async fn get_chat(&self, id: ChatId) -> Result<Option<ChatRecord>, LedgerError> {
        queries::chats::get_chat(&self.db, id).await
    }

    async fn upsert_chat(&self, incoming: &ChatRecord) -> Result<UpsertOutcome, LedgerError> {
        queries::chats::upsert_chat(&self.db, incoming).await
    }

    async fn set_chat_details(
        &self,
        id: ChatId,
        title: Option<&str>,
        invite_link: Option<&str>,
    ) -> Result<(), LedgerError> {
        queries::chats::set_chat_details(&self.db, id, title, invite_link).await
    }

    async fn set_chat_photo(
        &self,
        id: ChatId,
        photo: &str,
        photo_file_id: &str,
        accent_color: Option<&str>,
    ) -> Result<(), LedgerError> {
        queries::chats::set_chat_photo(&self.db, id, photo, photo_file_id, accent_color).await
    }

    async fn get_membership(
        &self,
        user_id: UserId,
        chat_id: ChatId,
    ) -> Result<Option<Membership>, LedgerError> {
        queries::memberships::get_membership(&self.db, user_id, chat_id).await
    }

    async fn insert_membership(
        &self,
        membership: &Membership,
    ) -> Result<InsertOutcome, LedgerError> {
        queries::memberships::insert_membership(&self.db, membership).await
    }

    async fn update_membership(&self, membership: &Membership) -> Result<(), LedgerError> {
        queries::memberships::update_membership(&self.db, membership).await
    }

    async fn get_message(
        &self,
        chat_id: ChatId,
        message_id: i64,
    ) -> Result<Option<MessageRecord>, LedgerError> {
        queries::messages::get_message(&self.db, chat_id, message_id).await
    }

    async fn insert_message(&self, message: &MessageRecord) -> Result<InsertOutcome, LedgerError> {
        queries::messages::insert_message(&self.db, message).await
    }

    async fn get_reaction(
        &self,
        chat_id: ChatId,
        message_row_id: i64,
        user_id: UserId,
    ) -> Result<Option<ReactionRecord>, LedgerError> {
        queries::reactions::get_reaction(&self.db, chat_id, message_row_id, user_id).await
    }

    async fn insert_reaction(
        &self,
        reaction: &ReactionRecord,
    ) -> Result<InsertOutcome, LedgerError> {
        queries::reactions::insert_reaction(&self.db, reaction).await
    }

    async fn delete_reaction(
        &self,
        chat_id: ChatId,
        message_row_id: i64,
        user_id: UserId,
    ) -> Result<bool, LedgerError> {
        queries::reactions::delete_reaction(&self.db, chat_id, message_row_id, user_id).await
    }

    async fn insert_raw_event(&self, event: &RawEvent) -> Result<InsertOutcome, LedgerError> {
        queries::raw_events::insert_raw_event(&self.db, event).await
    }

    async fn get_raw_event(&self, id: &str) -> Result<Option<RawEvent>, LedgerError> {
        queries::raw_events::get_raw_event(&self.db, id).await
    }

    async fn mark_raw_event_processed(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, LedgerError> {
        queries::raw_events::mark_processed(&self.db, id, at).await
    }

    async fn mark_raw_event_failed(
        &self,
        id: &str,
        at: DateTime<Utc>,
        error_message: &str,
    ) -> Result<bool, LedgerError> {
        queries::raw_events::mark_failed(&self.db, id, at, error_message).await
    }

    async fn claim_raw_events(
        &self,
        limit: usize,
        max_retries: u32,
        lease: Duration,
    ) -> Result<Vec<RawEvent>, LedgerError> {
        queries::raw_events::claim(&self.db, limit, max_retries, lease).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatledger_core::{ChatType, MembershipStatus, MessageType};

    async fn store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("ledger.db").display().to_string(),
            wal_mode: true,
        };
        (SqliteStore::open(&config).await.unwrap(), dir)
    }

    /// Seeds user 42, chat -100 and their membership; returns the membership id.
    async fn seed(store: &SqliteStore) -> i64 {
        store
            .upsert_user(&UserRecord {
                id: 42,
                first_name: "Ana".into(),
                last_name: None,
                username: None,
                is_bot: false,
                photo: None,
                photo_file_id: None,
            })
            .await
            .unwrap();
        store
            .upsert_chat(&ChatRecord {
                id: -100,
                chat_type: ChatType::Supergroup,
                title: Some("Rustaceans".into()),
                invite_link: None,
                photo: None,
                photo_file_id: None,
                accent_color: None,
            })
            .await
            .unwrap();
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        match store
            .insert_membership(&Membership::observed(42, -100, MembershipStatus::Member, at))
            .await
            .unwrap()
        {
            InsertOutcome::Inserted(id) => id,
            InsertOutcome::AlreadyExists => panic!("fresh database"),
        }
    }

    fn message(membership_id: i64, message_id: i64) -> MessageRecord {
        MessageRecord {
            id: 0,
            chat_id: -100,
            message_id,
            membership_id,
            user_id: 42,
            date: DateTime::from_timestamp(1_700_000_100, 0).unwrap(),
            reply_to_id: None,
            message_type: MessageType::Text,
            is_external_forward: false,
        }
    }

    #[tokio::test]
    async fn message_is_deduplicated_per_chat() {
        let (store, _dir) = store().await;
        let membership_id = seed(&store).await;

        let first = store.insert_message(&message(membership_id, 7)).await.unwrap();
        let InsertOutcome::Inserted(row_id) = first else {
            panic!("expected insert, got {first:?}");
        };
        assert_eq!(
            store.insert_message(&message(membership_id, 7)).await.unwrap(),
            InsertOutcome::AlreadyExists
        );

        let stored = store.get_message(-100, 7).await.unwrap().unwrap();
        assert_eq!(stored.id, row_id);
        assert_eq!(stored.message_type, MessageType::Text);
    }

    #[tokio::test]
    async fn reply_references_message_row() {
        let (store, _dir) = store().await;
        let membership_id = seed(&store).await;
        let InsertOutcome::Inserted(parent) =
            store.insert_message(&message(membership_id, 1)).await.unwrap()
        else {
            panic!("expected insert");
        };

        let mut reply = message(membership_id, 2);
        reply.reply_to_id = Some(parent);
        reply.message_type = MessageType::Sticker;
        store.insert_message(&reply).await.unwrap();

        let stored = store.get_message(-100, 2).await.unwrap().unwrap();
        assert_eq!(stored.reply_to_id, Some(parent));
        assert_eq!(stored.message_type, MessageType::Sticker);
    }

    #[tokio::test]
    async fn reaction_lifecycle() {
        let (store, _dir) = store().await;
        let membership_id = seed(&store).await;
        let InsertOutcome::Inserted(msg_row) =
            store.insert_message(&message(membership_id, 7)).await.unwrap()
        else {
            panic!("expected insert");
        };
        let reaction = ReactionRecord {
            id: 0,
            chat_id: -100,
            message_row_id: msg_row,
            membership_id,
            user_id: 42,
            date: DateTime::from_timestamp(1_700_000_200, 0).unwrap(),
            is_deleted: false,
        };

        assert!(matches!(
            store.insert_reaction(&reaction).await.unwrap(),
            InsertOutcome::Inserted(_)
        ));
        assert_eq!(
            store.insert_reaction(&reaction).await.unwrap(),
            InsertOutcome::AlreadyExists
        );

        assert!(store.delete_reaction(-100, msg_row, 42).await.unwrap());
        assert!(!store.delete_reaction(-100, msg_row, 42).await.unwrap());
        let deleted = store.get_reaction(-100, msg_row, 42).await.unwrap().unwrap();
        assert!(deleted.is_deleted);

        // Reacting again revives the same row.
        let revived = store.insert_reaction(&reaction).await.unwrap();
        assert_eq!(revived, InsertOutcome::Inserted(deleted.id));
        let live = store.get_reaction(-100, msg_row, 42).await.unwrap().unwrap();
        assert!(!live.is_deleted);
    }

    #[tokio::test]
    async fn membership_requires_known_user() {
        let (store, _dir) = store().await;
        let at = Utc::now();
        let orphan = Membership::observed(999, -999, MembershipStatus::Member, at);
        let err = store.insert_membership(&orphan).await.unwrap_err();
        assert!(err.is_infrastructure());
    }
}
