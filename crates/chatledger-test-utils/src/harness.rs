// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline tests.
//!
//! `TestHarness` owns a temp SQLite database behind a real [`SqliteStore`] and
//! the in-memory doubles for the other collaborators.

use std::sync::Arc;

use chatledger_config::model::StorageConfig;
use chatledger_core::{
    ChatRecord, ChatType, EntityStore, LedgerError, Membership, MembershipStatus, UserRecord,
};
use chatledger_storage::SqliteStore;
use chrono::{DateTime, Utc};

use crate::doubles::{CountingLimiter, MemoryAssets, MockPlatform, RecordingBus};

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    accent_color: Option<String>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self { accent_color: None }
    }

    /// Accent colour the asset double reports for chat photos.
    pub fn with_accent(mut self, accent_color: &str) -> Self {
        self.accent_color = Some(accent_color.to_string());
        self
    }

    /// Build the harness, creating and migrating the temp database.
    pub async fn build(self) -> Result<TestHarness, LedgerError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| LedgerError::Storage { source: e.into() })?;
        let storage_config = StorageConfig {
            database_path: temp_dir.path().join("test.db").to_string_lossy().to_string(),
            wal_mode: true,
        };
        let store = Arc::new(SqliteStore::open(&storage_config).await?);

        let limiter = Arc::new(CountingLimiter::new());
        let platform = Arc::new(MockPlatform::new(limiter.clone()));
        let assets = Arc::new(match self.accent_color {
            Some(color) => MemoryAssets::with_accent(&color),
            None => MemoryAssets::default(),
        });

        Ok(TestHarness {
            store,
            bus: Arc::new(RecordingBus::new()),
            platform,
            assets,
            limiter,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete set of collaborators over a temp database.
pub struct TestHarness {
    pub store: Arc<SqliteStore>,
    pub bus: Arc<RecordingBus>,
    pub platform: Arc<MockPlatform>,
    pub assets: Arc<MemoryAssets>,
    /// Permits taken by `platform`.
    pub limiter: Arc<CountingLimiter>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Default harness; panics when the temp database cannot be created.
    pub async fn new() -> Self {
        Self::builder()
            .build()
            .await
            .expect("test harness should build")
    }

    pub async fn seed_user(&self, id: i64) {
        self.store
            .upsert_user(&UserRecord {
                id,
                first_name: format!("User{id}"),
                last_name: None,
                username: None,
                is_bot: false,
                photo: None,
                photo_file_id: None,
            })
            .await
            .expect("seed user");
    }

    /// Seed a supergroup.
    pub async fn seed_chat(&self, id: i64) {
        self.store
            .upsert_chat(&ChatRecord {
                id,
                chat_type: ChatType::Supergroup,
                title: Some(format!("Group {id}")),
                invite_link: None,
                photo: None,
                photo_file_id: None,
                accent_color: None,
            })
            .await
            .expect("seed chat");
    }

    /// Put the database in read-only mode so every later write fails with a
    /// storage error.
    pub async fn fail_store_writes(&self) {
        self.store
            .database()
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA query_only = ON;")?;
                Ok(())
            })
            .await
            .expect("enable query_only");
    }

    /// Seed user, chat and a membership row; returns the membership.
    pub async fn seed_membership(
        &self,
        user_id: i64,
        chat_id: i64,
        status: MembershipStatus,
        at: DateTime<Utc>,
    ) -> Membership {
        self.seed_user(user_id).await;
        self.seed_chat(chat_id).await;
        self.store
            .insert_membership(&Membership::observed(user_id, chat_id, status, at))
            .await
            .expect("seed membership");
        self.store
            .get_membership(user_id, chat_id)
            .await
            .expect("read membership")
            .expect("membership exists")
    }
}
