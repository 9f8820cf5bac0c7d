// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic doubles for the collaborator traits.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chatledger_bus::LocalBus;
use chatledger_core::platform::{ChatInfo, ChatMemberInfo, FileInfo, UserProfilePhotos};
use chatledger_core::{
    AssetKind, AssetStore, BusMessage, ChatId, EventBus, LedgerError, PlatformClient,
    RateLimiter, StoredAsset, UserId,
};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;

/// Bus that records every publish and forwards it to a [`LocalBus`].
#[derive(Default)]
pub struct RecordingBus {
    inner: LocalBus,
    published: Mutex<Vec<BusMessage>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every publish on `topic` fail.
    pub fn fail_topic(&self, topic: &str) {
        self.failing.lock().insert(topic.to_string());
    }

    pub fn published(&self) -> Vec<BusMessage> {
        self.published.lock().clone()
    }

    /// Payloads published on `topic`, oldest first.
    pub fn on(&self, topic: &str) -> Vec<Value> {
        self.published
            .lock()
            .iter()
            .filter(|m| m.topic == topic)
            .map(|m| m.payload.clone())
            .collect()
    }

    pub fn count(&self, topic: &str) -> usize {
        self.published.lock().iter().filter(|m| m.topic == topic).count()
    }

    /// Topics in publish order.
    pub fn topics(&self) -> Vec<String> {
        self.published.lock().iter().map(|m| m.topic.clone()).collect()
    }

    pub fn clear(&self) {
        self.published.lock().clear();
    }
}

impl EventBus for RecordingBus {
    fn publish(&self, topic: &str, payload: Value) -> Result<(), LedgerError> {
        if self.failing.lock().contains(topic) {
            return Err(LedgerError::bus(format!("{topic} unavailable")));
        }
        self.published.lock().push(BusMessage {
            topic: topic.to_string(),
            payload: payload.clone(),
        });
        self.inner.publish(topic, payload)
    }

    fn subscribe(&self, topic: &str) -> broadcast::Receiver<BusMessage> {
        self.inner.subscribe(topic)
    }
}

/// Rate limiter that grants immediately and counts grants.
#[derive(Debug, Default)]
pub struct CountingLimiter {
    acquired: AtomicUsize,
}

impl CountingLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateLimiter for CountingLimiter {
    async fn acquire(&self) {
        self.acquired.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct PlatformState {
    members: HashMap<(ChatId, UserId), ChatMemberInfo>,
    chats: HashMap<ChatId, ChatInfo>,
    photos: HashMap<UserId, UserProfilePhotos>,
    files: HashMap<String, FileInfo>,
    downloads: HashMap<String, Vec<u8>>,
    calls: Vec<String>,
}

/// Scripted platform client. Anything not scripted is "unavailable".
///
/// Every call, downloads included, takes a permit from the limiter.
pub struct MockPlatform {
    state: Mutex<PlatformState>,
    limiter: Arc<dyn RateLimiter>,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new(Arc::new(CountingLimiter::new()))
    }
}

impl MockPlatform {
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            state: Mutex::new(PlatformState::default()),
            limiter,
        }
    }

    pub fn set_chat_member(&self, chat_id: ChatId, user_id: UserId, member: ChatMemberInfo) {
        self.state.lock().members.insert((chat_id, user_id), member);
    }

    pub fn set_chat(&self, chat: ChatInfo) {
        self.state.lock().chats.insert(chat.id, chat);
    }

    pub fn set_profile_photos(&self, user_id: UserId, photos: UserProfilePhotos) {
        self.state.lock().photos.insert(user_id, photos);
    }

    /// Script `getFile` for `file_id` and the download behind it.
    pub fn set_file(&self, file_id: &str, file_path: &str, bytes: Vec<u8>) {
        let mut state = self.state.lock();
        state.files.insert(
            file_id.to_string(),
            FileInfo {
                file_id: file_id.to_string(),
                file_unique_id: None,
                file_size: Some(bytes.len() as u64),
                file_path: Some(file_path.to_string()),
            },
        );
        state.downloads.insert(file_path.to_string(), bytes);
    }

    /// Number of calls made to `method` (Bot API name, or `download`).
    pub fn calls(&self, method: &str) -> usize {
        self.state.lock().calls.iter().filter(|m| *m == method).count()
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.len()
    }

    async fn record(&self, method: &str) {
        self.limiter.acquire().await;
        self.state.lock().calls.push(method.to_string());
    }
}

#[async_trait]
impl PlatformClient for MockPlatform {
    async fn get_file(&self, file_id: &str) -> Option<FileInfo> {
        self.record("getFile").await;
        self.state.lock().files.get(file_id).cloned()
    }

    async fn get_chat(&self, chat_id: ChatId) -> Option<ChatInfo> {
        self.record("getChat").await;
        self.state.lock().chats.get(&chat_id).cloned()
    }

    async fn get_chat_member(&self, chat_id: ChatId, user_id: UserId) -> Option<ChatMemberInfo> {
        self.record("getChatMember").await;
        self.state.lock().members.get(&(chat_id, user_id)).cloned()
    }

    async fn get_user_profile_photos(&self, user_id: UserId) -> Option<UserProfilePhotos> {
        self.record("getUserProfilePhotos").await;
        self.state.lock().photos.get(&user_id).cloned()
    }

    async fn download_file(&self, file_path: &str) -> Option<Vec<u8>> {
        self.record("download").await;
        self.state.lock().downloads.get(file_path).cloned()
    }
}

/// One [`MemoryAssets::persist`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedAsset {
    pub kind: AssetKind,
    pub id: i64,
    pub bytes: Vec<u8>,
}

/// Asset store keeping bytes in memory. Chat assets get a fixed accent colour.
pub struct MemoryAssets {
    accent_color: String,
    persisted: Mutex<Vec<PersistedAsset>>,
    fail: Mutex<bool>,
}

impl Default for MemoryAssets {
    fn default() -> Self {
        Self::with_accent("#112233")
    }
}

impl MemoryAssets {
    pub fn with_accent(accent_color: &str) -> Self {
        Self {
            accent_color: accent_color.to_string(),
            persisted: Mutex::new(Vec::new()),
            fail: Mutex::new(false),
        }
    }

    /// Make subsequent writes fail.
    pub fn fail_writes(&self) {
        *self.fail.lock() = true;
    }

    pub fn persisted(&self) -> Vec<PersistedAsset> {
        self.persisted.lock().clone()
    }
}

#[async_trait]
impl AssetStore for MemoryAssets {
    async fn persist(
        &self,
        kind: AssetKind,
        id: i64,
        bytes: Vec<u8>,
    ) -> Result<StoredAsset, LedgerError> {
        if *self.fail.lock() {
            return Err(LedgerError::Asset {
                message: "disk full".into(),
                source: None,
            });
        }
        self.persisted.lock().push(PersistedAsset { kind, id, bytes });
        Ok(StoredAsset {
            path: format!("{kind}/{id}.jpg"),
            accent_color: (kind == AssetKind::Chat).then(|| self.accent_color.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recording_bus_records_and_delivers() {
        let bus = RecordingBus::new();
        let mut rx = bus.subscribe("a");
        bus.publish("a", serde_json::json!({"n": 1})).unwrap();

        assert_eq!(bus.count("a"), 1);
        assert_eq!(rx.recv().await.unwrap().payload["n"], 1);
    }

    #[test]
    fn failing_topic_is_not_recorded() {
        let bus = RecordingBus::new();
        bus.fail_topic("a");
        assert!(bus.publish("a", Value::Null).is_err());
        assert!(bus.publish("b", Value::Null).is_ok());
        assert_eq!(bus.topics(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn mock_platform_counts_calls_and_permits() {
        let limiter = Arc::new(CountingLimiter::new());
        let platform = MockPlatform::new(limiter.clone());
        platform.set_file("f1", "photos/f1.jpg", vec![9]);

        assert!(platform.get_chat(-1).await.is_none());
        let file = platform.get_file("f1").await.unwrap();
        let bytes = platform
            .download_file(file.file_path.as_deref().unwrap())
            .await;

        assert_eq!(bytes, Some(vec![9]));
        assert_eq!(platform.calls("getFile"), 1);
        assert_eq!(platform.total_calls(), 3);
        assert_eq!(limiter.acquired(), 3);
    }
}
