// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound platform API.

use async_trait::async_trait;

use crate::platform::{ChatInfo, ChatMemberInfo, FileInfo, UserProfilePhotos};
use crate::types::{ChatId, UserId};

/// Rate-limited request/response client for the messaging platform.
///
/// Every operation returns `None` when the platform reports failure or the
/// call cannot be completed. Callers treat that as "no update available".
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn get_file(&self, file_id: &str) -> Option<FileInfo>;

    async fn get_chat(&self, chat_id: ChatId) -> Option<ChatInfo>;

    async fn get_chat_member(&self, chat_id: ChatId, user_id: UserId) -> Option<ChatMemberInfo>;

    async fn get_user_profile_photos(&self, user_id: UserId) -> Option<UserProfilePhotos>;

    /// Fetch the bytes behind a `FileInfo::file_path`.
    async fn download_file(&self, file_path: &str) -> Option<Vec<u8>>;
}
