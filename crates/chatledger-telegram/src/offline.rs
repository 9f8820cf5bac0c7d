// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform client for deployments without a bot token.

use async_trait::async_trait;
use chatledger_core::platform::{ChatInfo, ChatMemberInfo, FileInfo, UserProfilePhotos};
use chatledger_core::{ChatId, PlatformClient, UserId};

/// Answers every lookup with "unavailable", so callers take their fallbacks.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflinePlatform;

#[async_trait]
impl PlatformClient for OfflinePlatform {
    async fn get_file(&self, _file_id: &str) -> Option<FileInfo> {
        None
    }

    async fn get_chat(&self, _chat_id: ChatId) -> Option<ChatInfo> {
        None
    }

    async fn get_chat_member(&self, _chat_id: ChatId, _user_id: UserId) -> Option<ChatMemberInfo> {
        None
    }

    async fn get_user_profile_photos(&self, _user_id: UserId) -> Option<UserProfilePhotos> {
        None
    }

    async fn download_file(&self, _file_path: &str) -> Option<Vec<u8>> {
        None
    }
}
