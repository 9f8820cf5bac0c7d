// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Result shapes of the outbound Bot API calls.

use serde::{Deserialize, Serialize};

use crate::types::ChatType;

pub use crate::update::ChatMember as ChatMemberInfo;

/// `getFile` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub file_id: String,
    #[serde(default)]
    pub file_unique_id: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    /// Path relative to the file download endpoint; absent once the link expired.
    #[serde(default)]
    pub file_path: Option<String>,
}

/// `getChat` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatInfo {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub invite_link: Option<String>,
    #[serde(default)]
    pub photo: Option<ChatPhoto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPhoto {
    pub small_file_id: String,
    pub big_file_id: String,
}

/// `getUserProfilePhotos` result. Each photo is listed in ascending sizes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProfilePhotos {
    #[serde(default)]
    pub total_count: u32,
    #[serde(default)]
    pub photos: Vec<Vec<PhotoSize>>,
}

impl UserProfilePhotos {
    /// Largest size of the most recent photo.
    pub fn current(&self) -> Option<&PhotoSize> {
        self.photos.first().and_then(|sizes| sizes.last())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub file_unique_id: Option<String>,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub file_size: Option<u64>,
}
