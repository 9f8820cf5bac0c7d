// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Telegram Bot API.
//!
//! Every call waits on the shared [`RateLimiter`] first. Transport failures,
//! non-JSON bodies and `ok: false` replies are logged and surface as `None`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chatledger_config::model::TelegramConfig;
use chatledger_core::platform::{ChatInfo, ChatMemberInfo, FileInfo, UserProfilePhotos};
use chatledger_core::{ChatId, LedgerError, PlatformClient, RateLimiter, UserId};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

/// Bot API client implementing [`PlatformClient`].
#[derive(Clone)]
pub struct BotApiClient {
    client: reqwest::Client,
    /// `<api_base_url>/bot<token>`
    api_url: String,
    /// `<file_base_url>/bot<token>`
    file_url: String,
    limiter: Arc<dyn RateLimiter>,
}

impl std::fmt::Debug for BotApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // URLs embed the token.
        f.debug_struct("BotApiClient").finish_non_exhaustive()
    }
}

impl BotApiClient {
    /// Build a client from config. Requires `telegram.bot_token`.
    pub fn new(config: &TelegramConfig, limiter: Arc<dyn RateLimiter>) -> Result<Self, LedgerError> {
        let token = config
            .bot_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| LedgerError::Config("telegram.bot_token is required".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LedgerError::Platform {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            api_url: format!("{}/bot{token}", config.api_base_url.trim_end_matches('/')),
            file_url: format!("{}/bot{token}", config.file_base_url.trim_end_matches('/')),
            limiter,
        })
    }

    /// Invoke a Bot API method with JSON parameters.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Option<T> {
        self.limiter.acquire().await;

        let url = format!("{}/{method}", self.api_url);
        debug!(method, "calling Bot API");
        let response = match self.client.post(&url).json(&params).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(method, error = %e.without_url(), "Bot API request failed");
                return None;
            }
        };

        let status = response.status();
        let body: ApiResponse<T> = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(method, %status, error = %e.without_url(), "unreadable Bot API response");
                return None;
            }
        };

        if !body.ok {
            warn!(
                method,
                %status,
                error_code = body.error_code,
                description = body.description.as_deref().unwrap_or(""),
                "Bot API call rejected"
            );
            return None;
        }
        if body.result.is_none() {
            warn!(method, "Bot API call returned no result");
        }
        body.result
    }
}

#[async_trait]
impl PlatformClient for BotApiClient {
    async fn get_file(&self, file_id: &str) -> Option<FileInfo> {
        self.call("getFile", json!({ "file_id": file_id })).await
    }

    async fn get_chat(&self, chat_id: ChatId) -> Option<ChatInfo> {
        self.call("getChat", json!({ "chat_id": chat_id })).await
    }

    async fn get_chat_member(&self, chat_id: ChatId, user_id: UserId) -> Option<ChatMemberInfo> {
        self.call(
            "getChatMember",
            json!({ "chat_id": chat_id, "user_id": user_id }),
        )
        .await
    }

    async fn get_user_profile_photos(&self, user_id: UserId) -> Option<UserProfilePhotos> {
        self.call("getUserProfilePhotos", json!({ "user_id": user_id }))
            .await
    }

    async fn download_file(&self, file_path: &str) -> Option<Vec<u8>> {
        self.limiter.acquire().await;

        let url = format!("{}/{}", self.file_url, file_path.trim_start_matches('/'));
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(file_path, error = %e.without_url(), "file download failed");
                return None;
            }
        };
        if !response.status().is_success() {
            warn!(file_path, status = %response.status(), "file download rejected");
            return None;
        }
        match response.bytes().await {
            Ok(bytes) => {
                debug!(file_path, size = bytes.len(), "file downloaded");
                Some(bytes.to_vec())
            }
            Err(e) => {
                warn!(file_path, error = %e.without_url(), "file download interrupted");
                None
            }
        }
    }
}
