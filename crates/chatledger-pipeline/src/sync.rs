// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background reconciliation of platform-held state.
//!
//! Each sync is best-effort. Remote unavailability leaves the stored row as it
//! was, and errors are logged rather than returned.

use chatledger_core::events::SyncChatMember;
use chatledger_core::types::prefer_non_empty;
use chatledger_core::{AssetKind, ChatId, LedgerError, UserId};
use tracing::{debug, info, warn};

use crate::context::PipelineContext;
use crate::membership::{MembershipChange, Transition, apply_membership_update};
use crate::metrics;

/// What a sync run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Stored state changed.
    Updated,
    /// Platform state matched what was stored.
    Unchanged,
    /// No stored row to sync.
    Missing,
    /// The platform could not answer.
    Unavailable,
    /// A local write failed.
    Failed,
}

impl SyncOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::Missing => "missing",
            Self::Unavailable => "unavailable",
            Self::Failed => "failed",
        }
    }
}

/// Refreshes users, chats and memberships from the platform.
#[derive(Clone)]
pub struct SyncWorker {
    ctx: PipelineContext,
}

impl SyncWorker {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    /// Refresh a user's profile photo.
    pub async fn sync_user(&self, user_id: UserId) -> SyncOutcome {
        let outcome = self.try_sync_user(user_id).await.unwrap_or_else(|e| {
            warn!(user_id, error = %e, "user sync failed");
            SyncOutcome::Failed
        });
        metrics::record_sync("user", outcome.as_str());
        outcome
    }

    /// Refresh a chat's title, invite link, photo and accent colour.
    pub async fn sync_chat(&self, chat_id: ChatId) -> SyncOutcome {
        let outcome = self.try_sync_chat(chat_id).await.unwrap_or_else(|e| {
            warn!(chat_id, error = %e, "chat sync failed");
            SyncOutcome::Failed
        });
        metrics::record_sync("chat", outcome.as_str());
        outcome
    }

    /// Re-read a member's status and apply it as a transition at the
    /// request's timestamp.
    pub async fn sync_chat_member(&self, request: &SyncChatMember) -> SyncOutcome {
        let outcome = self.try_sync_chat_member(request).await.unwrap_or_else(|e| {
            warn!(
                user_id = request.user_id,
                chat_id = request.chat_id,
                error = %e,
                "chat member sync failed"
            );
            SyncOutcome::Failed
        });
        metrics::record_sync("chatmember", outcome.as_str());
        outcome
    }

    async fn try_sync_user(&self, user_id: UserId) -> Result<SyncOutcome, LedgerError> {
        let Some(user) = self.ctx.store.get_user(user_id).await? else {
            warn!(user_id, "sync requested for unknown user");
            return Ok(SyncOutcome::Missing);
        };
        let Some(photos) = self.ctx.platform.get_user_profile_photos(user_id).await else {
            return Ok(SyncOutcome::Unavailable);
        };
        let Some(current) = photos.current() else {
            debug!(user_id, "user has no profile photo");
            return Ok(SyncOutcome::Unchanged);
        };
        if user.photo_file_id.as_deref() == Some(current.file_id.as_str()) {
            return Ok(SyncOutcome::Unchanged);
        }

        let Some(bytes) = self.download(&current.file_id).await else {
            return Ok(SyncOutcome::Unavailable);
        };
        let asset = self
            .ctx
            .assets
            .persist(AssetKind::User, user_id, bytes)
            .await?;
        self.ctx
            .store
            .set_user_photo(user_id, &asset.path, &current.file_id)
            .await?;
        info!(user_id, path = %asset.path, "user photo refreshed");
        Ok(SyncOutcome::Updated)
    }

    async fn try_sync_chat(&self, chat_id: ChatId) -> Result<SyncOutcome, LedgerError> {
        let Some(chat) = self.ctx.store.get_chat(chat_id).await? else {
            warn!(chat_id, "sync requested for unknown chat");
            return Ok(SyncOutcome::Missing);
        };
        let Some(info) = self.ctx.platform.get_chat(chat_id).await else {
            return Ok(SyncOutcome::Unavailable);
        };

        let mut changed = false;
        let title = prefer_non_empty(info.title, chat.title.clone());
        let invite_link = prefer_non_empty(info.invite_link, chat.invite_link.clone());
        if title != chat.title || invite_link != chat.invite_link {
            self.ctx
                .store
                .set_chat_details(chat_id, title.as_deref(), invite_link.as_deref())
                .await?;
            changed = true;
        }

        if let Some(photo) = info.photo
            && chat.photo_file_id.as_deref() != Some(photo.big_file_id.as_str())
        {
            match self.download(&photo.big_file_id).await {
                Some(bytes) => {
                    let asset = self
                        .ctx
                        .assets
                        .persist(AssetKind::Chat, chat_id, bytes)
                        .await?;
                    self.ctx
                        .store
                        .set_chat_photo(
                            chat_id,
                            &asset.path,
                            &photo.big_file_id,
                            asset.accent_color.as_deref(),
                        )
                        .await?;
                    info!(chat_id, path = %asset.path, accent = ?asset.accent_color, "chat photo refreshed");
                    changed = true;
                }
                None if !changed => return Ok(SyncOutcome::Unavailable),
                None => debug!(chat_id, "chat photo download unavailable"),
            }
        }

        Ok(if changed {
            SyncOutcome::Updated
        } else {
            SyncOutcome::Unchanged
        })
    }

    async fn try_sync_chat_member(
        &self,
        request: &SyncChatMember,
    ) -> Result<SyncOutcome, LedgerError> {
        let (user_id, chat_id) = (request.user_id, request.chat_id);
        let Some(current) = self.ctx.store.get_membership(user_id, chat_id).await? else {
            warn!(user_id, chat_id, "sync requested for unknown membership");
            return Ok(SyncOutcome::Missing);
        };
        let Some(member) = self.ctx.platform.get_chat_member(chat_id, user_id).await else {
            return Ok(SyncOutcome::Unavailable);
        };

        let change = MembershipChange {
            status: member.status,
            custom_title: member.custom_title.or(current.custom_title),
            at: request.timestamp,
            performer: request.performer,
        };
        Ok(
            match apply_membership_update(&self.ctx, user_id, chat_id, &change).await? {
                None => SyncOutcome::Missing,
                Some(Transition::Stale | Transition::Unchanged) => SyncOutcome::Unchanged,
                Some(_) => SyncOutcome::Updated,
            },
        )
    }

    /// Resolve a file id and fetch its bytes.
    async fn download(&self, file_id: &str) -> Option<Vec<u8>> {
        let file = self.ctx.platform.get_file(file_id).await?;
        let Some(path) = file.file_path else {
            debug!(file_id, "file has no download path");
            return None;
        };
        self.ctx.platform.download_file(&path).await
    }
}
