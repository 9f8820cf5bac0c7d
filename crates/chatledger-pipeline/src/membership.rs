// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Membership lifecycle tracking.
//!
//! A membership row is either in the member class (creator, administrator,
//! member) or not (restricted, left, kicked). Crossing the class boundary
//! stamps `joined_at`/`added_by` or `left_at`/`removed_by`; moves inside a
//! class only touch status and custom title.

use chatledger_core::update::ChatMemberUpdated;
use chatledger_core::{ChatId, InsertOutcome, LedgerError, Membership, MembershipStatus, UserId};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::context::{Emitter, PipelineContext};
use crate::dispatcher::StepOutcome;
use crate::resolver::{resolve_chat, resolve_user};

/// An observed membership status at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipChange {
    pub status: MembershipStatus,
    pub custom_title: Option<String>,
    pub at: DateTime<Utc>,
    /// User who caused the change, when known.
    pub performer: Option<UserId>,
}

/// Result of applying a [`MembershipChange`] to a stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Crossed into the member class.
    Joined(Membership),
    /// Crossed out of the member class.
    Left(Membership),
    /// Same class; status or custom title changed.
    Updated(Membership),
    /// Same class and nothing to write.
    Unchanged,
    /// Older than the last recorded transition.
    Stale,
}

impl Transition {
    /// The row to write back, if any.
    pub fn row(&self) -> Option<&Membership> {
        match self {
            Self::Joined(m) | Self::Left(m) | Self::Updated(m) => Some(m),
            Self::Unchanged | Self::Stale => None,
        }
    }
}

/// Compute the new row for `change`. Pure.
pub fn apply_transition(current: &Membership, change: &MembershipChange) -> Transition {
    if current
        .last_transition_at()
        .is_some_and(|last| change.at < last)
    {
        return Transition::Stale;
    }

    let was_member = current.status.is_member_class();
    let is_member = change.status.is_member_class();

    let mut next = current.clone();
    next.status = change.status;
    next.custom_title = change.custom_title.clone();

    match (was_member, is_member) {
        (false, true) => {
            next.joined_at = Some(change.at);
            next.added_by = change.performer;
            Transition::Joined(next)
        }
        (true, false) => {
            next.left_at = Some(change.at);
            next.removed_by = change.performer;
            Transition::Left(next)
        }
        _ if next == *current => Transition::Unchanged,
        _ => Transition::Updated(next),
    }
}

/// Return the membership row id for (user, chat), creating the row if needed.
///
/// A new row takes its status from the platform, or `fallback` when the
/// platform cannot say.
pub async fn resolve_membership(
    ctx: &PipelineContext,
    user_id: UserId,
    chat_id: ChatId,
    at: DateTime<Utc>,
    fallback: MembershipStatus,
) -> Result<i64, LedgerError> {
    if let Some(existing) = ctx.store.get_membership(user_id, chat_id).await? {
        return Ok(existing.id);
    }

    let (status, custom_title) = match ctx.platform.get_chat_member(chat_id, user_id).await {
        Some(member) => (member.status, member.custom_title),
        None => {
            debug!(user_id, chat_id, %fallback, "member status unavailable, using fallback");
            (fallback, None)
        }
    };
    let mut row = Membership::observed(user_id, chat_id, status, at);
    row.custom_title = custom_title;
    Ok(create(ctx, row).await?.id)
}

/// Like [`resolve_membership`] but seeds a missing row with `status` directly.
pub async fn seed_membership(
    ctx: &PipelineContext,
    user_id: UserId,
    chat_id: ChatId,
    at: DateTime<Utc>,
    status: MembershipStatus,
) -> Result<Membership, LedgerError> {
    if let Some(existing) = ctx.store.get_membership(user_id, chat_id).await? {
        return Ok(existing);
    }
    create(ctx, Membership::observed(user_id, chat_id, status, at)).await
}

async fn create(ctx: &PipelineContext, row: Membership) -> Result<Membership, LedgerError> {
    match ctx.store.insert_membership(&row).await? {
        InsertOutcome::Inserted(id) => Ok(Membership { id, ..row }),
        // Lost a race with a concurrent first reference.
        InsertOutcome::AlreadyExists => ctx
            .store
            .get_membership(row.user_id, row.chat_id)
            .await?
            .ok_or_else(|| {
                LedgerError::Internal(format!(
                    "membership ({}, {}) vanished after conflicting insert",
                    row.user_id, row.chat_id
                ))
            }),
    }
}

/// Apply `change` to the stored (user, chat) row.
///
/// Returns `None` when no row exists.
pub async fn apply_membership_update(
    ctx: &PipelineContext,
    user_id: UserId,
    chat_id: ChatId,
    change: &MembershipChange,
) -> Result<Option<Transition>, LedgerError> {
    let Some(current) = ctx.store.get_membership(user_id, chat_id).await? else {
        return Ok(None);
    };
    let transition = apply_transition(&current, change);
    match &transition {
        Transition::Stale => {
            debug!(user_id, chat_id, at = %change.at, "ignoring stale membership update");
        }
        Transition::Joined(_) => {
            info!(user_id, chat_id, status = %change.status, "member joined");
        }
        Transition::Left(_) => {
            info!(user_id, chat_id, status = %change.status, "member left");
        }
        Transition::Updated(_) | Transition::Unchanged => {}
    }
    if let Some(row) = transition.row() {
        ctx.store.update_membership(row).await?;
    }
    Ok(Some(transition))
}

/// Handle a `my_chat_member` or `chat_member` update.
///
/// A missing row is seeded from the old status so the reported change is
/// itself recorded as the transition.
pub async fn record_member_update(
    ctx: &PipelineContext,
    out: &mut Emitter<'_>,
    update: &ChatMemberUpdated,
) -> Result<StepOutcome, LedgerError> {
    if !update.chat.chat_type.is_group() {
        return Ok(StepOutcome::skipped("membership change outside a group"));
    }
    let at = update.changed_at()?;

    let user_id = resolve_user(ctx, out, &update.new_chat_member.user).await?;
    let performer = resolve_user(ctx, out, &update.from).await?;
    let chat_id = resolve_chat(ctx, out, &update.chat).await?;

    seed_membership(ctx, user_id, chat_id, at, update.old_chat_member.status).await?;
    let change = MembershipChange {
        status: update.new_chat_member.status,
        custom_title: update.new_chat_member.custom_title.clone(),
        at,
        performer: Some(performer),
    };
    match apply_membership_update(ctx, user_id, chat_id, &change).await? {
        Some(_) => Ok(StepOutcome::Completed),
        None => {
            warn!(user_id, chat_id, "membership row missing after seeding");
            Ok(StepOutcome::skipped("membership row missing"))
        }
    }
}
