// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `reactions` table, one row per (chat, message, user).

use chatledger_core::{ChatId, InsertOutcome, LedgerError, ReactionRecord, UserId};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, fmt_ts, get_ts, map_tr_err};

fn row_to_reaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReactionRecord> {
    Ok(ReactionRecord {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        message_row_id: row.get(2)?,
        membership_id: row.get(3)?,
        user_id: row.get(4)?,
        date: get_ts(row, 5)?,
        is_deleted: row.get(6)?,
    })
}

pub async fn get_reaction(
    db: &Database,
    chat_id: ChatId,
    message_row_id: i64,
    user_id: UserId,
) -> Result<Option<ReactionRecord>, LedgerError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, chat_id, message_row_id, membership_id, user_id, date, is_deleted
                 FROM reactions
                 WHERE chat_id = ?1 AND message_row_id = ?2 AND user_id = ?3",
                params![chat_id, message_row_id, user_id],
                row_to_reaction,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a live reaction.
///
/// A soft-deleted row for the same key is revived in place and reported as
/// inserted; a live one makes this a no-op.
pub async fn insert_reaction(
    db: &Database,
    r: &ReactionRecord,
) -> Result<InsertOutcome, LedgerError> {
    let r = r.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "INSERT INTO reactions
                    (chat_id, message_row_id, membership_id, user_id, date, is_deleted)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0)
                 ON CONFLICT(chat_id, message_row_id, user_id) DO UPDATE SET
                    is_deleted = 0,
                    date = excluded.date,
                    membership_id = excluded.membership_id
                 WHERE reactions.is_deleted = 1",
                params![r.chat_id, r.message_row_id, r.membership_id, r.user_id, fmt_ts(&r.date)],
            )?;
            if changed == 0 {
                return Ok(InsertOutcome::AlreadyExists);
            }
            let id = conn.query_row(
                "SELECT id FROM reactions
                 WHERE chat_id = ?1 AND message_row_id = ?2 AND user_id = ?3",
                params![r.chat_id, r.message_row_id, r.user_id],
                |row| row.get(0),
            )?;
            Ok(InsertOutcome::Inserted(id))
        })
        .await
        .map_err(map_tr_err)
}

/// Soft-delete. Returns whether a live row was marked deleted.
pub async fn delete_reaction(
    db: &Database,
    chat_id: ChatId,
    message_row_id: i64,
    user_id: UserId,
) -> Result<bool, LedgerError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE reactions SET is_deleted = 1
                 WHERE chat_id = ?1 AND message_row_id = ?2 AND user_id = ?3
                   AND is_deleted = 0",
                params![chat_id, message_row_id, user_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
