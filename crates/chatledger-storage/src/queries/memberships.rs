// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chat_members` table.

use chatledger_core::{ChatId, InsertOutcome, LedgerError, Membership, UserId};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, fmt_ts, get_enum, get_opt_ts, map_tr_err};

fn row_to_membership(row: &rusqlite::Row<'_>) -> rusqlite::Result<Membership> {
    Ok(Membership {
        id: row.get(0)?,
        user_id: row.get(1)?,
        chat_id: row.get(2)?,
        status: get_enum(row, 3)?,
        custom_title: row.get(4)?,
        joined_at: get_opt_ts(row, 5)?,
        left_at: get_opt_ts(row, 6)?,
        added_by: row.get(7)?,
        removed_by: row.get(8)?,
    })
}

pub async fn get_membership(
    db: &Database,
    user_id: UserId,
    chat_id: ChatId,
) -> Result<Option<Membership>, LedgerError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, user_id, chat_id, status, custom_title, joined_at, left_at,
                        added_by, removed_by
                 FROM chat_members WHERE user_id = ?1 AND chat_id = ?2",
                params![user_id, chat_id],
                row_to_membership,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert unless the (user, chat) pair exists. A concurrent winner is reported
/// as [`InsertOutcome::AlreadyExists`].
pub async fn insert_membership(
    db: &Database,
    m: &Membership,
) -> Result<InsertOutcome, LedgerError> {
    let m = m.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO chat_members
                    (user_id, chat_id, status, custom_title, joined_at, left_at,
                     added_by, removed_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    m.user_id,
                    m.chat_id,
                    m.status.to_string(),
                    m.custom_title,
                    m.joined_at.as_ref().map(fmt_ts),
                    m.left_at.as_ref().map(fmt_ts),
                    m.added_by,
                    m.removed_by,
                ],
            )?;
            Ok(if changed == 0 {
                InsertOutcome::AlreadyExists
            } else {
                InsertOutcome::Inserted(conn.last_insert_rowid())
            })
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_membership(db: &Database, m: &Membership) -> Result<(), LedgerError> {
    let m = m.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE chat_members SET status = ?1, custom_title = ?2, joined_at = ?3,
                    left_at = ?4, added_by = ?5, removed_by = ?6
                 WHERE id = ?7",
                params![
                    m.status.to_string(),
                    m.custom_title,
                    m.joined_at.as_ref().map(fmt_ts),
                    m.left_at.as_ref().map(fmt_ts),
                    m.added_by,
                    m.removed_by,
                    m.id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
