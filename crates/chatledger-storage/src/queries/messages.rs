// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `messages` table. Rows are immutable once written.

use chatledger_core::{ChatId, InsertOutcome, LedgerError, MessageRecord};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, fmt_ts, get_enum, get_ts, map_tr_err};

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRecord> {
    Ok(MessageRecord {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        message_id: row.get(2)?,
        membership_id: row.get(3)?,
        user_id: row.get(4)?,
        date: get_ts(row, 5)?,
        reply_to_id: row.get(6)?,
        message_type: get_enum(row, 7)?,
        is_external_forward: row.get(8)?,
    })
}

pub async fn get_message(
    db: &Database,
    chat_id: ChatId,
    message_id: i64,
) -> Result<Option<MessageRecord>, LedgerError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, chat_id, message_id, membership_id, user_id, date, reply_to_id,
                        message_type, is_external_forward
                 FROM messages WHERE chat_id = ?1 AND message_id = ?2",
                params![chat_id, message_id],
                row_to_message,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert unless (chat_id, message_id) is already recorded.
pub async fn insert_message(
    db: &Database,
    msg: &MessageRecord,
) -> Result<InsertOutcome, LedgerError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO messages
                    (chat_id, message_id, membership_id, user_id, date, reply_to_id,
                     message_type, is_external_forward)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    msg.chat_id,
                    msg.message_id,
                    msg.membership_id,
                    msg.user_id,
                    fmt_ts(&msg.date),
                    msg.reply_to_id,
                    msg.message_type.to_string(),
                    msg.is_external_forward,
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
