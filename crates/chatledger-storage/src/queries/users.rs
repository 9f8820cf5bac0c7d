// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `users` table.

use chatledger_core::{LedgerError, UpsertOutcome, UserId, UserRecord};
use rusqlite::{Connection, OptionalExtension, params};

use crate::database::{Database, map_tr_err};

const COLUMNS: &str = "user_id, first_name, last_name, username, is_bot, photo, photo_file_id";

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        username: row.get(3)?,
        is_bot: row.get(4)?,
        photo: row.get(5)?,
        photo_file_id: row.get(6)?,
    })
}

fn select(conn: &Connection, id: UserId) -> rusqlite::Result<Option<UserRecord>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE user_id = ?1"),
        params![id],
        row_to_user,
    )
    .optional()
}

pub async fn get_user(db: &Database, id: UserId) -> Result<Option<UserRecord>, LedgerError> {
    db.connection()
        .call(move |conn| select(conn, id))
        .await
        .map_err(map_tr_err)
}

/// Read, merge and write in one transaction.
pub async fn upsert_user(
    db: &Database,
    incoming: &UserRecord,
) -> Result<UpsertOutcome, LedgerError> {
    let incoming = incoming.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let existing = select(&tx, incoming.id)?;
            let outcome = match &existing {
                None => UpsertOutcome::Inserted,
                Some(_) => UpsertOutcome::Updated,
            };
            let merged = UserRecord::merge(existing.as_ref(), incoming);
            tx.execute(
                "INSERT INTO users (user_id, first_name, last_name, username, is_bot)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id) DO UPDATE SET
                    first_name = excluded.first_name,
                    last_name = excluded.last_name,
                    username = excluded.username,
                    is_bot = excluded.is_bot,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    merged.id,
                    merged.first_name,
                    merged.last_name,
                    merged.username,
                    merged.is_bot
                ],
            )?;
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_user_photo(
    db: &Database,
    id: UserId,
    photo: &str,
    photo_file_id: &str,
) -> Result<(), LedgerError> {
    let photo = photo.to_string();
    let photo_file_id = photo_file_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE users SET photo = ?1, photo_file_id = ?2,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE user_id = ?3",
                params![photo, photo_file_id, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
