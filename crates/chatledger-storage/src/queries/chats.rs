// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chats` table.

use chatledger_core::{ChatId, ChatRecord, LedgerError, UpsertOutcome};
use rusqlite::{Connection, OptionalExtension, params};

use crate::database::{Database, get_enum, map_tr_err};

const COLUMNS: &str = "chat_id, chat_type, title, invite_link, photo, photo_file_id, accent_color";

fn row_to_chat(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatRecord> {
    Ok(ChatRecord {
        id: row.get(0)?,
        chat_type: get_enum(row, 1)?,
        title: row.get(2)?,
        invite_link: row.get(3)?,
        photo: row.get(4)?,
        photo_file_id: row.get(5)?,
        accent_color: row.get(6)?,
    })
}

fn select(conn: &Connection, id: ChatId) -> rusqlite::Result<Option<ChatRecord>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM chats WHERE chat_id = ?1"),
        params![id],
        row_to_chat,
    )
    .optional()
}

pub async fn get_chat(db: &Database, id: ChatId) -> Result<Option<ChatRecord>, LedgerError> {
    db.connection()
        .call(move |conn| select(conn, id))
        .await
        .map_err(map_tr_err)
}

/// Read, merge and write in one transaction.
pub async fn upsert_chat(
    db: &Database,
    incoming: &ChatRecord,
) -> Result<UpsertOutcome, LedgerError> {
    let incoming = incoming.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let existing = select(&tx, incoming.id)?;
            let outcome = if existing.is_some() {
                UpsertOutcome::Updated
            } else {
                UpsertOutcome::Inserted
            };
            let merged = ChatRecord::merge(existing.as_ref(), incoming);
            tx.execute(
                "INSERT INTO chats (chat_id, chat_type, title, invite_link)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(chat_id) DO UPDATE SET
                    chat_type = excluded.chat_type,
                    title = excluded.title,
                    invite_link = excluded.invite_link,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    merged.id,
                    merged.chat_type.to_string(),
                    merged.title,
                    merged.invite_link
                ],
            )?;
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite title and invite link. Callers apply non-empty-wins beforehand.
pub async fn set_chat_details(
    db: &Database,
    id: ChatId,
    title: Option<&str>,
    invite_link: Option<&str>,
) -> Result<(), LedgerError> {
    let title = title.map(str::to_string);
    let invite_link = invite_link.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE chats SET title = ?1, invite_link = ?2,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE chat_id = ?3",
                params![title, invite_link, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_chat_photo(
    db: &Database,
    id: ChatId,
    photo: &str,
    photo_file_id: &str,
    accent_color: Option<&str>,
) -> Result<(), LedgerError> {
    let photo = photo.to_string();
    let photo_file_id = photo_file_id.to_string();
    let accent_color = accent_color.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE chats SET photo = ?1, photo_file_id = ?2, accent_color = ?3,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE chat_id = ?4",
                params![photo, photo_file_id, accent_color, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::open_temp;
    use chatledger_core::ChatType;

    fn group() -> ChatRecord {
        ChatRecord {
            id: -100,
            chat_type: ChatType::Group,
            title: Some("Rustaceans".into()),
            invite_link: None,
            photo: None,
            photo_file_id: None,
            accent_color: None,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_type_and_keeps_title() {
        let (db, _dir) = open_temp().await;
        assert_eq!(upsert_chat(&db, &group()).await.unwrap(), UpsertOutcome::Inserted);

        let mut upgraded = group();
        upgraded.chat_type = ChatType::Supergroup;
        upgraded.title = None;
        assert_eq!(upsert_chat(&db, &upgraded).await.unwrap(), UpsertOutcome::Updated);

        let stored = get_chat(&db, -100).await.unwrap().unwrap();
        assert_eq!(stored.chat_type, ChatType::Supergroup);
        assert_eq!(stored.title.as_deref(), Some("Rustaceans"));
    }

    #[tokio::test]
    async fn photo_and_accent_survive_upsert() {
        let (db, _dir) = open_temp().await;
        upsert_chat(&db, &group()).await.unwrap();
        set_chat_photo(&db, -100, "chat/-100.jpg", "big-1", Some("#aabbcc"))
            .await
            .unwrap();
        upsert_chat(&db, &group()).await.unwrap();

        let stored = get_chat(&db, -100).await.unwrap().unwrap();
        assert_eq!(stored.photo_file_id.as_deref(), Some("big-1"));
        assert_eq!(stored.accent_color.as_deref(), Some("#aabbcc"));
    }

    #[tokio::test]
    async fn details_update_writes_both_fields() {
        let (db, _dir) = open_temp().await;
        upsert_chat(&db, &group()).await.unwrap();
        set_chat_details(&db, -100, Some("Renamed"), Some("https://t.me/+x"))
            .await
            .unwrap();

        let stored = get_chat(&db, -100).await.unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("Renamed"));
        assert_eq!(stored.invite_link.as_deref(), Some("https://t.me/+x"));
    }
}
