// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `raw_events` table: inbound envelopes and their processing bookkeeping.

use std::time::Duration;

pub use chatledger_core::types::TELEGRAM_SOURCE;
use chatledger_core::{InsertOutcome, LedgerError, RawEvent, RawEventStatus};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, fmt_ts, get_enum, get_opt_ts, get_ts, map_tr_err};

const COLUMNS: &str = "id, source, payload, processed, processed_at, status, error_message, \
                       retry_count, locked_until, created_at";

fn row_to_raw_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEvent> {
    Ok(RawEvent {
        id: row.get(0)?,
        source: row.get(1)?,
        payload: row.get(2)?,
        processed: row.get(3)?,
        processed_at: get_opt_ts(row, 4)?,
        status: get_enum(row, 5)?,
        error_message: row.get(6)?,
        retry_count: row.get(7)?,
        locked_until: get_opt_ts(row, 8)?,
        created_at: get_ts(row, 9)?,
    })
}

/// Insert unless a row with the same id exists.
pub async fn insert_raw_event(db: &Database, e: &RawEvent) -> Result<InsertOutcome, LedgerError> {
    let e = e.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO raw_events
                    (id, source, payload, processed, processed_at, status, error_message,
                     retry_count, locked_until, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    e.id,
                    e.source,
                    e.payload,
                    e.processed,
                    e.processed_at.as_ref().map(fmt_ts),
                    e.status.to_string(),
                    e.error_message,
                    e.retry_count,
                    e.locked_until.as_ref().map(fmt_ts),
                    fmt_ts(&e.created_at),
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

pub async fn get_raw_event(db: &Database, id: &str) -> Result<Option<RawEvent>, LedgerError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM raw_events WHERE id = ?1"),
                params![id],
                row_to_raw_event,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn mark_processed(
    db: &Database,
    id: &str,
    at: DateTime<Utc>,
) -> Result<bool, LedgerError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE raw_events SET processed = 1, processed_at = ?1, status = ?2,
                    error_message = NULL, locked_until = NULL
                 WHERE id = ?3",
                params![fmt_ts(&at), RawEventStatus::Done.to_string(), id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn mark_failed(
    db: &Database,
    id: &str,
    at: DateTime<Utc>,
    error_message: &str,
) -> Result<bool, LedgerError> {
    let id = id.to_string();
    let error_message = error_message.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE raw_events SET status = ?1, processed_at = ?2, error_message = ?3,
                    retry_count = retry_count + 1, locked_until = NULL
                 WHERE id = ?4",
                params![
                    RawEventStatus::Failed.to_string(),
                    fmt_ts(&at),
                    error_message,
                    id
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Lease up to `limit` replayable rows, oldest first.
///
/// Selection and lease stamping share one transaction so two sweeps never
/// claim the same row.
pub async fn claim(
    db: &Database,
    limit: usize,
    max_retries: u32,
    lease: Duration,
) -> Result<Vec<RawEvent>, LedgerError> {
    let now = Utc::now();
    let until = chrono::Duration::from_std(lease)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let now_s = fmt_ts(&now);
    let until_s = fmt_ts(&until);
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut claimed = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {COLUMNS} FROM raw_events
                     WHERE source = ?1 AND processed = 0
                       AND (status = 'pending' OR (status = 'failed' AND retry_count < ?2))
                       AND (locked_until IS NULL OR locked_until <= ?3)
                     ORDER BY created_at ASC, id ASC
                     LIMIT ?4"
                ))?;
                let rows = stmt.query_map(
                    params![TELEGRAM_SOURCE, max_retries, now_s, limit],
                    row_to_raw_event,
                )?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            };
            for event in &mut claimed {
                tx.execute(
                    "UPDATE raw_events SET locked_until = ?1 WHERE id = ?2",
                    params![until_s, event.id],
                )?;
                event.locked_until = Some(until);
            }
            tx.commit()?;
            Ok(claimed)
        })
        .await
        .map_err(map_tr_err)
}
