// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection setup: PRAGMAs, WAL, migrations.
//!
//! Every query goes through the single background thread owned by
//! `tokio_rusqlite::Connection`, so writes are serialized without extra locks.

use chatledger_core::LedgerError;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::Type;
use tracing::debug;

use crate::migrations::run_migrations;

/// Storage format for every timestamp column. Sorts lexicographically.
pub(crate) const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Convert a tokio-rusqlite error into [`LedgerError::Storage`].
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> LedgerError {
    LedgerError::Storage {
        source: Box::new(e),
    }
}

fn storage_err(e: impl std::error::Error + Send + Sync + 'static) -> LedgerError {
    LedgerError::Storage {
        source: Box::new(e),
    }
}

pub(crate) fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.format(TS_FORMAT).to_string()
}

/// Read a timestamp column written with [`TS_FORMAT`].
pub(crate) fn get_ts(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TS_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn get_opt_ts(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        None => Ok(None),
        Some(_) => get_ts(row, idx).map(Some),
    }
}

/// Parse an enum stored as its string form.
pub(crate) fn get_enum<T>(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Handle to the chatledger SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path`, apply PRAGMAs and run
    /// pending migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, LedgerError> {
        if let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(storage_err)?;
        }

        // Migrations need a plain connection; refinery drives it synchronously.
        let setup_path = path.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), LedgerError> {
            let mut conn = rusqlite::Connection::open(&setup_path).map_err(storage_err)?;
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")
                    .map_err(storage_err)?;
            }
            run_migrations(&mut conn)
        })
        .await
        .map_err(|e| LedgerError::Internal(format!("migration task failed: {e}")))??;

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(storage_err)?;
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA synchronous = NORMAL;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main file is self-contained.
    pub async fn close(&self) -> Result<(), LedgerError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}
