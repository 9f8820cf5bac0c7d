// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bulk import of platform updates as pending raw events.
//!
//! Input is JSON lines, one update per line. Rows are keyed `tg-<update_id>`
//! so re-importing the same file is a no-op.

use chatledger_core::types::TELEGRAM_SOURCE;
use chatledger_core::update::Update;
use chatledger_core::{EntityStore, InsertOutcome, LedgerError, RawEvent, RawEventStatus};
use chrono::Utc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    pub duplicates: usize,
    /// Lines that were not a JSON update.
    pub invalid: usize,
}

/// Raw event id for an update: `tg-<update_id>`, or a random id when the
/// update carries none.
pub fn raw_event_id(update: &Update) -> String {
    match update.update_id {
        Some(id) => format!("tg-{id}"),
        None => uuid::Uuid::new_v4().to_string(),
    }
}

/// Store one update as a pending raw event.
pub async fn ingest_update(
    store: &dyn EntityStore,
    raw: &str,
) -> Result<Option<InsertOutcome>, LedgerError> {
    let update: Update = match serde_json::from_str(raw) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, "skipping line that is not an update");
            return Ok(None);
        }
    };
    let event = RawEvent {
        id: raw_event_id(&update),
        source: TELEGRAM_SOURCE.to_string(),
        payload: raw.to_string(),
        processed: false,
        processed_at: None,
        status: RawEventStatus::Pending,
        error_message: None,
        retry_count: 0,
        locked_until: None,
        created_at: Utc::now(),
    };
    let outcome = store.insert_raw_event(&event).await?;
    debug!(event_id = %event.id, ?outcome, "update ingested");
    Ok(Some(outcome))
}

/// Read JSON lines from `reader` until EOF. Blank lines are ignored.
pub async fn ingest_lines<R>(store: &dyn EntityStore, reader: R) -> Result<IngestReport, LedgerError>
where
    R: AsyncBufRead + Unpin,
{
    let mut report = IngestReport::default();
    let mut lines = reader.lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| LedgerError::Internal(format!("read input: {e}")))?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match ingest_update(store, line).await? {
            Some(InsertOutcome::Inserted(_)) => report.inserted += 1,
            Some(InsertOutcome::AlreadyExists) => report.duplicates += 1,
            None => report.invalid += 1,
        }
    }
    Ok(report)
}
