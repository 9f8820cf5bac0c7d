// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot commands: `replay`, `ingest` and `sync`.

use std::path::Path;
use std::time::Duration;

use chatledger_config::LedgerConfig;
use chatledger_core::{ChatId, EntityStore, LedgerError, UserId};
use chatledger_pipeline::{SyncWorker, ingest_lines};
use tokio::io::BufReader;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::app::App;

/// Upper bound on waiting for replayed events to be acknowledged.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Run one replay sweep with the consumers attached, and wait until every
/// replayed raw event has an outcome.
pub async fn run_replay(config: LedgerConfig) -> Result<(), LedgerError> {
    let app = App::open(config).await?;
    app.start_consumers();

    let report = app.replay_sweep().run_once().await?;
    wait_settled(&app, &report.event_ids).await?;
    app.shutdown().await?;

    println!(
        "replayed {} of {} claimed raw events ({} malformed)",
        report.published, report.claimed, report.malformed
    );
    Ok(())
}

/// Import a JSON lines file of updates.
pub async fn run_ingest(config: LedgerConfig, file: &Path) -> Result<(), LedgerError> {
    let input = tokio::fs::File::open(file)
        .await
        .map_err(|e| LedgerError::Internal(format!("open {}: {e}", file.display())))?;

    let app = App::open(config).await?;
    let report = ingest_lines(app.store.as_ref(), BufReader::new(input)).await?;
    app.shutdown().await?;

    println!(
        "ingested {} updates ({} duplicates, {} invalid lines)",
        report.inserted, report.duplicates, report.invalid
    );
    Ok(())
}

pub async fn run_sync_user(config: LedgerConfig, user_id: UserId) -> Result<(), LedgerError> {
    let app = App::open(config).await?;
    let outcome = SyncWorker::new(app.ctx.clone()).sync_user(user_id).await;
    app.shutdown().await?;
    println!("user {user_id}: {}", outcome.as_str());
    Ok(())
}

pub async fn run_sync_chat(config: LedgerConfig, chat_id: ChatId) -> Result<(), LedgerError> {
    let app = App::open(config).await?;
    let outcome = SyncWorker::new(app.ctx.clone()).sync_chat(chat_id).await;
    app.shutdown().await?;
    println!("chat {chat_id}: {}", outcome.as_str());
    Ok(())
}

/// Poll until none of `event_ids` holds a replay lease any more.
///
/// Both outcome writes clear the lease, so a free row has been acknowledged.
async fn wait_settled(app: &App, event_ids: &[String]) -> Result<(), LedgerError> {
    let deadline = Instant::now() + SETTLE_TIMEOUT;
    let mut pending: Vec<&str> = event_ids.iter().map(String::as_str).collect();

    while !pending.is_empty() {
        let mut still_leased = Vec::with_capacity(pending.len());
        for id in pending {
            if app
                .store
                .get_raw_event(id)
                .await?
                .is_some_and(|row| row.locked_until.is_some())
            {
                still_leased.push(id);
            }
        }
        pending = still_leased;
        if pending.is_empty() {
            break;
        }
        if Instant::now() >= deadline {
            warn!(remaining = pending.len(), "gave up waiting for replayed events");
            break;
        }
        debug!(remaining = pending.len(), "waiting for replay outcomes");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Ok(())
}
