// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Writes dispatch outcomes back onto the raw event rows.

use chatledger_core::events::{UpdateFailed, UpdateProcessed};
use chatledger_core::{EntityStore, LedgerError};
use tracing::{debug, warn};

/// Mark the raw event done. Unknown ids are logged and ignored.
pub async fn apply_processed(
    store: &dyn EntityStore,
    event: &UpdateProcessed,
) -> Result<(), LedgerError> {
    if store
        .mark_raw_event_processed(&event.event_id, event.timestamp)
        .await?
    {
        debug!(event_id = %event.event_id, "raw event processed");
    } else {
        warn!(event_id = %event.event_id, "processed outcome for unknown raw event");
    }
    Ok(())
}

/// Mark the raw event failed and bump its retry count.
pub async fn apply_failed(store: &dyn EntityStore, event: &UpdateFailed) -> Result<(), LedgerError> {
    if store
        .mark_raw_event_failed(&event.event_id, event.timestamp, &event.error_message)
        .await?
    {
        debug!(event_id = %event.event_id, error = %event.error_message, "raw event failed");
    } else {
        warn!(event_id = %event.event_id, "failure outcome for unknown raw event");
    }
    Ok(())
}
