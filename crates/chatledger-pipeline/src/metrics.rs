// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Counters published through the `metrics` facade.
//!
//! Without an installed recorder every call is a no-op.

use metrics::describe_counter;

/// Register metric descriptions. Call once at startup.
pub fn describe_metrics() {
    describe_counter!(
        "chatledger_updates_total",
        "Dispatched update envelopes by outcome"
    );
    describe_counter!(
        "chatledger_ledger_events_total",
        "Analytics ledger events published by type"
    );
    describe_counter!(
        "chatledger_sync_total",
        "Sync worker runs by kind and outcome"
    );
    describe_counter!(
        "chatledger_replayed_total",
        "Raw events republished by the replay sweep"
    );
}

pub fn record_update(outcome: &'static str) {
    metrics::counter!("chatledger_updates_total", "outcome" => outcome).increment(1);
}

pub fn record_ledger_event(ledger_type: &str) {
    metrics::counter!("chatledger_ledger_events_total", "type" => ledger_type.to_string())
        .increment(1);
}

pub fn record_sync(kind: &'static str, outcome: &'static str) {
    metrics::counter!("chatledger_sync_total", "kind" => kind, "outcome" => outcome).increment(1);
}

pub fn record_replayed(count: usize) {
    metrics::counter!("chatledger_replayed_total").increment(count as u64);
}
