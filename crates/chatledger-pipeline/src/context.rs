// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared collaborators and the per-step event emitter.

use std::sync::Arc;

use chatledger_core::events::LedgerEntry;
use chatledger_core::{AssetStore, BusEvent, EntityStore, EventBus, PlatformClient};
use tracing::warn;

use crate::metrics;

/// Collaborators every handler works against.
///
/// Cheap to clone; handlers hold no state of their own.
#[derive(Clone)]
pub struct PipelineContext {
    pub store: Arc<dyn EntityStore>,
    pub bus: Arc<dyn EventBus>,
    pub platform: Arc<dyn PlatformClient>,
    pub assets: Arc<dyn AssetStore>,
}

impl PipelineContext {
    pub fn new(
        store: Arc<dyn EntityStore>,
        bus: Arc<dyn EventBus>,
        platform: Arc<dyn PlatformClient>,
        assets: Arc<dyn AssetStore>,
    ) -> Self {
        Self {
            store,
            bus,
            platform,
            assets,
        }
    }
}

/// Publishes secondary events for one dispatch step.
///
/// A failed publish does not abort the step. It is logged and remembered so
/// the step can be reported as partial.
pub struct Emitter<'a> {
    bus: &'a dyn EventBus,
    published: usize,
    failures: Vec<String>,
}

impl<'a> Emitter<'a> {
    pub fn new(bus: &'a dyn EventBus) -> Self {
        Self {
            bus,
            published: 0,
            failures: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: BusEvent) {
        let topic = event.topic();
        let ledger_type = match &event {
            BusEvent::Ledger(LedgerEntry { ledger_type, .. }) => Some(ledger_type.clone()),
            _ => None,
        };
        match self.bus.emit(event) {
            Ok(()) => {
                self.published += 1;
                if let Some(ledger_type) = ledger_type {
                    metrics::record_ledger_event(&ledger_type);
                }
            }
            Err(e) => {
                warn!(topic, error = %e, "secondary publish failed");
                self.failures.push(format!("{topic}: {e}"));
            }
        }
    }

    /// Number of events successfully published.
    pub fn published(&self) -> usize {
        self.published
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<String> {
        self.failures
    }
}
