// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Update dispatch: the single failure boundary per envelope.
//!
//! Components run in a fixed order (message, reaction, my_chat_member,
//! chat_member, callback_query). Each yields a [`StepOutcome`]. An
//! infrastructure error aborts the rest of the envelope; a data error only
//! skips its component. Exactly one outcome event is published afterwards.

use chatledger_core::events::{UpdateFailed, UpdateProcessed};
use chatledger_core::update::ComponentKind;
use chatledger_core::{BusEvent, Envelope, LedgerError, UpdateComponent};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::context::{Emitter, PipelineContext};
use crate::membership::record_member_update;
use crate::metrics;
use crate::recorder::{record_message, record_reaction};

/// Result of one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Primary write done and every secondary event published.
    Completed,
    /// Nothing to do: duplicate, guard not met, or undecodable input.
    Skipped { reason: String },
    /// Primary write done, some secondary publishes failed.
    Partial { failures: Vec<String> },
    /// Infrastructure error; the envelope was aborted here.
    Failed { error: String },
}

impl StepOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub kind: ComponentKind,
    pub outcome: StepOutcome,
}

/// Per-envelope summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub event_id: String,
    pub steps: Vec<StepReport>,
}

impl DispatchReport {
    /// No step failed. Partial steps still count as success.
    pub fn is_success(&self) -> bool {
        !self.steps.iter().any(|s| s.outcome.is_failed())
    }

    /// Message of the failing step, if any.
    pub fn error_message(&self) -> Option<String> {
        self.steps.iter().find_map(|s| match &s.outcome {
            StepOutcome::Failed { error } => Some(format!("{}: {error}", s.kind)),
            _ => None,
        })
    }

    pub fn outcome_of(&self, kind: ComponentKind) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.kind == kind).map(|s| &s.outcome)
    }
}

/// Routes envelopes to the resolver, membership tracker and recorder.
#[derive(Clone)]
pub struct Dispatcher {
    ctx: PipelineContext,
}

impl Dispatcher {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Decode a `telegram.update` payload and dispatch it.
    ///
    /// Payloads without an `event_id` cannot be acknowledged and are dropped.
    pub async fn handle_payload(&self, payload: Value) -> Option<DispatchReport> {
        match serde_json::from_value::<Envelope>(payload) {
            Ok(envelope) => Some(self.dispatch(&envelope).await),
            Err(e) => {
                warn!(error = %e, "dropping undecodable update envelope");
                None
            }
        }
    }

    /// Process every component of `envelope` and publish its outcome.
    pub async fn dispatch(&self, envelope: &Envelope) -> DispatchReport {
        let event_id = envelope.event_id.as_str();
        let mut steps = Vec::new();

        for component in envelope.update.components() {
            let component = match component {
                Ok(component) => component,
                Err(invalid) => {
                    warn!(event_id, kind = %invalid.kind, error = %invalid.error, "skipping undecodable component");
                    steps.push(StepReport {
                        kind: invalid.kind,
                        outcome: StepOutcome::skipped(invalid.error.to_string()),
                    });
                    continue;
                }
            };

            let kind = component.kind();
            let mut out = Emitter::new(self.ctx.bus.as_ref());
            let outcome = match self.run_step(&mut out, &component).await {
                Ok(outcome) if outcome.is_failed() => outcome,
                Ok(outcome) if !out.failures().is_empty() => StepOutcome::Partial {
                    failures: out.into_failures(),
                },
                Ok(outcome) => outcome,
                Err(e) if e.is_infrastructure() => StepOutcome::Failed {
                    error: e.to_string(),
                },
                Err(e) => {
                    warn!(event_id, %kind, error = %e, "skipping component with bad data");
                    StepOutcome::skipped(e.to_string())
                }
            };
            debug!(event_id, %kind, ?outcome, "component handled");

            let abort = outcome.is_failed();
            steps.push(StepReport { kind, outcome });
            if abort {
                break;
            }
        }

        let report = DispatchReport {
            event_id: envelope.event_id.clone(),
            steps,
        };
        self.publish_outcome(&report);
        report
    }

    async fn run_step(
        &self,
        out: &mut Emitter<'_>,
        component: &UpdateComponent,
    ) -> Result<StepOutcome, LedgerError> {
        match component {
            UpdateComponent::Message(msg) => record_message(&self.ctx, out, msg).await,
            UpdateComponent::Reaction(reaction) => record_reaction(&self.ctx, out, reaction).await,
            UpdateComponent::MyChatMember(update) | UpdateComponent::ChatMember(update) => {
                record_member_update(&self.ctx, out, update).await
            }
            UpdateComponent::CallbackQuery(query) => {
                self.ctx.bus.emit(BusEvent::Callback(query.clone()))?;
                Ok(StepOutcome::Completed)
            }
        }
    }

    fn publish_outcome(&self, report: &DispatchReport) {
        let event_id = report.event_id.clone();
        let timestamp = Utc::now();
        let (event, label) = match report.error_message() {
            None => (
                BusEvent::Processed(UpdateProcessed {
                    event_id,
                    timestamp,
                }),
                "processed",
            ),
            Some(error_message) => {
                warn!(event_id = %report.event_id, error = %error_message, "update processing failed");
                (
                    BusEvent::Failed(UpdateFailed {
                        event_id,
                        timestamp,
                        error_message,
                    }),
                    "failed",
                )
            }
        };
        metrics::record_update(label);
        match self.ctx.bus.emit(event) {
            Ok(()) => info!(event_id = %report.event_id, outcome = label, "update dispatched"),
            Err(e) => error!(event_id = %report.event_id, error = %e, "failed to publish update outcome"),
        }
    }
}
