// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Update processing pipeline for chatledger.
//!
//! The [`Dispatcher`] is the entry point for inbound envelopes:
//! - Resolves users and chats, publishing sync requests for first-seen ids
//! - Tracks membership lifecycles
//! - Records group messages and reactions and publishes ledger events
//! - Publishes exactly one outcome event per envelope
//!
//! [`SyncWorker`] refreshes platform-held state, [`ReplaySweep`] re-publishes
//! unprocessed raw events, and [`worker::spawn_consumers`] wires all of them
//! to the bus.

pub mod classify;
pub mod context;
pub mod dispatcher;
pub mod feedback;
pub mod ingest;
pub mod membership;
pub mod metrics;
pub mod recorder;
pub mod replay;
pub mod resolver;
pub mod sync;
pub mod worker;

pub use context::{Emitter, PipelineContext};
pub use dispatcher::{DispatchReport, Dispatcher, StepOutcome, StepReport};
pub use ingest::{IngestReport, ingest_lines};
pub use replay::{ReplayReport, ReplaySweep};
pub use sync::{SyncOutcome, SyncWorker};
