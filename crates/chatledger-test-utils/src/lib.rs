// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for chatledger integration tests.
//!
//! Provides in-memory doubles for the collaborator traits and a harness over
//! a temp SQLite database, so pipeline tests run without the network.
//!
//! # Components
//!
//! - [`RecordingBus`] - bus that keeps every published message
//! - [`MockPlatform`] - scripted Bot API responses with a call log
//! - [`MemoryAssets`] - asset store that keeps bytes in memory
//! - [`CountingLimiter`] - rate limiter that only counts permits
//! - [`TestHarness`] - all of the above plus a real [`SqliteStore`](chatledger_storage::SqliteStore)

pub mod doubles;
pub mod fixtures;
pub mod harness;

pub use doubles::{CountingLimiter, MemoryAssets, MockPlatform, RecordingBus};
pub use harness::{TestHarness, TestHarnessBuilder};
