// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for chatledger.
//!
//! WAL-mode SQLite with embedded refinery migrations, a single writer thread via
//! `tokio-rusqlite`, and the [`SqliteStore`] implementation of
//! [`chatledger_core::EntityStore`].

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStore;
pub use database::Database;
