// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One module per table. Each function is a single `call` on the writer thread.

pub mod chats;
pub mod memberships;
pub mod messages;
pub mod raw_events;
pub mod reactions;
pub mod users;
