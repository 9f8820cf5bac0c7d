// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits the pipeline is written against.

pub mod assets;
pub mod bus;
pub mod limiter;
pub mod platform;
pub mod store;

pub use assets::{AssetKind, AssetStore, StoredAsset};
pub use bus::{BusMessage, EventBus};
pub use limiter::RateLimiter;
pub use platform::PlatformClient;
pub use store::EntityStore;
