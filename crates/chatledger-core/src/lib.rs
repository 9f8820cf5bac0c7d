// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the chatledger pipeline.
//!
//! Holds the records and their merge rules, the inbound update shapes, the
//! events published on the bus, the error type, and the collaborator traits
//! (store, bus, platform client, asset store, rate limiter) every other crate
//! implements or consumes.

pub mod error;
pub mod events;
pub mod platform;
pub mod traits;
pub mod types;
pub mod update;

pub use error::LedgerError;
pub use events::BusEvent;
pub use types::{
    ChatId, ChatRecord, ChatType, InsertOutcome, Membership, MembershipStatus, MessageRecord,
    MessageType, RawEvent, RawEventStatus, ReactionRecord, UpsertOutcome, UserId, UserRecord,
};
pub use update::{Envelope, UpdateComponent};

pub use traits::{
    AssetKind, AssetStore, BusMessage, EntityStore, EventBus, PlatformClient, RateLimiter,
    StoredAsset,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traits_are_object_safe() {
        fn _store(_: &dyn EntityStore) {}
        fn _bus(_: &dyn EventBus) {}
        fn _platform(_: &dyn PlatformClient) {}
        fn _assets(_: &dyn AssetStore) {}
        fn _limiter(_: &dyn RateLimiter) {}
    }

    #[test]
    fn asset_kind_names_directories() {
        assert_eq!(AssetKind::User.to_string(), "user");
        assert_eq!(AssetKind::Chat.to_string(), "chat");
    }
}
