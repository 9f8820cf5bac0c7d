// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media persistence for downloaded profile and chat photos.

use async_trait::async_trait;
use strum::Display;

use crate::error::LedgerError;

/// Owner kind of a stored asset; also its directory under the media root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum AssetKind {
    User,
    Chat,
}

/// Where an asset was written and what was derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    /// Path relative to the media root, e.g. `chat/-100.jpg`.
    pub path: String,
    /// Dominant colour as `#rrggbb`; only computed for chat photos.
    pub accent_color: Option<String>,
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Write `bytes` as `<kind>/<id>.jpg`, replacing any previous file.
    async fn persist(
        &self,
        kind: AssetKind,
        id: i64,
        bytes: Vec<u8>,
    ) -> Result<StoredAsset, LedgerError>;
}
