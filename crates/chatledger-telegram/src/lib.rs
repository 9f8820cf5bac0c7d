// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram Bot API access for chatledger.
//!
//! [`BotApiClient`] implements [`chatledger_core::PlatformClient`] over plain
//! HTTPS with reqwest. All requests, file downloads included, pass through one
//! shared [`GovernorLimiter`].

pub mod client;
pub mod limiter;
pub mod offline;

use std::sync::Arc;

use chatledger_config::model::TelegramConfig;
use chatledger_core::{LedgerError, PlatformClient};
use tracing::{info, warn};

pub use client::BotApiClient;
pub use limiter::GovernorLimiter;
pub use offline::OfflinePlatform;

/// Build the platform client for `config`.
///
/// Without a bot token the pipeline still runs; every remote lookup reports
/// unavailable.
pub fn platform_from_config(
    config: &TelegramConfig,
) -> Result<Arc<dyn PlatformClient>, LedgerError> {
    let has_token = config
        .bot_token
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    if !has_token {
        warn!("telegram.bot_token not set; platform lookups disabled");
        return Ok(Arc::new(OfflinePlatform));
    }

    let limiter = Arc::new(GovernorLimiter::per_second(config.requests_per_second));
    let client = BotApiClient::new(config, limiter)?;
    info!(
        requests_per_second = config.requests_per_second,
        "bot API client ready"
    );
    Ok(Arc::new(client))
}
