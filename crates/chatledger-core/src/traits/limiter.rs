// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;

/// Throttle shared by every outbound platform call.
///
/// `acquire` resolves once a permit is available. It never times out.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn acquire(&self);
}
