// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token-bucket limiter shared by every outbound Bot API request.

use std::num::NonZeroU32;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota};

/// [`chatledger_core::RateLimiter`] backed by a `governor` direct limiter.
///
/// Allows a burst of `requests_per_second`, then one permit every
/// `1 / requests_per_second` seconds.
pub struct GovernorLimiter {
    inner: DefaultDirectRateLimiter,
}

impl GovernorLimiter {
    /// A zero rate is clamped to one request per second.
    pub fn per_second(requests_per_second: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: governor::RateLimiter::direct(Quota::per_second(rate)),
        }
    }
}

#[async_trait]
impl chatledger_core::RateLimiter for GovernorLimiter {
    async fn acquire(&self) {
        self.inner.until_ready().await;
    }
}
