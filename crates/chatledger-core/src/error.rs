// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the chatledger pipeline.

use thiserror::Error;

/// The primary error type used across all chatledger traits and handlers.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, constraint violation).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Publish/subscribe transport errors.
    #[error("bus error: {message}")]
    Bus { message: String },

    /// Outbound platform API errors that could not be treated as "unavailable".
    #[error("platform error: {message}")]
    Platform {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Malformed inbound data (missing field, bad timestamp, undecodable component).
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Asset persistence or image processing errors.
    #[error("asset error: {message}")]
    Asset {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Shorthand for a [`LedgerError::Decode`] error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Shorthand for a [`LedgerError::Bus`] error.
    pub fn bus(message: impl Into<String>) -> Self {
        Self::Bus {
            message: message.into(),
        }
    }

    /// Whether this error comes from infrastructure (store, bus, transport) rather
    /// than from the shape of the inbound data.
    ///
    /// Infrastructure errors abort the enclosing dispatch; data errors only skip the
    /// sub-step that hit them.
    pub fn is_infrastructure(&self) -> bool {
        !matches!(self, Self::Decode { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_are_not_infrastructure() {
        assert!(!LedgerError::decode("missing chat").is_infrastructure());
        assert!(LedgerError::bus("closed").is_infrastructure());
        assert!(
            LedgerError::Storage {
                source: "disk full".into()
            }
            .is_infrastructure()
        );
    }

    #[test]
    fn display_includes_message() {
        let err = LedgerError::decode("bad timestamp");
        assert_eq!(err.to_string(), "decode error: bad timestamp");
    }
}
