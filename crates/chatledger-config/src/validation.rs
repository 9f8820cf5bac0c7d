// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation.

use crate::diagnostic::ConfigError;
use crate::model::LedgerConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Check semantic constraints serde cannot express.
///
/// Collects every violation instead of failing on the first one.
pub fn validate_config(config: &LedgerConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        fail(format!(
            "service.log_level `{}` must be one of: {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if let Some(token) = &config.telegram.bot_token
        && token.trim().is_empty()
    {
        fail("telegram.bot_token must not be empty when set".to_string());
    }

    for (key, url) in [
        ("telegram.api_base_url", &config.telegram.api_base_url),
        ("telegram.file_base_url", &config.telegram.file_base_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            fail(format!("{key} `{url}` must be an http(s) URL"));
        }
    }

    if config.telegram.requests_per_second == 0 {
        fail("telegram.requests_per_second must be at least 1".to_string());
    }

    if config.telegram.request_timeout_secs == 0 {
        fail("telegram.request_timeout_secs must be at least 1".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.media.root.trim().is_empty() {
        fail("media.root must not be empty".to_string());
    }

    if config.bus.capacity == 0 {
        fail("bus.capacity must be at least 1".to_string());
    }

    if config.replay.interval_secs == 0 {
        fail("replay.interval_secs must be at least 1".to_string());
    }

    if config.replay.batch_size == 0 {
        fail("replay.batch_size must be at least 1".to_string());
    }

    if config.replay.lease_secs == 0 {
        fail("replay.lease_secs must be at least 1".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&LedgerConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = LedgerConfig::default();
        config.telegram.requests_per_second = 0;
        config.bus.capacity = 0;
        config.service.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3, "got: {errors:?}");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let mut config = LedgerConfig::default();
        config.telegram.api_base_url = "api.telegram.org".into();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| {
            matches!(e, ConfigError::Validation { message } if message.contains("api_base_url"))
        }));
    }

    #[test]
    fn blank_token_is_rejected() {
        let mut config = LedgerConfig::default();
        config.telegram.bot_token = Some("  ".into());
        assert!(validate_config(&config).is_err());
    }
}
