// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for chatledger configuration loading.

use chatledger_config::diagnostic::ConfigError;
use chatledger_config::model::LedgerConfig;
use chatledger_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};
use serial_test::serial;

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[service]
name = "ledger-a"
log_level = "debug"

[telegram]
bot_token = "123:ABC"
api_base_url = "http://localhost:8081"
file_base_url = "http://localhost:8081/file"
requests_per_second = 10
request_timeout_secs = 5

[storage]
database_path = "/tmp/ledger.db"
wal_mode = false

[media]
root = "/srv/media"

[bus]
capacity = 64

[replay]
enabled = false
interval_secs = 15
batch_size = 50
max_retries = 3
lease_secs = 120
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.name, "ledger-a");
    assert_eq!(config.service.log_level, "debug");
    assert_eq!(config.telegram.bot_token.as_deref(), Some("123:ABC"));
    assert_eq!(config.telegram.requests_per_second, 10);
    assert_eq!(config.storage.database_path, "/tmp/ledger.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.media.root, "/srv/media");
    assert_eq!(config.bus.capacity, 64);
    assert!(!config.replay.enabled);
    assert_eq!(config.replay.max_retries, 3);
    assert_eq!(config.replay.lease_secs, 120);
}

#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty config is valid");
    assert_eq!(config.service.name, "chatledger");
    assert_eq!(config.telegram.requests_per_second, 30);
    assert_eq!(config.telegram.api_base_url, "https://api.telegram.org");
    assert!(config.telegram.bot_token.is_none());
    assert!(config.storage.wal_mode);
    assert!(config.replay.enabled);
    assert_eq!(config.replay.batch_size, 1000);
}

#[test]
fn partial_section_keeps_other_defaults() {
    let config = load_config_from_str("[replay]\nmax_retries = 9\n").unwrap();
    assert_eq!(config.replay.max_retries, 9);
    assert_eq!(config.replay.interval_secs, 60);
}

#[test]
fn unknown_key_is_reported_with_suggestion() {
    let toml = r#"
[storage]
databse_path = "/tmp/x.db"
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown key should fail");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "databse_path"
                && suggestion.as_deref() == Some("database_path")
                && valid_keys.contains("wal_mode")
        })
    });
    assert!(found, "expected UnknownKey with suggestion, got: {errors:?}");
}

#[test]
fn unknown_top_level_section_is_rejected() {
    let err = load_config_from_str("[agent]\nname = \"x\"\n").expect_err("should reject");
    assert!(err.to_string().contains("agent"), "got: {err}");
}

#[test]
fn invalid_type_is_reported() {
    let errors = load_and_validate_str("[bus]\ncapacity = \"lots\"\n").unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("capacity"))),
        "got: {errors:?}"
    );
}

#[test]
fn validation_runs_after_load() {
    let errors = load_and_validate_str("[telegram]\nrequests_per_second = 0\n").unwrap_err();
    assert!(errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { message } if message.contains("requests_per_second"))
    }));
}

#[test]
fn unknown_key_renders_with_miette() {
    use miette::GraphicalReportHandler;

    let error = ConfigError::UnknownKey {
        key: "capactiy".to_string(),
        suggestion: Some("capacity".to_string()),
        valid_keys: "capacity".to_string(),
        span: None,
        src: None,
    };

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render");
    assert!(buf.contains("capactiy"));
    assert!(buf.contains("did you mean `capacity`"));
}

#[test]
fn dotted_override_reaches_nested_key() {
    use figment::{Figment, providers::Serialized};

    let config: LedgerConfig = Figment::new()
        .merge(Serialized::defaults(LedgerConfig::default()))
        .merge(("telegram.bot_token", "from-env"))
        .extract()
        .expect("override should apply");
    assert_eq!(config.telegram.bot_token.as_deref(), Some("from-env"));
}

#[test]
#[serial]
fn explicit_file_with_env_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatledger.toml");
    std::fs::write(&path, "[replay]\nbatch_size = 7\nlease_secs = 30\n").unwrap();

    // SAFETY: serialized with other env-touching tests.
    unsafe { std::env::set_var("CHATLEDGER_REPLAY_LEASE_SECS", "45") };
    let config = load_and_validate_path(&path);
    unsafe { std::env::remove_var("CHATLEDGER_REPLAY_LEASE_SECS") };

    let config = config.expect("file config should validate");
    assert_eq!(config.replay.batch_size, 7);
    assert_eq!(config.replay.lease_secs, 45);
}

#[test]
#[serial]
fn explicit_file_unknown_key_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatledger.toml");
    std::fs::write(&path, "[media]\nrooot = \"/srv\"\n").unwrap();

    let errors = load_and_validate_path(&path).expect_err("should reject");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, .. }
            if key == "rooot" && suggestion.as_deref() == Some("root"))
    });
    assert!(found, "got: {errors:?}");
}
