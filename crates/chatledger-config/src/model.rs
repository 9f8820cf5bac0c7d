// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model.
//!
//! Every section uses `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of silently falling back to a default.

use serde::{Deserialize, Serialize};

/// Top-level chatledger configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub replay: ReplayConfig,
}

/// Process identity and logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "chatledger".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Bot API client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Bot token. `None` leaves the platform client unavailable and every
    /// remote lookup falls back to its default.
    #[serde(default)]
    pub bot_token: Option<String>,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_file_base_url")]
    pub file_base_url: String,

    /// Shared outbound budget across every API call and file download.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base_url: default_api_base_url(),
            file_base_url: default_file_base_url(),
            requests_per_second: default_requests_per_second(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_file_base_url() -> String {
    "https://api.telegram.org/file".to_string()
}

fn default_requests_per_second() -> u32 {
    30
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// SQLite store settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,

    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("chatledger").join("chatledger.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("chatledger.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Where downloaded photos are written.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    #[serde(default = "default_media_root")]
    pub root: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_media_root(),
        }
    }
}

fn default_media_root() -> String {
    dirs::data_dir()
        .map(|p| p.join("chatledger").join("media"))
        .unwrap_or_else(|| std::path::PathBuf::from("media"))
        .to_string_lossy()
        .into_owned()
}

/// In-process bus settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    /// Per-topic buffer; slow subscribers beyond it miss messages.
    #[serde(default = "default_bus_capacity")]
    pub capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: default_bus_capacity(),
        }
    }
}

fn default_bus_capacity() -> usize {
    1024
}

/// Raw-event replay sweep.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayConfig {
    /// Run the sweep periodically inside `serve`.
    #[serde(default = "default_replay_enabled")]
    pub enabled: bool,

    #[serde(default = "default_replay_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_replay_batch_size")]
    pub batch_size: usize,

    /// Failed rows with this many attempts are left alone.
    #[serde(default = "default_replay_max_retries")]
    pub max_retries: u32,

    /// How long a claimed row stays invisible to later sweeps.
    #[serde(default = "default_replay_lease_secs")]
    pub lease_secs: u64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            enabled: default_replay_enabled(),
            interval_secs: default_replay_interval_secs(),
            batch_size: default_replay_batch_size(),
            max_retries: default_replay_max_retries(),
            lease_secs: default_replay_lease_secs(),
        }
    }
}

fn default_replay_enabled() -> bool {
    true
}

fn default_replay_interval_secs() -> u64 {
    60
}

fn default_replay_batch_size() -> usize {
    1000
}

fn default_replay_max_retries() -> u32 {
    5
}

fn default_replay_lease_secs() -> u64 {
    300
}
