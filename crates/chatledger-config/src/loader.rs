// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order, later wins: compiled defaults, `/etc/chatledger/chatledger.toml`,
//! `~/.config/chatledger/chatledger.toml`, `./chatledger.toml`, then `CHATLEDGER_*`
//! environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::LedgerConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/chatledger/chatledger.toml";
pub(crate) const LOCAL_CONFIG: &str = "chatledger.toml";

/// Top-level sections, used to turn `CHATLEDGER_STORAGE_DATABASE_PATH` into
/// `storage.database_path` without splitting inside key names.
const SECTIONS: &[&str] = &["service", "telegram", "storage", "media", "bus", "replay"];

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("chatledger").join(LOCAL_CONFIG))
        .unwrap_or_default()
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<LedgerConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string only. No files, no env.
pub fn load_config_from_str(toml_content: &str) -> Result<LedgerConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LedgerConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file, still honouring env overrides.
pub fn load_config_from_path(path: &Path) -> Result<LedgerConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(LedgerConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(LedgerConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// `CHATLEDGER_` env provider with explicit section mapping.
///
/// `Env::split("_")` would turn `CHATLEDGER_TELEGRAM_BOT_TOKEN` into
/// `telegram.bot.token`; only the first underscore after a known section is a
/// separator.
fn env_provider() -> Env {
    Env::prefixed("CHATLEDGER_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_only_after_section() {
        assert_eq!(map_env_key("telegram_bot_token"), "telegram.bot_token");
        assert_eq!(
            map_env_key("replay_max_retries"),
            "replay.max_retries"
        );
        assert_eq!(map_env_key("storage_database_path"), "storage.database_path");
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }
}
