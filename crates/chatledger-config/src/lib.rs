// SPDX-FileCopyrightText: 2026 Chatledger Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for chatledger.
//!
//! TOML files layered with Figment, strict key checking, `CHATLEDGER_*` env
//! overrides, and miette diagnostics with typo suggestions.
//!
//! ```no_run
//! use chatledger_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("database: {}", config.storage.database_path);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::LedgerConfig;

/// Load from the standard hierarchy and validate.
pub fn load_and_validate() -> Result<LedgerConfig, Vec<ConfigError>> {
    finish(loader::load_config(), collect_toml_sources)
}

/// Load from an explicit file (plus env overrides) and validate.
pub fn load_and_validate_path(path: &Path) -> Result<LedgerConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        read_source(path).into_iter().collect()
    })
}

/// Load from an inline TOML string and validate.
pub fn load_and_validate_str(toml_content: &str) -> Result<LedgerConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

fn finish(
    loaded: Result<LedgerConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<LedgerConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

fn read_source(path: &Path) -> Option<(String, String)> {
    let content = std::fs::read_to_string(path).ok()?;
    Some((path.display().to_string(), content))
}

/// Contents of every config file that exists, for diagnostic spans.
fn collect_toml_sources() -> Vec<(String, String)> {
    let local = std::env::current_dir()
        .map(|d| d.join(loader::LOCAL_CONFIG))
        .unwrap_or_else(|_| loader::LOCAL_CONFIG.into());

    [
        local,
        loader::user_config_path(),
        Path::new(loader::SYSTEM_CONFIG).to_path_buf(),
    ]
    .iter()
    .filter_map(|p| read_source(p))
    .collect()
}
