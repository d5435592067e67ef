// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./caster.toml` > `~/.config/caster/caster.toml`
//! > `/etc/caster/caster.toml`, with environment variable overrides via the
//! `CASTER_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::CasterConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/caster/caster.toml` (system-wide)
/// 3. `~/.config/caster/caster.toml` (user XDG config)
/// 4. `./caster.toml` (local directory)
/// 5. `CASTER_*` environment variables
pub fn load_config() -> Result<CasterConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<CasterConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CasterConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CasterConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CasterConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CasterConfig::default()))
        .merge(Toml::file("/etc/caster/caster.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("caster/caster.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("caster.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names
/// contain underscores: `CASTER_TELEGRAM_BOT_TOKEN` must map to
/// `telegram.bot_token`, not `telegram.bot.token`.
fn env_provider() -> Env {
    Env::prefixed("CASTER_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("console_", "console.", 1)
            .replacen("telegram_", "telegram.", 1)
            .replacen("store_", "store.", 1)
            .replacen("driver_", "driver.", 1);
        mapped.into()
    })
}
