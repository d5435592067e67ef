// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Caster broadcast engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so unrecognized keys are
//! rejected at startup with actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Caster configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values; `serve` additionally requires a bot token and owner at runtime.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CasterConfig {
    /// Console identity and logging.
    #[serde(default)]
    pub console: ConsoleConfig,

    /// Telegram transport settings.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Durable document store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Run driver settings.
    #[serde(default)]
    pub driver: DriverConfig,

    /// Fixed channels seeded at startup. Protected: always present in the
    /// roster and never removable by operators.
    #[serde(default, rename = "channels")]
    pub fixed_channels: Vec<FixedChannelConfig>,
}

/// Console identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConsoleConfig {
    /// User ID of the owning operator. Seeded as the first admin; cannot
    /// be removed from the admin roster. Required for `serve`.
    #[serde(default)]
    pub owner_id: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            owner_id: None,
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Telegram transport configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    /// Telegram Bot API token. `None` disables the transport (the engine
    /// can still be driven from tests or another transport).
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Chat ID of the holding area messages are copied from. Defaults to
    /// the owner's private chat with the bot.
    #[serde(default)]
    pub source_chat: Option<i64>,
}

/// Durable document store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Path to the durable JSON document. A sibling `<path>.lock` file
    /// carries the cross-process advisory lock.
    #[serde(default = "default_data_file")]
    pub data_file: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
        }
    }
}

fn default_data_file() -> String {
    "caster.json".to_string()
}

/// Run driver configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    /// Seconds between scheduler polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    60
}

/// One fixed channel entry, `[[channels]]` in TOML.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FixedChannelConfig {
    /// Platform chat ID, `-100` followed by at least ten digits.
    pub id: String,

    /// Display name shown in roster listings.
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = CasterConfig::default();
        assert_eq!(config.console.log_level, "info");
        assert!(config.console.owner_id.is_none());
        assert_eq!(config.store.data_file, "caster.json");
        assert_eq!(config.driver.poll_interval_secs, 60);
        assert!(config.fixed_channels.is_empty());
    }

    #[test]
    fn fixed_channels_deserialize_from_array_of_tables() {
        let toml_str = r#"
[console]
owner_id = "123456789"

[[channels]]
id = "-1002504723776"
name = "Official Announcements"

[[channels]]
id = "-1002489624380"
name = "Secondary Channel"
"#;
        let config: CasterConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.fixed_channels.len(), 2);
        assert_eq!(config.fixed_channels[0].id, "-1002504723776");
        assert_eq!(config.fixed_channels[1].name, "Secondary Channel");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml_str = r#"
[driver]
pol_interval_secs = 30
"#;
        assert!(toml::from_str::<CasterConfig>(toml_str).is_err());
    }
}
