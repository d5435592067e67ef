// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: ID shapes, non-empty paths, positive intervals.

use std::collections::HashSet;

use caster_core::{validate_channel_id, validate_user_id};

use crate::diagnostic::ConfigError;
use crate::model::CasterConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure rather than failing fast, so the operator sees
/// all problems in one pass.
pub fn validate_config(config: &CasterConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if let Some(owner) = &config.console.owner_id
        && !validate_user_id(owner)
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "console.owner_id `{owner}` must be a decimal user ID of at most 20 digits"
            ),
        });
    }

    if config.store.data_file.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "store.data_file must not be empty".to_string(),
        });
    }

    if config.driver.poll_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "driver.poll_interval_secs must be at least 1".to_string(),
        });
    }

    let mut seen_ids = HashSet::new();
    for (i, channel) in config.fixed_channels.iter().enumerate() {
        if !validate_channel_id(&channel.id) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "channels[{i}].id `{}` is not a valid channel ID (-100 followed by at least ten digits)",
                    channel.id
                ),
            });
        }
        if channel.name.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("channels[{i}].name must not be empty"),
            });
        }
        if !seen_ids.insert(&channel.id) {
            errors.push(ConfigError::Validation {
                message: format!("duplicate channel ID `{}` in [[channels]] array", channel.id),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
