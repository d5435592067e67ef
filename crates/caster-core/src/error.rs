// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Caster broadcast engine.

use thiserror::Error;

/// The primary error type used across all Caster crates.
///
/// The policy attached to each variant matters as much as the variant
/// itself: `Transport` is retryable up to the run's attempt budget,
/// `Persistence` is logged and swallowed by callers that prefer
/// availability over durability, and everything else is surfaced to the
/// operator immediately.
#[derive(Debug, Error)]
pub enum CasterError {
    /// Malformed input: bad schedule time, bad channel or user ID shape,
    /// out-of-bounds setting, batch overflow.
    #[error("validation error: {0}")]
    Validation(String),

    /// A proposed schedule time collides with an existing job that shares
    /// at least one target channel.
    #[error("schedule conflict: another job within {window_secs}s shares a target channel")]
    Conflict {
        /// Width of the collision window that was violated, in seconds.
        window_secs: i64,
    },

    /// Unknown job, channel, or admin ID. A warning, not fatal.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A dispatch or schedule was requested with no messages queued.
    #[error("batch is empty")]
    EmptyBatch,

    /// A dispatch or schedule was requested with no target channels.
    #[error("no target channels selected")]
    EmptyChannels,

    /// Delivery failure at the transport boundary (connection, rate limit,
    /// platform rejection). Retried up to the configured budget.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Durable store unreadable or unwritable. Reads fall back to the
    /// cached document; write failures are reported for the caller to
    /// log and swallow.
    #[error("persistence error: {source}")]
    Persistence {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CasterError {
    /// Build a `Transport` error from any source error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Build a `Persistence` error from any I/O or serialization source.
    pub fn persistence(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence {
            source: Box::new(source),
        }
    }

    /// A short summary suitable for the per-channel failure map.
    pub fn summary(&self) -> String {
        match self {
            Self::Transport { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
