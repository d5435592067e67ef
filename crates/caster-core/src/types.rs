// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Caster workspace.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Maximum footer length in characters; longer footers are truncated at
/// delivery time and rejected at configuration time.
pub const MAX_FOOTER_LENGTH: usize = 200;

/// Opaque reference to a previously captured message in the holding area.
///
/// The inner value is the platform message ID. The engine never inspects
/// it; ordering within a batch is the only property it relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageRef(pub i64);

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a target distribution channel (platform chat ID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Platform-assigned identifier of a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveredId(pub String);

/// Immutable snapshot of the delivery settings taken at run start.
///
/// Operator edits to the durable settings after a run has started must not
/// change the behavior of the in-flight run, so the engine works from this
/// copy rather than the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    /// Pause between cells (rate limit against the external transport).
    pub delay: Duration,
    /// Additional attempts after the first failed delivery of a cell.
    pub max_retries: u32,
    /// Optional footer delivered as a second message after each successful
    /// cell. `None` disables footer delivery.
    pub footer: Option<String>,
    /// Whether to notify the operator on run completion.
    pub notifications: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(100),
            max_retries: 3,
            footer: None,
            notifications: true,
        }
    }
}

/// One delivery that exhausted its retry budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryFailure {
    /// The message that could not be delivered.
    pub message: MessageRef,
    /// Short error summary from the last attempt.
    pub error: String,
}

/// Outcome of one dispatch run over a message set and a channel set.
///
/// Invariant: `succeeded + failed_count() == total`, and `total` is always
/// `|messages| * |channels|` for the inputs the run was started with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Total number of cells: `|messages| * |channels|`.
    pub total: usize,
    /// Cells that delivered successfully.
    pub succeeded: usize,
    /// Per-channel list of deliveries that exhausted retries.
    pub failures: BTreeMap<ChannelId, Vec<DeliveryFailure>>,
}

impl RunResult {
    /// Number of cells that exhausted their retry budget.
    pub fn failed_count(&self) -> usize {
        self.failures.values().map(Vec::len).sum()
    }

    /// True when every cell delivered successfully.
    pub fn is_fully_successful(&self) -> bool {
        self.succeeded == self.total
    }
}

/// Live progress snapshot emitted to the caller's progress sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Cells attempted so far (successes plus exhausted failures).
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Cells not yet attempted.
    pub remaining: usize,
    /// `completed / total` in percent.
    pub percent: f64,
}
