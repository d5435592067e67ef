// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The operator's holding area: an ordered batch of message references and
//! the channel selection attached to it.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CasterError;
use crate::types::{ChannelId, MessageRef};

/// Maximum number of messages a batch can hold.
pub const MAX_BATCH_MESSAGES: usize = 100;

/// Age after which a batch becomes void, measured from creation.
pub const BATCH_EXPIRY_HOURS: i64 = 6;

/// Result of pushing a message into a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushReceipt {
    /// True when the batch had expired and was reset before the push.
    pub expired_reset: bool,
    /// Number of messages in the batch after the push.
    pub len: usize,
}

/// An ordered sequence of message references owned by one operator session.
///
/// Ordering is significant: delivery preserves it. A batch expires
/// [`BATCH_EXPIRY_HOURS`] after creation; an expired batch is reset on the
/// next push rather than silently accepting stale content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    messages: Vec<MessageRef>,
    created_at: DateTime<Utc>,
}

impl Batch {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            messages: Vec::new(),
            created_at: now,
        }
    }

    /// Append a message, resetting first if the batch has expired.
    ///
    /// Fails with a `Validation` error when the batch is at capacity.
    pub fn push(&mut self, message: MessageRef, now: DateTime<Utc>) -> Result<PushReceipt, CasterError> {
        let expired_reset = self.is_expired(now);
        if expired_reset {
            self.messages.clear();
            self.created_at = now;
        }

        if self.messages.len() >= MAX_BATCH_MESSAGES {
            return Err(CasterError::Validation(format!(
                "batch limit reached ({}/{MAX_BATCH_MESSAGES})",
                self.messages.len()
            )));
        }

        self.messages.push(message);
        Ok(PushReceipt {
            expired_reset,
            len: self.messages.len(),
        })
    }

    /// True when the batch is older than the expiry horizon.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > ChronoDuration::hours(BATCH_EXPIRY_HOURS)
    }

    /// An immutable copy of the message references, in insertion order.
    ///
    /// This is what gets handed to the engine or frozen into a scheduled
    /// job; later edits to the batch do not affect it.
    pub fn freeze(&self) -> Vec<MessageRef> {
        self.messages.clone()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// The set of target channels attached to a batch.
///
/// Set semantics: toggling is idempotent-in-pairs, there are no duplicates,
/// and iteration order carries no meaning toward the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelSelection {
    channels: BTreeSet<ChannelId>,
}

impl ChannelSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle a channel in or out of the selection. Returns true when the
    /// channel is selected after the call.
    pub fn toggle(&mut self, channel: ChannelId) -> bool {
        if self.channels.remove(&channel) {
            false
        } else {
            self.channels.insert(channel);
            true
        }
    }

    /// Replace the selection with every channel in `channels`.
    pub fn select_all(&mut self, channels: impl IntoIterator<Item = ChannelId>) {
        self.channels = channels.into_iter().collect();
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }

    pub fn contains(&self, channel: &ChannelId) -> bool {
        self.channels.contains(channel)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Frozen copy of the selection for the engine or a scheduled job.
    pub fn freeze(&self) -> BTreeSet<ChannelId> {
        self.channels.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelId> {
        self.channels.iter()
    }
}
