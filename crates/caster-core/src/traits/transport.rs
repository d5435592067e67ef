// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport seam: the external delivery collaborator.

use async_trait::async_trait;

use crate::error::CasterError;
use crate::types::{ChannelId, DeliveredId, MessageRef};

/// The chat transport used to actually deliver a message.
///
/// The engine treats any error from this boundary as retryable up to the
/// run's attempt budget; the transport does not retry internally.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a previously captured message to a channel.
    async fn deliver(
        &self,
        channel: &ChannelId,
        message: MessageRef,
    ) -> Result<DeliveredId, CasterError>;

    /// Deliver plain text to a channel (used for footers).
    async fn deliver_text(&self, channel: &ChannelId, text: &str) -> Result<(), CasterError>;
}
