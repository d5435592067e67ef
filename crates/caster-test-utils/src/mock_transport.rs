// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic testing.
//!
//! `MockTransport` implements `Transport` with per-channel failure
//! injection and full call recording for assertion in tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use caster_core::{CasterError, ChannelId, DeliveredId, MessageRef, Transport};

/// One recorded transport invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    /// A message delivery attempt.
    Deliver {
        channel: ChannelId,
        message: MessageRef,
    },
    /// A text (footer) delivery attempt.
    DeliverText { channel: ChannelId, text: String },
}

#[derive(Default)]
struct State {
    calls: Vec<TransportCall>,
    /// Channels where every delivery fails.
    failing: HashSet<ChannelId>,
    /// Channels where only text (footer) delivery fails.
    failing_text: HashSet<ChannelId>,
    /// Per-(channel, message) countdown of failures before success.
    flaky: HashMap<(ChannelId, MessageRef), u32>,
    next_id: u64,
}

/// A scriptable in-memory transport.
///
/// By default every delivery succeeds. Use [`fail_channel`](Self::fail_channel)
/// to make a channel fail permanently, or [`fail_times`](Self::fail_times)
/// to make one cell fail a fixed number of attempts before succeeding.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delivery to `channel` fails with a transport error.
    pub async fn fail_channel(&self, channel: ChannelId) {
        self.state.lock().await.failing.insert(channel);
    }

    /// The first `failures` delivery attempts of `(channel, message)` fail,
    /// subsequent attempts succeed.
    pub async fn fail_times(&self, channel: ChannelId, message: MessageRef, failures: u32) {
        self.state.lock().await.flaky.insert((channel, message), failures);
    }

    /// Only text (footer) deliveries to `channel` fail; messages still land.
    pub async fn fail_text_channel(&self, channel: ChannelId) {
        self.state.lock().await.failing_text.insert(channel);
    }

    /// Every call recorded so far, in invocation order.
    pub async fn calls(&self) -> Vec<TransportCall> {
        self.state.lock().await.calls.clone()
    }

    /// Count of message-delivery attempts for one cell.
    pub async fn deliver_attempts(&self, channel: &ChannelId, message: MessageRef) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| {
                matches!(c, TransportCall::Deliver { channel: ch, message: m }
                    if ch == channel && *m == message)
            })
            .count()
    }

    /// Count of text (footer) deliveries across all channels.
    pub async fn text_call_count(&self) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| matches!(c, TransportCall::DeliverText { .. }))
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn deliver(
        &self,
        channel: &ChannelId,
        message: MessageRef,
    ) -> Result<DeliveredId, CasterError> {
        let mut state = self.state.lock().await;
        state.calls.push(TransportCall::Deliver {
            channel: channel.clone(),
            message,
        });

        if state.failing.contains(channel) {
            return Err(CasterError::transport(format!(
                "injected failure for {channel}"
            )));
        }
        if let Some(remaining) = state.flaky.get_mut(&(channel.clone(), message)) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(CasterError::transport(format!(
                    "injected flaky failure for {channel}/{message}"
                )));
            }
        }

        state.next_id += 1;
        Ok(DeliveredId(format!("mock-delivery-{}", state.next_id)))
    }

    async fn deliver_text(&self, channel: &ChannelId, text: &str) -> Result<(), CasterError> {
        let mut state = self.state.lock().await;
        state.calls.push(TransportCall::DeliverText {
            channel: channel.clone(),
            text: text.to_string(),
        });

        if state.failing.contains(channel) || state.failing_text.contains(channel) {
            return Err(CasterError::transport(format!(
                "injected failure for {channel}"
            )));
        }
        Ok(())
    }
}
