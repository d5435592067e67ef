// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dispatch engine: executes one posting run.
//!
//! A run iterates the cartesian product of an ordered message set and a
//! channel set (messages outer, so batch order is preserved toward every
//! channel), retrying each cell under a bounded budget. A failing cell is
//! recorded and the run continues; only structurally empty input errors.
//! Cells run strictly sequentially with a pause between them to respect
//! the external transport's rate limits.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use caster_core::{
    CasterError, ChannelId, DeliveryFailure, MessageRef, NullSink, Progress, ProgressSink,
    RunResult, RunSettings, Transport, types::MAX_FOOTER_LENGTH, validate_channel_id,
};
use caster_store::{RunRecord, Store};
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Flat pause between attempts of the same cell, distinct from the
/// inter-cell delay.
pub const RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Executes posting runs against a transport, folding results into the
/// durable counters on completion.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    store: Arc<Store>,
    sink: Arc<dyn ProgressSink>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<Store>) -> Self {
        Self {
            transport,
            store,
            sink: Arc::new(NullSink),
        }
    }

    /// Attach a progress sink; snapshots go to [`NullSink`] otherwise.
    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Execute one run.
    ///
    /// Every message is attempted against every channel before the run is
    /// considered complete; per-cell failures never abort it. Returns an
    /// error only for structurally empty input. The caller passes a
    /// settings snapshot taken at run start; mid-run operator edits do
    /// not reach an in-flight run.
    pub async fn run(
        &self,
        messages: &[MessageRef],
        channels: &[ChannelId],
        settings: &RunSettings,
        operator: Option<&str>,
    ) -> Result<RunResult, CasterError> {
        if messages.is_empty() {
            return Err(CasterError::EmptyBatch);
        }
        if channels.is_empty() {
            return Err(CasterError::EmptyChannels);
        }

        let total = messages.len() * channels.len();
        // Snapshot cadence: every ~10% of total operations, every cell for
        // small runs.
        let snapshot_every = (total / 10).max(1);
        let footer = settings
            .footer
            .as_deref()
            .map(|f| f.chars().take(MAX_FOOTER_LENGTH).collect::<String>());

        info!(
            messages = messages.len(),
            channels = channels.len(),
            total,
            max_retries = settings.max_retries,
            "dispatch run started"
        );

        let mut succeeded = 0usize;
        let mut failures: BTreeMap<ChannelId, Vec<DeliveryFailure>> = BTreeMap::new();
        let mut per_channel_succeeded: BTreeMap<ChannelId, u64> = BTreeMap::new();
        let mut completed = 0usize;

        for message in messages {
            for channel in channels {
                // A channel that no longer validates (removed or mangled
                // after the job froze its selection) is skipped per cell
                // rather than failing the whole job. No transport contact,
                // so no rate-limit pause either.
                if !validate_channel_id(channel.as_str()) {
                    warn!(channel = %channel, "skipping malformed channel");
                    failures.entry(channel.clone()).or_default().push(DeliveryFailure {
                        message: *message,
                        error: "malformed channel id".to_string(),
                    });
                    completed += 1;
                    self.emit_progress(completed, succeeded, total, snapshot_every)
                        .await;
                    continue;
                }

                match self.deliver_cell(channel, *message, settings).await {
                    Ok(()) => {
                        succeeded += 1;
                        *per_channel_succeeded.entry(channel.clone()).or_default() += 1;
                        if let Some(footer) = &footer
                            && let Err(err) = self.transport.deliver_text(channel, footer).await
                        {
                            // The message itself landed; a lost footer does
                            // not fail the cell.
                            warn!(channel = %channel, error = %err, "footer delivery failed");
                        }
                    }
                    Err(err) => {
                        warn!(
                            channel = %channel,
                            message = %message,
                            error = %err,
                            "delivery failed after exhausting retries"
                        );
                        failures.entry(channel.clone()).or_default().push(DeliveryFailure {
                            message: *message,
                            error: err.summary(),
                        });
                    }
                }

                completed += 1;
                self.emit_progress(completed, succeeded, total, snapshot_every)
                    .await;

                if completed < total {
                    tokio::time::sleep(settings.delay).await;
                }
            }
        }

        let result = RunResult {
            total,
            succeeded,
            failures,
        };

        self.record(&result, channels, messages.len(), per_channel_succeeded, operator);

        info!(
            succeeded = result.succeeded,
            failed = result.failed_count(),
            total = result.total,
            "dispatch run complete"
        );
        Ok(result)
    }

    /// Attempt one cell up to `max_retries + 1` times with a flat pause
    /// between attempts.
    async fn deliver_cell(
        &self,
        channel: &ChannelId,
        message: MessageRef,
        settings: &RunSettings,
    ) -> Result<(), CasterError> {
        let mut last_err = None;
        for attempt in 0..=settings.max_retries {
            match self.transport.deliver(channel, message).await {
                Ok(delivered) => {
                    debug!(
                        channel = %channel,
                        message = %message,
                        delivered = %delivered.0,
                        attempt,
                        "cell delivered"
                    );
                    return Ok(());
                }
                Err(err) => {
                    debug!(channel = %channel, message = %message, attempt, error = %err, "attempt failed");
                    last_err = Some(err);
                    if attempt < settings.max_retries {
                        tokio::time::sleep(RETRY_PAUSE).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| CasterError::transport("delivery failed")))
    }

    async fn emit_progress(
        &self,
        completed: usize,
        succeeded: usize,
        total: usize,
        snapshot_every: usize,
    ) {
        if completed % snapshot_every == 0 || completed == total {
            self.sink
                .on_progress(Progress {
                    completed,
                    succeeded,
                    failed: completed - succeeded,
                    remaining: total - completed,
                    percent: completed as f64 / total as f64 * 100.0,
                })
                .await;
        }
    }

    /// Fold the run into the durable counters and analytics table.
    fn record(
        &self,
        result: &RunResult,
        channels: &[ChannelId],
        batch_size: usize,
        per_channel_succeeded: BTreeMap<ChannelId, u64>,
        operator: Option<&str>,
    ) {
        self.store.record_run(&RunRecord {
            run_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            admin_id: operator.map(str::to_string),
            channels: channels.to_vec(),
            batch_size,
            succeeded: result.succeeded as u64,
            per_channel_succeeded,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caster_test_utils::{CollectingSink, MockTransport, TransportCall, store_fixture};
    use proptest::prelude::*;

    const CH_A: &str = "-1001111111111";
    const CH_B: &str = "-1002222222222";

    fn messages(n: i64) -> Vec<MessageRef> {
        (1..=n).map(MessageRef).collect()
    }

    fn channels(ids: &[&str]) -> Vec<ChannelId> {
        ids.iter().map(|c| ChannelId::from(*c)).collect()
    }

    fn fast_settings(max_retries: u32) -> RunSettings {
        RunSettings {
            delay: Duration::from_millis(10),
            max_retries,
            footer: None,
            notifications: true,
        }
    }

    fn dispatcher(transport: &MockTransport) -> (Dispatcher, tempfile::TempDir) {
        let (store, dir) = store_fixture(Vec::new(), "1");
        let dispatcher = Dispatcher::new(Arc::new(transport.clone()), Arc::new(store));
        (dispatcher, dir)
    }

    #[tokio::test(start_paused = true)]
    async fn empty_inputs_are_structural_errors() {
        let transport = MockTransport::new();
        let (dispatcher, _dir) = dispatcher(&transport);

        let err = dispatcher
            .run(&[], &channels(&[CH_A]), &fast_settings(0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CasterError::EmptyBatch));

        let err = dispatcher
            .run(&messages(1), &[], &fast_settings(0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CasterError::EmptyChannels));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_channel_is_accounted_not_fatal() {
        // The reference end-to-end scenario: 3 messages, 2 channels,
        // max_retries = 0, channel B fails every call.
        let transport = MockTransport::new();
        transport.fail_channel(ChannelId::from(CH_B)).await;
        let (dispatcher, _dir) = dispatcher(&transport);

        let result = dispatcher
            .run(&messages(3), &channels(&[CH_A, CH_B]), &fast_settings(0), None)
            .await
            .unwrap();

        assert_eq!(result.total, 6);
        assert_eq!(result.succeeded, 3);
        assert_eq!(result.failed_count(), 3);
        let b_failures = &result.failures[&ChannelId::from(CH_B)];
        assert_eq!(b_failures.len(), 3);
        assert!(!result.failures.contains_key(&ChannelId::from(CH_A)));
    }

    #[tokio::test(start_paused = true)]
    async fn batch_order_is_preserved_per_channel() {
        let transport = MockTransport::new();
        let (dispatcher, _dir) = dispatcher(&transport);

        dispatcher
            .run(&messages(3), &channels(&[CH_A]), &fast_settings(0), None)
            .await
            .unwrap();

        let delivered: Vec<MessageRef> = transport
            .calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                TransportCall::Deliver { message, .. } => Some(message),
                _ => None,
            })
            .collect();
        assert_eq!(delivered, vec![MessageRef(1), MessageRef(2), MessageRef(3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_budget_is_max_retries_plus_one() {
        let transport = MockTransport::new();
        transport.fail_channel(ChannelId::from(CH_A)).await;
        let (dispatcher, _dir) = dispatcher(&transport);

        let result = dispatcher
            .run(&messages(1), &channels(&[CH_A]), &fast_settings(2), None)
            .await
            .unwrap();

        assert_eq!(result.succeeded, 0);
        assert_eq!(
            transport
                .deliver_attempts(&ChannelId::from(CH_A), MessageRef(1))
                .await,
            3
        );
    }

    #[tokio::test(start_paused = true)]
    async fn flaky_cell_succeeds_within_budget() {
        let transport = MockTransport::new();
        transport
            .fail_times(ChannelId::from(CH_A), MessageRef(1), 2)
            .await;
        let (dispatcher, _dir) = dispatcher(&transport);

        let result = dispatcher
            .run(&messages(1), &channels(&[CH_A]), &fast_settings(3), None)
            .await
            .unwrap();

        assert_eq!(result.succeeded, 1);
        assert_eq!(
            transport
                .deliver_attempts(&ChannelId::from(CH_A), MessageRef(1))
                .await,
            3
        );
    }

    #[tokio::test(start_paused = true)]
    async fn footer_adds_exactly_one_call_per_successful_cell() {
        let transport = MockTransport::new();
        transport.fail_channel(ChannelId::from(CH_B)).await;
        let (dispatcher, _dir) = dispatcher(&transport);

        let settings = RunSettings {
            footer: Some("via Caster".to_string()),
            ..fast_settings(0)
        };
        let result = dispatcher
            .run(&messages(2), &channels(&[CH_A, CH_B]), &settings, None)
            .await
            .unwrap();

        // 2 successes on channel A, 0 on B: exactly 2 footer calls.
        assert_eq!(result.succeeded, 2);
        assert_eq!(transport.text_call_count().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn no_footer_means_no_text_calls() {
        let transport = MockTransport::new();
        let (dispatcher, _dir) = dispatcher(&transport);

        dispatcher
            .run(&messages(2), &channels(&[CH_A]), &fast_settings(0), None)
            .await
            .unwrap();
        assert_eq!(transport.text_call_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn overlong_footer_is_truncated_at_delivery() {
        let transport = MockTransport::new();
        let (dispatcher, _dir) = dispatcher(&transport);

        let settings = RunSettings {
            footer: Some("x".repeat(500)),
            ..fast_settings(0)
        };
        dispatcher
            .run(&messages(1), &channels(&[CH_A]), &settings, None)
            .await
            .unwrap();

        let calls = transport.calls().await;
        let footer_len = calls
            .iter()
            .find_map(|c| match c {
                TransportCall::DeliverText { text, .. } => Some(text.chars().count()),
                _ => None,
            })
            .unwrap();
        assert_eq!(footer_len, MAX_FOOTER_LENGTH);
    }

    #[tokio::test(start_paused = true)]
    async fn footer_failure_does_not_fail_the_cell() {
        let transport = MockTransport::new();
        transport.fail_text_channel(ChannelId::from(CH_A)).await;
        let (dispatcher, _dir) = dispatcher(&transport);

        let settings = RunSettings {
            footer: Some("tail".to_string()),
            ..fast_settings(0)
        };
        let result = dispatcher
            .run(&messages(2), &channels(&[CH_A]), &settings, None)
            .await
            .unwrap();

        // Messages landed; only the footers were lost.
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_channel_cells_fail_without_transport_contact() {
        let transport = MockTransport::new();
        let (dispatcher, _dir) = dispatcher(&transport);

        let bad = ChannelId::from("not-a-channel");
        let result = dispatcher
            .run(
                &messages(2),
                &[ChannelId::from(CH_A), bad.clone()],
                &fast_settings(0),
                None,
            )
            .await
            .unwrap();

        // Accounting still covers every cell.
        assert_eq!(result.total, 4);
        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failures[&bad].len(), 2);
        // The malformed channel never reached the transport.
        assert_eq!(transport.deliver_attempts(&bad, MessageRef(1)).await, 0);
        assert_eq!(transport.deliver_attempts(&bad, MessageRef(2)).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_cadence_small_run_reports_every_cell() {
        let transport = MockTransport::new();
        let sink = CollectingSink::new();
        let (store, _dir) = store_fixture(Vec::new(), "1");
        let dispatcher = Dispatcher::new(Arc::new(transport), Arc::new(store))
            .with_sink(Arc::new(sink.clone()));

        dispatcher
            .run(&messages(3), &channels(&[CH_A]), &fast_settings(0), None)
            .await
            .unwrap();

        // 3 cells < 10: a snapshot per cell, final one at 100%.
        let snapshots = sink.snapshots().await;
        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots.last().unwrap().completed, 3);
        assert_eq!(snapshots.last().unwrap().remaining, 0);
        assert!((snapshots.last().unwrap().percent - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_cadence_large_run_reports_every_tenth() {
        let transport = MockTransport::new();
        let sink = CollectingSink::new();
        let (store, _dir) = store_fixture(Vec::new(), "1");
        let dispatcher = Dispatcher::new(Arc::new(transport), Arc::new(store))
            .with_sink(Arc::new(sink.clone()));

        // 20 messages x 1 channel = 20 cells, snapshot every 2.
        dispatcher
            .run(&messages(20), &channels(&[CH_A]), &fast_settings(0), None)
            .await
            .unwrap();

        let snapshots = sink.snapshots().await;
        assert_eq!(snapshots.len(), 10);
        assert!(snapshots.iter().all(|p| p.completed % 2 == 0));
    }

    #[tokio::test(start_paused = true)]
    async fn completion_folds_counters_into_store() {
        let transport = MockTransport::new();
        transport.fail_channel(ChannelId::from(CH_B)).await;
        let (store, _dir) = store_fixture(Vec::new(), "1");
        let store = Arc::new(store);
        store.add_channel(&ChannelId::from(CH_A), "A").unwrap();
        store.add_channel(&ChannelId::from(CH_B), "B").unwrap();
        let dispatcher = Dispatcher::new(Arc::new(transport), store.clone());

        dispatcher
            .run(
                &messages(3),
                &channels(&[CH_A, CH_B]),
                &fast_settings(0),
                Some("42"),
            )
            .await
            .unwrap();

        store.read(|doc| {
            assert_eq!(doc.stats.posts, 3);
            assert_eq!(doc.stats.batches, 1);
            assert_eq!(doc.channels[CH_A].stats.post_count, 3);
            assert_eq!(doc.channels[CH_B].stats.post_count, 0);
            assert_eq!(doc.admin_stats["42"].posts, 3);
            assert_eq!(doc.post_analytics.len(), 1);
            let analytics = doc.post_analytics.values().next().unwrap();
            assert_eq!(analytics.post_count, 3);
            assert_eq!(analytics.batch_size, 3);
        });
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// succeeded + sum(failures) == |M| * |C| for any mix of healthy
        /// and failing channels.
        #[test]
        fn accounting_invariant_holds(
            n_messages in 1usize..6,
            healthy in 0usize..3,
            failing in 0usize..3,
        ) {
            prop_assume!(healthy + failing > 0);
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            rt.block_on(async {
                tokio::time::pause();
                let transport = MockTransport::new();
                let mut chans = Vec::new();
                for i in 0..healthy {
                    chans.push(ChannelId(format!("-10011111111{i:02}")));
                }
                for i in 0..failing {
                    let ch = ChannelId(format!("-10022222222{i:02}"));
                    transport.fail_channel(ch.clone()).await;
                    chans.push(ch);
                }
                let (store, _dir) = store_fixture(Vec::new(), "1");
                let dispatcher = Dispatcher::new(Arc::new(transport), Arc::new(store));

                let result = dispatcher
                    .run(&messages(n_messages as i64), &chans, &fast_settings(1), None)
                    .await
                    .unwrap();

                assert_eq!(result.total, n_messages * (healthy + failing));
                assert_eq!(
                    result.succeeded + result.failed_count(),
                    result.total
                );
                assert_eq!(result.succeeded, n_messages * healthy);
            });
        }
    }
}
