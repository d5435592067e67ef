// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable accounting: the fold from one ephemeral run result into the
//! aggregate counters and the analytics table.

use std::collections::BTreeMap;

use caster_core::ChannelId;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::document::{AdminStats, AnalyticsRecord, ChannelRecord, ChannelStats};
use crate::store::Store;

/// Everything the counters need from one completed run.
#[derive(Debug, Clone)]
pub struct RunRecord {
    /// Freshly generated run ID; keys the analytics record.
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    /// Operator credited with the run, when known.
    pub admin_id: Option<String>,
    /// The channel set the run targeted.
    pub channels: Vec<ChannelId>,
    /// Messages in the batch.
    pub batch_size: usize,
    /// Total successful cells.
    pub succeeded: u64,
    /// Successful cells per channel.
    pub per_channel_succeeded: BTreeMap<ChannelId, u64>,
}

impl Store {
    /// Fold one run into the durable counters and write an analytics record.
    ///
    /// Idempotent per run ID: replaying the same record overwrites the same
    /// analytics entry but double-counts the aggregates, so callers invoke
    /// this exactly once per run. Save failures are logged and swallowed.
    pub fn record_run(&self, record: &RunRecord) {
        self.mutate(|doc| {
            doc.stats.posts += record.succeeded;
            doc.stats.batches += 1;
            doc.stats.last_post = Some(record.timestamp);
            doc.stats.last_post_channels = record.channels.clone();

            for channel in &record.channels {
                let delivered = record
                    .per_channel_succeeded
                    .get(channel)
                    .copied()
                    .unwrap_or(0);
                let known_fixed = self
                    .fixed_channels()
                    .iter()
                    .any(|f| f.id == channel.as_str());
                if !known_fixed && !doc.channels.contains_key(channel.as_str()) {
                    // A channel removed from the roster after the job froze
                    // its selection; nothing to attribute the count to.
                    continue;
                }
                let entry = doc
                    .channels
                    .entry(channel.as_str().to_string())
                    .or_insert_with(|| ChannelRecord {
                        name: format!("Channel {channel}"),
                        stats: ChannelStats::default(),
                    });
                entry.stats.post_count += delivered;
            }

            if let Some(admin_id) = &record.admin_id {
                let entry = doc
                    .admin_stats
                    .entry(admin_id.clone())
                    .or_insert_with(AdminStats::default);
                entry.posts += record.succeeded;
                entry.last_action = Some(record.timestamp);
            }

            doc.post_analytics.insert(
                record.run_id.clone(),
                AnalyticsRecord {
                    timestamp: record.timestamp,
                    channels: record.channels.clone(),
                    post_count: record.succeeded,
                    admin_id: record.admin_id.clone(),
                    batch_size: record.batch_size,
                },
            );
        });

        if let Err(err) = self.persist() {
            warn!(error = %err, run_id = %record.run_id, "run counters not persisted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caster_config::FixedChannelConfig;
    use tempfile::tempdir;

    fn ts() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().unwrap()
    }

    fn record(channels: &[(&str, u64)], succeeded: u64) -> RunRecord {
        RunRecord {
            run_id: "run-1".to_string(),
            timestamp: ts(),
            admin_id: Some("42".to_string()),
            channels: channels.iter().map(|(c, _)| ChannelId::from(*c)).collect(),
            batch_size: 3,
            succeeded,
            per_channel_succeeded: channels
                .iter()
                .map(|(c, n)| (ChannelId::from(*c), *n))
                .collect(),
        }
    }

    #[test]
    fn record_run_folds_all_counters() {
        let dir = tempdir().unwrap();
        let store = Store::open(
            dir.path().join("state.json"),
            vec![FixedChannelConfig {
                id: "-1002504723776".to_string(),
                name: "Official Announcements".to_string(),
            }],
            Some("1".to_string()),
        );
        store
            .add_channel(&ChannelId::from("-1009876543210"), "Side")
            .unwrap();

        store.record_run(&record(
            &[("-1002504723776", 3), ("-1009876543210", 2)],
            5,
        ));

        store.read(|doc| {
            assert_eq!(doc.stats.posts, 5);
            assert_eq!(doc.stats.batches, 1);
            assert_eq!(doc.stats.last_post, Some(ts()));
            assert_eq!(doc.stats.last_post_channels.len(), 2);
            // Fixed channel got a document record created on demand.
            assert_eq!(doc.channels["-1002504723776"].stats.post_count, 3);
            assert_eq!(doc.channels["-1009876543210"].stats.post_count, 2);
            assert_eq!(doc.admin_stats["42"].posts, 5);
            assert_eq!(doc.admin_stats["42"].last_action, Some(ts()));
            let analytics = &doc.post_analytics["run-1"];
            assert_eq!(analytics.post_count, 5);
            assert_eq!(analytics.batch_size, 3);
            assert_eq!(analytics.admin_id.as_deref(), Some("42"));
        });
    }

    #[test]
    fn unknown_channel_is_skipped_not_created() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("state.json"), Vec::new(), Some("1".to_string()));

        store.record_run(&record(&[("-1001112223334", 2)], 2));

        store.read(|doc| {
            // Aggregates still advance; the per-channel counter has no home.
            assert_eq!(doc.stats.posts, 2);
            assert!(!doc.channels.contains_key("-1001112223334"));
        });
    }

    #[test]
    fn successive_runs_accumulate() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("state.json"), Vec::new(), Some("1".to_string()));
        store
            .add_channel(&ChannelId::from("-1009876543210"), "Side")
            .unwrap();

        let mut first = record(&[("-1009876543210", 3)], 3);
        let mut second = record(&[("-1009876543210", 1)], 1);
        second.run_id = "run-2".to_string();
        first.run_id = "run-1".to_string();
        store.record_run(&first);
        store.record_run(&second);

        store.read(|doc| {
            assert_eq!(doc.stats.posts, 4);
            assert_eq!(doc.stats.batches, 2);
            assert_eq!(doc.channels["-1009876543210"].stats.post_count, 4);
            assert_eq!(doc.post_analytics.len(), 2);
        });
    }
}
