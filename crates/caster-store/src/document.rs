// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The durable document: everything Caster persists, as one serde tree.
//!
//! Field names are part of the on-disk format; renaming any of them is a
//! breaking change for existing deployments.

use std::collections::BTreeMap;
use std::time::Duration;

use caster_core::{ChannelId, MessageRef, RunSettings};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-channel delivery counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    #[serde(default)]
    pub post_count: u64,
}

/// One dynamic channel in the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub name: String,
    #[serde(default)]
    pub stats: ChannelStats,
}

/// Workspace-wide aggregate counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalStats {
    #[serde(default)]
    pub posts: u64,
    #[serde(default)]
    pub batches: u64,
    #[serde(default)]
    pub last_post: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_post_channels: Vec<ChannelId>,
}

/// Operator-mutable delivery settings, durable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsRecord {
    pub default_delay: f64,
    pub max_retries: u32,
    pub notifications: bool,
    pub footer: String,
}

impl Default for SettingsRecord {
    fn default() -> Self {
        Self {
            default_delay: 0.1,
            max_retries: 3,
            notifications: true,
            footer: String::new(),
        }
    }
}

impl SettingsRecord {
    /// Immutable snapshot handed to the engine at run start.
    pub fn snapshot(&self) -> RunSettings {
        RunSettings {
            delay: Duration::from_secs_f64(self.default_delay),
            max_retries: self.max_retries,
            footer: if self.footer.is_empty() {
                None
            } else {
                Some(self.footer.clone())
            },
            notifications: self.notifications,
        }
    }
}

/// Per-admin activity counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminStats {
    #[serde(default)]
    pub posts: u64,
    #[serde(default)]
    pub last_action: Option<DateTime<Utc>>,
}

/// Scheduler-visible state of a persisted job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[default]
    Pending,
    Running,
}

/// One scheduled job: a frozen batch, a frozen channel set, and a due time.
///
/// Immutable once created except for `time` (reschedule) and the
/// `state`/`started_at` pair the run driver flips around execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Due time.
    pub time: DateTime<Utc>,
    /// Frozen, ordered copy of the batch.
    pub batch_ids: Vec<MessageRef>,
    /// Frozen copy of the channel selection. Never empty.
    pub channels: Vec<ChannelId>,
    pub batch_size: usize,
    /// Operator who confirmed the schedule.
    pub admin_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub state: JobState,
    /// Set on the pending -> running edge; used for crash recovery.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

/// One per-run analytics record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    pub timestamp: DateTime<Utc>,
    pub channels: Vec<ChannelId>,
    /// Successful deliveries in the run.
    pub post_count: u64,
    pub admin_id: Option<String>,
    pub batch_size: usize,
}

/// The whole durable record, read and written as a unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub admins: Vec<String>,
    pub channels: BTreeMap<String, ChannelRecord>,
    pub stats: GlobalStats,
    pub settings: SettingsRecord,
    pub admin_stats: BTreeMap<String, AdminStats>,
    pub scheduled_posts: BTreeMap<String, JobRecord>,
    pub post_analytics: BTreeMap<String, AnalyticsRecord>,
}

impl Document {
    /// The hard-coded fallback used when the durable file is missing or
    /// unreadable: empty rosters, default settings, the owner as sole admin.
    pub fn with_owner(owner_id: Option<&str>) -> Self {
        Self {
            admins: owner_id.map(|o| vec![o.to_string()]).unwrap_or_default(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_document_round_trips() {
        let doc = Document::with_owner(Some("123456789"));
        let json = serde_json::to_string_pretty(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(doc, back);
        assert_eq!(back.admins, vec!["123456789"]);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        // A document written by an older build may lack newer sections.
        let doc: Document = serde_json::from_str(r#"{"admins": ["1"]}"#).unwrap();
        assert_eq!(doc.settings.max_retries, 3);
        assert!(doc.scheduled_posts.is_empty());
    }

    #[test]
    fn job_without_state_deserializes_as_pending() {
        let json = r#"{
            "time": "2026-03-01T12:00:00Z",
            "batch_ids": [11, 12],
            "channels": ["-1002504723776"],
            "batch_size": 2,
            "admin_id": "42",
            "created_at": "2026-03-01T11:00:00Z"
        }"#;
        let job: JobRecord = serde_json::from_str(json).unwrap();
        assert_eq!(job.state, JobState::Pending);
        assert!(job.started_at.is_none());
        assert_eq!(job.batch_ids, vec![MessageRef(11), MessageRef(12)]);
    }

    #[test]
    fn settings_snapshot_maps_empty_footer_to_none() {
        let record = SettingsRecord::default();
        let snapshot = record.snapshot();
        assert!(snapshot.footer.is_none());
        assert_eq!(snapshot.delay, Duration::from_millis(100));

        let with_footer = SettingsRecord {
            footer: "via Caster".to_string(),
            ..SettingsRecord::default()
        };
        assert_eq!(with_footer.snapshot().footer.as_deref(), Some("via Caster"));
    }
}
