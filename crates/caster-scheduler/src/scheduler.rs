// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The scheduled-job table: create, list, cancel, reschedule, expire,
//! poll-for-due, and the running-state edges the run driver flips.
//!
//! Jobs live in the durable document; every operation here runs its
//! validation inside a single store mutation, so concurrent operator
//! actions within the process cannot interleave between check and insert.
//! Persistence after a mutation is best-effort by policy.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use caster_core::{CasterError, ChannelId, MessageRef};
use caster_store::{JobRecord, JobState, Store};
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::conflict::has_conflict;

/// A pending job more than this many days past due is treated as abandoned
/// and purged without running, to avoid delivering badly stale content.
pub const SCHEDULE_EXPIRY_DAYS: i64 = 7;

/// Operator- and driver-facing view of one scheduled job.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub due_time: DateTime<Utc>,
    pub messages: Vec<MessageRef>,
    pub channels: Vec<ChannelId>,
    pub batch_size: usize,
    pub operator: String,
    pub created_at: DateTime<Utc>,
    pub state: JobState,
}

impl Job {
    fn from_record(id: &str, record: &JobRecord) -> Self {
        Self {
            id: id.to_string(),
            due_time: record.time,
            messages: record.batch_ids.clone(),
            channels: record.channels.clone(),
            batch_size: record.batch_size,
            operator: record.admin_id.clone(),
            created_at: record.created_at,
            state: record.state,
        }
    }
}

/// Owns the scheduled-job table lifecycle.
pub struct Scheduler {
    store: Arc<Store>,
}

impl Scheduler {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Persist a new pending job.
    ///
    /// Fails with `EmptyBatch`/`EmptyChannels` for empty inputs and
    /// `Conflict` when another job shares a channel within the collision
    /// window. The messages and channels are frozen copies: later batch or
    /// roster edits do not affect the job.
    pub fn create(
        &self,
        due_time: DateTime<Utc>,
        messages: Vec<MessageRef>,
        channels: Vec<ChannelId>,
        operator: &str,
        now: DateTime<Utc>,
    ) -> Result<String, CasterError> {
        if messages.is_empty() {
            return Err(CasterError::EmptyBatch);
        }
        if channels.is_empty() {
            return Err(CasterError::EmptyChannels);
        }
        // Set semantics for the frozen channel copy.
        let channels: Vec<ChannelId> = channels
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let job_id = Uuid::new_v4().to_string();
        let created = self.store.mutate(|doc| {
            if has_conflict(doc.scheduled_posts.iter(), due_time, &channels, None) {
                return Err(CasterError::Conflict {
                    window_secs: crate::conflict::CONFLICT_WINDOW_SECS,
                });
            }
            doc.scheduled_posts.insert(
                job_id.clone(),
                JobRecord {
                    time: due_time,
                    batch_size: messages.len(),
                    batch_ids: messages.clone(),
                    channels: channels.clone(),
                    admin_id: operator.to_string(),
                    created_at: now,
                    state: JobState::Pending,
                    started_at: None,
                },
            );
            Ok(())
        });
        created?;

        self.persist_table();
        info!(job_id, due = %due_time, operator, "scheduled job created");
        Ok(job_id)
    }

    /// Remove a pending job. Unknown or already-running IDs are `NotFound`.
    pub fn cancel(&self, job_id: &str) -> Result<(), CasterError> {
        let removed = self.store.mutate(|doc| {
            match doc.scheduled_posts.get(job_id) {
                Some(job) if job.state == JobState::Pending => {
                    doc.scheduled_posts.remove(job_id);
                    true
                }
                _ => false,
            }
        });
        if !removed {
            return Err(not_found(job_id));
        }
        self.persist_table();
        info!(job_id, "scheduled job cancelled");
        Ok(())
    }

    /// Move a pending job to a new due time, re-validating conflicts with
    /// the job itself excluded from the comparison set.
    pub fn reschedule(&self, job_id: &str, new_time: DateTime<Utc>) -> Result<(), CasterError> {
        let result = self.store.mutate(|doc| {
            let channels = match doc.scheduled_posts.get(job_id) {
                Some(job) if job.state == JobState::Pending => job.channels.clone(),
                _ => return Err(not_found(job_id)),
            };
            if has_conflict(doc.scheduled_posts.iter(), new_time, &channels, Some(job_id)) {
                return Err(CasterError::Conflict {
                    window_secs: crate::conflict::CONFLICT_WINDOW_SECS,
                });
            }
            if let Some(job) = doc.scheduled_posts.get_mut(job_id) {
                job.time = new_time;
            }
            Ok(())
        });
        result?;

        self.persist_table();
        info!(job_id, due = %new_time, "scheduled job rescheduled");
        Ok(())
    }

    /// One job by ID.
    pub fn get(&self, job_id: &str) -> Result<Job, CasterError> {
        self.store
            .read(|doc| doc.scheduled_posts.get(job_id).map(|r| Job::from_record(job_id, r)))
            .ok_or_else(|| not_found(job_id))
    }

    /// Every job in the table, ascending by due time then ID.
    pub fn list_all(&self) -> Vec<Job> {
        let mut jobs = self.store.read(|doc| {
            doc.scheduled_posts
                .iter()
                .map(|(id, r)| Job::from_record(id, r))
                .collect::<Vec<_>>()
        });
        jobs.sort_by(|a, b| a.due_time.cmp(&b.due_time).then_with(|| a.id.cmp(&b.id)));
        jobs
    }

    /// Pending jobs whose due time has passed, earliest-due first, ties
    /// broken by job ID for determinism (the ordering [`list_all`] already
    /// guarantees).
    ///
    /// [`list_all`]: Self::list_all
    pub fn list_due(&self, now: DateTime<Utc>) -> Vec<Job> {
        self.list_all()
            .into_iter()
            .filter(|j| j.state == JobState::Pending && j.due_time <= now)
            .collect()
    }

    /// Remove pending jobs more than [`SCHEDULE_EXPIRY_DAYS`] past due.
    /// Returns the purged IDs.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Vec<String> {
        let horizon = Duration::days(SCHEDULE_EXPIRY_DAYS);
        let purged = self.store.mutate(|doc| {
            let expired: Vec<String> = doc
                .scheduled_posts
                .iter()
                .filter(|(_, job)| {
                    job.state == JobState::Pending && now - job.time > horizon
                })
                .map(|(id, _)| id.clone())
                .collect();
            for id in &expired {
                doc.scheduled_posts.remove(id);
            }
            expired
        });
        if !purged.is_empty() {
            for id in &purged {
                warn!(job_id = %id, "purged expired scheduled job without running it");
            }
            self.persist_table();
        }
        purged
    }

    /// Flip a pending job to running, stamping `started_at` for crash
    /// recovery. The driver calls this before handing the job to the
    /// engine; `list_due` no longer returns the job afterwards.
    pub fn mark_running(&self, job_id: &str, now: DateTime<Utc>) -> Result<(), CasterError> {
        let marked = self.store.mutate(|doc| {
            match doc.scheduled_posts.get_mut(job_id) {
                Some(job) if job.state == JobState::Pending => {
                    job.state = JobState::Running;
                    job.started_at = Some(now);
                    true
                }
                _ => false,
            }
        });
        if !marked {
            return Err(not_found(job_id));
        }
        self.persist_table();
        Ok(())
    }

    /// Remove a job after the engine has reported completion (success or
    /// exhausted-retries failure both count).
    pub fn complete(&self, job_id: &str) -> Result<(), CasterError> {
        let removed = self
            .store
            .mutate(|doc| doc.scheduled_posts.remove(job_id).is_some());
        if !removed {
            return Err(not_found(job_id));
        }
        self.persist_table();
        info!(job_id, "scheduled job completed and removed");
        Ok(())
    }

    /// Requeue running jobs with no liveness signal.
    ///
    /// A job observed `Running` with a `started_at` older than one poll
    /// interval belongs to a crashed run; it reverts to `Pending` and will
    /// be retried from scratch. Cells delivered before the crash are
    /// delivered again, the accepted trade-off absent per-cell durable
    /// checkpoints. Returns the requeued IDs.
    pub fn recover_stale(&self, now: DateTime<Utc>, poll_interval: StdDuration) -> Vec<String> {
        let horizon =
            Duration::from_std(poll_interval).unwrap_or_else(|_| Duration::seconds(60));
        let recovered = self.store.mutate(|doc| {
            let mut ids = Vec::new();
            for (id, job) in doc.scheduled_posts.iter_mut() {
                if job.state != JobState::Running {
                    continue;
                }
                let stale = match job.started_at {
                    Some(started) => now - started > horizon,
                    None => true,
                };
                if stale {
                    job.state = JobState::Pending;
                    job.started_at = None;
                    ids.push(id.clone());
                }
            }
            ids
        });
        if !recovered.is_empty() {
            for id in &recovered {
                warn!(job_id = %id, "requeued stale running job after crash");
            }
            self.persist_table();
        }
        recovered
    }

    fn persist_table(&self) {
        if let Err(err) = self.store.persist() {
            warn!(error = %err, "job table change not persisted");
        }
    }
}

fn not_found(job_id: &str) -> CasterError {
    CasterError::NotFound {
        kind: "scheduled job",
        id: job_id.to_string(),
    }
}
