// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The run driver: a cancellable periodic loop that pulls due jobs from
//! the scheduler and hands each to the dispatch engine exactly once.
//!
//! A job is flipped to running before the engine sees it, so a second poll
//! arriving before completion cannot pick it up again, and it is removed
//! from the table only after the engine returns (success and partial
//! failure both count as done). A crash between those two points leaves the
//! job observable as stale-running; the next tick requeues it.

use std::sync::Arc;
use std::time::Duration;

use caster_core::RunResult;
use caster_scheduler::Scheduler;
use caster_store::Store;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::Dispatcher;

/// Periodic poll loop over the scheduled-job table.
pub struct Driver {
    scheduler: Arc<Scheduler>,
    dispatcher: Arc<Dispatcher>,
    store: Arc<Store>,
    poll_interval: Duration,
}

impl Driver {
    pub fn new(
        scheduler: Arc<Scheduler>,
        dispatcher: Arc<Dispatcher>,
        store: Arc<Store>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            scheduler,
            dispatcher,
            store,
            poll_interval,
        }
    }

    /// Run the poll loop until `cancel` fires.
    ///
    /// The sleep between ticks is the only cancellation point: a cancel
    /// request stops the loop between polls, never mid-run.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(interval_secs = self.poll_interval.as_secs(), "run driver started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("run driver stopping");
                    break;
                }
                _ = tokio::time::sleep(self.poll_interval) => {
                    self.tick(Utc::now()).await;
                }
            }
        }
    }

    /// One poll cycle: purge abandoned jobs, requeue stale running ones,
    /// then execute everything due. Returns the per-job results, in the
    /// order the jobs were executed.
    pub async fn tick(&self, now: DateTime<Utc>) -> Vec<(String, RunResult)> {
        self.scheduler.purge_expired(now);
        self.scheduler.recover_stale(now, self.poll_interval);

        let due = self.scheduler.list_due(now);
        if due.is_empty() {
            debug!("tick: nothing due");
            return Vec::new();
        }

        let mut results = Vec::new();
        for job in due {
            if let Err(err) = self.scheduler.mark_running(&job.id, now) {
                // Raced by another tick in this process; skip.
                warn!(job_id = %job.id, error = %err, "could not claim due job");
                continue;
            }

            // Settings snapshot for the whole run.
            let settings = self.store.delivery_settings();
            info!(
                job_id = %job.id,
                due = %job.due_time,
                messages = job.messages.len(),
                channels = job.channels.len(),
                "executing scheduled job"
            );

            match self
                .dispatcher
                .run(&job.messages, &job.channels, &settings, Some(&job.operator))
                .await
            {
                Ok(result) => {
                    info!(
                        job_id = %job.id,
                        succeeded = result.succeeded,
                        failed = result.failed_count(),
                        "scheduled job finished"
                    );
                    if let Err(err) = self.scheduler.complete(&job.id) {
                        warn!(job_id = %job.id, error = %err, "could not remove finished job");
                    }
                    results.push((job.id, result));
                }
                Err(err) => {
                    // Structural error: the frozen job is malformed (empty
                    // batch or channels). It can never succeed, so drop it
                    // rather than retrying forever.
                    warn!(job_id = %job.id, error = %err, "scheduled job is malformed, dropping");
                    if let Err(err) = self.scheduler.complete(&job.id) {
                        warn!(job_id = %job.id, error = %err, "could not remove malformed job");
                    }
                }
            }
        }
        results
    }
}
