// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Progress sink that captures every snapshot for assertion.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use caster_core::{Progress, ProgressSink};

/// Collects progress snapshots in arrival order.
#[derive(Clone, Default)]
pub struct CollectingSink {
    snapshots: Arc<Mutex<Vec<Progress>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshots(&self) -> Vec<Progress> {
        self.snapshots.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.snapshots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.snapshots.lock().await.is_empty()
    }
}

#[async_trait]
impl ProgressSink for CollectingSink {
    async fn on_progress(&self, progress: Progress) {
        self.snapshots.lock().await.push(progress);
    }
}
