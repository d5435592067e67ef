// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Progress seam: live run feedback toward the presentation layer.

use async_trait::async_trait;

use crate::types::Progress;

/// Receives progress snapshots at the cadence described by the engine.
///
/// Implementations must not fail; a sink that cannot render a snapshot
/// should drop it rather than disturb the run.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn on_progress(&self, progress: Progress);
}

/// A sink that discards every snapshot. Used by the run driver, where no
/// operator is watching.
pub struct NullSink;

#[async_trait]
impl ProgressSink for NullSink {
    async fn on_progress(&self, _progress: Progress) {}
}
