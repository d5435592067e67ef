// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable JSON document store for the Caster broadcast engine.
//!
//! The whole durable record (admin roster, channel roster, counters,
//! delivery settings, scheduled-job table, analytics) is one JSON document,
//! read and written as a whole under an advisory file lock shared by any
//! process touching the same file. Reads come from a cache refreshed when
//! older than 60 seconds; writes persist immediately and report failures as
//! explicit `Result`s the caller may log and swallow.

pub mod document;
pub mod roster;
pub mod settings;
pub mod stats;
pub mod store;

pub use document::{
    AdminStats, AnalyticsRecord, ChannelRecord, Document, GlobalStats, JobRecord, JobState,
    SettingsRecord,
};
pub use roster::ChannelEntry;
pub use stats::RunRecord;
pub use store::Store;
