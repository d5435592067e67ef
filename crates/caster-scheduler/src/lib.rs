// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduled-job table lifecycle for the Caster broadcast engine.
//!
//! The [`Scheduler`] owns creation, listing, cancellation, rescheduling,
//! expiry, and the due-poll over the durable job table. The pure conflict
//! and time-validation rules live in [`conflict`].

pub mod conflict;
pub mod scheduler;

pub use conflict::{CONFLICT_WINDOW_SECS, has_conflict, validate_schedule_time};
pub use scheduler::{Job, SCHEDULE_EXPIRY_DAYS, Scheduler};
