// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure scheduling rules: collision detection and schedule-time validation.
//!
//! No side effects here; the [`Scheduler`](crate::Scheduler) calls these at
//! creation and reschedule, and tests exercise them directly.

use caster_core::{CasterError, ChannelId};
use caster_store::JobRecord;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// Two jobs sharing a channel may not be due within this window of each
/// other, in seconds.
pub const CONFLICT_WINDOW_SECS: i64 = 300;

/// Minimum lead time for a new schedule, guarding against times the
/// driver's next poll could trivially race.
pub const MIN_LEAD_MINUTES: i64 = 5;

/// Canonical schedule input format.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// True iff any job in `jobs` (other than `exclude`) is due within
/// [`CONFLICT_WINDOW_SECS`] of `candidate_time` and shares at least one
/// channel with `candidate_channels`.
pub fn has_conflict<'a>(
    jobs: impl IntoIterator<Item = (&'a String, &'a JobRecord)>,
    candidate_time: DateTime<Utc>,
    candidate_channels: &[ChannelId],
    exclude: Option<&str>,
) -> bool {
    jobs.into_iter().any(|(id, job)| {
        if exclude == Some(id.as_str()) {
            return false;
        }
        let gap = (job.time - candidate_time).num_seconds().abs();
        gap < CONFLICT_WINDOW_SECS
            && job
                .channels
                .iter()
                .any(|c| candidate_channels.contains(c))
    })
}

/// Parse and validate an operator-supplied schedule time.
///
/// Accepts only the canonical `YYYY-MM-DD HH:MM` form and rejects any time
/// less than [`MIN_LEAD_MINUTES`] after `now`.
pub fn validate_schedule_time(
    input: &str,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, CasterError> {
    let parsed = NaiveDateTime::parse_from_str(input.trim(), TIME_FORMAT)
        .map_err(|_| {
            CasterError::Validation(format!(
                "`{input}` is not a valid schedule time, expected YYYY-MM-DD HH:MM"
            ))
        })?
        .and_utc();

    if parsed < now + Duration::minutes(MIN_LEAD_MINUTES) {
        return Err(CasterError::Validation(format!(
            "schedule time must be at least {MIN_LEAD_MINUTES} minutes in the future"
        )));
    }

    Ok(parsed)
}
