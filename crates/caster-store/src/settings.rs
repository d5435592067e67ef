// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator-facing delivery settings mutation with bounds checking.
//!
//! The operator-facing ranges match the reference policy: delay 0.1-10
//! seconds, retries 1-10, footer at most 200 characters. The engine reads
//! settings only through [`Store::delivery_settings`], which snapshots them
//! at run start.

use caster_core::{CasterError, RunSettings, types::MAX_FOOTER_LENGTH};
use tracing::warn;

use crate::store::Store;

/// Inclusive operator-facing bounds for the inter-cell delay, in seconds.
pub const DELAY_RANGE: (f64, f64) = (0.1, 10.0);

/// Inclusive operator-facing bounds for the retry budget.
pub const RETRIES_RANGE: (u32, u32) = (1, 10);

impl Store {
    /// Snapshot of the current delivery settings.
    pub fn delivery_settings(&self) -> RunSettings {
        self.read(|doc| doc.settings.snapshot())
    }

    /// Set the pause between cells.
    pub fn set_delay(&self, delay_secs: f64) -> Result<(), CasterError> {
        if !(DELAY_RANGE.0..=DELAY_RANGE.1).contains(&delay_secs) {
            return Err(CasterError::Validation(format!(
                "delay must be between {} and {} seconds",
                DELAY_RANGE.0, DELAY_RANGE.1
            )));
        }
        self.mutate(|doc| doc.settings.default_delay = delay_secs);
        self.persist_settings();
        Ok(())
    }

    /// Set the per-cell retry budget.
    pub fn set_max_retries(&self, retries: u32) -> Result<(), CasterError> {
        if !(RETRIES_RANGE.0..=RETRIES_RANGE.1).contains(&retries) {
            return Err(CasterError::Validation(format!(
                "retries must be between {} and {}",
                RETRIES_RANGE.0, RETRIES_RANGE.1
            )));
        }
        self.mutate(|doc| doc.settings.max_retries = retries);
        self.persist_settings();
        Ok(())
    }

    /// Set the footer delivered after each successful cell. An empty string
    /// disables the footer.
    pub fn set_footer(&self, footer: &str) -> Result<(), CasterError> {
        if footer.chars().count() > MAX_FOOTER_LENGTH {
            return Err(CasterError::Validation(format!(
                "footer too long, at most {MAX_FOOTER_LENGTH} characters"
            )));
        }
        self.mutate(|doc| doc.settings.footer = footer.to_string());
        self.persist_settings();
        Ok(())
    }

    /// Flip the notify-on-completion flag; returns the new value.
    pub fn toggle_notifications(&self) -> bool {
        let enabled = self.mutate(|doc| {
            doc.settings.notifications = !doc.settings.notifications;
            doc.settings.notifications
        });
        self.persist_settings();
        enabled
    }

    fn persist_settings(&self) {
        if let Err(err) = self.persist() {
            warn!(error = %err, "settings change not persisted");
        }
    }
}
