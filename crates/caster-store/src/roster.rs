// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin and channel roster operations.
//!
//! Fixed channels come from deployment config: always listed, never
//! removable, never shadowed by dynamic entries. Dynamic channels live in
//! the durable document. Save failures in this module are logged and
//! swallowed; the in-memory roster stays authoritative.

use caster_core::{CasterError, ChannelId, validate_channel_id, validate_user_id};
use tracing::{info, warn};

use crate::document::{ChannelRecord, ChannelStats};
use crate::store::Store;

/// One roster entry as presented to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEntry {
    pub id: ChannelId,
    pub name: String,
    /// Protected channel seeded from config; cannot be removed.
    pub fixed: bool,
    pub post_count: u64,
}

impl Store {
    /// True when `user_id` is on the admin roster.
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.read(|doc| doc.admins.iter().any(|a| a == user_id))
    }

    /// Add an operator to the admin roster.
    pub fn add_admin(&self, user_id: &str) -> Result<(), CasterError> {
        if !validate_user_id(user_id) {
            return Err(CasterError::Validation(format!(
                "invalid user ID `{user_id}`"
            )));
        }
        if self.is_admin(user_id) {
            return Err(CasterError::Validation(format!(
                "user {user_id} is already an admin"
            )));
        }
        self.mutate(|doc| doc.admins.push(user_id.to_string()));
        if let Err(err) = self.persist() {
            warn!(error = %err, "admin roster change not persisted");
        }
        info!(user_id, "admin added");
        Ok(())
    }

    /// Remove an operator from the admin roster. The owner is protected.
    pub fn remove_admin(&self, user_id: &str) -> Result<(), CasterError> {
        if self.owner_id() == Some(user_id) {
            return Err(CasterError::Validation(
                "the owner cannot be removed from the admin roster".to_string(),
            ));
        }
        let removed = self.mutate(|doc| {
            let before = doc.admins.len();
            doc.admins.retain(|a| a != user_id);
            doc.admins.len() != before
        });
        if !removed {
            return Err(CasterError::NotFound {
                kind: "admin",
                id: user_id.to_string(),
            });
        }
        if let Err(err) = self.persist() {
            warn!(error = %err, "admin roster change not persisted");
        }
        info!(user_id, "admin removed");
        Ok(())
    }

    /// Add a dynamic channel to the roster.
    pub fn add_channel(&self, id: &ChannelId, name: &str) -> Result<(), CasterError> {
        if !validate_channel_id(id.as_str()) {
            return Err(CasterError::Validation(format!(
                "invalid channel ID `{id}`, expected -100 followed by at least ten digits"
            )));
        }
        if self.fixed_channels().iter().any(|f| f.id == id.as_str()) {
            return Err(CasterError::Validation(format!(
                "channel {id} is a fixed channel"
            )));
        }
        let inserted = self.mutate(|doc| {
            if doc.channels.contains_key(id.as_str()) {
                false
            } else {
                doc.channels.insert(
                    id.as_str().to_string(),
                    ChannelRecord {
                        name: name.to_string(),
                        stats: ChannelStats::default(),
                    },
                );
                true
            }
        });
        if !inserted {
            return Err(CasterError::Validation(format!(
                "channel {id} already exists"
            )));
        }
        if let Err(err) = self.persist() {
            warn!(error = %err, "channel roster change not persisted");
        }
        info!(channel = %id, name, "channel added");
        Ok(())
    }

    /// Remove a dynamic channel. Fixed channels are protected.
    pub fn remove_channel(&self, id: &ChannelId) -> Result<(), CasterError> {
        if self.fixed_channels().iter().any(|f| f.id == id.as_str()) {
            return Err(CasterError::Validation(format!(
                "fixed channel {id} cannot be removed"
            )));
        }
        let removed = self.mutate(|doc| doc.channels.remove(id.as_str()).is_some());
        if !removed {
            return Err(CasterError::NotFound {
                kind: "channel",
                id: id.to_string(),
            });
        }
        if let Err(err) = self.persist() {
            warn!(error = %err, "channel roster change not persisted");
        }
        info!(channel = %id, "channel removed");
        Ok(())
    }

    /// The full roster, fixed channels first (config order), then dynamic
    /// channels ordered by ID.
    ///
    /// Pure with respect to the store: calling it twice with no intervening
    /// mutation returns structurally identical results.
    pub fn get_all_channels(&self) -> Vec<ChannelEntry> {
        self.read(|doc| {
            let mut entries: Vec<ChannelEntry> = self
                .fixed_channels()
                .iter()
                .map(|f| ChannelEntry {
                    id: ChannelId(f.id.clone()),
                    name: f.name.clone(),
                    fixed: true,
                    // A fixed channel accrues stats in the document even
                    // though its identity lives in config.
                    post_count: doc
                        .channels
                        .get(&f.id)
                        .map(|c| c.stats.post_count)
                        .unwrap_or(0),
                })
                .collect();

            for (id, record) in &doc.channels {
                if self.fixed_channels().iter().any(|f| &f.id == id) {
                    continue;
                }
                entries.push(ChannelEntry {
                    id: ChannelId(id.clone()),
                    name: record.name.clone(),
                    fixed: false,
                    post_count: record.stats.post_count,
                });
            }
            entries
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caster_config::FixedChannelConfig;
    use tempfile::tempdir;

    fn fixed() -> Vec<FixedChannelConfig> {
        vec![FixedChannelConfig {
            id: "-1002504723776".to_string(),
            name: "Official Announcements".to_string(),
        }]
    }

    fn open_store(dir: &tempfile::TempDir) -> Store {
        Store::open(dir.path().join("state.json"), fixed(), Some("1".to_string()))
    }

    #[test]
    fn owner_is_admin_by_default() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        assert!(store.is_admin("1"));
        assert!(!store.is_admin("2"));
    }

    #[test]
    fn add_and_remove_admin() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        store.add_admin("42").unwrap();
        assert!(store.is_admin("42"));

        store.remove_admin("42").unwrap();
        assert!(!store.is_admin("42"));
    }

    #[test]
    fn duplicate_admin_rejected() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        store.add_admin("42").unwrap();
        assert!(matches!(
            store.add_admin("42"),
            Err(CasterError::Validation(_))
        ));
    }

    #[test]
    fn owner_cannot_be_removed() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        assert!(matches!(
            store.remove_admin("1"),
            Err(CasterError::Validation(_))
        ));
        assert!(store.is_admin("1"));
    }

    #[test]
    fn remove_unknown_admin_is_not_found() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        assert!(matches!(
            store.remove_admin("404"),
            Err(CasterError::NotFound { .. })
        ));
    }

    #[test]
    fn malformed_user_id_rejected() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        assert!(matches!(
            store.add_admin("not-a-number"),
            Err(CasterError::Validation(_))
        ));
    }

    #[test]
    fn add_and_remove_dynamic_channel() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let id = ChannelId::from("-1009876543210");

        store.add_channel(&id, "Side Channel").unwrap();
        let entries = store.get_all_channels();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.id == id && !e.fixed));

        store.remove_channel(&id).unwrap();
        assert_eq!(store.get_all_channels().len(), 1);
    }

    #[test]
    fn malformed_channel_id_rejected() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        assert!(matches!(
            store.add_channel(&ChannelId::from("12345"), "Bad"),
            Err(CasterError::Validation(_))
        ));
    }

    #[test]
    fn fixed_channel_cannot_be_removed_or_shadowed() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        let id = ChannelId::from("-1002504723776");

        assert!(matches!(
            store.remove_channel(&id),
            Err(CasterError::Validation(_))
        ));
        assert!(matches!(
            store.add_channel(&id, "Impostor"),
            Err(CasterError::Validation(_))
        ));
    }

    #[test]
    fn remove_unknown_channel_is_not_found() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        assert!(matches!(
            store.remove_channel(&ChannelId::from("-1001231231231")),
            Err(CasterError::NotFound { .. })
        ));
    }

    #[test]
    fn get_all_channels_is_idempotent_and_fixed_first() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);
        store
            .add_channel(&ChannelId::from("-1009876543210"), "Side Channel")
            .unwrap();

        let first = store.get_all_channels();
        let second = store.get_all_channels();
        assert_eq!(first, second);
        assert!(first[0].fixed);
        assert_eq!(first[0].name, "Official Announcements");
    }
}
