// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared fixtures for integration tests.

use caster_config::FixedChannelConfig;
use caster_store::Store;
use tempfile::TempDir;

/// A store backed by a fresh temporary directory.
///
/// Returns the directory alongside the store; dropping it deletes the
/// durable file, so keep it alive for the duration of the test.
pub fn store_fixture(fixed: Vec<FixedChannelConfig>, owner: &str) -> (Store, TempDir) {
    let dir = TempDir::new().expect("create temp dir");
    let store = Store::open(
        dir.path().join("state.json"),
        fixed,
        Some(owner.to_string()),
    );
    (store, dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_seeds_owner_as_admin() {
        let (store, _dir) = store_fixture(Vec::new(), "42");
        assert!(store.is_admin("42"));
    }
}
