// SPDX-FileCopyrightText: 2026 Caster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store lifecycle: locked whole-document load/save and the read cache.
//!
//! The advisory lock lives on a sibling `<data_file>.lock` file and is held
//! only for the duration of a single load or save, never across a dispatch
//! run. Two processes sharing the durable file therefore converge once each
//! has re-loaded, within the cache staleness bound.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use caster_core::CasterError;
use caster_config::FixedChannelConfig;
use fs4::fs_std::FileExt;
use tracing::{debug, warn};

use crate::document::Document;

/// Cached reads older than this are transparently refreshed from disk.
const CACHE_MAX_AGE: Duration = Duration::from_secs(60);

struct Cache {
    doc: Document,
    /// `None` marks the cache as stale regardless of age.
    refreshed_at: Option<Instant>,
}

/// Handle to the durable document.
///
/// Constructed once at startup and shared by reference; there is no hidden
/// global instance. All mutation goes through [`Store::mutate`] /
/// [`Store::persist`] (or the roster/settings/stats helpers built on them),
/// so the in-memory copy stays authoritative even when a save fails.
pub struct Store {
    data_path: PathBuf,
    lock_path: PathBuf,
    fixed: Vec<FixedChannelConfig>,
    owner_id: Option<String>,
    cache: Mutex<Cache>,
}

/// Releases the advisory lock when dropped.
struct LockGuard(File);

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.0) {
            warn!(error = %err, "failed to release store lock");
        }
    }
}

impl Store {
    /// Open the store, loading the durable document or falling back to the
    /// default one.
    ///
    /// Never fails: a missing, corrupt, or unreadable file yields the
    /// default document (seeded with `owner_id` as the sole admin), which
    /// is best-effort persisted so the next process finds a valid file.
    pub fn open(
        data_path: impl Into<PathBuf>,
        fixed: Vec<FixedChannelConfig>,
        owner_id: Option<String>,
    ) -> Self {
        let data_path = data_path.into();
        let lock_path = lock_path_for(&data_path);
        let store = Self {
            data_path,
            lock_path,
            fixed,
            owner_id: owner_id.clone(),
            cache: Mutex::new(Cache {
                doc: Document::default(),
                refreshed_at: None,
            }),
        };

        let doc = match store.load_from_disk() {
            Ok(doc) => doc,
            Err(err) => {
                warn!(
                    path = %store.data_path.display(),
                    error = %err,
                    "durable document unreadable, falling back to defaults"
                );
                let doc = Document::with_owner(owner_id.as_deref());
                if let Err(err) = store.write_to_disk(&doc) {
                    warn!(error = %err, "could not persist default document");
                }
                doc
            }
        };

        {
            let mut cache = store.cache.lock().expect("store cache poisoned");
            cache.doc = doc;
            cache.refreshed_at = Some(Instant::now());
        }
        store
    }

    /// Fixed channels seeded from deployment config.
    pub fn fixed_channels(&self) -> &[FixedChannelConfig] {
        &self.fixed
    }

    /// The configured owning operator, if any.
    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    /// Run `f` against the cached document, refreshing first if the cache
    /// is older than 60 seconds.
    pub fn read<T>(&self, f: impl FnOnce(&Document) -> T) -> T {
        let mut cache = self.cache.lock().expect("store cache poisoned");
        let stale = cache
            .refreshed_at
            .is_none_or(|at| at.elapsed() > CACHE_MAX_AGE);
        if stale {
            match self.load_from_disk() {
                Ok(doc) => cache.doc = doc,
                // Keep serving the in-memory copy; it is authoritative for
                // the life of the process.
                Err(err) => warn!(error = %err, "stale-cache refresh failed"),
            }
            cache.refreshed_at = Some(Instant::now());
        }
        f(&cache.doc)
    }

    /// Drop cache freshness so the next read reloads from disk.
    ///
    /// Useful after another process may have written the shared file.
    pub fn invalidate(&self) {
        let mut cache = self.cache.lock().expect("store cache poisoned");
        cache.refreshed_at = None;
    }

    /// Apply `f` to the in-memory document without persisting.
    ///
    /// Marks the cache fresh: a mutation must not be clobbered by a
    /// staleness reload before the caller has had a chance to persist it.
    pub fn mutate<T>(&self, f: impl FnOnce(&mut Document) -> T) -> T {
        let mut cache = self.cache.lock().expect("store cache poisoned");
        let out = f(&mut cache.doc);
        cache.refreshed_at = Some(Instant::now());
        out
    }

    /// Write the in-memory document to disk under the file lock.
    ///
    /// Persistence is best-effort by policy: callers that prioritize
    /// availability log the error and move on, and the in-memory copy
    /// remains authoritative either way.
    pub fn persist(&self) -> Result<(), CasterError> {
        let doc = {
            let cache = self.cache.lock().expect("store cache poisoned");
            cache.doc.clone()
        };
        self.write_to_disk(&doc).map_err(CasterError::persistence)
    }

    /// Mutate and persist in one step, propagating the save error.
    pub fn update<T>(&self, f: impl FnOnce(&mut Document) -> T) -> Result<T, CasterError> {
        let out = self.mutate(f);
        self.persist()?;
        Ok(out)
    }

    fn acquire_lock(&self) -> io::Result<LockGuard> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?;
        FileExt::lock_exclusive(&file)?;
        Ok(LockGuard(file))
    }

    fn load_from_disk(&self) -> io::Result<Document> {
        let _guard = self.acquire_lock()?;
        let raw = std::fs::read_to_string(&self.data_path)?;
        let doc = serde_json::from_str(&raw).map_err(io::Error::other)?;
        debug!(path = %self.data_path.display(), "durable document loaded");
        Ok(doc)
    }

    fn write_to_disk(&self, doc: &Document) -> io::Result<()> {
        let _guard = self.acquire_lock()?;
        let raw = serde_json::to_string_pretty(doc).map_err(io::Error::other)?;
        std::fs::write(&self.data_path, raw)?;
        debug!(path = %self.data_path.display(), "durable document saved");
        Ok(())
    }
}

fn lock_path_for(data_path: &Path) -> PathBuf {
    let mut name = data_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "caster.json".into());
    name.push(".lock");
    data_path.with_file_name(name)
}
