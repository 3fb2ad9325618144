// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The context cache tracker: which configuration fingerprints had a context built, and how often
//! that context was reused.
//!
//! Deciding whether a class is a hit or a creation is up to the caller. The usual sequence is
//! [`ContextCacheTracker::cache_entry`] followed by either
//! [`ContextCacheTracker::record_context_cache_hit`] or
//! [`ContextCacheTracker::record_context_creation`]. That sequence is not atomic: two classes with
//! the same fingerprint that prepare concurrently may both record a creation. The counts are a
//! best-effort statistic. The map itself never loses updates.

use super::lock;
use crate::collab::Fingerprint;
use serde::Serialize;
use std::{
    collections::{BTreeSet, HashMap, hash_map::Entry},
    sync::Mutex,
};
use tracing::debug;

/// What test-insight knows about one configuration fingerprint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheEntry {
    /// Whether a context has been created for this fingerprint. Once true, stays true until the
    /// tracker is cleared.
    pub created: bool,

    /// The number of times a test class reused an already created context.
    pub hit_count: u64,

    /// The test classes associated with this fingerprint.
    pub test_classes: BTreeSet<String>,

    /// A description of the configuration, taken from the first class registered with it.
    pub config_descriptor: Option<String>,
}

/// Tracks context creation and reuse per configuration fingerprint.
///
/// All operations take `&self` and are safe to call from multiple threads.
#[derive(Debug, Default)]
pub struct ContextCacheTracker {
    entries: Mutex<HashMap<Fingerprint, CacheEntry>>,
}

impl ContextCacheTracker {
    /// Creates a new, empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates a test class with a fingerprint, creating the entry if needed.
    ///
    /// This does not mark a context as created.
    pub fn record_test_class_for_context(
        &self,
        fingerprint: Fingerprint,
        class_name: &str,
        config_descriptor: Option<&str>,
    ) {
        let mut entries = lock(&self.entries);
        let entry = entries.entry(fingerprint).or_default();
        if entry.config_descriptor.is_none() {
            entry.config_descriptor = config_descriptor.map(str::to_owned);
        }
        if entry.test_classes.insert(class_name.to_owned()) {
            debug!("test class {class_name} associated with context {fingerprint}");
        }
    }

    /// Returns a copy of the entry for a fingerprint, if one exists.
    pub fn cache_entry(&self, fingerprint: Fingerprint) -> Option<CacheEntry> {
        lock(&self.entries).get(&fingerprint).cloned()
    }

    /// Records that a context was created for a fingerprint.
    pub fn record_context_creation(&self, fingerprint: Fingerprint) {
        let mut entries = lock(&self.entries);
        let entry = entries.entry(fingerprint).or_default();
        if entry.created {
            debug!("context {fingerprint} created again (concurrent preparation)");
        }
        entry.created = true;
    }

    /// Records that an already created context was reused for a fingerprint.
    pub fn record_context_cache_hit(&self, fingerprint: Fingerprint) {
        let mut entries = lock(&self.entries);
        match entries.entry(fingerprint) {
            Entry::Occupied(mut entry) => entry.get_mut().hit_count += 1,
            Entry::Vacant(entry) => {
                debug!("cache hit recorded for unregistered context {fingerprint}");
                entry.insert(CacheEntry {
                    hit_count: 1,
                    ..CacheEntry::default()
                });
            }
        }
    }

    /// Returns the number of fingerprints tracked.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Returns true if no fingerprints are tracked.
    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    /// Drops all entries.
    pub fn clear(&self) {
        lock(&self.entries).clear();
    }

    /// Returns an immutable copy of the tracked data, ordered by fingerprint.
    pub fn snapshot(&self) -> ContextCacheSnapshot {
        let mut entries: Vec<_> = lock(&self.entries)
            .iter()
            .map(|(fingerprint, entry)| ContextSnapshotEntry {
                fingerprint: *fingerprint,
                entry: entry.clone(),
            })
            .collect();
        entries.sort_unstable_by_key(|e| e.fingerprint);

        ContextCacheSnapshot { entries }
    }
}

/// An immutable copy of the [`ContextCacheTracker`] contents, handed to report renderers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContextCacheSnapshot {
    /// The tracked entries, ordered by fingerprint.
    pub entries: Vec<ContextSnapshotEntry>,
}

/// One fingerprint in a [`ContextCacheSnapshot`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContextSnapshotEntry {
    /// The fingerprint.
    pub fingerprint: Fingerprint,

    /// What was tracked for it.
    #[serde(flatten)]
    pub entry: CacheEntry,
}

impl ContextCacheSnapshot {
    /// Looks up the entry for a fingerprint.
    pub fn get(&self, fingerprint: Fingerprint) -> Option<&CacheEntry> {
        self.entries
            .binary_search_by_key(&fingerprint, |e| e.fingerprint)
            .ok()
            .map(|ix| &self.entries[ix].entry)
    }

    /// Returns the number of distinct fingerprints seen.
    pub fn distinct_contexts(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of fingerprints for which a context was created.
    pub fn contexts_created(&self) -> usize {
        self.entries.iter().filter(|e| e.entry.created).count()
    }

    /// Returns the total number of cache hits across all fingerprints.
    pub fn total_hits(&self) -> u64 {
        self.entries.iter().map(|e| e.entry.hit_count).sum()
    }

    /// Returns hits as a fraction of all context loads (hits plus creations), or `None` if no
    /// context was loaded.
    pub fn hit_ratio(&self) -> Option<f64> {
        let hits = self.total_hits();
        let loads = hits + self.contexts_created() as u64;
        (loads > 0).then(|| hits as f64 / loads as f64)
    }
}
