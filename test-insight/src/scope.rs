// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The host runtime's outermost scope, where terminal close hooks are registered.

use crate::tracker::lock;
use debug_ignore::DebugIgnore;
use std::{
    collections::{HashMap, hash_map::Entry},
    sync::{Arc, Mutex},
};
use tracing::debug;

/// A callback fired once when the outermost scope closes.
pub trait CloseHook: Send + Sync {
    /// Called after every test class in the scope has completed.
    fn close(&self);
}

/// The outermost scope of a test run.
///
/// Hooks are stored under well-known keys. Registering under a key that is already taken keeps
/// the existing hook, so concurrent first registrations from parallel threads produce exactly one
/// hook. [`RootScope::close`] fires every hook once.
#[derive(Debug, Default)]
pub struct RootScope {
    hooks: Mutex<HashMap<&'static str, DebugIgnore<Arc<dyn CloseHook>>>>,
}

impl RootScope {
    /// Creates a new, empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the hook returned by `make` under `key`, unless a hook is already registered
    /// there.
    ///
    /// `make` is only called if the key is vacant. Returns true if a hook was inserted.
    pub fn get_or_insert_close_hook(
        &self,
        key: &'static str,
        make: impl FnOnce() -> Arc<dyn CloseHook>,
    ) -> bool {
        match lock(&self.hooks).entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                debug!("registering close hook `{key}` on the root scope");
                entry.insert(DebugIgnore(make()));
                true
            }
        }
    }

    /// Returns the number of registered hooks.
    pub fn close_hook_count(&self) -> usize {
        lock(&self.hooks).len()
    }

    /// Closes the scope, firing every registered hook once.
    ///
    /// Hooks are removed before they run, so closing again fires nothing. They are invoked
    /// without the scope's lock held.
    pub fn close(&self) {
        let hooks: Vec<_> = lock(&self.hooks).drain().collect();
        for (key, hook) in hooks {
            debug!("firing close hook `{key}`");
            hook.close();
        }
    }
}
