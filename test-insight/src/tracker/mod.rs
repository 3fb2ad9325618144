// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-phase trackers for test execution and context cache usage.
//!
//! Both trackers are explicitly constructed services. The orchestrator holds them behind `Arc`s,
//! clears them between phases, and snapshots them when a report is produced.

mod context_cache;
mod execution;

pub use context_cache::*;
pub use execution::*;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the data if another thread panicked while holding it.
///
/// Updates under these locks never leave torn state behind, so poisoning carries no information.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
