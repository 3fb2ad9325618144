// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Boundaries to the collaborators test-insight depends on but does not implement.
//!
//! * [`FingerprintResolver`] computes the configuration fingerprint of a test class's shared
//!   setup.
//! * [`CacheStatisticsSource`] exposes statistics from the underlying framework's own context
//!   cache.
//! * [`ReportRenderer`] turns the per-phase snapshots into a report. Built-in renderers live in
//!   [`crate::reporter`].

use crate::{
    errors::{FingerprintResolveError, RenderError},
    phase::PhaseName,
    tracker::{ContextCacheSnapshot, ExecutionSnapshot},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque value identifying a shared test setup configuration.
///
/// Equal fingerprints imply an equivalent setup that is eligible for reuse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub struct Fingerprint(pub u64);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Fingerprint {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// The result of resolving a test class's configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedFingerprint {
    /// The fingerprint of the configuration.
    pub fingerprint: Fingerprint,

    /// A human-readable description of the configuration, if available.
    pub config_descriptor: Option<String>,
}

impl ResolvedFingerprint {
    /// Creates a new `ResolvedFingerprint` without a descriptor.
    pub fn new(fingerprint: Fingerprint) -> Self {
        Self {
            fingerprint,
            config_descriptor: None,
        }
    }

    /// Attaches a configuration descriptor.
    pub fn with_descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.config_descriptor = Some(descriptor.into());
        self
    }
}

/// Computes the configuration fingerprint for a test class.
///
/// Called once when a class starts and again when its instance is prepared. Implementations may
/// fail; a failure excludes the class from context cache statistics for that invocation.
pub trait FingerprintResolver: Send + Sync {
    /// Resolves the fingerprint for `class_name`.
    fn resolve_fingerprint(
        &self,
        class_name: &str,
    ) -> Result<ResolvedFingerprint, FingerprintResolveError>;
}

impl<F> FingerprintResolver for F
where
    F: Fn(&str) -> Result<ResolvedFingerprint, FingerprintResolveError> + Send + Sync,
{
    fn resolve_fingerprint(
        &self,
        class_name: &str,
    ) -> Result<ResolvedFingerprint, FingerprintResolveError> {
        self(class_name)
    }
}

/// Statistics reported by the underlying framework's own context cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheStatistics {
    /// The number of contexts currently held in the cache.
    pub size: usize,

    /// The maximum number of contexts the cache may hold.
    pub max_size: usize,

    /// The number of lookups that found a cached context.
    pub hit_count: u64,

    /// The number of lookups that had to build a context.
    pub miss_count: u64,
}

impl CacheStatistics {
    /// Returns the fraction of lookups that were hits, or `None` if there were no lookups.
    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.hit_count + self.miss_count;
        (total > 0).then(|| self.hit_count as f64 / total as f64)
    }
}

/// A read-only source of [`CacheStatistics`].
pub trait CacheStatisticsSource: Send + Sync {
    /// Returns a snapshot of the external cache statistics.
    fn cache_statistics(&self) -> CacheStatistics;
}

/// A [`CacheStatisticsSource`] for hosts without an external context cache.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoExternalStatistics;

impl CacheStatisticsSource for NoExternalStatistics {
    fn cache_statistics(&self) -> CacheStatistics {
        CacheStatistics::default()
    }
}

/// Everything a [`ReportRenderer`] receives for one phase.
#[derive(Clone, Copy, Debug)]
pub struct RenderContext<'a> {
    /// The phase the report is for.
    pub phase: &'a PhaseName,

    /// Timing and status of the test classes in this phase.
    pub execution: &'a ExecutionSnapshot,

    /// Statistics from the framework's own context cache.
    pub cache_statistics: &'a CacheStatistics,

    /// Context reuse as observed by test-insight.
    pub context_cache: &'a ContextCacheSnapshot,
}

/// Produces the human-facing report for a phase.
///
/// Errors are logged by the orchestrator and never propagate to the host test runtime.
pub trait ReportRenderer: Send + Sync {
    /// Renders the report.
    fn render(&self, cx: &RenderContext<'_>) -> Result<(), RenderError>;
}
