// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    collab::{RenderContext, ReportRenderer},
    errors::RenderError,
    tracker::TestClassSnapshot,
};
use std::{cmp::Reverse, time::Duration};
use swrite::{SWrite, swrite, swriteln};
use tracing::info;

/// The default number of slowest classes listed in a summary.
pub const DEFAULT_SLOWEST_CLASSES: usize = 5;

/// Logs a human-readable summary of the report at info level.
#[derive(Clone, Debug)]
pub struct LogReporter {
    slowest_classes: usize,
}

impl Default for LogReporter {
    fn default() -> Self {
        Self {
            slowest_classes: DEFAULT_SLOWEST_CLASSES,
        }
    }
}

impl LogReporter {
    /// Creates a new reporter listing the default number of slowest classes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many of the slowest test classes are listed. Zero disables the list.
    pub fn with_slowest_classes(mut self, slowest_classes: usize) -> Self {
        self.slowest_classes = slowest_classes;
        self
    }

    /// Formats the summary without logging it.
    pub fn format_summary(&self, cx: &RenderContext<'_>) -> String {
        let mut out = String::new();
        let execution = cx.execution;
        let counts = execution.counts;

        swriteln!(out, "test insight report for {} phase", cx.phase);
        swrite!(
            out,
            "  {} test classes, {} methods: {} passed, {} failed",
            execution.total_test_classes(),
            counts.total,
            counts.passed,
            counts.failed,
        );
        if counts.unfinished > 0 {
            swrite!(out, ", {} unfinished", counts.unfinished);
        }
        if let Some(duration) = execution.duration {
            swrite!(out, " in {}", format_duration(duration));
        }
        out.push('\n');

        let mut finished: Vec<(&TestClassSnapshot, Duration)> = execution
            .classes
            .iter()
            .filter_map(|class| class.duration.map(|duration| (class, duration)))
            .collect();
        if self.slowest_classes > 0 && !finished.is_empty() {
            finished.sort_by_key(|&(class, duration)| (Reverse(duration), class.name.as_str()));
            swriteln!(out, "  slowest test classes:");
            for (class, duration) in finished.iter().take(self.slowest_classes) {
                swriteln!(
                    out,
                    "    {} {} ({} methods, {} failed)",
                    format_duration(*duration),
                    class.name,
                    class.methods.len(),
                    class.counts().failed,
                );
            }
        }

        let contexts = cx.context_cache;
        swrite!(
            out,
            "  context cache: {} contexts, {} created, {} hits",
            contexts.distinct_contexts(),
            contexts.contexts_created(),
            contexts.total_hits(),
        );
        if let Some(ratio) = contexts.hit_ratio() {
            swrite!(out, " ({:.1}% reuse)", ratio * 100.0);
        }
        out.push('\n');
        for entry in &contexts.entries {
            let classes: Vec<_> = entry.entry.test_classes.iter().map(String::as_str).collect();
            swriteln!(
                out,
                "    context {}: {}, {} hits, classes: {}",
                entry.fingerprint,
                if entry.entry.created {
                    "created"
                } else {
                    "not created"
                },
                entry.entry.hit_count,
                classes.join(", "),
            );
        }

        let stats = cx.cache_statistics;
        swrite!(
            out,
            "  framework cache: size {}/{}, {} hits, {} misses",
            stats.size,
            stats.max_size,
            stats.hit_count,
            stats.miss_count,
        );
        if let Some(rate) = stats.hit_rate() {
            swrite!(out, " ({:.1}% hit rate)", rate * 100.0);
        }

        out
    }
}

impl ReportRenderer for LogReporter {
    fn render(&self, cx: &RenderContext<'_>) -> Result<(), RenderError> {
        info!("{}", self.format_summary(cx));
        Ok(())
    }
}

fn format_duration(duration: Duration) -> String {
    format!("{:.3}s", duration.as_secs_f64())
}
