// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    collab::{CacheStatistics, RenderContext, ReportRenderer},
    errors::RenderError,
    phase::PhaseName,
    tracker::{ContextSnapshotEntry, ExecutionSnapshot},
};
use atomicwrites::{AllowOverwrite, AtomicFile};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Local};
use serde::Serialize;

/// The version of the JSON report format.
pub const JSON_FORMAT_VERSION: u32 = 1;

/// Writes the report as pretty-printed JSON to `<dir>/<phase>.json`.
///
/// The file is written atomically, so a concurrent reader never sees a partial report.
#[derive(Clone, Debug)]
pub struct JsonReporter {
    dir: Utf8PathBuf,
}

impl JsonReporter {
    /// Creates a reporter writing into `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the path the report for `phase` is written to.
    pub fn report_path(&self, phase: &PhaseName) -> Utf8PathBuf {
        self.dir.join(format!("{phase}.json"))
    }
}

impl ReportRenderer for JsonReporter {
    fn render(&self, cx: &RenderContext<'_>) -> Result<(), RenderError> {
        create_report_dir(&self.dir)?;

        let report = JsonReport {
            format_version: JSON_FORMAT_VERSION,
            phase: cx.phase,
            generated_at: Local::now(),
            execution: cx.execution,
            cache_statistics: cx.cache_statistics,
            context_cache: JsonContextCache {
                distinct_contexts: cx.context_cache.distinct_contexts(),
                contexts_created: cx.context_cache.contexts_created(),
                total_hits: cx.context_cache.total_hits(),
                hit_ratio: cx.context_cache.hit_ratio(),
                entries: &cx.context_cache.entries,
            },
        };

        let path = self.report_path(cx.phase);
        AtomicFile::new(&path, AllowOverwrite)
            .write(|file| serde_json::to_writer_pretty(file, &report))
            .map_err(|error| RenderError::Json { path, error })
    }
}

pub(super) fn create_report_dir(dir: &Utf8Path) -> Result<(), RenderError> {
    std::fs::create_dir_all(dir).map_err(|error| RenderError::Fs {
        path: dir.to_owned(),
        error,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct JsonReport<'a> {
    format_version: u32,
    phase: &'a PhaseName,
    generated_at: DateTime<Local>,
    execution: &'a ExecutionSnapshot,
    cache_statistics: &'a CacheStatistics,
    context_cache: JsonContextCache<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct JsonContextCache<'a> {
    distinct_contexts: usize,
    contexts_created: usize,
    total_hits: u64,
    hit_ratio: Option<f64>,
    entries: &'a [ContextSnapshotEntry],
}
