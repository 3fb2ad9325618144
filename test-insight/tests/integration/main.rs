// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests driving a [`ReportOrchestrator`] through full test runs.
//!
//! Each test plays the host runtime: it sends lifecycle events, closes the root scope, and
//! inspects the reports captured by a [`RecordingRenderer`].

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use test_insight::{
    collab::{
        CacheStatistics, Fingerprint, FingerprintResolver, RenderContext, ReportRenderer,
        ResolvedFingerprint,
    },
    errors::{FingerprintResolveError, RenderError},
    events::{InsightEvent, TestOutcome},
    orchestrator::ReportOrchestrator,
    phase::{EnvironmentSignals, PhaseName},
    tracker::{ContextCacheSnapshot, ExecutionSnapshot},
};

mod config_driven;
mod context_reuse;
mod lifecycle;
mod phases;

/// Signals as seen inside a Maven Surefire/Failsafe fork.
fn maven_signals() -> EnvironmentSignals {
    [
        ("maven.home", "/usr/share/maven"),
        ("basedir", "/work/shop/target/.."),
    ]
    .into_iter()
    .collect()
}

/// Signals as seen inside a Gradle test worker.
fn gradle_signals() -> EnvironmentSignals {
    [("org.gradle.test.worker", "3")].into_iter().collect()
}

/// A report captured by [`RecordingRenderer`].
#[derive(Clone, Debug)]
struct Rendered {
    phase: PhaseName,
    execution: ExecutionSnapshot,
    cache_statistics: CacheStatistics,
    context_cache: ContextCacheSnapshot,
}

/// Records every report it is asked to render.
#[derive(Clone, Debug, Default)]
struct RecordingRenderer {
    rendered: Arc<Mutex<Vec<Rendered>>>,
}

impl RecordingRenderer {
    fn rendered(&self) -> Vec<Rendered> {
        self.rendered.lock().expect("lock not poisoned").clone()
    }
}

impl ReportRenderer for RecordingRenderer {
    fn render(&self, cx: &RenderContext<'_>) -> Result<(), RenderError> {
        self.rendered
            .lock()
            .expect("lock not poisoned")
            .push(Rendered {
                phase: cx.phase.clone(),
                execution: cx.execution.clone(),
                cache_statistics: *cx.cache_statistics,
                context_cache: cx.context_cache.clone(),
            });
        Ok(())
    }
}

/// Resolves fingerprints from a fixed table. Unknown classes fail to resolve.
#[derive(Debug, Default)]
struct TableResolver {
    fingerprints: HashMap<String, u64>,
}

impl TableResolver {
    fn new<'a>(entries: impl IntoIterator<Item = (&'a str, u64)>) -> Self {
        Self {
            fingerprints: entries
                .into_iter()
                .map(|(class_name, fingerprint)| (class_name.to_owned(), fingerprint))
                .collect(),
        }
    }
}

impl FingerprintResolver for TableResolver {
    fn resolve_fingerprint(
        &self,
        class_name: &str,
    ) -> Result<ResolvedFingerprint, FingerprintResolveError> {
        match self.fingerprints.get(class_name) {
            Some(&fingerprint) => Ok(ResolvedFingerprint::new(Fingerprint(fingerprint))),
            None => Err(FingerprintResolveError::new(
                class_name,
                "no context configuration found",
            )),
        }
    }
}

/// Builds an orchestrator with a recording renderer and the given fingerprint table.
fn recording_orchestrator<'a>(
    fingerprints: impl IntoIterator<Item = (&'a str, u64)>,
) -> (ReportOrchestrator, RecordingRenderer) {
    let renderer = RecordingRenderer::default();
    let mut builder = ReportOrchestrator::builder();
    builder
        .set_fingerprint_resolver(TableResolver::new(fingerprints))
        .set_renderer(renderer.clone());
    (builder.build(), renderer)
}

/// Runs one test class through its full lifecycle.
fn run_class(
    orchestrator: &ReportOrchestrator,
    class_name: &str,
    signals: &EnvironmentSignals,
    methods: &[(&str, TestOutcome)],
) {
    orchestrator.handle_event(InsightEvent::class_started(class_name, signals.clone()));
    orchestrator.handle_event(InsightEvent::instance_prepared(class_name));
    for (method_name, outcome) in methods {
        orchestrator.handle_event(InsightEvent::method_started(class_name, *method_name));
        orchestrator.handle_event(InsightEvent::method_finished(
            class_name,
            *method_name,
            outcome.clone(),
        ));
    }
    orchestrator.handle_event(InsightEvent::class_finished(class_name));
}
