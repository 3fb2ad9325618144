// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The report orchestrator: phase transitions and exactly-once report emission.
//!
//! The orchestrator moves through these states:
//!
//! ```text
//! NoPhase --class started--> PhaseActive --run closed--> ReportEmitted
//!                               ^                             |
//!                               +----class in a new phase-----+
//! ```
//!
//! The current phase and the "report generated" flag are only read and written together, under a
//! single mutex. A phase transition (which clears both trackers) and a report emission therefore
//! never interleave.

use crate::{
    collab::{
        CacheStatisticsSource, FingerprintResolver, NoExternalStatistics, RenderContext,
        ReportRenderer, ResolvedFingerprint,
    },
    errors::DisplayErrorChain,
    events::{InsightEvent, InsightEventKind, TestOutcome},
    phase::{EnvironmentSignals, PhaseDetector, PhaseName},
    reporter::LogReporter,
    scope::{CloseHook, RootScope},
    tracker::{ContextCacheTracker, ExecutionTracker, lock},
};
use debug_ignore::DebugIgnore;
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, Weak},
};
use tracing::{debug, error, info, warn};

/// The key under which the orchestrator registers its close hook on the [`RootScope`].
pub const CLOSE_HOOK_KEY: &str = "test-insight-closeable";

/// Builds a [`ReportOrchestrator`].
///
/// Every collaborator is optional: by default the orchestrator uses fresh trackers, a fresh root
/// scope, no fingerprint resolver (so no context cache signal), no external cache statistics, and
/// a [`LogReporter`].
#[derive(Debug, Default)]
pub struct ReportOrchestratorBuilder {
    detector: PhaseDetector,
    execution: Option<Arc<ExecutionTracker>>,
    context_cache: Option<Arc<ContextCacheTracker>>,
    root_scope: Option<Arc<RootScope>>,
    resolver: DebugIgnore<Option<Box<dyn FingerprintResolver>>>,
    cache_statistics: DebugIgnore<Option<Box<dyn CacheStatisticsSource>>>,
    renderer: DebugIgnore<Option<Box<dyn ReportRenderer>>>,
}

impl ReportOrchestratorBuilder {
    /// Sets the phase detector.
    pub fn set_phase_detector(&mut self, detector: PhaseDetector) -> &mut Self {
        self.detector = detector;
        self
    }

    /// Sets the execution tracker.
    pub fn set_execution_tracker(&mut self, tracker: Arc<ExecutionTracker>) -> &mut Self {
        self.execution = Some(tracker);
        self
    }

    /// Sets the context cache tracker.
    pub fn set_context_cache_tracker(&mut self, tracker: Arc<ContextCacheTracker>) -> &mut Self {
        self.context_cache = Some(tracker);
        self
    }

    /// Sets the root scope the close hook is registered on.
    pub fn set_root_scope(&mut self, root_scope: Arc<RootScope>) -> &mut Self {
        self.root_scope = Some(root_scope);
        self
    }

    /// Sets the fingerprint resolver.
    pub fn set_fingerprint_resolver(
        &mut self,
        resolver: impl FingerprintResolver + 'static,
    ) -> &mut Self {
        self.resolver = DebugIgnore(Some(Box::new(resolver)));
        self
    }

    /// Sets the source of external cache statistics.
    pub fn set_cache_statistics_source(
        &mut self,
        source: impl CacheStatisticsSource + 'static,
    ) -> &mut Self {
        self.cache_statistics = DebugIgnore(Some(Box::new(source)));
        self
    }

    /// Sets the report renderer.
    ///
    /// The renderer runs while the orchestrator's state lock is held, so it must not call back
    /// into the orchestrator.
    pub fn set_renderer(&mut self, renderer: impl ReportRenderer + 'static) -> &mut Self {
        self.renderer = DebugIgnore(Some(Box::new(renderer)));
        self
    }

    /// Creates the orchestrator.
    pub fn build(self) -> ReportOrchestrator {
        let inner = OrchestratorInner {
            detector: self.detector,
            execution: self.execution.unwrap_or_default(),
            context_cache: self.context_cache.unwrap_or_default(),
            root_scope: self.root_scope.unwrap_or_default(),
            resolver: self.resolver,
            cache_statistics: DebugIgnore(
                self.cache_statistics
                    .0
                    .unwrap_or_else(|| Box::new(NoExternalStatistics)),
            ),
            renderer: DebugIgnore(
                self.renderer
                    .0
                    .unwrap_or_else(|| Box::new(LogReporter::new())),
            ),
            state: Mutex::new(OrchestratorState::default()),
        };

        ReportOrchestrator {
            inner: Arc::new(inner),
        }
    }
}

/// Coordinates phase detection, tracking and exactly-once report emission.
///
/// This is a cheap handle: clones share the same state. All methods are safe to call from any
/// number of threads, and none of them propagate failures to the caller.
#[derive(Clone, Debug)]
pub struct ReportOrchestrator {
    inner: Arc<OrchestratorInner>,
}

#[derive(Debug)]
struct OrchestratorInner {
    detector: PhaseDetector,
    execution: Arc<ExecutionTracker>,
    context_cache: Arc<ContextCacheTracker>,
    root_scope: Arc<RootScope>,
    resolver: DebugIgnore<Option<Box<dyn FingerprintResolver>>>,
    cache_statistics: DebugIgnore<Box<dyn CacheStatisticsSource>>,
    renderer: DebugIgnore<Box<dyn ReportRenderer>>,
    state: Mutex<OrchestratorState>,
}

#[derive(Debug, Default)]
struct OrchestratorState {
    current_phase: Option<PhaseName>,
    report_generated: bool,
}

impl ReportOrchestrator {
    /// Returns a builder with default collaborators.
    pub fn builder() -> ReportOrchestratorBuilder {
        ReportOrchestratorBuilder::default()
    }

    /// Handles a lifecycle event from the host runtime.
    pub fn handle_event(&self, event: InsightEvent) {
        match event.kind {
            InsightEventKind::ClassStarted {
                class_name,
                signals,
            } => self.on_class_started(&class_name, &signals),
            InsightEventKind::InstancePrepared { class_name } => {
                self.on_instance_prepared(&class_name)
            }
            InsightEventKind::MethodStarted {
                class_name,
                method_name,
            } => {
                self.inner
                    .execution
                    .record_test_method_start(&class_name, &method_name);
            }
            InsightEventKind::MethodFinished {
                class_name,
                method_name,
                outcome,
            } => {
                if let TestOutcome::Failure {
                    message: Some(message),
                } = &outcome
                {
                    debug!("test method {class_name}::{method_name} failed: {message}");
                }
                self.inner.execution.record_test_method_end(
                    &class_name,
                    &method_name,
                    outcome.status(),
                );
            }
            InsightEventKind::ClassFinished { class_name } => {
                self.inner.execution.record_test_class_end(&class_name);
                debug!("completed tracking for test class {class_name}");
            }
            InsightEventKind::RunClosed => self.on_run_closed(),
        }
    }

    /// Forces the next run-closed callback to emit a report, even if one was already emitted for
    /// the current phase.
    pub fn reset_report_generation(&self) {
        lock(&self.inner.state).report_generated = false;
    }

    /// Returns the current phase, if one has been detected.
    pub fn current_phase(&self) -> Option<PhaseName> {
        lock(&self.inner.state).current_phase.clone()
    }

    /// Returns true if a report has been emitted for the current phase.
    pub fn report_generated(&self) -> bool {
        lock(&self.inner.state).report_generated
    }

    /// Returns the execution tracker.
    pub fn execution_tracker(&self) -> &Arc<ExecutionTracker> {
        &self.inner.execution
    }

    /// Returns the context cache tracker.
    pub fn context_cache_tracker(&self) -> &Arc<ContextCacheTracker> {
        &self.inner.context_cache
    }

    /// Returns the root scope the close hook is registered on.
    pub fn root_scope(&self) -> &Arc<RootScope> {
        &self.inner.root_scope
    }

    fn on_class_started(&self, class_name: &str, signals: &EnvironmentSignals) {
        debug!("starting test insight for test class {class_name}");
        let detected = self.inner.detector.detect_phase(class_name, signals);
        let resolved = self.inner.resolve_fingerprint(class_name);

        let mut state = lock(&self.inner.state);
        match &state.current_phase {
            None => {
                debug!("entering phase {detected}");
                state.current_phase = Some(detected);
            }
            Some(current) if *current != detected => {
                info!("phase change detected: {current} -> {detected}, resetting report generation");
                self.inner.execution.clear();
                self.inner.context_cache.clear();
                state.report_generated = false;
                state.current_phase = Some(detected);
            }
            Some(_) => {}
        }

        self.register_close_hook();

        // Tracker updates happen under the state lock so that they land in the phase adopted
        // above, not in one a concurrent transition is about to clear.
        if self.inner.execution.total_test_classes() == 0 {
            self.inner.execution.start_tracking();
        }
        self.inner.execution.record_test_class_start(class_name);

        if let Some(resolved) = resolved {
            self.inner.context_cache.record_test_class_for_context(
                resolved.fingerprint,
                class_name,
                resolved.config_descriptor.as_deref(),
            );
            info!(
                "test class {class_name} uses context cache key {}",
                resolved.fingerprint
            );
        }
    }

    fn on_instance_prepared(&self, class_name: &str) {
        let Some(resolved) = self.inner.resolve_fingerprint(class_name) else {
            return;
        };
        let fingerprint = resolved.fingerprint;
        let tracker = &self.inner.context_cache;

        // Not atomic: two classes with the same fingerprint may both record a creation.
        match tracker.cache_entry(fingerprint) {
            Some(entry) if entry.created => {
                tracker.record_context_cache_hit(fingerprint);
                debug!("context cache hit for test class {class_name}");
            }
            _ => {
                tracker.record_context_creation(fingerprint);
                debug!("new context created for test class {class_name}");
            }
        }
    }

    fn register_close_hook(&self) {
        let registered = self
            .inner
            .root_scope
            .get_or_insert_close_hook(CLOSE_HOOK_KEY, || {
                Arc::new(ReportCloseHook {
                    inner: Arc::downgrade(&self.inner),
                })
            });
        if registered {
            debug!("registered report close hook on the root scope");
        }
    }

    fn on_run_closed(&self) {
        self.inner.generate_report();
    }
}

impl OrchestratorInner {
    fn resolve_fingerprint(&self, class_name: &str) -> Option<ResolvedFingerprint> {
        let resolver = self.resolver.0.as_ref()?;
        let result =
            panic::catch_unwind(AssertUnwindSafe(|| resolver.resolve_fingerprint(class_name)));
        match result {
            Ok(Ok(resolved)) => Some(resolved),
            Ok(Err(error)) => {
                warn!(
                    "failed to track context for test class {class_name}: {}",
                    DisplayErrorChain::new(&error)
                );
                None
            }
            Err(payload) => {
                warn!(
                    "fingerprint resolver panicked for test class {class_name}: {}",
                    panic_message(&*payload)
                );
                None
            }
        }
    }

    fn generate_report(&self) {
        let mut state = lock(&self.state);
        if state.report_generated {
            debug!("report already generated for current phase, skipping");
            return;
        }

        let phase = state.current_phase.clone().unwrap_or(PhaseName::UNKNOWN);
        info!("all tests completed for {phase} phase, generating test insight report");

        self.execution.stop_tracking();
        let execution = self.execution.snapshot();
        let context_cache = self.context_cache.snapshot();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let cache_statistics = self.cache_statistics.cache_statistics();
            self.renderer.render(&RenderContext {
                phase: &phase,
                execution: &execution,
                cache_statistics: &cache_statistics,
                context_cache: &context_cache,
            })
        }));
        match result {
            Ok(Ok(())) => {
                debug!("rendered test insight report for {phase} phase");
            }
            Ok(Err(error)) => {
                error!(
                    "failed to render test insight report for {phase} phase: {}",
                    DisplayErrorChain::new(&error)
                );
            }
            Err(payload) => {
                error!(
                    "test insight report renderer panicked for {phase} phase: {}",
                    panic_message(&*payload)
                );
            }
        }

        self.context_cache.clear();
        state.report_generated = true;
    }
}

/// The hook registered on the root scope. Holds a weak reference so that the scope does not keep
/// the orchestrator alive.
struct ReportCloseHook {
    inner: Weak<OrchestratorInner>,
}

impl CloseHook for ReportCloseHook {
    fn close(&self) {
        match self.inner.upgrade() {
            Some(inner) => inner.generate_report(),
            None => debug!("orchestrator dropped before the root scope closed"),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "(non-string panic payload)"
    }
}
