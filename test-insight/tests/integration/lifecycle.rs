// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{RecordingRenderer, TableResolver, maven_signals, recording_orchestrator, run_class};
use color_eyre::{Result, eyre::ensure};
use pretty_assertions::assert_eq;
use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};
use test_insight::{
    collab::{Fingerprint, RenderContext, ReportRenderer},
    errors::RenderError,
    events::{InsightEvent, TestOutcome},
    orchestrator::ReportOrchestrator,
    scope::RootScope,
    tracker::StatusCounts,
};

#[test]
fn closing_the_root_scope_emits_one_report() -> Result<()> {
    let (orchestrator, renderer) = recording_orchestrator([("com.shop.OrderServiceTest", 42)]);
    run_class(
        &orchestrator,
        "com.shop.OrderServiceTest",
        &maven_signals(),
        &[("shouldCreateOrder", TestOutcome::Success)],
    );
    ensure!(
        orchestrator.root_scope().close_hook_count() == 1,
        "close hook registered on first class start"
    );

    orchestrator.root_scope().close();
    orchestrator.root_scope().close();
    orchestrator.handle_event(InsightEvent::run_closed());

    let rendered = renderer.rendered();
    assert_eq!(rendered.len(), 1, "report rendered exactly once");
    assert_eq!(rendered[0].phase.as_str(), "surefire");
    assert_eq!(rendered[0].execution.total_test_classes(), 1);
    assert!(orchestrator.report_generated());
    Ok(())
}

#[test]
fn reset_allows_a_second_report() {
    let (orchestrator, renderer) = recording_orchestrator([]);
    run_class(&orchestrator, "com.shop.CartTest", &maven_signals(), &[]);

    orchestrator.handle_event(InsightEvent::run_closed());
    orchestrator.reset_report_generation();
    orchestrator.handle_event(InsightEvent::run_closed());

    assert_eq!(renderer.rendered().len(), 2);
}

#[test]
fn method_outcomes_are_aggregated() {
    let (orchestrator, renderer) = recording_orchestrator([]);
    run_class(
        &orchestrator,
        "com.shop.PaymentServiceTest",
        &maven_signals(),
        &[
            (
                "shouldRejectExpiredCard",
                TestOutcome::Failure {
                    message: Some("expected DECLINED but was APPROVED".to_owned()),
                },
            ),
            ("shouldChargeCard", TestOutcome::Success),
        ],
    );
    orchestrator.root_scope().close();

    let rendered = renderer.rendered();
    assert_eq!(rendered.len(), 1);
    let execution = &rendered[0].execution;
    assert_eq!(
        execution.counts,
        StatusCounts {
            total: 2,
            passed: 1,
            failed: 1,
            unfinished: 0,
        }
    );

    let class = execution
        .class("com.shop.PaymentServiceTest")
        .expect("class was tracked");
    assert!(class.end_time.is_some());
    assert!(class.methods.iter().all(|method| method.duration.is_some()));
    assert!(execution.duration.is_some(), "run duration frozen at report time");
}

#[test]
fn concurrent_class_starts_share_one_close_hook() {
    const CLASSES: usize = 32;

    let class_names: Vec<_> = (0..CLASSES)
        .map(|i| format!("com.shop.parallel.Worker{i}Test"))
        .collect();
    let root_scope = Arc::new(RootScope::new());
    let renderer = RecordingRenderer::default();
    let mut builder = ReportOrchestrator::builder();
    builder
        .set_root_scope(root_scope.clone())
        .set_fingerprint_resolver(TableResolver::new(
            class_names
                .iter()
                .enumerate()
                .map(|(i, class_name)| (class_name.as_str(), i as u64)),
        ))
        .set_renderer(renderer.clone());
    let orchestrator = builder.build();

    thread::scope(|s| {
        for class_name in &class_names {
            let orchestrator = orchestrator.clone();
            s.spawn(move || {
                run_class(
                    &orchestrator,
                    class_name,
                    &maven_signals(),
                    &[("shouldWork", TestOutcome::Success)],
                );
            });
        }
    });

    assert_eq!(root_scope.close_hook_count(), 1);
    assert_eq!(orchestrator.execution_tracker().total_test_classes(), CLASSES);

    root_scope.close();
    let rendered = renderer.rendered();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].execution.total_test_classes(), CLASSES);
    assert_eq!(rendered[0].execution.counts.passed, CLASSES);

    let context_cache = &rendered[0].context_cache;
    assert_eq!(context_cache.distinct_contexts(), CLASSES);
    assert_eq!(context_cache.contexts_created(), CLASSES);
    for (i, class_name) in class_names.iter().enumerate() {
        let entry = context_cache
            .get(Fingerprint(i as u64))
            .expect("every worker has its own context");
        assert_eq!(entry.hit_count, 0, "{class_name}");
        assert!(entry.created, "{class_name}");
        assert_eq!(
            entry.test_classes.iter().collect::<Vec<_>>(),
            [class_name],
            "{class_name}"
        );
    }
}

#[derive(Debug, Default)]
struct FailingRenderer {
    calls: Arc<AtomicUsize>,
    panic: bool,
}

impl ReportRenderer for FailingRenderer {
    fn render(&self, _cx: &RenderContext<'_>) -> Result<(), RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic {
            panic!("renderer exploded");
        }
        Err(RenderError::other("report sink unavailable"))
    }
}

#[test]
fn renderer_failures_do_not_escape() {
    for panic in [false, true] {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut builder = ReportOrchestrator::builder();
        builder.set_renderer(FailingRenderer {
            calls: calls.clone(),
            panic,
        });
        let orchestrator = builder.build();

        run_class(&orchestrator, "com.shop.InventoryTest", &maven_signals(), &[]);
        orchestrator.root_scope().close();
        orchestrator.handle_event(InsightEvent::run_closed());

        assert_eq!(calls.load(Ordering::SeqCst), 1, "panic = {panic}");
        assert!(orchestrator.report_generated(), "panic = {panic}");
    }
}
