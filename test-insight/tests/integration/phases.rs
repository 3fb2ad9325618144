// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{gradle_signals, maven_signals, recording_orchestrator, run_class};
use pretty_assertions::assert_eq;
use test_case::test_case;
use test_insight::{
    collab::Fingerprint,
    events::TestOutcome,
    phase::{EnvironmentSignals, PhaseName},
};

#[test_case(maven_signals(), "com.shop.CheckoutTest", "surefire"; "maven unit")]
#[test_case(maven_signals(), "com.shop.CheckoutIT", "failsafe"; "maven integration")]
#[test_case(gradle_signals(), "com.shop.CheckoutTest", "test"; "gradle unit")]
#[test_case(gradle_signals(), "com.shop.CheckoutIntegrationTest", "integrationTest"; "gradle integration")]
#[test_case(EnvironmentSignals::new(), "com.shop.CheckoutTest", "unit"; "unknown unit")]
#[test_case(EnvironmentSignals::new(), "com.shop.PaymentIntegrationSpec", "integration"; "unknown integration")]
fn first_class_decides_the_phase(signals: EnvironmentSignals, class_name: &str, phase: &str) {
    let (orchestrator, renderer) = recording_orchestrator([]);
    run_class(&orchestrator, class_name, &signals, &[]);

    assert_eq!(orchestrator.current_phase(), Some(PhaseName::new(phase)));
    orchestrator.root_scope().close();
    assert_eq!(renderer.rendered()[0].phase.as_str(), phase);
}

#[test]
fn phase_transition_starts_a_fresh_report() {
    let (orchestrator, renderer) =
        recording_orchestrator([("com.shop.CheckoutTest", 1), ("com.shop.CheckoutIT", 2)]);
    let signals = maven_signals();

    run_class(
        &orchestrator,
        "com.shop.CheckoutTest",
        &signals,
        &[("shouldTotalCart", TestOutcome::Success)],
    );
    orchestrator.root_scope().close();
    assert!(orchestrator.report_generated());

    run_class(
        &orchestrator,
        "com.shop.CheckoutIT",
        &signals,
        &[("shouldPlaceOrder", TestOutcome::Success)],
    );

    assert_eq!(
        orchestrator.current_phase(),
        Some(PhaseName::new("failsafe"))
    );
    assert!(
        !orchestrator.report_generated(),
        "new phase has not been reported yet"
    );
    assert_eq!(orchestrator.execution_tracker().total_test_classes(), 1);
    assert_eq!(
        orchestrator
            .context_cache_tracker()
            .cache_entry(Fingerprint(1)),
        None,
        "entries from the previous phase are gone"
    );
    assert_eq!(orchestrator.root_scope().close_hook_count(), 1);

    orchestrator.root_scope().close();
    let rendered = renderer.rendered();
    let phases: Vec<_> = rendered.iter().map(|r| r.phase.as_str()).collect();
    assert_eq!(phases, ["surefire", "failsafe"]);

    let failsafe = &rendered[1];
    assert_eq!(failsafe.execution.total_test_classes(), 1);
    assert!(failsafe.execution.class("com.shop.CheckoutIT").is_some());
    assert!(failsafe.execution.class("com.shop.CheckoutTest").is_none());
    assert_eq!(failsafe.context_cache.distinct_contexts(), 1);
    assert!(failsafe.context_cache.get(Fingerprint(2)).is_some());
}

#[test]
fn same_phase_accumulates_classes() {
    let (orchestrator, renderer) = recording_orchestrator([]);
    let signals = maven_signals();
    for class_name in ["com.shop.CartTest", "com.shop.CatalogTest", "com.shop.UserTest"] {
        run_class(&orchestrator, class_name, &signals, &[]);
    }

    orchestrator.root_scope().close();
    let rendered = renderer.rendered();
    assert_eq!(rendered.len(), 1);
    let names: Vec<_> = rendered[0]
        .execution
        .classes
        .iter()
        .map(|class| class.name.as_str())
        .collect();
    assert_eq!(
        names,
        ["com.shop.CartTest", "com.shop.CatalogTest", "com.shop.UserTest"]
    );
}
