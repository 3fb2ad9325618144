// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{maven_signals, recording_orchestrator, run_class};
use maplit::btreeset;
use pretty_assertions::assert_eq;
use test_insight::{collab::Fingerprint, events::TestOutcome, tracker::CacheEntry};

#[test]
fn shared_fingerprint_counts_one_creation_and_one_hit() {
    let (orchestrator, renderer) = recording_orchestrator([
        ("com.shop.OrderServiceTest", 42),
        ("com.shop.OrderControllerTest", 42),
    ]);
    let signals = maven_signals();

    run_class(
        &orchestrator,
        "com.shop.OrderServiceTest",
        &signals,
        &[("shouldCreateOrder", TestOutcome::Success)],
    );
    run_class(
        &orchestrator,
        "com.shop.OrderControllerTest",
        &signals,
        &[("shouldReturn201", TestOutcome::Success)],
    );

    let expected = CacheEntry {
        created: true,
        hit_count: 1,
        test_classes: btreeset! {
            "com.shop.OrderControllerTest".to_owned(),
            "com.shop.OrderServiceTest".to_owned(),
        },
        config_descriptor: None,
    };
    assert_eq!(
        orchestrator
            .context_cache_tracker()
            .cache_entry(Fingerprint(42)),
        Some(expected.clone())
    );

    orchestrator.root_scope().close();
    let rendered = renderer.rendered();
    let context_cache = &rendered[0].context_cache;
    assert_eq!(context_cache.get(Fingerprint(42)), Some(&expected));
    assert_eq!(context_cache.contexts_created(), 1);
    assert_eq!(context_cache.total_hits(), 1);
    assert_eq!(context_cache.hit_ratio(), Some(0.5));

    assert!(
        orchestrator.context_cache_tracker().is_empty(),
        "context cache cleared after the report"
    );
}

#[test]
fn unresolved_classes_are_timed_but_not_cached() {
    let (orchestrator, renderer) = recording_orchestrator([("com.shop.OrderServiceTest", 7)]);
    let signals = maven_signals();

    run_class(&orchestrator, "com.shop.OrderServiceTest", &signals, &[]);
    run_class(&orchestrator, "com.shop.PlainUnitTest", &signals, &[]);

    orchestrator.root_scope().close();
    let rendered = renderer.rendered();
    assert_eq!(rendered[0].execution.total_test_classes(), 2);
    assert_eq!(rendered[0].context_cache.distinct_contexts(), 1);

    let entry = rendered[0]
        .context_cache
        .get(Fingerprint(7))
        .expect("resolved class is tracked");
    assert_eq!(entry.hit_count, 0);
    assert_eq!(
        entry.test_classes,
        btreeset! {"com.shop.OrderServiceTest".to_owned()}
    );
}

#[test]
fn distinct_fingerprints_each_create_a_context() {
    let (orchestrator, renderer) = recording_orchestrator([
        ("com.shop.OrderServiceTest", 1),
        ("com.shop.BillingServiceTest", 2),
        ("com.shop.ShippingServiceTest", 3),
    ]);
    let signals = maven_signals();
    for class_name in [
        "com.shop.OrderServiceTest",
        "com.shop.BillingServiceTest",
        "com.shop.ShippingServiceTest",
    ] {
        run_class(&orchestrator, class_name, &signals, &[]);
    }

    orchestrator.root_scope().close();
    let context_cache = &renderer.rendered()[0].context_cache;
    assert_eq!(context_cache.distinct_contexts(), 3);
    assert_eq!(context_cache.contexts_created(), 3);
    assert_eq!(context_cache.total_hits(), 0);
    assert_eq!(context_cache.hit_ratio(), Some(0.0));
}

#[test]
fn external_statistics_reach_the_renderer() {
    use crate::{RecordingRenderer, TableResolver};
    use test_insight::{
        collab::{CacheStatistics, CacheStatisticsSource},
        orchestrator::ReportOrchestrator,
    };

    struct FixedStatistics;

    impl CacheStatisticsSource for FixedStatistics {
        fn cache_statistics(&self) -> CacheStatistics {
            CacheStatistics {
                size: 2,
                max_size: 32,
                hit_count: 5,
                miss_count: 2,
            }
        }
    }

    let renderer = RecordingRenderer::default();
    let mut builder = ReportOrchestrator::builder();
    builder
        .set_fingerprint_resolver(TableResolver::new([("com.shop.OrderServiceTest", 42)]))
        .set_cache_statistics_source(FixedStatistics)
        .set_renderer(renderer.clone());
    let orchestrator = builder.build();

    run_class(&orchestrator, "com.shop.OrderServiceTest", &maven_signals(), &[]);
    orchestrator.root_scope().close();

    let rendered = renderer.rendered();
    assert_eq!(rendered[0].cache_statistics.max_size, 32);
    assert_eq!(rendered[0].cache_statistics.hit_rate(), Some(5.0 / 7.0));
}
