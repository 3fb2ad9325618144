// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{TableResolver, gradle_signals, run_class};
use camino_tempfile::Utf8TempDir;
use color_eyre::{Result, eyre::eyre};
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::Value;
use test_insight::{config::InsightConfig, events::TestOutcome};

#[test]
fn configured_formats_are_written() -> Result<()> {
    let workspace = Utf8TempDir::new()?;
    let config_file = workspace.path().join("insight.toml");
    std::fs::write(
        &config_file,
        indoc! {r#"
            [report]
            dir = "out/insight"
            formats = ["json", "junit"]
        "#},
    )?;

    let config = InsightConfig::from_sources(workspace.path(), Some(&config_file))?;
    let mut builder = config
        .orchestrator_builder()
        .ok_or_else(|| eyre!("tracking is enabled"))?;
    builder.set_fingerprint_resolver(TableResolver::new([("com.shop.CheckoutTest", 9)]));
    let orchestrator = builder.build();

    run_class(
        &orchestrator,
        "com.shop.CheckoutTest",
        &gradle_signals(),
        &[
            ("shouldApplyDiscount", TestOutcome::Success),
            ("shouldRejectEmptyCart", TestOutcome::Failure { message: None }),
        ],
    );
    orchestrator.root_scope().close();

    let report_dir = workspace.path().join("out/insight");
    let json: Value = serde_json::from_str(&std::fs::read_to_string(report_dir.join("test.json"))?)?;
    assert_eq!(json["phase"], "test");
    assert_eq!(json["execution"]["counts"]["passed"], 1);
    assert_eq!(json["execution"]["counts"]["failed"], 1);
    assert_eq!(json["context-cache"]["entries"][0]["fingerprint"], 9);

    let xml = std::fs::read_to_string(report_dir.join("test-junit.xml"))?;
    assert!(xml.contains(r#"name="com.shop.CheckoutTest""#), "{xml}");
    assert!(xml.contains(r#"name="shouldRejectEmptyCart""#), "{xml}");

    Ok(())
}
