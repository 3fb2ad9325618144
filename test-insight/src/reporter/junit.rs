// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JUnit XML output for a phase report.

use super::json::create_report_dir;
use crate::{
    collab::{Fingerprint, RenderContext, ReportRenderer},
    errors::RenderError,
    phase::PhaseName,
    tracker::{TestClassSnapshot, TestStatus},
};
use atomicwrites::{AllowOverwrite, AtomicFile};
use camino::Utf8PathBuf;
use quick_junit::{NonSuccessKind, Report, TestCase, TestCaseStatus, TestSuite};
use std::collections::{BTreeMap, BTreeSet};

static METHOD_FAILED: &str = "test method failed";
static METHOD_UNFINISHED: &str = "test method did not finish";

/// Writes the report as JUnit XML to `<dir>/<phase>-junit.xml`.
///
/// Each test class becomes a test suite and each test method a test case. The fingerprints a class
/// was associated with are recorded as `context-fingerprint` suite properties.
#[derive(Clone, Debug)]
pub struct JunitReporter {
    dir: Utf8PathBuf,
    report_name: String,
}

impl JunitReporter {
    /// Creates a reporter writing into `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            report_name: "test-insight".to_owned(),
        }
    }

    /// Sets the name of the top-level `testsuites` element.
    pub fn with_report_name(mut self, report_name: impl Into<String>) -> Self {
        self.report_name = report_name.into();
        self
    }

    /// Returns the path the report for `phase` is written to.
    pub fn report_path(&self, phase: &PhaseName) -> Utf8PathBuf {
        self.dir.join(format!("{phase}-junit.xml"))
    }

    /// Builds the JUnit report without writing it.
    pub fn build_report(&self, cx: &RenderContext<'_>) -> Report {
        let mut fingerprints_by_class: BTreeMap<&str, BTreeSet<Fingerprint>> = BTreeMap::new();
        for entry in &cx.context_cache.entries {
            for class_name in &entry.entry.test_classes {
                fingerprints_by_class
                    .entry(class_name.as_str())
                    .or_default()
                    .insert(entry.fingerprint);
            }
        }

        let mut report = Report::new(format!("{}-{}", self.report_name, cx.phase));
        if let Some(start_time) = cx.execution.start_time {
            report.set_timestamp(start_time);
        }
        if let Some(duration) = cx.execution.duration {
            report.set_time(duration);
        }

        report.add_test_suites(cx.execution.classes.iter().map(|class| {
            let mut test_suite = class_to_test_suite(class);
            for fingerprint in fingerprints_by_class
                .get(class.name.as_str())
                .into_iter()
                .flatten()
            {
                test_suite.add_property((
                    "context-fingerprint".to_owned(),
                    fingerprint.to_string(),
                ));
            }
            test_suite
        }));

        report
    }
}

impl ReportRenderer for JunitReporter {
    fn render(&self, cx: &RenderContext<'_>) -> Result<(), RenderError> {
        create_report_dir(&self.dir)?;

        let report = self.build_report(cx);
        let path = self.report_path(cx.phase);
        AtomicFile::new(&path, AllowOverwrite)
            .write(|file| report.serialize(file))
            .map_err(|error| RenderError::Junit { path, error })
    }
}

fn class_to_test_suite(class: &TestClassSnapshot) -> TestSuite {
    let mut test_suite = TestSuite::new(class.name.as_str());
    test_suite.set_timestamp(class.start_time);
    if let Some(duration) = class.duration {
        test_suite.set_time(duration);
    }

    test_suite.add_test_cases(class.methods.iter().map(|method| {
        let status = match method.status {
            Some(TestStatus::Passed) => TestCaseStatus::success(),
            Some(TestStatus::Failed) => {
                let mut status = TestCaseStatus::non_success(NonSuccessKind::Failure);
                status.set_message(METHOD_FAILED);
                status
            }
            None => {
                let mut status = TestCaseStatus::skipped();
                status.set_message(METHOD_UNFINISHED);
                status
            }
        };

        let mut test_case = TestCase::new(method.name.as_str(), status);
        test_case
            .set_classname(class.name.as_str())
            .set_timestamp(method.start_time);
        if let Some(duration) = method.duration {
            test_case.set_time(duration);
        }
        test_case
    }));

    test_suite
}
