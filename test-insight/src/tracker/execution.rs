// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The execution tracker: a ledger of test class and test method timing for the current phase.

use super::lock;
use crate::time::{StopwatchSnapshot, StopwatchStart, stopwatch};
use chrono::{DateTime, Local};
use indexmap::{IndexMap, map::Entry};
use serde::Serialize;
use std::{fmt, sync::Mutex, time::Duration};
use tracing::{debug, warn};

/// The outcome of a test method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum TestStatus {
    /// The test method completed without a recorded exception.
    Passed,

    /// The test method ended with a recorded exception.
    Failed,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "PASSED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Tracks test class and test method execution for one phase.
///
/// All operations take `&self` and are safe to call from multiple threads. Class names are unique
/// keys within a phase: a class that is started twice keeps its original record.
#[derive(Debug, Default)]
pub struct ExecutionTracker {
    run: Mutex<RunClock>,
    classes: Mutex<IndexMap<String, TestClassRecord>>,
}

#[derive(Debug, Default)]
struct RunClock {
    stopwatch: Option<StopwatchStart>,
    stopped: Option<StopwatchSnapshot>,
}

#[derive(Debug)]
struct TestClassRecord {
    stopwatch: StopwatchStart,
    end: Option<StopwatchSnapshot>,
    methods: Vec<TestMethodRecord>,
}

#[derive(Debug)]
struct TestMethodRecord {
    name: String,
    stopwatch: StopwatchStart,
    end: Option<StopwatchSnapshot>,
    status: Option<TestStatus>,
}

impl TestMethodRecord {
    fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

impl ExecutionTracker {
    /// Creates a new, empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the start of the run. Only the first call after construction or [`Self::clear`]
    /// records a start time.
    pub fn start_tracking(&self) {
        let mut run = lock(&self.run);
        if run.stopwatch.is_none() {
            let start = stopwatch();
            debug!("started tracking test execution at {}", start.start_time());
            run.stopwatch = Some(start);
        }
    }

    /// Marks the end of the run, freezing the aggregate duration reported by [`Self::snapshot`].
    ///
    /// Each call refreshes the frozen value, so a report re-emitted for the same phase covers the
    /// time up to that report. Does nothing if tracking never started.
    pub fn stop_tracking(&self) {
        let mut run = lock(&self.run);
        match &run.stopwatch {
            Some(start) => {
                let snapshot = start.snapshot();
                debug!(
                    "stopped tracking test execution after {:?}",
                    snapshot.duration
                );
                run.stopped = Some(snapshot);
            }
            None => {
                debug!("stop_tracking called before start_tracking, ignoring");
            }
        }
    }

    /// Records the start of a test class.
    ///
    /// Returns true if a new record was created, false if the class was already known.
    pub fn record_test_class_start(&self, class_name: &str) -> bool {
        match lock(&self.classes).entry(class_name.to_owned()) {
            Entry::Occupied(_) => {
                debug!("test class {class_name} re-entered, keeping existing record");
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(TestClassRecord {
                    stopwatch: stopwatch(),
                    end: None,
                    methods: Vec::new(),
                });
                true
            }
        }
    }

    /// Records the end of a test class. Logs a warning if the class was never started.
    pub fn record_test_class_end(&self, class_name: &str) {
        let mut classes = lock(&self.classes);
        match classes.get_mut(class_name) {
            Some(record) => {
                record.end = Some(record.stopwatch.snapshot());
            }
            None => {
                warn!("test class {class_name} ended without a matching start, ignoring");
            }
        }
    }

    /// Records the start of a test method. Logs a warning if the class was never started.
    pub fn record_test_method_start(&self, class_name: &str, method_name: &str) {
        let mut classes = lock(&self.classes);
        let Some(record) = classes.get_mut(class_name) else {
            warn!(
                "test method {class_name}::{method_name} started before its class, ignoring"
            );
            return;
        };

        if record
            .methods
            .iter()
            .any(|method| method.name == method_name && method.is_open())
        {
            debug!("test method {class_name}::{method_name} is already running, keeping record");
            return;
        }

        record.methods.push(TestMethodRecord {
            name: method_name.to_owned(),
            stopwatch: stopwatch(),
            end: None,
            status: None,
        });
    }

    /// Records the end of a test method with its status.
    ///
    /// The most recent open record for `method_name` is finished. Logs a warning if there is no
    /// such record.
    pub fn record_test_method_end(&self, class_name: &str, method_name: &str, status: TestStatus) {
        let mut classes = lock(&self.classes);
        let Some(record) = classes.get_mut(class_name) else {
            warn!("test method {class_name}::{method_name} ended before its class, ignoring");
            return;
        };

        match record
            .methods
            .iter_mut()
            .rev()
            .find(|method| method.name == method_name && method.is_open())
        {
            Some(method) => {
                method.end = Some(method.stopwatch.snapshot());
                method.status = Some(status);
            }
            None => {
                warn!(
                    "test method {class_name}::{method_name} ended without a matching start, \
                     ignoring"
                );
            }
        }
    }

    /// Returns the number of distinct test classes recorded in the current phase.
    pub fn total_test_classes(&self) -> usize {
        lock(&self.classes).len()
    }

    /// Drops all records and the run clock, so the next phase starts from a clean slate.
    pub fn clear(&self) {
        // Lock order: run, then classes. Nothing else holds both.
        let mut run = lock(&self.run);
        let mut classes = lock(&self.classes);
        *run = RunClock::default();
        classes.clear();
    }

    /// Returns an immutable copy of the tracked data.
    pub fn snapshot(&self) -> ExecutionSnapshot {
        let (start_time, duration) = {
            let run = lock(&self.run);
            match (&run.stopped, &run.stopwatch) {
                (Some(stopped), _) => (Some(stopped.start_time), Some(stopped.duration)),
                (None, Some(start)) => {
                    let snapshot = start.snapshot();
                    (Some(snapshot.start_time), Some(snapshot.duration))
                }
                (None, None) => (None, None),
            }
        };

        let classes: Vec<_> = lock(&self.classes)
            .iter()
            .map(|(name, record)| TestClassSnapshot {
                name: name.clone(),
                start_time: record.stopwatch.start_time(),
                end_time: record.end.map(|end| end.end_time()),
                duration: record.end.map(|end| end.duration),
                methods: record
                    .methods
                    .iter()
                    .map(|method| TestMethodSnapshot {
                        name: method.name.clone(),
                        start_time: method.stopwatch.start_time(),
                        end_time: method.end.map(|end| end.end_time()),
                        duration: method.end.map(|end| end.duration),
                        status: method.status,
                    })
                    .collect(),
            })
            .collect();

        let counts = StatusCounts::from_classes(&classes);
        ExecutionSnapshot {
            start_time,
            duration,
            counts,
            classes,
        }
    }
}

/// An immutable copy of the [`ExecutionTracker`] contents, handed to report renderers.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecutionSnapshot {
    /// When tracking started, if it did.
    pub start_time: Option<DateTime<Local>>,

    /// How long the run took, frozen at the time tracking stopped.
    #[serde(with = "humantime_serde::option")]
    pub duration: Option<Duration>,

    /// Aggregate method counts.
    pub counts: StatusCounts,

    /// Test classes, in the order they first started.
    pub classes: Vec<TestClassSnapshot>,
}

impl ExecutionSnapshot {
    /// Returns the number of test classes in this snapshot.
    pub fn total_test_classes(&self) -> usize {
        self.classes.len()
    }

    /// Looks up a test class by name.
    pub fn class(&self, name: &str) -> Option<&TestClassSnapshot> {
        self.classes.iter().find(|class| class.name == name)
    }
}

/// Timing and methods for one test class.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestClassSnapshot {
    /// The test class name.
    pub name: String,

    /// When the class started.
    pub start_time: DateTime<Local>,

    /// When the class ended, if it did.
    pub end_time: Option<DateTime<Local>>,

    /// How long the class took, if it ended.
    #[serde(with = "humantime_serde::option")]
    pub duration: Option<Duration>,

    /// The methods of this class, in start order.
    pub methods: Vec<TestMethodSnapshot>,
}

impl TestClassSnapshot {
    /// Returns aggregate method counts for this class.
    pub fn counts(&self) -> StatusCounts {
        StatusCounts::from_methods(&self.methods)
    }
}

/// Timing and status for one test method.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestMethodSnapshot {
    /// The test method name.
    pub name: String,

    /// When the method started.
    pub start_time: DateTime<Local>,

    /// When the method ended, if it did.
    pub end_time: Option<DateTime<Local>>,

    /// How long the method took, if it ended.
    #[serde(with = "humantime_serde::option")]
    pub duration: Option<Duration>,

    /// The outcome, or `None` if the method never ended.
    pub status: Option<TestStatus>,
}

/// Counts of test methods by status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StatusCounts {
    /// The total number of methods started.
    pub total: usize,

    /// The number of methods that passed.
    pub passed: usize,

    /// The number of methods that failed.
    pub failed: usize,

    /// The number of methods that started but never ended.
    pub unfinished: usize,
}

impl StatusCounts {
    fn from_classes(classes: &[TestClassSnapshot]) -> Self {
        classes
            .iter()
            .fold(Self::default(), |acc, class| acc.add(class.counts()))
    }

    fn from_methods(methods: &[TestMethodSnapshot]) -> Self {
        let mut counts = Self::default();
        for method in methods {
            counts.total += 1;
            match method.status {
                Some(TestStatus::Passed) => counts.passed += 1,
                Some(TestStatus::Failed) => counts.failed += 1,
                None => counts.unfinished += 1,
            }
        }
        counts
    }

    fn add(self, other: Self) -> Self {
        Self {
            total: self.total + other.total,
            passed: self.passed + other.passed,
            failed: self.failed + other.failed,
            unfinished: self.unfinished + other.unfinished,
        }
    }
}
