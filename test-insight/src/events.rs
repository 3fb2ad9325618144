// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle events emitted by the host test runtime.
//!
//! The host adapter translates its own callbacks into [`InsightEvent`]s and hands them to a
//! [`ReportOrchestrator`](crate::orchestrator::ReportOrchestrator). Nothing in this crate depends
//! on the host's types.

use crate::{phase::EnvironmentSignals, tracker::TestStatus};
use chrono::{DateTime, FixedOffset, Local};

/// A lifecycle event.
#[derive(Clone, Debug)]
pub struct InsightEvent {
    /// The time at which the event was generated, including the offset from UTC.
    pub timestamp: DateTime<FixedOffset>,

    /// The kind of event this is.
    pub kind: InsightEventKind,
}

impl InsightEvent {
    /// Creates a new event timestamped now.
    pub fn now(kind: InsightEventKind) -> Self {
        Self {
            timestamp: Local::now().fixed_offset(),
            kind,
        }
    }

    /// A test class started.
    pub fn class_started(class_name: impl Into<String>, signals: EnvironmentSignals) -> Self {
        Self::now(InsightEventKind::ClassStarted {
            class_name: class_name.into(),
            signals,
        })
    }

    /// An instance of a test class was prepared.
    pub fn instance_prepared(class_name: impl Into<String>) -> Self {
        Self::now(InsightEventKind::InstancePrepared {
            class_name: class_name.into(),
        })
    }

    /// A test method started.
    pub fn method_started(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self::now(InsightEventKind::MethodStarted {
            class_name: class_name.into(),
            method_name: method_name.into(),
        })
    }

    /// A test method finished.
    pub fn method_finished(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        outcome: TestOutcome,
    ) -> Self {
        Self::now(InsightEventKind::MethodFinished {
            class_name: class_name.into(),
            method_name: method_name.into(),
            outcome,
        })
    }

    /// A test class finished.
    pub fn class_finished(class_name: impl Into<String>) -> Self {
        Self::now(InsightEventKind::ClassFinished {
            class_name: class_name.into(),
        })
    }

    /// The outermost scope of the run closed.
    pub fn run_closed() -> Self {
        Self::now(InsightEventKind::RunClosed)
    }
}

/// The kind of lifecycle event.
///
/// For a single test class, `ClassStarted` precedes its method events, which precede
/// `ClassFinished`. No ordering is assumed across classes.
#[derive(Clone, Debug)]
pub enum InsightEventKind {
    /// A test class started.
    ClassStarted {
        /// The fully qualified class name.
        class_name: String,

        /// Raw environment signals used for phase detection.
        signals: EnvironmentSignals,
    },

    /// An instance of a test class was prepared. Its shared context is loaded at this point.
    InstancePrepared {
        /// The fully qualified class name.
        class_name: String,
    },

    /// A test method started.
    MethodStarted {
        /// The fully qualified class name.
        class_name: String,

        /// The method name.
        method_name: String,
    },

    /// A test method finished.
    MethodFinished {
        /// The fully qualified class name.
        class_name: String,

        /// The method name.
        method_name: String,

        /// How the method finished.
        outcome: TestOutcome,
    },

    /// A test class finished.
    ClassFinished {
        /// The fully qualified class name.
        class_name: String,
    },

    /// The outermost scope closed after all test classes in it completed.
    RunClosed,
}

/// How a test method finished.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TestOutcome {
    /// No exception was recorded.
    Success,

    /// An exception was recorded.
    Failure {
        /// A description of the exception, if the host provides one.
        message: Option<String>,
    },
}

impl TestOutcome {
    /// Returns the status recorded for this outcome.
    pub fn status(&self) -> TestStatus {
        match self {
            Self::Success => TestStatus::Passed,
            Self::Failure { .. } => TestStatus::Failed,
        }
    }
}
