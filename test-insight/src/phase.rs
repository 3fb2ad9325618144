// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Detection of the build phase a test class runs in.
//!
//! A phase is derived from two independent classifications:
//!
//! 1. the *build tool* driving the run, inferred from environment signals (explicit tool markers
//!    first, then class path heuristics);
//! 2. the *test kind*, inferred from the test class's simple name.
//!
//! Each build tool has its own pair of phase names. Detection is pure and never fails: missing
//! signals fall through to [`BuildTool::Unknown`].

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{borrow::Borrow, collections::BTreeMap, fmt};

/// Environment signal keys that identify a Maven build.
pub const MAVEN_MARKERS: &[&str] = &["maven.home", "maven.version", "surefire.test.class.path"];

/// Environment signal keys that identify a Gradle build.
pub const GRADLE_MARKERS: &[&str] = &[
    "gradle.home",
    "gradle.version",
    "org.gradle.test.worker",
    "gradle.user.home",
];

/// The base directory signal. A Maven build is assumed if it points into a `target` directory.
pub const BASEDIR_SIGNAL: &str = "basedir";

/// The class path signal, used for substring heuristics.
pub const CLASS_PATH_SIGNAL: &str = "java.class.path";

/// A snapshot of the raw environment signals used for build tool detection.
///
/// These are key-value pairs such as system properties. How they are gathered is up to the host
/// adapter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvironmentSignals {
    signals: BTreeMap<String, String>,
}

impl EnvironmentSignals {
    /// Creates an empty set of signals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a signal, replacing any existing value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.signals.insert(key.into(), value.into());
        self
    }

    /// Returns the value of a signal, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.signals.get(key).map(String::as_str)
    }

    /// Returns true if a signal is present.
    pub fn contains(&self, key: &str) -> bool {
        self.signals.contains_key(key)
    }

    /// Returns true if there are no signals.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvironmentSignals {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            signals: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The build tool driving the test run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum BuildTool {
    /// Maven, with surefire running unit tests and failsafe running integration tests.
    Maven,

    /// Gradle, with the `test` and `integrationTest` tasks.
    Gradle,

    /// No build tool could be identified.
    Unknown,
}

impl BuildTool {
    /// Infers the build tool from environment signals.
    pub fn detect(signals: &EnvironmentSignals) -> Self {
        let basedir_in_target = signals
            .get(BASEDIR_SIGNAL)
            .is_some_and(|basedir| basedir.contains("target"));
        if basedir_in_target || MAVEN_MARKERS.iter().any(|key| signals.contains(key)) {
            return Self::Maven;
        }

        if GRADLE_MARKERS.iter().any(|key| signals.contains(key)) {
            return Self::Gradle;
        }

        let class_path = signals.get(CLASS_PATH_SIGNAL).unwrap_or_default();
        if class_path.contains("/target/")
            || class_path.contains("\\target\\")
            || class_path.contains("maven")
        {
            Self::Maven
        } else if class_path.contains("/build/")
            || class_path.contains("\\build\\")
            || class_path.contains("gradle")
        {
            Self::Gradle
        } else {
            Self::Unknown
        }
    }

    /// Returns the phase name this build tool uses for the given kind of test.
    pub fn phase_name(self, kind: TestKind) -> PhaseName {
        let name = match (self, kind) {
            (Self::Maven, TestKind::Unit) => "surefire",
            (Self::Maven, TestKind::Integration) => "failsafe",
            (Self::Gradle, TestKind::Unit) => "test",
            (Self::Gradle, TestKind::Integration) => "integrationTest",
            (Self::Unknown, TestKind::Unit) => "unit",
            (Self::Unknown, TestKind::Integration) => "integration",
        };
        PhaseName::new_static(name)
    }
}

impl fmt::Display for BuildTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Maven => write!(f, "maven"),
            Self::Gradle => write!(f, "gradle"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Whether a test class is a unit test or an integration test.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum TestKind {
    /// A unit test.
    Unit,

    /// An integration test.
    Integration,
}

/// The symbolic name of a phase, e.g. `surefire` or `integrationTest`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhaseName(SmolStr);

impl PhaseName {
    /// The phase name used when a report is produced before any phase was detected.
    pub const UNKNOWN: Self = Self::new_static("unknown");

    /// Creates a new phase name.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self(name.into())
    }

    const fn new_static(name: &'static str) -> Self {
        Self(SmolStr::new_static(name))
    }

    /// Returns the phase name as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Borrow<str> for PhaseName {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for PhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a test class and environment signals to a phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseDetector {
    integration_suffixes: Vec<String>,
    integration_tokens: Vec<String>,
}

impl Default for PhaseDetector {
    fn default() -> Self {
        Self {
            integration_suffixes: vec!["IT".to_owned(), "IntegrationTest".to_owned()],
            integration_tokens: vec!["Integration".to_owned()],
        }
    }
}

impl PhaseDetector {
    /// Creates a detector with custom integration test markers.
    ///
    /// A class is an integration test if its simple name ends with one of `integration_suffixes`
    /// or contains one of `integration_tokens`.
    pub fn new(
        integration_suffixes: impl IntoIterator<Item = impl Into<String>>,
        integration_tokens: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            integration_suffixes: integration_suffixes.into_iter().map(Into::into).collect(),
            integration_tokens: integration_tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Detects the phase for a test class.
    pub fn detect_phase(&self, test_class_name: &str, signals: &EnvironmentSignals) -> PhaseName {
        BuildTool::detect(signals).phase_name(self.test_kind(test_class_name))
    }

    /// Classifies a test class as a unit or integration test based on its simple name.
    pub fn test_kind(&self, test_class_name: &str) -> TestKind {
        let simple_name = simple_class_name(test_class_name);
        let is_integration = self
            .integration_suffixes
            .iter()
            .any(|suffix| !suffix.is_empty() && simple_name.ends_with(suffix.as_str()))
            || self
                .integration_tokens
                .iter()
                .any(|token| !token.is_empty() && simple_name.contains(token.as_str()));

        if is_integration {
            TestKind::Integration
        } else {
            TestKind::Unit
        }
    }
}

/// Strips package, module and enclosing-class qualifiers from a test class name.
fn simple_class_name(name: &str) -> &str {
    name.rsplit(['.', ':', '$']).next().unwrap_or(name)
}
