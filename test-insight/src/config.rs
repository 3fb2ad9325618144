// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for test-insight.
//!
//! The embedded default config is layered under an optional user config file, by default
//! `.config/test-insight.toml` relative to the workspace root.

use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind},
    orchestrator::{ReportOrchestrator, ReportOrchestratorBuilder},
    phase::PhaseDetector,
    reporter::{JsonReporter, JunitReporter, LogReporter, MultiReporter},
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use serde::{Deserialize, de::DeserializeOwned};
use std::{fmt, str::FromStr};

/// A report format test-insight can emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReportFormat {
    /// A summary logged at info level.
    Log,

    /// A JSON file per phase.
    Json,

    /// A JUnit XML file per phase.
    Junit,
}

impl ReportFormat {
    /// Returns the names of all formats, as written in config files.
    pub fn variants() -> &'static [&'static str] {
        &["log", "json", "junit"]
    }
}

impl FromStr for ReportFormat {
    type Err = ConfigParseErrorKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log" => Ok(Self::Log),
            "json" => Ok(Self::Json),
            "junit" => Ok(Self::Junit),
            other => Err(ConfigParseErrorKind::UnknownReportFormat {
                format: other.to_owned(),
                known: Self::variants().to_vec(),
            }),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Log => write!(f, "log"),
            Self::Json => write!(f, "json"),
            Self::Junit => write!(f, "junit"),
        }
    }
}

/// Overall configuration for test-insight.
#[derive(Clone, Debug)]
pub struct InsightConfig {
    workspace_root: Utf8PathBuf,
    enabled: bool,
    detector: PhaseDetector,
    report_dir: Utf8PathBuf,
    report_formats: Vec<ReportFormat>,
    slowest_classes: usize,
}

impl InsightConfig {
    /// The default location of the config within the workspace root.
    pub const CONFIG_PATH: &'static str = ".config/test-insight.toml";

    /// Contains the default config as a TOML file.
    ///
    /// User-specified config is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from the workspace root.
    ///
    /// If `config_file` is `None`, the config is read from [`Self::CONFIG_PATH`] if it exists.
    /// An explicitly specified file must exist.
    ///
    /// Values set in the user config replace the defaults wholesale, including arrays.
    pub fn from_sources(
        workspace_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let workspace_root = workspace_root.into();
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        // The config crate merges arrays element by element across sources, so the user config
        // is deserialized on its own and applied on top of the defaults.
        let overrides: InsightConfigOverrides =
            deserialize(Config::builder().add_source(source))
                .map_err(|kind| ConfigParseError::new(config_file.clone(), kind))?;
        let mut deserialized = Self::deserialize_default();
        deserialized.apply(overrides);

        Self::from_deserialized(workspace_root, deserialized)
            .map_err(|kind| ConfigParseError::new(config_file, kind))
    }

    /// Returns the default config, without reading any user config.
    pub fn default_config(workspace_root: impl Into<Utf8PathBuf>) -> Self {
        Self::from_deserialized(workspace_root.into(), Self::deserialize_default())
            .expect("default config is always valid")
    }

    fn deserialize_default() -> InsightConfigDeserialize {
        deserialize(
            Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml)),
        )
        .expect("default config is always valid")
    }

    fn from_deserialized(
        workspace_root: Utf8PathBuf,
        deserialized: InsightConfigDeserialize,
    ) -> Result<Self, ConfigParseErrorKind> {
        let report_formats = deserialized
            .report
            .formats
            .iter()
            .map(|format| format.parse())
            .collect::<Result<Vec<ReportFormat>, _>>()?;

        Ok(Self {
            report_dir: workspace_root.join(&deserialized.report.dir),
            workspace_root,
            enabled: deserialized.enabled,
            detector: PhaseDetector::new(
                deserialized.phase.integration_suffixes,
                deserialized.phase.integration_tokens,
            ),
            report_formats,
            slowest_classes: deserialized.report.slowest_classes,
        })
    }

    /// Returns the workspace root.
    pub fn workspace_root(&self) -> &Utf8Path {
        &self.workspace_root
    }

    /// Returns true if tracking is enabled.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the phase detector configured by the `[phase]` section.
    pub fn phase_detector(&self) -> &PhaseDetector {
        &self.detector
    }

    /// Returns the absolute directory file-based reports are written to.
    pub fn report_dir(&self) -> &Utf8Path {
        &self.report_dir
    }

    /// Returns the configured report formats, in config order.
    pub fn report_formats(&self) -> &[ReportFormat] {
        &self.report_formats
    }

    /// Returns a renderer emitting every configured format.
    pub fn renderer(&self) -> MultiReporter {
        let mut reporter = MultiReporter::new();
        for format in &self.report_formats {
            match format {
                ReportFormat::Log => {
                    reporter.push(LogReporter::new().with_slowest_classes(self.slowest_classes));
                }
                ReportFormat::Json => {
                    reporter.push(JsonReporter::new(self.report_dir.clone()));
                }
                ReportFormat::Junit => {
                    reporter.push(JunitReporter::new(self.report_dir.clone()));
                }
            }
        }
        reporter
    }

    /// Returns an orchestrator builder with the configured phase detector and renderers, or `None`
    /// if tracking is disabled.
    ///
    /// Callers add their fingerprint resolver and other collaborators before building.
    pub fn orchestrator_builder(&self) -> Option<ReportOrchestratorBuilder> {
        if !self.enabled {
            return None;
        }

        let mut builder = ReportOrchestrator::builder();
        builder
            .set_phase_detector(self.detector.clone())
            .set_renderer(self.renderer());
        Some(builder)
    }
}

fn deserialize<T: DeserializeOwned>(
    builder: ConfigBuilder<DefaultState>,
) -> Result<T, ConfigParseErrorKind> {
    builder
        .build()
        .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?
        .try_deserialize()
        .map_err(|error| ConfigParseErrorKind::DeserializeError(Box::new(error)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct InsightConfigDeserialize {
    enabled: bool,
    phase: PhaseConfigDeserialize,
    report: ReportConfigDeserialize,
}

impl InsightConfigDeserialize {
    fn apply(&mut self, overrides: InsightConfigOverrides) {
        let InsightConfigOverrides {
            enabled,
            phase,
            report,
        } = overrides;

        if let Some(enabled) = enabled {
            self.enabled = enabled;
        }
        if let Some(suffixes) = phase.integration_suffixes {
            self.phase.integration_suffixes = suffixes;
        }
        if let Some(tokens) = phase.integration_tokens {
            self.phase.integration_tokens = tokens;
        }
        if let Some(dir) = report.dir {
            self.report.dir = dir;
        }
        if let Some(formats) = report.formats {
            self.report.formats = formats;
        }
        if let Some(slowest_classes) = report.slowest_classes {
            self.report.slowest_classes = slowest_classes;
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PhaseConfigDeserialize {
    integration_suffixes: Vec<String>,
    integration_tokens: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ReportConfigDeserialize {
    dir: Utf8PathBuf,
    formats: Vec<String>,
    slowest_classes: usize,
}

/// A user config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
struct InsightConfigOverrides {
    enabled: Option<bool>,
    phase: PhaseConfigOverrides,
    report: ReportConfigOverrides,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
struct PhaseConfigOverrides {
    integration_suffixes: Option<Vec<String>>,
    integration_tokens: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
struct ReportConfigOverrides {
    dir: Option<Utf8PathBuf>,
    formats: Option<Vec<String>>,
    slowest_classes: Option<usize>,
}
