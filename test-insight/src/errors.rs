// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by test-insight.
//!
//! None of these errors ever reach the host test runtime: the orchestrator logs and absorbs them.
//! They exist so that collaborators and reporters can describe what went wrong.

use camino::Utf8PathBuf;
use config::ConfigError;
use std::{error, fmt};
use thiserror::Error;

/// An error that occurred while parsing the test-insight config.
#[derive(Debug, Error)]
#[error("failed to parse test-insight config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
///
/// Returned by [`ConfigParseError::kind`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<ConfigError>),

    /// An unknown report format was specified.
    #[error("unknown report format `{format}` (known formats: {})", .known.join(", "))]
    UnknownReportFormat {
        /// The format that was specified.
        format: String,

        /// The known formats.
        known: Vec<&'static str>,
    },
}

/// An error returned by a [`FingerprintResolver`](crate::collab::FingerprintResolver).
///
/// A failure here means that the test class contributes no context cache signal for this
/// invocation. Timing and status tracking are unaffected.
#[derive(Debug, Error)]
#[error("failed to resolve configuration fingerprint for test class `{class_name}`")]
pub struct FingerprintResolveError {
    class_name: String,
    #[source]
    source: Box<dyn error::Error + Send + Sync>,
}

impl FingerprintResolveError {
    /// Creates a new `FingerprintResolveError`.
    pub fn new(
        class_name: impl Into<String>,
        source: impl Into<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            source: source.into(),
        }
    }

    /// Returns the test class that failed to resolve.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }
}

/// An error that occurred while rendering a report.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RenderError {
    /// An error occurred while writing the report to the provided output.
    #[error("error writing report to output")]
    Io(#[source] std::io::Error),

    /// An error occurred while operating on the file system.
    #[error("error operating on path {path}")]
    Fs {
        /// The path being operated on.
        path: Utf8PathBuf,

        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },

    /// An error occurred while serializing a JSON report.
    #[error("error writing JSON report to {path}")]
    Json {
        /// The output file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: atomicwrites::Error<serde_json::Error>,
    },

    /// An error occurred while producing JUnit XML.
    #[error("error writing JUnit report to {path}")]
    Junit {
        /// The output file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: atomicwrites::Error<quick_junit::SerializeError>,
    },

    /// A custom renderer failed.
    #[error("{message}")]
    Other {
        /// A description of the failure.
        message: String,

        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn error::Error + Send + Sync>>,
    },
}

impl RenderError {
    /// Creates a [`RenderError::Other`] from a message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            source: None,
        }
    }
}

/// Displays an error along with the chain of errors that caused it.
///
/// Used when logging absorbed errors, so that the underlying cause isn't lost.
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: error::Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: error::Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let mut source = self.error.source();
        while let Some(err) = source {
            write!(f, "\n  caused by: {err}")?;
            source = err.source();
        }

        Ok(())
    }
}
