// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logging setup for test-insight.
//!
//! test-insight logs through [`tracing`]. Hosts that install their own subscriber need nothing
//! from this module; others can call [`init_logging`] to get plain `level: message` lines on
//! stderr, filtered by the `TEST_INSIGHT_LOG` environment variable.

use std::{ffi::OsString, fmt};
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    level_filters::LevelFilter,
    warn,
};
use tracing_subscriber::{
    Layer,
    filter::Targets,
    fmt::{FmtContext, FormatEvent, FormatFields, format},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// The environment variable used to filter log output, in `tracing_subscriber` target syntax.
pub const LOG_ENV: &str = "TEST_INSIGHT_LOG";

static INIT_LOGGER: std::sync::Once = std::sync::Once::new();

/// Installs a stderr logger as the global default subscriber.
///
/// Only the first call has any effect. If a global subscriber is already installed, it is kept.
pub fn init_logging() {
    INIT_LOGGER.call_once(|| {
        let (targets, invalid) = match parse_targets(std::env::var_os(LOG_ENV)) {
            Ok(targets) => (targets, None),
            Err(value) => (default_targets(), Some(value)),
        };

        let layer = tracing_subscriber::fmt::layer()
            .event_format(SimpleFormatter)
            .with_writer(std::io::stderr)
            .with_filter(targets);

        if tracing_subscriber::registry().with(layer).try_init().is_ok() {
            if let Some(value) = invalid {
                warn!("ignoring invalid {LOG_ENV} value `{value}`, logging at info level");
            }
        }
    });
}

fn default_targets() -> Targets {
    Targets::new().with_default(LevelFilter::INFO)
}

/// Parses the value of [`LOG_ENV`]. An unset or empty value means the default filter; an invalid
/// value is returned as the error.
fn parse_targets(value: Option<OsString>) -> Result<Targets, String> {
    let value = value.unwrap_or_default();
    let value = value
        .into_string()
        .map_err(|value| value.to_string_lossy().into_owned())?;

    if value.is_empty() {
        Ok(default_targets())
    } else {
        value.parse().map_err(|_| value)
    }
}

struct SimpleFormatter;

impl<S, N> FormatEvent<S, N> for SimpleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let level = match *metadata.level() {
            Level::ERROR => "error",
            Level::WARN => "warning",
            Level::INFO => "info",
            Level::DEBUG => "debug",
            Level::TRACE => "trace",
        };
        write!(writer, "test-insight {level}: ")?;

        let mut visitor = MessageVisitor {
            writer: &mut writer,
            // Show other fields for debug or trace output.
            show_other: *metadata.level() >= Level::DEBUG,
            error: None,
        };
        event.record(&mut visitor);

        if let Some(error) = visitor.error {
            return Err(error);
        }

        writeln!(writer)
    }
}

static MESSAGE_FIELD: &str = "message";

struct MessageVisitor<'writer, 'a> {
    writer: &'a mut format::Writer<'writer>,
    show_other: bool,
    error: Option<fmt::Error>,
}

impl Visit for MessageVisitor<'_, '_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == MESSAGE_FIELD {
            if let Err(error) = write!(self.writer, "{value:?}") {
                self.error = Some(error);
            }
        } else if self.show_other {
            if let Err(error) = write!(self.writer, "; {} = {:?}", field.name(), value) {
                self.error = Some(error);
            }
        }
    }
}
