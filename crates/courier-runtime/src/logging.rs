//! Tracing subscriber setup.
//!
//! The dispatch loop and the default [`TracingLogger`](courier_core::TracingLogger)
//! sink both emit through `tracing`. This module installs the subscriber that
//! turns those events into timestamped lines.
//!
//! ```rust,ignore
//! use courier_runtime::{ConfigLoader, logging};
//!
//! let config = ConfigLoader::new().load()?;
//! logging::init_from_config(&config.logging)?;
//! ```
//!
//! Each dispatched update runs inside an `update` span. Enabling the `new`
//! and `close` span events prints one line when handling starts and one with
//! its busy/idle timing when it ends.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LogOutput, LogRotation, LoggingConfig, SpanEventConfig};
use crate::error::{RuntimeError, RuntimeResult};

const DEFAULT_LOG_FILE: &str = "courier.log";

fn fmt_span(events: &SpanEventConfig) -> FmtSpan {
    [
        (events.new, FmtSpan::NEW),
        (events.enter, FmtSpan::ENTER),
        (events.exit, FmtSpan::EXIT),
        (events.close, FmtSpan::CLOSE),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .fold(FmtSpan::NONE, |span, (_, flag)| span | flag)
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Never => Rotation::NEVER,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// Fails if a global subscriber is already set or the log file cannot be
/// opened.
pub fn init_from_config(config: &LoggingConfig) -> RuntimeResult<()> {
    LoggingBuilder::from_config(config).try_init()
}

/// A builder for the global tracing subscriber.
#[derive(Debug)]
pub struct LoggingBuilder {
    level: tracing::Level,
    directives: Vec<String>,
    span_events: FmtSpan,
    format: LogFormat,
    output: LogOutput,
    thread_ids: bool,
    location: bool,
    file_path: Option<PathBuf>,
    rotation: LogRotation,
    max_files: usize,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self {
            level: tracing::Level::INFO,
            directives: Vec::new(),
            span_events: FmtSpan::NONE,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            thread_ids: false,
            location: false,
            file_path: None,
            rotation: LogRotation::Never,
            max_files: 5,
        }
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut builder = Self::new()
            .level(config.level.to_tracing_level())
            .format(config.format)
            .output(config.output)
            .span_events(&config.span_events)
            .thread_ids(config.thread_ids)
            .location(config.file_location)
            .rotation(config.rotation, config.max_files);
        builder.file_path.clone_from(&config.file_path);

        for (target, level) in &config.filters {
            builder = builder.directive(&format!("{target}={level}"));
        }
        builder
    }

    pub fn level(mut self, level: tracing::Level) -> Self {
        self.level = level;
        self
    }

    /// Adds a filter directive such as `courier_framework=debug`.
    pub fn directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }

    pub fn span_events(mut self, events: &SpanEventConfig) -> Self {
        self.span_events = fmt_span(events);
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn thread_ids(mut self, enabled: bool) -> Self {
        self.thread_ids = enabled;
        self
    }

    /// Include source file and line in each line.
    pub fn location(mut self, enabled: bool) -> Self {
        self.location = enabled;
        self
    }

    /// Sets file rotation and how many rotated files are kept.
    pub fn rotation(mut self, rotation: LogRotation, max_files: usize) -> Self {
        self.rotation = rotation;
        self.max_files = max_files;
        self
    }

    /// `RUST_LOG` replaces the base level. Directives are added on top.
    fn build_filter(&self) -> EnvFilter {
        let base = self.level.to_string().to_lowercase();
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&base));

        for directive in &self.directives {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(err) => eprintln!("Ignoring invalid log directive {directive:?}: {err}"),
            }
        }
        filter
    }

    fn file_appender(&self) -> RuntimeResult<RollingFileAppender> {
        let path = self
            .file_path
            .as_deref()
            .ok_or(RuntimeError::MissingLogFile)?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .unwrap_or_else(|| OsStr::new(DEFAULT_LOG_FILE));

        let appender = RollingFileAppender::builder()
            .rotation(self.rotation.into())
            .filename_prefix(name.to_string_lossy())
            .max_log_files(self.max_files)
            .build(dir)?;
        Ok(appender)
    }

    /// Installs the subscriber as the global default.
    pub fn try_init(self) -> RuntimeResult<()> {
        let filter = self.build_filter();
        let span_events = self.span_events.clone();

        macro_rules! text_layer {
            ($layer:expr) => {
                $layer
                    .with_span_events(span_events.clone())
                    .with_thread_ids(self.thread_ids)
                    .with_file(self.location)
                    .with_line_number(self.location)
            };
        }

        macro_rules! init_with_writer {
            ($writer:expr) => {{
                let registry = tracing_subscriber::registry().with(filter);
                match self.format {
                    #[cfg(feature = "json-log")]
                    LogFormat::Json => registry
                        .with(
                            fmt::layer()
                                .json()
                                .with_span_events(span_events.clone())
                                .with_writer($writer),
                        )
                        .try_init(),
                    LogFormat::Compact => registry
                        .with(text_layer!(fmt::layer().compact().with_writer($writer)))
                        .try_init(),
                    LogFormat::Full => registry
                        .with(text_layer!(fmt::layer().with_writer($writer)))
                        .try_init(),
                    LogFormat::Pretty => registry
                        .with(text_layer!(fmt::layer().pretty().with_writer($writer)))
                        .try_init(),
                }
            }};
        }

        match self.output {
            LogOutput::Stdout => init_with_writer!(std::io::stdout)?,
            LogOutput::Stderr => init_with_writer!(std::io::stderr)?,
            LogOutput::File => {
                let appender = self.file_appender()?;
                init_with_writer!(appender)?
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_span_events_from_config() {
        let events = SpanEventConfig {
            new: true,
            close: true,
            ..Default::default()
        };
        assert_eq!(fmt_span(&events), FmtSpan::NEW | FmtSpan::CLOSE);
        assert_eq!(fmt_span(&SpanEventConfig::default()), FmtSpan::NONE);
    }

    #[test]
    fn test_builder_from_config() {
        let mut config = LoggingConfig {
            level: LogLevel::Debug,
            thread_ids: true,
            file_location: true,
            ..Default::default()
        };
        config
            .filters
            .insert("courier_framework".to_string(), LogLevel::Trace);

        let builder = LoggingBuilder::from_config(&config);
        assert_eq!(builder.level, tracing::Level::DEBUG);
        assert_eq!(builder.output, LogOutput::Stderr);
        assert!(builder.thread_ids);
        assert!(builder.location);
        assert_eq!(builder.directives, vec!["courier_framework=trace".to_string()]);
    }

    #[test]
    fn test_file_output_without_path() {
        let builder = LoggingBuilder::new().output(LogOutput::File);
        assert!(matches!(
            builder.file_appender(),
            Err(RuntimeError::MissingLogFile)
        ));
    }
}
