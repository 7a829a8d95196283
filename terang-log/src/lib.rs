//! Logging setup for Terang
//!
//! Configures a `tracing` subscriber with one of several formats and
//! outputs. Defaults to JSON output on STDOUT at INFO level.
//!
//! # Environment Variables
//!
//! - `TERANG_LOG_LEVEL=trace|debug|info|warn|error`
//! - `TERANG_LOG_FORMAT=json|plain|pretty|compact`
//! - `TERANG_LOG_OUTPUT=stdout|stderr|file|rolling`
//! - `TERANG_LOG_DIR` - directory used by the `file` and `rolling` outputs
//! - `RUST_LOG` - takes precedence over the level when set
//!
//! # Example
//!
//! ```no_run
//! use terang_log::LogConfig;
//!
//! let _guard = LogConfig::from_env().init().expect("logging");
//! tracing::info!("server starting");
//! ```

use std::{env, io, path::PathBuf};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use tracing::{debug, error, info, trace, warn};

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("Failed to open log file: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Logger already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Log level used when no `RUST_LOG` filter is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level name, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured, machine-readable (default)
    Json,
    Plain,
    /// Multi-line, for local development
    Pretty,
    Compact,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "plain" | "text" => Some(LogFormat::Plain),
            "pretty" => Some(LogFormat::Pretty),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// Append to a single file
    File(PathBuf),
    /// Daily rotated files under `directory`
    RollingFile { directory: PathBuf, prefix: String },
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    pub targets: bool,
    pub file_line: bool,
    pub colors: bool,
    /// Overrides both `level` and `RUST_LOG` when set
    pub env_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            output: LogOutput::Stdout,
            targets: true,
            file_line: false,
            colors: false,
            env_filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `TERANG_LOG_*` variables.
    ///
    /// Unknown values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(level) = lookup("TERANG_LOG_LEVEL").and_then(|v| LogLevel::parse(&v)) {
            config.level = level;
        }
        if let Some(format) = lookup("TERANG_LOG_FORMAT").and_then(|v| LogFormat::parse(&v)) {
            config.format = format;
            config.colors = format == LogFormat::Pretty;
        }

        let dir = lookup("TERANG_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("logs"));
        match lookup("TERANG_LOG_OUTPUT").as_deref().map(str::trim) {
            Some("stderr") => config.output = LogOutput::Stderr,
            Some("file") => config.output = LogOutput::File(dir.join("terang.log")),
            Some("rolling") => {
                config.output = LogOutput::RollingFile {
                    directory: dir,
                    prefix: "terang".to_string(),
                }
            }
            _ => {}
        }

        config
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
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

    pub fn with_colors(mut self, enable: bool) -> Self {
        self.colors = enable;
        self
    }

    pub fn with_file_line(mut self, enable: bool) -> Self {
        self.file_line = enable;
        self
    }

    /// Set a filter directive such as `terang_server=debug,hyper=info`.
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn build_filter(&self) -> Result<EnvFilter, LogError> {
        match &self.env_filter {
            Some(directives) => {
                EnvFilter::try_new(directives).map_err(|e| LogError::Filter(e.to_string()))
            }
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))),
        }
    }

    /// Install the global subscriber.
    ///
    /// The returned guard flushes buffered lines when dropped and must be
    /// kept alive for the lifetime of the process.
    pub fn init(self) -> Result<WorkerGuard, LogError> {
        let filter = self.build_filter()?;

        let (writer, guard) = match &self.output {
            LogOutput::Stdout => tracing_appender::non_blocking(io::stdout()),
            LogOutput::Stderr => tracing_appender::non_blocking(io::stderr()),
            LogOutput::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                tracing_appender::non_blocking(file)
            }
            LogOutput::RollingFile { directory, prefix } => {
                let appender = tracing_appender::rolling::daily(directory, prefix);
                tracing_appender::non_blocking(appender)
            }
        };

        let registry = tracing_subscriber::registry().with(filter);
        let result = match self.format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_target(self.targets)
                        .with_file(self.file_line)
                        .with_line_number(self.file_line),
                )
                .try_init(),
            LogFormat::Plain => registry
                .with(
                    fmt::layer()
                        .with_writer(writer)
                        .with_target(self.targets)
                        .with_ansi(self.colors),
                )
                .try_init(),
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_writer(writer)
                        .with_target(self.targets)
                        .with_file(self.file_line)
                        .with_line_number(self.file_line)
                        .with_ansi(self.colors),
                )
                .try_init(),
            LogFormat::Compact => registry
                .with(
                    fmt::layer()
                        .compact()
                        .with_writer(writer)
                        .with_target(self.targets)
                        .with_ansi(self.colors),
                )
                .try_init(),
        };

        result.map_err(|e| LogError::AlreadyInitialized(e.to_string()))?;
        Ok(guard)
    }
}
