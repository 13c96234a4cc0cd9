//! # Logging Utilities
//!
//! Logging infrastructure for Stepwise using `tracing`.
//!
//! This module provides structured logging with support for:
//! - Two output formats (pretty for humans, JSON for tooling)
//! - Environment variable configuration
//! - An optional daily-rolling log file
//!
//! Console output goes to **stderr**. Stdout belongs to the interactive
//! shell (register dumps, hexdumps, prompts), so log lines never interleave
//! with command output that a user may be piping somewhere.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stepwise_utils::init_logging;
//!
//! // Initialize with default settings (reads the environment)
//! init_logging().expect("Failed to initialize logging");
//!
//! tracing::info!(pid = 1234, "Attached");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level filter (e.g., `RUST_LOG=debug`, `RUST_LOG=stepwise_core=trace`)
//! - `STEPWISE_LOG_FORMAT`: Set output format (`json` or `pretty`, default: `pretty`)
//! - `STEPWISE_LOG_FILE`: Optional path to log file (rolled daily; if not set, logs only to stderr)

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use tracing::Level;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the output format
pub const LOG_FORMAT_ENV: &str = "STEPWISE_LOG_FORMAT";
/// Environment variable naming the log file
pub const LOG_FILE_ENV: &str = "STEPWISE_LOG_FILE";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Pretty-printed, human-readable format
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(LogFormat::Pretty),
            "json" | "prod" | "production" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(format!("{s}. Use 'pretty' or 'json'"))),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel
{
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level (default)
    Info,
    /// Debug level
    Debug,
    /// Trace level (most verbose)
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(format!(
                "{s}. Use 'error', 'warn', 'info', 'debug', or 'trace'"
            ))),
        }
    }
}

/// Resolved logging settings
///
/// Explicit values (usually from CLI flags) win over the environment:
///
/// 1. `level`: explicit, else `RUST_LOG` (which may hold per-crate
///    directives), else `info`
/// 2. `format`: explicit, else `STEPWISE_LOG_FORMAT`, else pretty
/// 3. `file`: explicit, else `STEPWISE_LOG_FILE`, else none
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig
{
    /// Maximum level; `None` defers to `RUST_LOG`
    pub level: Option<LogLevel>,
    /// Output format; `None` defers to the environment
    pub format: Option<LogFormat>,
    /// Log file; `None` defers to the environment
    pub file: Option<PathBuf>,
}

impl LoggingConfig
{
    /// Fill every unset field from the environment.
    ///
    /// ## Errors
    ///
    /// `InvalidFormat` if `STEPWISE_LOG_FORMAT` holds an unknown format.
    pub fn resolve_env(mut self) -> Result<Self, LoggingError>
    {
        if self.format.is_none() {
            self.format = env::var(LOG_FORMAT_ENV).ok().map(|s| s.parse()).transpose()?;
        }
        if self.file.is_none() {
            self.file = env::var_os(LOG_FILE_ENV).filter(|s| !s.is_empty()).map(PathBuf::from);
        }
        Ok(self)
    }

    /// The filter this configuration installs.
    fn env_filter(&self) -> EnvFilter
    {
        match self.level {
            Some(level) => EnvFilter::new(Level::from(level).to_string()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string())),
        }
    }
}

/// Initialize logging with default settings
///
/// Reads configuration from environment variables:
/// - `RUST_LOG`: Log level filter (e.g., `debug`, `stepwise_core=debug`)
/// - `STEPWISE_LOG_FORMAT`: Output format (`json` or `pretty`, default: `pretty`)
/// - `STEPWISE_LOG_FILE`: Optional path to log file
///
/// ## Errors
///
/// Returns an error if:
/// - Logging is already initialized
/// - `STEPWISE_LOG_FORMAT` is invalid
pub fn init_logging() -> Result<(), LoggingError>
{
    init_logging_with(LoggingConfig::default())
}

/// Initialize logging with explicit level and format
///
/// ## Example
///
/// ```rust,no_run
/// use stepwise_utils::{LogFormat, LogLevel, init_logging_with_level};
///
/// init_logging_with_level(LogLevel::Debug, LogFormat::Pretty)
///     .expect("Failed to initialize logging");
/// ```
///
/// ## Errors
///
/// Returns an error if logging is already initialized.
pub fn init_logging_with_level(level: LogLevel, format: LogFormat) -> Result<(), LoggingError>
{
    init_logging_with(LoggingConfig {
        level: Some(level),
        format: Some(format),
        file: None,
    })
}

/// Initialize logging from a [`LoggingConfig`], completing it from the
/// environment first.
///
/// ## Errors
///
/// Returns an error if logging is already initialized or an environment
/// variable holds an invalid value.
pub fn init_logging_with(config: LoggingConfig) -> Result<(), LoggingError>
{
    let config = config.resolve_env()?;
    let format = config.format.unwrap_or_default();

    let console_layer = match format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(true)
            .with_writer(io::stderr)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(io::stderr)
            .boxed(),
    };

    let mut layers = vec![console_layer];
    if let Some(path) = config.file.as_deref() {
        layers.push(file_layer(path, format));
    }

    Registry::default()
        .with(layers)
        .with(config.env_filter())
        .try_init()
        .map_err(|e| LoggingError::InitializationFailed(e.to_string()))
}

/// Daily-rolling file layer writing through a background thread.
fn file_layer(path: &Path, format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync>
{
    let directory = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let file_appender = tracing_appender::rolling::daily(directory, path.file_name().unwrap_or_default());
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The writer thread must outlive every event; logging lives until exit.
    std::mem::forget(guard);

    match format {
        LogFormat::Pretty => fmt::layer()
            .with_writer(non_blocking)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false) // No ANSI in files
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
    }
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid log format
    #[error("Invalid log format: {0}")]
    InvalidFormat(String),

    /// Invalid log level
    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    /// Failed to initialize logging
    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    /// File logging error
    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}
