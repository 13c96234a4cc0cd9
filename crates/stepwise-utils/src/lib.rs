//! # Stepwise Utilities
//!
//! Shared helpers for the Stepwise workspace.
//!
//! Today this is the logging setup built on `tracing`: every binary and
//! library in the workspace logs through the same subscriber, configured
//! once at startup from CLI flags and `STEPWISE_*` environment variables.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{LogFormat, LogLevel, LoggingConfig, LoggingError, init_logging, init_logging_with, init_logging_with_level};
pub use tracing::{debug, error, info, trace, warn};
