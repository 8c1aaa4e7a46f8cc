//! Structured logging for turtlebot
//!
//! Provides a clean logging API with:
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-module debug control via --debug-<module> flags
//! - Dual output: colored console + append-only file (`logs/cron.log`)
//!
//! ## Usage
//!
//! ```rust
//! use turtlebot::logger::{self, LogTag};
//!
//! logger::error(LogTag::Exchange, "Connection failed");
//! logger::info(LogTag::Strategy, "Position opened");
//! logger::debug(LogTag::Exchange, "Request details: ..."); // Only if --debug-exchange
//! ```
//!
//! ## Initialization
//!
//! Call once at startup, after the logs directory exists:
//! ```rust
//! turtlebot::logger::init();
//! ```

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{get_logger_config, LoggerConfig};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Must be called once at application startup, before any logging occurs.
/// Parses command-line arguments for debug flags and opens the file sink.
pub fn init() {
    config::init_from_args();
    file::init_file_logging();
}

/// Log at ERROR level (always shown, critical issues)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (important issues, shown unless --quiet)
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (standard operations)
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (detailed diagnostics)
///
/// Only shown when the matching --debug-<module> flag is provided.
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (very detailed tracing, gated by --verbose)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Force flush all pending log writes
///
/// Call during shutdown to ensure all lines reach logs/cron.log.
pub fn flush() {
    file::flush_file_logging();
}
