//! Logger configuration derived from command-line arguments
//!
//! Scans CMD_ARGS once at init() for --debug-<module>, --verbose and --quiet
//! flags and stores the result for cheap lookups on every log call.

use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::RwLock;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Minimum level to display (Info by default, Warning with --quiet,
    /// Verbose with --verbose)
    pub min_level: LogLevel,
    /// Tags with per-module debug enabled via --debug-<key>
    pub debug_tags: HashSet<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Build the logger configuration from the current command-line arguments
pub fn init_from_args() {
    let args = arguments::get_cmd_args();

    let mut config = LoggerConfig::default();

    if arguments::is_quiet_enabled() {
        config.min_level = LogLevel::Warning;
    } else if arguments::is_verbose_enabled() {
        config.min_level = LogLevel::Verbose;
    }

    for arg in &args {
        if let Some(key) = arg.strip_prefix("--debug-") {
            config.debug_tags.insert(key.to_string());
        }
    }

    if let Ok(mut current) = LOGGER_CONFIG.write() {
        *current = config;
    }
}

/// Get a snapshot of the current logger configuration
pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG
        .read()
        .map(|c| c.clone())
        .unwrap_or_default()
}

/// Check if debug output is enabled for a specific tag
pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    get_logger_config().debug_tags.contains(&tag.to_debug_key())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_flag_enables_tag() {
        let _guard = arguments::TEST_ARGS_GUARD
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        arguments::set_cmd_args(vec![
            "turtlebot".to_string(),
            "--debug-exchange".to_string(),
        ]);
        init_from_args();

        assert!(is_debug_enabled_for_tag(&LogTag::Exchange));
        assert!(!is_debug_enabled_for_tag(&LogTag::Strategy));
    }
}
