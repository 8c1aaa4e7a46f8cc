//! Core logging implementation with automatic filtering
//!
//! Filtering rules:
//! 1. Errors are always shown
//! 2. Messages above the minimum level threshold are dropped
//! 3. Debug level requires the --debug-<module> flag for that tag
//! 4. Verbose level requires --verbose

use super::config::{get_logger_config, is_debug_enabled_for_tag};
use super::levels::LogLevel;
use super::tags::LogTag;

/// Check if a log message should be displayed
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    let config = get_logger_config();

    // Rule 1: errors always log
    if level == LogLevel::Error {
        return true;
    }

    // Rule 3: debug requires the per-module flag regardless of threshold
    if level == LogLevel::Debug {
        return is_debug_enabled_for_tag(tag) || config.min_level >= LogLevel::Debug;
    }

    // Rules 2 and 4: threshold check covers Warning/Info/Verbose
    level <= config.min_level
}

/// Internal logging function with automatic filtering
pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }

    super::format::format_and_log(tag, level.as_str(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments;

    #[test]
    fn test_errors_always_log() {
        let _guard = arguments::TEST_ARGS_GUARD
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        arguments::set_cmd_args(vec!["turtlebot".to_string(), "--quiet".to_string()]);
        super::super::config::init_from_args();

        assert!(should_log(&LogTag::System, LogLevel::Error));
        assert!(!should_log(&LogTag::System, LogLevel::Info));
    }
}
