//! Centralized argument handling for turtlebot
//!
//! All command-line argument parsing and debug flag checking goes through
//! this module so binaries and the library agree on flag semantics.
//!
//! Features:
//! - Centralized CMD_ARGS storage with thread-safe access
//! - Debug flag checking functions for all modules
//! - Mode predicates (--schedule, --dry-run, --help)

use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
/// Thread-safe singleton that stores arguments for access throughout the application
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
/// Used by binaries and tests to override the default env::args() collection
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
/// Returns a vector clone to avoid holding the mutex lock
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => {
            // Fallback to env::args if mutex is poisoned
            env::args().collect()
        }
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value of a command-line argument that follows a flag
/// Returns None if the flag is not found or has no value
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

// =============================================================================
// MODE PREDICATES
// =============================================================================

/// Internal scheduler mode: stay resident and fire on the configured cron
/// expression instead of running one cycle and exiting
pub fn is_schedule_enabled() -> bool {
    has_arg("--schedule")
}

/// Dry-run mode: evaluate signals and log decisions but place no orders
pub fn is_dry_run_enabled() -> bool {
    has_arg("--dry-run")
}

/// Help requested via -h / --help
pub fn is_help_requested() -> bool {
    has_arg("--help") || has_arg("-h")
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// =============================================================================

/// Exchange client debug mode (request/response details)
pub fn is_debug_exchange_enabled() -> bool {
    has_arg("--debug-exchange")
}

/// Strategy engine debug mode (signal evaluation details)
pub fn is_debug_strategy_enabled() -> bool {
    has_arg("--debug-strategy")
}

/// Scheduler debug mode (tick computation details)
pub fn is_debug_scheduler_enabled() -> bool {
    has_arg("--debug-scheduler")
}

/// Alerts debug mode (webhook delivery details)
pub fn is_debug_alerts_enabled() -> bool {
    has_arg("--debug-alerts")
}

/// Global verbose mode
pub fn is_verbose_enabled() -> bool {
    has_arg("--verbose")
}

/// Quiet mode: warnings and errors only
pub fn is_quiet_enabled() -> bool {
    has_arg("--quiet")
}

/// Prints usage information for the main binary
pub fn print_help() {
    println!("turtlebot - Turtle (Donchian channel) trading bot for Binance USDT-M futures");
    println!();
    println!("USAGE:");
    println!("    turtlebot [OPTIONS]");
    println!();
    println!("By default the bot runs a single trading cycle and exits, so it can be");
    println!("driven by cron (e.g. `0 9,21 * * *` with output appended to logs/cron.log).");
    println!();
    println!("OPTIONS:");
    println!("    --schedule            Stay resident and fire on the configured cron expression");
    println!("    --dry-run             Evaluate signals but place no orders");
    println!("    --quiet               Only show warnings and errors");
    println!("    --verbose             Show verbose trace output");
    println!("    --debug-exchange      Debug logs for the Binance client");
    println!("    --debug-strategy      Debug logs for signal evaluation");
    println!("    --debug-scheduler     Debug logs for tick computation");
    println!("    --debug-alerts        Debug logs for Discord delivery");
    println!("    -h, --help            Show this help");
    println!();
    println!("REQUIRED STATE:");
    println!("    .env file at the project root with BINANCE_API_KEY, BINANCE_SECRET_KEY");
    println!("    and optionally DISCORD_WEBHOOK_URL. A config.toml is created with");
    println!("    defaults on first run.");
}

// Tests in any module that mutate the global CMD_ARGS must hold this lock
#[cfg(test)]
pub(crate) static TEST_ARGS_GUARD: Mutex<()> = Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_args() {
        let _guard = TEST_ARGS_GUARD.lock().unwrap_or_else(|e| e.into_inner());
        let test_args = vec![
            "turtlebot".to_string(),
            "--debug-strategy".to_string(),
            "--dry-run".to_string(),
        ];

        set_cmd_args(test_args.clone());
        let retrieved_args = get_cmd_args();

        assert_eq!(retrieved_args, test_args);
    }

    #[test]
    fn test_has_arg_and_predicates() {
        let _guard = TEST_ARGS_GUARD.lock().unwrap_or_else(|e| e.into_inner());
        set_cmd_args(vec!["turtlebot".to_string(), "--dry-run".to_string()]);

        assert!(has_arg("--dry-run"));
        assert!(is_dry_run_enabled());
        assert!(!has_arg("--schedule"));
        assert!(!is_schedule_enabled());
    }

    #[test]
    fn test_get_arg_value() {
        let _guard = TEST_ARGS_GUARD.lock().unwrap_or_else(|e| e.into_inner());
        set_cmd_args(vec![
            "turtlebot".to_string(),
            "--symbol".to_string(),
            "BTCUSDT".to_string(),
        ]);

        assert_eq!(get_arg_value("--symbol"), Some("BTCUSDT".to_string()));
        assert_eq!(get_arg_value("--missing"), None);
    }
}
