//! Centralized path resolution for turtlebot
//!
//! All file and directory paths are resolved through this module so every
//! component agrees on where state lives. Unlike a desktop application, this
//! bot is driven by cron with a `cd` into the project directory, so all paths
//! are resolved relative to the current working directory:
//!
//! ```text
//! <project root>/
//! ├── .env                  (credentials, loaded at startup)
//! ├── config.toml
//! ├── turtlebot.lock
//! ├── logs/
//! │   ├── cron.log          (combined bot output, append-only)
//! │   ├── positions.json
//! │   └── trading_log.csv
//! └── backtest_results/
//!     └── *.csv
//! ```

use std::path::PathBuf;

const LOGS_DIR: &str = "logs";
const BACKTEST_RESULTS_DIR: &str = "backtest_results";

/// Returns the logs directory path
///
/// Contains the cron log, the positions state file and the trading CSV.
pub fn get_logs_directory() -> PathBuf {
    PathBuf::from(LOGS_DIR)
}

/// Returns the append-only log file capturing all bot output
pub fn get_cron_log_path() -> PathBuf {
    get_logs_directory().join("cron.log")
}

/// Returns the positions state file path
pub fn get_positions_path() -> PathBuf {
    get_logs_directory().join("positions.json")
}

/// Returns the CSV trading log path
pub fn get_trade_log_path() -> PathBuf {
    get_logs_directory().join("trading_log.csv")
}

/// Returns the TOML configuration file path (project root)
pub fn get_config_path() -> PathBuf {
    PathBuf::from("config.toml")
}

/// Returns the process lock file path (project root)
pub fn get_lock_path() -> PathBuf {
    PathBuf::from("turtlebot.lock")
}

/// Returns the backtest output directory
pub fn get_backtest_results_directory() -> PathBuf {
    PathBuf::from(BACKTEST_RESULTS_DIR)
}

/// Creates all directories the bot writes into
///
/// Must be called before logger initialization - the file sink needs the
/// logs directory to exist.
pub fn ensure_all_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_directory())?;
    Ok(())
}

/// Creates the backtest output directory (tool binaries only)
pub fn ensure_backtest_directory() -> std::io::Result<()> {
    std::fs::create_dir_all(get_backtest_results_directory())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_files_live_under_logs() {
        assert!(get_cron_log_path().starts_with(get_logs_directory()));
        assert!(get_positions_path().starts_with(get_logs_directory()));
        assert!(get_trade_log_path().starts_with(get_logs_directory()));
    }

    #[test]
    fn test_config_and_lock_at_project_root() {
        assert_eq!(get_config_path(), PathBuf::from("config.toml"));
        assert_eq!(get_lock_path(), PathBuf::from("turtlebot.lock"));
    }
}
