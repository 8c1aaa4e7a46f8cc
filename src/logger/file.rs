//! File sink appending log lines to `logs/cron.log`
//!
//! The file is opened in append mode so output accumulates across scheduled
//! runs, matching the cron redirection contract (`>> logs/cron.log 2>&1`).
//! Lines are written without ANSI codes.

use crate::paths;
use once_cell::sync::Lazy;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

static LOG_FILE: Lazy<Mutex<Option<File>>> = Lazy::new(|| Mutex::new(None));

/// Open the append-mode file sink
///
/// Logging works without this (console only); failures here are reported to
/// stderr and otherwise ignored so a read-only filesystem cannot kill the bot.
pub fn init_file_logging() {
    let path = paths::get_cron_log_path();
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            if let Ok(mut slot) = LOG_FILE.lock() {
                *slot = Some(file);
            }
        }
        Err(e) => {
            eprintln!("Failed to open log file {}: {}", path.display(), e);
        }
    }
}

/// Append a single line to the log file (no-op when the sink is not open)
pub fn write_to_file(line: &str) {
    if let Ok(mut slot) = LOG_FILE.lock() {
        if let Some(file) = slot.as_mut() {
            let _ = writeln!(file, "{}", line);
        }
    }
}

/// Flush pending writes to disk
pub fn flush_file_logging() {
    if let Ok(mut slot) = LOG_FILE.lock() {
        if let Some(file) = slot.as_mut() {
            let _ = file.flush();
        }
    }
}
