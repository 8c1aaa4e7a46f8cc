//! Log formatting and output with ANSI colors
//!
//! Handles:
//! - Colorized console output with tag and level formatting
//! - Dual output (console + file, file lines without ANSI codes)
//! - Broken pipe handling for piped invocations

use super::file::write_to_file;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use once_cell::sync::Lazy;
use std::io::{stdout, ErrorKind, Write};

/// Fixed width for the tag column so messages align
const TAG_WIDTH: usize = 9;

/// Format and output a log message to console and file
pub fn format_and_log(tag: LogTag, log_type: &str, message: &str) {
    let now = Local::now();
    let time = now.format("%H:%M:%S").to_string();

    let console_line = format!(
        "{} [{}] [{}] {}",
        time.dimmed(),
        format_tag(&tag),
        format_log_type(log_type),
        highlight_values(message)
    );
    print_stdout_safe(&console_line);

    let timestamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let file_line = format!(
        "{} [{}] [{}] {}",
        timestamp,
        tag.to_plain_string(),
        log_type,
        message
    );
    write_to_file(&file_line);
}

/// Format a tag with its fixed color, padded to the tag column width
fn format_tag(tag: &LogTag) -> ColoredString {
    let label = format!("{:<width$}", tag.to_plain_string(), width = TAG_WIDTH);
    match tag {
        LogTag::System => label.bright_yellow().bold(),
        LogTag::Config => label.bright_white().bold(),
        LogTag::Exchange => label.bright_green().bold(),
        LogTag::Strategy => label.bright_cyan().bold(),
        LogTag::Positions => label.bright_magenta().bold(),
        LogTag::Alerts => label.bright_blue().bold(),
        LogTag::Scheduler => label.bright_red().bold(),
        LogTag::Backtest => label.cyan().bold(),
    }
}

/// Format a log level label with its color
fn format_log_type(log_type: &str) -> ColoredString {
    match log_type {
        "ERROR" => log_type.red().bold(),
        "WARNING" => log_type.yellow().bold(),
        "INFO" => log_type.green(),
        "DEBUG" => log_type.purple(),
        "VERBOSE" => log_type.dimmed(),
        _ => log_type.normal(),
    }
}

static VALUE_PATTERN: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"(\$[\d,]+\.?\d*|[\d,]+\.?\d*%)").unwrap());

/// Highlight dollar amounts and percentages in console messages
fn highlight_values(message: &str) -> String {
    VALUE_PATTERN
        .replace_all(message, |caps: &regex::Captures| {
            caps[1].bright_white().bold().to_string()
        })
        .to_string()
}

/// Print to stdout, swallowing broken-pipe errors (e.g. `turtlebot | head`)
fn print_stdout_safe(line: &str) {
    let mut out = stdout();
    if let Err(e) = writeln!(out, "{}", line) {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
    }
    let _ = out.flush();
}
