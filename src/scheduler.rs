//! Internal scheduler for --schedule mode
//!
//! Parses the cron-style expression from the config (default `0 9,21 * * *`)
//! and fires a trading cycle on each tick, in local server time. Only the
//! subset of cron the bot needs is supported: minute and hour fields accept
//! numbers, comma lists and `*`; the day-of-month, month and day-of-week
//! fields must be `*`.

use crate::logger::{self, LogTag};
use chrono::{DateTime, Duration as ChronoDuration, Local, TimeZone};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Notify;

/// Parsed schedule: which minutes of which hours to fire, every day
#[derive(Debug, Clone, PartialEq)]
pub struct CronSchedule {
    minutes: Vec<u32>,
    hours: Vec<u32>,
}

impl FromStr for CronSchedule {
    type Err = String;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(format!(
                "cron expression '{}' has {} fields, expected 5",
                expr,
                fields.len()
            ));
        }

        for (name, field) in [("day-of-month", fields[2]), ("month", fields[3]), ("day-of-week", fields[4])] {
            if field != "*" {
                return Err(format!(
                    "unsupported cron {} field '{}': only '*' is supported",
                    name, field
                ));
            }
        }

        let minutes = parse_field(fields[0], 59, 0..60)?;
        let hours = parse_field(fields[1], 23, 0..24)?;

        Ok(Self { minutes, hours })
    }
}

/// Parse a minute/hour field: `*`, a number, or a comma list
fn parse_field(
    field: &str,
    max: u32,
    wildcard_range: std::ops::Range<u32>,
) -> Result<Vec<u32>, String> {
    if field == "*" {
        return Ok(wildcard_range.collect());
    }

    let mut values = Vec::new();
    for part in field.split(',') {
        let value: u32 = part
            .parse()
            .map_err(|_| format!("invalid cron field value '{}'", part))?;
        if value > max {
            return Err(format!("cron field value {} exceeds maximum {}", value, max));
        }
        values.push(value);
    }
    values.sort_unstable();
    values.dedup();
    if values.is_empty() {
        return Err(format!("empty cron field '{}'", field));
    }
    Ok(values)
}

impl CronSchedule {
    /// Next tick strictly after `after`, in local time
    ///
    /// Scans candidate (day, hour, minute) combinations in order. DST gaps
    /// are skipped; ambiguous local times resolve to the earlier instant.
    pub fn next_fire_after(&self, after: DateTime<Local>) -> DateTime<Local> {
        for day_offset in 0..=2 {
            let date = (after + ChronoDuration::days(day_offset)).date_naive();
            for &hour in &self.hours {
                for &minute in &self.minutes {
                    let naive = match date
                        .and_hms_opt(hour, minute, 0) {
                        Some(n) => n,
                        None => continue,
                    };
                    let candidate = match Local.from_local_datetime(&naive).earliest() {
                        Some(c) => c,
                        None => continue, // nonexistent local time (DST gap)
                    };
                    if candidate > after {
                        return candidate;
                    }
                }
            }
        }

        // Unreachable for any valid schedule: within 3 scanned days at least
        // one (hour, minute) combination lies in the future
        after + ChronoDuration::days(1)
    }
}

/// Run cycles on the schedule until Ctrl-C
///
/// `cycle` is invoked once per tick; a failing cycle is logged and the loop
/// keeps going - the next tick is the retry policy.
pub async fn run_scheduled<F, Fut>(schedule: &CronSchedule, cycle: F) -> Result<(), String>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<(), String>>,
{
    let shutdown = Arc::new(Notify::new());
    let shutdown_handler = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_handler.notify_waiters();
    })
    .map_err(|e| format!("Failed to install Ctrl-C handler: {}", e))?;

    loop {
        let now = Local::now();
        let next = schedule.next_fire_after(now);
        let wait = (next - now)
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(0));

        logger::info(
            LogTag::Scheduler,
            &format!(
                "Next cycle at {} (in {}m {}s)",
                next.format("%Y-%m-%d %H:%M:%S"),
                wait.as_secs() / 60,
                wait.as_secs() % 60
            ),
        );

        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                logger::info(LogTag::Scheduler, "Scheduled tick fired");
                if let Err(e) = cycle().await {
                    logger::error(
                        LogTag::Scheduler,
                        &format!("Cycle failed: {} (retrying on next tick)", e),
                    );
                }
            }
            _ = shutdown.notified() => {
                logger::info(LogTag::Scheduler, "Shutdown requested, stopping scheduler");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Local> {
        Local
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(y, mo, d)
                    .unwrap()
                    .and_hms_opt(h, mi, s)
                    .unwrap(),
            )
            .earliest()
            .unwrap()
    }

    #[test]
    fn test_parse_default_schedule() {
        let schedule: CronSchedule = "0 9,21 * * *".parse().unwrap();
        assert_eq!(schedule.minutes, vec![0]);
        assert_eq!(schedule.hours, vec![9, 21]);
    }

    #[test]
    fn test_parse_wildcard_minute() {
        let schedule: CronSchedule = "* 12 * * *".parse().unwrap();
        assert_eq!(schedule.minutes.len(), 60);
        assert_eq!(schedule.hours, vec![12]);
    }

    #[test]
    fn test_parse_rejects_bad_expressions() {
        assert!("0 9,21 * *".parse::<CronSchedule>().is_err()); // 4 fields
        assert!("0 25 * * *".parse::<CronSchedule>().is_err()); // hour > 23
        assert!("0 9 1 * *".parse::<CronSchedule>().is_err()); // restricted day
        assert!("x 9 * * *".parse::<CronSchedule>().is_err()); // non-numeric
    }

    #[test]
    fn test_next_fire_morning() {
        let schedule: CronSchedule = "0 9,21 * * *".parse().unwrap();
        let next = schedule.next_fire_after(local(2026, 3, 2, 7, 30, 0));
        assert_eq!(next, local(2026, 3, 2, 9, 0, 0));
    }

    #[test]
    fn test_next_fire_between_ticks() {
        let schedule: CronSchedule = "0 9,21 * * *".parse().unwrap();
        let next = schedule.next_fire_after(local(2026, 3, 2, 9, 0, 1));
        assert_eq!(next, local(2026, 3, 2, 21, 0, 0));
    }

    #[test]
    fn test_next_fire_wraps_to_next_day() {
        let schedule: CronSchedule = "0 9,21 * * *".parse().unwrap();
        let next = schedule.next_fire_after(local(2026, 3, 2, 21, 0, 0));
        assert_eq!(next, local(2026, 3, 3, 9, 0, 0));
    }

    #[test]
    fn test_exact_tick_is_excluded() {
        // A tick at exactly 09:00:00 must schedule 21:00, not re-fire 09:00
        let schedule: CronSchedule = "0 9,21 * * *".parse().unwrap();
        let next = schedule.next_fire_after(local(2026, 3, 2, 9, 0, 0));
        assert_eq!(next, local(2026, 3, 2, 21, 0, 0));
    }

    #[test]
    fn test_duplicate_values_deduped() {
        let schedule: CronSchedule = "0 9,9,21 * * *".parse().unwrap();
        assert_eq!(schedule.hours, vec![9, 21]);
    }
}
