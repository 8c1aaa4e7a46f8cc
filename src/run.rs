//! Top-level run orchestration
//!
//! `run_once` is the unit of work a cron tick triggers: acquire the process
//! lock, load credentials and config, ensure hedge mode, run one strategy
//! cycle, release the lock on exit. `--schedule` mode calls the same cycle
//! from the internal scheduler instead.

use crate::arguments;
use crate::config;
use crate::exchange::BinanceClient;
use crate::logger::{self, LogTag};
use crate::notifications::DiscordNotifier;
use crate::process_lock::ProcessLock;
use crate::strategy::StrategyEngine;

/// Execute a single trading run end to end
///
/// Returns Ok(()) when another instance already holds the lock: overlapping
/// cron ticks are expected and must not count as failures.
pub async fn run_once() -> Result<(), String> {
    let _lock = match ProcessLock::try_acquire()? {
        Some(lock) => lock,
        None => {
            logger::warning(
                LogTag::System,
                "Another instance is already running, exiting",
            );
            return Ok(());
        }
    };

    run_cycle_inner().await
}

/// One trading cycle without lock handling, reused by the scheduler loop
/// (which holds the lock for its whole lifetime)
pub async fn run_cycle_inner() -> Result<(), String> {
    let config = config::get_config();
    let dry_run = arguments::is_dry_run_enabled();
    if dry_run {
        logger::info(LogTag::System, "Dry run mode: no orders will be placed");
    }

    let client = BinanceClient::from_env(&config.exchange).map_err(|e| e.to_string())?;
    let notifier = DiscordNotifier::from_env(&config.alerts);
    if notifier.is_none() {
        logger::debug(LogTag::Alerts, "Discord alerts disabled or webhook not set");
    }

    ensure_hedge_mode(&client, dry_run).await?;

    let engine = StrategyEngine::new(&client, notifier.as_ref(), &config, dry_run);
    let result = engine.run_cycle().await;

    if let Err(ref e) = result {
        logger::error(LogTag::System, &format!("Trading cycle failed: {}", e));
        if let Some(n) = &notifier {
            n.notify_crash(e).await;
        }
    }

    result
}

/// Enable hedge mode so LONG and SHORT sub-strategies can coexist
///
/// A dry run must not touch account configuration, so the call is skipped
/// entirely in that mode.
async fn ensure_hedge_mode(client: &BinanceClient, dry_run: bool) -> Result<(), String> {
    if dry_run {
        logger::info(LogTag::System, "Dry run: leaving position mode unchanged");
        return Ok(());
    }

    client
        .set_hedge_mode()
        .await
        .map_err(|e| format!("Could not enable hedge mode: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExchangeConfig;

    #[tokio::test]
    async fn test_dry_run_makes_no_position_mode_request() {
        // A credential-less client fails any signed request before it leaves
        // the process, so a dry run must succeed without ever building one
        let client = BinanceClient::public(&ExchangeConfig::default()).unwrap();

        assert!(ensure_hedge_mode(&client, true).await.is_ok());
        assert!(ensure_hedge_mode(&client, false).await.is_err());
    }
}
