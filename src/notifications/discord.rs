//! Discord webhook notifier
//!
//! Sends formatted messages to a Discord channel via webhook. Deliveries
//! retry with escalating delay; HTTP 429 responses honor the returned
//! retry_after before trying again.

use super::types::{clamp_message, Severity};
use crate::config::AlertsConfig;
use crate::exchange::PositionSide;
use crate::logger::{self, LogTag};
use chrono::Local;
use serde::Deserialize;
use std::time::Duration;

const WEBHOOK_URL_ENV: &str = "DISCORD_WEBHOOK_URL";
const MAX_SEND_ATTEMPTS: u32 = 3;

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

/// Discord notifier for sending alert messages
pub struct DiscordNotifier {
    http: reqwest::Client,
    webhook_url: String,
    bot_name: String,
}

impl DiscordNotifier {
    /// Build a notifier from the environment
    ///
    /// Returns None (alerts disabled) when the config disables alerts or
    /// DISCORD_WEBHOOK_URL is not set.
    pub fn from_env(config: &AlertsConfig) -> Option<Self> {
        if !config.enabled {
            logger::info(LogTag::Alerts, "Alerts disabled in config");
            return None;
        }

        let webhook_url = match std::env::var(WEBHOOK_URL_ENV) {
            Ok(url) if !url.is_empty() => url,
            _ => {
                logger::warning(
                    LogTag::Alerts,
                    &format!("{} not set, alerts disabled", WEBHOOK_URL_ENV),
                );
                return None;
            }
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .ok()?;

        Some(Self {
            http,
            webhook_url,
            bot_name: config.bot_name.clone(),
        })
    }

    /// Send a plain message, prefixed with the bot name and timestamp
    pub async fn send_message(&self, message: &str) -> Result<(), String> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let formatted = clamp_message(&format!(
            "🤖 **{}** | {}\n{}",
            self.bot_name, timestamp, message
        ));

        let payload = serde_json::json!({
            "content": formatted,
            "username": self.bot_name,
        });

        let mut last_error = String::new();
        for attempt in 1..=MAX_SEND_ATTEMPTS {
            match self.http.post(&self.webhook_url).json(&payload).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        logger::debug(
                            LogTag::Alerts,
                            &format!("Delivered alert (length={})", formatted.len()),
                        );
                        return Ok(());
                    }

                    if status.as_u16() == 429 {
                        let wait = response
                            .json::<RateLimitBody>()
                            .await
                            .map(|b| b.retry_after)
                            .unwrap_or(1.0);
                        logger::warning(
                            LogTag::Alerts,
                            &format!("Discord rate limit, waiting {:.1}s", wait),
                        );
                        tokio::time::sleep(Duration::from_secs_f64(wait)).await;
                        continue;
                    }

                    last_error = format!("HTTP {}", status);
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            if attempt < MAX_SEND_ATTEMPTS {
                tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
            }
        }

        Err(format!(
            "Discord delivery failed after {} attempts: {}",
            MAX_SEND_ATTEMPTS, last_error
        ))
    }

    /// Best-effort send: failures are logged, never propagated
    pub async fn send_quiet(&self, message: &str) {
        if let Err(e) = self.send_message(message).await {
            logger::error(LogTag::Alerts, &e);
        }
    }

    /// Announce an opened position
    pub async fn notify_open(
        &self,
        symbol: &str,
        period: usize,
        side: PositionSide,
        amount: f64,
        price: f64,
    ) {
        self.send_quiet(&format!(
            "📈 OPEN {} | {} ({}d) | Size: {:.4} | Price: ${:.2}",
            side, symbol, period, amount, price
        ))
        .await;
    }

    /// Announce a closed position with its realized PnL
    pub async fn notify_close(
        &self,
        symbol: &str,
        period: usize,
        side: PositionSide,
        pnl: f64,
    ) {
        let pnl_emoji = if pnl >= 0.0 { "✅" } else { "🔻" };
        self.send_quiet(&format!(
            "📉 CLOSE {} | {} ({}d) | PNL: {} ${:.2}",
            side, symbol, period, pnl_emoji, pnl
        ))
        .await;
    }

    /// System alert with severity marker
    pub async fn notify_system(&self, severity: Severity, message: &str) {
        self.send_quiet(&format!(
            "{} **{}**\n{}",
            severity.emoji(),
            severity.as_str(),
            message
        ))
        .await;
    }

    /// Crash alert sent when a trading cycle fails
    pub async fn notify_crash(&self, error: &str) {
        self.send_quiet(&format!("🚨 BOT CRASHED: {}", error)).await;
    }
}
