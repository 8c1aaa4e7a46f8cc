//! Sends a test message through the configured Discord webhook
//!
//! Verifies the .env webhook and the alert formatting without touching the
//! exchange.

use turtlebot::config;
use turtlebot::logger::{self, LogTag};
use turtlebot::notifications::{DiscordNotifier, Severity};
use turtlebot::{arguments, paths};

#[tokio::main]
async fn main() {
    arguments::set_cmd_args(std::env::args().skip(1).collect());
    dotenv::dotenv().ok();

    if let Err(e) = paths::ensure_all_directories() {
        eprintln!("Failed to create working directories: {}", e);
        std::process::exit(1);
    }
    logger::init();

    let config = match config::load_config() {
        Ok(()) => config::get_config(),
        Err(e) => {
            logger::warning(
                LogTag::Config,
                &format!("Config not loaded ({}), using defaults", e),
            );
            config::get_config()
        }
    };

    let notifier = match DiscordNotifier::from_env(&config.alerts) {
        Some(n) => n,
        None => {
            logger::error(
                LogTag::Alerts,
                "Alerts disabled or DISCORD_WEBHOOK_URL not set",
            );
            logger::flush();
            std::process::exit(1);
        }
    };

    let message = arguments::get_arg_value("--message")
        .unwrap_or_else(|| "Webhook test: alerts are working".to_string());

    logger::info(LogTag::Alerts, "Sending test alert");
    notifier.notify_system(Severity::Info, &message).await;
    logger::info(LogTag::Alerts, "Done");
    logger::flush();
}
