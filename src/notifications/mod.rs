//! Alert delivery for turtlebot
//!
//! Discord webhook notifications for fills, cycle summaries and crashes.
//! Alerting is best-effort: a failed delivery is logged and never aborts a
//! trading cycle.

pub mod discord;
pub mod types;

pub use discord::DiscordNotifier;
pub use types::Severity;
