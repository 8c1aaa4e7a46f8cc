//! Configuration system for turtlebot
//!
//! Structures are declared once with embedded defaults via the
//! `config_struct!` macro, persisted as TOML at the project root and held in
//! a global `OnceCell<RwLock<Config>>` for thread-safe access.

pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::{AlertsConfig, CoinConfig, Config, ExchangeConfig, SchedulerConfig, StrategyConfig};
pub use utils::{get_config, load_config, load_config_from_path, CONFIG};
