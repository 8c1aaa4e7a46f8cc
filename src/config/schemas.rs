//! Configuration schemas - all config structures defined once with defaults
//!
//! Defaults reproduce the live strategy settings: 50% of the account for the
//! strategy, Donchian periods 5/10/20/30/60 on daily candles, 90-day
//! volatility window with a 25% target.

use crate::config_struct;

// ============================================================================
// STRATEGY CONFIGURATION
// ============================================================================

config_struct! {
    /// Turtle strategy parameters
    pub struct StrategyConfig {
        /// Fraction of the total wallet balance the strategy may deploy
        total_account_usage_ratio: f64 = 0.5,

        /// Donchian channel lookbacks (days); each is an independent
        /// sub-strategy per coin
        donchian_periods: Vec<usize> = vec![5, 10, 20, 30, 60],

        /// Trailing window (days) for realized volatility
        volatility_period: usize = 90,

        /// Target volatility used to scale per-coin capital
        volatility_target: f64 = 0.25,

        /// Pause between per-period API calls (rate limiting)
        order_pause_ms: u64 = 1000,
    }
}

// ============================================================================
// COIN ALLOCATION
// ============================================================================

config_struct! {
    /// Per-coin allocation settings
    pub struct CoinConfig {
        /// Binance futures symbol, e.g. "BTCUSDT"
        symbol: String = String::new(),

        /// Whether this coin participates in the current cycle
        active: bool = true,

        /// Suppress short entries for this coin
        long_only: bool = false,

        long_leverage: u32 = 1,
        short_leverage: u32 = 1,
    }
}

impl CoinConfig {
    pub fn named(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            ..Default::default()
        }
    }
}

// ============================================================================
// EXCHANGE CONFIGURATION
// ============================================================================

config_struct! {
    /// Binance USDT-M futures REST endpoint configuration
    pub struct ExchangeConfig {
        base_url: String = "https://fapi.binance.com".to_string(),

        /// recvWindow for signed requests (ms)
        recv_window_ms: u64 = 10000,

        /// Per-request timeout (seconds)
        timeout_secs: u64 = 10,

        /// Transient failures are retried this many times with backoff
        max_retries: u32 = 3,
    }
}

// ============================================================================
// ALERTS CONFIGURATION
// ============================================================================

config_struct! {
    /// Discord alert configuration (webhook URL comes from the environment)
    pub struct AlertsConfig {
        enabled: bool = true,

        /// Display name prefixed to every alert
        bot_name: String = "Turtle Strategy Bot".to_string(),
    }
}

// ============================================================================
// SCHEDULER CONFIGURATION
// ============================================================================

config_struct! {
    /// Internal scheduler configuration (--schedule mode)
    pub struct SchedulerConfig {
        /// Cron expression; minute and hour fields support lists and `*`,
        /// the remaining fields must be `*`
        cron: String = "0 9,21 * * *".to_string(),
    }
}

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Root configuration persisted as config.toml at the project root
    pub struct Config {
        strategy: StrategyConfig = StrategyConfig::default(),
        coins: Vec<CoinConfig> = default_coins(),
        exchange: ExchangeConfig = ExchangeConfig::default(),
        alerts: AlertsConfig = AlertsConfig::default(),
        scheduler: SchedulerConfig = SchedulerConfig::default(),
    }
}

fn default_coins() -> Vec<CoinConfig> {
    vec![CoinConfig::named("BTCUSDT"), CoinConfig::named("ETHUSDT")]
}

impl Config {
    /// Coins that participate in the current cycle
    pub fn active_coins(&self) -> Vec<&CoinConfig> {
        self.coins.iter().filter(|c| c.active).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.strategy.donchian_periods, vec![5, 10, 20, 30, 60]);
        assert_eq!(config.strategy.volatility_period, 90);
        assert_eq!(config.strategy.total_account_usage_ratio, 0.5);
        assert_eq!(config.scheduler.cron, "0 9,21 * * *");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[strategy]"));
        assert!(toml_str.contains("[exchange]"));
        assert!(toml_str.contains("[[coins]]"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [strategy]
            volatility_target = 0.3
            "#,
        )
        .unwrap();

        assert_eq!(config.strategy.volatility_target, 0.3);
        assert_eq!(config.strategy.volatility_period, 90);
        assert_eq!(config.exchange.base_url, "https://fapi.binance.com");
    }

    #[test]
    fn test_active_coins_filter() {
        let mut config = Config::default();
        config.coins[1].active = false;

        let active = config.active_coins();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].symbol, "BTCUSDT");
    }
}
