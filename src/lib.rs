pub mod arguments;
pub mod backtest;
pub mod config;
pub mod errors;
pub mod exchange;
pub mod logger;
pub mod notifications;
pub mod ohlcv;
pub mod paths;
pub mod positions;
pub mod process_lock;
pub mod run;
pub mod scheduler;
pub mod strategy;
pub mod trade_log;
