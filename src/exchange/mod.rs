//! Binance USDT-M futures REST client
//!
//! Signed requests (HMAC-SHA256, timestamp + recvWindow) for account and
//! order endpoints; unsigned requests for market data. Transient failures
//! retry with escalating backoff.

mod client;
pub mod types;

pub use client::BinanceClient;
pub use types::{OrderFill, OrderSide, PositionRisk, PositionSide};
