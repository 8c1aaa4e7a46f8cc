//! Structured error types for turtlebot
//!
//! The run/orchestration layer reports plain `Result<(), String>`; below it,
//! the exchange client uses these typed errors so callers can distinguish an
//! API rejection from a transport failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Binance rejected the request with a structured error body
    #[error("Binance API error {code}: {msg}")]
    Api { code: i64, msg: String },

    #[error("Unexpected response: {0}")]
    Parse(String),

    #[error("Missing credentials: {0} not set in environment")]
    Credentials(&'static str),

    /// All retries exhausted for a transient failure
    #[error("Request failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl ExchangeError {
    /// Binance error code -4059: "No need to change position side" - hedge
    /// mode is already enabled, not an actual failure
    pub fn is_position_side_noop(&self) -> bool {
        matches!(self, ExchangeError::Api { code: -4059, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_side_noop_detection() {
        let noop = ExchangeError::Api {
            code: -4059,
            msg: "No need to change position side.".to_string(),
        };
        let other = ExchangeError::Api {
            code: -2019,
            msg: "Margin is insufficient.".to_string(),
        };

        assert!(noop.is_position_side_noop());
        assert!(!other.is_position_side_noop());
    }
}
