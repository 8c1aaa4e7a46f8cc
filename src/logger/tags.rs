//! Log tags identifying the module a message originates from
//!
//! Each tag maps to a --debug-<key> command-line flag and a fixed-width
//! colored label in console output.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Exchange,
    Strategy,
    Positions,
    Alerts,
    Scheduler,
    Backtest,
}

impl LogTag {
    /// Key used for --debug-<key> flag matching
    pub fn to_debug_key(&self) -> String {
        self.to_plain_string().to_lowercase()
    }

    /// Plain uppercase label, used in file output (no ANSI codes)
    pub fn to_plain_string(&self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Config => "CONFIG",
            LogTag::Exchange => "EXCHANGE",
            LogTag::Strategy => "STRATEGY",
            LogTag::Positions => "POSITIONS",
            LogTag::Alerts => "ALERTS",
            LogTag::Scheduler => "SCHEDULER",
            LogTag::Backtest => "BACKTEST",
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_key_is_lowercase_label() {
        assert_eq!(LogTag::Exchange.to_debug_key(), "exchange");
        assert_eq!(LogTag::Scheduler.to_debug_key(), "scheduler");
    }
}
