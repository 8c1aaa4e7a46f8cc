//! CSV trading log
//!
//! Every fill is appended to `logs/trading_log.csv`. The header row is
//! written once when the file is created or empty; rows accumulate across
//! scheduled runs.

use crate::exchange::PositionSide;
use crate::paths;
use chrono::Local;
use std::path::Path;

const HEADER: [&str; 10] = [
    "Timestamp", "Symbol", "Period", "Action", "Side", "Amount", "Price", "Value", "Leverage",
    "PNL",
];

/// One row of the trading log
#[derive(Debug, Clone)]
pub struct TradeRecord {
    pub symbol: String,
    pub period: usize,
    /// "OPEN" or "CLOSE"
    pub action: &'static str,
    pub side: PositionSide,
    pub amount: f64,
    pub price: f64,
    pub value: f64,
    pub leverage: u32,
    /// Realized PnL; zero for entries
    pub pnl: f64,
}

/// Append a record to the default trading log
pub fn append_trade(record: &TradeRecord) -> anyhow::Result<()> {
    append_trade_to(&paths::get_trade_log_path(), record)
}

/// Append a record to a specific CSV file (used by the backtester and tests)
pub fn append_trade_to(path: &Path, record: &TradeRecord) -> anyhow::Result<()> {
    let needs_header = !path.exists()
        || std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if needs_header {
        writer.write_record(HEADER)?;
    }

    writer.write_record(&[
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        record.symbol.clone(),
        record.period.to_string(),
        record.action.to_string(),
        record.side.as_str().to_string(),
        format!("{:.8}", record.amount),
        format!("{:.4}", record.price),
        format!("{:.2}", record.value),
        record.leverage.to_string(),
        format!("{:.2}", record.pnl),
    ])?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> TradeRecord {
        TradeRecord {
            symbol: "BTCUSDT".to_string(),
            period: 20,
            action: "OPEN",
            side: PositionSide::Long,
            amount: 0.052,
            price: 35000.0,
            value: 1820.0,
            leverage: 2,
            pnl: 0.0,
        }
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trading_log.csv");

        append_trade_to(&path, &sample_record()).unwrap();
        append_trade_to(&path, &sample_record()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Timestamp,Symbol,Period,Action"));
        assert!(lines[1].contains("BTCUSDT"));
        assert!(lines[1].contains("LONG"));
    }

    #[test]
    fn test_row_formatting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trading_log.csv");

        let mut record = sample_record();
        record.action = "CLOSE";
        record.pnl = -12.345;
        append_trade_to(&path, &record).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("CLOSE"));
        assert!(contents.contains("0.05200000"));
        assert!(contents.contains("35000.0000"));
        assert!(contents.contains("-12.35"));
    }
}
