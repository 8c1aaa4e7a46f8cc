use crate::errors::ExchangeError;
use crate::ohlcv::Candle;
use serde::{Deserialize, Serialize};

/// Hedge-mode position side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    #[serde(rename = "LONG")]
    Long,
    #[serde(rename = "SHORT")]
    Short,
}

impl PositionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "LONG",
            PositionSide::Short => "SHORT",
        }
    }

    /// Order side that OPENS a position on this side
    pub fn entry_order_side(&self) -> OrderSide {
        match self {
            PositionSide::Long => OrderSide::Buy,
            PositionSide::Short => OrderSide::Sell,
        }
    }

    /// Order side that CLOSES a position on this side
    pub fn exit_order_side(&self) -> OrderSide {
        match self {
            PositionSide::Long => OrderSide::Sell,
            PositionSide::Short => OrderSide::Buy,
        }
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

/// Executed market order, normalized from the order endpoint response
#[derive(Debug, Clone)]
pub struct OrderFill {
    pub symbol: String,
    pub amount: f64,
    pub avg_price: f64,
    /// Notional value of the fill (quote currency)
    pub cost: f64,
}

/// Error body Binance returns on rejected requests
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    pub msg: String,
}

/// Response of POST /fapi/v1/order (newOrderRespType=RESULT)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub symbol: String,
    pub avg_price: String,
    pub executed_qty: String,
    pub cum_quote: String,
    pub status: String,
}

/// Response of GET /fapi/v2/account (fields we use)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub total_wallet_balance: String,
}

/// One entry of GET /fapi/v2/positionRisk (hedge mode returns one row per
/// position side)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRisk {
    pub symbol: String,
    pub position_amt: String,
    pub entry_price: String,
    pub position_side: String,
}

/// Response of GET /fapi/v1/ticker/price
#[derive(Debug, Deserialize)]
pub struct TickerPriceResponse {
    pub symbol: String,
    pub price: String,
}

/// Symbol filters from GET /fapi/v1/exchangeInfo (LOT_SIZE subset)
#[derive(Debug, Deserialize)]
pub struct ExchangeInfoResponse {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub filters: Vec<SymbolFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "LOT_SIZE")]
    LotSize {
        #[serde(rename = "minQty")]
        min_qty: String,
        #[serde(rename = "stepSize")]
        step_size: String,
    },
    #[serde(other)]
    Other,
}

/// Lot constraints for order quantity rounding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LotRules {
    pub min_qty: f64,
    pub step_size: f64,
}

impl LotRules {
    /// Round a quantity DOWN to the step grid; None when below the minimum
    pub fn round_qty(&self, qty: f64) -> Option<f64> {
        if self.step_size <= 0.0 {
            return (qty >= self.min_qty).then_some(qty);
        }
        let steps = (qty / self.step_size).floor();
        let rounded = steps * self.step_size;
        (rounded >= self.min_qty && rounded > 0.0).then_some(rounded)
    }
}

/// Parse a numeric string field from a Binance response
pub fn parse_f64(value: &str, field: &str) -> Result<f64, ExchangeError> {
    value
        .parse::<f64>()
        .map_err(|_| ExchangeError::Parse(format!("non-numeric {}: '{}'", field, value)))
}

/// Convert a raw klines row into a Candle
///
/// Rows are heterogenous JSON arrays: [openTime, open, high, low, close,
/// volume, closeTime, ...] with prices as strings.
pub fn candle_from_kline_row(row: &[serde_json::Value]) -> Result<Candle, ExchangeError> {
    if row.len() < 6 {
        return Err(ExchangeError::Parse(format!(
            "kline row has {} fields, expected at least 6",
            row.len()
        )));
    }

    let open_time = row[0]
        .as_i64()
        .ok_or_else(|| ExchangeError::Parse("kline open time is not an integer".to_string()))?;

    let field = |idx: usize, name: &str| -> Result<f64, ExchangeError> {
        let s = row[idx]
            .as_str()
            .ok_or_else(|| ExchangeError::Parse(format!("kline {} is not a string", name)))?;
        parse_f64(s, name)
    };

    Ok(Candle {
        open_time,
        open: field(1, "open")?,
        high: field(2, "high")?,
        low: field(3, "low")?,
        close: field(4, "close")?,
        volume: field(5, "volume")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_position_side_order_mapping() {
        assert_eq!(PositionSide::Long.entry_order_side(), OrderSide::Buy);
        assert_eq!(PositionSide::Long.exit_order_side(), OrderSide::Sell);
        assert_eq!(PositionSide::Short.entry_order_side(), OrderSide::Sell);
        assert_eq!(PositionSide::Short.exit_order_side(), OrderSide::Buy);
    }

    #[test]
    fn test_lot_rules_rounding() {
        let rules = LotRules {
            min_qty: 0.001,
            step_size: 0.001,
        };

        let rounded = rules.round_qty(0.0527).unwrap();
        assert!((rounded - 0.052).abs() < 1e-12);
        assert_eq!(rules.round_qty(0.001), Some(0.001));
        assert_eq!(rules.round_qty(0.0004), None);
    }

    #[test]
    fn test_candle_from_kline_row() {
        let row = vec![
            json!(1700000000000i64),
            json!("35000.10"),
            json!("35500.00"),
            json!("34800.00"),
            json!("35250.50"),
            json!("1234.5"),
            json!(1700086399999i64),
        ];

        let candle = candle_from_kline_row(&row).unwrap();
        assert_eq!(candle.open_time, 1700000000000);
        assert_eq!(candle.open, 35000.10);
        assert_eq!(candle.close, 35250.50);
    }

    #[test]
    fn test_candle_from_short_row_fails() {
        let row = vec![json!(1700000000000i64), json!("1.0")];
        assert!(candle_from_kline_row(&row).is_err());
    }

    #[test]
    fn test_symbol_filter_deserialization() {
        let raw = r#"{
            "symbols": [{
                "symbol": "BTCUSDT",
                "filters": [
                    {"filterType": "PRICE_FILTER", "minPrice": "0.10"},
                    {"filterType": "LOT_SIZE", "minQty": "0.001", "stepSize": "0.001", "maxQty": "1000"}
                ]
            }]
        }"#;

        let info: ExchangeInfoResponse = serde_json::from_str(raw).unwrap();
        let lot = info.symbols[0]
            .filters
            .iter()
            .find_map(|f| match f {
                SymbolFilter::LotSize { min_qty, step_size } => {
                    Some((min_qty.clone(), step_size.clone()))
                }
                SymbolFilter::Other => None,
            })
            .unwrap();
        assert_eq!(lot.0, "0.001");
        assert_eq!(lot.1, "0.001");
    }
}
