//! Historical backtester for the Turtle strategy
//!
//! Replays daily candles through the same Donchian entry/exit rules the live
//! engine uses, with volatility-scaled position sizing and per-trade fees.
//! Signals are taken from day N's close and filled at day N+1's open, which
//! mirrors the live bot acting after the daily candle completes.

use crate::exchange::PositionSide;
use crate::ohlcv::{self, Candle};
use crate::strategy::{evaluate_signal, realized_pnl, Signal};
use std::collections::HashMap;

/// Parameters for one backtest run
#[derive(Debug, Clone)]
pub struct BacktestSettings {
    pub initial_capital: f64,
    /// Taker fee charged on each fill's notional
    pub fee_rate: f64,
    pub donchian_periods: Vec<usize>,
    pub volatility_period: usize,
    pub volatility_target: f64,
    pub usage_ratio: f64,
    pub long_only: bool,
    pub long_leverage: u32,
    pub short_leverage: u32,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            fee_rate: 0.0005,
            donchian_periods: vec![5, 10, 20, 30, 60],
            volatility_period: 90,
            volatility_target: 0.25,
            usage_ratio: 0.5,
            long_only: false,
            long_leverage: 1,
            short_leverage: 1,
        }
    }
}

/// One simulated fill
#[derive(Debug, Clone)]
pub struct BacktestTrade {
    pub symbol: String,
    pub period: usize,
    /// "OPEN" or "CLOSE"
    pub action: &'static str,
    pub side: PositionSide,
    /// Candle open time of the fill, epoch millis
    pub time: i64,
    pub amount: f64,
    pub price: f64,
    pub pnl: f64,
}

/// One equity-curve sample, taken after each simulated day
#[derive(Debug, Clone)]
pub struct EquityPoint {
    pub time: i64,
    pub equity: f64,
}

#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub initial_capital: f64,
    pub final_equity: f64,
    pub total_return_pct: f64,
    pub max_drawdown_pct: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub win_rate_pct: f64,
    pub trades: Vec<BacktestTrade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl BacktestReport {
    /// Summary metrics block, persisted next to the CSV outputs
    pub fn summary_text(&self) -> String {
        format!(
            "Initial capital: ${:.2}\n\
             Final equity: ${:.2}\n\
             Total return: {:.2}%\n\
             Max drawdown: {:.2}%\n\
             Total trades: {}\n\
             Winning trades: {}\n\
             Win rate: {:.1}%\n",
            self.initial_capital,
            self.final_equity,
            self.total_return_pct,
            self.max_drawdown_pct,
            self.total_trades,
            self.winning_trades,
            self.win_rate_pct
        )
    }
}

#[derive(Debug, Clone)]
struct SimPosition {
    side: PositionSide,
    amount: f64,
    entry_price: f64,
    leverage: u32,
}

/// Run the strategy over historical candles for one or more symbols
///
/// All symbols must share a common daily grid; days where a symbol has no
/// candle are skipped for that symbol.
pub fn run_backtest(
    candles_by_symbol: &HashMap<String, Vec<Candle>>,
    settings: &BacktestSettings,
) -> Result<BacktestReport, String> {
    if candles_by_symbol.is_empty() {
        return Err("no candle data supplied".to_string());
    }
    if settings.donchian_periods.is_empty() {
        return Err("no Donchian periods configured".to_string());
    }
    let max_period = *settings
        .donchian_periods
        .iter()
        .max()
        .ok_or_else(|| "no Donchian periods configured".to_string())?;
    // Warmup needs the longest channel plus the volatility window
    let warmup = max_period.max(settings.volatility_period + 1) + 1;

    let mut symbols: Vec<&String> = candles_by_symbol.keys().collect();
    symbols.sort();

    let total_days = candles_by_symbol
        .values()
        .map(|c| c.len())
        .max()
        .unwrap_or(0);
    if total_days <= warmup + 1 {
        return Err(format!(
            "insufficient history: {} days, need more than {}",
            total_days,
            warmup + 1
        ));
    }

    let mut cash = settings.initial_capital;
    let mut open_positions: HashMap<String, SimPosition> = HashMap::new();
    let mut trades: Vec<BacktestTrade> = Vec::new();
    let mut equity_curve: Vec<EquityPoint> = Vec::new();
    let mut peak_equity = settings.initial_capital;
    let mut max_drawdown_pct = 0.0f64;
    let mut winning_trades = 0usize;

    // Day index `i` carries the signal; fills happen at day i+1's open
    for i in warmup..total_days - 1 {
        for symbol in &symbols {
            let candles = &candles_by_symbol[*symbol];
            if candles.len() <= i + 1 {
                continue;
            }

            let closes: Vec<f64> = candles[..=i].iter().map(|c| c.close).collect();
            let volatility =
                match ohlcv::window_volatility(&closes, settings.volatility_period) {
                    Some(v) if v > 0.0 => v,
                    _ => continue,
                };

            let strategy_capital = cash * settings.usage_ratio;
            let base_capital = strategy_capital / symbols.len() as f64;
            let adjusted = base_capital * (settings.volatility_target / volatility);
            let capital_per_period = adjusted / settings.donchian_periods.len() as f64;

            let signal_close = candles[i].close;
            let fill_price = candles[i + 1].open;
            let fill_time = candles[i + 1].open_time;

            for &period in &settings.donchian_periods {
                if i < period {
                    continue;
                }
                let channel = match ohlcv::donchian_channel(&candles[..i], period) {
                    Some(c) => c,
                    None => continue,
                };

                let key = format!("{}-{}", symbol, period);
                let current_side = open_positions.get(&key).map(|p| p.side);
                let signal =
                    evaluate_signal(&channel, signal_close, current_side, settings.long_only);

                match signal {
                    Signal::OpenLong | Signal::OpenShort => {
                        let (side, leverage) = if signal == Signal::OpenLong {
                            (PositionSide::Long, settings.long_leverage)
                        } else {
                            (PositionSide::Short, settings.short_leverage)
                        };
                        let amount = capital_per_period * leverage as f64 / fill_price;
                        if amount <= 0.0 {
                            continue;
                        }
                        cash -= amount * fill_price * settings.fee_rate;
                        open_positions.insert(
                            key,
                            SimPosition {
                                side,
                                amount,
                                entry_price: fill_price,
                                leverage,
                            },
                        );
                        trades.push(BacktestTrade {
                            symbol: (*symbol).clone(),
                            period,
                            action: "OPEN",
                            side,
                            time: fill_time,
                            amount,
                            price: fill_price,
                            pnl: 0.0,
                        });
                    }
                    Signal::CloseLong | Signal::CloseShort => {
                        let position = match open_positions.remove(&key) {
                            Some(p) => p,
                            None => continue,
                        };
                        let gross = realized_pnl(
                            position.side,
                            position.entry_price,
                            fill_price,
                            position.amount,
                            position.leverage,
                        );
                        let fee = position.amount * fill_price * settings.fee_rate;
                        let pnl = gross - fee;
                        cash += pnl;
                        if pnl > 0.0 {
                            winning_trades += 1;
                        }
                        trades.push(BacktestTrade {
                            symbol: (*symbol).clone(),
                            period,
                            action: "CLOSE",
                            side: position.side,
                            time: fill_time,
                            amount: position.amount,
                            price: fill_price,
                            pnl,
                        });
                    }
                    Signal::Hold => {}
                }
            }

        }

        // Mark EVERY open position at its symbol's most recent price; a
        // symbol whose series has run out still contributes its unrealized
        // PnL at the last price it traded
        let mut marked_equity = cash;
        for (key, position) in &open_positions {
            let symbol = key.rsplit_once('-').map(|(s, _)| s).unwrap_or(key);
            let candles = match candles_by_symbol.get(symbol) {
                Some(c) if !c.is_empty() => c,
                _ => continue,
            };
            let mark_price = candles[(i + 1).min(candles.len() - 1)].open;
            marked_equity += realized_pnl(
                position.side,
                position.entry_price,
                mark_price,
                position.amount,
                position.leverage,
            );
        }

        let sample_time = candles_by_symbol[symbols[0]]
            .get(i + 1)
            .map(|c| c.open_time)
            .unwrap_or(0);
        equity_curve.push(EquityPoint {
            time: sample_time,
            equity: marked_equity,
        });

        if marked_equity > peak_equity {
            peak_equity = marked_equity;
        } else if peak_equity > 0.0 {
            let drawdown = (peak_equity - marked_equity) / peak_equity * 100.0;
            if drawdown > max_drawdown_pct {
                max_drawdown_pct = drawdown;
            }
        }
    }

    // Liquidate whatever is still open at the final close
    for (key, position) in open_positions.drain() {
        let symbol = key.rsplit_once('-').map(|(s, _)| s).unwrap_or(&key);
        let candles = match candles_by_symbol.get(symbol) {
            Some(c) if !c.is_empty() => c,
            _ => continue,
        };
        let last = &candles[candles.len() - 1];
        let gross = realized_pnl(
            position.side,
            position.entry_price,
            last.close,
            position.amount,
            position.leverage,
        );
        let fee = position.amount * last.close * settings.fee_rate;
        let pnl = gross - fee;
        cash += pnl;
        if pnl > 0.0 {
            winning_trades += 1;
        }
        let period: usize = key
            .rsplit_once('-')
            .and_then(|(_, p)| p.parse().ok())
            .unwrap_or(0);
        trades.push(BacktestTrade {
            symbol: symbol.to_string(),
            period,
            action: "CLOSE",
            side: position.side,
            time: last.open_time,
            amount: position.amount,
            price: last.close,
            pnl,
        });
    }

    let closed_trades = trades.iter().filter(|t| t.action == "CLOSE").count();
    let final_equity = cash;
    let total_return_pct =
        (final_equity - settings.initial_capital) / settings.initial_capital * 100.0;
    let win_rate_pct = if closed_trades > 0 {
        winning_trades as f64 / closed_trades as f64 * 100.0
    } else {
        0.0
    };

    Ok(BacktestReport {
        initial_capital: settings.initial_capital,
        final_equity,
        total_return_pct,
        max_drawdown_pct,
        total_trades: trades.len(),
        winning_trades,
        win_rate_pct,
        trades,
        equity_curve,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_MS: i64 = 86_400_000;

    fn candle(i: usize, price: f64) -> Candle {
        Candle {
            open_time: i as i64 * DAY_MS,
            open: price,
            high: price * 1.01,
            low: price * 0.99,
            close: price,
            volume: 1000.0,
        }
    }

    /// Sideways noise followed by a strong sustained uptrend
    fn trending_series(days: usize) -> Vec<Candle> {
        (0..days)
            .map(|i| {
                let price = if i < 120 {
                    // Mild oscillation around 100 so volatility is non-zero
                    100.0 + ((i % 7) as f64 - 3.0) * 0.8
                } else {
                    100.0 + (i - 120) as f64 * 2.0
                };
                candle(i, price)
            })
            .collect()
    }

    fn settings() -> BacktestSettings {
        BacktestSettings {
            donchian_periods: vec![20],
            ..BacktestSettings::default()
        }
    }

    #[test]
    fn test_uptrend_produces_long_trades_and_profit() {
        let mut data = HashMap::new();
        data.insert("BTCUSDT".to_string(), trending_series(250));

        let report = run_backtest(&data, &settings()).unwrap();

        assert!(report.total_trades > 0);
        assert!(report
            .trades
            .iter()
            .any(|t| t.action == "OPEN" && t.side == PositionSide::Long));
        assert!(report.final_equity > report.initial_capital);
        assert!(report.total_return_pct > 0.0);
    }

    #[test]
    fn test_long_only_flat_market_trades_rarely() {
        let mut data = HashMap::new();
        // Pure oscillation, never a sustained 20-day breakout
        let flat: Vec<Candle> = (0..250)
            .map(|i| candle(i, 100.0 + ((i % 5) as f64 - 2.0) * 0.3))
            .collect();
        data.insert("BTCUSDT".to_string(), flat);

        let mut cfg = settings();
        cfg.long_only = true;
        let report = run_backtest(&data, &cfg).unwrap();

        assert!(report
            .trades
            .iter()
            .all(|t| t.side == PositionSide::Long));
    }

    #[test]
    fn test_insufficient_history_is_rejected() {
        let mut data = HashMap::new();
        data.insert("BTCUSDT".to_string(), trending_series(30));

        let err = run_backtest(&data, &settings()).unwrap_err();
        assert!(err.contains("insufficient history"));
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let data = HashMap::new();
        assert!(run_backtest(&data, &settings()).is_err());
    }

    #[test]
    fn test_open_positions_liquidated_at_end() {
        let mut data = HashMap::new();
        // Trend continues to the end so the long stays open until liquidation
        data.insert("BTCUSDT".to_string(), trending_series(250));

        let report = run_backtest(&data, &settings()).unwrap();
        let opens = report.trades.iter().filter(|t| t.action == "OPEN").count();
        let closes = report.trades.iter().filter(|t| t.action == "CLOSE").count();
        assert_eq!(opens, closes);
    }

    #[test]
    fn test_open_position_marked_after_series_ends() {
        // BTC oscillates and never trades; ETH trends, opens a long, then
        // its candle series ends 50 days before BTC's. The open ETH position
        // must keep contributing its unrealized PnL to the equity samples.
        let mut data = HashMap::new();
        let flat: Vec<Candle> = (0..250)
            .map(|i| candle(i, 100.0 + ((i % 5) as f64 - 2.0) * 0.3))
            .collect();
        data.insert("BTCUSDT".to_string(), flat);
        data.insert("ETHUSDT".to_string(), trending_series(200));

        let report = run_backtest(&data, &settings()).unwrap();

        assert!(report
            .trades
            .iter()
            .any(|t| t.symbol == "ETHUSDT" && t.action == "OPEN"));
        let last = report.equity_curve.last().unwrap();
        assert!(last.equity > report.initial_capital);
    }

    #[test]
    fn test_summary_text_reports_metrics() {
        let mut data = HashMap::new();
        data.insert("BTCUSDT".to_string(), trending_series(250));

        let report = run_backtest(&data, &settings()).unwrap();
        let summary = report.summary_text();

        assert!(summary.contains("Initial capital: $10000.00"));
        assert!(summary.contains(&format!("Total trades: {}", report.total_trades)));
        assert!(summary.contains("Total return:"));
        assert!(summary.contains("Max drawdown:"));
        assert!(summary.contains("Win rate:"));
    }

    #[test]
    fn test_equity_curve_is_sampled() {
        let mut data = HashMap::new();
        data.insert("BTCUSDT".to_string(), trending_series(250));

        let report = run_backtest(&data, &settings()).unwrap();
        assert!(!report.equity_curve.is_empty());
        assert!(report.equity_curve.windows(2).all(|w| w[0].time < w[1].time));
    }
}
