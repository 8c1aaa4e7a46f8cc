//! Turtle strategy engine
//!
//! One cycle evaluates every (coin, Donchian period) sub-strategy
//! independently:
//! - capital: wallet balance × usage ratio, split per coin, scaled by
//!   target/actual 90-day volatility, split per period
//! - entry: last completed close breaks above the channel high (long) or
//!   below the channel low (short, unless the coin is long_only)
//! - exit: last completed close crosses the channel midline against the
//!   open position
//!
//! Signals come from COMPLETED candles only; orders execute at the current
//! market price (next-candle execution).

use crate::config::{CoinConfig, Config};
use crate::exchange::{BinanceClient, PositionSide};
use crate::logger::{self, LogTag};
use crate::notifications::DiscordNotifier;
use crate::ohlcv::{self, Candle, DonchianChannel};
use crate::positions::{self, position_key, Position};
use crate::trade_log::{self, TradeRecord};
use chrono::Utc;
use std::time::Duration;

/// Decision for one sub-strategy on one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    OpenLong,
    OpenShort,
    CloseLong,
    CloseShort,
    Hold,
}

/// Pure signal evaluation from channel state and the last completed close
pub fn evaluate_signal(
    channel: &DonchianChannel,
    last_close: f64,
    current: Option<PositionSide>,
    long_only: bool,
) -> Signal {
    match current {
        None => {
            if last_close > channel.high {
                Signal::OpenLong
            } else if last_close < channel.low && !long_only {
                Signal::OpenShort
            } else {
                Signal::Hold
            }
        }
        Some(PositionSide::Long) => {
            if last_close < channel.midline {
                Signal::CloseLong
            } else {
                Signal::Hold
            }
        }
        Some(PositionSide::Short) => {
            if last_close > channel.midline {
                Signal::CloseShort
            } else {
                Signal::Hold
            }
        }
    }
}

/// Realized PnL for a closed position
pub fn realized_pnl(side: PositionSide, entry_price: f64, exit_price: f64, amount: f64, leverage: u32) -> f64 {
    let delta = match side {
        PositionSide::Long => exit_price - entry_price,
        PositionSide::Short => entry_price - exit_price,
    };
    delta * amount * leverage as f64
}

/// Strategy engine bound to an exchange client for one cycle
pub struct StrategyEngine<'a> {
    client: &'a BinanceClient,
    notifier: Option<&'a DiscordNotifier>,
    config: &'a Config,
    dry_run: bool,
}

impl<'a> StrategyEngine<'a> {
    pub fn new(
        client: &'a BinanceClient,
        notifier: Option<&'a DiscordNotifier>,
        config: &'a Config,
        dry_run: bool,
    ) -> Self {
        Self {
            client,
            notifier,
            config,
            dry_run,
        }
    }

    /// Run one full trading cycle
    pub async fn run_cycle(&self) -> Result<(), String> {
        logger::info(
            LogTag::Strategy,
            &format!("Starting trading cycle at {}", Utc::now().format("%Y-%m-%d %H:%M:%S")),
        );

        let total_balance = self
            .client
            .get_total_wallet_balance()
            .await
            .map_err(|e| format!("Could not fetch account balance: {}", e))?;

        if total_balance <= 0.0 {
            return Err("Cannot proceed with zero balance".to_string());
        }

        let strategy = &self.config.strategy;
        let active_coins = self.config.active_coins();
        if active_coins.is_empty() {
            logger::warning(LogTag::Strategy, "No active coins configured");
            return Ok(());
        }

        let strategy_capital = total_balance * strategy.total_account_usage_ratio;
        let base_capital_per_coin = strategy_capital / active_coins.len() as f64;

        logger::info(
            LogTag::Strategy,
            &format!(
                "Total balance: ${:.2} | Strategy capital: ${:.2} | Base capital/coin: ${:.2}",
                total_balance, strategy_capital, base_capital_per_coin
            ),
        );

        for coin in &active_coins {
            if let Err(e) = self.run_coin(coin, base_capital_per_coin).await {
                // One misbehaving symbol must not starve the rest of the book
                logger::error(
                    LogTag::Strategy,
                    &format!("{}: coin cycle failed: {}", coin.symbol, e),
                );
            }
        }

        logger::info(LogTag::Strategy, "Trading cycle finished");
        Ok(())
    }

    /// Evaluate all periods for one coin
    async fn run_coin(&self, coin: &CoinConfig, base_capital: f64) -> Result<(), String> {
        let strategy = &self.config.strategy;

        self.reconcile_positions(coin).await;

        // Volatility sizing needs the window plus one close for the first return
        let history = self
            .client
            .get_klines(&coin.symbol, "1d", strategy.volatility_period + 2)
            .await
            .map_err(|e| e.to_string())?;
        let completed = ohlcv::completed(&history);
        let closes: Vec<f64> = completed.iter().map(|c| c.close).collect();

        let volatility = match ohlcv::window_volatility(&closes, strategy.volatility_period) {
            Some(v) if v > 0.0 => v,
            _ => {
                logger::warning(
                    LogTag::Strategy,
                    &format!("{}: not enough data for volatility, skipping", coin.symbol),
                );
                return Ok(());
            }
        };

        let adjustment = strategy.volatility_target / volatility;
        let adjusted_capital = base_capital * adjustment;
        let capital_per_period = adjusted_capital / strategy.donchian_periods.len() as f64;

        logger::info(
            LogTag::Strategy,
            &format!(
                "{} | {}d volatility: {:.2}% | Adj factor: {:.2} | Capital/period: ${:.2}",
                coin.symbol,
                strategy.volatility_period,
                volatility * 100.0,
                adjustment,
                capital_per_period
            ),
        );

        for &period in &strategy.donchian_periods {
            if let Err(e) = self
                .run_sub_strategy(coin, period, capital_per_period, completed)
                .await
            {
                logger::error(
                    LogTag::Strategy,
                    &format!("{}-{}d: {}", coin.symbol, period, e),
                );
            }
            tokio::time::sleep(Duration::from_millis(strategy.order_pause_ms)).await;
        }

        Ok(())
    }

    /// Compare the saved book against the exchange's view of this symbol
    ///
    /// A drift (manual intervention, liquidation, missed fill) is logged so
    /// the operator can repair logs/positions.json; the cycle still runs on
    /// the saved book, matching what was actually opened by this bot.
    async fn reconcile_positions(&self, coin: &CoinConfig) {
        let risk = match self.client.get_position_risk(&coin.symbol).await {
            Ok(entries) => entries,
            Err(e) => {
                logger::debug(
                    LogTag::Positions,
                    &format!("{}: position risk unavailable: {}", coin.symbol, e),
                );
                return;
            }
        };

        let book = positions::get_saved_positions();
        for side in [PositionSide::Long, PositionSide::Short] {
            let saved: f64 = book
                .0
                .iter()
                .filter(|(key, p)| {
                    p.side == side && key.starts_with(&format!("{}-", coin.symbol))
                })
                .map(|(_, p)| p.amount)
                .sum();
            let exchange: f64 = risk
                .iter()
                .filter(|r| r.position_side == side.as_str())
                .filter_map(|r| r.position_amt.parse::<f64>().ok())
                .map(f64::abs)
                .sum();

            if (saved - exchange).abs() > 1e-8 {
                logger::warning(
                    LogTag::Positions,
                    &format!(
                        "{} {} drift: book has {:.8}, exchange reports {:.8}",
                        coin.symbol, side, saved, exchange
                    ),
                );
            }
        }
    }

    /// Evaluate one (coin, period) sub-strategy and act on its signal
    async fn run_sub_strategy(
        &self,
        coin: &CoinConfig,
        period: usize,
        capital: f64,
        completed: &[Candle],
    ) -> Result<(), String> {
        if completed.len() < period + 1 {
            logger::debug(
                LogTag::Strategy,
                &format!("{}-{}d: insufficient candle history", coin.symbol, period),
            );
            return Ok(());
        }

        // Channel over the `period` candles BEFORE the signal candle: the
        // breakout compares the last completed close against the prior range
        let channel_slice = &completed[..completed.len() - 1];
        let channel = match ohlcv::donchian_channel(channel_slice, period) {
            Some(c) => c,
            None => return Ok(()),
        };
        let last_close = completed
            .last()
            .map(|c| c.close)
            .ok_or_else(|| "empty candle series".to_string())?;

        logger::debug(
            LogTag::Strategy,
            &format!(
                "{}-{}d | High: {:.4} | Low: {:.4} | Mid: {:.4} | Last close: {:.4}",
                coin.symbol, period, channel.high, channel.low, channel.midline, last_close
            ),
        );

        let key = position_key(&coin.symbol, period);
        let current = positions::get_saved_positions().get(&key).cloned();

        let signal = evaluate_signal(
            &channel,
            last_close,
            current.as_ref().map(|p| p.side),
            coin.long_only,
        );

        match signal {
            Signal::OpenLong => {
                logger::info(
                    LogTag::Strategy,
                    &format!(
                        "{}-{}d | LONG SIGNAL: {:.4} > {:.4}",
                        coin.symbol, period, last_close, channel.high
                    ),
                );
                self.open_position(coin, period, PositionSide::Long, capital).await
            }
            Signal::OpenShort => {
                logger::info(
                    LogTag::Strategy,
                    &format!(
                        "{}-{}d | SHORT SIGNAL: {:.4} < {:.4}",
                        coin.symbol, period, last_close, channel.low
                    ),
                );
                self.open_position(coin, period, PositionSide::Short, capital).await
            }
            Signal::CloseLong | Signal::CloseShort => {
                let position = current.ok_or_else(|| "close signal without position".to_string())?;
                logger::info(
                    LogTag::Strategy,
                    &format!(
                        "{}-{}d | {} EXIT: close {:.4} crossed midline {:.4}",
                        coin.symbol, period, position.side, last_close, channel.midline
                    ),
                );
                self.close_position(coin, period, &position).await
            }
            Signal::Hold => Ok(()),
        }
    }

    /// Open a market position sized from the allocated capital
    async fn open_position(
        &self,
        coin: &CoinConfig,
        period: usize,
        side: PositionSide,
        capital: f64,
    ) -> Result<(), String> {
        let leverage = match side {
            PositionSide::Long => coin.long_leverage,
            PositionSide::Short => coin.short_leverage,
        };

        if self.dry_run {
            logger::info(
                LogTag::Strategy,
                &format!(
                    "DRY RUN: would open {} {}-{}d with ${:.2} at {}x",
                    side, coin.symbol, period, capital, leverage
                ),
            );
            return Ok(());
        }

        if let Err(e) = self.client.set_leverage(&coin.symbol, leverage).await {
            logger::warning(
                LogTag::Exchange,
                &format!("Could not set leverage for {} to {}x: {}", coin.symbol, leverage, e),
            );
        }

        let price = self
            .client
            .get_price(&coin.symbol)
            .await
            .map_err(|e| format!("could not get current price: {}", e))?;

        let notional = capital * leverage as f64;
        let raw_qty = notional / price;

        let lot_rules = self
            .client
            .get_lot_rules(&coin.symbol)
            .await
            .map_err(|e| format!("could not fetch lot rules: {}", e))?;
        let quantity = match lot_rules.round_qty(raw_qty) {
            Some(q) => q,
            None => {
                logger::warning(
                    LogTag::Strategy,
                    &format!(
                        "{}-{}d: quantity {:.8} below minimum {:.8}, skipping entry",
                        coin.symbol, period, raw_qty, lot_rules.min_qty
                    ),
                );
                return Ok(());
            }
        };

        let fill = self
            .client
            .place_market_order(&coin.symbol, side.entry_order_side(), side, quantity)
            .await
            .map_err(|e| format!("failed to open {} position: {}", side, e))?;

        positions::update_saved_positions(|book| {
            book.insert(
                position_key(&coin.symbol, period),
                Position {
                    side,
                    amount: fill.amount,
                    entry_price: fill.avg_price,
                    leverage,
                    entry_time: Utc::now(),
                },
            );
        })
        .map_err(|e| format!("failed to persist position: {}", e))?;

        if let Err(e) = trade_log::append_trade(&TradeRecord {
            symbol: coin.symbol.clone(),
            period,
            action: "OPEN",
            side,
            amount: fill.amount,
            price: fill.avg_price,
            value: fill.cost,
            leverage,
            pnl: 0.0,
        }) {
            logger::error(LogTag::Strategy, &format!("CSV log write failed: {}", e));
        }

        if let Some(notifier) = self.notifier {
            notifier
                .notify_open(&coin.symbol, period, side, fill.amount, fill.avg_price)
                .await;
        }

        Ok(())
    }

    /// Close an open position at market and realize its PnL
    async fn close_position(
        &self,
        coin: &CoinConfig,
        period: usize,
        position: &Position,
    ) -> Result<(), String> {
        if self.dry_run {
            logger::info(
                LogTag::Strategy,
                &format!(
                    "DRY RUN: would close {} {}-{}d ({} units)",
                    position.side, coin.symbol, period, position.amount
                ),
            );
            return Ok(());
        }

        let fill = self
            .client
            .place_market_order(
                &coin.symbol,
                position.side.exit_order_side(),
                position.side,
                position.amount,
            )
            .await
            .map_err(|e| format!("failed to close {} position: {}", position.side, e))?;

        let pnl = realized_pnl(
            position.side,
            position.entry_price,
            fill.avg_price,
            position.amount,
            position.leverage,
        );

        positions::update_saved_positions(|book| {
            book.remove(&position_key(&coin.symbol, period));
        })
        .map_err(|e| format!("failed to persist position removal: {}", e))?;

        if let Err(e) = trade_log::append_trade(&TradeRecord {
            symbol: coin.symbol.clone(),
            period,
            action: "CLOSE",
            side: position.side,
            amount: fill.amount,
            price: fill.avg_price,
            value: fill.cost,
            leverage: position.leverage,
            pnl,
        }) {
            logger::error(LogTag::Strategy, &format!("CSV log write failed: {}", e));
        }

        if let Some(notifier) = self.notifier {
            notifier
                .notify_close(&coin.symbol, period, position.side, pnl)
                .await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> DonchianChannel {
        DonchianChannel {
            high: 110.0,
            low: 90.0,
            midline: 100.0,
        }
    }

    #[test]
    fn test_long_entry_on_breakout_above_high() {
        assert_eq!(
            evaluate_signal(&channel(), 111.0, None, false),
            Signal::OpenLong
        );
    }

    #[test]
    fn test_no_entry_inside_channel() {
        assert_eq!(
            evaluate_signal(&channel(), 105.0, None, false),
            Signal::Hold
        );
    }

    #[test]
    fn test_short_entry_on_breakdown_below_low() {
        assert_eq!(
            evaluate_signal(&channel(), 89.0, None, false),
            Signal::OpenShort
        );
    }

    #[test]
    fn test_long_only_suppresses_short_entry() {
        assert_eq!(
            evaluate_signal(&channel(), 89.0, None, true),
            Signal::Hold
        );
    }

    #[test]
    fn test_long_exit_below_midline() {
        assert_eq!(
            evaluate_signal(&channel(), 99.0, Some(PositionSide::Long), false),
            Signal::CloseLong
        );
        assert_eq!(
            evaluate_signal(&channel(), 101.0, Some(PositionSide::Long), false),
            Signal::Hold
        );
    }

    #[test]
    fn test_short_exit_above_midline() {
        assert_eq!(
            evaluate_signal(&channel(), 101.0, Some(PositionSide::Short), false),
            Signal::CloseShort
        );
        assert_eq!(
            evaluate_signal(&channel(), 99.0, Some(PositionSide::Short), false),
            Signal::Hold
        );
    }

    #[test]
    fn test_breakout_while_positioned_does_not_reenter() {
        // A long already open plus a fresh breakout above the high holds
        assert_eq!(
            evaluate_signal(&channel(), 111.0, Some(PositionSide::Long), false),
            Signal::Hold
        );
    }

    #[test]
    fn test_realized_pnl_signs() {
        assert_eq!(realized_pnl(PositionSide::Long, 100.0, 110.0, 2.0, 3), 60.0);
        assert_eq!(realized_pnl(PositionSide::Long, 100.0, 90.0, 2.0, 3), -60.0);
        assert_eq!(realized_pnl(PositionSide::Short, 100.0, 90.0, 2.0, 3), 60.0);
        assert_eq!(realized_pnl(PositionSide::Short, 100.0, 110.0, 2.0, 3), -60.0);
    }
}
