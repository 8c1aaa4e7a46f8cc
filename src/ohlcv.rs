use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// OHLCV DATA AND INDICATORS
// ═══════════════════════════════════════════════════════════════════════════════
//
// Candle series come from the Binance klines endpoint. All signal math runs
// on COMPLETED candles only: the exchange returns the current (still forming)
// candle as the last element, and acting on it would repaint signals.
// ═══════════════════════════════════════════════════════════════════════════════

/// Single OHLCV candle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub open_time: i64, // Unix timestamp (ms)
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Donchian channel over a fixed lookback of completed candles
#[derive(Debug, Clone, PartialEq)]
pub struct DonchianChannel {
    pub high: f64,
    pub low: f64,
    pub midline: f64,
}

/// Drop the last (still forming) candle from a series
pub fn completed(candles: &[Candle]) -> &[Candle] {
    if candles.is_empty() {
        candles
    } else {
        &candles[..candles.len() - 1]
    }
}

/// Donchian channel over the last `period` candles of `candles`
///
/// Returns None when there is not enough history. Callers are expected to
/// pass completed candles only.
pub fn donchian_channel(candles: &[Candle], period: usize) -> Option<DonchianChannel> {
    if period == 0 || candles.len() < period {
        return None;
    }

    let window = &candles[candles.len() - period..];
    let high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);

    Some(DonchianChannel {
        high,
        low,
        midline: (high + low) / 2.0,
    })
}

/// Daily returns (close-to-close percentage change)
pub fn daily_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

/// Realized volatility over a trailing window of daily closes
///
/// Sample standard deviation of the last `window` daily returns scaled by
/// sqrt(window), e.g. a 90-day window yields the "90-day volatility" used
/// for position sizing. `window` returns need `window + 1` closes.
pub fn window_volatility(closes: &[f64], window: usize) -> Option<f64> {
    if window < 2 || closes.len() < window + 1 {
        return None;
    }

    let returns = daily_returns(&closes[closes.len() - (window + 1)..]);
    if returns.len() < 2 {
        return None;
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns
        .iter()
        .map(|r| (r - mean).powi(2))
        .sum::<f64>()
        / (returns.len() - 1) as f64;

    Some(variance.sqrt() * (window as f64).sqrt())
}

/// Simple moving average over the last `period` closes
pub fn sma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }
    let window = &closes[closes.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// RSI with Wilder smoothing over the full series, value for the last close
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() <= period {
        return None;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for w in closes[..period + 1].windows(2) {
        let delta = w[1] - w[0];
        if delta >= 0.0 {
            gains += delta;
        } else {
            losses -= delta;
        }
    }
    let mut avg_gain = gains / period as f64;
    let mut avg_loss = losses / period as f64;

    for w in closes[period..].windows(2) {
        let delta = w[1] - w[0];
        let (gain, loss) = if delta >= 0.0 { (delta, 0.0) } else { (0.0, -delta) };
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Bollinger bands (SMA ± 2 standard deviations) for the last close
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub ma: f64,
    pub upper: f64,
    pub lower: f64,
}

pub fn bollinger_bands(closes: &[f64], period: usize) -> Option<BollingerBands> {
    if period < 2 || closes.len() < period {
        return None;
    }

    let window = &closes[closes.len() - period..];
    let ma = window.iter().sum::<f64>() / period as f64;
    let variance = window.iter().map(|c| (c - ma).powi(2)).sum::<f64>() / (period - 1) as f64;
    let std = variance.sqrt();

    Some(BollingerBands {
        ma,
        upper: ma + 2.0 * std,
        lower: ma - 2.0 * std,
    })
}

/// MACD(12, 26, 9) values for the last close
#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

pub fn macd(closes: &[f64]) -> Option<Macd> {
    const SHORT: usize = 12;
    const LONG: usize = 26;
    const SIGNAL: usize = 9;

    if closes.len() < LONG {
        return None;
    }

    let ema_short = ema_series(closes, SHORT);
    let ema_long = ema_series(closes, LONG);
    let macd_line: Vec<f64> = ema_short
        .iter()
        .zip(ema_long.iter())
        .map(|(s, l)| s - l)
        .collect();
    let signal_line = ema_series(&macd_line, SIGNAL);

    let macd_value = *macd_line.last()?;
    let signal_value = *signal_line.last()?;

    Some(Macd {
        macd: macd_value,
        signal: signal_value,
        histogram: macd_value - signal_value,
    })
}

/// Exponential moving average series with span-style smoothing (2 / (n + 1))
fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema = match values.first() {
        Some(v) => *v,
        None => return out,
    };
    out.push(ema);
    for v in &values[1..] {
        ema = alpha * v + (1.0 - alpha) * ema;
        out.push(ema);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            open_time: 0,
            open,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_completed_drops_last_candle() {
        let candles = vec![
            candle(1.0, 2.0, 0.5, 1.5),
            candle(1.5, 2.5, 1.0, 2.0),
            candle(2.0, 3.0, 1.5, 2.5),
        ];
        let done = completed(&candles);
        assert_eq!(done.len(), 2);
        assert_eq!(done.last().unwrap().close, 2.0);
    }

    #[test]
    fn test_donchian_channel_basic() {
        let candles = vec![
            candle(10.0, 12.0, 9.0, 11.0),
            candle(11.0, 15.0, 10.0, 14.0),
            candle(14.0, 14.5, 11.0, 12.0),
        ];

        let ch = donchian_channel(&candles, 3).unwrap();
        assert_eq!(ch.high, 15.0);
        assert_eq!(ch.low, 9.0);
        assert_eq!(ch.midline, 12.0);

        // Only the last two candles in the window
        let ch2 = donchian_channel(&candles, 2).unwrap();
        assert_eq!(ch2.high, 15.0);
        assert_eq!(ch2.low, 10.0);
    }

    #[test]
    fn test_donchian_channel_insufficient_history() {
        let candles = vec![candle(10.0, 12.0, 9.0, 11.0)];
        assert!(donchian_channel(&candles, 5).is_none());
        assert!(donchian_channel(&candles, 0).is_none());
    }

    #[test]
    fn test_volatility_of_constant_series_is_zero() {
        let closes = vec![100.0; 95];
        let vol = window_volatility(&closes, 90).unwrap();
        assert!(vol.abs() < 1e-12);
    }

    #[test]
    fn test_volatility_increases_with_swing_size() {
        let calm: Vec<f64> = (0..95).map(|i| 100.0 + ((i % 2) as f64) * 0.1).collect();
        let wild: Vec<f64> = (0..95).map(|i| 100.0 + ((i % 2) as f64) * 10.0).collect();

        let calm_vol = window_volatility(&calm, 90).unwrap();
        let wild_vol = window_volatility(&wild, 90).unwrap();
        assert!(wild_vol > calm_vol * 10.0);
    }

    #[test]
    fn test_volatility_insufficient_history() {
        let closes = vec![100.0; 10];
        assert!(window_volatility(&closes, 90).is_none());
    }

    #[test]
    fn test_volatility_uses_full_window_of_returns() {
        // Two returns of +10% and -10%: sample std 0.1·sqrt(2), scaled by
        // sqrt(2) gives exactly 0.2. Needs window + 1 closes.
        let closes = vec![100.0, 110.0, 99.0];
        let vol = window_volatility(&closes, 2).unwrap();
        assert!((vol - 0.2).abs() < 1e-9);

        // window closes alone are one return short
        assert!(window_volatility(&closes[1..], 2).is_none());
    }

    #[test]
    fn test_sma() {
        let closes = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(sma(&closes, 5), Some(3.0));
        assert_eq!(sma(&closes, 2), Some(4.5));
        assert_eq!(sma(&closes, 6), None);
    }

    #[test]
    fn test_rsi_all_gains_saturates() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let value = rsi(&closes, 14).unwrap();
        assert!(value > 99.0);
    }

    #[test]
    fn test_rsi_all_losses_near_zero() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        let value = rsi(&closes, 14).unwrap();
        assert!(value < 1.0);
    }

    #[test]
    fn test_bollinger_constant_series_collapses() {
        let closes = vec![50.0; 20];
        let bb = bollinger_bands(&closes, 20).unwrap();
        assert_eq!(bb.ma, 50.0);
        assert!((bb.upper - 50.0).abs() < 1e-12);
        assert!((bb.lower - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_macd_uptrend_is_positive() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64) * 2.0).collect();
        let m = macd(&closes).unwrap();
        assert!(m.macd > 0.0);
    }
}
