//! Standalone backtest runner
//!
//! Fetches daily klines for the configured coins (or --symbol overrides),
//! replays the strategy over them and writes the trade list and equity curve
//! to backtest_results/.

use chrono::{Local, TimeZone, Utc};
use std::collections::HashMap;
use turtlebot::backtest::{run_backtest, BacktestReport, BacktestSettings};
use turtlebot::config;
use turtlebot::exchange::BinanceClient;
use turtlebot::logger::{self, LogTag};
use turtlebot::ohlcv::Candle;
use turtlebot::{arguments, paths};

#[tokio::main]
async fn main() {
    arguments::set_cmd_args(std::env::args().skip(1).collect());
    logger::init();

    if arguments::has_arg("--help") || arguments::has_arg("-h") {
        print_usage();
        return;
    }

    if let Err(e) = run().await {
        logger::error(LogTag::Backtest, &e);
        logger::flush();
        std::process::exit(1);
    }
    logger::flush();
}

fn print_usage() {
    println!("tool_backtest - replay the Turtle strategy over historical Binance data");
    println!();
    println!("USAGE:");
    println!("    tool_backtest [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --symbol <SYMBOL>    Backtest a single symbol instead of the configured coins");
    println!("    --days <N>           Days of daily candles to fetch (default 1000, max 1500)");
    println!("    --capital <USD>      Starting capital (default 10000)");
    println!("    --long-only          Suppress short entries");
    println!("    -h, --help           Show this help");
}

async fn run() -> Result<(), String> {
    if let Err(e) = config::load_config() {
        logger::warning(
            LogTag::Config,
            &format!("Config not loaded ({}), using defaults", e),
        );
    }
    let app_config = config::get_config();

    let symbols: Vec<String> = match arguments::get_arg_value("--symbol") {
        Some(s) => vec![s.to_uppercase()],
        None => app_config
            .active_coins()
            .iter()
            .map(|c| c.symbol.clone())
            .collect(),
    };
    if symbols.is_empty() {
        return Err("no symbols to backtest".to_string());
    }

    let days: usize = arguments::get_arg_value("--days")
        .map(|v| v.parse().map_err(|_| format!("invalid --days value '{}'", v)))
        .transpose()?
        .unwrap_or(1000)
        .min(1500);

    let initial_capital: f64 = arguments::get_arg_value("--capital")
        .map(|v| {
            v.parse()
                .map_err(|_| format!("invalid --capital value '{}'", v))
        })
        .transpose()?
        .unwrap_or(10_000.0);

    let settings = BacktestSettings {
        initial_capital,
        donchian_periods: app_config.strategy.donchian_periods.clone(),
        volatility_period: app_config.strategy.volatility_period,
        volatility_target: app_config.strategy.volatility_target,
        usage_ratio: app_config.strategy.total_account_usage_ratio,
        long_only: arguments::has_arg("--long-only"),
        ..BacktestSettings::default()
    };

    let client = BinanceClient::public(&app_config.exchange).map_err(|e| e.to_string())?;
    let mut candles_by_symbol: HashMap<String, Vec<Candle>> = HashMap::new();
    for symbol in &symbols {
        logger::info(
            LogTag::Backtest,
            &format!("Fetching {} days of {} daily candles", days, symbol),
        );
        let candles = client
            .get_klines(symbol, "1d", days)
            .await
            .map_err(|e| format!("{}: {}", symbol, e))?;
        candles_by_symbol.insert(symbol.clone(), candles);
    }

    let report = run_backtest(&candles_by_symbol, &settings)?;
    print_report(&symbols, &report);
    write_outputs(&report)?;
    Ok(())
}

fn print_report(symbols: &[String], report: &BacktestReport) {
    logger::info(
        LogTag::Backtest,
        &format!("Symbols: {}", symbols.join(", ")),
    );
    logger::info(
        LogTag::Backtest,
        &format!(
            "Initial capital: ${:.2} | Final equity: ${:.2}",
            report.initial_capital, report.final_equity
        ),
    );
    logger::info(
        LogTag::Backtest,
        &format!(
            "Total return: {:.2}% | Max drawdown: {:.2}%",
            report.total_return_pct, report.max_drawdown_pct
        ),
    );
    logger::info(
        LogTag::Backtest,
        &format!(
            "Trades: {} | Wins: {} | Win rate: {:.1}%",
            report.total_trades, report.winning_trades, report.win_rate_pct
        ),
    );
}

fn write_outputs(report: &BacktestReport) -> Result<(), String> {
    paths::ensure_backtest_directory()
        .map_err(|e| format!("could not create results directory: {}", e))?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let dir = paths::get_backtest_results_directory();

    let trades_path = dir.join(format!("trades_{}.csv", stamp));
    let mut writer = csv::Writer::from_path(&trades_path)
        .map_err(|e| format!("could not open {}: {}", trades_path.display(), e))?;
    writer
        .write_record([
            "Time", "Symbol", "Period", "Action", "Side", "Amount", "Price", "PNL",
        ])
        .map_err(|e| e.to_string())?;
    for trade in &report.trades {
        writer
            .write_record(&[
                format_time(trade.time),
                trade.symbol.clone(),
                trade.period.to_string(),
                trade.action.to_string(),
                trade.side.as_str().to_string(),
                format!("{:.8}", trade.amount),
                format!("{:.4}", trade.price),
                format!("{:.2}", trade.pnl),
            ])
            .map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())?;

    let equity_path = dir.join(format!("equity_{}.csv", stamp));
    let mut writer = csv::Writer::from_path(&equity_path)
        .map_err(|e| format!("could not open {}: {}", equity_path.display(), e))?;
    writer
        .write_record(["Time", "Equity"])
        .map_err(|e| e.to_string())?;
    for point in &report.equity_curve {
        writer
            .write_record(&[format_time(point.time), format!("{:.2}", point.equity)])
            .map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())?;

    let summary_path = dir.join(format!("summary_{}.txt", stamp));
    std::fs::write(&summary_path, report.summary_text())
        .map_err(|e| format!("could not write {}: {}", summary_path.display(), e))?;

    logger::info(
        LogTag::Backtest,
        &format!(
            "Results written to {}, {} and {}",
            trades_path.display(),
            equity_path.display(),
            summary_path.display()
        ),
    );
    Ok(())
}

fn format_time(epoch_ms: i64) -> String {
    Utc.timestamp_millis_opt(epoch_ms)
        .single()
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| epoch_ms.to_string())
}
