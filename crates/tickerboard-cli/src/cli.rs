//! CLI argument definitions for tickerboard.
//!
//! # Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--tickers` | `TICKERBOARD_TICKERS` | Comma-separated watchlist |
//! | `--lookback` | `TICKERBOARD_LOOKBACK_DAYS` | Trading days for trailing growth |
//! | `--refresh` | `false` | Bypass cached snapshots for the first render |
//! | `--chart` | first ticker | Ticker to chart |
//! | `--chart-period` | `1y` | Chart period |
//! | `--no-chart` | `false` | Table only |
//! | `--format` | `table` | Output format (table, json) |
//! | `--timeout-ms` | `TICKERBOARD_TIMEOUT_MS` | Per-request timeout |
//! | `--watch` | off | Re-render every N seconds |
//!
//! # Examples
//!
//! ```bash
//! tickerboard --tickers "aapl, msft, nvda"
//! tickerboard --lookback 504 --chart MSFT
//! tickerboard --format json --pretty --no-chart
//! tickerboard --watch 30
//! ```

use clap::{Parser, ValueEnum};
use tickerboard_core::ChartPeriod;

/// Terminal watchlist: price, day change and trailing annualized growth.
#[derive(Debug, Parser)]
#[command(
    name = "tickerboard",
    author,
    version,
    about = "Terminal watchlist for market tickers",
    long_about = "Tickerboard shows, for each ticker, the latest close, the change versus the \
previous close and the annualized growth over a trailing window, followed by a price chart \
for one ticker.\n\
\n\
Unavailable values render as a placeholder instead of failing the whole table."
)]
pub struct Cli {
    /// Comma-separated tickers, e.g. "aapl, MSFT ,nvda". Blank entries are ignored.
    #[arg(long)]
    pub tickers: Option<String>,

    /// Trailing window in trading days (182..=1095).
    #[arg(long)]
    pub lookback: Option<u32>,

    /// Fetch fresh data instead of reusing a cached snapshot.
    #[arg(long, default_value_t = false)]
    pub refresh: bool,

    /// Ticker to chart; must be one of the requested tickers.
    #[arg(long, conflicts_with = "no_chart")]
    pub chart: Option<String>,

    /// Calendar period covered by the chart.
    #[arg(long, default_value_t = ChartPeriod::OneYear)]
    pub chart_period: ChartPeriod,

    /// Skip the chart.
    #[arg(long, default_value_t = false)]
    pub no_chart: bool,

    /// Output format for results.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// Request timeout budget in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Re-render every N seconds until interrupted.
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub watch: Option<u64>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Fixed-width table and text chart.
    Table,
    /// Single JSON object.
    Json,
}
