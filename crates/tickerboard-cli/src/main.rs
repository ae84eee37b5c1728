mod cli;
mod error;
mod render;

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tickerboard_core::{
    normalize_tickers, ChartPeriod, CircuitBreaker, CircuitBreakerConfig, Clock, DataSource,
    HttpAuth, LookbackWindow, RefreshToken, ReqwestHttpClient, SnapshotService, Symbol,
    SystemClock, TickerboardConfig, YahooAdapter, YahooAuthManager,
};

use crate::cli::Cli;
use crate::error::CliError;
use crate::render::{ChartView, Dashboard};

const CRUMB_TTL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

/// Logs go to stderr so stdout carries only the rendered output.
/// `RUST_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json_logging {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

async fn run() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();

    let mut config = TickerboardConfig::from_env()?;
    if let Some(timeout_ms) = cli.timeout_ms {
        config.request_timeout_ms = timeout_ms;
    }

    let tickers = normalize_tickers(cli.tickers.as_deref().unwrap_or(&config.default_tickers));
    let lookback = resolve_lookback(cli.lookback, config.default_lookback)?;
    let chart_target = if cli.no_chart {
        None
    } else {
        resolve_chart_target(cli.chart.as_deref(), &tickers)?
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let service = SnapshotService::from_config(
        &config,
        yahoo_source(&config, Arc::clone(&clock)),
        Arc::clone(&clock),
    );

    tracing::debug!(
        tickers = tickers.len(),
        lookback_days = lookback.days(),
        watch_secs = cli.watch,
        "starting tickerboard"
    );

    let mut refresh = cli.refresh;
    loop {
        // a refresh only applies to the first render
        let token = RefreshToken::for_render(refresh, clock.as_ref());
        refresh = false;

        let dashboard = build_dashboard(
            &service,
            &tickers,
            lookback,
            token,
            chart_target.as_ref(),
            cli.chart_period,
        )
        .await;

        let mut stdout = io::stdout().lock();
        render::render(&mut stdout, &dashboard, cli.format, cli.pretty, config.timezone)?;

        let Some(interval) = cli.watch else {
            break;
        };
        writeln!(stdout)?;
        drop(stdout);

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(interval)) => {}
            _ = tokio::signal::ctrl_c() => break,
        }
        let expired = service.expire().await;
        tracing::debug!(expired, "purged expired cache entries");
    }

    Ok(ExitCode::SUCCESS)
}

/// The `--lookback` value as given, or the configured default.
fn resolve_lookback(days: Option<u32>, default: LookbackWindow) -> Result<LookbackWindow, CliError> {
    match days {
        Some(days) => Ok(LookbackWindow::new(days)?),
        None => Ok(default),
    }
}

/// The explicit `--chart` ticker, or the first requested ticker.
fn resolve_chart_target(chart: Option<&str>, tickers: &[Symbol]) -> Result<Option<Symbol>, CliError> {
    let Some(raw) = chart else {
        return Ok(tickers.first().cloned());
    };

    let symbol = Symbol::parse(raw)?;
    if tickers.contains(&symbol) {
        Ok(Some(symbol))
    } else {
        Err(CliError::ChartTargetNotInTickers {
            symbol: symbol.to_string(),
            tickers: tickers
                .iter()
                .map(Symbol::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

fn yahoo_source(config: &TickerboardConfig, clock: Arc<dyn Clock>) -> Arc<dyn DataSource> {
    let auth = config
        .yahoo_cookie
        .clone()
        .map_or(HttpAuth::None, HttpAuth::Cookie);

    Arc::new(
        YahooAdapter::new(Arc::new(ReqwestHttpClient::new()))
            .with_auth(auth)
            .with_timeout_ms(config.request_timeout_ms)
            .with_circuit_breaker(Arc::new(CircuitBreaker::new(
                CircuitBreakerConfig::default(),
                Arc::clone(&clock),
            )))
            .with_auth_manager(Arc::new(YahooAuthManager::new(CRUMB_TTL, clock))),
    )
}

async fn build_dashboard(
    service: &SnapshotService,
    tickers: &[Symbol],
    lookback: LookbackWindow,
    token: RefreshToken,
    chart_target: Option<&Symbol>,
    chart_period: ChartPeriod,
) -> Dashboard {
    let chart = async {
        match chart_target {
            Some(symbol) => Some(ChartView {
                period: chart_period,
                series: service.get_chart_history(symbol, chart_period).await,
            }),
            None => None,
        }
    };

    let (snapshot, chart) = tokio::join!(service.get_snapshot(tickers, lookback, token), chart);

    Dashboard {
        tickers: tickers.to_vec(),
        snapshot,
        chart,
    }
}
