use std::io::Write;

use chrono_tz::Tz;
use serde_json::json;
use tickerboard_core::display::{header_line, render_chart};
use tickerboard_core::{ChartPeriod, PriceSeries, Snapshot, SnapshotTable, Symbol};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Columns used by the text chart.
const CHART_WIDTH: usize = 60;

/// Everything shown in one render.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub tickers: Vec<Symbol>,
    pub snapshot: Snapshot,
    pub chart: Option<ChartView>,
}

#[derive(Debug, Clone)]
pub struct ChartView {
    pub period: ChartPeriod,
    pub series: PriceSeries,
}

pub fn render<W: Write>(
    out: &mut W,
    dashboard: &Dashboard,
    format: OutputFormat,
    pretty: bool,
    zone: Tz,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = json_payload(dashboard);
            let payload = if pretty {
                serde_json::to_string_pretty(&payload)?
            } else {
                serde_json::to_string(&payload)?
            };
            writeln!(out, "{payload}")?;
        }
        OutputFormat::Table => render_table(out, dashboard, zone)?,
    }
    out.flush()?;
    Ok(())
}

fn json_payload(dashboard: &Dashboard) -> serde_json::Value {
    let chart = dashboard.chart.as_ref().map(|chart| {
        json!({
            "symbol": chart.series.symbol,
            "period": chart.period,
            "points": chart.series.points(),
        })
    });

    json!({
        "generated_at": dashboard.snapshot.generated_at,
        "tickers": dashboard.tickers,
        "lookback_days": dashboard.snapshot.lookback.days(),
        "rows": dashboard.snapshot.rows,
        "chart": chart,
    })
}

fn render_table<W: Write>(out: &mut W, dashboard: &Dashboard, zone: Tz) -> Result<(), CliError> {
    let snapshot = &dashboard.snapshot;
    writeln!(out, "{}", header_line(snapshot.generated_at, &dashboard.tickers, zone))?;
    writeln!(out)?;

    if snapshot.is_empty() {
        writeln!(out, "No tickers selected.")?;
    } else {
        writeln!(out, "{}", SnapshotTable::from_snapshot(snapshot).render())?;
    }

    if let Some(chart) = &dashboard.chart {
        let label = format!("{} · {}", chart.series.symbol, chart.period);
        writeln!(out)?;
        writeln!(out, "{}", render_chart(&chart.series, &label, CHART_WIDTH))?;
    }
    Ok(())
}
