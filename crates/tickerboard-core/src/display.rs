//! Presentation helpers shared by every renderer: number formatting, the
//! snapshot table projection and a text line chart.
//!
//! Absent values always render as [`PLACEHOLDER`], never as `0`.

use chrono_tz::Tz;
use serde::Serialize;

use crate::{PriceSeries, Snapshot, SnapshotRow, Symbol, UtcDateTime};

/// Glyph shown for an absent number or an unknown currency.
pub const PLACEHOLDER: &str = "—";

/// Notice printed instead of a chart for an empty series.
pub const NO_HISTORY: &str = "No history available.";

pub const COLUMNS: [&str; 6] = [
    "Ticker",
    "Name",
    "Price",
    "Currency",
    "Day %",
    "Predicted Growth (ann.)",
];

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Two decimals with thousands separators, e.g. `1,234.50`.
pub fn format_price(value: Option<f64>) -> String {
    let Some(value) = value.filter(|v| v.is_finite()) else {
        return PLACEHOLDER.to_owned();
    };

    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac_part}")
}

/// Explicit sign, two decimals and a `%` suffix, e.g. `+10.00%`.
pub fn format_percent(value: Option<f64>) -> String {
    match value.filter(|v| v.is_finite()) {
        Some(value) => format!("{value:+.2}%"),
        None => PLACEHOLDER.to_owned(),
    }
}

pub fn format_currency(currency: Option<&str>) -> String {
    currency
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(PLACEHOLDER)
        .to_owned()
}

/// "Last refreshed: … • Tickers: …" line shown above the table.
pub fn header_line(generated_at: UtcDateTime, tickers: &[Symbol], zone: Tz) -> String {
    let tickers = if tickers.is_empty() {
        PLACEHOLDER.to_owned()
    } else {
        tickers
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "Last refreshed: {} • Tickers: {tickers}",
        generated_at.format_in_zone(zone)
    )
}

/// One formatted table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    pub ticker: String,
    pub name: String,
    pub price: String,
    pub currency: String,
    pub day_change: String,
    pub predicted_growth: String,
}

impl DisplayRow {
    pub fn from_row(row: &SnapshotRow) -> Self {
        Self {
            ticker: row.symbol.as_str().to_owned(),
            name: row.display_name.clone(),
            price: format_price(row.price),
            currency: format_currency(row.currency.as_deref()),
            day_change: format_percent(row.day_change_percent),
            predicted_growth: format_percent(row.trailing_growth_percent),
        }
    }

    fn cells(&self) -> [&str; 6] {
        [
            self.ticker.as_str(),
            self.name.as_str(),
            self.price.as_str(),
            self.currency.as_str(),
            self.day_change.as_str(),
            self.predicted_growth.as_str(),
        ]
    }
}

/// A [`Snapshot`] projected into display strings, one row per snapshot row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotTable {
    pub rows: Vec<DisplayRow>,
}

impl SnapshotTable {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            rows: snapshot.rows.iter().map(DisplayRow::from_row).collect(),
        }
    }

    /// Fixed-width text table. Text columns are left-aligned, numbers right-aligned.
    pub fn render(&self) -> String {
        let mut widths = COLUMNS.map(|title| title.chars().count());
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row.cells()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(render_line(&COLUMNS, &widths));
        lines.push(
            widths
                .iter()
                .map(|width| "-".repeat(*width))
                .collect::<Vec<_>>()
                .join("  "),
        );
        for row in &self.rows {
            lines.push(render_line(&row.cells(), &widths));
        }
        lines.join("\n")
    }
}

fn render_line(cells: &[&str; 6], widths: &[usize; 6]) -> String {
    cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(column, (cell, width))| {
            let padding = " ".repeat(width.saturating_sub(cell.chars().count()));
            // Price, Day %, Predicted Growth
            if matches!(column, 2 | 4 | 5) {
                format!("{padding}{cell}")
            } else {
                format!("{cell}{padding}")
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_owned()
}

/// Text line chart of closing prices, at most `width` columns wide.
///
/// Closes are bucketed into `width` columns (mean per bucket) and drawn as a
/// sparkline, framed by the min/max close and the first/last date.
pub fn render_chart(series: &PriceSeries, label: &str, width: usize) -> String {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return NO_HISTORY.to_owned();
    };

    let closes: Vec<f64> = series.closes().collect();
    let buckets = downsample(&closes, width.max(1));
    let min = closes.iter().copied().fold(f64::INFINITY, f64::min);
    let max = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    let top = SPARK_LEVELS.len() - 1;
    let line: String = buckets
        .iter()
        .map(|value| {
            let level = if span > 0.0 {
                (((value - min) / span) * top as f64).round() as usize
            } else {
                top / 2
            };
            SPARK_LEVELS[level.min(top)]
        })
        .collect();

    let first_date = first.date.to_string();
    let last_date = last.date.to_string();
    let gap = line
        .chars()
        .count()
        .saturating_sub(first_date.len() + last_date.len())
        .max(1);

    format!(
        "{label}  close {}  (min {}, max {})\n{line}\n{first_date}{}{last_date}",
        format_price(Some(last.close)),
        format_price(Some(min)),
        format_price(Some(max)),
        " ".repeat(gap),
    )
}

fn downsample(values: &[f64], width: usize) -> Vec<f64> {
    if values.len() <= width {
        return values.to_vec();
    }
    (0..width)
        .map(|bucket| {
            let start = bucket * values.len() / width;
            let end = ((bucket + 1) * values.len() / width).max(start + 1);
            let slice = &values[start..end];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}
