//! Metric engine: pure functions from price series to row figures.
//!
//! Every figure is independently optional. A degenerate input (empty series,
//! zero base price, non-finite result) yields `None`, never `0.0`.

use crate::{Metrics, PriceSeries};

/// Trading days per year used to annualize trailing growth.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Price, day change and trailing annualized growth for one symbol.
///
/// `short` is the recent unadjusted history; `window` the adjusted history
/// over the lookback window.
pub fn compute_metrics(short: &PriceSeries, window: &PriceSeries) -> Metrics {
    Metrics {
        price: short.last().map(|point| point.close).filter(|close| close.is_finite()),
        day_change_percent: day_change_percent(short),
        trailing_growth_percent: trailing_growth_percent(window),
    }
}

/// `(last / previous - 1) * 100` over the two most recent closes.
pub fn day_change_percent(series: &PriceSeries) -> Option<f64> {
    let last = series.last()?.close;
    let previous = series.previous()?.close;
    if !previous.is_finite() || previous == 0.0 {
        return None;
    }
    finite((last / previous - 1.0) * 100.0)
}

/// Compound annual growth rate over the window, in percent.
///
/// The exponent is `252 / (n - 1)` where `n` is the number of closes actually
/// returned, not the requested window length.
pub fn trailing_growth_percent(series: &PriceSeries) -> Option<f64> {
    if series.len() < 2 {
        return None;
    }
    let first = series.first()?.close;
    let last = series.last()?.close;
    if first.is_nan() || first <= 0.0 {
        return None;
    }

    let intervals = (series.len() - 1) as f64;
    finite(((last / first).powf(TRADING_DAYS_PER_YEAR / intervals) - 1.0) * 100.0)
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}
