use serde::{Deserialize, Serialize};

use crate::{LookbackWindow, RefreshToken, Symbol, UtcDateTime};

/// Best-effort descriptive data for an instrument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentMeta {
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub currency: Option<String>,
}

impl InstrumentMeta {
    /// Short name, then long name; blank names count as missing.
    pub fn display_name(&self) -> Option<&str> {
        non_blank(self.short_name.as_deref()).or_else(|| non_blank(self.long_name.as_deref()))
    }

    pub fn currency(&self) -> Option<&str> {
        non_blank(self.currency.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Derived figures for one symbol. Every field is independently optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub price: Option<f64>,
    pub day_change_percent: Option<f64>,
    pub trailing_growth_percent: Option<f64>,
}

/// One table row per requested symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub symbol: Symbol,
    pub display_name: String,
    /// `None` renders as the unknown-currency marker.
    pub currency: Option<String>,
    pub price: Option<f64>,
    pub day_change_percent: Option<f64>,
    pub trailing_growth_percent: Option<f64>,
}

impl SnapshotRow {
    pub fn new(symbol: Symbol, meta: &InstrumentMeta, metrics: Metrics) -> Self {
        let display_name = meta
            .display_name()
            .map(str::to_owned)
            .unwrap_or_else(|| symbol.as_str().to_owned());
        Self {
            display_name,
            currency: meta.currency().map(str::to_owned),
            price: metrics.price,
            day_change_percent: metrics.day_change_percent,
            trailing_growth_percent: metrics.trailing_growth_percent,
            symbol,
        }
    }

    /// Row used when nothing could be computed for `symbol`.
    pub fn placeholder(symbol: Symbol) -> Self {
        Self::new(symbol, &InstrumentMeta::default(), Metrics::default())
    }
}

/// Ordered rows for one render, plus the parameters they were computed for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub generated_at: UtcDateTime,
    pub lookback: LookbackWindow,
    pub refresh_token: RefreshToken,
    pub rows: Vec<SnapshotRow>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.rows.iter().map(|row| &row.symbol)
    }
}
