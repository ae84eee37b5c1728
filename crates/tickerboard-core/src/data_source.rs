//! Data source trait and request/response types.
//!
//! This module defines the provider contract (`DataSource`) that adapters
//! implement, together with the structured error used to describe why a
//! value could not be fetched.
//!
//! # Operations
//!
//! | Operation | Request | Response | Description |
//! |-----------|---------|----------|-------------|
//! | Metadata | [`Symbol`] | [`InstrumentMeta`] | Names and trading currency |
//! | History | [`HistoryRequest`] | [`PriceSeries`] | Daily closes, raw or adjusted |
//!
//! # Example
//!
//! ```rust,ignore
//! use tickerboard_core::{Adjustment, DataSource, HistoryRange, HistoryRequest, Symbol, YahooAdapter};
//!
//! async fn last_close(adapter: &YahooAdapter) -> Option<f64> {
//!     let symbol = Symbol::parse("AAPL").ok()?;
//!     let request = HistoryRequest::new(symbol, HistoryRange::Days(5), Adjustment::Raw);
//!     let series = adapter.history(request).await.ok()?;
//!     series.last().map(|point| point.close)
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{ChartPeriod, InstrumentMeta, LookbackWindow, PriceSeries, Symbol};

/// Price adjustment mode for history requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Adjustment {
    /// Closing prices as traded.
    Raw,
    /// Closing prices adjusted for splits and dividends.
    SplitsAndDividends,
}

/// Trailing span covered by a history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRange {
    /// The last `n` days, as interpreted by the provider.
    Days(u32),
    Period(ChartPeriod),
}

impl HistoryRange {
    /// Provider range token, e.g. `5d` or `1y`.
    pub fn as_range_param(self) -> String {
        match self {
            Self::Days(days) => format!("{days}d"),
            Self::Period(period) => period.as_str().to_owned(),
        }
    }
}

impl From<LookbackWindow> for HistoryRange {
    fn from(value: LookbackWindow) -> Self {
        Self::Days(value.days())
    }
}

impl From<ChartPeriod> for HistoryRange {
    fn from(value: ChartPeriod) -> Self {
        Self::Period(value)
    }
}

/// Request payload for daily history. The bar interval is always one day.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoryRequest {
    pub symbol: Symbol,
    pub range: HistoryRange,
    pub adjustment: Adjustment,
}

impl HistoryRequest {
    pub fn new(symbol: Symbol, range: impl Into<HistoryRange>, adjustment: Adjustment) -> Self {
        Self {
            symbol,
            range: range.into(),
            adjustment,
        }
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    /// Network failure or upstream error status.
    Unavailable,
    /// The call did not finish within its time budget.
    Timeout,
    RateLimited,
    /// The provider does not know the symbol.
    NotFound,
    /// The response body did not have the expected shape.
    Malformed,
    InvalidRequest,
}

/// Structured source error; the reason an optional value ended up absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    /// Provider short-circuited locally; retrying before it reopens is pointless.
    pub fn circuit_open(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Timeout,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Malformed,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::Malformed => "source.malformed",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Market-data provider contract.
///
/// Implementations must be `Send + Sync`: one adapter is shared by every
/// per-symbol task of a snapshot.
pub trait DataSource: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &'static str;

    /// Fetches descriptive metadata for one symbol.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the provider is unreachable, does not know
    /// the symbol, or answers with an unexpected payload.
    fn metadata<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<InstrumentMeta, SourceError>> + Send + 'a>>;

    /// Fetches daily closes for the requested range and adjustment mode.
    ///
    /// An empty series is a valid answer (e.g. a symbol with no trading in
    /// the window).
    ///
    /// # Errors
    ///
    /// Same conditions as [`metadata`](DataSource::metadata).
    fn history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSeries, SourceError>> + Send + 'a>>;
}
