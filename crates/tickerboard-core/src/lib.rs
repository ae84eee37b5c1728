//! # Tickerboard Core
//!
//! Building blocks for a watchlist dashboard: per-ticker price, day change and
//! trailing annualized growth, plus a one-year price chart.
//!
//! ## Overview
//!
//! - **Domain types** for symbols, lookback windows, price series and snapshots
//! - **Data source trait** with a Yahoo Finance adapter
//! - **Gateway** adding throttling, timeouts and retries to provider calls
//! - **Metric engine** of pure functions over price series
//! - **Snapshot assembler** that fans out per-symbol work
//! - **TTL cache** with single-flight computation behind [`SnapshotService`]
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (Yahoo) |
//! | [`assembler`] | Concurrent per-symbol snapshot assembly |
//! | [`cache`] | Keyed TTL cache |
//! | [`circuit_breaker`] | Circuit breaker for resilient calls |
//! | [`clock`] | Injectable time source |
//! | [`config`] | Environment-driven configuration |
//! | [`data_source`] | Data source trait and request/error types |
//! | [`display`] | Number formatting, table projection, text chart |
//! | [`domain`] | Domain models |
//! | [`error`] | Core error types |
//! | [`gateway`] | Throttled, retried provider access |
//! | [`http_client`] | HTTP client abstraction |
//! | [`metrics`] | Price, day change and trailing growth |
//! | [`retry`] | Retry policy with backoff |
//! | [`service`] | Cached snapshot and chart lookups |
//! | [`throttling`] | Client-side rate limiting |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tickerboard_core::{
//!     normalize_tickers, RefreshToken, SnapshotService, SystemClock, TickerboardConfig, YahooAdapter,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TickerboardConfig::from_env()?;
//!     let service = SnapshotService::from_config(
//!         &config,
//!         Arc::new(YahooAdapter::default()),
//!         Arc::new(SystemClock),
//!     );
//!
//!     let tickers = normalize_tickers(&config.default_tickers);
//!     let snapshot = service
//!         .get_snapshot(&tickers, config.default_lookback, RefreshToken::NONE)
//!         .await;
//!
//!     for row in &snapshot.rows {
//!         println!("{} {:?}", row.symbol, row.price);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI renderer   │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ SnapshotService │────▶│ TtlCache         │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Assembler       │────▶│ Metric engine    │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Gateway         │────▶│ Throttle / Retry │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Data Source     │────▶│ HTTP Client      │
//! │ (Yahoo adapter) │     │ (reqwest)        │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Provider calls return [`SourceError`]; the assembler turns each failure
//! into an absent value and logs its code:
//!
//! ```rust
//! use tickerboard_core::{SourceError, SourceErrorKind};
//!
//! fn describe(error: &SourceError) -> &'static str {
//!     match error.kind() {
//!         SourceErrorKind::NotFound => "unknown symbol",
//!         SourceErrorKind::Timeout | SourceErrorKind::Unavailable => "provider down",
//!         _ => "unexpected response",
//!     }
//! }
//!
//! assert_eq!(describe(&SourceError::not_found("ZZZZ")), "unknown symbol");
//! ```

pub mod adapters;
pub mod assembler;
pub mod cache;
pub mod circuit_breaker;
pub mod clock;
pub mod config;
pub mod data_source;
pub mod display;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod http_client;
pub mod metrics;
pub mod retry;
pub mod service;
pub mod throttling;

// Adapter implementations
pub use adapters::{YahooAdapter, YahooAuthManager};

pub use assembler::SnapshotAssembler;

// Caching
pub use cache::TtlCache;

// Circuit breaker
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

pub use clock::{Clock, ManualClock, SystemClock};

pub use config::TickerboardConfig;

// Data source trait and types
pub use data_source::{
    Adjustment, DataSource, HistoryRange, HistoryRequest, SourceError, SourceErrorKind,
};

pub use display::{DisplayRow, SnapshotTable, PLACEHOLDER};

// Domain models
pub use domain::{
    normalize_tickers, parse_timezone, ChartPeriod, InstrumentMeta, LookbackWindow, Metrics,
    PricePoint, PriceSeries, RefreshToken, Snapshot, SnapshotRow, Symbol, UtcDateTime,
    DEFAULT_TIMEZONE,
};

// Error types
pub use error::ValidationError;

pub use gateway::MarketDataGateway;

// HTTP client types
pub use http_client::{HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

pub use metrics::compute_metrics;

// Retry logic
pub use retry::{Backoff, RetryConfig};

pub use service::{ChartKey, SnapshotKey, SnapshotService};

// Throttling
pub use throttling::Throttle;
