//! # Domain Models
//!
//! Canonical domain types for tickerboard.
//!
//! ## Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Trimmed, upper-cased ticker |
//! | [`LookbackWindow`] | Trading-day window for trailing growth (182..=1095) |
//! | [`ChartPeriod`] | Calendar period for chart history |
//! | [`RefreshToken`] | Cache-key discriminator for forced refreshes |
//! | [`PriceSeries`] | Date-ordered daily closes |
//! | [`InstrumentMeta`] | Names and currency |
//! | [`Metrics`] | Price, day change, trailing growth |
//! | [`SnapshotRow`] / [`Snapshot`] | Watchlist table |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! ## Validation
//!
//! Constructors enforce invariants; the free-text entry point
//! [`normalize_tickers`] never fails and simply drops blank fragments:
//!
//! ```rust
//! use tickerboard_core::{normalize_tickers, LookbackWindow};
//!
//! let symbols = normalize_tickers("aapl, MSFT ,, nvda");
//! assert_eq!(symbols.len(), 3);
//! assert!(LookbackWindow::new(90).is_err());
//! ```

mod series;
mod snapshot;
mod symbol;
mod timestamp;
mod window;

pub use series::{PricePoint, PriceSeries};
pub use snapshot::{InstrumentMeta, Metrics, Snapshot, SnapshotRow};
pub use symbol::{normalize_tickers, Symbol};
pub use timestamp::{parse_timezone, UtcDateTime, DEFAULT_TIMEZONE};
pub use window::{ChartPeriod, LookbackWindow, RefreshToken};
