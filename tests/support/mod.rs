//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use time::{Date, Month};
use tickerboard_core::{
    Adjustment, Clock, DataSource, HistoryRange, HistoryRequest, InstrumentMeta, ManualClock,
    PricePoint, PriceSeries, RetryConfig, SnapshotAssembler, SnapshotService, SourceError, Symbol,
    TickerboardConfig,
};

/// Canned data for one symbol.
#[derive(Debug, Clone, Default)]
pub struct Fixture {
    pub meta: InstrumentMeta,
    /// Unadjusted closes returned for the short history.
    pub short: Vec<f64>,
    /// Adjusted closes returned for the lookback window and chart periods.
    pub window: Vec<f64>,
}

impl Fixture {
    pub fn named(short_name: &str, currency: &str) -> Self {
        Self {
            meta: InstrumentMeta {
                short_name: Some(short_name.to_owned()),
                long_name: None,
                currency: Some(currency.to_owned()),
            },
            ..Self::default()
        }
    }

    pub fn with_short(mut self, closes: &[f64]) -> Self {
        self.short = closes.to_vec();
        self
    }

    pub fn with_window(mut self, closes: &[f64]) -> Self {
        self.window = closes.to_vec();
        self
    }
}

/// In-memory [`DataSource`] with call counters and failure injection.
///
/// Symbols without a fixture are unknown to the provider.
#[derive(Default)]
pub struct StubSource {
    fixtures: HashMap<String, Fixture>,
    failing_metadata: HashSet<String>,
    failing_history: HashSet<String>,
    delay: Option<Duration>,
    pub metadata_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
    requests: Mutex<Vec<HistoryRequest>>,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fixture(mut self, symbol: &str, fixture: Fixture) -> Self {
        self.fixtures.insert(symbol.to_owned(), fixture);
        self
    }

    /// Metadata lookups for `symbol` fail as unavailable.
    pub fn failing_metadata(mut self, symbol: &str) -> Self {
        self.failing_metadata.insert(symbol.to_owned());
        self
    }

    /// History lookups for `symbol` fail as unavailable.
    pub fn failing_history(mut self, symbol: &str) -> Self {
        self.failing_history.insert(symbol.to_owned());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.metadata_calls() + self.history_calls()
    }

    pub fn history_requests(&self) -> Vec<HistoryRequest> {
        self.requests.lock().expect("request log should not be poisoned").clone()
    }

    fn fixture(&self, symbol: &Symbol) -> Result<&Fixture, SourceError> {
        self.fixtures
            .get(symbol.as_str())
            .ok_or_else(|| SourceError::not_found(format!("unknown symbol {symbol}")))
    }
}

impl DataSource for StubSource {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn metadata<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<InstrumentMeta, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            self.metadata_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing_metadata.contains(symbol.as_str()) {
                return Err(SourceError::unavailable("injected metadata failure"));
            }
            Ok(self.fixture(symbol)?.meta.clone())
        })
    }

    fn history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSeries, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            self.history_calls.fetch_add(1, Ordering::SeqCst);
            self.requests
                .lock()
                .expect("request log should not be poisoned")
                .push(req.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing_history.contains(req.symbol.as_str()) {
                return Err(SourceError::unavailable("injected history failure"));
            }

            let fixture = self.fixture(&req.symbol)?;
            let closes = match (req.range, req.adjustment) {
                (HistoryRange::Days(_), Adjustment::Raw) => &fixture.short,
                _ => &fixture.window,
            };
            Ok(series(req.symbol.clone(), closes))
        })
    }
}

/// Daily series starting 2024-01-01 with one close per calendar day.
pub fn series(symbol: Symbol, closes: &[f64]) -> PriceSeries {
    let start = Date::from_calendar_date(2024, Month::January, 1).expect("valid date");
    PriceSeries::from_points(
        symbol,
        closes.iter().enumerate().map(|(offset, &close)| {
            PricePoint::new(start + time::Duration::days(offset as i64), close)
        }),
    )
}

pub fn symbols(raw: &str) -> Vec<Symbol> {
    tickerboard_core::normalize_tickers(raw)
}

/// Service over `source` with retries disabled, on a manual clock.
pub fn service(source: Arc<StubSource>, clock: Arc<ManualClock>) -> SnapshotService {
    let config = TickerboardConfig {
        max_retries: 0,
        ..TickerboardConfig::default()
    };
    SnapshotService::from_config(&config, source, clock)
}

pub fn assembler(source: Arc<StubSource>) -> SnapshotAssembler {
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::starting_at_unix(1_704_488_400));
    let gateway = tickerboard_core::MarketDataGateway::new(source).with_retry(RetryConfig::no_retry());
    SnapshotAssembler::new(Arc::new(gateway), clock, 4)
}
