//! Market data gateway: the resilience layer between the assembler and a
//! [`DataSource`].
//!
//! Every provider call goes through the same pipeline:
//!
//! ```text
//! throttle (governor) -> timeout (tokio) -> provider call
//!        ^                                        |
//!        +---------- retry with backoff ----------+
//! ```
//!
//! Failures are returned as [`SourceError`] so callers can log why a value
//! went missing before collapsing it to absent.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::data_source::{Adjustment, DataSource, HistoryRange, HistoryRequest, SourceError};
use crate::retry::RetryConfig;
use crate::throttling::Throttle;
use crate::{ChartPeriod, InstrumentMeta, LookbackWindow, PriceSeries, Symbol};

/// Calendar days covered by the short history used for price and day change.
pub const SHORT_HISTORY_DAYS: u32 = 5;

#[derive(Clone)]
pub struct MarketDataGateway {
    source: Arc<dyn DataSource>,
    throttle: Throttle,
    retry: RetryConfig,
    call_timeout: Duration,
}

impl std::fmt::Debug for MarketDataGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataGateway")
            .field("source", &self.source.name())
            .field("retry", &self.retry)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl MarketDataGateway {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            source,
            throttle: Throttle::per_minute(120),
            retry: RetryConfig::default(),
            call_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Upper bound for a single provider attempt, retries excluded.
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Best-effort names and currency for `symbol`.
    pub async fn fetch_metadata(&self, symbol: &Symbol) -> Result<InstrumentMeta, SourceError> {
        self.call(|| self.source.metadata(symbol)).await
    }

    /// Unadjusted daily closes over the last few calendar days.
    pub async fn fetch_short_history(&self, symbol: &Symbol) -> Result<PriceSeries, SourceError> {
        let request = HistoryRequest::new(
            symbol.clone(),
            HistoryRange::Days(SHORT_HISTORY_DAYS),
            Adjustment::Raw,
        );
        self.fetch_history(request).await
    }

    /// Split- and dividend-adjusted daily closes over the lookback window.
    pub async fn fetch_window_history(
        &self,
        symbol: &Symbol,
        lookback: LookbackWindow,
    ) -> Result<PriceSeries, SourceError> {
        let request = HistoryRequest::new(symbol.clone(), lookback, Adjustment::SplitsAndDividends);
        self.fetch_history(request).await
    }

    /// Adjusted daily closes over a calendar period, for charting.
    pub async fn fetch_chart_history(
        &self,
        symbol: &Symbol,
        period: ChartPeriod,
    ) -> Result<PriceSeries, SourceError> {
        let request = HistoryRequest::new(symbol.clone(), period, Adjustment::SplitsAndDividends);
        self.fetch_history(request).await
    }

    async fn fetch_history(&self, request: HistoryRequest) -> Result<PriceSeries, SourceError> {
        self.call(|| self.source.history(request.clone())).await
    }

    async fn call<T, F, Fut>(&self, mut operation: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let call_timeout = self.call_timeout;
        self.retry
            .run(|| {
                let attempt = operation();
                async move {
                    self.throttle.acquire().await;
                    match tokio::time::timeout(call_timeout, attempt).await {
                        Ok(result) => result,
                        Err(_) => Err(SourceError::timeout(format!(
                            "{} call exceeded {} ms",
                            self.source.name(),
                            call_timeout.as_millis()
                        ))),
                    }
                }
            })
            .await
    }
}
