use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Deserialize;
use time::OffsetDateTime;

use crate::circuit_breaker::CircuitBreaker;
use crate::clock::{Clock, SystemClock};
use crate::data_source::{Adjustment, DataSource, HistoryRequest, SourceError, SourceErrorKind};
use crate::http_client::{HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::{InstrumentMeta, PricePoint, PriceSeries, Symbol};

const CHART_BASE: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const QUOTE_BASE: &str = "https://query1.finance.yahoo.com/v7/finance/quote";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_ENDPOINTS: [&str; 2] = [
    "https://query1.finance.yahoo.com/v1/test/getcrumb",
    "https://query2.finance.yahoo.com/v1/test/getcrumb",
];
const REFERER: &str = "https://finance.yahoo.com/";

// ============================================================================
// Yahoo Auth Manager - cookie/crumb session for the quote endpoint
// ============================================================================

#[derive(Debug)]
struct CachedCrumb {
    value: String,
    fetched_at: Instant,
}

/// Manages the Yahoo Finance crumb required by the quote endpoint.
///
/// Yahoo's unofficial API wants:
/// 1. A session cookie from fc.yahoo.com (kept by the client's cookie jar)
/// 2. A crumb token from /v1/test/getcrumb, passed as a query parameter
///
/// The chart endpoint works without either.
#[derive(Debug)]
pub struct YahooAuthManager {
    crumb: Mutex<Option<CachedCrumb>>,
    /// Serializes refreshes so concurrent callers share one crumb fetch.
    refresh_lock: tokio::sync::Mutex<()>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for YahooAuthManager {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600), Arc::new(SystemClock))
    }
}

impl YahooAuthManager {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            crumb: Mutex::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            ttl,
            clock,
        }
    }

    fn cached(&self) -> Option<String> {
        let crumb = self.crumb.lock().expect("yahoo crumb lock is not poisoned");
        crumb
            .as_ref()
            .filter(|cached| self.clock.now().saturating_duration_since(cached.fetched_at) < self.ttl)
            .map(|cached| cached.value.clone())
    }

    /// Current crumb, fetching a new one when none is cached or it has expired.
    pub async fn crumb(
        &self,
        http_client: &dyn HttpClient,
        timeout_ms: u64,
    ) -> Result<String, SourceError> {
        if let Some(crumb) = self.cached() {
            return Ok(crumb);
        }

        let _guard = self.refresh_lock.lock().await;
        // another caller may have refreshed while we waited
        if let Some(crumb) = self.cached() {
            return Ok(crumb);
        }

        let value = fetch_crumb(http_client, timeout_ms).await?;
        *self.crumb.lock().expect("yahoo crumb lock is not poisoned") = Some(CachedCrumb {
            value: value.clone(),
            fetched_at: self.clock.now(),
        });
        Ok(value)
    }

    /// Drop the cached crumb; the next call fetches a fresh one.
    pub fn invalidate(&self) {
        *self.crumb.lock().expect("yahoo crumb lock is not poisoned") = None;
    }
}

async fn fetch_crumb(http_client: &dyn HttpClient, timeout_ms: u64) -> Result<String, SourceError> {
    let cookie_request = HttpRequest::get(COOKIE_URL)
        .with_header("referer", REFERER)
        .with_timeout_ms(timeout_ms);

    // fc.yahoo.com answers 404 but still sets the session cookie
    http_client
        .execute(cookie_request)
        .await
        .map_err(|e| transport_error("failed to fetch yahoo session cookie", &e))?;

    for endpoint in CRUMB_ENDPOINTS {
        let crumb_request = HttpRequest::get(endpoint)
            .with_header("referer", REFERER)
            .with_timeout_ms(timeout_ms);

        let Ok(response) = http_client.execute(crumb_request).await else {
            continue;
        };
        if response.status == 429 {
            return Err(SourceError::rate_limited(
                "yahoo rate limited while fetching crumb",
            ));
        }
        if !response.is_success() {
            continue;
        }

        let body = response.body.trim();
        if body.contains("<html") || body.contains("<!DOCTYPE") {
            continue;
        }
        if body.to_ascii_lowercase().contains("too many requests") {
            return Err(SourceError::rate_limited(
                "yahoo rate limited while fetching crumb",
            ));
        }
        if !body.is_empty() && body.len() < 100 && !body.contains(char::is_whitespace) {
            return Ok(body.to_owned());
        }
    }

    Err(SourceError::unavailable(
        "failed to fetch yahoo crumb from all endpoints",
    ))
}

// ============================================================================
// Yahoo Adapter
// ============================================================================

/// Yahoo Finance adapter: chart endpoint for history, quote endpoint for names.
#[derive(Clone)]
pub struct YahooAdapter {
    http_client: Arc<dyn HttpClient>,
    auth: HttpAuth,
    auth_manager: Arc<YahooAuthManager>,
    circuit_breaker: Arc<CircuitBreaker>,
    timeout_ms: u64,
}

impl Default for YahooAdapter {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestHttpClient::new()))
    }
}

impl YahooAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            auth: HttpAuth::None,
            auth_manager: Arc::new(YahooAuthManager::default()),
            circuit_breaker: Arc::new(CircuitBreaker::default()),
            timeout_ms: 10_000,
        }
    }

    /// Extra authentication sent with every provider request, e.g. a pinned
    /// session cookie.
    pub fn with_auth(mut self, auth: HttpAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    pub fn with_auth_manager(mut self, auth_manager: Arc<YahooAuthManager>) -> Self {
        self.auth_manager = auth_manager;
        self
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// Send one GET through the circuit breaker.
    ///
    /// Transport errors, 429 and 5xx count as provider failures; any other
    /// status means the provider answered and resets the breaker.
    async fn send(&self, url: &str) -> Result<HttpResponse, SourceError> {
        if !self.circuit_breaker.allow_request() {
            return Err(SourceError::circuit_open(
                "yahoo circuit breaker is open; skipping upstream call",
            ));
        }

        let request = HttpRequest::get(url)
            .with_header("referer", REFERER)
            .with_auth(&self.auth)
            .with_timeout_ms(self.timeout_ms);

        let response = self.http_client.execute(request).await.map_err(|error| {
            self.circuit_breaker.record_failure();
            transport_error("yahoo transport error", &error)
        })?;

        if response.status == 429 || response.status >= 500 {
            self.circuit_breaker.record_failure();
        } else {
            self.circuit_breaker.record_success();
        }
        Ok(response)
    }

    async fn fetch_history(&self, req: &HistoryRequest) -> Result<PriceSeries, SourceError> {
        let url = chart_url(&req.symbol, &req.range.as_range_param());
        let response = self.send(&url).await?;
        let body = body_or_status_error(response, &req.symbol)?;
        parse_chart_series(&req.symbol, req.adjustment, &body)
    }

    async fn fetch_metadata(&self, symbol: &Symbol) -> Result<InstrumentMeta, SourceError> {
        match self.fetch_quote_metadata(symbol).await {
            Ok(meta) => Ok(meta),
            Err(error) if error.kind() == SourceErrorKind::NotFound => Err(error),
            Err(error) => {
                tracing::debug!(
                    symbol = %symbol,
                    code = error.code(),
                    "yahoo quote metadata failed; falling back to chart metadata"
                );
                self.fetch_chart_metadata(symbol).await
            }
        }
    }

    async fn fetch_quote_metadata(&self, symbol: &Symbol) -> Result<InstrumentMeta, SourceError> {
        let crumb = self
            .auth_manager
            .crumb(self.http_client.as_ref(), self.timeout_ms)
            .await?;
        let mut response = self.send(&quote_url(symbol, &crumb)).await?;

        // stale crumb: refresh once and retry
        if response.status == 401 || response.status == 403 {
            self.auth_manager.invalidate();
            let crumb = self
                .auth_manager
                .crumb(self.http_client.as_ref(), self.timeout_ms)
                .await?;
            response = self.send(&quote_url(symbol, &crumb)).await?;
        }

        let body = body_or_status_error(response, symbol)?;
        parse_quote_metadata(symbol, &body)
    }

    async fn fetch_chart_metadata(&self, symbol: &Symbol) -> Result<InstrumentMeta, SourceError> {
        let response = self.send(&chart_url(symbol, "1d")).await?;
        let body = body_or_status_error(response, symbol)?;
        let chart = parse_chart(&body)?;
        let result = first_chart_result(chart, symbol)?;
        let meta = result.meta.unwrap_or_default();
        Ok(InstrumentMeta {
            short_name: meta.short_name,
            long_name: meta.long_name,
            currency: meta.currency,
        })
    }
}

impl DataSource for YahooAdapter {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    fn metadata<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<InstrumentMeta, SourceError>> + Send + 'a>> {
        Box::pin(async move { self.fetch_metadata(symbol).await })
    }

    fn history<'a>(
        &'a self,
        req: HistoryRequest,
    ) -> Pin<Box<dyn Future<Output = Result<PriceSeries, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            if let crate::HistoryRange::Days(0) = req.range {
                return Err(SourceError::invalid_request(
                    "yahoo history range must cover at least one day",
                ));
            }
            self.fetch_history(&req).await
        })
    }
}

fn chart_url(symbol: &Symbol, range: &str) -> String {
    format!(
        "{CHART_BASE}/{}?range={}&interval=1d&includeAdjustedClose=true&events=div%2Csplit",
        urlencoding::encode(symbol.as_str()),
        urlencoding::encode(range)
    )
}

fn quote_url(symbol: &Symbol, crumb: &str) -> String {
    format!(
        "{QUOTE_BASE}?symbols={}&fields=shortName,longName,currency&crumb={}",
        urlencoding::encode(symbol.as_str()),
        urlencoding::encode(crumb)
    )
}

fn transport_error(context: &str, error: &HttpError) -> SourceError {
    if error.timed_out() {
        SourceError::timeout(format!("{context}: {}", error.message()))
    } else {
        SourceError::unavailable(format!("{context}: {}", error.message()))
    }
}

fn body_or_status_error(response: HttpResponse, symbol: &Symbol) -> Result<String, SourceError> {
    match response.status {
        200..=299 => Ok(response.body),
        404 => Err(SourceError::not_found(format!(
            "yahoo does not know symbol {symbol}"
        ))),
        429 => Err(SourceError::rate_limited("yahoo returned status 429")),
        status => Err(SourceError::unavailable(format!(
            "yahoo returned status {status}"
        ))),
    }
}

fn parse_chart(body: &str) -> Result<YahooChartData, SourceError> {
    let response: YahooChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::malformed(format!("failed to parse yahoo chart: {e}")))?;
    Ok(response.chart)
}

fn first_chart_result(chart: YahooChartData, symbol: &Symbol) -> Result<YahooChartResult, SourceError> {
    if let Some(error) = chart.error {
        return Err(error.into_source_error());
    }
    chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| SourceError::not_found(format!("yahoo returned no chart for {symbol}")))
}

/// Convert a chart payload into a date-keyed close series.
///
/// Timestamps are shifted by the exchange's `gmtoffset` before taking the
/// calendar date, so a bar stamped at the New York open lands on its own
/// trading day. Bars without a close are skipped.
fn parse_chart_series(
    symbol: &Symbol,
    adjustment: Adjustment,
    body: &str,
) -> Result<PriceSeries, SourceError> {
    let result = first_chart_result(parse_chart(body)?, symbol)?;

    let gmt_offset = result.meta.as_ref().and_then(|meta| meta.gmt_offset).unwrap_or(0);
    let timestamps = result.timestamp.unwrap_or_default();
    let raw = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|quote| quote.close)
        .unwrap_or_default();

    let closes = match adjustment {
        Adjustment::Raw => raw,
        Adjustment::SplitsAndDividends => result
            .indicators
            .adjclose
            .and_then(|series| series.into_iter().next())
            .map(|series| series.adjclose)
            .filter(|adjclose| !adjclose.is_empty())
            .unwrap_or(raw),
    };

    let points = timestamps
        .iter()
        .zip(closes)
        .filter_map(|(&ts, close)| {
            let close = close?;
            let local = OffsetDateTime::from_unix_timestamp(ts.saturating_add(gmt_offset)).ok()?;
            Some(PricePoint::new(local.date(), close))
        });

    Ok(PriceSeries::from_points(symbol.clone(), points))
}

fn parse_quote_metadata(symbol: &Symbol, body: &str) -> Result<InstrumentMeta, SourceError> {
    let response: YahooQuoteResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::malformed(format!("failed to parse yahoo quote: {e}")))?;

    if let Some(error) = response.quote_response.error {
        return Err(error.into_source_error());
    }

    let quote = response
        .quote_response
        .result
        .into_iter()
        .find(|quote| quote.symbol.eq_ignore_ascii_case(symbol.as_str()))
        .ok_or_else(|| SourceError::not_found(format!("yahoo returned no quote for {symbol}")))?;

    Ok(InstrumentMeta {
        short_name: quote.short_name,
        long_name: quote.long_name,
        currency: quote.currency,
    })
}

// ============================================================================
// Yahoo API Response Structures
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
struct YahooApiError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

impl YahooApiError {
    fn into_source_error(self) -> SourceError {
        let message = format!(
            "yahoo API error: {} ({})",
            self.code,
            self.description.as_deref().unwrap_or("no description")
        );
        if self.code.eq_ignore_ascii_case("not found") {
            SourceError::not_found(message)
        } else {
            SourceError::unavailable(message)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResponse {
    chart: YahooChartData,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartData {
    #[serde(default)]
    result: Option<Vec<YahooChartResult>>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartResult {
    #[serde(default)]
    meta: Option<YahooChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: YahooChartIndicators,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct YahooChartMeta {
    #[serde(default)]
    currency: Option<String>,
    #[serde(rename = "shortName", default)]
    short_name: Option<String>,
    #[serde(rename = "longName", default)]
    long_name: Option<String>,
    #[serde(rename = "gmtoffset", default)]
    gmt_offset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartIndicators {
    #[serde(default)]
    quote: Vec<YahooChartQuote>,
    #[serde(default)]
    adjclose: Option<Vec<YahooAdjClose>>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooAdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooQuoteResponse {
    #[serde(rename = "quoteResponse")]
    quote_response: YahooQuoteResponseData,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooQuoteResponseData {
    #[serde(default)]
    result: Vec<YahooQuoteData>,
    #[serde(default)]
    error: Option<YahooApiError>,
}

#[derive(Debug, Clone, Deserialize)]
struct YahooQuoteData {
    symbol: String,
    #[serde(rename = "shortName", default)]
    short_name: Option<String>,
    #[serde(rename = "longName", default)]
    long_name: Option<String>,
    #[serde(default)]
    currency: Option<String>,
}
