//! Contract tests for the Yahoo adapter against canned HTTP responses.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tickerboard_core::{
    Adjustment, ChartPeriod, DataSource, HistoryRange, HistoryRequest, HttpAuth, HttpClient,
    HttpError, HttpRequest, HttpResponse, SourceErrorKind, Symbol, YahooAdapter,
};

/// Answers by URL fragment; the first matching route wins.
#[derive(Default)]
struct CannedHttpClient {
    routes: Vec<(String, Result<HttpResponse, HttpError>)>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl CannedHttpClient {
    fn route(mut self, fragment: &str, response: Result<HttpResponse, HttpError>) -> Self {
        self.routes.push((fragment.to_owned(), response));
        self
    }

    fn seen(&self) -> Vec<HttpRequest> {
        self.seen.lock().expect("request log should not be poisoned").clone()
    }
}

impl HttpClient for CannedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        let response = self
            .routes
            .iter()
            .find(|(fragment, _)| request.url.contains(fragment.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| Err(HttpError::new(format!("no route for {}", request.url))));
        self.seen
            .lock()
            .expect("request log should not be poisoned")
            .push(request);
        Box::pin(async move { response })
    }
}

// Out-of-order timestamps, a repeated trading day and a null close.
const CHART_FIXTURE: &str = r#"{
  "chart": {
    "result": [{
      "meta": {"currency": "USD", "symbol": "MSFT", "longName": "Microsoft Corporation", "gmtoffset": -18000},
      "timestamp": [1704292200, 1704205800, 1704378600, 1704378660, 1704465000],
      "indicators": {
        "quote": [{"close": [370.60, 370.87, 367.94, 368.00, null]}],
        "adjclose": [{"adjclose": [368.10, 368.37, 365.46, 365.52, null]}]
      }
    }],
    "error": null
  }
}"#;

const QUOTE_FIXTURE: &str = r#"{
  "quoteResponse": {
    "result": [{"symbol": "MSFT", "shortName": "Microsoft Corporation", "longName": "Microsoft Corporation", "currency": "USD"}],
    "error": null
  }
}"#;

fn msft() -> Symbol {
    Symbol::parse("MSFT").expect("valid symbol")
}

fn adapter(client: CannedHttpClient) -> (YahooAdapter, Arc<CannedHttpClient>) {
    let client = Arc::new(client);
    (YahooAdapter::new(client.clone()), client)
}

#[tokio::test]
async fn history_is_date_ordered_without_duplicates() {
    let (adapter, _) = adapter(
        CannedHttpClient::default().route("/v8/finance/chart/MSFT", Ok(HttpResponse::ok_json(CHART_FIXTURE))),
    );

    let series = adapter
        .history(HistoryRequest::new(msft(), HistoryRange::Days(5), Adjustment::Raw))
        .await
        .expect("history should parse");

    let dates: Vec<String> = series.points().iter().map(|p| p.date.to_string()).collect();
    assert_eq!(dates, vec!["2024-01-02", "2024-01-03", "2024-01-04"]);
    // the later bar of a repeated day wins
    assert_eq!(series.last().map(|p| p.close), Some(368.00));
    assert!(series.points().windows(2).all(|w| w[0].date < w[1].date));
}

#[tokio::test]
async fn adjusted_history_reads_adjclose() {
    let (adapter, client) = adapter(
        CannedHttpClient::default().route("/v8/finance/chart/MSFT", Ok(HttpResponse::ok_json(CHART_FIXTURE))),
    );

    let series = adapter
        .history(HistoryRequest::new(msft(), ChartPeriod::OneYear, Adjustment::SplitsAndDividends))
        .await
        .expect("history should parse");

    assert_eq!(series.first().map(|p| p.close), Some(368.37));
    let urls: Vec<String> = client.seen().into_iter().map(|r| r.url).collect();
    assert!(urls[0].contains("range=1y"));
    assert!(urls[0].contains("interval=1d"));
}

#[tokio::test]
async fn failures_are_classified_by_kind() {
    let cases: Vec<(Result<HttpResponse, HttpError>, SourceErrorKind)> = vec![
        (
            Ok(HttpResponse::with_status(
                404,
                r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
            )),
            SourceErrorKind::NotFound,
        ),
        (
            Ok(HttpResponse::ok_json(
                r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#,
            )),
            SourceErrorKind::NotFound,
        ),
        (Ok(HttpResponse::ok_json("<html>blocked</html>")), SourceErrorKind::Malformed),
        (Ok(HttpResponse::with_status(429, "Too Many Requests")), SourceErrorKind::RateLimited),
        (Ok(HttpResponse::with_status(503, "")), SourceErrorKind::Unavailable),
        (Err(HttpError::new("connection refused")), SourceErrorKind::Unavailable),
        (Err(HttpError::timeout("deadline elapsed")), SourceErrorKind::Timeout),
    ];

    for (response, expected) in cases {
        let (adapter, _) = adapter(CannedHttpClient::default().route("/v8/finance/chart/", response));
        let error = adapter
            .history(HistoryRequest::new(msft(), HistoryRange::Days(5), Adjustment::Raw))
            .await
            .expect_err("request should fail");
        assert_eq!(error.kind(), expected, "unexpected classification: {error}");
    }
}

#[tokio::test]
async fn metadata_comes_from_the_quote_endpoint_with_a_crumb() {
    let (adapter, client) = adapter(
        CannedHttpClient::default()
            .route("fc.yahoo.com", Ok(HttpResponse::with_status(404, "")))
            .route("/v1/test/getcrumb", Ok(HttpResponse::ok_json("Xy7.crumb")))
            .route("/v7/finance/quote", Ok(HttpResponse::ok_json(QUOTE_FIXTURE))),
    );

    let meta = adapter.metadata(&msft()).await.expect("metadata");

    assert_eq!(meta.display_name(), Some("Microsoft Corporation"));
    assert_eq!(meta.currency(), Some("USD"));
    let quote = client
        .seen()
        .into_iter()
        .find(|request| request.url.contains("/v7/finance/quote"))
        .expect("quote endpoint called");
    assert!(quote.url.contains("symbols=MSFT"));
    assert!(quote.url.contains("crumb=Xy7.crumb"));
}

#[tokio::test]
async fn rejected_crumb_is_refreshed_once() {
    let (adapter, client) = adapter(
        CannedHttpClient::default()
            .route("fc.yahoo.com", Ok(HttpResponse::with_status(404, "")))
            .route("/v1/test/getcrumb", Ok(HttpResponse::ok_json("stale")))
            .route("/v7/finance/quote", Ok(HttpResponse::with_status(401, "Unauthorized")))
            .route("/v8/finance/chart/MSFT", Ok(HttpResponse::ok_json(CHART_FIXTURE))),
    );

    // the quote endpoint keeps refusing, so metadata falls back to chart meta
    let meta = adapter.metadata(&msft()).await.expect("fallback metadata");
    assert_eq!(meta.display_name(), Some("Microsoft Corporation"));

    let seen = client.seen();
    let crumb_fetches = seen.iter().filter(|r| r.url.contains("getcrumb")).count();
    let quote_calls = seen.iter().filter(|r| r.url.contains("/v7/finance/quote")).count();
    assert_eq!(crumb_fetches, 2);
    assert_eq!(quote_calls, 2);
}

#[tokio::test]
async fn pinned_cookie_is_sent_with_provider_requests() {
    let client = Arc::new(
        CannedHttpClient::default().route("/v8/finance/chart/MSFT", Ok(HttpResponse::ok_json(CHART_FIXTURE))),
    );
    let adapter = YahooAdapter::new(client.clone())
        .with_auth(HttpAuth::Cookie(String::from("A3=d=session")))
        .with_timeout_ms(2_500);

    adapter
        .history(HistoryRequest::new(msft(), HistoryRange::Days(5), Adjustment::Raw))
        .await
        .expect("history");

    let request = &client.seen()[0];
    assert_eq!(request.headers.get("cookie").map(String::as_str), Some("A3=d=session"));
    assert_eq!(request.timeout_ms, 2_500);
}

#[tokio::test]
async fn empty_range_is_rejected_before_any_request() {
    let (adapter, client) = adapter(CannedHttpClient::default());

    let error = adapter
        .history(HistoryRequest::new(msft(), HistoryRange::Days(0), Adjustment::Raw))
        .await
        .expect_err("zero-day range");

    assert_eq!(error.kind(), SourceErrorKind::InvalidRequest);
    assert!(client.seen().is_empty());
}
