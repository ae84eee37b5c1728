//! Behavior tests for snapshot and chart caching.

mod support;

use std::sync::Arc;
use std::time::Duration;

use support::{service, symbols, Fixture, StubSource};
use tickerboard_core::{ChartPeriod, LookbackWindow, ManualClock, RefreshToken, Symbol};

fn watchlist_source() -> StubSource {
    StubSource::new()
        .with_fixture(
            "AAPL",
            Fixture::named("Apple Inc.", "USD")
                .with_short(&[180.0, 181.5])
                .with_window(&[150.0, 160.0, 181.5]),
        )
        .with_fixture(
            "MSFT",
            Fixture::named("Microsoft", "USD")
                .with_short(&[370.0, 368.0])
                .with_window(&[300.0, 340.0, 368.0]),
        )
}

#[tokio::test]
async fn identical_requests_within_ttl_hit_the_provider_once() {
    // Given
    let source = Arc::new(watchlist_source());
    let clock = Arc::new(ManualClock::starting_at_unix(1_704_488_400));
    let service = service(Arc::clone(&source), Arc::clone(&clock));
    let tickers = symbols("AAPL,MSFT");

    // When: the same snapshot is requested twice, 119 s apart
    let first = service
        .get_snapshot(&tickers, LookbackWindow::default(), RefreshToken::NONE)
        .await;
    let calls = source.total_calls();
    clock.advance(Duration::from_secs(119));
    let second = service
        .get_snapshot(&tickers, LookbackWindow::default(), RefreshToken::NONE)
        .await;

    // Then: the second answer is the stored one
    assert_eq!(first, second);
    assert_eq!(source.total_calls(), calls);
    // 2 symbols x (metadata + short + window)
    assert_eq!(calls, 6);
}

#[tokio::test]
async fn expired_snapshot_is_recomputed() {
    let source = Arc::new(watchlist_source());
    let clock = Arc::new(ManualClock::starting_at_unix(1_704_488_400));
    let service = service(Arc::clone(&source), Arc::clone(&clock));
    let tickers = symbols("AAPL,MSFT");

    let first = service
        .get_snapshot(&tickers, LookbackWindow::default(), RefreshToken::NONE)
        .await;
    clock.advance(Duration::from_secs(120));
    let second = service
        .get_snapshot(&tickers, LookbackWindow::default(), RefreshToken::NONE)
        .await;

    assert_eq!(source.total_calls(), 12);
    assert_eq!(
        second.generated_at.unix_timestamp() - first.generated_at.unix_timestamp(),
        120
    );
}

#[tokio::test]
async fn a_new_refresh_token_bypasses_the_stored_snapshot() {
    let source = Arc::new(watchlist_source());
    let clock = Arc::new(ManualClock::starting_at_unix(1_704_488_400));
    let service = service(Arc::clone(&source), Arc::clone(&clock));
    let tickers = symbols("AAPL,MSFT");

    service
        .get_snapshot(&tickers, LookbackWindow::default(), RefreshToken::NONE)
        .await;
    let calls = source.total_calls();

    // When: only the token changes
    let token = RefreshToken::for_render(true, clock.as_ref());
    let refreshed = service
        .get_snapshot(&tickers, LookbackWindow::default(), token)
        .await;

    // Then: the provider is called again and the token is recorded
    assert_eq!(source.total_calls(), calls * 2);
    assert_eq!(refreshed.refresh_token, token);
    assert_eq!(token.value(), 1_704_488_400);

    // And: going back to the sentinel reuses the original entry
    service
        .get_snapshot(&tickers, LookbackWindow::default(), RefreshToken::NONE)
        .await;
    assert_eq!(source.total_calls(), calls * 2);
}

#[tokio::test]
async fn lookback_and_ticker_order_are_part_of_the_key() {
    let source = Arc::new(watchlist_source());
    let clock = Arc::new(ManualClock::new());
    let service = service(Arc::clone(&source), clock);

    service
        .get_snapshot(&symbols("AAPL,MSFT"), LookbackWindow::default(), RefreshToken::NONE)
        .await;
    service
        .get_snapshot(
            &symbols("AAPL,MSFT"),
            LookbackWindow::new(504).expect("valid lookback"),
            RefreshToken::NONE,
        )
        .await;
    service
        .get_snapshot(&symbols("MSFT,AAPL"), LookbackWindow::default(), RefreshToken::NONE)
        .await;

    assert_eq!(source.total_calls(), 18);
}

#[tokio::test]
async fn concurrent_identical_requests_share_one_computation() {
    // Given: a slow provider
    let source = Arc::new(watchlist_source().with_delay(Duration::from_millis(30)));
    let service = service(Arc::clone(&source), Arc::new(ManualClock::new()));
    let tickers = symbols("AAPL,MSFT");

    // When: three callers ask for the same snapshot at once
    let (a, b, c) = tokio::join!(
        service.get_snapshot(&tickers, LookbackWindow::default(), RefreshToken::NONE),
        service.get_snapshot(&tickers, LookbackWindow::default(), RefreshToken::NONE),
        service.get_snapshot(&tickers, LookbackWindow::default(), RefreshToken::NONE),
    );

    // Then: one computation served all of them
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(source.total_calls(), 6);
}

#[tokio::test]
async fn chart_history_is_cached_for_its_own_ttl() {
    let source = Arc::new(watchlist_source());
    let clock = Arc::new(ManualClock::new());
    let service = service(Arc::clone(&source), Arc::clone(&clock));
    let symbol = Symbol::parse("AAPL").expect("valid symbol");

    let first = service.get_chart_history(&symbol, ChartPeriod::OneYear).await;
    clock.advance(Duration::from_secs(299));
    let second = service.get_chart_history(&symbol, ChartPeriod::OneYear).await;
    assert_eq!(first, second);
    assert_eq!(source.history_calls(), 1);
    assert_eq!(first.len(), 3);

    // a different period is a different entry
    service.get_chart_history(&symbol, ChartPeriod::SixMonths).await;
    assert_eq!(source.history_calls(), 2);

    clock.advance(Duration::from_secs(1));
    service.get_chart_history(&symbol, ChartPeriod::OneYear).await;
    assert_eq!(source.history_calls(), 3);
}

#[tokio::test]
async fn unknown_chart_symbol_gives_an_empty_series() {
    let source = Arc::new(watchlist_source());
    let service = service(Arc::clone(&source), Arc::new(ManualClock::new()));
    let symbol = Symbol::parse("ZZZZ").expect("valid symbol");

    let series = service.get_chart_history(&symbol, ChartPeriod::OneYear).await;
    assert!(series.is_empty());

    // failures are not cached
    service.get_chart_history(&symbol, ChartPeriod::OneYear).await;
    assert_eq!(source.history_calls(), 2);
}
