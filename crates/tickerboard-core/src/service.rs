//! Cached entry points used by the rendering layer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::assembler::SnapshotAssembler;
use crate::cache::TtlCache;
use crate::clock::Clock;
use crate::config::TickerboardConfig;
use crate::data_source::DataSource;
use crate::gateway::MarketDataGateway;
use crate::retry::RetryConfig;
use crate::throttling::Throttle;
use crate::{ChartPeriod, LookbackWindow, PriceSeries, RefreshToken, Snapshot, Symbol};

/// Snapshot cache key: the full argument tuple of [`SnapshotService::get_snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    pub tickers: Vec<Symbol>,
    pub lookback: LookbackWindow,
    pub refresh_token: RefreshToken,
}

/// Chart cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChartKey {
    pub symbol: Symbol,
    pub period: ChartPeriod,
}

/// Snapshot and chart lookups behind TTL caches.
///
/// A hit returns the stored value without touching the provider. A miss
/// (no entry, expired entry, or a new refresh token) recomputes and stores.
#[derive(Debug, Clone)]
pub struct SnapshotService {
    assembler: SnapshotAssembler,
    snapshots: TtlCache<SnapshotKey, Snapshot>,
    charts: TtlCache<ChartKey, PriceSeries>,
    clock: Arc<dyn Clock>,
}

impl SnapshotService {
    pub fn new(
        assembler: SnapshotAssembler,
        clock: Arc<dyn Clock>,
        snapshot_ttl: Duration,
        chart_ttl: Duration,
    ) -> Self {
        Self {
            assembler,
            snapshots: TtlCache::new(snapshot_ttl, Arc::clone(&clock)),
            charts: TtlCache::new(chart_ttl, Arc::clone(&clock)),
            clock,
        }
    }

    /// Wire gateway, assembler and caches from configuration.
    pub fn from_config(
        config: &TickerboardConfig,
        source: Arc<dyn DataSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let gateway = MarketDataGateway::new(source)
            .with_throttle(Throttle::per_minute(config.requests_per_minute))
            .with_retry(RetryConfig::exponential(config.max_retries))
            .with_call_timeout(config.request_timeout());
        let assembler =
            SnapshotAssembler::new(Arc::new(gateway), Arc::clone(&clock), config.max_concurrency);
        Self::new(assembler, clock, config.snapshot_ttl(), config.chart_ttl())
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Snapshot for the given tickers, reused for the snapshot TTL.
    pub async fn get_snapshot(
        &self,
        tickers: &[Symbol],
        lookback: LookbackWindow,
        refresh_token: RefreshToken,
    ) -> Snapshot {
        let key = SnapshotKey {
            tickers: tickers.to_vec(),
            lookback,
            refresh_token,
        };
        let started = Instant::now();
        let computed = AtomicBool::new(false);

        let snapshot = self
            .snapshots
            .get_or_insert_with(key, || async {
                computed.store(true, Ordering::Relaxed);
                let mut snapshot = self.assembler.build_snapshot(tickers, lookback).await;
                snapshot.refresh_token = refresh_token;
                snapshot
            })
            .await;

        if computed.load(Ordering::Relaxed) {
            tracing::info!(
                rows = snapshot.len(),
                lookback_days = lookback.days(),
                refresh_token = refresh_token.value(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "snapshot computed"
            );
        } else {
            tracing::debug!(rows = snapshot.len(), "snapshot cache hit");
        }
        snapshot
    }

    /// Adjusted closes for charting, reused for the chart TTL.
    ///
    /// A provider failure yields an empty series and is not cached, so the
    /// next call tries again.
    pub async fn get_chart_history(&self, symbol: &Symbol, period: ChartPeriod) -> PriceSeries {
        let key = ChartKey {
            symbol: symbol.clone(),
            period,
        };
        let computed = AtomicBool::new(false);

        let result = self
            .charts
            .get_or_try_insert_with(key, || async {
                computed.store(true, Ordering::Relaxed);
                self.assembler.gateway().fetch_chart_history(symbol, period).await
            })
            .await;

        match result {
            Ok(series) => {
                if computed.load(Ordering::Relaxed) {
                    tracing::debug!(
                        symbol = %symbol,
                        period = %period,
                        points = series.len(),
                        "chart history fetched"
                    );
                } else {
                    tracing::debug!(symbol = %symbol, period = %period, "chart cache hit");
                }
                series
            }
            Err(error) => {
                tracing::warn!(
                    symbol = %symbol,
                    period = %period,
                    code = error.code(),
                    error = %error.message(),
                    "chart history unavailable"
                );
                PriceSeries::empty(symbol.clone())
            }
        }
    }

    /// Drop expired entries from both caches.
    pub async fn expire(&self) -> usize {
        self.snapshots.expire().await + self.charts.expire().await
    }
}
