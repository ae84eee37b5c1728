//! Snapshot assembler: fans out per-symbol fetches and builds ordered rows.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::clock::Clock;
use crate::data_source::SourceError;
use crate::gateway::MarketDataGateway;
use crate::metrics::compute_metrics;
use crate::{LookbackWindow, PriceSeries, RefreshToken, Snapshot, SnapshotRow, Symbol};

/// Builds one [`Snapshot`] row per requested symbol.
///
/// Symbols are processed concurrently, bounded by `max_concurrency`. Provider
/// failures never fail the snapshot: each one is logged with its error code
/// and the affected figure is left absent.
#[derive(Debug, Clone)]
pub struct SnapshotAssembler {
    gateway: Arc<MarketDataGateway>,
    clock: Arc<dyn Clock>,
    permits: Arc<Semaphore>,
}

impl SnapshotAssembler {
    pub fn new(gateway: Arc<MarketDataGateway>, clock: Arc<dyn Clock>, max_concurrency: usize) -> Self {
        Self {
            gateway,
            clock,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    pub fn gateway(&self) -> &MarketDataGateway {
        &self.gateway
    }

    /// Rows come back in input order, duplicates included.
    pub async fn build_snapshot(&self, symbols: &[Symbol], lookback: LookbackWindow) -> Snapshot {
        let started = Instant::now();
        let mut rows: Vec<SnapshotRow> = symbols.iter().cloned().map(SnapshotRow::placeholder).collect();

        let mut tasks = JoinSet::new();
        for (index, symbol) in symbols.iter().cloned().enumerate() {
            let gateway = Arc::clone(&self.gateway);
            let permits = Arc::clone(&self.permits);
            tasks.spawn(async move {
                // the semaphore is never closed
                let _permit = permits.acquire_owned().await.ok();
                let row = build_row(&gateway, symbol, lookback).await;
                (index, row)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, row)) => rows[index] = row,
                // the placeholder row stays in place
                Err(error) => tracing::error!(error = %error, "snapshot row task failed"),
            }
        }

        tracing::debug!(
            rows = rows.len(),
            lookback_days = lookback.days(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "assembled snapshot"
        );

        Snapshot {
            generated_at: self.clock.now_utc(),
            lookback,
            refresh_token: RefreshToken::NONE,
            rows,
        }
    }
}

async fn build_row(gateway: &MarketDataGateway, symbol: Symbol, lookback: LookbackWindow) -> SnapshotRow {
    let (meta, short, window) = tokio::join!(
        gateway.fetch_metadata(&symbol),
        gateway.fetch_short_history(&symbol),
        gateway.fetch_window_history(&symbol, lookback),
    );

    let meta = absent_on_error(&symbol, "metadata", meta).unwrap_or_default();
    let short = absent_on_error(&symbol, "short_history", short)
        .unwrap_or_else(|| PriceSeries::empty(symbol.clone()));
    let window = absent_on_error(&symbol, "window_history", window)
        .unwrap_or_else(|| PriceSeries::empty(symbol.clone()));

    let metrics = compute_metrics(&short, &window);
    SnapshotRow::new(symbol, &meta, metrics)
}

fn absent_on_error<T>(symbol: &Symbol, operation: &'static str, result: Result<T, SourceError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::warn!(
                symbol = %symbol,
                operation,
                code = error.code(),
                error = %error.message(),
                "provider call failed; value left absent"
            );
            None
        }
    }
}
