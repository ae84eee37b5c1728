//! Runtime configuration read from `TICKERBOARD_*` environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `TICKERBOARD_TICKERS` | `AAPL,MSFT,NVDA,AMZN,TSLA` |
//! | `TICKERBOARD_LOOKBACK_DAYS` | `252` |
//! | `TICKERBOARD_SNAPSHOT_TTL_SECS` | `120` |
//! | `TICKERBOARD_CHART_TTL_SECS` | `300` |
//! | `TICKERBOARD_TIMEOUT_MS` | `10000` |
//! | `TICKERBOARD_MAX_RETRIES` | `2` |
//! | `TICKERBOARD_MAX_CONCURRENCY` | `4` |
//! | `TICKERBOARD_REQUESTS_PER_MINUTE` | `120` |
//! | `TICKERBOARD_TIMEZONE` | `Europe/Berlin` |
//! | `YAHOO_COOKIE` | unset |
//!
//! Loading a `.env` file is left to the binary.

use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::{LookbackWindow, DEFAULT_TIMEZONE};

pub const DEFAULT_TICKERS: &str = "AAPL,MSFT,NVDA,AMZN,TSLA";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerboardConfig {
    /// Raw ticker text, normalized at use.
    pub default_tickers: String,
    pub default_lookback: LookbackWindow,
    pub snapshot_ttl_secs: u64,
    pub chart_ttl_secs: u64,
    pub request_timeout_ms: u64,
    pub max_retries: u32,
    pub max_concurrency: usize,
    pub requests_per_minute: u32,
    /// Zone used when showing timestamps.
    pub timezone: Tz,
    /// Pinned Yahoo session cookie. Never serialized.
    #[serde(skip)]
    pub yahoo_cookie: Option<String>,
}

impl Default for TickerboardConfig {
    fn default() -> Self {
        Self {
            default_tickers: DEFAULT_TICKERS.to_owned(),
            default_lookback: LookbackWindow::default(),
            snapshot_ttl_secs: 120,
            chart_ttl_secs: 300,
            request_timeout_ms: 10_000,
            max_retries: 2,
            max_concurrency: 4,
            requests_per_minute: 120,
            timezone: DEFAULT_TIMEZONE,
            yahoo_cookie: None,
        }
    }
}

impl TickerboardConfig {
    /// Defaults overridden by the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidConfig`] (or the lookback/zone
    /// validation error) for a variable that is set but malformed.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let value = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(tickers) = value("TICKERBOARD_TICKERS") {
            config.default_tickers = tickers;
        }
        if let Some(raw) = value("TICKERBOARD_LOOKBACK_DAYS") {
            config.default_lookback = LookbackWindow::new(parse("TICKERBOARD_LOOKBACK_DAYS", &raw)?)?;
        }
        if let Some(raw) = value("TICKERBOARD_SNAPSHOT_TTL_SECS") {
            config.snapshot_ttl_secs = parse("TICKERBOARD_SNAPSHOT_TTL_SECS", &raw)?;
        }
        if let Some(raw) = value("TICKERBOARD_CHART_TTL_SECS") {
            config.chart_ttl_secs = parse("TICKERBOARD_CHART_TTL_SECS", &raw)?;
        }
        if let Some(raw) = value("TICKERBOARD_TIMEOUT_MS") {
            config.request_timeout_ms = positive("TICKERBOARD_TIMEOUT_MS", &raw)?;
        }
        if let Some(raw) = value("TICKERBOARD_MAX_RETRIES") {
            config.max_retries = parse("TICKERBOARD_MAX_RETRIES", &raw)?;
        }
        if let Some(raw) = value("TICKERBOARD_MAX_CONCURRENCY") {
            config.max_concurrency = positive("TICKERBOARD_MAX_CONCURRENCY", &raw)?;
        }
        if let Some(raw) = value("TICKERBOARD_REQUESTS_PER_MINUTE") {
            config.requests_per_minute = positive("TICKERBOARD_REQUESTS_PER_MINUTE", &raw)?;
        }
        if let Some(raw) = value("TICKERBOARD_TIMEZONE") {
            config.timezone = crate::parse_timezone(&raw)?;
        }
        config.yahoo_cookie = value("YAHOO_COOKIE");

        Ok(config)
    }

    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }

    pub fn chart_ttl(&self) -> Duration {
        Duration::from_secs(self.chart_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn parse<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ValidationError> {
    raw.trim()
        .parse()
        .map_err(|_| ValidationError::InvalidConfig {
            key,
            value: raw.to_owned(),
        })
}

fn positive<T: FromStr + PartialOrd + Default>(key: &'static str, raw: &str) -> Result<T, ValidationError> {
    let value: T = parse(key, raw)?;
    if value > T::default() {
        Ok(value)
    } else {
        Err(ValidationError::InvalidConfig {
            key,
            value: raw.to_owned(),
        })
    }
}
