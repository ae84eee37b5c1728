use thiserror::Error;

/// Validation and contract errors exposed by `tickerboard-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,

    #[error("lookback {days} is outside the supported range {min}..={max} trading days")]
    LookbackOutOfRange { days: u32, min: u32, max: u32 },

    #[error("invalid chart period '{value}', expected one of 1mo, 3mo, 6mo, 1y, 2y, 5y")]
    InvalidChartPeriod { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("unknown time zone '{value}', expected an IANA name such as Europe/Berlin")]
    InvalidTimezone { value: String },

    #[error("invalid value '{value}' for config key {key}")]
    InvalidConfig { key: &'static str, value: String },
}

