use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::ValidationError;

/// Trailing window, in trading days, used for the growth computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct LookbackWindow(u32);

impl LookbackWindow {
    pub const MIN_DAYS: u32 = 182;
    pub const MAX_DAYS: u32 = 1095;
    pub const DEFAULT_DAYS: u32 = 252;

    pub fn new(days: u32) -> Result<Self, ValidationError> {
        if !(Self::MIN_DAYS..=Self::MAX_DAYS).contains(&days) {
            return Err(ValidationError::LookbackOutOfRange {
                days,
                min: Self::MIN_DAYS,
                max: Self::MAX_DAYS,
            });
        }
        Ok(Self(days))
    }

    pub const fn days(self) -> u32 {
        self.0
    }
}

impl Default for LookbackWindow {
    fn default() -> Self {
        Self(Self::DEFAULT_DAYS)
    }
}

impl Display for LookbackWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}d", self.0)
    }
}

impl TryFrom<u32> for LookbackWindow {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LookbackWindow> for u32 {
    fn from(value: LookbackWindow) -> Self {
        value.0
    }
}

/// Calendar period for chart history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartPeriod {
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
}

impl ChartPeriod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneMonth => "1mo",
            Self::ThreeMonths => "3mo",
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::TwoYears => "2y",
            Self::FiveYears => "5y",
        }
    }
}

impl Default for ChartPeriod {
    fn default() -> Self {
        Self::OneYear
    }
}

impl Display for ChartPeriod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartPeriod {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1mo" => Ok(Self::OneMonth),
            "3mo" => Ok(Self::ThreeMonths),
            "6mo" => Ok(Self::SixMonths),
            "1y" => Ok(Self::OneYear),
            "2y" => Ok(Self::TwoYears),
            "5y" => Ok(Self::FiveYears),
            _ => Err(ValidationError::InvalidChartPeriod {
                value: value.to_owned(),
            }),
        }
    }
}

/// Cache-key discriminator that only changes when a refresh is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RefreshToken(i64);

impl RefreshToken {
    /// The sentinel used for every render that did not ask for a refresh.
    pub const NONE: Self = Self(0);

    /// Token for a render: a fresh clock-derived value when `refresh` is set,
    /// the sentinel otherwise.
    pub fn for_render(refresh: bool, clock: &dyn Clock) -> Self {
        if refresh {
            Self(clock.now_utc().unix_timestamp())
        } else {
            Self::NONE
        }
    }

    pub const fn value(self) -> i64 {
        self.0
    }
}
