use serde::{Deserialize, Serialize};
use time::Date;

use crate::Symbol;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// One daily close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub close: f64,
}

impl PricePoint {
    pub const fn new(date: Date, close: f64) -> Self {
        Self { date, close }
    }
}

/// Daily closes for one symbol, strictly increasing by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: Symbol,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from raw points in any order.
    ///
    /// Points with a non-finite close are dropped, the rest are sorted by date,
    /// and for a repeated date the point that came last in the input wins.
    pub fn from_points(symbol: Symbol, points: impl IntoIterator<Item = PricePoint>) -> Self {
        let mut points: Vec<PricePoint> = points
            .into_iter()
            .filter(|point| point.close.is_finite())
            .collect();

        // stable sort keeps input order within a date, so the last one is kept
        points.sort_by_key(|point| point.date);
        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match deduped.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => deduped.push(point),
            }
        }

        Self {
            symbol,
            points: deduped,
        }
    }

    pub fn empty(symbol: Symbol) -> Self {
        Self {
            symbol,
            points: Vec::new(),
        }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// The point before the most recent one.
    pub fn previous(&self) -> Option<&PricePoint> {
        self.points.len().checked_sub(2).map(|index| &self.points[index])
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|point| point.close)
    }
}
