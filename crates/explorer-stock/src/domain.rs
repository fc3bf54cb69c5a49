//! Core data model: tickers, periods, price history and company profiles

use crate::error::StockError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A normalised ticker symbol (trimmed, uppercase, never empty)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Normalise user input into a symbol.
    ///
    /// Returns `None` for empty or whitespace-only input.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_uppercase()))
        }
    }

    /// The normalised ticker text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| StockError::InvalidSymbol(s.to_string()))
    }
}

/// History window offered by the period selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    /// Last six months
    #[default]
    #[serde(rename = "6mo")]
    SixMonths,
    /// Last year
    #[serde(rename = "1y")]
    OneYear,
    /// Last five years
    #[serde(rename = "5y")]
    FiveYears,
    /// Full available history
    #[serde(rename = "max")]
    Max,
}

impl Period {
    /// Every period, in selector order
    pub const ALL: [Self; 4] = [Self::SixMonths, Self::OneYear, Self::FiveYears, Self::Max];

    /// Provider range token ("6mo", "1y", "5y", "max")
    pub fn as_token(self) -> &'static str {
        match self {
            Self::SixMonths => "6mo",
            Self::OneYear => "1y",
            Self::FiveYears => "5y",
            Self::Max => "max",
        }
    }

    /// Human label for headings
    pub fn label(self) -> &'static str {
        match self {
            Self::SixMonths => "6 months",
            Self::OneYear => "1 year",
            Self::FiveYears => "5 years",
            Self::Max => "full history",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

impl FromStr for Period {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_token() == token)
            .ok_or_else(|| StockError::InvalidPeriod(s.to_string()))
    }
}

/// One trading day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: u64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64, volume: u64) -> Self {
        Self { date, close, volume }
    }
}

/// Daily price history, ascending by date with unique dates.
///
/// The ordering invariant is established by [`PriceSeries::new`] and cannot
/// be broken afterwards: there is no mutable access to the points.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from raw provider rows.
    ///
    /// Rows are sorted by date, rows with a non-finite close are dropped and,
    /// when a date repeats, the row that came last wins.
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        points.retain(|p| p.close.is_finite());
        points.sort_by_key(|p| p.date);

        let mut unique: Vec<PricePoint> = Vec::with_capacity(points.len());
        for point in points {
            match unique.last_mut() {
                Some(last) if last.date == point.date => *last = point,
                _ => unique.push(point),
            }
        }

        Self { points: unique }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Closing prices in date order
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
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

    /// Date of the most recent point
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.last().map(|p| p.date)
    }
}

/// Descriptive company data. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: Option<String>,
    pub summary: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub country: Option<String>,
    pub logo_url: Option<String>,
    pub current_price: Option<f64>,
    /// Daily change in percent (1.5 means +1.5%)
    pub change_percent: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume: Option<u64>,
    pub average_volume: Option<u64>,
    pub pe_ratio: Option<f64>,
    pub eps: Option<f64>,
    pub beta: Option<f64>,
    pub next_earnings: Option<NaiveDate>,
}

impl CompanyProfile {
    /// A profile without a current price is treated as an unknown symbol
    pub fn has_price(&self) -> bool {
        self.current_price.is_some_and(f64::is_finite)
    }
}
