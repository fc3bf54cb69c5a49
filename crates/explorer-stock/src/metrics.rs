//! Descriptive metrics derived from a price history
//!
//! Everything here is a pure function of a [`PriceSeries`]. Short or
//! degenerate input produces `None` entries, never an error or a panic.

use crate::domain::PriceSeries;
use chrono::Months;
use serde::{Deserialize, Serialize};
use ta::{Next, indicators::SimpleMovingAverage};

/// Window of the moving average drawn over the close price
pub const MA_WINDOW: usize = 20;

/// Trading days used to annualise daily volatility
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// CAGR horizons in years, ascending
pub const CAGR_HORIZONS: [u32; 3] = [1, 3, 5];

/// Simple moving average of closes, aligned with the series.
///
/// Entry `i` is the mean of closes `i + 1 - window ..= i`; entries before the
/// window fills are `None` rather than a partial average.
pub fn moving_average(series: &PriceSeries, window: usize) -> Vec<Option<f64>> {
    let Ok(mut sma) = SimpleMovingAverage::new(window) else {
        return vec![None; series.len()];
    };

    series
        .points()
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let value = sma.next(point.close);
            (i + 1 >= window).then_some(value)
        })
        .collect()
}

/// 20-day moving average
pub fn ma20(series: &PriceSeries) -> Vec<Option<f64>> {
    moving_average(series, MA_WINDOW)
}

/// `(end / start)^(1 / years) - 1`, or `None` for a non-positive base or horizon
pub fn compound_growth(start: f64, end: f64, years: f64) -> Option<f64> {
    if start <= 0.0 || years <= 0.0 {
        return None;
    }
    let rate = (end / start).powf(1.0 / years) - 1.0;
    rate.is_finite().then_some(rate)
}

/// Compound annual growth rate over the last `years` calendar years.
///
/// The window starts `years` years before the latest date (calendar
/// arithmetic: Feb 29 maps to Feb 28) and keeps every point on or after that
/// day. The first and last closes of the window are compared.
pub fn cagr(series: &PriceSeries, years: u32) -> Option<f64> {
    if years == 0 {
        return None;
    }

    let today = series.latest_date()?;
    let start_date = today.checked_sub_months(Months::new(years.checked_mul(12)?))?;

    let points = series.points();
    let window = &points[points.partition_point(|p| p.date < start_date)..];

    let (first, last) = (window.first()?, window.last()?);
    compound_growth(first.close, last.close, f64::from(years))
}

/// One line of the CAGR table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CagrRow {
    pub years: u32,
    pub label: String,
    /// Growth rate as a fraction (0.21 means 21%); `None` when unavailable
    pub value: Option<f64>,
}

/// CAGR for every horizon in [`CAGR_HORIZONS`], ascending
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CagrTable {
    pub rows: Vec<CagrRow>,
}

impl CagrTable {
    pub fn compute(series: &PriceSeries) -> Self {
        let rows = CAGR_HORIZONS
            .iter()
            .map(|&years| CagrRow {
                years,
                label: horizon_label(years),
                value: cagr(series, years),
            })
            .collect();
        Self { rows }
    }

    /// Value for a given horizon, if that horizon is in the table
    pub fn get(&self, years: u32) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| r.years == years)
            .and_then(|r| r.value)
    }
}

/// Convenience wrapper for [`CagrTable::compute`]
pub fn cagr_table(series: &PriceSeries) -> CagrTable {
    CagrTable::compute(series)
}

fn horizon_label(years: u32) -> String {
    if years == 1 {
        "1 year".to_string()
    } else {
        format!("{years} years")
    }
}

/// Day-over-day fractional changes of the close.
///
/// A change measured from a non-positive close has no meaning and is skipped.
pub fn daily_returns(series: &PriceSeries) -> Vec<f64> {
    series
        .points()
        .windows(2)
        .filter_map(|w| {
            let (prev, cur) = (w[0].close, w[1].close);
            (prev > 0.0).then(|| (cur - prev) / prev)
        })
        .collect()
}

/// Population standard deviation (divides by `n`)
fn population_std_dev(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt())
}

/// Annualised volatility: population std of daily returns times √252.
///
/// `None` when the series has fewer than two points or no usable return.
pub fn annualized_volatility(series: &PriceSeries) -> Option<f64> {
    if series.len() < 2 {
        return None;
    }
    population_std_dev(&daily_returns(series)).map(|sd| sd * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Every derived metric for one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Aligned with the series points
    pub ma20: Vec<Option<f64>>,
    pub cagr: CagrTable,
    pub volatility: Option<f64>,
}

impl Metrics {
    pub fn compute(series: &PriceSeries) -> Self {
        Self {
            ma20: ma20(series),
            cagr: CagrTable::compute(series),
            volatility: annualized_volatility(series),
        }
    }
}
