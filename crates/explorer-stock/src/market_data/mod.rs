//! Market data sources
//!
//! The analysis pipeline only sees the [`MarketDataSource`] trait; Yahoo
//! Finance is the production implementation.

pub mod yahoo;

use crate::domain::{CompanyProfile, Period, PriceSeries, Symbol};
use crate::error::Result;
use async_trait::async_trait;

pub use yahoo::YahooMarketData;

/// Supplies company metadata and daily history for a ticker.
///
/// Implementations must return [`crate::StockError::SymbolNotFound`] when the
/// ticker is unknown so callers can tell it apart from provider failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Descriptive profile plus the latest quote fields
    async fn fetch_profile(&self, symbol: &Symbol) -> Result<CompanyProfile>;

    /// Daily closes and volumes covering `period`
    async fn fetch_history(&self, symbol: &Symbol, period: Period) -> Result<PriceSeries>;
}
