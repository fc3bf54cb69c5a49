//! Single-equity explorer
//!
//! Fetches a company profile and daily price history, derives a few
//! descriptive metrics and renders them as a text dashboard for people who
//! are new to investing. It includes:
//!
//! - Market data from Yahoo Finance behind the [`MarketDataSource`] trait
//! - MA20, CAGR over 1/3/5 years and annualized volatility
//! - An optional plain-language rewrite of the business summary
//! - Tables, text charts and a JSON export of the chart series
//!
//! # Example
//!
//! ```rust,ignore
//! use explorer_stock::{Analyzer, ExplorerConfig, NarrativeTranslator, Period, YahooMarketData};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ExplorerConfig::from_env()?;
//!     let source = YahooMarketData::new(config.request_timeout)?;
//!     let analyzer = Analyzer::new(source, NarrativeTranslator::from_config(&config));
//!
//!     let outcome = analyzer.analyze("AAPL", Period::OneYear).await;
//!     println!("{}", outcome.render(&config.chart_options()));
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod domain;
pub mod error;
pub mod market_data;
pub mod metrics;
pub mod narrative;
pub mod presentation;

// Re-export main types for convenience
pub use analysis::{AnalysisOutcome, Analyzer, ENTER_SYMBOL_NOTICE};
pub use config::{ExplorerConfig, LlmProviderKind, LlmSettings};
pub use domain::{CompanyProfile, Period, PricePoint, PriceSeries, Symbol};
pub use error::{Result, StockError};
pub use market_data::{MarketDataSource, YahooMarketData};
pub use metrics::{CagrRow, CagrTable, Metrics};
pub use narrative::{Language, Narrative, NarrativeRequest, NarrativeTranslator};
pub use presentation::{ChartData, ChartOptions, Report};
