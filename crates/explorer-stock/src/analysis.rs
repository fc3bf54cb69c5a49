//! Request pipeline: ticker in, dashboard outcome out
//!
//! Each call fetches fresh data and recomputes everything; nothing is shared
//! between requests.

use crate::domain::{Period, Symbol};
use crate::market_data::MarketDataSource;
use crate::metrics::Metrics;
use crate::narrative::{NarrativeRequest, NarrativeTranslator};
use crate::presentation::{ChartOptions, Report};
use serde_json::json;
use tracing::{info, instrument, warn};

/// Notice shown when the ticker input is blank
pub const ENTER_SYMBOL_NOTICE: &str = "Please enter a ticker symbol.";

/// Result of one analysis request
#[derive(Debug)]
pub enum AnalysisOutcome {
    /// Blank input; nothing was fetched
    EmptyTicker,
    /// The data source has no usable data for this ticker
    SymbolNotFound { symbol: Symbol },
    /// Fetching failed; carries the underlying error text
    ProviderError { message: String },
    Success(Box<Report>),
}

impl AnalysisOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Text shown to the user for this outcome
    pub fn render(&self, options: &ChartOptions) -> String {
        match self {
            Self::EmptyTicker => ENTER_SYMBOL_NOTICE.to_string(),
            Self::SymbolNotFound { symbol } => {
                format!("Warning: symbol '{symbol}' not found. Check the ticker and try again.")
            }
            Self::ProviderError { message } => format!("Error: {message}"),
            Self::Success(report) => report.render_text(options),
        }
    }

    /// Short machine-readable name of the outcome kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmptyTicker => "empty_ticker",
            Self::SymbolNotFound { .. } => "symbol_not_found",
            Self::ProviderError { .. } => "provider_error",
            Self::Success(_) => "success",
        }
    }

    /// JSON form: the full report on success, otherwise
    /// `{"outcome": ..., "message": ...}` plus the symbol when known
    pub fn to_json(&self) -> crate::Result<String> {
        let message = match self {
            Self::Success(report) => return report.to_json(),
            Self::EmptyTicker => ENTER_SYMBOL_NOTICE.to_string(),
            Self::SymbolNotFound { symbol } => format!("symbol '{symbol}' not found"),
            Self::ProviderError { message } => message.clone(),
        };

        let mut value = json!({ "outcome": self.kind(), "message": message });
        if let Self::SymbolNotFound { symbol } = self {
            value["symbol"] = json!(symbol.as_str());
        }
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

/// Runs the fetch, translate, compute sequence against a data source
pub struct Analyzer<S> {
    source: S,
    translator: NarrativeTranslator,
}

impl<S: MarketDataSource> Analyzer<S> {
    pub fn new(source: S, translator: NarrativeTranslator) -> Self {
        Self { source, translator }
    }

    pub fn translator(&self) -> &NarrativeTranslator {
        &self.translator
    }

    /// Analyze `raw_ticker` over `period`
    #[instrument(skip_all, fields(ticker = raw_ticker, period = %period))]
    pub async fn analyze(&self, raw_ticker: &str, period: Period) -> AnalysisOutcome {
        let Some(symbol) = Symbol::parse(raw_ticker) else {
            return AnalysisOutcome::EmptyTicker;
        };

        let profile = match self.source.fetch_profile(&symbol).await {
            Ok(profile) if profile.has_price() => profile,
            Ok(_) => {
                warn!(%symbol, "No current price, treating as unknown symbol");
                return AnalysisOutcome::SymbolNotFound { symbol };
            }
            Err(e) => return failure(symbol, e),
        };

        let narrative = self
            .translator
            .translate(&NarrativeRequest::from_profile(&profile))
            .await;

        let series = match self.source.fetch_history(&symbol, period).await {
            Ok(series) => series,
            Err(e) => return failure(symbol, e),
        };

        let metrics = Metrics::compute(&series);
        info!(
            %symbol,
            points = series.len(),
            translated = narrative.translated,
            "Analysis complete"
        );

        AnalysisOutcome::Success(Box::new(Report::new(
            symbol, period, profile, narrative, series, metrics,
        )))
    }
}

fn failure(symbol: Symbol, error: crate::StockError) -> AnalysisOutcome {
    if error.is_not_found() {
        warn!(%symbol, "Symbol not found");
        AnalysisOutcome::SymbolNotFound { symbol }
    } else {
        warn!(%symbol, "Data provider failed: {error}");
        AnalysisOutcome::ProviderError {
            message: error.to_string(),
        }
    }
}
