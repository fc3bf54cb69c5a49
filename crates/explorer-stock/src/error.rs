//! Error types for fetching and analysing market data

use thiserror::Error;

/// Errors raised while fetching or preparing stock data.
///
/// Metric computations never produce these; they degrade to `None` instead.
#[derive(Debug, Error)]
pub enum StockError {
    /// The ticker could not be normalised (empty or whitespace only)
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Period token outside the supported set
    #[error("Invalid period '{0}', expected one of 6mo, 1y, 5y, max")]
    InvalidPeriod(String),

    /// The data source has no usable data for this ticker
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// Rate limit exceeded for the data provider
    #[error("Rate limit exceeded for {provider}")]
    RateLimitExceeded { provider: String },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// Prompt template could not be rendered
    #[error("Template error: {0}")]
    TemplateError(#[from] minijinja::Error),

    /// Text-generation provider error
    #[error("Text generation error: {0}")]
    LlmError(#[from] explorer_llm::LLMError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StockError {
    /// Whether this error means "no such symbol" rather than a provider failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SymbolNotFound(_))
    }
}

/// Result type alias for stock operations
pub type Result<T> = std::result::Result<T, StockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StockError::SymbolNotFound("ZZZZ".to_string());
        assert_eq!(err.to_string(), "Symbol not found: ZZZZ");
        assert!(err.is_not_found());

        let err = StockError::RateLimitExceeded {
            provider: "Yahoo Finance".to_string(),
        };
        assert_eq!(err.to_string(), "Rate limit exceeded for Yahoo Finance");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_llm_error_conversion() {
        let err: StockError = explorer_llm::LLMError::AuthenticationFailed.into();
        assert!(matches!(err, StockError::LlmError(_)));
        assert!(err.to_string().starts_with("Text generation error"));
    }
}
