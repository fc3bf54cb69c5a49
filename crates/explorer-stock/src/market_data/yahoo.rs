//! Yahoo Finance market data
//!
//! Daily history comes from the chart API through `yahoo_finance_api`.
//! The company profile comes from the `quoteSummary` endpoint, which needs a
//! session cookie and a matching crumb token.

use crate::domain::{CompanyProfile, Period, PricePoint, PriceSeries, Symbol};
use crate::error::{Result, StockError};
use crate::market_data::MarketDataSource;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;
use yahoo_finance_api as yahoo;

const PROVIDER: &str = "Yahoo Finance";
const COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const SUMMARY_MODULES: &str = "price,summaryDetail,defaultKeyStatistics,assetProfile,calendarEvents";
const LOGO_SERVICE_URL: &str = "https://logo.clearbit.com";
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Yahoo Finance implementation of [`MarketDataSource`]
pub struct YahooMarketData {
    client: reqwest::Client,
    connector: yahoo::YahooConnector,
    crumb: Mutex<Option<String>>,
}

impl YahooMarketData {
    /// Create a client whose HTTP calls time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .timeout(timeout)
            .build()?;
        Self::with_client(client)
    }

    /// Create a client on top of a preconfigured HTTP client.
    ///
    /// The client needs a cookie store for the crumb handshake to work.
    pub fn with_client(client: reqwest::Client) -> Result<Self> {
        let connector = yahoo::YahooConnector::new()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        Ok(Self {
            client,
            connector,
            crumb: Mutex::new(None),
        })
    }

    /// Crumb for the current cookie session, fetched on first use
    async fn crumb(&self) -> Result<String> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // Only the Set-Cookie header matters here; fc.yahoo.com answers 404.
        if let Err(e) = self.client.get(COOKIE_URL).send().await {
            debug!("Cookie bootstrap request failed: {e}");
        }

        let response = self.client.get(CRUMB_URL).send().await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(StockError::RateLimitExceeded {
                provider: PROVIDER.to_string(),
            });
        }

        let crumb = response.text().await?.trim().to_string();
        if !is_valid_crumb(&crumb) {
            return Err(StockError::YahooFinanceError(
                "failed to obtain session crumb".to_string(),
            ));
        }

        debug!("Obtained Yahoo crumb");
        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    async fn invalidate_crumb(&self) {
        *self.crumb.lock().await = None;
    }

    fn summary_url(symbol: &Symbol, crumb: &str) -> Result<Url> {
        Url::parse_with_params(
            &format!("{QUOTE_SUMMARY_URL}/{}", symbol.as_str()),
            &[("modules", SUMMARY_MODULES), ("crumb", crumb)],
        )
        .map_err(|e| StockError::YahooFinanceError(format!("invalid quote summary URL: {e}")))
    }

    async fn fetch_summary(&self, symbol: &Symbol) -> Result<QuoteSummaryResponse> {
        // A stale crumb answers 401; refresh it once.
        for attempt in 0..2 {
            let url = Self::summary_url(symbol, &self.crumb().await?)?;
            debug!("Fetching quote summary for {symbol} (attempt {})", attempt + 1);

            let response = self.client.get(url).send().await?;
            match response.status() {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN if attempt == 0 => {
                    warn!("Yahoo rejected the crumb, refreshing session");
                    self.invalidate_crumb().await;
                }
                StatusCode::NOT_FOUND => {
                    return Err(StockError::SymbolNotFound(symbol.to_string()));
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    return Err(StockError::RateLimitExceeded {
                        provider: PROVIDER.to_string(),
                    });
                }
                status if !status.is_success() => {
                    return Err(StockError::YahooFinanceError(format!(
                        "HTTP {status} for {symbol}"
                    )));
                }
                _ => return Ok(response.json::<QuoteSummaryResponse>().await?),
            }
        }

        Err(StockError::YahooFinanceError(
            "quote summary rejected after refreshing the session".to_string(),
        ))
    }
}

#[async_trait]
impl MarketDataSource for YahooMarketData {
    #[instrument(skip_all, fields(symbol = %symbol))]
    async fn fetch_profile(&self, symbol: &Symbol) -> Result<CompanyProfile> {
        let response = self.fetch_summary(symbol).await?;
        let data = summary_data(symbol, response)?;
        Ok(profile_from_summary(data))
    }

    #[instrument(skip_all, fields(symbol = %symbol, period = %period))]
    async fn fetch_history(&self, symbol: &Symbol, period: Period) -> Result<PriceSeries> {
        let response = self
            .connector
            .get_quote_range(symbol.as_str(), "1d", period.as_token())
            .await
            .map_err(|e| chart_error(symbol, e))?;

        // Bars are dated in the exchange's local time
        let gmt_offset = response.metadata().map_or(0, |meta| meta.gmtoffset);
        let series = series_from_quotes(symbol, response.quotes(), gmt_offset)?;

        debug!("Fetched {} daily points", series.len());
        Ok(series)
    }
}

fn is_valid_crumb(crumb: &str) -> bool {
    !crumb.is_empty() && crumb.len() <= 64 && !crumb.contains(['<', '{', ' '])
}

/// Map a chart API failure; an empty or unknown chart means no such symbol
fn chart_error(symbol: &Symbol, error: yahoo::YahooError) -> StockError {
    match error {
        yahoo::YahooError::NoQuotes | yahoo::YahooError::NoResult => {
            StockError::SymbolNotFound(symbol.to_string())
        }
        yahoo::YahooError::ApiError(ref message)
            if message
                .code
                .as_deref()
                .is_some_and(|code| code.eq_ignore_ascii_case("Not Found")) =>
        {
            StockError::SymbolNotFound(symbol.to_string())
        }
        yahoo::YahooError::TooManyRequests(_) => StockError::RateLimitExceeded {
            provider: PROVIDER.to_string(),
        },
        other => StockError::YahooFinanceError(other.to_string()),
    }
}

/// Convert chart rows into a series; zero usable rows means no such symbol
fn series_from_quotes(
    symbol: &Symbol,
    quotes: std::result::Result<Vec<yahoo::Quote>, yahoo::YahooError>,
    gmt_offset: i32,
) -> Result<PriceSeries> {
    let quotes = quotes.map_err(|e| chart_error(symbol, e))?;
    let series = PriceSeries::new(
        quotes
            .iter()
            .filter_map(|q| point_from_parts(q.timestamp, gmt_offset, q.close, q.volume))
            .collect(),
    );

    if series.is_empty() {
        return Err(StockError::SymbolNotFound(symbol.to_string()));
    }
    Ok(series)
}

/// Build a point from a chart row dated at `gmt_offset` seconds east of UTC;
/// rows with an unrepresentable timestamp are dropped
fn point_from_parts(timestamp: i64, gmt_offset: i32, close: f64, volume: u64) -> Option<PricePoint> {
    let offset = FixedOffset::east_opt(gmt_offset)?;
    let date = DateTime::from_timestamp(timestamp, 0)?
        .with_timezone(&offset)
        .date_naive();
    Some(PricePoint::new(date, close, volume))
}

/// Unwrap the single result, mapping "no result" to an unknown symbol
fn summary_data(symbol: &Symbol, response: QuoteSummaryResponse) -> Result<QuoteSummaryData> {
    let summary = response.quote_summary;

    if let Some(error) = summary.error {
        if error.code.eq_ignore_ascii_case("Not Found") {
            return Err(StockError::SymbolNotFound(symbol.to_string()));
        }
        return Err(StockError::YahooFinanceError(format!(
            "{}: {}",
            error.code, error.description
        )));
    }

    summary
        .result
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| StockError::SymbolNotFound(symbol.to_string()))
}

fn profile_from_summary(data: QuoteSummaryData) -> CompanyProfile {
    let price = data.price.unwrap_or_default();
    let detail = data.summary_detail.unwrap_or_default();
    let stats = data.default_key_statistics.unwrap_or_default();
    let asset = data.asset_profile.unwrap_or_default();

    let next_earnings = data
        .calendar_events
        .and_then(|c| c.earnings)
        .and_then(|e| e.earnings_date.into_iter().next())
        .and_then(|d| d.as_i64())
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|dt| dt.date_naive());

    CompanyProfile {
        name: non_blank(price.long_name).or_else(|| non_blank(price.short_name)),
        summary: non_blank(asset.long_business_summary),
        sector: non_blank(asset.sector),
        industry: non_blank(asset.industry),
        country: non_blank(asset.country),
        logo_url: asset.website.as_deref().and_then(logo_from_website),
        current_price: raw_f64(price.regular_market_price.as_ref()),
        // Yahoo reports the daily change as a fraction here
        change_percent: raw_f64(price.regular_market_change_percent.as_ref()).map(|c| c * 100.0),
        market_cap: raw_f64(price.market_cap.as_ref()),
        volume: raw_u64(detail.volume.as_ref()),
        average_volume: raw_u64(detail.average_volume.as_ref()),
        pe_ratio: raw_f64(detail.trailing_pe.as_ref()),
        eps: raw_f64(stats.trailing_eps.as_ref()),
        beta: raw_f64(detail.beta.as_ref()),
        next_earnings,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn raw_f64(value: Option<&RawValue>) -> Option<f64> {
    value.and_then(RawValue::as_f64)
}

fn raw_u64(value: Option<&RawValue>) -> Option<u64> {
    raw_f64(value)
        .filter(|v| *v >= 0.0)
        .map(|v| v.round() as u64)
}

/// Logo reference derived from the company's website host
fn logo_from_website(website: &str) -> Option<String> {
    let url = Url::parse(website.trim()).ok()?;
    let host = url.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    Some(format!("{LOGO_SERVICE_URL}/{host}"))
}

// ============================================================================
// Yahoo Finance quoteSummary response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummaryResult,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    #[serde(default)]
    result: Option<Vec<QuoteSummaryData>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryData {
    price: Option<PriceModule>,
    summary_detail: Option<SummaryDetail>,
    default_key_statistics: Option<KeyStatistics>,
    asset_profile: Option<AssetProfile>,
    calendar_events: Option<CalendarEvents>,
}

/// `{ "raw": 1.23, "fmt": "1.23" }`; `raw` may be absent or a non-numeric string
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: Option<Value>,
}

impl RawValue {
    fn as_f64(&self) -> Option<f64> {
        self.raw
            .as_ref()
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
    }

    fn as_i64(&self) -> Option<i64> {
        self.raw.as_ref().and_then(Value::as_i64)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    long_name: Option<String>,
    short_name: Option<String>,
    regular_market_price: Option<RawValue>,
    regular_market_change_percent: Option<RawValue>,
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    volume: Option<RawValue>,
    average_volume: Option<RawValue>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    beta: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    trailing_eps: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetProfile {
    sector: Option<String>,
    industry: Option<String>,
    country: Option<String>,
    website: Option<String>,
    long_business_summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarEvents {
    earnings: Option<EarningsEvents>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EarningsEvents {
    #[serde(default)]
    earnings_date: Vec<RawValue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const AAPL_SUMMARY: &str = r#"{
        "quoteSummary": {
            "result": [{
                "price": {
                    "longName": "Apple Inc.",
                    "shortName": "Apple",
                    "regularMarketPrice": {"raw": 189.84, "fmt": "189.84"},
                    "regularMarketChangePercent": {"raw": 0.01234, "fmt": "1.23%"},
                    "marketCap": {"raw": 2950000000000, "fmt": "2.95T"}
                },
                "summaryDetail": {
                    "volume": {"raw": 51234567, "fmt": "51.23M"},
                    "averageVolume": {"raw": 58000000, "fmt": "58M"},
                    "trailingPE": {"raw": 29.5, "fmt": "29.50"},
                    "beta": {"raw": 1.29, "fmt": "1.29"}
                },
                "defaultKeyStatistics": {
                    "trailingEps": {"raw": 6.43, "fmt": "6.43"}
                },
                "assetProfile": {
                    "sector": "Technology",
                    "industry": "Consumer Electronics",
                    "country": "United States",
                    "website": "https://www.apple.com",
                    "longBusinessSummary": "Apple Inc. designs, manufactures, and markets smartphones."
                },
                "calendarEvents": {
                    "earnings": {
                        "earningsDate": [{"raw": 1738281600, "fmt": "2025-01-31"}]
                    }
                }
            }],
            "error": null
        }
    }"#;

    fn symbol(s: &str) -> Symbol {
        Symbol::parse(s).unwrap()
    }

    #[test]
    fn test_profile_mapping() {
        let response: QuoteSummaryResponse = serde_json::from_str(AAPL_SUMMARY).unwrap();
        let profile = profile_from_summary(summary_data(&symbol("AAPL"), response).unwrap());

        assert_eq!(profile.name.as_deref(), Some("Apple Inc."));
        assert_eq!(profile.sector.as_deref(), Some("Technology"));
        assert_eq!(profile.country.as_deref(), Some("United States"));
        assert_eq!(profile.logo_url.as_deref(), Some("https://logo.clearbit.com/apple.com"));
        assert_eq!(profile.current_price, Some(189.84));
        assert!((profile.change_percent.unwrap() - 1.234).abs() < 1e-9);
        assert_eq!(profile.market_cap, Some(2.95e12));
        assert_eq!(profile.volume, Some(51_234_567));
        assert_eq!(profile.average_volume, Some(58_000_000));
        assert_eq!(profile.pe_ratio, Some(29.5));
        assert_eq!(profile.eps, Some(6.43));
        assert_eq!(profile.beta, Some(1.29));
        assert_eq!(profile.next_earnings, NaiveDate::from_ymd_opt(2025, 1, 31));
        assert!(profile.has_price());
    }

    #[test]
    fn test_sparse_profile_tolerated() {
        let body = r#"{"quoteSummary": {"result": [{
            "price": {"shortName": "Tiny Co", "regularMarketPrice": {}},
            "summaryDetail": {"trailingPE": {"raw": "Infinity", "fmt": "∞"}},
            "assetProfile": {"longBusinessSummary": "   "}
        }]}}"#;
        let response: QuoteSummaryResponse = serde_json::from_str(body).unwrap();
        let profile = profile_from_summary(summary_data(&symbol("TINY"), response).unwrap());

        assert_eq!(profile.name.as_deref(), Some("Tiny Co"));
        assert_eq!(profile.current_price, None);
        assert_eq!(profile.pe_ratio, None);
        assert_eq!(profile.summary, None);
        assert_eq!(profile.logo_url, None);
        assert!(!profile.has_price());
    }

    #[test]
    fn test_not_found_responses() {
        let body = r#"{"quoteSummary": {"result": null, "error": {"code": "Not Found", "description": "Quote not found for symbol: ZZZZ"}}}"#;
        let response: QuoteSummaryResponse = serde_json::from_str(body).unwrap();
        assert!(summary_data(&symbol("ZZZZ"), response).unwrap_err().is_not_found());

        let body = r#"{"quoteSummary": {"result": []}}"#;
        let response: QuoteSummaryResponse = serde_json::from_str(body).unwrap();
        assert!(summary_data(&symbol("ZZZZ"), response).unwrap_err().is_not_found());
    }

    #[test]
    fn test_other_api_error_is_provider_error() {
        let body = r#"{"quoteSummary": {"result": null, "error": {"code": "Unauthorized", "description": "Invalid Crumb"}}}"#;
        let response: QuoteSummaryResponse = serde_json::from_str(body).unwrap();
        let err = summary_data(&symbol("AAPL"), response).unwrap_err();
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "Yahoo Finance error: Unauthorized: Invalid Crumb");
    }

    #[test]
    fn test_logo_from_website() {
        assert_eq!(
            logo_from_website("https://www.microsoft.com/en-us").as_deref(),
            Some("https://logo.clearbit.com/microsoft.com")
        );
        assert_eq!(
            logo_from_website("http://tesla.com").as_deref(),
            Some("https://logo.clearbit.com/tesla.com")
        );
        assert_eq!(logo_from_website("not a url"), None);
    }

    fn quote(timestamp: i64, close: f64) -> yahoo::Quote {
        yahoo::Quote {
            timestamp,
            open: close,
            high: close,
            low: close,
            volume: 1_000,
            close,
            adjclose: close,
        }
    }

    #[test]
    fn test_point_from_parts() {
        // 2024-03-15 13:30 UTC, a US market open
        let point = point_from_parts(1_710_509_400, 0, 172.62, 1_000).unwrap();
        assert_eq!(point.date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(point.close, 172.62);
        assert_eq!(point.volume, 1_000);
        assert!(point_from_parts(i64::MAX, 0, 1.0, 0).is_none());
    }

    #[test]
    fn test_point_uses_exchange_date() {
        // 2024-03-14 21:00 UTC is 10:00 on 2024-03-15 in Auckland (UTC+13)
        let point = point_from_parts(1_710_450_000, 13 * 3600, 10.0, 0).unwrap();
        assert_eq!(point.date, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());

        let point = point_from_parts(1_710_450_000, 0, 10.0, 0).unwrap();
        assert_eq!(point.date, NaiveDate::from_ymd_opt(2024, 3, 14).unwrap());
    }

    #[test]
    fn test_series_from_quotes() {
        let quotes = vec![quote(1_710_509_400, 172.62), quote(1_710_595_800, f64::NAN)];
        let series = series_from_quotes(&symbol("AAPL"), Ok(quotes), -14_400).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.last().unwrap().close, 172.62);
    }

    #[test]
    fn test_empty_chart_is_not_found() {
        let sym = symbol("ZZZZ");
        assert!(series_from_quotes(&sym, Ok(Vec::new()), 0).unwrap_err().is_not_found());
        assert!(
            series_from_quotes(&sym, Ok(vec![quote(1_710_509_400, f64::NAN)]), 0)
                .unwrap_err()
                .is_not_found()
        );
        assert!(
            series_from_quotes(&sym, Err(yahoo::YahooError::NoQuotes), 0)
                .unwrap_err()
                .is_not_found()
        );
        assert!(
            series_from_quotes(&sym, Err(yahoo::YahooError::NoResult), 0)
                .unwrap_err()
                .is_not_found()
        );
    }

    #[test]
    fn test_chart_error_mapping() {
        let sym = symbol("AAPL");
        let chart: yahoo::YChart = serde_json::from_str(
            r#"{"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}"#,
        )
        .unwrap();
        let not_found = yahoo::YahooError::ApiError(chart.error.unwrap());
        assert!(chart_error(&sym, not_found).is_not_found());

        let limited = chart_error(&sym, yahoo::YahooError::TooManyRequests("chart".to_string()));
        assert!(matches!(limited, StockError::RateLimitExceeded { .. }));

        let other = chart_error(&sym, yahoo::YahooError::DataInconsistency);
        assert!(matches!(other, StockError::YahooFinanceError(_)));
        assert!(!other.is_not_found());
    }

    #[test]
    fn test_crumb_validation() {
        assert!(is_valid_crumb("aB3dE.fGh1/"));
        assert!(!is_valid_crumb(""));
        assert!(!is_valid_crumb("<html>Too Many Requests</html>"));
        assert!(!is_valid_crumb(r#"{"finance":{"error":"x"}}"#));
    }

    #[test]
    fn test_summary_url_encodes_crumb() {
        let url = YahooMarketData::summary_url(&symbol("msft"), "a/b+c").unwrap();
        let s = url.as_str();
        assert!(s.starts_with("https://query2.finance.yahoo.com/v10/finance/quoteSummary/MSFT?"));
        assert!(s.contains("crumb=a%2Fb%2Bc"));
        assert!(s.contains("modules=price%2CsummaryDetail"));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_fetch_profile_live() {
        let source = YahooMarketData::new(Duration::from_secs(30)).unwrap();
        let profile = source.fetch_profile(&symbol("AAPL")).await.unwrap();
        assert!(profile.has_price());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_fetch_history_live() {
        let source = YahooMarketData::new(Duration::from_secs(30)).unwrap();
        let series = source.fetch_history(&symbol("AAPL"), Period::SixMonths).await.unwrap();
        assert!(series.len() > 100);
    }
}
