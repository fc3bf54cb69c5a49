//! Full dashboard for one successful analysis

use super::chart::{ChartData, ChartOptions, render_price_chart, render_trend_chart, render_volume_chart};
use super::table::{KeyFact, NOT_AVAILABLE, format_volatility, key_facts, render_cagr_table, render_profile_table};
use crate::domain::{CompanyProfile, Period, PriceSeries, Symbol};
use crate::error::Result;
use crate::metrics::{CagrTable, Metrics};
use crate::narrative::Narrative;
use serde::Serialize;

/// Everything fetched and derived for one ticker and period
#[derive(Debug, Clone)]
pub struct Report {
    pub symbol: Symbol,
    pub period: Period,
    pub profile: CompanyProfile,
    pub narrative: Narrative,
    pub series: PriceSeries,
    pub metrics: Metrics,
}

/// JSON shape of a report
#[derive(Serialize)]
struct ReportView<'a> {
    symbol: &'a Symbol,
    period: Period,
    name: Option<&'a str>,
    logo_url: Option<&'a str>,
    description: &'a Narrative,
    profile: &'a CompanyProfile,
    key_facts: Vec<KeyFact>,
    cagr: &'a CagrTable,
    volatility: Option<f64>,
    chart: ChartData,
}

impl Report {
    pub fn new(
        symbol: Symbol,
        period: Period,
        profile: CompanyProfile,
        narrative: Narrative,
        series: PriceSeries,
        metrics: Metrics,
    ) -> Self {
        Self {
            symbol,
            period,
            profile,
            narrative,
            series,
            metrics,
        }
    }

    /// Company name with the ticker, or the ticker alone
    pub fn title(&self) -> String {
        match &self.profile.name {
            Some(name) => format!("{name} ({})", self.symbol),
            None => self.symbol.to_string(),
        }
    }

    pub fn key_facts(&self) -> Vec<KeyFact> {
        key_facts(&self.profile)
    }

    pub fn chart_data(&self) -> ChartData {
        ChartData::new(&self.series, &self.metrics.ma20)
    }

    /// Render the text dashboard
    pub fn render_text(&self, options: &ChartOptions) -> String {
        let mut out = String::new();

        out.push_str(&format!("# {}\n\n", self.title()));
        out.push_str(&format!(
            "Logo: {}\n\n",
            self.profile.logo_url.as_deref().unwrap_or(NOT_AVAILABLE)
        ));

        out.push_str("## What does this company do?\n\n");
        out.push_str(&self.narrative.text);
        out.push_str("\n\n");

        out.push_str("## Key financial data\n\n");
        out.push_str(&render_profile_table(&self.key_facts()));
        out.push_str("\n\n");

        out.push_str(&format!("## Price and volume ({})\n\n", self.period.label()));
        out.push_str(&render_price_chart(&self.series, &self.metrics.ma20, options));
        out.push('\n');
        out.push_str(&render_volume_chart(&self.series, options));
        out.push('\n');

        out.push_str("## Compound annual growth rate (CAGR)\n\n");
        out.push_str(&render_cagr_table(&self.metrics.cagr));
        out.push_str("\n\n");

        out.push_str("## Price volatility\n\n");
        out.push_str(&format!(
            "Annualized volatility: {}\n\n",
            format_volatility(self.metrics.volatility)
        ));

        out.push_str("## Closing price with trend line\n\n");
        out.push_str(&render_trend_chart(&self.series, options));

        out
    }

    /// Serialize the report, including chart series, as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        let view = ReportView {
            symbol: &self.symbol,
            period: self.period,
            name: self.profile.name.as_deref(),
            logo_url: self.profile.logo_url.as_deref(),
            description: &self.narrative,
            profile: &self.profile,
            key_facts: self.key_facts(),
            cagr: &self.metrics.cagr,
            volatility: self.metrics.volatility,
            chart: self.chart_data(),
        };
        Ok(serde_json::to_string_pretty(&view)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PricePoint;
    use chrono::{Days, NaiveDate};

    fn report(name: Option<&str>, days: u64) -> Report {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let series = PriceSeries::new(
            (0..days)
                .map(|i| PricePoint::new(start + Days::new(i), 100.0 + (i % 7) as f64, 1_000 + i))
                .collect(),
        );
        let metrics = Metrics::compute(&series);
        Report::new(
            Symbol::parse("aapl").unwrap(),
            Period::OneYear,
            CompanyProfile {
                name: name.map(str::to_string),
                current_price: Some(187.5),
                ..Default::default()
            },
            Narrative {
                text: "Apple makes phones.".to_string(),
                translated: false,
            },
            series,
            metrics,
        )
    }

    #[test]
    fn test_title() {
        assert_eq!(report(Some("Apple Inc."), 5).title(), "Apple Inc. (AAPL)");
        assert_eq!(report(None, 5).title(), "AAPL");
    }

    #[test]
    fn test_sections_in_order() {
        let text = report(Some("Apple Inc."), 400).render_text(&ChartOptions::new(60, 8));

        let sections = [
            "# Apple Inc. (AAPL)",
            "Logo: not available",
            "## What does this company do?",
            "Apple makes phones.",
            "## Key financial data",
            "$187.50",
            "## Price and volume (1 year)",
            "## Compound annual growth rate (CAGR)",
            "## Price volatility",
            "Annualized volatility: ",
            "## Closing price with trend line",
        ];
        let mut cursor = 0;
        for section in sections {
            let found = text[cursor..]
                .find(section)
                .unwrap_or_else(|| panic!("missing or out of order: {section}"));
            cursor += found + section.len();
        }
    }

    #[test]
    fn test_short_history_marks_metrics() {
        let text = report(None, 1).render_text(&ChartOptions::default());
        assert!(text.contains("Annualized volatility: not computable"));
    }

    #[test]
    fn test_json_output() {
        let json: serde_json::Value =
            serde_json::from_str(&report(Some("Apple Inc."), 30).to_json().unwrap()).unwrap();

        assert_eq!(json["symbol"], "AAPL");
        assert_eq!(json["period"], "1y");
        assert_eq!(json["name"], "Apple Inc.");
        assert_eq!(json["description"]["translated"], false);
        assert_eq!(json["cagr"]["rows"].as_array().unwrap().len(), 3);
        assert_eq!(json["chart"]["points"].as_array().unwrap().len(), 30);
        assert!(json["chart"]["points"][19]["ma20"].is_number());
        assert!(json["chart"]["points"][18]["ma20"].is_null());
        assert_eq!(json["key_facts"][0]["label"], "Current price");
    }
}
