//! Key-value and CAGR tables

use crate::domain::CompanyProfile;
use crate::metrics::CagrTable;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{CellAlignment, ContentArrangement, Table};
use serde::Serialize;

/// Label for a value the data source did not provide
pub const NOT_AVAILABLE: &str = "not available";

/// Label for a metric that cannot be derived from the history
pub const NOT_COMPUTABLE: &str = "not computable";

/// One labelled row of the key financial data table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyFact {
    pub label: &'static str,
    pub value: String,
}

impl KeyFact {
    fn new(label: &'static str, value: Option<String>) -> Self {
        Self {
            label,
            value: value.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }
}

/// Key financial data in display order
pub fn key_facts(profile: &CompanyProfile) -> Vec<KeyFact> {
    vec![
        KeyFact::new("Current price", profile.current_price.map(|p| format!("${p:.2}"))),
        KeyFact::new("Daily change", profile.change_percent.map(|c| format!("{c:.2}%"))),
        KeyFact::new("Market cap", profile.market_cap.map(format_market_cap)),
        KeyFact::new("Volume", profile.volume.map(format_count)),
        KeyFact::new("Average volume", profile.average_volume.map(format_count)),
        KeyFact::new("P/E ratio", profile.pe_ratio.map(|v| format!("{v:.2}"))),
        KeyFact::new("EPS", profile.eps.map(|v| format!("{v:.2}"))),
        KeyFact::new("Beta", profile.beta.map(|v| format!("{v:.2}"))),
        KeyFact::new(
            "Next earnings report",
            profile.next_earnings.map(|d| d.format("%Y-%m-%d").to_string()),
        ),
    ]
}

/// Render facts as a two-column table
pub fn render_profile_table(facts: &[KeyFact]) -> String {
    let mut table = new_table(["Indicator", "Value"]);
    for fact in facts {
        table.add_row(vec![fact.label.to_string(), fact.value.clone()]);
    }
    align_right(&mut table, 1);
    table.to_string()
}

pub fn render_cagr_table(cagr: &CagrTable) -> String {
    let mut table = new_table(["Period", "CAGR"]);
    for row in &cagr.rows {
        let value = row
            .value
            .map_or_else(|| NOT_AVAILABLE.to_string(), format_percent);
        table.add_row(vec![row.label.clone(), value]);
    }
    align_right(&mut table, 1);
    table.to_string()
}

/// Fraction as a percentage with two decimals (0.21 -> "21.00%")
pub fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

pub fn format_volatility(volatility: Option<f64>) -> String {
    volatility.map_or_else(|| NOT_COMPUTABLE.to_string(), format_percent)
}

/// Format market cap in human-readable form
pub fn format_market_cap(cap: f64) -> String {
    if cap >= 1_000_000_000_000.0 {
        format!("${:.2}T", cap / 1_000_000_000_000.0)
    } else if cap >= 1_000_000_000.0 {
        format!("${:.2}B", cap / 1_000_000_000.0)
    } else if cap >= 1_000_000.0 {
        format!("${:.2}M", cap / 1_000_000.0)
    } else {
        format!("${cap:.2}")
    }
}

/// Integer with thousands separators
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn new_table(header: [&str; 2]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

fn align_right(table: &mut Table, column: usize) {
    if let Some(col) = table.column_mut(column) {
        col.set_cell_alignment(CellAlignment::Right);
    }
}
