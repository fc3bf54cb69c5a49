//! Text dashboard rendering
//!
//! Missing values stay `None` in the data model and become
//! [`NOT_AVAILABLE`] only here.

pub mod chart;
pub mod report;
pub mod table;

pub use chart::{
    ChartData, ChartOptions, ChartPoint, linear_trend, render_price_chart, render_trend_chart,
    render_volume_chart,
};
pub use report::Report;
pub use table::{
    KeyFact, NOT_AVAILABLE, NOT_COMPUTABLE, format_percent, format_volatility, key_facts,
    render_cagr_table, render_profile_table,
};
