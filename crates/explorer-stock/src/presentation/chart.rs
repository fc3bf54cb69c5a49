//! Text charts for terminal output plus a serializable chart payload
//!
//! Charts are drawn on a fixed character grid. Series longer than the grid
//! width are bucketed, keeping the last defined value of each bucket.

use crate::domain::PriceSeries;
use chrono::NaiveDate;
use serde::Serialize;

const CLOSE_MARK: char = '*';
const MA_MARK: char = '-';
const TREND_MARK: char = '.';
const BAR_MARK: char = '█';
const AXIS_LABEL_WIDTH: usize = 12;
const NO_DATA: &str = "(no data)\n";

/// Chart dimensions in character cells, never smaller than 2x2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartOptions {
    width: usize,
    height: usize,
}

impl ChartOptions {
    /// Dimensions below 2x2 are raised to 2x2
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width: width.max(2),
            height: height.max(2),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self::new(72, 14)
    }
}

/// A line to draw, with its marker
struct Layer<'a> {
    values: &'a [Option<f64>],
    mark: char,
}

struct Canvas {
    cells: Vec<Vec<char>>,
    width: usize,
    height: usize,
}

impl Canvas {
    fn new(width: usize, height: usize) -> Self {
        Self {
            cells: vec![vec![' '; width]; height],
            width,
            height,
        }
    }

    fn set(&mut self, col: usize, row: usize, mark: char) {
        if col < self.width && row < self.height {
            self.cells[row][col] = mark;
        }
    }

    /// Render rows with a y-axis; `label(row)` gives the axis text for a row
    fn render(&self, label: impl Fn(usize) -> Option<String>) -> String {
        let mut out = String::new();
        for (row, cells) in self.cells.iter().enumerate() {
            match label(row) {
                Some(text) => out.push_str(&format!("{text:>width$} ┤", width = AXIS_LABEL_WIDTH)),
                None => out.push_str(&format!("{:>width$} │", "", width = AXIS_LABEL_WIDTH)),
            }
            out.extend(cells.iter());
            out.push('\n');
        }
        out
    }
}

/// Reduce `values` to at most `width` entries, keeping the last defined
/// value in each bucket
fn bucket<T: Copy>(values: &[Option<T>], width: usize) -> Vec<Option<T>> {
    let len = values.len();
    if len <= width || width == 0 {
        return values.to_vec();
    }
    (0..width)
        .map(|col| {
            let start = col * len / width;
            let end = (col + 1) * len / width;
            values[start..end].iter().rev().find_map(|v| *v)
        })
        .collect()
}

fn plot_lines(layers: &[Layer<'_>], options: &ChartOptions) -> String {
    let bucketed: Vec<Vec<Option<f64>>> = layers
        .iter()
        .map(|l| bucket(l.values, options.width()))
        .collect();

    let defined = bucketed.iter().flatten().filter_map(|v| *v);
    let (min, max) = defined.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return NO_DATA.to_string();
    }

    let columns = bucketed.iter().map(Vec::len).max().unwrap_or(0);
    let mut canvas = Canvas::new(columns, options.height());
    let last_row = options.height() - 1;
    let span = max - min;
    let row_of = |v: f64| {
        if span > 0.0 {
            (((max - v) / span) * last_row as f64).round() as usize
        } else {
            last_row / 2
        }
    };

    for (layer, values) in layers.iter().zip(&bucketed) {
        for (col, value) in values.iter().enumerate() {
            if let Some(v) = value {
                canvas.set(col, row_of(*v), layer.mark);
            }
        }
    }

    canvas.render(|row| {
        if span <= 0.0 {
            return (row == last_row / 2).then(|| format!("{max:.2}"));
        }
        match row {
            0 => Some(format!("{max:.2}")),
            r if r == last_row => Some(format!("{min:.2}")),
            r if r == last_row / 2 => Some(format!("{:.2}", (max + min) / 2.0)),
            _ => None,
        }
    })
}

fn date_axis(series: &PriceSeries, options: &ChartOptions) -> String {
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return String::new();
    };
    let start = first.date.to_string();
    let end = last.date.to_string();
    let columns = series.len().min(options.width());
    let gap = columns.saturating_sub(start.len() + end.len()).max(1);
    format!(
        "{:>width$} └{}\n{:>width$}  {start}{}{end}\n",
        "",
        "─".repeat(columns),
        "",
        " ".repeat(gap),
        width = AXIS_LABEL_WIDTH
    )
}

/// Close line (`*`) overlaid with the moving average (`-`)
pub fn render_price_chart(series: &PriceSeries, moving_average: &[Option<f64>], options: &ChartOptions) -> String {
    if series.is_empty() {
        return NO_DATA.to_string();
    }
    let closes: Vec<Option<f64>> = series.points().iter().map(|p| Some(p.close)).collect();
    let layers = [
        Layer { values: moving_average, mark: MA_MARK },
        Layer { values: &closes, mark: CLOSE_MARK },
    ];
    let mut out = plot_lines(&layers, options);
    out.push_str(&date_axis(series, options));
    out.push_str(&format!("{:>width$}  {CLOSE_MARK} close  {MA_MARK} MA20\n", "", width = AXIS_LABEL_WIDTH));
    out
}

/// Daily volume as vertical bars
pub fn render_volume_chart(series: &PriceSeries, options: &ChartOptions) -> String {
    let volumes: Vec<Option<u64>> = series.points().iter().map(|p| Some(p.volume)).collect();
    let bars = bucket(&volumes, options.width());
    let max = bars.iter().filter_map(|v| *v).max().unwrap_or(0);
    if bars.is_empty() {
        return NO_DATA.to_string();
    }

    let height = options.height();
    let mut canvas = Canvas::new(bars.len(), height);
    for (col, volume) in bars.iter().enumerate() {
        let volume = volume.unwrap_or(0);
        let filled = if max == 0 {
            0
        } else {
            ((volume as f64 / max as f64) * height as f64).round() as usize
        };
        for row in height.saturating_sub(filled)..height {
            canvas.set(col, row, BAR_MARK);
        }
    }

    let mut out = canvas.render(|row| match row {
        0 => Some(super::table::format_count(max)),
        r if r == height - 1 => Some("0".to_string()),
        _ => None,
    });
    out.push_str(&date_axis(series, options));
    out
}

/// Least-squares straight line through `values`, evaluated at each index
pub fn linear_trend(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return values.to_vec();
    }

    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n_f;
    let (num, den) = values.iter().enumerate().fold((0.0, 0.0), |(num, den), (i, y)| {
        let dx = i as f64 - mean_x;
        (num + dx * (y - mean_y), den + dx * dx)
    });
    let slope = num / den;
    let intercept = mean_y - slope * mean_x;

    (0..n).map(|i| intercept + slope * i as f64).collect()
}

/// Close line (`*`) with its linear trend (`.`)
pub fn render_trend_chart(series: &PriceSeries, options: &ChartOptions) -> String {
    if series.is_empty() {
        return NO_DATA.to_string();
    }
    let closes = series.closes();
    let trend: Vec<Option<f64>> = linear_trend(&closes).into_iter().map(Some).collect();
    let closes: Vec<Option<f64>> = closes.into_iter().map(Some).collect();
    let layers = [
        Layer { values: &trend, mark: TREND_MARK },
        Layer { values: &closes, mark: CLOSE_MARK },
    ];
    let mut out = plot_lines(&layers, options);
    out.push_str(&date_axis(series, options));
    out.push_str(&format!("{:>width$}  {CLOSE_MARK} close  {TREND_MARK} trend\n", "", width = AXIS_LABEL_WIDTH));
    out
}

/// One row of [`ChartData`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub close: f64,
    pub ma20: Option<f64>,
    pub volume: u64,
    pub trend: f64,
}

/// Chart series for external plotting tools
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub points: Vec<ChartPoint>,
}

impl ChartData {
    /// `moving_average` must be aligned with the series points
    pub fn new(series: &PriceSeries, moving_average: &[Option<f64>]) -> Self {
        let trend = linear_trend(&series.closes());
        let points = series
            .points()
            .iter()
            .zip(trend)
            .enumerate()
            .map(|(i, (p, trend))| ChartPoint {
                date: p.date,
                close: p.close,
                ma20: moving_average.get(i).copied().flatten(),
                volume: p.volume,
                trend,
            })
            .collect();
        Self { points }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PricePoint;
    use crate::metrics::ma20;

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        PriceSeries::new(
            closes
                .iter()
                .enumerate()
                .map(|(i, c)| PricePoint::new(start + chrono::Days::new(i as u64), *c, (i as u64 + 1) * 100))
                .collect(),
        )
    }

    fn plot_rows(chart: &str, height: usize) -> Vec<String> {
        chart.lines().take(height).map(|l| l.chars().skip(AXIS_LABEL_WIDTH + 2).collect()).collect()
    }

    #[test]
    fn test_bucket_keeps_last_defined() {
        let values = [Some(1), None, Some(3), None, Some(5), None];
        assert_eq!(bucket(&values, 3), vec![Some(1), Some(3), Some(5)]);
        assert_eq!(bucket(&values, 10), values.to_vec());
        assert_eq!(bucket(&[None, None, Some(2), Some(4)], 2), vec![None, Some(4)]);
    }

    #[test]
    fn test_linear_trend() {
        let trend = linear_trend(&[1.0, 2.0, 3.0, 4.0]);
        for (t, expected) in trend.iter().zip([1.0, 2.0, 3.0, 4.0]) {
            assert!((t - expected).abs() < 1e-9);
        }

        let trend = linear_trend(&[2.0, 4.0, 2.0, 4.0]);
        assert!((trend[0] - 2.4).abs() < 1e-9);
        assert!((trend[3] - 3.6).abs() < 1e-9);

        assert_eq!(linear_trend(&[5.0]), vec![5.0]);
        assert!(linear_trend(&[]).is_empty());
    }

    #[test]
    fn test_price_chart_extremes() {
        let options = ChartOptions::new(10, 5);
        let s = series(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let chart = render_price_chart(&s, &ma20(&s), &options);
        let rows = plot_rows(&chart, 5);

        // Rising line: first point on the bottom row, last on the top row
        assert_eq!(rows[4].chars().next(), Some('*'));
        assert_eq!(rows[0].chars().nth(4), Some('*'));
        assert!(chart.contains("50.00"));
        assert!(chart.contains("10.00"));
        assert!(chart.contains("2024-01-01"));
        assert!(chart.contains("2024-01-05"));
        // Five points never fill a 20-day window
        assert!(!rows.iter().any(|r| r.contains('-')));
    }

    #[test]
    fn test_price_chart_draws_moving_average() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + f64::from(i % 5)).collect();
        let s = series(&closes);
        let chart = render_price_chart(&s, &ma20(&s), &ChartOptions::new(30, 8));
        assert!(plot_rows(&chart, 8).iter().any(|r| r.contains('-')));
    }

    #[test]
    fn test_long_series_is_bucketed() {
        let closes: Vec<f64> = (0..500).map(f64::from).collect();
        let s = series(&closes);
        let options = ChartOptions::new(40, 6);
        let chart = render_trend_chart(&s, &options);
        for row in plot_rows(&chart, 6) {
            assert!(row.chars().count() <= 40);
        }
    }

    #[test]
    fn test_flat_series_renders() {
        let s = series(&[5.0, 5.0, 5.0]);
        let chart = render_trend_chart(&s, &ChartOptions::new(10, 5));
        let rows = plot_rows(&chart, 5);
        assert_eq!(rows[2].trim_end(), "***");
    }

    #[test]
    fn test_options_clamp_small_dimensions() {
        let options = ChartOptions::new(10, 0);
        assert_eq!(options.width(), 10);
        assert_eq!(options.height(), 2);
        assert_eq!(ChartOptions::new(0, 1), ChartOptions::new(2, 2));

        let s = series(&[1.0, 2.0, 3.0]);
        assert_eq!(render_trend_chart(&s, &options).lines().count(), 2 + 3);
        assert_eq!(render_volume_chart(&s, &options).lines().count(), 2 + 2);
    }

    #[test]
    fn test_empty_series() {
        let s = PriceSeries::default();
        assert_eq!(render_price_chart(&s, &[], &ChartOptions::default()), NO_DATA);
        assert_eq!(render_volume_chart(&s, &ChartOptions::default()), NO_DATA);
        assert_eq!(render_trend_chart(&s, &ChartOptions::default()), NO_DATA);
    }

    #[test]
    fn test_volume_bars() {
        let s = series(&[1.0, 1.0, 1.0, 1.0]);
        let chart = render_volume_chart(&s, &ChartOptions::new(10, 4));
        let rows = plot_rows(&chart, 4);
        // Volumes 100..400: the last bar is full height, the first a quarter
        assert_eq!(rows[0].trim_end(), "   █");
        assert_eq!(rows[3].trim_end(), "████");
        assert!(chart.contains("400"));
    }

    #[test]
    fn test_chart_data() {
        let s = series(&[1.0, 2.0, 3.0]);
        let data = ChartData::new(&s, &[None, None, Some(2.0)]);
        assert_eq!(data.points.len(), 3);
        assert_eq!(data.points[2].ma20, Some(2.0));
        assert!((data.points[1].trend - 2.0).abs() < 1e-9);

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["points"][0]["date"], "2024-01-01");
        assert_eq!(json["points"][0]["ma20"], serde_json::Value::Null);
        assert_eq!(json["points"][0]["volume"], 100);
    }
}
