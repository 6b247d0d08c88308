//! Line charts of one metric across repetitions, one series per target.
//!
//! Output is a standalone HTML page with the chart drawn as inline SVG, so
//! the file opens in any browser without network access.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::HeybenchError;
use crate::results::{Metric, ResultRow};

const WIDTH: f64 = 960.0;
const HEIGHT: f64 = 520.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 180.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 60.0;
const Y_TICKS: usize = 5;
const MAX_X_LABELS: usize = 30;

const PALETTE: [&str; 8] = [
    "#34d399", "#60a5fa", "#f87171", "#fbbf24", "#a78bfa", "#f472b6", "#2dd4bf", "#fb923c",
];

// ---------------------------------------------------------------------------
// LineChart
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

/// Category line chart: every series is plotted against the leading entries
/// of `categories`.
#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub categories: Vec<String>,
    pub series: Vec<Series>,
}

impl LineChart {
    /// Group `rows` by target (first-appearance order) and take `metric` from
    /// each row. The category axis is the repetition index `1..=repeat`,
    /// widened to the longest series so no point is dropped.
    pub fn from_rows(rows: &[ResultRow], metric: Metric, title: &str, repeat: u32) -> Self {
        let mut series: Vec<Series> = Vec::new();
        for row in rows {
            let value = metric.value(row);
            match series.iter_mut().find(|s| s.name == row.target) {
                Some(s) => s.values.push(value),
                None => series.push(Series {
                    name: row.target.clone(),
                    values: vec![value],
                }),
            }
        }

        let longest = series.iter().map(|s| s.values.len()).max().unwrap_or(0);
        let len = (repeat as usize).max(longest);
        if len > repeat as usize {
            tracing::warn!(
                "Dataset holds {longest} repetitions per target but repeat is {repeat}; widening the axis"
            );
        }

        Self {
            title: title.to_string(),
            x_label: "Test Run".to_string(),
            y_label: metric.key().to_string(),
            categories: (1..=len).map(|i| i.to_string()).collect(),
            series,
        }
    }

    /// Upper bound of the value axis.
    fn y_max(&self) -> f64 {
        let max = self
            .series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .filter(|v| v.is_finite())
            .fold(0.0_f64, f64::max);
        nice_upper_bound(max)
    }

    fn x_at(&self, index: usize) -> f64 {
        let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let n = self.categories.len();
        if n <= 1 {
            MARGIN_LEFT + plot_w / 2.0
        } else {
            MARGIN_LEFT + plot_w * index as f64 / (n - 1) as f64
        }
    }

    fn y_at(&self, value: f64, y_max: f64) -> f64 {
        let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let v = if value.is_finite() { value.clamp(0.0, y_max) } else { 0.0 };
        MARGIN_TOP + plot_h * (1.0 - v / y_max)
    }

    /// Render the chart as an SVG element.
    pub fn to_svg(&self) -> String {
        let y_max = self.y_max();
        let plot_right = WIDTH - MARGIN_RIGHT;
        let plot_bottom = HEIGHT - MARGIN_BOTTOM;
        let mut svg = String::new();

        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {WIDTH} {HEIGHT}" width="{WIDTH}" height="{HEIGHT}" role="img">"#
        );

        // Horizontal grid and value ticks.
        for i in 0..=Y_TICKS {
            let value = y_max * i as f64 / Y_TICKS as f64;
            let y = self.y_at(value, y_max);
            let _ = writeln!(
                svg,
                r#"  <line class="grid" x1="{MARGIN_LEFT}" y1="{y:.1}" x2="{plot_right}" y2="{y:.1}"/>"#
            );
            let _ = writeln!(
                svg,
                r#"  <text class="tick" x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"#,
                MARGIN_LEFT - 8.0,
                y + 4.0,
                format_tick(value)
            );
        }

        // Category ticks, thinned out on long axes.
        let step = self.categories.len().div_ceil(MAX_X_LABELS).max(1);
        for (i, label) in self.categories.iter().enumerate().step_by(step) {
            let x = self.x_at(i);
            let _ = writeln!(
                svg,
                r#"  <text class="tick" x="{x:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
                plot_bottom + 18.0,
                html_escape(label)
            );
        }

        // Axes and axis labels.
        let _ = writeln!(
            svg,
            r#"  <line class="axis" x1="{MARGIN_LEFT}" y1="{MARGIN_TOP}" x2="{MARGIN_LEFT}" y2="{plot_bottom}"/>"#
        );
        let _ = writeln!(
            svg,
            r#"  <line class="axis" x1="{MARGIN_LEFT}" y1="{plot_bottom}" x2="{plot_right}" y2="{plot_bottom}"/>"#
        );
        let _ = writeln!(
            svg,
            r#"  <text class="label" x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            (MARGIN_LEFT + plot_right) / 2.0,
            HEIGHT - 16.0,
            html_escape(&self.x_label)
        );
        let _ = writeln!(
            svg,
            r#"  <text class="label" x="20" y="{:.1}" text-anchor="middle" transform="rotate(-90 20 {:.1})">{}</text>"#,
            (MARGIN_TOP + plot_bottom) / 2.0,
            (MARGIN_TOP + plot_bottom) / 2.0,
            html_escape(&self.y_label)
        );

        // One polyline plus point markers per series.
        for (idx, series) in self.series.iter().enumerate() {
            let color = PALETTE[idx % PALETTE.len()];
            let points: Vec<(f64, f64, f64)> = series
                .values
                .iter()
                .enumerate()
                .map(|(i, &v)| (self.x_at(i), self.y_at(v, y_max), v))
                .collect();

            let path = points
                .iter()
                .map(|(x, y, _)| format!("{x:.1},{y:.1}"))
                .collect::<Vec<_>>()
                .join(" ");
            let _ = writeln!(
                svg,
                r#"  <polyline class="series" fill="none" stroke="{color}" stroke-width="2" points="{path}"/>"#
            );
            for (i, (x, y, v)) in points.iter().enumerate() {
                let _ = writeln!(
                    svg,
                    r#"  <circle cx="{x:.1}" cy="{y:.1}" r="3" fill="{color}"><title>{} #{}: {v:.4}</title></circle>"#,
                    html_escape(&series.name),
                    i + 1
                );
            }

            let legend_y = MARGIN_TOP + 10.0 + idx as f64 * 22.0;
            let _ = writeln!(
                svg,
                r#"  <rect x="{:.1}" y="{:.1}" width="14" height="14" fill="{color}"/>"#,
                plot_right + 20.0,
                legend_y - 11.0
            );
            let _ = writeln!(
                svg,
                r#"  <text class="legend" x="{:.1}" y="{legend_y:.1}">{}</text>"#,
                plot_right + 40.0,
                html_escape(&series.name)
            );
        }

        svg.push_str("</svg>\n");
        svg
    }

    /// Render the chart as a standalone HTML document.
    pub fn to_html(&self) -> String {
        let points: usize = self.series.iter().map(|s| s.values.len()).sum();
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>{title}</title>
<style>
  body {{
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    margin: 0; padding: 2rem;
    background: #0f172a; color: #e2e8f0;
  }}
  h1 {{ font-size: 1.5rem; font-weight: 700; color: #f1f5f9; margin: 0 0 0.25rem; }}
  .meta {{ color: #64748b; font-size: 0.875rem; margin-bottom: 1.5rem; }}
  svg {{ background: #1e293b; border: 1px solid #334155; border-radius: 0.5rem; }}
  .grid {{ stroke: #334155; stroke-width: 1; }}
  .axis {{ stroke: #94a3b8; stroke-width: 1.5; }}
  .tick {{ fill: #94a3b8; font-size: 11px; }}
  .label {{ fill: #cbd5e1; font-size: 13px; }}
  .legend {{ fill: #e2e8f0; font-size: 13px; }}
</style>
</head>
<body>
<h1>{title}</h1>
<div class="meta">{series_count} series &bull; {points} points</div>
{svg}</body>
</html>
"#,
            title = html_escape(&self.title),
            series_count = self.series.len(),
            points = points,
            svg = self.to_svg(),
        )
    }
}

/// Build the chart for `metric` and write it to `path`.
pub async fn render_line_chart(
    rows: &[ResultRow],
    metric: Metric,
    title: &str,
    repeat: u32,
    path: impl AsRef<Path>,
) -> Result<(), HeybenchError> {
    let chart = LineChart::from_rows(rows, metric, title, repeat);
    tokio::fs::write(path.as_ref(), chart.to_html()).await?;
    tracing::info!("Chart written to {}", path.as_ref().display());
    Ok(())
}

/// Smallest of 1, 2, 2.5 or 5 times a power of ten that is >= `max`.
fn nice_upper_bound(max: f64) -> f64 {
    if !max.is_finite() || max <= 0.0 {
        return 1.0;
    }
    let magnitude = 10f64.powf(max.log10().floor());
    [1.0, 2.0, 2.5, 5.0, 10.0]
        .into_iter()
        .map(|m| m * magnitude)
        .find(|&bound| bound >= max)
        .unwrap_or(10.0 * magnitude)
}

fn format_tick(value: f64) -> String {
    let s = format!("{value:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() { "0".to_string() } else { s.to_string() }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
