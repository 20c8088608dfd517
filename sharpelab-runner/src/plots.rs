//! Static SVG line charts.
//!
//! Each chart is a date axis shared by one or more series. Non-finite values
//! (the warm-up of a rolling window, undefined correlations) break the line
//! instead of being drawn as zero.

use crate::metrics::{cumulative_returns, RollingCorrelation};
use chrono::{Datelike, NaiveDate};
use sharpelab_core::ReturnTable;
use std::fmt::Write as _;
use std::path::Path;
use thiserror::Error;

// 10x6 inches at 100 dpi.
const WIDTH: f64 = 1000.0;
const HEIGHT: f64 = 600.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 70.0;
const MAX_TICKS: f64 = 20.0;
const FLAT_SPAN: f64 = 1e-9;
const PALETTE: [&str; 8] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write plot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One line on a chart, aligned index-for-index with the chart's dates.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSeries {
    pub label: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub dates: Vec<NaiveDate>,
    pub series: Vec<LineSeries>,
}

impl LineChart {
    /// Render to an SVG document.
    pub fn to_svg(&self) -> String {
        let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        let (min_v, max_v) = extent(&self.series).unwrap_or((0.0, 1.0));
        let xs = x_positions(self.dates.len(), plot_w);
        let y_of = |v: f64| MARGIN_TOP + (1.0 - (v - min_v) / (max_v - min_v)) * plot_h;

        let mut svg = String::new();
        let _ = write!(
            svg,
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><style>text{{font-family:DejaVu Sans,Arial,sans-serif;font-size:12px;fill:#333}}</style><rect width="100%" height="100%" fill="#ffffff" />"##,
            w = WIDTH,
            h = HEIGHT
        );

        // Horizontal grid and y ticks.
        for tick in y_ticks(min_v, max_v) {
            let y = y_of(tick);
            let _ = write!(
                svg,
                r##"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="#dddddd" stroke-width="0.8" /><text x="{tx:.2}" y="{ty:.2}" text-anchor="end">{label}</text>"##,
                x1 = MARGIN_LEFT,
                x2 = MARGIN_LEFT + plot_w,
                tx = MARGIN_LEFT - 8.0,
                ty = y + 4.0,
                label = format_tick(tick, max_v - min_v)
            );
        }

        // Vertical grid and date ticks.
        for (idx, label) in date_ticks(&self.dates) {
            let x = MARGIN_LEFT + xs[idx];
            let _ = write!(
                svg,
                r##"<line x1="{x:.2}" y1="{y1:.2}" x2="{x:.2}" y2="{y2:.2}" stroke="#dddddd" stroke-width="0.8" /><text x="{x:.2}" y="{ty:.2}" text-anchor="middle">{label}</text>"##,
                y1 = MARGIN_TOP,
                y2 = MARGIN_TOP + plot_h,
                ty = MARGIN_TOP + plot_h + 18.0
            );
        }

        // Frame.
        let _ = write!(
            svg,
            r##"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="none" stroke="#000000" stroke-width="1" />"##,
            x = MARGIN_LEFT,
            y = MARGIN_TOP,
            w = plot_w,
            h = plot_h
        );

        for (k, series) in self.series.iter().enumerate() {
            let color = PALETTE[k % PALETTE.len()];
            // Values past the last date have no x position.
            let drawable = &series.values[..series.values.len().min(xs.len())];
            for segment in finite_segments(drawable) {
                let points = segment
                    .into_iter()
                    .map(|(i, v)| format!("{:.2},{:.2}", MARGIN_LEFT + xs[i], y_of(v)))
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = write!(
                    svg,
                    r#"<polyline fill="none" stroke="{color}" stroke-width="1.5" points="{points}" />"#
                );
            }
        }

        self.write_labels(&mut svg, plot_w, plot_h);
        self.write_legend(&mut svg);
        svg.push_str("</svg>\n");
        svg
    }

    fn write_labels(&self, svg: &mut String, plot_w: f64, plot_h: f64) {
        let cx = MARGIN_LEFT + plot_w / 2.0;
        let cy = MARGIN_TOP + plot_h / 2.0;
        let _ = write!(
            svg,
            r#"<text x="{cx:.2}" y="{ty:.2}" text-anchor="middle" font-size="16">{title}</text><text x="{cx:.2}" y="{xy:.2}" text-anchor="middle">{x_label}</text><text x="20" y="{cy:.2}" text-anchor="middle" transform="rotate(-90 20 {cy:.2})">{y_label}</text>"#,
            ty = MARGIN_TOP - 18.0,
            xy = HEIGHT - 20.0,
            title = escape_xml(&self.title),
            x_label = escape_xml(&self.x_label),
            y_label = escape_xml(&self.y_label)
        );
    }

    fn write_legend(&self, svg: &mut String) {
        let x = MARGIN_LEFT + 12.0;
        let mut y = MARGIN_TOP + 18.0;
        for (k, series) in self.series.iter().enumerate() {
            let color = PALETTE[k % PALETTE.len()];
            let _ = write!(
                svg,
                r##"<line x1="{x:.2}" y1="{ly:.2}" x2="{x2:.2}" y2="{ly:.2}" stroke="{color}" stroke-width="2" /><text x="{tx:.2}" y="{y:.2}" text-anchor="start">{label}</text>"##,
                ly = y - 4.0,
                x2 = x + 24.0,
                tx = x + 30.0,
                label = escape_xml(&series.label)
            );
            y += 18.0;
        }
    }

    /// Render and write to `path`, overwriting any existing file.
    ///
    /// The parent directory must already exist.
    pub fn write_svg(&self, path: &Path) -> Result<(), RenderError> {
        std::fs::write(path, self.to_svg()).map_err(|source| RenderError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "wrote plot");
        Ok(())
    }
}

/// Growth of one unit per ticker, `Π(1 + r)`.
pub fn cumulative_returns_chart(returns: &ReturnTable, title: impl Into<String>) -> LineChart {
    LineChart {
        title: title.into(),
        x_label: "Date".into(),
        y_label: "Cumulative Return".into(),
        dates: returns.dates().to_vec(),
        series: returns
            .iter_columns()
            .map(|(ticker, column)| LineSeries {
                label: ticker.to_string(),
                values: cumulative_returns(column),
            })
            .collect(),
    }
}

/// One line per non-benchmark ticker, labelled `TICKER vs <benchmark_label>`.
pub fn rolling_correlations_chart(
    dates: &[NaiveDate],
    rolling: &[RollingCorrelation],
    window: usize,
    benchmark_label: &str,
) -> LineChart {
    LineChart {
        title: format!("{window}-Day Rolling Correlation with {benchmark_label}"),
        x_label: "Date".into(),
        y_label: "Correlation".into(),
        dates: dates.to_vec(),
        series: rolling
            .iter()
            .map(|rc| LineSeries {
                label: format!("{} vs {benchmark_label}", rc.ticker),
                values: rc.values.clone(),
            })
            .collect(),
    }
}

// ─── Layout helpers ─────────────────────────────────────────────────

fn extent(series: &[LineSeries]) -> Option<(f64, f64)> {
    let mut min_v = f64::INFINITY;
    let mut max_v = f64::NEG_INFINITY;
    for v in series.iter().flat_map(|s| s.values.iter()) {
        if v.is_finite() {
            min_v = min_v.min(*v);
            max_v = max_v.max(*v);
        }
    }
    if !min_v.is_finite() || !max_v.is_finite() {
        return None;
    }
    // Spans of a few ulps are flat for drawing purposes.
    let magnitude = min_v.abs().max(max_v.abs());
    if max_v - min_v <= magnitude * FLAT_SPAN {
        let mid = min_v + (max_v - min_v) / 2.0;
        let adjust = if magnitude == 0.0 { 1.0 } else { magnitude * 0.1 };
        return Some((mid - adjust, mid + adjust));
    }
    let pad = (max_v - min_v) * 0.05;
    Some((min_v - pad, max_v + pad))
}

fn x_positions(len: usize, plot_w: f64) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        1 => vec![plot_w / 2.0],
        _ => (0..len)
            .map(|i| plot_w * i as f64 / (len - 1) as f64)
            .collect(),
    }
}

/// Runs of consecutive finite points, as `(index, value)` pairs.
fn finite_segments(values: &[f64]) -> Vec<Vec<(usize, f64)>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    for (i, &v) in values.iter().enumerate() {
        if v.is_finite() {
            current.push((i, v));
        } else if !current.is_empty() {
            segments.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Round tick positions covering `[min_v, max_v]`, about six of them.
fn y_ticks(min_v: f64, max_v: f64) -> Vec<f64> {
    let step = nice_step((max_v - min_v) / 6.0);
    if !(step.is_finite() && step > 0.0) {
        return Vec::new();
    }
    let first = (min_v / step).ceil();
    let last = ((max_v + step * 1e-9) / step).floor();
    if !(first.is_finite() && last.is_finite()) || last < first || last - first > MAX_TICKS {
        return Vec::new();
    }
    let count = (last - first) as usize;
    // Multiply from integer indices so ticks snap (no 0.30000000000000004).
    (0..=count).map(|k| (first + k as f64) * step).collect()
}

fn nice_step(raw: f64) -> f64 {
    if !(raw.is_finite() && raw > 0.0) {
        return f64::NAN;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let fraction = raw / magnitude;
    let nice = if fraction <= 1.0 {
        1.0
    } else if fraction <= 2.0 {
        2.0
    } else if fraction <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

fn format_tick(value: f64, span: f64) -> String {
    let decimals = if span >= 10.0 {
        0
    } else if span >= 1.0 {
        1
    } else {
        2
    };
    format!("{value:.decimals$}")
}

/// Tick label positions: first trading day of each year for multi-year
/// ranges, of each month otherwise.
fn date_ticks(dates: &[NaiveDate]) -> Vec<(usize, String)> {
    let (Some(first), Some(last)) = (dates.first(), dates.last()) else {
        return Vec::new();
    };
    let yearly = (*last - *first).num_days() > 2 * 365;

    let mut ticks = Vec::new();
    let mut last_key = None;
    for (i, date) in dates.iter().enumerate() {
        let key = if yearly {
            (date.year(), 1)
        } else {
            (date.year(), date.month())
        };
        if last_key == Some(key) {
            continue;
        }
        last_key = Some(key);
        let label = if yearly {
            date.format("%Y").to_string()
        } else {
            date.format("%Y-%m").to_string()
        };
        ticks.push((i, label));
    }
    ticks
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
