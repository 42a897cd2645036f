// Chart Renderer - plotters drawing layer
// One owned canvas per chart, consumed into a base64 PNG; no shared drawing state

use crate::aggregate::{Aggregate, CorrelationMatrix, Pivot};
use crate::error::{InsightError, Result};
use crate::summary::{percentile, sample_std};
use crate::table::format_number;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::io::Cursor;

// ============================================================================
// CONFIGURATION
// ============================================================================

pub const CANVAS_WIDTH: u32 = 1200;
pub const CANVAS_HEIGHT: u32 = 600;

/// Renderer configuration, resolved once at process start and passed into
/// every render call. The treemap flag combines the compile-time capability
/// with a runtime switch.
#[derive(Debug, Clone, Copy)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub treemap: bool,
}

impl RenderConfig {
    pub fn detect() -> Self {
        RenderConfig {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            treemap: true,
        }
    }

    pub fn with_treemap(mut self, enabled: bool) -> Self {
        self.treemap = enabled;
        self
    }

    /// True only when the treemap capability is compiled in and enabled.
    pub fn treemap_available(&self) -> bool {
        cfg!(feature = "treemap") && self.treemap
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self::detect()
    }
}

// Fixed series palette; indexed per series so repeated renders of the same
// aggregate pick the same colors.
const SERIES_COLORS: [RGBColor; 12] = [
    RGBColor(41, 121, 255),
    RGBColor(255, 99, 71),
    RGBColor(50, 168, 82),
    RGBColor(255, 165, 0),
    RGBColor(138, 43, 226),
    RGBColor(0, 139, 139),
    RGBColor(255, 20, 147),
    RGBColor(95, 158, 160),
    RGBColor(255, 191, 0),
    RGBColor(106, 90, 205),
    RGBColor(205, 92, 92),
    RGBColor(60, 179, 113),
];

fn series_color(index: usize) -> RGBColor {
    SERIES_COLORS[index % SERIES_COLORS.len()]
}

// ============================================================================
// CANVAS
// ============================================================================

/// Explicitly scoped rendering context: an owned RGB buffer that the drawing
/// backend borrows for the duration of one chart, then `encode` consumes the
/// whole canvas into a base64 PNG. Nothing outlives the call, so concurrent
/// requests can never share drawing state.
pub struct Canvas {
    width: u32,
    height: u32,
    buffer: Vec<u8>,
}

impl Canvas {
    pub fn new(config: &RenderConfig) -> Self {
        Canvas {
            width: config.width,
            height: config.height,
            buffer: vec![255u8; (config.width * config.height * 3) as usize],
        }
    }

    pub fn drawing_area(&mut self) -> DrawingArea<BitMapBackend<'_>, Shift> {
        BitMapBackend::with_buffer(&mut self.buffer, (self.width, self.height)).into_drawing_area()
    }

    /// Consume the canvas into a base64-encoded PNG.
    pub fn encode(self, title: &str) -> Result<String> {
        let image = RgbImage::from_raw(self.width, self.height, self.buffer)
            .ok_or_else(|| InsightError::render(title, "canvas buffer size mismatch"))?;
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| InsightError::render(title, e))?;
        Ok(STANDARD.encode(png))
    }
}

// ============================================================================
// LINE / AREA CHARTS (numeric x axis)
// ============================================================================

/// Single-series line chart over numeric x values.
pub fn line_chart(
    config: &RenderConfig,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    points: &[(f64, f64)],
) -> Result<String> {
    if points.is_empty() {
        return empty_chart(config, title);
    }

    let mut canvas = Canvas::new(config);
    {
        let root = canvas.drawing_area();
        root.fill(&WHITE)
            .map_err(|e| InsightError::render(title, e))?;

        let (x_range, y_range) = numeric_ranges(points);
        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 32))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, y_range)
            .map_err(|e| InsightError::render(title, e))?;

        chart
            .configure_mesh()
            .x_desc(x_desc)
            .y_desc(y_desc)
            .x_label_formatter(&|x| format!("{:.0}", x))
            .label_style(("sans-serif", 16))
            .light_line_style(RGBColor(240, 240, 245))
            .draw()
            .map_err(|e| InsightError::render(title, e))?;

        let color = series_color(0);
        chart
            .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(3)))
            .map_err(|e| InsightError::render(title, e))?;
        chart
            .draw_series(
                points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 4, color.filled())),
            )
            .map_err(|e| InsightError::render(title, e))?;

        root.present().map_err(|e| InsightError::render(title, e))?;
    }
    canvas.encode(title)
}

/// One line per series over a shared numeric x axis, with a legend.
pub fn multi_line_chart(
    config: &RenderConfig,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    series: &[(String, Vec<(f64, f64)>)],
) -> Result<String> {
    let all_points: Vec<(f64, f64)> = series.iter().flat_map(|(_, p)| p.iter().copied()).collect();
    if all_points.is_empty() {
        return empty_chart(config, title);
    }

    let mut canvas = Canvas::new(config);
    {
        let root = canvas.drawing_area();
        root.fill(&WHITE)
            .map_err(|e| InsightError::render(title, e))?;

        let (x_range, y_range) = numeric_ranges(&all_points);
        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 32))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, y_range)
            .map_err(|e| InsightError::render(title, e))?;

        chart
            .configure_mesh()
            .x_desc(x_desc)
            .y_desc(y_desc)
            .x_label_formatter(&|x| format!("{:.0}", x))
            .label_style(("sans-serif", 16))
            .light_line_style(RGBColor(240, 240, 245))
            .draw()
            .map_err(|e| InsightError::render(title, e))?;

        for (index, (name, points)) in series.iter().enumerate() {
            let color = series_color(index);
            chart
                .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(3)))
                .map_err(|e| InsightError::render(title, e))?
                .label(name.clone())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(3))
                });
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .label_font(("sans-serif", 16))
            .draw()
            .map_err(|e| InsightError::render(title, e))?;

        root.present().map_err(|e| InsightError::render(title, e))?;
    }
    canvas.encode(title)
}

/// Filled area rendering of per-key sums over a numeric x axis.
pub fn area_chart(
    config: &RenderConfig,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    points: &[(f64, f64)],
) -> Result<String> {
    if points.is_empty() {
        return empty_chart(config, title);
    }

    let mut canvas = Canvas::new(config);
    {
        let root = canvas.drawing_area();
        root.fill(&WHITE)
            .map_err(|e| InsightError::render(title, e))?;

        let (x_range, y_range) = numeric_ranges(points);
        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 32))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x_range, y_range)
            .map_err(|e| InsightError::render(title, e))?;

        chart
            .configure_mesh()
            .x_desc(x_desc)
            .y_desc(y_desc)
            .x_label_formatter(&|x| format!("{:.0}", x))
            .label_style(("sans-serif", 16))
            .light_line_style(RGBColor(240, 240, 245))
            .draw()
            .map_err(|e| InsightError::render(title, e))?;

        let color = series_color(0);
        chart
            .draw_series(
                AreaSeries::new(points.iter().copied(), 0.0, color.mix(0.35)).border_style(color),
            )
            .map_err(|e| InsightError::render(title, e))?;

        root.present().map_err(|e| InsightError::render(title, e))?;
    }
    canvas.encode(title)
}

// ============================================================================
// BAR CHARTS (categorical x axis)
// ============================================================================

/// Vertical bar chart over categorical keys.
pub fn bar_chart(config: &RenderConfig, title: &str, y_desc: &str, agg: &Aggregate) -> Result<String> {
    if agg.is_empty() {
        return empty_chart(config, title);
    }
    let keys = agg.keys();
    let values = agg.values();

    let mut canvas = Canvas::new(config);
    {
        let root = canvas.drawing_area();
        root.fill(&WHITE)
            .map_err(|e| InsightError::render(title, e))?;

        let y_max = values.iter().cloned().fold(0.0, f64::max).max(1.0) * 1.15;
        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 32))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.5..keys.len() as f64 - 0.5, 0.0..y_max)
            .map_err(|e| InsightError::render(title, e))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .y_desc(y_desc)
            .x_labels(keys.len().max(2))
            .x_label_formatter(&|x| category_label(&keys, x))
            .label_style(("sans-serif", 16))
            .light_line_style(RGBColor(240, 240, 245))
            .draw()
            .map_err(|e| InsightError::render(title, e))?;

        for (index, value) in values.iter().enumerate() {
            let color = series_color(index);
            let x = index as f64;
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(x - 0.35, 0.0), (x + 0.35, *value)],
                    color.mix(0.85).filled(),
                )))
                .map_err(|e| InsightError::render(title, e))?;
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(x - 0.35, 0.0), (x + 0.35, *value)],
                    color.stroke_width(1),
                )))
                .map_err(|e| InsightError::render(title, e))?;
            chart
                .draw_series(std::iter::once(Text::new(
                    format_number(*value),
                    (x, *value + y_max * 0.02),
                    ("sans-serif", 15).into_font().color(&RGBColor(60, 60, 80)),
                )))
                .map_err(|e| InsightError::render(title, e))?;
        }

        root.present().map_err(|e| InsightError::render(title, e))?;
    }
    canvas.encode(title)
}

/// Stacked bar chart from a zero-filled pivot: one bar per row key, one
/// stacked segment per column key, legend mapping colors to column keys.
pub fn stacked_bar_chart(config: &RenderConfig, title: &str, y_desc: &str, pivot: &Pivot) -> Result<String> {
    if pivot.row_keys.is_empty() {
        return empty_chart(config, title);
    }

    let mut canvas = Canvas::new(config);
    {
        let root = canvas.drawing_area();
        root.fill(&WHITE)
            .map_err(|e| InsightError::render(title, e))?;

        let y_max = pivot.max_row_total().max(1.0) * 1.15;
        let keys = pivot.row_keys.clone();
        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 32))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.5..keys.len() as f64 - 0.5, 0.0..y_max)
            .map_err(|e| InsightError::render(title, e))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .y_desc(y_desc)
            .x_labels(keys.len().max(2))
            .x_label_formatter(&|x| category_label(&keys, x))
            .label_style(("sans-serif", 16))
            .light_line_style(RGBColor(240, 240, 245))
            .draw()
            .map_err(|e| InsightError::render(title, e))?;

        for (col, col_key) in pivot.col_keys.iter().enumerate() {
            let color = series_color(col);
            chart
                .draw_series((0..pivot.row_keys.len()).map(|row| {
                    let base: f64 = pivot.values[row][..col].iter().sum();
                    let value = pivot.values[row][col];
                    let x = row as f64;
                    Rectangle::new(
                        [(x - 0.35, base), (x + 0.35, base + value)],
                        color.mix(0.85).filled(),
                    )
                }))
                .map_err(|e| InsightError::render(title, e))?
                .label(col_key.clone())
                .legend(move |(x, y)| {
                    Rectangle::new([(x, y - 6), (x + 12, y + 6)], color.mix(0.85).filled())
                });
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .label_font(("sans-serif", 16))
            .draw()
            .map_err(|e| InsightError::render(title, e))?;

        root.present().map_err(|e| InsightError::render(title, e))?;
    }
    canvas.encode(title)
}

// ============================================================================
// DISTRIBUTION CHARTS
// ============================================================================

/// Box-and-whisker plot per group: quartile box, 1.5·IQR whiskers, outlier
/// dots. Quartiles reuse the summary module's linear-interpolation formula.
pub fn box_chart(
    config: &RenderConfig,
    title: &str,
    y_desc: &str,
    groups: &[(String, Vec<f64>)],
) -> Result<String> {
    if groups.iter().all(|(_, values)| values.is_empty()) {
        return empty_chart(config, title);
    }

    let mut canvas = Canvas::new(config);
    {
        let root = canvas.drawing_area();
        root.fill(&WHITE)
            .map_err(|e| InsightError::render(title, e))?;

        let keys: Vec<String> = groups.iter().map(|(k, _)| k.clone()).collect();
        let y_range = value_range(groups.iter().flat_map(|(_, v)| v.iter().copied()));
        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 32))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.5..keys.len() as f64 - 0.5, y_range)
            .map_err(|e| InsightError::render(title, e))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .y_desc(y_desc)
            .x_labels(keys.len().max(2))
            .x_label_formatter(&|x| category_label(&keys, x))
            .label_style(("sans-serif", 16))
            .light_line_style(RGBColor(240, 240, 245))
            .draw()
            .map_err(|e| InsightError::render(title, e))?;

        for (index, (_, values)) in groups.iter().enumerate() {
            if values.is_empty() {
                continue;
            }
            let mut sorted = values.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let q1 = percentile(&sorted, 0.25);
            let median = percentile(&sorted, 0.5);
            let q3 = percentile(&sorted, 0.75);
            let iqr = q3 - q1;
            let lo_fence = q1 - 1.5 * iqr;
            let hi_fence = q3 + 1.5 * iqr;
            let whisker_lo = sorted
                .iter()
                .copied()
                .find(|v| *v >= lo_fence)
                .unwrap_or(q1);
            let whisker_hi = sorted
                .iter()
                .rev()
                .copied()
                .find(|v| *v <= hi_fence)
                .unwrap_or(q3);

            let x = index as f64;
            let color = series_color(index);
            let elements: Vec<PathElement<(f64, f64)>> = vec![
                // whisker stems and caps
                PathElement::new(vec![(x, q3), (x, whisker_hi)], color.stroke_width(2)),
                PathElement::new(vec![(x, q1), (x, whisker_lo)], color.stroke_width(2)),
                PathElement::new(
                    vec![(x - 0.12, whisker_hi), (x + 0.12, whisker_hi)],
                    color.stroke_width(2),
                ),
                PathElement::new(
                    vec![(x - 0.12, whisker_lo), (x + 0.12, whisker_lo)],
                    color.stroke_width(2),
                ),
                // median line
                PathElement::new(vec![(x - 0.25, median), (x + 0.25, median)], BLACK.stroke_width(2)),
            ];

            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(x - 0.25, q1), (x + 0.25, q3)],
                    color.mix(0.4).filled(),
                )))
                .map_err(|e| InsightError::render(title, e))?;
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(x - 0.25, q1), (x + 0.25, q3)],
                    color.stroke_width(2),
                )))
                .map_err(|e| InsightError::render(title, e))?;
            chart
                .draw_series(elements)
                .map_err(|e| InsightError::render(title, e))?;
            chart
                .draw_series(
                    sorted
                        .iter()
                        .filter(|v| **v < lo_fence || **v > hi_fence)
                        .map(|v| Circle::new((x, *v), 3, color.filled())),
                )
                .map_err(|e| InsightError::render(title, e))?;
        }

        root.present().map_err(|e| InsightError::render(title, e))?;
    }
    canvas.encode(title)
}

/// Violin plot per group: symmetric gaussian kernel density outline around
/// each category position.
pub fn violin_chart(
    config: &RenderConfig,
    title: &str,
    y_desc: &str,
    groups: &[(String, Vec<f64>)],
) -> Result<String> {
    if groups.iter().all(|(_, values)| values.is_empty()) {
        return empty_chart(config, title);
    }

    let mut canvas = Canvas::new(config);
    {
        let root = canvas.drawing_area();
        root.fill(&WHITE)
            .map_err(|e| InsightError::render(title, e))?;

        let keys: Vec<String> = groups.iter().map(|(k, _)| k.clone()).collect();
        let y_range = value_range(groups.iter().flat_map(|(_, v)| v.iter().copied()));
        let axis_span = y_range.end - y_range.start;
        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 32))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.5..keys.len() as f64 - 0.5, y_range)
            .map_err(|e| InsightError::render(title, e))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .y_desc(y_desc)
            .x_labels(keys.len().max(2))
            .x_label_formatter(&|x| category_label(&keys, x))
            .label_style(("sans-serif", 16))
            .light_line_style(RGBColor(240, 240, 245))
            .draw()
            .map_err(|e| InsightError::render(title, e))?;

        for (index, (_, values)) in groups.iter().enumerate() {
            if values.is_empty() {
                continue;
            }
            let x = index as f64;
            let color = series_color(index);
            let outline = violin_outline(values, x, axis_span);
            chart
                .draw_series(std::iter::once(Polygon::new(
                    outline.clone(),
                    color.mix(0.5).filled(),
                )))
                .map_err(|e| InsightError::render(title, e))?;
            chart
                .draw_series(std::iter::once(PathElement::new(outline, color.stroke_width(1))))
                .map_err(|e| InsightError::render(title, e))?;

            // interior median marker
            let mut sorted = values.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let median = percentile(&sorted, 0.5);
            chart
                .draw_series(std::iter::once(Circle::new((x, median), 4, BLACK.filled())))
                .map_err(|e| InsightError::render(title, e))?;
        }

        root.present().map_err(|e| InsightError::render(title, e))?;
    }
    canvas.encode(title)
}

/// Symmetric density outline for one violin, widest point 0.38 axis units.
fn violin_outline(values: &[f64], center: f64, axis_span: f64) -> Vec<(f64, f64)> {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let std = sample_std(values);
    let bandwidth = if std.is_nan() || std <= 0.0 {
        (axis_span * 0.05).max(1e-6)
    } else {
        1.06 * std * (values.len() as f64).powf(-0.2)
    };

    let lo = min - 2.0 * bandwidth;
    let hi = max + 2.0 * bandwidth;
    let steps = 40;
    let densities: Vec<(f64, f64)> = (0..=steps)
        .map(|i| {
            let t = lo + (hi - lo) * i as f64 / steps as f64;
            (t, gaussian_kde(values, t, bandwidth))
        })
        .collect();
    let peak = densities
        .iter()
        .map(|(_, d)| *d)
        .fold(f64::MIN_POSITIVE, f64::max);

    let mut outline: Vec<(f64, f64)> = densities
        .iter()
        .map(|(t, d)| (center + 0.38 * d / peak, *t))
        .collect();
    outline.extend(
        densities
            .iter()
            .rev()
            .map(|(t, d)| (center - 0.38 * d / peak, *t)),
    );
    outline
}

fn gaussian_kde(values: &[f64], at: f64, bandwidth: f64) -> f64 {
    let norm = 1.0 / ((2.0 * std::f64::consts::PI).sqrt() * bandwidth * values.len() as f64);
    values
        .iter()
        .map(|v| (-0.5 * ((at - v) / bandwidth).powi(2)).exp())
        .sum::<f64>()
        * norm
}

// ============================================================================
// PIXEL-SPACE CHARTS (pie, heatmap, treemap)
// ============================================================================

/// Pie chart with percentage labels inside the slices and key labels outside.
pub fn pie_chart(config: &RenderConfig, title: &str, agg: &Aggregate) -> Result<String> {
    let total = agg.total();
    if agg.is_empty() || total <= 0.0 {
        return empty_chart(config, title);
    }

    let mut canvas = Canvas::new(config);
    {
        let root = canvas.drawing_area();
        root.fill(&WHITE)
            .map_err(|e| InsightError::render(title, e))?;
        let area = root
            .titled(title, ("sans-serif", 32).into_font())
            .map_err(|e| InsightError::render(title, e))?;

        let (width, height) = area.dim_in_pixel();
        let center = (width as i32 * 2 / 5, height as i32 / 2);
        let radius = (height as f64 * 0.38).min(width as f64 * 0.25);

        let mut start_angle = -std::f64::consts::FRAC_PI_2;
        for (index, (key, value)) in agg.pairs().iter().enumerate() {
            let fraction = value / total;
            if fraction <= 0.0 {
                continue;
            }
            let sweep = fraction * 2.0 * std::f64::consts::PI;
            let end_angle = start_angle + sweep;
            let color = series_color(index);

            // slice polygon: center plus arc points
            let steps = ((sweep * 40.0).ceil() as usize).max(2);
            let mut points = vec![center];
            for step in 0..=steps {
                let angle = start_angle + sweep * step as f64 / steps as f64;
                points.push((
                    center.0 + (radius * angle.cos()) as i32,
                    center.1 + (radius * angle.sin()) as i32,
                ));
            }
            area.draw(&Polygon::new(points.clone(), color.mix(0.85).filled()))
                .map_err(|e| InsightError::render(title, e))?;
            area.draw(&Polygon::new(points, WHITE.stroke_width(1)))
                .map_err(|e| InsightError::render(title, e))?;

            let mid_angle = start_angle + sweep / 2.0;
            if fraction > 0.04 {
                let label_pos = (
                    center.0 + (radius * 0.6 * mid_angle.cos()) as i32,
                    center.1 + (radius * 0.6 * mid_angle.sin()) as i32,
                );
                area.draw(&Text::new(
                    format!("{:.1}%", fraction * 100.0),
                    label_pos,
                    ("sans-serif", 18).into_font().color(&WHITE),
                ))
                .map_err(|e| InsightError::render(title, e))?;
            }
            let key_pos = (
                center.0 + (radius * 1.12 * mid_angle.cos()) as i32,
                center.1 + (radius * 1.12 * mid_angle.sin()) as i32,
            );
            area.draw(&Text::new(
                key.clone(),
                key_pos,
                ("sans-serif", 18).into_font().color(&RGBColor(60, 60, 80)),
            ))
            .map_err(|e| InsightError::render(title, e))?;

            start_angle = end_angle;
        }

        // legend with absolute totals on the right
        let legend_x = width as i32 * 7 / 10;
        let mut legend_y = height as i32 / 2 - agg.len() as i32 * 14;
        for (index, (key, value)) in agg.pairs().iter().enumerate() {
            let color = series_color(index);
            area.draw(&Rectangle::new(
                [(legend_x, legend_y - 8), (legend_x + 16, legend_y + 8)],
                color.mix(0.85).filled(),
            ))
            .map_err(|e| InsightError::render(title, e))?;
            area.draw(&Text::new(
                format!("{}: {}", key, format_number(*value)),
                (legend_x + 24, legend_y - 8),
                ("sans-serif", 18).into_font().color(&RGBColor(60, 60, 80)),
            ))
            .map_err(|e| InsightError::render(title, e))?;
            legend_y += 28;
        }

        root.present().map_err(|e| InsightError::render(title, e))?;
    }
    canvas.encode(title)
}

/// Annotated correlation heatmap over the numeric columns. NaN cells render
/// gray with no annotation.
pub fn heatmap_chart(config: &RenderConfig, title: &str, matrix: &CorrelationMatrix) -> Result<String> {
    if matrix.labels.is_empty() {
        return empty_chart(config, title);
    }

    let mut canvas = Canvas::new(config);
    {
        let root = canvas.drawing_area();
        root.fill(&WHITE)
            .map_err(|e| InsightError::render(title, e))?;
        let area = root
            .titled(title, ("sans-serif", 32).into_font())
            .map_err(|e| InsightError::render(title, e))?;

        let (width, height) = area.dim_in_pixel();
        let n = matrix.labels.len() as i32;
        let left = 220;
        let top = 50;
        let cell = ((width as i32 - left - 60) / n).min((height as i32 - top - 60) / n);

        for (row, row_values) in matrix.values.iter().enumerate() {
            for (col, value) in row_values.iter().enumerate() {
                let x0 = left + col as i32 * cell;
                let y0 = top + row as i32 * cell;
                area.draw(&Rectangle::new(
                    [(x0, y0), (x0 + cell, y0 + cell)],
                    correlation_color(*value).filled(),
                ))
                .map_err(|e| InsightError::render(title, e))?;
                area.draw(&Rectangle::new(
                    [(x0, y0), (x0 + cell, y0 + cell)],
                    WHITE.stroke_width(2),
                ))
                .map_err(|e| InsightError::render(title, e))?;

                if !value.is_nan() {
                    let text_color = if value.abs() > 0.6 { WHITE } else { BLACK };
                    area.draw(&Text::new(
                        format!("{:.2}", value),
                        (x0 + cell / 2 - 16, y0 + cell / 2 - 9),
                        ("sans-serif", 18).into_font().color(&text_color),
                    ))
                    .map_err(|e| InsightError::render(title, e))?;
                }
            }
        }

        for (index, label) in matrix.labels.iter().enumerate() {
            // row labels on the left, column labels underneath the grid
            area.draw(&Text::new(
                label.clone(),
                (20, top + index as i32 * cell + cell / 2 - 9),
                ("sans-serif", 16).into_font().color(&RGBColor(60, 60, 80)),
            ))
            .map_err(|e| InsightError::render(title, e))?;
            area.draw(&Text::new(
                label.clone(),
                (left + index as i32 * cell + 6, top + n * cell + 10),
                ("sans-serif", 16).into_font().color(&RGBColor(60, 60, 80)),
            ))
            .map_err(|e| InsightError::render(title, e))?;
        }

        root.present().map_err(|e| InsightError::render(title, e))?;
    }
    canvas.encode(title)
}

/// Diverging blue-white-red map for correlation values in [-1, 1].
fn correlation_color(value: f64) -> RGBColor {
    if value.is_nan() {
        return RGBColor(225, 225, 225);
    }
    let v = value.clamp(-1.0, 1.0);
    if v >= 0.0 {
        let t = (v * 190.0) as u8;
        RGBColor(255, 255 - t, 255 - t)
    } else {
        let t = (-v * 190.0) as u8;
        RGBColor(255 - t, 255 - t, 255)
    }
}

// ============================================================================
// TREEMAP (optional capability)
// ============================================================================

#[cfg(feature = "treemap")]
pub fn treemap_chart(config: &RenderConfig, title: &str, agg: &Aggregate) -> Result<String> {
    let entries: Vec<(String, f64)> = agg
        .pairs()
        .iter()
        .filter(|(_, v)| *v > 0.0)
        .cloned()
        .collect();
    if entries.is_empty() {
        return empty_chart(config, title);
    }

    let mut canvas = Canvas::new(config);
    {
        let root = canvas.drawing_area();
        root.fill(&WHITE)
            .map_err(|e| InsightError::render(title, e))?;
        let area = root
            .titled(title, ("sans-serif", 32).into_font())
            .map_err(|e| InsightError::render(title, e))?;

        let (width, height) = area.dim_in_pixel();
        let frame = RectF {
            x: 30.0,
            y: 30.0,
            w: width as f64 - 60.0,
            h: height as f64 - 60.0,
        };
        let cells = squarify(&entries, frame);

        for (index, (key, value, rect)) in cells.iter().enumerate() {
            let color = series_color(index);
            let corners = [
                (rect.x as i32, rect.y as i32),
                ((rect.x + rect.w) as i32, (rect.y + rect.h) as i32),
            ];
            area.draw(&Rectangle::new(corners, color.mix(0.8).filled()))
                .map_err(|e| InsightError::render(title, e))?;
            area.draw(&Rectangle::new(corners, WHITE.stroke_width(3)))
                .map_err(|e| InsightError::render(title, e))?;

            if rect.w > 70.0 && rect.h > 40.0 {
                area.draw(&Text::new(
                    key.clone(),
                    (rect.x as i32 + 10, rect.y as i32 + 10),
                    ("sans-serif", 20).into_font().color(&WHITE),
                ))
                .map_err(|e| InsightError::render(title, e))?;
                area.draw(&Text::new(
                    format_number(*value),
                    (rect.x as i32 + 10, rect.y as i32 + 34),
                    ("sans-serif", 16).into_font().color(&WHITE),
                ))
                .map_err(|e| InsightError::render(title, e))?;
            }
        }

        root.present().map_err(|e| InsightError::render(title, e))?;
    }
    canvas.encode(title)
}

#[cfg(feature = "treemap")]
#[derive(Debug, Clone, Copy)]
struct RectF {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

/// Squarified treemap layout: entries are laid out largest-first in strips
/// along the shorter side of the remaining rectangle, fixing each strip once
/// adding another entry would worsen its worst aspect ratio.
#[cfg(feature = "treemap")]
fn squarify(entries: &[(String, f64)], frame: RectF) -> Vec<(String, f64, RectF)> {
    let total: f64 = entries.iter().map(|(_, v)| v).sum();
    let scale = frame.w * frame.h / total;
    let mut sorted: Vec<(String, f64, f64)> = entries
        .iter()
        .map(|(k, v)| (k.clone(), *v, v * scale))
        .collect();
    sorted.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut out = Vec::with_capacity(sorted.len());
    let mut remaining = frame;
    let mut row: Vec<(String, f64, f64)> = Vec::new();

    for entry in sorted {
        let side = remaining.w.min(remaining.h);
        let mut candidate: Vec<f64> = row.iter().map(|(_, _, a)| *a).collect();
        candidate.push(entry.2);
        if row.is_empty()
            || worst_ratio(&candidate, side) <= worst_ratio(&row.iter().map(|(_, _, a)| *a).collect::<Vec<_>>(), side)
        {
            row.push(entry);
        } else {
            layout_row(&row, &mut remaining, &mut out);
            row = vec![entry];
        }
    }
    if !row.is_empty() {
        layout_row(&row, &mut remaining, &mut out);
    }
    out
}

#[cfg(feature = "treemap")]
fn worst_ratio(areas: &[f64], side: f64) -> f64 {
    let sum: f64 = areas.iter().sum();
    if sum <= 0.0 || side <= 0.0 {
        return f64::INFINITY;
    }
    let max = areas.iter().cloned().fold(f64::MIN, f64::max);
    let min = areas.iter().cloned().fold(f64::MAX, f64::min);
    let s2 = sum * sum;
    let side2 = side * side;
    f64::max(side2 * max / s2, s2 / (side2 * min))
}

#[cfg(feature = "treemap")]
fn layout_row(row: &[(String, f64, f64)], remaining: &mut RectF, out: &mut Vec<(String, f64, RectF)>) {
    let sum: f64 = row.iter().map(|(_, _, a)| a).sum();
    if remaining.w >= remaining.h {
        // vertical strip along the left edge
        let strip = sum / remaining.h;
        let mut y = remaining.y;
        for (key, value, area) in row {
            let h = area / strip;
            out.push((key.clone(), *value, RectF { x: remaining.x, y, w: strip, h }));
            y += h;
        }
        remaining.x += strip;
        remaining.w -= strip;
    } else {
        // horizontal strip along the top edge
        let strip = sum / remaining.w;
        let mut x = remaining.x;
        for (key, value, area) in row {
            let w = area / strip;
            out.push((key.clone(), *value, RectF { x, y: remaining.y, w, h: strip }));
            x += w;
        }
        remaining.y += strip;
        remaining.h -= strip;
    }
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// Blank canvas with only the title, for charts whose input has no rows.
fn empty_chart(config: &RenderConfig, title: &str) -> Result<String> {
    let mut canvas = Canvas::new(config);
    {
        let root = canvas.drawing_area();
        root.fill(&WHITE)
            .map_err(|e| InsightError::render(title, e))?;
        root.titled(title, ("sans-serif", 32).into_font())
            .map_err(|e| InsightError::render(title, e))?;
        root.present().map_err(|e| InsightError::render(title, e))?;
    }
    canvas.encode(title)
}

/// Axis label for a categorical position: the key at the nearest integer
/// tick, blank between ticks.
fn category_label(keys: &[String], x: &f64) -> String {
    let nearest = x.round();
    if (x - nearest).abs() > 0.01 || nearest < 0.0 {
        return String::new();
    }
    keys.get(nearest as usize).cloned().unwrap_or_default()
}

/// Padded axis ranges around a non-empty point set.
fn numeric_ranges(points: &[(f64, f64)]) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let x_min = points.iter().map(|(x, _)| *x).fold(f64::INFINITY, f64::min);
    let x_max = points.iter().map(|(x, _)| *x).fold(f64::NEG_INFINITY, f64::max);
    let y_max = points.iter().map(|(_, y)| *y).fold(0.0, f64::max).max(1.0);
    let x_pad = ((x_max - x_min) * 0.05).max(0.5);
    (x_min - x_pad..x_max + x_pad, 0.0..y_max * 1.1)
}

/// Padded y range over raw distribution values.
fn value_range(values: impl Iterator<Item = f64>) -> std::ops::Range<f64> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    let pad = ((max - min) * 0.1).max(1.0);
    min - pad..max + pad
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{correlation_matrix, group_sum, grouped_values, pivot_sum};
    use crate::table::Table;

    const SAMPLE: &str = "\
Year,Number_of_Students,Branch,Category,Gender
2019,120,CSE,General,Male
2019,80,ECE,OBC,Female
2020,150,CSE,General,Female
2020,90,ECE,SC,Male
2021,200,CSE,General,Male
";

    fn sample_table() -> Table {
        Table::from_csv_bytes(SAMPLE.as_bytes()).unwrap()
    }

    fn assert_png(encoded: &str) {
        // base64 of the PNG signature bytes
        assert!(encoded.starts_with("iVBOR"), "not a PNG: {}...", &encoded[..16.min(encoded.len())]);
    }

    #[test]
    fn test_line_chart_renders_png() {
        let cfg = RenderConfig::detect();
        let agg = group_sum(&sample_table(), "Year", "Number_of_Students").unwrap();
        let points: Vec<(f64, f64)> = agg
            .pairs()
            .iter()
            .map(|(k, v)| (k.parse::<f64>().unwrap(), *v))
            .collect();
        let encoded = line_chart(&cfg, "Overall Trend", "Year", "Students", &points).unwrap();
        assert_png(&encoded);
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let cfg = RenderConfig::detect();
        let agg = group_sum(&sample_table(), "Branch", "Number_of_Students").unwrap();
        let first = bar_chart(&cfg, "Students by Branch", "Students", &agg).unwrap();
        let second = bar_chart(&cfg, "Students by Branch", "Students", &agg).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_bar_chart_renders_png() {
        let cfg = RenderConfig::detect();
        let agg = group_sum(&sample_table(), "Category", "Number_of_Students").unwrap();
        assert_png(&bar_chart(&cfg, "Students by Category", "Students", &agg).unwrap());
    }

    #[test]
    fn test_stacked_bar_renders_png() {
        let cfg = RenderConfig::detect();
        let pivot = pivot_sum(&sample_table(), "Year", "Gender", "Number_of_Students").unwrap();
        assert_png(&stacked_bar_chart(&cfg, "Students by Year and Gender", "Students", &pivot).unwrap());
    }

    #[test]
    fn test_pie_chart_renders_png() {
        let cfg = RenderConfig::detect();
        let agg = group_sum(&sample_table(), "Branch", "Number_of_Students").unwrap();
        assert_png(&pie_chart(&cfg, "Proportion by Branch", &agg).unwrap());
    }

    #[test]
    fn test_box_and_violin_render_png() {
        let cfg = RenderConfig::detect();
        let groups = grouped_values(&sample_table(), "Branch", "Number_of_Students").unwrap();
        assert_png(&box_chart(&cfg, "Boxplot by Branch", "Students", &groups).unwrap());
        assert_png(&violin_chart(&cfg, "Violin Plot by Gender", "Students", &groups).unwrap());
    }

    #[test]
    fn test_heatmap_renders_png() {
        let cfg = RenderConfig::detect();
        let matrix = correlation_matrix(&sample_table());
        assert_png(&heatmap_chart(&cfg, "Correlation Heatmap", &matrix).unwrap());
    }

    #[test]
    fn test_area_chart_renders_png() {
        let cfg = RenderConfig::detect();
        let points = [(2019.0, 200.0), (2020.0, 240.0), (2021.0, 200.0)];
        assert_png(&area_chart(&cfg, "Cumulative Students by Year", "Year", "Students", &points).unwrap());
    }

    #[cfg(feature = "treemap")]
    #[test]
    fn test_treemap_renders_png() {
        let cfg = RenderConfig::detect();
        let agg = group_sum(&sample_table(), "Branch", "Number_of_Students").unwrap();
        assert_png(&treemap_chart(&cfg, "Treemap of Branches", &agg).unwrap());
    }

    #[cfg(feature = "treemap")]
    #[test]
    fn test_squarify_partitions_whole_frame() {
        let entries = vec![
            ("A".to_string(), 6.0),
            ("B".to_string(), 3.0),
            ("C".to_string(), 1.0),
        ];
        let frame = RectF { x: 0.0, y: 0.0, w: 100.0, h: 50.0 };
        let cells = squarify(&entries, frame);
        assert_eq!(cells.len(), 3);
        let area_sum: f64 = cells.iter().map(|(_, _, r)| r.w * r.h).sum();
        assert!((area_sum - 5000.0).abs() < 1e-6);
        // areas proportional to values
        let a = cells.iter().find(|(k, _, _)| k == "A").unwrap();
        assert!((a.2.w * a.2.h - 3000.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_inputs_render_blank_chart() {
        let cfg = RenderConfig::detect();
        let table = Table::from_csv_bytes(b"K,V\n").unwrap();
        let agg = group_sum(&table, "K", "V").unwrap();
        assert_png(&bar_chart(&cfg, "Students by Branch", "Students", &agg).unwrap());
        assert_png(&pie_chart(&cfg, "Proportion by Branch", &agg).unwrap());
        assert_png(&line_chart(&cfg, "Overall Trend", "Year", "Students", &[]).unwrap());
    }

    #[test]
    fn test_treemap_capability_flag() {
        let cfg = RenderConfig::detect();
        assert_eq!(cfg.treemap_available(), cfg!(feature = "treemap"));
        let disabled = cfg.with_treemap(false);
        assert!(!disabled.treemap_available());
    }

    #[test]
    fn test_correlation_color_extremes() {
        assert_eq!(correlation_color(1.0), RGBColor(255, 65, 65));
        assert_eq!(correlation_color(-1.0), RGBColor(65, 65, 255));
        assert_eq!(correlation_color(f64::NAN), RGBColor(225, 225, 225));
    }

    #[test]
    fn test_violin_outline_is_closed_band() {
        let values = [1.0, 2.0, 2.0, 3.0, 10.0];
        let outline = violin_outline(&values, 0.0, 10.0);
        assert_eq!(outline.len(), 82);
        // symmetric around the center
        assert!(outline.iter().all(|(x, _)| x.abs() <= 0.381));
    }
}
