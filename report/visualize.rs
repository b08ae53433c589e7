//! Diagnostic figures of a fitted model, rasterised to PNG in memory.
//!
//! The figure set and its order are fixed (see [`PlotKind::ALL`]); documents refer
//! to figures by position, so rendering either yields all six or fails.
//!
//! Text is set in DejaVu Sans, compiled into the binary, so figures look the
//! same on every host and never depend on system fonts.

use super::RenderError;
use super::config::PlotConfig;
use crate::model::{CorrelationMatrix, RegressionResult};
use plotters::coord::Shift;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use statrs::distribution::{ContinuousCDF, Normal};
use std::error::Error;
use std::io::Cursor;
use std::ops::Range;
use std::sync::OnceLock;

type DrawResult = Result<(), Box<dyn Error>>;
type Chart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

const MARGIN: u32 = 20;
const TICK_LABELS: usize = 8;
const KDE_POINTS: usize = 200;

const FONT: FontFamily<'static> = FontFamily::SansSerif;
const FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSans.ttf");
const TICK_FONT_SIZE: f64 = 14.0;
const TITLE_FONT_SIZE: f64 = 17.0;
const MIN_FONT_SIZE: f64 = 7.0;

const POINT_COLOR: RGBColor = RGBColor(31, 119, 180);
const GRID_COLOR: RGBColor = RGBColor(225, 225, 225);
const REFERENCE_COLOR: RGBColor = RGBColor(214, 39, 40);
const BAR_COLOR: RGBColor = RGBColor(158, 202, 225);
const MISSING_COLOR: RGBColor = RGBColor(190, 190, 190);

static FONT_REGISTERED: OnceLock<bool> = OnceLock::new();

/// Registers the bundled face as the sans-serif family. Runs once per process;
/// the font table is never written afterwards.
fn ensure_font() -> Result<(), String> {
    let registered = *FONT_REGISTERED.get_or_init(|| {
        plotters::style::register_font(FONT.as_str(), FontStyle::Normal, FONT_DATA).is_ok()
    });
    if registered {
        Ok(())
    } else {
        Err("the bundled font could not be parsed".to_string())
    }
}

/// The six diagnostic figures, in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlotKind {
    ActualVsPredicted,
    ResidualsVsPredicted,
    ResidualQq,
    PearsonHeatmap,
    SpearmanHeatmap,
    ResidualHistogram,
}

impl PlotKind {
    pub const ALL: [PlotKind; 6] = [
        PlotKind::ActualVsPredicted,
        PlotKind::ResidualsVsPredicted,
        PlotKind::ResidualQq,
        PlotKind::PearsonHeatmap,
        PlotKind::SpearmanHeatmap,
        PlotKind::ResidualHistogram,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            PlotKind::ActualVsPredicted => "fig1_actual_vs_predicted.png",
            PlotKind::ResidualsVsPredicted => "fig2_residuals_vs_predicted.png",
            PlotKind::ResidualQq => "fig3_residual_qq.png",
            PlotKind::PearsonHeatmap => "fig4_pearson_heatmap.png",
            PlotKind::SpearmanHeatmap => "fig5_spearman_heatmap.png",
            PlotKind::ResidualHistogram => "fig6_residual_histogram.png",
        }
    }

    pub fn caption(self, target_name: &str) -> String {
        match self {
            PlotKind::ActualVsPredicted => format!("Actual vs Predicted Values for {target_name}"),
            PlotKind::ResidualsVsPredicted => "Residuals vs Predicted Values".to_string(),
            PlotKind::ResidualQq => "Normal Q-Q Plot of Residuals".to_string(),
            PlotKind::PearsonHeatmap => "Pearson Correlation Matrix".to_string(),
            PlotKind::SpearmanHeatmap => "Spearman Rank Correlation Matrix".to_string(),
            PlotKind::ResidualHistogram => "Distribution of Residuals".to_string(),
        }
    }
}

/// One rendered figure.
#[derive(Debug, Clone)]
pub struct Figure {
    pub kind: PlotKind,
    pub caption: String,
    /// PNG-encoded image.
    pub png: Vec<u8>,
}

pub struct VisualizationGenerator<'a> {
    config: &'a PlotConfig,
}

impl<'a> VisualizationGenerator<'a> {
    pub fn new(config: &'a PlotConfig) -> Self {
        Self { config }
    }

    /// Renders every figure of [`PlotKind::ALL`] in order.
    pub fn render(
        &self,
        result: &RegressionResult,
        target_name: &str,
    ) -> Result<Vec<Figure>, RenderError> {
        PlotKind::ALL
            .iter()
            .map(|&kind| self.render_one(kind, result, target_name))
            .collect()
    }

    pub fn render_one(
        &self,
        kind: PlotKind,
        result: &RegressionResult,
        target_name: &str,
    ) -> Result<Figure, RenderError> {
        self.config.validate()?;
        ensure_font().map_err(|message| RenderError::Plot {
            figure: kind.file_name(),
            message,
        })?;
        let (w, h) = (self.config.width, self.config.height);
        let side = self.config.heatmap_size;
        let png = match kind {
            PlotKind::ActualVsPredicted => rasterize(kind, w, h, |root| {
                self.draw_actual_vs_predicted(root, result, target_name)
            }),
            PlotKind::ResidualsVsPredicted => {
                rasterize(kind, w, h, |root| self.draw_residuals(root, result))
            }
            PlotKind::ResidualQq => rasterize(kind, w, h, |root| self.draw_qq(root, result)),
            PlotKind::PearsonHeatmap => rasterize(kind, side, side, |root| {
                self.draw_heatmap(root, &result.pearson_correlation)
            }),
            PlotKind::SpearmanHeatmap => rasterize(kind, side, side, |root| {
                self.draw_heatmap(root, &result.spearman_correlation)
            }),
            PlotKind::ResidualHistogram => {
                rasterize(kind, w, h, |root| self.draw_histogram(root, result))
            }
        }?;
        log::debug!("Rendered {} ({} bytes)", kind.file_name(), png.len());
        Ok(Figure {
            kind,
            caption: kind.caption(target_name),
            png,
        })
    }

    fn draw_actual_vs_predicted(
        &self,
        root: &DrawingArea<BitMapBackend<'_>, Shift>,
        result: &RegressionResult,
        target_name: &str,
    ) -> DrawResult {
        let joint = padded_range(
            result
                .predictions
                .iter()
                .flat_map(|row| [row.actual, row.predicted]),
        );
        let axes = (
            format!("Actual {target_name}"),
            format!("Predicted {target_name}"),
        );
        let mut chart = framed_chart(root, joint.clone(), joint.clone(), axes)?;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(joint.start, joint.start), (joint.end, joint.end)],
            BLACK.stroke_width(2),
        )))?;
        self.draw_points(
            &mut chart,
            result.predictions.iter().map(|row| (row.actual, row.predicted)),
        )
    }

    fn draw_residuals(
        &self,
        root: &DrawingArea<BitMapBackend<'_>, Shift>,
        result: &RegressionResult,
    ) -> DrawResult {
        let x = padded_range(result.predictions.iter().map(|row| row.predicted));
        let y = padded_range(result.residuals().chain(std::iter::once(0.0)));
        let axes = ("Predicted values".to_string(), "Residuals".to_string());
        let mut chart = framed_chart(root, x.clone(), y, axes)?;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x.start, 0.0), (x.end, 0.0)],
            REFERENCE_COLOR.stroke_width(2),
        )))?;
        self.draw_points(
            &mut chart,
            result.predictions.iter().map(|row| (row.predicted, row.residual)),
        )
    }

    fn draw_qq(
        &self,
        root: &DrawingArea<BitMapBackend<'_>, Shift>,
        result: &RegressionResult,
    ) -> DrawResult {
        let points = normal_quantile_pairs(result.residuals().collect())?;
        let x = padded_range(points.iter().map(|p| p.0));
        let y = padded_range(points.iter().map(|p| p.1));
        let axes = (
            "Theoretical quantiles".to_string(),
            "Ordered residuals".to_string(),
        );
        let mut chart = framed_chart(root, x.clone(), y, axes)?;

        let (slope, intercept) = least_squares_line(&points);
        chart.draw_series(std::iter::once(PathElement::new(
            vec![
                (x.start, intercept + slope * x.start),
                (x.end, intercept + slope * x.end),
            ],
            REFERENCE_COLOR.stroke_width(2),
        )))?;
        self.draw_points(&mut chart, points.into_iter())
    }

    fn draw_histogram(
        &self,
        root: &DrawingArea<BitMapBackend<'_>, Shift>,
        result: &RegressionResult,
    ) -> DrawResult {
        let residuals: Vec<f64> = result.residuals().collect();
        let histogram = density_histogram(&residuals);
        let curve = gaussian_kde(&residuals, histogram.range.clone());

        let peak = histogram
            .densities
            .iter()
            .chain(curve.iter().map(|(_, d)| d))
            .fold(0.0_f64, |acc, &d| acc.max(d));
        let y_top = if peak > 0.0 { peak * 1.1 } else { 1.0 };
        let axes = ("Residuals".to_string(), "Density".to_string());
        let mut chart = framed_chart(root, histogram.range.clone(), 0.0..y_top, axes)?;

        let width = histogram.bin_width;
        chart.draw_series(histogram.densities.iter().enumerate().map(|(i, &d)| {
            let left = histogram.range.start + i as f64 * width;
            Rectangle::new([(left, 0.0), (left + width, d)], BAR_COLOR.filled())
        }))?;
        chart.draw_series(histogram.densities.iter().enumerate().map(|(i, &d)| {
            let left = histogram.range.start + i as f64 * width;
            Rectangle::new([(left, 0.0), (left + width, d)], WHITE.stroke_width(1))
        }))?;
        if curve.len() > 1 {
            chart.draw_series(std::iter::once(PathElement::new(
                curve,
                POINT_COLOR.stroke_width(3),
            )))?;
        }
        Ok(())
    }

    /// Lower triangle only: the diagonal and the mirrored upper half are left
    /// blank. Rows and columns carry the variable names.
    fn draw_heatmap(
        &self,
        root: &DrawingArea<BitMapBackend<'_>, Shift>,
        matrix: &CorrelationMatrix,
    ) -> DrawResult {
        let k = matrix.len();
        let (width, height) = root.dim_in_pixel();
        let bar_width = (width / 8).max(40).min(width / 3);
        let (plot_area, bar_area) = root.split_horizontally(width.saturating_sub(bar_width));

        // Names may take at most a quarter of the plot in either direction.
        let name_limit = (width.saturating_sub(bar_width) / 4).max(1);
        let name_size = fit_font_size(
            &plot_area,
            matrix.names(),
            name_limit,
            (height / 4).max(1),
            TICK_FONT_SIZE,
        )?;
        let name_style = TextStyle::from((FONT, name_size));
        let widest = matrix
            .names()
            .iter()
            .map(|name| plot_area.estimate_text_size(name, &name_style).map(|(w, _)| w))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .max()
            .unwrap_or(0);

        let extent = k.max(1) as f64;
        let mut chart = ChartBuilder::on(&plot_area)
            .margin(MARGIN)
            .y_label_area_size(widest.min(name_limit) + 8)
            .x_label_area_size(name_size.ceil() as u32 + 8)
            .build_cartesian_2d(0.0..extent, 0.0..extent)?;

        let row_style = name_style.color(&BLACK).pos(Pos::new(HPos::Right, VPos::Center));
        let column_style = name_style.color(&BLACK).pos(Pos::new(HPos::Center, VPos::Top));
        for (i, name) in matrix.names().iter().enumerate() {
            let centre = i as f64 + 0.5;
            let (left, row_y) = chart.backend_coord(&(0.0, extent - centre));
            plot_area.draw(&Text::new(name.clone(), (left - 4, row_y), &row_style))?;
            let (column_x, bottom) = chart.backend_coord(&(centre, 0.0));
            plot_area.draw(&Text::new(name.clone(), (column_x, bottom + 4), &column_style))?;
        }

        let values = matrix.values();
        for i in 0..k {
            for j in 0..i {
                let r = values[[i, j]];
                let top = extent - i as f64;
                let cell = [(j as f64, top), (j as f64 + 1.0, top - 1.0)];
                chart.draw_series(std::iter::once(Rectangle::new(
                    cell,
                    diverging_color(r).filled(),
                )))?;
                chart.draw_series(std::iter::once(Rectangle::new(
                    cell,
                    WHITE.stroke_width(2),
                )))?;

                if self.config.annotate_heatmaps {
                    let (x0, y0) = chart.backend_coord(&cell[0]);
                    let (x1, y1) = chart.backend_coord(&cell[1]);
                    let label = if r.is_nan() {
                        "NaN".to_string()
                    } else {
                        format!("{r:.2}")
                    };
                    let cell_w = (x1 - x0).unsigned_abs();
                    let cell_h = (y1 - y0).unsigned_abs();
                    let size = fit_font_size(
                        &plot_area,
                        std::slice::from_ref(&label),
                        cell_w * 4 / 5,
                        cell_h * 3 / 5,
                        TITLE_FONT_SIZE,
                    )?;
                    let ink = if r.abs() > 0.6 { WHITE } else { BLACK };
                    let style = TextStyle::from((FONT, size))
                        .color(&ink)
                        .pos(Pos::new(HPos::Center, VPos::Center));
                    plot_area.draw(&Text::new(label, ((x0 + x1) / 2, (y0 + y1) / 2), &style))?;
                }
            }
        }

        draw_color_bar(&bar_area)?;
        Ok(())
    }

    fn draw_points<I>(&self, chart: &mut Chart<'_, '_>, points: I) -> DrawResult
    where
        I: Iterator<Item = (f64, f64)>,
    {
        let radius = self.config.point_radius;
        let style = POINT_COLOR.mix(0.7).filled();
        chart.draw_series(
            points
                .filter(|(x, y)| x.is_finite() && y.is_finite())
                .map(|p| Circle::new(p, radius, style)),
        )?;
        Ok(())
    }
}

fn rasterize<F>(kind: PlotKind, width: u32, height: u32, draw: F) -> Result<Vec<u8>, RenderError>
where
    F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> DrawResult,
{
    let plot_error = |message: String| RenderError::Plot {
        figure: kind.file_name(),
        message,
    };

    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| plot_error(e.to_string()))?;
        draw(&root).map_err(|e| plot_error(e.to_string()))?;
        root.present().map_err(|e| plot_error(e.to_string()))?;
    }

    let image = image::RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| plot_error("pixel buffer does not match the figure size".to_string()))?;
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| plot_error(e.to_string()))?;
    Ok(png)
}

/// Cartesian chart with tick labels, axis titles, a light grid and a black frame.
fn framed_chart<'a, 'b>(
    root: &'a DrawingArea<BitMapBackend<'b>, Shift>,
    x: Range<f64>,
    y: Range<f64>,
    (x_title, y_title): (String, String),
) -> Result<Chart<'a, 'b>, Box<dyn Error>> {
    let mut chart = ChartBuilder::on(root)
        .margin(MARGIN)
        .x_label_area_size(TICK_FONT_SIZE as u32 + TITLE_FONT_SIZE as u32 + 16)
        .y_label_area_size(4 * TICK_FONT_SIZE as u32 + TITLE_FONT_SIZE as u32 + 8)
        .build_cartesian_2d(x.clone(), y.clone())?;

    chart
        .configure_mesh()
        .x_labels(TICK_LABELS)
        .y_labels(TICK_LABELS)
        .bold_line_style(GRID_COLOR)
        .light_line_style(GRID_COLOR.mix(0.4))
        .x_label_formatter(&tick_label)
        .y_label_formatter(&tick_label)
        .label_style((FONT, TICK_FONT_SIZE))
        .axis_desc_style((FONT, TITLE_FONT_SIZE))
        .x_desc(x_title)
        .y_desc(y_title)
        .draw()?;

    chart.draw_series(std::iter::once(PathElement::new(
        vec![
            (x.start, y.start),
            (x.end, y.start),
            (x.end, y.end),
            (x.start, y.end),
            (x.start, y.start),
        ],
        BLACK.stroke_width(1),
    )))?;
    Ok(chart)
}

/// Short tick text: fixed point in the everyday range, scientific outside it.
fn tick_label(value: &f64) -> String {
    let magnitude = value.abs();
    if magnitude == 0.0 {
        "0".to_string()
    } else if !(1e-3..1e5).contains(&magnitude) {
        format!("{value:.1e}")
    } else if magnitude >= 100.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Largest font size, at most `start`, at which every text fits the box.
/// Bottoms out at `MIN_FONT_SIZE`.
fn fit_font_size(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    texts: &[String],
    max_width: u32,
    max_height: u32,
    start: f64,
) -> Result<f64, Box<dyn Error>> {
    let mut size = start;
    while size > MIN_FONT_SIZE {
        let style = TextStyle::from((FONT, size));
        let mut fits = true;
        for text in texts {
            let (w, h) = area.estimate_text_size(text, &style)?;
            if w > max_width || h > max_height {
                fits = false;
                break;
            }
        }
        if fits {
            return Ok(size);
        }
        size -= 1.0;
    }
    Ok(MIN_FONT_SIZE)
}

/// Vertical gradient from -1 (bottom) to +1 (top) with tick labels.
fn draw_color_bar(area: &DrawingArea<BitMapBackend<'_>, Shift>) -> DrawResult {
    let (w, h) = area.dim_in_pixel();
    let (w, h) = (w as i32, h as i32);
    let margin = MARGIN as i32;
    let bar_left = w / 8;
    let bar_right = w * 2 / 5;
    let span = (h - 2 * margin).max(1);

    for offset in 0..span {
        let value = 1.0 - 2.0 * offset as f64 / span as f64;
        let y = margin + offset;
        area.draw(&Rectangle::new(
            [(bar_left, y), (bar_right, y + 1)],
            diverging_color(value).filled(),
        ))?;
    }
    area.draw(&Rectangle::new(
        [(bar_left, margin), (bar_right, margin + span)],
        BLACK.stroke_width(1),
    ))?;

    let style = TextStyle::from((FONT, TICK_FONT_SIZE))
        .color(&BLACK)
        .pos(Pos::new(HPos::Left, VPos::Center));
    for (label, y) in [
        ("1.0", margin),
        ("0.5", margin + span / 4),
        ("0.0", margin + span / 2),
        ("-0.5", margin + 3 * span / 4),
        ("-1.0", margin + span),
    ] {
        area.draw(&Text::new(label, (bar_right + 4, y), &style))?;
    }
    Ok(())
}

/// Blue for -1, light grey for 0, red for +1.
fn diverging_color(r: f64) -> RGBColor {
    const NEGATIVE: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const NEUTRAL: (f64, f64, f64) = (221.0, 221.0, 221.0);
    const POSITIVE: (f64, f64, f64) = (180.0, 4.0, 38.0);

    if r.is_nan() {
        return MISSING_COLOR;
    }
    let r = r.clamp(-1.0, 1.0);
    let (from, to, t) = if r < 0.0 {
        (NEUTRAL, NEGATIVE, -r)
    } else {
        (NEUTRAL, POSITIVE, r)
    };
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    RGBColor(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
}

/// Range of the finite values widened by 5% on each side. Degenerate inputs get a
/// unit-width window so the chart still has a valid coordinate system.
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return -1.0..1.0;
    }
    let span = hi - lo;
    if span <= f64::EPSILON * lo.abs().max(1.0) {
        return (lo - 0.5)..(hi + 0.5);
    }
    (lo - 0.05 * span)..(hi + 0.05 * span)
}

/// `(theoretical quantile, sorted residual)` pairs using Blom plotting positions.
fn normal_quantile_pairs(mut residuals: Vec<f64>) -> Result<Vec<(f64, f64)>, Box<dyn Error>> {
    residuals.sort_by(f64::total_cmp);
    let standard = Normal::new(0.0, 1.0)?;
    let n = residuals.len() as f64;
    Ok(residuals
        .into_iter()
        .enumerate()
        .map(|(i, r)| {
            let p = (i as f64 + 1.0 - 0.375) / (n + 0.25);
            (standard.inverse_cdf(p), r)
        })
        .collect())
}

/// Slope and intercept of the least-squares line through `points`.
fn least_squares_line(points: &[(f64, f64)]) -> (f64, f64) {
    let n = points.len() as f64;
    if n < 2.0 {
        return (0.0, points.first().map_or(0.0, |p| p.1));
    }
    let mx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let my = points.iter().map(|p| p.1).sum::<f64>() / n;
    let sxy: f64 = points.iter().map(|p| (p.0 - mx) * (p.1 - my)).sum();
    let sxx: f64 = points.iter().map(|p| (p.0 - mx).powi(2)).sum();
    if sxx == 0.0 {
        return (0.0, my);
    }
    let slope = sxy / sxx;
    (slope, my - slope * mx)
}

struct DensityHistogram {
    range: Range<f64>,
    bin_width: f64,
    densities: Vec<f64>,
}

/// Sturges-rule histogram normalised to unit area.
fn density_histogram(values: &[f64]) -> DensityHistogram {
    let n = values.len().max(1);
    let bins = ((n as f64).log2().ceil() as usize + 1).max(1);
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = if lo.is_finite() && hi > lo {
        lo..hi
    } else if lo.is_finite() {
        (lo - 0.5)..(lo + 0.5)
    } else {
        -0.5..0.5
    };
    let bin_width = (range.end - range.start) / bins as f64;

    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - range.start) / bin_width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    let densities = counts
        .into_iter()
        .map(|c| c as f64 / (n as f64 * bin_width))
        .collect();
    DensityHistogram {
        range,
        bin_width,
        densities,
    }
}

/// Gaussian kernel density estimate with Silverman's rule-of-thumb bandwidth.
/// Empty when the bandwidth is zero (fewer than two distinct values).
fn gaussian_kde(values: &[f64], range: Range<f64>) -> Vec<(f64, f64)> {
    let n = values.len();
    if n < 2 {
        return Vec::new();
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let sd = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt();
    let bandwidth = 1.06 * sd * (n as f64).powf(-0.2);
    if !(bandwidth > 0.0) {
        return Vec::new();
    }

    let norm = 1.0 / (n as f64 * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
    (0..KDE_POINTS)
        .map(|i| {
            let x = range.start + (range.end - range.start) * i as f64 / (KDE_POINTS - 1) as f64;
            let density = values
                .iter()
                .map(|v| (-0.5 * ((x - v) / bandwidth).powi(2)).exp())
                .sum::<f64>()
                * norm;
            (x, density)
        })
        .collect()
}
