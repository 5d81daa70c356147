use std::ops::Range;

use plotters::coord::ranged1d::{AsRangedCoord, ValueFormatter};
use plotters::coord::Shift;
use plotters::prelude::*;

use super::{LogScale, PlotConfig};
use crate::color::ColorMap;
use crate::error::Result;
use crate::state::{OverlaySeries, OverlayState, SeriesGeometry};

/// Legend sample length in pixels.
const LEGEND_SAMPLE: i32 = 20;

// ---------------------------------------------------------------------------
// Frame – axis ranges taken from the first drawn histogram
// ---------------------------------------------------------------------------

/// Axis ranges of the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub x: Range<f64>,
    pub y: Range<f64>,
}

impl Frame {
    /// Frame for an overlay: the first series decides, later ones are drawn
    /// into it as they are.
    pub fn for_overlay(first: Option<&OverlaySeries>, scale: LogScale) -> Frame {
        let Some(series) = first else {
            return Frame {
                x: if scale.x { 1.0..10.0 } else { 0.0..1.0 },
                y: if scale.y { 1.0..10.0 } else { 0.0..1.0 },
            };
        };

        match &series.geometry {
            SeriesGeometry::Steps { edges, contents } => {
                let x = axis_range(edges, scale.x);
                let y = if scale.y {
                    log_content_range(contents)
                } else {
                    linear_content_range(contents)
                };
                Frame { x, y }
            }
            SeriesGeometry::Cells {
                points,
                x_range,
                y_range,
            } => {
                let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
                let ys: Vec<f64> = points.iter().map(|p| p.1).collect();
                Frame {
                    x: extent_range(*x_range, &xs, scale.x),
                    y: extent_range(*y_range, &ys, scale.y),
                }
            }
        }
    }
}

/// Range spanned by bin edges; on a log axis the non-positive part is cut.
fn axis_range(edges: &[f64], log: bool) -> Range<f64> {
    let (Some(&lo), Some(&hi)) = (edges.first(), edges.last()) else {
        return 0.0..1.0;
    };
    extent_range((lo, hi), edges, log)
}

fn extent_range((lo, hi): (f64, f64), values: &[f64], log: bool) -> Range<f64> {
    if !log || lo > 0.0 {
        return lo..hi;
    }
    let lowest_positive = values
        .iter()
        .copied()
        .filter(|v| *v > 0.0)
        .fold(f64::INFINITY, f64::min);
    if lowest_positive.is_finite() && lowest_positive < hi {
        lowest_positive..hi
    } else if hi > 0.0 {
        hi * 1e-3..hi
    } else {
        1.0..10.0
    }
}

fn linear_content_range(contents: &[f64]) -> Range<f64> {
    let min = contents.iter().copied().fold(f64::INFINITY, f64::min);
    let max = contents.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    let lo = min.min(0.0);
    let hi = max.max(0.0);
    if hi <= lo {
        return lo..lo + 1.0;
    }
    let margin = 0.05 * (hi - lo);
    let lo = if lo < 0.0 { lo - margin } else { lo };
    lo..hi + margin
}

fn log_content_range(contents: &[f64]) -> Range<f64> {
    let positive = contents.iter().copied().filter(|v| *v > 0.0);
    let (min, max) = positive.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() {
        return 1.0..10.0;
    }
    min * 0.5..max * 2.0
}

/// Keep values drawable on a log axis by pinning non-positive ones to the
/// lower frame edge.
fn pin(v: f64, floor: f64, log: bool) -> f64 {
    if log && v <= 0.0 {
        floor
    } else {
        v
    }
}

/// Outline of a 1D histogram through its bin edges.
fn step_points(edges: &[f64], contents: &[f64], frame: &Frame, scale: LogScale) -> Vec<(f64, f64)> {
    let mut points = Vec::with_capacity(contents.len() * 2);
    for (k, &c) in contents.iter().enumerate() {
        let y = pin(c, frame.y.start, scale.y);
        points.push((pin(edges[k], frame.x.start, scale.x), y));
        points.push((pin(edges[k + 1], frame.x.start, scale.x), y));
    }
    points
}

/// Marker positions of a 2D histogram, pinned like [`step_points`].
fn cell_points(points: &[(f64, f64)], frame: &Frame, scale: LogScale) -> Vec<(f64, f64)> {
    points
        .iter()
        .map(|&(x, y)| (pin(x, frame.x.start, scale.x), pin(y, frame.y.start, scale.y)))
        .collect()
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Draw every collected series onto one canvas and save it to `config.output`.
///
/// The legend is drawn once after all series, and only if something was drawn.
pub fn render_overlay(state: &OverlayState, hist_name: &str, config: &PlotConfig) -> Result<()> {
    let (width, height) = (config.width, config.height);
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        let frame = Frame::for_overlay(state.first(), config.scale);
        let x = frame.x.clone();
        let y = frame.y.clone();
        match (config.scale.x, config.scale.y) {
            (false, false) => draw_chart(&root, x, y, &frame, state, hist_name, config)?,
            (true, false) => draw_chart(&root, x.log_scale(), y, &frame, state, hist_name, config)?,
            (false, true) => draw_chart(&root, x, y.log_scale(), &frame, state, hist_name, config)?,
            (true, true) => {
                draw_chart(&root, x.log_scale(), y.log_scale(), &frame, state, hist_name, config)?
            }
        }

        root.present()?;
    }

    image::save_buffer(
        &config.output,
        &buffer,
        width,
        height,
        image::ColorType::Rgb8,
    )?;
    Ok(())
}

fn draw_chart<X, Y>(
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
    x_spec: X,
    y_spec: Y,
    frame: &Frame,
    state: &OverlayState,
    hist_name: &str,
    config: &PlotConfig,
) -> Result<()>
where
    X: AsRangedCoord<Value = f64>,
    Y: AsRangedCoord<Value = f64>,
    X::CoordDescType: ValueFormatter<f64>,
    Y::CoordDescType: ValueFormatter<f64>,
{
    let caption = state
        .first()
        .map(|s| s.title.as_str())
        .filter(|t| !t.is_empty())
        .unwrap_or(hist_name);

    let mut chart = ChartBuilder::on(root)
        .caption(caption, ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_spec, y_spec)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .label_style(("sans-serif", 14))
        .draw()?;

    let colors = ColorMap::new(config.colors, state.series.len());

    for (series, entry) in state.series.iter().zip(&state.legend) {
        let color = colors.color_for(&series.style);
        let stroke = color.stroke_width(series.style.line_width);

        let anno = match &series.geometry {
            SeriesGeometry::Steps { edges, contents } => chart.draw_series(LineSeries::new(
                step_points(edges, contents, frame, config.scale),
                stroke,
            ))?,
            SeriesGeometry::Cells { points, .. } => chart.draw_series(
                cell_points(points, frame, config.scale)
                    .into_iter()
                    .map(|p| Circle::new(p, 2, color.filled())),
            )?,
        };
        anno.label(entry.label.as_str()).legend(move |(lx, ly)| {
            PathElement::new(vec![(lx, ly), (lx + LEGEND_SAMPLE, ly)], stroke)
        });
    }

    if !state.legend.is_empty() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::LowerRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font(("sans-serif", 13))
            .draw()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::color::{SeriesStyle, LINE_WIDTH};

    fn series(geometry: SeriesGeometry) -> OverlaySeries {
        OverlaySeries {
            source: PathBuf::from("a.json"),
            title: String::new(),
            style: SeriesStyle {
                color_index: 1,
                line_width: LINE_WIDTH,
            },
            geometry,
        }
    }

    fn steps() -> SeriesGeometry {
        SeriesGeometry::Steps {
            edges: vec![0.0, 1.0, 2.0, 3.0],
            contents: vec![0.0, 10.0, 5.0],
        }
    }

    #[test]
    fn linear_frame_follows_first_series() {
        let frame = Frame::for_overlay(Some(&series(steps())), LogScale::default());
        assert_eq!(frame.x, 0.0..3.0);
        assert_eq!(frame.y.start, 0.0);
        assert!((frame.y.end - 10.5).abs() < 1e-12);
    }

    #[test]
    fn log_frame_is_positive() {
        let scale = LogScale { x: true, y: true };
        let frame = Frame::for_overlay(Some(&series(steps())), scale);
        assert_eq!(frame.x, 1.0..3.0);
        assert_eq!(frame.y, 2.5..20.0);
    }

    #[test]
    fn empty_overlay_gets_unit_frame() {
        let frame = Frame::for_overlay(None, LogScale::default());
        assert_eq!(frame, Frame { x: 0.0..1.0, y: 0.0..1.0 });
    }

    #[test]
    fn steps_pin_zero_bins_on_log_axis() {
        let frame = Frame { x: 1.0..3.0, y: 2.5..20.0 };
        let points = step_points(
            &[0.0, 1.0, 2.0, 3.0],
            &[0.0, 10.0, 5.0],
            &frame,
            LogScale { x: true, y: true },
        );
        assert_eq!(points.len(), 6);
        assert_eq!(points[0], (1.0, 2.5));
        assert_eq!(points[3], (2.0, 10.0));
    }

    #[test]
    fn markers_pin_negative_centres_on_log_axis() {
        let frame = Frame { x: 0.5..3.0, y: 0.5..2.0 };
        let points = [(-1.0, 0.5), (1.0, -1.5), (2.0, 1.5)];

        let pinned = cell_points(&points, &frame, LogScale { x: true, y: true });
        assert_eq!(pinned, [(0.5, 0.5), (1.0, 0.5), (2.0, 1.5)]);

        let linear = cell_points(&points, &frame, LogScale::default());
        assert_eq!(linear, points);
    }
}
