use std::path::{Path, PathBuf};

use crate::color::{SeriesStyle, StyleCursor};
use crate::error::{FileFailure, HistError, Result};
use crate::source::{Axis, BinnedHistogram};

// ---------------------------------------------------------------------------
// Drawable copy of a histogram
// ---------------------------------------------------------------------------

/// What the renderer needs of a histogram, copied out while its file is open.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesGeometry {
    /// 1D: `edges.len() == contents.len() + 1`.
    Steps { edges: Vec<f64>, contents: Vec<f64> },
    /// 2D: centres of bins with non-zero content, plus the axis extents.
    Cells {
        points: Vec<(f64, f64)>,
        x_range: (f64, f64),
        y_range: (f64, f64),
    },
}

impl SeriesGeometry {
    pub fn from_histogram(hist: &dyn BinnedHistogram) -> Result<Self> {
        match hist.dimensionality() {
            1 => {
                let n = hist.bin_count(Axis::X);
                let edges = (1..=n + 1).map(|i| hist.bin_low_edge(Axis::X, i)).collect();
                let contents = (1..=n).map(|i| hist.bin_content(&[i])).collect();
                Ok(SeriesGeometry::Steps { edges, contents })
            }
            2 => {
                let nx = hist.bin_count(Axis::X);
                let ny = hist.bin_count(Axis::Y);
                let mut points = Vec::new();
                for i in 1..=nx {
                    for j in 1..=ny {
                        if hist.bin_content(&[i, j]) != 0.0 {
                            points.push((hist.bin_center(Axis::X, i), hist.bin_center(Axis::Y, j)));
                        }
                    }
                }
                Ok(SeriesGeometry::Cells {
                    points,
                    x_range: (hist.bin_low_edge(Axis::X, 1), hist.bin_up_edge(Axis::X, nx)),
                    y_range: (hist.bin_low_edge(Axis::Y, 1), hist.bin_up_edge(Axis::Y, ny)),
                })
            }
            n => Err(HistError::UnsupportedHistogramKind {
                name: hist.name().to_string(),
                dimensionality: n,
            }),
        }
    }
}

/// One successfully retrieved histogram, styled and ready to draw.
#[derive(Debug, Clone)]
pub struct OverlaySeries {
    pub source: PathBuf,
    pub title: String,
    pub style: SeriesStyle,
    pub geometry: SeriesGeometry,
}

/// Legend line: label is the source file path, marker is always a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendEntry {
    pub label: String,
    pub marker: LegendMarker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegendMarker {
    Line,
}

// ---------------------------------------------------------------------------
// Overlay state
// ---------------------------------------------------------------------------

/// Accumulator threaded through the per-file loop of one plot call.
#[derive(Debug, Default)]
pub struct OverlayState {
    cursor: StyleCursor,
    pub series: Vec<OverlaySeries>,
    pub legend: Vec<LegendEntry>,
    pub skipped: Vec<FileFailure>,
}

impl OverlayState {
    /// Record a drawn histogram: take the next style and append its legend
    /// entry. This is the only place the colour cursor moves.
    pub fn record_success(
        &mut self,
        source: &Path,
        title: &str,
        geometry: SeriesGeometry,
    ) -> SeriesStyle {
        let style = self.cursor.next_style();
        let label = source.display().to_string();
        self.legend.push(LegendEntry {
            label,
            marker: LegendMarker::Line,
        });
        self.series.push(OverlaySeries {
            source: source.to_path_buf(),
            title: title.to_string(),
            style,
            geometry,
        });
        style
    }

    pub fn record_failure(&mut self, source: &Path, error: HistError) {
        self.skipped.push(FileFailure {
            path: source.to_path_buf(),
            error,
        });
    }

    /// The series that sets the frame.
    pub fn first(&self) -> Option<&OverlaySeries> {
        self.series.first()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
