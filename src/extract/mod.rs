//! Histogram extractor: turn a 1D or 2D histogram into an ordered list of
//! bin records and write it as a tab-separated table.

pub mod batch;
pub mod table;

use std::path::{Path, PathBuf};

use crate::error::{HistError, Result};
use crate::source::{Axis, BinnedHistogram, FileOpener, OpenFile};

pub use batch::{extract_batch, extract_pattern, BatchReport};
pub use table::{read_table, save_table, write_table, Table};

// ---------------------------------------------------------------------------
// Histogram kind
// ---------------------------------------------------------------------------

/// Shape of a histogram as far as extraction is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistogramKind {
    OneDimensional,
    TwoDimensional,
    Unsupported(usize),
}

impl HistogramKind {
    pub fn of(hist: &dyn BinnedHistogram) -> Self {
        match hist.dimensionality() {
            1 => HistogramKind::OneDimensional,
            2 => HistogramKind::TwoDimensional,
            n => HistogramKind::Unsupported(n),
        }
    }

    /// Column names of the table written for this kind.
    pub fn header(self) -> &'static [&'static str] {
        match self {
            HistogramKind::OneDimensional => &["Bin Center", "Bin Content", "Bin Error"],
            HistogramKind::TwoDimensional => &["X", "Y", "Value", "Error"],
            HistogramKind::Unsupported(_) => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// Bin records
// ---------------------------------------------------------------------------

/// One in-range bin of a histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinRecord {
    OneD {
        center: f64,
        content: f64,
        error: f64,
    },
    TwoD {
        x: f64,
        y: f64,
        content: f64,
        error: f64,
    },
}

impl BinRecord {
    /// Field values in column order.
    pub fn fields(&self) -> Vec<f64> {
        match *self {
            BinRecord::OneD {
                center,
                content,
                error,
            } => vec![center, content, error],
            BinRecord::TwoD {
                x,
                y,
                content,
                error,
            } => vec![x, y, content, error],
        }
    }

    pub fn content(&self) -> f64 {
        match *self {
            BinRecord::OneD { content, .. } | BinRecord::TwoD { content, .. } => content,
        }
    }
}

/// Read every in-range bin of `hist`.
///
/// 1D: bins `1..=nx`. 2D: x outer, y inner, both `1..=n`. Under- and
/// overflow bins are never emitted.
pub fn extract(hist: &dyn BinnedHistogram) -> Result<Vec<BinRecord>> {
    match HistogramKind::of(hist) {
        HistogramKind::OneDimensional => Ok(extract_1d(hist)),
        HistogramKind::TwoDimensional => Ok(extract_2d(hist)),
        HistogramKind::Unsupported(dimensionality) => Err(HistError::UnsupportedHistogramKind {
            name: hist.name().to_string(),
            dimensionality,
        }),
    }
}

fn extract_1d(hist: &dyn BinnedHistogram) -> Vec<BinRecord> {
    (1..=hist.bin_count(Axis::X))
        .map(|i| BinRecord::OneD {
            center: hist.bin_center(Axis::X, i),
            content: hist.bin_content(&[i]),
            error: hist.bin_error(&[i]),
        })
        .collect()
}

fn extract_2d(hist: &dyn BinnedHistogram) -> Vec<BinRecord> {
    let nx = hist.bin_count(Axis::X);
    let ny = hist.bin_count(Axis::Y);
    let mut records = Vec::with_capacity(nx * ny);
    for i in 1..=nx {
        let x = hist.bin_center(Axis::X, i);
        for j in 1..=ny {
            records.push(BinRecord::TwoD {
                x,
                y: hist.bin_center(Axis::Y, j),
                content: hist.bin_content(&[i, j]),
                error: hist.bin_error(&[i, j]),
            });
        }
    }
    records
}

// ---------------------------------------------------------------------------
// Single-file extraction
// ---------------------------------------------------------------------------

/// `{histogram_name}_{file_stem}.txt`, so re-runs overwrite the same file.
pub fn output_file_name(hist_name: &str, input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{hist_name}_{stem}.txt")
}

/// Open `path`, extract `hist_name` and write its table into `out_dir`.
///
/// The file is closed before returning on every path.
pub fn extract_file(
    opener: &dyn FileOpener,
    path: &Path,
    hist_name: &str,
    out_dir: &Path,
) -> Result<PathBuf> {
    let file = OpenFile::open(opener, path)?;
    let table = {
        let hist = file.histogram(hist_name)?;
        Table::from_histogram(hist)?
    };
    file.close();

    let output = out_dir.join(output_file_name(hist_name, path));
    save_table(&table, &output)?;
    log::info!(
        "extracted {} bins of {hist_name} from {} to {}",
        table.records.len(),
        path.display(),
        output.display()
    );
    Ok(output)
}
