use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};

use crate::source::{Axis, BinnedHistogram, DataFile};

// ---------------------------------------------------------------------------
// BinAxis – bin edges of one axis
// ---------------------------------------------------------------------------

/// Upper bound on the cells (flow bins included) of one histogram.
pub const MAX_CELLS: usize = 1 << 28;

/// Wire form of an axis: either uniform binning or explicit edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisSpec {
    Uniform { bins: usize, min: f64, max: f64 },
    Variable { edges: Vec<f64> },
}

/// One binned axis, always stored as `n + 1` strictly increasing edges.
#[derive(Debug, Clone, PartialEq)]
pub struct BinAxis {
    edges: Vec<f64>,
}

impl BinAxis {
    pub fn uniform(bins: usize, min: f64, max: f64) -> Result<Self> {
        ensure!(bins > 0, "axis must have at least one bin");
        ensure!(
            min.is_finite() && max.is_finite() && min < max,
            "axis range [{min}, {max}] is empty"
        );
        ensure!(
            bins < MAX_CELLS,
            "axis has {bins} bins, more than the {MAX_CELLS} cells a histogram may hold"
        );
        let width = (max - min) / bins as f64;
        let mut edges: Vec<f64> = (0..bins).map(|i| min + i as f64 * width).collect();
        // Pin the last edge so accumulated rounding never shrinks the range.
        edges.push(max);
        Self::from_edges(edges)
    }

    pub fn from_edges(edges: Vec<f64>) -> Result<Self> {
        ensure!(edges.len() >= 2, "axis needs at least two edges");
        for pair in edges.windows(2) {
            if !(pair[0] < pair[1]) {
                bail!("bin edges must be strictly increasing ({} >= {})", pair[0], pair[1]);
            }
        }
        Ok(BinAxis { edges })
    }

    pub fn from_spec(spec: &AxisSpec) -> Result<Self> {
        match spec {
            AxisSpec::Uniform { bins, min, max } => Self::uniform(*bins, *min, *max),
            AxisSpec::Variable { edges } => Self::from_edges(edges.clone()),
        }
    }

    pub fn to_spec(&self) -> AxisSpec {
        AxisSpec::Variable {
            edges: self.edges.clone(),
        }
    }

    /// In-range bin count.
    pub fn bins(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Lower edge of bin `index` (1-based). Underflow extends one bin width
    /// below the range, overflow one bin width above it.
    pub fn low_edge(&self, index: usize) -> f64 {
        let n = self.bins();
        match index {
            0 => self.edges[0] - (self.edges[1] - self.edges[0]),
            i if i <= n + 1 => self.edges[i - 1],
            _ => f64::NAN,
        }
    }

    pub fn center(&self, index: usize) -> f64 {
        let n = self.bins();
        match index {
            0 => self.edges[0] - 0.5 * (self.edges[1] - self.edges[0]),
            i if i <= n => 0.5 * (self.edges[i - 1] + self.edges[i]),
            i if i == n + 1 => self.edges[n] + 0.5 * (self.edges[n] - self.edges[n - 1]),
            _ => f64::NAN,
        }
    }
}

// ---------------------------------------------------------------------------
// StoredHistogram – one histogram as held in a container
// ---------------------------------------------------------------------------

/// A histogram with all cells in memory, including under- and overflow.
///
/// Cells are laid out like ROOT's global bin number:
/// `i + (nx + 2) * (j + (ny + 2) * k)`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredHistogram {
    pub name: String,
    pub title: String,
    axes: Vec<BinAxis>,
    contents: Vec<f64>,
    sumw2: Option<Vec<f64>>,
}

impl StoredHistogram {
    /// Build a histogram and check that the cell arrays match the axes.
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        axes: Vec<BinAxis>,
        contents: Vec<f64>,
        sumw2: Option<Vec<f64>>,
    ) -> Result<Self> {
        let name = name.into();
        ensure!(!name.is_empty(), "histogram name must not be empty");
        ensure!(!axes.is_empty(), "histogram {name} has no axes");

        let cells = cell_count(&axes)?;
        ensure!(
            contents.len() == cells,
            "histogram {name}: expected {cells} cells (with under/overflow), got {}",
            contents.len()
        );
        if let Some(sw2) = &sumw2 {
            ensure!(
                sw2.len() == cells,
                "histogram {name}: sumw2 has {} cells, expected {cells}",
                sw2.len()
            );
        }

        Ok(StoredHistogram {
            name,
            title: title.into(),
            axes,
            contents,
            sumw2,
        })
    }

    /// Build from in-range bin values only; under/overflow cells are zero.
    ///
    /// `values` is ordered with the x index varying fastest.
    pub fn from_bins(
        name: impl Into<String>,
        axes: Vec<BinAxis>,
        values: &[f64],
        sumw2: Option<&[f64]>,
    ) -> Result<Self> {
        let cells = cell_count(&axes)?;
        let in_range: usize = axes.iter().map(BinAxis::bins).product();
        ensure!(
            values.len() == in_range,
            "expected {in_range} bin values, got {}",
            values.len()
        );
        if let Some(sw2) = sumw2 {
            ensure!(sw2.len() == in_range, "expected {in_range} sumw2 values, got {}", sw2.len());
        }

        let mut contents = vec![0.0; cells];
        let mut full_sumw2 = sumw2.map(|_| vec![0.0; cells]);

        let mut index = vec![1usize; axes.len()];
        for (k, &value) in values.iter().enumerate() {
            let global = global_bin(&axes, &index);
            contents[global] = value;
            if let (Some(dst), Some(src)) = (full_sumw2.as_mut(), sumw2) {
                dst[global] = src[k];
            }
            // Odometer increment, x fastest.
            for (pos, axis) in axes.iter().enumerate() {
                if index[pos] < axis.bins() {
                    index[pos] += 1;
                    break;
                }
                index[pos] = 1;
            }
        }

        StoredHistogram::new(name, "", axes, contents, full_sumw2)
    }

    pub fn axes(&self) -> &[BinAxis] {
        &self.axes
    }

    pub fn contents(&self) -> &[f64] {
        &self.contents
    }

    pub fn sumw2(&self) -> Option<&[f64]> {
        self.sumw2.as_deref()
    }

    fn axis(&self, axis: Axis) -> Option<&BinAxis> {
        self.axes.get(axis.position())
    }

    fn cell(&self, bin: &[usize]) -> Option<usize> {
        if bin.len() < self.axes.len() {
            return None;
        }
        let in_bounds = self
            .axes
            .iter()
            .zip(bin)
            .all(|(axis, &i)| i <= axis.bins() + 1);
        in_bounds.then(|| global_bin(&self.axes, bin))
    }
}

/// Total cells including flow bins, refusing layouts above [`MAX_CELLS`].
fn cell_count(axes: &[BinAxis]) -> Result<usize> {
    let cells = axes.iter().try_fold(1usize, |acc, a| {
        a.bins().checked_add(2).and_then(|n| acc.checked_mul(n))
    });
    match cells {
        Some(n) if n <= MAX_CELLS => Ok(n),
        _ => bail!("histogram needs more than {MAX_CELLS} cells"),
    }
}

fn global_bin(axes: &[BinAxis], bin: &[usize]) -> usize {
    let mut global = 0;
    let mut stride = 1;
    for (axis, &i) in axes.iter().zip(bin) {
        global += i * stride;
        stride *= axis.bins() + 2;
    }
    global
}

impl BinnedHistogram for StoredHistogram {
    fn name(&self) -> &str {
        &self.name
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn dimensionality(&self) -> usize {
        self.axes.len()
    }

    fn bin_count(&self, axis: Axis) -> usize {
        self.axis(axis).map(BinAxis::bins).unwrap_or(0)
    }

    fn bin_center(&self, axis: Axis, index: usize) -> f64 {
        self.axis(axis).map(|a| a.center(index)).unwrap_or(f64::NAN)
    }

    fn bin_low_edge(&self, axis: Axis, index: usize) -> f64 {
        self.axis(axis).map(|a| a.low_edge(index)).unwrap_or(f64::NAN)
    }

    fn bin_content(&self, bin: &[usize]) -> f64 {
        self.cell(bin).map(|c| self.contents[c]).unwrap_or(0.0)
    }

    /// `sqrt(sumw2)` when weights were stored, Poisson `sqrt(|content|)` otherwise.
    fn bin_error(&self, bin: &[usize]) -> f64 {
        let Some(cell) = self.cell(bin) else {
            return 0.0;
        };
        match &self.sumw2 {
            Some(sw2) => sw2[cell].max(0.0).sqrt(),
            None => self.contents[cell].abs().sqrt(),
        }
    }
}

// ---------------------------------------------------------------------------
// HistogramFile – an open container
// ---------------------------------------------------------------------------

/// A loaded container file: named histograms in file order.
#[derive(Debug, Clone)]
pub struct HistogramFile {
    path: PathBuf,
    histograms: Vec<StoredHistogram>,
    open: bool,
}

impl HistogramFile {
    pub fn new(path: &Path, histograms: Vec<StoredHistogram>) -> Self {
        HistogramFile {
            path: path.to_path_buf(),
            histograms,
            open: true,
        }
    }

    pub fn histograms(&self) -> &[StoredHistogram] {
        &self.histograms
    }

    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }
}

impl DataFile for HistogramFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn is_valid(&self) -> bool {
        self.open
    }

    fn get(&self, name: &str) -> Option<&dyn BinnedHistogram> {
        if !self.open {
            return None;
        }
        self.histograms
            .iter()
            .find(|h| h.name == name)
            .map(|h| h as &dyn BinnedHistogram)
    }

    fn keys(&self) -> Vec<&str> {
        self.histograms.iter().map(|h| h.name.as_str()).collect()
    }

    fn close(&mut self) {
        self.open = false;
        self.histograms.clear();
    }
}
