//! Overlay plotter: draw one named histogram from many files on a single
//! canvas, one colour and one legend line per file that provided it.

pub mod render;

use std::path::{Path, PathBuf};

use crate::color::ColorScheme;
use crate::error::{HistError, Result};
use crate::source::{resolve_pattern, FileOpener, OpenFile};
use crate::state::{OverlayState, SeriesGeometry};

pub use render::{render_overlay, Frame};

/// Image written when no output path is given.
pub const DEFAULT_OUTPUT: &str = "IstogramsPlotOutput.png";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Which axes are drawn logarithmically. The two flags are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogScale {
    pub x: bool,
    pub y: bool,
}

impl LogScale {
    /// Combine the command-line flags; `loglog` sets both axes.
    pub fn from_flags(xlog: bool, ylog: bool, loglog: bool) -> Self {
        LogScale {
            x: xlog || loglog,
            y: ylog || loglog,
        }
    }
}

/// Settings for one overlay plot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotConfig {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub scale: LogScale,
    pub colors: ColorScheme,
}

impl Default for PlotConfig {
    fn default() -> Self {
        PlotConfig {
            output: PathBuf::from(DEFAULT_OUTPUT),
            width: 800,
            height: 600,
            scale: LogScale::default(),
            colors: ColorScheme::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-file loop
// ---------------------------------------------------------------------------

/// Open each path in order and copy out `hist_name` where present.
///
/// Open and lookup failures are logged and recorded in `skipped`; they
/// never take a colour. Every opened file is closed before the next one is
/// touched.
pub fn collect_overlay(opener: &dyn FileOpener, paths: &[PathBuf], hist_name: &str) -> OverlayState {
    let mut state = OverlayState::default();

    for path in paths {
        match read_series(opener, path, hist_name) {
            Ok((title, geometry)) => {
                let style = state.record_success(path, &title, geometry);
                log::info!(
                    "drawing {hist_name} from {} with colour {}",
                    path.display(),
                    style.color_index
                );
            }
            Err(error) => {
                log::error!("{error}");
                state.record_failure(path, error);
            }
        }
    }

    state
}

fn read_series(
    opener: &dyn FileOpener,
    path: &Path,
    hist_name: &str,
) -> Result<(String, SeriesGeometry)> {
    let file = OpenFile::open(opener, path)?;
    let hist = file.histogram(hist_name)?;
    let title = hist.title().to_string();
    let geometry = SeriesGeometry::from_histogram(hist)?;
    Ok((title, geometry))
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// What a plot call produced.
#[derive(Debug)]
pub struct PlotSummary {
    pub output: PathBuf,
    pub state: OverlayState,
}

/// Overlay `hist_name` from every file matching `pattern` into one image.
///
/// An empty match fails with [`HistError::NoMatchingFiles`] before anything
/// is drawn; otherwise exactly one image is written, even when no file held
/// the histogram.
pub fn plot(
    opener: &dyn FileOpener,
    pattern: &str,
    hist_name: &str,
    config: &PlotConfig,
) -> Result<PlotSummary> {
    let paths = resolve_pattern(pattern)?;
    plot_files(opener, &paths, hist_name, config)
}

/// Same as [`plot`] for an already resolved file list.
pub fn plot_files(
    opener: &dyn FileOpener,
    paths: &[PathBuf],
    hist_name: &str,
    config: &PlotConfig,
) -> Result<PlotSummary> {
    if paths.is_empty() {
        return Err(HistError::NoMatchingFiles {
            pattern: String::new(),
        });
    }

    let state = collect_overlay(opener, paths, hist_name);
    if state.is_empty() {
        log::warn!("histogram {hist_name} was not found in any of {} files", paths.len());
    }

    render_overlay(&state, hist_name, config)?;
    log::info!(
        "wrote {} with {} histograms",
        config.output.display(),
        state.series.len()
    );

    Ok(PlotSummary {
        output: config.output.clone(),
        state,
    })
}
