//! Read 1D/2D histograms out of container files, dump their bins as
//! tab-separated tables, and overlay one histogram across many files in a
//! single PNG.
//!
//! Layout:
//! - [`source`]: the traits the rest of the crate talks to (`DataFile`,
//!   `BinnedHistogram`, `FileOpener`), the scoped `OpenFile` guard and glob
//!   resolution.
//! - [`data`]: JSON and Parquet histogram containers.
//! - [`extract`]: bin traversal, table output, batch mode.
//! - [`color`], [`state`], [`plot`]: style assignment, the overlay
//!   accumulator and the plotters renderer.

pub mod color;
pub mod data;
pub mod error;
pub mod extract;
pub mod plot;
pub mod source;
pub mod state;

pub use data::HistFileOpener;
pub use error::{FileFailure, HistError, Result};
pub use extract::{extract, extract_batch, extract_file, extract_pattern, BinRecord, HistogramKind, Table};
pub use plot::{plot, plot_files, LogScale, PlotConfig};
pub use source::{resolve_pattern, Axis, BinnedHistogram, DataFile, FileOpener, OpenFile};
