use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, HistError>;

/// Everything that can go wrong while reading, extracting or plotting.
///
/// The first four variants are per-item failures: batch callers report them
/// and carry on with the next file.
#[derive(Error, Debug)]
pub enum HistError {
    #[error("could not open file {}: {reason}", path.display())]
    FileOpen { path: PathBuf, reason: String },

    #[error("histogram {name} not found in file {}", path.display())]
    ObjectNotFound { name: String, path: PathBuf },

    #[error("{name} is not a recognized 1D or 2D histogram (dimensionality {dimensionality})")]
    UnsupportedHistogramKind { name: String, dimensionality: usize },

    #[error("no files found matching pattern: {pattern}")]
    NoMatchingFiles { pattern: String },

    #[error("invalid file pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("malformed table: {message}")]
    Table { message: String },

    #[error("chart rendering failed: {message}")]
    Render { message: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// A file a multi-file operation had to skip, and why.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: HistError,
}

impl HistError {
    /// True for errors that only concern a single input file.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            HistError::FileOpen { .. }
                | HistError::ObjectNotFound { .. }
                | HistError::UnsupportedHistogramKind { .. }
        )
    }
}

impl From<csv::Error> for HistError {
    fn from(err: csv::Error) -> Self {
        match err.into_kind() {
            csv::ErrorKind::Io(source) => HistError::Io { source },
            other => HistError::Table {
                message: format!("{other:?}"),
            },
        }
    }
}

impl<T: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<T>>
    for HistError
{
    fn from(err: plotters::drawing::DrawingAreaErrorKind<T>) -> Self {
        HistError::Render {
            message: format!("drawing area error: {err}"),
        }
    }
}

impl From<image::ImageError> for HistError {
    fn from(err: image::ImageError) -> Self {
        HistError::Render {
            message: err.to_string(),
        }
    }
}
