//! Data-source abstraction: histogram handles, open files and pattern
//! resolution.
//!
//! The extractor and the plotter only ever talk to these traits; the
//! concrete container format lives in [`crate::data`].

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{HistError, Result};

// ---------------------------------------------------------------------------
// Histogram handle
// ---------------------------------------------------------------------------

/// One of the (up to three) axes a stored histogram may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Position of the axis in a bin index slice.
    pub fn position(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Axis for a 0-based position, if one exists.
    pub fn from_position(pos: usize) -> Option<Axis> {
        match pos {
            0 => Some(Axis::X),
            1 => Some(Axis::Y),
            2 => Some(Axis::Z),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// A named binned object owned by an open [`DataFile`].
///
/// Bin indices are 1-based for in-range bins. Index `0` is the underflow
/// bin and `bin_count + 1` the overflow bin of an axis.
pub trait BinnedHistogram {
    fn name(&self) -> &str;

    fn title(&self) -> &str {
        ""
    }

    /// Number of axes carrying bins.
    fn dimensionality(&self) -> usize;

    /// Number of in-range bins along `axis` (0 if the axis is absent).
    fn bin_count(&self, axis: Axis) -> usize;

    fn bin_center(&self, axis: Axis, index: usize) -> f64;

    fn bin_low_edge(&self, axis: Axis, index: usize) -> f64;

    fn bin_up_edge(&self, axis: Axis, index: usize) -> f64 {
        self.bin_low_edge(axis, index + 1)
    }

    /// Content of the bin addressed by one index per axis.
    fn bin_content(&self, bin: &[usize]) -> f64;

    /// Statistical error of the bin addressed by one index per axis.
    fn bin_error(&self, bin: &[usize]) -> f64;
}

// ---------------------------------------------------------------------------
// Open file
// ---------------------------------------------------------------------------

/// An open container of zero or more named histograms.
pub trait DataFile {
    fn path(&self) -> &Path;

    /// Whether the container was read completely and can serve lookups.
    fn is_valid(&self) -> bool;

    fn get(&self, name: &str) -> Option<&dyn BinnedHistogram>;

    /// Names of the stored objects, in file order.
    fn keys(&self) -> Vec<&str>;

    /// Release whatever the file holds. Called exactly once by [`OpenFile`].
    fn close(&mut self);
}

/// Factory for [`DataFile`]s, the "open" half of the container collaborator.
pub trait FileOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn DataFile>>;
}

/// Scoped handle around an open [`DataFile`].
///
/// The file is closed exactly once: by [`OpenFile::close`] or, on any other
/// exit path, when the guard is dropped. Histogram handles borrow the guard,
/// so none can outlive the close.
pub struct OpenFile {
    inner: Option<Box<dyn DataFile>>,
    path: PathBuf,
}

impl OpenFile {
    /// Open `path` with `opener`, rejecting containers that report themselves
    /// invalid.
    pub fn open(opener: &dyn FileOpener, path: &Path) -> Result<Self> {
        let file = opener.open(path)?;
        let mut guard = OpenFile {
            inner: Some(file),
            path: path.to_path_buf(),
        };
        if !guard.file().is_some_and(|f| f.is_valid()) {
            guard.release();
            return Err(HistError::FileOpen {
                path: path.to_path_buf(),
                reason: "container is not valid".to_string(),
            });
        }
        log::debug!("opened {}", path.display());
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&self) -> Option<&dyn DataFile> {
        self.inner.as_deref()
    }

    /// Look up a histogram, mapping absence to [`HistError::ObjectNotFound`].
    pub fn histogram(&self, name: &str) -> Result<&dyn BinnedHistogram> {
        self.file()
            .and_then(|f| f.get(name))
            .ok_or_else(|| HistError::ObjectNotFound {
                name: name.to_string(),
                path: self.path.clone(),
            })
    }

    pub fn keys(&self) -> Vec<&str> {
        self.file().map(|f| f.keys()).unwrap_or_default()
    }

    /// Close the file now instead of at the end of scope.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut file) = self.inner.take() {
            file.close();
            log::debug!("closed {}", self.path.display());
        }
    }
}

impl Drop for OpenFile {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// Pattern resolution
// ---------------------------------------------------------------------------

/// Expand a wildcard pattern into the list of matching paths.
///
/// Matches come back in the order the `glob` crate yields them (sorted per
/// directory), so the order is stable across runs.
pub fn resolve_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob::glob(pattern).map_err(|source| HistError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => files.push(path),
            Err(e) => log::warn!("skipping unreadable match {}: {e}", e.path().display()),
        }
    }

    if files.is_empty() {
        return Err(HistError::NoMatchingFiles {
            pattern: pattern.to_string(),
        });
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_positions_round_trip() {
        for axis in [Axis::X, Axis::Y, Axis::Z] {
            assert_eq!(Axis::from_position(axis.position()), Some(axis));
        }
        assert_eq!(Axis::from_position(3), None);
    }

    #[test]
    fn resolve_pattern_reports_empty_match() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.json", dir.path().display());
        let err = resolve_pattern(&pattern).unwrap_err();
        assert!(matches!(err, HistError::NoMatchingFiles { .. }));
    }

    #[test]
    fn resolve_pattern_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.json", "a.json", "b.json", "skip.txt"] {
            std::fs::write(dir.path().join(name), "{}").unwrap();
        }
        let pattern = format!("{}/*.json", dir.path().display());
        let files = resolve_pattern(&pattern).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.json", "b.json", "c.json"]);
    }

    #[test]
    fn resolve_pattern_rejects_bad_syntax() {
        let err = resolve_pattern("[unclosed").unwrap_err();
        assert!(matches!(err, HistError::InvalidPattern { .. }));
    }
}
