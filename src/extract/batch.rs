use std::path::{Path, PathBuf};

use super::extract_file;
use crate::error::{FileFailure, Result};
use crate::source::{resolve_pattern, FileOpener};

/// Outcome of a batch extraction.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Tables written, in processing order.
    pub written: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.written.len() + self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Extract `hist_name` from every file in `paths`.
///
/// Each file is handled on its own: a file that cannot be opened, lacks the
/// histogram or holds an unsupported kind is logged and skipped.
pub fn extract_batch(
    opener: &dyn FileOpener,
    paths: &[PathBuf],
    hist_name: &str,
    out_dir: &Path,
) -> BatchReport {
    let mut report = BatchReport::default();

    for path in paths {
        match extract_file(opener, path, hist_name, out_dir) {
            Ok(output) => report.written.push(output),
            Err(error) => {
                log::error!("{error}");
                report.failures.push(FileFailure {
                    path: path.clone(),
                    error,
                });
            }
        }
    }

    log::info!(
        "batch finished: {} written, {} skipped",
        report.written.len(),
        report.failures.len()
    );
    report
}

/// Resolve `pattern` and run [`extract_batch`] over the matches.
///
/// Only an empty or malformed pattern is an error; per-file problems end up
/// in the report.
pub fn extract_pattern(
    opener: &dyn FileOpener,
    pattern: &str,
    hist_name: &str,
    out_dir: &Path,
) -> Result<BatchReport> {
    let paths = resolve_pattern(pattern)?;
    log::info!("{} files match {pattern}", paths.len());
    Ok(extract_batch(opener, &paths, hist_name, out_dir))
}
