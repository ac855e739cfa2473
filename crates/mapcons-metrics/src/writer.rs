//! TSV output for metric rows.

use std::path::Path;

use anyhow::{Context, Result};
use fgoxide::io::DelimFile;
use serde::Serialize;

use crate::Metric;

/// Writes metric rows to a TSV file with a header line.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_metrics<P: AsRef<Path>, T: Serialize>(
    path: P,
    metrics: &[T],
    description: &str,
) -> Result<()> {
    let path_ref = path.as_ref();
    DelimFile::default()
        .write_tsv(&path_ref, metrics)
        .with_context(|| format!("Failed to write {} metrics: {}", description, path_ref.display()))
}

/// Writes rows of a [`Metric`] type, naming it by [`Metric::metric_name`] in errors.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_metrics_auto<P: AsRef<Path>, T: Metric>(path: P, metrics: &[T]) -> Result<()> {
    write_metrics(path, metrics, T::metric_name())
}
