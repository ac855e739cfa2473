#![deny(unsafe_code)]

//! Report metrics for consensus runs and their TSV writer.
//!
//! This crate provides:
//! - [`Metric`] trait shared by all metric rows
//! - [`CoverageMetric`] with the coverage summary of one consensus sequence
//! - [`FragmentMetric`] with extension, problem and length information per sequence
//! - [`writer`] module for TSV file output

pub mod coverage;
pub mod fragment;
pub mod writer;

use serde::{Deserialize, Serialize};

/// Number of decimal places used for float metrics.
pub const FLOAT_PRECISION: usize = 6;

/// Formats a float value with the standard precision for metrics.
///
/// # Example
/// ```
/// use mapcons_metrics::format_float;
/// assert_eq!(format_float(0.9), "0.900000");
/// assert_eq!(format_float(0.0), "0.000000");
/// ```
#[must_use]
pub fn format_float(value: f64) -> String {
    format!("{value:.FLOAT_PRECISION$}")
}

/// Formats a count with thousands separators.
///
/// # Example
/// ```
/// use mapcons_metrics::format_count;
/// assert_eq!(format_count(1_234_567), "1,234,567");
/// assert_eq!(format_count(12), "12");
/// ```
#[must_use]
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// A metric type that can be serialized to TSV files.
pub trait Metric: Serialize + for<'de> Deserialize<'de> + Clone + Default {
    /// Human-readable name for this metric type, used in error messages.
    fn metric_name() -> &'static str;
}

pub use coverage::CoverageMetric;
pub use fragment::FragmentMetric;
pub use writer::{write_metrics, write_metrics_auto};
