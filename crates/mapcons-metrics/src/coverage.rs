//! Coverage summary of one consensus sequence.

use serde::{Deserialize, Serialize};

use crate::Metric;

/// Coverage over the output positions of one consensus sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageMetric {
    /// Name of the main sequence
    pub reference: String,
    /// Lowest coverage at any output position
    pub min_coverage: u32,
    /// Highest coverage at any output position
    pub max_coverage: u32,
    /// Mean coverage
    pub mean_coverage: f64,
    /// Population standard deviation of the coverage
    pub stddev_coverage: f64,
    /// Low-coverage regions (1-based), `-` when there are none
    pub low_coverage_regions: String,
}

impl CoverageMetric {
    /// Mean and standard deviation as shown in reports, e.g. `30.0 ± 2.5`.
    #[must_use]
    pub fn mean_summary(&self) -> String {
        format!("{:.1} ± {:.1}", self.mean_coverage, self.stddev_coverage)
    }

    /// True if any output position fell below the minimum coverage.
    #[must_use]
    pub fn has_low_coverage(&self) -> bool {
        self.low_coverage_regions != "-"
    }
}

impl Metric for CoverageMetric {
    fn metric_name() -> &'static str {
        "coverage"
    }
}
