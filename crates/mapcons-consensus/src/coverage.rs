//! Coverage summaries: the per-position coverage distribution and low-coverage regions.

use std::collections::BTreeMap;

use crate::feature::{Feature, LOW_COVERAGE, Region};

/// Maximum number of low-coverage regions listed by [`CoverageInformation::low_coverage_summary`].
pub const MAX_LISTED_REGIONS: usize = 10;

/// Histogram of integer observations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyDistribution {
    counts: BTreeMap<u32, u64>,
    total: u64,
}

impl FrequencyDistribution {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one observation of `value`.
    pub fn add(&mut self, value: u32) {
        *self.counts.entry(value).or_insert(0) += 1;
        self.total += 1;
    }

    /// Number of observations.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Occurrences of each value in ascending value order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.counts.iter().map(|(&value, &count)| (value, count))
    }

    #[must_use]
    pub fn min(&self) -> Option<u32> {
        self.counts.keys().next().copied()
    }

    #[must_use]
    pub fn max(&self) -> Option<u32> {
        self.counts.keys().next_back().copied()
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let sum: f64 = self.iter().map(|(value, count)| f64::from(value) * count as f64).sum();
        sum / self.total as f64
    }

    /// Population standard deviation.
    #[must_use]
    pub fn stddev(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let mean = self.mean();
        let squares: f64 = self
            .iter()
            .map(|(value, count)| (f64::from(value) - mean).powi(2) * count as f64)
            .sum();
        (squares / self.total as f64).sqrt()
    }
}

/// Min, max, mean and standard deviation of the coverage.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CoverageStats {
    pub min: u32,
    pub max: u32,
    pub mean: f64,
    pub stddev: f64,
}

/// Coverage distribution over the output positions plus the low-coverage regions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageInformation {
    low_coverage_regions: Vec<Feature>,
    distribution: FrequencyDistribution,
}

impl CoverageInformation {
    /// Summarizes the coverage of consecutive output positions.
    ///
    /// Every maximal run of positions with coverage below `min_coverage` becomes one
    /// `Low Coverage` feature annotated with the run's mean coverage (integer division).
    pub fn from_coverages(coverages: impl IntoIterator<Item = u32>, min_coverage: u32) -> Self {
        let mut distribution = FrequencyDistribution::new();
        let mut low_coverage_regions = Vec::new();
        let mut run: Option<(usize, u64)> = None;
        let mut position = 0;

        for coverage in coverages {
            distribution.add(coverage);
            if coverage < min_coverage {
                let (_, sum) = run.get_or_insert((position, 0));
                *sum += u64::from(coverage);
            } else if let Some((start, sum)) = run.take() {
                low_coverage_regions.push(low_coverage_feature(start, position, sum));
            }
            position += 1;
        }
        if let Some((start, sum)) = run {
            low_coverage_regions.push(low_coverage_feature(start, position, sum));
        }

        Self { low_coverage_regions, distribution }
    }

    /// Low-coverage features in ascending position order.
    #[must_use]
    pub fn low_coverage_regions(&self) -> &[Feature] {
        &self.low_coverage_regions
    }

    #[must_use]
    pub fn distribution(&self) -> &FrequencyDistribution {
        &self.distribution
    }

    /// Coverage statistics; all zero when there are no positions.
    #[must_use]
    pub fn stats(&self) -> CoverageStats {
        CoverageStats {
            min: self.distribution.min().unwrap_or(0),
            max: self.distribution.max().unwrap_or(0),
            mean: self.distribution.mean(),
            stddev: self.distribution.stddev(),
        }
    }

    /// Lists up to ten low-coverage regions (1-based), `...` when there are more and `-`
    /// when there are none.
    #[must_use]
    pub fn low_coverage_summary(&self) -> String {
        if self.low_coverage_regions.is_empty() {
            return "-".to_string();
        }
        let listed = self
            .low_coverage_regions
            .iter()
            .take(MAX_LISTED_REGIONS)
            .map(|f| f.region().to_string())
            .collect::<Vec<_>>()
            .join(",");
        if self.low_coverage_regions.len() > MAX_LISTED_REGIONS {
            format!("{listed}...")
        } else {
            listed
        }
    }
}

fn low_coverage_feature(start: usize, end: usize, sum: u64) -> Feature {
    let mean = sum / (end - start) as u64;
    Feature::failure(LOW_COVERAGE, Region::new(start, end)).with_annotation("Coverage", mean as i64)
}
