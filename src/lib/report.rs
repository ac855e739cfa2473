//! Report rows built from consensus results.

use mapcons_consensus::ConsensusResult;
use mapcons_metrics::{CoverageMetric, FragmentMetric};

/// Coverage row for the consensus of `reference`.
#[must_use]
pub fn coverage_metric(reference: &str, result: &ConsensusResult) -> CoverageMetric {
    let stats = result.coverage.stats();
    CoverageMetric {
        reference: reference.to_string(),
        min_coverage: stats.min,
        max_coverage: stats.max,
        mean_coverage: stats.mean,
        stddev_coverage: stats.stddev,
        low_coverage_regions: result.coverage.low_coverage_summary(),
    }
}

/// Summary row for the consensus of `reference`.
#[must_use]
pub fn fragment_metric(reference: &str, result: &ConsensusResult) -> FragmentMetric {
    let extension = result.extension;
    FragmentMetric {
        reference: reference.to_string(),
        consensus: result.consensus.name().to_string(),
        extension_left: FragmentMetric::extension_value(extension.map(|e| e.left)),
        extension_right: FragmentMetric::extension_value(extension.map(|e| e.right)),
        problematic_regions: FragmentMetric::yes_no(result.consensus.has_failures()),
        ambiguous_positions: result.consensus.count_n(),
        final_length: result.consensus.len(),
    }
}

/// Names of the consensus sequences holding at least one `N`.
pub fn problematic_sequences<'a>(results: impl IntoIterator<Item = &'a ConsensusResult>) -> Vec<&'a str> {
    results
        .into_iter()
        .filter(|result| result.contains_n())
        .map(|result| result.consensus.name())
        .collect()
}
