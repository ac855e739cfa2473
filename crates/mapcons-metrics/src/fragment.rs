//! Per-sequence summary of a consensus run.

use serde::{Deserialize, Serialize};

use crate::Metric;

/// Shown in place of values that were not computed.
pub const NOT_APPLICABLE: &str = "-";

/// Extension, problem and length information for one consensus sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FragmentMetric {
    /// Name of the main sequence
    pub reference: String,
    /// Name of the consensus sequence
    pub consensus: String,
    /// Positions added before the mapped region, `-` when extension was off
    pub extension_left: String,
    /// Positions added after the mapped region, `-` when extension was off
    pub extension_right: String,
    /// `Yes` if the consensus carries failure features
    pub problematic_regions: String,
    /// Number of `N` symbols in the consensus
    pub ambiguous_positions: usize,
    /// Length of the consensus
    pub final_length: usize,
}

impl FragmentMetric {
    /// Renders an optional extension length.
    #[must_use]
    pub fn extension_value(extension: Option<usize>) -> String {
        extension.map_or_else(|| NOT_APPLICABLE.to_string(), |n| n.to_string())
    }

    /// Renders a flag as `Yes` or `No`.
    #[must_use]
    pub fn yes_no(flag: bool) -> String {
        if flag { "Yes" } else { "No" }.to_string()
    }
}

impl Metric for FragmentMetric {
    fn metric_name() -> &'static str {
        "fragment"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_value() {
        assert_eq!(FragmentMetric::extension_value(None), "-");
        assert_eq!(FragmentMetric::extension_value(Some(0)), "0");
        assert_eq!(FragmentMetric::extension_value(Some(17)), "17");
    }

    #[test]
    fn test_yes_no() {
        assert_eq!(FragmentMetric::yes_no(true), "Yes");
        assert_eq!(FragmentMetric::yes_no(false), "No");
    }
}
