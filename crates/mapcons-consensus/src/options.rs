//! Configuration of a consensus run.

use crate::errors::{ConsensusError, Result};
use crate::resolution::ConflictResolution;

/// Highest quality accepted for the quality filter thresholds.
pub const MAX_FILTER_QUALITY: u8 = 64;

/// Which reads with non-specific (ambiguous) matches are left out of the pileup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonSpecificMatches {
    /// Ignore every non-specific read
    #[default]
    IgnoreReads,
    /// Ignore non-specific reads whose aligned span reaches the minimum region length
    IgnoreRegions,
    /// Keep all reads
    Keep,
}

/// Thresholds of the base/region quality filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityFilterOptions {
    /// Radius of the neighborhood averaged around a call
    pub radius: usize,
    /// Minimum quality of the base itself
    pub min_central_quality: u8,
    /// Minimum mean quality of the neighborhood
    pub min_region_quality: u8,
}

impl Default for QualityFilterOptions {
    fn default() -> Self {
        Self { radius: 5, min_central_quality: 20, min_region_quality: 15 }
    }
}

/// Options of a consensus run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusOptions {
    /// Positions with fewer observations resolve to `N` and are reported as low coverage
    pub min_coverage: u32,
    /// Fraction of the coverage a symbol must exceed to become a candidate
    pub min_frequency: f64,
    pub conflict_resolution: ConflictResolution,
    pub add_conflict_annotations: bool,
    /// Search the confident mapped region and extend past it using unaligned tails
    pub extend_start_end: bool,
    /// Minimum single-symbol support for an extension position
    pub min_coverage_extend: u32,
    /// Detect breakpoints and patch unsure regions by local reassembly
    pub indel_resolution: bool,
    /// Fraction of reads with long unaligned tails that flags a breakpoint
    pub min_breakpoint_frequency: f64,
    /// Quality filter thresholds; `None` disables the filter
    pub quality_filter: Option<QualityFilterOptions>,
    pub non_specific_matches: NonSpecificMatches,
    /// Aligned span from which a non-specific read is ignored in region mode
    pub min_ignore_read_length: usize,
    /// Ignore reads whose mate is unmapped or mapped to another sequence
    pub ignore_broken_pairs: bool,
}

impl Default for ConsensusOptions {
    fn default() -> Self {
        Self {
            min_coverage: 50,
            min_frequency: 0.05,
            conflict_resolution: ConflictResolution::Vote,
            add_conflict_annotations: true,
            extend_start_end: false,
            min_coverage_extend: 20,
            indel_resolution: false,
            min_breakpoint_frequency: 0.25,
            quality_filter: None,
            non_specific_matches: NonSpecificMatches::IgnoreReads,
            min_ignore_read_length: 20,
            ignore_broken_pairs: true,
        }
    }
}

impl ConsensusOptions {
    /// Ratio above which a position is flagged as a breakpoint, when detection is enabled.
    #[must_use]
    pub fn breakpoint_threshold(&self) -> Option<f64> {
        self.indel_resolution.then_some(self.min_breakpoint_frequency)
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `min_coverage` or `min_coverage_extend` is zero
    /// - `min_frequency` or `min_breakpoint_frequency` is outside `(0, 1]`
    /// - a quality filter threshold exceeds [`MAX_FILTER_QUALITY`]
    pub fn validate(&self) -> Result<()> {
        if self.min_coverage == 0 {
            return Err(ConsensusError::InvalidOption {
                option: "min-coverage",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.min_coverage_extend == 0 {
            return Err(ConsensusError::InvalidOption {
                option: "min-coverage-extend",
                reason: "must be at least 1".to_string(),
            });
        }
        validate_fraction("min-frequency", self.min_frequency)?;
        validate_fraction("min-breakpoint-frequency", self.min_breakpoint_frequency)?;

        if let Some(quality) = &self.quality_filter {
            for (option, value) in [
                ("min-central-quality", quality.min_central_quality),
                ("min-region-quality", quality.min_region_quality),
            ] {
                if value > MAX_FILTER_QUALITY {
                    return Err(ConsensusError::InvalidOption {
                        option,
                        reason: format!("{value} exceeds maximum quality {MAX_FILTER_QUALITY}"),
                    });
                }
            }
        }
        Ok(())
    }
}

fn validate_fraction(option: &'static str, value: f64) -> Result<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConsensusError::InvalidFrequency { option, value })
    }
}
