//! Per-position pileup counts and the candidate symbols derived from them.

use std::fmt;

use mapcons_dna::{GAP_SLOT, N_SLOT, NO_CALL_BASE, SLOT_COUNT, SymbolCounts, base_of_slot};

/// A symbol a position can resolve to: a gap or a base letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsensusSymbol {
    /// Deletion relative to the main sequence (or no insertion at an insertion column)
    Gap,
    /// A base letter (A, C, G, T, N or an IUPAC code)
    Base(u8),
}

impl ConsensusSymbol {
    /// Returns the symbol tallied in `slot`; the N slot normalizes to `N`.
    #[must_use]
    pub const fn from_slot(slot: usize) -> Self {
        if slot == GAP_SLOT { Self::Gap } else { Self::Base(base_of_slot(slot)) }
    }

    /// Returns true for [`ConsensusSymbol::Gap`].
    #[must_use]
    pub const fn is_gap(self) -> bool {
        matches!(self, Self::Gap)
    }
}

impl fmt::Display for ConsensusSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gap => f.write_str("gap"),
            Self::Base(base) => write!(f, "{}", *base as char),
        }
    }
}

/// A candidate symbol at a position that clears the minimum frequency bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreVariant {
    /// The candidate symbol
    pub symbol: ConsensusSymbol,
    /// Observations of the symbol on both strands
    pub count: u32,
    /// Total observations at the position, all slots and both strands
    pub coverage: u32,
}

impl PreVariant {
    /// Fraction of the coverage supporting this symbol.
    #[must_use]
    pub fn freq(&self) -> f64 {
        if self.coverage == 0 { 0.0 } else { f64::from(self.count) / f64::from(self.coverage) }
    }
}

/// Strand-separated symbol counts and breakpoint flags for one output column.
///
/// Insertion columns share the `position` of the main-sequence base they follow, so
/// positions are non-decreasing rather than strictly increasing within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPoint {
    position: i64,
    forward: SymbolCounts,
    reverse: SymbolCounts,
    left_breakpoint: bool,
    right_breakpoint: bool,
}

impl DataPoint {
    /// Creates a data point without breakpoint flags.
    #[must_use]
    pub fn new(position: i64, forward: SymbolCounts, reverse: SymbolCounts) -> Self {
        Self { position, forward, reverse, left_breakpoint: false, right_breakpoint: false }
    }

    /// Sets the breakpoint flags.
    #[must_use]
    pub fn with_breakpoints(mut self, left: bool, right: bool) -> Self {
        self.left_breakpoint = left;
        self.right_breakpoint = right;
        self
    }

    /// Main-sequence position of this column.
    #[must_use]
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Forward strand counts.
    #[must_use]
    pub fn forward(&self) -> &SymbolCounts {
        &self.forward
    }

    /// Reverse strand counts.
    #[must_use]
    pub fn reverse(&self) -> &SymbolCounts {
        &self.reverse
    }

    /// True when an unusual fraction of reads start aligning here after an unaligned tail.
    #[must_use]
    pub fn left_breakpoint(&self) -> bool {
        self.left_breakpoint
    }

    /// True when an unusual fraction of reads stop aligning here before an unaligned tail.
    #[must_use]
    pub fn right_breakpoint(&self) -> bool {
        self.right_breakpoint
    }

    /// True if either breakpoint flag is set.
    #[must_use]
    pub fn is_breakpoint(&self) -> bool {
        self.left_breakpoint || self.right_breakpoint
    }

    /// Observations of `slot` on both strands.
    #[must_use]
    pub fn count(&self, slot: usize) -> u32 {
        self.forward[slot] + self.reverse[slot]
    }

    /// Total observations over all six slots and both strands.
    #[must_use]
    pub fn coverage(&self) -> u32 {
        (0..SLOT_COUNT).map(|slot| self.count(slot)).sum()
    }

    /// Largest single-symbol support over all slots.
    #[must_use]
    pub fn max_support(&self) -> u32 {
        (0..SLOT_COUNT).map(|slot| self.count(slot)).max().unwrap_or(0)
    }

    /// Computes the candidate symbols at this position.
    ///
    /// Returns nothing when `coverage < min_coverage`. Otherwise every slot except N whose
    /// count exceeds `floor(coverage * min_frequency)` becomes a [`PreVariant`], in slot order
    /// (gap, A, C, G, T).
    #[must_use]
    pub fn pre_variants(&self, min_frequency: f64, min_coverage: u32) -> Vec<PreVariant> {
        let coverage = self.coverage();
        if coverage < min_coverage {
            return Vec::new();
        }
        let min_count = (f64::from(coverage) * min_frequency).floor() as u32;
        (0..N_SLOT)
            .filter(|&slot| self.count(slot) > min_count)
            .map(|slot| PreVariant {
                symbol: ConsensusSymbol::from_slot(slot),
                count: self.count(slot),
                coverage,
            })
            .collect()
    }
}

/// The most ambiguous symbol, emitted when nothing can be called.
pub const UNRESOLVED: u8 = NO_CALL_BASE;

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(gap: u32, a: u32, c: u32, g: u32, t: u32, n: u32) -> SymbolCounts {
        [gap, a, c, g, t, n]
    }

    #[test]
    fn test_coverage_sums_both_strands_and_all_slots() {
        let dp = DataPoint::new(3, counts(1, 2, 0, 0, 0, 4), counts(0, 3, 1, 0, 0, 0));
        assert_eq!(dp.coverage(), 11);
        assert_eq!(dp.count(1), 5);
        assert_eq!(dp.max_support(), 5);
    }

    #[test]
    fn test_pre_variants_below_min_coverage_is_empty() {
        let dp = DataPoint::new(0, counts(0, 4, 0, 0, 0, 0), counts(0, 4, 0, 0, 0, 0));
        assert!(dp.pre_variants(0.05, 10).is_empty());
        assert_eq!(dp.pre_variants(0.05, 8).len(), 1);
    }

    #[test]
    fn test_pre_variants_threshold_is_strictly_greater_than_floor() {
        // coverage 20 * 0.25 = 5; a count of exactly 5 does not qualify
        let dp = DataPoint::new(0, counts(0, 10, 5, 0, 5, 0), [0; SLOT_COUNT]);
        let pvs = dp.pre_variants(0.25, 1);
        assert_eq!(pvs.len(), 1);
        assert_eq!(pvs[0].symbol, ConsensusSymbol::Base(b'A'));
        assert_eq!(pvs[0].coverage, 20);
        assert!((pvs[0].freq() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_n_slot_counts_toward_coverage_but_never_qualifies() {
        let dp = DataPoint::new(0, counts(0, 3, 0, 0, 0, 17), [0; SLOT_COUNT]);
        let pvs = dp.pre_variants(0.05, 1);
        assert_eq!(pvs.len(), 1);
        assert_eq!(pvs[0].symbol, ConsensusSymbol::Base(b'A'));
        assert_eq!(pvs[0].coverage, 20);
    }

    #[test]
    fn test_gap_is_a_candidate() {
        let dp = DataPoint::new(0, counts(9, 0, 1, 0, 0, 0), [0; SLOT_COUNT]);
        let pvs = dp.pre_variants(0.05, 1);
        assert_eq!(pvs[0].symbol, ConsensusSymbol::Gap);
        assert_eq!(pvs[1].symbol, ConsensusSymbol::Base(b'C'));
    }

    #[test]
    fn test_symbol_display() {
        assert_eq!(ConsensusSymbol::Gap.to_string(), "gap");
        assert_eq!(ConsensusSymbol::Base(b'W').to_string(), "W");
        assert_eq!(ConsensusSymbol::from_slot(N_SLOT), ConsensusSymbol::Base(b'N'));
    }

    #[test]
    fn test_breakpoint_flags() {
        let dp = DataPoint::new(0, [0; SLOT_COUNT], [0; SLOT_COUNT]);
        assert!(!dp.is_breakpoint());
        let dp = dp.with_breakpoints(false, true);
        assert!(dp.is_breakpoint());
        assert!(dp.right_breakpoint());
        assert!(!dp.left_breakpoint());
    }
}
