//! The synthesized consensus sequence and its features.

use mapcons_dna::NO_CALL_BASE;

use crate::feature::{Feature, FeatureKind, UNSURE};

/// Consensus symbols plus the features annotating them.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusSequence {
    name: String,
    symbols: Vec<u8>,
    features: Vec<Feature>,
}

impl ConsensusSequence {
    #[must_use]
    pub fn new(name: impl Into<String>, symbols: Vec<u8>, features: Vec<Feature>) -> Self {
        Self { name: name.into(), symbols, features }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consensus symbols as ASCII IUPAC letters.
    #[must_use]
    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn add_feature(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// The breakpoint region flagged for local reassembly, if any.
    #[must_use]
    pub fn unsure_region(&self) -> Option<&Feature> {
        self.features.iter().find(|f| f.is_failure(UNSURE))
    }

    /// True if any failures feature is attached.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.features.iter().any(|f| f.kind() == FeatureKind::Failures)
    }

    /// True if any conflict feature is attached.
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        self.features.iter().any(|f| f.kind() == FeatureKind::Conflict)
    }

    /// Number of `N` symbols.
    #[must_use]
    pub fn count_n(&self) -> usize {
        self.symbols.iter().filter(|&&b| b == NO_CALL_BASE).count()
    }

    /// Replaces `symbols[start..end]` with `replacement`.
    ///
    /// Every feature interval is remapped with [`Region::spliced`](crate::feature::Region::spliced), so coordinates after the
    /// replaced span move by the length change.
    ///
    /// # Panics
    ///
    /// Panics if `start > end` or `end > self.len()`.
    pub fn replace_span(&mut self, start: usize, end: usize, replacement: &[u8]) {
        self.symbols.splice(start..end, replacement.iter().copied());
        for feature in &mut self.features {
            let region = feature.region().spliced(start, end, replacement.len());
            feature.set_region(region);
        }
    }
}
