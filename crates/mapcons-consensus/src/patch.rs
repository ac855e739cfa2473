//! Local reassembly of unsure consensus regions.
//!
//! When the builder flags an unsure region, the reads around it are handed to an external
//! assembler and the contigs are searched against the consensus. The best hit replaces the
//! consensus span it aligns to, unless it agrees with the consensus already.

use log::{debug, info};

use mapcons_dna::GAP_BASE;

use crate::builder::{REFERENCE_END, REFERENCE_START};
use crate::cancel::CancellationToken;
use crate::errors::{ConsensusError, Result};
use crate::feature::{Feature, LOCAL_ASSEMBLY, Region};
use crate::mapping::{ReadCollection, ReadMapping};
use crate::sequence::ConsensusSequence;

/// An assembled contig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contig {
    pub name: String,
    pub sequence: Vec<u8>,
}

/// Best local alignment of a contig against the consensus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// First aligned query position (0-based)
    pub query_start: usize,
    /// One past the last aligned query position
    pub query_end: usize,
    /// Number of identical aligned columns
    pub identity: usize,
    /// Number of aligned columns, gaps included
    pub align_len: usize,
    /// Aligned subject bases, gaps included
    pub subject_aligned: Vec<u8>,
}

impl SearchHit {
    /// Aligned columns that are not identical.
    #[must_use]
    pub fn mismatches(&self) -> usize {
        self.align_len.saturating_sub(self.identity)
    }
}

/// Assembles reads into contigs.
pub trait Assembler: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the assembly could not be run.
    fn assemble(&self, reads: &ReadCollection) -> anyhow::Result<Vec<Contig>>;
}

/// Finds the best local alignment of any subject against a query.
pub trait LocalSearch: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the search could not be run.
    fn search(&self, query: &[u8], subjects: &[Contig]) -> anyhow::Result<Option<SearchHit>>;
}

/// What a patch attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    NoUnsureRegion,
    NoReads,
    NoContigs,
    NoHit,
    NoMismatches,
    /// The consensus span `[start, end)` now holds assembled bases
    Patched { start: usize, end: usize },
}

impl PatchOutcome {
    #[must_use]
    pub fn is_patched(self) -> bool {
        matches!(self, Self::Patched { .. })
    }
}

/// Runs the assembler and local search on the unsure region of a consensus.
pub struct IndelPatcher<'a> {
    assembler: &'a dyn Assembler,
    search: &'a dyn LocalSearch,
}

impl<'a> IndelPatcher<'a> {
    #[must_use]
    pub fn new(assembler: &'a dyn Assembler, search: &'a dyn LocalSearch) -> Self {
        Self { assembler, search }
    }

    /// Attempts to patch the unsure region of `consensus`.
    ///
    /// The consensus is only modified when every step yields a usable result.
    ///
    /// # Errors
    ///
    /// Returns [`ConsensusError::Service`] if the assembler or the search fails or returns
    /// a hit outside the consensus, and [`ConsensusError::Cancelled`] if the token is
    /// cancelled between steps.
    pub fn patch(
        &self,
        consensus: &mut ConsensusSequence,
        mapping: &dyn ReadMapping,
        cancel: &CancellationToken,
    ) -> Result<PatchOutcome> {
        let Some(unsure) = consensus.unsure_region() else {
            return Ok(PatchOutcome::NoUnsureRegion);
        };
        let (start, end) = reference_span(unsure);

        let reads = mapping.fragments_in_region(start, end);
        if reads.is_empty() {
            debug!("No reads in unsure region {start}..{end} of {}", mapping.name());
            return Ok(PatchOutcome::NoReads);
        }
        cancel.check()?;

        debug!("Assembling {} reads from {}..{} of {}", reads.len(), start, end, mapping.name());
        let contigs = self
            .assembler
            .assemble(&reads)
            .map_err(|e| ConsensusError::Service { service: "assembler", message: format!("{e:#}") })?;
        if contigs.is_empty() {
            return Ok(PatchOutcome::NoContigs);
        }
        cancel.check()?;

        let hit = self
            .search
            .search(consensus.symbols(), &contigs)
            .map_err(|e| ConsensusError::Service { service: "local search", message: format!("{e:#}") })?;
        let Some(hit) = hit else {
            return Ok(PatchOutcome::NoHit);
        };
        if hit.mismatches() == 0 {
            return Ok(PatchOutcome::NoMismatches);
        }
        if hit.query_start >= hit.query_end || hit.query_end > consensus.len() {
            return Err(ConsensusError::Service {
                service: "local search",
                message: format!(
                    "hit {}..{} lies outside the consensus of length {}",
                    hit.query_start,
                    hit.query_end,
                    consensus.len()
                ),
            });
        }
        cancel.check()?;

        let replacement: Vec<u8> =
            hit.subject_aligned.iter().copied().filter(|&base| base != GAP_BASE).collect();
        consensus.replace_span(hit.query_start, hit.query_end, &replacement);
        let patched_end = hit.query_start + replacement.len();
        if patched_end > hit.query_start {
            consensus.add_feature(Feature::failure(
                LOCAL_ASSEMBLY,
                Region::new(hit.query_start, patched_end),
            ));
        }
        info!(
            "Replaced {}..{} of {} with {} assembled bases",
            hit.query_start + 1,
            hit.query_end,
            consensus.name(),
            replacement.len()
        );
        Ok(PatchOutcome::Patched { start: hit.query_start, end: patched_end })
    }
}

/// Main-sequence span of the unsure region, falling back to its consensus coordinates.
fn reference_span(unsure: &Feature) -> (i64, i64) {
    let annotated = |key| unsure.annotation(key).and_then(|value| value.as_int());
    match (annotated(REFERENCE_START), annotated(REFERENCE_END)) {
        (Some(start), Some(end)) => (start, end),
        _ => (unsure.region().start() as i64, unsure.region().end() as i64),
    }
}
