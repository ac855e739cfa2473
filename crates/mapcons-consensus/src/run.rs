//! One consensus pass over a read mapping.

use log::{debug, warn};

use crate::builder::ConsensusBuilder;
use crate::cancel::CancellationToken;
use crate::coverage::CoverageInformation;
use crate::errors::{ConsensusError, Result};
use crate::iterator::PileupIterator;
use crate::mapping::ReadMapping;
use crate::options::ConsensusOptions;
use crate::patch::{Assembler, IndelPatcher, LocalSearch, PatchOutcome};
use crate::sequence::ConsensusSequence;

/// External services used to patch unsure regions.
#[derive(Clone, Copy)]
pub struct PatchServices<'a> {
    pub assembler: &'a dyn Assembler,
    pub search: &'a dyn LocalSearch,
}

/// Positions added beyond the mapped region at each end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extension {
    pub left: usize,
    pub right: usize,
}

/// Everything a consensus pass produced.
#[derive(Debug)]
pub struct ConsensusResult {
    pub consensus: ConsensusSequence,
    pub coverage: CoverageInformation,
    /// Set when extension was requested
    pub extension: Option<Extension>,
    /// Set when a patch was attempted; a failed patch leaves the consensus as built
    pub patch: Option<std::result::Result<PatchOutcome, ConsensusError>>,
}

impl ConsensusResult {
    /// True if the consensus holds at least one `N`.
    #[must_use]
    pub fn contains_n(&self) -> bool {
        self.consensus.count_n() > 0
    }
}

/// Computes consensus sequences with a fixed set of options.
#[derive(Debug, Clone)]
pub struct ConsensusRun {
    options: ConsensusOptions,
}

impl ConsensusRun {
    /// # Errors
    ///
    /// Returns an error if the options are out of range.
    pub fn new(options: ConsensusOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    #[must_use]
    pub fn options(&self) -> &ConsensusOptions {
        &self.options
    }

    /// Computes the consensus of `mapping`.
    ///
    /// With extension enabled the scan covers the most common span of the boundary reads,
    /// widened by [`PileupIterator::fix_start`] and [`PileupIterator::fix_end`]. With indel
    /// resolution enabled and `services` given, the unsure region is patched afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ConsensusError::Cancelled`] if cancelled at any point, or
    /// [`ConsensusError::PositionsOutOfOrder`] if the collected data points are unordered.
    /// Patch failures other than cancellation are reported in [`ConsensusResult::patch`].
    pub fn run(
        &self,
        mapping: &dyn ReadMapping,
        services: Option<PatchServices<'_>>,
        cancel: &CancellationToken,
    ) -> Result<ConsensusResult> {
        let length = mapping.main_sequence_length() as i64;
        let mut builder = ConsensusBuilder::new(mapping.name(), &self.options);
        let iterator = PileupIterator::new(mapping, &self.options, cancel);

        let mut extension = None;
        let (main_start, main_end) = if self.options.extend_start_end {
            let (start, end) = (iterator.search_start(), iterator.search_end());
            if end > start {
                (start, end)
            } else {
                debug!("Boundary reads of {} give an empty span {start}..{end}", mapping.name());
                (0, length)
            }
        } else {
            (0, length)
        };

        if self.options.extend_start_end {
            let left = iterator.fix_start(main_start, &mut builder)?;
            extension = Some(Extension { left, right: 0 });
        }
        iterator.iterate(main_start, main_end, &mut builder)?;
        if let Some(extension) = extension.as_mut() {
            extension.right = iterator.fix_end(main_end, &mut builder)?;
        }

        let mut consensus = builder.consensus()?;
        let patch = match services {
            Some(services) if self.options.indel_resolution => {
                let patcher = IndelPatcher::new(services.assembler, services.search);
                match patcher.patch(&mut consensus, mapping, cancel) {
                    Err(e) if e.is_cancelled() => return Err(e),
                    Err(e) => {
                        warn!("Indel resolution failed for {}: {e}", mapping.name());
                        Some(Err(e))
                    }
                    Ok(outcome) => {
                        debug!("Indel resolution of {}: {outcome:?}", mapping.name());
                        Some(Ok(outcome))
                    }
                }
            }
            _ => None,
        };

        Ok(ConsensusResult {
            consensus,
            coverage: builder.coverage_information().clone(),
            extension,
            patch,
        })
    }
}
