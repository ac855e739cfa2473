#![deny(unsafe_code)]

//! Consensus calling from reads mapped against a main sequence.
//!
//! The engine scans a [`ReadMapping`] position by position with a [`PileupIterator`],
//! producing per-position symbol counts ([`DataPoint`]) grouped into ordered
//! [`BuilderSession`]s. The [`ConsensusBuilder`] merges the sessions, resolves positions with
//! several candidate symbols according to a [`ConflictResolution`] policy and annotates the
//! resulting [`ConsensusSequence`] with conflict, low-coverage and breakpoint features.
//! Unsure breakpoint regions can then be patched by local reassembly ([`IndelPatcher`]).
//!
//! [`ConsensusRun`] strings these steps together for one mapping.
//!
//! # Example
//!
//! ```
//! use mapcons_consensus::{
//!     AlignedRead, CancellationToken, ConsensusOptions, ConsensusRun, InMemoryMapping, Strand,
//!     parse_cigar,
//! };
//!
//! let reads = (0..12)
//!     .map(|i| {
//!         let ops = parse_cigar("8M").unwrap();
//!         AlignedRead::new(format!("r{i}"), b"ACGTACGT".to_vec(), None, 0, &ops, Strand::Forward)
//!     })
//!     .collect::<Result<Vec<_>, _>>()
//!     .unwrap();
//! let mapping = InMemoryMapping::new("chrM", 8, false, reads, Vec::new());
//!
//! let options = ConsensusOptions { min_coverage: 10, ..ConsensusOptions::default() };
//! let run = ConsensusRun::new(options).unwrap();
//! let result = run.run(&mapping, None, &CancellationToken::new()).unwrap();
//! assert_eq!(result.consensus.symbols(), b"ACGTACGT");
//! ```

pub mod builder;
pub mod cancel;
pub mod coverage;
pub mod data_point;
pub mod errors;
pub mod feature;
pub mod filter;
pub mod iterator;
pub mod mapping;
pub mod options;
pub mod patch;
pub mod progress;
pub mod resolution;
pub mod run;
pub mod sequence;
pub mod session;

pub use builder::ConsensusBuilder;
pub use cancel::CancellationToken;
pub use coverage::{CoverageInformation, CoverageStats, FrequencyDistribution};
pub use data_point::{ConsensusSymbol, DataPoint, PreVariant};
pub use errors::{ConsensusError, Result};
pub use feature::{AnnotationValue, Feature, FeatureKind, Interval, Region};
pub use filter::{FilterPipeline, PositionFilter};
pub use iterator::PileupIterator;
pub use mapping::{
    AlignedRead, AlignmentOp, InMemoryMapping, ReadCollection, ReadMapping, Segment, Strand,
    UnalignedMate, parse_cigar,
};
pub use options::{ConsensusOptions, NonSpecificMatches, QualityFilterOptions};
pub use patch::{Assembler, Contig, IndelPatcher, LocalSearch, PatchOutcome, SearchHit};
pub use progress::ProgressTracker;
pub use resolution::ConflictResolution;
pub use run::{ConsensusResult, ConsensusRun, Extension, PatchServices};
pub use sequence::ConsensusSequence;
pub use session::BuilderSession;
