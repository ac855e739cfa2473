//! Common CLI options shared across commands.
//!
//! This module provides shared argument structures that can be composed into
//! command structs using `#[command(flatten)]`.

use std::path::PathBuf;

use clap::{ArgAction, Args, ValueEnum};

use mapcons_consensus::{
    ConflictResolution, ConsensusOptions, NonSpecificMatches, QualityFilterOptions,
};
use mapcons_lib::validation::{validate_file_exists, validate_output_parent, validate_positive};

/// Input BAM and output FASTA.
#[derive(Debug, Clone, Args)]
pub struct InputOutputOptions {
    /// Input BAM file with reads mapped against the reference sequences
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Output FASTA file with one consensus sequence per reference
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

impl InputOutputOptions {
    /// Validates that the input exists and the output can be created.
    ///
    /// # Errors
    ///
    /// Returns an error if the input file does not exist or the output directory is missing.
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_file_exists(&self.input, "Input BAM")?;
        validate_output_parent(&self.output, "Output FASTA")?;
        Ok(())
    }
}

/// Optional tabular outputs.
#[derive(Debug, Clone, Default, Args)]
pub struct ReportOptions {
    /// Optional output file listing the features of every consensus sequence
    #[arg(long = "features")]
    pub features: Option<PathBuf>,

    /// Optional output file with per-reference coverage metrics
    #[arg(long = "coverage-metrics")]
    pub coverage_metrics: Option<PathBuf>,

    /// Optional output file with per-reference fragment metrics
    #[arg(long = "fragment-metrics")]
    pub fragment_metrics: Option<PathBuf>,
}

impl ReportOptions {
    /// Validates that the parent directory of every requested output exists.
    ///
    /// # Errors
    ///
    /// Returns an error if an output directory is missing.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (path, description) in [
            (&self.features, "Features file"),
            (&self.coverage_metrics, "Coverage metrics"),
            (&self.fragment_metrics, "Fragment metrics"),
        ] {
            if let Some(path) = path {
                validate_output_parent(path, description)?;
            }
        }
        Ok(())
    }
}

/// Conflict resolution policy as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConflictResolutionArg {
    /// Most frequent candidate wins
    Vote,
    /// IUPAC code covering all candidates
    Iupac,
    /// N for any conflict
    ForcedN,
}

impl From<ConflictResolutionArg> for ConflictResolution {
    fn from(arg: ConflictResolutionArg) -> Self {
        match arg {
            ConflictResolutionArg::Vote => ConflictResolution::Vote,
            ConflictResolutionArg::Iupac => ConflictResolution::Iupac,
            ConflictResolutionArg::ForcedN => ConflictResolution::ForcedN,
        }
    }
}

/// Handling of reads with non-specific matches as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NonSpecificArg {
    /// Ignore every non-specific read
    IgnoreReads,
    /// Ignore non-specific reads spanning at least --min-ignore-read-length bases
    IgnoreRegions,
    /// Keep non-specific reads
    Keep,
}

impl From<NonSpecificArg> for NonSpecificMatches {
    fn from(arg: NonSpecificArg) -> Self {
        match arg {
            NonSpecificArg::IgnoreReads => NonSpecificMatches::IgnoreReads,
            NonSpecificArg::IgnoreRegions => NonSpecificMatches::IgnoreRegions,
            NonSpecificArg::Keep => NonSpecificMatches::Keep,
        }
    }
}

/// Options controlling how the consensus is called.
#[derive(Debug, Clone, Args)]
pub struct ConsensusCallingOptions {
    /// Minimum coverage; positions below it are called N and reported as low coverage
    #[arg(short = 'M', long = "min-coverage", default_value = "50")]
    pub min_coverage: u32,

    /// Minimum fraction of the coverage for a symbol to be considered
    #[arg(short = 'f', long = "min-frequency", default_value = "0.05")]
    pub min_frequency: f64,

    /// How to resolve positions with more than one candidate symbol
    #[arg(short = 'c', long = "conflict-resolution", value_enum, default_value = "vote")]
    pub conflict_resolution: ConflictResolutionArg,

    /// Annotate conflicts with their candidate symbols and frequencies
    #[arg(long = "add-conflict-annotations", default_value = "true", action = ArgAction::Set)]
    pub add_conflict_annotations: bool,

    /// Extend the consensus beyond the reference using unaligned read ends
    #[arg(short = 'e', long = "extend-start-end", default_value = "false")]
    pub extend_start_end: bool,

    /// Minimum support of a single symbol for extending the consensus
    #[arg(long = "min-coverage-extend", default_value = "20")]
    pub min_coverage_extend: u32,

    /// Detect breakpoints and patch the unsure region by local reassembly
    #[arg(long = "indel-resolution", default_value = "false")]
    pub indel_resolution: bool,

    /// Fraction of reads with long unaligned ends that marks a breakpoint
    #[arg(long = "min-breakpoint-frequency", default_value = "0.25")]
    pub min_breakpoint_frequency: f64,

    /// Ignore bases with low quality or in low quality regions
    #[arg(short = 'q', long = "quality-filter", default_value = "false")]
    pub quality_filter: bool,

    /// Radius of the region averaged by the quality filter
    #[arg(long = "quality-radius", default_value = "5")]
    pub quality_radius: usize,

    /// Minimum quality of a base accepted by the quality filter
    #[arg(long = "min-central-quality", default_value = "20")]
    pub min_central_quality: u8,

    /// Minimum mean quality of the region around a base accepted by the quality filter
    #[arg(long = "min-region-quality", default_value = "15")]
    pub min_region_quality: u8,

    /// How to treat reads with non-specific matches (mapping quality 0)
    #[arg(long = "non-specific-matches", value_enum, default_value = "ignore-reads")]
    pub non_specific_matches: NonSpecificArg,

    /// Aligned length from which non-specific reads are ignored in ignore-regions mode
    #[arg(long = "min-ignore-read-length", default_value = "20")]
    pub min_ignore_read_length: usize,

    /// Ignore reads whose mate is unmapped or mapped to another reference
    #[arg(long = "ignore-broken-pairs", default_value = "true", action = ArgAction::Set)]
    pub ignore_broken_pairs: bool,
}

impl Default for ConsensusCallingOptions {
    fn default() -> Self {
        Self {
            min_coverage: 50,
            min_frequency: 0.05,
            conflict_resolution: ConflictResolutionArg::Vote,
            add_conflict_annotations: true,
            extend_start_end: false,
            min_coverage_extend: 20,
            indel_resolution: false,
            min_breakpoint_frequency: 0.25,
            quality_filter: false,
            quality_radius: 5,
            min_central_quality: 20,
            min_region_quality: 15,
            non_specific_matches: NonSpecificArg::IgnoreReads,
            min_ignore_read_length: 20,
            ignore_broken_pairs: true,
        }
    }
}

impl ConsensusCallingOptions {
    /// Builds the engine options; range checks happen in [`ConsensusOptions::validate`].
    #[must_use]
    pub fn to_consensus_options(&self) -> ConsensusOptions {
        ConsensusOptions {
            min_coverage: self.min_coverage,
            min_frequency: self.min_frequency,
            conflict_resolution: self.conflict_resolution.into(),
            add_conflict_annotations: self.add_conflict_annotations,
            extend_start_end: self.extend_start_end,
            min_coverage_extend: self.min_coverage_extend,
            indel_resolution: self.indel_resolution,
            min_breakpoint_frequency: self.min_breakpoint_frequency,
            quality_filter: self.quality_filter.then_some(QualityFilterOptions {
                radius: self.quality_radius,
                min_central_quality: self.min_central_quality,
                min_region_quality: self.min_region_quality,
            }),
            non_specific_matches: self.non_specific_matches.into(),
            min_ignore_read_length: self.min_ignore_read_length,
            ignore_broken_pairs: self.ignore_broken_pairs,
        }
    }
}

/// External programs used for indel resolution.
#[derive(Debug, Clone, Args)]
pub struct IndelResolutionOptions {
    /// Assembler command line; {reads} is replaced by the reads FASTA and {output} by the
    /// output directory
    #[arg(long = "assembler", default_value = "spades.py --careful -s {reads} -o {output}")]
    pub assembler: String,

    /// Contigs file written by the assembler, relative to its output directory
    #[arg(long = "assembler-contigs", default_value = "contigs.fasta")]
    pub assembler_contigs: PathBuf,

    /// blastn executable used to place contigs against the consensus
    #[arg(long = "blastn", default_value = "blastn")]
    pub blastn: String,
}

impl Default for IndelResolutionOptions {
    fn default() -> Self {
        Self {
            assembler: "spades.py --careful -s {reads} -o {output}".to_string(),
            assembler_contigs: PathBuf::from("contigs.fasta"),
            blastn: "blastn".to_string(),
        }
    }
}

/// Reference selection.
#[derive(Debug, Clone, Default, Args)]
pub struct ReferenceOptions {
    /// Reference sequences that are circular (may be given multiple times)
    #[arg(long = "circular", num_args = 1..)]
    pub circular: Vec<String>,

    /// Only call consensus for these reference sequences (may be given multiple times)
    #[arg(short = 'r', long = "reference", num_args = 1..)]
    pub references: Vec<String>,
}

/// Threading options.
#[derive(Debug, Clone, Args)]
pub struct ThreadingOptions {
    /// Number of reference sequences processed in parallel
    #[arg(short = 't', long = "threads", default_value = "1")]
    pub threads: usize,
}

impl Default for ThreadingOptions {
    fn default() -> Self {
        Self { threads: 1 }
    }
}

impl ThreadingOptions {
    /// Validates the thread count.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread count is zero.
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_positive(self.threads, "threads")?;
        Ok(())
    }
}
