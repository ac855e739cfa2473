//! Call consensus sequences from reads mapped against reference sequences.
//!
//! Every reference sequence of the input BAM yields one consensus record in the output
//! FASTA, named after the reference with a `_cons` suffix. References are processed in
//! parallel; output order follows the BAM header.

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{debug, info, warn};
use rayon::prelude::*;

use mapcons_consensus::{
    CancellationToken, ConsensusResult, ConsensusRun, PatchServices, ProgressTracker, ReadMapping,
};
use mapcons_lib::bam_io::{LoadOptions, load_mappings};
use mapcons_lib::external::{BlastnSearch, CommandAssembler};
use mapcons_lib::logging::{OperationTimer, log_run_summary};
use mapcons_lib::output::{FeatureRow, write_features, write_fasta};
use mapcons_lib::report::{coverage_metric, fragment_metric, problematic_sequences};
use mapcons_metrics::{CoverageMetric, FragmentMetric, write_metrics_auto};

use crate::commands::command::Command;
use crate::commands::common::{
    ConsensusCallingOptions, IndelResolutionOptions, InputOutputOptions, ReferenceOptions,
    ReportOptions, ThreadingOptions,
};

/// Call a consensus sequence for every reference in a BAM file.
#[derive(Debug, Parser)]
#[command(
    name = "consensus",
    about = "\x1b[38;5;166m[CONSENSUS]\x1b[0m      \x1b[36mCall consensus sequences from mapped reads\x1b[0m",
    long_about = r#"
Call a consensus sequence for every reference sequence of a BAM file.

Reads are piled up position by position. At each position symbols seen in more than
--min-frequency of the reads are candidates; a single candidate is called directly and
several are resolved with --conflict-resolution:

  vote       the most frequent candidate
  iupac      the IUPAC code covering all candidates (a gap candidate is dropped)
  forced-n   N

Positions covered by fewer than --min-coverage reads are called N and listed as low
coverage regions.

With --extend-start-end the consensus is extended past the ends of the reference using
the unaligned ends of reads. With --indel-resolution breakpoints are detected from reads
with long unaligned ends; the region between the outermost breakpoints is reassembled
with --assembler and patched into the consensus using --blastn.

Outputs:
  - FASTA with one <reference>_cons record per reference (--output)
  - Optional feature table (--features)
  - Optional coverage and fragment metrics (--coverage-metrics, --fragment-metrics)
"#
)]
pub struct Consensus {
    #[command(flatten)]
    pub io: InputOutputOptions,

    #[command(flatten)]
    pub report: ReportOptions,

    #[command(flatten)]
    pub calling: ConsensusCallingOptions,

    #[command(flatten)]
    pub indel: IndelResolutionOptions,

    #[command(flatten)]
    pub references: ReferenceOptions,

    #[command(flatten)]
    pub threading: ThreadingOptions,
}

impl Command for Consensus {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.io.validate()?;
        self.report.validate()?;
        self.threading.validate()?;
        debug!("Command line: {command_line}");

        let run = ConsensusRun::new(self.calling.to_consensus_options())
            .context("Invalid consensus options")?;

        info!("Starting Consensus");
        info!("Input: {}", self.io.input.display());
        info!("Output: {}", self.io.output.display());
        info!("Minimum coverage: {}", self.calling.min_coverage);
        info!("Conflict resolution: {:?}", self.calling.conflict_resolution);
        info!("Threads: {}", self.threading.threads);

        let load_options = LoadOptions {
            circular: self.references.circular.clone(),
            references: self.references.references.clone(),
        };
        let mappings = load_mappings(&self.io.input, &load_options)?;
        if mappings.is_empty() {
            bail!("No reference sequences found in {}", self.io.input.display());
        }

        let assembler;
        let search;
        let services = if self.calling.indel_resolution {
            assembler =
                CommandAssembler::from_command_line(&self.indel.assembler, &self.indel.assembler_contigs)?;
            search = BlastnSearch::new(&self.indel.blastn);
            Some(PatchServices { assembler: &assembler, search: &search })
        } else {
            None
        };

        let timer = OperationTimer::new("Calling consensus");
        let token = CancellationToken::new();
        let progress = ProgressTracker::new("Processed references").with_interval(100);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threading.threads)
            .build()
            .context("Failed to build thread pool")?;

        let results: Vec<ConsensusResult> = pool.install(|| {
            mappings
                .par_iter()
                .map(|mapping| {
                    let result = run
                        .run(mapping, services, &token)
                        .with_context(|| format!("Failed to call consensus for {}", mapping.name()));
                    if result.is_err() {
                        token.cancel();
                    }
                    progress.log_if_needed(1);
                    result
                })
                .collect::<Result<Vec<_>>>()
        })?;
        progress.log_final();

        write_fasta(&self.io.output, results.iter().map(|result| &result.consensus))?;

        if let Some(path) = &self.report.features {
            let rows: Vec<FeatureRow> = results
                .iter()
                .flat_map(|result| FeatureRow::from_sequence(&result.consensus))
                .collect();
            write_features(path, &rows)?;
        }

        let coverage: Vec<CoverageMetric> = mappings
            .iter()
            .zip(&results)
            .map(|(mapping, result)| coverage_metric(mapping.name(), result))
            .collect();
        let fragments: Vec<FragmentMetric> = mappings
            .iter()
            .zip(&results)
            .map(|(mapping, result)| fragment_metric(mapping.name(), result))
            .collect();
        if let Some(path) = &self.report.coverage_metrics {
            write_metrics_auto(path, &coverage)?;
        }
        if let Some(path) = &self.report.fragment_metrics {
            write_metrics_auto(path, &fragments)?;
        }

        log_run_summary(&fragments, &coverage);
        let problematic = problematic_sequences(&results);
        if !problematic.is_empty() {
            warn!("Consensus sequences containing N: {}", problematic.join(", "));
        }
        timer.log_completion(results.len() as u64);
        Ok(())
    }
}
