#![deny(unsafe_code)]
// Clippy lint configuration for CI
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::needless_pass_by_value,
    clippy::items_after_statements,
    clippy::too_many_lines,
    clippy::redundant_closure_for_method_calls,
    clippy::struct_excessive_bools,
    clippy::uninlined_format_args
)]

//! # mapcons - consensus calling from mapped reads
//!
//! The consensus engine itself lives in the `mapcons-consensus` crate. This library holds
//! the file-facing side of the tool:
//!
//! - **[`bam_io`]** - Loading read mappings from BAM files
//! - **[`output`]** - FASTA and feature table output
//! - **[`external`]** - Assembler and local search backed by external programs
//! - **[`report`]** - Coverage and fragment metric rows
//! - **[`validation`]** - Input validation utilities for parameters and files
//! - **[`logging`]** - Formatting helpers and run summaries
//!
//! ## Quick Start
//!
//! ```no_run
//! use mapcons_consensus::{CancellationToken, ConsensusOptions, ConsensusRun};
//! use mapcons_lib::bam_io::{LoadOptions, load_mappings};
//! use mapcons_lib::output::write_fasta;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mappings = load_mappings("mapped.bam", &LoadOptions::default())?;
//! let run = ConsensusRun::new(ConsensusOptions::default())?;
//! let token = CancellationToken::new();
//!
//! let mut sequences = Vec::new();
//! for mapping in &mappings {
//!     sequences.push(run.run(mapping, None, &token)?.consensus);
//! }
//! write_fasta("consensus.fa", &sequences)?;
//! # Ok(())
//! # }
//! ```

pub mod bam_io;
pub mod errors;
pub mod external;
pub mod logging;
pub mod output;
pub mod report;
pub mod validation;
