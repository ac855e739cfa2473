//! Integration tests for the mapcons binary.
//!
//! These tests write small BAM files, run the `mapcons` executable on them and check
//! the FASTA and tabular outputs.

mod helpers;
mod test_consensus_command;
mod test_error_paths;
