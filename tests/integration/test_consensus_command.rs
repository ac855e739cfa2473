//! End-to-end CLI tests for the consensus command.
//!
//! These tests run the actual `mapcons consensus` binary and validate:
//! 1. Consensus FASTA output for well covered references
//! 2. Conflict resolution policies
//! 3. Low coverage handling and metrics output
//! 4. Reference selection and parallel processing

use std::path::{Path, PathBuf};
use std::process::Command;

use fgoxide::io::DelimFile;
use mapcons_lib::output::FeatureRow;
use mapcons_metrics::{CoverageMetric, FragmentMetric};
use noodles::sam::alignment::record_buf::RecordBuf;
use rstest::rstest;
use tempfile::TempDir;

use crate::helpers::bam_generator::{
    create_header, create_read_stack, read_fasta, write_bam,
};

const CHRM: &str = "ACGTTGCAACGTAGCTAGCTTACGGATCCATGCAAGTCGA";
const CHRM_VARIANT: &str = "ACGTTGTAACGTAGCTAGCTTACGGATCCATGCAAGTCGA";
const PLASMID: &str = "GATTACAGATTACACCGGTTAACCGGTTAA";

fn write_input(dir: &Path, records: &[RecordBuf]) -> PathBuf {
    let header = create_header(&[("chrM", CHRM.len()), ("plasmid", PLASMID.len())]);
    let path = dir.join("input.bam");
    write_bam(&path, &header, records);
    path
}

fn run_consensus(input: &Path, output: &Path, extra: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_mapcons"))
        .args(["consensus", "--input", input.to_str().unwrap(), "--output", output.to_str().unwrap()])
        .args(extra)
        .output()
        .expect("Failed to run consensus command")
}

fn assert_success(output: &std::process::Output) {
    assert!(
        output.status.success(),
        "consensus command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_consensus_command_basic() {
    let temp_dir = TempDir::new().unwrap();
    let mut records = create_read_stack("m", 60, 0, 1, CHRM);
    records.extend(create_read_stack("p", 60, 1, 1, PLASMID));
    let input = write_input(temp_dir.path(), &records);
    let output = temp_dir.path().join("consensus.fa");

    assert_success(&run_consensus(&input, &output, &[]));

    let sequences = read_fasta(&output);
    assert_eq!(
        sequences,
        vec![
            ("chrM_cons".to_string(), CHRM.to_string()),
            ("plasmid_cons".to_string(), PLASMID.to_string()),
        ]
    );
}

#[rstest]
#[case("vote", "ACGTTGCAACGTAGCTAGCTTACGGATCCATGCAAGTCGA")]
#[case("iupac", "ACGTTGYAACGTAGCTAGCTTACGGATCCATGCAAGTCGA")]
#[case("forced-n", "ACGTTGNAACGTAGCTAGCTTACGGATCCATGCAAGTCGA")]
fn test_consensus_command_conflict_resolution(#[case] policy: &str, #[case] expected: &str) {
    let temp_dir = TempDir::new().unwrap();
    let mut records = create_read_stack("ref", 40, 0, 1, CHRM);
    records.extend(create_read_stack("alt", 20, 0, 1, CHRM_VARIANT));
    let input = write_input(temp_dir.path(), &records);
    let output = temp_dir.path().join("consensus.fa");

    assert_success(&run_consensus(
        &input,
        &output,
        &["--conflict-resolution", policy, "--reference", "chrM"],
    ));

    let sequences = read_fasta(&output);
    assert_eq!(sequences.len(), 1);
    assert_eq!(sequences[0].1, expected);
}

#[test]
fn test_consensus_command_features() {
    let temp_dir = TempDir::new().unwrap();
    let mut records = create_read_stack("ref", 40, 0, 1, CHRM);
    records.extend(create_read_stack("alt", 20, 0, 1, CHRM_VARIANT));
    let input = write_input(temp_dir.path(), &records);
    let output = temp_dir.path().join("consensus.fa");
    let features = temp_dir.path().join("features.tsv");

    assert_success(&run_consensus(
        &input,
        &output,
        &["--reference", "chrM", "--features", features.to_str().unwrap()],
    ));

    let rows: Vec<FeatureRow> = DelimFile::default().read_tsv(&features).unwrap();
    let conflict = rows.iter().find(|row| row.kind == "conflict").expect("conflict feature");
    assert_eq!(conflict.sequence, "chrM_cons");
    assert_eq!(conflict.start, 7);
    assert_eq!(conflict.end, 7);
    assert!(!rows.iter().any(|row| row.kind == "failure"));
}

#[test]
fn test_consensus_command_low_coverage() {
    let temp_dir = TempDir::new().unwrap();
    let mut records = create_read_stack("m", 10, 0, 1, CHRM);
    records.extend(create_read_stack("p", 60, 1, 1, PLASMID));
    let input = write_input(temp_dir.path(), &records);
    let output = temp_dir.path().join("consensus.fa");
    let coverage = temp_dir.path().join("coverage.tsv");
    let fragments = temp_dir.path().join("fragments.tsv");

    assert_success(&run_consensus(
        &input,
        &output,
        &[
            "--coverage-metrics",
            coverage.to_str().unwrap(),
            "--fragment-metrics",
            fragments.to_str().unwrap(),
        ],
    ));

    let sequences = read_fasta(&output);
    assert_eq!(sequences[0].1, "N".repeat(CHRM.len()));
    assert_eq!(sequences[1].1, PLASMID);

    let coverage: Vec<CoverageMetric> = DelimFile::default().read_tsv(&coverage).unwrap();
    assert_eq!(coverage.len(), 2);
    assert_eq!(coverage[0].reference, "chrM");
    assert_eq!(coverage[0].min_coverage, 10);
    assert_eq!(coverage[0].low_coverage_regions, "1..40");
    assert_eq!(coverage[1].min_coverage, 60);
    assert_eq!(coverage[1].low_coverage_regions, "-");

    let fragments: Vec<FragmentMetric> = DelimFile::default().read_tsv(&fragments).unwrap();
    assert_eq!(fragments[0].consensus, "chrM_cons");
    assert_eq!(fragments[0].ambiguous_positions, CHRM.len());
    assert_eq!(fragments[0].problematic_regions, "Yes");
    assert_eq!(fragments[0].extension_left, "-");
    assert_eq!(fragments[1].ambiguous_positions, 0);
    assert_eq!(fragments[1].problematic_regions, "No");
}

#[test]
fn test_consensus_command_min_coverage_option() {
    let temp_dir = TempDir::new().unwrap();
    let records = create_read_stack("m", 10, 0, 1, CHRM);
    let input = write_input(temp_dir.path(), &records);
    let output = temp_dir.path().join("consensus.fa");

    assert_success(&run_consensus(&input, &output, &["--min-coverage", "5", "--reference", "chrM"]));

    assert_eq!(read_fasta(&output), vec![("chrM_cons".to_string(), CHRM.to_string())]);
}

#[test]
fn test_consensus_command_threads_keep_header_order() {
    let temp_dir = TempDir::new().unwrap();
    let mut records = create_read_stack("m", 60, 0, 1, CHRM);
    records.extend(create_read_stack("p", 60, 1, 1, PLASMID));
    let input = write_input(temp_dir.path(), &records);
    let output = temp_dir.path().join("consensus.fa");

    assert_success(&run_consensus(&input, &output, &["--threads", "2"]));

    let names: Vec<String> = read_fasta(&output).into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["chrM_cons", "plasmid_cons"]);
}

#[test]
fn test_consensus_command_partial_coverage() {
    let temp_dir = TempDir::new().unwrap();
    // reads cover positions 11..=40 only
    let records = create_read_stack("m", 60, 0, 11, &CHRM[10..]);
    let input = write_input(temp_dir.path(), &records);
    let output = temp_dir.path().join("consensus.fa");

    assert_success(&run_consensus(&input, &output, &["--reference", "chrM"]));

    let sequences = read_fasta(&output);
    assert_eq!(sequences[0].1, format!("{}{}", "N".repeat(10), &CHRM[10..]));
}
