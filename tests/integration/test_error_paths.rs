//! Error path integration tests.
//!
//! These tests verify that invalid inputs and options make the command fail with a
//! useful message instead of writing output.

use std::process::Command;

use tempfile::TempDir;

use crate::helpers::bam_generator::{create_header, create_read_stack, write_bam};

fn consensus_command() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_mapcons"));
    command.arg("consensus");
    command
}

#[test]
fn test_missing_input_fails() {
    let temp_dir = TempDir::new().unwrap();
    let output = consensus_command()
        .args(["--input", "/nonexistent/input.bam"])
        .args(["--output", temp_dir.path().join("out.fa").to_str().unwrap()])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Input BAM"));
}

#[test]
fn test_unknown_reference_fails() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input.bam");
    let header = create_header(&[("chrM", 20)]);
    write_bam(&input, &header, &create_read_stack("m", 5, 0, 1, "ACGTACGTACGTACGTACGT"));
    let fasta = temp_dir.path().join("out.fa");

    let output = consensus_command()
        .args(["--input", input.to_str().unwrap(), "--output", fasta.to_str().unwrap()])
        .args(["--reference", "chrX"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("chrX"));
    assert!(!fasta.exists());
}

#[test]
fn test_invalid_frequency_fails() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input.bam");
    let header = create_header(&[("chrM", 20)]);
    write_bam(&input, &header, &create_read_stack("m", 5, 0, 1, "ACGTACGTACGTACGTACGT"));
    let fasta = temp_dir.path().join("out.fa");

    let output = consensus_command()
        .args(["--input", input.to_str().unwrap(), "--output", fasta.to_str().unwrap()])
        .args(["--min-frequency", "1.5"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("min-frequency"));
}

#[test]
fn test_zero_threads_fails() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("input.bam");
    let header = create_header(&[("chrM", 20)]);
    write_bam(&input, &header, &create_read_stack("m", 5, 0, 1, "ACGTACGTACGTACGTACGT"));

    let output = consensus_command()
        .args(["--input", input.to_str().unwrap()])
        .args(["--output", temp_dir.path().join("out.fa").to_str().unwrap()])
        .args(["--threads", "0"])
        .output()
        .unwrap();

    assert!(!output.status.success());
}
