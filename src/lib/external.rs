//! External assembly and local search programs used to patch unsure regions.
//!
//! Both services run a command line in a temporary directory: the inputs are written as
//! FASTA files, the program is run to completion and its output is parsed back.

use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result, bail};
use log::debug;
use noodles::fasta;
use noodles::fasta::record::{Definition, Sequence};
use tempfile::TempDir;

use mapcons_consensus::{Assembler, Contig, LocalSearch, ReadCollection, SearchHit};

use crate::errors::MapconsError;

/// Placeholder replaced by the path of the FASTA file holding the reads.
pub const READS_PLACEHOLDER: &str = "{reads}";

/// Placeholder replaced by the assembler's output directory.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Runs `program` and fails unless it exits successfully.
fn run_program(command: &mut Command, program: &str) -> Result<Output> {
    debug!("Running {command:?}");
    let output = command.output().map_err(|e| match e.kind() {
        ErrorKind::NotFound => anyhow::Error::new(MapconsError::ProgramUnavailable {
            program: program.to_string(),
            reason: e.to_string(),
        }),
        _ => anyhow::Error::new(e).context(format!("Failed to execute {program}")),
    })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{} failed with exit code {:?}. Error: {}", program, output.status.code(), stderr.trim());
    }
    Ok(output)
}

/// Writes `(name, bases)` records to a FASTA file.
fn write_fasta_records<'a>(path: &Path, records: impl IntoIterator<Item = (String, &'a [u8])>) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = fasta::io::Writer::new(BufWriter::new(file));
    for (name, bases) in records {
        let record = fasta::Record::new(Definition::new(name, None), Sequence::from(bases.to_vec()));
        writer.write_record(&record).with_context(|| format!("Failed to write {}", path.display()))?;
    }
    writer.get_mut().flush().with_context(|| format!("Failed to flush {}", path.display()))
}

/// Reads every record of a FASTA file as a contig.
fn read_contigs(path: &Path) -> Result<Vec<Contig>> {
    let mut reader = fasta::io::reader::Builder
        .build_from_path(path)
        .with_context(|| format!("Failed to open contigs: {}", path.display()))?;
    let mut contigs = Vec::new();
    for result in reader.records() {
        let record = result.with_context(|| format!("Failed to read contigs: {}", path.display()))?;
        let name = std::str::from_utf8(record.name()).with_context(|| "Invalid contig name")?.to_string();
        contigs.push(Contig { name, sequence: record.sequence().as_ref().to_vec() });
    }
    Ok(contigs)
}

/// Reads laid out as FASTA records; pairs get `/1` and `/2` suffixes.
fn read_records(reads: &ReadCollection) -> Vec<(String, &[u8])> {
    let pairs = reads.pairs.iter().enumerate().flat_map(|(i, (first, second))| {
        [(format!("pair{i}/1"), first.as_slice()), (format!("pair{i}/2"), second.as_slice())]
    });
    let singles = reads.singles.iter().enumerate().map(|(i, read)| (format!("single{i}"), read.as_slice()));
    pairs.chain(singles).collect()
}

/// An assembler run as an external command line.
///
/// `{reads}` in the arguments is replaced by the reads FASTA and `{output}` by an empty
/// output directory; contigs are read from `contigs` inside that directory. A missing
/// contigs file means no contigs.
#[derive(Debug, Clone)]
pub struct CommandAssembler {
    program: String,
    args: Vec<String>,
    contigs: PathBuf,
}

impl CommandAssembler {
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>, contigs: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args, contigs: contigs.into() }
    }

    /// Parses a whitespace-separated command line such as
    /// `spades.py --careful -s {reads} -o {output}`.
    ///
    /// # Errors
    /// Returns an error if the command line is empty
    pub fn from_command_line(command_line: &str, contigs: impl Into<PathBuf>) -> Result<Self> {
        let mut words = command_line.split_whitespace().map(ToString::to_string);
        let Some(program) = words.next() else {
            return Err(MapconsError::InvalidParameter {
                parameter: "assembler".to_string(),
                reason: "command line is empty".to_string(),
            }
            .into());
        };
        Ok(Self::new(program, words.collect(), contigs))
    }

    fn arguments(&self, reads: &Path, output: &Path) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace(READS_PLACEHOLDER, &reads.to_string_lossy())
                    .replace(OUTPUT_PLACEHOLDER, &output.to_string_lossy())
            })
            .collect()
    }
}

impl Assembler for CommandAssembler {
    fn assemble(&self, reads: &ReadCollection) -> Result<Vec<Contig>> {
        let dir = TempDir::new().context("Failed to create assembly directory")?;
        let reads_path = dir.path().join("reads.fa");
        let output = dir.path().join("assembly");
        write_fasta_records(&reads_path, read_records(reads))?;

        let mut command = Command::new(&self.program);
        command.args(self.arguments(&reads_path, &output));
        run_program(&mut command, &self.program)?;

        let contigs_path = output.join(&self.contigs);
        if !contigs_path.exists() {
            debug!("{} produced no contigs", self.program);
            return Ok(Vec::new());
        }
        read_contigs(&contigs_path)
    }
}

/// Local search with NCBI `blastn` against the contigs.
#[derive(Debug, Clone)]
pub struct BlastnSearch {
    program: String,
}

impl Default for BlastnSearch {
    fn default() -> Self {
        Self { program: "blastn".to_string() }
    }
}

/// Tabular output columns requested from blastn.
pub const BLAST_OUTPUT_FORMAT: &str = "6 qstart qend nident length sseq";

impl BlastnSearch {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

impl LocalSearch for BlastnSearch {
    fn search(&self, query: &[u8], subjects: &[Contig]) -> Result<Option<SearchHit>> {
        if subjects.is_empty() {
            return Ok(None);
        }
        let dir = TempDir::new().context("Failed to create search directory")?;
        let query_path = dir.path().join("query.fa");
        let subject_path = dir.path().join("subjects.fa");
        write_fasta_records(&query_path, [("consensus".to_string(), query)])?;
        write_fasta_records(
            &subject_path,
            subjects.iter().map(|contig| (contig.name.clone(), contig.sequence.as_slice())),
        )?;

        let mut command = Command::new(&self.program);
        command
            .arg("-query")
            .arg(&query_path)
            .arg("-subject")
            .arg(&subject_path)
            .args(["-word_size", "13", "-evalue", "1.0", "-max_target_seqs", "1"])
            .args(["-outfmt", BLAST_OUTPUT_FORMAT]);
        let output = run_program(&mut command, &self.program)?;
        parse_tabular_hit(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parses the first line of blastn tabular output in [`BLAST_OUTPUT_FORMAT`].
///
/// # Errors
/// Returns an error if the line does not have the expected columns
pub fn parse_tabular_hit(text: &str) -> Result<Option<SearchHit>> {
    let Some(line) = text.lines().map(str::trim).find(|line| !line.is_empty() && !line.starts_with('#'))
    else {
        return Ok(None);
    };
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 5 {
        bail!("Expected 5 columns in search output, found {}: {line}", fields.len());
    }
    let number = |i: usize| -> Result<usize> {
        fields[i].parse().with_context(|| format!("Invalid number '{}' in search output", fields[i]))
    };
    let (qstart, qend) = (number(0)?, number(1)?);
    if qstart == 0 || qend < qstart {
        bail!("Invalid query span {qstart}..{qend} in search output");
    }
    Ok(Some(SearchHit {
        query_start: qstart - 1,
        query_end: qend,
        identity: number(2)?,
        align_len: number(3)?,
        subject_aligned: fields[4].as_bytes().to_vec(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tabular_hit() {
        let hit = parse_tabular_hit("101\t160\t58\t61\tACGT-ACGT\n102\t150\t40\t49\tAC\n").unwrap().unwrap();
        assert_eq!((hit.query_start, hit.query_end), (100, 160));
        assert_eq!(hit.identity, 58);
        assert_eq!(hit.align_len, 61);
        assert_eq!(hit.mismatches(), 3);
        assert_eq!(hit.subject_aligned, b"ACGT-ACGT");
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_tabular_hit("").unwrap().is_none());
        assert!(parse_tabular_hit("# BLASTN 2.14.0+\n\n").unwrap().is_none());
    }

    #[test]
    fn test_parse_malformed_output() {
        assert!(parse_tabular_hit("1\t2\t3\n").is_err());
        assert!(parse_tabular_hit("x\t2\t3\t4\tA\n").is_err());
        assert!(parse_tabular_hit("9\t2\t3\t4\tA\n").is_err());
    }

    #[test]
    fn test_assembler_arguments() {
        let assembler =
            CommandAssembler::from_command_line("spades.py --careful -s {reads} -o {output}", "contigs.fasta")
                .unwrap();
        let args = assembler.arguments(Path::new("/tmp/x/reads.fa"), Path::new("/tmp/x/assembly"));
        assert_eq!(args, vec!["--careful", "-s", "/tmp/x/reads.fa", "-o", "/tmp/x/assembly"]);
        assert!(CommandAssembler::from_command_line("   ", "contigs.fasta").is_err());
    }

    #[test]
    fn test_read_records_names() {
        let reads = ReadCollection {
            pairs: vec![(b"AC".to_vec(), b"GT".to_vec())],
            singles: vec![b"TTT".to_vec()],
        };
        let names: Vec<String> = read_records(&reads).into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["pair0/1", "pair0/2", "single0"]);
    }

    #[test]
    fn test_missing_program() {
        let assembler = CommandAssembler::new("mapcons-no-such-assembler", Vec::new(), "contigs.fasta");
        let reads = ReadCollection { pairs: Vec::new(), singles: vec![b"ACGT".to_vec()] };
        let error = assembler.assemble(&reads).unwrap_err();
        assert!(error.downcast_ref::<MapconsError>().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_assembler_reads_contigs() {
        // `sh -c` copies the reads into the output directory as the contigs
        let assembler = CommandAssembler::new(
            "sh",
            vec!["-c".to_string(), "mkdir -p {output} && cp {reads} {output}/contigs.fasta".to_string()],
            "contigs.fasta",
        );
        let reads = ReadCollection { pairs: Vec::new(), singles: vec![b"ACGTACGT".to_vec()] };
        let contigs = assembler.assemble(&reads).unwrap();
        assert_eq!(contigs, vec![Contig { name: "single0".to_string(), sequence: b"ACGTACGT".to_vec() }]);
    }

    #[test]
    fn test_blastn_without_subjects() {
        let search = BlastnSearch::new("mapcons-no-such-blastn");
        assert!(search.search(b"ACGT", &[]).unwrap().is_none());
    }
}
