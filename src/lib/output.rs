//! Writing consensus sequences and their features.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use fgoxide::io::DelimFile;
use noodles::fasta;
use noodles::fasta::record::{Definition, Sequence};
use serde::{Deserialize, Serialize};

use mapcons_consensus::{ConsensusSequence, Feature, FeatureKind};

/// Writes consensus sequences to a FASTA file, one record per sequence.
///
/// # Errors
/// Returns an error if the file cannot be created or written to
pub fn write_fasta<'a, P, I>(path: P, sequences: I) -> Result<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a ConsensusSequence>,
{
    let path_ref = path.as_ref();
    let file = File::create(path_ref)
        .with_context(|| format!("Failed to create output FASTA: {}", path_ref.display()))?;
    let mut writer = fasta::io::Writer::new(BufWriter::new(file));
    for sequence in sequences {
        let record = fasta::Record::new(
            Definition::new(sequence.name(), None),
            Sequence::from(sequence.symbols().to_vec()),
        );
        writer
            .write_record(&record)
            .with_context(|| format!("Failed to write {} to: {}", sequence.name(), path_ref.display()))?;
    }
    writer
        .get_mut()
        .flush()
        .with_context(|| format!("Failed to flush output FASTA: {}", path_ref.display()))
}

/// One feature of a consensus sequence as written to the features file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Name of the consensus sequence
    pub sequence: String,
    /// `conflict` or `failure`
    pub kind: String,
    /// Feature name, e.g. `Low Coverage`
    pub name: String,
    /// First position (1-based)
    pub start: usize,
    /// Last position (1-based, inclusive)
    pub end: usize,
    /// Intervals covered, e.g. `41..45` or `12^13`
    pub location: String,
    /// `key=value` annotations separated by `;`
    pub annotations: String,
}

impl FeatureRow {
    #[must_use]
    pub fn new(sequence: &str, feature: &Feature) -> Self {
        let kind = match feature.kind() {
            FeatureKind::Conflict => "conflict",
            FeatureKind::Failures => "failure",
        };
        let annotations = feature
            .annotations()
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(";");
        Self {
            sequence: sequence.to_string(),
            kind: kind.to_string(),
            name: feature.name().to_string(),
            start: feature.region().start() + 1,
            end: feature.region().end(),
            location: feature.region().to_string(),
            annotations,
        }
    }

    /// Rows for every feature of `sequence`, sorted by start.
    #[must_use]
    pub fn from_sequence(sequence: &ConsensusSequence) -> Vec<Self> {
        let mut rows: Vec<Self> =
            sequence.features().iter().map(|feature| Self::new(sequence.name(), feature)).collect();
        rows.sort_by_key(|row| row.start);
        rows
    }
}

/// Writes feature rows to a TSV file.
///
/// # Errors
/// Returns an error if the file cannot be created or written to
pub fn write_features<P: AsRef<Path>>(path: P, rows: &[FeatureRow]) -> Result<()> {
    let path_ref = path.as_ref();
    DelimFile::default()
        .write_tsv(&path_ref, rows)
        .with_context(|| format!("Failed to write features: {}", path_ref.display()))
}
