//! Loading read mappings from BAM files.
//!
//! Every reference sequence of the header becomes one [`InMemoryMapping`]. Primary aligned
//! records become [`AlignedRead`]s; unaligned records whose mate aligned are kept as
//! [`UnalignedMate`]s so they can be handed to the assembler.

use std::fs::File;
use std::path::Path;

use ahash::AHashSet;
use anyhow::{Context, Result};
use log::{debug, warn};
use noodles::bam;
use noodles::sam::Header;
use noodles::sam::alignment::record::Flags;
use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::record_buf::RecordBuf;

use mapcons_consensus::{
    AlignedRead, AlignmentOp, InMemoryMapping, ProgressTracker, Segment, Strand, UnalignedMate,
};
use mapcons_dna::reverse_complement;

use crate::validation::validate_reference_names;

/// Type alias for the BAM reader returned by [`create_bam_reader`].
pub type BamReader = bam::io::Reader<noodles::bgzf::io::Reader<File>>;

/// Which references to load and how to treat them.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// References whose main sequence is circular
    pub circular: Vec<String>,
    /// Restricts loading to these references; all references when empty
    pub references: Vec<String>,
}

/// Opens a BAM file and reads its header.
///
/// # Errors
/// Returns an error if the file cannot be opened or the header cannot be read
pub fn create_bam_reader<P: AsRef<Path>>(path: P) -> Result<(BamReader, Header)> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open input BAM: {}", path_ref.display()))?;
    let mut reader = bam::io::Reader::new(file);
    let header = reader
        .read_header()
        .with_context(|| format!("Failed to read header from: {}", path_ref.display()))?;
    Ok((reader, header))
}

/// Names of the reference sequences in header order.
#[must_use]
pub fn reference_names(header: &Header) -> Vec<String> {
    header.reference_sequences().keys().map(ToString::to_string).collect()
}

/// Reads and unaligned mates collected for one reference.
#[derive(Default)]
struct MappingParts {
    reads: Vec<AlignedRead>,
    unaligned: Vec<UnalignedMate>,
}

/// Loads one [`InMemoryMapping`] per selected reference sequence.
///
/// Secondary and supplementary records are skipped. A mapping quality of 0 marks a read
/// as non-specific; a mate that is unaligned or aligned to another reference marks a broken
/// pair. Records whose alignment cannot be laid out are skipped with a warning.
///
/// # Errors
/// Returns an error if the file cannot be read or a selected reference is missing.
pub fn load_mappings<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Vec<InMemoryMapping>> {
    let path_ref = path.as_ref();
    let (mut reader, header) = create_bam_reader(path_ref)?;
    let names = reference_names(&header);
    validate_reference_names(&options.circular, &names)?;
    validate_reference_names(&options.references, &names)?;

    let selected: AHashSet<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, name)| options.references.is_empty() || options.references.contains(name))
        .map(|(i, _)| i)
        .collect();

    let mut parts: Vec<MappingParts> = names.iter().map(|_| MappingParts::default()).collect();
    let progress = ProgressTracker::new("Loaded records");
    let mut skipped = 0_u64;

    for result in reader.record_bufs(&header) {
        let record = result.with_context(|| format!("Failed to read record from: {}", path_ref.display()))?;
        progress.log_if_needed(1);
        let flags = record.flags();
        if flags.is_secondary() || flags.is_supplementary() {
            continue;
        }

        if flags.is_unmapped() {
            if let Some(id) = unaligned_mate_reference(&record).filter(|id| selected.contains(id)) {
                parts[id].unaligned.push(to_unaligned_mate(&record));
            }
            continue;
        }

        let Some(id) = record.reference_sequence_id().filter(|id| selected.contains(id)) else {
            continue;
        };
        match to_aligned_read(&record, id) {
            Ok(read) => parts[id].reads.push(read),
            Err(e) => {
                skipped += 1;
                warn!("Skipping record {}: {e}", record_name(&record));
            }
        }
    }
    progress.log_final();
    if skipped > 0 {
        warn!("Skipped {skipped} records whose alignment could not be used");
    }

    let mappings = header
        .reference_sequences()
        .iter()
        .zip(parts)
        .enumerate()
        .filter(|(i, _)| selected.contains(i))
        .map(|(_, ((name, reference), parts))| {
            let name = name.to_string();
            let circular = options.circular.contains(&name);
            debug!(
                "{}: {} aligned reads, {} unaligned mates{}",
                name,
                parts.reads.len(),
                parts.unaligned.len(),
                if circular { ", circular" } else { "" }
            );
            InMemoryMapping::new(name, reference.length().get(), circular, parts.reads, parts.unaligned)
        })
        .collect();
    Ok(mappings)
}

fn record_name(record: &RecordBuf) -> String {
    record.name().map(ToString::to_string).unwrap_or_else(|| "*".to_string())
}

fn segment_of(flags: Flags) -> Segment {
    if !flags.is_segmented() {
        Segment::Single
    } else if flags.is_first_segment() {
        Segment::First
    } else if flags.is_last_segment() {
        Segment::Second
    } else {
        Segment::Single
    }
}

/// Reference an unaligned record belongs to: the one its aligned mate is on.
fn unaligned_mate_reference(record: &RecordBuf) -> Option<usize> {
    let flags = record.flags();
    if !flags.is_segmented() || flags.is_mate_unmapped() {
        return None;
    }
    record.mate_reference_sequence_id().or(record.reference_sequence_id())
}

fn to_unaligned_mate(record: &RecordBuf) -> UnalignedMate {
    let bases = record.sequence().as_ref();
    let sequence = if record.flags().is_reverse_complemented() {
        reverse_complement(bases)
    } else {
        bases.to_vec()
    };
    UnalignedMate { name: record_name(record), sequence, segment: segment_of(record.flags()) }
}

fn to_aligned_read(record: &RecordBuf, reference_id: usize) -> Result<AlignedRead> {
    let flags = record.flags();
    let start = record
        .alignment_start()
        .with_context(|| "aligned record without a start position".to_string())?;
    let ops = to_alignment_ops(record);
    let qualities = record.quality_scores().as_ref();
    let qualities = if qualities.is_empty() { None } else { Some(qualities.to_vec()) };
    let strand = if flags.is_reverse_complemented() { Strand::Reverse } else { Strand::Forward };

    let read = AlignedRead::new(
        record_name(record),
        record.sequence().as_ref().to_vec(),
        qualities,
        start.get() as i64 - 1,
        &ops,
        strand,
    )?;

    let non_specific = record.mapping_quality().is_some_and(|mapq| mapq.get() == 0);
    let broken_pair = flags.is_segmented()
        && (flags.is_mate_unmapped() || record.mate_reference_sequence_id() != Some(reference_id));
    Ok(read
        .with_segment(segment_of(flags))
        .with_non_specific(non_specific)
        .with_broken_pair(broken_pair))
}

fn to_alignment_ops(record: &RecordBuf) -> Vec<AlignmentOp> {
    record
        .cigar()
        .as_ref()
        .iter()
        .filter_map(|op| {
            let len = op.len();
            match op.kind() {
                Kind::Match | Kind::SequenceMatch | Kind::SequenceMismatch => Some(AlignmentOp::Match(len)),
                Kind::Insertion => Some(AlignmentOp::Insertion(len)),
                Kind::Deletion => Some(AlignmentOp::Deletion(len)),
                Kind::Skip => Some(AlignmentOp::Skip(len)),
                Kind::SoftClip => Some(AlignmentOp::SoftClip(len)),
                Kind::HardClip => Some(AlignmentOp::HardClip(len)),
                Kind::Pad => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bstr::BString;
    use mapcons_consensus::ReadMapping;
    use noodles::core::Position;
    use noodles::sam::alignment::io::Write as AlignmentWrite;
    use noodles::sam::alignment::record::MappingQuality;
    use noodles::sam::alignment::record::cigar::op::Op;
    use noodles::sam::alignment::record_buf::{Cigar, QualityScores, Sequence};
    use noodles::sam::header::record::value::{Map, map::ReferenceSequence};
    use std::num::NonZeroUsize;
    use tempfile::TempDir;

    fn header() -> Header {
        Header::builder()
            .add_reference_sequence(
                BString::from("chrM"),
                Map::<ReferenceSequence>::new(NonZeroUsize::new(100).unwrap()),
            )
            .add_reference_sequence(
                BString::from("plasmid"),
                Map::<ReferenceSequence>::new(NonZeroUsize::new(50).unwrap()),
            )
            .build()
    }

    struct Spec<'a> {
        name: &'a str,
        flags: Flags,
        reference: Option<usize>,
        start: usize,
        mapq: u8,
        cigar: Vec<Op>,
        bases: &'a [u8],
        mate_reference: Option<usize>,
    }

    fn record(spec: Spec<'_>) -> RecordBuf {
        let mut builder = RecordBuf::builder()
            .set_name(BString::from(spec.name))
            .set_flags(spec.flags)
            .set_cigar(Cigar::from(spec.cigar))
            .set_sequence(Sequence::from(spec.bases.to_vec()))
            .set_quality_scores(QualityScores::from(vec![30; spec.bases.len()]));
        if let Some(id) = spec.reference {
            builder = builder
                .set_reference_sequence_id(id)
                .set_alignment_start(Position::try_from(spec.start).unwrap());
        }
        if let Some(mapq) = MappingQuality::new(spec.mapq) {
            builder = builder.set_mapping_quality(mapq);
        }
        if let Some(id) = spec.mate_reference {
            builder = builder
                .set_mate_reference_sequence_id(id)
                .set_mate_alignment_start(Position::try_from(1).unwrap());
        }
        builder.build()
    }

    fn write_bam(path: &Path, records: &[RecordBuf]) {
        let header = header();
        let mut writer = bam::io::Writer::new(File::create(path).unwrap());
        writer.write_header(&header).unwrap();
        for record in records {
            writer.write_alignment_record(&header, record).unwrap();
        }
        writer.finish(&header).unwrap();
    }

    fn test_records() -> Vec<RecordBuf> {
        let paired = Flags::SEGMENTED;
        vec![
            // proper pair on chrM
            record(Spec {
                name: "pair",
                flags: paired | Flags::FIRST_SEGMENT,
                reference: Some(0),
                start: 11,
                mapq: 60,
                cigar: vec![Op::new(Kind::SoftClip, 2), Op::new(Kind::Match, 6)],
                bases: b"TTACGTAC",
                mate_reference: Some(0),
            }),
            record(Spec {
                name: "pair",
                flags: paired | Flags::LAST_SEGMENT | Flags::REVERSE_COMPLEMENTED,
                reference: Some(0),
                start: 31,
                mapq: 60,
                cigar: vec![Op::new(Kind::Match, 8)],
                bases: b"GGGGCCCC",
                mate_reference: Some(0),
            }),
            // non-specific single read on the plasmid
            record(Spec {
                name: "multi",
                flags: Flags::empty(),
                reference: Some(1),
                start: 1,
                mapq: 0,
                cigar: vec![Op::new(Kind::Match, 4)],
                bases: b"ACGT",
                mate_reference: None,
            }),
            // aligned mate of an unaligned read
            record(Spec {
                name: "half",
                flags: paired | Flags::FIRST_SEGMENT | Flags::MATE_UNMAPPED,
                reference: Some(0),
                start: 51,
                mapq: 60,
                cigar: vec![Op::new(Kind::Match, 4)],
                bases: b"AAAA",
                mate_reference: Some(0),
            }),
            record(Spec {
                name: "half",
                flags: paired | Flags::LAST_SEGMENT | Flags::UNMAPPED | Flags::REVERSE_COMPLEMENTED,
                reference: None,
                start: 0,
                mapq: 255,
                cigar: Vec::new(),
                bases: b"AACC",
                mate_reference: Some(0),
            }),
            // secondary alignment is skipped
            record(Spec {
                name: "pair",
                flags: paired | Flags::FIRST_SEGMENT | Flags::SECONDARY,
                reference: Some(1),
                start: 5,
                mapq: 3,
                cigar: vec![Op::new(Kind::Match, 8)],
                bases: b"TTACGTAC",
                mate_reference: Some(0),
            }),
        ]
    }

    #[test]
    fn test_load_mappings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input.bam");
        write_bam(&path, &test_records());

        let options = LoadOptions { circular: vec!["plasmid".to_string()], references: Vec::new() };
        let mappings = load_mappings(&path, &options).unwrap();
        assert_eq!(mappings.len(), 2);

        let chr_m = &mappings[0];
        assert_eq!(chr_m.name(), "chrM");
        assert_eq!(chr_m.main_sequence_length(), 100);
        assert!(!chr_m.is_circular());
        assert_eq!(chr_m.reads().len(), 3);
        assert_eq!(chr_m.unaligned_len(), 1);

        let first = &chr_m.reads()[0];
        assert_eq!(first.start(), 10);
        assert_eq!(first.leading_clip(), 2);
        assert_eq!(first.segment(), Segment::First);
        assert!(!first.is_broken_pair());
        let second = &chr_m.reads()[1];
        assert_eq!(second.strand(), Strand::Reverse);
        assert_eq!(second.segment(), Segment::Second);
        assert!(chr_m.reads()[2].is_broken_pair());

        let plasmid = &mappings[1];
        assert!(plasmid.is_circular());
        assert_eq!(plasmid.reads().len(), 1);
        assert!(plasmid.reads()[0].is_non_specific());
    }

    #[test]
    fn test_unaligned_mates_join_fragment_extraction() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input.bam");
        write_bam(&path, &test_records());

        let mappings = load_mappings(&path, &LoadOptions::default()).unwrap();
        let fragments = mappings[0].fragments_in_region(50, 54);
        assert_eq!(fragments.pairs.len(), 1);
        // the unaligned mate is returned in sequencing orientation
        assert_eq!(fragments.pairs[0], (b"AAAA".to_vec(), b"GGTT".to_vec()));
    }

    #[test]
    fn test_load_selected_references() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("input.bam");
        write_bam(&path, &test_records());

        let options = LoadOptions { circular: Vec::new(), references: vec!["plasmid".to_string()] };
        let mappings = load_mappings(&path, &options).unwrap();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].name(), "plasmid");

        let options = LoadOptions { circular: vec!["chr1".to_string()], references: Vec::new() };
        let error = load_mappings(&path, &options).unwrap_err();
        assert!(error.to_string().contains("Reference sequence 'chr1' not found"));
    }

    #[test]
    fn test_missing_bam() {
        let error = load_mappings("/no/such/input.bam", &LoadOptions::default()).unwrap_err();
        assert!(error.to_string().contains("Failed to open input BAM"));
    }
}
