//! Utilities for generating test BAM data programmatically.

use std::fs::File;
use std::num::NonZeroUsize;
use std::path::Path;

use bstr::BString;
use noodles::bam;
use noodles::core::Position;
use noodles::fasta;
use noodles::sam::Header;
use noodles::sam::alignment::io::Write as AlignmentWrite;
use noodles::sam::alignment::record::cigar::op::{Kind, Op};
use noodles::sam::alignment::record::{Flags, MappingQuality};
use noodles::sam::alignment::record_buf::{Cigar, QualityScores, RecordBuf, Sequence};
use noodles::sam::header::record::value::{Map, map::ReferenceSequence};

/// Creates a header with the given `(name, length)` reference sequences.
pub fn create_header(references: &[(&str, usize)]) -> Header {
    references
        .iter()
        .fold(Header::builder(), |builder, (name, length)| {
            builder.add_reference_sequence(
                BString::from(*name),
                Map::<ReferenceSequence>::new(NonZeroUsize::new(*length).unwrap()),
            )
        })
        .build()
}

/// Creates an unpaired read aligned without gaps at the 1-based `start`.
pub fn create_mapped_read(name: &str, reference_id: usize, start: usize, bases: &str) -> RecordBuf {
    RecordBuf::builder()
        .set_name(BString::from(name))
        .set_flags(Flags::empty())
        .set_reference_sequence_id(reference_id)
        .set_alignment_start(Position::try_from(start).unwrap())
        .set_mapping_quality(MappingQuality::new(60).unwrap())
        .set_cigar(Cigar::from(vec![Op::new(Kind::Match, bases.len())]))
        .set_sequence(Sequence::from(bases.as_bytes().to_vec()))
        .set_quality_scores(QualityScores::from(vec![30; bases.len()]))
        .build()
}

/// Creates `depth` copies of a read named `{base_name}_{i}`.
pub fn create_read_stack(
    base_name: &str,
    depth: usize,
    reference_id: usize,
    start: usize,
    bases: &str,
) -> Vec<RecordBuf> {
    (0..depth)
        .map(|i| create_mapped_read(&format!("{base_name}_{i}"), reference_id, start, bases))
        .collect()
}

/// Writes the records to a BAM file.
pub fn write_bam(path: &Path, header: &Header, records: &[RecordBuf]) {
    let mut writer = bam::io::Writer::new(File::create(path).expect("Failed to create BAM file"));
    writer.write_header(header).expect("Failed to write header");
    for record in records {
        writer.write_alignment_record(header, record).expect("Failed to write record");
    }
    writer.finish(header).expect("Failed to finish BAM");
}

/// Reads a FASTA file into `(name, sequence)` pairs.
pub fn read_fasta(path: &Path) -> Vec<(String, String)> {
    let mut reader = File::open(path)
        .map(std::io::BufReader::new)
        .map(fasta::io::Reader::new)
        .expect("Failed to open FASTA");
    reader
        .records()
        .map(|result| {
            let record = result.expect("Failed to read FASTA record");
            let name = String::from_utf8(record.name().to_vec()).unwrap();
            let sequence = String::from_utf8(record.sequence().as_ref().to_vec()).unwrap();
            (name, sequence)
        })
        .collect()
}
