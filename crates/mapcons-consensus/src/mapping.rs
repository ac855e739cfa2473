//! Reads aligned against a main sequence.
//!
//! [`ReadMapping`] is the contract the pileup iterator and the patch step consume;
//! [`InMemoryMapping`] is the implementation backed by a vector of [`AlignedRead`]s.

use ahash::AHashMap;
use itertools::Itertools;

use mapcons_dna::{GAP_BASE, reverse_complement};

use crate::errors::{ConsensusError, Result};
use crate::options::{ConsensusOptions, NonSpecificMatches};

/// One operation of a read's alignment, CIGAR style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentOp {
    /// Aligned bases (match or mismatch)
    Match(usize),
    /// Bases absent from the main sequence
    Insertion(usize),
    /// Main-sequence positions absent from the read
    Deletion(usize),
    /// Skipped main-sequence positions, treated like a deletion
    Skip(usize),
    /// Unaligned bases kept in the read sequence
    SoftClip(usize),
    /// Unaligned bases removed from the read sequence
    HardClip(usize),
}

/// Parses a CIGAR string such as `5S20M2I10M`.
///
/// # Errors
///
/// Returns [`ConsensusError::InvalidAlignment`] for unknown operations or missing lengths.
pub fn parse_cigar(cigar: &str) -> Result<Vec<AlignmentOp>> {
    let invalid = |reason: String| ConsensusError::InvalidAlignment { read: cigar.to_string(), reason };
    let mut ops = Vec::new();
    let mut len = String::new();
    for c in cigar.chars() {
        if c.is_ascii_digit() {
            len.push(c);
            continue;
        }
        let n: usize = len.parse().map_err(|_| invalid(format!("missing length before '{c}'")))?;
        len.clear();
        ops.push(match c {
            'M' | '=' | 'X' => AlignmentOp::Match(n),
            'I' => AlignmentOp::Insertion(n),
            'D' => AlignmentOp::Deletion(n),
            'N' => AlignmentOp::Skip(n),
            'S' => AlignmentOp::SoftClip(n),
            'H' | 'P' => AlignmentOp::HardClip(n),
            _ => return Err(invalid(format!("unknown operation '{c}'"))),
        });
    }
    if !len.is_empty() {
        return Err(invalid("trailing length without operation".to_string()));
    }
    Ok(ops)
}

/// Strand a read aligned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

/// Position of a read within its fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Segment {
    /// Unpaired read
    #[default]
    Single,
    /// First read of a pair
    First,
    /// Second read of a pair
    Second,
}

/// What a read shows at one main-sequence position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    /// The base at this read offset
    Base(usize),
    /// A deletion; the offset is that of the next aligned base
    Gap(usize),
    /// Skipped main sequence (CIGAR `N`); the read shows nothing here
    Skip,
}

/// Bases inserted after a main-sequence position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    /// Main-sequence position the insertion follows
    pub after: i64,
    /// Read offset of the first inserted base
    pub offset: usize,
    /// Number of inserted bases
    pub len: usize,
}

/// A symbol a read shows at one pileup column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadCall {
    /// The base at `offset`
    Base { base: u8, offset: usize },
    /// No base; `offset` is the read offset of the next base
    Gap { offset: usize },
}

/// A read with its alignment against the main sequence.
///
/// Sequence and qualities are stored in main-sequence orientation, clipped bases included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedRead {
    name: String,
    sequence: Vec<u8>,
    qualities: Option<Vec<u8>>,
    start: i64,
    strand: Strand,
    segment: Segment,
    non_specific: bool,
    broken_pair: bool,
    leading_clip: usize,
    trailing_clip: usize,
    columns: Vec<Column>,
    insertions: Vec<Insertion>,
}

impl AlignedRead {
    /// Creates a read whose first aligned base lies at `start` (0-based).
    ///
    /// Leading or trailing insertions are treated as unaligned tails and leading or
    /// trailing deletions are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ConsensusError::InvalidAlignment`] if the alignment does not consume exactly
    /// the read's bases, if the qualities do not match the bases, or if nothing is aligned.
    pub fn new(
        name: impl Into<String>,
        sequence: Vec<u8>,
        qualities: Option<Vec<u8>>,
        start: i64,
        ops: &[AlignmentOp],
        strand: Strand,
    ) -> Result<Self> {
        let name = name.into();
        let invalid =
            |reason: String| ConsensusError::InvalidAlignment { read: name.clone(), reason };

        let mut start = start;
        let mut offset = 0;
        let mut columns: Vec<Column> = Vec::new();
        let mut insertions: Vec<Insertion> = Vec::new();
        let mut leading_clip = 0;
        let mut trailing_clip = 0;
        let mut aligned_end_offset = 0;

        for &op in ops {
            match op {
                AlignmentOp::SoftClip(n) => {
                    if columns.is_empty() {
                        leading_clip += n;
                    } else {
                        trailing_clip += n;
                    }
                    offset += n;
                }
                AlignmentOp::HardClip(_) => {}
                AlignmentOp::Match(n) => {
                    columns.extend((offset..offset + n).map(Column::Base));
                    offset += n;
                    aligned_end_offset = offset;
                }
                AlignmentOp::Deletion(n) | AlignmentOp::Skip(n) => {
                    if columns.is_empty() {
                        start += n as i64;
                    } else {
                        let column =
                            if matches!(op, AlignmentOp::Skip(_)) { Column::Skip } else { Column::Gap(offset) };
                        columns.extend(std::iter::repeat_n(column, n));
                    }
                }
                AlignmentOp::Insertion(n) => {
                    if columns.is_empty() {
                        leading_clip += n;
                    } else {
                        let after = start + columns.len() as i64 - 1;
                        match insertions.last_mut() {
                            Some(last) if last.after == after && last.offset + last.len == offset => {
                                last.len += n;
                            }
                            _ => insertions.push(Insertion { after, offset, len: n }),
                        }
                    }
                    offset += n;
                }
            }
        }

        if columns.is_empty() {
            return Err(invalid("no aligned bases".to_string()));
        }
        if offset != sequence.len() {
            return Err(invalid(format!(
                "alignment covers {offset} bases but the read has {}",
                sequence.len()
            )));
        }
        if let Some(quals) = &qualities {
            if quals.len() != sequence.len() {
                return Err(invalid(format!(
                    "{} qualities for {} bases",
                    quals.len(),
                    sequence.len()
                )));
            }
        }

        while matches!(columns.last(), Some(Column::Gap(_) | Column::Skip)) {
            columns.pop();
        }
        while let Some(last) = insertions.last() {
            if last.offset < aligned_end_offset {
                break;
            }
            trailing_clip += last.len;
            insertions.pop();
        }

        Ok(Self {
            name,
            sequence,
            qualities,
            start,
            strand,
            segment: Segment::Single,
            non_specific: false,
            broken_pair: false,
            leading_clip,
            trailing_clip,
            columns,
            insertions,
        })
    }

    #[must_use]
    pub fn with_segment(mut self, segment: Segment) -> Self {
        self.segment = segment;
        self
    }

    /// Marks the read as matching more than one place.
    #[must_use]
    pub fn with_non_specific(mut self, non_specific: bool) -> Self {
        self.non_specific = non_specific;
        self
    }

    /// Marks the read's mate as unmapped or mapped to another sequence.
    #[must_use]
    pub fn with_broken_pair(mut self, broken_pair: bool) -> Self {
        self.broken_pair = broken_pair;
        self
    }

    /// Fragment name shared by both reads of a pair.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    #[must_use]
    pub fn qualities(&self) -> Option<&[u8]> {
        self.qualities.as_deref()
    }

    /// First aligned main-sequence position.
    #[must_use]
    pub fn start(&self) -> i64 {
        self.start
    }

    /// One past the last aligned main-sequence position.
    #[must_use]
    pub fn end(&self) -> i64 {
        self.start + self.columns.len() as i64
    }

    /// Number of main-sequence positions spanned by the alignment.
    #[must_use]
    pub fn aligned_len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn strand(&self) -> Strand {
        self.strand
    }

    #[must_use]
    pub fn segment(&self) -> Segment {
        self.segment
    }

    #[must_use]
    pub fn is_non_specific(&self) -> bool {
        self.non_specific
    }

    #[must_use]
    pub fn is_broken_pair(&self) -> bool {
        self.broken_pair
    }

    /// Unaligned bases before the first aligned base.
    #[must_use]
    pub fn leading_clip(&self) -> usize {
        self.leading_clip
    }

    /// Unaligned bases after the last aligned base.
    #[must_use]
    pub fn trailing_clip(&self) -> usize {
        self.trailing_clip
    }

    /// Start of the span covered when the unaligned tails are laid out along the main sequence.
    #[must_use]
    pub fn extended_start(&self) -> i64 {
        self.start - self.leading_clip as i64
    }

    /// End of the span covered when the unaligned tails are laid out along the main sequence.
    #[must_use]
    pub fn extended_end(&self) -> i64 {
        self.end() + self.trailing_clip as i64
    }

    /// Insertions in main-sequence order.
    #[must_use]
    pub fn insertions(&self) -> &[Insertion] {
        &self.insertions
    }

    /// The insertion following `position`, if any.
    #[must_use]
    pub fn insertion_after(&self, position: i64) -> Option<&Insertion> {
        self.insertions
            .binary_search_by_key(&position, |insertion| insertion.after)
            .ok()
            .map(|i| &self.insertions[i])
    }

    /// What the read shows at main-sequence `position`, if it is within the alignment.
    #[must_use]
    pub fn call_at(&self, position: i64) -> Option<ReadCall> {
        let index = usize::try_from(position - self.start).ok()?;
        self.columns.get(index).and_then(|column| self.call(*column))
    }

    /// What the read shows at insertion column `sub` (1-based) after `position`.
    ///
    /// Reads with a long enough insertion show the inserted base; reads spanning `position`
    /// and `position + 1` without one show a gap; other reads show nothing.
    #[must_use]
    pub fn call_in_insertion(&self, position: i64, sub: usize) -> Option<ReadCall> {
        if position + 1 >= self.end() || position < self.start {
            return None;
        }
        match self.insertion_after(position) {
            Some(insertion) if sub <= insertion.len => {
                let offset = insertion.offset + sub - 1;
                Some(ReadCall::Base { base: self.sequence[offset], offset })
            }
            Some(insertion) => Some(ReadCall::Gap { offset: insertion.offset + insertion.len }),
            None => self.call_at(position).and(self.call_at(position + 1)).map(|call| match call {
                ReadCall::Base { offset, .. } | ReadCall::Gap { offset } => ReadCall::Gap { offset },
            }),
        }
    }

    fn call(&self, column: Column) -> Option<ReadCall> {
        match column {
            Column::Base(offset) => Some(ReadCall::Base { base: self.sequence[offset], offset }),
            Column::Gap(offset) => Some(ReadCall::Gap { offset }),
            Column::Skip => None,
        }
    }

    /// Every base laid out along the main sequence: the leading tail, the aligned columns
    /// (deletions as gaps) and the trailing tail. Insertions and skipped regions are left out.
    pub fn placed_bases(&self) -> impl Iterator<Item = (i64, u8)> + '_ {
        let leading = (0..self.leading_clip)
            .map(move |offset| (self.extended_start() + offset as i64, self.sequence[offset]));
        let aligned = self.columns.iter().enumerate().filter_map(move |(i, column)| {
            let base = match column {
                Column::Base(offset) => self.sequence[*offset],
                Column::Gap(_) => GAP_BASE,
                Column::Skip => return None,
            };
            Some((self.start + i as i64, base))
        });
        let tail_offset = self.sequence.len() - self.trailing_clip;
        let trailing = (0..self.trailing_clip)
            .map(move |i| (self.end() + i as i64, self.sequence[tail_offset + i]));
        leading.chain(aligned).chain(trailing)
    }

    /// The read's bases in the orientation they were sequenced in.
    #[must_use]
    pub fn original_sequence(&self) -> Vec<u8> {
        match self.strand {
            Strand::Forward => self.sequence.clone(),
            Strand::Reverse => reverse_complement(&self.sequence),
        }
    }
}

/// A read whose mate aligned but which did not align itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnalignedMate {
    /// Fragment name shared with the aligned mate
    pub name: String,
    /// Bases in sequencing orientation
    pub sequence: Vec<u8>,
    pub segment: Segment,
}

/// Reads handed to the assembler, in sequencing orientation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadCollection {
    /// Both reads of a fragment, first read first
    pub pairs: Vec<(Vec<u8>, Vec<u8>)>,
    /// Fragments with a single read available
    pub singles: Vec<Vec<u8>>,
}

impl ReadCollection {
    /// Number of reads, pairs counting twice.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len() * 2 + self.singles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty() && self.singles.is_empty()
    }
}

/// Reads aligned against one main sequence.
pub trait ReadMapping {
    /// Name of the main sequence.
    fn name(&self) -> &str;

    /// Length of the main sequence.
    fn main_sequence_length(&self) -> usize;

    /// True if the main sequence is circular.
    fn is_circular(&self) -> bool;

    /// Aligned reads sorted by start position.
    fn reads(&self) -> &[AlignedRead];

    /// Fragments with a read aligned within `[start, end)`, mates included.
    fn fragments_in_region(&self, start: i64, end: i64) -> ReadCollection;
}

/// Decides which reads take part in the pileup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadSelection {
    pub non_specific_matches: NonSpecificMatches,
    pub min_ignore_read_length: usize,
    pub ignore_broken_pairs: bool,
}

impl ReadSelection {
    #[must_use]
    pub fn accepts(&self, read: &AlignedRead) -> bool {
        if self.ignore_broken_pairs && read.is_broken_pair() {
            return false;
        }
        match self.non_specific_matches {
            NonSpecificMatches::IgnoreReads => !read.is_non_specific(),
            NonSpecificMatches::IgnoreRegions => {
                !(read.is_non_specific() && read.aligned_len() >= self.min_ignore_read_length)
            }
            NonSpecificMatches::Keep => true,
        }
    }
}

impl From<&ConsensusOptions> for ReadSelection {
    fn from(options: &ConsensusOptions) -> Self {
        Self {
            non_specific_matches: options.non_specific_matches,
            min_ignore_read_length: options.min_ignore_read_length,
            ignore_broken_pairs: options.ignore_broken_pairs,
        }
    }
}

/// A [`ReadMapping`] holding its reads in memory.
#[derive(Debug, Clone)]
pub struct InMemoryMapping {
    name: String,
    length: usize,
    circular: bool,
    reads: Vec<AlignedRead>,
    unaligned: Vec<UnalignedMate>,
    fragments: AHashMap<String, Vec<usize>>,
    unaligned_fragments: AHashMap<String, Vec<usize>>,
}

impl InMemoryMapping {
    /// Creates a mapping; reads are sorted by start position.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        length: usize,
        circular: bool,
        mut reads: Vec<AlignedRead>,
        unaligned: Vec<UnalignedMate>,
    ) -> Self {
        reads.sort_by_key(AlignedRead::start);
        let mut fragments: AHashMap<String, Vec<usize>> = AHashMap::new();
        for (i, read) in reads.iter().enumerate() {
            fragments.entry(read.name().to_string()).or_default().push(i);
        }
        let mut unaligned_fragments: AHashMap<String, Vec<usize>> = AHashMap::new();
        for (i, mate) in unaligned.iter().enumerate() {
            unaligned_fragments.entry(mate.name.clone()).or_default().push(i);
        }
        Self { name: name.into(), length, circular, reads, unaligned, fragments, unaligned_fragments }
    }

    /// Number of unaligned mates held for extraction.
    #[must_use]
    pub fn unaligned_len(&self) -> usize {
        self.unaligned.len()
    }
}

impl ReadMapping for InMemoryMapping {
    fn name(&self) -> &str {
        &self.name
    }

    fn main_sequence_length(&self) -> usize {
        self.length
    }

    fn is_circular(&self) -> bool {
        self.circular
    }

    fn reads(&self) -> &[AlignedRead] {
        &self.reads
    }

    fn fragments_in_region(&self, start: i64, end: i64) -> ReadCollection {
        let names = self
            .reads
            .iter()
            .take_while(|read| read.start() < end)
            .filter(|read| read.end() > start)
            .map(AlignedRead::name)
            .unique();

        let mut collection = ReadCollection::default();
        for name in names {
            let mut mates: Vec<(Segment, Vec<u8>)> = self
                .fragments
                .get(name)
                .into_iter()
                .flatten()
                .map(|&i| (self.reads[i].segment(), self.reads[i].original_sequence()))
                .chain(
                    self.unaligned_fragments
                        .get(name)
                        .into_iter()
                        .flatten()
                        .map(|&i| (self.unaligned[i].segment, self.unaligned[i].sequence.clone())),
                )
                .collect();
            mates.sort_by_key(|(segment, _)| match segment {
                Segment::First => 0,
                Segment::Single => 1,
                Segment::Second => 2,
            });

            let mut sequences = mates.into_iter().map(|(_, sequence)| sequence);
            match (sequences.next(), sequences.next()) {
                (Some(first), Some(second)) => collection.pairs.push((first, second)),
                (Some(single), None) => collection.singles.push(single),
                _ => {}
            }
            collection.singles.extend(sequences);
        }
        collection
    }
}
