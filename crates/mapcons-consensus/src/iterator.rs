//! Pileup iteration over a read mapping.
//!
//! The iterator sweeps main-sequence positions, collects the observations of every read
//! overlapping each position, runs them through the [`FilterPipeline`] and produces one
//! [`DataPoint`] per position plus one per insertion column. The same reads drive the
//! start/end search and the extension past the mapped region.

use std::collections::BTreeMap;

use ahash::AHashMap;
use itertools::Itertools;
use log::{Level, debug};

use mapcons_dna::{GAP_SLOT, SLOT_COUNT, SymbolCounts, slot_of};

use crate::builder::ConsensusBuilder;
use crate::cancel::CancellationToken;
use crate::data_point::DataPoint;
use crate::errors::Result;
use crate::filter::{Call, FilterPipeline, Observation};
use crate::mapping::{AlignedRead, ReadMapping, ReadSelection, Strand};
use crate::options::ConsensusOptions;
use crate::progress::ProgressTracker;
use crate::session::BuilderSession;

/// Unaligned tails must be longer than this to count toward a breakpoint, and must end
/// further than this from the ends of the main sequence.
pub const MAX_UNALIGNED_END: usize = 5;

/// Positions scanned between two cancellation checks.
pub const CANCEL_CHECK_INTERVAL: usize = 1_000;

/// Positions scanned between two progress messages.
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// Counts for the column being scanned; reset at every column.
#[derive(Debug, Default)]
struct PositionAccumulator {
    position: i64,
    forward: SymbolCounts,
    reverse: SymbolCounts,
    left_breakpoints: u32,
    right_breakpoints: u32,
}

impl PositionAccumulator {
    fn reset(&mut self, position: i64) {
        *self = Self { position, ..Self::default() };
    }

    fn tally(&mut self, strand: Strand, slot: usize) {
        match strand {
            Strand::Forward => self.forward[slot] += 1,
            Strand::Reverse => self.reverse[slot] += 1,
        }
    }

    fn finish(&self, breakpoint_threshold: Option<f64>) -> DataPoint {
        let point = DataPoint::new(self.position, self.forward, self.reverse);
        let coverage = point.coverage();
        match breakpoint_threshold {
            Some(threshold) if coverage > 0 => {
                let ratio = |count: u32| f64::from(count) / f64::from(coverage);
                point.with_breakpoints(
                    ratio(self.left_breakpoints) > threshold,
                    ratio(self.right_breakpoints) > threshold,
                )
            }
            _ => point,
        }
    }
}

/// Drives the scan of one read mapping.
pub struct PileupIterator<'a> {
    mapping: &'a dyn ReadMapping,
    reads: Vec<&'a AlignedRead>,
    filters: FilterPipeline,
    breakpoint_threshold: Option<f64>,
    min_coverage_extend: u32,
    cancel: &'a CancellationToken,
}

impl<'a> PileupIterator<'a> {
    /// Creates an iterator over the reads of `mapping` accepted by the options' read selection.
    #[must_use]
    pub fn new(
        mapping: &'a dyn ReadMapping,
        options: &ConsensusOptions,
        cancel: &'a CancellationToken,
    ) -> Self {
        let selection = ReadSelection::from(options);
        let reads: Vec<&AlignedRead> =
            mapping.reads().iter().filter(|read| selection.accepts(read)).collect();
        debug!(
            "Using {} of {} reads mapped to {}",
            reads.len(),
            mapping.reads().len(),
            mapping.name()
        );
        Self {
            mapping,
            reads,
            filters: FilterPipeline::new(options.quality_filter.as_ref()),
            breakpoint_threshold: options.breakpoint_threshold(),
            min_coverage_extend: options.min_coverage_extend,
            cancel,
        }
    }

    /// Number of reads taking part in the pileup.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.len()
    }

    /// Scans `[start, end)` and registers the resulting session with `builder`.
    ///
    /// Returns the number of data points produced.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConsensusError::Cancelled`] if the token is cancelled during the scan.
    pub fn iterate(&self, start: i64, end: i64, builder: &mut ConsensusBuilder) -> Result<usize> {
        let length = self.mapping.main_sequence_length() as i64;
        let mut session = BuilderSession::new(start, end);
        let mut pending = self.reads.iter().copied().peekable();
        let mut active: Vec<&AlignedRead> = Vec::new();
        let mut accumulator = PositionAccumulator::default();
        let progress = ProgressTracker::new(format!("Scanned positions of {}", self.mapping.name()))
            .with_interval(PROGRESS_INTERVAL)
            .with_level(Level::Debug);

        for (scanned, position) in (start..end).enumerate() {
            if scanned % CANCEL_CHECK_INTERVAL == 0 {
                self.cancel.check()?;
            }
            while let Some(read) = pending.next_if(|read| read.start() <= position) {
                active.push(read);
            }
            active.retain(|read| read.end() > position);

            let observations = active
                .iter()
                .filter_map(|read| read.call_at(position).map(|call| Observation::new(read, call)))
                .collect();
            session.push(self.column(&mut accumulator, position, observations, Some(length)));

            let max_insert = active
                .iter()
                .filter_map(|read| read.insertion_after(position))
                .map(|insertion| insertion.len)
                .max()
                .unwrap_or(0);
            for sub in 1..=max_insert {
                let observations = active
                    .iter()
                    .filter_map(|read| {
                        read.call_in_insertion(position, sub).map(|call| Observation::new(read, call))
                    })
                    .collect();
                session.push(self.column(&mut accumulator, position, observations, None));
            }

            progress.log_if_needed(1);
        }

        let count = session.len();
        builder.add_session(session);
        Ok(count)
    }

    /// Filters and tallies the observations of one column.
    ///
    /// Breakpoint tails are only counted for main-sequence columns, for which
    /// `main_length` is given.
    fn column(
        &self,
        accumulator: &mut PositionAccumulator,
        position: i64,
        mut observations: Vec<Observation<'_>>,
        main_length: Option<i64>,
    ) -> DataPoint {
        mark_fragments(&mut observations);
        accumulator.reset(position);

        for mut observation in observations {
            self.filters.apply(&mut observation);
            let slot = match observation.call {
                Call::Ignored => continue,
                Call::Gap => GAP_SLOT,
                Call::Base(base) => slot_of(base),
            };
            let read = observation.read;
            accumulator.tally(read.strand(), slot);
            if let Some(length) = main_length {
                if is_right_breakpoint(read, position, length) {
                    accumulator.right_breakpoints += 1;
                }
                if is_left_breakpoint(read, position) {
                    accumulator.left_breakpoints += 1;
                }
            }
        }
        accumulator.finish(self.breakpoint_threshold)
    }

    /// Most common first aligned position among reads whose extended span covers position 0.
    ///
    /// Ties go to the smallest position; returns 0 if no read covers position 0 or the
    /// main sequence is circular.
    #[must_use]
    pub fn search_start(&self) -> i64 {
        if self.mapping.is_circular() {
            return 0;
        }
        let starts = self
            .reads
            .iter()
            .filter(|read| read.extended_start() <= 0 && read.extended_end() > 0)
            .map(|read| read.start());
        mode(starts).unwrap_or(0)
    }

    /// Most common aligned end among reads whose extended span covers the last position.
    ///
    /// Ties go to the smallest end; returns the main-sequence length if no read covers the
    /// last position or the main sequence is circular.
    #[must_use]
    pub fn search_end(&self) -> i64 {
        let length = self.mapping.main_sequence_length() as i64;
        if self.mapping.is_circular() {
            return length;
        }
        let last = length - 1;
        let ends = self
            .reads
            .iter()
            .filter(|read| read.extended_start() <= last && read.extended_end() > last)
            .map(|read| read.end());
        mode(ends).unwrap_or(length)
    }

    /// Extends the consensus to the left of `main_start`.
    ///
    /// Tallies, without filters, the bases laid out before `main_start` by every read
    /// crossing it, then keeps positions walking leftwards while the best single-symbol
    /// support reaches the extension coverage. The kept positions are registered with
    /// `builder` as one session; call this before scanning the main range.
    ///
    /// Returns the number of positions added.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConsensusError::Cancelled`] if the token is cancelled.
    pub fn fix_start(&self, main_start: i64, builder: &mut ConsensusBuilder) -> Result<usize> {
        if self.mapping.is_circular() {
            return Ok(0);
        }
        self.cancel.check()?;
        let mut tallies = self.tally_tails(
            |read| read.extended_start() < main_start && read.extended_end() > main_start,
            |position| position < main_start,
        );

        let mut first = main_start;
        while tallies.get(&(first - 1)).is_some_and(|point| self.supports_extension(point)) {
            first -= 1;
        }
        let added = self.register_extension(first, main_start, &mut tallies, builder);
        debug!("Extended start of {} by {added} positions", self.mapping.name());
        Ok(added)
    }

    /// Extends the consensus to the right of `main_end`; see [`PileupIterator::fix_start`].
    ///
    /// Call this after scanning the main range.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConsensusError::Cancelled`] if the token is cancelled.
    pub fn fix_end(&self, main_end: i64, builder: &mut ConsensusBuilder) -> Result<usize> {
        if self.mapping.is_circular() {
            return Ok(0);
        }
        self.cancel.check()?;
        let mut tallies = self.tally_tails(
            |read| read.extended_start() < main_end && read.extended_end() > main_end,
            |position| position >= main_end,
        );

        let mut end = main_end;
        while tallies.get(&end).is_some_and(|point| self.supports_extension(point)) {
            end += 1;
        }
        let added = self.register_extension(main_end, end, &mut tallies, builder);
        debug!("Extended end of {} by {added} positions", self.mapping.name());
        Ok(added)
    }

    fn supports_extension(&self, point: &DataPoint) -> bool {
        point.max_support() >= self.min_coverage_extend
    }

    fn tally_tails(
        &self,
        crosses: impl Fn(&AlignedRead) -> bool,
        keep: impl Fn(i64) -> bool,
    ) -> BTreeMap<i64, DataPoint> {
        let mut counts: BTreeMap<i64, (SymbolCounts, SymbolCounts)> = BTreeMap::new();
        for read in self.reads.iter().filter(|read| crosses(read)) {
            for (position, base) in read.placed_bases().filter(|(position, _)| keep(*position)) {
                let (forward, reverse) =
                    counts.entry(position).or_insert(([0; SLOT_COUNT], [0; SLOT_COUNT]));
                match read.strand() {
                    Strand::Forward => forward[slot_of(base)] += 1,
                    Strand::Reverse => reverse[slot_of(base)] += 1,
                }
            }
        }
        counts
            .into_iter()
            .map(|(position, (forward, reverse))| (position, DataPoint::new(position, forward, reverse)))
            .collect()
    }

    fn register_extension(
        &self,
        start: i64,
        end: i64,
        tallies: &mut BTreeMap<i64, DataPoint>,
        builder: &mut ConsensusBuilder,
    ) -> usize {
        if end <= start {
            return 0;
        }
        let mut session = BuilderSession::new(start, end);
        for position in start..end {
            if let Some(point) = tallies.remove(&position) {
                session.push(point);
            }
        }
        let added = session.len();
        builder.add_session(session);
        added
    }
}

/// Marks observations of fragments seen more than once in the same column.
fn mark_fragments(observations: &mut [Observation<'_>]) {
    if observations.len() < 2 {
        return;
    }
    let mut fragments: AHashMap<&str, Vec<usize>> = AHashMap::new();
    for (i, observation) in observations.iter().enumerate() {
        fragments.entry(observation.read.name()).or_default().push(i);
    }
    for members in fragments.values().filter(|members| members.len() > 1) {
        let first = observations[members[0]].call;
        let conflict = members.iter().any(|&i| observations[i].call != first);
        for (k, &i) in members.iter().enumerate() {
            observations[i].remaining_in_fragment = members.len() - k;
            observations[i].conflicts_in_fragment = conflict;
        }
    }
}

/// The read stops aligning at `position` and continues with a long unaligned tail that ends
/// away from the end of the main sequence.
fn is_right_breakpoint(read: &AlignedRead, position: i64, main_length: i64) -> bool {
    let tail = read.trailing_clip();
    read.end() - 1 == position
        && tail > MAX_UNALIGNED_END
        && position + (tail as i64) < main_length - MAX_UNALIGNED_END as i64
}

/// The read starts aligning at `position` after a long unaligned tail that starts away from
/// the start of the main sequence.
fn is_left_breakpoint(read: &AlignedRead, position: i64) -> bool {
    let tail = read.leading_clip();
    read.start() == position
        && tail > MAX_UNALIGNED_END
        && position - (tail as i64) > MAX_UNALIGNED_END as i64
}

/// Most frequent value; ties go to the smallest value.
fn mode(values: impl Iterator<Item = i64>) -> Option<i64> {
    values
        .counts()
        .into_iter()
        .max_by(|(a, count_a), (b, count_b)| count_a.cmp(count_b).then(b.cmp(a)))
        .map(|(value, _)| value)
}
