//! Consensus synthesis from builder sessions.
//!
//! The builder walks the data points of all registered sessions in order, resolves each
//! position with the configured [`ConflictResolution`], and collects conflict, low-coverage
//! and breakpoint features along the way.

use std::cell::OnceCell;
use std::collections::BTreeMap;

use log::debug;

use crate::coverage::CoverageInformation;
use crate::data_point::{ConsensusSymbol, DataPoint, PreVariant};
use crate::errors::{ConsensusError, Result};
use crate::feature::{Feature, Interval, Region, UNSURE};
use crate::options::ConsensusOptions;
use crate::resolution::{ConflictResolution, Resolved};
use crate::sequence::ConsensusSequence;
use crate::session::BuilderSession;

/// Symbols are accumulated in chunks of this size before being appended to the output.
pub const BUFFER_SIZE: usize = 10_000;

/// Data points this close to either end of the merged stream never flag breakpoints.
pub const IGNORE_BREAKPOINTS_CLOSE_TO_END: usize = 25;

/// Annotation holding the first main-sequence position of the unsure region.
pub const REFERENCE_START: &str = "Reference start";

/// Annotation holding one past the last main-sequence position of the unsure region.
pub const REFERENCE_END: &str = "Reference end";

/// One gap-producing column with conflicting candidates.
#[derive(Debug)]
struct InsertionColumn {
    position: i64,
    pre_variants: Vec<PreVariant>,
}

/// Merges builder sessions into a consensus sequence.
#[derive(Debug)]
pub struct ConsensusBuilder {
    name: String,
    min_coverage: u32,
    min_frequency: f64,
    resolution: ConflictResolution,
    add_conflicts: bool,
    sessions: Vec<BuilderSession>,
    coverage: OnceCell<CoverageInformation>,
}

impl ConsensusBuilder {
    /// Creates a builder for the consensus of the main sequence `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, options: &ConsensusOptions) -> Self {
        Self {
            name: name.into(),
            min_coverage: options.min_coverage,
            min_frequency: options.min_frequency,
            resolution: options.conflict_resolution,
            add_conflicts: options.add_conflict_annotations,
            sessions: Vec::new(),
            coverage: OnceCell::new(),
        }
    }

    /// Registers the next session; sessions must be added in left-to-right order.
    pub fn add_session(&mut self, session: BuilderSession) {
        debug!(
            "Adding session [{}, {}) with {} data points to consensus of {}",
            session.start(),
            session.end(),
            session.len(),
            self.name
        );
        self.sessions.push(session);
    }

    #[must_use]
    pub fn sessions(&self) -> &[BuilderSession] {
        &self.sessions
    }

    /// Total number of data points over all sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.iter().map(BuilderSession::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Data points of all sessions in registration order.
    pub fn data_points(&self) -> impl Iterator<Item = &DataPoint> {
        self.sessions.iter().flat_map(|session| session.points().iter())
    }

    fn pre_variants(&self, point: &DataPoint) -> Vec<PreVariant> {
        point.pre_variants(self.min_frequency, self.min_coverage)
    }

    /// Coverage information over the positions that do not resolve to a gap.
    ///
    /// Computed on first use and cached for the lifetime of the builder.
    pub fn coverage_information(&self) -> &CoverageInformation {
        self.coverage.get_or_init(|| {
            let coverages = self
                .data_points()
                .filter(|point| !self.resolution.resolve(&self.pre_variants(point)).is_gap())
                .map(DataPoint::coverage);
            CoverageInformation::from_coverages(coverages, self.min_coverage)
        })
    }

    /// Synthesizes the consensus sequence.
    ///
    /// # Errors
    ///
    /// Returns [`ConsensusError::PositionsOutOfOrder`] if a resolved data point has a lower
    /// position than the one before it.
    pub fn consensus(&self) -> Result<ConsensusSequence> {
        let total = self.len();
        let mut symbols = Vec::with_capacity(total);
        let mut buffer = Vec::with_capacity(BUFFER_SIZE.min(total));
        let mut features = Vec::new();
        let mut insertions: BTreeMap<usize, Vec<InsertionColumn>> = BTreeMap::new();
        let mut breakpoints: Vec<Interval> = Vec::new();
        let mut breakpoint_span: Option<(i64, i64)> = None;
        let mut last_position: Option<i64> = None;
        let mut output_position = 0;

        for (index, point) in self.data_points().enumerate() {
            let pre_variants = self.pre_variants(point);
            let symbol = match self.resolution.resolve(&pre_variants) {
                Resolved::Gap => {
                    if pre_variants.len() > 1 && self.add_conflicts {
                        insertions
                            .entry(output_position)
                            .or_default()
                            .push(InsertionColumn { position: point.position(), pre_variants });
                    }
                    continue;
                }
                Resolved::Symbol(symbol) => symbol,
            };

            match last_position {
                Some(previous) if point.position() < previous => {
                    return Err(ConsensusError::PositionsOutOfOrder {
                        previous,
                        current: point.position(),
                    });
                }
                _ => last_position = Some(point.position()),
            }

            if pre_variants.len() > 1 && self.add_conflicts {
                features.push(self.conflict_feature(
                    &pre_variants,
                    Region::new(output_position, output_position + 1),
                    ConsensusSymbol::Base(symbol),
                    point.position(),
                ));
            }

            if index >= IGNORE_BREAKPOINTS_CLOSE_TO_END
                && index + IGNORE_BREAKPOINTS_CLOSE_TO_END < total
                && point.is_breakpoint()
            {
                breakpoints.push(Interval::new(output_position, output_position + 1));
                breakpoint_span = Some(match breakpoint_span {
                    Some((lo, hi)) => (lo.min(point.position()), hi.max(point.position() + 1)),
                    None => (point.position(), point.position() + 1),
                });
            }

            buffer.push(symbol);
            output_position += 1;
            if buffer.len() == BUFFER_SIZE {
                symbols.extend_from_slice(&buffer);
                buffer.clear();
            }
        }
        symbols.extend_from_slice(&buffer);

        for (insertion_point, columns) in insertions {
            features.push(self.insertion_feature(insertion_point, &columns));
        }

        features.extend(self.coverage_information().low_coverage_regions().iter().cloned());

        if breakpoints.len() > 1 {
            let mut unsure = Feature::failure(UNSURE, Region::merged(breakpoints));
            if let Some((start, end)) = breakpoint_span {
                unsure.add_annotation(REFERENCE_START, start);
                unsure.add_annotation(REFERENCE_END, end);
            }
            debug!("Consensus of {} has an unsure region at {}", self.name, unsure.region());
            features.push(unsure);
        }

        Ok(ConsensusSequence::new(format!("{}_cons", self.name), symbols, features))
    }

    /// Conflict feature listing every candidate at one column.
    fn conflict_feature(
        &self,
        pre_variants: &[PreVariant],
        region: Region,
        called: ConsensusSymbol,
        position: i64,
    ) -> Feature {
        let mut feature = Feature::conflict(region);
        feature.add_annotation(
            "Conflict resolution",
            format!("{} called '{called}'", self.resolution.short_name()),
        );
        for pv in pre_variants {
            feature.add_annotation(format!("{} count", pv.symbol), pv.count);
            feature.add_annotation(format!("{} perc", pv.symbol), pv.freq() * 100.0);
        }
        if let Some(first) = pre_variants.first() {
            let start = feature.region().start();
            feature.add_annotation("Coverage", first.coverage);
            feature.add_annotation("Reference position", position + 1);
            feature.add_annotation("Start position", start + 1);
            feature.add_annotation("Ref", called.to_string());
        }
        let var = pre_variants.iter().map(|pv| pv.symbol.to_string()).collect::<Vec<_>>().join(",");
        feature.add_annotation("Var", var);
        feature
    }

    /// One feature for all conflicting insertion columns at the same insertion point.
    ///
    /// Candidates of each column are ranked by frequency; rank `i` of every column together
    /// spells one inserted string whose average count is reported.
    fn insertion_feature(&self, insertion_point: usize, columns: &[InsertionColumn]) -> Feature {
        let region = Region::insertion_point(insertion_point);
        if let [column] = columns {
            return self.conflict_feature(
                &column.pre_variants,
                region,
                ConsensusSymbol::Gap,
                column.position,
            );
        }

        let ranked: Vec<Vec<PreVariant>> = columns
            .iter()
            .map(|column| {
                let mut pvs = column.pre_variants.clone();
                pvs.sort_by(|a, b| b.freq().total_cmp(&a.freq()));
                pvs
            })
            .collect();
        let max_rank = ranked.iter().map(Vec::len).max().unwrap_or(0);
        let coverage =
            ranked.iter().map(|pvs| u64::from(pvs[0].coverage)).sum::<u64>() / ranked.len() as u64;

        let mut feature = Feature::conflict(region);
        feature.add_annotation(
            "Conflict resolution",
            format!("{} called '{}'", self.resolution.short_name(), ConsensusSymbol::Gap),
        );
        feature.add_annotation("Reference position", columns[0].position + 1);
        feature.add_annotation("Start position", insertion_point + 1);
        feature.add_annotation("Ref", ConsensusSymbol::Gap.to_string());

        let mut variants = Vec::new();
        for rank in 0..max_rank {
            let mut inserted = String::new();
            let mut count = 0u64;
            let mut gap_columns = 0u64;
            let mut gap_count = 0u64;
            for pv in ranked.iter().filter_map(|pvs| pvs.get(rank)) {
                match pv.symbol {
                    ConsensusSymbol::Gap => {
                        gap_columns += 1;
                        gap_count += u64::from(pv.count);
                    }
                    ConsensusSymbol::Base(base) => {
                        inserted.push(base as char);
                        count += u64::from(pv.count);
                    }
                }
            }

            if inserted.is_empty() {
                if gap_columns > 0 {
                    let average = gap_count / gap_columns;
                    feature.add_annotation("gap count", average as i64);
                    feature.add_annotation("gap perc", percent(average, coverage));
                }
            } else {
                let average = count / inserted.len() as u64;
                feature.add_annotation(format!("{inserted} count"), average as i64);
                feature.add_annotation(format!("{inserted} perc"), percent(average, coverage));
                variants.push(inserted);
            }
        }
        feature.add_annotation("Coverage", coverage as i64);
        feature.add_annotation("var", variants.join(","));
        feature
    }
}

fn percent(count: u64, coverage: u64) -> f64 {
    if coverage == 0 { 0.0 } else { count as f64 / coverage as f64 * 100.0 }
}
