//! Filters applied to each read observation before it is counted.
//!
//! The pipeline runs the overlap filter first, then the quality filter when enabled. A
//! filter can only downgrade an observation: to `N` or to ignored.

use mapcons_dna::NO_CALL_BASE;

use crate::mapping::{AlignedRead, ReadCall};
use crate::options::QualityFilterOptions;

/// The effective symbol of an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Base(u8),
    Gap,
    /// Not counted at all
    Ignored,
}

/// One read's contribution to one pileup column.
#[derive(Debug, Clone)]
pub struct Observation<'a> {
    pub read: &'a AlignedRead,
    pub call: Call,
    /// Offset of the base, or of the base following a gap
    pub read_offset: usize,
    /// Observations of the same fragment at this column not yet considered, this one included
    pub remaining_in_fragment: usize,
    /// True if another observation of the same fragment at this column shows a different call
    pub conflicts_in_fragment: bool,
}

impl<'a> Observation<'a> {
    #[must_use]
    pub fn new(read: &'a AlignedRead, call: ReadCall) -> Self {
        let (call, read_offset) = match call {
            ReadCall::Base { base, offset } => (Call::Base(base), offset),
            ReadCall::Gap { offset } => (Call::Gap, offset),
        };
        Self { read, call, read_offset, remaining_in_fragment: 1, conflicts_in_fragment: false }
    }
}

/// A predicate that may downgrade a single observation.
pub trait PositionFilter: Send + Sync {
    fn filter(&self, observation: &mut Observation<'_>);
}

/// Counts each fragment once where its reads overlap.
///
/// Every observation but the last of a fragment is ignored; the last one becomes `N` if the
/// fragment's reads disagree.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlapFilter;

impl PositionFilter for OverlapFilter {
    fn filter(&self, observation: &mut Observation<'_>) {
        if observation.remaining_in_fragment != 1 {
            observation.call = Call::Ignored;
        } else if observation.conflicts_in_fragment {
            observation.call = Call::Base(NO_CALL_BASE);
        }
    }
}

/// Ignores calls with a low base quality or a low mean quality around them.
#[derive(Debug, Clone, Copy)]
pub struct QualityFilter {
    radius: usize,
    min_central_quality: u8,
    min_region_quality: u8,
}

impl QualityFilter {
    #[must_use]
    pub fn new(options: &QualityFilterOptions) -> Self {
        Self {
            radius: options.radius,
            min_central_quality: options.min_central_quality,
            min_region_quality: options.min_region_quality,
        }
    }

    /// Mean quality over `[start, end)` after moving the window inside the read.
    fn window_mean(qualities: &[u8], start: i64, end: i64) -> Option<u32> {
        let len = qualities.len() as i64;
        let (mut start, mut end) = (start, end);
        if start < 0 {
            end -= start;
            start = 0;
        }
        if end > len {
            start -= end - len;
            end = len;
        }
        let start = start.max(0);
        if end <= start {
            return None;
        }
        let window = &qualities[start as usize..end as usize];
        let total: u32 = window.iter().map(|&q| u32::from(q)).sum();
        Some(total / window.len() as u32)
    }
}

impl PositionFilter for QualityFilter {
    fn filter(&self, observation: &mut Observation<'_>) {
        let Some(qualities) = observation.read.qualities() else {
            return;
        };
        let offset = observation.read_offset as i64;
        let radius = self.radius as i64;
        let window = match observation.call {
            Call::Ignored => return,
            Call::Base(_) => {
                if qualities[observation.read_offset] < self.min_central_quality {
                    observation.call = Call::Ignored;
                    return;
                }
                Self::window_mean(qualities, offset - radius, offset + radius + 1)
            }
            // centred between the bases around the gap
            Call::Gap => Self::window_mean(qualities, offset - radius, offset + radius),
        };
        if window.is_some_and(|mean| mean < u32::from(self.min_region_quality)) {
            observation.call = Call::Ignored;
        }
    }
}

/// Filters in application order.
pub struct FilterPipeline {
    filters: Vec<Box<dyn PositionFilter>>,
}

impl FilterPipeline {
    /// Overlap filter, followed by the quality filter when `quality` is set.
    #[must_use]
    pub fn new(quality: Option<&QualityFilterOptions>) -> Self {
        let mut filters: Vec<Box<dyn PositionFilter>> = vec![Box::new(OverlapFilter)];
        if let Some(options) = quality {
            filters.push(Box::new(QualityFilter::new(options)));
        }
        Self { filters }
    }

    /// Runs every filter until the observation is ignored.
    pub fn apply(&self, observation: &mut Observation<'_>) {
        for filter in &self.filters {
            if observation.call == Call::Ignored {
                return;
            }
            filter.filter(observation);
        }
    }
}

impl std::fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterPipeline").field("filters", &self.filters.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{Strand, parse_cigar};

    fn read_with_quals(quals: &[u8], cigar: &str) -> AlignedRead {
        let seq = vec![b'A'; quals.len()];
        let ops = parse_cigar(cigar).unwrap();
        AlignedRead::new("r", seq, Some(quals.to_vec()), 0, &ops, Strand::Forward).unwrap()
    }

    fn quality_filter(radius: usize, central: u8, region: u8) -> QualityFilter {
        QualityFilter::new(&QualityFilterOptions {
            radius,
            min_central_quality: central,
            min_region_quality: region,
        })
    }

    fn observe<'a>(read: &'a AlignedRead, position: i64) -> Observation<'a> {
        Observation::new(read, read.call_at(position).unwrap())
    }

    #[test]
    fn test_overlap_filter_keeps_last_of_fragment() {
        let read = read_with_quals(&[30; 4], "4M");
        let filter = OverlapFilter;

        let mut first = observe(&read, 0);
        first.remaining_in_fragment = 2;
        filter.filter(&mut first);
        assert_eq!(first.call, Call::Ignored);

        let mut last = observe(&read, 0);
        filter.filter(&mut last);
        assert_eq!(last.call, Call::Base(b'A'));

        let mut conflicting = observe(&read, 0);
        conflicting.conflicts_in_fragment = true;
        filter.filter(&mut conflicting);
        assert_eq!(conflicting.call, Call::Base(b'N'));
    }

    #[test]
    fn test_quality_filter_central_base() {
        let read = read_with_quals(&[30, 30, 10, 30, 30], "5M");
        let filter = quality_filter(1, 20, 5);
        let mut low = observe(&read, 2);
        filter.filter(&mut low);
        assert_eq!(low.call, Call::Ignored);

        let mut ok = observe(&read, 1);
        filter.filter(&mut ok);
        assert_eq!(ok.call, Call::Base(b'A'));
    }

    #[test]
    fn test_quality_filter_region_mean() {
        let read = read_with_quals(&[5, 5, 30, 5, 5, 30, 30], "7M");
        let filter = quality_filter(2, 20, 15);
        // mean of [0, 5) is 10
        let mut obs = observe(&read, 2);
        filter.filter(&mut obs);
        assert_eq!(obs.call, Call::Ignored);

        // window at offset 5 is moved to [2, 7) with mean 20
        let mut obs = observe(&read, 5);
        filter.filter(&mut obs);
        assert_eq!(obs.call, Call::Base(b'A'));
    }

    #[test]
    fn test_quality_window_shifted_inside_read() {
        // window at offset 0 with radius 2 becomes [0, 5)
        assert_eq!(QualityFilter::window_mean(&[10, 20, 30, 40, 50, 60], -2, 3), Some(30));
        // window at the last offset becomes [1, 6)
        assert_eq!(QualityFilter::window_mean(&[10, 20, 30, 40, 50, 60], 3, 8), Some(40));
        // read shorter than the window is clipped
        assert_eq!(QualityFilter::window_mean(&[10, 20], -5, 6), Some(15));
    }

    #[test]
    fn test_quality_filter_gap_uses_surrounding_bases() {
        let read = read_with_quals(&[30, 4, 4, 30], "2M1D2M");
        let filter = quality_filter(1, 20, 15);
        let mut gap = observe(&read, 2);
        assert_eq!(gap.call, Call::Gap);
        assert_eq!(gap.read_offset, 2);
        filter.filter(&mut gap);
        assert_eq!(gap.call, Call::Ignored);
    }

    #[test]
    fn test_reads_without_qualities_pass() {
        let ops = parse_cigar("3M").unwrap();
        let read = AlignedRead::new("r", b"ACG".to_vec(), None, 0, &ops, Strand::Forward).unwrap();
        let mut obs = observe(&read, 1);
        quality_filter(1, 60, 60).filter(&mut obs);
        assert_eq!(obs.call, Call::Base(b'C'));
    }

    #[test]
    fn test_pipeline_order() {
        let read = read_with_quals(&[2, 2, 2], "3M");
        let pipeline = FilterPipeline::new(None);
        let mut obs = observe(&read, 1);
        pipeline.apply(&mut obs);
        assert_eq!(obs.call, Call::Base(b'A'));

        let options = QualityFilterOptions::default();
        let pipeline = FilterPipeline::new(Some(&options));
        let mut obs = observe(&read, 1);
        obs.conflicts_in_fragment = true;
        pipeline.apply(&mut obs);
        assert_eq!(obs.call, Call::Ignored);
    }
}
