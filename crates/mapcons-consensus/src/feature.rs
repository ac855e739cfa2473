//! Regions and annotated features attached to a consensus sequence.

use std::fmt;

/// Name of the feature marking runs of positions below the minimum coverage.
pub const LOW_COVERAGE: &str = "Low Coverage";

/// Name of the feature marking a breakpoint region that needs local reassembly.
pub const UNSURE: &str = "Unsure";

/// Name of the feature marking a span replaced by local reassembly.
pub const LOCAL_ASSEMBLY: &str = "Local assembly";

/// Name given to conflict features.
pub const CONFLICT: &str = "Conflict";

/// A half-open span `[start, end)` of output positions; `start == end` marks the insertion
/// point before `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interval {
    start: usize,
    end: usize,
}

impl Interval {
    /// Creates an interval.
    ///
    /// # Panics
    ///
    /// Panics if `end < start`.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        assert!(start <= end, "interval end {end} precedes start {start}");
        Self { start, end }
    }

    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> usize {
        self.end
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Interval {
    /// 1-based rendering: `5` for a single position, `5..9` for a span, `4^5` for an
    /// insertion point.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.len() {
            0 => write!(f, "{}^{}", self.start, self.start + 1),
            1 => write!(f, "{}", self.start + 1),
            _ => write!(f, "{}..{}", self.start + 1, self.end),
        }
    }
}

/// An ordered list of non-overlapping intervals.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region {
    intervals: Vec<Interval>,
}

impl Region {
    /// A region made of the single interval `[start, end)`.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { intervals: vec![Interval::new(start, end)] }
    }

    /// The empty region marking the insertion point before `position`.
    #[must_use]
    pub fn insertion_point(position: usize) -> Self {
        Self::new(position, position)
    }

    /// Orders the intervals and merges the ones that overlap or touch.
    ///
    /// # Panics
    ///
    /// Panics if `intervals` is empty.
    #[must_use]
    pub fn merged(intervals: impl IntoIterator<Item = Interval>) -> Self {
        let mut sorted: Vec<Interval> = intervals.into_iter().collect();
        assert!(!sorted.is_empty(), "a region needs at least one interval");
        sorted.sort_unstable();

        let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
        for interval in sorted {
            match merged.last_mut() {
                Some(last) if interval.start <= last.end => last.end = last.end.max(interval.end),
                _ => merged.push(interval),
            }
        }
        Self { intervals: merged }
    }

    #[must_use]
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// First position covered.
    #[must_use]
    pub fn start(&self) -> usize {
        self.intervals[0].start
    }

    /// One past the last position covered.
    #[must_use]
    pub fn end(&self) -> usize {
        self.intervals[self.intervals.len() - 1].end
    }

    /// Maps the region onto a sequence whose span `[start, end)` was replaced by
    /// `replacement_len` symbols.
    ///
    /// Positions before `start` stay put, positions at or after `end` move by the length
    /// change, and positions inside the replaced span are clipped to the end of the
    /// replacement.
    #[must_use]
    pub fn spliced(&self, start: usize, end: usize, replacement_len: usize) -> Self {
        let new_end = start + replacement_len;
        let map = |p: usize| {
            if p >= end {
                p - end + new_end
            } else if p > start {
                p.min(new_end)
            } else {
                p
            }
        };
        let intervals =
            self.intervals.iter().map(|i| Interval::new(map(i.start), map(i.end))).collect();
        Self { intervals }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, interval) in self.intervals.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{interval}")?;
        }
        Ok(())
    }
}

/// Category of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    /// Symbol distribution at a disagreeing position
    Conflict,
    /// A span the caller should treat with care (low coverage, unsure, patched)
    Failures,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Conflict => "Conflict",
            Self::Failures => "Failures",
        })
    }
}

/// Value of one feature annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl AnnotationValue {
    /// Returns the integer value, if this is an integer annotation.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the text value, if this is a text annotation.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value:.2}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for AnnotationValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for AnnotationValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for AnnotationValue {
    fn from(value: usize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for AnnotationValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for AnnotationValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AnnotationValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// An annotated span of the consensus sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    kind: FeatureKind,
    name: String,
    region: Region,
    annotations: Vec<(String, AnnotationValue)>,
}

impl Feature {
    /// A conflict feature over `region`.
    #[must_use]
    pub fn conflict(region: Region) -> Self {
        Self { kind: FeatureKind::Conflict, name: CONFLICT.to_string(), region, annotations: Vec::new() }
    }

    /// A failures feature named `name` over `region`.
    #[must_use]
    pub fn failure(name: impl Into<String>, region: Region) -> Self {
        Self { kind: FeatureKind::Failures, name: name.into(), region, annotations: Vec::new() }
    }

    #[must_use]
    pub fn kind(&self) -> FeatureKind {
        self.kind
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Annotations in insertion order.
    #[must_use]
    pub fn annotations(&self) -> &[(String, AnnotationValue)] {
        &self.annotations
    }

    /// First annotation stored under `key`.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&AnnotationValue> {
        self.annotations.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn add_annotation(&mut self, key: impl Into<String>, value: impl Into<AnnotationValue>) {
        self.annotations.push((key.into(), value.into()));
    }

    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<AnnotationValue>) -> Self {
        self.add_annotation(key, value);
        self
    }

    /// True for the failures feature with the given name.
    #[must_use]
    pub fn is_failure(&self, name: &str) -> bool {
        self.kind == FeatureKind::Failures && self.name == name
    }

    pub(crate) fn set_region(&mut self, region: Region) {
        self.region = region;
    }
}
