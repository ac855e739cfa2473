//! Builder sessions: contiguous runs of data points.

use crate::data_point::DataPoint;

/// Data points for one contiguous sub-range `[start, end)` of main-sequence positions.
///
/// A consensus is built from up to three sessions registered left to right: the start
/// extension, the main range and the end extension.
#[derive(Debug, Clone, Default)]
pub struct BuilderSession {
    start: i64,
    end: i64,
    points: Vec<DataPoint>,
}

impl BuilderSession {
    /// Creates an empty session for `[start, end)`.
    #[must_use]
    pub fn new(start: i64, end: i64) -> Self {
        let capacity = usize::try_from(end - start).unwrap_or(0);
        Self { start, end, points: Vec::with_capacity(capacity) }
    }

    /// Appends the next data point.
    pub fn push(&mut self, point: DataPoint) {
        self.points.push(point);
    }

    #[must_use]
    pub fn start(&self) -> i64 {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> i64 {
        self.end
    }

    /// Number of data points, insertion columns included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }
}
