//! Coordinate span of one file.

use std::cmp::Ordering;

/// The `[lower, upper]` span of a file's ascending coordinate values.
///
/// Intervals are ordered by their lower bound only; see [`Interval::cmp_lower`].
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    values: Vec<f64>,
    lower: f64,
    upper: f64,
}

impl Interval {
    /// Build an interval from ascending values. Returns `None` for an empty sequence.
    pub fn new(values: Vec<f64>) -> Option<Self> {
        let lower = *values.first()?;
        let upper = *values.last()?;
        Some(Self {
            values,
            lower,
            upper,
        })
    }

    /// First coordinate value.
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Last coordinate value.
    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// The coordinate values the interval was built from.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Consume the interval, returning its coordinate values.
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Compare two intervals by lower bound.
    pub fn cmp_lower(&self, other: &Interval) -> Ordering {
        self.lower.total_cmp(&other.lower)
    }

    /// Whether the two closed spans share at least one point.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.lower <= other.upper && other.lower <= self.upper
    }
}
