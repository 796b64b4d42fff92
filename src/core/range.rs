use serde::{Deserialize, Serialize};

/// Closed `i16` interval `[start, end]`.
///
/// The empty value stores `(i16::MAX, i16::MIN)`, so expanding it by any value
/// yields the single-value range of that value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InclusiveRange {
    pub start: i16,
    pub end: i16,
}

impl Default for InclusiveRange {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl InclusiveRange {
    pub const EMPTY: InclusiveRange = InclusiveRange {
        start: i16::MAX,
        end: i16::MIN,
    };

    pub const fn new(start: i16, end: i16) -> Self {
        Self { start, end }
    }

    pub const fn single(value: i16) -> Self {
        Self {
            start: value,
            end: value,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn expand(&mut self, value: i16) {
        self.start = self.start.min(value);
        self.end = self.end.max(value);
    }

    /// Smallest range covering both inputs.
    pub fn merge(a: InclusiveRange, b: InclusiveRange) -> InclusiveRange {
        InclusiveRange {
            start: a.start.min(b.start),
            end: a.end.max(b.end),
        }
    }

    /// Intersects the range with `[lo, hi]`; a range lying entirely outside becomes empty.
    pub fn clamp(&mut self, lo: i16, hi: i16) {
        self.start = self.start.max(lo);
        self.end = self.end.min(hi);
        if self.start > self.end {
            *self = Self::EMPTY;
        }
    }

    pub fn contains(&self, value: i16) -> bool {
        self.start <= value && value <= self.end
    }

    /// Number of values covered.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.end as i32 - self.start as i32 + 1) as usize
        }
    }
}

/// View-space depth interval of a light volume, never negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthRange {
    pub min: f32,
    pub max: f32,
}

impl Default for DepthRange {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl DepthRange {
    /// Stored for lights that were skipped; bins nothing.
    pub const EMPTY: DepthRange = DepthRange {
        min: f32::MAX,
        max: 0.0,
    };

    /// Builds a range truncated at the camera plane.
    pub fn new(min: f32, max: f32) -> Self {
        Self {
            min: min.max(0.0),
            max: max.max(0.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.min <= self.max)
    }
}
