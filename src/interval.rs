//! Interval index manipulation and interval-based caching
//!
//! Intervals are half-open `[left, right)` over `i64` values. Plain sample
//! numbers and UTC nanosecond timestamps both work, and the threshold passed
//! to the continuity helpers carries the same unit as the interval bounds.

use crate::errors::{DasError, Result};
use crate::frame::TraceFrame;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A half-open interval `[left, right)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub left: i64,
    pub right: i64,
}

impl Interval {
    pub fn new(left: i64, right: i64) -> Result<Self> {
        if left > right {
            return Err(DasError::IntervalError {
                message: format!("Interval left {} exceeds right {}", left, right),
            });
        }
        Ok(Self { left, right })
    }

    pub fn length(&self) -> i64 {
        self.right - self.left
    }

    pub fn is_empty(&self) -> bool {
        self.left == self.right
    }

    pub fn contains(&self, value: i64) -> bool {
        self.left <= value && value < self.right
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.left < other.right && other.left < self.right
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.left, self.right)
    }
}

/// Splits a list of intervals into runs of continuous intervals.
///
/// Intervals are sorted first; two neighbours belong to the same run when
/// the gap between the run's right edge so far and the next left edge is at
/// most `threshold`. Overlapping and nested intervals are always continuous.
pub fn find_continuous_runs(intervals: &[Interval], threshold: i64) -> Vec<Vec<Interval>> {
    if intervals.is_empty() {
        return Vec::new();
    }

    let mut sorted = intervals.to_vec();
    sorted.sort_by_key(|iv| (iv.left, iv.right));

    let mut runs: Vec<Vec<Interval>> = Vec::new();
    let mut current = vec![sorted[0]];
    let mut right_edge = sorted[0].right;

    for &interval in &sorted[1..] {
        if interval.left - right_edge <= threshold {
            current.push(interval);
        } else {
            runs.push(std::mem::take(&mut current));
            current.push(interval);
        }
        right_edge = right_edge.max(interval.right);
    }
    runs.push(current);
    runs
}

/// Combines continuous (or overlapping) intervals.
///
/// Each run collapses to a single interval spanning its extremes; the
/// result is sorted and gaps between entries exceed `threshold`.
pub fn merge_continuous(intervals: &[Interval], threshold: i64) -> Vec<Interval> {
    find_continuous_runs(intervals, threshold)
        .into_iter()
        .map(|run| {
            let left = run.iter().map(|iv| iv.left).min().unwrap_or(0);
            let right = run.iter().map(|iv| iv.right).max().unwrap_or(0);
            Interval { left, right }
        })
        .collect()
}

/// Adds an interval to a continuous (non-overlapping) interval index.
///
/// A disjoint interval is inserted, a partially overlapping one extends the
/// existing entry, and a fully covered one changes nothing.
pub fn add_interval(index: &[Interval], other: Interval) -> Vec<Interval> {
    let mut extended = index.to_vec();
    extended.push(other);
    merge_continuous(&extended, 0)
}

/// Subtracts an interval from a continuous interval index.
///
/// A disjoint interval changes nothing, a partial overlap shortens the
/// entry, and an interval strictly inside an entry splits it in two.
pub fn subtract_interval(index: &[Interval], other: Interval) -> Vec<Interval> {
    let mut result = Vec::with_capacity(index.len() + 1);
    for interval in index {
        if !interval.overlaps(&other) {
            result.push(*interval);
            continue;
        }
        if interval.left < other.left {
            result.push(Interval {
                left: interval.left,
                right: other.left,
            });
        }
        if other.right < interval.right {
            result.push(Interval {
                left: other.right,
                right: interval.right,
            });
        }
    }
    result
}

/// Serialized form of an interval index
///
/// A fixed-frequency index stores only its `start`, `end` and `freq`; any
/// other index stores the full `left` and `right` arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerializedIntervals {
    Range { start: i64, end: i64, freq: i64 },
    Arrays { left: Vec<i64>, right: Vec<i64> },
}

/// Serializes an interval index, preferring the compact range form.
///
/// The chosen representation is deserialized again and compared against the
/// input; an index that survives neither representation is an error.
pub fn serialize_intervals(intervals: &[Interval]) -> Result<SerializedIntervals> {
    if intervals.is_empty() {
        return Ok(SerializedIntervals::Arrays {
            left: Vec::new(),
            right: Vec::new(),
        });
    }

    let range = SerializedIntervals::Range {
        start: intervals[0].left,
        end: intervals[intervals.len() - 1].right,
        freq: intervals[0].length(),
    };
    let arrays = SerializedIntervals::Arrays {
        left: intervals.iter().map(|iv| iv.left).collect(),
        right: intervals.iter().map(|iv| iv.right).collect(),
    };

    for candidate in [range, arrays] {
        if let Ok(roundtrip) = deserialize_intervals(&candidate) {
            if roundtrip == intervals {
                return Ok(candidate);
            }
        }
    }

    Err(DasError::IntervalError {
        message: "Serialization failed to round-trip".to_string(),
    })
}

/// Deserializes a serialized interval index.
pub fn deserialize_intervals(serialized: &SerializedIntervals) -> Result<Vec<Interval>> {
    match serialized {
        SerializedIntervals::Range { start, end, freq } => {
            if *freq <= 0 {
                return Err(DasError::IntervalError {
                    message: format!("Range frequency must be positive, got {}", freq),
                });
            }
            let mut intervals = Vec::new();
            let mut left = *start;
            while left + freq <= *end {
                intervals.push(Interval {
                    left,
                    right: left + freq,
                });
                left += freq;
            }
            Ok(intervals)
        }
        SerializedIntervals::Arrays { left, right } => {
            if left.len() != right.len() {
                return Err(DasError::IntervalError {
                    message: format!(
                        "Array lengths differ: {} left, {} right",
                        left.len(),
                        right.len()
                    ),
                });
            }
            left.iter()
                .zip(right.iter())
                .map(|(&l, &r)| Interval::new(l, r))
                .collect()
        }
    }
}

struct CacheEntry {
    intervals: Vec<Interval>,
    frame: Option<TraceFrame>,
}

/// Interval-aware cache around a data-fetching function.
///
/// Useful when the same or overlapping time ranges are requested
/// repeatedly: each request subtracts the intervals already held for the id
/// and fetches only the missing sub-ranges. Requesting `[3, 4)` and then
/// `[2, 5)` turns the second call into two fetches, `[2, 3)` and `[4, 5)`.
pub struct IntervalCache<F>
where
    F: FnMut(&str, i64, i64) -> Result<TraceFrame>,
{
    fetch: F,
    entries: HashMap<String, CacheEntry>,
}

impl<F> IntervalCache<F>
where
    F: FnMut(&str, i64, i64) -> Result<TraceFrame>,
{
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            entries: HashMap::new(),
        }
    }

    /// Returns the frame for `[start_time, end_time)`, fetching only the
    /// sub-ranges not already cached for this id.
    pub fn get(&mut self, id: &str, start_time: i64, end_time: i64) -> Result<TraceFrame> {
        if start_time >= end_time {
            return Err(DasError::IntervalError {
                message: format!(
                    "Requested range [{}, {}) is empty or inverted",
                    start_time, end_time
                ),
            });
        }

        let entry = self.entries.entry(id.to_string()).or_insert(CacheEntry {
            intervals: Vec::new(),
            frame: None,
        });

        let mut missing = vec![Interval {
            left: start_time,
            right: end_time,
        }];
        for cached in &entry.intervals {
            missing = subtract_interval(&missing, *cached);
        }

        debug!(
            "cache request id={} range=[{}, {}) missing={}",
            id,
            start_time,
            end_time,
            missing.len()
        );

        for gap in missing {
            let fetched = (self.fetch)(id, gap.left, gap.right)?;
            entry.frame = Some(match entry.frame.take() {
                Some(held) => held.concat(&fetched)?,
                None => fetched,
            });
            entry.intervals = add_interval(&entry.intervals, gap);
        }

        match &entry.frame {
            Some(frame) => Ok(frame.slice_time(start_time, end_time)),
            None => Ok(TraceFrame::empty(Vec::new())),
        }
    }

    /// Intervals currently held for an id, mostly for diagnostics
    pub fn cached_intervals(&self, id: &str) -> &[Interval] {
        self.entries
            .get(id)
            .map(|entry| entry.intervals.as_slice())
            .unwrap_or(&[])
    }
}
