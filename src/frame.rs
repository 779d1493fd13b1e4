//! Time-by-depth trace frames
//!
//! A [`TraceFrame`] is the in-memory unit of fiber data: rows are UTC
//! timestamps in nanoseconds, columns are loci (sensor positions along the
//! fiber), values are measurements. The index is kept non-decreasing so row
//! slicing and gap detection are single passes.

use crate::errors::{DasError, Result};
use ndarray::{Array2, Axis};

/// Two-dimensional trace data with a time index and locus columns
#[derive(Debug, Clone, PartialEq)]
pub struct TraceFrame {
    index: Vec<i64>,
    loci: Vec<i64>,
    values: Array2<f64>,
}

impl TraceFrame {
    /// Builds a frame, validating that the value shape matches the index and
    /// locus lengths and that the index is non-decreasing.
    pub fn new(index: Vec<i64>, loci: Vec<i64>, values: Array2<f64>) -> Result<Self> {
        if values.nrows() != index.len() || values.ncols() != loci.len() {
            return Err(DasError::FrameError {
                message: format!(
                    "Value shape ({}, {}) does not match index length {} and locus count {}",
                    values.nrows(),
                    values.ncols(),
                    index.len(),
                    loci.len()
                ),
            });
        }
        if index.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(DasError::FrameError {
                message: "Frame index must be non-decreasing".to_string(),
            });
        }
        Ok(Self {
            index,
            loci,
            values,
        })
    }

    /// An empty frame sharing the given locus layout
    pub fn empty(loci: Vec<i64>) -> Self {
        let columns = loci.len();
        Self {
            index: Vec::new(),
            loci,
            values: Array2::zeros((0, columns)),
        }
    }

    pub fn index(&self) -> &[i64] {
        &self.index
    }

    pub fn loci(&self) -> &[i64] {
        &self.loci
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn nrows(&self) -> usize {
        self.index.len()
    }

    pub fn ncols(&self) -> usize {
        self.loci.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Replaces the values while keeping index and loci, validating shape
    pub fn with_values(&self, values: Array2<f64>) -> Result<Self> {
        Self::new(self.index.clone(), self.loci.clone(), values)
    }

    /// Rows with timestamps in the half-open range `[start, end)`
    pub fn slice_time(&self, start: i64, end: i64) -> Self {
        let from = self.index.partition_point(|&t| t < start);
        let to = self.index.partition_point(|&t| t < end);
        Self {
            index: self.index[from..to].to_vec(),
            loci: self.loci.clone(),
            values: self.values.slice(ndarray::s![from..to, ..]).to_owned(),
        }
    }

    /// Merges the rows of two frames over the same loci, sorted by time.
    ///
    /// On duplicate timestamps the row already present in `self` wins.
    pub fn concat(&self, other: &TraceFrame) -> Result<Self> {
        if self.loci != other.loci {
            return Err(DasError::FrameError {
                message: "Cannot concatenate frames with different loci".to_string(),
            });
        }
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.is_empty() {
            return Ok(other.clone());
        }

        let total = self.nrows() + other.nrows();
        let mut index = Vec::with_capacity(total);
        let mut values = Array2::zeros((total, self.ncols()));

        let (mut i, mut j, mut out) = (0, 0, 0);
        while i < self.nrows() || j < other.nrows() {
            let take_self = match (self.index.get(i), other.index.get(j)) {
                (Some(&a), Some(&b)) => {
                    if a == b {
                        // Duplicate timestamp: keep self's row, drop other's
                        j += 1;
                        true
                    } else {
                        a < b
                    }
                }
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };

            if take_self {
                index.push(self.index[i]);
                values.row_mut(out).assign(&self.values.row(i));
                i += 1;
            } else {
                index.push(other.index[j]);
                values.row_mut(out).assign(&other.values.row(j));
                j += 1;
            }
            out += 1;
        }

        values = values.slice(ndarray::s![..out, ..]).to_owned();
        Ok(Self {
            index,
            loci: self.loci.clone(),
            values,
        })
    }

    /// The fixed index frequency in nanoseconds, if the index has one
    pub fn inferred_freq(&self) -> Option<i64> {
        if self.index.len() < 2 {
            return None;
        }
        let freq = self.index[1] - self.index[0];
        if freq > 0 && self.index.windows(2).all(|pair| pair[1] - pair[0] == freq) {
            Some(freq)
        } else {
            None
        }
    }

    /// The smallest positive step between consecutive timestamps
    pub fn min_gap(&self) -> Option<i64> {
        self.index
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .filter(|&gap| gap > 0)
            .min()
    }

    /// Resamples the frame onto a regular grid at its minimal time gap.
    ///
    /// Grid points with no source row are forward-filled from the previous
    /// row for up to `ffill_limit` consecutive steps, then left as NaN.
    /// Frames without at least two distinct timestamps pass through.
    pub fn resample_min_gap(&self, ffill_limit: usize) -> Result<Self> {
        let freq = match self.min_gap() {
            Some(freq) => freq,
            None => return Ok(self.clone()),
        };

        let start = self.index[0];
        let end = self.index[self.index.len() - 1];
        let steps = ((end - start) / freq) as usize + 1;

        let mut index = Vec::with_capacity(steps);
        let mut values = Array2::from_elem((steps, self.ncols()), f64::NAN);

        let mut source = 0usize;
        let mut last_filled: Option<usize> = None;
        for step in 0..steps {
            let stamp = start + freq * step as i64;
            index.push(stamp);

            // Advance to the last source row at or before this grid point
            while source + 1 < self.nrows() && self.index[source + 1] <= stamp {
                source += 1;
            }

            if self.index[source] == stamp {
                values.row_mut(step).assign(&self.values.row(source));
                last_filled = Some(step);
            } else if let Some(filled) = last_filled {
                if step - filled <= ffill_limit {
                    let previous = values.row(filled).to_owned();
                    values.row_mut(step).assign(&previous);
                }
            }
        }

        Self::new(index, self.loci.clone(), values)
    }

    /// Column-major iteration helper used by the processing kernels
    pub fn column(&self, col: usize) -> ndarray::ArrayView1<'_, f64> {
        self.values.index_axis(Axis(1), col)
    }
}
