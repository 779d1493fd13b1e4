//! Data-processing filters for trace frames
//!
//! Rolling RMS, FIR filtering, moveout correction, depth-axis filters and
//! gap handling. All kernels are NaN-aware (missing samples are skipped, not
//! propagated into aggregates), return new frames, and parallelize their
//! per-column work with Rayon.

use crate::errors::{DasError, Result};
use crate::frame::TraceFrame;
use ndarray::Array2;
use rayon::prelude::*;
use std::str::FromStr;

/// Aggregation applied to each locus group by [`depth_aggregation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationFunction {
    Median,
    Mean,
    Min,
    Max,
}

impl AggregationFunction {
    fn apply(&self, values: &[f64]) -> f64 {
        match self {
            AggregationFunction::Median => nan_median(values),
            AggregationFunction::Mean => nan_mean(values),
            AggregationFunction::Min => nan_min(values),
            AggregationFunction::Max => nan_max(values),
        }
    }
}

impl FromStr for AggregationFunction {
    type Err = DasError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "median" => Ok(AggregationFunction::Median),
            "mean" => Ok(AggregationFunction::Mean),
            "min" => Ok(AggregationFunction::Min),
            "max" => Ok(AggregationFunction::Max),
            other => Err(DasError::ProcessingError(format!(
                "Unknown aggregation function '{}'",
                other
            ))),
        }
    }
}

/// Computes the RMS with a given centered time window.
///
/// For each row, the window covers timestamps within `window_ns / 2` on
/// either side. Rows whose window holds fewer than `min_periods` finite
/// samples produce NaN; the default minimum is one sample.
pub fn rolling_rms(
    frame: &TraceFrame,
    window_ns: i64,
    min_periods: Option<usize>,
) -> Result<TraceFrame> {
    if window_ns <= 0 {
        return Err(DasError::ProcessingError(
            "RMS window must be positive".to_string(),
        ));
    }
    let min_periods = min_periods.unwrap_or(1).max(1);
    let index = frame.index();
    let nrows = frame.nrows();
    let half = window_ns / 2;

    // Window bounds per row, shared by every column
    let mut bounds = Vec::with_capacity(nrows);
    for (row, &stamp) in index.iter().enumerate() {
        let lo = index[..row].partition_point(|&t| t < stamp - half);
        let hi = row + index[row..].partition_point(|&t| t <= stamp + half);
        bounds.push((lo, hi));
    }

    let columns: Vec<Vec<f64>> = (0..frame.ncols())
        .into_par_iter()
        .map(|col| {
            let data = frame.column(col);

            // Prefix sums of squares and finite counts for O(1) window means
            let mut square_sums = Vec::with_capacity(nrows + 1);
            let mut counts = Vec::with_capacity(nrows + 1);
            let mut running_sum = 0.0;
            let mut running_count = 0usize;
            square_sums.push(running_sum);
            counts.push(running_count);
            for &value in data.iter() {
                if value.is_finite() {
                    running_sum += value * value;
                    running_count += 1;
                }
                square_sums.push(running_sum);
                counts.push(running_count);
            }

            bounds
                .iter()
                .map(|&(lo, hi)| {
                    let count = counts[hi] - counts[lo];
                    if count >= min_periods {
                        ((square_sums[hi] - square_sums[lo]) / count as f64).sqrt()
                    } else {
                        f64::NAN
                    }
                })
                .collect()
        })
        .collect();

    frame.with_values(from_columns(nrows, &columns))
}

/// Performs a low-cut (high-pass) FIR filter on every column.
///
/// The filter is a Hamming windowed-sinc design with the tap count forced
/// odd; columns are convolved in "same" mode with zero-padded edges.
pub fn low_cut_filter(
    frame: &TraceFrame,
    numtaps: usize,
    cutoff_hz: f64,
    fs_hz: f64,
) -> Result<TraceFrame> {
    if fs_hz <= 0.0 || cutoff_hz <= 0.0 || cutoff_hz >= fs_hz / 2.0 {
        return Err(DasError::ProcessingError(format!(
            "Cutoff {} Hz must sit inside (0, {}) for sampling rate {} Hz",
            cutoff_hz,
            fs_hz / 2.0,
            fs_hz
        )));
    }

    let numtaps = numtaps | 1;
    let mut taps = windowed_sinc_lowpass(numtaps, cutoff_hz / fs_hz);
    // Spectral inversion turns the low-pass prototype into a high-pass
    for tap in taps.iter_mut() {
        *tap = -*tap;
    }
    taps[numtaps / 2] += 1.0;

    convolve_columns(frame, &taps)
}

/// Performs a moveout correction.
///
/// Each column is shifted in time by `trunc(|locus - channel| * moveout)`
/// samples; the reference channel stays untouched. Vacated rows become NaN.
pub fn moveout_correction(frame: &TraceFrame, channel: i64, moveout: f64) -> Result<TraceFrame> {
    let nrows = frame.nrows();
    let loci = frame.loci();

    let columns: Vec<Vec<f64>> = (0..frame.ncols())
        .into_par_iter()
        .map(|col| {
            let steps = ((loci[col] - channel).abs() as f64 * moveout) as i64;
            let data = frame.column(col);
            (0..nrows as i64)
                .map(|row| {
                    let source = row - steps;
                    if source >= 0 && source < nrows as i64 {
                        data[source as usize]
                    } else {
                        f64::NAN
                    }
                })
                .collect()
        })
        .collect();

    frame.with_values(from_columns(nrows, &columns))
}

/// Performs a median filter along the depth axis.
///
/// A length of 3 removes spikes spanning a single locus. The window is
/// centered and shrinks at the edges (minimum one sample).
pub fn median_depth_filter(frame: &TraceFrame, length: usize) -> Result<TraceFrame> {
    if length == 0 {
        return Err(DasError::ProcessingError(
            "Median filter length must be at least one".to_string(),
        ));
    }
    let nrows = frame.nrows();
    let ncols = frame.ncols();
    let before = (length - 1) / 2;
    let after = length / 2;

    let columns: Vec<Vec<f64>> = (0..ncols)
        .into_par_iter()
        .map(|col| {
            let lo = col.saturating_sub(before);
            let hi = (col + after + 1).min(ncols);
            (0..nrows)
                .map(|row| {
                    let window: Vec<f64> =
                        (lo..hi).map(|c| frame.values()[[row, c]]).collect();
                    nan_median(&window)
                })
                .collect()
        })
        .collect();

    frame.with_values(from_columns(nrows, &columns))
}

/// Groups loci into windows and aggregates each group.
///
/// A window of 10 turns loci 0..=29 into groups 0, 10, 20. A zero window is
/// the identity; a negative window is an error.
pub fn depth_aggregation(
    frame: &TraceFrame,
    aggregation_window: i64,
    function: AggregationFunction,
) -> Result<TraceFrame> {
    if aggregation_window < 0 {
        return Err(DasError::ProcessingError(
            "Aggregation window cannot be less than zero".to_string(),
        ));
    }
    if aggregation_window == 0 {
        return Ok(frame.clone());
    }

    // Group membership per output column, keys ascending
    let keys: Vec<i64> = frame
        .loci()
        .iter()
        .map(|&locus| (locus / aggregation_window) * aggregation_window)
        .collect();
    let members: Vec<(i64, Vec<usize>)> = {
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        sorted.dedup();
        sorted
            .into_iter()
            .map(|key| {
                let columns = keys
                    .iter()
                    .enumerate()
                    .filter_map(|(col, &k)| (k == key).then_some(col))
                    .collect();
                (key, columns)
            })
            .collect()
    };

    let nrows = frame.nrows();
    let columns: Vec<Vec<f64>> = members
        .par_iter()
        .map(|(_, group)| {
            (0..nrows)
                .map(|row| {
                    let values: Vec<f64> =
                        group.iter().map(|&c| frame.values()[[row, c]]).collect();
                    function.apply(&values)
                })
                .collect()
        })
        .collect();

    let loci = members.into_iter().map(|(key, _)| key).collect();
    TraceFrame::new(frame.index().to_vec(), loci, from_columns(nrows, &columns))
}

/// Splits a frame into sub-frames around index gaps longer than `min_gap_ns`.
///
/// A gap strictly greater than the threshold starts a new frame; an empty
/// input yields no frames.
pub fn split_around_gaps(frame: &TraceFrame, min_gap_ns: i64) -> Vec<TraceFrame> {
    if frame.is_empty() {
        return Vec::new();
    }

    let index = frame.index();
    let mut pieces = Vec::new();
    let mut start = 0usize;
    for row in 1..index.len() {
        if index[row] - index[row - 1] > min_gap_ns {
            pieces.push(frame.slice_time(index[start], index[row - 1] + 1));
            start = row;
        }
    }
    pieces.push(frame.slice_time(index[start], i64::MAX));
    pieces
}

/// Resamples in time by an integer decimation factor.
///
/// Columns are low-passed with an anti-alias windowed-sinc filter, then
/// every `dec`-th row is kept along with its timestamp.
pub fn decimate(frame: &TraceFrame, dec: usize) -> Result<TraceFrame> {
    if dec == 0 {
        return Err(DasError::ProcessingError(
            "Decimation factor must be at least one".to_string(),
        ));
    }
    if dec == 1 {
        return Ok(frame.clone());
    }

    let numtaps = 20 * dec + 1;
    let taps = windowed_sinc_lowpass(numtaps, 0.5 / dec as f64);
    let filtered = convolve_columns(frame, &taps)?;

    let index: Vec<i64> = filtered.index().iter().copied().step_by(dec).collect();
    let rows: Vec<usize> = (0..filtered.nrows()).step_by(dec).collect();
    let mut values = Array2::zeros((rows.len(), filtered.ncols()));
    for (out, &row) in rows.iter().enumerate() {
        values.row_mut(out).assign(&filtered.values().row(row));
    }

    TraceFrame::new(index, filtered.loci().to_vec(), values)
}

/// Normalized Hamming windowed-sinc low-pass prototype.
///
/// `fc` is the cutoff as a fraction of the sampling rate, 0 < fc < 0.5.
fn windowed_sinc_lowpass(numtaps: usize, fc: f64) -> Vec<f64> {
    if numtaps <= 1 {
        return vec![1.0];
    }
    let center = (numtaps - 1) as f64 / 2.0;
    let mut taps: Vec<f64> = (0..numtaps)
        .map(|n| {
            let offset = n as f64 - center;
            let sinc = if offset == 0.0 {
                2.0 * fc
            } else {
                (2.0 * std::f64::consts::PI * fc * offset).sin() / (std::f64::consts::PI * offset)
            };
            let window = 0.54
                - 0.46 * (2.0 * std::f64::consts::PI * n as f64 / (numtaps - 1) as f64).cos();
            sinc * window
        })
        .collect();

    let sum: f64 = taps.iter().sum();
    for tap in taps.iter_mut() {
        *tap /= sum;
    }
    taps
}

/// Convolves every column with `taps` in "same" mode, zero-padded edges
fn convolve_columns(frame: &TraceFrame, taps: &[f64]) -> Result<TraceFrame> {
    let nrows = frame.nrows();
    let half = taps.len() / 2;

    let columns: Vec<Vec<f64>> = (0..frame.ncols())
        .into_par_iter()
        .map(|col| {
            let data = frame.column(col);
            (0..nrows)
                .map(|row| {
                    let mut acc = 0.0;
                    for (k, &tap) in taps.iter().enumerate() {
                        let source = row as i64 + k as i64 - half as i64;
                        if source >= 0 && source < nrows as i64 {
                            acc += tap * data[source as usize];
                        }
                    }
                    acc
                })
                .collect()
        })
        .collect();

    frame.with_values(from_columns(nrows, &columns))
}

fn from_columns(nrows: usize, columns: &[Vec<f64>]) -> Array2<f64> {
    let mut values = Array2::zeros((nrows, columns.len()));
    for (col, data) in columns.iter().enumerate() {
        for (row, &value) in data.iter().enumerate() {
            values[[row, col]] = value;
        }
    }
    values
}

/// Mean of the finite values in a slice, NaN when none are finite
pub fn nan_mean(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &value in values {
        if value.is_finite() {
            sum += value;
            count += 1;
        }
    }
    if count > 0 {
        sum / count as f64
    } else {
        f64::NAN
    }
}

/// Median of the finite values in a slice, NaN when none are finite
pub fn nan_median(values: &[f64]) -> f64 {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    finite.sort_by(|a, b| a.total_cmp(b));
    let mid = finite.len() / 2;
    if finite.len() % 2 == 1 {
        finite[mid]
    } else {
        (finite[mid - 1] + finite[mid]) / 2.0
    }
}

/// Minimum of the finite values in a slice, NaN when none are finite
pub fn nan_min(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::NAN, f64::min)
}

/// Maximum of the finite values in a slice, NaN when none are finite
pub fn nan_max(values: &[f64]) -> f64 {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::NAN, f64::max)
}

/// Linear-interpolation quantile of the finite values, NaN when none are
pub fn nan_quantile(values: &[f64], q: f64) -> f64 {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || !(0.0..=1.0).contains(&q) {
        return f64::NAN;
    }
    finite.sort_by(|a, b| a.total_cmp(b));

    let position = q * (finite.len() - 1) as f64;
    let below = position.floor() as usize;
    let above = position.ceil() as usize;
    if below == above {
        finite[below]
    } else {
        let weight = position - below as f64;
        finite[below] * (1.0 - weight) + finite[above] * weight
    }
}
