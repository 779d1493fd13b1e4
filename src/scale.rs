//! Column scalers for trace frames
//!
//! Fitted scalers normalize measurements per locus (or pooled across the
//! whole frame) and can undo the mapping again. Rolling variants normalize
//! against a trailing time window instead of global statistics, which keeps
//! slow drifts out of the scaled signal.

use crate::errors::{DasError, Result};
use crate::frame::TraceFrame;
use crate::processing::{nan_max, nan_mean, nan_min, nan_quantile};
use ndarray::Array2;
use rayon::prelude::*;

/// Whether statistics are computed per column or pooled over all values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Span {
    #[default]
    PerColumn,
    Pooled,
}

/// Common scaling interface: fit statistics, then map values through
/// `(x - offset) / scale` and back.
pub trait Scaler {
    fn fit(&mut self, frame: &TraceFrame) -> Result<()>;
    fn transform(&self, frame: &TraceFrame) -> Result<TraceFrame>;
    fn inverse_transform(&self, frame: &TraceFrame) -> Result<TraceFrame>;

    fn fit_transform(&mut self, frame: &TraceFrame) -> Result<TraceFrame> {
        self.fit(frame)?;
        self.transform(frame)
    }
}

/// Fitted affine parameters; a single pair when pooled
#[derive(Debug, Clone)]
struct Affine {
    span: Span,
    offsets: Vec<f64>,
    scales: Vec<f64>,
}

impl Affine {
    fn apply(&self, frame: &TraceFrame, inverse: bool) -> Result<TraceFrame> {
        if frame.is_empty() {
            return Ok(frame.clone());
        }
        let pooled = self.span == Span::Pooled;
        if !pooled && self.offsets.len() != frame.ncols() {
            return Err(DasError::ProcessingError(format!(
                "Scaler fitted on {} columns, frame has {}",
                self.offsets.len(),
                frame.ncols()
            )));
        }

        let mut values = frame.values().clone();
        for ((_, col), value) in values.indexed_iter_mut() {
            let slot = if pooled { 0 } else { col };
            let (offset, scale) = (self.offsets[slot], self.scales[slot]);
            *value = if inverse {
                *value * scale + offset
            } else {
                (*value - offset) / scale
            };
        }
        frame.with_values(values)
    }
}

fn column_stats<S>(frame: &TraceFrame, span: Span, stat: S) -> Vec<(f64, f64)>
where
    S: Fn(&[f64]) -> (f64, f64) + Sync,
{
    match span {
        Span::Pooled => {
            let all: Vec<f64> = frame.values().iter().copied().collect();
            vec![stat(&all)]
        }
        Span::PerColumn => (0..frame.ncols())
            .into_par_iter()
            .map(|col| {
                let column: Vec<f64> = frame.column(col).to_vec();
                stat(&column)
            })
            .collect(),
    }
}

/// Columns with zero or undefined spread are scaled by one
fn guard_scale(scale: f64) -> f64 {
    if scale == 0.0 || !scale.is_finite() {
        1.0
    } else {
        scale
    }
}

fn fit_affine<S>(frame: &TraceFrame, span: Span, stat: S) -> Affine
where
    S: Fn(&[f64]) -> (f64, f64) + Sync,
{
    let stats = column_stats(frame, span, stat);
    Affine {
        span,
        offsets: stats.iter().map(|s| s.0).collect(),
        scales: stats.iter().map(|s| guard_scale(s.1)).collect(),
    }
}

fn fitted_or_err(fitted: &Option<Affine>) -> Result<&Affine> {
    fitted
        .as_ref()
        .ok_or_else(|| DasError::ProcessingError("Scaler used before fit".to_string()))
}

/// Scales each column to the unit interval from its fitted min and max.
#[derive(Debug, Clone, Default)]
pub struct MinMaxScaler {
    span: Span,
    fitted: Option<Affine>,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool statistics over all values instead of per column
    pub fn pooled() -> Self {
        Self {
            span: Span::Pooled,
            fitted: None,
        }
    }
}

impl Scaler for MinMaxScaler {
    fn fit(&mut self, frame: &TraceFrame) -> Result<()> {
        self.fitted = Some(fit_affine(frame, self.span, |values| {
            let min = nan_min(values);
            let max = nan_max(values);
            (min, max - min)
        }));
        Ok(())
    }

    fn transform(&self, frame: &TraceFrame) -> Result<TraceFrame> {
        fitted_or_err(&self.fitted)?.apply(frame, false)
    }

    fn inverse_transform(&self, frame: &TraceFrame) -> Result<TraceFrame> {
        fitted_or_err(&self.fitted)?.apply(frame, true)
    }
}

/// Centers each column on its mean and scales by its standard deviation.
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    span: Span,
    fitted: Option<Affine>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool statistics over all values instead of per column
    pub fn pooled() -> Self {
        Self {
            span: Span::Pooled,
            fitted: None,
        }
    }
}

impl Scaler for StandardScaler {
    fn fit(&mut self, frame: &TraceFrame) -> Result<()> {
        self.fitted = Some(fit_affine(frame, self.span, |values| {
            let mean = nan_mean(values);
            let deviations: Vec<f64> = values
                .iter()
                .copied()
                .filter(|v| v.is_finite())
                .map(|v| (v - mean) * (v - mean))
                .collect();
            (mean, nan_mean(&deviations).sqrt())
        }));
        Ok(())
    }

    fn transform(&self, frame: &TraceFrame) -> Result<TraceFrame> {
        fitted_or_err(&self.fitted)?.apply(frame, false)
    }

    fn inverse_transform(&self, frame: &TraceFrame) -> Result<TraceFrame> {
        fitted_or_err(&self.fitted)?.apply(frame, true)
    }
}

/// Centers each column on its median and scales by its interquartile range.
#[derive(Debug, Clone, Default)]
pub struct RobustScaler {
    span: Span,
    fitted: Option<Affine>,
}

impl RobustScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool statistics over all values instead of per column
    pub fn pooled() -> Self {
        Self {
            span: Span::Pooled,
            fitted: None,
        }
    }
}

impl Scaler for RobustScaler {
    fn fit(&mut self, frame: &TraceFrame) -> Result<()> {
        self.fitted = Some(fit_affine(frame, self.span, |values| {
            let median = nan_quantile(values, 0.5);
            let iqr = nan_quantile(values, 0.75) - nan_quantile(values, 0.25);
            (median, iqr)
        }));
        Ok(())
    }

    fn transform(&self, frame: &TraceFrame) -> Result<TraceFrame> {
        fitted_or_err(&self.fitted)?.apply(frame, false)
    }

    fn inverse_transform(&self, frame: &TraceFrame) -> Result<TraceFrame> {
        fitted_or_err(&self.fitted)?.apply(frame, true)
    }
}

/// Applies standard scaling against a trailing time window.
///
/// Each value is centered on its window mean and scaled by the window
/// standard deviation; windows with an undefined deviation borrow the next
/// defined one further down the column.
#[derive(Debug, Clone)]
pub struct RollingStandardScaler {
    window_ns: i64,
}

impl RollingStandardScaler {
    pub fn new(window_ns: i64) -> Self {
        Self { window_ns }
    }

    pub fn fit_transform(&self, frame: &TraceFrame) -> Result<TraceFrame> {
        rolling_scale(frame, self.window_ns, |window, value| {
            let mean = nan_mean(window);
            let deviations: Vec<f64> = window
                .iter()
                .copied()
                .filter(|v| v.is_finite())
                .map(|v| (v - mean) * (v - mean))
                .collect();
            // Sample deviation is undefined below two observations
            let std = if deviations.len() < 2 {
                f64::NAN
            } else {
                (deviations.iter().sum::<f64>() / (deviations.len() - 1) as f64).sqrt()
            };
            (value - mean, std)
        })
    }
}

/// Applies robust scaling against a trailing time window.
///
/// Each value is centered on its window median and scaled by the window
/// interquartile range.
#[derive(Debug, Clone)]
pub struct RollingRobustScaler {
    window_ns: i64,
}

impl RollingRobustScaler {
    pub fn new(window_ns: i64) -> Self {
        Self { window_ns }
    }

    pub fn fit_transform(&self, frame: &TraceFrame) -> Result<TraceFrame> {
        rolling_scale(frame, self.window_ns, |window, value| {
            let median = nan_quantile(window, 0.5);
            let iqr = nan_quantile(window, 0.75) - nan_quantile(window, 0.25);
            (value - median, iqr)
        })
    }
}

/// Shared trailing-window machinery: `stat` turns a window and the current
/// value into a centered numerator and a scale; NaN scales are back-filled
/// per column before dividing.
fn rolling_scale<S>(frame: &TraceFrame, window_ns: i64, stat: S) -> Result<TraceFrame>
where
    S: Fn(&[f64], f64) -> (f64, f64) + Sync,
{
    if window_ns <= 0 {
        return Err(DasError::ProcessingError(
            "Rolling window must be positive".to_string(),
        ));
    }
    if frame.is_empty() {
        return Ok(frame.clone());
    }

    let index = frame.index();
    let nrows = frame.nrows();

    let mut starts = Vec::with_capacity(nrows);
    for (row, &stamp) in index.iter().enumerate() {
        let lo = index[..=row].partition_point(|&t| t < stamp - window_ns);
        starts.push(lo);
    }

    let columns: Vec<Vec<f64>> = (0..frame.ncols())
        .into_par_iter()
        .map(|col| {
            let data: Vec<f64> = frame.column(col).to_vec();

            let mut centered = Vec::with_capacity(nrows);
            let mut scales = Vec::with_capacity(nrows);
            for row in 0..nrows {
                let window = &data[starts[row]..=row];
                let (numerator, scale) = stat(window, data[row]);
                centered.push(numerator);
                scales.push(scale);
            }

            // Back-fill undefined scales from later rows
            let mut next_valid = f64::NAN;
            for row in (0..nrows).rev() {
                if scales[row].is_finite() {
                    next_valid = scales[row];
                } else {
                    scales[row] = next_valid;
                }
            }

            (0..nrows).map(|row| centered[row] / scales[row]).collect()
        })
        .collect();

    let mut values = Array2::zeros((nrows, frame.ncols()));
    for (col, data) in columns.iter().enumerate() {
        for (row, &value) in data.iter().enumerate() {
            values[[row, col]] = value;
        }
    }
    frame.with_values(values)
}
