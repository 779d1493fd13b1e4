//! Plotting-axis helpers
//!
//! Rendering belongs to the plotting collaborator; this module computes the
//! inputs it needs: tick positions on time and locus axes, tick labels
//! with the shared prefix elided, and a fully resolved raster-plot
//! description for trace frames.

use crate::errors::{DasError, Result};
use crate::frame::TraceFrame;
use crate::params::{resolve, CallArgs, DefaultRegistry, ParamSpec, ParamValue};
use crate::processing::nan_quantile;
use chrono::{DateTime, Datelike, Timelike, Utc};

const NANOS_PER_DAY: i64 = 86_400_000_000_000;

/// Tick frequencies considered for time axes, finest first
const TICK_FREQS_NS: [i64; 37] = [
    1_000,
    2_000,
    5_000,
    10_000,
    20_000,
    50_000,
    100_000,
    200_000,
    500_000,
    1_000_000,
    2_000_000,
    5_000_000,
    10_000_000,
    20_000_000,
    50_000_000,
    100_000_000,
    200_000_000,
    500_000_000,
    1_000_000_000,
    5_000_000_000,
    10_000_000_000,
    15_000_000_000,
    30_000_000_000,
    60_000_000_000,
    300_000_000_000,
    600_000_000_000,
    900_000_000_000,
    1_800_000_000_000,
    3_600_000_000_000,
    7_200_000_000_000,
    10_800_000_000_000,
    21_600_000_000_000,
    43_200_000_000_000,
    86_400_000_000_000,
    259_200_000_000_000,
    604_800_000_000_000,
    1_209_600_000_000_000,
];

/// Computes tick positions for a time axis over `[min_ns, max_ns]`.
///
/// The tick frequency is the finest ladder entry that yields at most
/// `max_ticks` ticks; spans beyond a fortnight per tick switch to month
/// starts, beyond half a year per tick to year starts.
pub fn time_ticks(min_ns: i64, max_ns: i64, max_ticks: usize) -> Vec<i64> {
    if max_ns <= min_ns {
        return Vec::new();
    }
    let numticks = max_ticks.max(2) as i64;
    let target_freq = (max_ns - min_ns) / numticks;

    if target_freq > 365 * NANOS_PER_DAY / 2 {
        let step = (target_freq + 365 * NANOS_PER_DAY - 1) / (365 * NANOS_PER_DAY);
        return year_start_ticks(min_ns, max_ns, step.max(1) as i32);
    }
    if target_freq > 31 * NANOS_PER_DAY / 2 {
        let step = (target_freq + 31 * NANOS_PER_DAY - 1) / (31 * NANOS_PER_DAY);
        return month_start_ticks(min_ns, max_ns, step.max(1) as u32);
    }

    let freq = TICK_FREQS_NS
        .iter()
        .copied()
        .find(|&f| target_freq < f)
        .unwrap_or(TICK_FREQS_NS[TICK_FREQS_NS.len() - 1]);

    let first = min_ns.div_euclid(freq) * freq;
    let first = if first < min_ns { first + freq } else { first };
    let mut ticks = Vec::new();
    let mut tick = first;
    while tick <= max_ns {
        ticks.push(tick);
        tick += freq;
    }
    ticks
}

fn year_start_ticks(min_ns: i64, max_ns: i64, step: i32) -> Vec<i64> {
    let start_year = crate::parse::time_from_nanos(min_ns).year();
    let mut ticks = Vec::new();
    let mut year = start_year;
    loop {
        match ymd_to_nanos(year, 1, 1) {
            Some(tick) => {
                if tick > max_ns {
                    break;
                }
                if tick >= min_ns {
                    ticks.push(tick);
                }
            }
            None => break,
        }
        year += step;
    }
    ticks
}

fn month_start_ticks(min_ns: i64, max_ns: i64, step: u32) -> Vec<i64> {
    let start = crate::parse::time_from_nanos(min_ns);
    let mut year = start.year();
    let mut month = start.month();
    let mut ticks = Vec::new();
    loop {
        match ymd_to_nanos(year, month, 1) {
            Some(tick) => {
                if tick > max_ns {
                    break;
                }
                if tick >= min_ns {
                    ticks.push(tick);
                }
            }
            None => break,
        }
        let advanced = month as i64 - 1 + step as i64;
        year += (advanced / 12) as i32;
        month = (advanced % 12) as u32 + 1;
    }
    ticks
}

fn ymd_to_nanos(year: i32, month: u32, day: u32) -> Option<i64> {
    let date = chrono::NaiveDate::from_ymd_opt(year, month, day)?;
    let naive = date.and_hms_opt(0, 0, 0)?;
    naive.and_utc().timestamp_nanos_opt()
}

/// Datetime components in coarse-to-fine order, microsecond resolution
fn components(time: &DateTime<Utc>) -> [u32; 7] {
    [
        time.year() as u32,
        time.month(),
        time.day(),
        time.hour(),
        time.minute(),
        time.second(),
        time.nanosecond() / 1_000,
    ]
}

/// Index of the coarsest component differing between two timestamps
fn coarsest_difference(a: &DateTime<Utc>, b: &DateTime<Utc>) -> usize {
    let (ca, cb) = (components(a), components(b));
    (0..7).find(|&i| ca[i] != cb[i]).unwrap_or(0)
}

/// Index of the finest component differing between two timestamps
fn finest_difference(a: &DateTime<Utc>, b: &DateTime<Utc>) -> usize {
    let (ca, cb) = (components(a), components(b));
    (0..7).rev().find(|&i| ca[i] != cb[i]).unwrap_or(0)
}

const FORMAT_PARTS: [&str; 7] = ["%Y", "-%m", "-%d", " %H", ":%M", ":%S", ".%6f"];

fn format_range(largest: usize, smallest: usize) -> String {
    let mut format = FORMAT_PARTS[largest..=smallest].concat();
    if largest > 0 {
        // Drop the separator belonging to the elided coarser component
        format.remove(0);
    }
    format
}

/// Formats tick labels, keeping only the components that vary.
///
/// The coarsest varying component between the first and last tick opens the
/// label, the finest varying component between neighbours closes it, and
/// trailing sub-second zeros shared by every label are trimmed.
pub fn format_time_ticks(ticks: &[i64]) -> Vec<String> {
    let times: Vec<DateTime<Utc>> = ticks.iter().map(|&t| crate::parse::time_from_nanos(t)).collect();
    if times.len() < 2 {
        return times
            .iter()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S%.6f").to_string())
            .collect();
    }

    let largest = coarsest_difference(&times[0], &times[times.len() - 1]);
    let smallest = finest_difference(&times[0], &times[1]).max(largest);
    let format = format_range(largest, smallest);

    let mut labels: Vec<String> = times.iter().map(|t| t.format(&format).to_string()).collect();

    if format.ends_with("%6f") {
        while labels.iter().all(|l| l.ends_with('0')) {
            for label in labels.iter_mut() {
                label.pop();
            }
        }
        if labels.iter().all(|l| l.ends_with('.')) {
            for label in labels.iter_mut() {
                label.pop();
            }
        }
    }
    labels
}

/// The elided common prefix of the tick labels, shown once beside the axis
pub fn time_tick_offset(ticks: &[i64]) -> String {
    if ticks.is_empty() {
        return String::new();
    }
    let first = crate::parse::time_from_nanos(ticks[0]);
    let last = crate::parse::time_from_nanos(ticks[ticks.len() - 1]);
    let largest = coarsest_difference(&first, &last);
    if largest == 0 {
        return String::new();
    }
    let format = FORMAT_PARTS[..largest].concat();
    first.format(&format).to_string()
}

/// Integer tick positions for a locus axis on a 1/2/5 decade step
pub fn loci_ticks(min: f64, max: f64, max_ticks: usize) -> Vec<i64> {
    if !min.is_finite() || !max.is_finite() || max <= min {
        return Vec::new();
    }
    let numticks = max_ticks.max(2) as f64;
    let target = (max - min) / numticks;

    let mut step = 1i64;
    'outer: for exponent in 0..18 {
        for base in [1i64, 2, 5] {
            step = base * 10i64.pow(exponent);
            if step as f64 > target {
                break 'outer;
            }
        }
    }

    let first = (min / step as f64).ceil() as i64 * step;
    let mut ticks = Vec::new();
    let mut tick = first;
    while (tick as f64) <= max {
        ticks.push(tick);
        tick += step;
    }
    ticks
}

/// Fully resolved raster-plot parameters for a trace frame
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSpec {
    pub colormap: String,
    pub aspect: String,
    pub interpolation: String,
    pub colorbar: bool,
    pub figsize: (f64, f64),
    pub vmin: f64,
    pub vmax: f64,
}

/// Prepares a frame and a [`RasterSpec`] for the rendering collaborator.
///
/// Style parameters resolve through the default registry with the usual
/// raw-data defaults (seismic colormap, auto aspect, no interpolation).
/// When `resample` is on (the default) the frame is regridded to its
/// minimal time gap so a linear axis shows correct labels; single-sample
/// gaps are interpolated unless `skip_single_gaps` is off. Color limits
/// default to the 1 % and 99 % quantiles of the finite values.
pub fn raster_spec(
    frame: &TraceFrame,
    args: &CallArgs,
    registry: &DefaultRegistry,
) -> Result<(TraceFrame, RasterSpec)> {
    if frame.is_empty() {
        return Err(DasError::FrameError {
            message: "Cannot build a raster spec from an empty frame".to_string(),
        });
    }

    let specs = [
        ParamSpec::str("cmap").fallback("seismic"),
        ParamSpec::choice("aspect", ["auto", "equal"]).fallback("auto"),
        ParamSpec::str("interpolation").fallback("none"),
        ParamSpec::bool("colorbar").fallback(false),
        ParamSpec::bool("resample").fallback(true),
        ParamSpec::bool("skip_single_gaps").fallback(true),
        ParamSpec::range("figwidth", 1.0, 100.0).fallback(12.0),
        ParamSpec::range("figheight", 1.0, 100.0).fallback(6.0),
    ];
    let resolved = resolve(args, &specs, registry)?;

    let prepared = if resolved.bool("resample").unwrap_or(true) {
        let ffill_limit = if resolved.bool("skip_single_gaps").unwrap_or(true) {
            2
        } else {
            0
        };
        frame.resample_min_gap(ffill_limit)?
    } else {
        frame.clone()
    };

    let flat: Vec<f64> = prepared.values().iter().copied().collect();
    let vmin = match args.get("vmin").map(ParamValue::as_float) {
        Some(Some(value)) => value,
        _ => nan_quantile(&flat, 0.01),
    };
    let vmax = match args.get("vmax").map(ParamValue::as_float) {
        Some(Some(value)) => value,
        _ => nan_quantile(&flat, 0.99),
    };

    let spec = RasterSpec {
        colormap: resolved.str("cmap").unwrap_or("seismic").to_string(),
        aspect: resolved.str("aspect").unwrap_or("auto").to_string(),
        interpolation: resolved.str("interpolation").unwrap_or("none").to_string(),
        colorbar: resolved.bool("colorbar").unwrap_or(false),
        figsize: (
            resolved.float("figwidth").unwrap_or(12.0),
            resolved.float("figheight").unwrap_or(6.0),
        ),
        vmin,
        vmax,
    };

    Ok((prepared, spec))
}
