//! Tests for trace frames, processing filters, scalers and plot helpers

use das_common::frame::TraceFrame;
use das_common::parallel::ParallelConfig;
use das_common::params::{CallArgs, DefaultRegistry};
use das_common::plot::{
    format_time_ticks, loci_ticks, raster_spec, time_tick_offset, time_ticks,
};
use das_common::processing::{
    decimate, depth_aggregation, low_cut_filter, median_depth_filter, moveout_correction,
    nan_quantile, rolling_rms, split_around_gaps, AggregationFunction,
};
use das_common::scale::{
    MinMaxScaler, RobustScaler, RollingRobustScaler, RollingStandardScaler, Scaler,
    StandardScaler,
};
use das_common::DasError;
use ndarray::{array, Array2};

const SECOND: i64 = 1_000_000_000;

fn frame_from(index: Vec<i64>, loci: Vec<i64>, values: Array2<f64>) -> TraceFrame {
    TraceFrame::new(index, loci, values).expect("valid test frame")
}

fn seconds(count: usize) -> Vec<i64> {
    (0..count as i64).map(|s| s * SECOND).collect()
}

#[test]
fn test_frame_construction_validation() {
    let values = Array2::<f64>::zeros((2, 3));
    assert!(TraceFrame::new(vec![0, 1], vec![0, 1, 2], values.clone()).is_ok());

    // Shape mismatches are rejected
    assert!(TraceFrame::new(vec![0], vec![0, 1, 2], values.clone()).is_err());
    assert!(TraceFrame::new(vec![0, 1], vec![0, 1], values.clone()).is_err());

    // The index must be non-decreasing
    assert!(TraceFrame::new(vec![1, 0], vec![0, 1, 2], values).is_err());
}

#[test]
fn test_frame_slice_and_freq() {
    let frame = frame_from(
        vec![0, SECOND, 2 * SECOND, 3 * SECOND],
        vec![0],
        array![[1.0], [2.0], [3.0], [4.0]],
    );

    let sliced = frame.slice_time(SECOND, 3 * SECOND);
    assert_eq!(sliced.index(), &[SECOND, 2 * SECOND]);
    assert_eq!(sliced.values(), &array![[2.0], [3.0]]);

    assert_eq!(frame.inferred_freq(), Some(SECOND));
    assert_eq!(frame.min_gap(), Some(SECOND));

    let irregular = frame_from(vec![0, SECOND, 10 * SECOND], vec![0], array![[1.0], [2.0], [3.0]]);
    assert_eq!(irregular.inferred_freq(), None);
    assert_eq!(irregular.min_gap(), Some(SECOND));
}

#[test]
fn test_frame_concat_keeps_first_on_duplicates() {
    let first = frame_from(vec![0, 2], vec![0], array![[1.0], [3.0]]);
    let second = frame_from(vec![1, 2], vec![0], array![[2.0], [99.0]]);

    let merged = first.concat(&second).unwrap();
    assert_eq!(merged.index(), &[0, 1, 2]);
    assert_eq!(merged.values(), &array![[1.0], [2.0], [3.0]]);

    // Loci must line up
    let other_loci = frame_from(vec![0], vec![5], array![[1.0]]);
    assert!(first.concat(&other_loci).is_err());
}

#[test]
fn test_frame_resample_min_gap() {
    let frame = frame_from(vec![0, 10, 30], vec![0], array![[1.0], [2.0], [3.0]]);

    let filled = frame.resample_min_gap(2).unwrap();
    assert_eq!(filled.index(), &[0, 10, 20, 30]);
    assert_eq!(filled.values()[[2, 0]], 2.0);
    assert_eq!(filled.values()[[3, 0]], 3.0);

    // Limit zero leaves the gap as NaN
    let unfilled = frame.resample_min_gap(0).unwrap();
    assert!(unfilled.values()[[2, 0]].is_nan());
}

#[test]
fn test_rolling_rms() {
    let frame = frame_from(seconds(3), vec![0], array![[3.0], [4.0], [5.0]]);

    // A window wider than the frame covers every sample from every row
    let wide = rolling_rms(&frame, 10 * SECOND, None).unwrap();
    let expected = ((9.0 + 16.0 + 25.0) / 3.0f64).sqrt();
    for row in 0..3 {
        assert!((wide.values()[[row, 0]] - expected).abs() < 1e-12);
    }

    // A degenerate window sees only the sample itself
    let narrow = rolling_rms(&frame, 1, None).unwrap();
    assert!((narrow.values()[[1, 0]] - 4.0).abs() < 1e-12);

    // min_periods above the window population yields NaN
    let starved = rolling_rms(&frame, 1, Some(2)).unwrap();
    assert!(starved.values()[[0, 0]].is_nan());

    assert!(rolling_rms(&frame, 0, None).is_err());
}

#[test]
fn test_rolling_rms_skips_nan() {
    let frame = frame_from(seconds(3), vec![0], array![[3.0], [f64::NAN], [4.0]]);
    let result = rolling_rms(&frame, 10 * SECOND, None).unwrap();
    let expected = ((9.0 + 16.0) / 2.0f64).sqrt();
    assert!((result.values()[[0, 0]] - expected).abs() < 1e-12);
}

#[test]
fn test_low_cut_filter_removes_dc() {
    let rows = 200;
    let values = Array2::from_elem((rows, 1), 5.0);
    let frame = frame_from(seconds(rows), vec![0], values);

    let filtered = low_cut_filter(&frame, 31, 100.0, 10_000.0).unwrap();
    // Away from the zero-padded edges a constant signal vanishes
    assert!(filtered.values()[[rows / 2, 0]].abs() < 1e-9);

    // Cutoff must sit below Nyquist
    assert!(low_cut_filter(&frame, 31, 6_000.0, 10_000.0).is_err());
}

#[test]
fn test_moveout_correction() {
    let mut values = Array2::zeros((3, 3));
    for row in 0..3 {
        for col in 0..3 {
            values[[row, col]] = (row * 10 + col) as f64;
        }
    }
    let frame = frame_from(seconds(3), vec![0, 1, 2], values);

    let corrected = moveout_correction(&frame, 0, 1.0).unwrap();

    // Reference channel is untouched
    assert_eq!(corrected.values()[[0, 0]], 0.0);
    assert_eq!(corrected.values()[[2, 0]], 20.0);

    // One locus away shifts one sample forward in time
    assert!(corrected.values()[[0, 1]].is_nan());
    assert_eq!(corrected.values()[[1, 1]], 1.0);

    // Two loci away shifts two samples
    assert!(corrected.values()[[1, 2]].is_nan());
    assert_eq!(corrected.values()[[2, 2]], 2.0);
}

#[test]
fn test_median_depth_filter_removes_single_spike() {
    let values = array![[1.0, 100.0, 1.0, 1.0]];
    let frame = frame_from(vec![0], vec![0, 1, 2, 3], values);

    let filtered = median_depth_filter(&frame, 3).unwrap();
    assert_eq!(filtered.values()[[0, 1]], 1.0);
    assert_eq!(filtered.values()[[0, 3]], 1.0);
    // The edge window shrinks to two samples
    assert_eq!(filtered.values()[[0, 0]], 50.5);

    assert!(median_depth_filter(&frame, 0).is_err());
}

#[test]
fn test_depth_aggregation_groups_and_aggregates() {
    let values = array![[1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.0]];
    let frame = frame_from(seconds(2), vec![0, 1, 10, 11], values);

    let aggregated = depth_aggregation(&frame, 10, AggregationFunction::Mean).unwrap();
    assert_eq!(aggregated.loci(), &[0, 10]);
    assert_eq!(aggregated.values(), &array![[1.5, 3.5], [5.5, 7.5]]);

    let median = depth_aggregation(&frame, 10, AggregationFunction::Median).unwrap();
    assert_eq!(median.values()[[0, 0]], 1.5);

    // Zero window is the identity, negative windows are rejected
    let identity = depth_aggregation(&frame, 0, AggregationFunction::Mean).unwrap();
    assert_eq!(&identity, &frame);
    assert!(depth_aggregation(&frame, -1, AggregationFunction::Mean).is_err());
}

#[test]
fn test_depth_aggregation_column_counts() {
    // Column counts follow ceil(locus count / window) for contiguous loci
    for (start, end, window) in [(0i64, 1000i64, 10i64), (10, 100, 5), (500, 5000, 2)] {
        let loci: Vec<i64> = (start..=end).collect();
        let values = Array2::zeros((1, loci.len()));
        let frame = frame_from(vec![0], loci.clone(), values);

        let aggregated =
            depth_aggregation(&frame, window, AggregationFunction::Median).unwrap();
        let expected = (loci.len() as f64 / window as f64).ceil() as usize;
        assert_eq!(aggregated.ncols(), expected);
    }
}

#[test]
fn test_aggregation_function_from_str() {
    assert_eq!(
        "median".parse::<AggregationFunction>().unwrap(),
        AggregationFunction::Median
    );
    assert_eq!(
        "max".parse::<AggregationFunction>().unwrap(),
        AggregationFunction::Max
    );
    assert!("mode".parse::<AggregationFunction>().is_err());
}

#[test]
fn test_split_around_gaps() {
    let index = vec![0, SECOND, 2 * SECOND, 10 * SECOND, 11 * SECOND];
    let values = Array2::zeros((5, 1));
    let frame = frame_from(index, vec![0], values);

    let pieces = split_around_gaps(&frame, 5 * SECOND);
    assert_eq!(pieces.len(), 2);
    assert_eq!(pieces[0].nrows(), 3);
    assert_eq!(pieces[1].index(), &[10 * SECOND, 11 * SECOND]);

    // A gap equal to the threshold does not split
    let untouched = split_around_gaps(&frame, 8 * SECOND);
    assert_eq!(untouched.len(), 1);

    assert!(split_around_gaps(&TraceFrame::empty(vec![0]), SECOND).is_empty());
}

#[test]
fn test_decimate() {
    let rows = 100;
    let values = Array2::from_elem((rows, 1), 5.0);
    let frame = frame_from(seconds(rows), vec![0], values);

    let decimated = decimate(&frame, 2).unwrap();
    assert_eq!(decimated.nrows(), 50);
    assert_eq!(decimated.index()[1] - decimated.index()[0], 2 * SECOND);
    // A constant signal survives the anti-alias filter away from the edges
    assert!((decimated.values()[[25, 0]] - 5.0).abs() < 1e-9);

    assert!(decimate(&frame, 0).is_err());
    assert_eq!(decimate(&frame, 1).unwrap().nrows(), rows);
}

#[test]
fn test_min_max_scaler_round_trip() {
    let frame = frame_from(seconds(3), vec![0], array![[0.0], [5.0], [10.0]]);

    let mut scaler = MinMaxScaler::new();
    let scaled = scaler.fit_transform(&frame).unwrap();
    assert_eq!(scaled.values(), &array![[0.0], [0.5], [1.0]]);

    let restored = scaler.inverse_transform(&scaled).unwrap();
    for row in 0..3 {
        assert!((restored.values()[[row, 0]] - frame.values()[[row, 0]]).abs() < 1e-12);
    }
}

#[test]
fn test_standard_scaler() {
    let frame = frame_from(seconds(3), vec![0], array![[0.0], [5.0], [10.0]]);

    let mut scaler = StandardScaler::new();
    let scaled = scaler.fit_transform(&frame).unwrap();

    let std = (50.0f64 / 3.0).sqrt();
    assert!((scaled.values()[[0, 0]] + 5.0 / std).abs() < 1e-12);
    assert!(scaled.values()[[1, 0]].abs() < 1e-12);
    assert!((scaled.values()[[2, 0]] - 5.0 / std).abs() < 1e-12);
}

#[test]
fn test_robust_scaler() {
    let frame = frame_from(seconds(3), vec![0], array![[0.0], [5.0], [10.0]]);

    let mut scaler = RobustScaler::new();
    let scaled = scaler.fit_transform(&frame).unwrap();
    assert_eq!(scaled.values(), &array![[-1.0], [0.0], [1.0]]);
}

#[test]
fn test_pooled_scaler_shares_statistics() {
    let frame = frame_from(seconds(2), vec![0, 1], array![[0.0, 20.0], [10.0, 40.0]]);

    let mut scaler = MinMaxScaler::pooled();
    let scaled = scaler.fit_transform(&frame).unwrap();
    assert_eq!(scaled.values()[[0, 0]], 0.0);
    assert_eq!(scaled.values()[[1, 1]], 1.0);
    assert_eq!(scaled.values()[[1, 0]], 0.25);
}

#[test]
fn test_scaler_misuse() {
    let frame = frame_from(seconds(2), vec![0], array![[1.0], [2.0]]);

    // Transform before fit
    let unfitted = StandardScaler::new();
    assert!(unfitted.transform(&frame).is_err());

    // Column mismatch after fit
    let mut scaler = StandardScaler::new();
    scaler.fit(&frame).unwrap();
    let wider = frame_from(seconds(2), vec![0, 1], Array2::zeros((2, 2)));
    assert!(scaler.transform(&wider).is_err());

    // Empty frames pass through
    let empty = TraceFrame::empty(vec![0]);
    assert!(scaler.transform(&empty).unwrap().is_empty());
}

#[test]
fn test_rolling_standard_scaler() {
    let frame = frame_from(seconds(4), vec![0], array![[1.0], [2.0], [3.0], [4.0]]);

    let scaled = RollingStandardScaler::new(2 * SECOND)
        .fit_transform(&frame)
        .unwrap();

    // The first row's undefined deviation is back-filled from the next
    assert!(scaled.values()[[0, 0]].abs() < 1e-12);
    assert!((scaled.values()[[2, 0]] - 1.0).abs() < 1e-12);
    assert!((scaled.values()[[3, 0]] - 1.0).abs() < 1e-12);
}

#[test]
fn test_rolling_robust_scaler() {
    let frame = frame_from(seconds(4), vec![0], array![[1.0], [2.0], [3.0], [4.0]]);

    let scaled = RollingRobustScaler::new(2 * SECOND)
        .fit_transform(&frame)
        .unwrap();
    // Window [2, 3, 4]: median 3, IQR 1
    assert!((scaled.values()[[3, 0]] - 1.0).abs() < 1e-12);
}

#[test]
fn test_nan_quantile() {
    let values = [0.0, 1.0, 2.0, 3.0];
    assert_eq!(nan_quantile(&values, 0.0), 0.0);
    assert_eq!(nan_quantile(&values, 1.0), 3.0);
    assert_eq!(nan_quantile(&values, 0.5), 1.5);

    let with_nan = [f64::NAN, 1.0, 3.0];
    assert_eq!(nan_quantile(&with_nan, 0.5), 2.0);
    assert!(nan_quantile(&[], 0.5).is_nan());
}

#[test]
fn test_time_ticks_second_ladder() {
    let ticks = time_ticks(0, 10 * SECOND, 5);
    assert_eq!(ticks, vec![0, 5 * SECOND, 10 * SECOND]);

    let labels = format_time_ticks(&ticks);
    assert_eq!(labels, vec!["00", "05", "10"]);
    assert_eq!(time_tick_offset(&ticks), "1970-01-01 00:00");
}

#[test]
fn test_time_ticks_year_and_month_spans() {
    let at = |y: i32, m: u32| {
        chrono::NaiveDate::from_ymd_opt(y, m, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_nanos_opt()
            .unwrap()
    };

    // A decade at six ticks lands on every second year start
    let years = time_ticks(at(2000, 1), at(2010, 1), 6);
    assert_eq!(years.len(), 6);
    assert_eq!(years[0], at(2000, 1));
    assert_eq!(years[1], at(2002, 1));

    // Half a year at six ticks lands on month starts
    let months = time_ticks(at(2021, 1), at(2021, 7), 6);
    assert_eq!(
        months,
        vec![
            at(2021, 1),
            at(2021, 2),
            at(2021, 3),
            at(2021, 4),
            at(2021, 5),
            at(2021, 6),
            at(2021, 7)
        ]
    );
}

#[test]
fn test_time_tick_labels_trim_shared_zeros() {
    let ticks = vec![0, 100_000_000, 200_000_000];
    let labels = format_time_ticks(&ticks);
    assert_eq!(labels, vec!["0", "1", "2"]);
    assert_eq!(time_tick_offset(&ticks), "1970-01-01 00:00:00");
}

#[test]
fn test_loci_ticks() {
    assert_eq!(loci_ticks(0.0, 100.0, 5), vec![0, 50, 100]);
    assert_eq!(loci_ticks(0.0, 10.0, 5), vec![0, 5, 10]);
    assert_eq!(loci_ticks(-0.5, 4.5, 10), vec![0, 1, 2, 3, 4]);
    assert!(loci_ticks(5.0, 5.0, 5).is_empty());
}

#[test]
fn test_parallel_config() {
    let config = ParallelConfig::default();
    assert!(config.num_threads.is_none());
    assert!(config.current_threads() > 0);

    assert_eq!(ParallelConfig::with_threads(4).num_threads, Some(4));
    assert!(ParallelConfig::all_cores().num_threads.unwrap() > 0);
    assert_eq!(ParallelConfig::new(Some(2)).num_threads, Some(2));

    // The default configuration leaves the global pool untouched
    ParallelConfig::default().setup_global_pool().unwrap();
}

#[test]
fn test_raster_spec_defaults_and_overrides() {
    let frame = frame_from(seconds(2), vec![0, 1], array![[0.0, 1.0], [2.0, 3.0]]);
    let registry = DefaultRegistry::new();

    let (prepared, spec) = raster_spec(&frame, &CallArgs::new(), &registry).unwrap();
    assert_eq!(prepared.nrows(), 2);
    assert_eq!(spec.colormap, "seismic");
    assert_eq!(spec.aspect, "auto");
    assert_eq!(spec.interpolation, "none");
    assert!(!spec.colorbar);
    assert_eq!(spec.figsize, (12.0, 6.0));
    assert!((spec.vmin - 0.03).abs() < 1e-12);
    assert!((spec.vmax - 2.97).abs() < 1e-12);

    // Registry defaults take over from fallbacks, callers beat both
    let mut registry = DefaultRegistry::new();
    registry.insert("cmap", "gray");
    let args = CallArgs::new().set("vmin", -1.0).set("colorbar", true);
    let (_, spec) = raster_spec(&frame, &args, &registry).unwrap();
    assert_eq!(spec.colormap, "gray");
    assert!(spec.colorbar);
    assert_eq!(spec.vmin, -1.0);

    // Constraint violations surface before any rendering work
    let bad_aspect = CallArgs::new().set("aspect", "stretched");
    match raster_spec(&frame, &bad_aspect, &registry) {
        Err(DasError::InvalidChoice { param, .. }) => assert_eq!(param, "aspect"),
        other => panic!("Expected InvalidChoice, got {:?}", other),
    }

    let empty = TraceFrame::empty(vec![0]);
    assert!(raster_spec(&empty, &CallArgs::new(), &registry).is_err());
}
