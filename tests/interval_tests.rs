//! Tests for interval-index manipulation and the interval-aware cache

use das_common::frame::TraceFrame;
use das_common::interval::{
    add_interval, deserialize_intervals, find_continuous_runs, merge_continuous,
    serialize_intervals, subtract_interval, Interval, IntervalCache, SerializedIntervals,
};
use ndarray::Array2;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn iv(left: i64, right: i64) -> Interval {
    Interval::new(left, right).unwrap()
}

#[test]
fn test_interval_basics() {
    let interval = iv(2, 5);
    assert_eq!(interval.length(), 3);
    assert!(interval.contains(2));
    assert!(interval.contains(4));
    // Half-open: the right edge is excluded
    assert!(!interval.contains(5));

    assert!(iv(0, 3).overlaps(&iv(2, 5)));
    assert!(!iv(0, 2).overlaps(&iv(2, 5)));

    assert!(Interval::new(5, 2).is_err());
    assert!(iv(3, 3).is_empty());
}

#[test]
fn test_find_continuous_runs() {
    // Touching intervals are continuous, a gap starts a new run
    let runs = find_continuous_runs(&[iv(3, 4), iv(0, 1), iv(1, 2)], 0);
    assert_eq!(runs, vec![vec![iv(0, 1), iv(1, 2)], vec![iv(3, 4)]]);

    // A threshold bridges gaps up to its size
    let runs = find_continuous_runs(&[iv(0, 1), iv(2, 3)], 1);
    assert_eq!(runs, vec![vec![iv(0, 1), iv(2, 3)]]);

    assert!(find_continuous_runs(&[], 0).is_empty());
}

#[test]
fn test_find_continuous_runs_nested() {
    // A nested interval never breaks the run it sits inside
    let runs = find_continuous_runs(&[iv(0, 10), iv(2, 3), iv(12, 15)], 0);
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0], vec![iv(0, 10), iv(2, 3)]);
    assert_eq!(runs[1], vec![iv(12, 15)]);
}

#[test]
fn test_merge_continuous() {
    let merged = merge_continuous(&[iv(3, 4), iv(0, 1), iv(1, 2)], 0);
    assert_eq!(merged, vec![iv(0, 2), iv(3, 4)]);

    let merged = merge_continuous(&[iv(0, 1), iv(2, 3)], 1);
    assert_eq!(merged, vec![iv(0, 3)]);

    // Overlap collapses too
    let merged = merge_continuous(&[iv(0, 5), iv(3, 8)], 0);
    assert_eq!(merged, vec![iv(0, 8)]);
}

#[test]
fn test_add_interval() {
    let index = vec![iv(0, 2), iv(5, 7)];

    // Disjoint intervals are inserted in order
    assert_eq!(
        add_interval(&index, iv(10, 12)),
        vec![iv(0, 2), iv(5, 7), iv(10, 12)]
    );

    // Partial overlap extends the existing entry
    assert_eq!(add_interval(&index, iv(1, 3)), vec![iv(0, 3), iv(5, 7)]);

    // A fully covered interval changes nothing
    assert_eq!(add_interval(&index, iv(0, 1)), vec![iv(0, 2), iv(5, 7)]);

    // Bridging both entries collapses everything
    assert_eq!(add_interval(&index, iv(2, 5)), vec![iv(0, 7)]);
}

#[test]
fn test_subtract_interval() {
    let index = vec![iv(0, 10)];

    // Interior subtraction splits the entry
    assert_eq!(
        subtract_interval(&index, iv(3, 5)),
        vec![iv(0, 3), iv(5, 10)]
    );

    // Edge overlap shortens it
    assert_eq!(subtract_interval(&index, iv(0, 5)), vec![iv(5, 10)]);
    assert_eq!(subtract_interval(&index, iv(8, 20)), vec![iv(0, 8)]);

    // Disjoint subtraction changes nothing
    assert_eq!(subtract_interval(&index, iv(20, 30)), vec![iv(0, 10)]);

    // Complete coverage removes the entry
    assert!(subtract_interval(&index, iv(-5, 20)).is_empty());
}

#[test]
fn test_serialize_fixed_frequency_as_range() {
    let intervals = vec![iv(0, 10), iv(10, 20), iv(20, 30)];
    let serialized = serialize_intervals(&intervals).unwrap();
    assert_eq!(
        serialized,
        SerializedIntervals::Range {
            start: 0,
            end: 30,
            freq: 10
        }
    );
    assert_eq!(deserialize_intervals(&serialized).unwrap(), intervals);
}

#[test]
fn test_serialize_irregular_as_arrays() {
    let intervals = vec![iv(0, 1), iv(5, 7)];
    let serialized = serialize_intervals(&intervals).unwrap();
    assert_eq!(
        serialized,
        SerializedIntervals::Arrays {
            left: vec![0, 5],
            right: vec![1, 7]
        }
    );
    assert_eq!(deserialize_intervals(&serialized).unwrap(), intervals);
}

#[test]
fn test_serialize_empty_and_json_round_trip() {
    let serialized = serialize_intervals(&[]).unwrap();
    assert_eq!(deserialize_intervals(&serialized).unwrap(), vec![]);

    // The serialized form survives JSON
    let intervals = vec![iv(100, 200), iv(200, 300)];
    let serialized = serialize_intervals(&intervals).unwrap();
    let json = serde_json::to_string(&serialized).unwrap();
    let revived: SerializedIntervals = serde_json::from_str(&json).unwrap();
    assert_eq!(deserialize_intervals(&revived).unwrap(), intervals);
}

#[test]
fn test_deserialize_rejects_bad_input() {
    assert!(deserialize_intervals(&SerializedIntervals::Range {
        start: 0,
        end: 10,
        freq: 0
    })
    .is_err());

    assert!(deserialize_intervals(&SerializedIntervals::Arrays {
        left: vec![0, 1],
        right: vec![2]
    })
    .is_err());

    assert!(deserialize_intervals(&SerializedIntervals::Arrays {
        left: vec![5],
        right: vec![2]
    })
    .is_err());
}

/// A frame whose single column holds each row's timestamp as a value
fn timestamp_frame(start: i64, end: i64) -> TraceFrame {
    let index: Vec<i64> = (start..end).collect();
    let values: Vec<f64> = index.iter().map(|&t| t as f64).collect();
    let rows = index.len();
    TraceFrame::new(index, vec![0], Array2::from_shape_vec((rows, 1), values).unwrap()).unwrap()
}

#[test]
fn test_interval_cache_fetches_only_missing_ranges() {
    let _ = env_logger::builder().is_test(true).try_init();
    let fetched = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&fetched);

    let mut cache = IntervalCache::new(move |_id: &str, start: i64, end: i64| {
        log.lock().unwrap().push((start, end));
        Ok(timestamp_frame(start, end))
    });

    let first = cache.get("profile-a", 3, 4).unwrap();
    assert_eq!(first.index(), &[3]);

    // The wider request only fetches the two missing flanks
    let second = cache.get("profile-a", 2, 5).unwrap();
    assert_eq!(second.index(), &[2, 3, 4]);
    assert_eq!(second.values()[[0, 0]], 2.0);
    assert_eq!(second.values()[[2, 0]], 4.0);

    assert_eq!(*fetched.lock().unwrap(), vec![(3, 4), (2, 3), (4, 5)]);
    assert_eq!(cache.cached_intervals("profile-a"), &[iv(2, 5)]);
}

#[test]
fn test_interval_cache_full_hit_and_per_id_isolation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut cache = IntervalCache::new(move |_id: &str, start: i64, end: i64| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(timestamp_frame(start, end))
    });

    cache.get("a", 0, 10).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Fully cached: no further fetch
    let hit = cache.get("a", 2, 8).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(hit.nrows(), 6);

    // A different id has its own cache
    cache.get("b", 0, 10).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_interval_cache_rejects_empty_range() {
    let mut cache =
        IntervalCache::new(|_id: &str, start: i64, end: i64| Ok(timestamp_frame(start, end)));
    assert!(cache.get("a", 5, 5).is_err());
    assert!(cache.get("a", 7, 3).is_err());
}
