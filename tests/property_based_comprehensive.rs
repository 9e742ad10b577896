//! Property-based tests for the grid sampler, flattener, statistics and checker
//!
//! Kept small enough to run as a pre-commit gate.

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use trust_random::flatten::{flatten, FieldMap, FlatResult};
use trust_random::grid::{cartesian, sample, GridConstraint, ParamValue, ParameterSpec};
use trust_random::regression::{check, summarize};
use trust_random::store::{BenchmarkRecord, FieldStats};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_geometric_endpoints_exact(
        minimum in 1e-3f64..1e3,
        ratio in 1.0f64..1e4,
        steps in 1usize..20,
    ) {
        let maximum = minimum * ratio;
        let spec = ParameterSpec::real("x", minimum, maximum, steps).unwrap();
        let points = spec.geometric_points();

        // Property: exactly `steps` points, first is the minimum
        prop_assert_eq!(points.len(), steps);
        prop_assert_eq!(points[0], minimum);
        if steps > 1 {
            prop_assert_eq!(points[steps - 1], maximum);
        }

        // Property: non-decreasing and inside the range
        for pair in points.windows(2) {
            prop_assert!(pair[0] <= pair[1] * (1.0 + 1e-12));
        }
        for p in &points {
            prop_assert!(*p >= minimum * (1.0 - 1e-12) && *p <= maximum * (1.0 + 1e-12));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_integer_samples_stay_in_range(
        minimum in 1i64..1000,
        span in 0i64..100_000,
        steps in 1usize..12,
    ) {
        let maximum = minimum + span;
        let spec = ParameterSpec::integer("n", minimum, maximum, steps).unwrap();

        for value in spec.samples() {
            match value {
                ParamValue::Int(v) => prop_assert!(v >= minimum && v <= maximum),
                ParamValue::Real(_) => prop_assert!(false, "integer spec produced a real"),
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_sample_respects_ceiling(
        n_max in 1i64..500,
        n_steps in 1usize..6,
        p_max in 0.01f64..10.0,
        p_steps in 1usize..6,
        max_product in 0.5f64..5000.0,
    ) {
        let specs = vec![
            ParameterSpec::integer("n", 1, n_max, n_steps).unwrap(),
            ParameterSpec::real("p", 0.01, p_max.max(0.01), p_steps).unwrap(),
        ];
        let constraint = GridConstraint::new(max_product, 1).unwrap();
        let grid = sample(&specs, &constraint).unwrap();
        let full = cartesian(&specs).unwrap();

        // Property: every retained cell is strictly below the ceiling
        for tuple in &grid.tuples {
            prop_assert!(tuple.product() < max_product);
        }

        // Property: retained plus excluded cells partition the full grid
        let excluded = full.iter().filter(|t| t.product() >= max_product).count();
        prop_assert_eq!(grid.len() + excluded, n_steps * p_steps);

        // Property: retained cells keep row-major order
        let kept: Vec<_> = full.into_iter().filter(|t| t.product() < max_product).collect();
        prop_assert_eq!(&grid.tuples, &kept);

        let cost: f64 = kept.iter().map(|t| t.product()).sum();
        prop_assert!((grid.total_cost - cost).abs() <= 1e-9 * cost.max(1.0));
    }
}

fn nested_numbers() -> impl Strategy<Value = Value> {
    let leaf = (-1e6f64..1e6).prop_map(|x| json!(x));
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop::collection::btree_map("[a-z]{1,4}", inner, 1..4).prop_map(|m| {
            Value::Object(m.into_iter().collect::<Map<String, Value>>())
        })
    })
}

fn count_leaves(value: &Value) -> usize {
    match value {
        Value::Object(map) => map.values().map(count_leaves).sum(),
        _ => 1,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_flatten_keeps_every_leaf(
        fields in prop::collection::btree_map("[a-z]{1,4}", nested_numbers(), 1..5),
    ) {
        let root = Value::Object(fields.into_iter().collect());
        let flat = flatten(&root).unwrap();

        // Property: one entry per numeric leaf, keys built from path segments
        prop_assert_eq!(flat.len(), count_leaves(&root));
        for key in flat.keys() {
            prop_assert!(!key.is_empty());
            prop_assert!(!key.starts_with('_') && !key.ends_with('_'));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_summary_of_constant_is_exact(value in -1e9f64..1e9, count in 1usize..50) {
        let stats = summarize(&vec![value; count]).unwrap();
        prop_assert_eq!(stats.mean, value);
        prop_assert_eq!(stats.st_dev, 0.0);
    }

    #[test]
    fn prop_st_dev_non_negative(samples in prop::collection::vec(-1e6f64..1e6, 1..100)) {
        let stats = summarize(&samples).unwrap();
        prop_assert!(stats.st_dev >= 0.0);
        let lo = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(stats.mean >= lo - 1e-6 && stats.mean <= hi + 1e-6);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_mean_always_passes(
        mean in -1e6f64..1e6,
        st_dev in 0.0f64..1e3,
        k in 0.0f64..5.0,
    ) {
        let stats: FieldMap<FieldStats> =
            [("x".to_string(), FieldStats::new(mean, st_dev))].into_iter().collect();
        let record = BenchmarkRecord::new(FieldMap::new(), stats);
        let fresh: FlatResult = [("x".to_string(), mean)].into_iter().collect();
        prop_assert!(check(&record, &fresh, k).is_pass());
    }

    #[test]
    fn prop_band_is_symmetric(
        mean in -1e3f64..1e3,
        st_dev in 0.1f64..10.0,
        k in 0.5f64..4.0,
        offset in 1.001f64..3.0,
    ) {
        let stats: FieldMap<FieldStats> =
            [("x".to_string(), FieldStats::new(mean, st_dev))].into_iter().collect();
        let record = BenchmarkRecord::new(FieldMap::new(), stats);
        let distance = k * st_dev * offset;

        let above: FlatResult = [("x".to_string(), mean + distance)].into_iter().collect();
        let below: FlatResult = [("x".to_string(), mean - distance)].into_iter().collect();
        prop_assert!(!check(&record, &above, k).is_pass());
        prop_assert!(!check(&record, &below, k).is_pass());
    }
}
