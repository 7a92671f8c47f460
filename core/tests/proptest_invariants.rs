use proptest::prelude::*;
use reserveai_core::{
    eda::check_monotonic,
    frame::{Column, Frame},
    outlier::{detect_incremental, FlagBasis, Moments, TukeyFence, TUKEY_MULTIPLIER},
    summary::age_to_age_factors,
    triangle::{normalize, NormalizedTriangle, Observation},
    types::{ACCIDENT_YEAR, DEVELOPMENT_QUARTER, INCURRED_CUM, PAID_CUM},
};

type Cell = (Option<i64>, Option<i64>, Option<f64>);

fn cell_strategy() -> impl Strategy<Value = Cell> {
    (
        proptest::option::of(2015i64..2022),
        proptest::option::of(1i64..9),
        proptest::option::of(1.0f64..1.0e6),
    )
}

fn build(cells: &[Cell]) -> NormalizedTriangle {
    let raw = Frame::new(vec![
        Column::nullable_int64(ACCIDENT_YEAR, cells.iter().map(|c| c.0).collect()),
        Column::nullable_int64(DEVELOPMENT_QUARTER, cells.iter().map(|c| c.1).collect()),
        Column::float64(INCURRED_CUM, cells.iter().map(|c| c.2).collect()),
        Column::float64(PAID_CUM, cells.iter().map(|c| c.2.map(|v| v * 0.5)).collect()),
    ])
    .expect("columns share a length");
    normalize(&raw).0
}

fn key_order(a: Option<i64>, b: Option<i64>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None)    => std::cmp::Ordering::Less,
        (None, Some(_))    => std::cmp::Ordering::Greater,
        (None, None)       => std::cmp::Ordering::Equal,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn normalized_rows_are_sorted_with_nulls_last(cells in prop::collection::vec(cell_strategy(), 0..60)) {
        let tri = build(&cells);
        let rows = tri.rows();
        prop_assert_eq!(rows.len(), cells.len());
        for pair in rows.windows(2) {
            let order = key_order(pair[0].accident_year, pair[1].accident_year)
                .then_with(|| key_order(pair[0].development_quarter, pair[1].development_quarter));
            prop_assert_ne!(order, std::cmp::Ordering::Greater);
        }
    }

    #[test]
    fn normalization_is_deterministic(cells in prop::collection::vec(cell_strategy(), 0..40)) {
        prop_assert_eq!(build(&cells), build(&cells));
    }

    #[test]
    fn age_to_age_factors_are_finite_and_positive(cells in prop::collection::vec(cell_strategy(), 0..60)) {
        for (label, factor) in age_to_age_factors(&build(&cells)) {
            prop_assert!(factor.is_finite() && factor > 0.0, "{} = {}", label, factor);
        }
    }

    #[test]
    fn tukey_fence_brackets_the_quartiles(values in prop::collection::vec(-1.0e6f64..1.0e6, 1..50)) {
        let fence = TukeyFence::from_values(&values, TUKEY_MULTIPLIER).unwrap();
        prop_assert!(fence.lower <= fence.q1);
        prop_assert!(fence.q1 <= fence.q3);
        prop_assert!(fence.q3 <= fence.upper);
        for v in values.iter().filter(|v| **v >= fence.q1 && **v <= fence.q3) {
            prop_assert!(!fence.is_outside(*v));
        }
    }

    #[test]
    fn z_scores_are_bounded_by_sample_size(raw in prop::collection::vec(-10_000i32..10_000, 2..40)) {
        let values: Vec<f64> = raw.into_iter().map(f64::from).collect();
        let moments = Moments::sample(&values).unwrap();
        let n = values.len() as f64;
        let bound = (n - 1.0) / n.sqrt() + 1e-9;
        for v in &values {
            prop_assert!(moments.z(*v).abs() <= bound);
        }
    }

    #[test]
    fn constant_increments_never_flag(cohorts in 1usize..12, periods in 1i64..6, step in 1u32..1000) {
        let step = f64::from(step);
        let cells: Vec<Cell> = (0..cohorts as i64)
            .flat_map(|i| (1..=periods).map(move |j| (Some(2000 + i), Some(j), Some(step * j as f64))))
            .collect();
        let rows = detect_incremental(&build(&cells), INCURRED_CUM, 0.5);
        prop_assert_eq!(rows.len(), cohorts * periods as usize);
        for row in &rows {
            prop_assert!(!row.is_outlier);
            if let FlagBasis::ZScore { z, .. } = row.basis {
                prop_assert_eq!(z, 0.0);
            }
        }
    }

    #[test]
    fn non_decreasing_cohorts_pass_monotonicity(mut increments in prop::collection::vec(0.0f64..100.0, 1..30)) {
        let mut total = 0.0;
        for inc in increments.iter_mut() {
            total += *inc;
            *inc = total;
        }
        let observations: Vec<Observation> = increments
            .iter()
            .enumerate()
            .map(|(i, v)| Observation {
                accident_year: 2020,
                development_quarter: Some(i as i64 + 1),
                value: Some(*v),
            })
            .collect();
        prop_assert!(check_monotonic(observations).ok);
    }
}
