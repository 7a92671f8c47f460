use reserveai_core::{
    frame::{Column, Frame},
    outlier::{
        detect_age_to_age, detect_incremental, outlier_count, FlagBasis, FlagGroup, OutlierMethod,
        TukeyFence, DEFAULT_Z_THRESHOLD, TUKEY_MULTIPLIER,
    },
    triangle::{normalize, NormalizedTriangle, Transition},
    types::{ACCIDENT_YEAR, DEVELOPMENT_QUARTER, INCURRED_CUM, PAID_CUM},
};

/// (accident_year, development_quarter, incurred_cum)
fn triangle(cells: &[(i64, i64, f64)]) -> NormalizedTriangle {
    let raw = Frame::new(vec![
        Column::int64(ACCIDENT_YEAR, cells.iter().map(|c| c.0).collect()),
        Column::int64(DEVELOPMENT_QUARTER, cells.iter().map(|c| c.1).collect()),
        Column::float64(INCURRED_CUM, cells.iter().map(|c| Some(c.2)).collect()),
        Column::float64(PAID_CUM, cells.iter().map(|_| None).collect()),
    ])
    .unwrap();
    normalize(&raw).0
}

/// One cohort per development value: quarter 1 at 1000, quarter 2 at 1000 * factor.
fn two_period_triangle(factors: &[f64]) -> NormalizedTriangle {
    let cells: Vec<_> = factors
        .iter()
        .enumerate()
        .flat_map(|(i, f)| {
            let ay = 2010 + i as i64;
            [(ay, 1, 1000.0), (ay, 2, 1000.0 * f)]
        })
        .collect();
    triangle(&cells)
}

// ── IQR ──────────────────────────────────────────────────────────────────────

#[test]
fn tukey_fence_matches_linear_interpolation() {
    let fence = TukeyFence::from_values(&[1.0, 1.05, 1.1, 1.1, 1.15, 5.0], TUKEY_MULTIPLIER).unwrap();
    assert!((fence.q1 - 1.0625).abs() < 1e-9);
    assert!((fence.q3 - 1.1375).abs() < 1e-9);
    assert!((fence.lower - 0.95).abs() < 1e-9);
    assert!((fence.upper - 1.25).abs() < 1e-9);
    assert!(fence.is_outside(5.0));
    assert!(!fence.is_outside(1.0));
}

#[test]
fn only_the_extreme_factor_is_flagged() {
    let tri = two_period_triangle(&[1.0, 1.05, 1.1, 1.1, 1.15, 5.0]);
    let rows = detect_age_to_age(&tri, TUKEY_MULTIPLIER);

    assert_eq!(rows.len(), 6);
    assert_eq!(outlier_count(&rows), 1);

    let flagged = rows.iter().find(|r| r.is_outlier).unwrap();
    assert_eq!(flagged.accident_year, 2015);
    assert_eq!(flagged.method, OutlierMethod::Iqr);
    assert_eq!(flagged.group, FlagGroup::Transition(Transition { from: 1, to: 2 }));
    assert!((flagged.value - 5.0).abs() < 1e-12);
}

#[test]
fn single_cohort_collapses_fence_and_flags_nothing() {
    let tri = triangle(&[(2019, 1, 100.0), (2019, 2, 130.0), (2019, 3, 140.0)]);
    let rows = detect_age_to_age(&tri, TUKEY_MULTIPLIER);

    assert_eq!(rows.len(), 2);
    assert_eq!(outlier_count(&rows), 0);
    for row in &rows {
        match row.basis {
            FlagBasis::TukeyFence { iqr, lower, upper, .. } => {
                assert_eq!(iqr, 0.0);
                assert_eq!(lower, upper);
            }
            FlagBasis::ZScore { .. } => panic!("iqr row carries z-score basis"),
        }
    }
}

#[test]
fn cohorts_missing_a_side_are_dropped() {
    let tri = triangle(&[
        (2019, 1, 100.0),
        (2019, 2, 120.0),
        (2020, 1, 0.0),
        (2020, 2, 50.0),
        (2021, 1, 80.0),
    ]);
    let rows = detect_age_to_age(&tri, TUKEY_MULTIPLIER);

    // 2020 divides by zero, 2021 has no quarter 2.
    let cohorts: Vec<_> = rows.iter().map(|r| r.accident_year).collect();
    assert_eq!(cohorts, vec![2019]);
}

#[test]
fn no_incurred_column_means_no_factors() {
    let raw = Frame::new(vec![
        Column::int64(ACCIDENT_YEAR, vec![2019, 2019]),
        Column::int64(DEVELOPMENT_QUARTER, vec![1, 2]),
    ])
    .unwrap();
    let (tri, _) = normalize(&raw);
    assert!(detect_age_to_age(&tri, TUKEY_MULTIPLIER).is_empty());
}

// ── z-score ──────────────────────────────────────────────────────────────────

#[test]
fn zero_variance_never_flags() {
    let tri = triangle(&[
        (2019, 1, 100.0),
        (2019, 2, 150.0),
        (2020, 1, 100.0),
        (2020, 2, 150.0),
        (2021, 1, 100.0),
    ]);
    let rows = detect_incremental(&tri, INCURRED_CUM, DEFAULT_Z_THRESHOLD);

    assert_eq!(rows.len(), 5);
    assert_eq!(outlier_count(&rows), 0);
    for row in &rows {
        match row.basis {
            FlagBasis::ZScore { z, std_dev, .. } => {
                assert_eq!(z, 0.0);
                assert_eq!(std_dev, 0.0);
            }
            FlagBasis::TukeyFence { .. } => panic!("z-score row carries fence basis"),
        }
    }
    assert_eq!(outlier_count(&detect_incremental(&tri, INCURRED_CUM, 0.0)), 0);
}

#[test]
fn extreme_incremental_is_flagged() {
    // Ten ordinary cohorts and one large loss in quarter 1.
    let mut cells: Vec<_> = (0..10).map(|i| (2000 + i, 1, 100.0)).collect();
    cells.push((2010, 1, 1000.0));
    let tri = triangle(&cells);

    let rows = detect_incremental(&tri, INCURRED_CUM, DEFAULT_Z_THRESHOLD);
    assert_eq!(rows.len(), 11);

    let flagged: Vec<_> = rows.iter().filter(|r| r.is_outlier).collect();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].accident_year, 2010);
    assert_eq!(flagged[0].group, FlagGroup::Period(1));
    assert_eq!(flagged[0].method, OutlierMethod::ZScore);
}

#[test]
fn groups_are_per_development_quarter() {
    let tri = triangle(&[
        (2019, 1, 100.0),
        (2019, 2, 160.0),
        (2020, 1, 200.0),
        (2020, 2, 240.0),
    ]);
    let rows = detect_incremental(&tri, INCURRED_CUM, DEFAULT_Z_THRESHOLD);

    let groups: Vec<_> = rows.iter().map(|r| (r.group.label(), r.accident_year, r.value)).collect();
    assert_eq!(
        groups,
        vec![
            ("1".to_string(), 2019, 100.0),
            ("1".to_string(), 2020, 200.0),
            ("2".to_string(), 2019, 60.0),
            ("2".to_string(), 2020, 40.0),
        ]
    );
}

#[test]
fn unknown_value_column_yields_nothing() {
    let tri = triangle(&[(2019, 1, 100.0)]);
    assert!(detect_incremental(&tri, "no_such_column", DEFAULT_Z_THRESHOLD).is_empty());
}

#[test]
fn method_hint_selects_detector() {
    assert_eq!(OutlierMethod::from_hint("Z-Score on incremental amounts"), OutlierMethod::ZScore);
    assert_eq!(OutlierMethod::from_hint("zscore_incremental"), OutlierMethod::ZScore);
    assert_eq!(OutlierMethod::from_hint("IQR on age-to-age factors"), OutlierMethod::Iqr);
    assert_eq!(OutlierMethod::from_hint(""), OutlierMethod::Iqr);
}
