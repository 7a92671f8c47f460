use reserveai_core::{
    frame::{Column, Frame},
    summary::{age_to_age_factors, summarize, summarize_with},
    triangle::{normalize, NormalizedTriangle},
    types::{ACCIDENT_YEAR, DEVELOPMENT_QUARTER, INCURRED_CUM, PAID_CUM},
};

/// (accident_year, development_quarter, incurred_cum)
fn triangle(cells: &[(i64, i64, f64)]) -> NormalizedTriangle {
    let raw = Frame::new(vec![
        Column::int64(ACCIDENT_YEAR, cells.iter().map(|c| c.0).collect()),
        Column::int64(DEVELOPMENT_QUARTER, cells.iter().map(|c| c.1).collect()),
        Column::float64(INCURRED_CUM, cells.iter().map(|c| Some(c.2)).collect()),
        Column::float64(PAID_CUM, cells.iter().map(|c| Some(c.2 * 0.5)).collect()),
    ])
    .unwrap();
    normalize(&raw).0
}

#[test]
fn numeric_sums_skip_nulls_and_ignore_text() {
    let raw = Frame::new(vec![
        Column::int64(ACCIDENT_YEAR, vec![2019, 2019, 2020]),
        Column::int64(DEVELOPMENT_QUARTER, vec![1, 2, 1]),
        Column::float64(INCURRED_CUM, vec![Some(100.0), None, Some(50.0)]),
        Column::float64(PAID_CUM, vec![None, None, None]),
        Column::text("line_of_business", &[Some("motor"), Some("motor"), None]),
    ])
    .unwrap();
    let (tri, _) = normalize(&raw);
    let report = summarize(&tri);

    assert_eq!(report.shape.rows, 3);
    assert_eq!(report.shape.cols, 5);
    assert_eq!(report.numeric_sums[INCURRED_CUM], 150.0);
    assert_eq!(report.numeric_sums[PAID_CUM], 0.0);
    assert_eq!(report.null_counts[PAID_CUM], 3);
    assert_eq!(report.null_counts[INCURRED_CUM], 1);
    assert_eq!(report.null_counts["line_of_business"], 1);
    assert!(!report.numeric_sums.contains_key("line_of_business"));
    assert_eq!(report.dtypes[ACCIDENT_YEAR], "Int64");
    assert_eq!(report.dtypes["line_of_business"], "object");
}

#[test]
fn segment_candidates_need_two_to_twelve_distinct_values() {
    let n = 26;
    let raw = Frame::new(vec![
        Column::int64("constant", vec![1; n]),
        Column::int64("twelve", (0..n as i64).map(|i| i % 12).collect()),
        Column::int64("thirteen", (0..n as i64).map(|i| i % 13).collect()),
        Column::int64("two", (0..n as i64).map(|i| i % 2).collect()),
    ])
    .unwrap();
    let (tri, _) = normalize(&raw);
    let report = summarize(&tri);

    let candidates: Vec<_> = report
        .segment_candidates
        .iter()
        .map(|c| (c.column.as_str(), c.unique))
        .collect();
    assert_eq!(candidates, vec![("twelve", 12), ("two", 2)]);
    assert_eq!(report.unique_counts["constant"], 1);
    assert_eq!(report.unique_counts["thirteen"], 13);
}

#[test]
fn segment_limit_is_configurable() {
    let raw = Frame::new(vec![Column::int64("five", (0..10).map(|i| i % 5).collect())]).unwrap();
    let (tri, _) = normalize(&raw);

    assert_eq!(summarize_with(&tri, 5).segment_candidates.len(), 1);
    assert!(summarize_with(&tri, 4).segment_candidates.is_empty());
}

#[test]
fn age_to_age_is_ratio_of_period_totals() {
    let tri = triangle(&[
        (2019, 1, 100.0),
        (2019, 2, 150.0),
        (2019, 3, 165.0),
        (2020, 1, 200.0),
        (2020, 2, 280.0),
    ]);
    let factors = age_to_age_factors(&tri);

    assert_eq!(factors.len(), 2);
    assert!((factors["1->2"] - 430.0 / 300.0).abs() < 1e-12);
    assert!((factors["2->3"] - 165.0 / 430.0).abs() < 1e-12);
}

#[test]
fn age_to_age_skips_zero_totals_and_gaps() {
    let zero_start = triangle(&[(2019, 1, 0.0), (2019, 2, 50.0), (2019, 3, 60.0)]);
    let factors = age_to_age_factors(&zero_start);
    assert!(!factors.contains_key("1->2"));
    assert!((factors["2->3"] - 1.2).abs() < 1e-12);

    let zero_end = triangle(&[(2019, 1, 50.0), (2019, 2, 0.0), (2020, 1, 40.0)]);
    assert!(age_to_age_factors(&zero_end).is_empty());

    let gap = triangle(&[(2019, 1, 10.0), (2019, 3, 30.0)]);
    assert!(age_to_age_factors(&gap).is_empty());
}

#[test]
fn age_to_age_empty_without_incurred_column() {
    let raw = Frame::new(vec![
        Column::int64(ACCIDENT_YEAR, vec![2019, 2019]),
        Column::int64(DEVELOPMENT_QUARTER, vec![1, 2]),
    ])
    .unwrap();
    let (tri, _) = normalize(&raw);
    assert!(age_to_age_factors(&tri).is_empty());
    assert!(summarize(&tri).age_to_age_incurred.is_empty());
}

#[test]
fn age_to_age_factors_are_finite_and_positive() {
    let tri = triangle(&[
        (2019, 1, 120.0),
        (2019, 2, 180.0),
        (2020, 1, 90.0),
        (2020, 2, 95.0),
        (2021, 1, 60.0),
    ]);
    for (label, factor) in summarize(&tri).age_to_age_incurred {
        assert!(factor.is_finite() && factor > 0.0, "{label} = {factor}");
    }
}
