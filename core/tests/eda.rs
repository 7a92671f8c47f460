use reserveai_core::{
    eda::{analyze, check_monotonic, development_coverage},
    frame::{Column, Frame},
    triangle::{normalize, NormalizedTriangle, Observation},
    types::{ACCIDENT_YEAR, DEVELOPMENT_QUARTER, INCURRED_CUM, PAID_CUM, REPORTED_CLAIMS_CUM},
};

fn cohort(accident_year: i64, values: &[Option<f64>]) -> Vec<Observation> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| Observation {
            accident_year,
            development_quarter: Some(i as i64 + 1),
            value: *value,
        })
        .collect()
}

fn triangle(ay: Vec<i64>, dq: Vec<i64>, incurred: Vec<Option<f64>>) -> NormalizedTriangle {
    let paid = incurred.clone();
    let raw = Frame::new(vec![
        Column::int64(ACCIDENT_YEAR, ay),
        Column::int64(DEVELOPMENT_QUARTER, dq),
        Column::float64(INCURRED_CUM, incurred),
        Column::float64(PAID_CUM, paid),
    ])
    .unwrap();
    normalize(&raw).0
}

#[test]
fn strict_decrease_is_a_violation() {
    let check = check_monotonic(cohort(2019, &[Some(100.0), Some(90.0), Some(150.0)]));
    assert!(!check.ok);
    assert_eq!(check.violations_by_accident_year, vec![2019]);
}

#[test]
fn flat_development_is_monotone() {
    let check = check_monotonic(cohort(2019, &[Some(100.0), Some(100.0), Some(150.0)]));
    assert!(check.ok);
    assert!(check.violations_by_accident_year.is_empty());
}

#[test]
fn missing_values_compare_as_zero() {
    let check = check_monotonic(cohort(2020, &[Some(100.0), None, Some(150.0)]));
    assert_eq!(check.violations_by_accident_year, vec![2020]);

    let leading_gap = check_monotonic(cohort(2021, &[None, Some(10.0), Some(20.0)]));
    assert!(leading_gap.ok);
}

#[test]
fn violations_are_listed_once_per_cohort_in_order() {
    let mut observations = cohort(2021, &[Some(50.0), Some(40.0), Some(30.0)]);
    observations.extend(cohort(2019, &[Some(10.0), Some(5.0)]));
    observations.extend(cohort(2020, &[Some(1.0), Some(2.0)]));

    let check = check_monotonic(observations);
    assert_eq!(check.violations_by_accident_year, vec![2019, 2021]);
}

#[test]
fn decrease_across_cohorts_is_not_a_violation() {
    let mut observations = cohort(2019, &[Some(500.0)]);
    observations.extend(cohort(2020, &[Some(10.0)]));
    assert!(check_monotonic(observations).ok);
}

#[test]
fn report_checks_only_present_tracked_columns() {
    let tri = triangle(
        vec![2019, 2019, 2020],
        vec![1, 2, 1],
        vec![Some(100.0), Some(90.0), Some(40.0)],
    );
    let report = analyze(&tri);

    assert!(report.monotonicity.contains_key(INCURRED_CUM));
    assert!(report.monotonicity.contains_key(PAID_CUM));
    assert!(!report.monotonicity.contains_key(REPORTED_CLAIMS_CUM));
    assert_eq!(report.monotonicity[INCURRED_CUM].violations_by_accident_year, vec![2019]);
}

#[test]
fn coverage_is_max_period_per_cohort() {
    let tri = triangle(
        vec![2019, 2019, 2019, 2020, 2020, 2021],
        vec![1, 3, 2, 1, 2, 1],
        vec![Some(1.0); 6],
    );
    let coverage = development_coverage(&tri);
    assert_eq!(coverage.get(&2019), Some(&3));
    assert_eq!(coverage.get(&2020), Some(&2));
    assert_eq!(coverage.get(&2021), Some(&1));

    let report = analyze(&tri);
    assert_eq!(report.dev_quarter_max_by_accident_year, Some(coverage));
}

#[test]
fn coverage_absent_without_development_quarter() {
    let raw = Frame::new(vec![
        Column::int64(ACCIDENT_YEAR, vec![2019, 2020]),
        Column::float64(INCURRED_CUM, vec![Some(10.0), Some(20.0)]),
    ])
    .unwrap();
    let (tri, _) = normalize(&raw);
    let report = analyze(&tri);

    assert!(report.dev_quarter_max_by_accident_year.is_none());
    assert!(report.monotonicity[INCURRED_CUM].ok);
}

#[test]
fn analysis_is_deterministic() {
    let tri = triangle(
        vec![2019, 2019, 2020, 2020],
        vec![1, 2, 1, 2],
        vec![Some(100.0), Some(120.0), Some(80.0), Some(70.0)],
    );
    assert_eq!(analyze(&tri), analyze(&tri));
}
