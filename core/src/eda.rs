//! EDA engine — the summary report plus per-cohort monotonicity checks and
//! development coverage.
//!
//! Pure and deterministic: the same triangle always yields the same report.

use crate::{
    summary::{summarize_with, SummaryReport, SEGMENT_MAX_UNIQUE},
    triangle::{NormalizedTriangle, Observation},
    types::{AccidentYear, DevPeriod, DEVELOPMENT_QUARTER, INCURRED_CUM, PAID_CUM, REPORTED_CLAIMS_CUM},
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Cumulative columns checked for non-decreasing development.
pub const TRACKED_COLUMNS: [&str; 3] = [INCURRED_CUM, PAID_CUM, REPORTED_CLAIMS_CUM];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonotonicityCheck {
    pub ok: bool,
    pub violations_by_accident_year: Vec<AccidentYear>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdaReport {
    pub summary: SummaryReport,
    /// Keyed by tracked column name; only columns present in the triangle.
    pub monotonicity: BTreeMap<String, MonotonicityCheck>,
    /// Highest development quarter observed per cohort. Absent when the
    /// triangle has no development_quarter column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_quarter_max_by_accident_year: Option<BTreeMap<AccidentYear, DevPeriod>>,
}

pub fn analyze(triangle: &NormalizedTriangle) -> EdaReport {
    analyze_with(triangle, SEGMENT_MAX_UNIQUE)
}

pub fn analyze_with(triangle: &NormalizedTriangle, segment_max_unique: usize) -> EdaReport {
    let summary = summarize_with(triangle, segment_max_unique);

    let monotonicity = TRACKED_COLUMNS
        .iter()
        .filter_map(|&column| {
            let observations = triangle.observations(column)?;
            Some((column.to_string(), check_monotonic(observations)))
        })
        .collect();

    let coverage = triangle
        .frame()
        .has_column(DEVELOPMENT_QUARTER)
        .then(|| development_coverage(triangle));

    EdaReport {
        summary,
        monotonicity,
        dev_quarter_max_by_accident_year: coverage,
    }
}

/// Flag every cohort whose cumulative values decrease between consecutive
/// development quarters. Missing values compare as 0; equal steps are fine.
pub fn check_monotonic(mut observations: Vec<Observation>) -> MonotonicityCheck {
    observations.sort_by(|a, b| {
        a.accident_year.cmp(&b.accident_year).then_with(|| {
            match (a.development_quarter, b.development_quarter) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None)    => std::cmp::Ordering::Less,
                (None, Some(_))    => std::cmp::Ordering::Greater,
                (None, None)       => std::cmp::Ordering::Equal,
            }
        })
    });

    let mut violations = BTreeSet::new();
    for pair in observations.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if prev.accident_year != next.accident_year {
            continue;
        }
        if next.value.unwrap_or(0.0) < prev.value.unwrap_or(0.0) {
            violations.insert(next.accident_year);
        }
    }

    MonotonicityCheck {
        ok: violations.is_empty(),
        violations_by_accident_year: violations.into_iter().collect(),
    }
}

/// accident_year → maximum development_quarter observed. Cohorts whose
/// quarters are all missing are left out.
pub fn development_coverage(triangle: &NormalizedTriangle) -> BTreeMap<AccidentYear, DevPeriod> {
    let mut coverage: BTreeMap<AccidentYear, DevPeriod> = BTreeMap::new();
    for row in triangle.rows() {
        let (Some(ay), Some(dq)) = (row.accident_year, row.development_quarter) else {
            continue;
        };
        coverage
            .entry(ay)
            .and_modify(|max| *max = (*max).max(dq))
            .or_insert(dq);
    }
    coverage
}
