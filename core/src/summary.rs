//! Summary engine — shape, per-column statistics, segment candidates and
//! portfolio-level age-to-age development factors.
//!
//! RULE: numeric sums skip nulls. A null is missing data, never a zero.

use crate::{
    triangle::{LastValuePivot, NormalizedTriangle},
    types::INCURRED_CUM,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Columns with more distinct values than this are not segment candidates.
pub const SEGMENT_MAX_UNIQUE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCandidate {
    pub column: String,
    pub unique: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub shape:               Shape,
    /// Column names in table order.
    pub columns:             Vec<String>,
    pub dtypes:              BTreeMap<String, String>,
    pub null_counts:         BTreeMap<String, usize>,
    pub unique_counts:       BTreeMap<String, usize>,
    pub numeric_sums:        BTreeMap<String, f64>,
    pub segment_candidates:  Vec<SegmentCandidate>,
    /// "j->j+1" → sum(incurred at j+1) / sum(incurred at j).
    pub age_to_age_incurred: BTreeMap<String, f64>,
}

pub fn summarize(triangle: &NormalizedTriangle) -> SummaryReport {
    summarize_with(triangle, SEGMENT_MAX_UNIQUE)
}

pub fn summarize_with(triangle: &NormalizedTriangle, segment_max_unique: usize) -> SummaryReport {
    let frame = triangle.frame();

    let mut dtypes        = BTreeMap::new();
    let mut null_counts   = BTreeMap::new();
    let mut unique_counts = BTreeMap::new();
    let mut numeric_sums  = BTreeMap::new();
    let mut segment_candidates = Vec::new();

    for column in frame.columns() {
        let unique = column.unique_count();
        dtypes.insert(column.name.clone(), column.dtype().label().to_string());
        null_counts.insert(column.name.clone(), column.null_count());
        unique_counts.insert(column.name.clone(), unique);

        if let Some(sum) = column.numeric_sum() {
            numeric_sums.insert(column.name.clone(), sum);
        }
        if unique > 1 && unique <= segment_max_unique {
            segment_candidates.push(SegmentCandidate {
                column: column.name.clone(),
                unique,
            });
        }
    }

    SummaryReport {
        shape: Shape {
            rows: frame.n_rows(),
            cols: frame.n_cols(),
        },
        columns: frame.column_names().into_iter().map(str::to_string).collect(),
        dtypes,
        null_counts,
        unique_counts,
        numeric_sums,
        segment_candidates,
        age_to_age_incurred: age_to_age_factors(triangle),
    }
}

/// Portfolio age-to-age factors on cumulative incurred.
///
/// A transition is omitted when either period total is zero or the period
/// has no observed cells. An unbuildable pivot yields an empty map.
pub fn age_to_age_factors(triangle: &NormalizedTriangle) -> BTreeMap<String, f64> {
    let Some(pivot) = LastValuePivot::build(triangle, INCURRED_CUM) else {
        log::debug!("age-to-age: pivot unavailable, key or value column missing");
        return BTreeMap::new();
    };

    let mut factors = BTreeMap::new();
    for transition in pivot.transitions() {
        let (Some(den), Some(num)) = (
            pivot.period_total(transition.from),
            pivot.period_total(transition.to),
        ) else {
            continue;
        };
        if den == 0.0 || num == 0.0 {
            log::debug!("age-to-age: {transition} skipped, zero period total");
            continue;
        }
        let ratio = num / den;
        if ratio.is_finite() {
            factors.insert(transition.to_string(), ratio);
        }
    }
    factors
}
