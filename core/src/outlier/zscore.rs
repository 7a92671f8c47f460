//! z-score on incremental amounts, cross-sectionally per development quarter.
//!
//! Incrementals come from differencing each cohort's cumulative column.
//! Each development quarter is one group: mean and sample standard
//! deviation (N-1) across accident years. A single-member group has
//! std_dev = 0, and std_dev = 0 means z = 0 and nothing flags.

use super::{FlagBasis, FlagGroup, OutlierFlagRow, OutlierMethod};
use crate::{
    triangle::{IncrementalPoint, NormalizedTriangle},
    types::DevPeriod,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    pub mean:    f64,
    pub std_dev: f64,
}

impl Moments {
    /// `None` for an empty sample.
    pub fn sample(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std_dev = if values.len() < 2 {
            0.0
        } else {
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            variance.sqrt()
        };
        Some(Self { mean, std_dev })
    }

    pub fn z(&self, value: f64) -> f64 {
        if self.std_dev > 0.0 && self.std_dev.is_finite() {
            (value - self.mean) / self.std_dev
        } else {
            0.0
        }
    }
}

/// Flag incremental amounts of `value_column` whose |z| reaches `threshold`.
///
/// Rows come out ordered by development quarter, then accident year.
pub fn detect_incremental(
    triangle: &NormalizedTriangle,
    value_column: &str,
    threshold: f64,
) -> Vec<OutlierFlagRow> {
    let Some(points) = triangle.incremental_series(value_column) else {
        log::debug!("zscore: column '{value_column}' unavailable, no flags");
        return Vec::new();
    };

    let mut groups: BTreeMap<DevPeriod, Vec<IncrementalPoint>> = BTreeMap::new();
    for point in points {
        groups.entry(point.development_quarter).or_default().push(point);
    }

    let mut rows = Vec::new();
    for (period, members) in groups {
        let values: Vec<f64> = members.iter().map(|p| p.incremental).collect();
        let Some(moments) = Moments::sample(&values) else {
            continue;
        };
        for point in members {
            let z = moments.z(point.incremental);
            rows.push(OutlierFlagRow {
                method: OutlierMethod::ZScore,
                group: FlagGroup::Period(period),
                accident_year: point.accident_year,
                value: point.incremental,
                basis: FlagBasis::ZScore {
                    z,
                    mean: moments.mean,
                    std_dev: moments.std_dev,
                },
                is_outlier: moments.std_dev > 0.0 && z.abs() >= threshold,
            });
        }
    }

    log::debug!(
        "zscore: {} incrementals on '{value_column}', {} at |z| >= {threshold}",
        rows.len(),
        super::outlier_count(&rows)
    );
    rows
}
