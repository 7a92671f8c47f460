//! Chart data for the visualization collaborator.
//!
//! Each section is built independently and reports its own failure, so a
//! triangle missing paid amounts still yields development curves.

use crate::{
    error::{TriangleError, TriangleResult},
    triangle::{IncrementalPoint, NormalizedTriangle},
    types::{AccidentYear, DevPeriod, ACCIDENT_YEAR, DEVELOPMENT_QUARTER, INCURRED_CUM, PAID_CUM},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub accident_year:       AccidentYear,
    pub development_quarter: DevPeriod,
    pub incurred_cum:        f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioPoint {
    pub development_quarter: DevPeriod,
    pub paid:                f64,
    pub incurred:            f64,
    /// paid / incurred; `None` when incurred sums to zero.
    pub ratio:               Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub development_curves:   Vec<CurvePoint>,
    pub paid_incurred_ratio:  Vec<RatioPoint>,
    pub incremental_heatmap:  Vec<IncrementalPoint>,
    /// Sections that could not be built, with the reason.
    pub unavailable:          Vec<String>,
}

impl ChartData {
    /// Build every section; a failed section is recorded in `unavailable`.
    pub fn build(triangle: &NormalizedTriangle) -> Self {
        let mut data = ChartData::default();

        match development_curves(triangle) {
            Ok(points) => data.development_curves = points,
            Err(e)     => data.record_unavailable("development_curves", e),
        }
        match paid_incurred_ratio(triangle) {
            Ok(points) => data.paid_incurred_ratio = points,
            Err(e)     => data.record_unavailable("paid_incurred_ratio", e),
        }
        match incremental_heatmap(triangle) {
            Ok(points) => data.incremental_heatmap = points,
            Err(e)     => data.record_unavailable("incremental_heatmap", e),
        }
        data
    }

    fn record_unavailable(&mut self, section: &str, error: TriangleError) {
        log::warn!("chart section {section} skipped: {error}");
        self.unavailable.push(format!("{section}: {error}"));
    }
}

fn require(triangle: &NormalizedTriangle, column: &str) -> TriangleResult<()> {
    if triangle.frame().has_column(column) {
        Ok(())
    } else {
        Err(TriangleError::MissingColumn { column: column.into() })
    }
}

/// Cumulative incurred by cohort and development quarter.
pub fn development_curves(triangle: &NormalizedTriangle) -> TriangleResult<Vec<CurvePoint>> {
    require(triangle, ACCIDENT_YEAR)?;
    require(triangle, DEVELOPMENT_QUARTER)?;
    let observations = triangle
        .observations(INCURRED_CUM)
        .ok_or_else(|| TriangleError::MissingColumn { column: INCURRED_CUM.into() })?;

    Ok(observations
        .into_iter()
        .filter_map(|o| {
            Some(CurvePoint {
                accident_year:       o.accident_year,
                development_quarter: o.development_quarter?,
                incurred_cum:        o.value?,
            })
        })
        .collect())
}

/// Portfolio paid-to-incurred ratio per development quarter.
pub fn paid_incurred_ratio(triangle: &NormalizedTriangle) -> TriangleResult<Vec<RatioPoint>> {
    for column in [PAID_CUM, INCURRED_CUM, DEVELOPMENT_QUARTER] {
        require(triangle, column)?;
    }

    let mut totals: BTreeMap<DevPeriod, (f64, f64)> = BTreeMap::new();
    for row in triangle.rows() {
        let Some(dq) = row.development_quarter else {
            continue;
        };
        let entry = totals.entry(dq).or_insert((0.0, 0.0));
        entry.0 += row.paid_cum.unwrap_or(0.0);
        entry.1 += row.incurred_cum.unwrap_or(0.0);
    }

    Ok(totals
        .into_iter()
        .map(|(development_quarter, (paid, incurred))| RatioPoint {
            development_quarter,
            paid,
            incurred,
            ratio: (incurred != 0.0).then(|| paid / incurred),
        })
        .collect())
}

/// Incremental incurred per cohort and development quarter.
pub fn incremental_heatmap(triangle: &NormalizedTriangle) -> TriangleResult<Vec<IncrementalPoint>> {
    require(triangle, ACCIDENT_YEAR)?;
    require(triangle, DEVELOPMENT_QUARTER)?;
    triangle
        .incremental_series(INCURRED_CUM)
        .ok_or_else(|| TriangleError::MissingColumn { column: INCURRED_CUM.into() })
}
