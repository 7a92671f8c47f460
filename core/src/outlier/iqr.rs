//! IQR with Tukey fences on age-to-age factors.
//!
//! Fences are [Q1 - k*IQR, Q3 + k*IQR] (k = 1.5 default) over the
//! per-cohort ratios of one transition. A transition whose ratios are all
//! equal has IQR = 0 and a fence collapsed to a point: any deviation flags.

use super::{FlagBasis, FlagGroup, OutlierFlagRow, OutlierMethod};
use crate::{
    triangle::{LastValuePivot, NormalizedTriangle},
    types::{AccidentYear, INCURRED_CUM},
};
use serde::{Deserialize, Serialize};

pub const TUKEY_MULTIPLIER: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TukeyFence {
    pub q1:    f64,
    pub q3:    f64,
    pub iqr:   f64,
    pub lower: f64,
    pub upper: f64,
}

impl TukeyFence {
    /// `None` for an empty sample.
    pub fn from_values(values: &[f64], multiplier: f64) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let q1 = quantile(&sorted, 0.25);
        let q3 = quantile(&sorted, 0.75);
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            iqr,
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        })
    }

    pub fn is_outside(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }

    fn basis(&self) -> FlagBasis {
        FlagBasis::TukeyFence {
            q1:    self.q1,
            q3:    self.q3,
            iqr:   self.iqr,
            lower: self.lower,
            upper: self.upper,
        }
    }
}

/// Quantile of a sorted sample by linear interpolation between closest
/// ranks (rank = p * (n - 1)). `p` in [0, 1].
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let frac = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * frac
        }
    }
}

/// Flag per-cohort age-to-age factors on cumulative incurred.
///
/// One row per (transition, accident year) with a finite ratio. Cohorts
/// missing either side of a transition are dropped; a transition with no
/// ratios emits nothing.
pub fn detect_age_to_age(triangle: &NormalizedTriangle, multiplier: f64) -> Vec<OutlierFlagRow> {
    let Some(pivot) = LastValuePivot::build(triangle, INCURRED_CUM) else {
        log::debug!("iqr: pivot unavailable, no age-to-age flags");
        return Vec::new();
    };

    let mut rows = Vec::new();
    for transition in pivot.transitions() {
        let ratios: Vec<(AccidentYear, f64)> = pivot
            .accident_years()
            .filter_map(|ay| {
                let from = pivot.get(ay, transition.from)?;
                let to = pivot.get(ay, transition.to)?;
                Some((ay, to / from))
            })
            .filter(|(_, r)| r.is_finite())
            .collect();

        let values: Vec<f64> = ratios.iter().map(|(_, r)| *r).collect();
        let Some(fence) = TukeyFence::from_values(&values, multiplier) else {
            continue;
        };

        for (accident_year, ratio) in ratios {
            rows.push(OutlierFlagRow {
                method: OutlierMethod::Iqr,
                group: FlagGroup::Transition(transition),
                accident_year,
                value: ratio,
                basis: fence.basis(),
                is_outlier: fence.is_outside(ratio),
            });
        }
    }

    log::debug!(
        "iqr: {} factors, {} outside fences",
        rows.len(),
        super::outlier_count(&rows)
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_interpolates_linearly() {
        let sorted = vec![1.0, 2.0, 3.0, 4.0];
        assert!((quantile(&sorted, 0.25) - 1.75).abs() < 1e-12);
        assert!((quantile(&sorted, 0.5) - 2.5).abs() < 1e-12);
        assert!((quantile(&sorted, 0.75) - 3.25).abs() < 1e-12);
    }

    #[test]
    fn quantile_of_singleton_is_the_value() {
        assert_eq!(quantile(&[7.5], 0.25), 7.5);
        assert_eq!(quantile(&[7.5], 0.75), 7.5);
    }

    #[test]
    fn identical_values_collapse_the_fence() {
        let fence = TukeyFence::from_values(&[1.2, 1.2, 1.2], TUKEY_MULTIPLIER).unwrap();
        assert_eq!(fence.iqr, 0.0);
        assert_eq!(fence.lower, fence.upper);
        assert!(!fence.is_outside(1.2));
        assert!(fence.is_outside(1.2000001));
    }

    #[test]
    fn empty_sample_has_no_fence() {
        assert!(TukeyFence::from_values(&[], TUKEY_MULTIPLIER).is_none());
    }
}
