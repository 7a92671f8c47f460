//! Outlier engine — two independent detectors over the same triangle.
//!
//!   - iqr:    Tukey fences on per-cohort age-to-age factors.
//!   - zscore: cross-sectional z-scores on incremental amounts, grouped by
//!             development quarter.
//!
//! Both are pure and never fail: triangles too small for statistics give
//! empty or degenerate (zero-z, collapsed-fence) results.

pub mod iqr;
pub mod zscore;

pub use iqr::{detect_age_to_age, TukeyFence, TUKEY_MULTIPLIER};
pub use zscore::{detect_incremental, Moments, DEFAULT_Z_THRESHOLD};

use crate::{
    triangle::Transition,
    types::{AccidentYear, DevPeriod},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    /// IQR / Tukey fences on age-to-age factors.
    Iqr,
    /// z-score on incremental amounts.
    ZScore,
}

impl OutlierMethod {
    /// Pick a detector from free text such as a suggested method name.
    /// Anything that does not name a z-score falls back to IQR.
    pub fn from_hint(hint: &str) -> Self {
        let hint = hint.to_lowercase();
        if ["z-score", "zscore", "z score", "z_score"].iter().any(|k| hint.contains(k)) {
            OutlierMethod::ZScore
        } else {
            OutlierMethod::Iqr
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OutlierMethod::Iqr    => "iqr_age_to_age",
            OutlierMethod::ZScore => "zscore_incremental",
        }
    }
}

/// What a flag row was computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagGroup {
    Transition(Transition),
    Period(DevPeriod),
}

impl FlagGroup {
    pub fn label(&self) -> String {
        match self {
            FlagGroup::Transition(t) => t.to_string(),
            FlagGroup::Period(p)     => p.to_string(),
        }
    }
}

/// The statistics a flag decision was made against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlagBasis {
    TukeyFence {
        q1:    f64,
        q3:    f64,
        iqr:   f64,
        lower: f64,
        upper: f64,
    },
    ZScore {
        z:       f64,
        mean:    f64,
        std_dev: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierFlagRow {
    pub method:        OutlierMethod,
    pub group:         FlagGroup,
    pub accident_year: AccidentYear,
    /// Age-to-age factor or incremental amount.
    pub value:         f64,
    pub basis:         FlagBasis,
    pub is_outlier:    bool,
}

pub fn outlier_count(rows: &[OutlierFlagRow]) -> usize {
    rows.iter().filter(|r| r.is_outlier).count()
}
