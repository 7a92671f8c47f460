//! Synthetic cumulative claims triangle for demos and tests.
//!
//! Cohort i (0-based) observes `max_development_quarters - 4 * i` quarters
//! (at least one), giving the usual triangle shape at a common valuation
//! date. Cumulative columns never decrease within a cohort; occasional
//! large-loss jumps give the outlier detectors something to find.

use crate::{
    frame::{Column, Frame},
    rng::CohortRng,
    types::{
        AccidentYear, ACCIDENT_YEAR, DEVELOPMENT_QUARTER, EXPOSURE_POLICIES, INCURRED_CUM,
        LINE_OF_BUSINESS, PAID_CUM, REPORTED_CLAIMS_CUM, ULTIMATE_CLAIMS, ULTIMATE_INCURRED,
        VALUATION_QUARTER,
    },
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleTriangleSpec {
    pub seed:                     u64,
    pub first_accident_year:      AccidentYear,
    pub accident_years:           u32,
    pub max_development_quarters: u32,
    pub line_of_business:         String,
    /// Per-quarter probability of a large-loss jump in incurred.
    pub large_loss_probability:   f64,
}

impl Default for SampleTriangleSpec {
    fn default() -> Self {
        Self {
            seed:                     42,
            first_accident_year:      2019,
            accident_years:           6,
            max_development_quarters: 24,
            line_of_business:         "motor_hull".into(),
            large_loss_probability:   0.03,
        }
    }
}

/// Share of ultimate developed by quarter `dq` for a given speed.
fn development_share(dq: u32, speed: f64) -> f64 {
    1.0 - (-speed * dq as f64).exp()
}

fn valuation_label(accident_year: AccidentYear, dq: u32) -> String {
    let offset = i64::from(dq.saturating_sub(1));
    format!("{}Q{}", accident_year + offset / 4, offset % 4 + 1)
}

#[derive(Default)]
struct Columns {
    ay:        Vec<i64>,
    dq:        Vec<i64>,
    incurred:  Vec<Option<f64>>,
    paid:      Vec<Option<f64>>,
    reported:  Vec<i64>,
    ult_inc:   Vec<Option<f64>>,
    exposure:  Vec<i64>,
    ult_cnt:   Vec<i64>,
    lob:       Vec<Option<String>>,
    valuation: Vec<Option<String>>,
}

/// Generate a triangle as a raw frame (untyped the way a CSV would be:
/// integers as int64, amounts as float64).
pub fn generate(spec: &SampleTriangleSpec) -> Frame {
    let mut cols = Columns::default();

    for cohort in 0..spec.accident_years {
        let ay = spec.first_accident_year + i64::from(cohort);
        let mut rng = CohortRng::for_cohort(spec.seed, ay);
        let observed = spec
            .max_development_quarters
            .saturating_sub(4 * cohort)
            .max(1);

        let exposure = rng.exposure(8_000, 4_000);
        let frequency = rng.normal(0.08, 0.008).max(0.02);
        let ultimate_claims = (exposure as f64 * frequency).round().max(1.0);
        let severity = rng.normal(4_500.0, 450.0).max(1_000.0);
        let ultimate_incurred = ultimate_claims * severity;

        let mut incurred = 0.0f64;
        let mut paid = 0.0f64;
        let mut reported = 0i64;

        for dq in 1..=observed {
            let noise = rng.development_noise(0.02);
            let target = ultimate_incurred * development_share(dq, 0.35) * noise;
            incurred = incurred.max(target);
            if let Some(shock) = rng.large_loss(spec.large_loss_probability, ultimate_incurred * 0.05, 2.5) {
                incurred += shock;
            }

            let paid_target = ultimate_incurred * development_share(dq, 0.18);
            paid = paid.max(paid_target.min(incurred));

            let reported_target = (ultimate_claims * development_share(dq, 0.6)).round() as i64;
            reported = reported.max(reported_target);

            cols.ay.push(ay);
            cols.dq.push(i64::from(dq));
            cols.incurred.push(Some(incurred.round()));
            cols.paid.push(Some(paid.round()));
            cols.reported.push(reported);
            cols.ult_inc.push(Some(ultimate_incurred.round()));
            cols.exposure.push(exposure);
            cols.ult_cnt.push(ultimate_claims as i64);
            cols.lob.push(Some(spec.line_of_business.clone()));
            cols.valuation.push(Some(valuation_label(ay, dq)));
        }
    }

    log::debug!(
        "sample triangle: seed={} cohorts={} rows={}",
        spec.seed,
        spec.accident_years,
        cols.ay.len()
    );

    Frame::new(vec![
        Column::int64(ACCIDENT_YEAR, cols.ay),
        Column::int64(DEVELOPMENT_QUARTER, cols.dq),
        Column::float64(INCURRED_CUM, cols.incurred),
        Column::float64(PAID_CUM, cols.paid),
        Column::int64(REPORTED_CLAIMS_CUM, cols.reported),
        Column::float64(ULTIMATE_INCURRED, cols.ult_inc),
        Column::int64(EXPOSURE_POLICIES, cols.exposure),
        Column::int64(ULTIMATE_CLAIMS, cols.ult_cnt),
        Column::object(LINE_OF_BUSINESS, cols.lob),
        Column::object(VALUATION_QUARTER, cols.valuation),
    ])
    .unwrap_or_default()
}
