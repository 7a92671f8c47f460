//! Per-cohort random streams for synthetic triangles.
//!
//! RULE: nothing here reads platform entropy. A cohort's stream is keyed on
//! (master seed, accident year), so one accident year draws the same
//! development no matter how many cohorts sit before or after it.

use crate::types::AccidentYear;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// The draws one accident-year cohort needs: exposure, noise, large losses.
pub struct CohortRng {
    pub accident_year: AccidentYear,
    inner:             Pcg64Mcg,
}

impl CohortRng {
    pub fn for_cohort(master_seed: u64, accident_year: AccidentYear) -> Self {
        let key = accident_year as u64;
        let derived_seed = master_seed ^ key.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self {
            accident_year,
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Exposure units in [base, base + spread).
    pub fn exposure(&mut self, base: i64, spread: i64) -> i64 {
        if spread <= 0 {
            return base;
        }
        base + self.inner.gen_range(0..spread)
    }

    /// Normal draw via Box–Muller.
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1: f64 = self.inner.gen::<f64>().max(1e-12);
        let u2: f64 = self.inner.gen();
        let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
        mean + std_dev * z
    }

    /// Multiplicative development noise around 1.0.
    pub fn development_noise(&mut self, std_dev: f64) -> f64 {
        1.0 + self.normal(0.0, std_dev)
    }

    /// A large-loss shock: `None` most quarters, otherwise a Pareto amount
    /// with minimum `x_min` and shape `alpha`.
    pub fn large_loss(&mut self, probability: f64, x_min: f64, alpha: f64) -> Option<f64> {
        if !self.inner.gen_bool(probability.clamp(0.0, 1.0)) {
            return None;
        }
        let u: f64 = self.inner.gen::<f64>().max(1e-10);
        Some(x_min * u.powf(-1.0 / alpha))
    }
}
