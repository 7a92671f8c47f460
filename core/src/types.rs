//! Shared primitive types used across the entire analysis core.

/// Cohort year in which the claim-generating event occurred.
pub type AccidentYear = i64;

/// 1-based development period index (quarters since origin).
pub type DevPeriod = i64;

/// The canonical session identifier.
pub type SessionId = String;

// ── Canonical column names ───────────────────────────────────────────────────

pub const ACCIDENT_YEAR: &str = "accident_year";
pub const DEVELOPMENT_QUARTER: &str = "development_quarter";
pub const INCURRED_CUM: &str = "incurred_cum";
pub const PAID_CUM: &str = "paid_cum";
pub const REPORTED_CLAIMS_CUM: &str = "reported_claims_cum";
pub const ULTIMATE_INCURRED: &str = "ultimate_incurred";
pub const EXPOSURE_POLICIES: &str = "exposure_policies";
pub const ULTIMATE_CLAIMS: &str = "ultimate_claims";
pub const LINE_OF_BUSINESS: &str = "line_of_business";
pub const VALUATION_QUARTER: &str = "valuation_quarter";

/// Columns every triangle is expected to carry.
pub const REQUIRED_COLUMNS: [&str; 4] = [ACCIDENT_YEAR, DEVELOPMENT_QUARTER, INCURRED_CUM, PAID_CUM];
