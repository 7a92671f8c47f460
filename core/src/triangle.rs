//! Triangle normalizer and the canonical claims-triangle views.
//!
//! RULES:
//!   - normalize() never fails on malformed cells. They become nulls and
//!     flow downstream as missing data.
//!   - Missing expected columns are advisory: a note per column, never an error.
//!   - The caller's frame is never mutated; a new canonical copy is returned.

use crate::{
    frame::{Column, Frame, Value},
    types::{
        AccidentYear, DevPeriod, ACCIDENT_YEAR, DEVELOPMENT_QUARTER, EXPOSURE_POLICIES,
        INCURRED_CUM, LINE_OF_BUSINESS, PAID_CUM, REPORTED_CLAIMS_CUM, REQUIRED_COLUMNS,
        ULTIMATE_CLAIMS, ULTIMATE_INCURRED, VALUATION_QUARTER,
    },
};
use serde::{Deserialize, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Columns coerced to nullable integers.
pub const INTEGER_COLUMNS: [&str; 5] = [
    ACCIDENT_YEAR,
    DEVELOPMENT_QUARTER,
    ULTIMATE_CLAIMS,
    REPORTED_CLAIMS_CUM,
    EXPOSURE_POLICIES,
];

/// Columns coerced to floating point.
pub const FLOAT_COLUMNS: [&str; 3] = [INCURRED_CUM, PAID_CUM, ULTIMATE_INCURRED];

// ── Rows ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimsTriangleRow {
    pub accident_year:       Option<AccidentYear>,
    pub development_quarter: Option<DevPeriod>,
    pub incurred_cum:        Option<f64>,
    pub paid_cum:            Option<f64>,
    pub reported_claims_cum: Option<i64>,
    pub ultimate_incurred:   Option<f64>,
    pub exposure_policies:   Option<i64>,
    pub ultimate_claims:     Option<i64>,
    pub line_of_business:    Option<String>,
    pub valuation_quarter:   Option<String>,
}

/// One cell of a cumulative column keyed by cohort. Rows with a null
/// accident year are never observations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub accident_year:       AccidentYear,
    pub development_quarter: Option<DevPeriod>,
    pub value:               Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IncrementalPoint {
    pub accident_year:       AccidentYear,
    pub development_quarter: DevPeriod,
    pub cumulative:          f64,
    pub incremental:         f64,
}

// ── Normalized triangle ──────────────────────────────────────────────────────

/// Rows sorted by (accident_year, development_quarter), nulls last, with
/// canonical column types. Read-only once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedTriangle {
    frame: Frame,
}

impl NormalizedTriangle {
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn len(&self) -> usize {
        self.frame.n_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.n_rows() == 0
    }

    pub fn rows(&self) -> Vec<ClaimsTriangleRow> {
        let ints   = |name: &str| self.frame.column(name).map(Column::to_i64);
        let floats = |name: &str| self.frame.column(name).map(Column::to_f64);

        let ay       = ints(ACCIDENT_YEAR);
        let dq       = ints(DEVELOPMENT_QUARTER);
        let reported = ints(REPORTED_CLAIMS_CUM);
        let exposure = ints(EXPOSURE_POLICIES);
        let ult_cnt  = ints(ULTIMATE_CLAIMS);
        let incurred = floats(INCURRED_CUM);
        let paid     = floats(PAID_CUM);
        let ult_inc  = floats(ULTIMATE_INCURRED);
        let lob      = self.frame.column(LINE_OF_BUSINESS);
        let valq     = self.frame.column(VALUATION_QUARTER);

        fn at<T: Copy>(col: &Option<Vec<Option<T>>>, row: usize) -> Option<T> {
            col.as_ref().and_then(|v| v[row])
        }

        (0..self.len())
            .map(|row| ClaimsTriangleRow {
                accident_year:       at(&ay, row),
                development_quarter: at(&dq, row),
                incurred_cum:        at(&incurred, row),
                paid_cum:            at(&paid, row),
                reported_claims_cum: at(&reported, row),
                ultimate_incurred:   at(&ult_inc, row),
                exposure_policies:   at(&exposure, row),
                ultimate_claims:     at(&ult_cnt, row),
                line_of_business:    lob.and_then(|c| text_value(c.value(row))),
                valuation_quarter:   valq.and_then(|c| text_value(c.value(row))),
            })
            .collect()
    }

    /// Observations of `column` in triangle order. `None` when either the
    /// accident-year column or the value column is absent.
    pub fn observations(&self, column: &str) -> Option<Vec<Observation>> {
        let ay     = self.frame.column(ACCIDENT_YEAR)?.to_i64();
        let values = self.frame.column(column)?.to_f64();
        let dq = self
            .frame
            .column(DEVELOPMENT_QUARTER)
            .map(Column::to_i64)
            .unwrap_or_else(|| vec![None; self.len()]);

        Some(
            ay.into_iter()
                .zip(dq)
                .zip(values)
                .filter_map(|((ay, dq), value)| {
                    ay.map(|accident_year| Observation {
                        accident_year,
                        development_quarter: dq,
                        value,
                    })
                })
                .collect(),
        )
    }

    /// Distinct accident years in ascending order.
    pub fn accident_years(&self) -> Vec<AccidentYear> {
        self.frame
            .column(ACCIDENT_YEAR)
            .map(|c| c.to_i64().into_iter().flatten().collect::<BTreeSet<_>>())
            .unwrap_or_default()
            .into_iter()
            .collect()
    }

    /// Per-cohort period-over-period differences of a cumulative column.
    ///
    /// The first observed period of a cohort (or one following a missing
    /// cumulative value) takes its cumulative value as the increment.
    /// Cells with a missing cumulative value or development quarter are
    /// skipped.
    pub fn incremental_series(&self, column: &str) -> Option<Vec<IncrementalPoint>> {
        let mut observations: Vec<Observation> = self
            .observations(column)?
            .into_iter()
            .filter(|o| o.development_quarter.is_some())
            .collect();
        observations.sort_by(|a, b| {
            a.accident_year
                .cmp(&b.accident_year)
                .then_with(|| a.development_quarter.cmp(&b.development_quarter))
        });

        let mut points = Vec::with_capacity(observations.len());
        let mut cohort: Option<AccidentYear> = None;
        let mut prev: Option<f64> = None;

        for obs in observations {
            if cohort != Some(obs.accident_year) {
                cohort = Some(obs.accident_year);
                prev = None;
            }
            if let (Some(value), Some(dq)) = (obs.value, obs.development_quarter) {
                let incremental = prev.map_or(value, |p| value - p);
                points.push(IncrementalPoint {
                    accident_year: obs.accident_year,
                    development_quarter: dq,
                    cumulative: value,
                    incremental,
                });
            }
            prev = obs.value;
        }
        Some(points)
    }
}

impl Serialize for NormalizedTriangle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.frame.records(self.len()))
    }
}

fn text_value(value: Value) -> Option<String> {
    match value {
        Value::Null     => None,
        Value::Text(s)  => Some(s),
        Value::Int(v)   => Some(v.to_string()),
        Value::Float(v) => Some(v.to_string()),
        Value::Bool(v)  => Some(v.to_string()),
    }
}

fn cmp_nulls_last(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None)    => Ordering::Less,
        (None, Some(_))    => Ordering::Greater,
        (None, None)       => Ordering::Equal,
    }
}

/// Validate and coerce a raw table into canonical triangle shape.
///
/// Returns the normalized triangle plus one advisory note per missing
/// required column.
pub fn normalize(raw: &Frame) -> (NormalizedTriangle, Vec<String>) {
    let notes: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| !raw.has_column(name))
        .map(|name| format!("missing expected column: {name}"))
        .collect();
    for note in &notes {
        log::warn!("normalize: {note}");
    }

    let mut frame = raw.clone();
    for name in INTEGER_COLUMNS {
        if let Some(column) = raw.column(name) {
            frame.replace_column(Column::nullable_int64(name, column.to_i64()));
        }
    }
    for name in FLOAT_COLUMNS {
        if let Some(column) = raw.column(name) {
            frame.replace_column(Column::float64(name, column.to_f64()));
        }
    }

    let keys = |name: &str| frame.column(name).map(Column::to_i64);
    let ay = keys(ACCIDENT_YEAR);
    let dq = keys(DEVELOPMENT_QUARTER);
    let key = |col: &Option<Vec<Option<i64>>>, row: usize| col.as_ref().and_then(|v| v[row]);

    // Stable: equal keys keep their original relative order.
    let mut order: Vec<usize> = (0..frame.n_rows()).collect();
    order.sort_by(|&a, &b| {
        cmp_nulls_last(key(&ay, a), key(&ay, b))
            .then_with(|| cmp_nulls_last(key(&dq, a), key(&dq, b)))
    });

    let frame = frame.take(&order);
    log::debug!(
        "normalize: rows={} cols={} notes={}",
        frame.n_rows(),
        frame.n_cols(),
        notes.len()
    );
    (NormalizedTriangle { frame }, notes)
}

// ── Pivot ────────────────────────────────────────────────────────────────────

/// An adjacent development pair (j, j+1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Transition {
    pub from: DevPeriod,
    pub to:   DevPeriod,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

/// accident_year × development_quarter → last non-null value per cell.
/// A later row for the same cell overwrites an earlier one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LastValuePivot {
    cells:   BTreeMap<AccidentYear, BTreeMap<DevPeriod, f64>>,
    periods: BTreeSet<DevPeriod>,
}

impl LastValuePivot {
    /// `None` when the key columns or the value column are absent.
    pub fn build(triangle: &NormalizedTriangle, value_column: &str) -> Option<Self> {
        if !triangle.frame().has_column(DEVELOPMENT_QUARTER) {
            return None;
        }
        let mut pivot = Self::default();
        for obs in triangle.observations(value_column)? {
            let (Some(dq), Some(value)) = (obs.development_quarter, obs.value) else {
                continue;
            };
            pivot.cells.entry(obs.accident_year).or_default().insert(dq, value);
            pivot.periods.insert(dq);
        }
        Some(pivot)
    }

    pub fn accident_years(&self) -> impl Iterator<Item = AccidentYear> + '_ {
        self.cells.keys().copied()
    }

    pub fn periods(&self) -> &BTreeSet<DevPeriod> {
        &self.periods
    }

    pub fn get(&self, accident_year: AccidentYear, period: DevPeriod) -> Option<f64> {
        self.cells.get(&accident_year).and_then(|row| row.get(&period)).copied()
    }

    /// Sum over all accident years of a period; `None` when the period has
    /// no observed cells.
    pub fn period_total(&self, period: DevPeriod) -> Option<f64> {
        if !self.periods.contains(&period) {
            return None;
        }
        Some(self.cells.values().filter_map(|row| row.get(&period)).sum())
    }

    /// Every (j, j+1) pair where both periods are present as columns.
    pub fn transitions(&self) -> Vec<Transition> {
        self.periods
            .iter()
            .filter_map(|&j| {
                j.checked_add(1)
                    .filter(|next| self.periods.contains(next))
                    .map(|to| Transition { from: j, to })
            })
            .collect()
    }
}
