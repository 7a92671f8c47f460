//! Column-oriented table — the generic tabular input to the normalizer.
//!
//! RULES:
//!   - Every column holds exactly `n_rows` cells.
//!   - Float columns never hold NaN; a NaN cell is stored as a null.
//!   - Int64 columns never hold nulls. A nullable integer column is
//!     NullableInt64 (dtype label "Int64").

use crate::error::{TriangleError, TriangleResult};
use serde::Serialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// Cell spellings read as missing values.
const NULL_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_null_marker(cell: &str) -> bool {
    NULL_MARKERS.contains(&cell.trim())
}

// ── Cells ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Int64,
    NullableInt64,
    Float64,
    Bool,
    Object,
}

impl DType {
    pub fn label(&self) -> &'static str {
        match self {
            DType::Int64         => "int64",
            DType::NullableInt64 => "Int64",
            DType::Float64       => "float64",
            DType::Bool          => "bool",
            DType::Object        => "object",
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, DType::Object)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null     => serde_json::Value::Null,
            Value::Int(v)   => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bool(v)  => serde_json::Value::Bool(*v),
            Value::Text(v)  => serde_json::Value::String(v.clone()),
        }
    }
}

/// Parse a text cell the way a lenient numeric coercion does:
/// anything unparseable becomes a null.
pub fn parse_f64(cell: &str) -> Option<f64> {
    if is_null_marker(cell) {
        return None;
    }
    cell.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

pub fn parse_i64(cell: &str) -> Option<i64> {
    if is_null_marker(cell) {
        return None;
    }
    let trimmed = cell.trim();
    trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| parse_f64(trimmed).and_then(f64_to_i64))
}

/// Integral, in-range floats convert; everything else is a null.
pub fn f64_to_i64(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

fn parse_bool(cell: &str) -> Option<bool> {
    match cell.trim() {
        "True" | "true" | "TRUE"    => Some(true),
        "False" | "false" | "FALSE" => Some(false),
        _ => None,
    }
}

// ── Columns ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int64(Vec<i64>),
    NullableInt64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
    Bool(Vec<Option<bool>>),
    Object(Vec<Option<String>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn int64(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self { name: name.into(), data: ColumnData::Int64(values) }
    }

    pub fn nullable_int64(name: impl Into<String>, values: Vec<Option<i64>>) -> Self {
        Self { name: name.into(), data: ColumnData::NullableInt64(values) }
    }

    pub fn float64(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        let values = values.into_iter().map(|v| v.filter(|x| !x.is_nan())).collect();
        Self { name: name.into(), data: ColumnData::Float64(values) }
    }

    pub fn boolean(name: impl Into<String>, values: Vec<Option<bool>>) -> Self {
        Self { name: name.into(), data: ColumnData::Bool(values) }
    }

    pub fn object(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self { name: name.into(), data: ColumnData::Object(values) }
    }

    /// Convenience for string columns; `None` entries are nulls.
    pub fn text(name: impl Into<String>, values: &[Option<&str>]) -> Self {
        Self::object(name, values.iter().map(|v| v.map(str::to_string)).collect())
    }

    /// Infer a column type from raw text cells (nulls already removed).
    ///
    /// All integers with no nulls → int64; integers with nulls or any
    /// float → float64; all boolean literals with no nulls → bool;
    /// anything else → object. An all-null column is float64.
    pub fn infer(name: impl Into<String>, cells: Vec<Option<String>>) -> Self {
        let name = name.into();
        let has_nulls = cells.iter().any(Option::is_none);
        let present: Vec<&str> = cells.iter().flatten().map(String::as_str).collect();

        if present.iter().all(|c| c.trim().parse::<i64>().is_ok()) && !present.is_empty() {
            if has_nulls {
                let values = cells
                    .iter()
                    .map(|c| c.as_deref().and_then(|s| s.trim().parse::<i64>().ok()).map(|v| v as f64))
                    .collect();
                return Self::float64(name, values);
            }
            let values = present.iter().filter_map(|c| c.trim().parse::<i64>().ok()).collect();
            return Self::int64(name, values);
        }

        if present.iter().all(|c| parse_f64(c).is_some()) {
            let values = cells.iter().map(|c| c.as_deref().and_then(parse_f64)).collect();
            return Self::float64(name, values);
        }

        if !has_nulls && present.iter().all(|c| parse_bool(c).is_some()) {
            let values = present.iter().map(|c| parse_bool(c)).collect();
            return Self::boolean(name, values);
        }

        Self::object(name, cells)
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Int64(v)         => v.len(),
            ColumnData::NullableInt64(v) => v.len(),
            ColumnData::Float64(v)       => v.len(),
            ColumnData::Bool(v)          => v.len(),
            ColumnData::Object(v)        => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> DType {
        match &self.data {
            ColumnData::Int64(_)         => DType::Int64,
            ColumnData::NullableInt64(_) => DType::NullableInt64,
            ColumnData::Float64(_)       => DType::Float64,
            ColumnData::Bool(_)          => DType::Bool,
            ColumnData::Object(_)        => DType::Object,
        }
    }

    pub fn value(&self, row: usize) -> Value {
        match &self.data {
            ColumnData::Int64(v)         => v.get(row).map_or(Value::Null, |x| Value::Int(*x)),
            ColumnData::NullableInt64(v) => v.get(row).copied().flatten().map_or(Value::Null, Value::Int),
            ColumnData::Float64(v)       => v.get(row).copied().flatten().map_or(Value::Null, Value::Float),
            ColumnData::Bool(v)          => v.get(row).copied().flatten().map_or(Value::Null, Value::Bool),
            ColumnData::Object(v)        => v
                .get(row)
                .cloned()
                .flatten()
                .map_or(Value::Null, Value::Text),
        }
    }

    pub fn null_count(&self) -> usize {
        match &self.data {
            ColumnData::Int64(_)         => 0,
            ColumnData::NullableInt64(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Float64(v)       => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Bool(v)          => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Object(v)        => v.iter().filter(|x| x.is_none()).count(),
        }
    }

    /// Number of distinct non-null values.
    pub fn unique_count(&self) -> usize {
        match &self.data {
            ColumnData::Int64(v) => v.iter().collect::<HashSet<_>>().len(),
            ColumnData::NullableInt64(v) => v.iter().flatten().collect::<HashSet<_>>().len(),
            ColumnData::Float64(v) => v
                .iter()
                .flatten()
                // -0.0 and 0.0 are the same value
                .map(|x| if *x == 0.0 { 0.0f64.to_bits() } else { x.to_bits() })
                .collect::<HashSet<_>>()
                .len(),
            ColumnData::Bool(v) => v.iter().flatten().collect::<HashSet<_>>().len(),
            ColumnData::Object(v) => v.iter().flatten().collect::<HashSet<_>>().len(),
        }
    }

    /// Lenient numeric coercion: unconvertible cells become nulls.
    pub fn to_f64(&self) -> Vec<Option<f64>> {
        match &self.data {
            ColumnData::Int64(v)         => v.iter().map(|x| Some(*x as f64)).collect(),
            ColumnData::NullableInt64(v) => v.iter().map(|x| x.map(|i| i as f64)).collect(),
            ColumnData::Float64(v)       => v.clone(),
            ColumnData::Bool(v)          => v.iter().map(|x| x.map(|b| if b { 1.0 } else { 0.0 })).collect(),
            ColumnData::Object(v)        => v.iter().map(|x| x.as_deref().and_then(parse_f64)).collect(),
        }
    }

    /// Lenient integer coercion: unconvertible or non-integral cells
    /// become nulls.
    pub fn to_i64(&self) -> Vec<Option<i64>> {
        match &self.data {
            ColumnData::Int64(v)         => v.iter().map(|x| Some(*x)).collect(),
            ColumnData::NullableInt64(v) => v.clone(),
            ColumnData::Float64(v)       => v.iter().map(|x| x.and_then(f64_to_i64)).collect(),
            ColumnData::Bool(v)          => v.iter().map(|x| x.map(i64::from)).collect(),
            ColumnData::Object(v)        => v.iter().map(|x| x.as_deref().and_then(parse_i64)).collect(),
        }
    }

    /// Sum over non-null cells of a numeric column. `None` for object
    /// columns. An all-null numeric column sums to 0.
    pub fn numeric_sum(&self) -> Option<f64> {
        if !self.dtype().is_numeric() {
            return None;
        }
        Some(self.to_f64().into_iter().flatten().sum())
    }

    /// Reorder (or subset) rows by index.
    pub fn take(&self, order: &[usize]) -> Self {
        fn pick<T: Clone>(v: &[T], order: &[usize]) -> Vec<T> {
            order.iter().map(|&i| v[i].clone()).collect()
        }
        let data = match &self.data {
            ColumnData::Int64(v)         => ColumnData::Int64(pick(v, order)),
            ColumnData::NullableInt64(v) => ColumnData::NullableInt64(pick(v, order)),
            ColumnData::Float64(v)       => ColumnData::Float64(pick(v, order)),
            ColumnData::Bool(v)          => ColumnData::Bool(pick(v, order)),
            ColumnData::Object(v)        => ColumnData::Object(pick(v, order)),
        };
        Self { name: self.name.clone(), data }
    }
}

// ── Frame ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    columns: Vec<Column>,
    n_rows:  usize,
}

impl Frame {
    /// Build a frame. Every column must have the same number of rows.
    pub fn new(columns: Vec<Column>) -> TriangleResult<Self> {
        let n_rows = columns.first().map_or(0, Column::len);
        for column in &columns {
            if column.len() != n_rows {
                return Err(TriangleError::ShapeMismatch {
                    column:   column.name.clone(),
                    expected: n_rows,
                    actual:   column.len(),
                });
            }
        }
        Ok(Self { columns, n_rows })
    }

    pub fn from_csv_path(path: impl AsRef<Path>, delimiter: u8) -> TriangleResult<Self> {
        let path = path.as_ref();
        log::debug!("reading triangle CSV from {}", path.display());
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file, delimiter)
    }

    /// Read a delimiter-separated table with a header row.
    pub fn from_csv_reader<R: Read>(reader: R, delimiter: u8) -> TriangleResult<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];

        for record in rdr.records() {
            let record = record?;
            for (i, cell) in record.iter().enumerate() {
                let cell = if is_null_marker(cell) { None } else { Some(cell.to_string()) };
                cells[i].push(cell);
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, raw)| Column::infer(name, raw))
            .collect();
        Self::new(columns)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Swap in a column of the same name and length.
    pub(crate) fn replace_column(&mut self, column: Column) {
        debug_assert_eq!(column.len(), self.n_rows);
        if let Some(slot) = self.columns.iter_mut().find(|c| c.name == column.name) {
            *slot = column;
        }
    }

    /// New frame with rows in the given order.
    pub fn take(&self, order: &[usize]) -> Self {
        Self {
            columns: self.columns.iter().map(|c| c.take(order)).collect(),
            n_rows:  order.len(),
        }
    }

    /// The first `limit` rows as JSON records keyed by column name.
    pub fn records(&self, limit: usize) -> Vec<serde_json::Map<String, serde_json::Value>> {
        (0..self.n_rows.min(limit))
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| (c.name.clone(), c.value(row).to_json()))
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_dtypes_from_text_cells() {
        let csv = "a,b,c,d,e\n1,1.5,x,true,\n2,,y,false,\n";
        let frame = Frame::from_csv_reader(csv.as_bytes(), b',').unwrap();
        let labels: Vec<_> = frame.columns().iter().map(|c| c.dtype().label()).collect();
        assert_eq!(labels, vec!["int64", "float64", "object", "bool", "float64"]);
        assert_eq!(frame.column("b").unwrap().null_count(), 1);
        assert_eq!(frame.column("e").unwrap().null_count(), 2);
    }

    #[test]
    fn integers_with_nulls_become_float() {
        let csv = "a\n1\nNA\n3\n";
        let frame = Frame::from_csv_reader(csv.as_bytes(), b',').unwrap();
        let col = frame.column("a").unwrap();
        assert_eq!(col.dtype(), DType::Float64);
        assert_eq!(col.to_f64(), vec![Some(1.0), None, Some(3.0)]);
    }

    #[test]
    fn non_integral_floats_do_not_coerce_to_int() {
        let col = Column::float64("x", vec![Some(2.0), Some(2.5), None]);
        assert_eq!(col.to_i64(), vec![Some(2), None, None]);
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let err = Frame::new(vec![
            Column::int64("a", vec![1, 2]),
            Column::int64("b", vec![1]),
        ])
        .unwrap_err();
        assert!(matches!(err, TriangleError::ShapeMismatch { .. }));
    }
}
