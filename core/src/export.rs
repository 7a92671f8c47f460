//! Report export — flat sheets, CSV files and JSON documents.
//!
//! Sheets are the flat form of a SummaryReport. Numbers are written with
//! the shortest representation that parses back to the same f64, so
//! SummaryReport::from_sheets reconstructs a report exactly.

use crate::{
    eda::EdaReport,
    error::{TriangleError, TriangleResult},
    outlier::{FlagBasis, OutlierFlagRow},
    summary::{SegmentCandidate, Shape, SummaryReport},
    types::SessionId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Rows kept in the ChartData sheet.
pub const CHART_TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name:   String,
    pub header: Vec<String>,
    pub rows:   Vec<Vec<String>>,
}

impl Sheet {
    fn new(name: &str, header: &[&str]) -> Self {
        Self {
            name:   name.into(),
            header: header.iter().map(|h| h.to_string()).collect(),
            rows:   Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarySheets {
    pub sheets: Vec<Sheet>,
}

impl SummarySheets {
    pub fn from_summary(report: &SummaryReport) -> Self {
        let mut summary = Sheet::new("Summary", &["rows", "cols"]);
        summary.rows.push(vec![report.shape.rows.to_string(), report.shape.cols.to_string()]);

        let mut columns = Sheet::new("Columns", &["column", "dtype", "nulls", "unique"]);
        for name in &report.columns {
            columns.rows.push(vec![
                name.clone(),
                report.dtypes.get(name).cloned().unwrap_or_default(),
                report.null_counts.get(name).copied().unwrap_or(0).to_string(),
                report.unique_counts.get(name).copied().unwrap_or(0).to_string(),
            ]);
        }

        let mut sums = Sheet::new("NumericSums", &["column", "sum"]);
        for (name, sum) in ordered_sums(report) {
            sums.rows.push(vec![name.to_string(), sum.to_string()]);
        }

        let mut segments = Sheet::new("Segments", &["column", "unique"]);
        for candidate in &report.segment_candidates {
            segments.rows.push(vec![candidate.column.clone(), candidate.unique.to_string()]);
        }

        let mut sheets = vec![summary, columns, sums, segments];

        if !report.age_to_age_incurred.is_empty() {
            let mut ata = Sheet::new("AgeToAge", &["age_to_age", "factor"]);
            let mut factors: Vec<(&String, &f64)> = report.age_to_age_incurred.iter().collect();
            factors.sort_by_key(|(label, _)| transition_start(label));
            for (label, factor) in factors {
                ata.rows.push(vec![label.clone(), factor.to_string()]);
            }
            sheets.push(ata);
        }

        let mut chart = Sheet::new("ChartData", &["column", "sum"]);
        let mut top = ordered_sums(report);
        top.sort_by(|a, b| b.1.total_cmp(&a.1));
        for (name, sum) in top.into_iter().take(CHART_TOP_N) {
            chart.rows.push(vec![name.to_string(), sum.to_string()]);
        }
        sheets.push(chart);

        Self { sheets }
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// One CSV file per sheet, named `<sheet>.csv`.
    pub fn write_csv_dir(&self, dir: &Path) -> TriangleResult<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(self.sheets.len());
        for sheet in &self.sheets {
            let path = dir.join(format!("{}.csv", sheet.name));
            let mut wtr = csv::Writer::from_path(&path)?;
            wtr.write_record(&sheet.header)?;
            for row in &sheet.rows {
                wtr.write_record(row)?;
            }
            wtr.flush()?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Numeric sums in table column order.
fn ordered_sums(report: &SummaryReport) -> Vec<(&str, f64)> {
    report
        .columns
        .iter()
        .filter_map(|c| report.numeric_sums.get(c).map(|s| (c.as_str(), *s)))
        .collect()
}

fn transition_start(label: &str) -> i64 {
    label
        .split("->")
        .next()
        .and_then(|j| j.parse().ok())
        .unwrap_or(i64::MAX)
}

// ── Reconstruction ───────────────────────────────────────────────────────────

fn malformed(sheet: &str, reason: impl Into<String>) -> TriangleError {
    TriangleError::SheetFormat {
        sheet:  sheet.into(),
        reason: reason.into(),
    }
}

fn cell<'a>(sheet: &Sheet, row: &'a [String], idx: usize) -> TriangleResult<&'a str> {
    row.get(idx)
        .map(String::as_str)
        .ok_or_else(|| malformed(&sheet.name, format!("row has no column {idx}")))
}

fn parse_cell<T: std::str::FromStr>(sheet: &Sheet, row: &[String], idx: usize) -> TriangleResult<T> {
    let raw = cell(sheet, row, idx)?;
    raw.parse()
        .map_err(|_| malformed(&sheet.name, format!("cannot parse '{raw}'")))
}

impl SummaryReport {
    /// Rebuild a report from its flat sheets.
    pub fn from_sheets(sheets: &SummarySheets) -> TriangleResult<Self> {
        let require = |name: &str| sheets.sheet(name).ok_or_else(|| malformed(name, "sheet missing"));

        let summary = require("Summary")?;
        let first = summary.rows.first().ok_or_else(|| malformed("Summary", "no rows"))?;
        let shape = Shape {
            rows: parse_cell(summary, first, 0)?,
            cols: parse_cell(summary, first, 1)?,
        };

        let columns_sheet = require("Columns")?;
        let mut columns       = Vec::new();
        let mut dtypes        = BTreeMap::new();
        let mut null_counts   = BTreeMap::new();
        let mut unique_counts = BTreeMap::new();
        for row in &columns_sheet.rows {
            let name = cell(columns_sheet, row, 0)?.to_string();
            dtypes.insert(name.clone(), cell(columns_sheet, row, 1)?.to_string());
            null_counts.insert(name.clone(), parse_cell(columns_sheet, row, 2)?);
            unique_counts.insert(name.clone(), parse_cell(columns_sheet, row, 3)?);
            columns.push(name);
        }

        let sums_sheet = require("NumericSums")?;
        let mut numeric_sums = BTreeMap::new();
        for row in &sums_sheet.rows {
            numeric_sums.insert(cell(sums_sheet, row, 0)?.to_string(), parse_cell(sums_sheet, row, 1)?);
        }

        let segments_sheet = require("Segments")?;
        let mut segment_candidates = Vec::new();
        for row in &segments_sheet.rows {
            segment_candidates.push(SegmentCandidate {
                column: cell(segments_sheet, row, 0)?.to_string(),
                unique: parse_cell(segments_sheet, row, 1)?,
            });
        }

        let mut age_to_age_incurred = BTreeMap::new();
        if let Some(ata) = sheets.sheet("AgeToAge") {
            for row in &ata.rows {
                age_to_age_incurred.insert(cell(ata, row, 0)?.to_string(), parse_cell(ata, row, 1)?);
            }
        }

        Ok(SummaryReport {
            shape,
            columns,
            dtypes,
            null_counts,
            unique_counts,
            numeric_sums,
            segment_candidates,
            age_to_age_incurred,
        })
    }
}

// ── Files ────────────────────────────────────────────────────────────────────

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> TriangleResult<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

/// Flag rows as CSV: one line per row, fence or moment columns left empty
/// when they do not apply.
pub fn write_outliers_csv(path: &Path, rows: &[OutlierFlagRow]) -> TriangleResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "method", "group", "accident_year", "value", "lower", "upper", "z", "mean", "std_dev",
        "is_outlier",
    ])?;
    for row in rows {
        let (lower, upper, z, mean, std_dev) = match row.basis {
            FlagBasis::TukeyFence { lower, upper, .. } => {
                (lower.to_string(), upper.to_string(), String::new(), String::new(), String::new())
            }
            FlagBasis::ZScore { z, mean, std_dev } => {
                (String::new(), String::new(), z.to_string(), mean.to_string(), std_dev.to_string())
            }
        };
        wtr.write_record([
            row.method.label().to_string(),
            row.group.label(),
            row.accident_year.to_string(),
            row.value.to_string(),
            lower,
            upper,
            z,
            mean,
            std_dev,
            row.is_outlier.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportManifest {
    pub session_id:   SessionId,
    pub generated_at: DateTime<Utc>,
    pub files:        Vec<PathBuf>,
}

/// Write the analysis report (JSON + sheets) and, when present, the
/// outlier flags into `dir`, finishing with `manifest.json`.
pub fn export_report(
    dir: &Path,
    session_id: &str,
    eda: &EdaReport,
    outliers: Option<&[OutlierFlagRow]>,
) -> TriangleResult<ExportManifest> {
    std::fs::create_dir_all(dir)?;

    let eda_path = dir.join("eda.json");
    write_json(&eda_path, eda)?;

    let mut files = vec![eda_path];
    files.extend(SummarySheets::from_summary(&eda.summary).write_csv_dir(dir)?);

    if let Some(rows) = outliers {
        let csv_path = dir.join("outliers.csv");
        write_outliers_csv(&csv_path, rows)?;
        let json_path = dir.join("outliers.json");
        write_json(&json_path, &rows)?;
        files.push(csv_path);
        files.push(json_path);
    }

    let manifest = ExportManifest {
        session_id: session_id.to_string(),
        generated_at: Utc::now(),
        files,
    };
    write_json(&dir.join("manifest.json"), &manifest)?;
    log::info!("exported {} files to {}", manifest.files.len(), dir.display());
    Ok(manifest)
}
