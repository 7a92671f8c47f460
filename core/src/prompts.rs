//! Prompt text for the three workflow stages.
//!
//! Reports are embedded verbatim as JSON. The core imposes no schema on
//! the model beyond the keys requested here.

use crate::{
    eda::EdaReport,
    error::TriangleResult,
    export::SummarySheets,
    llm::LlmOutput,
    schema::Recommendations,
    triangle::NormalizedTriangle,
};
use serde::Serialize;

/// Stage 1: a short narrative over the EDA report.
pub fn analysis_prompt(eda: &EdaReport) -> TriangleResult<String> {
    let eda_json = serde_json::to_string(eda)?;
    Ok(format!(
        "You are an actuarial assistant focusing on motor hull cumulative claims.
Summarize this EDA in <=150 words. Emphasize: shape, numeric totals, low-cardinality
segments, monotonicity, and material age-to-age signals.
EDA_JSON:
{eda_json}
"
    ))
}

/// Stage 2: an outlier analysis plan, requested as JSON.
pub fn recommendation_prompt(sheets: &SummarySheets, eda: &EdaReport) -> TriangleResult<String> {
    let sheets_json = serde_json::to_string(sheets)?;
    let eda_json = serde_json::to_string(eda)?;
    Ok(format!(
        "You are an actuarial data QA consultant. Given the dataset summary sheets from the
analysis stage and the initial EDA, propose an OUTLIER analysis plan specifically for
cumulative claims triangles.
Cover:
- pointwise outliers on incremental amounts (IQR/Tukey, z-score, robust MAD),
- outliers on age-to-age factors (IQR and robust methods),
- EVT/POT with Hill estimator for heavy tails (outline steps, threshold selection, diagnostics),
- time-dependence checks (AY/devQ structure),
- practical thresholds and step-by-step workflow.
Output JSON with keys: methods[], thresholds[], workflow[], notes.
SUMMARY_SHEETS_JSON: {sheets_json}
EDA_JSON: {eda_json}
"
    ))
}

#[derive(Serialize)]
struct AnalysisContext<'a> {
    eda:         &'a EdaReport,
    llm_summary: Option<&'a LlmOutput>,
}

/// Stage 3: pick one locally computable method and a visual plan.
pub fn visualization_prompt(
    triangle: &NormalizedTriangle,
    eda: &EdaReport,
    llm_summary: Option<&LlmOutput>,
    recommendations: &Recommendations,
    sample_rows: usize,
) -> TriangleResult<String> {
    let analysis_json = serde_json::to_string(&AnalysisContext { eda, llm_summary })?;
    let recommendations_json = serde_json::to_string(recommendations)?;
    let sample_json = serde_json::to_string(&triangle.frame().records(sample_rows))?;
    Ok(format!(
        "You are an actuarial analyst. From the suggested methods decide ONE applicable analysis and
produce a short plan (<=120 words) for visuals and interpretation. Prefer an analysis that can
be computed locally (IQR on age-to-age factors, or z-score on incremental amounts). Return JSON:
{{
  \"chosen_method\": \"<name>\",
  \"reason\": \"<short>\",
  \"visuals\": [\"<chart suggestion>\", \"...\"],
  \"interpretation_focus\": [\"<bullets>\"]
}}
CONTEXT_ANALYSIS={analysis_json}
CONTEXT_RECOMMENDATIONS={recommendations_json}
SAMPLE_ROWS={sample_json}
"
    ))
}
