//! The workflow event log.
//!
//! RULE: every stage transition and every fallback (model skipped or
//! failed, chart section missing) is recorded here. Nothing degrades
//! silently.

use crate::{outlier::OutlierMethod, session::Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    // ── Input ──────────────────────────────────────
    TriangleLoaded {
        rows: usize,
        cols: usize,
    },
    NormalizationNote {
        note: String,
    },

    // ── Stage results ──────────────────────────────
    AnalysisCompleted {
        rows:                    usize,
        age_to_age_factors:      usize,
        monotonicity_violations: usize,
    },
    RecommendationsReady {
        from_model: bool,
    },
    OutliersFlagged {
        method:   OutlierMethod,
        rows:     usize,
        outliers: usize,
    },
    StageCleared {
        stage: Stage,
    },

    // ── Fallbacks ──────────────────────────────────
    LlmSkipped {
        stage: Stage,
    },
    LlmUnavailable {
        stage:  Stage,
        reason: String,
    },
    ChartSectionUnavailable {
        reason: String,
    },
}

impl WorkflowEvent {
    /// Stable name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowEvent::TriangleLoaded { .. }          => "triangle_loaded",
            WorkflowEvent::NormalizationNote { .. }       => "normalization_note",
            WorkflowEvent::AnalysisCompleted { .. }       => "analysis_completed",
            WorkflowEvent::RecommendationsReady { .. }    => "recommendations_ready",
            WorkflowEvent::OutliersFlagged { .. }         => "outliers_flagged",
            WorkflowEvent::StageCleared { .. }            => "stage_cleared",
            WorkflowEvent::LlmSkipped { .. }              => "llm_skipped",
            WorkflowEvent::LlmUnavailable { .. }          => "llm_unavailable",
            WorkflowEvent::ChartSectionUnavailable { .. } => "chart_section_unavailable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub seq:   u64,
    pub at:    DateTime<Utc>,
    pub event: WorkflowEvent,
}
