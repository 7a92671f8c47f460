//! Session context — the explicit state passed between workflow stages.
//!
//! RULE: stages read and write named fields on SessionContext. There is no
//! lookup by string key and no global store. The caller owns the context
//! and decides its lifetime.

use crate::{
    eda::EdaReport,
    event::{EventLogEntry, WorkflowEvent},
    llm::LlmOutput,
    outlier::{OutlierFlagRow, OutlierMethod},
    schema::{Recommendations, VisualPlan},
    summary::SummaryReport,
    triangle::NormalizedTriangle,
    types::SessionId,
    viz::ChartData,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Stage 1: normalization + EDA + optional narrative.
    Analysis,
    /// Stage 2: outlier-method recommendations.
    Recommendations,
    /// Stage 3: visual plan, chart data and the chosen detector.
    Visualization,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Analysis, Stage::Recommendations, Stage::Visualization];

    pub fn number(&self) -> u8 {
        match self {
            Stage::Analysis        => 1,
            Stage::Recommendations => 2,
            Stage::Visualization   => 3,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.number() == n)
    }

    /// This stage followed by every stage that consumes its outputs.
    pub fn with_downstream(self) -> impl Iterator<Item = Stage> {
        Self::ALL.into_iter().filter(move |s| s.number() >= self.number())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Analysis        => "analysis",
            Stage::Recommendations => "recommendations",
            Stage::Visualization   => "visualization",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionContext {
    pub session_id:      SessionId,
    pub started_at:      DateTime<Utc>,
    // Stage 1
    pub triangle:        Option<NormalizedTriangle>,
    pub notes:           Vec<String>,
    pub eda:             Option<EdaReport>,
    pub llm_summary:     Option<LlmOutput>,
    // Stage 2
    pub recommendations: Option<Recommendations>,
    // Stage 3
    pub visual_plan:     Option<VisualPlan>,
    pub chart_data:      Option<ChartData>,
    pub outlier_method:  Option<OutlierMethod>,
    pub outliers:        Option<Vec<OutlierFlagRow>>,
    pub events:          Vec<EventLogEntry>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            session_id:      uuid::Uuid::new_v4().to_string(),
            started_at:      Utc::now(),
            triangle:        None,
            notes:           Vec::new(),
            eda:             None,
            llm_summary:     None,
            recommendations: None,
            visual_plan:     None,
            chart_data:      None,
            outlier_method:  None,
            outliers:        None,
            events:          Vec::new(),
        }
    }

    pub fn summary(&self) -> Option<&SummaryReport> {
        self.eda.as_ref().map(|e| &e.summary)
    }

    /// Whether a stage's outputs are present.
    pub fn is_complete(&self, stage: Stage) -> bool {
        match stage {
            Stage::Analysis        => self.triangle.is_some() && self.eda.is_some(),
            Stage::Recommendations => self.recommendations.is_some(),
            Stage::Visualization   => self.outliers.is_some(),
        }
    }

    pub fn record(&mut self, event: WorkflowEvent) {
        log::debug!("session {} event: {}", self.session_id, event.kind());
        let seq = self.events.len() as u64;
        self.events.push(EventLogEntry {
            seq,
            at: Utc::now(),
            event,
        });
    }

    /// Drop a stage's outputs. Stage 1 also drops the triangle itself.
    pub fn clear(&mut self, stage: Stage) {
        match stage {
            Stage::Analysis => {
                self.triangle = None;
                self.notes.clear();
                self.eda = None;
                self.llm_summary = None;
            }
            Stage::Recommendations => {
                self.recommendations = None;
            }
            Stage::Visualization => {
                self.visual_plan = None;
                self.chart_data = None;
                self.outlier_method = None;
                self.outliers = None;
            }
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
