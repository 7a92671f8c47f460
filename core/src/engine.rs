//! The workflow engine — drives the three analysis stages over a session.
//!
//! STAGE ORDER (each requires the outputs of the ones before it):
//!   1. Analysis         normalized triangle → EDA report (+ narrative)
//!   2. Recommendations  EDA → outlier-method suggestions
//!   3. Visualization    plan → chart data + the chosen outlier detector
//!
//! RULES:
//!   - Core statistics are always computed. The language model only adds
//!     narrative, and its absence or failure never blocks a stage.
//!   - Every fallback is recorded in the session event log.
//!   - The triangle is never mutated after load(); stage outputs are
//!     derived views, recomputed on each run.

use crate::{
    config::AnalysisConfig,
    eda::analyze_with,
    error::{TriangleError, TriangleResult},
    event::WorkflowEvent,
    export::SummarySheets,
    frame::Frame,
    llm::{LlmClient, LlmOutput, ResponsesClient},
    outlier::{detect_age_to_age, detect_incremental, outlier_count, OutlierFlagRow, OutlierMethod},
    prompts,
    schema::{validate_json_output, Recommendations, VisualPlan, RECOMMENDATION_KEYS, VISUAL_PLAN_KEYS},
    session::{SessionContext, Stage},
    triangle::{normalize, NormalizedTriangle},
    viz::ChartData,
};
use std::path::Path;

pub struct WorkflowEngine {
    config: AnalysisConfig,
    llm:    Option<Box<dyn LlmClient>>,
}

impl WorkflowEngine {
    pub fn new(config: AnalysisConfig, llm: Option<Box<dyn LlmClient>>) -> Self {
        Self { config, llm }
    }

    /// Engine with no language model; every stage runs on local statistics.
    pub fn offline(config: AnalysisConfig) -> Self {
        Self::new(config, None)
    }

    /// Engine with a Responses client when the configured API key is set.
    pub fn from_env(config: AnalysisConfig) -> TriangleResult<Self> {
        let llm = ResponsesClient::from_env(&config.llm)?
            .map(|client| Box::new(client) as Box<dyn LlmClient>);
        Ok(Self::new(config, llm))
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    // ── Input ────────────────────────────────────────────────────────────

    /// Normalize a raw table into the session. Outputs derived from a
    /// previously loaded triangle are dropped.
    pub fn load(&self, ctx: &mut SessionContext, raw: &Frame) {
        for stage in Stage::ALL {
            ctx.clear(stage);
        }

        let (triangle, notes) = normalize(raw);
        ctx.record(WorkflowEvent::TriangleLoaded {
            rows: triangle.len(),
            cols: triangle.frame().n_cols(),
        });
        for note in &notes {
            ctx.record(WorkflowEvent::NormalizationNote { note: note.clone() });
        }
        ctx.triangle = Some(triangle);
        ctx.notes = notes;
    }

    pub fn load_csv(&self, ctx: &mut SessionContext, path: &Path) -> TriangleResult<()> {
        let raw = Frame::from_csv_path(path, self.config.input.delimiter_byte())?;
        log::info!("loaded {} rows from {}", raw.n_rows(), path.display());
        self.load(ctx, &raw);
        Ok(())
    }

    // ── Stages ───────────────────────────────────────────────────────────

    pub fn run_stage(&self, ctx: &mut SessionContext, stage: Stage) -> TriangleResult<()> {
        match stage {
            Stage::Analysis        => self.run_analysis(ctx),
            Stage::Recommendations => self.run_recommendations(ctx),
            Stage::Visualization   => self.run_visualization(ctx),
        }
    }

    /// Stage 1: EDA over the loaded triangle, plus an optional narrative.
    pub fn run_analysis(&self, ctx: &mut SessionContext) -> TriangleResult<()> {
        let triangle = ctx
            .triangle
            .as_ref()
            .ok_or_else(|| not_ready(Stage::Analysis, "normalized triangle"))?;

        let eda = analyze_with(triangle, self.config.summary.segment_max_unique);
        let violations = eda
            .monotonicity
            .values()
            .map(|c| c.violations_by_accident_year.len())
            .sum();

        ctx.clear(Stage::Recommendations);
        ctx.clear(Stage::Visualization);
        ctx.record(WorkflowEvent::AnalysisCompleted {
            rows: eda.summary.shape.rows,
            age_to_age_factors: eda.summary.age_to_age_incurred.len(),
            monotonicity_violations: violations,
        });

        let reply = self.ask(Stage::Analysis, || prompts::analysis_prompt(&eda));
        ctx.llm_summary = settle(ctx, reply);
        ctx.eda = Some(eda);
        Ok(())
    }

    /// Stage 2: outlier-method suggestions, or the offline skeleton.
    pub fn run_recommendations(&self, ctx: &mut SessionContext) -> TriangleResult<()> {
        if ctx.triangle.is_none() {
            return Err(not_ready(Stage::Recommendations, "normalized triangle"));
        }
        let eda = ctx
            .eda
            .as_ref()
            .ok_or_else(|| not_ready(Stage::Recommendations, "analysis output"))?;

        let reply = self.ask(Stage::Recommendations, || {
            let sheets = SummarySheets::from_summary(&eda.summary);
            prompts::recommendation_prompt(&sheets, eda)
        });
        let reply = settle(ctx, reply);

        let from_model = reply.as_ref().is_some_and(|r| !r.is_empty());
        let reply = match reply {
            Some(r) if from_model => r,
            _ => skeleton_recommendations(),
        };

        let validated = validate_json_output(Some(&reply), &RECOMMENDATION_KEYS);
        ctx.recommendations = Some(Recommendations::from_validated(validated));
        ctx.clear(Stage::Visualization);
        ctx.record(WorkflowEvent::RecommendationsReady { from_model });
        Ok(())
    }

    /// Stage 3: visual plan, chart data and the chosen outlier detector.
    pub fn run_visualization(&self, ctx: &mut SessionContext) -> TriangleResult<()> {
        let triangle = ctx
            .triangle
            .as_ref()
            .ok_or_else(|| not_ready(Stage::Visualization, "normalized triangle"))?;
        let eda = ctx
            .eda
            .as_ref()
            .ok_or_else(|| not_ready(Stage::Visualization, "analysis output"))?;
        let recommendations = ctx
            .recommendations
            .as_ref()
            .ok_or_else(|| not_ready(Stage::Visualization, "recommendations"))?;

        let reply = self.ask(Stage::Visualization, || {
            prompts::visualization_prompt(
                triangle,
                eda,
                ctx.llm_summary.as_ref(),
                recommendations,
                self.config.prompts.sample_rows,
            )
        });
        let plan = reply
            .as_ref()
            .ok()
            .map(|r| VisualPlan::from_validated(&validate_json_output(Some(r), &VISUAL_PLAN_KEYS)));

        let method = plan
            .as_ref()
            .map_or(OutlierMethod::Iqr, |p| OutlierMethod::from_hint(&p.chosen_method));
        let charts = ChartData::build(triangle);
        let flags = self.detect_outliers(triangle, method);

        settle(ctx, reply);

        for reason in &charts.unavailable {
            ctx.record(WorkflowEvent::ChartSectionUnavailable { reason: reason.clone() });
        }
        ctx.record(WorkflowEvent::OutliersFlagged {
            method,
            rows: flags.len(),
            outliers: outlier_count(&flags),
        });

        ctx.visual_plan = plan;
        ctx.chart_data = Some(charts);
        ctx.outlier_method = Some(method);
        ctx.outliers = Some(flags);
        Ok(())
    }

    /// Run one detector with the configured parameters.
    pub fn detect_outliers(&self, triangle: &NormalizedTriangle, method: OutlierMethod) -> Vec<OutlierFlagRow> {
        let params = &self.config.outliers;
        match method {
            OutlierMethod::Iqr => detect_age_to_age(triangle, params.iqr_multiplier),
            OutlierMethod::ZScore => {
                detect_incremental(triangle, &params.zscore_value_column, params.zscore_threshold)
            }
        }
    }

    /// Switch a stage off. Its outputs and those of every later stage are
    /// dropped, since later stages were derived from them.
    pub fn deactivate(&self, ctx: &mut SessionContext, stage: Stage) {
        for cleared in stage.with_downstream() {
            ctx.clear(cleared);
            ctx.record(WorkflowEvent::StageCleared { stage: cleared });
        }
    }

    // ── Language model ───────────────────────────────────────────────────

    /// Ask the model, if any. The error side is the fallback event to
    /// record; model failures never propagate.
    fn ask<F>(&self, stage: Stage, prompt: F) -> Result<LlmOutput, WorkflowEvent>
    where
        F: FnOnce() -> TriangleResult<String>,
    {
        let Some(llm) = self.llm.as_ref() else {
            return Err(WorkflowEvent::LlmSkipped { stage });
        };

        prompt().and_then(|p| llm.complete(&p)).map_err(|e| {
            log::warn!("stage {stage}: model {} unavailable: {e}", llm.model());
            WorkflowEvent::LlmUnavailable {
                stage,
                reason: e.to_string(),
            }
        })
    }
}

fn settle(ctx: &mut SessionContext, reply: Result<LlmOutput, WorkflowEvent>) -> Option<LlmOutput> {
    match reply {
        Ok(output) => Some(output),
        Err(event) => {
            ctx.record(event);
            None
        }
    }
}

fn not_ready(stage: Stage, missing: &str) -> TriangleError {
    TriangleError::StageNotReady {
        stage:   stage.to_string(),
        missing: missing.into(),
    }
}

/// Stand-in suggestions when no model answered.
fn skeleton_recommendations() -> LlmOutput {
    LlmOutput::Json(serde_json::json!({
        "notes": "Language model not called; offline skeleton.",
        "segments": [],
        "features": [],
    }))
}
