//! reserve-runner: headless runner for the reserveai triangle workflow.
//!
//! Usage:
//!   reserve-runner --input triangle.csv --stages 3 --out-dir out
//!   reserve-runner --sample-seed 42 --config analysis.json
//!   reserve-runner --ipc-mode

use anyhow::Result;
use reserveai_core::{
    config::AnalysisConfig,
    eda::MonotonicityCheck,
    event::EventLogEntry,
    export::export_report,
    outlier::{outlier_count, OutlierFlagRow, OutlierMethod},
    sample::{generate, SampleTriangleSpec},
    schema::{Recommendations, VisualPlan},
    session::{SessionContext, Stage},
    summary::SummaryReport,
    WorkflowEngine,
};
use std::collections::BTreeMap;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;

/// Events echoed back in each IPC state document.
const RECENT_EVENTS: usize = 20;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Load {
        path: String,
    },
    LoadSample {
        #[serde(default)]
        seed: Option<u64>,
    },
    RunStage {
        stage: u8,
    },
    Deactivate {
        stage: u8,
    },
    GetState,
    Quit,
}

#[derive(serde::Serialize)]
struct UiState<'a> {
    session_id:      &'a str,
    has_llm:         bool,
    rows:            usize,
    stages:          BTreeMap<&'static str, bool>,
    notes:           &'a [String],
    summary:         Option<&'a SummaryReport>,
    monotonicity:    Option<&'a BTreeMap<String, MonotonicityCheck>>,
    recommendations: Option<&'a Recommendations>,
    visual_plan:     Option<&'a VisualPlan>,
    outlier_method:  Option<OutlierMethod>,
    outlier_count:   usize,
    outliers:        Vec<&'a OutlierFlagRow>,
    events:          &'a [EventLogEntry],
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let stages = parse_arg(&args, "--stages", 3u8).clamp(1, 3);
    let sample_seed = flag_value(&args, "--sample-seed").and_then(|s| s.parse::<u64>().ok());
    let input = flag_value(&args, "--input");
    let out_dir = flag_value(&args, "--out-dir");

    let config = match flag_value(&args, "--config") {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    let engine = WorkflowEngine::from_env(config)?;
    let mut ctx = SessionContext::new();

    if ipc_mode {
        return run_ipc_loop(&engine, &mut ctx);
    }

    println!("reserveai — reserve-runner");
    println!("  session:   {}", ctx.session_id);
    println!("  input:     {}", input.unwrap_or("(synthetic sample)"));
    println!("  stages:    1..={stages}");
    println!("  llm:       {}", if engine.has_llm() { engine.config().llm.model.as_str() } else { "off" });
    println!();

    match input {
        Some(path) => engine.load_csv(&mut ctx, Path::new(path))?,
        None => {
            let spec = SampleTriangleSpec {
                seed: sample_seed.unwrap_or(SampleTriangleSpec::default().seed),
                ..SampleTriangleSpec::default()
            };
            engine.load(&mut ctx, &generate(&spec));
        }
    }

    for stage in Stage::ALL.into_iter().filter(|s| s.number() <= stages) {
        engine.run_stage(&mut ctx, stage)?;
    }

    print_summary(&ctx);

    if let (Some(dir), Some(eda)) = (out_dir, ctx.eda.as_ref()) {
        let manifest = export_report(Path::new(dir), &ctx.session_id, eda, ctx.outliers.as_deref())?;
        println!();
        println!("  exported {} files to {dir}", manifest.files.len());
    }
    Ok(())
}

fn run_ipc_loop(engine: &WorkflowEngine, ctx: &mut SessionContext) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                write_error(&mut stdout, e)?;
                continue;
            }
        };

        let outcome = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => Ok(()),
            IpcCommand::Load { path } => engine.load_csv(ctx, Path::new(&path)).map_err(anyhow::Error::from),
            IpcCommand::LoadSample { seed } => {
                let spec = SampleTriangleSpec {
                    seed: seed.unwrap_or(SampleTriangleSpec::default().seed),
                    ..SampleTriangleSpec::default()
                };
                engine.load(ctx, &generate(&spec));
                Ok(())
            }
            IpcCommand::RunStage { stage } => stage_from(stage)
                .and_then(|s| engine.run_stage(ctx, s).map_err(anyhow::Error::from)),
            IpcCommand::Deactivate { stage } => stage_from(stage).map(|s| engine.deactivate(ctx, s)),
        };

        match outcome {
            Ok(()) => {
                let state = build_ui_state(engine, ctx);
                writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
                stdout.flush()?;
            }
            Err(e) => {
                log::warn!("ipc command failed: {e}");
                write_error(&mut stdout, e)?;
            }
        }
    }
    Ok(())
}

fn write_error(stdout: &mut io::Stdout, error: impl std::fmt::Display) -> Result<()> {
    let err_json = serde_json::json!({ "error": error.to_string() });
    writeln!(stdout, "{}", err_json)?;
    stdout.flush()?;
    Ok(())
}

fn stage_from(number: u8) -> Result<Stage> {
    Stage::from_number(number).ok_or_else(|| anyhow::anyhow!("unknown stage {number}, expected 1..=3"))
}

fn build_ui_state<'a>(engine: &WorkflowEngine, ctx: &'a SessionContext) -> UiState<'a> {
    let stages = Stage::ALL
        .into_iter()
        .map(|s| (s.name(), ctx.is_complete(s)))
        .collect();
    let flags = ctx.outliers.as_deref().unwrap_or_default();
    let recent = ctx.events.len().saturating_sub(RECENT_EVENTS);

    UiState {
        session_id:      &ctx.session_id,
        has_llm:         engine.has_llm(),
        rows:            ctx.triangle.as_ref().map_or(0, |t| t.len()),
        stages,
        notes:           &ctx.notes,
        summary:         ctx.summary(),
        monotonicity:    ctx.eda.as_ref().map(|e| &e.monotonicity),
        recommendations: ctx.recommendations.as_ref(),
        visual_plan:     ctx.visual_plan.as_ref(),
        outlier_method:  ctx.outlier_method,
        outlier_count:   outlier_count(flags),
        outliers:        flags.iter().filter(|r| r.is_outlier).collect(),
        events:          &ctx.events[recent..],
    }
}

fn print_summary(ctx: &SessionContext) {
    println!("=== RUN SUMMARY ===");
    for note in &ctx.notes {
        println!("  note:           {note}");
    }
    if let Some(summary) = ctx.summary() {
        println!("  rows:           {}", summary.shape.rows);
        println!("  columns:        {}", summary.shape.cols);
        let segments: Vec<&str> = summary.segment_candidates.iter().map(|s| s.column.as_str()).collect();
        println!("  segments:       {}", segments.join(", "));
    }
    if let Some(eda) = ctx.eda.as_ref() {
        for (column, check) in &eda.monotonicity {
            let status = if check.ok {
                "ok".to_string()
            } else {
                format!("violations in {:?}", check.violations_by_accident_year)
            };
            println!("  monotonic {column:<20} {status}");
        }
    }

    println!();
    println!("=== AGE-TO-AGE (incurred) ===");
    match ctx.summary() {
        Some(s) if !s.age_to_age_incurred.is_empty() => {
            for (transition, factor) in &s.age_to_age_incurred {
                println!("  {transition:<8} {factor:.4}");
            }
        }
        _ => println!("  (no factors available)"),
    }

    if let (Some(method), Some(flags)) = (ctx.outlier_method, ctx.outliers.as_ref()) {
        println!();
        println!("=== OUTLIERS ({}) ===", method.label());
        println!("  rows scored:    {}", flags.len());
        println!("  flagged:        {}", outlier_count(flags));
        for row in flags.iter().filter(|r| r.is_outlier) {
            println!("  {} | AY {} | value {:.4}", row.group.label(), row.accident_year, row.value);
        }
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}
