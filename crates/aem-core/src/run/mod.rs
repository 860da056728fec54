//! One end-to-end solver run: resolve the composition, build cues, launch the
//! solver, then collect and export its reports.

mod config;

pub use config::{CompositionSource, DEFAULT_RUN_NAME, OutputConfig, RunConfig, SolverConfig};

use crate::composition::{AcccComposition, Composition, CompositionError, Electrolyte, Provenance};
use crate::cues::{CueError, CueSequence, LabelMap, RunParameters, RunSpecification, build_cues};
use crate::domain::{AemError, SolverCapability};
use crate::registry::{Registry, RegistryError};
use crate::reports::{ExportSummary, ReportError, convert_reports};
use crate::serialization::{to_indented_json, write_binary_artifact, write_text_artifact};
use crate::solver::{
    SolverError, SolverInvocation, SolverRunner, probe_capability, resolve_capability,
};
use globset::Glob;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

pub const CUES_FILE: &str = "cues.txt";
pub const RUN_LOG_FILE: &str = "run_log.json";
pub const REPORTS_DIR: &str = "Reports";
const REPORT_PATTERN: &str = "Report*";

pub type RunResult<T> = Result<T, RunError>;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to read run config '{}': {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse run config '{}': {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Composition(#[from] CompositionError),
    #[error(transparent)]
    Cues(#[from] CueError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error("failed to prepare run output '{}': {source}", path.display())]
    Workspace {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid report pattern: {0}")]
    Pattern(#[from] globset::Error),
    #[error("failed to encode run log: {0}")]
    LogEncode(#[from] serde_json::Error),
}

impl From<RunError> for AemError {
    fn from(error: RunError) -> Self {
        match error {
            RunError::ConfigRead { .. } => AemError::io_system("IO.RUN_CONFIG_READ", error.to_string()),
            RunError::ConfigParse { .. } => {
                AemError::input_validation("INPUT.RUN_CONFIG", error.to_string())
            }
            RunError::Registry(inner) => inner.into(),
            RunError::Composition(inner) => inner.into(),
            RunError::Cues(inner) => inner.into(),
            RunError::Solver(inner) => inner.into(),
            RunError::Report(inner) => inner.into(),
            RunError::Workspace { .. } => AemError::io_system("IO.RUN_WORKSPACE", error.to_string()),
            RunError::Pattern(_) | RunError::LogEncode(_) => {
                AemError::internal("SYS.RUN_INTERNAL", error.to_string())
            }
        }
    }
}

/// Everything decided before the solver is launched.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub composition: Option<Composition>,
    pub specification: RunSpecification,
    pub capability: SolverCapability,
    pub cues: CueSequence,
    pub labels: LabelMap,
}

/// Resolves the composition, validates the specification and builds cues
/// without writing anything.
pub fn plan(config: &RunConfig) -> RunResult<RunPlan> {
    let registry = Registry::load(&config.registry)?;
    let (electrolyte, composition) = config.composition.resolve(&registry)?;
    let specification =
        RunSpecification::new(electrolyte, config.accc.clone(), config.parameters.clone())?;

    let probed = match &config.solver.probe {
        Some(probe) if config.solver.capability.is_none() => {
            Some(probe_capability(probe, &config.solver.home)?)
        }
        _ => None,
    };
    let capability = resolve_capability(config.solver.capability, probed, &config.solver.program);

    let (cues, labels) = build_cues(&specification, &registry, capability)?;
    Ok(RunPlan {
        composition,
        specification,
        capability,
        cues,
        labels,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: String,
    pub run_dir: PathBuf,
    pub capability: SolverCapability,
    pub cue_count: usize,
    pub solver_exit_code: Option<i32>,
    pub copied_reports: Vec<PathBuf>,
    pub exports: ExportSummary,
}

#[derive(Serialize)]
struct RunLog<'a> {
    run_id: &'a str,
    timestamp: u64,
    composition_id: Option<&'a str>,
    provenance: Option<&'a Provenance>,
    electrolyte: &'a Electrolyte,
    accc: Option<&'a AcccComposition>,
    program: &'a str,
    capability: SolverCapability,
    solver_exit_code: Option<i32>,
    parameters: &'a RunParameters,
    labels: &'a LabelMap,
}

/// Runs the solver for `config` and returns where everything was written.
///
/// A non-zero solver exit is logged and the run still collects whatever
/// reports exist.
pub fn execute_run(config: &RunConfig, runner: &dyn SolverRunner) -> RunResult<RunSummary> {
    let plan = plan(config)?;

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    let run_id = format!("{}_{timestamp}", config.output.run_name());
    let run_dir = config.output.directory.join(&run_id);
    fs::create_dir_all(&run_dir).map_err(|source| workspace_error(&run_dir, source))?;
    info!(run = %run_id, capability = %plan.capability, "starting run");

    let cues_path = run_dir.join(CUES_FILE);
    let stdin = plan.cues.to_stdin_bytes();
    write_binary_artifact(&cues_path, &stdin).map_err(|source| workspace_error(&cues_path, source))?;

    let invocation = SolverInvocation {
        executable: config.solver.executable(),
        working_dir: config.solver.home.clone(),
        stdin,
        echo_output: !config.solver.quiet,
    };
    let outcome = runner.run(&invocation)?;

    let log = RunLog {
        run_id: &run_id,
        timestamp,
        composition_id: plan
            .composition
            .as_ref()
            .map(|composition| composition.identifier().as_str()),
        provenance: plan.composition.as_ref().map(Composition::provenance),
        electrolyte: plan.specification.electrolyte(),
        accc: plan
            .specification
            .uses_accc()
            .then(|| plan.specification.accc()),
        program: &config.solver.program,
        capability: plan.capability,
        solver_exit_code: outcome.exit_code,
        parameters: plan.specification.parameters(),
        labels: &plan.labels,
    };
    let log_path = run_dir.join(RUN_LOG_FILE);
    write_text_artifact(&log_path, &to_indented_json(&log)?)
        .map_err(|source| workspace_error(&log_path, source))?;

    let reports_dir = run_dir.join(REPORTS_DIR);
    let copied_reports = copy_reports(&config.solver.home, &reports_dir)?;
    let exports = if copied_reports.is_empty() || config.output.formats.is_empty() {
        ExportSummary::default()
    } else {
        convert_reports(&reports_dir, &run_dir, &config.output.formats)?
    };

    info!(
        run = %run_id,
        reports = copied_reports.len(),
        exported = exports.written.len(),
        "run complete"
    );
    Ok(RunSummary {
        run_id,
        run_dir,
        capability: plan.capability,
        cue_count: plan.cues.len(),
        solver_exit_code: outcome.exit_code,
        copied_reports,
        exports,
    })
}

fn workspace_error(path: &Path, source: std::io::Error) -> RunError {
    RunError::Workspace {
        path: path.to_path_buf(),
        source,
    }
}

/// Copies solver report files from `solver_home` into `destination`.
pub fn copy_reports(solver_home: &Path, destination: &Path) -> RunResult<Vec<PathBuf>> {
    let matcher = Glob::new(REPORT_PATTERN)?.compile_matcher();
    let entries = fs::read_dir(solver_home).map_err(|source| workspace_error(solver_home, source))?;

    let mut sources = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| workspace_error(solver_home, source))?
            .path();
        let matches = path
            .file_name()
            .is_some_and(|name| matcher.is_match(Path::new(name)));
        if matches && path.is_file() {
            sources.push(path);
        }
    }
    sources.sort();

    if sources.is_empty() {
        warn!(home = %solver_home.display(), "solver left no report files");
        return Ok(Vec::new());
    }

    fs::create_dir_all(destination).map_err(|source| workspace_error(destination, source))?;
    let mut copied = Vec::with_capacity(sources.len());
    for source_path in sources {
        let Some(name) = source_path.file_name() else {
            continue;
        };
        let target = destination.join(name);
        fs::copy(&source_path, &target).map_err(|source| workspace_error(&target, source))?;
        copied.push(target);
    }
    Ok(copied)
}
