//! Launching the external solver executable and feeding it a cue script.

use crate::domain::{AemError, SolverCapability};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tracing::{info, warn};

pub type SolverResult<T> = Result<T, SolverError>;

#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("failed to launch solver '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("failed to send cues to solver '{program}': {source}")]
    Stdin {
        program: String,
        source: std::io::Error,
    },
    #[error("failed waiting for solver '{program}': {source}")]
    Wait {
        program: String,
        source: std::io::Error,
    },
    #[error("probe '{program}' printed unrecognised status '{output}'")]
    UnknownProbeCode { program: String, output: String },
}

impl From<SolverError> for AemError {
    fn from(error: SolverError) -> Self {
        let placeholder = match &error {
            SolverError::Spawn { .. } => "RUN.SOLVER_SPAWN",
            SolverError::Stdin { .. } => "RUN.SOLVER_STDIN",
            SolverError::Wait { .. } => "RUN.SOLVER_WAIT",
            SolverError::UnknownProbeCode { .. } => "RUN.SOLVER_PROBE",
        };
        AemError::solver(placeholder, error.to_string())
    }
}

/// One solver launch: which executable, where, and what to type into it.
#[derive(Debug, Clone)]
pub struct SolverInvocation {
    pub executable: PathBuf,
    pub working_dir: PathBuf,
    pub stdin: Vec<u8>,
    /// Pass solver output through to this process instead of discarding it.
    pub echo_output: bool,
}

impl SolverInvocation {
    pub fn program_label(&self) -> String {
        self.executable.display().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverOutcome {
    pub exit_code: Option<i32>,
}

impl SolverOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    fn from_status(status: ExitStatus) -> Self {
        Self {
            exit_code: status.code(),
        }
    }
}

pub trait SolverRunner {
    fn run(&self, invocation: &SolverInvocation) -> SolverResult<SolverOutcome>;
}

/// Runs the solver as a child process and waits for it without a timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessSolver;

impl SolverRunner for ProcessSolver {
    fn run(&self, invocation: &SolverInvocation) -> SolverResult<SolverOutcome> {
        let program = invocation.program_label();
        let output_stdio = || {
            if invocation.echo_output {
                Stdio::inherit()
            } else {
                Stdio::null()
            }
        };

        info!(program = %program, bytes = invocation.stdin.len(), "starting solver");
        let mut child = Command::new(&invocation.executable)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::piped())
            .stdout(output_stdio())
            .stderr(output_stdio())
            .spawn()
            .map_err(|source| SolverError::Spawn {
                program: program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let written = stdin.write_all(&invocation.stdin);
            drop(stdin);
            if let Err(source) = written {
                // The solver may stop reading once it has every answer it needs.
                if source.kind() != std::io::ErrorKind::BrokenPipe {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SolverError::Stdin { program, source });
                }
            }
        }

        let status = child.wait().map_err(|source| SolverError::Wait {
            program: program.clone(),
            source,
        })?;
        let outcome = SolverOutcome::from_status(status);
        if outcome.success() {
            info!(program = %program, "solver finished");
        } else {
            let status_text = outcome.exit_code.map_or_else(
                || "terminated by signal".to_string(),
                |code| format!("exit code {code}"),
            );
            warn!(program = %program, "solver ended with {status_text}; collecting any reports it wrote");
        }
        Ok(outcome)
    }
}

/// Runs a probe executable and maps the status code it prints.
pub fn probe_capability(probe: &Path, working_dir: &Path) -> SolverResult<SolverCapability> {
    let program = probe.display().to_string();
    let output = Command::new(probe)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .map_err(|source| SolverError::Spawn {
            program: program.clone(),
            source,
        })?;
    let printed = String::from_utf8_lossy(&output.stdout).trim().to_string();
    SolverCapability::from_probe_code(&printed).ok_or(SolverError::UnknownProbeCode {
        program,
        output: printed,
    })
}

/// Picks the input schema for a session: an explicit choice wins, then the
/// probe result, then the executable name.
pub fn resolve_capability(
    explicit: Option<SolverCapability>,
    probed: Option<SolverCapability>,
    program: &str,
) -> SolverCapability {
    explicit
        .or(probed)
        .unwrap_or_else(|| SolverCapability::from_program_name(program))
}
