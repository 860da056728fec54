use super::CliError;
use super::helpers::*;
use aem_core::composition::{decode, derive_by_mass, encode};
use aem_core::cues::LabelMap;
use aem_core::domain::{AemError, SolverCapability};
use aem_core::reports::convert_reports;
use aem_core::run::{RunConfig, execute_run, plan};
use aem_core::serialization::{to_indented_json, write_binary_artifact};
use aem_core::solver::ProcessSolver;
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(super) enum AmountBasis {
    /// Solvent mass fractions and salt molalities
    Fraction,
    /// Weighed masses in grams
    Mass,
}

#[derive(clap::Args)]
pub(super) struct EncodeArgs {
    /// Solvent amount as NAME=AMOUNT (repeatable)
    #[arg(long = "solvent", value_name = "NAME=AMOUNT", required = true, value_parser = parse_assignment)]
    solvents: Vec<(String, f64)>,

    /// Salt amount as NAME=AMOUNT (repeatable)
    #[arg(long = "salt", value_name = "NAME=AMOUNT", value_parser = parse_assignment)]
    salts: Vec<(String, f64)>,

    /// How the amounts are expressed
    #[arg(long, value_enum, default_value_t = AmountBasis::Fraction)]
    basis: AmountBasis,

    /// Total solvent weight after normalization
    #[arg(long, default_value_t = aem_core::composition::DEFAULT_SOLVENT_PRECISION)]
    precision: u32,

    /// Decimal places kept for salt molalities
    #[arg(long, default_value_t = aem_core::composition::DEFAULT_SALT_DECIMALS)]
    decimals: u32,
}

#[derive(clap::Args)]
pub(super) struct DecodeArgs {
    /// Composition identifier, e.g. EC_EMC|30_70|LiPF6|1.0
    #[arg(value_name = "IDENTIFIER")]
    identifier: String,
}

#[derive(clap::Args)]
pub(super) struct CuesArgs {
    /// Run config file
    #[arg(long)]
    config: PathBuf,

    /// Print cues and labels as JSON instead of label lines
    #[arg(long)]
    json: bool,

    /// Also write the solver stdin script to this path
    #[arg(long, value_name = "PATH")]
    script: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct RunArgs {
    /// Run config file
    #[arg(long)]
    config: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct ConvertArgs {
    /// Directory holding solver Report files
    #[arg(value_name = "REPORT_DIR")]
    report_dir: PathBuf,

    /// Export format
    #[arg(long, value_enum, default_value_t = FormatChoice::All)]
    format: FormatChoice,

    /// Output root; csv/ and json/ are created below it [default: REPORT_DIR]
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(super) fn run_encode_command(args: EncodeArgs) -> Result<i32, CliError> {
    let solvents = collect_amounts("solvent", args.solvents)?;
    let salts = collect_amounts("salt", args.salts)?;
    let identifier = match args.basis {
        AmountBasis::Fraction => {
            encode(&solvents, &salts, args.precision, args.decimals).map_err(compute)?
        }
        AmountBasis::Mass => derive_by_mass(&solvents, &salts, args.precision, args.decimals)
            .map_err(compute)?
            .identifier()
            .clone(),
    };
    println!("{identifier}");
    Ok(0)
}

pub(super) fn run_decode_command(args: DecodeArgs) -> Result<i32, CliError> {
    let decoded = decode(&args.identifier).map_err(compute)?;
    println!("{}", render_json(&decoded)?);
    Ok(0)
}

#[derive(Serialize)]
struct CuesDocument<'a> {
    capability: SolverCapability,
    composition_id: Option<&'a str>,
    cues: Vec<String>,
    labels: &'a LabelMap,
}

pub(super) fn run_cues_command(args: CuesArgs) -> Result<i32, CliError> {
    let config = RunConfig::load(&args.config).map_err(compute)?;
    let plan = plan(&config).map_err(compute)?;

    if let Some(path) = &args.script {
        write_binary_artifact(path, &plan.cues.to_stdin_bytes()).map_err(|source| {
            compute(AemError::io_system(
                "IO.CLI_SCRIPT_WRITE",
                format!("failed to write cue script '{}': {source}", path.display()),
            ))
        })?;
    }

    if args.json {
        let document = CuesDocument {
            capability: plan.capability,
            composition_id: plan
                .composition
                .as_ref()
                .map(|composition| composition.identifier().as_str()),
            cues: plan.cues.values().iter().map(ToString::to_string).collect(),
            labels: &plan.labels,
        };
        println!("{}", render_json(&document)?);
    } else {
        for line in plan.labels.render_lines() {
            println!("{line}");
        }
    }
    Ok(0)
}

pub(super) fn run_run_command(args: RunArgs) -> Result<i32, CliError> {
    let config = RunConfig::load(&args.config).map_err(compute)?;
    debug!(config = %args.config.display(), program = %config.solver.program, "loaded run config");
    let summary = execute_run(&config, &ProcessSolver).map_err(compute)?;

    println!("Run {} ({})", summary.run_id, summary.capability);
    println!("Run directory: {}", summary.run_dir.display());
    println!("Cues written: {}", summary.cue_count);
    match summary.solver_exit_code {
        Some(code) => println!("Solver exit code: {code}"),
        None => println!("Solver exit code: terminated by signal"),
    }
    println!("Reports copied: {}", summary.copied_reports.len());
    for path in &summary.exports.written {
        println!("Exported {}", path.display());
    }
    Ok(0)
}

pub(super) fn run_convert_command(args: ConvertArgs) -> Result<i32, CliError> {
    let output = args.output.unwrap_or_else(|| args.report_dir.clone());
    debug!(reports = %args.report_dir.display(), output = %output.display(), "converting reports");
    let summary =
        convert_reports(&args.report_dir, &output, args.format.formats()).map_err(compute)?;

    for path in &summary.written {
        println!("Exported {}", path.display());
    }
    for path in &summary.skipped {
        println!("Skipped empty report {}", path.display());
    }
    println!(
        "Converted {} file(s), skipped {}.",
        summary.written.len(),
        summary.skipped.len()
    );
    Ok(0)
}

fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CliError> {
    to_indented_json(value)
        .map_err(|error| compute(AemError::internal("SYS.CLI_JSON", error.to_string())))
}
