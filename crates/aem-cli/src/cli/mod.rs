mod commands;
mod helpers;

use crate::logging::setup_logging;
use aem_core::domain::AemError;
use clap::Parser;
use std::path::PathBuf;

pub fn run_from_env() -> i32 {
    match parse_and_dispatch(std::env::args().collect()) {
        Ok(code) => code,
        Err(error) => {
            let aem_error = error.as_aem_error();
            eprintln!("{}", aem_error.diagnostic_line());
            eprintln!("{}", aem_error.exit_line());
            aem_error.exit_code()
        }
    }
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(err) => {
            return match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    print!("{}", err);
                    Ok(0)
                }
                _ => Err(CliError::Usage(err.to_string())),
            };
        }
    };

    setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;
    dispatch_parsed(cli.command)
}

#[derive(Parser)]
#[command(
    name = "aem-rs",
    version,
    about = "Drive the Advanced Electrolyte Model solver: compositions, cue scripts, runs and reports"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Encode solvent and salt amounts into a composition identifier
    Encode(commands::EncodeArgs),
    /// Decode a composition identifier and print it as JSON
    Decode(commands::DecodeArgs),
    /// Build the solver cue sequence for a run config without running it
    Cues(commands::CuesArgs),
    /// Run the solver for a run config and collect its reports
    Run(commands::RunArgs),
    /// Convert a directory of solver reports to CSV and/or JSON
    Convert(commands::ConvertArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Encode(args) => commands::run_encode_command(args),
        CliCommand::Decode(args) => commands::run_decode_command(args),
        CliCommand::Cues(args) => commands::run_cues_command(args),
        CliCommand::Run(args) => commands::run_run_command(args),
        CliCommand::Convert(args) => commands::run_convert_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(AemError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_aem_error(&self) -> AemError {
        match self {
            Self::Usage(message) => AemError::input_validation("INPUT.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => AemError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
