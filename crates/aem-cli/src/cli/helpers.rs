use super::CliError;
use aem_core::composition::Amounts;
use aem_core::domain::{AemError, ExportFormat};

/// Parses a `NAME=AMOUNT` command-line pair.
pub(super) fn parse_assignment(raw: &str) -> Result<(String, f64), String> {
    let (name, amount) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=AMOUNT, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing component name in '{raw}'"));
    }
    let amount: f64 = amount
        .trim()
        .parse()
        .map_err(|_| format!("amount in '{raw}' is not a number"))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(format!("amount in '{raw}' must be a finite, non-negative number"));
    }
    Ok((name.to_string(), amount))
}

pub(super) fn collect_amounts(
    kind: &str,
    entries: Vec<(String, f64)>,
) -> Result<Amounts, CliError> {
    let mut amounts = Amounts::new();
    for (name, amount) in entries {
        if amounts.insert(name.clone(), amount).is_some() {
            return Err(CliError::Usage(format!(
                "{kind} '{name}' was given more than once"
            )));
        }
    }
    Ok(amounts)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(super) enum FormatChoice {
    Csv,
    Json,
    All,
}

impl FormatChoice {
    pub(super) fn formats(self) -> &'static [ExportFormat] {
        match self {
            Self::Csv => &[ExportFormat::Csv],
            Self::Json => &[ExportFormat::Json],
            Self::All => &ExportFormat::ALL,
        }
    }
}

pub(super) fn compute(error: impl Into<AemError>) -> CliError {
    CliError::Compute(error.into())
}
