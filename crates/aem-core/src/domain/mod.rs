pub mod errors;

pub use errors::{AemError, AemErrorCategory};

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Input schema understood by a particular solver build.
///
/// Resolved once per session and handed to the cue builder explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverCapability {
    /// v1.0 prompt sequence: fixed composition, one salt, no ACCC.
    Basic,
    /// v1.1+ prompt sequence with matrix mode, dual salts and ACCC classes.
    AcccAware,
}

impl SolverCapability {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::AcccAware => "accc_aware",
        }
    }

    /// Maps the status code the vendor probe script prints.
    pub fn from_probe_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(Self::Basic),
            "6" => Some(Self::AcccAware),
            _ => None,
        }
    }

    pub fn from_program_name(program: &str) -> Self {
        if program.to_ascii_lowercase().contains("accc") {
            Self::AcccAware
        } else {
            Self::Basic
        }
    }
}

impl Display for SolverCapability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub const ALL: [Self; 2] = [Self::Csv, Self::Json];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    pub const fn extension(self) -> &'static str {
        self.as_str()
    }
}

impl Display for ExportFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}
