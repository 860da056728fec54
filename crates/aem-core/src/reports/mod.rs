//! Parsing the solver's fixed-width text reports and exporting them as CSV
//! or JSON tables.

mod export;
pub mod model;
mod parser;

pub use export::{ExportSummary, convert_reports, write_csv, write_json};
pub use model::{ReportSchema, ReportTable, ReportValue, SCHEMAS, schema_for};
pub use parser::{parse_report_file, parse_report_text, report_number};

use crate::domain::AemError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to read report '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("report '{path}' section {section}: {message}")]
    InvalidSection {
        path: String,
        section: usize,
        message: String,
    },
    #[error("failed to write '{path}': {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write CSV '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("failed to encode JSON for '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

impl From<ReportError> for AemError {
    fn from(error: ReportError) -> Self {
        match &error {
            ReportError::Read { .. } => AemError::io_system("IO.REPORT_READ", error.to_string()),
            ReportError::InvalidSection { .. } => {
                AemError::input_validation("INPUT.REPORT_FORMAT", error.to_string())
            }
            ReportError::Write { .. } | ReportError::Csv { .. } => {
                AemError::io_system("IO.REPORT_WRITE", error.to_string())
            }
            ReportError::Json { .. } => {
                AemError::internal("SYS.REPORT_JSON", error.to_string())
            }
        }
    }
}

/// A report file in a directory together with its schema.
#[derive(Debug, Clone)]
pub struct ReportFile {
    pub schema: &'static ReportSchema,
    pub path: PathBuf,
}

/// Lists the recognised report files in `dir`, one per report number.
pub fn discover_reports(dir: &Path) -> ReportResult<Vec<ReportFile>> {
    let read_error = |source| ReportError::Read {
        path: dir.display().to_string(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_error)? {
        let path = entry.map_err(read_error)?.path();
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut reports: Vec<ReportFile> = Vec::new();
    for path in paths {
        let Some(number) = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(report_number)
        else {
            continue;
        };
        if reports.iter().any(|report| report.schema.number == number) {
            warn!(path = %path.display(), number, "duplicate report number; keeping the first file");
            continue;
        }
        if let Some(schema) = schema_for(number) {
            reports.push(ReportFile { schema, path });
        }
    }
    reports.sort_by_key(|report| report.schema.number);
    Ok(reports)
}
