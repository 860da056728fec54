use super::model::ReportTable;
use super::parser::parse_report_file;
use super::{ReportError, ReportFile, ReportResult, discover_reports};
use crate::domain::ExportFormat;
use crate::serialization::{to_indented_json, write_text_artifact};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub written: Vec<PathBuf>,
    /// Report files that were present but empty.
    pub skipped: Vec<PathBuf>,
}

pub fn write_csv(table: &ReportTable, path: &Path) -> ReportResult<()> {
    let csv_error = |source| ReportError::Csv {
        path: path.display().to_string(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    writer.write_record(table.schema.columns).map_err(csv_error)?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(ToString::to_string))
            .map_err(csv_error)?;
    }
    writer.flush().map_err(|source| ReportError::Write {
        path: path.display().to_string(),
        source,
    })
}

pub fn write_json(table: &ReportTable, path: &Path) -> ReportResult<()> {
    let records: Vec<_> = table.records().collect();
    let json = to_indented_json(&records).map_err(|source| ReportError::Json {
        path: path.display().to_string(),
        source,
    })?;
    write_text_artifact(path, &json).map_err(|source| ReportError::Write {
        path: path.display().to_string(),
        source,
    })
}

fn format_dir(output_dir: &Path, format: ExportFormat) -> PathBuf {
    output_dir.join(format.as_str())
}

/// Parses every report in `report_dir` and writes one file per report and
/// format under `output_dir/<format>/`.
///
/// Reports are handled in parallel. All of them are attempted before the
/// first failure, if any, is returned.
pub fn convert_reports(
    report_dir: &Path,
    output_dir: &Path,
    formats: &[ExportFormat],
) -> ReportResult<ExportSummary> {
    let reports = discover_reports(report_dir)?;
    for format in formats {
        let dir = format_dir(output_dir, *format);
        fs::create_dir_all(&dir).map_err(|source| ReportError::Write {
            path: dir.display().to_string(),
            source,
        })?;
    }

    let outcomes: Vec<ReportResult<Option<Vec<PathBuf>>>> = reports
        .par_iter()
        .map(|report| export_one(report, output_dir, formats))
        .collect();

    let mut summary = ExportSummary::default();
    for (report, outcome) in reports.iter().zip(outcomes) {
        match outcome? {
            Some(paths) => summary.written.extend(paths),
            None => summary.skipped.push(report.path.clone()),
        }
    }
    info!(
        written = summary.written.len(),
        skipped = summary.skipped.len(),
        "exported reports"
    );
    Ok(summary)
}

fn export_one(
    report: &ReportFile,
    output_dir: &Path,
    formats: &[ExportFormat],
) -> ReportResult<Option<Vec<PathBuf>>> {
    let Some(table) = parse_report_file(report.schema, &report.path)? else {
        return Ok(None);
    };

    let mut written = Vec::with_capacity(formats.len());
    for format in formats {
        let path = format_dir(output_dir, *format)
            .join(format!("{}.{}", report.schema.file_stem(), format.extension()));
        match format {
            ExportFormat::Csv => write_csv(&table, &path)?,
            ExportFormat::Json => write_json(&table, &path)?,
        }
        written.push(path);
    }
    Ok(Some(written))
}
