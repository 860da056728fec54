use super::model::{HeaderField, HeaderProbe, ReportSchema, ReportTable, ReportValue, schema_for};
use super::{ReportError, ReportResult};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

const SECTION_MARKER: &str = "alt = ";
const TEMPERATURE_MARKER: &str = "at Temp. =";
const SALT_SEPARATOR: &str = " + ";
const HEADER_RULE_MIN: usize = 31;
const OVERFLOW_MARKERS: [&str; 2] = ["********", "*****"];
const SINGLE_SALT_PROPORTION: &str = "1.000";

/// Report number encoded in a solver file name such as `Report03 -- ...`.
///
/// Numbers without a schema yield `None`.
pub fn report_number(file_name: &str) -> Option<u8> {
    let rest = file_name.strip_prefix("Report")?;
    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if !(1..=2).contains(&digits_len) || !rest[digits_len..].starts_with(" --") {
        return None;
    }
    let number: u8 = rest[..digits_len].parse().ok()?;
    schema_for(number).map(|schema| schema.number)
}

/// Reads and parses one report file; empty files are skipped with a warning.
pub fn parse_report_file(
    schema: &'static ReportSchema,
    path: &Path,
) -> ReportResult<Option<ReportTable>> {
    let text = fs::read_to_string(path).map_err(|source| ReportError::Read {
        path: path.display().to_string(),
        source,
    })?;
    if text.trim().is_empty() {
        warn!(path = %path.display(), "report file is empty; skipping");
        return Ok(None);
    }

    let table = parse_report_text(schema, &text, path)?;
    debug!(
        report = schema.number,
        sections = table.sections,
        rows = table.rows.len(),
        "parsed report"
    );
    Ok(Some(table))
}

pub fn parse_report_text(
    schema: &'static ReportSchema,
    text: &str,
    path: &Path,
) -> ReportResult<ReportTable> {
    let mut rows = Vec::new();
    let mut sections = 0;
    for (index, section) in text.split(SECTION_MARKER).skip(1).enumerate() {
        let parsed = Section::parse(section).map_err(|message| ReportError::InvalidSection {
            path: path.display().to_string(),
            section: index + 1,
            message,
        })?;
        rows.extend(parsed.rows(schema).map_err(|message| ReportError::InvalidSection {
            path: path.display().to_string(),
            section: index + 1,
            message,
        })?);
        sections += 1;
    }

    Ok(ReportTable {
        schema,
        source: path.to_path_buf(),
        sections,
        rows,
    })
}

struct Section<'a> {
    salts: Vec<(String, String)>,
    temperature: f64,
    body: Vec<&'a str>,
}

impl<'a> Section<'a> {
    fn parse(text: &'a str) -> Result<Self, String> {
        let mut lines = text.lines();
        let header: Vec<&str> = lines.by_ref().take_while(|line| !is_header_rule(line)).collect();
        let body: Vec<&str> = lines.filter(|line| !is_header_rule(line)).collect();
        let header = header.join("\n");

        let (salt_text, after) = header
            .split_once(TEMPERATURE_MARKER)
            .ok_or_else(|| format!("missing '{TEMPERATURE_MARKER}' in section header"))?;
        let temperature_text = after.split('C').next().unwrap_or_default().trim();
        let temperature = temperature_text
            .parse::<f64>()
            .map_err(|_| format!("unreadable temperature '{temperature_text}'"))?;

        Ok(Self {
            salts: parse_salts(salt_text.trim()),
            temperature,
            body,
        })
    }

    fn rows(&self, schema: &ReportSchema) -> Result<Vec<Vec<ReportValue>>, String> {
        let (solvents, data_start) = parse_solvents(&self.body);
        let header_values = self.header_values(schema.header_fields)?;

        let leading = [
            ReportValue::Text(join_pairs(&solvents)),
            ReportValue::Text(join_pairs(&self.salts)),
            ReportValue::Number(self.temperature),
        ];

        let width = schema.data_width();
        let mut rows = Vec::new();
        for line in &self.body[data_start..] {
            let Some(values) = data_values(line, schema.scrub, width) else {
                continue;
            };
            let mut row = Vec::with_capacity(schema.columns.len());
            row.extend(leading.iter().cloned());
            row.extend(header_values.iter().cloned());
            row.extend(values.into_iter().map(ReportValue::Number));
            rows.push(row);
        }
        Ok(rows)
    }

    fn header_values(&self, fields: &[HeaderField]) -> Result<Vec<ReportValue>, String> {
        fields
            .iter()
            .map(|field| {
                probe_header(&self.body, field.probe)
                    .ok_or_else(|| format!("header field '{}' not found", field.column))
            })
            .collect()
    }
}

fn is_header_rule(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= HEADER_RULE_MIN && trimmed.bytes().all(|byte| byte == b'=')
}

fn is_dash_rule(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.bytes().all(|byte| byte == b'-')
}

fn is_number(token: &str) -> bool {
    token.parse::<f64>().is_ok()
}

/// `LiPF6` or `0.7 LiPF6 + 0.3 LiBF4`, as name/proportion pairs.
fn parse_salts(text: &str) -> Vec<(String, String)> {
    let parts: Vec<&str> = text.split(SALT_SEPARATOR).collect();
    if let [single] = parts.as_slice() {
        let name = single.split_whitespace().collect::<Vec<_>>().join(" ");
        return vec![(name, SINGLE_SALT_PROPORTION.to_string())];
    }

    parts
        .iter()
        .map(|part| {
            let mut name = String::new();
            let mut proportion = String::new();
            for token in part.split_whitespace() {
                if is_number(token) {
                    proportion = token.to_string();
                } else {
                    name.push_str(token);
                }
            }
            (name, proportion)
        })
        .collect()
}

/// Solvent `name proportion` lines following the first dashed rule.
///
/// Returns the pairs and the body index where data scanning resumes.
fn parse_solvents(body: &[&str]) -> (Vec<(String, String)>, usize) {
    let Some(rule) = body.iter().position(|line| is_dash_rule(line)) else {
        return (Vec::new(), 0);
    };

    let mut solvents = Vec::new();
    let mut index = rule + 1;
    while let Some(line) = body.get(index) {
        if is_dash_rule(line) {
            break;
        }
        if line.trim().is_empty() {
            if solvents.is_empty() {
                index += 1;
                continue;
            }
            break;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if let Some(position) = tokens.iter().position(|token| is_number(token)) {
            if position > 0 {
                solvents.push((tokens[..position].join(" "), tokens[position].to_string()));
            }
        }
        index += 1;
    }
    (solvents, index)
}

fn join_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(name, proportion)| format!("{name} {proportion}"))
        .collect::<Vec<_>>()
        .join("|")
}

fn data_values(line: &str, scrub: &[&str], width: usize) -> Option<Vec<f64>> {
    let mut cleaned = line.to_string();
    for fragment in scrub {
        cleaned = cleaned.replace(fragment, "");
    }
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    if tokens.len() != width {
        return None;
    }
    tokens.into_iter().map(parse_cell).collect()
}

fn parse_cell(token: &str) -> Option<f64> {
    if OVERFLOW_MARKERS.contains(&token) {
        return Some(f64::NAN);
    }
    token.parse().ok()
}

fn probe_header(body: &[&str], probe: HeaderProbe) -> Option<ReportValue> {
    match probe {
        HeaderProbe::NumberAfter(label) => body.iter().find_map(|line| {
            let (_, rest) = line.split_once(label)?;
            rest.split_whitespace()
                .next()?
                .parse()
                .ok()
                .map(ReportValue::Number)
        }),
        HeaderProbe::TextAfter(label) => body.iter().find_map(|line| {
            let (_, rest) = line.split_once(label)?;
            let text = rest.split(';').next().unwrap_or_default().trim();
            Some(ReportValue::Text(text.to_string()))
        }),
        HeaderProbe::NumberBeforeMolal => body.iter().find_map(|line| {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let unit = tokens.iter().position(|token| token.starts_with("molal"))?;
            tokens
                .get(unit.checked_sub(1)?)?
                .parse()
                .ok()
                .map(ReportValue::Number)
        }),
    }
}
