//! Scripted answers for the solver's interactive prompt sequence.
//!
//! The solver reads one answer per line from stdin with no way to go back, so
//! the order of a [`CueSequence`] is the protocol. [`build_cues`] turns a
//! validated [`RunSpecification`] into that sequence plus a [`LabelMap`]
//! naming every entry for run logs.

mod builder;
mod specification;

pub use builder::build_cues;
pub use specification::{
    DeclaredCounts, DoubleLayerSettings, ProportionBasis, PulseType, RunParameters,
    RunSpecification, SaltCompositionMode, SaltConcentrationMode, ScaepSettings,
    SolventCompositionMode, Switch, TripleIonStability,
};

use crate::composition::{Amount, CompositionError};
use crate::domain::AemError;
use crate::serialization::format_cue_float;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};

pub type CueResult<T> = Result<T, CueError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CueError {
    #[error("configuration error in '{field}': {message}")]
    Configuration {
        field: &'static str,
        message: String,
    },
    #[error("missing parameter '{field}': {reason}")]
    MissingParameter {
        field: &'static str,
        reason: String,
    },
    #[error(transparent)]
    Composition(#[from] CompositionError),
}

impl CueError {
    pub(crate) fn configuration(field: &'static str, message: impl Into<String>) -> Self {
        Self::Configuration {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn missing(field: &'static str, reason: impl Into<String>) -> Self {
        Self::MissingParameter {
            field,
            reason: reason.into(),
        }
    }
}

impl From<CueError> for AemError {
    fn from(error: CueError) -> Self {
        match &error {
            CueError::Configuration { .. } => {
                AemError::input_validation("INPUT.CONFIGURATION", error.to_string())
            }
            CueError::MissingParameter { .. } => {
                AemError::input_validation("INPUT.MISSING_PARAMETER", error.to_string())
            }
            CueError::Composition(inner) => inner.clone().into(),
        }
    }
}

/// One answer written to the solver.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CueValue {
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl Display for CueValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Decimal(value) => f.write_str(&format_cue_float(*value)),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<Amount> for CueValue {
    fn from(amount: Amount) -> Self {
        match amount {
            Amount::Integer(value) => Self::Integer(value),
            Amount::Decimal(value) => Self::Decimal(value),
        }
    }
}

impl From<i64> for CueValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for CueValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u8> for CueValue {
    fn from(value: u8) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<usize> for CueValue {
    fn from(value: usize) -> Self {
        Self::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for CueValue {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl From<&str> for CueValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CueSequence(Vec<CueValue>);

impl CueSequence {
    pub fn values(&self) -> &[CueValue] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stdin text: one cue per line followed by a blank line.
    pub fn to_stdin_script(&self) -> String {
        let mut script = self
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n");
        script.push_str("\n\n");
        script
    }

    pub fn to_stdin_bytes(&self) -> Vec<u8> {
        self.to_stdin_script().into_bytes()
    }
}

/// Ordered label/value pairs mirroring a [`CueSequence`] one-to-one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelMap(Vec<(String, CueValue)>);

impl LabelMap {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CueValue)> {
        self.0.iter().map(|(label, value)| (label.as_str(), value))
    }

    pub fn get(&self, label: &str) -> Option<&CueValue> {
        self.0
            .iter()
            .find(|(candidate, _)| candidate == label)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn render_lines(&self) -> Vec<String> {
        self.iter()
            .map(|(label, value)| format!("{label}: {value}"))
            .collect()
    }
}

impl Serialize for LabelMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, value) in &self.0 {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

/// Accumulates cues and their labels in lock-step.
#[derive(Debug, Default)]
pub(crate) struct CueWriter {
    entries: Vec<(String, CueValue)>,
}

impl CueWriter {
    pub(crate) fn push(&mut self, label: impl Into<String>, value: impl Into<CueValue>) {
        self.entries.push((label.into(), value.into()));
    }

    pub(crate) fn finish(self) -> (CueSequence, LabelMap) {
        let values = self.entries.iter().map(|(_, value)| value.clone()).collect();
        (CueSequence(values), LabelMap(self.entries))
    }
}

#[cfg(test)]
mod tests {
    use super::{CueError, CueValue, CueWriter};
    use crate::composition::Amount;
    use crate::domain::AemError;

    #[test]
    fn stdin_script_ends_with_blank_line() {
        let mut writer = CueWriter::default();
        writer.push("Solvent Composition", 1_u8);
        writer.push("Salt Concentration of Interest", Amount::Decimal(1.5));
        writer.push("ACCC Solvent Class Suffix 1", "EC_EMC");
        writer.push("End of Input", 0_u8);
        let (cues, labels) = writer.finish();

        assert_eq!(cues.to_stdin_script(), "1\n1.5\nEC_EMC\n0\n\n");
        assert_eq!(labels.len(), cues.len());
        assert_eq!(labels.get("End of Input"), Some(&CueValue::Integer(0)));
    }

    #[test]
    fn label_map_serializes_in_emission_order() {
        let mut writer = CueWriter::default();
        writer.push("Minimum Temperature", -20_i64);
        writer.push("Maximum Temperature", Amount::Integer(60));
        let (_, labels) = writer.finish();

        let rendered = serde_json::to_string(&labels).expect("labels should serialize");
        assert_eq!(
            rendered,
            r#"{"Minimum Temperature":-20,"Maximum Temperature":60}"#
        );
        assert_eq!(labels.render_lines()[0], "Minimum Temperature: -20");
    }

    #[test]
    fn cue_errors_map_to_input_placeholders() {
        let missing: AemError = CueError::missing("cmf_solvent_index", "CMF is on").into();
        assert_eq!(missing.placeholder(), "INPUT.MISSING_PARAMETER");

        let configuration: AemError =
            CueError::configuration("salts", "3 salts given, at most 2 allowed").into();
        assert_eq!(configuration.placeholder(), "INPUT.CONFIGURATION");
        assert_eq!(
            configuration.message(),
            "configuration error in 'salts': 3 salts given, at most 2 allowed"
        );
    }
}
