//! Electrolyte compositions and the `solvents|weights|salts|molalities`
//! identifier format used in run names, logs and user input.

pub mod accc;
pub mod codec;
pub mod derive;

pub use accc::{AcccComposition, SolventClass, accc_salt_class};
pub use codec::{
    DEFAULT_SALT_DECIMALS, DEFAULT_SOLVENT_PRECISION, DecodedComposition, decode, encode,
    infer_solvent_precision, normalize_salts, normalize_solvents,
};
pub use derive::{
    derive_by_mass, derive_by_mass_fraction_and_molality, derive_by_solution_volume,
};

use crate::domain::AemError;
use crate::serialization::format_cue_float;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

/// Raw caller-supplied quantities keyed by component name.
pub type Amounts = BTreeMap<String, f64>;

pub type CompositionResult<T> = Result<T, CompositionError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompositionError {
    #[error("invalid composition: {0}")]
    InvalidComposition(String),
    #[error("unknown solvent '{0}'")]
    UnknownSolvent(String),
    #[error("unknown salt '{0}'")]
    UnknownSalt(String),
}

impl From<CompositionError> for AemError {
    fn from(error: CompositionError) -> Self {
        let placeholder = match &error {
            CompositionError::InvalidComposition(_) => "INPUT.INVALID_COMPOSITION",
            CompositionError::UnknownSolvent(_) => "INPUT.UNKNOWN_SOLVENT",
            CompositionError::UnknownSalt(_) => "INPUT.UNKNOWN_SALT",
        };
        AemError::input_validation(placeholder, error.to_string())
    }
}

pub(crate) fn invalid(message: impl Into<String>) -> CompositionError {
    CompositionError::InvalidComposition(message.into())
}

/// A numeric literal as the caller wrote it.
///
/// The solver reads proportions and scalars as text, so `25` and `25.0` are
/// kept apart all the way to the cue stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Integer(i64),
    Decimal(f64),
}

impl Amount {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(value) => value as f64,
            Self::Decimal(value) => value,
        }
    }

    pub fn is_zero(self) -> bool {
        self.as_f64() == 0.0
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Decimal(value) => f.write_str(&format_cue_float(*value)),
        }
    }
}

/// Normalized solvent weights, sorted by name, every weight at least 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SolventComposition(BTreeMap<String, u32>);

impl SolventComposition {
    pub(crate) fn from_map(weights: BTreeMap<String, u32>) -> Self {
        Self(weights)
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(name, weight)| (name.as_str(), *weight))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Rounded salt molalities, sorted by name, zero entries removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SaltComposition(BTreeMap<String, f64>);

impl SaltComposition {
    pub(crate) fn from_map(molalities: BTreeMap<String, f64>) -> Self {
        Self(molalities)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, molality)| (name.as_str(), *molality))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CompositionId(String);

impl CompositionId {
    pub(crate) fn from_rendered(identifier: String) -> Self {
        Self(identifier)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier with both delimiters stripped, safe for file names.
    pub fn compact_name(&self) -> String {
        self.0.replace(['_', '|'], "")
    }
}

impl Display for CompositionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One pre-mixed solution contributing to a blended composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionDose {
    pub identifier: String,
    pub volume: f64,
    pub density: f64,
}

/// How a composition's identifier was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum Provenance {
    Identifier,
    ByMass {
        solvents: Amounts,
        salts: Amounts,
    },
    ByMassFractionAndMolality {
        solvents: Amounts,
        salts: Amounts,
    },
    BySolutionVolume {
        doses: Vec<SolutionDose>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Composition {
    identifier: CompositionId,
    solvents: SolventComposition,
    salts: SaltComposition,
    solvent_precision: u32,
    salt_decimals: u32,
    provenance: Provenance,
}

impl Composition {
    pub(crate) fn assemble(
        solvents: SolventComposition,
        salts: SaltComposition,
        solvent_precision: u32,
        salt_decimals: u32,
        provenance: Provenance,
    ) -> Self {
        let identifier = codec::render_identifier(&solvents, &salts);
        Self {
            identifier,
            solvents,
            salts,
            solvent_precision,
            salt_decimals,
            provenance,
        }
    }

    /// Decodes an existing identifier. The given text is kept as the
    /// identifier even when re-normalization would render it differently.
    pub fn from_identifier(identifier: &str) -> CompositionResult<Self> {
        let decoded = decode(identifier)?;
        Ok(Self {
            identifier: CompositionId(identifier.to_string()),
            solvents: decoded.solvents,
            salts: decoded.salts,
            solvent_precision: decoded.solvent_precision,
            salt_decimals: decoded.salt_decimals,
            provenance: Provenance::Identifier,
        })
    }

    pub fn identifier(&self) -> &CompositionId {
        &self.identifier
    }

    pub fn solvents(&self) -> &SolventComposition {
        &self.solvents
    }

    pub fn salts(&self) -> &SaltComposition {
        &self.salts
    }

    pub fn solvent_precision(&self) -> u32 {
        self.solvent_precision
    }

    pub fn salt_decimals(&self) -> u32 {
        self.salt_decimals
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub amount: Amount,
}

impl Component {
    pub fn new(name: impl Into<String>, amount: impl Into<Amount>) -> Self {
        Self {
            name: name.into(),
            amount: amount.into(),
        }
    }
}

/// Solvents and salts in the order and with the literals the cue stream uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Electrolyte {
    solvents: Vec<Component>,
    salts: Vec<Component>,
}

impl Electrolyte {
    /// Keeps caller order and literal values; zero entries are dropped.
    pub fn translate(
        solvents: Vec<Component>,
        salts: Vec<Component>,
    ) -> CompositionResult<Self> {
        Ok(Self {
            solvents: checked_components("solvent", solvents)?,
            salts: checked_components("salt", salts)?,
        })
    }

    pub fn solvents(&self) -> &[Component] {
        &self.solvents
    }

    pub fn salts(&self) -> &[Component] {
        &self.salts
    }
}

impl From<&Composition> for Electrolyte {
    fn from(composition: &Composition) -> Self {
        Self {
            solvents: composition
                .solvents()
                .iter()
                .map(|(name, weight)| Component::new(name, i64::from(weight)))
                .collect(),
            salts: composition
                .salts()
                .iter()
                .map(|(name, molality)| Component::new(name, molality))
                .collect(),
        }
    }
}

fn checked_components(kind: &str, components: Vec<Component>) -> CompositionResult<Vec<Component>> {
    let mut seen = BTreeSet::new();
    let mut kept = Vec::with_capacity(components.len());
    for component in components {
        let value = component.amount.as_f64();
        if component.name.trim().is_empty() {
            return Err(invalid(format!("{kind} name must not be empty")));
        }
        if !value.is_finite() || value < 0.0 {
            return Err(invalid(format!(
                "{kind} '{}' has amount {}; amounts must be finite and non-negative",
                component.name, component.amount
            )));
        }
        if !seen.insert(component.name.clone()) {
            return Err(invalid(format!("{kind} '{}' is listed twice", component.name)));
        }
        if !component.amount.is_zero() {
            kept.push(component);
        }
    }
    Ok(kept)
}
