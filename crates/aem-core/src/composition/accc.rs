use super::{Amount, Component, CompositionResult, invalid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const CLASS_MARKER: &str = "_w_";

/// A precomputed solvent class such as `EC_EMC`, with one proportion per
/// member solvent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolventClass {
    pub name: String,
    pub proportions: Vec<Amount>,
}

impl SolventClass {
    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.name.split('_')
    }

    pub fn member_count(&self) -> usize {
        self.members().count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcccComposition {
    #[serde(default)]
    pub solvent_classes: Vec<SolventClass>,
    #[serde(default)]
    pub salts: Vec<Component>,
}

impl AcccComposition {
    pub fn new(solvent_classes: Vec<SolventClass>, salts: Vec<Component>) -> CompositionResult<Self> {
        let composition = Self {
            solvent_classes,
            salts,
        };
        composition.validate()?;
        Ok(composition)
    }

    pub fn validate(&self) -> CompositionResult<()> {
        let mut names = BTreeSet::new();
        for class in &self.solvent_classes {
            if class.members().any(str::is_empty) {
                return Err(invalid(format!(
                    "solvent class '{}' has an empty member name",
                    class.name
                )));
            }
            if class.proportions.len() != class.member_count() {
                return Err(invalid(format!(
                    "solvent class '{}' has {} members but {} proportions",
                    class.name,
                    class.member_count(),
                    class.proportions.len()
                )));
            }
            if !names.insert(class.name.as_str()) {
                return Err(invalid(format!("solvent class '{}' is listed twice", class.name)));
            }
        }
        for salt in &self.salts {
            if salt.name.is_empty() || !names.insert(salt.name.as_str()) {
                return Err(invalid(format!("ACCC salt '{}' is empty or repeated", salt.name)));
            }
        }
        Ok(())
    }

    /// Member solvents contributed across every class.
    pub fn solvent_count(&self) -> usize {
        self.solvent_classes.iter().map(SolventClass::member_count).sum()
    }

    pub fn salt_count(&self) -> usize {
        self.salts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solvent_classes.is_empty() && self.salts.is_empty()
    }
}

/// The solvent class an ACCC salt was computed in, from its `_w_` suffix.
pub fn accc_salt_class(salt_name: &str) -> Option<&str> {
    salt_name
        .split_once(CLASS_MARKER)
        .map(|(_, class)| class)
        .filter(|class| !class.is_empty())
}
