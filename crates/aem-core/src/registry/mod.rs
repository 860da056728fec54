//! Reference tables shipped with the solver: component name to solver code
//! and category, and salt name to molar mass.

use crate::composition::{Composition, CompositionError, CompositionResult};
use crate::domain::AemError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("invalid record in '{path}' at line {line}: {message}")]
    InvalidRecord {
        path: String,
        line: u64,
        message: String,
    },
}

impl From<RegistryError> for AemError {
    fn from(error: RegistryError) -> Self {
        match &error {
            RegistryError::Csv { .. } => AemError::io_system("IO.REGISTRY_READ", error.to_string()),
            RegistryError::InvalidRecord { .. } => {
                AemError::input_validation("INPUT.REGISTRY_RECORD", error.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Solvent,
    Salt,
}

impl ComponentKind {
    fn unknown(self, name: &str) -> CompositionError {
        match self {
            Self::Solvent => CompositionError::UnknownSolvent(name.to_string()),
            Self::Salt => CompositionError::UnknownSalt(name.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentCode {
    pub name: String,
    pub code: u32,
    pub category: String,
}

/// Name-to-code table. Columns are read by position: name, code, category.
#[derive(Debug, Clone)]
pub struct ComponentTable {
    kind: ComponentKind,
    entries: BTreeMap<String, ComponentCode>,
}

impl ComponentTable {
    pub fn load(path: &Path, kind: ComponentKind) -> RegistryResult<Self> {
        let file = std::fs::File::open(path).map_err(|source| RegistryError::Csv {
            path: path.display().to_string(),
            source: source.into(),
        })?;
        Self::from_reader(file, kind, &path.display().to_string())
    }

    pub fn from_reader<R: Read>(reader: R, kind: ComponentKind, source: &str) -> RegistryResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut entries = BTreeMap::new();
        for result in reader.records() {
            let record = result.map_err(|e| RegistryError::Csv {
                path: source.to_string(),
                source: e,
            })?;
            let line = record.position().map_or(0, csv::Position::line);
            let invalid = |message: String| RegistryError::InvalidRecord {
                path: source.to_string(),
                line,
                message,
            };

            let name = record.get(0).unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            let code_text = record.get(1).unwrap_or_default();
            let code = parse_code(code_text)
                .ok_or_else(|| invalid(format!("code '{code_text}' for '{name}' is not a whole number")))?;
            let category = record.get(2).unwrap_or_default().to_string();

            entries.insert(
                name.to_string(),
                ComponentCode {
                    name: name.to_string(),
                    code,
                    category,
                },
            );
        }

        debug!(source, count = entries.len(), ?kind, "loaded component table");
        Ok(Self { kind, entries })
    }

    pub fn from_entries<'a>(
        kind: ComponentKind,
        entries: impl IntoIterator<Item = (&'a str, u32, &'a str)>,
    ) -> Self {
        let entries = entries
            .into_iter()
            .map(|(name, code, category)| {
                (
                    name.to_string(),
                    ComponentCode {
                        name: name.to_string(),
                        code,
                        category: category.to_string(),
                    },
                )
            })
            .collect();
        Self { kind, entries }
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn lookup(&self, name: &str) -> CompositionResult<&ComponentCode> {
        self.entries.get(name).ok_or_else(|| self.kind.unknown(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_code(text: &str) -> Option<u32> {
    text.parse::<u32>().ok().or_else(|| {
        let value: f64 = text.parse().ok()?;
        (value.fract() == 0.0 && value >= 0.0 && value <= f64::from(u32::MAX)).then_some(value as u32)
    })
}

#[derive(Debug, Deserialize)]
struct SaltPropertyRecord {
    name: String,
    #[serde(rename = "molar mass")]
    molar_mass: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SaltPropertyTable {
    molar_masses: BTreeMap<String, f64>,
}

impl SaltPropertyTable {
    pub fn load(path: &Path) -> RegistryResult<Self> {
        let file = std::fs::File::open(path).map_err(|source| RegistryError::Csv {
            path: path.display().to_string(),
            source: source.into(),
        })?;
        Self::from_reader(file, &path.display().to_string())
    }

    pub fn from_reader<R: Read>(reader: R, source: &str) -> RegistryResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut molar_masses = BTreeMap::new();
        for result in reader.deserialize::<SaltPropertyRecord>() {
            let record = result.map_err(|e| RegistryError::Csv {
                path: source.to_string(),
                source: e,
            })?;
            molar_masses.insert(record.name, record.molar_mass);
        }
        debug!(source, count = molar_masses.len(), "loaded salt property table");
        Ok(Self { molar_masses })
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self {
            molar_masses: entries
                .into_iter()
                .map(|(name, mass)| (name.to_string(), mass))
                .collect(),
        }
    }

    /// Molar mass in g/mol.
    pub fn molar_mass(&self, salt: &str) -> CompositionResult<f64> {
        self.molar_masses
            .get(salt)
            .copied()
            .ok_or_else(|| CompositionError::UnknownSalt(salt.to_string()))
    }
}

/// File locations of the three registry tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryPaths {
    pub solvent_codes: PathBuf,
    pub salt_codes: PathBuf,
    #[serde(default)]
    pub salt_properties: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Registry {
    pub solvents: ComponentTable,
    pub salts: ComponentTable,
    pub salt_properties: SaltPropertyTable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositionDescription {
    pub solvents: Vec<ComponentCode>,
    pub salts: Vec<ComponentCode>,
}

impl Registry {
    pub fn load(paths: &RegistryPaths) -> RegistryResult<Self> {
        let salt_properties = match &paths.salt_properties {
            Some(path) => SaltPropertyTable::load(path)?,
            None => SaltPropertyTable::default(),
        };
        Ok(Self {
            solvents: ComponentTable::load(&paths.solvent_codes, ComponentKind::Solvent)?,
            salts: ComponentTable::load(&paths.salt_codes, ComponentKind::Salt)?,
            salt_properties,
        })
    }

    pub fn solvent(&self, name: &str) -> CompositionResult<&ComponentCode> {
        self.solvents.lookup(name)
    }

    pub fn salt(&self, name: &str) -> CompositionResult<&ComponentCode> {
        self.salts.lookup(name)
    }

    /// Registry entries for every component of `composition`.
    pub fn describe(&self, composition: &Composition) -> CompositionResult<CompositionDescription> {
        Ok(CompositionDescription {
            solvents: composition
                .solvents()
                .names()
                .map(|name| self.solvent(name).cloned())
                .collect::<CompositionResult<_>>()?,
            salts: composition
                .salts()
                .names()
                .map(|name| self.salt(name).cloned())
                .collect::<CompositionResult<_>>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ComponentKind, ComponentTable, Registry, RegistryError, SaltPropertyTable};
    use crate::composition::{Composition, CompositionError};

    const SOLVENT_CSV: &str = "string,number,type\nEC , 12, carbonate \nEMC,14,carbonate\nFEC,27.0,fluorinated\n";

    #[test]
    fn component_table_reads_columns_by_position() {
        let table = ComponentTable::from_reader(SOLVENT_CSV.as_bytes(), ComponentKind::Solvent, "mem")
            .expect("table should load");

        let ec = table.lookup("EC").expect("EC should be present");
        assert_eq!(ec.code, 12);
        assert_eq!(ec.category, "carbonate");
        assert_eq!(table.lookup("FEC").expect("FEC should be present").code, 27);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn missing_names_report_the_component_kind() {
        let table = ComponentTable::from_reader(SOLVENT_CSV.as_bytes(), ComponentKind::Solvent, "mem")
            .expect("table should load");
        assert_eq!(
            table.lookup("DMC"),
            Err(CompositionError::UnknownSolvent("DMC".to_string()))
        );

        let salts = ComponentTable::from_entries(ComponentKind::Salt, [("LiPF6", 1, "lithium")]);
        assert_eq!(
            salts.lookup("LiBF4"),
            Err(CompositionError::UnknownSalt("LiBF4".to_string()))
        );
    }

    #[test]
    fn non_numeric_codes_are_rejected_with_line() {
        let result = ComponentTable::from_reader(
            "string,number,type\nEC,twelve,carbonate\n".as_bytes(),
            ComponentKind::Solvent,
            "codes.csv",
        );
        assert!(matches!(
            result,
            Err(RegistryError::InvalidRecord { line: 2, .. })
        ));
    }

    #[test]
    fn salt_properties_read_named_columns() {
        let table = SaltPropertyTable::from_reader(
            "name,formula,molar mass\nLiPF6,LiPF6,151.905\nLiBF4,LiBF4, 93.746\n".as_bytes(),
            "saltDB.csv",
        )
        .expect("table should load");

        assert_eq!(table.molar_mass("LiBF4"), Ok(93.746));
        assert!(table.molar_mass("NaPF6").is_err());
    }

    #[test]
    fn describe_lists_registry_entries_for_each_component() {
        let registry = Registry {
            solvents: ComponentTable::from_entries(
                ComponentKind::Solvent,
                [("EC", 12, "carbonate"), ("EMC", 14, "carbonate")],
            ),
            salts: ComponentTable::from_entries(ComponentKind::Salt, [("LiPF6", 1, "lithium")]),
            salt_properties: SaltPropertyTable::default(),
        };
        let composition =
            Composition::from_identifier("EC_EMC|30_70|LiPF6|1.0").expect("identifier should decode");

        let description = registry.describe(&composition).expect("description should succeed");
        assert_eq!(description.solvents[1].code, 14);
        assert_eq!(description.salts[0].category, "lithium");
    }
}
