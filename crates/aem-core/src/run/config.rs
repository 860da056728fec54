use super::{RunError, RunResult};
use crate::composition::{
    AcccComposition, Amounts, Component, Composition, CompositionResult, DEFAULT_SALT_DECIMALS,
    DEFAULT_SOLVENT_PRECISION, Electrolyte, derive_by_mass, derive_by_mass_fraction_and_molality,
    derive_by_solution_volume,
};
use crate::cues::RunParameters;
use crate::domain::{ExportFormat, SolverCapability};
use crate::registry::{Registry, RegistryPaths};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_RUN_NAME: &str = "AemRun";
const DEFAULT_OUTPUT_DIR: &str = "runs";

/// A complete run description, normally read from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub solver: SolverConfig,
    pub registry: RegistryPaths,
    pub composition: CompositionSource,
    #[serde(default)]
    pub accc: Option<AcccComposition>,
    pub parameters: RunParameters,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Directory holding the executable; the solver runs and writes reports here.
    pub home: PathBuf,
    pub program: String,
    #[serde(default)]
    pub capability: Option<SolverCapability>,
    /// Executable that prints the solver's schema code.
    #[serde(default)]
    pub probe: Option<PathBuf>,
    #[serde(default = "default_quiet")]
    pub quiet: bool,
}

impl SolverConfig {
    pub fn executable(&self) -> PathBuf {
        self.home.join(&self.program)
    }
}

fn default_quiet() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    #[serde(default)]
    pub run_name: Option<String>,
    #[serde(default = "default_formats")]
    pub formats: Vec<ExportFormat>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            run_name: None,
            formats: default_formats(),
        }
    }
}

impl OutputConfig {
    pub fn run_name(&self) -> &str {
        self.run_name.as_deref().unwrap_or(DEFAULT_RUN_NAME)
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

fn default_formats() -> Vec<ExportFormat> {
    ExportFormat::ALL.to_vec()
}

fn default_precision() -> u32 {
    DEFAULT_SOLVENT_PRECISION
}

fn default_decimals() -> u32 {
    DEFAULT_SALT_DECIMALS
}

/// Where the electrolyte of a run comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum CompositionSource {
    Identifier {
        identifier: String,
    },
    ByMass {
        solvents: Amounts,
        #[serde(default)]
        salts: Amounts,
        #[serde(default = "default_precision")]
        precision: u32,
        #[serde(default = "default_decimals")]
        decimals: u32,
    },
    ByMassFractionAndMolality {
        solvents: Amounts,
        #[serde(default)]
        salts: Amounts,
        #[serde(default = "default_precision")]
        precision: u32,
        #[serde(default = "default_decimals")]
        decimals: u32,
    },
    BySolutionVolume {
        volumes: Amounts,
        densities: Amounts,
        #[serde(default = "default_precision")]
        precision: u32,
        #[serde(default = "default_decimals")]
        decimals: u32,
    },
    /// Caller-ordered components sent to the solver exactly as written.
    Translate {
        solvents: Vec<Component>,
        #[serde(default)]
        salts: Vec<Component>,
    },
}

impl CompositionSource {
    /// The cue-facing electrolyte, plus the identifier-backed composition
    /// when the source produces one.
    pub fn resolve(&self, registry: &Registry) -> CompositionResult<(Electrolyte, Option<Composition>)> {
        let composition = match self {
            Self::Identifier { identifier } => Composition::from_identifier(identifier)?,
            Self::ByMass {
                solvents,
                salts,
                precision,
                decimals,
            } => derive_by_mass(solvents, salts, *precision, *decimals)?,
            Self::ByMassFractionAndMolality {
                solvents,
                salts,
                precision,
                decimals,
            } => derive_by_mass_fraction_and_molality(solvents, salts, *precision, *decimals)?,
            Self::BySolutionVolume {
                volumes,
                densities,
                precision,
                decimals,
            } => derive_by_solution_volume(
                volumes,
                densities,
                &registry.salt_properties,
                *precision,
                *decimals,
            )?,
            Self::Translate { solvents, salts } => {
                let electrolyte = Electrolyte::translate(solvents.clone(), salts.clone())?;
                return Ok((electrolyte, None));
            }
        };
        Ok((Electrolyte::from(&composition), Some(composition)))
    }
}

impl RunConfig {
    /// Reads a config file and resolves its relative paths against the
    /// file's directory.
    pub fn load(path: impl AsRef<Path>) -> RunResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| RunError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self =
            serde_json::from_str(&source).map_err(|source| RunError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.resolve_paths(base);
        Ok(config)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.solver.home);
        if let Some(probe) = self.solver.probe.as_mut() {
            resolve(probe);
        }
        resolve(&mut self.registry.solvent_codes);
        resolve(&mut self.registry.salt_codes);
        if let Some(properties) = self.registry.salt_properties.as_mut() {
            resolve(properties);
        }
        resolve(&mut self.output.directory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::Amount;
    use crate::cues::{ProportionBasis, SolventCompositionMode, Switch};
    use crate::registry::{ComponentKind, ComponentTable};

    const CONFIG: &str = r#"{
        "solver": { "home": "solver", "program": "aem_accc.exe" },
        "registry": {
            "solvent_codes": "tables/solvents.csv",
            "salt_codes": "/opt/aem/salts.csv"
        },
        "composition": {
            "basis": "translate",
            "solvents": [
                { "name": "EP", "amount": 25 },
                { "name": "DMC", "amount": 50 },
                { "name": "EC", "amount": 25 }
            ],
            "salts": [{ "name": "LiPF6", "amount": 1.0 }]
        },
        "parameters": {
            "solventcomp": 1,
            "solventcomppropbasis": 1,
            "saltconcmode": 1,
            "totalsaltconc": 5,
            "tmin": -20,
            "tmax": 60,
            "stepsize": 10,
            "tis": 1,
            "contactangle": 90,
            "porelength": 50,
            "saltconc": 1.5,
            "scaep": { "enabled": 0 }
        }
    }"#;

    #[test]
    fn load_resolves_relative_paths_against_the_config_directory() {
        let temp = tempfile::TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("run.json");
        fs::write(&path, CONFIG).expect("config should be written");

        let config = RunConfig::load(&path).expect("config should load");
        assert_eq!(config.solver.home, temp.path().join("solver"));
        assert_eq!(
            config.solver.executable(),
            temp.path().join("solver").join("aem_accc.exe")
        );
        assert!(config.solver.quiet);
        assert_eq!(config.registry.solvent_codes, temp.path().join("tables/solvents.csv"));
        assert_eq!(config.registry.salt_codes, PathBuf::from("/opt/aem/salts.csv"));
        assert_eq!(config.output.directory, temp.path().join("runs"));
        assert_eq!(config.output.formats, ExportFormat::ALL.to_vec());
        assert_eq!(config.output.run_name(), "AemRun");
    }

    #[test]
    fn legacy_parameter_names_and_literal_kinds_survive_parsing() {
        let config: RunConfig = serde_json::from_str(CONFIG).expect("config should parse");
        let parameters = &config.parameters;
        assert_eq!(parameters.solvent_composition, SolventCompositionMode::Fixed);
        assert_eq!(parameters.proportion_basis, Some(ProportionBasis::Volume));
        assert_eq!(parameters.total_salt_concentration, Some(Amount::Integer(5)));
        assert_eq!(parameters.salt_concentration, Amount::Decimal(1.5));
        assert_eq!(parameters.scaep.enabled, Switch::Off);

        let CompositionSource::Translate { solvents, salts } = &config.composition else {
            panic!("translate basis should be selected");
        };
        assert_eq!(solvents[0], Component::new("EP", 25_i64));
        assert_eq!(salts[0].amount, Amount::Decimal(1.0));
    }

    #[test]
    fn out_of_range_flags_are_rejected_at_load_time() {
        let broken = CONFIG.replace("\"solventcomp\": 1", "\"solventcomp\": 3");
        let error = serde_json::from_str::<RunConfig>(&broken).expect_err("flag 3 is invalid");
        assert!(error.to_string().contains("does not accept 3"));
    }

    #[test]
    fn identifier_source_resolves_through_the_codec() {
        let source: CompositionSource = serde_json::from_str(
            r#"{ "basis": "identifier", "identifier": "EC_EMC|30_70|LiPF6|1.2" }"#,
        )
        .expect("source should parse");
        let registry = Registry {
            solvents: ComponentTable::from_entries(ComponentKind::Solvent, []),
            salts: ComponentTable::from_entries(ComponentKind::Salt, []),
            salt_properties: Default::default(),
        };
        let (electrolyte, composition) = source.resolve(&registry).expect("identifier should resolve");
        assert_eq!(electrolyte.solvents().len(), 2);
        assert_eq!(
            composition.map(|composition| composition.identifier().to_string()),
            Some("EC_EMC|30_70|LiPF6|1.2".to_string())
        );
    }

    #[test]
    fn mass_source_uses_default_precision() {
        let source: CompositionSource = serde_json::from_str(
            r#"{ "basis": "by_mass", "solvents": { "EC": 30.0, "EMC": 70.0 }, "salts": { "LiPF6": 15.19 } }"#,
        )
        .expect("source should parse");
        assert!(matches!(
            source,
            CompositionSource::ByMass { precision: 100, decimals: 2, .. }
        ));
    }
}
