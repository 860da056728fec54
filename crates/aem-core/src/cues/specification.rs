use super::{CueError, CueResult, CueValue};
use crate::composition::{AcccComposition, Amount, Electrolyte, accc_salt_class};
use serde::{Deserialize, Serialize};

pub(crate) const MAX_FIXED_SOLVENTS: usize = 10;
pub(crate) const MATRIX_SOLVENT_RANGE: std::ops::RangeInclusive<usize> = 2..=5;
pub(crate) const MAX_SALTS: usize = 2;

/// Integer-coded answers to the solver's multiple-choice prompts.
macro_rules! solver_flag {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "u8", into = "u8")]
        pub enum $name {
            $($variant = $code),+
        }

        impl $name {
            pub const fn code(self) -> u8 {
                self as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = String;

            fn try_from(code: u8) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok(Self::$variant),)+
                    other => Err(format!(
                        "{} does not accept {other}; expected one of {:?}",
                        stringify!($name),
                        [$($code),+]
                    )),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(flag: $name) -> Self {
                flag.code()
            }
        }

        impl From<$name> for CueValue {
            fn from(flag: $name) -> Self {
                CueValue::from(flag.code())
            }
        }
    };
}

solver_flag!(SolventCompositionMode { Fixed = 1, Matrix = 2 });
solver_flag!(ProportionBasis { Volume = 1, Mass = 2 });
solver_flag!(SaltCompositionMode {
    SingleFixed = 1,
    SeveralProportions = 2,
});
solver_flag!(SaltConcentrationMode { Range = 1, Dilute = 2 });
solver_flag!(TripleIonStability { Default = 1, Automatic = 2 });
solver_flag!(PulseType { Discharge = 1, Charge = 2 });
solver_flag!(
    /// A yes/no prompt.
    Switch { Off = 0, On = 1 }
);

impl Switch {
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl Default for Switch {
    fn default() -> Self {
        Self::Off
    }
}

impl Default for SaltConcentrationMode {
    fn default() -> Self {
        Self::Range
    }
}

/// Surface-charge attenuated electrolyte permittivity inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaepSettings {
    #[serde(default)]
    pub enabled: Switch,
    #[serde(default)]
    pub pulse_type: Option<PulseType>,
    #[serde(default)]
    pub cell_voltage: Option<Amount>,
    #[serde(default)]
    pub bulk_salt_concentration: Option<Amount>,
    #[serde(default)]
    pub sei_thickness: Option<Amount>,
    #[serde(default)]
    pub sei_permittivity: Option<Amount>,
    #[serde(default)]
    pub sei_porosity: Option<Amount>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoubleLayerSettings {
    #[serde(default)]
    pub enabled: Switch,
    #[serde(default)]
    pub prepulse_concentration: Option<Amount>,
    #[serde(default)]
    pub current_density: Option<Amount>,
    #[serde(default)]
    pub temperature: Option<Amount>,
}

/// Counts a caller may state up front; each one is checked against the
/// composition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredCounts {
    #[serde(default, alias = "number_of_total_solvents")]
    pub total_solvents: Option<usize>,
    #[serde(default, alias = "number_of_accc_solvents")]
    pub accc_solvents: Option<usize>,
    #[serde(default, alias = "number_of_total_salts")]
    pub total_salts: Option<usize>,
    #[serde(default, alias = "number_of_accc_salts")]
    pub accc_salts: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParameters {
    #[serde(alias = "solventcomp")]
    pub solvent_composition: SolventCompositionMode,
    #[serde(default, alias = "solventcomppropbasis")]
    pub proportion_basis: Option<ProportionBasis>,
    #[serde(default, alias = "cmfoption")]
    pub cmf_option: Option<Switch>,
    /// Zero-based position of the constant-mass-fraction solvent.
    #[serde(default, alias = "cmfsolventindex")]
    pub cmf_solvent_index: Option<usize>,
    #[serde(default, alias = "saltcomp")]
    pub salt_composition: Option<SaltCompositionMode>,
    #[serde(default, alias = "saltconcmode")]
    pub salt_concentration_mode: SaltConcentrationMode,
    #[serde(default, alias = "totalsaltconc")]
    pub total_salt_concentration: Option<Amount>,
    #[serde(alias = "tmin")]
    pub min_temperature: Amount,
    #[serde(alias = "tmax")]
    pub max_temperature: Amount,
    #[serde(alias = "stepsize")]
    pub temperature_step: Amount,
    #[serde(alias = "tis")]
    pub triple_ion_stability: TripleIonStability,
    #[serde(alias = "contactangle")]
    pub contact_angle: Amount,
    #[serde(alias = "porelength")]
    pub pore_length: Amount,
    #[serde(alias = "saltconc")]
    pub salt_concentration: Amount,
    #[serde(default)]
    pub scaep: ScaepSettings,
    #[serde(default)]
    pub double_layer: DoubleLayerSettings,
    #[serde(default)]
    pub declared_counts: DeclaredCounts,
    #[serde(default)]
    pub accc_class_suffixes: Vec<String>,
}

/// Everything one solver invocation needs, checked for internal consistency.
///
/// Construction fails on count, index or missing-field problems so that cue
/// building never starts on a bad configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSpecification {
    electrolyte: Electrolyte,
    accc: AcccComposition,
    parameters: RunParameters,
    class_suffixes: Vec<String>,
}

impl RunSpecification {
    pub fn new(
        electrolyte: Electrolyte,
        accc: Option<AcccComposition>,
        parameters: RunParameters,
    ) -> CueResult<Self> {
        let accc = accc.unwrap_or_default();
        accc.validate()?;

        let mut specification = Self {
            electrolyte,
            accc,
            parameters,
            class_suffixes: Vec::new(),
        };
        specification.check_declared_counts()?;
        specification.check_solvents()?;
        specification.check_salts()?;
        specification.check_conditions()?;
        specification.check_feature_blocks()?;
        specification.class_suffixes = specification.resolve_class_suffixes()?;
        Ok(specification)
    }

    pub fn electrolyte(&self) -> &Electrolyte {
        &self.electrolyte
    }

    pub fn accc(&self) -> &AcccComposition {
        &self.accc
    }

    pub fn parameters(&self) -> &RunParameters {
        &self.parameters
    }

    /// Solvent class suffix per salt slot; empty when no ACCC data is used.
    pub fn class_suffixes(&self) -> &[String] {
        &self.class_suffixes
    }

    pub fn uses_accc(&self) -> bool {
        !self.accc.is_empty()
    }

    pub fn total_solvents(&self) -> usize {
        self.electrolyte.solvents().len() + self.accc.solvent_count()
    }

    pub fn total_salts(&self) -> usize {
        self.electrolyte.salts().len() + self.accc.salt_count()
    }

    pub fn is_fixed(&self) -> bool {
        self.parameters.solvent_composition == SolventCompositionMode::Fixed
    }

    /// The CMF solvent index when constant mass fraction is active.
    pub fn cmf_index(&self) -> Option<usize> {
        let cmf_on = self
            .parameters
            .cmf_option
            .is_some_and(Switch::is_on);
        if !self.is_fixed() && self.total_solvents() > 2 && cmf_on {
            self.parameters.cmf_solvent_index
        } else {
            None
        }
    }

    /// Stated counts are optional; when present they must equal what the
    /// composition holds, including an understated salt total.
    fn check_declared_counts(&self) -> CueResult<()> {
        let declared = &self.parameters.declared_counts;
        let checks = [
            ("number_of_total_solvents", declared.total_solvents, self.total_solvents()),
            ("number_of_accc_solvents", declared.accc_solvents, self.accc.solvent_count()),
            ("number_of_total_salts", declared.total_salts, self.total_salts()),
            ("number_of_accc_salts", declared.accc_salts, self.accc.salt_count()),
        ];
        for (field, stated, actual) in checks {
            if let Some(stated) = stated {
                if stated != actual {
                    return Err(CueError::configuration(
                        field,
                        format!("declared {stated} but the composition has {actual}"),
                    ));
                }
            }
        }
        Ok(())
    }

    fn check_solvents(&self) -> CueResult<()> {
        let total = self.total_solvents();
        if total == 0 {
            return Err(CueError::configuration(
                "solvents",
                "at least one solvent is required",
            ));
        }

        match self.parameters.solvent_composition {
            SolventCompositionMode::Fixed => {
                if total > MAX_FIXED_SOLVENTS {
                    return Err(CueError::configuration(
                        "solvents",
                        format!(
                            "{total} solvents given; fixed composition accepts at most {MAX_FIXED_SOLVENTS}"
                        ),
                    ));
                }
                if self.parameters.proportion_basis.is_none() {
                    return Err(CueError::missing(
                        "proportion_basis",
                        "fixed composition needs a volume or mass proportionality basis",
                    ));
                }
            }
            SolventCompositionMode::Matrix => {
                if !MATRIX_SOLVENT_RANGE.contains(&total) {
                    return Err(CueError::configuration(
                        "solvents",
                        format!(
                            "{total} solvents given; matrix composition accepts {} to {}",
                            MATRIX_SOLVENT_RANGE.start(),
                            MATRIX_SOLVENT_RANGE.end()
                        ),
                    ));
                }
                if !self.accc.solvent_classes.is_empty() {
                    return Err(CueError::configuration(
                        "accc.solvent_classes",
                        "ACCC solvent classes are only available with fixed composition",
                    ));
                }
                self.check_cmf(total)?;
            }
        }
        Ok(())
    }

    fn check_cmf(&self, total: usize) -> CueResult<()> {
        let option = self.parameters.cmf_option;
        if total <= 2 {
            if option.is_some_and(Switch::is_on) {
                return Err(CueError::configuration(
                    "cmf_option",
                    "constant mass fraction needs more than two solvents",
                ));
            }
            return Ok(());
        }

        let option = option.ok_or_else(|| {
            CueError::missing(
                "cmf_option",
                format!("matrix composition with {total} solvents asks whether to pin one solvent"),
            )
        })?;
        if option.is_on() {
            let index = self.parameters.cmf_solvent_index.ok_or_else(|| {
                CueError::missing("cmf_solvent_index", "constant mass fraction is switched on")
            })?;
            if index >= total {
                return Err(CueError::configuration(
                    "cmf_solvent_index",
                    format!("index {index} is outside the {total} listed solvents"),
                ));
            }
        }
        Ok(())
    }

    fn check_salts(&self) -> CueResult<()> {
        let total = self.total_salts();
        if total > MAX_SALTS {
            return Err(CueError::configuration(
                "salts",
                format!("{total} salts given; the solver accepts at most {MAX_SALTS}"),
            ));
        }
        if total > 1 && self.parameters.salt_composition.is_none() {
            return Err(CueError::missing(
                "salt_composition",
                "two salts need a single-fixed or several-proportions mode",
            ));
        }
        if self.parameters.salt_concentration_mode == SaltConcentrationMode::Range
            && self.parameters.total_salt_concentration.is_none()
        {
            return Err(CueError::missing(
                "total_salt_concentration",
                "range concentration mode needs a maximum total salt concentration",
            ));
        }
        Ok(())
    }

    fn check_conditions(&self) -> CueResult<()> {
        let parameters = &self.parameters;
        let (min, max) = (
            parameters.min_temperature.as_f64(),
            parameters.max_temperature.as_f64(),
        );
        if !(min <= max) {
            return Err(CueError::configuration(
                "min_temperature",
                format!("minimum temperature {min} exceeds maximum {max}"),
            ));
        }
        if !(parameters.temperature_step.as_f64() > 0.0) {
            return Err(CueError::configuration(
                "temperature_step",
                format!(
                    "temperature step must be positive, got {}",
                    parameters.temperature_step
                ),
            ));
        }
        Ok(())
    }

    fn check_feature_blocks(&self) -> CueResult<()> {
        if !self.is_fixed() {
            return Ok(());
        }

        let scaep = &self.parameters.scaep;
        if scaep.enabled.is_on() {
            let fields = [
                ("scaep.pulse_type", scaep.pulse_type.is_some()),
                ("scaep.cell_voltage", scaep.cell_voltage.is_some()),
                ("scaep.bulk_salt_concentration", scaep.bulk_salt_concentration.is_some()),
                ("scaep.sei_thickness", scaep.sei_thickness.is_some()),
                ("scaep.sei_permittivity", scaep.sei_permittivity.is_some()),
                ("scaep.sei_porosity", scaep.sei_porosity.is_some()),
            ];
            require_all(&fields, "SCAEP calculations are switched on")?;
        }

        let double_layer = &self.parameters.double_layer;
        if double_layer.enabled.is_on() {
            let fields = [
                (
                    "double_layer.prepulse_concentration",
                    double_layer.prepulse_concentration.is_some(),
                ),
                (
                    "double_layer.current_density",
                    double_layer.current_density.is_some(),
                ),
                ("double_layer.temperature", double_layer.temperature.is_some()),
            ];
            require_all(&fields, "double-layer calculations are switched on")?;
        }
        Ok(())
    }

    fn resolve_class_suffixes(&self) -> CueResult<Vec<String>> {
        if !self.uses_accc() {
            return Ok(Vec::new());
        }

        let salt_names: Vec<&str> = self
            .electrolyte
            .salts()
            .iter()
            .chain(&self.accc.salts)
            .map(|salt| salt.name.as_str())
            .collect();
        let single_class = match self.accc.solvent_classes.as_slice() {
            [class] => Some(class.name.as_str()),
            _ => None,
        };

        let slots = salt_names.len().max(1);
        let mut suffixes = Vec::with_capacity(slots);
        for slot in 0..slots {
            let suffix = self
                .parameters
                .accc_class_suffixes
                .get(slot)
                .map(String::as_str)
                .or_else(|| salt_names.get(slot).and_then(|name| accc_salt_class(name)))
                .or(single_class)
                .ok_or_else(|| {
                    CueError::missing(
                        "accc_class_suffixes",
                        format!("no ACCC solvent class suffix is known for salt slot {}", slot + 1),
                    )
                })?;
            if suffix.is_empty() || !suffix.is_ascii() {
                return Err(CueError::configuration(
                    "accc_class_suffixes",
                    format!("suffix '{suffix}' must be non-empty ASCII text"),
                ));
            }
            suffixes.push(suffix.to_string());
        }
        Ok(suffixes)
    }
}

fn require_all(fields: &[(&'static str, bool)], reason: &str) -> CueResult<()> {
    match fields.iter().find(|(_, present)| !present) {
        Some((field, _)) => Err(CueError::missing(*field, reason)),
        None => Ok(()),
    }
}
