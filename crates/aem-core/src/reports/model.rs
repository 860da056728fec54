use crate::serialization::format_cue_float;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Columns every report row starts with.
pub const COMMON_COLUMNS: [&str; 3] = ["solvent_comp", "salt_comp", "temperature"];

/// How a report-10 header scalar is located inside a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProbe {
    /// First number after the label.
    NumberAfter(&'static str),
    /// Text after the label, up to the next `;`.
    TextAfter(&'static str),
    /// Number written directly in front of the `molal` unit.
    NumberBeforeMolal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderField {
    pub column: &'static str,
    pub probe: HeaderProbe,
}

/// Fixed column layout of one numbered solver report.
#[derive(Debug, PartialEq, Eq)]
pub struct ReportSchema {
    pub number: u8,
    pub columns: &'static [&'static str],
    pub header_fields: &'static [HeaderField],
    /// Fragments removed from data lines before they are split.
    pub scrub: &'static [&'static str],
}

impl ReportSchema {
    /// Number of whitespace-separated values on one data line.
    pub fn data_width(&self) -> usize {
        self.columns.len() - COMMON_COLUMNS.len() - self.header_fields.len()
    }

    pub fn file_stem(&self) -> String {
        format!("Report{:02}", self.number)
    }
}

macro_rules! report_columns {
    ($($column:literal),+ $(,)?) => {
        &["solvent_comp", "salt_comp", "temperature", $($column),+]
    };
}

const REPORT10_HEADER: &[HeaderField] = &[
    HeaderField {
        column: "surface_charge_density",
        probe: HeaderProbe::NumberAfter("Surface Charge Density at target electrode surface:"),
    },
    HeaderField {
        column: "cell_voltage_at_start_of_pulse",
        probe: HeaderProbe::NumberAfter("Cell Voltage at start of pulse:"),
    },
    HeaderField {
        column: "salt_concentration_basis",
        probe: HeaderProbe::NumberBeforeMolal,
    },
    HeaderField {
        column: "pulse_type",
        probe: HeaderProbe::TextAfter("Pulse type:"),
    },
    HeaderField {
        column: "electrolyte_rel_perm_at_salt_conc",
        probe: HeaderProbe::NumberAfter("Electrolyte Rel. Perm. at Salt Conc.:"),
    },
    HeaderField {
        column: "dipole_moment_data",
        probe: HeaderProbe::NumberAfter("Dipole Moment, data:"),
    },
    HeaderField {
        column: "solvent_diameter",
        probe: HeaderProbe::NumberAfter("Solvent diameter:"),
    },
    HeaderField {
        column: "equivalent_charge_on_solvent_dipole",
        probe: HeaderProbe::NumberAfter("Equivalent charge on solvent dipole:"),
    },
    HeaderField {
        column: "sei_thickness",
        probe: HeaderProbe::NumberAfter("SEI thickness at target electrode:"),
    },
    HeaderField {
        column: "sei_porosity",
        probe: HeaderProbe::NumberAfter("SEI porosity at target electrode:"),
    },
    HeaderField {
        column: "sei_relative_permittivity",
        probe: HeaderProbe::NumberAfter("SEI relative permittivity at target electrode:"),
    },
];

const REPORT18_COLUMNS: &[&str] = report_columns![
    "m2", "c2", "be1", "be2", "be3", "be4", "be5", "be6", "be_sum", "dt1", "dt2", "dt3", "dt4",
    "dt5", "dt6", "dt_sum", "t_lambda",
];

pub static SCHEMAS: &[ReportSchema] = &[
    ReportSchema {
        number: 1,
        columns: report_columns![
            "m2", "c2", "c2_eff_trans", "wt_fr_salt", "mole_fr_salt", "density", "visc", "sig1",
            "sig2", "s_plus", "rational_act_coeff", "diff_coeff", "spec_cond", "t_plus_a",
            "t_plus_b", "dissoc_si", "dissoc_ti",
        ],
        header_fields: &[],
        scrub: &[],
    },
    ReportSchema {
        number: 2,
        columns: report_columns![
            "m2", "c2", "cmeff", "alphanet", "cation", "anion", "ip", "ti", "fcip", "gamma", "y",
            "y_bar", "osmotic_coeff_molal", "osmotic_coeff_molar", "solvent_activity", "kip",
            "kti", "ksol", "adj_solvent_activity", "adj_phi", "adj_gamma", "fvpd",
        ],
        header_fields: &[],
        scrub: &[],
    },
    ReportSchema {
        number: 3,
        columns: report_columns![
            "m", "c", "gfe_cation", "gfe_anion", "se_cation", "se_anion", "rp_solution",
            "rp_solvent", "alpha1", "alpha3", "energy_sum", "energy_ave", "desolve_t",
        ],
        header_fields: &[],
        scrub: &["*DNC*", "/"],
    },
    ReportSchema {
        number: 4,
        columns: report_columns![
            "m2", "c2", "volsoft", "fcomp", "fsolv", "fdiff12", "d_plus", "d_minus",
            "d_minus_bare", "dnernst", "dapp", "d_ip", "d_ti", "d_solvent",
            "thermodynamic_factor",
        ],
        header_fields: &[],
        scrub: &[],
    },
    ReportSchema {
        number: 5,
        columns: report_columns![
            "m2", "c2", "c2_pseudo", "density", "visc", "rational_act_coef_y",
            "diffusion_coeff", "specific_conductivity", "t_plus", "t_minus", "fhop_plus",
            "fhop_minus", "pos_atm", "walden_log_1_over_visc", "walden_log_cond",
            "walden_product", "thermal_conductivity",
        ],
        header_fields: &[],
        scrub: &[],
    },
    ReportSchema {
        number: 6,
        columns: report_columns![
            "salt_molality", "one_over_visc", "k_t_plus", "diffusivity_bulk_elec",
            "li_step_full", "li_step_solv", "kip", "kti", "ksolv", "solvent_activity", "gamma",
        ],
        header_fields: &[],
        scrub: &[],
    },
    ReportSchema {
        number: 10,
        columns: report_columns![
            "surface_charge_density", "cell_voltage_at_start_of_pulse",
            "salt_concentration_basis", "pulse_type", "electrolyte_rel_perm_at_salt_conc",
            "dipole_moment_data", "solvent_diameter", "equivalent_charge_on_solvent_dipole",
            "sei_thickness", "sei_porosity", "sei_relative_permittivity", "r",
            "eff_surface_ch_density_at_r", "solution_rel_perm_electrolyte_plus_sch",
            "ave_r_solution_rel_perm_electrolyte_plus_sch", "electric_field_per_sch",
            "repulsive_energy_sch_to_dipole", "cell_voltage",
        ],
        header_fields: REPORT10_HEADER,
        scrub: &[],
    },
    ReportSchema {
        number: 11,
        columns: report_columns![
            "m2", "c2", "cation_eff_dia", "anion_eff_dia", "s_plus_th", "s_minus_th",
            "solvent_avail_thermo", "solvent_avail_msa_hs", "solvent_be_to_cation",
            "solvent_be_to_anion", "communal_solvation_factor", "debye_relaxation_time",
            "fraction_of_free_liquid_in_solvent",
        ],
        header_fields: &[],
        scrub: &[],
    },
    ReportSchema {
        number: 12,
        columns: report_columns![
            "m2", "c2", "cation_solvent_one", "cation_solvent_two", "cation_solvent_three",
            "cation_solvent_four", "cation_solvent_five", "anion_solvent_one",
            "anion_solvent_two", "anion_solvent_three", "anion_solvent_four",
            "anion_solvent_five",
        ],
        header_fields: &[],
        scrub: &[],
    },
    ReportSchema {
        number: 13,
        columns: report_columns![
            "m2", "c2", "cation_factor_one", "cation_factor_two", "cation_factor_three",
            "cation_factor_four", "cation_factor_five", "cation_factor_six",
            "cation_factor_seven", "anion_factor_one", "anion_factor_two", "anion_factor_three",
            "anion_factor_four", "anion_factor_five", "anion_factor_six", "anion_factor_seven",
        ],
        header_fields: &[],
        scrub: &[],
    },
    ReportSchema {
        number: 14,
        columns: report_columns![
            "m2", "c2", "full_li_step_parameter", "partial_li_step_parameter",
        ],
        header_fields: &[],
        scrub: &[],
    },
    ReportSchema {
        number: 15,
        columns: report_columns![
            "m2", "c2", "10_v1", "10_t1", "20_v1", "20_t1", "40_v1", "40_t1", "80_v1", "80_t1",
            "160_v1", "160_t1", "320_v1", "320_t1", "vsolv", "tsolv",
        ],
        header_fields: &[],
        scrub: &[],
    },
    ReportSchema {
        number: 16,
        columns: report_columns![
            "m2", "c2", "surface_tension", "surface_ten_viscosity", "0.02_micron",
            "0.05_micron", "0.1_micron", "0.2_micron", "0.5_micron", "1_micron", "2_micron",
            "5_micron", "10_micron", "20_micron",
        ],
        header_fields: &[],
        scrub: &[],
    },
    ReportSchema {
        number: 17,
        columns: report_columns![
            "time_s", "0.02_micron", "0.05_micron", "0.1_micron", "0.2_micron", "0.5_micron",
            "1_micron", "2_micron", "5_micron", "10_micron", "20_micron",
        ],
        header_fields: &[],
        scrub: &[],
    },
    ReportSchema {
        number: 18,
        columns: REPORT18_COLUMNS,
        header_fields: &[],
        scrub: &[],
    },
    ReportSchema {
        number: 19,
        columns: REPORT18_COLUMNS,
        header_fields: &[],
        scrub: &[],
    },
    ReportSchema {
        number: 20,
        columns: report_columns![
            "m2_bulk", "m2_non_cs", "m2_cs", "y_free", "y_non_cs", "y_cs", "cs_factor",
            "n_s_plus_bulk", "n_s_plus_cs", "n_s_plus_ave", "be_plus_bulk", "be_plus_cs",
            "be_plus_ave", "n_s_cs_0", "n_s_cs_ave", "n_s_non_cs",
            "ratio_of_n_solv_cs_to_m2_cs",
        ],
        header_fields: &[],
        scrub: &[],
    },
];

pub fn schema_for(number: u8) -> Option<&'static ReportSchema> {
    SCHEMAS.iter().find(|schema| schema.number == number)
}

/// One cell of a parsed report row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportValue {
    Number(f64),
    Text(String),
}

impl ReportValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(_) => None,
        }
    }
}

impl Display for ReportValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(value) => f.write_str(&format_cue_float(*value)),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// A parsed report: every data row across all sections, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub schema: &'static ReportSchema,
    pub source: PathBuf,
    pub sections: usize,
    pub rows: Vec<Vec<ReportValue>>,
}

impl ReportTable {
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &ReportValue>> {
        let index = self.schema.columns.iter().position(|column| *column == name)?;
        Some(self.rows.iter().map(move |row| &row[index]))
    }

    pub fn records(&self) -> impl Iterator<Item = RowRecord<'_>> {
        self.rows.iter().map(|values| RowRecord {
            columns: self.schema.columns,
            values,
        })
    }
}

/// A row serialized as an object whose keys follow the column order.
#[derive(Debug, Clone, Copy)]
pub struct RowRecord<'a> {
    columns: &'static [&'static str],
    values: &'a [ReportValue],
}

impl Serialize for RowRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(self.values) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}
