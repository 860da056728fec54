use super::{
    CueError, CueResult, CueSequence, CueWriter, LabelMap, RunSpecification, SaltCompositionMode,
    SaltConcentrationMode, SolventCompositionMode,
};
use crate::composition::Amount;
use crate::domain::SolverCapability;
use crate::registry::Registry;
use tracing::{debug, warn};

/// Added to each molality by the v1.0 prompt sequence.
const BASIC_SALT_OFFSET: f64 = 0.1;
const CMF_MARKER: u8 = 1;
const NON_CMF_MARKER: u8 = 0;
const END_OF_INPUT: u8 = 0;

struct ResolvedComponent<'a> {
    name: &'a str,
    code: u32,
    amount: Amount,
}

/// A specification with every registry code looked up.
struct ResolvedRun<'a> {
    specification: &'a RunSpecification,
    solvents: Vec<ResolvedComponent<'a>>,
    salts: Vec<ResolvedComponent<'a>>,
}

impl<'a> ResolvedRun<'a> {
    fn resolve(
        specification: &'a RunSpecification,
        registry: &Registry,
        capability: SolverCapability,
    ) -> CueResult<Self> {
        if capability == SolverCapability::Basic {
            check_basic_support(specification)?;
        }

        let mut solvents = Vec::with_capacity(specification.total_solvents());
        for solvent in specification.electrolyte().solvents() {
            solvents.push(ResolvedComponent {
                name: &solvent.name,
                code: registry.solvent(&solvent.name)?.code,
                amount: solvent.amount,
            });
        }
        for class in &specification.accc().solvent_classes {
            for (member, proportion) in class.members().zip(&class.proportions) {
                solvents.push(ResolvedComponent {
                    name: member,
                    code: registry.solvent(member)?.code,
                    amount: *proportion,
                });
            }
        }

        let mut salts = Vec::with_capacity(specification.total_salts());
        for salt in specification
            .electrolyte()
            .salts()
            .iter()
            .chain(&specification.accc().salts)
        {
            salts.push(ResolvedComponent {
                name: &salt.name,
                code: registry.salt(&salt.name)?.code,
                amount: salt.amount,
            });
        }

        Ok(Self {
            specification,
            solvents,
            salts,
        })
    }
}

fn check_basic_support(specification: &RunSpecification) -> CueResult<()> {
    if !specification.is_fixed() {
        return Err(CueError::configuration(
            "solvent_composition",
            "matrix composition needs an ACCC-aware solver",
        ));
    }
    if specification.uses_accc() {
        return Err(CueError::configuration(
            "accc",
            "ACCC solvent classes and salts need an ACCC-aware solver",
        ));
    }
    if specification.total_salts() > 1 {
        return Err(CueError::configuration(
            "salts",
            "the basic solver prompts for a single salt",
        ));
    }
    Ok(())
}

/// Builds the stdin answers for `specification` in the prompt order of the
/// given solver capability.
///
/// All registry lookups and capability checks run before the first cue is
/// written, so an error never leaves a partial sequence behind.
pub fn build_cues(
    specification: &RunSpecification,
    registry: &Registry,
    capability: SolverCapability,
) -> CueResult<(CueSequence, LabelMap)> {
    let run = ResolvedRun::resolve(specification, registry, capability)?;

    let mut writer = CueWriter::default();
    match capability {
        SolverCapability::Basic => basic_schema(&run, &mut writer),
        SolverCapability::AcccAware => accc_aware_schema(&run, &mut writer),
    }
    writer.push("End of Input", END_OF_INPUT);

    let (cues, labels) = writer.finish();
    debug!(%capability, cues = cues.len(), "built cue sequence");
    Ok((cues, labels))
}

fn basic_schema(run: &ResolvedRun<'_>, writer: &mut CueWriter) {
    let parameters = run.specification.parameters();
    fixed_solvent_block(run, writer);

    writer.push("Number of Salts", run.salts.len());
    for (position, salt) in run.salts.iter().enumerate() {
        writer.push(salt_label(position, salt, "Code"), salt.code);
    }
    for (position, salt) in run.salts.iter().enumerate() {
        writer.push(
            salt_label(position, salt, "Molality + Offset"),
            salt.amount.as_f64() + BASIC_SALT_OFFSET,
        );
    }

    conditions_block(run, writer);
    writer.push("SCAEP Calculations", parameters.scaep.enabled);
    writer.push("Double Layer (DL) Calculations", parameters.double_layer.enabled);
}

fn accc_aware_schema(run: &ResolvedRun<'_>, writer: &mut CueWriter) {
    match run.specification.parameters().solvent_composition {
        SolventCompositionMode::Fixed => fixed_solvent_block(run, writer),
        SolventCompositionMode::Matrix => matrix_solvent_block(run, writer),
    }
    accc_block(run, writer);
    salt_block(run, writer);
    conditions_block(run, writer);
    scaep_block(run, writer);
    double_layer_block(run, writer);
}

fn fixed_solvent_block(run: &ResolvedRun<'_>, writer: &mut CueWriter) {
    let parameters = run.specification.parameters();
    writer.push("Solvent Composition", SolventCompositionMode::Fixed);
    if let Some(basis) = parameters.proportion_basis {
        writer.push("Solvent Composition Proportionality Basis", basis);
    }
    writer.push("Number of Solvents", run.solvents.len());
    for (position, solvent) in run.solvents.iter().enumerate() {
        writer.push(solvent_label(position, solvent, "Code"), solvent.code);
    }
    if run.solvents.len() > 1 {
        for (position, solvent) in run.solvents.iter().enumerate() {
            writer.push(solvent_label(position, solvent, "Proportion"), solvent.amount);
        }
    }
}

fn matrix_solvent_block(run: &ResolvedRun<'_>, writer: &mut CueWriter) {
    let parameters = run.specification.parameters();
    writer.push("Solvent Composition", SolventCompositionMode::Matrix);
    writer.push("Number of Solvents", run.solvents.len());

    let asks_for_cmf = run.solvents.len() > 2;
    if asks_for_cmf {
        writer.push(
            "Constant Mass Fraction (CMF) Option",
            parameters.cmf_option.unwrap_or_default(),
        );
    }

    let cmf_index = run.specification.cmf_index();
    for (position, solvent) in run.solvents.iter().enumerate() {
        writer.push(solvent_label(position, solvent, "Code"), solvent.code);
        if cmf_index.is_none() {
            continue;
        }
        if cmf_index == Some(position) {
            writer.push(solvent_label(position, solvent, "CMF Indicator"), CMF_MARKER);
            writer.push(solvent_label(position, solvent, "CMF Proportion"), solvent.amount);
        } else {
            writer.push(solvent_label(position, solvent, "CMF Indicator"), NON_CMF_MARKER);
        }
    }
}

fn accc_block(run: &ResolvedRun<'_>, writer: &mut CueWriter) {
    if !run.specification.uses_accc() {
        return;
    }
    writer.push(
        "Total Number of Salts (ACCC and Non-ACCC)",
        run.specification.total_salts(),
    );
    for (position, suffix) in run.specification.class_suffixes().iter().enumerate() {
        writer.push(
            format!("ACCC Solvent Class Suffix {}", position + 1),
            suffix.as_str(),
        );
    }
}

fn salt_block(run: &ResolvedRun<'_>, writer: &mut CueWriter) {
    let parameters = run.specification.parameters();
    writer.push("Number of Salts", run.salts.len());
    for (position, salt) in run.salts.iter().enumerate() {
        writer.push(salt_label(position, salt, "Code"), salt.code);
    }

    if run.salts.len() > 1 {
        let mode = parameters
            .salt_composition
            .unwrap_or(SaltCompositionMode::SingleFixed);
        writer.push("Salt Composition Proportion Mode", mode);
        if mode == SaltCompositionMode::SingleFixed {
            for (position, salt) in run.salts.iter().enumerate() {
                writer.push(salt_label(position, salt, "Proportion"), salt.amount);
            }
        }
    }

    writer.push("Salt Concentration Mode", parameters.salt_concentration_mode);
    if parameters.salt_concentration_mode == SaltConcentrationMode::Range {
        if let Some(total) = parameters.total_salt_concentration {
            writer.push("Maximum Total Salt Concentration", total);
        }
    }
}

fn conditions_block(run: &ResolvedRun<'_>, writer: &mut CueWriter) {
    let parameters = run.specification.parameters();
    writer.push("Minimum Temperature", parameters.min_temperature);
    writer.push("Maximum Temperature", parameters.max_temperature);
    writer.push("Temperature Step Size", parameters.temperature_step);
    writer.push("Method for Triple-Ion Stability", parameters.triple_ion_stability);
    writer.push("Contact Angle", parameters.contact_angle);
    writer.push("Pore Length", parameters.pore_length);
    writer.push("Salt Concentration of Interest", parameters.salt_concentration);
}

fn scaep_block(run: &ResolvedRun<'_>, writer: &mut CueWriter) {
    let scaep = &run.specification.parameters().scaep;
    writer.push(
        "Surface-Charge Attenuated Electrolyte Permittivity (SCAEP) Calculations",
        scaep.enabled,
    );
    if !scaep.enabled.is_on() {
        return;
    }
    if !run.specification.is_fixed() {
        warn!("SCAEP inputs are only sent for fixed composition runs; skipping them");
        return;
    }

    let entries = [
        ("SCAEP Cell Voltage", scaep.cell_voltage),
        ("SCAEP Bulk Salt Concentration", scaep.bulk_salt_concentration),
        ("SCAEP SEI Thickness", scaep.sei_thickness),
        ("SCAEP SEI Relative Permittivity", scaep.sei_permittivity),
        ("SCAEP SEI Porosity", scaep.sei_porosity),
    ];
    if let Some(pulse) = scaep.pulse_type {
        writer.push("SCAEP Pulse Type", pulse);
    }
    for (label, value) in entries {
        if let Some(value) = value {
            writer.push(label, value);
        }
    }
}

fn double_layer_block(run: &ResolvedRun<'_>, writer: &mut CueWriter) {
    let double_layer = &run.specification.parameters().double_layer;
    writer.push("Double Layer (DL) Calculations", double_layer.enabled);
    if !double_layer.enabled.is_on() {
        return;
    }
    if !run.specification.is_fixed() {
        warn!("double-layer inputs are only sent for fixed composition runs; skipping them");
        return;
    }

    let entries = [
        ("DL Pre-Pulse Salt Concentration", double_layer.prepulse_concentration),
        ("DL Current Density", double_layer.current_density),
        ("DL Temperature of Interest", double_layer.temperature),
    ];
    for (label, value) in entries {
        if let Some(value) = value {
            writer.push(label, value);
        }
    }
}

fn solvent_label(position: usize, solvent: &ResolvedComponent<'_>, field: &str) -> String {
    format!("Solvent {} {field} ({})", position + 1, solvent.name)
}

fn salt_label(position: usize, salt: &ResolvedComponent<'_>, field: &str) -> String {
    format!("Salt {} {field} ({})", position + 1, salt.name)
}
