use super::codec::{check_names, decode, normalize_salts, normalize_solvents};
use super::{Amounts, Composition, CompositionResult, Provenance, SolutionDose, invalid};
use crate::registry::SaltPropertyTable;
use std::collections::BTreeSet;
use tracing::debug;

/// Solvent basis, in grams, that solver molalities refer to.
const SOLVENT_BASIS_GRAMS: f64 = 1000.0;
const MILLILITRES_PER_LITRE: f64 = 1000.0;

/// Builds a composition from weighed solvent and salt masses in grams.
pub fn derive_by_mass(
    solvent_masses: &Amounts,
    salt_masses: &Amounts,
    precision: u32,
    decimals: u32,
) -> CompositionResult<Composition> {
    check_names("solvent", solvent_masses)?;
    check_names("salt", salt_masses)?;

    let total_solvent_mass: f64 = solvent_masses.values().sum();
    if !(total_solvent_mass > 0.0) {
        return Err(invalid(format!(
            "solvent masses {solvent_masses:?} must sum to a positive mass"
        )));
    }

    let fractions: Amounts = solvent_masses
        .iter()
        .map(|(name, mass)| (name.clone(), mass / total_solvent_mass))
        .collect();
    let solvent_kilograms = total_solvent_mass / SOLVENT_BASIS_GRAMS;
    let molalities: Amounts = salt_masses
        .iter()
        .map(|(name, mass)| (name.clone(), mass / solvent_kilograms))
        .collect();

    let solvents = normalize_solvents(&fractions, precision)?;
    let salts = normalize_salts(&molalities, decimals)?;
    Ok(Composition::assemble(
        solvents,
        salts,
        precision,
        decimals,
        Provenance::ByMass {
            solvents: solvent_masses.clone(),
            salts: salt_masses.clone(),
        },
    ))
}

pub fn derive_by_mass_fraction_and_molality(
    solvent_fractions: &Amounts,
    salt_molalities: &Amounts,
    precision: u32,
    decimals: u32,
) -> CompositionResult<Composition> {
    check_names("solvent", solvent_fractions)?;
    check_names("salt", salt_molalities)?;
    let solvents = normalize_solvents(solvent_fractions, precision)?;
    let salts = normalize_salts(salt_molalities, decimals)?;
    Ok(Composition::assemble(
        solvents,
        salts,
        precision,
        decimals,
        Provenance::ByMassFractionAndMolality {
            solvents: solvent_fractions.clone(),
            salts: salt_molalities.clone(),
        },
    ))
}

/// Blends existing solutions, each given by identifier, volume (mL) and
/// density (g/mL), into one composition.
///
/// Each dose's salt mass fraction is taken against the 1000 g solvent basis of
/// its molalities. The blended molality divides accumulated salt moles by the
/// accumulated solvent mass in kilograms, so a single dose reproduces its own
/// molalities.
pub fn derive_by_solution_volume(
    volumes: &Amounts,
    densities: &Amounts,
    salt_properties: &SaltPropertyTable,
    precision: u32,
    decimals: u32,
) -> CompositionResult<Composition> {
    let volume_keys: BTreeSet<&String> = volumes.keys().collect();
    let density_keys: BTreeSet<&String> = densities.keys().collect();
    if volume_keys.is_empty() {
        return Err(invalid("no solutions were given to blend"));
    }
    if volume_keys != density_keys {
        return Err(invalid(format!(
            "volumes name {volume_keys:?} but densities name {density_keys:?}; both must list the same solutions"
        )));
    }

    let mut solvent_masses = Amounts::new();
    let mut salt_moles = Amounts::new();
    let mut doses = Vec::with_capacity(volumes.len());

    for (identifier, volume) in volumes {
        let density = densities.get(identifier).copied().unwrap_or(f64::NAN);
        if !(volume.is_finite() && *volume >= 0.0 && density.is_finite() && density > 0.0) {
            return Err(invalid(format!(
                "solution '{identifier}' needs a non-negative volume and positive density, got {volume} mL at {density} g/mL"
            )));
        }
        let decoded = decode(identifier)?;
        let dose_mass = volume / MILLILITRES_PER_LITRE * density;

        let mut salt_mass = 0.0;
        for (salt, molality) in decoded.salts.iter() {
            salt_mass += salt_properties.molar_mass(salt)? * molality;
        }
        let salt_mass_fraction = salt_mass / (salt_mass + SOLVENT_BASIS_GRAMS);
        let dose_solvent_mass = (1.0 - salt_mass_fraction) * dose_mass;
        debug!(
            identifier = identifier.as_str(),
            dose_mass, dose_solvent_mass, "accumulating solution dose"
        );

        // Written weights need not fill the inferred precision ("EC|100").
        let dose_weight: f64 = decoded
            .solvents
            .iter()
            .map(|(_, weight)| f64::from(weight))
            .sum();
        for (solvent, weight) in decoded.solvents.iter() {
            *solvent_masses.entry(solvent.to_string()).or_default() +=
                dose_solvent_mass * f64::from(weight) / dose_weight;
        }
        for (salt, molality) in decoded.salts.iter() {
            *salt_moles.entry(salt.to_string()).or_default() +=
                molality * dose_solvent_mass / SOLVENT_BASIS_GRAMS;
        }
        doses.push(SolutionDose {
            identifier: identifier.clone(),
            volume: *volume,
            density,
        });
    }

    let total_solvent_mass: f64 = solvent_masses.values().sum();
    if !(total_solvent_mass > 0.0) {
        return Err(invalid("blended solutions contain no solvent mass"));
    }
    let solvent_kilograms = total_solvent_mass / SOLVENT_BASIS_GRAMS;
    let molalities: Amounts = salt_moles
        .into_iter()
        .map(|(salt, moles)| (salt, moles / solvent_kilograms))
        .collect();

    let solvents = normalize_solvents(&solvent_masses, precision)?;
    let salts = normalize_salts(&molalities, decimals)?;
    Ok(Composition::assemble(
        solvents,
        salts,
        precision,
        decimals,
        Provenance::BySolutionVolume { doses },
    ))
}
