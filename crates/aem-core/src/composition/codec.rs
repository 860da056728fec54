use super::{
    Amounts, CompositionId, CompositionResult, SaltComposition, SolventComposition, invalid,
};
use crate::serialization::{format_cue_float, round_to_decimals};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_SOLVENT_PRECISION: u32 = 100;
pub const DEFAULT_SALT_DECIMALS: u32 = 2;

const BLOCK_DELIMITER: char = '|';
const ENTRY_DELIMITER: char = '_';

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedComposition {
    pub solvents: SolventComposition,
    pub salts: SaltComposition,
    pub solvent_precision: u32,
    pub salt_decimals: u32,
}

pub fn normalize_solvents(raw: &Amounts, precision: u32) -> CompositionResult<SolventComposition> {
    if precision == 0 {
        return Err(invalid("solvent precision must be at least 1"));
    }
    if raw.is_empty() {
        return Err(invalid("solvent amounts are empty"));
    }
    for (name, amount) in raw {
        if !amount.is_finite() || *amount < 0.0 {
            return Err(invalid(format!(
                "solvent '{name}' has amount {amount}; amounts must be finite and non-negative"
            )));
        }
    }

    let total: f64 = raw.values().sum();
    if total <= 0.0 {
        return Err(invalid(format!("solvent amounts {raw:?} sum to zero")));
    }

    let weights: BTreeMap<String, u32> = raw
        .iter()
        .map(|(name, amount)| {
            let weight = (amount / total * f64::from(precision)).round() as u32;
            (name.clone(), weight)
        })
        .filter(|(_, weight)| *weight > 0)
        .collect();

    if weights.is_empty() {
        return Err(invalid(format!(
            "every solvent in {raw:?} rounds to zero at precision {precision}"
        )));
    }
    Ok(SolventComposition::from_map(weights))
}

pub fn normalize_salts(raw: &Amounts, decimals: u32) -> CompositionResult<SaltComposition> {
    let mut molalities = BTreeMap::new();
    for (name, amount) in raw {
        if !amount.is_finite() || *amount < 0.0 {
            return Err(invalid(format!(
                "salt '{name}' has amount {amount}; amounts must be finite and non-negative"
            )));
        }
        let rounded = round_to_decimals(*amount, decimals);
        if rounded != 0.0 {
            molalities.insert(name.clone(), rounded);
        }
    }
    Ok(SaltComposition::from_map(molalities))
}

pub fn encode(
    solvents: &Amounts,
    salts: &Amounts,
    precision: u32,
    decimals: u32,
) -> CompositionResult<CompositionId> {
    check_names("solvent", solvents)?;
    check_names("salt", salts)?;
    let solvents = normalize_solvents(solvents, precision)?;
    let salts = normalize_salts(salts, decimals)?;
    Ok(render_identifier(&solvents, &salts))
}

pub(crate) fn check_names(kind: &str, amounts: &Amounts) -> CompositionResult<()> {
    for name in amounts.keys() {
        if name.is_empty() {
            return Err(invalid(format!("{kind} name must not be empty")));
        }
        if name.contains([BLOCK_DELIMITER, ENTRY_DELIMITER]) {
            return Err(invalid(format!(
                "{kind} name '{name}' contains a reserved delimiter ('{BLOCK_DELIMITER}' or '{ENTRY_DELIMITER}')"
            )));
        }
    }
    Ok(())
}

pub(crate) fn render_identifier(
    solvents: &SolventComposition,
    salts: &SaltComposition,
) -> CompositionId {
    let entry = ENTRY_DELIMITER.to_string();
    let mut blocks = vec![
        solvents.names().collect::<Vec<_>>().join(&entry),
        solvents
            .iter()
            .map(|(_, weight)| weight.to_string())
            .collect::<Vec<_>>()
            .join(&entry),
    ];
    if !salts.is_empty() {
        blocks.push(salts.names().collect::<Vec<_>>().join(&entry));
        blocks.push(
            salts
                .iter()
                .map(|(_, molality)| format_cue_float(molality))
                .collect::<Vec<_>>()
                .join(&entry),
        );
    }
    CompositionId::from_rendered(blocks.join(&BLOCK_DELIMITER.to_string()))
}

pub fn decode(identifier: &str) -> CompositionResult<DecodedComposition> {
    let segments: Vec<&str> = identifier.split(BLOCK_DELIMITER).collect();
    if segments.len() != 2 && segments.len() != 4 {
        return Err(invalid(format!(
            "identifier '{identifier}' has {} segments; expected 2 (solvents) or 4 (solvents and salts)",
            segments.len()
        )));
    }

    let names: Vec<&str> = segments[0].split(ENTRY_DELIMITER).collect();
    let weights: Vec<&str> = segments[1].split(ENTRY_DELIMITER).collect();
    if names.len() != weights.len() {
        return Err(invalid(format!(
            "identifier '{identifier}' lists {} solvents but {} weights",
            names.len(),
            weights.len()
        )));
    }
    for weight in &weights {
        if weight.is_empty() || !weight.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(invalid(format!(
                "solvent weight '{weight}' in '{identifier}' is not an unsigned integer"
            )));
        }
        if weight.bytes().all(|byte| byte == b'0') {
            return Err(invalid(format!(
                "identifier '{identifier}' carries a zero solvent weight"
            )));
        }
    }
    let solvent_precision = infer_solvent_precision(&weights)?;

    // Weights are kept exactly as written; the identifier already states them.
    let mut solvent_weights = BTreeMap::new();
    for (name, weight) in names.iter().zip(&weights) {
        let value: u32 = weight.parse().map_err(|_| {
            invalid(format!(
                "solvent weight '{weight}' in '{identifier}' is out of range"
            ))
        })?;
        if name.is_empty() {
            return Err(invalid(format!(
                "identifier '{identifier}' has an empty solvent name"
            )));
        }
        if solvent_weights.insert(name.to_string(), value).is_some() {
            return Err(invalid(format!(
                "identifier '{identifier}' lists solvent '{name}' twice"
            )));
        }
    }
    let solvents = SolventComposition::from_map(solvent_weights);

    let salt_decimals = DEFAULT_SALT_DECIMALS;
    let salts = if segments.len() == 4 {
        let salt_names: Vec<&str> = segments[2].split(ENTRY_DELIMITER).collect();
        let molalities: Vec<&str> = segments[3].split(ENTRY_DELIMITER).collect();
        if salt_names.len() != molalities.len() {
            return Err(invalid(format!(
                "identifier '{identifier}' lists {} salts but {} molalities",
                salt_names.len(),
                molalities.len()
            )));
        }
        let mut raw_salts = Amounts::new();
        for (name, molality) in salt_names.iter().zip(&molalities) {
            let value: f64 = molality.parse().map_err(|_| {
                invalid(format!(
                    "salt molality '{molality}' in '{identifier}' is not a number"
                ))
            })?;
            insert_unique(&mut raw_salts, "salt", identifier, name, value)?;
        }
        normalize_salts(&raw_salts, salt_decimals)?
    } else {
        SaltComposition::default()
    };

    Ok(DecodedComposition {
        solvents,
        salts,
        solvent_precision,
        salt_decimals,
    })
}

fn insert_unique(
    target: &mut Amounts,
    kind: &str,
    identifier: &str,
    name: &str,
    value: f64,
) -> CompositionResult<()> {
    if name.is_empty() {
        return Err(invalid(format!(
            "identifier '{identifier}' has an empty {kind} name"
        )));
    }
    if target.insert(name.to_string(), value).is_some() {
        return Err(invalid(format!(
            "identifier '{identifier}' lists {kind} '{name}' twice"
        )));
    }
    Ok(())
}

/// Solvent precision implied by the weight tokens of an identifier.
///
/// Identifiers carry no explicit precision; it is read back as `10^digits`
/// of the weight tokens, which therefore must all have the same length.
/// This only round-trips identifiers whose normalized weights share a digit
/// count, which holds for the two-component percentages seen in practice.
pub fn infer_solvent_precision(weights: &[&str]) -> CompositionResult<u32> {
    let lengths: BTreeSet<usize> = weights.iter().map(|weight| weight.len()).collect();
    let mut iter = lengths.iter();
    match (iter.next(), iter.next()) {
        (Some(&digits), None) if digits > 0 => u32::try_from(digits)
            .ok()
            .and_then(|digits| 10_u32.checked_pow(digits))
            .ok_or_else(|| invalid(format!("solvent weights {weights:?} are too long"))),
        (None, _) | (Some(_), None) => Err(invalid("identifier has no solvent weights")),
        _ => Err(invalid(format!(
            "solvent weights {weights:?} mix digit lengths {:?}; all weights must share one precision",
            lengths.iter().collect::<Vec<_>>()
        ))),
    }
}
