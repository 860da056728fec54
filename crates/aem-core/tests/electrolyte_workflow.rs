use aem_core::composition::{
    Amounts, Composition, CompositionError, decode, derive_by_mass, derive_by_solution_volume,
    encode,
};
use aem_core::cues::{CueValue, build_cues};
use aem_core::domain::{AemError, ExportFormat, SolverCapability};
use aem_core::registry::{Registry, RegistryPaths};
use aem_core::reports::{ReportValue, convert_reports, discover_reports, parse_report_file};
use aem_core::run::{RunConfig, plan};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn registry_paths() -> RegistryPaths {
    RegistryPaths {
        solvent_codes: fixtures().join("solvent_codes.csv"),
        salt_codes: fixtures().join("salt_codes.csv"),
        salt_properties: Some(fixtures().join("salt_properties.csv")),
    }
}

fn amounts(entries: &[(&str, f64)]) -> Amounts {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), *value))
        .collect()
}

#[test]
fn encode_sorts_names_and_rounds_molality() {
    let identifier = encode(
        &amounts(&[("EMC", 0.7), ("EC", 0.3)]),
        &amounts(&[("LiPF6", 1.0)]),
        100,
        2,
    )
    .expect("composition should encode");
    assert_eq!(identifier.as_str(), "EC_EMC|30_70|LiPF6|1.0");
    assert_eq!(identifier.compact_name(), "ECEMC3070LiPF61.0");
}

#[test]
fn decode_reports_inferred_precision_and_default_decimals() {
    let decoded = decode("EC_EMC|30_70|LiPF6|1.0").expect("identifier should decode");
    assert_eq!(decoded.solvents.get("EC"), Some(30));
    assert_eq!(decoded.solvents.get("EMC"), Some(70));
    assert_eq!(decoded.salts.get("LiPF6"), Some(1.0));
    assert_eq!(decoded.solvent_precision, 100);
    assert_eq!(decoded.salt_decimals, 2);
}

#[test]
fn mixed_width_weights_do_not_decode() {
    assert!(matches!(
        decode("A_B|5_50"),
        Err(CompositionError::InvalidComposition(_))
    ));
}

#[test]
fn mass_derivation_reports_molality_per_kilogram() {
    let composition = derive_by_mass(
        &amounts(&[("EMC", 70.0), ("EC", 30.0)]),
        &amounts(&[("LiPF6", 10.5)]),
        100,
        2,
    )
    .expect("masses should derive");
    assert_eq!(composition.identifier().as_str(), "EC_EMC|30_70|LiPF6|105.0");
}

#[test]
fn registry_tables_load_from_csv_files() {
    let registry = Registry::load(&registry_paths()).expect("registry should load");
    assert_eq!(registry.solvent("TMP").expect("TMP should exist").code, 52);
    assert_eq!(registry.salt("LiTFSI").expect("LiTFSI should exist").code, 7);
    assert_eq!(
        registry.salt_properties.molar_mass("LiPF6").expect("molar mass"),
        151.905
    );

    let composition =
        Composition::from_identifier("EC_EMC|30_70|LiPF6|1.0").expect("identifier should decode");
    let description = registry.describe(&composition).expect("components are registered");
    let json = serde_json::to_value(&description).expect("description should serialize");
    assert_eq!(json["solvents"][1]["name"], "EMC");
    assert_eq!(json["salts"][0]["category"], "lithium");
}

#[test]
fn blending_one_solution_keeps_its_identifier() {
    let registry = Registry::load(&registry_paths()).expect("registry should load");
    let identifier = "EC_EMC|30_70|LiPF6|1.2";
    let composition = derive_by_solution_volume(
        &amounts(&[(identifier, 25.0)]),
        &amounts(&[(identifier, 1.21)]),
        &registry.salt_properties,
        100,
        2,
    )
    .expect("single dose should blend");
    assert_eq!(composition.identifier().as_str(), identifier);
}

#[test]
fn translated_config_produces_the_documented_fixed_sequence() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = serde_json::json!({
        "solver": { "home": temp.path(), "program": "aem_accc.exe" },
        "registry": registry_paths(),
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
            "saltconc": 1.5
        }
    });
    let path = temp.path().join("run.json");
    fs::write(&path, config.to_string()).expect("config should be written");

    let config = RunConfig::load(&path).expect("config should load");
    let plan = plan(&config).expect("plan should build");
    let rendered: Vec<String> = plan.cues.values().iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        [
            "1", "1", "3", "31", "13", "12", "25", "50", "25", "1", "1", "1", "5", "-20", "60",
            "10", "1", "90", "50", "1.5", "0", "0", "0"
        ]
    );
    assert!(plan.composition.is_none());
}

#[test]
fn matrix_identifier_marks_the_constant_mass_fraction_solvent() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = serde_json::json!({
        "solver": { "home": temp.path(), "program": "aem.exe", "capability": "accc_aware" },
        "registry": registry_paths(),
        "composition": { "basis": "identifier", "identifier": "BN_MP_PC_TMP|25_25_25_25|LiPF6_LiTFSI|0.5_0.5" },
        "parameters": {
            "solvent_composition": 2,
            "cmf_option": 1,
            "cmf_solvent_index": 3,
            "salt_composition": 1,
            "salt_concentration_mode": 1,
            "total_salt_concentration": 2,
            "min_temperature": 0,
            "max_temperature": 40,
            "temperature_step": 20,
            "triple_ion_stability": 2,
            "contact_angle": 90,
            "pore_length": 50,
            "salt_concentration": 1.0
        }
    });
    let config: RunConfig = serde_json::from_value(config).expect("config should parse");
    let registry = Registry::load(&config.registry).expect("registry should load");
    let plan = plan(&config).expect("plan should build");
    assert_eq!(plan.capability, SolverCapability::AcccAware);

    let (cues, _) = build_cues(&plan.specification, &registry, plan.capability)
        .expect("cues should rebuild");
    assert_eq!(cues, plan.cues);
    let marked: Vec<&CueValue> = plan
        .labels
        .iter()
        .filter(|(label, _)| label.contains("CMF Indicator"))
        .map(|(_, value)| value)
        .collect();
    assert_eq!(
        marked,
        [
            &CueValue::Integer(0),
            &CueValue::Integer(0),
            &CueValue::Integer(0),
            &CueValue::Integer(1)
        ]
    );
    assert_eq!(
        plan.labels.get("Solvent 4 CMF Proportion (TMP)"),
        Some(&CueValue::Integer(25))
    );
}

#[test]
fn basic_solver_rejects_dual_salt_runs_with_an_input_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = serde_json::json!({
        "solver": { "home": temp.path(), "program": "aem.exe" },
        "registry": registry_paths(),
        "composition": { "basis": "identifier", "identifier": "EC_EMC|30_70|LiBF4_LiPF6|0.3_0.7" },
        "parameters": {
            "solvent_composition": 1,
            "proportion_basis": 2,
            "salt_composition": 1,
            "salt_concentration_mode": 2,
            "min_temperature": 0,
            "max_temperature": 40,
            "temperature_step": 20,
            "triple_ion_stability": 1,
            "contact_angle": 90,
            "pore_length": 50,
            "salt_concentration": 1.0
        }
    });
    let config: RunConfig = serde_json::from_value(config).expect("config should parse");
    let error = AemError::from(plan(&config).expect_err("basic solver takes one salt"));
    assert_eq!(error.placeholder(), "INPUT.CONFIGURATION");
    assert_eq!(error.exit_code(), 2);
}

#[test]
fn fixture_reports_parse_with_overflow_and_scrubbed_cells() {
    let reports = discover_reports(&fixtures().join("reports")).expect("reports should be listed");
    let numbers: Vec<u8> = reports.iter().map(|report| report.schema.number).collect();
    assert_eq!(numbers, [1, 3, 6]);

    let transport = parse_report_file(reports[0].schema, &reports[0].path)
        .expect("report 1 should parse")
        .expect("report 1 is not empty");
    assert_eq!(transport.rows.len(), 2);
    let sig1: Vec<&ReportValue> = transport.column("sig1").expect("sig1 column").collect();
    assert!(sig1[0].as_number().is_some_and(f64::is_nan));
    assert_eq!(sig1[1], &ReportValue::Number(4.5));

    let energies = parse_report_file(reports[1].schema, &reports[1].path)
        .expect("report 3 should parse")
        .expect("report 3 is not empty");
    assert_eq!(energies.rows.len(), 1);
    assert_eq!(energies.rows[0][1], ReportValue::Text("LiPF6 0.7|LiBF4 0.3".to_string()));
    assert_eq!(energies.rows[0][2], ReportValue::Number(-10.0));
    assert_eq!(energies.rows[0][15], ReportValue::Number(12.0));
}

#[test]
fn converting_fixture_reports_writes_one_file_per_report_and_format() {
    let temp = TempDir::new().expect("tempdir should be created");
    let summary = convert_reports(&fixtures().join("reports"), temp.path(), &[ExportFormat::Csv])
        .expect("conversion should succeed");

    assert_eq!(
        summary.written,
        [temp.path().join("csv/Report01.csv"), temp.path().join("csv/Report03.csv")]
    );
    assert_eq!(summary.skipped.len(), 1);
    assert!(!temp.path().join("json").exists());

    let csv = fs::read_to_string(temp.path().join("csv/Report01.csv")).expect("csv should exist");
    let mut lines = csv.lines();
    assert!(
        lines
            .next()
            .is_some_and(|header| header.starts_with("solvent_comp,salt_comp,temperature,m2,c2,"))
    );
    assert_eq!(
        lines.next(),
        Some(
            "EC 0.3000|EMC 0.7000,LiPF6 1.000,25.0,0.1,0.1207,0.118,0.0148,0.0089,1.18,0.87,nan,2.91,3.1,0.78,2.1e-06,3.21,0.37,0.36,0.01,0.001"
        )
    );
}
