use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_aem-rs"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("aem-rs should launch")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn core_fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../aem-core/tests/fixtures")
}

fn write_translate_config(dir: &Path, solver_home: &Path, program: &str) -> PathBuf {
    let fixtures = core_fixtures();
    let config = serde_json::json!({
        "solver": {
            "home": solver_home,
            "program": program,
            "capability": "accc_aware"
        },
        "registry": {
            "solvent_codes": fixtures.join("solvent_codes.csv"),
            "salt_codes": fixtures.join("salt_codes.csv"),
            "salt_properties": fixtures.join("salt_properties.csv")
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
            "saltconc": 1.5
        },
        "output": { "directory": "runs", "run_name": "Scenario" }
    });
    let path = dir.join("run.json");
    fs::write(&path, config.to_string()).expect("config should be written");
    path
}

const SCENARIO_CUES: [&str; 23] = [
    "1", "1", "3", "31", "13", "12", "25", "50", "25", "1", "1", "1", "5", "-20", "60", "10", "1",
    "90", "50", "1.5", "0", "0", "0",
];

#[test]
fn help_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("encode"));
}

#[test]
fn encode_prints_the_identifier() {
    let output = run_cli(&[
        "encode",
        "--solvent",
        "EMC=0.7",
        "--solvent",
        "EC=0.3",
        "--salt",
        "LiPF6=1",
    ]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "EC_EMC|30_70|LiPF6|1.0");
}

#[test]
fn encode_by_mass_divides_salt_grams_by_solvent_kilograms() {
    let output = run_cli(&[
        "encode",
        "--basis",
        "mass",
        "--solvent",
        "EC=300",
        "--solvent",
        "EMC=700",
        "--salt",
        "LiPF6=1.5",
    ]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "EC_EMC|30_70|LiPF6|1.5");
}

#[test]
fn missing_solvents_are_a_usage_error() {
    let output = run_cli(&["encode", "--salt", "LiPF6=1"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = stderr(&output);
    assert!(stderr.contains("ERROR: [INPUT.CLI_USAGE]"));
    assert!(stderr.contains("FATAL EXIT CODE: 2"));
}

#[test]
fn duplicate_components_are_rejected() {
    let output = run_cli(&["encode", "--solvent", "EC=1", "--solvent", "EC=2"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("'EC' was given more than once"));
}

#[test]
fn decode_prints_json() {
    let output = run_cli(&["decode", "EC_EMC|30_70|LiPF6|1.0"]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let decoded: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("decode output should be JSON");
    assert_eq!(decoded["solvents"]["EC"], 30);
    assert_eq!(decoded["solvents"]["EMC"], 70);
    assert_eq!(decoded["salts"]["LiPF6"], 1.0);
    assert_eq!(decoded["solvent_precision"], 100);
    assert_eq!(decoded["salt_decimals"], 2);
}

#[test]
fn decode_help_shows_the_identifier_layout() {
    let output = run_cli(&["decode", "--help"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("EC_EMC|30_70|LiPF6|1.0"));
}

#[test]
fn decode_keeps_weights_that_do_not_fill_the_precision() {
    let output = run_cli(&["decode", "A_B_C|50_25_24"]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let decoded: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("decode output should be JSON");
    assert_eq!(decoded["solvents"]["A"], 50);
    assert_eq!(decoded["solvents"]["B"], 25);
    assert_eq!(decoded["solvents"]["C"], 24);
}

#[test]
fn invalid_identifiers_exit_with_input_category() {
    let output = run_cli(&["decode", "A_B|5_50"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("[INPUT.INVALID_COMPOSITION]"));
}

#[test]
fn cues_json_lists_the_stdin_sequence_and_writes_the_script() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = write_translate_config(temp.path(), temp.path(), "aem_accc.exe");
    let script = temp.path().join("cues.txt");

    let output = run_cli(&[
        "cues",
        "--config",
        config.to_str().expect("utf-8 path"),
        "--json",
        "--script",
        script.to_str().expect("utf-8 path"),
    ]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));

    let document: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("cues output should be JSON");
    assert_eq!(document["capability"], "accc_aware");
    assert!(document["composition_id"].is_null());
    let cues: Vec<&str> = document["cues"]
        .as_array()
        .expect("cues should be an array")
        .iter()
        .map(|cue| cue.as_str().expect("cue should be a string"))
        .collect();
    assert_eq!(cues, SCENARIO_CUES);
    assert_eq!(document["labels"]["Solvent 1 Code (EP)"], 31);

    let written = fs::read_to_string(&script).expect("script should be written");
    assert_eq!(written, format!("{}\n\n", SCENARIO_CUES.join("\n")));
    assert!(!temp.path().join("runs").exists());
}

#[test]
fn cues_prints_labelled_lines_by_default() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config = write_translate_config(temp.path(), temp.path(), "aem_accc.exe");

    let output = run_cli(&["cues", "--config", config.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let lines: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(lines.len(), SCENARIO_CUES.len());
    assert!(lines.contains(&"Salt 1 Code (LiPF6): 1".to_string()));
    assert_eq!(lines.last().map(String::as_str), Some("End of Input: 0"));
}

#[test]
fn missing_config_is_an_io_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let missing = temp.path().join("absent.json");
    let output = run_cli(&["cues", "--config", missing.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("[IO.RUN_CONFIG_READ]"));
}

#[test]
fn convert_exports_selected_format_and_skips_empty_reports() {
    let temp = TempDir::new().expect("tempdir should be created");
    let reports = core_fixtures().join("reports");
    let output = run_cli(&[
        "convert",
        reports.to_str().expect("utf-8 path"),
        "--format",
        "json",
        "--output",
        temp.path().to_str().expect("utf-8 path"),
    ]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Converted 2 file(s), skipped 1."));
    assert!(temp.path().join("json/Report01.json").is_file());
    assert!(temp.path().join("json/Report03.json").is_file());
    assert!(!temp.path().join("csv").exists());

    let transport: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(temp.path().join("json/Report01.json")).expect("json should exist"),
    )
    .expect("export should be JSON");
    assert!(transport[0]["sig1"].is_null());
}

#[test]
fn log_file_receives_plain_text_events() {
    let temp = TempDir::new().expect("tempdir should be created");
    let log = temp.path().join("aem.log");
    let reports = core_fixtures().join("reports");
    let output = run_cli(&[
        "-v",
        "--log-file",
        log.to_str().expect("utf-8 path"),
        "convert",
        reports.to_str().expect("utf-8 path"),
        "--output",
        temp.path().to_str().expect("utf-8 path"),
    ]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let text = fs::read_to_string(&log).expect("log file should exist");
    assert!(text.contains("WARN"), "log: {text}");
    assert!(!text.contains('\u{1b}'));
}

#[cfg(unix)]
#[test]
fn run_feeds_the_solver_and_collects_reports() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().expect("tempdir should be created");
    let home = temp.path().join("solver");
    fs::create_dir_all(&home).expect("solver home should be created");
    let solver = home.join("fake_aem.sh");
    fs::write(&solver, "#!/bin/sh\ncat > received.txt\nexit 0\n").expect("solver should be written");
    fs::set_permissions(&solver, fs::Permissions::from_mode(0o755))
        .expect("solver should be executable");
    fs::copy(
        core_fixtures().join("reports/Report01 -- Transport.txt"),
        home.join("Report01 -- Transport.txt"),
    )
    .expect("report should be staged");
    fs::write(home.join("ReadMe.txt"), "not a report").expect("noise should be written");

    let config = write_translate_config(temp.path(), &home, "fake_aem.sh");
    let output = run_cli(&["run", "--config", config.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let stdout = stdout(&output);
    assert!(stdout.contains("Solver exit code: 0"));
    assert!(stdout.contains("Reports copied: 1"));

    let run_dir = fs::read_dir(temp.path().join("runs"))
        .expect("runs directory should exist")
        .map(|entry| entry.expect("entry should be readable").path())
        .find(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("Scenario_"))
        })
        .expect("run directory should be created");

    let sent = fs::read_to_string(run_dir.join("cues.txt")).expect("cues should be saved");
    let received = fs::read_to_string(home.join("received.txt")).expect("solver should read stdin");
    assert_eq!(sent, received);

    let log: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(run_dir.join("run_log.json")).expect("run log should exist"),
    )
    .expect("run log should be JSON");
    assert_eq!(log["capability"], "accc_aware");
    assert_eq!(log["solver_exit_code"], 0);

    assert!(run_dir.join("Reports/Report01 -- Transport.txt").is_file());
    assert!(!run_dir.join("Reports/ReadMe.txt").exists());
    assert!(run_dir.join("csv/Report01.csv").is_file());
    assert!(run_dir.join("json/Report01.json").is_file());
}
