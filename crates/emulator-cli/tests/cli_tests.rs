//! Integration tests for the emulator CLI
//!
//! These tests invoke the actual emulator-cli binary and verify:
//! - Exit codes (0 = success, 1 = failed step, 2 = error)
//! - stdout/stderr output
//! - JSON report format

use std::path::PathBuf;
use std::process::Command;

// ── Helpers ───────────────────────────────────────────────

fn emulator_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_emulator-cli"))
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn run_emulator(args: &[&str]) -> std::process::Output {
    Command::new(emulator_bin())
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .output()
        .expect("failed to execute emulator-cli")
}

fn run_json(script: &str) -> (Option<i32>, serde_json::Value) {
    let output = run_emulator(&["run", "--json", fixture(script).to_str().unwrap()]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("should be valid JSON");
    (output.status.code(), report)
}

// ── Version ───────────────────────────────────────────────

#[test]
fn test_version_command() {
    let output = run_emulator(&["version"]);
    assert!(output.status.success(), "version should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("emulator"), "should contain 'emulator'");
    assert!(
        stdout.contains(env!("CARGO_PKG_VERSION")),
        "should contain version"
    );
}

#[test]
fn test_version_flag() {
    let output = run_emulator(&["--version"]);
    assert!(output.status.success(), "--version should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

// ── Contracts ─────────────────────────────────────────────

#[test]
fn test_contracts_lists_builtins() {
    let output = run_emulator(&["contracts"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("emulator.contract.Get"));
    assert!(stdout.contains("emulator.contract.Put"));
    assert!(stdout.contains("emulator.contract.Scan"));
    assert!(stdout.contains("emulator.function.StateUpdater"));
}

#[test]
fn test_contracts_json_output() {
    let output = run_emulator(&["contracts", "--json"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("should be valid JSON");
    assert_eq!(
        json["contracts"],
        serde_json::json!([
            "emulator.contract.Get",
            "emulator.contract.Put",
            "emulator.contract.Scan"
        ])
    );
    assert_eq!(
        json["functions"],
        serde_json::json!(["emulator.function.StateUpdater"])
    );
}

// ── Run: success ──────────────────────────────────────────

#[test]
fn test_run_ledger_script() {
    let output = run_emulator(&["run", fixture("ledger.json").to_str().unwrap()]);
    assert!(output.status.success(), "ledger script should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("put X"), "should label steps");
    assert!(stdout.contains("is not in the ledger"));
    assert!(stdout.contains("6 step(s) passed"));
}

#[test]
fn test_run_ledger_script_json() {
    let (code, report) = run_json("ledger.json");
    assert_eq!(code, Some(0));

    let steps = report.as_array().expect("report should be an array");
    assert_eq!(steps.len(), 6);
    assert!(steps.iter().all(|step| step["ok"] == true));

    assert_eq!(steps[0]["output"], serde_json::Value::Null);
    assert_eq!(steps[3]["output"]["age"], 2);
    assert_eq!(steps[3]["output"]["data"]["balance"], 80);
    assert_eq!(steps[4]["output"]["result"], "failure");

    let scanned = steps[5]["output"]["data"].as_array().unwrap();
    assert_eq!(scanned.len(), 1);
    assert_eq!(scanned[0]["age"], 1);
}

#[test]
fn test_run_register_script() {
    let (code, report) = run_json("register.json");
    assert_eq!(code, Some(0));

    assert_eq!(
        report[1]["output"],
        serde_json::json!({"holder_id": "foo", "version": 3})
    );
    assert_eq!(report[3]["output"]["asset_id"], "X");
    assert_eq!(report[3]["output"]["data"]["balance"], 1);

    let contracts = report[4]["output"].as_array().unwrap();
    let ids: Vec<&str> = contracts
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["get", "put", "scan", "lookup"]);
    assert_eq!(contracts[3]["properties"]["owner"], "alice");
    assert_eq!(contracts[3]["digest"].as_str().unwrap().len(), 64);
}

#[test]
fn test_run_functions_script() {
    let (code, report) = run_json("functions.json");
    assert_eq!(code, Some(0));
    assert_eq!(report[1]["command"], "execute");
    assert_eq!(report[1]["ok"], true);
    assert_eq!(report[2]["output"]["age"], 0);
    assert_eq!(report[3]["command"], "database");
    assert_eq!(report[3]["output"], serde_json::json!({"state": 2}));
}

#[test]
fn test_run_database_script() {
    let (code, report) = run_json("database.json");
    assert_eq!(code, Some(1), "put without an object should fail");

    let steps = report.as_array().unwrap();
    assert_eq!(steps.len(), 5);
    assert_eq!(steps[0]["output"], serde_json::Value::Null);
    assert_eq!(steps[1]["output"], serde_json::json!({"balance": 5}));
    assert_eq!(steps[2]["output"], serde_json::json!({"balance": 5}));
    assert_eq!(steps[3]["output"], serde_json::Value::Null);
    assert_eq!(steps[4]["ok"], false);
    assert!(steps[4]["error"]
        .as_str()
        .unwrap()
        .contains("requires an object"));
}

#[test]
fn test_run_database_script_human() {
    let output = run_emulator(&["run", fixture("database.json").to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("database get app/balances/X"));
}

// ── Run: failures ─────────────────────────────────────────

#[test]
fn test_run_untransformable_contract() {
    let (code, report) = run_json("broken.json");
    assert_eq!(code, Some(1), "failing step should exit 1");

    let steps = report.as_array().unwrap();
    assert_eq!(steps.len(), 2, "run should stop at the failing step");
    assert_eq!(steps[0]["ok"], true);
    assert_eq!(steps[1]["ok"], false);
    assert!(steps[1]["error"]
        .as_str()
        .unwrap()
        .contains("could not materialize"));
}

#[test]
fn test_run_untransformable_contract_human() {
    let output = run_emulator(&["run", fixture("broken.json").to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"), "should mention error");
    assert!(stderr.contains("test.Broken"));
}

#[test]
fn test_run_missing_contract_file() {
    let (code, report) = run_json("missing-file.json");
    assert_eq!(code, Some(1));
    assert!(report[0]["error"]
        .as_str()
        .unwrap()
        .contains("could not register contract 'ghost'"));
}

#[test]
fn test_run_unregistered_contract() {
    let (code, report) = run_json("missing-contract.json");
    assert_eq!(code, Some(1));
    assert_eq!(report[0]["ok"], true);
    assert!(report[1]["error"]
        .as_str()
        .unwrap()
        .contains("'nonexistent' has not been registered"));
}

#[test]
fn test_run_malformed_script() {
    let output = run_emulator(&["run", fixture("malformed.json").to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2), "malformed script should exit 2");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to parse script"));
}

#[test]
fn test_run_nonexistent_script() {
    let output = run_emulator(&["run", "nonexistent.json"]);
    assert_eq!(output.status.code(), Some(2), "missing script should exit 2");
}

#[test]
fn test_run_requires_script_argument() {
    let output = run_emulator(&["run"]);
    assert!(!output.status.success());
}
