//! CLI smoke tests for the `dossier` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const JANE_DOE: &str = r#"
meta:
  report_id: CLI-2024-001
  classification: SECRET
  tlp: AMBER
  author: Field Officer
  date: "2024-01-31"
target:
  name: Jane Doe
  dob: "1990-01-15"
  nationality: Testland
  status: Active
summary: "Last seen in ||Berlin||"
"#;

const INVALID: &str = r#"{"meta": {"classification": "SECRET"}}"#;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = format!(
            "[database]\npath = {:?}\n\n[paths]\noutput_dir = {:?}\nprocessed_images_dir = {:?}\n",
            dir.path().join("dossier.db"),
            dir.path().join("output"),
            dir.path().join("output/images"),
        );
        std::fs::write(dir.path().join("dossier.toml"), config).unwrap();
        std::fs::write(dir.path().join("jane.yaml"), JANE_DOE).unwrap();
        std::fs::write(dir.path().join("invalid.json"), INVALID).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("dossier").expect("dossier binary should exist");
        cmd.env("DOSSIER_CONFIG", self.path("dossier.toml"))
            .env("DOSSIER_LOG", "off")
            .env_remove("RUST_LOG")
            .env_remove("DOSSIER_DB_PATH")
            .env_remove("DOSSIER_PDF_ENCRYPT")
            .env_remove("DOSSIER_OUTPUT_DIR");
        cmd
    }
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("stdout is JSON")
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn help_lists_commands() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("inspect-image"));
}

#[test]
fn unknown_command_fails() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("nonexistent-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn validate_reports_errors_with_exit_code() {
    let ws = Workspace::new();
    let out = ws
        .cmd()
        .args(["validate", arg(&ws.path("invalid.json"))])
        .assert()
        .code(11)
        .get_output()
        .stdout
        .clone();
    let result = stdout_json(&out);
    assert_eq!(result["is_valid"], Value::Bool(false));
    assert!(!result["errors"].as_array().unwrap().is_empty());
}

#[test]
fn generate_then_query() {
    let ws = Workspace::new();
    let out = ws
        .cmd()
        .args(["generate", arg(&ws.path("jane.yaml")), "--no-encrypt"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report = stdout_json(&out);
    assert_eq!(report["report_id"], "CLI-2024-001");
    assert_eq!(report["redaction_stats"]["total_redactions"], 1);
    assert_eq!(report["persistence"], "created");
    assert!(ws.path("output/CLI-2024-001.pdf").exists());

    let out = ws
        .cmd()
        .args(["get", "CLI-2024-001", "--versions"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let fetched = stdout_json(&out);
    assert_eq!(fetched["report"]["version"], 1);
    assert_eq!(fetched["versions"].as_array().unwrap().len(), 1);

    ws.cmd()
        .args(["search", "berlin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CLI-2024-001"));

    let out = ws.cmd().arg("stats").assert().success().get_output().stdout.clone();
    assert_eq!(stdout_json(&out)["total_reports"], 1);

    ws.cmd()
        .args(["snapshot", "CLI-2024-001", "--summary", "reviewed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"version\": 2"));
}

#[test]
fn get_missing_report_is_not_found() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["get", "NOPE"])
        .assert()
        .code(12)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn generate_invalid_document_fails_validation() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["generate", arg(&ws.path("invalid.json")), "--no-persist"])
        .assert()
        .code(11)
        .stdout(predicate::str::contains("\"stage\": \"validation\""));
}

#[test]
fn batch_reports_partial_failure() {
    let ws = Workspace::new();
    let out = ws
        .cmd()
        .args([
            "batch",
            arg(&ws.path("jane.yaml")),
            arg(&ws.path("invalid.json")),
            "--no-persist",
            "--output-dir",
            arg(&ws.path("batch")),
        ])
        .assert()
        .code(3)
        .get_output()
        .stdout
        .clone();
    let result = stdout_json(&out);
    assert_eq!(result["total"], 2);
    assert_eq!(result["successful"], 1);
    assert!(ws.path("batch/jane.pdf").exists());
}
