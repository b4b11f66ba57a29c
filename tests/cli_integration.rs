//! CLI surface smoke tests.
//!
//! These drive the `gantry` binary itself. Provisioning against a real
//! container runtime is out of reach here; these tests cover the
//! read-only surfaces and plan preview against local-path repos.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn write_project(dir: &Path, specs_json: &str) {
    std::fs::create_dir_all(dir.join(".gantry")).unwrap();
    std::fs::write(dir.join(".gantry/specs.json"), specs_json).unwrap();
}

/// A global config pinning the state root into a temp dir, so tests
/// never touch the user's real `~/.gantry`.
fn write_state_config(dir: &Path) -> std::path::PathBuf {
    let config_path = dir.join("config.toml");
    std::fs::write(
        &config_path,
        format!("state_root = {:?}\n", dir.join("state")),
    )
    .unwrap();
    config_path
}

fn gantry(state_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("gantry").unwrap();
    cmd.env("GANTRY_CONFIG", write_state_config(state_dir));
    cmd
}

#[test]
fn help_lists_commands() {
    Command::cargo_bin("gantry")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("provision"))
        .stdout(predicate::str::contains("repos"));
}

#[test]
fn completion_generates_bash_script() {
    Command::cargo_bin("gantry")
        .unwrap()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gantry"));
}

#[test]
fn resolve_previews_plan_in_dependency_order() {
    let project = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    write_project(
        project.path(),
        r#"{
            "libs": [
                {"name": "base", "repo": {"locator": "/repos/base"}, "mount": "/libs/base",
                 "install": ["make base"]},
                {"name": "top", "repo": {"locator": "/repos/top"}, "mount": "/libs/top",
                 "install": ["make top"], "depends": ["base"]}
            ],
            "apps": [
                {"name": "web", "libs": ["top"], "always": ["./run"]}
            ]
        }"#,
    );

    let output = gantry(state.path())
        .args(["resolve", "web"])
        .arg("--project")
        .arg(project.path())
        .assert()
        .success();

    let stdout = String::from_utf8(output.get_output().stdout.clone()).unwrap();
    let base = stdout.find("Sync base").expect("base sync step shown");
    let top = stdout.find("Sync top").expect("top sync step shown");
    assert!(base < top, "base must be planned before top");
    assert!(stdout.contains("always-commands"));
}

#[test]
fn resolve_unknown_app_fails_with_known_names() {
    let project = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    write_project(
        project.path(),
        r#"{"libs": [], "apps": [{"name": "web", "libs": []}]}"#,
    );

    gantry(state.path())
        .args(["resolve", "ghost"])
        .arg("--project")
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown app"))
        .stderr(predicate::str::contains("web"));
}

#[test]
fn resolve_reports_cycles() {
    let project = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    write_project(
        project.path(),
        r#"{
            "libs": [
                {"name": "a", "repo": {"locator": "/repos/a"}, "mount": "/libs/a",
                 "depends": ["b"]},
                {"name": "b", "repo": {"locator": "/repos/b"}, "mount": "/libs/b",
                 "depends": ["a"]}
            ],
            "apps": [{"name": "web", "libs": ["a"]}]
        }"#,
    );

    gantry(state.path())
        .args(["resolve", "web"])
        .arg("--project")
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("cyclic"));
}

#[test]
fn missing_spec_document_is_a_clear_error() {
    let project = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();

    gantry(state.path())
        .args(["resolve", "web"])
        .arg("--project")
        .arg(project.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no spec document"));
}

#[test]
fn assets_set_list_unset_cycle() {
    let project = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    let source = state.path().join("cert.pem");
    std::fs::write(&source, "pem bytes").unwrap();

    gantry(state.path())
        .args(["assets", "set", "tls-cert"])
        .arg(&source)
        .arg("--project")
        .arg(project.path())
        .assert()
        .success();

    gantry(state.path())
        .args(["assets", "list"])
        .arg("--project")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("tls-cert"));

    gantry(state.path())
        .args(["assets", "unset", "tls-cert"])
        .arg("--project")
        .arg(project.path())
        .assert()
        .success();

    gantry(state.path())
        .args(["assets", "list"])
        .arg("--project")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("tls-cert").not());
}

#[test]
fn repos_lists_unsynced_libs() {
    let project = tempfile::tempdir().unwrap();
    let state = tempfile::tempdir().unwrap();
    write_project(
        project.path(),
        r#"{
            "libs": [
                {"name": "base", "repo": {"locator": "git@example.com:org/base.git"},
                 "mount": "/libs/base"}
            ],
            "apps": []
        }"#,
    );

    gantry(state.path())
        .args(["repos"])
        .arg("--project")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("base"))
        .stdout(predicate::str::contains("unsynced"));
}
