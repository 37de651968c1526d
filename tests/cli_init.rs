mod common;

use common::TestProject;
use predicates::prelude::*;

#[test]
fn init_creates_config() {
    let project = TestProject::new();

    project
        .command()
        .arg("init")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized spindle"));

    assert!(project.path().join(".spindle/config.toml").exists());
}

#[test]
fn init_twice_is_idempotent() {
    let project = TestProject::new();
    project.init();

    project
        .command()
        .arg("init")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("already initialized"));
}

#[test]
fn clear_disable_removes_config() {
    let project = TestProject::new();
    project.init();
    assert!(project.path().join(".spindle/config.toml").exists());

    project
        .command()
        .args(["clear", "--disable"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("disabled"));

    assert!(!project.path().join(".spindle").exists());

    // Back to the not-initialized state
    project
        .command()
        .arg("status")
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("not initialized"));
}

#[test]
fn init_json_output() {
    let project = TestProject::new();

    let json = TestProject::json_output(
        project.command().args(["--json", "init"]).arg(project.path()),
    );
    assert_eq!(json["status"], "initialized");
    assert!(json["config_path"]
        .as_str()
        .unwrap()
        .ends_with("config.toml"));
}
