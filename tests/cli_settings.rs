mod common;

use common::TestProject;
use predicates::prelude::*;

#[test]
fn settings_show_defaults() {
    let project = TestProject::new();
    project.init();

    let json = TestProject::json_output(
        project
            .command()
            .args(["--json", "settings"])
            .arg(project.path()),
    );
    assert_eq!(json["status"], "unchanged");
    assert_eq!(json["include_tests"], true);
    assert_eq!(json["auto_index_on_startup"], false);
    assert!(!json["exclude_paths"].as_array().unwrap().is_empty());
}

#[test]
fn settings_exclude_then_refresh_drops_symbols() {
    let project = common::init_login_project();
    project.write_vendor_fixtures();
    project.index();

    let before = TestProject::json_output(
        project
            .command()
            .args(["--json", "status"])
            .arg(project.path()),
    );
    assert_eq!(before["stats"]["files_count"], 3);
    let symbols_before = before["stats"]["symbols_count"].as_u64().unwrap();

    project
        .command()
        .args(["settings", "--exclude", "vendor"])
        .arg(project.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Settings updated"));

    project.index();

    let after = TestProject::json_output(
        project
            .command()
            .args(["--json", "status"])
            .arg(project.path()),
    );
    assert_eq!(after["stats"]["files_count"], 2);
    assert!(after["stats"]["symbols_count"].as_u64().unwrap() < symbols_before);
}

#[test]
fn settings_include_tests_flag() {
    let project = common::init_login_project();
    project.write_file(
        "tests/login_test.ts",
        "export function checkLogin(): void {}\n",
    );

    project
        .command()
        .args(["settings", "--include-tests", "false"])
        .arg(project.path())
        .assert()
        .success();
    project.index();

    let excluded = TestProject::json_output(
        project
            .command()
            .args(["--json", "status"])
            .arg(project.path()),
    );
    assert_eq!(excluded["stats"]["files_count"], 2);

    project
        .command()
        .args(["settings", "--include-tests", "true"])
        .arg(project.path())
        .assert()
        .success();
    project.index();

    let included = TestProject::json_output(
        project
            .command()
            .args(["--json", "status"])
            .arg(project.path()),
    );
    assert_eq!(included["stats"]["files_count"], 3);
}

#[test]
fn settings_persist_to_config_file() {
    let project = TestProject::new();
    project.init();

    project
        .command()
        .args(["settings", "--exclude", "generated", "--auto-index", "true"])
        .arg(project.path())
        .assert()
        .success();

    let config = std::fs::read_to_string(project.path().join(".spindle/config.toml")).unwrap();
    assert!(config.contains("generated"));
    assert!(config.contains("auto_index_on_startup = true"));
}
