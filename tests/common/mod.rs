use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// A temporary workspace with an isolated data directory for CLI tests.
pub struct TestProject {
    pub dir: TempDir,
    pub data_dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create workspace dir"),
            data_dir: TempDir::new().expect("failed to create data dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A spindle command with the isolated data directory preconfigured.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(Self::spindle_bin());
        cmd.env("SPINDLE_DATA_DIR", self.data_dir.path());
        cmd
    }

    /// Path to the spindle binary built by cargo.
    pub fn spindle_bin() -> PathBuf {
        PathBuf::from(env!("CARGO_BIN_EXE_spindle"))
    }

    /// Write a file relative to the workspace root, creating parent dirs.
    pub fn write_file(&self, relative_path: &str, content: &str) {
        let full = self.dir.path().join(relative_path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        std::fs::write(&full, content).expect("failed to write file");
    }

    /// The two-file login scenario: a definition and a call site.
    pub fn write_login_fixtures(&self) {
        self.write_file(
            "a.ts",
            r#"export function login(user: string, password: string): boolean {
    return user.length > 0 && password.length > 0;
}
"#,
        );
        self.write_file(
            "b.ts",
            r#"import { login } from "./a";

const ok = login("admin", "secret");
"#,
        );
    }

    /// Sample Rust sources for multi-language tests.
    pub fn write_rust_fixtures(&self) {
        self.write_file(
            "src/calc.rs",
            r#"/// Adds two numbers together.
pub fn add(a: i32, b: i32) -> i32 {
    a + b
}

pub struct Calculator {
    pub value: f64,
}

impl Calculator {
    pub fn accumulate(&mut self, n: f64) {
        self.value += n;
    }
}
"#,
        );
    }

    /// A vendored file used by exclude-pattern tests.
    pub fn write_vendor_fixtures(&self) {
        self.write_file(
            "vendor/third_party.ts",
            "export function vendoredHelper(): void {}\n",
        );
    }

    /// Initialize spindle in this workspace.
    pub fn init(&self) {
        self.command()
            .arg("init")
            .arg(self.path())
            .assert()
            .success();
    }

    /// Build the index for this workspace.
    pub fn index(&self) {
        self.command()
            .arg("index")
            .arg(self.path())
            .assert()
            .success();
    }

    /// Parse a command's stdout as JSON.
    pub fn json_output(cmd: &mut Command) -> serde_json::Value {
        let output = cmd.assert().success().get_output().stdout.clone();
        serde_json::from_slice(&output).expect("stdout is not valid JSON")
    }
}

/// An initialized workspace with the login fixtures written.
pub fn init_login_project() -> TestProject {
    let project = TestProject::new();
    project.write_login_fixtures();
    project.init();
    project
}
