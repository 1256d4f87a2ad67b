//! Shared test infrastructure for integration tests.
#![allow(dead_code)]

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tagguard::paths::ProjectPaths;
use tagguard::policy::{default_policy, PolicyConfig};
use tempfile::TempDir;

/// Throwaway project root with an optional `.tagguard/policy.json`.
pub struct TestProject {
    _dir: TempDir,
    pub paths: ProjectPaths,
}

impl TestProject {
    /// Empty project with no policy (validation disabled).
    pub fn bare() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let root = std::fs::canonicalize(dir.path()).expect("canonicalize temp dir");
        Self {
            _dir: dir,
            paths: ProjectPaths::new(root),
        }
    }

    /// Project opted in with the default policy.
    pub fn with_default_policy() -> Self {
        let project = Self::bare();
        project.write_policy(&default_policy());
        project
    }

    pub fn root(&self) -> &Path {
        self.paths.root()
    }

    pub fn write_policy(&self, policy: &PolicyConfig) {
        let text = serde_json::to_string_pretty(policy).expect("serialize policy");
        self.write(".tagguard/policy.json", &text);
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.root().join(rel);
        std::fs::create_dir_all(path.parent().expect("parent dir")).expect("create parent");
        std::fs::write(&path, contents).expect("write file");
        path
    }

    pub fn read_json(&self, path: &Path) -> Value {
        let text = std::fs::read_to_string(path)
            .unwrap_or_else(|err| panic!("read {}: {err}", path.display()));
        serde_json::from_str(&text).expect("parse json")
    }

    /// Run the `tagguard` binary against this project.
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_tagguard"))
            .arg("--root")
            .arg(self.root())
            .args(args)
            .env("TAGGUARD_ACTOR", "integration")
            .env_remove("TAGGUARD_LOG")
            .output()
            .expect("run tagguard")
    }
}

/// Parse stdout of a `--json` invocation.
pub fn stdout_json(output: &Output) -> Value {
    let text = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&text).unwrap_or_else(|err| panic!("parse stdout as json: {err}\n{text}"))
}
