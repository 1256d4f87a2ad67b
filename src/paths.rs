//! Typed paths into a project's `.tagguard/` layout.
//!
//! Centralizing path construction keeps state access consistent across the
//! engine and the lifecycle commands.
use anyhow::{anyhow, Result};
use std::path::{Component, Path, PathBuf};

/// Directory (relative to the project root) holding policy, state, and stubs.
pub const TAGGUARD_DIR_REL: &str = ".tagguard";

/// Convenience wrapper for locating policy and state artifacts.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    root: PathBuf,
}

impl ProjectPaths {
    /// Create a new path helper rooted at the project root.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Return the project root used for path derivation.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the `.tagguard/` directory path.
    pub fn tagguard_dir(&self) -> PathBuf {
        self.root.join(TAGGUARD_DIR_REL)
    }

    /// Return the `.tagguard/policy.json` path.
    pub fn policy_path(&self) -> PathBuf {
        self.tagguard_dir().join("policy.json")
    }

    /// Return the `.tagguard/state/` directory path.
    pub fn state_dir(&self) -> PathBuf {
        self.tagguard_dir().join("state")
    }

    /// Return the `.tagguard/state/ledger.jsonl` path.
    pub fn ledger_path(&self) -> PathBuf {
        self.state_dir().join("ledger.jsonl")
    }

    /// Return the `.tagguard/state/index.json` path.
    pub fn index_path(&self) -> PathBuf {
        self.state_dir().join("index.json")
    }

    /// Return the `.tagguard/state/counters.json` path.
    pub fn counters_path(&self) -> PathBuf {
        self.state_dir().join("counters.json")
    }

    /// Return the `.tagguard/state/.lock` path.
    pub fn lock_path(&self) -> PathBuf {
        self.state_dir().join(".lock")
    }

    /// Return the `.tagguard/specs/` directory path.
    pub fn specs_dir(&self) -> PathBuf {
        self.tagguard_dir().join("specs")
    }

    /// Return the stub document path for a minted `(domain, sequence)` pair.
    pub fn spec_stub_path(&self, domain: &str, sequence: u64) -> PathBuf {
        self.specs_dir()
            .join(format!("SPEC-{domain}-{sequence:03}"))
            .join("spec.md")
    }

    /// Resolve a root-relative path declared in policy (templates, etc.).
    pub fn resolve_rel(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Normalize a changed-file path to the root-relative, `/`-separated form
    /// used for glob matching and primary-path bookkeeping.
    pub fn normalize_changed(&self, raw: &str) -> Result<String> {
        let path = Path::new(raw);
        let rel = if path.is_absolute() {
            path.strip_prefix(&self.root).map_err(|_| {
                anyhow!(
                    "{} is outside the project root {}",
                    path.display(),
                    self.root.display()
                )
            })?
        } else {
            path
        };
        let mut parts = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
                Component::CurDir => {}
                Component::ParentDir => {
                    if parts.pop().is_none() {
                        return Err(anyhow!("{raw} escapes the project root"));
                    }
                }
                Component::RootDir | Component::Prefix(_) => {}
            }
        }
        if parts.is_empty() {
            return Err(anyhow!("empty path {raw:?}"));
        }
        Ok(parts.join("/"))
    }

    /// Render a path under the root in root-relative form for ledger records.
    pub fn display_rel(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) => rel
                .components()
                .map(|component| component.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => path.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_changed_strips_root_and_dot_segments() {
        let paths = ProjectPaths::new(PathBuf::from("/work/project"));
        assert_eq!(
            paths
                .normalize_changed("/work/project/src/auth/login.py")
                .expect("absolute under root"),
            "src/auth/login.py"
        );
        assert_eq!(
            paths
                .normalize_changed("./src/../lib/a.rs")
                .expect("relative with dots"),
            "lib/a.rs"
        );
        assert!(paths.normalize_changed("/elsewhere/a.rs").is_err());
        assert!(paths.normalize_changed("../a.rs").is_err());
    }

    #[test]
    fn spec_stub_path_pads_sequence() {
        let paths = ProjectPaths::new(PathBuf::from("/p"));
        assert_eq!(
            paths.spec_stub_path("AUTH", 7),
            PathBuf::from("/p/.tagguard/specs/SPEC-AUTH-007/spec.md")
        );
        assert_eq!(
            paths.display_rel(&paths.spec_stub_path("AUTH", 1234)),
            ".tagguard/specs/SPEC-AUTH-1234/spec.md"
        );
    }
}
