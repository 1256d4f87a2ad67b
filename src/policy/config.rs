//! Policy loading.
//!
//! A missing policy means the project has not opted in: the engine performs
//! no validation at all for that invocation.
use super::PolicyConfig;
use crate::paths::ProjectPaths;
use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;

/// Build the policy used for any field the policy file omits.
pub fn default_policy() -> PolicyConfig {
    PolicyConfig::default()
}

/// Load `.tagguard/policy.json`, returning `None` when the file is absent.
pub fn load_policy(paths: &ProjectPaths) -> Result<Option<PolicyConfig>> {
    let path = paths.policy_path();
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("read policy {}", path.display()));
        }
    };
    let policy: PolicyConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse policy JSON {}", path.display()))?;
    Ok(Some(policy))
}

/// Load the policy, collapsing unreadable or malformed files into "no policy".
pub fn load_policy_or_none(paths: &ProjectPaths) -> Option<PolicyConfig> {
    match load_policy(paths) {
        Ok(policy) => policy,
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "ignoring unusable policy");
            None
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
