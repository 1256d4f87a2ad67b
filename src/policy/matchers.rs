//! Compiled glob matchers for eligibility filtering.
use super::PolicyConfig;
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Compile a list of globs, skipping (and logging) any invalid pattern.
pub fn compile_globs(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(err) => tracing::warn!(%pattern, error = %err, "skipping invalid glob"),
        }
    }
    builder.build().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "glob set failed to build; matching nothing");
        GlobSet::empty()
    })
}

/// Decides which changed paths the engine considers at all.
#[derive(Debug, Clone)]
pub struct PathFilter {
    eligible: Option<GlobSet>,
    excluded: GlobSet,
}

impl PathFilter {
    pub fn new(policy: &PolicyConfig) -> Self {
        let eligible = if policy.eligible.is_empty() {
            None
        } else {
            Some(compile_globs(&policy.eligible))
        };
        Self {
            eligible,
            excluded: compile_globs(&policy.excluded),
        }
    }

    /// True when `rel_path` matches an eligible glob and no excluded glob.
    pub fn is_eligible(&self, rel_path: &str) -> bool {
        if self.excluded.is_match(rel_path) {
            return false;
        }
        match &self.eligible {
            Some(set) => set.is_match(rel_path),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::default_policy;

    #[test]
    fn eligibility_honors_excludes_and_empty_eligible() {
        let mut policy = default_policy();
        let filter = PathFilter::new(&policy);
        assert!(filter.is_eligible("src/auth/login.py"));
        assert!(!filter.is_eligible(".tagguard/specs/SPEC-AUTH-001/spec.md"));

        policy.eligible = vec!["src/**".to_string(), "[invalid".to_string()];
        policy.excluded = vec!["src/generated/**".to_string()];
        let filter = PathFilter::new(&policy);
        assert!(filter.is_eligible("src/auth/login.py"));
        assert!(!filter.is_eligible("src/generated/api.rs"));
        assert!(!filter.is_eligible("docs/readme.md"));
    }
}
