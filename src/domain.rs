//! Path → domain code resolution.
use crate::policy::PolicyConfig;
use globset::{Glob, GlobMatcher};

/// Domain used when neither a mapping nor a path token applies.
pub const DEFAULT_DOMAIN: &str = "CORE";

/// Path segments that name a domain on their own.
const DOMAIN_VOCABULARY: [&str; 5] = ["AUTH", "USER", "PAY", "CORE", "DOCS"];

/// Uppercased domain code, or `None` unless it is non-empty and made only of
/// `A-Z` and `_`. Only such codes produce ids the topline scanner reads back.
pub fn canonical_domain(raw: &str) -> Option<String> {
    let domain = raw.trim().to_uppercase();
    let valid = !domain.is_empty()
        && domain
            .chars()
            .all(|c| c.is_ascii_uppercase() || c == '_');
    valid.then_some(domain)
}

/// Resolves a root-relative path to a domain code. Pure and infallible.
#[derive(Debug, Clone)]
pub struct DomainResolver {
    mappings: Vec<(GlobMatcher, String)>,
}

impl DomainResolver {
    pub fn new(policy: &PolicyConfig) -> Self {
        let mut mappings = Vec::new();
        for mapping in &policy.domains_map {
            if mapping.domain.trim().is_empty() {
                continue;
            }
            let Some(domain) = canonical_domain(&mapping.domain) else {
                tracing::warn!(
                    glob = %mapping.glob,
                    domain = %mapping.domain,
                    "skipping domain mapping; codes may only use A-Z and _"
                );
                continue;
            };
            match Glob::new(&mapping.glob) {
                Ok(glob) => mappings.push((glob.compile_matcher(), domain)),
                Err(err) => tracing::warn!(
                    glob = %mapping.glob,
                    error = %err,
                    "skipping invalid domain glob"
                ),
            }
        }
        Self { mappings }
    }

    pub fn resolve(&self, rel_path: &str) -> String {
        if let Some((_, domain)) = self
            .mappings
            .iter()
            .find(|(matcher, _)| matcher.is_match(rel_path))
        {
            return domain.clone();
        }
        rel_path
            .split(['/', '\\'])
            .find_map(|segment| {
                DOMAIN_VOCABULARY
                    .iter()
                    .find(|word| segment.eq_ignore_ascii_case(word))
            })
            .map(|word| word.to_string())
            .unwrap_or_else(|| DEFAULT_DOMAIN.to_string())
    }
}
