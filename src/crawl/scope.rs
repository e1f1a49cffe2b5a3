//! Scope policy
//!
//! Decides whether a host belongs to the crawl target.

use serde::{Deserialize, Serialize};

/// How a candidate host is matched against the target host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopePolicy {
    /// Plain string suffix match. `sub.example.com` is in scope for
    /// `example.com`, and so is `evil-example.com`.
    #[default]
    Suffix,
    /// Exact host or a dot-separated subdomain of it.
    Subdomain,
}

impl ScopePolicy {
    /// Test `candidate_host` against `base_host`. Comparison ignores ASCII case.
    pub fn in_scope(self, base_host: &str, candidate_host: &str) -> bool {
        let base = base_host.to_ascii_lowercase();
        let candidate = candidate_host.to_ascii_lowercase();

        match self {
            ScopePolicy::Suffix => candidate.ends_with(&base),
            ScopePolicy::Subdomain => {
                candidate == base
                    || candidate
                        .strip_suffix(&base)
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
        }
    }
}

/// Suffix-policy scope test.
pub fn in_scope(base_host: &str, candidate_host: &str) -> bool {
    ScopePolicy::Suffix.in_scope(base_host, candidate_host)
}
