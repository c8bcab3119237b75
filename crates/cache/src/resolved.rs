//! The result of resolving a single module through the bundler, including
//! its fallback shape when the bundler itself could not be reached.

use std::collections::HashMap;

/// A module version as pinned for a session, plus whatever peer dependency
/// map the bundler reported for it.
///
/// `error` is set when the bundler fetch failed but the CDN mirror confirmed
/// a prebuilt bundle exists anyway (see the dependency engine's error
/// fallback) — the pin is still usable, just unverified against the
/// bundler's own metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDependency {
    pub name: String,
    pub version: String,
    pub dependencies: Option<HashMap<String, String>>,
    pub error: Option<String>,
}

impl ResolvedDependency {
    pub fn resolved(name: impl Into<String>, version: impl Into<String>, dependencies: HashMap<String, String>) -> Self {
        Self { name: name.into(), version: version.into(), dependencies: Some(dependencies), error: None }
    }

    pub fn fallback(name: impl Into<String>, version: impl Into<String>, error: impl Into<String>) -> Self {
        Self { name: name.into(), version: version.into(), dependencies: None, error: Some(error.into()) }
    }
}

/// The memoization key for a module fetch: pinned versions are cached
/// per-version, unpinned ones collapse onto a shared `latest` entry.
pub fn fetch_key(name: &str, version: Option<&str>) -> String {
    format!("{name}-{}", version.unwrap_or("latest"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_key_distinguishes_pinned_versions() {
        assert_eq!(fetch_key("lodash", Some("4.17.0")), "lodash-4.17.0");
        assert_eq!(fetch_key("lodash", None), "lodash-latest");
    }
}
