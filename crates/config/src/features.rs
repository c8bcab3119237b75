//! SDK version to capability flag table (component C1).
//!
//! The core never branches on an SDK version string directly; it asks
//! [`supports`] instead. The table below is the sole place that knowledge
//! lives.

use std::cmp::Ordering;
use std::sync::LazyLock;

/// A capability the core may or may not exercise for a given SDK version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Publish `{diff, s3url}` per file instead of a single flat `code` string.
    MultipleFiles,
    /// Run the dependency engine (scan, pin, inject) over user code.
    ArbitraryImports,
}

/// Minimum SDK version (inclusive) at which each feature became available.
static MINIMUM_VERSION: LazyLock<[(Feature, Version); 2]> = LazyLock::new(|| {
    [
        (Feature::MultipleFiles, Version::new(31, 0, 0)),
        (Feature::ArbitraryImports, Version::new(33, 0, 0)),
    ]
});

/// Returns `true` if `sdk_version` is new enough to support `feature`.
/// An unparsable version string is treated as unsupported for every feature,
/// since we can't prove otherwise.
pub fn supports(sdk_version: &str, feature: Feature) -> bool {
    let Some(version) = Version::parse(sdk_version) else { return false };
    MINIMUM_VERSION.iter().find(|(f, _)| *f == feature).is_some_and(|(_, minimum)| version >= *minimum)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Version {
    major: u32,
    minor: u32,
    patch: u32,
}

impl Version {
    const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next().unwrap_or("0").parse().ok()?;
        let patch = parts.next().unwrap_or("0").parse().ok()?;
        Some(Self { major, minor, patch })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("31.0.0", Feature::MultipleFiles, true)]
    #[case("30.9.9", Feature::MultipleFiles, false)]
    #[case("33.0.0", Feature::ArbitraryImports, true)]
    #[case("32.0.0", Feature::ArbitraryImports, false)]
    #[case("not-a-version", Feature::MultipleFiles, false)]
    #[case("40", Feature::MultipleFiles, true)]
    fn feature_table_matches_expected(#[case] version: &str, #[case] feature: Feature, #[case] expected: bool) {
        assert_eq!(supports(version, feature), expected);
    }
}
