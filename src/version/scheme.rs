// src/version/scheme.rs

//! Pluggable version comparison
//!
//! A dependency set carries the scheme its versions are compared with. RPM
//! packages use [`RpmScheme`]; [`SemverScheme`] serves capability names that
//! follow semantic versioning (e.g. `crate(serde) >= 1.0.0-beta.1`).

use super::{compare_with, vercmp, EpochPolicy, Evr};
use std::cmp::Ordering;
use std::fmt::Debug;

/// A version ordering used by dependency comparison
pub trait VersionScheme: Debug + Send + Sync {
    /// Short name for diagnostics
    fn name(&self) -> &'static str;

    /// Compare two EVRs
    fn compare(&self, a: &Evr, b: &Evr, policy: EpochPolicy) -> Ordering;
}

/// Native rpm segmented comparison
#[derive(Debug, Clone, Copy, Default)]
pub struct RpmScheme;

impl VersionScheme for RpmScheme {
    fn name(&self) -> &'static str {
        "rpm"
    }

    fn compare(&self, a: &Evr, b: &Evr, policy: EpochPolicy) -> Ordering {
        compare_with(a, b, policy, vercmp)
    }
}

/// Semantic version precedence
///
/// Versions that are not valid semver fall back to the rpm segment rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemverScheme;

impl SemverScheme {
    fn compare_strings(a: &str, b: &str) -> Ordering {
        match (semver::Version::parse(a), semver::Version::parse(b)) {
            (Ok(x), Ok(y)) => x.cmp_precedence(&y),
            _ => vercmp(a, b),
        }
    }
}

impl VersionScheme for SemverScheme {
    fn name(&self) -> &'static str {
        "semver"
    }

    /// The release is glued back onto the version, since a semver
    /// pre-release (`1.0.0-rc.1`) splits at the dash like an rpm release.
    fn compare(&self, a: &Evr, b: &Evr, policy: EpochPolicy) -> Ordering {
        let joined = |evr: &Evr| Evr {
            epoch: evr.epoch,
            version: match evr.release {
                Some(ref r) => format!("{}-{}", evr.version, r),
                None => evr.version.clone(),
            },
            release: None,
        };
        compare_with(&joined(a), &joined(b), policy, Self::compare_strings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpm_scheme_matches_evr_compare() {
        let a = Evr::parse("1.2-1");
        let b = Evr::parse("1.10-1");
        assert_eq!(RpmScheme.compare(&a, &b, EpochPolicy::Skip), Ordering::Less);
    }

    #[test]
    fn test_semver_prerelease_precedence() {
        let a = Evr::parse("1.0.0-alpha");
        let b = Evr::new(None, "1.0.0", None);
        assert_eq!(SemverScheme.compare(&a, &b, EpochPolicy::Skip), Ordering::Less);
    }

    #[test]
    fn test_semver_ignores_build_metadata() {
        let a = Evr::new(None, "1.0.0+build5", None);
        let b = Evr::new(None, "1.0.0", None);
        assert_eq!(SemverScheme.compare(&a, &b, EpochPolicy::Skip), Ordering::Equal);
    }

    #[test]
    fn test_semver_falls_back_to_rpm() {
        let a = Evr::new(None, "1.10", None);
        let b = Evr::new(None, "1.9", None);
        assert_eq!(SemverScheme.compare(&a, &b, EpochPolicy::Skip), Ordering::Greater);
    }

    #[test]
    fn test_scheme_names() {
        assert_eq!(RpmScheme.name(), "rpm");
        assert_eq!(SemverScheme.name(), "semver");
    }
}
