// src/version/mod.rs

//! Epoch:Version-Release handling
//!
//! An [`Evr`] is parsed from `[epoch:]version[-release]`. The epoch is split
//! off at the first `:` and the release at the last `-`. A missing epoch is
//! kept as `None` rather than `0`: whether it counts as zero is decided at
//! comparison time by an [`EpochPolicy`].

mod scheme;
mod vercmp;

pub use scheme::{RpmScheme, SemverScheme, VersionScheme};
pub use vercmp::vercmp;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use tracing::warn;

/// How a missing epoch takes part in a comparison
///
/// Installed packages are compared with `Promote` (a missing epoch is `0`),
/// packages being added to a transaction with `Skip` (a missing epoch on
/// either side leaves the epochs out of the comparison).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EpochPolicy {
    Promote,
    Skip,
}

impl EpochPolicy {
    /// Build a policy from the boolean "promote unset epoch" switch
    pub fn from_promote(promote: bool) -> Self {
        if promote {
            EpochPolicy::Promote
        } else {
            EpochPolicy::Skip
        }
    }
}

/// A parsed `[epoch:]version[-release]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Evr {
    pub epoch: Option<u64>,
    pub version: String,
    pub release: Option<String>,
}

impl Evr {
    /// Create an EVR from its components
    pub fn new(epoch: Option<u64>, version: impl Into<String>, release: Option<String>) -> Self {
        Self {
            epoch,
            version: version.into(),
            release: release.filter(|r| !r.is_empty()),
        }
    }

    /// Strictly parse an EVR string
    ///
    /// Fails when the text before the first `:` is not a decimal epoch.
    /// An empty epoch (`":1.0"`) is read as `0`.
    pub fn try_parse(s: &str) -> Result<Self> {
        let (epoch, rest) = match s.split_once(':') {
            Some((e, rest)) => {
                let epoch = if e.is_empty() {
                    0
                } else if e.bytes().all(|b| b.is_ascii_digit()) {
                    e.parse::<u64>()
                        .map_err(|err| Error::ParseError(format!("Invalid epoch in '{}': {}", s, err)))?
                } else {
                    return Err(Error::ParseError(format!("Invalid epoch in '{}'", s)));
                };
                (Some(epoch), rest)
            }
            None => (None, s),
        };

        let (version, release) = split_release(rest);
        Ok(Self::new(epoch, version, release))
    }

    /// Parse an EVR string, recovering from a malformed epoch
    ///
    /// A bad epoch is treated as absent and the text after the first `:` is
    /// used as `version[-release]`.
    pub fn parse(s: &str) -> Self {
        match Self::try_parse(s) {
            Ok(evr) => evr,
            Err(e) => {
                warn!("{}; ignoring epoch", e);
                let rest = s.split_once(':').map(|(_, rest)| rest).unwrap_or(s);
                let (version, release) = split_release(rest);
                Self::new(None, version, release)
            }
        }
    }

    /// Epoch as a number, missing epoch read as zero
    pub fn epoch_or_zero(&self) -> u64 {
        self.epoch.unwrap_or(0)
    }

    /// True when nothing was given at all
    pub fn is_empty(&self) -> bool {
        self.epoch.is_none() && self.version.is_empty() && self.release.is_none()
    }

    /// Compare two EVRs with the rpm segment rules
    pub fn compare(&self, other: &Evr, policy: EpochPolicy) -> Ordering {
        compare_with(self, other, policy, vercmp)
    }
}

fn split_release(rest: &str) -> (&str, Option<String>) {
    match rest.rsplit_once('-') {
        Some((v, r)) => (v, Some(r.to_string())),
        None => (rest, None),
    }
}

/// Compare two EVRs, delegating version and release strings to `cmp`
///
/// Epochs are compared numerically when both are present. With
/// [`EpochPolicy::Promote`] a missing epoch is read as `0`; with
/// [`EpochPolicy::Skip`] a missing epoch on either side skips the epoch
/// step. A missing release on either side matches any release.
pub fn compare_with<F>(a: &Evr, b: &Evr, policy: EpochPolicy, cmp: F) -> Ordering
where
    F: Fn(&str, &str) -> Ordering,
{
    let epochs = match (a.epoch, b.epoch, policy) {
        (Some(x), Some(y), _) => x.cmp(&y),
        (x, y, EpochPolicy::Promote) => x.unwrap_or(0).cmp(&y.unwrap_or(0)),
        (_, _, EpochPolicy::Skip) => Ordering::Equal,
    };
    if epochs != Ordering::Equal {
        return epochs;
    }

    let versions = cmp(&a.version, &b.version);
    if versions != Ordering::Equal {
        return versions;
    }

    match (&a.release, &b.release) {
        (Some(x), Some(y)) => cmp(x, y),
        _ => Ordering::Equal,
    }
}

impl fmt::Display for Evr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(epoch) = self.epoch {
            write!(f, "{}:", epoch)?;
        }
        write!(f, "{}", self.version)?;
        if let Some(ref release) = self.release {
            write!(f, "-{}", release)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Evr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_evr() {
        let evr = Evr::parse("2:1.0-1.fc40");
        assert_eq!(evr.epoch, Some(2));
        assert_eq!(evr.version, "1.0");
        assert_eq!(evr.release, Some("1.fc40".to_string()));
    }

    #[test]
    fn test_parse_without_epoch_keeps_none() {
        let evr = Evr::parse("1.5-2");
        assert_eq!(evr.epoch, None);
        assert_eq!(evr.version, "1.5");
        assert_eq!(evr.release, Some("2".to_string()));
    }

    #[test]
    fn test_parse_release_splits_on_last_dash() {
        let evr = Evr::parse("1.0-beta-3");
        assert_eq!(evr.version, "1.0-beta");
        assert_eq!(evr.release, Some("3".to_string()));
    }

    #[test]
    fn test_parse_version_only() {
        let evr = Evr::parse("3.14");
        assert_eq!(evr, Evr::new(None, "3.14", None));
        assert_eq!(evr.to_string(), "3.14");
    }

    #[test]
    fn test_parse_empty_epoch_is_zero() {
        assert_eq!(Evr::parse(":1.0").epoch, Some(0));
    }

    #[test]
    fn test_parse_bad_epoch_recovers() {
        assert!(Evr::try_parse("x1:1.0-1").is_err());
        let evr = Evr::parse("x1:1.0-1");
        assert_eq!(evr.epoch, None);
        assert_eq!(evr.version, "1.0");
        assert_eq!(evr.release, Some("1".to_string()));
    }

    #[test]
    fn test_parse_empty_release_is_absent() {
        assert_eq!(Evr::parse("1.0-").release, None);
    }

    #[test]
    fn test_display_roundtrip() {
        assert_eq!(Evr::parse("1:2.3-4").to_string(), "1:2.3-4");
    }

    #[test]
    fn test_epoch_wins() {
        let a = Evr::parse("2:1.0-1");
        let b = Evr::parse("1.5-2");
        assert_eq!(a.compare(&b, EpochPolicy::Promote), Ordering::Greater);
        assert_eq!(b.compare(&a, EpochPolicy::Promote), Ordering::Less);
    }

    #[test]
    fn test_skip_policy_ignores_one_sided_epoch() {
        let a = Evr::parse("2:1.0-1");
        let b = Evr::parse("1.5-2");
        // Without promotion the lone epoch is not compared, so 1.0 < 1.5
        assert_eq!(a.compare(&b, EpochPolicy::Skip), Ordering::Less);
    }

    #[test]
    fn test_skip_policy_still_compares_two_epochs() {
        let a = Evr::parse("1:1.0");
        let b = Evr::parse("2:0.1");
        assert_eq!(a.compare(&b, EpochPolicy::Skip), Ordering::Less);
    }

    #[test]
    fn test_promote_policy_zero_epoch_equals_missing() {
        let a = Evr::parse("0:1.0-1");
        let b = Evr::parse("1.0-1");
        assert_eq!(a.compare(&b, EpochPolicy::Promote), Ordering::Equal);
    }

    #[test]
    fn test_missing_release_matches_any() {
        let a = Evr::parse("1.0");
        let b = Evr::parse("1.0-7");
        assert_eq!(a.compare(&b, EpochPolicy::Skip), Ordering::Equal);
        assert_eq!(b.compare(&a, EpochPolicy::Skip), Ordering::Equal);
    }

    #[test]
    fn test_release_decides_when_versions_tie() {
        let a = Evr::parse("1.0-2");
        let b = Evr::parse("1.0-10");
        assert_eq!(a.compare(&b, EpochPolicy::Skip), Ordering::Less);
    }

    #[test]
    fn test_trailing_alpha_token_is_newer() {
        let a = Evr::parse("1.0");
        let b = Evr::parse("1.0a");
        assert_eq!(a.compare(&b, EpochPolicy::Promote), Ordering::Less);
    }

    #[test]
    fn test_epoch_policy_from_bool() {
        assert_eq!(EpochPolicy::from_promote(true), EpochPolicy::Promote);
        assert_eq!(EpochPolicy::from_promote(false), EpochPolicy::Skip);
    }
}
