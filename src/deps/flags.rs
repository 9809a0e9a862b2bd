// src/deps/flags.rs

//! Dependency flag sets
//!
//! rpm packs the relational operator and a grab bag of context bits into a
//! single integer. Here the two concerns are separate types: [`Sense`] holds
//! the comparison operator, [`DepContext`] holds everything else. Conversion
//! to and from the on-disk bit layout goes through [`split_rpm_flags`] and
//! [`join_rpm_flags`].

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Relational part of a dependency (`<`, `>`, `=` and combinations)
    #[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
    pub struct Sense: u8 {
        const LESS = 1 << 0;
        const GREATER = 1 << 1;
        const EQUAL = 1 << 2;

        const LE = Self::LESS.bits() | Self::EQUAL.bits();
        const GE = Self::GREATER.bits() | Self::EQUAL.bits();
    }
}

bitflags! {
    /// Context a dependency applies in (scriptlet phase, rpmlib feature, ...)
    #[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
    pub struct DepContext: u32 {
        const POSTTRANS = 1 << 0;
        const PREREQ = 1 << 1;
        const PRETRANS = 1 << 2;
        const INTERP = 1 << 3;
        const SCRIPT_PRE = 1 << 4;
        const SCRIPT_POST = 1 << 5;
        const SCRIPT_PREUN = 1 << 6;
        const SCRIPT_POSTUN = 1 << 7;
        const SCRIPT_VERIFY = 1 << 8;
        const FIND_REQUIRES = 1 << 9;
        const FIND_PROVIDES = 1 << 10;
        const TRIGGERIN = 1 << 11;
        const TRIGGERUN = 1 << 12;
        const TRIGGERPOSTUN = 1 << 13;
        const MISSINGOK = 1 << 14;
        const RPMLIB = 1 << 15;
        const TRIGGERPREIN = 1 << 16;
        const CONFIG = 1 << 17;
        const MULTILIB = 1 << 18;

        /// Requirements that must hold while a scriptlet of the package runs
        const INSTALL_PREREQ = Self::PREREQ.bits()
            | Self::PRETRANS.bits()
            | Self::INTERP.bits()
            | Self::SCRIPT_PRE.bits()
            | Self::SCRIPT_POST.bits();

        /// Requirements that must hold while the package is being erased
        const ERASE_PREREQ = Self::PREREQ.bits()
            | Self::SCRIPT_PREUN.bits()
            | Self::SCRIPT_POSTUN.bits();
    }
}

// On-disk rpm bit positions
const RPM_LESS: u32 = 1 << 1;
const RPM_GREATER: u32 = 1 << 2;
const RPM_EQUAL: u32 = 1 << 3;

const RPM_CONTEXT_BITS: &[(u32, DepContext)] = &[
    (1 << 5, DepContext::POSTTRANS),
    (1 << 6, DepContext::PREREQ),
    (1 << 7, DepContext::PRETRANS),
    (1 << 8, DepContext::INTERP),
    (1 << 9, DepContext::SCRIPT_PRE),
    (1 << 10, DepContext::SCRIPT_POST),
    (1 << 11, DepContext::SCRIPT_PREUN),
    (1 << 12, DepContext::SCRIPT_POSTUN),
    (1 << 13, DepContext::SCRIPT_VERIFY),
    (1 << 14, DepContext::FIND_REQUIRES),
    (1 << 15, DepContext::FIND_PROVIDES),
    (1 << 16, DepContext::TRIGGERIN),
    (1 << 17, DepContext::TRIGGERUN),
    (1 << 18, DepContext::TRIGGERPOSTUN),
    (1 << 19, DepContext::MISSINGOK),
    (1 << 24, DepContext::RPMLIB),
    (1 << 25, DepContext::TRIGGERPREIN),
    (1 << 28, DepContext::CONFIG),
];

/// Split an rpm dependency flag word into sense and context
///
/// Bits without a counterpart are dropped.
pub fn split_rpm_flags(raw: u32) -> (Sense, DepContext) {
    let mut sense = Sense::empty();
    if raw & RPM_LESS != 0 {
        sense |= Sense::LESS;
    }
    if raw & RPM_GREATER != 0 {
        sense |= Sense::GREATER;
    }
    if raw & RPM_EQUAL != 0 {
        sense |= Sense::EQUAL;
    }

    let context = RPM_CONTEXT_BITS
        .iter()
        .filter(|(bit, _)| raw & bit != 0)
        .fold(DepContext::empty(), |acc, (_, ctx)| acc | *ctx);

    (sense, context)
}

/// Encode sense and context back into an rpm dependency flag word
pub fn join_rpm_flags(sense: Sense, context: DepContext) -> u32 {
    let mut raw = 0;
    if sense.contains(Sense::LESS) {
        raw |= RPM_LESS;
    }
    if sense.contains(Sense::GREATER) {
        raw |= RPM_GREATER;
    }
    if sense.contains(Sense::EQUAL) {
        raw |= RPM_EQUAL;
    }
    for (bit, ctx) in RPM_CONTEXT_BITS {
        if context.contains(*ctx) {
            raw |= bit;
        }
    }
    raw
}

impl Sense {
    /// Parse a relational operator (`<`, `<=`, `=`, `==`, `>=`, `>`)
    pub fn from_operator(op: &str) -> Option<Self> {
        match op {
            "<" => Some(Sense::LESS),
            "<=" | "=<" => Some(Sense::LE),
            "=" | "==" => Some(Sense::EQUAL),
            ">=" | "=>" => Some(Sense::GE),
            ">" => Some(Sense::GREATER),
            _ => None,
        }
    }

    /// Parse a repodata flag name (`LT`, `LE`, `EQ`, `GE`, `GT`)
    pub fn from_repodata(flags: &str) -> Option<Self> {
        match flags {
            "LT" => Some(Sense::LESS),
            "LE" => Some(Sense::LE),
            "EQ" => Some(Sense::EQUAL),
            "GE" => Some(Sense::GE),
            "GT" => Some(Sense::GREATER),
            _ => None,
        }
    }

    /// Operator text, empty for an unversioned dependency
    pub fn operator(&self) -> &'static str {
        let lg = *self & (Sense::LESS | Sense::GREATER);
        let eq = self.contains(Sense::EQUAL);
        match (lg, eq) {
            (l, true) if l == Sense::LESS => "<=",
            (l, false) if l == Sense::LESS => "<",
            (g, true) if g == Sense::GREATER => ">=",
            (g, false) if g == Sense::GREATER => ">",
            (n, true) if n.is_empty() => "=",
            (n, false) if n.is_empty() => "",
            _ => "<>",
        }
    }
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operator())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_relational_bits() {
        let (sense, ctx) = split_rpm_flags(RPM_GREATER | RPM_EQUAL);
        assert_eq!(sense, Sense::GE);
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_split_context_bits() {
        let (sense, ctx) = split_rpm_flags((1 << 6) | (1 << 9) | RPM_LESS);
        assert_eq!(sense, Sense::LESS);
        assert_eq!(ctx, DepContext::PREREQ | DepContext::SCRIPT_PRE);
    }

    #[test]
    fn test_join_inverts_split() {
        let raw = RPM_EQUAL | (1 << 24) | (1 << 8);
        let (sense, ctx) = split_rpm_flags(raw);
        assert_eq!(join_rpm_flags(sense, ctx), raw);
    }

    #[test]
    fn test_operators() {
        assert_eq!(Sense::from_operator(">="), Some(Sense::GE));
        assert_eq!(Sense::from_operator("=="), Some(Sense::EQUAL));
        assert_eq!(Sense::from_operator("~>"), None);
        assert_eq!(Sense::GE.operator(), ">=");
        assert_eq!(Sense::LESS.to_string(), "<");
        assert_eq!(Sense::empty().operator(), "");
    }

    #[test]
    fn test_repodata_flags() {
        assert_eq!(Sense::from_repodata("LT"), Some(Sense::LESS));
        assert_eq!(Sense::from_repodata("GE"), Some(Sense::GE));
        assert_eq!(Sense::from_repodata("XX"), None);
    }

    #[test]
    fn test_prereq_groups() {
        assert!(DepContext::INSTALL_PREREQ.contains(DepContext::SCRIPT_POST));
        assert!(DepContext::ERASE_PREREQ.contains(DepContext::SCRIPT_PREUN));
        assert!(!DepContext::INSTALL_PREREQ.contains(DepContext::SCRIPT_PREUN));
    }
}
