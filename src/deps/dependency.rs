// src/deps/dependency.rs

//! A single `(name, EVR, flags)` dependency and the range overlap test

use super::flags::{DepContext, Sense};
use crate::error::{Error, Result};
use crate::version::{EpochPolicy, Evr, VersionScheme};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// The relation a dependency belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepTag {
    Provides,
    Requires,
    Conflicts,
    Obsoletes,
    Triggers,
    Dirnames,
    Linktos,
    /// Synthetic `name = E:V-R` of the package itself
    This,
}

impl DepTag {
    /// All slots, in PRCO order
    pub const ALL: [DepTag; 8] = [
        DepTag::Provides,
        DepTag::Requires,
        DepTag::Conflicts,
        DepTag::Obsoletes,
        DepTag::Triggers,
        DepTag::Dirnames,
        DepTag::Linktos,
        DepTag::This,
    ];

    /// One-letter prefix used in problem strings
    pub fn letter(&self) -> char {
        match self {
            DepTag::Provides => 'P',
            DepTag::Requires => 'R',
            DepTag::Conflicts => 'C',
            DepTag::Obsoletes => 'O',
            DepTag::Triggers => 'T',
            DepTag::Dirnames => 'D',
            DepTag::Linktos => 'L',
            DepTag::This => 'P',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DepTag::Provides => "provides",
            DepTag::Requires => "requires",
            DepTag::Conflicts => "conflicts",
            DepTag::Obsoletes => "obsoletes",
            DepTag::Triggers => "triggers",
            DepTag::Dirnames => "dirnames",
            DepTag::Linktos => "linktos",
            DepTag::This => "this",
        }
    }
}

impl std::str::FromStr for DepTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DepTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| Error::ParseError(format!("Invalid dependency tag: {}", s)))
    }
}

/// One dependency entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub evr: Option<Evr>,
    pub sense: Sense,
    #[serde(default)]
    pub context: DepContext,
    /// Union of the colors of the files referencing this dependency
    #[serde(default)]
    pub color: u32,
    /// Number of files referencing this dependency
    #[serde(default)]
    pub refs: i32,
}

impl Dependency {
    /// Unversioned dependency on a name
    pub fn name_only(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            evr: None,
            sense: Sense::empty(),
            context: DepContext::empty(),
            color: 0,
            refs: 0,
        }
    }

    /// Versioned dependency
    pub fn versioned(name: impl Into<String>, sense: Sense, evr: Evr) -> Self {
        Self {
            name: name.into(),
            evr: if evr.is_empty() { None } else { Some(evr) },
            sense,
            context: DepContext::empty(),
            color: 0,
            refs: 0,
        }
    }

    /// Build from the raw triple stored in package metadata
    ///
    /// An empty version string means "no version"; a malformed epoch is
    /// dropped with a warning.
    pub fn from_raw(name: &str, version: &str, flags: u32) -> Self {
        let (sense, context) = super::flags::split_rpm_flags(flags);
        let evr = if version.is_empty() {
            None
        } else {
            Some(Evr::parse(version))
        };
        Self {
            name: name.to_string(),
            evr,
            sense,
            context,
            color: 0,
            refs: 0,
        }
    }

    /// Parse `name [op version]` text, e.g. `foo >= 1:2.0-1`
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let name = parts
            .next()
            .ok_or_else(|| Error::ParseError("Empty dependency".to_string()))?;

        match (parts.next(), parts.next(), parts.next()) {
            (None, _, _) => Ok(Self::name_only(name)),
            (Some(op), Some(version), None) => {
                let sense = Sense::from_operator(op).ok_or_else(|| {
                    Error::ParseError(format!("Invalid operator '{}' in '{}'", op, s))
                })?;
                Ok(Self::versioned(name, sense, Evr::try_parse(version)?))
            }
            _ => Err(Error::ParseError(format!("Malformed dependency: {}", s))),
        }
    }

    pub fn with_context(mut self, context: DepContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    /// True for `rpmlib(...)` feature dependencies
    pub fn is_rpmlib(&self) -> bool {
        self.context.contains(DepContext::RPMLIB) || self.name.starts_with("rpmlib(")
    }

    /// True for file path dependencies such as `/bin/sh`
    pub fn is_file(&self) -> bool {
        self.name.starts_with('/')
    }

    /// True when the dependency constrains a version
    pub fn is_versioned(&self) -> bool {
        self.evr.is_some() && !self.sense.is_empty()
    }

    /// Render with the one-letter relation prefix, e.g. `R foo >= 1.0`
    pub fn dnevr(&self, tag: DepTag) -> String {
        format!("{} {}", tag.letter(), self)
    }

    /// Test whether the version ranges of two dependencies intersect
    ///
    /// Names must match. A side without a relational operator or without a
    /// version matches any version of the other side.
    pub fn overlaps(&self, other: &Dependency, scheme: &dyn VersionScheme, policy: EpochPolicy) -> bool {
        if self.name != other.name {
            return false;
        }

        let (a_evr, b_evr) = match (&self.evr, &other.evr) {
            (Some(a), Some(b)) if !self.sense.is_empty() && !other.sense.is_empty() => (a, b),
            _ => return true,
        };

        ranges_intersect(
            scheme.compare(a_evr, b_evr, policy),
            self.sense,
            other.sense,
        )
    }
}

/// Decide overlap of `A op_a x` and `B op_b y` given the ordering of x and y
pub(crate) fn ranges_intersect(ordering: Ordering, a: Sense, b: Sense) -> bool {
    match ordering {
        Ordering::Less => a.contains(Sense::GREATER) || b.contains(Sense::LESS),
        Ordering::Greater => a.contains(Sense::LESS) || b.contains(Sense::GREATER),
        Ordering::Equal => {
            (a.contains(Sense::EQUAL) && b.contains(Sense::EQUAL))
                || (a.contains(Sense::LESS) && b.contains(Sense::LESS))
                || (a.contains(Sense::GREATER) && b.contains(Sense::GREATER))
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(ref evr) = self.evr {
            if !self.sense.is_empty() {
                write!(f, " {} {}", self.sense, evr)?;
            }
        }
        Ok(())
    }
}
