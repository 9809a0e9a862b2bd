// src/packages/header.rs

//! Accessor surface for package metadata records
//!
//! The engine never parses package files itself. It reads the handful of
//! tags it needs through [`PackageHeader::get_tag`]; everything else on the
//! trait is derived from that one method.

use crate::deps::DepTag;
use crate::version::Evr;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Tags the engine reads from a metadata record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Name,
    Epoch,
    Version,
    Release,
    Arch,
    Os,
    /// Union of all file colors
    HeaderColor,
    /// Identifier of the header (hex digest), used for chain records
    HeaderId,
    Provides,
    Requires,
    Conflicts,
    Obsoletes,
    Triggers,
    FileNames,
    FileColors,
    FileLinktos,
    /// Per-file start index into the dependency dictionary
    FileDependsX,
    /// Per-file number of dictionary entries
    FileDependsN,
    /// Dictionary entries `(kind << 24) | index`, kind `'P'` or `'R'`
    DependsDict,
}

impl Tag {
    /// Tag holding the dependencies of a relation, if it is stored directly
    pub fn for_deps(tag: DepTag) -> Option<Tag> {
        match tag {
            DepTag::Provides => Some(Tag::Provides),
            DepTag::Requires => Some(Tag::Requires),
            DepTag::Conflicts => Some(Tag::Conflicts),
            DepTag::Obsoletes => Some(Tag::Obsoletes),
            DepTag::Triggers => Some(Tag::Triggers),
            DepTag::Dirnames | DepTag::Linktos | DepTag::This => None,
        }
    }
}

/// A dependency as stored in metadata: name, version text and rpm flag bits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDependency {
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub flags: u32,
}

impl RawDependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>, flags: u32) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            flags,
        }
    }
}

/// Value of a tag
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    String(String),
    Int(u64),
    StringArray(Vec<String>),
    IntArray(Vec<u32>),
    Deps(Vec<RawDependency>),
}

impl TagValue {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            TagValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<u64> {
        match self {
            TagValue::Int(n) => Some(*n),
            TagValue::IntArray(v) if v.len() == 1 => Some(u64::from(v[0])),
            _ => None,
        }
    }

    pub fn into_strings(self) -> Vec<String> {
        match self {
            TagValue::StringArray(v) => v,
            TagValue::String(s) => vec![s],
            _ => Vec::new(),
        }
    }

    pub fn into_ints(self) -> Vec<u32> {
        match self {
            TagValue::IntArray(v) => v,
            TagValue::Int(n) => u32::try_from(n).map(|n| vec![n]).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    pub fn into_deps(self) -> Vec<RawDependency> {
        match self {
            TagValue::Deps(v) => v,
            _ => Vec::new(),
        }
    }
}

/// Read access to one package metadata record
pub trait PackageHeader: Debug + Send + Sync {
    /// Fetch a tag, `None` when the record does not carry it
    fn get_tag(&self, tag: Tag) -> Option<TagValue>;

    fn name(&self) -> Option<String> {
        self.string_tag(Tag::Name)
    }

    fn epoch(&self) -> Option<u64> {
        self.get_tag(Tag::Epoch).and_then(|v| v.as_int())
    }

    fn version(&self) -> String {
        self.string_tag(Tag::Version).unwrap_or_default()
    }

    fn release(&self) -> Option<String> {
        self.string_tag(Tag::Release)
    }

    fn arch(&self) -> Option<String> {
        self.string_tag(Tag::Arch)
    }

    fn os(&self) -> Option<String> {
        self.string_tag(Tag::Os)
    }

    fn evr(&self) -> Evr {
        Evr::new(self.epoch(), self.version(), self.release())
    }

    /// `name-[epoch:]version-release.arch`
    fn nevra(&self) -> String {
        let mut s = format!(
            "{}-{}",
            self.name().unwrap_or_else(|| "(none)".to_string()),
            self.evr()
        );
        if let Some(arch) = self.arch() {
            s.push('.');
            s.push_str(&arch);
        }
        s
    }

    fn header_id(&self) -> Option<String> {
        self.string_tag(Tag::HeaderId)
    }

    fn header_color(&self) -> Option<u32> {
        self.get_tag(Tag::HeaderColor)
            .and_then(|v| v.as_int())
            .and_then(|n| u32::try_from(n).ok())
    }

    fn dependencies(&self, tag: DepTag) -> Vec<RawDependency> {
        Tag::for_deps(tag)
            .and_then(|t| self.get_tag(t))
            .map(TagValue::into_deps)
            .unwrap_or_default()
    }

    fn file_paths(&self) -> Vec<String> {
        self.array_tag(Tag::FileNames)
    }

    fn file_colors(&self) -> Vec<u32> {
        self.get_tag(Tag::FileColors)
            .map(TagValue::into_ints)
            .unwrap_or_default()
    }

    fn file_linktos(&self) -> Vec<String> {
        self.array_tag(Tag::FileLinktos)
    }

    #[doc(hidden)]
    fn string_tag(&self, tag: Tag) -> Option<String> {
        self.get_tag(tag)
            .and_then(|v| v.as_string().map(str::to_string))
            .filter(|s| !s.is_empty())
    }

    #[doc(hidden)]
    fn array_tag(&self, tag: Tag) -> Vec<String> {
        self.get_tag(tag).map(TagValue::into_strings).unwrap_or_default()
    }
}
