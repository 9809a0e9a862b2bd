// src/packages/memory.rs

//! In-memory metadata records
//!
//! Used for packages read from repository metadata, rebuilt from the
//! installed database, or described in JSON by a caller.

use super::header::{PackageHeader, RawDependency, Tag, TagValue};
use crate::deps::{join_rpm_flags, DepTag, Dependency};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A metadata record held entirely in memory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryHeader {
    pub name: String,
    #[serde(default)]
    pub epoch: Option<u64>,
    pub version: String,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub header_id: Option<String>,
    #[serde(default)]
    pub header_color: Option<u32>,
    #[serde(default)]
    pub provides: Vec<RawDependency>,
    #[serde(default)]
    pub requires: Vec<RawDependency>,
    #[serde(default)]
    pub conflicts: Vec<RawDependency>,
    #[serde(default)]
    pub obsoletes: Vec<RawDependency>,
    #[serde(default)]
    pub triggers: Vec<RawDependency>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub file_colors: Vec<u32>,
    #[serde(default)]
    pub file_linktos: Vec<String>,
    #[serde(default)]
    pub file_depends_x: Vec<u32>,
    #[serde(default)]
    pub file_depends_n: Vec<u32>,
    #[serde(default)]
    pub depends_dict: Vec<u32>,
}

impl MemoryHeader {
    /// Create a record from `name` and an EVR string
    pub fn new(name: impl Into<String>, evr: &str) -> Self {
        let evr = crate::version::Evr::parse(evr);
        Self {
            name: name.into(),
            epoch: evr.epoch,
            version: evr.version,
            release: evr.release,
            ..Default::default()
        }
    }

    pub fn with_arch(mut self, arch: &str) -> Self {
        self.arch = Some(arch.to_string());
        self
    }

    pub fn with_os(mut self, os: &str) -> Self {
        self.os = Some(os.to_string());
        self
    }

    /// Add a dependency given as text, e.g. `"glibc >= 2.34"`
    pub fn dep(mut self, tag: DepTag, text: &str) -> Result<Self> {
        let dep = Dependency::parse(text)?;
        self.push_dep(tag, &dep);
        Ok(self)
    }

    pub fn provides(self, text: &str) -> Result<Self> {
        self.dep(DepTag::Provides, text)
    }

    pub fn requires(self, text: &str) -> Result<Self> {
        self.dep(DepTag::Requires, text)
    }

    pub fn conflicts(self, text: &str) -> Result<Self> {
        self.dep(DepTag::Conflicts, text)
    }

    pub fn obsoletes(self, text: &str) -> Result<Self> {
        self.dep(DepTag::Obsoletes, text)
    }

    /// Add a file with its color
    pub fn file(mut self, path: &str, color: u32) -> Self {
        self.files.push(path.to_string());
        self.file_colors.push(color);
        self
    }

    /// Store a parsed dependency in the slot for `tag`
    pub fn push_dep(&mut self, tag: DepTag, dep: &Dependency) {
        let raw = RawDependency::new(
            dep.name.clone(),
            dep.evr.as_ref().map(|e| e.to_string()).unwrap_or_default(),
            join_rpm_flags(dep.sense, dep.context),
        );
        match tag {
            DepTag::Provides | DepTag::This => self.provides.push(raw),
            DepTag::Requires => self.requires.push(raw),
            DepTag::Conflicts => self.conflicts.push(raw),
            DepTag::Obsoletes => self.obsoletes.push(raw),
            DepTag::Triggers => self.triggers.push(raw),
            DepTag::Dirnames | DepTag::Linktos => {}
        }
    }

    /// Copy any metadata record into memory
    pub fn from_header(header: &dyn PackageHeader) -> Self {
        let ints = |tag| header.get_tag(tag).map(TagValue::into_ints).unwrap_or_default();
        Self {
            name: header.name().unwrap_or_default(),
            epoch: header.epoch(),
            version: header.version(),
            release: header.release(),
            arch: header.arch(),
            os: header.os(),
            header_id: header.header_id(),
            header_color: header.header_color(),
            provides: header.dependencies(DepTag::Provides),
            requires: header.dependencies(DepTag::Requires),
            conflicts: header.dependencies(DepTag::Conflicts),
            obsoletes: header.dependencies(DepTag::Obsoletes),
            triggers: header.dependencies(DepTag::Triggers),
            files: header.file_paths(),
            file_colors: header.file_colors(),
            file_linktos: header.file_linktos(),
            file_depends_x: ints(Tag::FileDependsX),
            file_depends_n: ints(Tag::FileDependsN),
            depends_dict: ints(Tag::DependsDict),
        }
    }
}

fn non_empty_ints(v: &[u32]) -> Option<TagValue> {
    (!v.is_empty()).then(|| TagValue::IntArray(v.to_vec()))
}

impl PackageHeader for MemoryHeader {
    fn get_tag(&self, tag: Tag) -> Option<TagValue> {
        match tag {
            Tag::Name => Some(TagValue::String(self.name.clone())),
            Tag::Epoch => self.epoch.map(TagValue::Int),
            Tag::Version => Some(TagValue::String(self.version.clone())),
            Tag::Release => self.release.clone().map(TagValue::String),
            Tag::Arch => self.arch.clone().map(TagValue::String),
            Tag::Os => self.os.clone().map(TagValue::String),
            Tag::HeaderColor => self.header_color.map(|c| TagValue::Int(u64::from(c))),
            Tag::HeaderId => self.header_id.clone().map(TagValue::String),
            Tag::Provides => Some(TagValue::Deps(self.provides.clone())),
            Tag::Requires => Some(TagValue::Deps(self.requires.clone())),
            Tag::Conflicts => Some(TagValue::Deps(self.conflicts.clone())),
            Tag::Obsoletes => Some(TagValue::Deps(self.obsoletes.clone())),
            Tag::Triggers => Some(TagValue::Deps(self.triggers.clone())),
            Tag::FileNames => Some(TagValue::StringArray(self.files.clone())),
            Tag::FileColors => non_empty_ints(&self.file_colors),
            Tag::FileLinktos => Some(TagValue::StringArray(self.file_linktos.clone())),
            Tag::FileDependsX => non_empty_ints(&self.file_depends_x),
            Tag::FileDependsN => non_empty_ints(&self.file_depends_n),
            Tag::DependsDict => non_empty_ints(&self.depends_dict),
        }
    }
}
