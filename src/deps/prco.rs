// src/deps/prco.rs

//! Per-package dependency slots (Provides/Requires/Conflicts/Obsoletes/...)

use super::dependency::{DepTag, Dependency};
use super::set::DependencySet;
use crate::packages::{PackageHeader, Tag, TagValue};
use crate::version::{Evr, RpmScheme, VersionScheme};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

const DICT_PROVIDES: u32 = b'P' as u32;
const DICT_REQUIRES: u32 = b'R' as u32;

/// The dependency sets owned by one package
#[derive(Debug, Clone, Default)]
pub struct Prco {
    slots: [Option<Arc<DependencySet>>; 8],
}

fn slot(tag: DepTag) -> usize {
    match tag {
        DepTag::Provides => 0,
        DepTag::Requires => 1,
        DepTag::Conflicts => 2,
        DepTag::Obsoletes => 3,
        DepTag::Triggers => 4,
        DepTag::Dirnames => 5,
        DepTag::Linktos => 6,
        DepTag::This => 7,
    }
}

impl Prco {
    /// Empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Load all slots from a metadata record with the rpm version scheme
    ///
    /// `files` is the package's (possibly relocated) file list, used for the
    /// Dirnames slot.
    pub fn load(header: &dyn PackageHeader, name: &str, evr: &Evr, files: &[String]) -> Self {
        Self::load_with_scheme(header, name, evr, files, Arc::new(RpmScheme))
    }

    /// Load all slots, comparing versions with `scheme`
    pub fn load_with_scheme(
        header: &dyn PackageHeader,
        name: &str,
        evr: &Evr,
        files: &[String],
        scheme: Arc<dyn VersionScheme>,
    ) -> Self {
        let raw = |tag: DepTag| {
            let deps = header
                .dependencies(tag)
                .iter()
                .map(|d| Dependency::from_raw(&d.name, &d.version, d.flags))
                .collect::<Vec<_>>();
            DependencySet::from_deps_with_scheme(tag, scheme.clone(), deps)
        };

        let mut provides = raw(DepTag::Provides);
        let mut requires = raw(DepTag::Requires);
        color_dependencies(header, &mut provides, &mut requires);

        let this = DependencySet::this_package(name, evr.clone());
        provides.merge(&this);
        requires.sort();

        let mut prco = Self::new();
        prco.set(provides);
        prco.set(requires);
        for tag in [DepTag::Conflicts, DepTag::Obsoletes, DepTag::Triggers] {
            let mut set = raw(tag);
            set.sort();
            prco.set(set);
        }

        let dirnames: BTreeSet<String> = files
            .iter()
            .filter_map(|f| f.rfind('/').map(|i| f[..=i].to_string()))
            .collect();
        prco.set(sorted_names(DepTag::Dirnames, &scheme, dirnames));

        let linktos: BTreeSet<String> = header
            .file_linktos()
            .into_iter()
            .filter(|l| !l.is_empty())
            .collect();
        prco.set(sorted_names(DepTag::Linktos, &scheme, linktos));

        prco.set(this);
        prco
    }

    /// Shared handle to the set in a slot
    pub fn get(&self, tag: DepTag) -> Option<&Arc<DependencySet>> {
        self.slots[slot(tag)].as_ref()
    }

    /// Mutable access to a slot, cloning the set first if it is shared
    pub fn get_mut(&mut self, tag: DepTag) -> Option<&mut DependencySet> {
        self.slots[slot(tag)].as_mut().map(Arc::make_mut)
    }

    /// Replace the slot named by the set's own tag
    pub fn set(&mut self, set: DependencySet) {
        let index = slot(set.tag());
        self.slots[index] = Some(Arc::new(set));
    }

    /// Entries of a slot, empty when the slot is unset
    pub fn deps(&self, tag: DepTag) -> &[Dependency] {
        self.get(tag).map(|s| s.as_slice()).unwrap_or(&[])
    }

    pub fn provides(&self) -> &[Dependency] {
        self.deps(DepTag::Provides)
    }

    pub fn requires(&self) -> &[Dependency] {
        self.deps(DepTag::Requires)
    }

    pub fn conflicts(&self) -> &[Dependency] {
        self.deps(DepTag::Conflicts)
    }

    pub fn obsoletes(&self) -> &[Dependency] {
        self.deps(DepTag::Obsoletes)
    }

    /// Drop every slot
    pub fn clear(&mut self) {
        self.slots = Default::default();
    }
}

fn sorted_names(
    tag: DepTag,
    scheme: &Arc<dyn VersionScheme>,
    names: BTreeSet<String>,
) -> DependencySet {
    let mut set =
        DependencySet::from_deps_with_scheme(tag, scheme.clone(), names.into_iter().map(Dependency::name_only));
    set.sort();
    set
}

/// Color dependencies by the files that reference them
///
/// Each file lists dictionary entries naming a provide or require by index.
/// A referenced dependency gains the file's color and one reference.
fn color_dependencies(
    header: &dyn PackageHeader,
    provides: &mut DependencySet,
    requires: &mut DependencySet,
) {
    let ints = |tag| header.get_tag(tag).map(TagValue::into_ints).unwrap_or_default();
    let dict = ints(Tag::DependsDict);
    if dict.is_empty() {
        return;
    }
    let starts = ints(Tag::FileDependsX);
    let counts = ints(Tag::FileDependsN);
    let colors = header.file_colors();

    for (file, (&start, &count)) in starts.iter().zip(counts.iter()).enumerate() {
        let color = colors.get(file).copied().unwrap_or(0);
        let (start, count) = (start as usize, count as usize);
        let Some(entries) = dict.get(start..start + count) else {
            warn!("File {} references dependencies past the dictionary end", file);
            continue;
        };
        for &entry in entries {
            let index = (entry & 0x00ff_ffff) as usize;
            let target = match entry >> 24 {
                DICT_PROVIDES => provides.get_mut(index),
                DICT_REQUIRES => requires.get_mut(index),
                _ => None,
            };
            if let Some(dep) = target {
                dep.color |= color;
                dep.refs += 1;
            }
        }
    }
}
