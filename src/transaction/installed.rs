// src/transaction/installed.rs

//! Queries against the set of installed packages

use crate::deps::{DepTag, Dependency, Sense};
use crate::error::Result;
use crate::packages::PackageHeader;
use crate::version::{EpochPolicy, RpmScheme};
use std::sync::Arc;

/// An installed package and its database offset
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub offset: u32,
    pub header: Arc<dyn PackageHeader>,
}

impl InstalledPackage {
    pub fn new(offset: u32, header: Arc<dyn PackageHeader>) -> Self {
        Self { offset, header }
    }

    /// Provides of the package, its own `name = E:V-R` included
    pub fn provides(&self) -> Vec<Dependency> {
        let mut provides = deps_of(self.header.as_ref(), DepTag::Provides);
        if let Some(name) = self.header.name() {
            provides.push(Dependency::versioned(
                name,
                Sense::EQUAL,
                self.header.evr(),
            ));
        }
        provides
    }

    pub fn requires(&self) -> Vec<Dependency> {
        deps_of(self.header.as_ref(), DepTag::Requires)
    }

    pub fn conflicts(&self) -> Vec<Dependency> {
        deps_of(self.header.as_ref(), DepTag::Conflicts)
    }

    /// Does this package satisfy `dep`?
    ///
    /// File dependencies match the file list; everything else is matched
    /// against the provides with `policy`.
    pub fn satisfies(&self, dep: &Dependency, policy: EpochPolicy) -> bool {
        if dep.is_file() && self.header.file_paths().iter().any(|f| *f == dep.name) {
            return true;
        }
        self.provides()
            .iter()
            .any(|p| p.overlaps(dep, &RpmScheme, policy))
    }
}

fn deps_of(header: &dyn PackageHeader, tag: DepTag) -> Vec<Dependency> {
    header
        .dependencies(tag)
        .iter()
        .map(|d| Dependency::from_raw(&d.name, &d.version, d.flags))
        .collect()
}

/// Lookup of installed packages by capability
///
/// Queries return candidates by name only; version ranges are checked by
/// the caller.
pub trait InstalledPackages {
    /// Packages providing `dep.name`, or shipping it as a file
    fn packages_providing(&self, dep: &Dependency) -> Result<Vec<InstalledPackage>>;

    /// Packages with a Requires on `name`
    fn packages_requiring(&self, name: &str) -> Result<Vec<InstalledPackage>>;

    /// Packages with a Conflicts on `name`
    fn packages_conflicting(&self, name: &str) -> Result<Vec<InstalledPackage>>;

    /// Packages called `name`
    fn packages_named(&self, name: &str) -> Result<Vec<InstalledPackage>>;
}

/// Installed packages kept in memory
#[derive(Debug, Default)]
pub struct MemoryInstalled {
    packages: Vec<InstalledPackage>,
    next_offset: u32,
}

impl MemoryInstalled {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package, returning its offset
    pub fn add(&mut self, header: Arc<dyn PackageHeader>) -> u32 {
        self.next_offset += 1;
        self.packages
            .push(InstalledPackage::new(self.next_offset, header));
        self.next_offset
    }

    pub fn remove(&mut self, offset: u32) -> Option<InstalledPackage> {
        let pos = self.packages.iter().position(|p| p.offset == offset)?;
        Some(self.packages.remove(pos))
    }

    pub fn get(&self, offset: u32) -> Option<&InstalledPackage> {
        self.packages.iter().find(|p| p.offset == offset)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstalledPackage> {
        self.packages.iter()
    }

    fn filter<F>(&self, pred: F) -> Vec<InstalledPackage>
    where
        F: Fn(&InstalledPackage) -> bool,
    {
        self.packages.iter().filter(|p| pred(p)).cloned().collect()
    }
}

impl InstalledPackages for MemoryInstalled {
    fn packages_providing(&self, dep: &Dependency) -> Result<Vec<InstalledPackage>> {
        Ok(self.filter(|p| {
            p.provides().iter().any(|d| d.name == dep.name)
                || (dep.is_file() && p.header.file_paths().iter().any(|f| *f == dep.name))
        }))
    }

    fn packages_requiring(&self, name: &str) -> Result<Vec<InstalledPackage>> {
        Ok(self.filter(|p| p.requires().iter().any(|d| d.name == name)))
    }

    fn packages_conflicting(&self, name: &str) -> Result<Vec<InstalledPackage>> {
        Ok(self.filter(|p| p.conflicts().iter().any(|d| d.name == name)))
    }

    fn packages_named(&self, name: &str) -> Result<Vec<InstalledPackage>> {
        Ok(self.filter(|p| p.header.name().as_deref() == Some(name)))
    }
}
