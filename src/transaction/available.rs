// src/transaction/available.rs

//! Name-to-provider index over packages eligible to satisfy dependencies
//!
//! Built for the packages added to a transaction and, separately, for an
//! external repository used for suggestions and solving.

use crate::deps::{DepTag, Dependency, DependencySet};
use crate::version::EpochPolicy;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Opaque handle of a package in an [`AvailableIndex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageKey(pub usize);

#[derive(Debug, Clone)]
struct AvailablePackage {
    nevra: String,
    color: u32,
    provides: Arc<DependencySet>,
    files: Vec<String>,
}

/// Provides and files of a set of packages, indexed by name
#[derive(Debug, Clone, Default)]
pub struct AvailableIndex {
    packages: HashMap<PackageKey, AvailablePackage>,
    /// provide name -> (package, index into its provides)
    provides: HashMap<String, Vec<(PackageKey, usize)>>,
    /// file path -> packages shipping it
    files: HashMap<String, Vec<PackageKey>>,
    color: u32,
}

impl AvailableIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index that skips provides not matching the transaction `color`
    pub fn with_color(color: u32) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    pub fn color(&self) -> u32 {
        self.color
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Index a package's provides and files under `key`
    ///
    /// A package already indexed under `key` is replaced.
    pub fn add(
        &mut self,
        key: PackageKey,
        nevra: String,
        color: u32,
        provides: Arc<DependencySet>,
        files: &[String],
    ) {
        if self.packages.contains_key(&key) {
            self.remove(key);
        }
        debug_assert_eq!(provides.tag(), DepTag::Provides);
        for (i, provide) in provides.iter().enumerate() {
            self.provides
                .entry(provide.name.clone())
                .or_default()
                .push((key, i));
        }
        for file in files {
            self.files.entry(file.clone()).or_default().push(key);
        }
        trace!("Indexed {} ({} provides, {} files)", nevra, provides.len(), files.len());
        self.packages.insert(
            key,
            AvailablePackage {
                nevra,
                color,
                provides,
                files: files.to_vec(),
            },
        );
    }

    /// Drop a package from the index
    pub fn remove(&mut self, key: PackageKey) -> bool {
        let Some(pkg) = self.packages.remove(&key) else {
            return false;
        };
        for name in pkg.provides.names() {
            if let Some(entries) = self.provides.get_mut(name) {
                entries.retain(|(k, _)| *k != key);
                if entries.is_empty() {
                    self.provides.remove(name);
                }
            }
        }
        for file in &pkg.files {
            if let Some(keys) = self.files.get_mut(file) {
                keys.retain(|k| *k != key);
                if keys.is_empty() {
                    self.files.remove(file);
                }
            }
        }
        true
    }

    pub fn clear(&mut self) {
        self.packages.clear();
        self.provides.clear();
        self.files.clear();
    }

    /// NEVRA a package was indexed with
    pub fn nevra(&self, key: PackageKey) -> Option<&str> {
        self.packages.get(&key).map(|p| p.nevra.as_str())
    }

    /// Provides a package was indexed with
    pub fn provides_of(&self, key: PackageKey) -> Option<&Arc<DependencySet>> {
        self.packages.get(&key).map(|p| &p.provides)
    }

    pub fn keys(&self) -> impl Iterator<Item = PackageKey> + '_ {
        self.packages.keys().copied()
    }

    /// Every package satisfying `dep`, in ascending key order
    pub fn all_satisfiers(&self, dep: &Dependency, policy: EpochPolicy) -> Vec<PackageKey> {
        let mut keys = Vec::new();

        if dep.is_file() {
            if let Some(owners) = self.files.get(&dep.name) {
                keys.extend(owners.iter().copied());
            }
        }

        if let Some(entries) = self.provides.get(&dep.name) {
            for &(key, i) in entries {
                let Some(pkg) = self.packages.get(&key) else {
                    continue;
                };
                let Some(provide) = pkg.provides.get(i) else {
                    continue;
                };
                if !self.provide_color_matches(provide) {
                    continue;
                }
                if pkg.provides.compare(provide, dep, policy) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        keys.dedup();
        keys
    }

    /// Pick one satisfier, preferring packages of `preferred_color`
    pub fn satisfier(
        &self,
        dep: &Dependency,
        policy: EpochPolicy,
        preferred_color: u32,
    ) -> Option<PackageKey> {
        let all = self.all_satisfiers(dep, policy);
        if preferred_color != 0 {
            let preferred = all.iter().copied().find(|k| {
                self.packages
                    .get(k)
                    .is_some_and(|p| p.color & preferred_color != 0)
            });
            if preferred.is_some() {
                return preferred;
            }
        }
        all.first().copied()
    }

    fn provide_color_matches(&self, provide: &Dependency) -> bool {
        self.color == 0 || provide.color == 0 || provide.color & self.color != 0
    }
}
