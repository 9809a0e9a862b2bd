// src/deps/set.rs

//! Ordered collections of dependencies of one relation
//!
//! A [`DependencySet`] is populated in any order and becomes sorted by
//! `(name, EVR, flags)` once merged or sorted. Sets are shared read-only
//! through `Arc`; merging and sorting take `&mut self`, so a shared set has
//! to be made unique (`Arc::make_mut`) before it can change.

use super::dependency::{DepTag, Dependency};
use crate::version::{EpochPolicy, Evr, RpmScheme, VersionScheme};
use std::cmp::Ordering;
use std::sync::Arc;

/// An ordered list of dependencies belonging to one relation
#[derive(Debug, Clone)]
pub struct DependencySet {
    tag: DepTag,
    deps: Vec<Dependency>,
    sorted: bool,
    cursor: Option<usize>,
    scheme: Arc<dyn VersionScheme>,
}

fn evr_key(evr: &Option<Evr>) -> (Option<u64>, &str, Option<&str>) {
    match evr {
        Some(e) => (e.epoch, e.version.as_str(), e.release.as_deref()),
        None => (None, "", None),
    }
}

/// Total order used for sorting, searching and de-duplication
fn sort_cmp(a: &Dependency, b: &Dependency) -> Ordering {
    a.name
        .cmp(&b.name)
        .then_with(|| evr_key(&a.evr).cmp(&evr_key(&b.evr)))
        .then_with(|| a.sense.cmp(&b.sense))
        .then_with(|| a.context.cmp(&b.context))
}

impl DependencySet {
    /// Create an empty set compared with the rpm version scheme
    pub fn new(tag: DepTag) -> Self {
        Self::with_scheme(tag, Arc::new(RpmScheme))
    }

    /// Create an empty set with a custom version scheme
    pub fn with_scheme(tag: DepTag, scheme: Arc<dyn VersionScheme>) -> Self {
        Self {
            tag,
            deps: Vec::new(),
            sorted: true,
            cursor: None,
            scheme,
        }
    }

    /// Create an unsorted set from dependencies in their original order
    pub fn from_deps(tag: DepTag, deps: impl IntoIterator<Item = Dependency>) -> Self {
        Self::from_deps_with_scheme(tag, Arc::new(RpmScheme), deps)
    }

    /// Create an unsorted set compared with `scheme`
    pub fn from_deps_with_scheme(
        tag: DepTag,
        scheme: Arc<dyn VersionScheme>,
        deps: impl IntoIterator<Item = Dependency>,
    ) -> Self {
        let mut set = Self::with_scheme(tag, scheme);
        set.deps = deps.into_iter().collect();
        set.sorted = set.deps.len() <= 1;
        set
    }

    /// A set holding exactly one dependency
    pub fn single(tag: DepTag, dep: Dependency) -> Self {
        Self::from_deps(tag, [dep])
    }

    /// The self dependency `name = E:V-R` of a package
    pub fn this_package(name: &str, evr: Evr) -> Self {
        Self::single(
            DepTag::This,
            Dependency::versioned(name, super::flags::Sense::EQUAL, evr),
        )
    }

    pub fn tag(&self) -> DepTag {
        self.tag
    }

    pub fn scheme(&self) -> &dyn VersionScheme {
        self.scheme.as_ref()
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    /// Whether the set is currently in sorted order
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn get(&self, index: usize) -> Option<&Dependency> {
        self.deps.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Dependency> {
        self.deps.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Dependency> {
        self.deps.iter()
    }

    pub fn as_slice(&self) -> &[Dependency] {
        &self.deps
    }

    /// Append without keeping order; call [`sort`](Self::sort) before searching
    pub fn push(&mut self, dep: Dependency) {
        if let Some(last) = self.deps.last() {
            if sort_cmp(last, &dep) != Ordering::Less {
                self.sorted = false;
            }
        }
        self.deps.push(dep);
    }

    /// Sort and drop exact duplicates
    pub fn sort(&mut self) {
        if !self.sorted {
            let deps = std::mem::take(&mut self.deps);
            self.deps = sorted_unique(deps);
            self.sorted = true;
        }
        self.cursor = None;
    }

    // Cursor protocol

    /// Rewind the cursor to before the first entry
    pub fn reset(&mut self) {
        self.cursor = None;
    }

    /// Advance the cursor, returning the new index
    pub fn next(&mut self) -> Option<usize> {
        let next = self.cursor.map_or(0, |i| i + 1);
        if next < self.deps.len() {
            self.cursor = Some(next);
            Some(next)
        } else {
            self.cursor = None;
            None
        }
    }

    /// Entry under the cursor
    pub fn current(&self) -> Option<&Dependency> {
        self.cursor.and_then(|i| self.deps.get(i))
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Binary search for an exact `(name, EVR, flags)` match
    ///
    /// The set must be sorted.
    pub fn find(&self, needle: &Dependency) -> Option<usize> {
        debug_assert!(self.sorted, "find() on an unsorted {:?} set", self.tag);
        self.deps.binary_search_by(|d| sort_cmp(d, needle)).ok()
    }

    /// Find the first entry whose range overlaps `needle`
    ///
    /// The set must be sorted; only entries with the same name are tested.
    pub fn search(&self, needle: &Dependency, policy: EpochPolicy) -> Option<usize> {
        debug_assert!(self.sorted, "search() on an unsorted {:?} set", self.tag);
        let start = self.deps.partition_point(|d| d.name < needle.name);
        self.deps[start..]
            .iter()
            .take_while(|d| d.name == needle.name)
            .position(|d| self.compare(d, needle, policy))
            .map(|offset| start + offset)
    }

    /// Linear overlap test that also works on unsorted sets
    pub fn any_matches(&self, needle: &Dependency, policy: EpochPolicy) -> bool {
        self.deps.iter().any(|d| self.compare(d, needle, policy))
    }

    /// Range overlap of two dependencies under this set's version scheme
    pub fn compare(&self, a: &Dependency, b: &Dependency, policy: EpochPolicy) -> bool {
        a.overlaps(b, self.scheme.as_ref(), policy)
    }

    /// Merge `src` into this set, keeping it sorted and free of duplicates
    ///
    /// Duplicates combine their colors and reference counts.
    pub fn merge(&mut self, src: &DependencySet) {
        if src.is_empty() {
            self.sort();
            return;
        }
        let mut incoming = src.deps.clone();
        if !src.sorted {
            incoming = sorted_unique(incoming);
        }
        let current = if self.sorted {
            std::mem::take(&mut self.deps)
        } else {
            sorted_unique(std::mem::take(&mut self.deps))
        };
        self.deps = merge_sorted(current, incoming);
        self.sorted = true;
        self.cursor = None;
    }

    /// Names of all entries, in set order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.deps.iter().map(|d| d.name.as_str())
    }

    /// Union of the colors of all entries
    pub fn color(&self) -> u32 {
        self.deps.iter().fold(0, |acc, d| acc | d.color)
    }
}

fn sorted_unique(mut deps: Vec<Dependency>) -> Vec<Dependency> {
    deps.sort_by(sort_cmp);
    let mut out: Vec<Dependency> = Vec::with_capacity(deps.len());
    for dep in deps {
        match out.last_mut() {
            Some(last) if sort_cmp(last, &dep) == Ordering::Equal => absorb(last, dep),
            _ => out.push(dep),
        }
    }
    out
}

fn absorb(into: &mut Dependency, dup: Dependency) {
    into.color |= dup.color;
    into.refs += dup.refs;
}

/// Merge two sorted, duplicate-free lists
fn merge_sorted(a: Vec<Dependency>, b: Vec<Dependency>) -> Vec<Dependency> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let mut a = a.into_iter().peekable();
    let mut b = b.into_iter().peekable();

    loop {
        let ordering = match (a.peek(), b.peek()) {
            (Some(x), Some(y)) => sort_cmp(x, y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };
        match ordering {
            Ordering::Less => out.extend(a.next()),
            Ordering::Greater => out.extend(b.next()),
            Ordering::Equal => {
                if let (Some(mut x), Some(y)) = (a.next(), b.next()) {
                    absorb(&mut x, y);
                    out.push(x);
                }
            }
        }
    }
    out
}

impl PartialEq for DependencySet {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.deps == other.deps
    }
}

impl<'a> IntoIterator for &'a DependencySet {
    type Item = &'a Dependency;
    type IntoIter = std::slice::Iter<'a, Dependency>;

    fn into_iter(self) -> Self::IntoIter {
        self.deps.iter()
    }
}

/// Range overlap of two dependencies with the rpm version scheme
pub fn compare(a: &Dependency, b: &Dependency, policy: EpochPolicy) -> bool {
    a.overlaps(b, &RpmScheme, policy)
}
