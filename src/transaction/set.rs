// src/transaction/set.rs

//! The transaction set: elements plus the state shared by check and order

use super::available::{AvailableIndex, PackageKey};
use super::element::{ElementIndex, Relocation, TransactionElement};
use super::installed::{InstalledPackage, InstalledPackages};
use super::problems::{OrderingCycle, ProblemSet};
use crate::config::TransactionConfig;
use crate::deps::{rpmlib_provides, DepTag, Dependency, DependencySet, Sense};
use crate::error::Result;
use crate::packages::PackageHeader;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use tracing::{debug, info};

/// What the transaction mostly does, set by the first element added
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Goal {
    #[default]
    Unknown,
    Install,
    Erase,
}

/// Answer of a solve callback for an unsatisfied dependency
#[derive(Debug, Clone)]
pub enum SolveResult {
    /// Install this package; it is added to the transaction and checked
    Resolved(Arc<dyn PackageHeader>),
    /// Nothing can satisfy the dependency
    Unresolved,
    /// No answer now; the dependency stays unsatisfied for this check
    Defer,
}

/// Hook asked to resolve dependencies nothing else satisfies
pub trait SolveCallback {
    fn solve(&mut self, dep: &Dependency) -> SolveResult;
}

impl<F> SolveCallback for F
where
    F: FnMut(&Dependency) -> SolveResult,
{
    fn solve(&mut self, dep: &Dependency) -> SolveResult {
        self(dep)
    }
}

/// Outcome of earlier solve attempts, keyed by `(name, sense)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SolveAttempt {
    Resolved,
    Unresolved,
    Deferred,
}

/// Where a dependency was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Satisfier {
    Added(ElementIndex),
    Installed(u32),
    Rpmlib,
}

/// Packages to install and erase, with dependency checking and ordering
pub struct TransactionSet {
    pub(super) config: TransactionConfig,
    pub(super) elements: Vec<TransactionElement>,
    pub(super) order: Vec<ElementIndex>,
    pub(super) goal: Goal,
    pub(super) installed: Option<Box<dyn InstalledPackages>>,
    pub(super) available: Option<AvailableIndex>,
    pub(super) solve: Option<Box<dyn SolveCallback>>,
    /// Provides of the added elements, keyed by element index
    pub(super) added: AvailableIndex,
    /// db offset -> removal element
    pub(super) removed: HashMap<u32, ElementIndex>,
    pub(super) rpmlib: DependencySet,
    pub(super) problems: ProblemSet,
    pub(super) suggestions: Vec<String>,
    /// dependency string -> installed packages satisfying it
    pub(super) installed_cache: HashMap<String, Vec<InstalledPackage>>,
    /// Solve outcomes with the element that asked
    pub(super) solve_attempts: HashMap<(String, Sense), (SolveAttempt, ElementIndex)>,
    /// Already-checked elements to examine again during the current check
    pub(super) recheck: BTreeSet<usize>,
    pub(super) cycles: Vec<OrderingCycle>,
    pub(super) stop: Arc<AtomicBool>,
}

impl Default for TransactionSet {
    fn default() -> Self {
        Self::with_config(TransactionConfig::default())
    }
}

impl fmt::Debug for TransactionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionSet")
            .field("goal", &self.goal)
            .field("elements", &self.elements.len())
            .field("order", &self.order)
            .field("problems", &self.problems.len())
            .finish()
    }
}

impl TransactionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TransactionConfig) -> Self {
        Self {
            added: AvailableIndex::with_color(config.color),
            config,
            elements: Vec::new(),
            order: Vec::new(),
            goal: Goal::Unknown,
            installed: None,
            available: None,
            solve: None,
            removed: HashMap::new(),
            rpmlib: rpmlib_provides(),
            problems: ProblemSet::new(),
            suggestions: Vec::new(),
            installed_cache: HashMap::new(),
            solve_attempts: HashMap::new(),
            recheck: BTreeSet::new(),
            cycles: Vec::new(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    /// Use `installed` to answer queries about installed packages
    pub fn set_installed(&mut self, installed: Box<dyn InstalledPackages>) {
        self.installed = Some(installed);
        self.installed_cache.clear();
    }

    /// Repository consulted for suggestions when a dependency is unsatisfied
    pub fn set_available(&mut self, available: AvailableIndex) {
        self.available = Some(available);
    }

    /// Hook called for dependencies nothing else satisfies
    pub fn set_solve_callback(&mut self, callback: impl SolveCallback + 'static) {
        self.solve = Some(Box::new(callback));
    }

    /// Flag checked between elements; setting it stops a running check
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub(super) fn stopped(&self) -> bool {
        self.stop.load(AtomicOrdering::Relaxed)
    }

    pub fn goal(&self) -> Goal {
        self.goal
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, index: ElementIndex) -> Option<&TransactionElement> {
        self.elements.get(index.0)
    }

    /// Elements in the order they were added
    pub fn elements(&self) -> impl Iterator<Item = &TransactionElement> {
        self.elements.iter()
    }

    /// Elements in the order computed by the last [`order`](Self::order)
    pub fn ordered_elements(&self) -> impl Iterator<Item = &TransactionElement> {
        self.order.iter().filter_map(|i| self.elements.get(i.0))
    }

    /// Problems found by the last check
    pub fn problems(&self) -> &ProblemSet {
        &self.problems
    }

    /// NEVRAs of repository packages suggested by the last check
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    /// Dependency loops found by the last order
    pub fn ordering_cycles(&self) -> &[OrderingCycle] {
        &self.cycles
    }

    /// Schedule a package for installation
    ///
    /// An element with the same name and arch is replaced when the new
    /// package is newer; otherwise the new package is ignored and `None` is
    /// returned. With `upgrade`, installed packages of the same name and
    /// those matched by the package's Obsoletes are scheduled for removal.
    pub fn add_install(
        &mut self,
        header: Arc<dyn PackageHeader>,
        key: Option<String>,
        relocations: Vec<Relocation>,
        upgrade: bool,
    ) -> Result<Option<ElementIndex>> {
        let te = TransactionElement::new_added(header, key, relocations)?;

        let duplicate = self
            .elements
            .iter()
            .position(|e| e.is_added() && e.same_slot(&te))
            .map(ElementIndex);

        let index = match duplicate {
            Some(existing) => {
                let old = &self.elements[existing.0];
                let newer = te.evr().compare(old.evr(), self.config.added_epoch_policy);
                if newer != Ordering::Greater {
                    debug!("Ignoring {}: {} is already added", te.nevra(), old.nevra());
                    return Ok(None);
                }
                let old_nevra = old.nevra();
                info!("Replacing {} with {}", old_nevra, te.nevra());
                self.problems.retain(|p| {
                    p.package != old_nevra && p.other.as_deref() != Some(old_nevra.as_str())
                });
                self.elements[existing.0] = te;
                existing
            }
            None => {
                let index = ElementIndex(self.elements.len());
                debug!("Adding {} for install as {}", te.nevra(), index);
                self.elements.push(te);
                index
            }
        };

        self.index_added(index);
        if self.goal == Goal::Unknown {
            self.goal = Goal::Install;
        }
        if upgrade {
            self.add_upgrade_erasures(index)?;
        }
        Ok(Some(index))
    }

    /// Schedule an installed package for removal
    ///
    /// Adding the same `db_offset` twice returns the existing element.
    pub fn add_erase(&mut self, header: Arc<dyn PackageHeader>, db_offset: u32) -> Result<ElementIndex> {
        if let Some(&existing) = self.removed.get(&db_offset) {
            debug!("Offset {} is already scheduled for removal", db_offset);
            return Ok(existing);
        }
        let te = TransactionElement::new_removed(header, db_offset)?;
        let index = ElementIndex(self.elements.len());
        debug!("Adding {} for erase as {}", te.nevra(), index);
        self.elements.push(te);
        self.removed.insert(db_offset, index);
        if self.goal == Goal::Unknown {
            self.goal = Goal::Erase;
        }
        Ok(index)
    }

    /// Link a package to the one it supersedes
    ///
    /// `predecessor` records `header` as superseded; `successor` records
    /// `predecessor` as its replacement.
    pub fn chain(
        &mut self,
        predecessor: ElementIndex,
        successor: ElementIndex,
        header: &dyn PackageHeader,
    ) {
        let Some(pred) = self.elements.get(predecessor.0) else {
            return;
        };
        let pred_nevra = pred.nevra();
        let pred_id = pred.header().header_id();
        if let Some(pred) = self.elements.get_mut(predecessor.0) {
            pred.chain_backward(header.nevra(), header.header_id());
        }
        if let Some(succ) = self.elements.get_mut(successor.0) {
            succ.chain_forward(pred_nevra, pred_id);
        }
    }

    fn index_added(&mut self, index: ElementIndex) {
        let te = &self.elements[index.0];
        let provides = te
            .prco()
            .get(DepTag::Provides)
            .cloned()
            .unwrap_or_else(|| Arc::new(DependencySet::new(DepTag::Provides)));
        self.added.add(
            PackageKey(index.0),
            te.nevra(),
            te.color(),
            provides,
            te.files(),
        );
    }

    fn add_upgrade_erasures(&mut self, index: ElementIndex) -> Result<()> {
        let Some(installed) = self.installed.as_ref() else {
            return Ok(());
        };
        let te = &self.elements[index.0];
        let mut erase = Vec::new();

        for pkg in installed.packages_named(te.name())? {
            let arch_ok = match (te.arch(), pkg.header.arch()) {
                (Some(new), Some(old)) => new == old || new == "noarch" || old == "noarch",
                _ => true,
            };
            let color_ok = match (te.color(), pkg.header.header_color()) {
                (0, _) | (_, None) | (_, Some(0)) => true,
                (new, Some(old)) => new & old != 0,
            };
            if arch_ok && color_ok {
                erase.push(pkg);
            }
        }

        let policy = self.config.installed_epoch_policy;
        for obsolete in te.prco().obsoletes() {
            if obsolete.name == te.name() {
                continue;
            }
            for pkg in installed.packages_named(&obsolete.name)? {
                let Some(name) = pkg.header.name() else {
                    continue;
                };
                let this = Dependency::versioned(name, Sense::EQUAL, pkg.header.evr());
                if this.overlaps(obsolete, &crate::version::RpmScheme, policy) {
                    debug!("{} obsoletes installed {}", te.nevra(), pkg.header.nevra());
                    erase.push(pkg);
                }
            }
        }

        for pkg in erase {
            let removal = self.add_erase(Arc::clone(&pkg.header), pkg.offset)?;
            if let Some(te) = self.elements.get_mut(removal.0) {
                te.set_depends_on(index);
            }
            self.chain(index, removal, pkg.header.as_ref());
        }
        Ok(())
    }

    /// Drop the results of check and order, keeping the elements
    pub fn clean(&mut self) {
        self.problems.clear();
        self.suggestions.clear();
        self.installed_cache.clear();
        self.solve_attempts.clear();
        self.recheck.clear();
        self.cycles.clear();
        self.order.clear();
        for te in &mut self.elements {
            te.graph = Default::default();
        }
    }

    /// Drop everything, elements included
    pub fn empty(&mut self) {
        self.clean();
        self.elements.clear();
        self.added.clear();
        self.removed.clear();
        self.goal = Goal::Unknown;
        self.stop.store(false, AtomicOrdering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::MemoryHeader;
    use crate::transaction::installed::MemoryInstalled;

    fn pkg(name: &str, evr: &str) -> Arc<dyn PackageHeader> {
        Arc::new(MemoryHeader::new(name, evr).with_arch("x86_64"))
    }

    #[test]
    fn test_goal_set_by_first_add() {
        let mut ts = TransactionSet::new();
        assert_eq!(ts.goal(), Goal::Unknown);
        ts.add_erase(pkg("foo", "1.0"), 1).unwrap();
        ts.add_install(pkg("bar", "1.0"), None, vec![], false).unwrap();
        assert_eq!(ts.goal(), Goal::Erase);
    }

    #[test]
    fn test_add_install_keeps_newest() {
        let mut ts = TransactionSet::new();
        let first = ts.add_install(pkg("foo", "1.0-1"), Some("a".into()), vec![], false).unwrap();
        assert_eq!(first, Some(ElementIndex(0)));

        let older = ts.add_install(pkg("foo", "0.9-1"), Some("b".into()), vec![], false).unwrap();
        assert_eq!(older, None);
        assert_eq!(ts.element(ElementIndex(0)).unwrap().key(), Some("a"));

        let newer = ts.add_install(pkg("foo", "1.1-1"), Some("c".into()), vec![], false).unwrap();
        assert_eq!(newer, Some(ElementIndex(0)));
        assert_eq!(ts.len(), 1);
        assert_eq!(ts.element(ElementIndex(0)).unwrap().version(), "1.1");
    }

    #[test]
    fn test_other_arch_is_not_a_duplicate() {
        let mut ts = TransactionSet::new();
        ts.add_install(pkg("foo", "1.0"), None, vec![], false).unwrap();
        let i686 = Arc::new(MemoryHeader::new("foo", "1.0").with_arch("i686"));
        assert_eq!(
            ts.add_install(i686, None, vec![], false).unwrap(),
            Some(ElementIndex(1))
        );
    }

    #[test]
    fn test_add_erase_idempotent() {
        let mut ts = TransactionSet::new();
        let a = ts.add_erase(pkg("foo", "1.0"), 7).unwrap();
        let b = ts.add_erase(pkg("foo", "1.0"), 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(ts.len(), 1);
    }

    #[test]
    fn test_upgrade_erases_old_and_obsoleted() {
        let mut installed = MemoryInstalled::new();
        let old = installed.add(pkg("foo", "1.0-1"));
        let legacy = installed.add(pkg("foo-legacy", "0.5-1"));
        installed.add(pkg("unrelated", "1.0"));

        let mut ts = TransactionSet::new();
        ts.set_installed(Box::new(installed));
        let new = Arc::new(
            MemoryHeader::new("foo", "2.0-1")
                .with_arch("x86_64")
                .obsoletes("foo-legacy < 1.0")
                .unwrap(),
        );
        let index = ts.add_install(new, None, vec![], true).unwrap().unwrap();

        assert_eq!(ts.len(), 3);
        let removals: Vec<_> = ts.elements().filter(|e| e.is_removed()).collect();
        assert_eq!(removals.len(), 2);
        assert_eq!(removals[0].db_offset(), Some(old));
        assert_eq!(removals[1].db_offset(), Some(legacy));
        assert!(removals.iter().all(|e| e.depends_on() == Some(index)));
        assert_eq!(removals[0].flink().nevra, vec!["foo-2.0-1.x86_64".to_string()]);

        let added = ts.element(index).unwrap();
        assert_eq!(
            added.blink().nevra,
            vec!["foo-1.0-1.x86_64".to_string(), "foo-legacy-0.5-1.x86_64".to_string()]
        );
    }

    #[test]
    fn test_clean_and_empty() {
        let mut ts = TransactionSet::new();
        ts.add_install(pkg("foo", "1.0"), None, vec![], false).unwrap();
        ts.suggestions.push("bar-1.0".into());
        ts.clean();
        assert!(ts.suggestions().is_empty());
        assert_eq!(ts.len(), 1);

        ts.empty();
        assert!(ts.is_empty());
        assert_eq!(ts.goal(), Goal::Unknown);
        assert!(ts.added.is_empty());
    }

    #[test]
    fn test_stop_handle_shared() {
        let ts = TransactionSet::new();
        let handle = ts.stop_handle();
        handle.store(true, AtomicOrdering::Relaxed);
        assert!(ts.stopped());
    }
}
