// src/transaction/check.rs

//! Dependency checking
//!
//! Each Requires of an added element is looked up in order: the element's
//! own provides, the other added elements, the installed packages not being
//! erased, the available repository (suggestions only) and finally the
//! solve callback. Conflicts use the same lookup with a hit as the failure.

use super::available::PackageKey;
use super::element::ElementIndex;
use super::installed::InstalledPackage;
use super::problems::{Problem, ProblemSet};
use super::set::{Satisfier, SolveAttempt, SolveResult, TransactionSet};
use crate::deps::{DepTag, Dependency};
use crate::error::Result;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Result of resolving one Requires
enum Resolution {
    Satisfied,
    Unsatisfied(Vec<String>),
    /// Unsatisfied, and a previous solve attempt for it already failed
    Abort(Vec<String>),
}

impl TransactionSet {
    /// Check every element's dependencies
    ///
    /// All problems are collected; `Err` is reserved for failures of the
    /// installed-package lookup.
    pub fn check(&mut self) -> Result<ProblemSet> {
        self.problems.clear();
        self.suggestions.clear();
        self.solve_attempts.clear();
        self.recheck.clear();
        info!("Checking {} transaction elements", self.elements.len());

        // Elements are taken in input order; rechecks of earlier elements
        // go first, so a solved replacement is examined before moving on.
        let mut next = 0;
        loop {
            let index = match self.recheck.pop_first() {
                Some(index) => index,
                None if next < self.elements.len() => {
                    next += 1;
                    next - 1
                }
                None => break,
            };
            if self.stopped() {
                warn!("Dependency check interrupted after {} elements", next);
                break;
            }
            let abort = if self.elements[index].is_added() {
                self.check_added(ElementIndex(index))?
            } else {
                self.check_removed(ElementIndex(index))?;
                false
            };
            if abort {
                warn!("Stopping check: a dependency of {} cannot be solved", self.elements[index]);
                break;
            }
        }

        info!("Check found {} problems", self.problems.len());
        Ok(self.problems.clone())
    }

    fn check_added(&mut self, index: ElementIndex) -> Result<bool> {
        let te = &self.elements[index.0];
        let nevra = te.nevra();
        let key = te.key().map(str::to_string);
        let requires = te.prco().requires().to_vec();
        let conflicts = te.prco().conflicts().to_vec();
        let provides = te.prco().provides().to_vec();
        debug!("Checking {} ({} requires)", nevra, requires.len());
        self.problems
            .retain(|p| p.installed || p.package != nevra || p.key != key);

        let mut abort = false;
        for dep in requires {
            if !self.config.color_matches(dep.color) {
                continue;
            }
            let problem = |suggestions| {
                Problem::unsatisfied(nevra.clone(), dep.clone())
                    .with_key(key.clone())
                    .with_suggestions(suggestions)
            };
            match self.resolve_requires(index, &dep)? {
                Resolution::Satisfied => {}
                Resolution::Unsatisfied(suggestions) => {
                    self.problems.push(problem(suggestions));
                }
                Resolution::Abort(suggestions) => {
                    self.problems.push(problem(suggestions));
                    abort = true;
                }
            }
        }

        if self.config.check_conflicts {
            for dep in conflicts {
                if !self.config.color_matches(dep.color) {
                    continue;
                }
                for other in self.conflicting_parties(index, &dep)? {
                    debug!("{} conflicts with {}", nevra, other);
                    self.problems.push(
                        Problem::conflict(nevra.clone(), dep.clone(), other).with_key(key.clone()),
                    );
                }
            }
        }

        if self.config.check_installed_conflicts {
            self.check_installed_conflicts(&nevra, &key, &provides)?;
        }

        Ok(abort)
    }

    /// Installed packages whose Conflicts match a provide of an added package
    fn check_installed_conflicts(
        &mut self,
        nevra: &str,
        key: &Option<String>,
        provides: &[Dependency],
    ) -> Result<()> {
        let Some(installed) = self.installed.as_ref() else {
            return Ok(());
        };
        let policy = self.config.installed_epoch_policy;
        let names: HashSet<&str> = provides.iter().map(|p| p.name.as_str()).collect();
        let mut found = Vec::new();

        for name in names {
            for pkg in installed.packages_conflicting(name)? {
                if self.removed.contains_key(&pkg.offset) {
                    continue;
                }
                for conflict in pkg.conflicts().into_iter().filter(|c| c.name == name) {
                    let hit = provides
                        .iter()
                        .filter(|p| p.name == name)
                        .any(|p| p.overlaps(&conflict, &crate::version::RpmScheme, policy));
                    if hit {
                        found.push(
                            Problem::conflict(pkg.header.nevra(), conflict, nevra.to_string())
                                .with_key(key.clone())
                                .installed(),
                        );
                    }
                }
            }
        }

        for problem in found {
            self.problems.push(problem);
        }
        Ok(())
    }

    /// Installed packages left requiring something only this removal provided
    fn check_removed(&mut self, index: ElementIndex) -> Result<()> {
        let te = &self.elements[index.0];
        let mut capabilities: Vec<String> = te
            .prco()
            .provides()
            .iter()
            .map(|p| p.name.clone())
            .collect();
        capabilities.extend(te.files().iter().cloned());
        capabilities.sort();
        capabilities.dedup();
        let provides = te.prco().get(DepTag::Provides).cloned();
        let files: HashSet<String> = te.files().iter().cloned().collect();
        debug!("Checking removal of {}", te.nevra());

        let policy = self.config.installed_epoch_policy;
        let mut requirers = Vec::new();
        if let Some(installed) = self.installed.as_ref() {
            for name in &capabilities {
                for pkg in installed.packages_requiring(name)? {
                    if !self.removed.contains_key(&pkg.offset) {
                        requirers.push((name.clone(), pkg));
                    }
                }
            }
        }

        for (name, pkg) in requirers {
            for dep in pkg.requires().into_iter().filter(|d| d.name == name) {
                if !self.config.color_matches(dep.color) {
                    continue;
                }
                let provided_here = files.contains(&dep.name)
                    || provides
                        .as_ref()
                        .is_some_and(|set| set.any_matches(&dep, policy));
                if !provided_here {
                    continue;
                }
                if self.find_satisfier(None, &dep)?.is_none() {
                    self.problems
                        .push(Problem::unsatisfied(pkg.header.nevra(), dep).installed());
                }
            }
        }
        Ok(())
    }

    fn resolve_requires(&mut self, index: ElementIndex, dep: &Dependency) -> Result<Resolution> {
        if self.find_satisfier(Some(index), dep)?.is_some() {
            return Ok(Resolution::Satisfied);
        }

        let suggestions = self.suggest(dep);

        if self.solve.is_none() {
            return Ok(Resolution::Unsatisfied(suggestions));
        }

        let attempt_key = (dep.name.clone(), dep.sense);
        if let Some(&(previous, asked_by)) = self.solve_attempts.get(&attempt_key) {
            debug!("Not solving {} again (previously {:?})", dep, previous);
            return Ok(match previous {
                // The same element examined again is not a new failure
                _ if asked_by == index => Resolution::Unsatisfied(suggestions),
                SolveAttempt::Unresolved | SolveAttempt::Resolved => Resolution::Abort(suggestions),
                SolveAttempt::Deferred => Resolution::Unsatisfied(suggestions),
            });
        }

        let Some(mut callback) = self.solve.take() else {
            return Ok(Resolution::Unsatisfied(suggestions));
        };
        let answer = callback.solve(dep);
        self.solve = Some(callback);

        let outcome = match answer {
            SolveResult::Resolved(header) => {
                info!("Solved {} with {}", dep, header.nevra());
                let existing = self.elements.len();
                if let Some(added) = self.add_install(header, None, Vec::new(), false)? {
                    if added.0 < existing {
                        // Replaced in place: everything examined so far may
                        // have leaned on the old package
                        debug!("{} replaced an element, rechecking up to {}", added, index);
                        self.recheck.extend(0..=index.0.max(added.0));
                    }
                }
                if self.find_satisfier(Some(index), dep)?.is_some() {
                    (SolveAttempt::Resolved, Resolution::Satisfied)
                } else {
                    warn!("Package added for {} does not satisfy it", dep);
                    (SolveAttempt::Unresolved, Resolution::Unsatisfied(suggestions))
                }
            }
            SolveResult::Unresolved => {
                debug!("Solve callback could not resolve {}", dep);
                (SolveAttempt::Unresolved, Resolution::Unsatisfied(suggestions))
            }
            SolveResult::Defer => {
                debug!("Solve callback deferred {}", dep);
                (SolveAttempt::Deferred, Resolution::Unsatisfied(suggestions))
            }
        };
        self.solve_attempts.insert(attempt_key, (outcome.0, index));
        Ok(outcome.1)
    }

    /// Record repository packages that would satisfy `dep`
    fn suggest(&mut self, dep: &Dependency) -> Vec<String> {
        if !self.config.suggest {
            return Vec::new();
        }
        let Some(available) = self.available.as_ref() else {
            return Vec::new();
        };
        let Some(found) = available.satisfier(
            dep,
            self.config.added_epoch_policy,
            self.config.preferred_color,
        ) else {
            return Vec::new();
        };
        let Some(nevra) = available.nevra(found).map(str::to_string) else {
            return Vec::new();
        };
        info!("Suggesting {} for {}", nevra, dep);
        if !self.suggestions.contains(&nevra) {
            self.suggestions.push(nevra.clone());
        }
        vec![nevra]
    }

    /// Look `dep` up in the transaction and among installed packages
    ///
    /// `requirer` is the element declaring the dependency; its own provides
    /// are tried first.
    pub(super) fn find_satisfier(
        &mut self,
        requirer: Option<ElementIndex>,
        dep: &Dependency,
    ) -> Result<Option<Satisfier>> {
        let added_policy = self.config.added_epoch_policy;

        if dep.is_rpmlib() && self.config.use_rpmlib_provides {
            return Ok(self
                .rpmlib
                .any_matches(dep, added_policy)
                .then_some(Satisfier::Rpmlib));
        }

        if let Some(index) = requirer {
            let te = &self.elements[index.0];
            let own = te
                .prco()
                .get(DepTag::Provides)
                .is_some_and(|p| p.any_matches(dep, added_policy))
                || (dep.is_file() && te.files().iter().any(|f| *f == dep.name));
            if own {
                return Ok(Some(Satisfier::Added(index)));
            }
        }

        if let Some(PackageKey(key)) =
            self.added
                .satisfier(dep, added_policy, self.config.preferred_color)
        {
            return Ok(Some(Satisfier::Added(ElementIndex(key))));
        }

        let installed = self.installed_satisfiers(dep)?;
        Ok(installed
            .iter()
            .find(|pkg| !self.removed.contains_key(&pkg.offset))
            .map(|pkg| Satisfier::Installed(pkg.offset)))
    }

    /// Installed packages satisfying `dep`, cached per dependency string
    fn installed_satisfiers(&mut self, dep: &Dependency) -> Result<Vec<InstalledPackage>> {
        let cache_key = dep.to_string();
        if let Some(cached) = self.installed_cache.get(&cache_key) {
            return Ok(cached.clone());
        }
        let Some(installed) = self.installed.as_ref() else {
            return Ok(Vec::new());
        };
        let policy = self.config.installed_epoch_policy;
        let found: Vec<InstalledPackage> = installed
            .packages_providing(dep)?
            .into_iter()
            .filter(|pkg| pkg.satisfies(dep, policy))
            .collect();
        self.installed_cache.insert(cache_key, found.clone());
        Ok(found)
    }

    /// Parties matched by a Conflicts of the element at `index`
    fn conflicting_parties(&mut self, index: ElementIndex, dep: &Dependency) -> Result<Vec<String>> {
        let policy = self.config.added_epoch_policy;
        let mut parties: Vec<String> = self
            .added
            .all_satisfiers(dep, policy)
            .into_iter()
            .filter(|k| k.0 != index.0)
            .filter_map(|k| self.elements.get(k.0).map(|e| e.nevra()))
            .collect();

        for pkg in self.installed_satisfiers(dep)? {
            if self.removed.contains_key(&pkg.offset) {
                continue;
            }
            parties.push(pkg.header.nevra());
        }
        Ok(parties)
    }
}
