// src/transaction/problems.rs

//! Problems reported by checking and ordering

use super::element::ElementIndex;
use crate::deps::{DepTag, Dependency};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What went wrong with a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    /// A Requires has no satisfier
    UnsatisfiedDependency,
    /// A Conflicts matched another package
    DependencyConflict,
}

/// One dependency problem found by a check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub kind: ProblemKind,
    /// NEVRA of the package declaring the dependency
    pub package: String,
    /// Caller key of that package, when it is part of the transaction
    pub key: Option<String>,
    /// The package declaring the dependency is installed, not added
    pub installed: bool,
    pub tag: DepTag,
    pub dependency: Dependency,
    /// NEVRA of the other party of a conflict
    pub other: Option<String>,
    /// Packages from the available repository that would satisfy it
    pub suggestions: Vec<String>,
}

impl Problem {
    pub fn unsatisfied(package: String, dependency: Dependency) -> Self {
        Self {
            kind: ProblemKind::UnsatisfiedDependency,
            package,
            key: None,
            installed: false,
            tag: DepTag::Requires,
            dependency,
            other: None,
            suggestions: Vec::new(),
        }
    }

    pub fn conflict(package: String, dependency: Dependency, other: String) -> Self {
        Self {
            kind: ProblemKind::DependencyConflict,
            package,
            key: None,
            installed: false,
            tag: DepTag::Conflicts,
            dependency,
            other: Some(other),
            suggestions: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: Option<String>) -> Self {
        self.key = key;
        self
    }

    pub fn installed(mut self) -> Self {
        self.installed = true;
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// Dependency rendered with its relation letter, e.g. `R foo >= 1.0`
    pub fn dnevr(&self) -> String {
        self.dependency.dnevr(self.tag)
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            ProblemKind::UnsatisfiedDependency => "is needed by",
            ProblemKind::DependencyConflict => "conflicts with",
        };
        match (self.kind, &self.other) {
            (ProblemKind::DependencyConflict, Some(other)) => {
                write!(f, "{} ({}) {} {}", self.dependency, self.package, verb, other)?
            }
            _ => write!(f, "{} {} {}", self.dependency, verb, self.package)?,
        }
        if self.installed {
            write!(f, " (installed)")?;
        }
        if !self.suggestions.is_empty() {
            write!(f, " [suggested: {}]", self.suggestions.join(", "))?;
        }
        Ok(())
    }
}

/// All problems of one check, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemSet {
    problems: Vec<Problem>,
}

impl ProblemSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a problem unless an identical one is already recorded
    pub fn push(&mut self, problem: Problem) -> bool {
        if self.problems.contains(&problem) {
            return false;
        }
        self.problems.push(problem);
        true
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Problem> {
        self.problems.iter()
    }

    pub fn unsatisfied(&self) -> impl Iterator<Item = &Problem> {
        self.iter()
            .filter(|p| p.kind == ProblemKind::UnsatisfiedDependency)
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &Problem> {
        self.iter()
            .filter(|p| p.kind == ProblemKind::DependencyConflict)
    }

    pub fn clear(&mut self) {
        self.problems.clear();
    }

    /// Keep only the problems matching `keep`
    pub fn retain(&mut self, keep: impl FnMut(&Problem) -> bool) {
        self.problems.retain(keep);
    }
}

impl IntoIterator for ProblemSet {
    type Item = Problem;
    type IntoIter = std::vec::IntoIter<Problem>;

    fn into_iter(self) -> Self::IntoIter {
        self.problems.into_iter()
    }
}

impl<'a> IntoIterator for &'a ProblemSet {
    type Item = &'a Problem;
    type IntoIter = std::slice::Iter<'a, Problem>;

    fn into_iter(self) -> Self::IntoIter {
        self.problems.iter()
    }
}

impl fmt::Display for ProblemSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for problem in &self.problems {
            writeln!(f, "\t{}", problem)?;
        }
        Ok(())
    }
}

/// A group of elements that depend on each other in a loop
///
/// Ordering still succeeds; the loop was broken somewhere inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingCycle {
    pub members: Vec<ElementIndex>,
    pub nevras: Vec<String>,
    /// Number of edges inside the loop coming from prerequisite requires
    pub prereq_edges: usize,
}

impl fmt::Display for OrderingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LOOP: {}", self.nevras.join(" -> "))?;
        if let Some(first) = self.nevras.first() {
            write!(f, " -> {}", first)?;
        }
        if self.prereq_edges > 0 {
            write!(f, " ({} prerequisite edges)", self.prereq_edges)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsatisfied_display() {
        let dep = Dependency::parse("libfoo >= 2.0").unwrap();
        let p = Problem::unsatisfied("bar-1.0-1.x86_64".to_string(), dep);
        assert_eq!(p.to_string(), "libfoo >= 2.0 is needed by bar-1.0-1.x86_64");
        assert_eq!(p.dnevr(), "R libfoo >= 2.0");

        let p = p.installed().with_suggestions(vec!["libfoo-2.1-1.x86_64".to_string()]);
        assert_eq!(
            p.to_string(),
            "libfoo >= 2.0 is needed by bar-1.0-1.x86_64 (installed) [suggested: libfoo-2.1-1.x86_64]"
        );
    }

    #[test]
    fn test_conflict_display() {
        let dep = Dependency::parse("sendmail").unwrap();
        let p = Problem::conflict("postfix-3.8-1".to_string(), dep, "sendmail-8.17-1".to_string());
        assert_eq!(p.to_string(), "sendmail (postfix-3.8-1) conflicts with sendmail-8.17-1");
        assert_eq!(p.dnevr(), "C sendmail");
    }

    #[test]
    fn test_problem_set_dedup() {
        let mut set = ProblemSet::new();
        let dep = Dependency::name_only("foo");
        assert!(set.push(Problem::unsatisfied("a-1".into(), dep.clone())));
        assert!(!set.push(Problem::unsatisfied("a-1".into(), dep.clone())));
        assert!(set.push(Problem::conflict("a-1".into(), dep, "b-1".into())));
        assert_eq!(set.len(), 2);
        assert_eq!(set.unsatisfied().count(), 1);
        assert_eq!(set.conflicts().count(), 1);
        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn test_cycle_display() {
        let cycle = OrderingCycle {
            members: vec![ElementIndex(0), ElementIndex(1)],
            nevras: vec!["a-1".into(), "b-1".into()],
            prereq_edges: 1,
        };
        assert_eq!(cycle.to_string(), "LOOP: a-1 -> b-1 -> a-1 (1 prerequisite edges)");
    }
}
