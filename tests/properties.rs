// tests/properties.rs

//! Property tests for version comparison, dependency sets and ordering

use proptest::prelude::*;
use proptest::string::string_regex;
use rpmsolve::deps::{compare, DepTag, Dependency, DependencySet, Sense};
use rpmsolve::packages::MemoryHeader;
use rpmsolve::transaction::TransactionSet;
use rpmsolve::version::{vercmp, EpochPolicy, Evr};
use std::cmp::Ordering;
use std::sync::Arc;

const SENSES: [Sense; 5] = [Sense::LESS, Sense::LE, Sense::EQUAL, Sense::GE, Sense::GREATER];

fn version_string() -> impl Strategy<Value = String> {
    string_regex("[0-9a-z~^.+_]{0,12}").unwrap()
}

fn numeric_version() -> impl Strategy<Value = String> {
    string_regex("[0-9]{1,3}(\\.[0-9]{1,3}){0,3}").unwrap()
}

/// `[E:]V[-R]` strings, sometimes with an explicit zero epoch
fn evr_string() -> impl Strategy<Value = String> {
    (
        prop::option::of(0u32..4),
        numeric_version(),
        prop::option::of(string_regex("[0-9a-z~^.]{1,6}").unwrap()),
    )
        .prop_map(|(epoch, version, release)| {
            let mut s = String::new();
            if let Some(epoch) = epoch {
                s.push_str(&format!("{}:", epoch));
            }
            s.push_str(&version);
            if let Some(release) = release {
                s.push('-');
                s.push_str(&release);
            }
            s
        })
}

fn sense() -> impl Strategy<Value = Sense> {
    prop::sample::select(SENSES.to_vec())
}

fn dependency() -> impl Strategy<Value = Dependency> {
    (prop::sample::select(vec!["a", "b", "c", "d"]), sense(), 0u32..5).prop_map(
        |(name, sense, version)| {
            Dependency::versioned(name, sense, Evr::parse(&version.to_string()))
        },
    )
}

fn dependency_set() -> impl Strategy<Value = DependencySet> {
    prop::collection::vec(dependency(), 0..8)
        .prop_map(|deps| DependencySet::from_deps(DepTag::Requires, deps))
}

fn merged(a: &DependencySet, b: &DependencySet) -> DependencySet {
    let mut out = a.clone();
    out.merge(b);
    out
}

fn rendered(set: &DependencySet) -> Vec<String> {
    set.iter().map(|d| d.to_string()).collect()
}

/// Does the point `x` (in half units) lie in the range `sense n`?
fn in_range(x: i32, sense: Sense, n: i32) -> bool {
    let n = n * 2;
    (x < n && sense.contains(Sense::LESS))
        || (x == n && sense.contains(Sense::EQUAL))
        || (x > n && sense.contains(Sense::GREATER))
}

/// Edges `i requires j` with `j > i`, which can never form a loop
fn acyclic_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..8).prop_flat_map(|n| {
        let edges = prop::collection::vec((0..n, 0..n), 0..12).prop_map(|pairs| {
            pairs
                .into_iter()
                .filter(|(i, j)| i < j)
                .collect::<Vec<_>>()
        });
        (Just(n), edges)
    })
}

fn any_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..8).prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n), 0..16)))
}

fn transaction(n: usize, edges: &[(usize, usize)]) -> TransactionSet {
    let mut ts = TransactionSet::new();
    for i in 0..n {
        let mut header = MemoryHeader::new(format!("p{}", i), "1.0-1");
        for &(from, to) in edges {
            if from == i && to != i {
                header = header.requires(&format!("p{}", to)).unwrap();
            }
        }
        ts.add_install(Arc::new(header), None, Vec::new(), false)
            .unwrap()
            .unwrap();
    }
    ts
}

proptest! {
    #[test]
    fn vercmp_is_reflexive(a in version_string()) {
        prop_assert_eq!(vercmp(&a, &a), Ordering::Equal);
    }

    #[test]
    fn vercmp_is_antisymmetric(a in version_string(), b in version_string()) {
        prop_assert_eq!(vercmp(&a, &b), vercmp(&b, &a).reverse());
    }

    #[test]
    fn evr_compare_is_reflexive_and_antisymmetric(a in evr_string(), b in evr_string()) {
        let (a, b) = (Evr::parse(&a), Evr::parse(&b));
        for policy in [EpochPolicy::Promote, EpochPolicy::Skip] {
            prop_assert_eq!(a.compare(&a, policy), Ordering::Equal);
            prop_assert_eq!(a.compare(&b, policy), b.compare(&a, policy).reverse());
        }
    }

    #[test]
    fn extra_segment_is_newer(v in numeric_version()) {
        prop_assert_eq!(vercmp(&format!("{}.0", v), &v), Ordering::Greater);
    }

    #[test]
    fn merge_is_associative(a in dependency_set(), b in dependency_set(), c in dependency_set()) {
        let left = merged(&merged(&a, &b), &c);
        let right = merged(&a, &merged(&b, &c));
        prop_assert_eq!(rendered(&left), rendered(&right));
        prop_assert!(left.is_sorted());
    }

    #[test]
    fn overlap_matches_interval_oracle(
        sa in sense(), na in 0i32..10,
        sb in sense(), nb in 0i32..10
    ) {
        let a = Dependency::versioned("x", sa, Evr::parse(&na.to_string()));
        let b = Dependency::versioned("x", sb, Evr::parse(&nb.to_string()));
        let oracle = (-2..=22).any(|x| in_range(x, sa, na) && in_range(x, sb, nb));
        prop_assert_eq!(compare(&a, &b, EpochPolicy::Skip), oracle);
        prop_assert_eq!(compare(&b, &a, EpochPolicy::Skip), oracle);
    }

    #[test]
    fn order_respects_requirements((n, edges) in acyclic_graph()) {
        let mut ts = transaction(n, &edges);
        let order = ts.order();
        prop_assert!(ts.ordering_cycles().is_empty());

        let position = |i: usize| order.iter().position(|e| e.index() == i).unwrap();
        for &(from, to) in &edges {
            prop_assert!(position(to) < position(from), "p{} must precede p{}", to, from);
        }
    }

    #[test]
    fn order_is_a_permutation((n, edges) in any_graph()) {
        let mut ts = transaction(n, &edges);
        let mut order: Vec<usize> = ts.order().into_iter().map(|e| e.index()).collect();
        order.sort_unstable();
        prop_assert_eq!(order, (0..n).collect::<Vec<_>>());
    }
}
