// src/transaction/order.rs

//! Install/erase ordering
//!
//! Elements are sorted topologically over "must come before" edges taken
//! from satisfied Requires. Ties go to the lowest input index so the same
//! input always produces the same order. Loops are broken by forcing the
//! element with the fewest unmet predecessors and reported as
//! [`OrderingCycle`]s.

use super::element::{ElementIndex, GraphInfo};
use super::problems::OrderingCycle;
use super::set::TransactionSet;
use crate::deps::{DepContext, DepTag, Dependency};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use tracing::{debug, info, warn};

/// successors[b][a] = prerequisite flag of the edge "b before a"
type Successors = Vec<BTreeMap<usize, bool>>;

impl TransactionSet {
    /// Compute the install/erase order
    ///
    /// Never fails: loops are broken and recorded, see
    /// [`ordering_cycles`](Self::ordering_cycles).
    pub fn order(&mut self) -> Vec<ElementIndex> {
        let n = self.elements.len();
        info!("Ordering {} transaction elements", n);

        let successors = self.build_edges();
        let mut predecessors = vec![0i32; n];
        for succ in &successors {
            for &after in succ.keys() {
                predecessors[after] += 1;
            }
        }

        let mut graph: Vec<GraphInfo> = (0..n)
            .map(|i| GraphInfo {
                predecessor_count: predecessors[i],
                successors: successors[i].keys().map(|&s| ElementIndex(s)).collect(),
                ..GraphInfo::default()
            })
            .collect();

        let mut remaining = predecessors;
        let mut placed = vec![false; n];
        let mut order = Vec::with_capacity(n);
        let mut heap = BinaryHeap::new();
        let mut trees = 0;

        for i in 0..n {
            if remaining[i] == 0 {
                graph[i].tree_id = trees;
                trees += 1;
                heap.push(Reverse(i));
            }
        }

        loop {
            while let Some(Reverse(i)) = heap.pop() {
                if placed[i] {
                    continue;
                }
                placed[i] = true;
                order.push(i);
                for &after in successors[i].keys() {
                    if placed[after] || remaining[after] == 0 {
                        continue;
                    }
                    remaining[after] -= 1;
                    if remaining[after] == 0 {
                        graph[after].parent = Some(ElementIndex(i));
                        graph[after].tree_id = graph[i].tree_id;
                        graph[after].depth = graph[i].depth + 1;
                        heap.push(Reverse(after));
                    }
                }
            }

            if order.len() == n {
                break;
            }

            let Some(forced) = (0..n)
                .filter(|&i| !placed[i])
                .min_by_key(|&i| (remaining[i], i))
            else {
                break;
            };
            warn!(
                "Ordering loop: placing {} with {} unmet predecessors",
                self.elements[forced].nevra(),
                remaining[forced]
            );
            remaining[forced] = 0;
            graph[forced].tree_id = trees;
            trees += 1;
            heap.push(Reverse(forced));
        }

        let mut per_depth: BTreeMap<i32, i32> = BTreeMap::new();
        for &i in &order {
            let slot = per_depth.entry(graph[i].depth).or_insert(0);
            graph[i].breadth = *slot;
            *slot += 1;
        }

        for (te, info) in self.elements.iter_mut().zip(graph) {
            te.graph = info;
        }

        self.cycles = self.find_cycles(&successors);
        for cycle in &self.cycles {
            warn!("{}", cycle);
        }

        self.order = order.into_iter().map(ElementIndex).collect();
        debug!("Order: {:?}", self.order);
        self.order.clone()
    }

    fn build_edges(&self) -> Successors {
        let n = self.elements.len();
        let mut successors: Successors = vec![BTreeMap::new(); n];
        let mut edge = |before: usize, after: usize, prereq: bool| {
            if before != after {
                *successors[before].entry(after).or_insert(false) |= prereq;
            }
        };

        let removals: Vec<usize> = self
            .elements
            .iter()
            .enumerate()
            .filter(|(_, te)| te.is_removed())
            .map(|(i, _)| i)
            .collect();

        for (i, te) in self.elements.iter().enumerate() {
            let index = ElementIndex(i);
            for dep in te.prco().requires() {
                if dep.is_rpmlib() || !self.config.color_matches(dep.color) {
                    continue;
                }
                if te.is_added() {
                    if let Some(provider) = self.added_provider(index, dep) {
                        let prereq = dep.context.intersects(DepContext::INSTALL_PREREQ);
                        edge(provider, i, prereq);
                    }
                } else {
                    // An erased package goes before the erased packages it requires
                    let prereq = dep.context.intersects(DepContext::ERASE_PREREQ);
                    for &other in &removals {
                        if other != i && self.removal_provides(other, dep) {
                            edge(i, other, prereq);
                        }
                    }
                }
            }
            if let Some(replacement) = te.depends_on() {
                edge(replacement.0, i, false);
            }
        }
        successors
    }

    /// Added element other than `requirer` that satisfies `dep`
    fn added_provider(&self, requirer: ElementIndex, dep: &Dependency) -> Option<usize> {
        let policy = self.config.added_epoch_policy;
        let te = &self.elements[requirer.0];
        let own = te
            .prco()
            .get(DepTag::Provides)
            .is_some_and(|p| p.any_matches(dep, policy))
            || (dep.is_file() && te.files().iter().any(|f| *f == dep.name));
        if own {
            return None;
        }
        self.added
            .satisfier(dep, policy, self.config.preferred_color)
            .map(|k| k.0)
    }

    fn removal_provides(&self, index: usize, dep: &Dependency) -> bool {
        let te = &self.elements[index];
        te.prco()
            .get(DepTag::Provides)
            .is_some_and(|p| p.any_matches(dep, self.config.installed_epoch_policy))
            || (dep.is_file() && te.files().iter().any(|f| *f == dep.name))
    }

    fn find_cycles(&self, successors: &Successors) -> Vec<OrderingCycle> {
        let adjacency: Vec<Vec<usize>> = successors
            .iter()
            .map(|s| s.keys().copied().collect())
            .collect();

        let mut cycles: Vec<OrderingCycle> = strongly_connected(&adjacency)
            .into_iter()
            .filter(|members| members.len() > 1)
            .map(|mut members| {
                members.sort_unstable();
                let prereq_edges = members
                    .iter()
                    .flat_map(|&m| successors[m].iter())
                    .filter(|(after, prereq)| **prereq && members.binary_search(*after).is_ok())
                    .count();
                OrderingCycle {
                    nevras: members.iter().map(|&m| self.elements[m].nevra()).collect(),
                    members: members.into_iter().map(ElementIndex).collect(),
                    prereq_edges,
                }
            })
            .collect();
        cycles.sort_by_key(|c| c.members.first().copied());
        cycles
    }
}

/// Strongly connected components (Tarjan), iterative
fn strongly_connected(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    const UNVISITED: usize = usize::MAX;
    let n = adjacency.len();
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0; n];
    let mut on_stack = vec![false; n];
    let mut stack = Vec::new();
    let mut next = 0;
    let mut components = Vec::new();

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        let mut work = vec![(root, 0usize)];
        while let Some((v, pos)) = work.pop() {
            if pos == 0 {
                index[v] = next;
                lowlink[v] = next;
                next += 1;
                stack.push(v);
                on_stack[v] = true;
            }
            if let Some(&w) = adjacency[v].get(pos) {
                work.push((v, pos + 1));
                if index[w] == UNVISITED {
                    work.push((w, 0));
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w]);
                }
                continue;
            }
            if lowlink[v] == index[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                components.push(component);
            }
            if let Some(&(parent, _)) = work.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[v]);
            }
        }
    }
    components
}
