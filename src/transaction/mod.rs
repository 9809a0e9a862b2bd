// src/transaction/mod.rs

//! Transaction sets
//!
//! A [`TransactionSet`] owns the [`TransactionElement`]s to install and
//! erase. Elements refer to each other by [`ElementIndex`] only.
//!
//! - `check()` reports unsatisfied Requires and matched Conflicts
//! - `order()` sorts the elements so dependencies come first

mod available;
mod check;
mod element;
mod installed;
mod order;
mod problems;
mod set;

pub use available::{AvailableIndex, PackageKey};
pub use element::{
    relocate_files, ChainLink, ElementIndex, ElementKind, GraphInfo, Relocation,
    TransactionElement,
};
pub use installed::{InstalledPackage, InstalledPackages, MemoryInstalled};
pub use problems::{OrderingCycle, Problem, ProblemKind, ProblemSet};
pub use set::{Goal, SolveCallback, SolveResult, TransactionSet};
