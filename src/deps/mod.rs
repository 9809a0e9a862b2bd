// src/deps/mod.rs

//! Dependencies, dependency sets and per-package PRCO containers
//!
//! - [`Dependency`]: one `(name, EVR, flags)` entry and the range overlap test
//! - [`DependencySet`]: sorted collection with find/search/merge
//! - [`Prco`]: the Provides/Requires/Conflicts/Obsoletes/... slots of a package

mod dependency;
mod flags;
mod prco;
mod rpmlib;
mod set;

pub use dependency::{DepTag, Dependency};
pub use flags::{join_rpm_flags, split_rpm_flags, DepContext, Sense};
pub use prco::Prco;
pub use rpmlib::rpmlib_provides;
pub use set::{compare, DependencySet};
