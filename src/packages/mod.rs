// src/packages/mod.rs

//! Package metadata records
//!
//! The engine reads packages through the [`PackageHeader`] trait. Records
//! come from `.rpm` files ([`rpm::RpmPackage`]), repository metadata or the
//! installed database ([`MemoryHeader`]).

mod header;
mod memory;
pub mod rpm;

pub use header::{PackageHeader, RawDependency, Tag, TagValue};
pub use memory::MemoryHeader;
