// src/lib.rs

//! rpmsolve
//!
//! Dependency checking and transaction ordering for RPM packages.
//!
//! # Architecture
//!
//! - Versions: rpmvercmp and EVR comparison with explicit epoch policies
//! - Dependency sets: sorted Provides/Requires/Conflicts/Obsoletes with range overlap
//! - Transaction sets: install/erase elements checked against each other,
//!   the installed database, an available repository and a solve callback
//! - Ordering: prerequisite-aware topological sort with loop breaking
//! - Installed database: SQLite store of installed package headers

pub mod config;
pub mod db;
pub mod deps;
mod error;
pub mod packages;
pub mod repository;
pub mod transaction;
pub mod version;

pub use error::{Error, Result};
