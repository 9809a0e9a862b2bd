// src/error.rs

use thiserror::Error;

/// Core error types for rpmsolve
///
/// Dependency problems found by a check are not errors; they are reported
/// through [`crate::transaction::ProblemSet`]. This enum covers failures of
/// the collaborators (database, files, metadata records) and strict parsing.
#[derive(Error, Debug)]
pub enum Error {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database initialization error
    #[error("Failed to initialize database: {0}")]
    InitError(String),

    /// Database not found
    #[error("Database not found at path: {0}")]
    DatabaseNotFound(String),

    /// Malformed version, dependency string or repository metadata
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A metadata record lacks a mandatory tag
    #[error("Invalid package metadata: {0}")]
    InvalidMetadata(String),

    /// Failure reported by the rpm package reader
    #[error("RPM error: {0}")]
    Rpm(String),
}

/// Result type alias using rpmsolve's Error type
pub type Result<T> = std::result::Result<T, Error>;
