// src/db/schema.rs

//! Schema definitions and migrations for the installed-package database

use crate::error::{Error, Result};
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Initialize the schema version tracking table
fn init_schema_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    init_schema_version(conn)?;

    let version = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Apply all pending migrations to bring the database up to date
pub fn migrate(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    debug!("Current schema version: {}", current_version);

    if current_version >= SCHEMA_VERSION {
        debug!("Schema is up to date");
        return Ok(());
    }

    for version in (current_version + 1)..=SCHEMA_VERSION {
        info!("Applying migration to version {}", version);
        apply_migration(conn, version)?;
        set_schema_version(conn, version)?;
    }

    info!("Schema migration complete. Now at version {}", SCHEMA_VERSION);
    Ok(())
}

fn apply_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        2 => migrate_v2(conn),
        _ => Err(Error::InitError(format!("Unknown migration version: {}", version))),
    }
}

/// Initial schema - Version 1
///
/// - packages: one row per installed package; the row id is its offset
/// - dependencies: provides/requires/conflicts/obsoletes/triggers in header order
/// - files: file list with colors and link targets
fn migrate_v1(conn: &Connection) -> Result<()> {
    debug!("Creating schema version 1");

    conn.execute_batch(
        "
        CREATE TABLE packages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            epoch INTEGER,
            version TEXT NOT NULL,
            release TEXT,
            arch TEXT,
            os TEXT,
            header_id TEXT,
            header_color INTEGER,
            installed_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX idx_packages_name ON packages(name);

        CREATE TABLE dependencies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            package_id INTEGER NOT NULL,
            kind TEXT NOT NULL CHECK(kind IN ('provides', 'requires', 'conflicts', 'obsoletes', 'triggers')),
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            version TEXT NOT NULL DEFAULT '',
            flags INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_dependencies_package ON dependencies(package_id);

        CREATE TABLE files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            package_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            path TEXT NOT NULL,
            color INTEGER NOT NULL DEFAULT 0,
            linkto TEXT NOT NULL DEFAULT '',
            FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_files_package ON files(package_id);
        ",
    )?;

    info!("Schema version 1 created successfully");
    Ok(())
}

/// Version 2: capability lookup indexes and the file dependency dictionary
fn migrate_v2(conn: &Connection) -> Result<()> {
    debug!("Migrating to schema version 2");

    conn.execute_batch(
        "
        CREATE INDEX idx_dependencies_kind_name ON dependencies(kind, name);
        CREATE INDEX idx_files_path ON files(path);

        -- JSON arrays: per-file dictionary start/count and the dictionary itself
        ALTER TABLE packages ADD COLUMN file_depends_x TEXT NOT NULL DEFAULT '[]';
        ALTER TABLE packages ADD COLUMN file_depends_n TEXT NOT NULL DEFAULT '[]';
        ALTER TABLE packages ADD COLUMN depends_dict TEXT NOT NULL DEFAULT '[]';
        ",
    )?;

    info!("Schema version 2 applied successfully");
    Ok(())
}
