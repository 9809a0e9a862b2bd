// src/db/models.rs

//! Rows of the installed-package database
//!
//! Each struct mirrors one table and carries the queries run against it.

use crate::deps::DepTag;
use crate::error::{Error, Result};
use crate::packages::RawDependency;
use rusqlite::{params, Connection, OptionalExtension, Row};

const PACKAGE_COLUMNS: &str = "id, name, epoch, version, release, arch, os, header_id, header_color, \
     installed_at, file_depends_x, file_depends_n, depends_dict";

/// An installed package
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageRecord {
    pub id: Option<i64>,
    pub name: String,
    pub epoch: Option<u64>,
    pub version: String,
    pub release: Option<String>,
    pub arch: Option<String>,
    pub os: Option<String>,
    pub header_id: Option<String>,
    pub header_color: Option<u32>,
    pub installed_at: Option<String>,
    pub file_depends_x: Vec<u32>,
    pub file_depends_n: Vec<u32>,
    pub depends_dict: Vec<u32>,
}

impl PackageRecord {
    /// Insert this package into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        let epoch = self
            .epoch
            .map(|e| {
                i64::try_from(e)
                    .map_err(|_| Error::InvalidMetadata(format!("epoch {} of {} out of range", e, self.name)))
            })
            .transpose()?;
        conn.execute(
            "INSERT INTO packages (name, epoch, version, release, arch, os, header_id, header_color,
                                   file_depends_x, file_depends_n, depends_dict)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                &self.name,
                epoch,
                &self.version,
                &self.release,
                &self.arch,
                &self.os,
                &self.header_id,
                self.header_color,
                ints_to_json(&self.file_depends_x),
                ints_to_json(&self.file_depends_n),
                ints_to_json(&self.depends_dict),
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find a package by ID
    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(&format!("SELECT {} FROM packages WHERE id = ?1", PACKAGE_COLUMNS))?;
        let package = stmt.query_row([id], Self::from_row).optional()?;
        Ok(package)
    }

    /// Find packages by name
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM packages WHERE name = ?1 ORDER BY id",
            PACKAGE_COLUMNS
        ))?;
        let packages = stmt
            .query_map([name], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(packages)
    }

    /// List all packages
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM packages ORDER BY name, id",
            PACKAGE_COLUMNS
        ))?;
        let packages = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(packages)
    }

    /// Delete a package with its dependencies and files
    pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
        let deleted = conn.execute("DELETE FROM packages WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            epoch: row
                .get::<_, Option<i64>>(2)?
                .map(|e| u64::try_from(e).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(2, e)))
                .transpose()?,
            version: row.get(3)?,
            release: row.get(4)?,
            arch: row.get(5)?,
            os: row.get(6)?,
            header_id: row.get(7)?,
            header_color: row.get(8)?,
            installed_at: row.get(9)?,
            file_depends_x: ints_from_json(row, 10)?,
            file_depends_n: ints_from_json(row, 11)?,
            depends_dict: ints_from_json(row, 12)?,
        })
    }
}

fn ints_to_json(values: &[u32]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

fn ints_from_json(row: &Row, index: usize) -> rusqlite::Result<Vec<u32>> {
    let text: String = row.get(index)?;
    serde_json::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// One dependency of an installed package
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyRecord {
    pub package_id: i64,
    pub kind: DepTag,
    pub position: i64,
    pub name: String,
    pub version: String,
    pub flags: u32,
}

impl DependencyRecord {
    pub fn new(package_id: i64, kind: DepTag, position: usize, dep: &RawDependency) -> Self {
        Self {
            package_id,
            kind,
            position: position as i64,
            name: dep.name.clone(),
            version: dep.version.clone(),
            flags: dep.flags,
        }
    }

    pub fn insert(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO dependencies (package_id, kind, position, name, version, flags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                self.package_id,
                self.kind.as_str(),
                self.position,
                &self.name,
                &self.version,
                self.flags,
            ],
        )?;
        Ok(())
    }

    /// Dependencies of one kind of a package, in header order
    pub fn find_by_package(conn: &Connection, package_id: i64, kind: DepTag) -> Result<Vec<RawDependency>> {
        let mut stmt = conn.prepare(
            "SELECT name, version, flags FROM dependencies
             WHERE package_id = ?1 AND kind = ?2 ORDER BY position",
        )?;
        let deps = stmt
            .query_map(params![package_id, kind.as_str()], |row| {
                Ok(RawDependency::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(deps)
    }

    /// IDs of packages carrying a dependency of `kind` on `name`
    pub fn find_packages(conn: &Connection, kind: DepTag, name: &str) -> Result<Vec<i64>> {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT package_id FROM dependencies
             WHERE kind = ?1 AND name = ?2 ORDER BY package_id",
        )?;
        let ids = stmt
            .query_map(params![kind.as_str(), name], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

/// One file of an installed package
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub package_id: i64,
    pub position: i64,
    pub path: String,
    pub color: u32,
    pub linkto: String,
}

impl FileRecord {
    pub fn insert(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO files (package_id, position, path, color, linkto)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![self.package_id, self.position, &self.path, self.color, &self.linkto],
        )?;
        Ok(())
    }

    /// Files of a package, in header order
    pub fn find_by_package(conn: &Connection, package_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT package_id, position, path, color, linkto FROM files
             WHERE package_id = ?1 ORDER BY position",
        )?;
        let files = stmt
            .query_map([package_id], |row| {
                Ok(Self {
                    package_id: row.get(0)?,
                    position: row.get(1)?,
                    path: row.get(2)?,
                    color: row.get(3)?,
                    linkto: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(files)
    }

    /// IDs of packages shipping `path`
    pub fn find_packages(conn: &Connection, path: &str) -> Result<Vec<i64>> {
        let mut stmt =
            conn.prepare("SELECT DISTINCT package_id FROM files WHERE path = ?1 ORDER BY package_id")?;
        let ids = stmt
            .query_map([path], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}
