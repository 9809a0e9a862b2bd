// src/db/mod.rs

//! Installed-package database
//!
//! A SQLite store of installed package headers. [`InstalledDb`] registers
//! and removes packages and answers the capability queries of
//! [`InstalledPackages`]. The row id of a package is its database offset.

pub mod models;
pub mod schema;

use crate::deps::DepTag;
use crate::error::{Error, Result};
use crate::packages::{MemoryHeader, PackageHeader};
use crate::transaction::{InstalledPackage, InstalledPackages};
use models::{DependencyRecord, FileRecord, PackageRecord};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Relations stored per package
const STORED_DEPS: [DepTag; 5] = [
    DepTag::Provides,
    DepTag::Requires,
    DepTag::Conflicts,
    DepTag::Obsoletes,
    DepTag::Triggers,
];

/// Initialize a new database at the specified path
///
/// Creates the file and applies the schema. Calling it on an existing
/// database only applies pending migrations.
pub fn init(db_path: &str) -> Result<()> {
    debug!("Initializing database at: {}", db_path);

    if let Some(parent) = Path::new(db_path).parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::InitError(format!("Failed to create database directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        ",
    )?;
    schema::migrate(&conn)?;

    info!("Database initialized successfully");
    Ok(())
}

/// Open an existing database
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        return Err(Error::DatabaseNotFound(db_path.to_string()));
    }

    let conn = Connection::open(db_path)?;
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        ",
    )?;
    schema::migrate(&conn)?;

    Ok(conn)
}

/// Installed packages stored in SQLite
#[derive(Debug)]
pub struct InstalledDb {
    conn: Connection,
}

impl InstalledDb {
    /// Open an existing database
    pub fn open(db_path: &str) -> Result<Self> {
        Ok(Self { conn: open(db_path)? })
    }

    /// Create (or upgrade) and open a database
    pub fn init(db_path: &str) -> Result<Self> {
        init(db_path)?;
        Self::open(db_path)
    }

    /// Database held in memory, for tests and dry runs
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Record a package as installed, returning its offset
    pub fn register(&mut self, header: &dyn PackageHeader) -> Result<u32> {
        let name = header
            .name()
            .ok_or_else(|| Error::InvalidMetadata("package without a name".to_string()))?;
        let memory = MemoryHeader::from_header(header);

        let tx = self.conn.transaction()?;
        let mut record = PackageRecord {
            name,
            epoch: memory.epoch,
            version: memory.version.clone(),
            release: memory.release.clone(),
            arch: memory.arch.clone(),
            os: memory.os.clone(),
            header_id: memory.header_id.clone(),
            header_color: memory.header_color,
            file_depends_x: memory.file_depends_x.clone(),
            file_depends_n: memory.file_depends_n.clone(),
            depends_dict: memory.depends_dict.clone(),
            ..Default::default()
        };
        let id = record.insert(&tx)?;

        for kind in STORED_DEPS {
            for (position, dep) in header.dependencies(kind).iter().enumerate() {
                DependencyRecord::new(id, kind, position, dep).insert(&tx)?;
            }
        }

        for (position, path) in memory.files.iter().enumerate() {
            FileRecord {
                package_id: id,
                position: position as i64,
                path: path.clone(),
                color: memory.file_colors.get(position).copied().unwrap_or(0),
                linkto: memory.file_linktos.get(position).cloned().unwrap_or_default(),
            }
            .insert(&tx)?;
        }
        tx.commit()?;

        info!("Registered {} at offset {}", header.nevra(), id);
        to_offset(id)
    }

    /// Forget an installed package
    pub fn remove(&mut self, offset: u32) -> Result<bool> {
        let removed = PackageRecord::delete(&self.conn, i64::from(offset))?;
        if removed {
            info!("Removed package at offset {}", offset);
        }
        Ok(removed)
    }

    /// Rebuild the header of an installed package
    pub fn load(&self, offset: u32) -> Result<Option<MemoryHeader>> {
        let Some(record) = PackageRecord::find_by_id(&self.conn, i64::from(offset))? else {
            return Ok(None);
        };
        self.header_from(record).map(Some)
    }

    /// All installed packages, sorted by name
    pub fn list(&self) -> Result<Vec<PackageRecord>> {
        PackageRecord::list_all(&self.conn)
    }

    fn header_from(&self, record: PackageRecord) -> Result<MemoryHeader> {
        let id = record
            .id
            .ok_or_else(|| Error::InvalidMetadata("package row without id".to_string()))?;
        let deps = |kind| DependencyRecord::find_by_package(&self.conn, id, kind);
        let files = FileRecord::find_by_package(&self.conn, id)?;

        let mut header = MemoryHeader {
            name: record.name,
            epoch: record.epoch,
            version: record.version,
            release: record.release,
            arch: record.arch,
            os: record.os,
            header_id: record.header_id,
            header_color: record.header_color,
            provides: deps(DepTag::Provides)?,
            requires: deps(DepTag::Requires)?,
            conflicts: deps(DepTag::Conflicts)?,
            obsoletes: deps(DepTag::Obsoletes)?,
            triggers: deps(DepTag::Triggers)?,
            file_depends_x: record.file_depends_x,
            file_depends_n: record.file_depends_n,
            depends_dict: record.depends_dict,
            ..Default::default()
        };
        if files.iter().any(|f| !f.linkto.is_empty()) {
            header.file_linktos = files.iter().map(|f| f.linkto.clone()).collect();
        }
        for file in files {
            header.files.push(file.path);
            header.file_colors.push(file.color);
        }
        Ok(header)
    }

    fn installed(&self, ids: Vec<i64>) -> Result<Vec<InstalledPackage>> {
        let mut packages = Vec::with_capacity(ids.len());
        for id in ids {
            let offset = to_offset(id)?;
            if let Some(header) = self.load(offset)? {
                packages.push(InstalledPackage::new(offset, Arc::new(header)));
            }
        }
        Ok(packages)
    }
}

fn to_offset(id: i64) -> Result<u32> {
    u32::try_from(id).map_err(|_| Error::InvalidMetadata(format!("package id {} out of range", id)))
}

impl InstalledPackages for InstalledDb {
    fn packages_providing(&self, dep: &crate::deps::Dependency) -> Result<Vec<InstalledPackage>> {
        let mut ids = DependencyRecord::find_packages(&self.conn, DepTag::Provides, &dep.name)?;
        ids.extend(
            PackageRecord::find_by_name(&self.conn, &dep.name)?
                .into_iter()
                .filter_map(|p| p.id),
        );
        if dep.is_file() {
            ids.extend(FileRecord::find_packages(&self.conn, &dep.name)?);
        }
        ids.sort_unstable();
        ids.dedup();
        self.installed(ids)
    }

    fn packages_requiring(&self, name: &str) -> Result<Vec<InstalledPackage>> {
        self.installed(DependencyRecord::find_packages(&self.conn, DepTag::Requires, name)?)
    }

    fn packages_conflicting(&self, name: &str) -> Result<Vec<InstalledPackage>> {
        self.installed(DependencyRecord::find_packages(&self.conn, DepTag::Conflicts, name)?)
    }

    fn packages_named(&self, name: &str) -> Result<Vec<InstalledPackage>> {
        let ids = PackageRecord::find_by_name(&self.conn, name)?
            .into_iter()
            .filter_map(|p| p.id)
            .collect();
        self.installed(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::Dependency;
    use tempfile::NamedTempFile;

    fn bash() -> MemoryHeader {
        MemoryHeader::new("bash", "5.2-1")
            .with_arch("x86_64")
            .provides("/bin/sh")
            .unwrap()
            .requires("glibc >= 2.34")
            .unwrap()
            .file("/usr/bin/bash", 2)
    }

    #[test]
    fn test_init_creates_database() {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap().to_string();
        drop(temp_file);

        assert!(init(&db_path).is_ok());
        assert!(Path::new(&db_path).exists());
    }

    #[test]
    fn test_open_existing_database() {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        init(db_path).unwrap();
        assert!(open(db_path).is_ok());
    }

    #[test]
    fn test_open_nonexistent_database() {
        let result = open("/nonexistent/path/db.sqlite");
        assert!(matches!(result.unwrap_err(), Error::DatabaseNotFound(_)));
    }

    #[test]
    fn test_register_and_load_round_trip() {
        let mut db = InstalledDb::in_memory().unwrap();
        let header = bash();
        let offset = db.register(&header).unwrap();
        assert_eq!(offset, 1);

        let loaded = db.load(offset).unwrap().unwrap();
        assert_eq!(loaded, header);
        assert!(db.load(99).unwrap().is_none());
    }

    #[test]
    fn test_queries() {
        let mut db = InstalledDb::in_memory().unwrap();
        db.register(&bash()).unwrap();
        db.register(&MemoryHeader::new("glibc", "2.39-1").conflicts("kernel < 4.0").unwrap())
            .unwrap();

        let sh = db.packages_providing(&Dependency::name_only("/bin/sh")).unwrap();
        assert_eq!(sh.len(), 1);
        assert_eq!(sh[0].header.name().as_deref(), Some("bash"));

        let by_file = db.packages_providing(&Dependency::name_only("/usr/bin/bash")).unwrap();
        assert_eq!(by_file[0].offset, 1);

        let by_name = db.packages_providing(&Dependency::name_only("glibc")).unwrap();
        assert_eq!(by_name[0].offset, 2);

        assert_eq!(db.packages_requiring("glibc").unwrap().len(), 1);
        assert_eq!(db.packages_conflicting("kernel").unwrap().len(), 1);
        assert_eq!(db.packages_named("bash").unwrap()[0].offset, 1);
    }

    #[test]
    fn test_remove_and_list() {
        let mut db = InstalledDb::in_memory().unwrap();
        let offset = db.register(&bash()).unwrap();
        db.register(&MemoryHeader::new("attr", "2.5")).unwrap();

        let names: Vec<String> = db.list().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["attr", "bash"]);

        assert!(db.remove(offset).unwrap());
        assert!(!db.remove(offset).unwrap());
        assert!(db.packages_named("bash").unwrap().is_empty());
        assert!(db.packages_requiring("glibc").unwrap().is_empty());
    }

    #[test]
    fn test_persisted_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("var/lib/rpmsolve/installed.db");
        let path = path.to_str().unwrap();

        let mut db = InstalledDb::init(path).unwrap();
        db.register(&bash()).unwrap();
        drop(db);

        let db = InstalledDb::open(path).unwrap();
        assert_eq!(db.list().unwrap().len(), 1);
    }

    #[test]
    fn test_register_requires_name() {
        let mut db = InstalledDb::in_memory().unwrap();
        let result = db.register(&MemoryHeader::new("", "1.0"));
        assert!(matches!(result, Err(Error::InvalidMetadata(_))));
    }
}
