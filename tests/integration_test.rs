// tests/integration_test.rs

//! Integration tests for rpmsolve
//!
//! These tests verify end-to-end functionality across modules: transaction
//! sets checked against the installed database and a repository, then
//! ordered.

use rpmsolve::config::TransactionConfig;
use rpmsolve::db::{self, InstalledDb};
use rpmsolve::deps::Dependency;
use rpmsolve::packages::{MemoryHeader, PackageHeader};
use rpmsolve::repository::Repository;
use rpmsolve::transaction::{ElementIndex, ElementKind, InstalledPackages, TransactionSet};
use std::sync::Arc;
use tempfile::NamedTempFile;

const PRIMARY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xmlns="http://linux.duke.edu/metadata/common" xmlns:rpm="http://linux.duke.edu/metadata/rpm" packages="2">
<package type="rpm">
  <name>libfoo</name>
  <arch>x86_64</arch>
  <version epoch="0" ver="2.5" rel="1"/>
  <format>
    <rpm:provides>
      <rpm:entry name="libfoo.so.2()(64bit)"/>
    </rpm:provides>
    <rpm:requires>
      <rpm:entry name="libbar" flags="GE" ver="1.0"/>
    </rpm:requires>
  </format>
</package>
<package type="rpm">
  <name>libbar</name>
  <arch>x86_64</arch>
  <version epoch="0" ver="1.2" rel="3"/>
  <format>
    <file>/usr/lib64/libbar.so.1</file>
  </format>
</package>
</metadata>"#;

fn header(name: &str, evr: &str) -> MemoryHeader {
    MemoryHeader::new(name, evr).with_arch("x86_64")
}

fn install(ts: &mut TransactionSet, header: MemoryHeader) -> ElementIndex {
    ts.add_install(Arc::new(header), None, Vec::new(), false)
        .unwrap()
        .unwrap()
}

fn ordered_names(ts: &TransactionSet) -> Vec<String> {
    ts.ordered_elements().map(|e| e.name().to_string()).collect()
}

fn temp_db() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("installed.db").to_str().unwrap().to_string();
    (dir, path)
}

#[test]
fn test_database_lifecycle() {
    let temp_file = NamedTempFile::new().unwrap();
    let db_path = temp_file.path().to_str().unwrap().to_string();
    drop(temp_file);

    assert!(db::init(&db_path).is_ok(), "Database initialization should succeed");
    assert!(
        std::path::Path::new(&db_path).exists(),
        "Database file should exist after initialization"
    );

    let conn = db::open(&db_path).unwrap();
    let result: Result<i32, _> = conn.query_row("SELECT 1", [], |row| row.get(0));
    assert_eq!(result.unwrap(), 1, "Should be able to execute queries");
}

#[test]
fn test_dependency_chain_is_installed_leaves_first() {
    let mut ts = TransactionSet::new();
    install(&mut ts, header("a", "1.0-1").requires("b").unwrap());
    install(&mut ts, header("b", "1.0-1").requires("c >= 2").unwrap());
    install(&mut ts, header("c", "2.1-1"));

    assert!(ts.check().unwrap().is_empty());
    ts.order();
    assert_eq!(ordered_names(&ts), vec!["c", "b", "a"]);
    assert!(ts.ordering_cycles().is_empty());
}

#[test]
fn test_dependency_loop_is_reported_and_ordered() {
    let mut ts = TransactionSet::new();
    install(&mut ts, header("a", "1.0").requires("b").unwrap());
    install(&mut ts, header("b", "1.0").requires("a").unwrap());

    assert!(ts.check().unwrap().is_empty());
    let order = ts.order();
    assert_eq!(order.len(), 2);
    assert_eq!(ts.ordering_cycles().len(), 1);
    assert!(ts.ordering_cycles()[0].to_string().starts_with("LOOP:"));
}

#[test]
fn test_check_against_installed_database() {
    let (_dir, path) = temp_db();
    let mut db = InstalledDb::init(&path).unwrap();
    let glibc_offset = db
        .register(&header("glibc", "2.39-1").provides("libc.so.6").unwrap())
        .unwrap();
    db.register(&header("bash", "5.2-1").requires("libc.so.6").unwrap())
        .unwrap();
    drop(db);

    // A satisfied install
    let mut ts = TransactionSet::new();
    ts.set_installed(Box::new(InstalledDb::open(&path).unwrap()));
    install(&mut ts, header("app", "1.0").requires("glibc >= 2.34").unwrap());
    assert!(ts.check().unwrap().is_empty());

    // Erasing glibc breaks both bash (installed) and app (added)
    let db = InstalledDb::open(&path).unwrap();
    let glibc = db.packages_named("glibc").unwrap().remove(0);
    assert_eq!(glibc.offset, glibc_offset);

    let mut ts = TransactionSet::new();
    ts.set_installed(Box::new(db));
    install(&mut ts, header("app", "1.0").requires("glibc >= 2.34").unwrap());
    ts.add_erase(glibc.header, glibc.offset).unwrap();

    let problems = ts.check().unwrap();
    assert_eq!(problems.len(), 2);
    let broken: Vec<&str> = problems
        .iter()
        .filter(|p| p.installed)
        .map(|p| p.package.as_str())
        .collect();
    assert_eq!(broken, vec!["bash-5.2-1.x86_64"]);
}

#[test]
fn test_upgrade_erases_old_version_after_install() {
    let mut db = InstalledDb::in_memory().unwrap();
    db.register(&header("foo", "1.0-1")).unwrap();

    let mut ts = TransactionSet::new();
    ts.set_installed(Box::new(db));
    let added = ts
        .add_install(Arc::new(header("foo", "2.0-1")), None, Vec::new(), true)
        .unwrap()
        .unwrap();
    assert_eq!(ts.len(), 2);

    let erase = ts.element(ElementIndex(1)).unwrap();
    assert_eq!(erase.kind(), ElementKind::Removed);
    assert_eq!(erase.depends_on(), Some(added));

    assert!(ts.check().unwrap().is_empty());
    let order = ts.order();
    assert_eq!(order, vec![added, ElementIndex(1)]);
}

#[test]
fn test_repository_suggestions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("primary.xml");
    std::fs::write(&path, PRIMARY).unwrap();
    let repo = Repository::load(&path).unwrap();
    assert_eq!(repo.len(), 2);

    let mut ts = TransactionSet::new();
    ts.set_available(repo.index().clone());
    install(&mut ts, header("app", "1.0").requires("libfoo.so.2()(64bit)").unwrap());

    let problems = ts.check().unwrap();
    assert_eq!(problems.len(), 1);
    let problem = problems.iter().next().unwrap();
    assert_eq!(problem.suggestions, vec!["libfoo-0:2.5-1.x86_64".to_string()]);
    assert!(problem.to_string().contains("suggested"));
}

#[test]
fn test_repository_solves_missing_dependencies() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("primary.xml");
    std::fs::write(&path, PRIMARY).unwrap();
    let repo = Arc::new(Repository::load(&path).unwrap());

    let mut ts = TransactionSet::new();
    ts.set_available(repo.index().clone());
    ts.set_solve_callback(repo.solver());
    install(&mut ts, header("app", "1.0").requires("libfoo.so.2()(64bit)").unwrap());

    assert!(ts.check().unwrap().is_empty());
    assert_eq!(ts.len(), 3);

    ts.order();
    assert_eq!(ordered_names(&ts), vec!["libbar", "libfoo", "app"]);
}

#[test]
fn test_config_file_drives_conflict_checks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"check_conflicts": false}"#).unwrap();
    let config = TransactionConfig::load(&path).unwrap();

    let build = |config: TransactionConfig| {
        let mut ts = TransactionSet::with_config(config);
        install(&mut ts, header("a", "1.0").conflicts("b").unwrap());
        install(&mut ts, header("b", "1.0"));
        ts
    };

    assert_eq!(build(TransactionConfig::default()).check().unwrap().len(), 1);
    assert!(build(config).check().unwrap().is_empty());
}

#[test]
fn test_registered_header_satisfies_like_original() {
    let mut db = InstalledDb::in_memory().unwrap();
    let original = header("openssl-libs", "1:3.2.1-2")
        .provides("libssl.so.3")
        .unwrap()
        .file("/usr/lib64/libssl.so.3", 2);
    let offset = db.register(&original).unwrap();
    let loaded = db.load(offset).unwrap().unwrap();
    assert_eq!(loaded.nevra(), original.nevra());

    let found = db
        .packages_providing(&Dependency::parse("openssl-libs >= 1:3.0").unwrap())
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].header.epoch(), Some(1));
}
