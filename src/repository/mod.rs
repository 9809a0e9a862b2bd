// src/repository/mod.rs

//! Package repositories used to suggest and solve missing dependencies
//!
//! A [`Repository`] is loaded from Fedora-style repository metadata: either
//! a repository directory (`repodata/repomd.xml` names the primary file) or
//! a `primary.xml[.gz|.zst]` file directly.

pub mod parsers;

use crate::deps::{DepTag, Dependency, DependencySet, Sense};
use crate::error::Result;
use crate::packages::{MemoryHeader, PackageHeader};
use crate::transaction::{AvailableIndex, PackageKey, SolveCallback, SolveResult};
use crate::version::EpochPolicy;
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Packages available for installation
#[derive(Debug, Clone, Default)]
pub struct Repository {
    packages: Vec<Arc<MemoryHeader>>,
    index: AvailableIndex,
}

impl Repository {
    /// Build a repository from metadata records
    pub fn from_headers(headers: impl IntoIterator<Item = MemoryHeader>) -> Self {
        let mut repo = Self::default();
        for header in headers {
            repo.add(header);
        }
        repo
    }

    /// Load a repository directory or primary metadata file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let primary = if path.is_dir() {
            let repomd_path = path.join("repodata").join("repomd.xml");
            debug!("Reading {}", repomd_path.display());
            let repomd = parsers::decompress(&std::fs::read(&repomd_path)?, "repomd.xml")?;
            path.join(parsers::fedora::parse_repomd(&repomd)?)
        } else {
            path.to_path_buf()
        };

        info!("Loading repository metadata from {}", primary.display());
        let name = primary.display().to_string();
        let xml = parsers::decompress(&std::fs::read(&primary)?, &name)?;
        let repo = Self::from_headers(parsers::fedora::parse_primary_xml(&xml)?);
        info!("Repository has {} packages", repo.len());
        Ok(repo)
    }

    /// Add a package, returning its key
    pub fn add(&mut self, header: MemoryHeader) -> PackageKey {
        let key = PackageKey(self.packages.len());
        let provides = provides_of(&header);
        let color = header
            .header_color
            .unwrap_or_else(|| header.file_colors.iter().fold(0, |acc, c| acc | c));
        self.index
            .add(key, header.nevra(), color, Arc::new(provides), &header.files);
        self.packages.push(Arc::new(header));
        key
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn get(&self, key: PackageKey) -> Option<&Arc<MemoryHeader>> {
        self.packages.get(key.0)
    }

    pub fn packages(&self) -> impl Iterator<Item = &Arc<MemoryHeader>> {
        self.packages.iter()
    }

    /// The provide index, for suggestions in a transaction set
    pub fn index(&self) -> &AvailableIndex {
        &self.index
    }

    /// Every package satisfying `dep`
    pub fn all_providers(&self, dep: &Dependency) -> Vec<&Arc<MemoryHeader>> {
        self.index
            .all_satisfiers(dep, EpochPolicy::Skip)
            .into_iter()
            .filter_map(|key| self.get(key))
            .collect()
    }

    /// The newest package satisfying `dep`
    ///
    /// Among equal versions the package added first wins.
    pub fn best_provider(&self, dep: &Dependency) -> Option<&Arc<MemoryHeader>> {
        self.all_providers(dep).into_iter().fold(None, |best, candidate| match best {
            Some(current)
                if candidate.evr().compare(&current.evr(), EpochPolicy::Promote)
                    != Ordering::Greater =>
            {
                Some(current)
            }
            _ => Some(candidate),
        })
    }

    /// Solve callback answering from this repository
    pub fn solver(self: &Arc<Self>) -> RepositorySolver {
        RepositorySolver {
            repo: Arc::clone(self),
        }
    }
}

/// Provides of a record with its self-provide, sorted
fn provides_of(header: &MemoryHeader) -> DependencySet {
    let mut provides = DependencySet::from_deps(
        DepTag::Provides,
        header
            .provides
            .iter()
            .map(|d| Dependency::from_raw(&d.name, &d.version, d.flags)),
    );
    provides.push(Dependency::versioned(
        header.name.clone(),
        Sense::EQUAL,
        header.evr(),
    ));
    provides.sort();
    provides
}

/// Resolves unsatisfied dependencies with the best repository provider
#[derive(Debug, Clone)]
pub struct RepositorySolver {
    repo: Arc<Repository>,
}

impl SolveCallback for RepositorySolver {
    fn solve(&mut self, dep: &Dependency) -> SolveResult {
        match self.repo.best_provider(dep) {
            Some(header) => {
                debug!("Repository provides {} with {}", dep, header.nevra());
                let header: Arc<dyn PackageHeader> = header.clone();
                SolveResult::Resolved(header)
            }
            None => SolveResult::Unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const PRIMARY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xmlns="http://linux.duke.edu/metadata/common" xmlns:rpm="http://linux.duke.edu/metadata/rpm">
<package type="rpm">
  <name>libfoo</name>
  <arch>x86_64</arch>
  <version epoch="0" ver="2.5" rel="1"/>
  <format>
    <rpm:provides><rpm:entry name="libfoo.so.2()(64bit)"/></rpm:provides>
    <file>/usr/lib64/libfoo.so.2</file>
  </format>
</package>
</metadata>"#;

    fn repo() -> Repository {
        Repository::from_headers([
            MemoryHeader::new("libfoo", "2.0-1").provides("libfoo.so.2").unwrap(),
            MemoryHeader::new("libfoo", "2.5-1").provides("libfoo.so.2").unwrap(),
            MemoryHeader::new("libfoo", "1.0-1").provides("libfoo.so.1").unwrap(),
            MemoryHeader::new("bar", "1.0").file("/usr/bin/bar", 0),
        ])
    }

    #[test]
    fn test_best_provider_is_newest() {
        let repo = repo();
        let dep = Dependency::name_only("libfoo.so.2");
        assert_eq!(repo.all_providers(&dep).len(), 2);
        assert_eq!(repo.best_provider(&dep).unwrap().version, "2.5");

        let dep = Dependency::parse("libfoo < 2.0").unwrap();
        assert_eq!(repo.best_provider(&dep).unwrap().version, "1.0");
    }

    #[test]
    fn test_file_provider() {
        let repo = repo();
        let dep = Dependency::name_only("/usr/bin/bar");
        assert_eq!(repo.best_provider(&dep).unwrap().name, "bar");
        assert!(repo.best_provider(&Dependency::name_only("/usr/bin/baz")).is_none());
    }

    #[test]
    fn test_solver() {
        let repo = Arc::new(repo());
        let mut solver = repo.solver();
        match solver.solve(&Dependency::name_only("libfoo.so.2")) {
            SolveResult::Resolved(header) => assert_eq!(header.nevra(), "libfoo-2.5-1"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            solver.solve(&Dependency::name_only("missing")),
            SolveResult::Unresolved
        ));
    }

    #[test]
    fn test_load_primary_gz() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("primary.xml.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(PRIMARY.as_bytes()).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let repo = Repository::load(&path).unwrap();
        assert_eq!(repo.len(), 1);
        let dep = Dependency::name_only("libfoo.so.2()(64bit)");
        assert_eq!(repo.best_provider(&dep).unwrap().nevra(), "libfoo-0:2.5-1.x86_64");
    }

    #[test]
    fn test_load_repository_directory() {
        let dir = tempfile::tempdir().unwrap();
        let repodata = dir.path().join("repodata");
        std::fs::create_dir_all(&repodata).unwrap();
        std::fs::write(
            repodata.join("repomd.xml"),
            r#"<repomd><data type="primary"><location href="repodata/abc-primary.xml.zst"/></data></repomd>"#,
        )
        .unwrap();
        let compressed = zstd::encode_all(PRIMARY.as_bytes(), 3).unwrap();
        std::fs::write(repodata.join("abc-primary.xml.zst"), compressed).unwrap();

        let repo = Repository::load(dir.path()).unwrap();
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.index().len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Repository::load("/nonexistent/primary.xml").is_err());
    }
}
