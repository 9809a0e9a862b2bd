// src/transaction/element.rs

//! Transaction elements: one package to install or erase

use crate::deps::{DepTag, Prco};
use crate::error::{Error, Result};
use crate::packages::PackageHeader;
use crate::version::Evr;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Index of an element inside its transaction set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementIndex(pub usize);

impl ElementIndex {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether an element is installed or erased by the transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Added,
    Removed,
}

impl ElementKind {
    pub fn as_str(&self) -> &str {
        match self {
            ElementKind::Added => "install",
            ElementKind::Removed => "erase",
        }
    }
}

/// Install-time path relocation
///
/// Files under `old_path` move to `new_path`; with no `new_path` they are
/// left out of the installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relocation {
    pub old_path: String,
    pub new_path: Option<String>,
}

impl Relocation {
    pub fn new(old_path: impl Into<String>, new_path: Option<String>) -> Self {
        Self {
            old_path: old_path.into(),
            new_path,
        }
    }

    /// Length of the matched prefix when `path` lies under `old_path`
    fn matches(&self, path: &str) -> Option<usize> {
        let old = self.old_path.trim_end_matches('/');
        if path == old {
            return Some(old.len());
        }
        path.strip_prefix(old)
            .filter(|rest| rest.starts_with('/'))
            .map(|_| old.len())
    }
}

/// Apply relocations to a file list
///
/// The longest matching `old_path` wins for each file.
pub fn relocate_files(files: &[String], relocations: &[Relocation]) -> Vec<String> {
    if relocations.is_empty() {
        return files.to_vec();
    }
    files
        .iter()
        .filter_map(|path| {
            let best = relocations
                .iter()
                .filter_map(|r| r.matches(path).map(|len| (len, r)))
                .max_by_key(|(len, _)| *len);
            match best {
                None => Some(path.clone()),
                Some((_, Relocation { new_path: None, .. })) => None,
                Some((len, Relocation { new_path: Some(new), .. })) => {
                    Some(format!("{}{}", new.trim_end_matches('/'), &path[len..]))
                }
            }
        })
        .collect()
}

/// Graph bookkeeping filled in by ordering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphInfo {
    /// Number of elements that must come before this one
    pub predecessor_count: i32,
    /// Distance from the root of the element's tree
    pub depth: i32,
    /// Position within its depth level
    pub breadth: i32,
    /// Tree (cluster) the element was reached from
    pub tree_id: i32,
    /// Element that first reached this one during the tree walk
    pub parent: Option<ElementIndex>,
    /// Elements that must come after this one
    pub successors: Vec<ElementIndex>,
}

/// Forward or backward link between an installed package and its replacement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
    pub nevra: Vec<String>,
    pub header_id: Vec<String>,
}

impl ChainLink {
    fn push(&mut self, nevra: String, header_id: Option<String>) {
        self.nevra.push(nevra);
        if let Some(id) = header_id {
            self.header_id.push(id);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nevra.is_empty()
    }
}

/// One package scheduled for installation or removal
#[derive(Debug, Clone)]
pub struct TransactionElement {
    kind: ElementKind,
    header: Arc<dyn PackageHeader>,
    key: Option<String>,
    db_offset: Option<u32>,
    name: String,
    evr: Evr,
    arch: Option<String>,
    os: Option<String>,
    color: u32,
    relocations: Vec<Relocation>,
    files: Vec<String>,
    prco: Prco,
    pub graph: GraphInfo,
    depends_on: Option<ElementIndex>,
    flink: ChainLink,
    blink: ChainLink,
}

impl TransactionElement {
    /// Element for a package to install
    pub fn new_added(
        header: Arc<dyn PackageHeader>,
        key: Option<String>,
        relocations: Vec<Relocation>,
    ) -> Result<Self> {
        let mut te = Self::new(ElementKind::Added, header, relocations)?;
        te.key = key;
        Ok(te)
    }

    /// Element for an installed package to erase
    pub fn new_removed(header: Arc<dyn PackageHeader>, db_offset: u32) -> Result<Self> {
        let mut te = Self::new(ElementKind::Removed, header, Vec::new())?;
        te.db_offset = Some(db_offset);
        Ok(te)
    }

    fn new(
        kind: ElementKind,
        header: Arc<dyn PackageHeader>,
        relocations: Vec<Relocation>,
    ) -> Result<Self> {
        let name = header
            .name()
            .ok_or_else(|| Error::InvalidMetadata("package without a name".to_string()))?;
        let evr = header.evr();
        let files = relocate_files(&header.file_paths(), &relocations);
        let prco = Prco::load(header.as_ref(), &name, &evr, &files);

        let color = header
            .header_color()
            .unwrap_or_else(|| header.file_colors().iter().fold(0, |acc, c| acc | c));

        let te = Self {
            kind,
            arch: header.arch(),
            os: header.os(),
            header,
            key: None,
            db_offset: None,
            name,
            evr,
            color,
            relocations,
            files,
            prco,
            graph: GraphInfo::default(),
            depends_on: None,
            flink: ChainLink::default(),
            blink: ChainLink::default(),
        };
        debug!(
            "New {} element {} (color {}, {} provides, {} requires)",
            kind.as_str(),
            te.nevra(),
            te.color,
            te.prco.provides().len(),
            te.prco.requires().len()
        );
        Ok(te)
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn is_added(&self) -> bool {
        self.kind == ElementKind::Added
    }

    pub fn is_removed(&self) -> bool {
        self.kind == ElementKind::Removed
    }

    /// The metadata record this element was built from
    pub fn header(&self) -> &Arc<dyn PackageHeader> {
        &self.header
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn db_offset(&self) -> Option<u32> {
        self.db_offset
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn evr(&self) -> &Evr {
        &self.evr
    }

    pub fn epoch(&self) -> Option<u64> {
        self.evr.epoch
    }

    pub fn version(&self) -> &str {
        &self.evr.version
    }

    pub fn release(&self) -> Option<&str> {
        self.evr.release.as_deref()
    }

    pub fn arch(&self) -> Option<&str> {
        self.arch.as_deref()
    }

    pub fn os(&self) -> Option<&str> {
        self.os.as_deref()
    }

    pub fn color(&self) -> u32 {
        self.color
    }

    pub fn relocations(&self) -> &[Relocation] {
        &self.relocations
    }

    /// File list after relocation
    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn prco(&self) -> &Prco {
        &self.prco
    }

    pub fn prco_mut(&mut self) -> &mut Prco {
        &mut self.prco
    }

    /// Added element a removal was scheduled for (upgrades, obsoletes)
    pub fn depends_on(&self) -> Option<ElementIndex> {
        self.depends_on
    }

    pub(crate) fn set_depends_on(&mut self, added: ElementIndex) {
        self.depends_on = Some(added);
    }

    pub fn flink(&self) -> &ChainLink {
        &self.flink
    }

    pub fn blink(&self) -> &ChainLink {
        &self.blink
    }

    /// Record the package this element supersedes
    pub(crate) fn chain_backward(&mut self, nevra: String, header_id: Option<String>) {
        self.blink.push(nevra, header_id);
    }

    /// Record the package superseding this element
    pub(crate) fn chain_forward(&mut self, nevra: String, header_id: Option<String>) {
        self.flink.push(nevra, header_id);
    }

    /// `name-[epoch:]version-release[.arch]`
    pub fn nevra(&self) -> String {
        match self.arch {
            Some(ref arch) => format!("{}-{}.{}", self.name, self.evr, arch),
            None => format!("{}-{}", self.name, self.evr),
        }
    }

    /// Whether two elements could share the same slot on a multilib system
    pub fn same_slot(&self, other: &TransactionElement) -> bool {
        if self.name != other.name {
            return false;
        }
        if self.color != 0 && other.color != 0 {
            return self.color & other.color != 0;
        }
        match (self.arch(), other.arch()) {
            (Some(a), Some(b)) => a == b || a == "noarch" || b == "noarch",
            _ => true,
        }
    }

    /// Number of provides, the self-provide included
    pub fn provides_count(&self) -> usize {
        self.prco.deps(DepTag::Provides).len()
    }
}

impl fmt::Display for TransactionElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nevra())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::MemoryHeader;

    fn header(h: MemoryHeader) -> Arc<dyn PackageHeader> {
        Arc::new(h)
    }

    #[test]
    fn test_new_added_reads_metadata() {
        let h = MemoryHeader::new("bash", "1:5.2-1")
            .with_arch("x86_64")
            .with_os("linux")
            .requires("glibc")
            .unwrap();
        let te = TransactionElement::new_added(header(h), Some("bash.rpm".into()), vec![]).unwrap();

        assert!(te.is_added());
        assert_eq!(te.name(), "bash");
        assert_eq!(te.epoch(), Some(1));
        assert_eq!(te.version(), "5.2");
        assert_eq!(te.release(), Some("1"));
        assert_eq!(te.os(), Some("linux"));
        assert_eq!(te.key(), Some("bash.rpm"));
        assert_eq!(te.nevra(), "bash-1:5.2-1.x86_64");
        assert_eq!(te.prco().requires().len(), 1);
        assert_eq!(te.provides_count(), 1);
        assert_eq!(te.graph, GraphInfo::default());
    }

    #[test]
    fn test_new_removed_keeps_offset() {
        let te = TransactionElement::new_removed(header(MemoryHeader::new("foo", "1.0")), 42).unwrap();
        assert!(te.is_removed());
        assert_eq!(te.db_offset(), Some(42));
        assert_eq!(te.kind().as_str(), "erase");
    }

    #[test]
    fn test_nameless_header_rejected() {
        let h = MemoryHeader::new("", "1.0");
        let result = TransactionElement::new_added(header(h), None, vec![]);
        assert!(matches!(result, Err(Error::InvalidMetadata(_))));
    }

    #[test]
    fn test_color_is_union_of_file_colors() {
        let h = MemoryHeader::new("glibc", "2.39")
            .file("/usr/lib/libc.so.6", 1)
            .file("/usr/lib64/libc.so.6", 2);
        let te = TransactionElement::new_added(header(h), None, vec![]).unwrap();
        assert_eq!(te.color(), 3);
    }

    #[test]
    fn test_header_color_preferred() {
        let mut h = MemoryHeader::new("glibc", "2.39").file("/usr/lib64/libc.so.6", 2);
        h.header_color = Some(2);
        let te = TransactionElement::new_added(header(h), None, vec![]).unwrap();
        assert_eq!(te.color(), 2);
    }

    #[test]
    fn test_relocations() {
        let files = vec![
            "/opt/app/bin/run".to_string(),
            "/opt/app/doc/README".to_string(),
            "/opt/application/x".to_string(),
            "/etc/app.conf".to_string(),
        ];
        let relocations = vec![
            Relocation::new("/opt/app", Some("/usr/local/app".to_string())),
            Relocation::new("/opt/app/doc/", None),
        ];
        let out = relocate_files(&files, &relocations);
        assert_eq!(
            out,
            vec![
                "/usr/local/app/bin/run".to_string(),
                "/opt/application/x".to_string(),
                "/etc/app.conf".to_string(),
            ]
        );
    }

    #[test]
    fn test_relocated_files_feed_dirnames() {
        let h = MemoryHeader::new("app", "1.0").file("/opt/app/bin/run", 0);
        let relocations = vec![Relocation::new("/opt/app", Some("/srv/app".to_string()))];
        let te = TransactionElement::new_added(header(h), None, relocations).unwrap();
        assert_eq!(te.files(), &["/srv/app/bin/run".to_string()]);
        assert_eq!(te.prco().deps(DepTag::Dirnames)[0].name, "/srv/app/bin/");
        assert_eq!(te.relocations().len(), 1);
    }

    #[test]
    fn test_same_slot() {
        let a = TransactionElement::new_added(
            header(MemoryHeader::new("zlib", "1.3").with_arch("x86_64")),
            None,
            vec![],
        )
        .unwrap();
        let b = TransactionElement::new_added(
            header(MemoryHeader::new("zlib", "1.2").with_arch("i686")),
            None,
            vec![],
        )
        .unwrap();
        let c = TransactionElement::new_added(
            header(MemoryHeader::new("zlib", "1.2").with_arch("x86_64")),
            None,
            vec![],
        )
        .unwrap();
        assert!(!a.same_slot(&b));
        assert!(a.same_slot(&c));
    }

    #[test]
    fn test_chain_links() {
        let mut te = TransactionElement::new_removed(header(MemoryHeader::new("foo", "1.0")), 1).unwrap();
        assert!(te.flink().is_empty());
        te.chain_forward("foo-2.0".to_string(), Some("abc".to_string()));
        assert_eq!(te.flink().nevra, vec!["foo-2.0".to_string()]);
        assert_eq!(te.flink().header_id, vec!["abc".to_string()]);
        te.chain_backward("foo-0.9".to_string(), None);
        assert!(te.blink().header_id.is_empty());
    }
}
