// src/packages/rpm.rs

//! Metadata records read from `.rpm` files

use crate::error::{Error, Result};
use crate::packages::header::{PackageHeader, RawDependency, Tag, TagValue};
use rpm::{IndexTag, Package, PackageMetadata};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// RPM package header read from disk
pub struct RpmPackage {
    path: PathBuf,
    metadata: PackageMetadata,
}

impl RpmPackage {
    /// Parse the header of an RPM package file
    pub fn parse(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Parsing RPM package: {}", path.display());

        let file = File::open(path)
            .map_err(|e| Error::Rpm(format!("Failed to open {}: {}", path.display(), e)))?;

        let mut buf_reader = BufReader::new(file);

        let pkg = Package::parse(&mut buf_reader)
            .map_err(|e| Error::Rpm(format!("Failed to parse {}: {}", path.display(), e)))?;

        // The name is the one tag the engine cannot do without
        pkg.metadata
            .get_name()
            .map_err(|e| Error::InvalidMetadata(format!("{}: no package name: {}", path.display(), e)))?;

        let rpm = Self {
            path: path.to_path_buf(),
            metadata: pkg.metadata,
        };
        debug!("Parsed RPM: {}", rpm.nevra());
        Ok(rpm)
    }

    /// Path the package was read from
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn deps(&self, tag: Tag) -> Option<Vec<RawDependency>> {
        let deps = match tag {
            Tag::Provides => self.metadata.get_provides(),
            Tag::Requires => self.metadata.get_requires(),
            Tag::Conflicts => self.metadata.get_conflicts(),
            Tag::Obsoletes => self.metadata.get_obsoletes(),
            _ => return None,
        };
        deps.ok().map(|deps| {
            deps.into_iter()
                .map(|d| RawDependency::new(d.name, d.version, d.flags.bits()))
                .collect()
        })
    }

    fn ints(&self, tag: IndexTag) -> Option<TagValue> {
        self.metadata
            .header
            .get_entry_data_as_u32_array(tag)
            .ok()
            .map(|v| TagValue::IntArray(v.to_vec()))
    }

    fn strings(&self, tag: IndexTag) -> Option<TagValue> {
        self.metadata
            .header
            .get_entry_data_as_string_array(tag)
            .ok()
            .map(|v| TagValue::StringArray(v.iter().map(|s| s.to_string()).collect()))
    }
}

impl std::fmt::Debug for RpmPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpmPackage")
            .field("path", &self.path)
            .field("nevra", &self.nevra())
            .finish()
    }
}

impl PackageHeader for RpmPackage {
    fn get_tag(&self, tag: Tag) -> Option<TagValue> {
        let md = &self.metadata;
        let string = |r: std::result::Result<&str, rpm::Error>| {
            r.ok().map(|s| TagValue::String(s.to_string()))
        };
        match tag {
            Tag::Name => string(md.get_name()),
            Tag::Epoch => md.get_epoch().ok().map(|e| TagValue::Int(u64::from(e))),
            Tag::Version => string(md.get_version()),
            Tag::Release => string(md.get_release()),
            Tag::Arch => string(md.get_arch()),
            Tag::Os => string(md.header.get_entry_data_as_string(IndexTag::RPMTAG_OS)),
            Tag::HeaderColor => self.ints(IndexTag::RPMTAG_HEADERCOLOR),
            Tag::HeaderId => string(md.header.get_entry_data_as_string(IndexTag::RPMTAG_SHA1HEADER)),
            Tag::Provides | Tag::Requires | Tag::Conflicts | Tag::Obsoletes => {
                self.deps(tag).map(TagValue::Deps)
            }
            Tag::Triggers => None,
            Tag::FileNames => md.get_file_paths().ok().map(|paths| {
                TagValue::StringArray(
                    paths
                        .iter()
                        .map(|p| p.to_string_lossy().to_string())
                        .collect(),
                )
            }),
            Tag::FileColors => self.ints(IndexTag::RPMTAG_FILECOLORS),
            Tag::FileLinktos => self.strings(IndexTag::RPMTAG_FILELINKTOS),
            Tag::FileDependsX => self.ints(IndexTag::RPMTAG_FILEDEPENDSX),
            Tag::FileDependsN => self.ints(IndexTag::RPMTAG_FILEDEPENDSN),
            Tag::DependsDict => self.ints(IndexTag::RPMTAG_DEPENDSDICT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_trait_implemented() {
        fn assert_header<T: PackageHeader>() {}
        assert_header::<RpmPackage>();
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let result = RpmPackage::parse("/nonexistent/file.rpm");
        assert!(matches!(result, Err(Error::Rpm(_))));
    }

    #[test]
    fn test_parse_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.rpm");
        std::fs::write(&path, b"definitely not an rpm").unwrap();
        assert!(RpmPackage::parse(&path).is_err());
    }
}
