// src/repository/parsers/fedora.rs

//! Fedora/RPM repository metadata parser
//!
//! Parses repomd.xml (to locate the primary metadata) and primary.xml,
//! which lists every package with its EVR, dependencies and files.

use crate::deps::{DepContext, DepTag, Dependency, Sense};
use crate::error::{Error, Result};
use crate::packages::MemoryHeader;
use crate::version::Evr;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

/// Find the location of the primary metadata in repomd.xml
pub fn parse_repomd(xml_content: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut in_primary = false;
    let mut location = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"data" => {
                in_primary = attribute(&e, b"type").as_deref() == Some("primary");
            }
            Ok(Event::Start(e) | Event::Empty(e))
                if e.local_name().as_ref() == b"location" && in_primary =>
            {
                location = attribute(&e, b"href");
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"data" => {
                in_primary = false;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::ParseError(format!("Failed to parse repomd.xml: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    location.ok_or_else(|| {
        Error::ParseError("Could not find primary data location in repomd.xml".to_string())
    })
}

/// Parse primary.xml into metadata records
///
/// Packages missing a name or version are skipped with a warning.
pub fn parse_primary_xml(xml_content: &str) -> Result<Vec<MemoryHeader>> {
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(true);

    let mut packages = Vec::new();
    let mut buf = Vec::new();

    let mut current: Option<MemoryHeader> = None;
    let mut current_tag = String::new();
    let mut dep_tag: Option<DepTag> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let tag_name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match tag_name.as_str() {
                    "package" => current = Some(MemoryHeader::default()),
                    "provides" | "requires" | "conflicts" | "obsoletes" => {
                        dep_tag = tag_name.parse().ok();
                    }
                    _ => {}
                }
                current_tag = tag_name;
            }
            Ok(Event::Empty(e)) => {
                if let Some(ref mut pkg) = current {
                    match e.local_name().as_ref() {
                        b"version" => {
                            let evr = evr_attributes(&e);
                            pkg.epoch = evr.epoch;
                            pkg.version = evr.version;
                            pkg.release = evr.release;
                        }
                        b"entry" => {
                            if let Some(tag) = dep_tag {
                                match entry(&e) {
                                    Ok(dep) => pkg.push_dep(tag, &dep),
                                    Err(err) => {
                                        warn!("Skipping dependency of {}: {}", pkg.name, err)
                                    }
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(ref mut pkg) = current {
                    let text = e.unescape().unwrap_or_default().to_string();
                    match current_tag.as_str() {
                        "name" => pkg.name = text,
                        "arch" => pkg.arch = Some(text),
                        "file" => {
                            pkg.files.push(text);
                            pkg.file_colors.push(0);
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"package" => {
                        if let Some(pkg) = current.take() {
                            if pkg.name.is_empty() || pkg.version.is_empty() {
                                warn!("Skipping package without name or version");
                            } else {
                                packages.push(pkg);
                            }
                        }
                    }
                    b"provides" | b"requires" | b"conflicts" | b"obsoletes" => dep_tag = None,
                    _ => {}
                }
                current_tag.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::ParseError(format!("Failed to parse primary.xml: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    debug!("Parsed {} packages from primary.xml", packages.len());
    Ok(packages)
}

fn attribute(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == name)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

/// EVR from `epoch`/`ver`/`rel` attributes
fn evr_attributes(e: &BytesStart) -> Evr {
    let epoch = attribute(e, b"epoch").and_then(|s| s.parse::<u64>().ok());
    Evr::new(
        epoch,
        attribute(e, b"ver").unwrap_or_default(),
        attribute(e, b"rel"),
    )
}

/// A `<rpm:entry name=".." flags="GE" epoch="0" ver=".." rel=".." pre="1"/>`
fn entry(e: &BytesStart) -> Result<Dependency> {
    let name = attribute(e, b"name")
        .ok_or_else(|| Error::ParseError("dependency entry without a name".to_string()))?;

    let mut dep = match attribute(e, b"flags") {
        Some(flags) => {
            let sense = Sense::from_repodata(&flags)
                .ok_or_else(|| Error::ParseError(format!("unknown flags '{}' on {}", flags, name)))?;
            Dependency::versioned(name, sense, evr_attributes(e))
        }
        None => Dependency::name_only(name),
    };
    if attribute(e, b"pre").as_deref() == Some("1") {
        dep = dep.with_context(DepContext::PREREQ);
    }
    Ok(dep)
}
