// src/repository/parsers/mod.rs

//! Repository metadata parsers
//!
//! - Fedora/RPM: repomd.xml and primary.xml files
//!
//! Metadata files may be stored plain, gzip- or zstd-compressed.

pub mod fedora;

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::io::Read;
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// Decompress a metadata file by its magic bytes
pub fn decompress(bytes: &[u8], name: &str) -> Result<String> {
    let decompressed = if bytes.starts_with(&ZSTD_MAGIC) {
        debug!("Decompressing zstd-compressed {}", name);
        zstd::decode_all(bytes)
            .map_err(|e| Error::ParseError(format!("Failed to decompress {}: {}", name, e)))?
    } else if bytes.starts_with(&GZIP_MAGIC) {
        debug!("Decompressing gzip-compressed {}", name);
        let mut gz = GzDecoder::new(bytes);
        let mut out = Vec::new();
        gz.read_to_end(&mut out)
            .map_err(|e| Error::ParseError(format!("Failed to decompress {}: {}", name, e)))?;
        out
    } else {
        bytes.to_vec()
    };

    String::from_utf8(decompressed)
        .map_err(|e| Error::ParseError(format!("Invalid UTF-8 in {}: {}", name, e)))
}
