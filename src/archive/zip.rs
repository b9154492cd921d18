use anyhow::{Context, Result};
use log::debug;
use std::io::{self, Cursor};
use std::path::Path;
use zip::ZipArchive;
use zip::result::ZipError;

use super::manifest::{MANIFEST_NAME, Manifest, parse_manifest};
use crate::problem::Problem;
use crate::runtime::Runtime;

/// A zip-based package opened for reading.
pub struct PackageArchive {
    zip: ZipArchive<Cursor<Vec<u8>>>,
}

impl PackageArchive {
    /// Read the whole archive through the runtime and index its entries.
    pub fn open<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        // zip needs Read + Seek, so the archive is kept in memory
        let buffer = runtime
            .read(path)
            .with_context(|| format!("Failed to read archive {:?}", path))?;
        let zip = ZipArchive::new(Cursor::new(buffer))
            .with_context(|| format!("Failed to parse ZIP archive {:?}", path))?;
        debug!("Opened {:?} with {} entries", path, zip.len());
        Ok(Self { zip })
    }

    /// Read one entry. A missing entry is reported as malformed input.
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>, Problem> {
        let mut entry = match self.zip.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                return Err(Problem::malformed(format!(
                    "{} entry is missing",
                    name
                )));
            }
            Err(e) => {
                return Err(Problem::malformed(format!(
                    "Failed to read entry {}: {}",
                    name, e
                )));
            }
        };
        // Entry sizes come from the archive itself and never size an allocation
        let mut buffer = Vec::new();
        io::copy(&mut entry, &mut buffer)
            .map_err(|e| Problem::malformed(format!("Failed to read entry {}: {}", name, e)))?;
        Ok(buffer)
    }

    pub fn manifest(&mut self) -> Result<Manifest, Problem> {
        let bytes = self.read_file(MANIFEST_NAME)?;
        parse_manifest(&bytes)
    }
}
