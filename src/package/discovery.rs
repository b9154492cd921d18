use anyhow::Result;
use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Kind of file found in the package directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageFile {
    /// Packaged archive with a `data.json` manifest (`.smod`, `.zip`).
    Archive,
    /// Bare dynamic module without a manifest (`.dll`, `.so`, `.dylib`).
    RawModule,
    /// Bare data payload without a manifest (`.pak`).
    RawData,
}

impl PackageFile {
    /// Classify a path by its extension (case-insensitive). Unknown extensions yield `None`.
    pub fn classify(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_string_lossy().to_lowercase();
        match extension.as_str() {
            "smod" | "zip" => Some(PackageFile::Archive),
            "dll" | "so" | "dylib" => Some(PackageFile::RawModule),
            "pak" => Some(PackageFile::RawData),
            _ => None,
        }
    }
}

/// Derive a package identifier from a bare file name.
///
/// - `Foo-Win64-Shipping.dll` -> `Foo` (module files keep the part before the first `-`)
/// - `Foo_p.pak` -> `Foo` (data files drop the `_p` priority suffix)
pub fn raw_package_id(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let stem: &str = &stem;
    let id = match PackageFile::classify(path)? {
        PackageFile::RawModule => stem.split('-').next().unwrap_or(stem),
        PackageFile::RawData => stem.strip_suffix("_p").unwrap_or(stem),
        PackageFile::Archive => stem,
    };
    if id.is_empty() {
        return None;
    }
    Some(id.to_string())
}

/// Find all package files directly inside `dir`.
///
/// The scan is not recursive; directories and files with unrecognized
/// extensions are skipped. Results are sorted by path so that registration
/// order is stable across runs.
#[tracing::instrument(skip(runtime))]
pub fn discover_files<R: Runtime>(runtime: &R, dir: &Path) -> Result<Vec<(PathBuf, PackageFile)>> {
    let mut files = Vec::new();

    if !runtime.exists(dir) {
        warn!("Package directory {:?} does not exist", dir);
        return Ok(files);
    }

    for path in runtime.read_dir(dir)? {
        if !runtime.is_file(&path) {
            continue;
        }
        match PackageFile::classify(&path) {
            Some(kind) => files.push((path, kind)),
            None => debug!("Ignoring {:?}", path),
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}
