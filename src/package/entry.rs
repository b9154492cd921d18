use std::fmt;
use std::path::{Path, PathBuf};

use super::PackageInfo;

/// Where a loading entry came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySource {
    /// Synthesized for the host platform itself.
    BuiltIn,
    /// A file in the package directory.
    File(PathBuf),
}

impl fmt::Display for EntrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntrySource::BuiltIn => f.write_str("<built-in>"),
            EntrySource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Working record for one package from discovery through ordering.
#[derive(Debug, Clone)]
pub struct LoadingEntry {
    pub info: PackageInfo,
    pub source: EntrySource,
    /// Dynamic module contributed by the package; at most one.
    pub module: Option<PathBuf>,
    /// Data payloads in manifest order.
    pub data_payloads: Vec<PathBuf>,
    /// Synthesized from a bare file without a manifest.
    pub raw: bool,
}

impl LoadingEntry {
    pub fn new(info: PackageInfo, source: &Path) -> Self {
        Self {
            info,
            source: EntrySource::File(source.to_path_buf()),
            module: None,
            data_payloads: Vec::new(),
            raw: false,
        }
    }

    pub fn built_in(info: PackageInfo) -> Self {
        Self {
            info,
            source: EntrySource::BuiltIn,
            module: None,
            data_payloads: Vec::new(),
            raw: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    /// Attach the package's dynamic module. Fails if one is already set.
    pub fn set_module(&mut self, path: PathBuf) -> Result<(), String> {
        if let Some(existing) = &self.module {
            return Err(format!(
                "package {} can only have one module at a time (already has {})",
                self.info.id,
                existing.display()
            ));
        }
        self.module = Some(path);
        Ok(())
    }
}
