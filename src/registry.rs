//! Package registry for the discovery stage.
//!
//! Holds exactly one [`LoadingEntry`] per package identifier, in registration
//! order, and rejects duplicates. The host platform's own entry is always
//! present so packages can depend on the host version.

use log::{debug, warn};
use std::collections::HashMap;
use std::path::Path;

use crate::config::HostInfo;
use crate::package::{LOAD_LAST, LoadingEntry, PackageInfo, VersionRange, check_package_id};
use crate::problem::Problem;

#[derive(Debug)]
pub struct PackageRegistry {
    entries: Vec<LoadingEntry>,
    index: HashMap<String, usize>,
}

impl PackageRegistry {
    /// Create a registry seeded with the host's built-in entry.
    pub fn new(host: &HostInfo) -> Self {
        let info = PackageInfo {
            id: host.id.clone(),
            name: host.name.clone(),
            version: host.version.clone(),
            description: host.description.clone(),
            ..PackageInfo::placeholder(host.id.clone())
        };
        let mut registry = Self {
            entries: Vec::new(),
            index: HashMap::new(),
        };
        registry.insert(LoadingEntry::built_in(info));
        registry
    }

    fn insert(&mut self, entry: LoadingEntry) -> &mut LoadingEntry {
        let position = self.entries.len();
        self.index.insert(entry.id().to_string(), position);
        self.entries.push(entry);
        &mut self.entries[position]
    }

    /// Register a packaged entry. A second registration of the same id is a conflict.
    pub fn register_entry(
        &mut self,
        info: PackageInfo,
        source: &Path,
    ) -> Result<&mut LoadingEntry, Problem> {
        if let Some(existing) = self.get(&info.id) {
            return Err(Problem::conflict(format!(
                "Found duplicate mods with same mod ID {}: {} and {}",
                info.id,
                source.display(),
                existing.source
            )));
        }
        debug!("Registering {} {} from {:?}", info.id, info.version, source);
        Ok(self.insert(LoadingEntry::new(info, source)))
    }

    /// Register (or extend) an entry synthesized from a bare file.
    ///
    /// Raw entries have placeholder metadata and a dependency on [`LOAD_LAST`].
    /// Several raw files with the same id share one entry; a raw file that
    /// collides with a packaged entry is a conflict. Ids that could not name
    /// a packaged entry either, such as [`LOAD_LAST`], are malformed.
    pub fn register_raw_entry(
        &mut self,
        id: &str,
        source: &Path,
    ) -> Result<&mut LoadingEntry, Problem> {
        check_package_id(id).map_err(|e| {
            Problem::malformed(format!("Invalid raw mod file {}: {}", source.display(), e))
        })?;
        match self.index.get(id).copied() {
            Some(position) if self.entries[position].raw => Ok(&mut self.entries[position]),
            Some(_) => Err(Problem::conflict(format!(
                "Found raw mod file conflicting with packed mod: {}",
                source.display()
            ))),
            None => {
                warn!("Loading development raw mod: {}", source.display());
                warn!("Dependencies and versioning won't work!");
                let mut info = PackageInfo::placeholder(id);
                info.dependencies
                    .insert(LOAD_LAST.to_string(), VersionRange::any());
                let mut entry = LoadingEntry::new(info, source);
                entry.raw = true;
                Ok(self.insert(entry))
            }
        }
    }

    /// Remove an entry whose ingestion failed halfway.
    pub fn withdraw(&mut self, id: &str) -> Option<LoadingEntry> {
        let position = self.index.remove(id)?;
        let entry = self.entries.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(entry)
    }

    pub fn get(&self, id: &str) -> Option<&LoadingEntry> {
        self.index.get(id).map(|&position| &self.entries[position])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Entries in registration order.
    pub fn entries(&self) -> &[LoadingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<LoadingEntry> {
        self.entries
    }
}
