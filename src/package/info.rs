use semver::Version;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Component, Path};

use super::LOAD_LAST;
use super::version::{VersionRange, deserialize_version};

/// Package metadata declared in a manifest.
///
/// Identity is the `id`; two infos with the same id compare equal even if
/// the rest of the metadata differs.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageInfo {
    #[serde(rename = "mod_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "deserialize_version")]
    pub version: Version,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, VersionRange>,
    #[serde(default)]
    pub optional_dependencies: BTreeMap<String, VersionRange>,
}

impl PackageInfo {
    /// Info for a package that carries no real metadata.
    pub fn placeholder(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            version: Version::new(0, 0, 0),
            description: String::new(),
            authors: Vec::new(),
            dependencies: BTreeMap::new(),
            optional_dependencies: BTreeMap::new(),
        }
    }

    /// Reject metadata the loader cannot work with, and fill in defaults.
    pub fn validate(mut self) -> Result<Self, String> {
        check_package_id(&self.id)?;
        if self.name.is_empty() {
            self.name = self.id.clone();
        }
        Ok(self)
    }

    /// Whether this package is pinned to the end of the load order.
    pub fn is_pinned_last(&self) -> bool {
        self.dependencies.contains_key(LOAD_LAST)
    }
}

/// Check that `id` can name a package.
///
/// Ids end up in file names under the config directory, so an id must be a
/// single plain path component, and the `@` prefix is reserved for
/// pseudo-dependencies such as [`LOAD_LAST`].
pub fn check_package_id(id: &str) -> Result<(), String> {
    if id.trim().is_empty() {
        return Err("mod_id must not be empty".to_string());
    }
    if id.starts_with('@') {
        return Err(format!("mod_id '{}' uses the reserved '@' prefix", id));
    }
    let mut components = Path::new(id).components();
    let single_name = matches!(
        components.next(),
        Some(Component::Normal(name)) if name.to_str() == Some(id)
    ) && components.next().is_none();
    if !single_name || id.contains(['/', '\\']) {
        return Err(format!("mod_id '{}' is not a plain file name", id));
    }
    Ok(())
}

impl PartialEq for PackageInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PackageInfo {}
