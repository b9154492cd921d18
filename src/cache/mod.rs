//! Content-addressed payload cache.
//!
//! Payloads are stored in a flat directory, one file per unique content,
//! named by the lowercase hex SHA-256 digest of the bytes. Identical payloads
//! shipped by several packages share one file, and a corrupted file is
//! detected by re-hashing and rewritten.

use anyhow::{Context, Result, bail};
use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;

use crate::runtime::Runtime;

/// Lowercase hex SHA-256 digest of some content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn of(bytes: &[u8]) -> Self {
        ContentHash(hex::encode(Sha256::digest(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct ContentCache {
    root: PathBuf,
}

impl ContentCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns: `<root>/<hex digest>`
    pub fn path_for(&self, hash: &ContentHash) -> PathBuf {
        self.root.join(hash.as_str())
    }

    /// Hash `bytes` and materialize them in the cache.
    pub fn store<R: Runtime>(&self, runtime: &R, bytes: &[u8]) -> Result<PathBuf> {
        let hash = ContentHash::of(bytes);
        self.materialize(runtime, bytes, &hash)
    }

    /// Make sure a file holding `bytes` exists at the cache path for `expected`.
    ///
    /// An existing file is only kept if its own digest still matches;
    /// otherwise it is removed and rewritten. Nothing is written on a hit.
    #[tracing::instrument(skip(self, runtime, bytes))]
    pub fn materialize<R: Runtime>(
        &self,
        runtime: &R,
        bytes: &[u8],
        expected: &ContentHash,
    ) -> Result<PathBuf> {
        let actual = ContentHash::of(bytes);
        if actual != *expected {
            bail!(
                "Payload digest {} does not match expected digest {}",
                actual,
                expected
            );
        }

        let path = self.path_for(expected);
        if runtime.exists(&path) {
            let existing = runtime
                .read(&path)
                .with_context(|| format!("Failed to read cached file {:?}", path))?;
            if ContentHash::of(&existing) == *expected {
                debug!("Cache hit for {}", expected);
                return Ok(path);
            }
            warn!("Cached file {:?} is corrupted, rewriting it", path);
            runtime
                .remove_file(&path)
                .with_context(|| format!("Failed to remove corrupted cache file {:?}", path))?;
        } else {
            runtime
                .create_dir_all(&self.root)
                .with_context(|| format!("Failed to create cache directory {:?}", self.root))?;
        }

        debug!("Writing {} bytes to {:?}", bytes.len(), path);
        runtime.write(&path, bytes)?;

        let written = runtime
            .read(&path)
            .with_context(|| format!("Failed to verify cached file {:?}", path))?;
        if ContentHash::of(&written) != *expected {
            bail!("Cached file {:?} does not match digest {} after writing", path, expected);
        }
        Ok(path)
    }
}
