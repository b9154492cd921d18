//! Loader configuration.
//!
//! Directories come from explicit overrides (CLI flags or their environment
//! variables) and fall back to platform defaults looked up through the
//! [`Runtime`].

use anyhow::{Context, Result};
use log::info;
use semver::Version;
use std::path::PathBuf;

use crate::runtime::Runtime;

/// Identifier of the built-in entry representing the host platform.
pub const HOST_PACKAGE_ID: &str = "modloader";

/// The host platform's own package metadata.
#[derive(Debug, Clone)]
pub struct HostInfo {
    pub id: String,
    pub name: String,
    pub version: Version,
    pub description: String,
}

impl Default for HostInfo {
    fn default() -> Self {
        Self {
            id: HOST_PACKAGE_ID.to_string(),
            name: "Mod Loader".to_string(),
            version: loader_version(),
            description: "Mod loading and compatibility layer".to_string(),
        }
    }
}

fn loader_version() -> Version {
    Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or_else(|_| Version::new(0, 0, 0))
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory scanned (non-recursively) for packages.
    pub mods_dir: PathBuf,
    /// Content-addressed payload cache.
    pub cache_dir: PathBuf,
    /// Destination for extracted per-package configuration files.
    pub config_dir: PathBuf,
    /// Accept bare module/data files without a manifest.
    pub allow_raw: bool,
    pub host: HostInfo,
}

impl Config {
    /// Build a config, filling every directory that was not given explicitly.
    #[tracing::instrument(skip(runtime))]
    pub fn resolve<R: Runtime>(
        runtime: &R,
        mods_dir: Option<PathBuf>,
        cache_dir: Option<PathBuf>,
        config_dir: Option<PathBuf>,
        allow_raw: bool,
    ) -> Result<Self> {
        let mods_dir = match mods_dir {
            Some(path) => path,
            None => runtime.current_dir()?.join("mods"),
        };
        let cache_dir = match cache_dir {
            Some(path) => path,
            None => default_dir(runtime, runtime.cache_dir(), "cache")?,
        };
        let config_dir = match config_dir {
            Some(path) => path,
            None => default_dir(runtime, runtime.config_dir(), "config")?,
        };

        info!(
            "Using mods dir {}, cache dir {}, config dir {}",
            mods_dir.display(),
            cache_dir.display(),
            config_dir.display()
        );

        Ok(Self {
            mods_dir,
            cache_dir,
            config_dir,
            allow_raw,
            host: HostInfo::default(),
        })
    }

    /// Returns: `<config_dir>/<package id>.cfg`
    pub fn package_config_path(&self, package_id: &str) -> PathBuf {
        self.config_dir.join(format!("{}.cfg", package_id))
    }
}

/// `<platform dir>/modloader`, or `~/.modloader/<fallback>` when the platform has none.
fn default_dir<R: Runtime>(
    runtime: &R,
    platform_dir: Option<PathBuf>,
    fallback: &str,
) -> Result<PathBuf> {
    if let Some(dir) = platform_dir {
        return Ok(dir.join("modloader"));
    }
    let home_dir = runtime
        .home_dir()
        .context("Could not find home directory")?;
    Ok(home_dir.join(".modloader").join(fallback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;

    #[test]
    fn test_resolve_uses_explicit_dirs() {
        let mut runtime = MockRuntime::new();
        runtime.expect_current_dir().never();
        runtime.expect_cache_dir().never();
        runtime.expect_config_dir().never();

        let config = Config::resolve(
            &runtime,
            Some(PathBuf::from("/game/mods")),
            Some(PathBuf::from("/tmp/cache")),
            Some(PathBuf::from("/game/configs")),
            false,
        )
        .unwrap();

        assert_eq!(config.mods_dir, PathBuf::from("/game/mods"));
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/cache"));
        assert_eq!(config.config_dir, PathBuf::from("/game/configs"));
        assert!(!config.allow_raw);
        assert_eq!(config.host.id, HOST_PACKAGE_ID);
    }

    #[test]
    fn test_resolve_uses_platform_defaults() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_current_dir()
            .returning(|| Ok(PathBuf::from("/game")));
        runtime
            .expect_cache_dir()
            .returning(|| Some(PathBuf::from("/home/user/.cache")));
        runtime
            .expect_config_dir()
            .returning(|| Some(PathBuf::from("/home/user/.config")));

        let config = Config::resolve(&runtime, None, None, None, true).unwrap();

        assert_eq!(config.mods_dir, PathBuf::from("/game/mods"));
        assert_eq!(config.cache_dir, PathBuf::from("/home/user/.cache/modloader"));
        assert_eq!(config.config_dir, PathBuf::from("/home/user/.config/modloader"));
    }

    #[test]
    fn test_resolve_falls_back_to_home() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_current_dir()
            .returning(|| Ok(PathBuf::from("/game")));
        runtime.expect_cache_dir().returning(|| None);
        runtime.expect_config_dir().returning(|| None);
        runtime
            .expect_home_dir()
            .returning(|| Some(PathBuf::from("/home/user")));

        let config = Config::resolve(&runtime, None, None, None, true).unwrap();

        assert_eq!(config.cache_dir, PathBuf::from("/home/user/.modloader/cache"));
        assert_eq!(config.config_dir, PathBuf::from("/home/user/.modloader/config"));
    }

    #[test]
    fn test_resolve_without_home_fails() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_current_dir()
            .returning(|| Ok(PathBuf::from("/game")));
        runtime.expect_cache_dir().returning(|| None);
        runtime.expect_home_dir().returning(|| None);

        let result = Config::resolve(&runtime, None, None, None, true);
        assert!(result.is_err());
    }

    #[test]
    fn test_package_config_path() {
        let mut runtime = MockRuntime::new();
        runtime.expect_current_dir().never();
        let config = Config::resolve(
            &runtime,
            Some(PathBuf::from("/m")),
            Some(PathBuf::from("/c")),
            Some(PathBuf::from("/cfg")),
            true,
        )
        .unwrap();

        assert_eq!(config.package_config_path("Foo"), PathBuf::from("/cfg/Foo.cfg"));
    }

    #[test]
    fn test_host_version_matches_crate() {
        assert_eq!(
            HostInfo::default().version.to_string(),
            env!("CARGO_PKG_VERSION")
        );
    }
}
