//! Stage driver.
//!
//! Runs discovery, dependency resolution and loading strictly in order.
//! Problems found in discovery or resolution end the run before the next
//! stage starts.

use log::{info, warn};
use std::path::Path;

use crate::archive::ArchiveReader;
use crate::cache::ContentCache;
use crate::config::Config;
use crate::loader::{self, Host, LoadReport};
use crate::package::{LoadingEntry, PackageFile, discover_files, raw_package_id};
use crate::problem::{Problem, ProblemKind, Stage, StageFailure, check_stage};
use crate::registry::PackageRegistry;
use crate::resolver;
use crate::runtime::Runtime;

pub struct ModLoader<R: Runtime> {
    runtime: R,
    config: Config,
    cache: ContentCache,
}

impl<R: Runtime> ModLoader<R> {
    pub fn new(runtime: R, config: Config) -> Self {
        let cache = ContentCache::new(&config.cache_dir);
        Self {
            runtime,
            config,
            cache,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Scan the package directory and register every package found there.
    #[tracing::instrument(skip(self))]
    pub fn discover(&self) -> Result<PackageRegistry, StageFailure> {
        info!("Discovering mods in {}", self.config.mods_dir.display());
        let mut registry = PackageRegistry::new(&self.config.host);

        let files = discover_files(&self.runtime, &self.config.mods_dir).map_err(|e| {
            StageFailure::new(
                Stage::Discovery,
                vec![Problem::new(ProblemKind::Io, format!("{:#}", e))],
            )
        })?;

        let reader = ArchiveReader::new(&self.runtime, &self.cache, &self.config);
        let mut problems = Vec::new();
        for (path, kind) in files {
            let result = match kind {
                PackageFile::Archive => reader.ingest(&path, &mut registry),
                PackageFile::RawModule | PackageFile::RawData => {
                    self.register_raw(&path, kind, &mut registry)
                }
            };
            if let Err(problem) = result {
                warn!("{}", problem);
                problems.push(problem);
            }
        }

        check_stage(Stage::Discovery, problems)?;
        info!("Discovered {} packages", registry.len());
        Ok(registry)
    }

    fn register_raw(
        &self,
        path: &Path,
        kind: PackageFile,
        registry: &mut PackageRegistry,
    ) -> Result<(), Problem> {
        if !self.config.allow_raw {
            return Err(Problem::conflict(format!(
                "Unsupported raw mod file {}: raw mods are only allowed in development mode",
                path.display()
            )));
        }
        let id = raw_package_id(path).ok_or_else(|| {
            Problem::malformed(format!("Cannot derive a mod ID from {}", path.display()))
        })?;

        let entry = registry.register_raw_entry(&id, path)?;
        match kind {
            PackageFile::RawModule => entry
                .set_module(path.to_path_buf())
                .map_err(Problem::malformed)?,
            _ => entry.data_payloads.push(path.to_path_buf()),
        }
        Ok(())
    }

    /// Order the discovered packages.
    pub fn resolve(&self, registry: PackageRegistry) -> Result<Vec<LoadingEntry>, StageFailure> {
        resolver::resolve(registry)
            .map_err(|problems| StageFailure::new(Stage::DependencyResolution, problems))
    }

    /// Hand the ordered packages to `host`. Host failures are reported, not fatal.
    pub fn load<H: Host + ?Sized>(&self, host: &mut H, entries: Vec<LoadingEntry>) -> LoadReport {
        let report = loader::load(host, entries);
        if !report.is_clean() {
            warn!(
                "{} problem(s) during loading stage '{}'",
                report.problems.len(),
                Stage::Initialization
            );
        }
        report
    }

    /// Discover, resolve and load.
    #[tracing::instrument(skip(self, host))]
    pub fn run<H: Host + ?Sized>(&self, host: &mut H) -> Result<LoadReport, StageFailure> {
        let registry = self.discover()?;
        let entries = self.resolve(registry)?;
        Ok(self.load(host, entries))
    }
}
