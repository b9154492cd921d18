//! Load orchestration.
//!
//! Hands the ordered packages to the [`Host`]: every module is mapped first,
//! then data payloads are registered in load order, then init hooks run.
//! Failures reported by the host are collected in the [`LoadReport`] and
//! never stop the remaining packages from loading.

mod dry_run;

pub use dry_run::DryRunHost;

use anyhow::Result;
use log::{debug, error, info};
use std::collections::HashMap;
use std::path::Path;

use crate::package::{LoadingEntry, PackageInfo};
use crate::problem::Problem;

/// Symbol every package module must export.
pub const MODULE_ENTRY_POINT: &str = "InitializeModule";

/// Opaque handle to a module mapped by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleHandle(pub u64);

/// Opaque address of a resolved module symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryPoint(pub u64);

/// The process hosting the loader.
#[cfg_attr(test, mockall::automock)]
pub trait Host {
    /// Map a dynamic module into the process.
    fn map_module(&mut self, path: &Path) -> Result<ModuleHandle>;

    fn resolve_entry_point(&mut self, module: ModuleHandle, symbol: &str) -> Option<EntryPoint>;

    fn register_data_payload(&mut self, path: &Path) -> Result<()>;

    /// Whether the payloads registered for `package_id` provide an init hook.
    fn has_init_hook(&self, package_id: &str) -> bool;

    fn invoke_init_hook(&mut self, package_id: &str) -> Result<()>;
}

/// A package that made it through loading.
#[derive(Debug, Clone)]
pub struct LoadedPackage {
    pub info: PackageInfo,
    pub module: Option<ModuleHandle>,
    pub entry_point: Option<EntryPoint>,
}

impl LoadedPackage {
    pub fn id(&self) -> &str {
        &self.info.id
    }

    /// The package's module was mapped and its entry point found.
    pub fn has_code(&self) -> bool {
        self.entry_point.is_some()
    }
}

/// Packages in load order, queryable by id.
#[derive(Debug, Default)]
pub struct LoadedPackages {
    packages: Vec<LoadedPackage>,
    index: HashMap<String, usize>,
    init_hooks: Vec<String>,
}

impl LoadedPackages {
    fn push(&mut self, package: LoadedPackage) {
        self.index.insert(package.id().to_string(), self.packages.len());
        self.packages.push(package);
    }

    /// Identifiers in load order.
    pub fn ids(&self) -> Vec<&str> {
        self.packages.iter().map(LoadedPackage::id).collect()
    }

    pub fn is_loaded(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&LoadedPackage> {
        self.index.get(id).map(|&position| &self.packages[position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadedPackage> {
        self.packages.iter()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Packages whose init hook is pending, in load order.
    pub fn init_hooks(&self) -> &[String] {
        &self.init_hooks
    }

    /// Invoke every pending init hook. A failing hook is reported and the
    /// rest still run.
    #[tracing::instrument(skip(self, host))]
    pub fn run_init_hooks<H: Host + ?Sized>(&self, host: &mut H) -> Vec<Problem> {
        let mut problems = Vec::new();
        for id in &self.init_hooks {
            debug!("Calling init hook of {}", id);
            if let Err(e) = host.invoke_init_hook(id) {
                let problem = Problem::host(format!("Failed to call init hook of {}: {:#}", id, e));
                error!("{}", problem);
                problems.push(problem);
            }
        }
        problems
    }
}

/// Outcome of [`load`].
#[derive(Debug, Default)]
pub struct LoadReport {
    pub packages: LoadedPackages,
    pub problems: Vec<Problem>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }

    fn record(&mut self, message: String) {
        let problem = Problem::host(message);
        error!("{}", problem);
        self.problems.push(problem);
    }
}

/// Load `entries`, which must already be in dependency order.
#[tracing::instrument(skip(host, entries), fields(packages = entries.len()))]
pub fn load<H: Host + ?Sized>(host: &mut H, entries: Vec<LoadingEntry>) -> LoadReport {
    let mut report = LoadReport::default();

    info!("Mapping modules into the process...");
    let mut modules: HashMap<&str, ModuleHandle> = HashMap::new();
    for entry in &entries {
        let Some(module) = &entry.module else {
            continue;
        };
        match host.map_module(module) {
            Ok(handle) => {
                modules.insert(entry.id(), handle);
            }
            Err(e) => report.record(format!("Failed to load module {}: {:#}", entry.id(), e)),
        }
    }

    info!("Initializing modules...");
    let mut entry_points: HashMap<&str, EntryPoint> = HashMap::new();
    for entry in &entries {
        let Some(&handle) = modules.get(entry.id()) else {
            continue;
        };
        match host.resolve_entry_point(handle, MODULE_ENTRY_POINT) {
            Some(entry_point) => {
                entry_points.insert(entry.id(), entry_point);
            }
            None => report.record(format!(
                "Failed to initialize module {}: {}() function not found",
                entry.id(),
                MODULE_ENTRY_POINT
            )),
        }
    }

    // Payloads may refer to the package list, so it is complete before any is registered.
    for entry in &entries {
        report.packages.push(LoadedPackage {
            info: entry.info.clone(),
            module: modules.get(entry.id()).copied(),
            entry_point: entry_points.get(entry.id()).copied(),
        });
    }

    info!("Registering data payloads...");
    for entry in &entries {
        for payload in &entry.data_payloads {
            if let Err(e) = host.register_data_payload(payload) {
                report.record(format!(
                    "Failed to register data payload {} of {}: {:#}",
                    payload.display(),
                    entry.id(),
                    e
                ));
            }
        }
        if !entry.data_payloads.is_empty() && host.has_init_hook(entry.id()) {
            debug!("{} has an init hook", entry.id());
            report.packages.init_hooks.push(entry.id().to_string());
        }
    }

    info!("Loaded {} packages", report.packages.len());
    report
}
