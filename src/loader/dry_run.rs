use anyhow::{Result, bail};
use log::info;
use std::path::{Path, PathBuf};

use super::{EntryPoint, Host, ModuleHandle};
use crate::runtime::Runtime;

/// A host that maps nothing.
///
/// Modules and payloads are only checked for existence and recorded, so
/// the whole pipeline can be exercised outside a real host process.
/// Module entry points are assumed to exist and no package has an init hook.
pub struct DryRunHost<'a, R: Runtime> {
    runtime: &'a R,
    modules: Vec<PathBuf>,
    payloads: Vec<PathBuf>,
}

impl<'a, R: Runtime> DryRunHost<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Self {
            runtime,
            modules: Vec::new(),
            payloads: Vec::new(),
        }
    }

    /// Modules in mapping order.
    pub fn modules(&self) -> &[PathBuf] {
        &self.modules
    }

    /// Payloads in registration order.
    pub fn payloads(&self) -> &[PathBuf] {
        &self.payloads
    }
}

impl<R: Runtime> Host for DryRunHost<'_, R> {
    fn map_module(&mut self, path: &Path) -> Result<ModuleHandle> {
        if !self.runtime.is_file(path) {
            bail!("module file {:?} does not exist", path);
        }
        self.modules.push(path.to_path_buf());
        info!("[dry-run] map module {:?}", path);
        Ok(ModuleHandle(self.modules.len() as u64))
    }

    fn resolve_entry_point(&mut self, module: ModuleHandle, symbol: &str) -> Option<EntryPoint> {
        let known = module.0 >= 1 && module.0 <= self.modules.len() as u64;
        if known {
            info!("[dry-run] resolve {} in module #{}", symbol, module.0);
        }
        known.then_some(EntryPoint(module.0))
    }

    fn register_data_payload(&mut self, path: &Path) -> Result<()> {
        if !self.runtime.is_file(path) {
            bail!("data payload {:?} does not exist", path);
        }
        info!("[dry-run] register payload {:?}", path);
        self.payloads.push(path.to_path_buf());
        Ok(())
    }

    fn has_init_hook(&self, _package_id: &str) -> bool {
        false
    }

    fn invoke_init_hook(&mut self, package_id: &str) -> Result<()> {
        info!("[dry-run] init hook of {}", package_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{MODULE_ENTRY_POINT, load};
    use crate::package::{LoadingEntry, PackageInfo};
    use crate::runtime::MockRuntime;

    #[test]
    fn test_dry_run_records_existing_files() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_is_file()
            .returning(|p| p != Path::new("/cache/missing"));

        let mut host = DryRunHost::new(&runtime);

        let handle = host.map_module(Path::new("/cache/module")).unwrap();
        assert_eq!(
            host.resolve_entry_point(handle, MODULE_ENTRY_POINT),
            Some(EntryPoint(1))
        );
        assert!(host.resolve_entry_point(ModuleHandle(9), MODULE_ENTRY_POINT).is_none());
        assert!(host.register_data_payload(Path::new("/cache/missing")).is_err());
        host.register_data_payload(Path::new("/cache/pak")).unwrap();

        assert_eq!(host.modules(), [PathBuf::from("/cache/module")]);
        assert_eq!(host.payloads(), [PathBuf::from("/cache/pak")]);
        assert!(!host.has_init_hook("Any"));
    }

    #[test]
    fn test_dry_run_load() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_is_file()
            .returning(|p| !p.ends_with("gone.dll"));

        let mut a = LoadingEntry::new(PackageInfo::placeholder("A"), Path::new("mods/A.smod"));
        a.module = Some(PathBuf::from("/cache/a"));
        a.data_payloads.push(PathBuf::from("/cache/a-pak"));
        let mut b = LoadingEntry::new(PackageInfo::placeholder("B"), Path::new("mods/B.dll"));
        b.module = Some(PathBuf::from("mods/gone.dll"));

        let mut host = DryRunHost::new(&runtime);
        let report = load(&mut host, vec![a, b]);

        assert_eq!(report.problems.len(), 1);
        assert!(report.packages.get("A").unwrap().has_code());
        assert!(!report.packages.get("B").unwrap().has_code());
        assert_eq!(host.payloads(), [PathBuf::from("/cache/a-pak")]);
    }
}
