//! Archive reader.
//!
//! Opens a packaged archive, reads its `data.json` manifest, registers the
//! package and resolves every declared object: configuration files are
//! copied out once, data payloads and the module go through the content
//! cache.

mod manifest;
mod zip;

pub use manifest::{MANIFEST_NAME, Manifest, ManifestObject, ObjectKind, parse_manifest};
pub use zip::PackageArchive;

use log::{debug, info};
use std::path::Path;

use crate::cache::ContentCache;
use crate::config::Config;
use crate::package::LoadingEntry;
use crate::problem::{Problem, ProblemKind};
use crate::registry::PackageRegistry;
use crate::runtime::Runtime;

pub struct ArchiveReader<'a, R: Runtime> {
    runtime: &'a R,
    cache: &'a ContentCache,
    config: &'a Config,
}

impl<'a, R: Runtime> ArchiveReader<'a, R> {
    pub fn new(runtime: &'a R, cache: &'a ContentCache, config: &'a Config) -> Self {
        Self {
            runtime,
            cache,
            config,
        }
    }

    /// Read the archive at `path` and register its package.
    ///
    /// On failure the package is left out of `registry` entirely.
    #[tracing::instrument(skip(self, registry))]
    pub fn ingest(&self, path: &Path, registry: &mut PackageRegistry) -> Result<(), Problem> {
        let failed = || format!("Failed to load zip mod from {}", path.display());

        let mut archive = PackageArchive::open(self.runtime, path)
            .map_err(|e| Problem::malformed(format!("{:#}", e)).context(failed()))?;
        let Manifest { info, objects } = archive.manifest().map_err(|p| p.context(failed()))?;
        let id = info.id.clone();

        let entry = registry.register_entry(info, path)?;
        if let Err(problem) = self.extract_objects(&mut archive, entry, &objects) {
            registry.withdraw(&id);
            return Err(problem.context(failed()));
        }

        info!("Found mod {} in {}", id, path.display());
        Ok(())
    }

    fn extract_objects(
        &self,
        archive: &mut PackageArchive,
        entry: &mut LoadingEntry,
        objects: &[ManifestObject],
    ) -> Result<(), Problem> {
        for object in objects {
            let name = object.entry_name();
            match &object.kind {
                ObjectKind::Config => self.extract_config(archive, entry.id(), &name)?,
                ObjectKind::Pak => {
                    let bytes = archive.read_file(&name)?;
                    let cached = self.cache_payload(&bytes)?;
                    debug!("{}: data payload {} -> {:?}", entry.id(), name, cached);
                    entry.data_payloads.push(cached);
                }
                ObjectKind::Module => {
                    let bytes = archive.read_file(&name)?;
                    let cached = self.cache_payload(&bytes)?;
                    debug!("{}: module {} -> {:?}", entry.id(), name, cached);
                    entry.set_module(cached).map_err(Problem::malformed)?;
                }
                ObjectKind::CoreModule => {
                    return Err(Problem::malformed(format!(
                        "core module object {} is not supported",
                        name
                    )));
                }
                ObjectKind::Unrecognized(kind) => {
                    return Err(Problem::malformed(format!(
                        "unknown archive object type '{}'",
                        kind
                    )));
                }
            }
        }
        Ok(())
    }

    /// Copy a default configuration out of the archive unless the user already has one.
    fn extract_config(
        &self,
        archive: &mut PackageArchive,
        package_id: &str,
        name: &str,
    ) -> Result<(), Problem> {
        let target = self.config.package_config_path(package_id);
        if self.runtime.exists(&target) {
            debug!("Keeping existing config {:?}", target);
            return Ok(());
        }

        let bytes = archive.read_file(name)?;
        let io_problem = |e: anyhow::Error| {
            Problem::new(
                ProblemKind::Io,
                format!("Failed to write config {:?}: {:#}", target, e),
            )
        };
        if let Some(parent) = target.parent() {
            self.runtime.create_dir_all(parent).map_err(io_problem)?;
        }
        self.runtime.write(&target, &bytes).map_err(io_problem)?;
        info!("Extracted default config to {:?}", target);
        Ok(())
    }

    fn cache_payload(&self, bytes: &[u8]) -> Result<std::path::PathBuf, Problem> {
        self.cache
            .store(self.runtime, bytes)
            .map_err(|e| Problem::new(ProblemKind::CacheIntegrity, format!("{:#}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ContentHash;
    use crate::config::HostInfo;
    use crate::runtime::RealRuntime;
    use crate::test_utils::{manifest_json, write_zip};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{TempDir, tempdir};

    struct Fixture {
        dir: TempDir,
        cache: ContentCache,
        config: Config,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let config = Config {
                mods_dir: dir.path().join("mods"),
                cache_dir: dir.path().join("cache"),
                config_dir: dir.path().join("configs"),
                allow_raw: true,
                host: HostInfo::default(),
            };
            fs::create_dir_all(&config.mods_dir).unwrap();
            Self {
                cache: ContentCache::new(&config.cache_dir),
                dir,
                config,
            }
        }

        fn archive(&self, file_name: &str, files: &[(&str, &str)]) -> PathBuf {
            let path = self.config.mods_dir.join(file_name);
            write_zip(&path, files).unwrap();
            path
        }

        fn ingest(&self, path: &Path, registry: &mut PackageRegistry) -> Result<(), Problem> {
            ArchiveReader::new(&RealRuntime, &self.cache, &self.config).ingest(path, registry)
        }
    }

    fn registry() -> PackageRegistry {
        PackageRegistry::new(&HostInfo::default())
    }

    #[test]
    fn test_ingest_full_package() {
        let fixture = Fixture::new();
        let manifest = manifest_json(
            "Foo",
            "1.2.0",
            &[("sml_mod", "Foo.dll"), ("pak", "Foo_p.pak"), ("config", "Foo.cfg")],
        );
        let path = fixture.archive(
            "Foo.smod",
            &[
                (MANIFEST_NAME, manifest.as_str()),
                ("Foo.dll", "module code"),
                ("Foo_p.pak", "pak data"),
                ("Foo.cfg", "speed=1"),
            ],
        );
        let mut registry = registry();

        fixture.ingest(&path, &mut registry).unwrap();

        let entry = registry.get("Foo").unwrap();
        let module = fixture
            .cache
            .path_for(&ContentHash::of(b"module code"));
        assert_eq!(entry.module.as_ref(), Some(&module));
        assert_eq!(fs::read(&module).unwrap(), b"module code");
        assert_eq!(
            entry.data_payloads,
            vec![fixture.cache.path_for(&ContentHash::of(b"pak data"))]
        );
        assert_eq!(
            fs::read_to_string(fixture.config.package_config_path("Foo")).unwrap(),
            "speed=1"
        );
        assert!(fixture.dir.path().join("cache").is_dir());
    }

    #[test]
    fn test_existing_config_is_not_overwritten() {
        let fixture = Fixture::new();
        let manifest = manifest_json("Foo", "1.0.0", &[("config", "Foo.cfg")]);
        let path = fixture.archive(
            "Foo.smod",
            &[(MANIFEST_NAME, manifest.as_str()), ("Foo.cfg", "default")],
        );
        let target = fixture.config.package_config_path("Foo");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "user edited").unwrap();

        fixture.ingest(&path, &mut registry()).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "user edited");
    }

    #[test]
    fn test_shared_payload_is_stored_once() {
        let fixture = Fixture::new();
        let a = fixture.archive(
            "A.smod",
            &[
                (MANIFEST_NAME, manifest_json("A", "1.0.0", &[("pak", "shared.pak")]).as_str()),
                ("shared.pak", "same bytes"),
            ],
        );
        let b = fixture.archive(
            "B.smod",
            &[
                (MANIFEST_NAME, manifest_json("B", "1.0.0", &[("pak", "other/shared.pak")]).as_str()),
                ("other/shared.pak", "same bytes"),
            ],
        );
        let mut registry = registry();

        fixture.ingest(&a, &mut registry).unwrap();
        fixture.ingest(&b, &mut registry).unwrap();

        assert_eq!(
            registry.get("A").unwrap().data_payloads,
            registry.get("B").unwrap().data_payloads
        );
        assert_eq!(fs::read_dir(&fixture.config.cache_dir).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_manifest() {
        let fixture = Fixture::new();
        let path = fixture.archive("NoManifest.zip", &[("readme.txt", "hi")]);

        let problem = fixture.ingest(&path, &mut registry()).unwrap_err();

        assert_eq!(problem.kind, ProblemKind::MalformedInput);
        assert_eq!(
            problem.message,
            format!(
                "Failed to load zip mod from {}: data.json entry is missing",
                path.display()
            )
        );
    }

    #[test]
    fn test_failed_package_is_withdrawn() {
        let cases = vec![
            ("unknown type", vec![("blob", "a.bin")]),
            ("core module", vec![("core_mod", "core.dll")]),
            ("missing object", vec![("pak", "absent.pak")]),
            ("two modules", vec![("sml_mod", "a.dll"), ("sml_mod", "b.dll")]),
        ];

        for (label, objects) in cases {
            let fixture = Fixture::new();
            let manifest = manifest_json("Bad", "1.0.0", &objects);
            let path = fixture.archive(
                "Bad.smod",
                &[(MANIFEST_NAME, manifest.as_str()), ("a.dll", "a"), ("b.dll", "b"), ("a.bin", "x")],
            );
            let mut registry = registry();

            let problem = fixture.ingest(&path, &mut registry).unwrap_err();

            assert_eq!(problem.kind, ProblemKind::MalformedInput, "{}", label);
            assert!(!registry.contains("Bad"), "{}", label);
            assert_eq!(registry.len(), 1, "{}", label);
        }
    }

    #[test]
    fn test_path_like_id_cannot_escape_config_dir() {
        let fixture = Fixture::new();
        let absolute = fixture.dir.path().join("absolute");
        let ids = vec![
            "../escaped".to_string(),
            absolute.to_string_lossy().into_owned(),
        ];

        for id in ids {
            let manifest = manifest_json(&id, "1.0.0", &[("config", "Evil.cfg")]);
            let path = fixture.archive(
                "Evil.smod",
                &[(MANIFEST_NAME, manifest.as_str()), ("Evil.cfg", "owned")],
            );
            let mut registry = registry();

            let problem = fixture.ingest(&path, &mut registry).unwrap_err();

            assert_eq!(problem.kind, ProblemKind::MalformedInput, "{}", id);
            assert!(problem.message.contains("not a plain file name"), "{}", id);
            assert!(!registry.contains(&id));
        }
        assert!(!fixture.dir.path().join("escaped.cfg").exists());
        assert!(!fixture.dir.path().join("absolute.cfg").exists());
        assert!(!fixture.config.config_dir.exists());
    }

    #[test]
    fn test_duplicate_package_is_a_conflict() {
        let fixture = Fixture::new();
        let manifest = manifest_json("Foo", "1.0.0", &[]);
        let first = fixture.archive("Foo.smod", &[(MANIFEST_NAME, manifest.as_str())]);
        let second = fixture.archive("Foo-copy.zip", &[(MANIFEST_NAME, manifest.as_str())]);
        let mut registry = registry();

        fixture.ingest(&first, &mut registry).unwrap();
        let problem = fixture.ingest(&second, &mut registry).unwrap_err();

        assert_eq!(problem.kind, ProblemKind::Conflict);
        assert!(problem.message.starts_with("Found duplicate mods with same mod ID Foo"));
        assert_eq!(registry.get("Foo").unwrap().source.to_string(), first.display().to_string());
    }

    #[test]
    fn test_unreadable_archive() {
        let fixture = Fixture::new();
        let path = fixture.config.mods_dir.join("Broken.smod");
        fs::write(&path, "not a zip").unwrap();

        let problem = fixture.ingest(&path, &mut registry()).unwrap_err();

        assert_eq!(problem.kind, ProblemKind::MalformedInput);
        assert!(problem.message.starts_with("Failed to load zip mod from"));
    }
}
