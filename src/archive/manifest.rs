use serde::Deserialize;
use serde_json::Value;

use crate::package::PackageInfo;
use crate::problem::Problem;

/// Name of the manifest entry at the archive root.
pub const MANIFEST_NAME: &str = "data.json";

/// Type of an object declared in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ObjectKind {
    /// Default configuration, copied out once and never overwritten.
    Config,
    /// Data payload registered with the host.
    Pak,
    /// The package's own dynamic module.
    Module,
    /// Host core replacement; never accepted from a package.
    CoreModule,
    Unrecognized(String),
}

impl From<String> for ObjectKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "config" => ObjectKind::Config,
            "pak" => ObjectKind::Pak,
            "sml_mod" | "module" => ObjectKind::Module,
            "core_mod" => ObjectKind::CoreModule,
            _ => ObjectKind::Unrecognized(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestObject {
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    pub path: String,
}

impl ManifestObject {
    /// Path of the object inside the archive, with `/` separators and no leading slash.
    pub fn entry_name(&self) -> String {
        self.path.replace('\\', "/").trim_start_matches('/').to_string()
    }
}

#[derive(Debug, Clone)]
pub struct Manifest {
    pub info: PackageInfo,
    pub objects: Vec<ManifestObject>,
}

/// Strip a UTF-8 BOM and trailing NUL or whitespace bytes.
fn trim_manifest(bytes: &[u8]) -> &[u8] {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let end = bytes
        .iter()
        .rposition(|&b| b != 0 && !b.is_ascii_whitespace())
        .map_or(0, |last| last + 1);
    &bytes[..end]
}

/// Parse the raw bytes of a `data.json` entry.
pub fn parse_manifest(bytes: &[u8]) -> Result<Manifest, Problem> {
    let value: Value = serde_json::from_slice(trim_manifest(bytes))
        .map_err(|e| Problem::malformed(format!("{} is not valid JSON: {}", MANIFEST_NAME, e)))?;

    let Value::Object(mut fields) = value else {
        return Err(Problem::malformed(format!(
            "{} must contain a JSON object",
            MANIFEST_NAME
        )));
    };

    let objects = match fields.remove("objects") {
        Some(objects @ Value::Array(_)) => serde_json::from_value::<Vec<ManifestObject>>(objects)
            .map_err(|e| Problem::malformed(format!("invalid object entry: {}", e)))?,
        Some(_) => return Err(Problem::malformed("'objects' must be an array")),
        None => return Err(Problem::malformed("'objects' array is missing")),
    };

    let info = serde_json::from_value::<PackageInfo>(Value::Object(fields))
        .map_err(|e| Problem::malformed(format!("invalid package metadata: {}", e)))?
        .validate()
        .map_err(Problem::malformed)?;

    Ok(Manifest { info, objects })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::ProblemKind;
    use semver::Version;

    const MANIFEST: &str = r#"{
        "mod_id": "RefinedPower",
        "name": "Refined Power",
        "version": "2.1.0",
        "dependencies": { "modloader": ">=0.1.0" },
        "objects": [
            { "type": "sml_mod", "path": "RefinedPower.dll" },
            { "type": "pak", "path": "RefinedPower_p.pak" },
            { "type": "config", "path": "config.cfg" }
        ]
    }"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = parse_manifest(MANIFEST.as_bytes()).unwrap();

        assert_eq!(manifest.info.id, "RefinedPower");
        assert_eq!(manifest.info.version, Version::new(2, 1, 0));
        assert_eq!(
            manifest
                .objects
                .iter()
                .map(|o| o.kind.clone())
                .collect::<Vec<_>>(),
            vec![ObjectKind::Module, ObjectKind::Pak, ObjectKind::Config]
        );
        assert_eq!(manifest.objects[1].path, "RefinedPower_p.pak");
    }

    #[test]
    fn test_parse_manifest_tolerates_bom_and_trailing_nul() {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice(MANIFEST.as_bytes());
        bytes.extend_from_slice(b"\r\n\0\0");

        let manifest = parse_manifest(&bytes).unwrap();
        assert_eq!(manifest.info.id, "RefinedPower");
    }

    #[test]
    fn test_unknown_object_type_is_kept_for_reporting() {
        let manifest = parse_manifest(
            br#"{ "mod_id": "X", "version": "1.0.0", "objects": [ { "type": "blob", "path": "a" } ] }"#,
        )
        .unwrap();

        assert_eq!(
            manifest.objects[0].kind,
            ObjectKind::Unrecognized("blob".to_string())
        );
    }

    #[test]
    fn test_core_mod_and_alias() {
        assert_eq!(ObjectKind::from("core_mod".to_string()), ObjectKind::CoreModule);
        assert_eq!(ObjectKind::from("module".to_string()), ObjectKind::Module);
    }

    #[test]
    fn test_malformed_manifests() {
        let cases: &[&[u8]] = &[
            b"",
            b"not json",
            b"[1, 2, 3]",
            br#"{ "mod_id": "X", "version": "1.0.0" }"#,
            br#"{ "mod_id": "X", "version": "1.0.0", "objects": {} }"#,
            br#"{ "mod_id": "X", "version": "1.0.0", "objects": [ { "path": "a" } ] }"#,
            br#"{ "version": "1.0.0", "objects": [] }"#,
            br#"{ "mod_id": "X", "version": "one", "objects": [] }"#,
            br#"{ "mod_id": "@ORDER:LAST", "version": "1.0.0", "objects": [] }"#,
        ];

        for case in cases {
            let problem = parse_manifest(case).unwrap_err();
            assert_eq!(
                problem.kind,
                ProblemKind::MalformedInput,
                "{}",
                String::from_utf8_lossy(case)
            );
        }
    }

    #[test]
    fn test_entry_name_normalization() {
        let object = ManifestObject {
            kind: ObjectKind::Pak,
            path: "/Content\\Paks\\Foo_p.pak".to_string(),
        };
        assert_eq!(object.entry_name(), "Content/Paks/Foo_p.pak");
    }
}
