//! Version ranges for package dependencies.
//!
//! A range is written as a string in the manifest:
//! - a bare version (`1.2.3`, `v1.2.3`) matches exactly that version
//! - `*` matches any version
//! - anything else is a comma-separated comparator set understood by
//!   [`semver::VersionReq`] (`>=1.0.0, <2.0.0`, `^1.2`, `~1.2.3`)

use semver::{Version, VersionReq};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// Parse a version, tolerating a leading `v`.
pub fn parse_version(s: &str) -> Result<Version, semver::Error> {
    let s = s.trim();
    Version::parse(s.strip_prefix('v').unwrap_or(s))
}

/// serde helper for `semver::Version` fields written with an optional `v` prefix.
pub(crate) fn deserialize_version<'de, D>(deserializer: D) -> Result<Version, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_version(&raw).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Matcher {
    Any,
    Exact(Version),
    Req(VersionReq),
}

/// A predicate over package versions, parsed from a range expression.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct VersionRange {
    raw: String,
    matcher: Matcher,
}

impl VersionRange {
    pub fn parse(s: &str) -> Result<Self, semver::Error> {
        let trimmed = s.trim();
        let matcher = if trimmed == "*" {
            Matcher::Any
        } else if let Ok(version) = parse_version(trimmed) {
            Matcher::Exact(version)
        } else {
            Matcher::Req(VersionReq::parse(trimmed)?)
        };
        Ok(Self {
            raw: trimmed.to_string(),
            matcher,
        })
    }

    pub fn any() -> Self {
        Self {
            raw: "*".to_string(),
            matcher: Matcher::Any,
        }
    }

    pub fn matches(&self, version: &Version) -> bool {
        match &self.matcher {
            Matcher::Any => true,
            Matcher::Exact(expected) => expected == version,
            Matcher::Req(req) => req.matches(version),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for VersionRange {
    type Err = semver::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionRange {
    type Error = semver::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}
