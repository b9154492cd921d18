//! Package model
//!
//! Metadata, version ranges and per-package loading records, plus the
//! helpers that classify files found in the package directory.

mod discovery;
mod entry;
mod info;
mod version;

pub use discovery::{PackageFile, discover_files, raw_package_id};
pub use entry::{EntrySource, LoadingEntry};
pub use info::{PackageInfo, check_package_id};
pub use version::{VersionRange, parse_version};

/// Pseudo-dependency meaning "load after every real package".
pub const LOAD_LAST: &str = "@ORDER:LAST";
