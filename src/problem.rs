//! Loading diagnostics.
//!
//! Every recoverable failure is reported as a [`Problem`] tagged with a
//! [`ProblemKind`]. Stage drivers collect problems and turn a non-empty list
//! into a [`StageFailure`], which halts the pipeline.

use std::fmt;
use thiserror::Error;

/// Category of a loading problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemKind {
    /// Bad or missing manifest, unknown object type, object missing from the archive.
    MalformedInput,
    /// Duplicate package identifier, raw file colliding with a packaged one,
    /// or a raw file found while raw packages are disabled.
    Conflict,
    /// The package directory could not be scanned, or a configuration file
    /// could not be written.
    Io,
    /// A mandatory dependency is not installed or has the wrong version.
    MissingDependency,
    /// The dependency graph has a cycle.
    CyclicDependency,
    /// The host failed to map a module, register a payload or run a hook.
    HostIntegration,
    /// A payload could not be written to or verified in the content cache.
    CacheIntegrity,
}

impl fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProblemKind::MalformedInput => "malformed input",
            ProblemKind::Conflict => "conflict",
            ProblemKind::Io => "i/o",
            ProblemKind::MissingDependency => "missing dependency",
            ProblemKind::CyclicDependency => "cyclic dependency",
            ProblemKind::HostIntegration => "host integration",
            ProblemKind::CacheIntegrity => "cache integrity",
        };
        f.write_str(name)
    }
}

/// A single human-readable loading diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct Problem {
    pub kind: ProblemKind,
    pub message: String,
}

impl Problem {
    pub fn new(kind: ProblemKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ProblemKind::MalformedInput, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ProblemKind::Conflict, message)
    }

    pub fn host(message: impl Into<String>) -> Self {
        Self::new(ProblemKind::HostIntegration, message)
    }

    /// Prefix the message, keeping the kind.
    pub fn context(self, prefix: impl fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{}: {}", prefix, self.message),
        }
    }
}

/// Pipeline stage, used to label a [`StageFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discovery,
    DependencyResolution,
    Initialization,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Discovery => "mod discovery",
            Stage::DependencyResolution => "dependency resolution",
            Stage::Initialization => "mod initialization",
        };
        f.write_str(name)
    }
}

/// A stage ended with one or more problems; loading cannot continue.
#[derive(Debug, Error)]
#[error(
    "Errors occurred during loading stage '{stage}'. Loading cannot continue:{}",
    render_lines(.problems)
)]
pub struct StageFailure {
    pub stage: Stage,
    pub problems: Vec<Problem>,
}

impl StageFailure {
    /// Build the failure and report it at error level.
    pub fn new(stage: Stage, problems: Vec<Problem>) -> Self {
        let failure = Self { stage, problems };
        log::error!("{}", failure);
        failure
    }
}

fn render_lines(problems: &[Problem]) -> String {
    problems
        .iter()
        .map(|problem| format!("\n{}", problem))
        .collect()
}

/// Turn the problems collected during `stage` into a result.
pub fn check_stage(stage: Stage, problems: Vec<Problem>) -> Result<(), StageFailure> {
    if problems.is_empty() {
        return Ok(());
    }
    Err(StageFailure::new(stage, problems))
}
