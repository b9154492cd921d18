//! Dependency resolution.
//!
//! Turns the registry produced by discovery into a load order: every package
//! is loaded after the packages it depends on, and packages pinned with the
//! [`LOAD_LAST`] pseudo-dependency are moved to the end.

mod graph;

pub use graph::{CycleDetected, DirectedGraph};

use log::{error, info};
use std::collections::{BTreeMap, HashMap};

use crate::package::{LOAD_LAST, LoadingEntry, VersionRange};
use crate::problem::{Problem, ProblemKind};
use crate::registry::PackageRegistry;

/// Node indices assigned to entries; they start at 1 and follow registration order.
struct NodeIndex<'a> {
    by_id: HashMap<&'a str, u64>,
    entries: &'a [LoadingEntry],
}

impl<'a> NodeIndex<'a> {
    fn new(entries: &'a [LoadingEntry]) -> Self {
        let by_id = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.id(), position as u64 + 1))
            .collect();
        Self { by_id, entries }
    }

    fn index_of(&self, id: &str) -> Option<u64> {
        self.by_id.get(id).copied()
    }

    fn entry(&self, index: u64) -> &'a LoadingEntry {
        &self.entries[(index - 1) as usize]
    }
}

/// Check one dependency map of `entry`, adding an edge for each satisfied
/// dependency and returning a line for each unmet one.
fn add_dependency_edges(
    nodes: &NodeIndex<'_>,
    graph: &mut DirectedGraph<u64>,
    entry: &LoadingEntry,
    self_index: u64,
    dependencies: &BTreeMap<String, VersionRange>,
) -> Vec<String> {
    let mut unmet = Vec::new();
    for (dependency_id, range) in dependencies {
        if dependency_id == LOAD_LAST {
            continue;
        }
        let target = nodes.index_of(dependency_id);
        let reason = match target.map(|index| nodes.entry(index)) {
            None => Some("not installed".to_string()),
            Some(dependency) if !range.matches(&dependency.info.version) => Some(format!(
                "unsupported version: {}",
                dependency.info.version
            )),
            Some(_) => None,
        };
        match (reason, target) {
            (Some(reason), _) => unmet.push(format!(
                "{} requires {}({}): {}",
                entry.id(),
                dependency_id,
                range,
                reason
            )),
            (None, Some(target)) => graph.add_edge(self_index, target),
            (None, None) => {}
        }
    }
    unmet
}

/// Produce the final load order for every entry in `registry`.
///
/// Fails with one [`ProblemKind::MissingDependency`] problem per unmet
/// mandatory dependency, or a single [`ProblemKind::CyclicDependency`]
/// problem. Unmet optional dependencies are skipped silently.
#[tracing::instrument(skip(registry), fields(packages = registry.len()))]
pub fn resolve(registry: PackageRegistry) -> Result<Vec<LoadingEntry>, Vec<Problem>> {
    let entries = registry.into_entries();
    let nodes = NodeIndex::new(&entries);

    let mut graph = DirectedGraph::new();
    for index in 1..=entries.len() as u64 {
        graph.add_node(index);
    }

    let mut missing = Vec::new();
    for (position, entry) in entries.iter().enumerate() {
        let self_index = position as u64 + 1;
        missing.extend(add_dependency_edges(
            &nodes,
            &mut graph,
            entry,
            self_index,
            &entry.info.dependencies,
        ));
        // Optional dependencies only order; they never fail resolution.
        add_dependency_edges(
            &nodes,
            &mut graph,
            entry,
            self_index,
            &entry.info.optional_dependencies,
        );
    }

    if !missing.is_empty() {
        error!("Found missing dependencies:");
        for line in &missing {
            error!("{}", line);
        }
        return Err(missing
            .into_iter()
            .map(|line| Problem::new(ProblemKind::MissingDependency, line))
            .collect());
    }

    let sorted = graph.topological_sort().map_err(|cycle| {
        let message = format!(
            "Cycle dependency found in sorting graph at package: {}",
            nodes.entry(cycle.node).id()
        );
        error!("{}", message);
        vec![Problem::new(ProblemKind::CyclicDependency, message)]
    })?;

    let ordered = pin_last(sorted, |index| nodes.entry(index).info.is_pinned_last());

    let mut slots: Vec<Option<LoadingEntry>> = entries.into_iter().map(Some).collect();
    let result: Vec<LoadingEntry> = ordered
        .into_iter()
        .filter_map(|index| slots[(index - 1) as usize].take())
        .collect();

    info!(
        "Resolved load order: {}",
        result
            .iter()
            .map(LoadingEntry::id)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(result)
}

/// Move pinned items to the end, keeping relative order in both groups.
fn pin_last<T>(sorted: Vec<T>, is_pinned: impl Fn(T) -> bool) -> Vec<T>
where
    T: Copy,
{
    let (mut ordered, pinned): (Vec<T>, Vec<T>) =
        sorted.into_iter().partition(|&item| !is_pinned(item));
    ordered.extend(pinned);
    ordered
}
