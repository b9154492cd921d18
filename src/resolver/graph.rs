use std::collections::HashMap;
use std::hash::Hash;
use thiserror::Error;

/// The graph contains a cycle through `node`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cycle detected at node {node:?}")]
pub struct CycleDetected<N: std::fmt::Debug> {
    pub node: N,
}

#[derive(Clone, Copy)]
enum Mark {
    Visiting,
    Done,
}

/// Directed graph where an edge `a -> b` means "`a` must come after `b`".
///
/// Nodes and edges keep insertion order, which makes the sort deterministic.
#[derive(Debug, Clone)]
pub struct DirectedGraph<N> {
    nodes: Vec<N>,
    edges: HashMap<N, Vec<N>>,
}

impl<N> Default for DirectedGraph<N> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: HashMap::new(),
        }
    }
}

impl<N: Copy + Eq + Hash + std::fmt::Debug> DirectedGraph<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Adding the same node twice is a no-op.
    pub fn add_node(&mut self, node: N) {
        if !self.edges.contains_key(&node) {
            self.edges.insert(node, Vec::new());
            self.nodes.push(node);
        }
    }

    /// Add an edge `from -> to`, adding either node if missing.
    pub fn add_edge(&mut self, from: N, to: N) {
        self.add_node(from);
        self.add_node(to);
        if let Some(targets) = self.edges.get_mut(&from)
            && !targets.contains(&to)
        {
            targets.push(to);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn successors(&self, node: N) -> &[N] {
        self.edges.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Order nodes so that every edge target precedes its source.
    ///
    /// Depth-first, iterative. Fails with the first node found to be revisited
    /// while still on the current path.
    pub fn topological_sort(&self) -> Result<Vec<N>, CycleDetected<N>> {
        let mut marks: HashMap<N, Mark> = HashMap::with_capacity(self.nodes.len());
        let mut sorted = Vec::with_capacity(self.nodes.len());

        for &root in &self.nodes {
            if marks.contains_key(&root) {
                continue;
            }
            marks.insert(root, Mark::Visiting);
            let mut stack: Vec<(N, usize)> = vec![(root, 0)];

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                match self.successors(node).get(frame.1).copied() {
                    Some(next) => {
                        frame.1 += 1;
                        match marks.get(&next) {
                            None => {
                                marks.insert(next, Mark::Visiting);
                                stack.push((next, 0));
                            }
                            Some(Mark::Visiting) => return Err(CycleDetected { node: next }),
                            Some(Mark::Done) => {}
                        }
                    }
                    None => {
                        marks.insert(node, Mark::Done);
                        sorted.push(node);
                        stack.pop();
                    }
                }
            }
        }

        Ok(sorted)
    }
}
