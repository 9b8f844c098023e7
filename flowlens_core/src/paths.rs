//! Simple path enumeration between two workflow nodes.
//!
//! Depth-first traversal that never revisits a node already on the current
//! path, so it terminates even though workflow graphs contain retry cycles.
//! Paths are emitted in edge insertion order; the parallel variant splits the
//! search per first-hop subtree and concatenates the subtrees in that same
//! order, giving an identical result.

use crate::error::{FlowError, Result};
use crate::graph::WorkflowGraph;
use crate::types::{NodeId, Path};
use petgraph::graph::NodeIndex;
use rayon::prelude::*;

/// Enumerates all simple paths from `from` to `to`.
///
/// # Returns
///
/// - `Ok(paths)` - At least one path, in deterministic order
/// - `Err(FlowError::UnknownNode)` - If either endpoint is absent
/// - `Err(FlowError::NoPath)` - If `to` is unreachable from `from`
pub fn all_simple_paths(graph: &WorkflowGraph, from: &NodeId, to: &NodeId) -> Result<Vec<Path>> {
    PathQuery::new(graph, from, to).execute()
}

/// Enumerates all simple paths from the graph's entry node to its exit node.
pub fn entry_to_exit_paths(graph: &WorkflowGraph) -> Result<Vec<Path>> {
    let entry = graph.entry()?;
    let exit = graph.exit()?;
    all_simple_paths(graph, entry, exit)
}

/// Counts the paths that visit `node`.
pub fn paths_through(paths: &[Path], node: &NodeId) -> usize {
    paths.iter().filter(|path| path.contains(node)).count()
}

/// Builder for path enumeration queries.
///
/// # Example
///
/// ```
/// use flowlens_core::{reference::customer_support_workflow, NodeId, PathQuery};
///
/// let graph = customer_support_workflow()?;
/// let paths = PathQuery::new(&graph, &NodeId::new("input"), &NodeId::new("output"))
///     .parallel()
///     .execute()?;
/// assert_eq!(paths.len(), 3);
/// # Ok::<(), flowlens_core::FlowError>(())
/// ```
#[derive(Clone, Debug)]
pub struct PathQuery<'g> {
    graph: &'g WorkflowGraph,
    from: NodeId,
    to: NodeId,
    max_length: Option<usize>,
    limit: Option<usize>,
    parallel: bool,
}

impl<'g> PathQuery<'g> {
    /// Creates a query for paths between two nodes.
    pub fn new(graph: &'g WorkflowGraph, from: &NodeId, to: &NodeId) -> Self {
        Self {
            graph,
            from: from.clone(),
            to: to.clone(),
            max_length: None,
            limit: None,
            parallel: false,
        }
    }

    /// Limits the maximum number of nodes in a path.
    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    /// Limits the number of paths returned (at least one).
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n.max(1));
        self
    }

    /// Searches each first-hop subtree on the rayon pool.
    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    /// Sets parallel search on or off.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Executes the enumeration.
    pub fn execute(self) -> Result<Vec<Path>> {
        let source = self.graph.index_of(&self.from)?;
        let target = self.graph.index_of(&self.to)?;

        let search = Search {
            graph: self.graph,
            target,
            max_length: self.max_length,
            limit: self.limit,
        };

        let mut found = if source == target {
            vec![vec![source]]
        } else if self.parallel {
            search.run_parallel(source)
        } else {
            search.run_from(&[source])
        };
        if let Some(limit) = self.limit {
            found.truncate(limit);
        }

        if found.is_empty() {
            return Err(FlowError::NoPath {
                from: self.from,
                to: self.to,
            });
        }

        tracing::debug!(
            from = %self.from,
            to = %self.to,
            count = found.len(),
            "enumerated simple paths"
        );

        Ok(found
            .into_iter()
            .map(|indices| {
                Path::new(
                    indices
                        .into_iter()
                        .map(|idx| self.graph.id_at(idx).clone())
                        .collect(),
                )
            })
            .collect())
    }
}

struct Search<'g> {
    graph: &'g WorkflowGraph,
    target: NodeIndex,
    max_length: Option<usize>,
    limit: Option<usize>,
}

impl Search<'_> {
    /// Runs the DFS with `prefix` already on the path.
    ///
    /// The walk keeps an explicit frame stack, so path length is not bounded
    /// by the thread's call stack.
    fn run_from(&self, prefix: &[NodeIndex]) -> Vec<Vec<NodeIndex>> {
        let mut on_path = vec![false; self.graph.node_count()];
        for idx in prefix {
            on_path[idx.index()] = true;
        }
        let mut stack = prefix.to_vec();
        let mut found = Vec::new();
        let Some(&start) = prefix.last() else {
            return found;
        };
        if !self.enter(start, &stack, &mut found) {
            return found;
        }

        // One frame per expanded node: its successors and the next one to try
        let mut frames = vec![(self.graph.successors(start), 0usize)];
        while let Some((successors, cursor)) = frames.last_mut() {
            if self.limit_reached(&found) {
                break;
            }
            let Some(&next) = successors.get(*cursor) else {
                frames.pop();
                if !frames.is_empty() {
                    if let Some(done) = stack.pop() {
                        on_path[done.index()] = false;
                    }
                }
                continue;
            };
            *cursor += 1;
            if on_path[next.index()] {
                continue;
            }

            on_path[next.index()] = true;
            stack.push(next);
            if self.enter(next, &stack, &mut found) {
                frames.push((self.graph.successors(next), 0));
            } else {
                stack.pop();
                on_path[next.index()] = false;
            }
        }
        found
    }

    fn run_parallel(&self, source: NodeIndex) -> Vec<Vec<NodeIndex>> {
        let first_hops = self.graph.successors(source);
        first_hops
            .par_iter()
            .filter(|&&hop| hop != source)
            .map(|&hop| self.run_from(&[source, hop]))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }

    /// Records the path if `node` is the target. Returns whether to descend.
    fn enter(&self, node: NodeIndex, stack: &[NodeIndex], found: &mut Vec<Vec<NodeIndex>>) -> bool {
        if self.limit_reached(found) || self.max_length.is_some_and(|max| stack.len() > max) {
            return false;
        }
        if node == self.target {
            found.push(stack.to_vec());
            return false;
        }
        true
    }

    fn limit_reached(&self, found: &[Vec<NodeIndex>]) -> bool {
        self.limit.is_some_and(|limit| found.len() >= limit)
    }
}
