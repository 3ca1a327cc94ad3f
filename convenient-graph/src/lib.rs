//! Generic directed dependency graph for build planning.
//!
//! Unlike a strict DAG, this graph accepts cycles: translation units whose
//! headers include each other routinely produce mutual dependencies, and the
//! build still has to link them together. Reachability is therefore computed
//! with a visited-set worklist that terminates on any graph shape.
//!
//! # Features
//!
//! - Nodes keyed by their data, so the same file is never inserted twice
//! - Directed edges from a dependent to its dependency
//! - Reflexive transitive closure in both directions (dependencies, dependents)
//! - Cycle enumeration for diagnostics
//!
//! # Example
//!
//! ```
//! use convenient_graph::DependencyGraph;
//!
//! let mut graph = DependencyGraph::<&str>::new();
//! let main = graph.add_node("main.cpp");
//! let util = graph.add_node("util.cpp");
//!
//! // main.cpp depends on util.cpp, and util.cpp back on main.cpp
//! graph.add_edge(main, util).unwrap();
//! graph.add_edge(util, main).unwrap();
//!
//! assert_eq!(graph.closure(main).unwrap(), vec![main, util]);
//! assert_eq!(graph.closure(util).unwrap(), vec![main, util]);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(unused_results)]

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::Hash;

/// Node identifier in the graph.
///
/// Identifiers are handed out in insertion order, so sorting by `NodeId`
/// reproduces the order in which nodes were added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Error types for graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Node not found
    #[error("Node {0} not found in graph")]
    NodeNotFound(NodeId),
}

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

#[derive(Debug, Clone)]
struct Node<N> {
    data: N,
    // Edges to the nodes this one depends on
    dependencies: BTreeSet<NodeId>,
    // Edges from the nodes depending on this one
    dependents: BTreeSet<NodeId>,
}

/// Directed dependency graph that tolerates cycles.
///
/// An edge `a -> b` reads "a depends on b". Self-edges are accepted and
/// ignored by every traversal.
#[derive(Debug, Clone)]
pub struct DependencyGraph<N> {
    nodes: Vec<Node<N>>,
    index: HashMap<N, NodeId>,
    edge_count: usize,
}

impl<N> Default for DependencyGraph<N> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            edge_count: 0,
        }
    }
}

impl<N> DependencyGraph<N>
where
    N: Clone + Eq + Hash,
{
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its ID.
    ///
    /// Adding data that is already present returns the existing ID.
    pub fn add_node(&mut self, data: N) -> NodeId {
        if let Some(&id) = self.index.get(&data) {
            return id;
        }

        let id = NodeId(self.nodes.len());
        let _ = self.index.insert(data.clone(), id);
        self.nodes.push(Node {
            data,
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
        });
        id
    }

    /// Look up the ID of a node by its data.
    #[must_use]
    pub fn find(&self, data: &N) -> Option<NodeId> {
        self.index.get(data).copied()
    }

    /// Record that `dependent` depends on `dependency`.
    ///
    /// Duplicate edges are collapsed.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if either node doesn't exist.
    pub fn add_edge(&mut self, dependent: NodeId, dependency: NodeId) -> GraphResult<()> {
        self.check(dependent)?;
        self.check(dependency)?;

        if self.nodes[dependent.0].dependencies.insert(dependency) {
            let _ = self.nodes[dependency.0].dependents.insert(dependent);
            self.edge_count += 1;
        }
        Ok(())
    }

    fn check(&self, id: NodeId) -> GraphResult<()> {
        if id.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(GraphError::NodeNotFound(id))
        }
    }
}

impl<N> DependencyGraph<N> {
    /// Get a reference to a node's data.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn node(&self, id: NodeId) -> GraphResult<&N> {
        self.nodes
            .get(id.0)
            .map(|node| &node.data)
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// All node IDs in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Direct dependencies of a node, sorted by ID.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn dependencies(&self, id: NodeId) -> GraphResult<Vec<NodeId>> {
        self.nodes
            .get(id.0)
            .map(|node| node.dependencies.iter().copied().collect())
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Direct dependents of a node, sorted by ID.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn dependents(&self, id: NodeId) -> GraphResult<Vec<NodeId>> {
        self.nodes
            .get(id.0)
            .map(|node| node.dependents.iter().copied().collect())
            .ok_or(GraphError::NodeNotFound(id))
    }

    /// Reflexive transitive closure over dependency edges, sorted by ID.
    ///
    /// The result always contains `id` itself. Cycles are handled by visiting
    /// every node at most once.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn closure(&self, id: NodeId) -> GraphResult<Vec<NodeId>> {
        self.walk(id, |node| &node.dependencies)
    }

    /// Reflexive transitive closure over dependent edges, sorted by ID.
    ///
    /// This is every node whose closure contains `id`.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NodeNotFound` if the node doesn't exist.
    pub fn reverse_closure(&self, id: NodeId) -> GraphResult<Vec<NodeId>> {
        self.walk(id, |node| &node.dependents)
    }

    fn walk<F>(&self, start: NodeId, edges: F) -> GraphResult<Vec<NodeId>>
    where
        F: Fn(&Node<N>) -> &BTreeSet<NodeId>,
    {
        if start.0 >= self.nodes.len() {
            return Err(GraphError::NodeNotFound(start));
        }

        let mut visited = vec![false; self.nodes.len()];
        let mut queued = vec![false; self.nodes.len()];
        let mut frontier = vec![start];
        queued[start.0] = true;

        while let Some(current) = frontier.pop() {
            visited[current.0] = true;
            for &next in edges(&self.nodes[current.0]) {
                if !visited[next.0] && !queued[next.0] {
                    queued[next.0] = true;
                    frontier.push(next);
                }
            }
        }

        Ok(visited
            .iter()
            .enumerate()
            .filter(|&(_, &seen)| seen)
            .map(|(index, _)| NodeId(index))
            .collect())
    }

    /// Groups of nodes that lie on a common dependency cycle.
    ///
    /// Each group is a strongly connected component with more than one
    /// member, sorted by ID; groups are ordered by their smallest member.
    /// Self-edges alone do not form a reported cycle.
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<NodeId>> {
        let mut assigned = vec![false; self.nodes.len()];
        let mut cycles = Vec::new();

        for id in self.node_ids() {
            if assigned[id.0] {
                continue;
            }
            // Both walks start from a valid id, so neither can fail.
            let (Ok(forward), Ok(backward)) = (self.closure(id), self.reverse_closure(id)) else {
                continue;
            };
            let backward: BTreeSet<NodeId> = backward.into_iter().collect();
            let component: Vec<NodeId> = forward
                .into_iter()
                .filter(|member| backward.contains(member))
                .collect();

            for member in &component {
                assigned[member.0] = true;
            }
            if component.len() > 1 {
                cycles.push(component);
            }
        }

        cycles
    }
}
