//! Namespace Tree - hierarchical storage for registered types.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: `NamespaceData` (types directly contained at that level)
//! - Edges: `Contains(name)` from parent to child namespace

use dynbridge_core::TypeDescriptor;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;

/// Edge types in the namespace graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceEdge {
    /// Parent namespace contains child namespace; the String is the child's
    /// simple name.
    Contains(String),
}

/// Data stored in each namespace node.
#[derive(Debug, Default)]
pub struct NamespaceData {
    /// Dotted path of this namespace, empty for the root.
    pub path: String,
    /// Types in this namespace by simple name. Generic definitions appear
    /// under both their arity-qualified and open names.
    pub types: FxHashMap<String, TypeDescriptor>,
}

/// The namespace graph.
pub struct NamespaceTree {
    graph: DiGraph<NamespaceData, NamespaceEdge>,
    root: NodeIndex,
    /// Dotted path -> node, for every namespace except the root.
    by_path: FxHashMap<String, NodeIndex>,
}

impl Default for NamespaceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceTree {
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(NamespaceData::default());
        Self {
            graph,
            root,
            by_path: FxHashMap::default(),
        }
    }

    /// The global namespace.
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    pub fn get(&self, node: NodeIndex) -> Option<&NamespaceData> {
        self.graph.node_weight(node)
    }

    /// Find a child namespace by simple name.
    pub fn find_child(&self, parent: NodeIndex, name: &str) -> Option<NodeIndex> {
        self.graph.edges(parent).find_map(|edge| match edge.weight() {
            NamespaceEdge::Contains(child) if child == name => Some(edge.target()),
            _ => None,
        })
    }

    /// Get or create a child namespace.
    pub fn get_or_create_child(&mut self, parent: NodeIndex, name: &str) -> NodeIndex {
        if let Some(existing) = self.find_child(parent, name) {
            return existing;
        }
        let path = match self.graph.node_weight(parent) {
            Some(data) if !data.path.is_empty() => format!("{}.{name}", data.path),
            _ => name.to_string(),
        };
        let child = self.graph.add_node(NamespaceData {
            path: path.clone(),
            types: FxHashMap::default(),
        });
        self.graph
            .add_edge(parent, child, NamespaceEdge::Contains(name.to_string()));
        self.by_path.insert(path, child);
        child
    }

    /// Get or create the namespace at `segments`, creating every prefix.
    pub fn get_or_create_path(&mut self, segments: &[String]) -> NodeIndex {
        segments.iter().fold(self.root, |node, segment| {
            self.get_or_create_child(node, segment)
        })
    }

    /// Look up a namespace by dotted path; the empty path is the root.
    pub fn find_path(&self, path: &str) -> Option<NodeIndex> {
        if path.is_empty() {
            return Some(self.root);
        }
        self.by_path.get(path).copied()
    }

    /// Register a type under `key` in `node`. The first registration wins.
    pub fn insert_type(&mut self, node: NodeIndex, key: &str, ty: TypeDescriptor) -> bool {
        let Some(data) = self.graph.node_weight_mut(node) else {
            return false;
        };
        if data.types.contains_key(key) {
            return false;
        }
        data.types.insert(key.to_string(), ty);
        true
    }

    pub fn find_type(&self, node: NodeIndex, key: &str) -> Option<&TypeDescriptor> {
        self.graph.node_weight(node)?.types.get(key)
    }

    /// Simple names of the child namespaces of `node`, sorted.
    pub fn children(&self, node: NodeIndex) -> Vec<String> {
        let mut names: Vec<String> = self
            .graph
            .edges(node)
            .map(|edge| match edge.weight() {
                NamespaceEdge::Contains(name) => name.clone(),
            })
            .collect();
        names.sort();
        names
    }

    /// Dotted paths of every namespace, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.by_path.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn namespace_count(&self) -> usize {
        self.by_path.len()
    }
}

impl std::fmt::Debug for NamespaceTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceTree")
            .field("namespaces", &self.by_path.len())
            .finish()
    }
}
