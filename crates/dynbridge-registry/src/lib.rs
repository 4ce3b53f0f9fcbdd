//! Foreign type registry for dynbridge.
//!
//! [`TypeRegistry`] catalogs the types a runtime's modules define, keyed by
//! qualified name, with the namespace hierarchy kept in a [`NamespaceTree`].

mod namespace_tree;
mod registry;

pub use namespace_tree::{NamespaceData, NamespaceEdge, NamespaceTree};
pub use registry::{NamespaceEntry, RefreshStats, TypeRegistry};
