//! Type Registry - catalog of foreign types by qualified name.
//!
//! Populated by walking the modules a [`ForeignRuntime`] reports. Each
//! module is visited once; types are inserted under their qualified name
//! and the first registration of a name wins. Generic definitions are
//! registered twice, under the arity-qualified name (`List`1`) and under
//! the open name (`List`) so `List[int]` style specialization can find them.

use dynbridge_core::{
    BridgeError, BridgeResult, ForeignRuntime, ModuleId, QualifiedName, TypeDescriptor,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::namespace_tree::NamespaceTree;

/// Outcome of one [`TypeRegistry::refresh`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub modules_added: usize,
    pub types_added: usize,
}

impl RefreshStats {
    pub fn is_empty(&self) -> bool {
        self.modules_added == 0 && self.types_added == 0
    }
}

/// A directly contained entry of a namespace.
#[derive(Debug, Clone)]
pub enum NamespaceEntry {
    Type(TypeDescriptor),
    Namespace(String),
}

/// Process-wide catalog of foreign types, namespaces and modules.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: FxHashMap<String, TypeDescriptor>,
    tree: NamespaceTree,
    seen_modules: FxHashSet<ModuleId>,
    /// Module names in the order they were recorded.
    modules: Vec<String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every module the runtime reports that has not been seen yet.
    ///
    /// Idempotent: a second call with no new modules changes nothing.
    pub fn refresh(&mut self, runtime: &dyn ForeignRuntime) -> RefreshStats {
        let mut stats = RefreshStats::default();
        for module in runtime.modules() {
            if !self.seen_modules.insert(module.id) {
                continue;
            }
            stats.modules_added += 1;
            self.modules.push(module.name.clone());
            for ty in &module.types {
                stats.types_added += self.register(ty.clone());
            }
            tracing::debug!(module = %module.name, types = module.types.len(), "registered module");
        }
        if !stats.is_empty() {
            tracing::debug!(
                modules = stats.modules_added,
                types = stats.types_added,
                total = self.types.len(),
                "type registry refreshed"
            );
        }
        stats
    }

    /// Insert one type; returns how many keys were added.
    fn register(&mut self, ty: TypeDescriptor) -> usize {
        let qname = ty.qname.clone();
        let node = self.tree.get_or_create_path(qname.namespace_path());
        let mut added = 0;

        if self.insert_key(qname.to_string(), ty.clone()) {
            self.tree.insert_type(node, qname.simple_name(), ty.clone());
            added += 1;
        }
        if qname.is_generic() {
            let open = qname.to_open();
            if self.insert_key(open.to_string(), ty.clone()) {
                self.tree.insert_type(node, open.simple_name(), ty);
                added += 1;
            }
        }
        added
    }

    fn insert_key(&mut self, key: String, ty: TypeDescriptor) -> bool {
        if self.types.contains_key(&key) {
            return false;
        }
        self.types.insert(key, ty);
        true
    }

    /// Type registered under `name`.
    pub fn lookup(&self, name: &str) -> BridgeResult<TypeDescriptor> {
        self.types
            .get(name)
            .cloned()
            .ok_or_else(|| BridgeError::not_found(format!("Type not found: {name}")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        !namespace.is_empty() && self.tree.find_path(namespace).is_some()
    }

    /// Member `name` of `namespace`: a type first, then a child namespace.
    pub fn namespace_member(&self, namespace: &str, name: &str) -> BridgeResult<NamespaceEntry> {
        let qualified = QualifiedName::in_namespace(namespace, name).to_string();
        if let Some(ty) = self.types.get(&qualified) {
            return Ok(NamespaceEntry::Type(ty.clone()));
        }
        if self.tree.find_path(&qualified).is_some() {
            return Ok(NamespaceEntry::Namespace(qualified));
        }
        Err(BridgeError::not_found(format!("No such member: {qualified}")))
    }

    /// Types directly contained in `namespace`, keyed by simple name, sorted.
    ///
    /// Generic definitions appear under both of their keys.
    pub fn types_in_namespace(&self, namespace: &str) -> Vec<(String, TypeDescriptor)> {
        let Some(node) = self.tree.find_path(namespace) else {
            return Vec::new();
        };
        let Some(data) = self.tree.get(node) else {
            return Vec::new();
        };
        let mut entries: Vec<(String, TypeDescriptor)> = data
            .types
            .iter()
            .map(|(key, ty)| (key.clone(), ty.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Simple names of the namespaces nested directly in `namespace`.
    pub fn child_namespaces(&self, namespace: &str) -> Vec<String> {
        self.tree
            .find_path(namespace)
            .map(|node| self.tree.children(node))
            .unwrap_or_default()
    }

    /// Every registered key, sorted.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.keys().cloned().collect();
        names.sort();
        names
    }

    /// Every namespace prefix, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        self.tree.paths()
    }

    /// Names of the recorded modules, in recording order.
    pub fn modules(&self) -> &[String] {
        &self.modules
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
