//! Namespace browsing and import.
//!
//! A [`Namespace`] is a view over one dotted path of the type registry.
//! Importing copies its directly contained types into a host [`ImportScope`]
//! under their simple names.

use dynbridge_core::{
    ARITY_MARKER, BridgeError, BridgeResult, HostValue, TypeDescriptor, TypeHandle,
};
use dynbridge_registry::NamespaceEntry;
use rustc_hash::FxHashMap;

use crate::Bridge;

/// A member found in a namespace.
#[derive(Debug, Clone)]
pub enum NamespaceMember<'b> {
    Type(TypeHandle),
    Namespace(Namespace<'b>),
}

/// A dotted namespace of the registry.
#[derive(Clone)]
pub struct Namespace<'b> {
    bridge: &'b Bridge,
    path: String,
}

impl<'b> Namespace<'b> {
    pub(crate) fn new(bridge: &'b Bridge, path: impl Into<String>) -> Self {
        Self {
            bridge,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Type `name` in this namespace, otherwise the child namespace `name`.
    pub fn member(&self, name: &str) -> BridgeResult<NamespaceMember<'b>> {
        let entry = self
            .bridge
            .context()
            .registry()
            .read()
            .namespace_member(&self.path, name)?;
        Ok(match entry {
            NamespaceEntry::Type(ty) => NamespaceMember::Type(TypeHandle::new(ty)),
            NamespaceEntry::Namespace(path) => {
                NamespaceMember::Namespace(Namespace::new(self.bridge, path))
            }
        })
    }

    /// Directly contained types keyed by simple name, sorted.
    ///
    /// Generic definitions are listed under both their open and their
    /// arity-qualified key.
    pub fn types(&self) -> Vec<(String, TypeHandle)> {
        self.bridge
            .context()
            .registry()
            .read()
            .types_in_namespace(&self.path)
            .into_iter()
            .map(|(key, ty)| (key, TypeHandle::new(ty)))
            .collect()
    }

    /// Simple names of the nested namespaces.
    pub fn namespaces(&self) -> Vec<String> {
        self.bridge
            .context()
            .registry()
            .read()
            .child_namespaces(&self.path)
    }

    /// Inject the importable types of this namespace into `scope`.
    ///
    /// With an allow-list only the named types are imported; names that
    /// match no importable type are skipped. Nothing is inserted unless
    /// every selected name is free in `scope`. Returns the number of names
    /// imported.
    pub fn import_into(
        &self,
        scope: &mut ImportScope,
        allow: Option<&[&str]>,
    ) -> BridgeResult<usize> {
        let available: Vec<(String, TypeDescriptor)> = self
            .bridge
            .context()
            .registry()
            .read()
            .types_in_namespace(&self.path)
            .into_iter()
            .filter(|(key, ty)| is_importable(key, ty))
            .collect();

        let selected: Vec<(String, TypeDescriptor)> = match allow {
            None => available,
            Some(names) => available
                .into_iter()
                .filter(|(key, _)| names.contains(&key.as_str()))
                .collect(),
        };

        if let Some((name, _)) = selected.iter().find(|(key, _)| scope.contains(key)) {
            return Err(BridgeError::AlreadyDefined(name.clone()));
        }

        let count = selected.len();
        for (key, ty) in selected {
            scope.insert(key, HostValue::Type(TypeHandle::new(ty)));
        }
        tracing::debug!(namespace = %self.path, count, "imported namespace");
        Ok(count)
    }
}

impl std::fmt::Debug for Namespace<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Namespace").field(&self.path).finish()
    }
}

fn is_importable(key: &str, ty: &TypeDescriptor) -> bool {
    !key.contains(ARITY_MARKER) && !key.starts_with('<') && !ty.is_compiler_generated()
}

/// Host-side name table receiving imports.
#[derive(Debug, Clone, Default)]
pub struct ImportScope {
    names: FxHashMap<String, HostValue>,
}

impl ImportScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&HostValue> {
        self.names.get(name)
    }

    /// Bind `name`, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: HostValue) -> Option<HostValue> {
        self.names.insert(name.into(), value)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Bound names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
