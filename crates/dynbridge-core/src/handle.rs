//! Host-side handles to foreign objects and types.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::{ForeignValue, MemberBinding, TypeDescriptor, TypeHash};

/// Reference to one foreign object, or to none, plus its type tag.
///
/// The handle never owns the object's lifetime: dropping a handle does not
/// dispose anything. A handle whose value is null but whose type is known
/// gives static access to that type.
///
/// Constant member lookups (methods, nested types) are cached per handle;
/// clones share the cache.
#[derive(Clone)]
pub struct ForeignHandle(Arc<HandleInner>);

struct HandleInner {
    value: ForeignValue,
    type_hash: TypeHash,
    cache: Mutex<FxHashMap<String, MemberBinding>>,
}

impl ForeignHandle {
    /// Handle to `value`, tagged with `type_hash`.
    pub fn new(value: ForeignValue, type_hash: TypeHash) -> Self {
        Self(Arc::new(HandleInner {
            value,
            type_hash,
            cache: Mutex::new(FxHashMap::default()),
        }))
    }

    /// Handle tagged with the value's own runtime type.
    pub fn from_value(value: ForeignValue) -> Self {
        let type_hash = value.runtime_type().unwrap_or(TypeHash::EMPTY);
        Self::new(value, type_hash)
    }

    /// Static-access handle for a type.
    pub fn for_type(type_hash: TypeHash) -> Self {
        Self::new(ForeignValue::Null, type_hash)
    }

    /// Handle to nothing, with no type.
    pub fn null() -> Self {
        Self::new(ForeignValue::Null, TypeHash::EMPTY)
    }

    pub fn value(&self) -> &ForeignValue {
        &self.0.value
    }

    pub fn type_hash(&self) -> TypeHash {
        self.0.type_hash
    }

    pub fn is_null(&self) -> bool {
        self.0.value.is_null()
    }

    pub fn has_type(&self) -> bool {
        !self.0.type_hash.is_empty()
    }

    /// Null value with a known type: members resolve statically.
    pub fn is_static(&self) -> bool {
        self.is_null() && self.has_type()
    }

    /// The receiver to pass for instance calls, `None` on static handles.
    pub fn receiver(&self) -> Option<ForeignValue> {
        if self.is_null() {
            None
        } else {
            Some(self.0.value.clone())
        }
    }

    pub fn cached_member(&self, name: &str) -> Option<MemberBinding> {
        self.0.cache.lock().get(name).cloned()
    }

    /// Cache a constant binding. Races insert equal values.
    pub fn cache_member(&self, name: &str, binding: MemberBinding) {
        debug_assert!(binding.is_constant());
        self.0.cache.lock().insert(name.to_string(), binding);
    }

    pub fn cached_member_count(&self) -> usize {
        self.0.cache.lock().len()
    }

    pub fn ptr_eq(&self, other: &ForeignHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ForeignHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignHandle")
            .field("value", &self.0.value)
            .field("type_hash", &self.0.type_hash)
            .finish()
    }
}

/// Handle to a foreign type: constructors, static members, specialization.
#[derive(Clone)]
pub struct TypeHandle {
    descriptor: TypeDescriptor,
    handle: ForeignHandle,
}

impl TypeHandle {
    pub fn new(descriptor: TypeDescriptor) -> Self {
        let handle = ForeignHandle::for_type(descriptor.type_hash);
        Self { descriptor, handle }
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn type_hash(&self) -> TypeHash {
        self.descriptor.type_hash
    }

    /// Static-access handle used for member resolution.
    pub fn handle(&self) -> &ForeignHandle {
        &self.handle
    }

    pub fn name(&self) -> String {
        self.descriptor.name()
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.type_hash() == other.type_hash()
    }
}

impl Eq for TypeHandle {}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeHandle").field(&self.name()).finish()
    }
}
