//! The seam between the bridge and a reflective foreign runtime.
//!
//! The bridge never assumes a particular runtime SDK. Everything it needs
//! (metadata, invocation, the handful of intrinsic operations on arrays,
//! delegates and enums) goes through [`ForeignRuntime`]. Member access on
//! ordinary objects is expressed with reflected callables, so a runtime only
//! has to execute what it already describes.

use std::fmt;
use std::sync::Arc;

use crate::{CallableDescriptor, FieldInfo, ForeignFault, ForeignValue, TypeDescriptor, TypeHash};

/// Identity of a loaded module (assembly).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub u64);

/// A loaded module and the types it defines.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleInfo {
    pub id: ModuleId,
    pub name: String,
    /// Types defined by the module, in definition order.
    pub types: Vec<TypeDescriptor>,
}

/// Entry point the foreign runtime can call, used to back delegates.
///
/// Implemented by host-callable proxies. Closures taking the argument slice
/// implement it directly.
pub trait ForeignCallable: Send + Sync {
    fn call(&self, args: &[ForeignValue]) -> Result<ForeignValue, ForeignFault>;
}

impl<F> ForeignCallable for F
where
    F: Fn(&[ForeignValue]) -> Result<ForeignValue, ForeignFault> + Send + Sync,
{
    fn call(&self, args: &[ForeignValue]) -> Result<ForeignValue, ForeignFault> {
        (self)(args)
    }
}

/// What a delegate invokes.
#[derive(Clone)]
pub enum DelegateTarget {
    /// A reflected method, with its receiver when it is an instance method.
    Method {
        callable: CallableDescriptor,
        receiver: Option<ForeignValue>,
    },
    /// A bridge-provided entry point.
    Native(Arc<dyn ForeignCallable>),
}

impl fmt::Debug for DelegateTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelegateTarget::Method { callable, receiver } => f
                .debug_struct("Method")
                .field("name", &callable.name)
                .field("receiver", receiver)
                .finish(),
            DelegateTarget::Native(_) => f.debug_struct("Native").finish_non_exhaustive(),
        }
    }
}

/// Single-pass enumeration over a foreign sequence.
pub trait ForeignEnumerator: Send {
    /// Next element, `Ok(None)` once exhausted.
    fn next_value(&mut self) -> Result<Option<ForeignValue>, ForeignFault>;
}

/// A reflective foreign runtime.
///
/// Implementations must be shareable across threads: delegate proxies may
/// fire on threads the host does not control.
pub trait ForeignRuntime: Send + Sync {
    /// Loaded modules, in load order.
    fn modules(&self) -> Vec<ModuleInfo>;

    /// Metadata for a type, including constructed generic types.
    fn type_info(&self, ty: TypeHash) -> Option<TypeDescriptor>;

    /// Whether a value of `source` can be stored in a location of `target`.
    fn is_assignable(&self, target: TypeHash, source: TypeHash) -> bool;

    /// Construct (or fetch) the specialization of a generic definition.
    fn make_generic_type(
        &self,
        definition: TypeHash,
        args: &[TypeHash],
    ) -> Result<TypeHash, ForeignFault>;

    /// Instantiate a generic method definition.
    fn make_generic_method(
        &self,
        method: &CallableDescriptor,
        args: &[TypeHash],
    ) -> Result<CallableDescriptor, ForeignFault>;

    /// Execute a method or constructor.
    ///
    /// `args` holds one slot per declared parameter; the runtime writes
    /// output parameters back into their slots.
    fn invoke(
        &self,
        callable: &CallableDescriptor,
        receiver: Option<&ForeignValue>,
        args: &mut [ForeignValue],
    ) -> Result<ForeignValue, ForeignFault>;

    fn get_field(
        &self,
        field: &FieldInfo,
        receiver: Option<&ForeignValue>,
    ) -> Result<ForeignValue, ForeignFault>;

    fn set_field(
        &self,
        field: &FieldInfo,
        receiver: Option<&ForeignValue>,
        value: ForeignValue,
    ) -> Result<(), ForeignFault>;

    /// Default instance of a value type without a declared constructor.
    fn create_default(&self, ty: TypeHash) -> Result<ForeignValue, ForeignFault>;

    /// Fixed-length array of `element` holding `items`.
    fn create_array(
        &self,
        element: TypeHash,
        items: Vec<ForeignValue>,
    ) -> Result<ForeignValue, ForeignFault>;

    fn array_length(&self, array: &ForeignValue) -> Result<usize, ForeignFault>;

    fn array_get(&self, array: &ForeignValue, index: usize) -> Result<ForeignValue, ForeignFault>;

    fn array_set(
        &self,
        array: &ForeignValue,
        index: usize,
        value: ForeignValue,
    ) -> Result<(), ForeignFault>;

    /// Start enumerating an enumerable object.
    fn enumerate(&self, value: &ForeignValue) -> Result<Box<dyn ForeignEnumerator>, ForeignFault>;

    /// Create a delegate of `delegate_type` bound to `target`.
    fn create_delegate(
        &self,
        delegate_type: TypeHash,
        target: DelegateTarget,
    ) -> Result<ForeignValue, ForeignFault>;

    /// The value's own string conversion.
    fn display(&self, value: &ForeignValue) -> Result<String, ForeignFault>;

    /// The value's own equality.
    fn equals(&self, a: &ForeignValue, b: &ForeignValue) -> bool;

    /// Enum value of the given type from its underlying integer.
    fn enum_from_integer(&self, ty: TypeHash, value: i64) -> Result<ForeignValue, ForeignFault>;

    /// Release resources held by the object. Never implicit.
    fn dispose(&self, value: &ForeignValue) -> Result<(), ForeignFault>;

    /// Qualified name for a type, falling back to its hash.
    fn type_name(&self, ty: TypeHash) -> String {
        self.type_info(ty)
            .map(|info| info.name())
            .unwrap_or_else(|| ty.to_string())
    }
}
