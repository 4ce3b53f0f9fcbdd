//! Core types shared by every dynbridge crate.
//!
//! - identities: [`TypeHash`], [`QualifiedName`], [`CanonicalType`]
//! - values on both sides: [`ForeignValue`], [`HostValue`]
//! - reflected metadata: [`TypeDescriptor`], [`CallableDescriptor`], [`MemberInfo`]
//! - resolution results: [`MemberBinding`], [`OverloadSet`]
//! - handles: [`ForeignHandle`], [`TypeHandle`]
//! - the seams: [`ForeignRuntime`], [`HostLock`]
//! - the error taxonomy: [`BridgeError`]

mod binding;
mod canonical;
mod descriptor;
mod error;
mod handle;
mod host;
mod lock;
mod qualified_name;
mod runtime;
mod type_hash;
mod value;

pub use binding::{BoundCallable, MemberBinding, OverloadSet};
pub use canonical::CanonicalType;
pub use descriptor::{
    CallableDescriptor, CallableKind, FieldInfo, MemberInfo, MemberKind, NestedTypeInfo,
    ParamDescriptor, ParamFlags, PropertyInfo, TypeDescriptor, TypeFlags, TypeInfo,
};
pub use error::{BridgeError, BridgeResult, ForeignFault, HostErrorKind, RegistrationError};
pub use handle::{ForeignHandle, TypeHandle};
pub use host::{HostCallable, HostValue};
pub use lock::{HostLock, HostLockGuard, NoHostLock, ReleasedLock, SerialHostLock};
pub use qualified_name::{ARITY_MARKER, QualifiedName};
pub use runtime::{
    DelegateTarget, ForeignCallable, ForeignEnumerator, ForeignRuntime, ModuleId, ModuleInfo,
};
pub use type_hash::{TypeHash, hash_constants, well_known};
pub use value::{ForeignValue, ObjectRef};
