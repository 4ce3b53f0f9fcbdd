//! Dynamic dispatch between a host language and a reflective foreign runtime.
//!
//! Everything here works against a [`BridgeContext`]: the foreign runtime,
//! the shared type registry and the host execution lock. The components are
//! cheap views over a context:
//!
//! ```text
//! host call obj.member(args)
//!     │
//!     ├─► MemberResolver      name → Property / Field / Method / Overloads / NestedType
//!     │       └─► ExtensionMethods   missing name → extension bound to the receiver
//!     ├─► OverloadResolver    several candidates → one (first match, or exact signature)
//!     ├─► InvocationEngine    convert args, call, reshape out parameters
//!     │       └─► ConversionEngine   host ⇄ foreign values
//!     │               └─► CallbackMarshaller   host callables → foreign delegates
//!     └─► ObjectOps           indexing, iteration, formatting, enums, disposal, construction
//! ```

mod callback;
mod context;
mod conversion;
mod extension;
mod generic;
mod invoke;
mod member;
mod object_ops;
mod overload;

#[cfg(test)]
mod fixtures;

pub use callback::CallbackMarshaller;
pub use context::{BridgeContext, DispatchOptions, WeakBridgeContext};
pub use conversion::{
    ConversionEngine, ConversionRule, host_integer, primitive_to_foreign, primitive_to_host,
};
pub use extension::ExtensionMethods;
pub use generic::{host_value_type, infer_type_arguments, specialize_method, specialize_type};
pub use invoke::{CallableInstance, InvocationEngine};
pub use member::MemberResolver;
pub use object_ops::{BitOp, DisposeScope, HostIterator, ObjectOps};
pub use overload::{OverloadResolver, OverloadSelector, display_callable, signature};
