//! In-process reflective runtime for dynbridge.
//!
//! [`MemoryRuntime`] implements [`dynbridge_core::ForeignRuntime`] without
//! any external runtime: types are described with [`ModuleBuilder`], method
//! bodies are Rust closures over a [`CallContext`], and objects live on a
//! generational heap.
//!
//! ```ignore
//! let runtime = MemoryRuntime::new();           // System module preloaded
//! let mut module = ModuleBuilder::new("Acme");
//! module.class("Acme.Widget").default_constructor().finish();
//! runtime.load_module(module)?;
//! ```

mod builder;
mod convert;
mod heap;
mod native;
mod runtime;
mod system;

pub use builder::{ModuleBuilder, TypeBuilder, array_type_hash};
pub use convert::{FromForeign, IntoForeign};
pub use heap::{HeapObject, ObjectData, ObjectHeap};
pub use native::{CallContext, NativeCallable, NativeFn};
pub use runtime::MemoryRuntime;
pub use system::MAX_DELEGATE_ARITY;
