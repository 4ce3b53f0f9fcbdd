//! Native method implementations and the context they run in.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use dynbridge_core::{CallableDescriptor, ForeignFault, ForeignValue, ObjectRef, TypeHash};

use crate::convert::{FromForeign, IntoForeign};
use crate::heap::ObjectData;
use crate::runtime::MemoryRuntime;

/// Trait for native method bodies.
///
/// Closures taking a [`CallContext`] implement it directly.
pub trait NativeCallable: Send + Sync {
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), ForeignFault>;
}

impl<F> NativeCallable for F
where
    F: Fn(&mut CallContext<'_>) -> Result<(), ForeignFault> + Send + Sync,
{
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), ForeignFault> {
        (self)(ctx)
    }
}

/// Type-erased native method body, cheap to clone.
#[derive(Clone)]
pub struct NativeFn {
    inner: Arc<dyn NativeCallable>,
}

impl NativeFn {
    pub fn new<F>(f: F) -> Self
    where
        F: NativeCallable + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    pub fn call(&self, ctx: &mut CallContext<'_>) -> Result<(), ForeignFault> {
        self.inner.call(ctx)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn").finish_non_exhaustive()
    }
}

/// Context for one native call.
///
/// ```ignore
/// let x: i32 = ctx.arg(0)?;
/// ctx.set_arg(1, format!("{x}"));   // out parameter
/// ctx.set_return(true);
/// ```
pub struct CallContext<'rt> {
    runtime: &'rt MemoryRuntime,
    callable: &'rt CallableDescriptor,
    receiver: Option<&'rt ForeignValue>,
    args: &'rt mut [ForeignValue],
    ret: ForeignValue,
}

impl<'rt> CallContext<'rt> {
    pub(crate) fn new(
        runtime: &'rt MemoryRuntime,
        callable: &'rt CallableDescriptor,
        receiver: Option<&'rt ForeignValue>,
        args: &'rt mut [ForeignValue],
    ) -> Self {
        Self {
            runtime,
            callable,
            receiver,
            args,
            ret: ForeignValue::Null,
        }
    }

    pub fn runtime(&self) -> &'rt MemoryRuntime {
        self.runtime
    }

    pub fn callable(&self) -> &CallableDescriptor {
        self.callable
    }

    /// Type arguments of an instantiated generic method.
    pub fn generic_args(&self) -> &[TypeHash] {
        &self.callable.generic_args
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    pub fn arg_value(&self, index: usize) -> Result<&ForeignValue, ForeignFault> {
        self.args.get(index).ok_or_else(|| {
            ForeignFault::argument(format!(
                "argument {index} out of range for {} ({} arguments)",
                self.callable.name,
                self.args.len()
            ))
        })
    }

    pub fn arg<T: FromForeign>(&self, index: usize) -> Result<T, ForeignFault> {
        T::from_foreign(self.arg_value(index)?)
    }

    /// Write an output parameter.
    pub fn set_arg<T: IntoForeign>(&mut self, index: usize, value: T) -> Result<(), ForeignFault> {
        let count = self.args.len();
        let slot = self.args.get_mut(index).ok_or_else(|| {
            ForeignFault::argument(format!("argument {index} out of range ({count} arguments)"))
        })?;
        *slot = value.into_foreign();
        Ok(())
    }

    pub fn set_return<T: IntoForeign>(&mut self, value: T) {
        self.ret = value.into_foreign();
    }

    pub(crate) fn into_return(self) -> ForeignValue {
        self.ret
    }

    /// The receiver of an instance call.
    pub fn this_value(&self) -> Result<&ForeignValue, ForeignFault> {
        match self.receiver {
            Some(value) if !value.is_null() => Ok(value),
            _ => Err(ForeignFault::null_reference(&self.callable.name)),
        }
    }

    pub fn this(&self) -> Result<ObjectRef, ForeignFault> {
        ObjectRef::from_foreign(self.this_value()?)
    }

    /// Run `f` on the receiver's payload.
    pub fn with_this<R>(
        &self,
        f: impl FnOnce(&mut ObjectData) -> Result<R, ForeignFault>,
    ) -> Result<R, ForeignFault> {
        let obj = self.this()?;
        self.runtime.with_object(obj, f)
    }

    /// Run `f` on native state stored in the receiver.
    pub fn with_native<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, ForeignFault> {
        let name = self.callable.name.clone();
        self.with_this(|data| match data {
            ObjectData::Native(state) => state.downcast_mut::<T>().map(f).ok_or_else(|| {
                ForeignFault::invalid_cast(format!("receiver of {name} holds different state"))
            }),
            other => Err(ForeignFault::invalid_cast(format!(
                "receiver of {name} is a {} object",
                other.kind_name()
            ))),
        })
    }

    /// Read an instance field of the receiver by name.
    pub fn field<T: FromForeign>(&self, name: &str) -> Result<T, ForeignFault> {
        let value = self.runtime.read_field_by_name(self.this_value()?, name)?;
        T::from_foreign(&value)
    }

    /// Write an instance field of the receiver by name.
    pub fn set_field<T: IntoForeign>(&self, name: &str, value: T) -> Result<(), ForeignFault> {
        self.runtime
            .write_field_by_name(self.this_value()?, name, value.into_foreign())
    }

    /// Allocate an instance of the declaring type with default field values.
    ///
    /// Used by constructors.
    pub fn new_instance(&self) -> Result<ForeignValue, ForeignFault> {
        self.runtime.new_instance(self.callable.declaring_type)
    }

    /// Allocate an object of the declaring type with the given payload.
    pub fn allocate(&self, data: ObjectData) -> ForeignValue {
        self.runtime.allocate(self.callable.declaring_type, data)
    }

    /// Invoke a delegate value.
    pub fn invoke_delegate(
        &self,
        delegate: &ForeignValue,
        args: &[ForeignValue],
    ) -> Result<ForeignValue, ForeignFault> {
        self.runtime.invoke_delegate(delegate, args)
    }
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("callable", &self.callable.name)
            .field("arg_count", &self.args.len())
            .finish()
    }
}
