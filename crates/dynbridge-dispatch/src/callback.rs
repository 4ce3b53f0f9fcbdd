//! Host callables as foreign delegates.
//!
//! A bound foreign method whose signature already matches the delegate is
//! handed to the runtime as is. Everything else is wrapped in a
//! [`DelegateProxy`], a native entry point that reacquires the host lock,
//! converts the foreign arguments, calls back into host code and converts
//! the result to the delegate's return type.
//!
//! Errors raised by host code cannot cross into the foreign runtime as they
//! are. They travel as faults named `Host.<kind>` carrying the error text;
//! foreign faults that passed through host code keep their identity.

use std::sync::Arc;

use dynbridge_core::{
    BridgeError, BridgeResult, CallableDescriptor, DelegateTarget, ForeignCallable, ForeignFault,
    ForeignValue, HostLockGuard, HostValue, OverloadSet, TypeHash,
};

use crate::{BridgeContext, WeakBridgeContext};

/// Builds foreign delegates from host callables.
#[derive(Clone, Copy)]
pub struct CallbackMarshaller<'a> {
    ctx: &'a BridgeContext,
}

impl<'a> CallbackMarshaller<'a> {
    pub fn new(ctx: &'a BridgeContext) -> Self {
        Self { ctx }
    }

    /// Wrap `value` as an instance of the delegate type `delegate_type`.
    ///
    /// Arity mismatches are reported here rather than when the delegate
    /// first fires.
    pub fn wrap(&self, value: &HostValue, delegate_type: TypeHash) -> BridgeResult<ForeignValue> {
        let info = self.ctx.type_info(delegate_type)?;
        if !info.is_delegate() {
            return Err(BridgeError::invalid_cast(value.type_name(), info.name()));
        }
        if info.is_generic_definition() {
            return Err(BridgeError::invalid_operation(format!(
                "Cannot create a delegate of open generic type {}",
                info.name()
            )));
        }
        let invoke = info.delegate_invoke.clone().ok_or_else(|| {
            BridgeError::invalid_operation(format!("{} has no Invoke method", info.name()))
        })?;
        let arity = invoke.input_count();

        let target = match value {
            HostValue::Method(bound) => {
                check_arity(arity, bound.callable.input_count())?;
                if matches_exactly(&bound.callable, &invoke) {
                    DelegateTarget::Method {
                        callable: bound.callable.clone(),
                        receiver: bound.receiver.clone(),
                    }
                } else {
                    self.proxy(value.clone(), &invoke)
                }
            }
            HostValue::Overloads(set) => self.pick_overload(set, &invoke)?,
            HostValue::Callable(callable) => {
                if let Some(declared) = callable.arity() {
                    check_arity(arity, declared)?;
                }
                self.proxy(value.clone(), &invoke)
            }
            HostValue::Type(_) => self.proxy(value.clone(), &invoke),
            other => {
                return Err(BridgeError::invalid_cast(other.type_name(), info.name()));
            }
        };

        tracing::debug!(delegate = %info.name(), "wrapping host callable");
        self.ctx
            .foreign_call(|rt| rt.create_delegate(delegate_type, target))
    }

    fn pick_overload(
        &self,
        set: &OverloadSet,
        invoke: &CallableDescriptor,
    ) -> BridgeResult<DelegateTarget> {
        let exact = set
            .iter()
            .position(|candidate| matches_exactly(candidate, invoke));
        if let Some(bound) = exact.and_then(|index| set.bind(index)) {
            return Ok(DelegateTarget::Method {
                callable: bound.callable,
                receiver: bound.receiver,
            });
        }

        let arity = invoke.input_count();
        let fitting = set
            .iter()
            .position(|candidate| candidate.input_count() == arity);
        match fitting.and_then(|index| set.bind(index)) {
            Some(bound) => Ok(self.proxy(HostValue::Method(bound), invoke)),
            None => Err(BridgeError::NoSuitableOverload {
                name: set.name().to_string(),
                args: invoke
                    .param_types()
                    .into_iter()
                    .map(|ty| self.ctx.type_name(ty))
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    fn proxy(&self, target: HostValue, invoke: &CallableDescriptor) -> DelegateTarget {
        DelegateTarget::Native(Arc::new(DelegateProxy {
            ctx: self.ctx.downgrade(),
            target,
            return_type: invoke.return_type,
            returns_void: invoke.returns_void(),
        }))
    }
}

fn check_arity(expected: usize, actual: usize) -> BridgeResult<()> {
    if expected != actual {
        return Err(BridgeError::InvalidArgumentCount { expected, actual });
    }
    Ok(())
}

/// Same parameter and return types, no generics left to bind.
fn matches_exactly(candidate: &CallableDescriptor, invoke: &CallableDescriptor) -> bool {
    !candidate.is_generic_definition()
        && !candidate.is_constructor()
        && candidate.return_type == invoke.return_type
        && candidate.params.len() == invoke.params.len()
        && candidate.param_types() == invoke.param_types()
}

/// Native delegate body calling back into host code.
///
/// The runtime owns the proxy, so the proxy only holds the runtime weakly.
struct DelegateProxy {
    ctx: WeakBridgeContext,
    target: HostValue,
    return_type: TypeHash,
    returns_void: bool,
}

impl DelegateProxy {
    fn dispatch(&self, args: &[ForeignValue]) -> BridgeResult<ForeignValue> {
        let ctx = self.ctx.upgrade().ok_or_else(|| {
            BridgeError::invalid_operation("Delegate outlived its foreign runtime")
        })?;
        let conversion = ctx.conversion();
        let args = conversion.to_host_all(args);
        let result = ctx.invoker().call(&self.target, &args)?;
        if self.returns_void {
            return Ok(ForeignValue::Null);
        }
        conversion.to_foreign(&result, self.return_type)
    }
}

impl ForeignCallable for DelegateProxy {
    fn call(&self, args: &[ForeignValue]) -> Result<ForeignValue, ForeignFault> {
        let _guard = HostLockGuard::acquire(self.ctx.host_lock());
        tracing::trace!(
            target_kind = self.target.type_name(),
            args = args.len(),
            "delegate callback"
        );
        self.dispatch(args).map_err(host_error_to_fault)
    }
}

fn host_error_to_fault(err: BridgeError) -> ForeignFault {
    match err {
        BridgeError::ForeignFault(fault) => fault,
        other => ForeignFault::new(format!("Host.{}", other.host_kind()), other.to_string()),
    }
}
