//! Calling foreign callables with host arguments.
//!
//! Arguments bind left to right onto the declared inputs. Out-only
//! parameters take no argument; trailing optional parameters may be omitted
//! and take their declared default. Every check happens before the foreign
//! call, so a rejected call has no foreign side effects.
//!
//! When a callable declares output parameters, the host receives a list of
//! their final values in declaration order followed by the return value
//! (left out for `void`).

use std::borrow::Cow;

use dynbridge_core::{
    BoundCallable, BridgeError, BridgeResult, ForeignValue, HostValue, OverloadSet,
};

use crate::generic::{infer_type_arguments, specialize_method};
use crate::{BridgeContext, OverloadResolver};

/// Executes bound callables.
#[derive(Clone, Copy)]
pub struct InvocationEngine<'a> {
    ctx: &'a BridgeContext,
}

impl<'a> InvocationEngine<'a> {
    pub fn new(ctx: &'a BridgeContext) -> Self {
        Self { ctx }
    }

    /// Call `bound` with positional host arguments.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn invoke(&self, bound: &BoundCallable, args: &[HostValue]) -> BridgeResult<HostValue> {
        check_argument_count(bound, args.len())?;

        let bound = if bound.callable.is_generic_definition() {
            let type_args = infer_type_arguments(&bound.callable, args)?;
            let method = specialize_method(self.ctx, &bound.callable, &type_args)?;
            Cow::Owned(BoundCallable::new(method, bound.receiver.clone()))
        } else {
            Cow::Borrowed(bound)
        };
        let callable = &bound.callable;

        if !callable.is_static && bound.receiver.is_none() {
            return Err(BridgeError::NullReference(format!(
                "instance method '{}' called without an instance",
                callable.name
            )));
        }

        let conversion = self.ctx.conversion();
        let mut inputs = args.iter();
        let mut slots = Vec::with_capacity(callable.params.len());
        for param in &callable.params {
            if param.is_out_only() {
                slots.push(ForeignValue::Null);
                continue;
            }
            match inputs.next() {
                Some(arg) => slots.push(conversion.to_foreign(arg, param.param_type)?),
                None => slots.push(param.default.clone().unwrap_or_default()),
            }
        }

        if self.ctx.options().trace_invocations {
            tracing::debug!(method = %callable.name, args = args.len(), "foreign call");
        } else {
            tracing::trace!(method = %callable.name, args = args.len(), "foreign call");
        }
        let result = self
            .ctx
            .foreign_call(|rt| rt.invoke(callable, bound.receiver.as_ref(), &mut slots))?;

        if callable.has_outputs() {
            let mut outputs: Vec<HostValue> = callable
                .params
                .iter()
                .zip(&slots)
                .filter(|(param, _)| param.is_out())
                .map(|(_, value)| conversion.to_host(value))
                .collect();
            if !callable.returns_void() {
                outputs.push(conversion.to_host(&result));
            }
            return Ok(HostValue::List(outputs));
        }
        if callable.returns_void() {
            return Ok(HostValue::None);
        }
        Ok(conversion.to_host(&result))
    }

    /// Best-fit an overload set and call the winner.
    pub fn call_overloads(&self, set: &OverloadSet, args: &[HostValue]) -> BridgeResult<HostValue> {
        let index = OverloadResolver::new(self.ctx, set).find_best_match(args)?;
        let bound = set.bind(index).ok_or(BridgeError::IndexOutOfRange {
            index: index as i64,
            len: set.len(),
        })?;
        self.invoke(&bound, args)
    }

    /// Call any callable host value.
    pub fn call(&self, target: &HostValue, args: &[HostValue]) -> BridgeResult<HostValue> {
        match target {
            HostValue::Callable(callable) => callable.call(args),
            HostValue::Method(bound) => self.invoke(bound, args),
            HostValue::Overloads(set) => self.call_overloads(set, args),
            HostValue::Type(ty) => self.ctx.objects().construct(ty, args),
            other => Err(BridgeError::invalid_operation(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }
}

/// Arguments bind left to right, so every input up to the last required
/// one must be supplied, optional or not.
fn check_argument_count(bound: &BoundCallable, actual: usize) -> BridgeResult<()> {
    let inputs = bound.callable.input_count();
    let required = bound
        .callable
        .params
        .iter()
        .filter(|param| !param.is_out_only())
        .enumerate()
        .filter(|(_, param)| !param.is_optional())
        .map(|(position, _)| position + 1)
        .last()
        .unwrap_or(0);
    if actual < required || actual > inputs {
        return Err(BridgeError::InvalidArgumentCount {
            expected: inputs,
            actual,
        });
    }
    Ok(())
}

/// An overload fixed by explicit selection.
///
/// Takes exactly the declared inputs; defaults are not filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct CallableInstance {
    bound: BoundCallable,
}

impl CallableInstance {
    pub fn new(bound: BoundCallable) -> Self {
        Self { bound }
    }

    pub fn bound(&self) -> &BoundCallable {
        &self.bound
    }

    pub fn into_bound(self) -> BoundCallable {
        self.bound
    }

    pub fn call(&self, ctx: &BridgeContext, args: &[HostValue]) -> BridgeResult<HostValue> {
        let expected = self.bound.callable.input_count();
        if args.len() != expected {
            return Err(BridgeError::InvalidArgumentCount {
                expected,
                actual: args.len(),
            });
        }
        ctx.invoker().invoke(&self.bound, args)
    }
}
