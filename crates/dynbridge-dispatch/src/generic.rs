//! Generic specialization of types and methods.

use dynbridge_core::{
    BridgeError, BridgeResult, CallableDescriptor, HostValue, TypeDescriptor, TypeHash, well_known,
};

use crate::BridgeContext;

/// Foreign type standing for a host value when inferring type arguments.
///
/// `None` carries no type information.
pub fn host_value_type(value: &HostValue) -> Option<TypeHash> {
    match value {
        HostValue::Bool(_) => Some(well_known::BOOLEAN),
        HostValue::Int(_) => Some(well_known::INT32),
        HostValue::Float(_) => Some(well_known::DOUBLE),
        HostValue::Str(_) => Some(well_known::STRING),
        HostValue::List(_) => Some(well_known::NONGENERIC_ILIST),
        HostValue::Dict(_) => Some(well_known::NONGENERIC_IDICTIONARY),
        HostValue::Object(handle) if handle.has_type() => {
            Some(handle.value().runtime_type().unwrap_or(handle.type_hash()))
        }
        _ => None,
    }
}

/// Type arguments for a generic method definition, read off `args`.
///
/// Each generic parameter takes the type of the argument passed for the
/// first parameter declared with exactly that generic type.
pub fn infer_type_arguments(
    method: &CallableDescriptor,
    args: &[HostValue],
) -> BridgeResult<Vec<TypeHash>> {
    let inputs: Vec<TypeHash> = method
        .params
        .iter()
        .filter(|param| !param.is_out_only())
        .map(|param| param.param_type)
        .collect();
    method
        .generic_params
        .iter()
        .map(|generic| {
            inputs
                .iter()
                .zip(args)
                .find(|(param_type, _)| *param_type == generic)
                .and_then(|(_, arg)| host_value_type(arg))
                .ok_or_else(|| {
                    BridgeError::invalid_operation(format!(
                        "Cannot infer type arguments for {}",
                        method.name
                    ))
                })
        })
        .collect()
}

/// Instantiate a generic method definition with `args`.
pub fn specialize_method(
    ctx: &BridgeContext,
    method: &CallableDescriptor,
    args: &[TypeHash],
) -> BridgeResult<CallableDescriptor> {
    let instance = ctx.foreign_call(|rt| rt.make_generic_method(method, args))?;
    tracing::trace!(method = %method.name, args = args.len(), "specialized generic method");
    Ok(instance)
}

/// Specialize a generic type definition with `args`.
pub fn specialize_type(
    ctx: &BridgeContext,
    definition: &TypeDescriptor,
    args: &[TypeHash],
) -> BridgeResult<TypeDescriptor> {
    if !definition.is_generic_definition() {
        return Err(BridgeError::invalid_operation(format!(
            "{} is not a generic type definition",
            definition.name()
        )));
    }
    let hash = ctx.foreign_call(|rt| rt.make_generic_type(definition.type_hash, args))?;
    tracing::trace!(definition = %definition.name(), "specialized generic type");
    ctx.type_info(hash)
}
