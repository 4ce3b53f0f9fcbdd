//! Per-parameter acceptance used by best-fit resolution.
//!
//! Acceptance is a heuristic over the host value's category and the declared
//! parameter type. It never converts anything and never calls into the
//! foreign runtime beyond metadata queries.

use dynbridge_core::{CanonicalType, HostValue, TypeHash, well_known};

use crate::BridgeContext;

/// Whether `arg` can be passed for a parameter declared as `param_type`.
pub(crate) fn accepts(ctx: &BridgeContext, param_type: TypeHash, arg: &HostValue) -> bool {
    if arg.is_none() {
        return true;
    }

    // Numeric parameters take any host number; range and fraction checks
    // happen when the chosen candidate converts its arguments.
    match CanonicalType::of(param_type) {
        CanonicalType::Object => {}
        CanonicalType::String => return matches!(arg, HostValue::Str(_)),
        _ => {
            return matches!(
                arg,
                HostValue::Int(_) | HostValue::Float(_) | HostValue::Bool(_)
            );
        }
    }

    let Ok(param) = ctx.type_info(param_type) else {
        return false;
    };
    if param.is_generic_parameter() {
        return true;
    }

    match arg {
        HostValue::Bool(_) | HostValue::Int(_) | HostValue::Float(_) | HostValue::Str(_) => {
            param_type == well_known::OBJECT
        }
        HostValue::Object(handle) if handle.is_null() => true,
        HostValue::Object(handle) => {
            let source = handle
                .value()
                .runtime_type()
                .unwrap_or(handle.type_hash());
            ctx.is_assignable(param_type, source)
        }
        HostValue::List(_) => {
            if param.is_array() || param_type == well_known::NONGENERIC_ILIST {
                return true;
            }
            match param.generic_args.as_slice() {
                [element] => ctx
                    .runtime()
                    .make_generic_type(well_known::IENUMERABLE, &[*element])
                    .is_ok_and(|enumerable| ctx.is_assignable(enumerable, param_type)),
                _ => false,
            }
        }
        HostValue::Dict(_) => {
            if param_type == well_known::NONGENERIC_IDICTIONARY {
                return true;
            }
            match param.generic_args.as_slice() {
                [key, value] => ctx
                    .runtime()
                    .make_generic_type(well_known::IDICTIONARY, &[*key, *value])
                    .is_ok_and(|mapping| ctx.is_assignable(mapping, param_type)),
                _ => false,
            }
        }
        HostValue::Callable(_)
        | HostValue::Method(_)
        | HostValue::Overloads(_)
        | HostValue::Type(_) => param.is_delegate(),
        HostValue::None => true,
    }
}
