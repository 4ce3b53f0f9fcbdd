//! Building foreign collections from host lists and dicts.
//!
//! Every element is converted before the collection is created, so a bad
//! element aborts the conversion with nothing half-built handed back.

use dynbridge_core::{
    BridgeError, BridgeResult, ForeignValue, HostValue, TypeDescriptor, TypeHash, well_known,
};

use super::ConversionEngine;
use crate::member::find_method;

/// Array or single-argument collection from a host list.
///
/// `Ok(None)` when the target is not a sequence type.
pub(super) fn sequence_to_foreign(
    engine: &ConversionEngine<'_>,
    items: &[HostValue],
    target: &TypeDescriptor,
) -> BridgeResult<Option<ForeignValue>> {
    let ctx = engine.context();

    if target.is_array() {
        let Some(element) = target.element_type else {
            return Ok(None);
        };
        let converted = convert_items(engine, items, element)?;
        let array = ctx.runtime().create_array(element, converted)?;
        return Ok(Some(array));
    }

    let (element, concrete) = if target.type_hash == well_known::NONGENERIC_ILIST {
        let list = ctx
            .runtime()
            .make_generic_type(well_known::LIST, &[well_known::OBJECT])?;
        (well_known::OBJECT, list)
    } else if target.generic_args.len() == 1 {
        let element = target.generic_args[0];
        let concrete = if target.is_interface() {
            ctx.runtime().make_generic_type(well_known::LIST, &[element])?
        } else {
            target.type_hash
        };
        (element, concrete)
    } else {
        return Ok(None);
    };
    if !ctx.is_assignable(target.type_hash, concrete) {
        return Ok(None);
    }

    let converted = convert_items(engine, items, element)?;
    let collection = construct_empty(engine, concrete)?;
    let add = require_add(engine, concrete, 1)?;
    for item in converted {
        ctx.foreign_call(|rt| rt.invoke(&add, Some(&collection), &mut [item]))?;
    }
    Ok(Some(collection))
}

/// Two-argument collection from a host dict.
///
/// `Ok(None)` when the target is not a mapping type.
pub(super) fn mapping_to_foreign(
    engine: &ConversionEngine<'_>,
    pairs: &[(HostValue, HostValue)],
    target: &TypeDescriptor,
) -> BridgeResult<Option<ForeignValue>> {
    let ctx = engine.context();

    let (key_type, value_type, concrete) = if target.type_hash == well_known::NONGENERIC_IDICTIONARY
    {
        let dict = ctx
            .runtime()
            .make_generic_type(well_known::DICTIONARY, &[well_known::OBJECT, well_known::OBJECT])?;
        (well_known::OBJECT, well_known::OBJECT, dict)
    } else if target.generic_args.len() == 2 {
        let (k, v) = (target.generic_args[0], target.generic_args[1]);
        let concrete = if target.is_interface() {
            ctx.runtime().make_generic_type(well_known::DICTIONARY, &[k, v])?
        } else {
            target.type_hash
        };
        (k, v, concrete)
    } else {
        return Ok(None);
    };
    if !ctx.is_assignable(target.type_hash, concrete) {
        return Ok(None);
    }

    let mut converted = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        converted.push((
            engine.to_foreign(key, key_type)?,
            engine.to_foreign(value, value_type)?,
        ));
    }
    let collection = construct_empty(engine, concrete)?;
    let add = require_add(engine, concrete, 2)?;
    for (key, value) in converted {
        ctx.foreign_call(|rt| rt.invoke(&add, Some(&collection), &mut [key, value]))?;
    }
    Ok(Some(collection))
}

fn convert_items(
    engine: &ConversionEngine<'_>,
    items: &[HostValue],
    element: TypeHash,
) -> BridgeResult<Vec<ForeignValue>> {
    items
        .iter()
        .map(|item| engine.to_foreign(item, element))
        .collect()
}

/// Instance from the parameterless constructor.
fn construct_empty(engine: &ConversionEngine<'_>, ty: TypeHash) -> BridgeResult<ForeignValue> {
    let ctx = engine.context();
    let info = ctx.type_info(ty)?;
    match info.constructors.iter().find(|ctor| ctor.params.is_empty()) {
        Some(ctor) => ctx.foreign_call(|rt| rt.invoke(ctor, None, &mut [])),
        None if info.is_value_type() => ctx.foreign_call(|rt| rt.create_default(ty)),
        None => Err(BridgeError::invalid_operation(format!(
            "{} has no parameterless constructor",
            info.name()
        ))),
    }
}

fn require_add(
    engine: &ConversionEngine<'_>,
    ty: TypeHash,
    arity: usize,
) -> BridgeResult<dynbridge_core::CallableDescriptor> {
    let ctx = engine.context();
    find_method(ctx, ty, "Add", arity).ok_or_else(|| {
        BridgeError::invalid_operation(format!("{} has no Add method", ctx.type_name(ty)))
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dynbridge_core::{ForeignRuntime, HostCallable};
    use dynbridge_runtime::{MemoryRuntime, ObjectData, array_type_hash};

    use super::*;
    use crate::BridgeContext;

    fn context() -> (Arc<MemoryRuntime>, BridgeContext) {
        let runtime = Arc::new(MemoryRuntime::new());
        let ctx = BridgeContext::new(runtime.clone());
        ctx.refresh();
        (runtime, ctx)
    }

    fn ints(values: &[i32]) -> HostValue {
        HostValue::List(values.iter().map(|v| HostValue::from(*v)).collect())
    }

    #[test]
    fn list_fills_a_fixed_length_array() {
        let (runtime, ctx) = context();
        let array_ty = array_type_hash(well_known::INT32);
        let array = ctx.conversion().to_foreign(&ints(&[1, 2, 3]), array_ty).unwrap();
        assert_eq!(runtime.array_length(&array), Ok(3));
        assert_eq!(runtime.array_get(&array, 2), Ok(ForeignValue::Int32(3)));
    }

    #[test]
    fn interface_target_substitutes_a_list() {
        let (runtime, ctx) = context();
        let ilist = runtime
            .make_generic_type(well_known::ILIST, &[well_known::INT32])
            .unwrap();
        let list_ty = runtime
            .make_generic_type(well_known::LIST, &[well_known::INT32])
            .unwrap();
        let value = ctx.conversion().to_foreign(&ints(&[4, 5]), ilist).unwrap();
        assert_eq!(value.runtime_type(), Some(list_ty));
        let items = runtime.with_object(value.as_object().unwrap(), |data| {
            Ok(match data {
                ObjectData::List(items) => items.clone(),
                _ => Vec::new(),
            })
        });
        assert_eq!(
            items.ok(),
            Some(vec![ForeignValue::Int32(4), ForeignValue::Int32(5)])
        );
    }

    #[test]
    fn enumerable_target_accepts_lists() {
        let (runtime, ctx) = context();
        let enumerable = runtime
            .make_generic_type(well_known::IENUMERABLE, &[well_known::STRING])
            .unwrap();
        let value = ctx
            .conversion()
            .to_foreign(&HostValue::from(vec!["a", "b"]), enumerable)
            .unwrap();
        assert!(ctx.is_assignable(enumerable, value.runtime_type().unwrap()));
    }

    #[test]
    fn bad_element_aborts_without_allocating() {
        let (runtime, ctx) = context();
        let ilist = runtime
            .make_generic_type(well_known::ILIST, &[well_known::INT32])
            .unwrap();
        let before = runtime.live_objects();
        let bad = HostValue::List(vec![HostValue::Int(1), HostValue::str("two")]);
        let err = ctx.conversion().to_foreign(&bad, ilist).unwrap_err();
        assert_eq!(err, BridgeError::invalid_cast("str", "System.Int32"));
        assert_eq!(runtime.live_objects(), before);
    }

    #[test]
    fn dict_fills_a_dictionary() {
        let (runtime, ctx) = context();
        let idict = runtime
            .make_generic_type(well_known::IDICTIONARY, &[well_known::STRING, well_known::INT32])
            .unwrap();
        let dict_ty = runtime
            .make_generic_type(well_known::DICTIONARY, &[well_known::STRING, well_known::INT32])
            .unwrap();
        let host = HostValue::Dict(vec![
            (HostValue::str("a"), HostValue::Int(1)),
            (HostValue::str("b"), HostValue::Int(2)),
        ]);
        let value = ctx.conversion().to_foreign(&host, idict).unwrap();
        assert_eq!(value.runtime_type(), Some(dict_ty));
        let len = runtime.with_object(value.as_object().unwrap(), |data| {
            Ok(match data {
                ObjectData::Dict(entries) => entries.len(),
                _ => 0,
            })
        });
        assert_eq!(len.ok(), Some(2));
    }

    #[test]
    fn non_generic_interfaces_hold_objects() {
        let (runtime, ctx) = context();
        let value = ctx
            .conversion()
            .to_foreign(
                &HostValue::List(vec![HostValue::Int(1), HostValue::str("x")]),
                well_known::NONGENERIC_ILIST,
            )
            .unwrap();
        let object_list = runtime
            .make_generic_type(well_known::LIST, &[well_known::OBJECT])
            .unwrap();
        assert_eq!(value.runtime_type(), Some(object_list));
    }

    #[test]
    fn lists_do_not_fill_unrelated_types() {
        let (_, ctx) = context();
        let err = ctx
            .conversion()
            .to_foreign(&ints(&[1]), TypeHash::from_name("System.Math"))
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidCast { .. }));
        let callable = HostValue::Callable(HostCallable::new("f", |_| Ok(HostValue::None)));
        assert!(
            ctx.conversion()
                .to_foreign(&callable, TypeHash::from_name("System.Math"))
                .is_err()
        );
    }
}
