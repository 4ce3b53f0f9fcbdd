//! The `System` module every [`MemoryRuntime`](crate::MemoryRuntime) starts with.
//!
//! Root types, primitives, the generic collections used by structural
//! conversion, and the `Action`/`Func` delegate families.

use dynbridge_core::{
    ForeignFault, ForeignRuntime, ForeignValue, ParamDescriptor, TypeFlags, TypeHash, well_known,
};

use crate::builder::ModuleBuilder;
use crate::heap::ObjectData;
use crate::native::CallContext;

const COLLECTIONS: &str = "System.Collections.Generic";

/// Highest arity of the `Action` family; `Func` goes one higher for the result.
pub const MAX_DELEGATE_ARITY: usize = 4;

pub fn module() -> ModuleBuilder {
    let mut module = ModuleBuilder::new("System");
    register_roots(&mut module);
    register_primitives(&mut module);
    register_collections(&mut module);
    register_delegates(&mut module);
    register_math(&mut module);
    module
}

fn register_roots(module: &mut ModuleBuilder) {
    module
        .class("System.Object")
        .root()
        .default_constructor()
        .finish();
    module
        .class("System.ValueType")
        .flags(TypeFlags::ABSTRACT)
        .finish();
    module
        .class("System.Enum")
        .base(well_known::VALUE_TYPE)
        .flags(TypeFlags::ABSTRACT)
        .finish();
    module
        .class("System.Array")
        .flags(TypeFlags::ABSTRACT)
        .implements(well_known::NONGENERIC_ILIST)
        .finish();
    module
        .class("System.Delegate")
        .flags(TypeFlags::ABSTRACT)
        .finish();
    module.value_type("System.Void").finish();
    module.interface("System.IDisposable").finish();
    module.interface("System.Collections.IList").finish();
    module.interface("System.Collections.IDictionary").finish();
}

fn register_primitives(module: &mut ModuleBuilder) {
    for name in [
        "System.Boolean",
        "System.SByte",
        "System.Int16",
        "System.Int64",
        "System.Byte",
        "System.UInt16",
        "System.UInt32",
        "System.UInt64",
        "System.Single",
        "System.Double",
    ] {
        module.value_type(name).flags(TypeFlags::PRIMITIVE).finish();
    }

    module
        .value_type("System.Int32")
        .flags(TypeFlags::PRIMITIVE)
        .static_method(
            "Parse",
            vec![ParamDescriptor::new("s", well_known::STRING)],
            well_known::INT32,
            |ctx| {
                let text: String = ctx.arg(0)?;
                let value = parse_int(&text).ok_or_else(|| {
                    ForeignFault::new(
                        "System.FormatException",
                        format!("The input string '{text}' was not in a correct format."),
                    )
                })?;
                ctx.set_return(value);
                Ok(())
            },
        )
        .static_method(
            "TryParse",
            vec![
                ParamDescriptor::new("s", well_known::STRING),
                ParamDescriptor::out("result", well_known::INT32),
            ],
            well_known::BOOLEAN,
            |ctx| {
                let text: String = ctx.arg(0)?;
                let parsed = parse_int(&text);
                ctx.set_arg(1, parsed.unwrap_or(0))?;
                ctx.set_return(parsed.is_some());
                Ok(())
            },
        )
        .finish();

    module
        .class("System.String")
        .static_method(
            "Concat",
            vec![
                ParamDescriptor::new("str0", well_known::STRING),
                ParamDescriptor::new("str1", well_known::STRING),
            ],
            well_known::STRING,
            |ctx| {
                let a: String = nullable_string(ctx, 0)?;
                let b: String = nullable_string(ctx, 1)?;
                ctx.set_return(a + &b);
                Ok(())
            },
        )
        .static_method(
            "IsNullOrEmpty",
            vec![ParamDescriptor::new("value", well_known::STRING)],
            well_known::BOOLEAN,
            |ctx| {
                let empty = nullable_string(ctx, 0)?.is_empty();
                ctx.set_return(empty);
                Ok(())
            },
        )
        .finish();
}

fn parse_int(text: &str) -> Option<i32> {
    text.trim().parse().ok()
}

fn nullable_string(ctx: &CallContext<'_>, index: usize) -> Result<String, ForeignFault> {
    match ctx.arg_value(index)? {
        ForeignValue::Null => Ok(String::new()),
        _ => ctx.arg(index),
    }
}

// ============================================================================
// Collections
// ============================================================================

fn out_of_range() -> ForeignFault {
    ForeignFault::new(
        "System.ArgumentOutOfRangeException",
        "Index was out of range. Must be non-negative and less than the size of the collection.",
    )
}

fn with_list<R>(
    ctx: &CallContext<'_>,
    f: impl FnOnce(&mut Vec<ForeignValue>) -> Result<R, ForeignFault>,
) -> Result<R, ForeignFault> {
    ctx.with_this(|data| match data {
        ObjectData::List(items) => f(items),
        other => Err(ForeignFault::invalid_cast(format!(
            "expected a list, found a {} object",
            other.kind_name()
        ))),
    })
}

fn with_entries<R>(
    ctx: &CallContext<'_>,
    f: impl FnOnce(&mut Vec<(ForeignValue, ForeignValue)>) -> Result<R, ForeignFault>,
) -> Result<R, ForeignFault> {
    ctx.with_this(|data| match data {
        ObjectData::Dict(entries) => f(entries),
        other => Err(ForeignFault::invalid_cast(format!(
            "expected a dictionary, found a {} object",
            other.kind_name()
        ))),
    })
}

fn with_pair<R>(
    ctx: &CallContext<'_>,
    f: impl FnOnce(&ForeignValue, &ForeignValue) -> R,
) -> Result<R, ForeignFault> {
    ctx.with_this(|data| match data {
        ObjectData::Pair(first, second) => Ok(f(first, second)),
        other => Err(ForeignFault::invalid_cast(format!(
            "expected a pair, found a {} object",
            other.kind_name()
        ))),
    })
}

fn list_index(ctx: &CallContext<'_>, len: usize) -> Result<usize, ForeignFault> {
    let index: i32 = ctx.arg(0)?;
    usize::try_from(index)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(out_of_range)
}

fn register_collections(module: &mut ModuleBuilder) {
    let ienumerable = format!("{COLLECTIONS}.IEnumerable`1");
    let t = module.generic_param(&ienumerable, "T");
    module
        .interface(&ienumerable)
        .generic_params(vec![t])
        .finish();

    let ilist = format!("{COLLECTIONS}.IList`1");
    let t = module.generic_param(&ilist, "T");
    let enumerable_t = module.constructed(well_known::IENUMERABLE, &[t]);
    module
        .interface(&ilist)
        .generic_params(vec![t])
        .implements(enumerable_t)
        .finish();

    let idictionary = format!("{COLLECTIONS}.IDictionary`2");
    let k = module.generic_param(&idictionary, "TKey");
    let v = module.generic_param(&idictionary, "TValue");
    module
        .interface(&idictionary)
        .generic_params(vec![k, v])
        .finish();

    register_list(module);
    register_dictionary(module);

    let pair = format!("{COLLECTIONS}.KeyValuePair`2");
    let k = module.generic_param(&pair, "TKey");
    let v = module.generic_param(&pair, "TValue");
    module
        .value_type(&pair)
        .generic_params(vec![k, v])
        .property_get("Key", k, |ctx| {
            let key = with_pair(ctx, |key, _| key.clone())?;
            ctx.set_return(key);
            Ok(())
        })
        .property_get("Value", v, |ctx| {
            let value = with_pair(ctx, |_, value| value.clone())?;
            ctx.set_return(value);
            Ok(())
        })
        .finish();

    let tuple = "System.Tuple`2";
    let t1 = module.generic_param(tuple, "T1");
    let t2 = module.generic_param(tuple, "T2");
    module
        .class(tuple)
        .generic_params(vec![t1, t2])
        .constructor(
            vec![
                ParamDescriptor::new("item1", t1),
                ParamDescriptor::new("item2", t2),
            ],
            |ctx| {
                let data = ObjectData::Pair(ctx.arg_value(0)?.clone(), ctx.arg_value(1)?.clone());
                let tuple = ctx.allocate(data);
                ctx.set_return(tuple);
                Ok(())
            },
        )
        .property_get("Item1", t1, |ctx| {
            let item = with_pair(ctx, |first, _| first.clone())?;
            ctx.set_return(item);
            Ok(())
        })
        .property_get("Item2", t2, |ctx| {
            let item = with_pair(ctx, |_, second| second.clone())?;
            ctx.set_return(item);
            Ok(())
        })
        .finish();
}

fn register_list(module: &mut ModuleBuilder) {
    let list = format!("{COLLECTIONS}.List`1");
    let t = module.generic_param(&list, "T");
    let ilist_t = module.constructed(well_known::ILIST, &[t]);
    module
        .class(&list)
        .generic_params(vec![t])
        .implements(ilist_t)
        .implements(well_known::NONGENERIC_ILIST)
        .constructor(Vec::new(), |ctx| {
            let list = ctx.allocate(ObjectData::List(Vec::new()));
            ctx.set_return(list);
            Ok(())
        })
        .method(
            "Add",
            vec![ParamDescriptor::new("item", t)],
            well_known::VOID,
            |ctx| {
                let item = ctx.arg_value(0)?.clone();
                with_list(ctx, |items| {
                    items.push(item);
                    Ok(())
                })
            },
        )
        .method("Clear", Vec::new(), well_known::VOID, |ctx| {
            with_list(ctx, |items| {
                items.clear();
                Ok(())
            })
        })
        .method(
            "Contains",
            vec![ParamDescriptor::new("item", t)],
            well_known::BOOLEAN,
            |ctx| {
                let needle = ctx.arg_value(0)?.clone();
                let items = with_list(ctx, |items| Ok(items.clone()))?;
                let runtime = ctx.runtime();
                let found = items.iter().any(|item| runtime.equals(item, &needle));
                ctx.set_return(found);
                Ok(())
            },
        )
        .property_get("Count", well_known::INT32, |ctx| {
            let count = with_list(ctx, |items| Ok(items.len()))?;
            ctx.set_return(count as i32);
            Ok(())
        })
        .indexer(
            well_known::INT32,
            t,
            |ctx| {
                let item = with_list(ctx, |items| {
                    let index = list_index(ctx, items.len())?;
                    Ok(items[index].clone())
                });
                ctx.set_return(item?);
                Ok(())
            },
            |ctx| {
                let value = ctx.arg_value(1)?.clone();
                with_list(ctx, |items| {
                    let index = list_index(ctx, items.len())?;
                    items[index] = value;
                    Ok(())
                })
            },
        )
        .finish();
}

fn register_dictionary(module: &mut ModuleBuilder) {
    let dictionary = format!("{COLLECTIONS}.Dictionary`2");
    let k = module.generic_param(&dictionary, "TKey");
    let v = module.generic_param(&dictionary, "TValue");
    let idictionary_kv = module.constructed(well_known::IDICTIONARY, &[k, v]);

    module
        .class(&dictionary)
        .generic_params(vec![k, v])
        .implements(idictionary_kv)
        .implements(well_known::NONGENERIC_IDICTIONARY)
        .constructor(Vec::new(), |ctx| {
            let dict = ctx.allocate(ObjectData::Dict(Vec::new()));
            ctx.set_return(dict);
            Ok(())
        })
        .method(
            "Add",
            vec![
                ParamDescriptor::new("key", k),
                ParamDescriptor::new("value", v),
            ],
            well_known::VOID,
            |ctx| {
                let key = ctx.arg_value(0)?.clone();
                let value = ctx.arg_value(1)?.clone();
                if key.is_null() {
                    return Err(ForeignFault::new(
                        "System.ArgumentNullException",
                        "Value cannot be null. (Parameter 'key')",
                    ));
                }
                let runtime = ctx.runtime();
                let duplicate = with_entries(ctx, |entries| {
                    if entries.iter().any(|(existing, _)| runtime.equals(existing, &key)) {
                        return Ok(true);
                    }
                    entries.push((key.clone(), value));
                    Ok(false)
                })?;
                if duplicate {
                    return Err(ForeignFault::argument(format!(
                        "An item with the same key has already been added. Key: {}",
                        runtime.display(&key)?
                    )));
                }
                Ok(())
            },
        )
        .method(
            "ContainsKey",
            vec![ParamDescriptor::new("key", k)],
            well_known::BOOLEAN,
            |ctx| {
                let key = ctx.arg_value(0)?.clone();
                let runtime = ctx.runtime();
                let found = with_entries(ctx, |entries| {
                    Ok(entries.iter().any(|(existing, _)| runtime.equals(existing, &key)))
                })?;
                ctx.set_return(found);
                Ok(())
            },
        )
        .method(
            "TryGetValue",
            vec![
                ParamDescriptor::new("key", k),
                ParamDescriptor::out("value", v),
            ],
            well_known::BOOLEAN,
            |ctx| {
                let key = ctx.arg_value(0)?.clone();
                let runtime = ctx.runtime();
                let found = with_entries(ctx, |entries| {
                    Ok(entries
                        .iter()
                        .find(|(existing, _)| runtime.equals(existing, &key))
                        .map(|(_, value)| value.clone()))
                })?;
                ctx.set_return(found.is_some());
                ctx.set_arg(1, found.unwrap_or_default())
            },
        )
        .property_get("Count", well_known::INT32, |ctx| {
            let count = with_entries(ctx, |entries| Ok(entries.len()))?;
            ctx.set_return(count as i32);
            Ok(())
        })
        .indexer(
            k,
            v,
            |ctx| {
                let key = ctx.arg_value(0)?.clone();
                let runtime = ctx.runtime();
                let found = with_entries(ctx, |entries| {
                    Ok(entries
                        .iter()
                        .find(|(existing, _)| runtime.equals(existing, &key))
                        .map(|(_, value)| value.clone()))
                })?;
                let value = found.ok_or_else(|| {
                    ForeignFault::new(
                        "System.Collections.Generic.KeyNotFoundException",
                        format!(
                            "The given key '{}' was not present in the dictionary.",
                            runtime.display(&key).unwrap_or_default()
                        ),
                    )
                })?;
                ctx.set_return(value);
                Ok(())
            },
            |ctx| {
                let key = ctx.arg_value(0)?.clone();
                let value = ctx.arg_value(1)?.clone();
                let runtime = ctx.runtime();
                with_entries(ctx, |entries| {
                    match entries
                        .iter_mut()
                        .find(|(existing, _)| runtime.equals(existing, &key))
                    {
                        Some((_, slot)) => *slot = value,
                        None => entries.push((key, value)),
                    }
                    Ok(())
                })
            },
        )
        .finish();
}

// ============================================================================
// Delegates
// ============================================================================

fn register_delegates(module: &mut ModuleBuilder) {
    module.delegate("System.Action", Vec::new(), well_known::VOID);

    for arity in 1..=MAX_DELEGATE_ARITY {
        let name = format!("System.Action`{arity}");
        let params: Vec<TypeHash> = (1..=arity)
            .map(|i| module.generic_param(&name, &type_param_name(arity, i)))
            .collect();
        let invoke_params = params
            .iter()
            .enumerate()
            .map(|(i, ty)| ParamDescriptor::new(format!("arg{}", i + 1), *ty))
            .collect();
        module.generic_delegate(&name, params, invoke_params, well_known::VOID);
    }

    for arity in 0..=MAX_DELEGATE_ARITY {
        let name = format!("System.Func`{}", arity + 1);
        let mut params: Vec<TypeHash> = (1..=arity)
            .map(|i| module.generic_param(&name, &type_param_name(arity, i)))
            .collect();
        let result = module.generic_param(&name, "TResult");
        let invoke_params = params
            .iter()
            .enumerate()
            .map(|(i, ty)| ParamDescriptor::new(format!("arg{}", i + 1), *ty))
            .collect();
        params.push(result);
        module.generic_delegate(&name, params, invoke_params, result);
    }
}

fn type_param_name(arity: usize, index: usize) -> String {
    if arity == 1 {
        "T".to_string()
    } else {
        format!("T{index}")
    }
}

// ============================================================================
// Math
// ============================================================================

fn register_math(module: &mut ModuleBuilder) {
    let int_pair = || {
        vec![
            ParamDescriptor::new("val1", well_known::INT32),
            ParamDescriptor::new("val2", well_known::INT32),
        ]
    };
    let double_pair = || {
        vec![
            ParamDescriptor::new("val1", well_known::DOUBLE),
            ParamDescriptor::new("val2", well_known::DOUBLE),
        ]
    };
    module
        .class("System.Math")
        .flags(TypeFlags::ABSTRACT)
        .static_method("Max", int_pair(), well_known::INT32, |ctx| {
            let (a, b): (i32, i32) = (ctx.arg(0)?, ctx.arg(1)?);
            ctx.set_return(a.max(b));
            Ok(())
        })
        .static_method("Max", double_pair(), well_known::DOUBLE, |ctx| {
            let (a, b): (f64, f64) = (ctx.arg(0)?, ctx.arg(1)?);
            ctx.set_return(a.max(b));
            Ok(())
        })
        .static_method(
            "Abs",
            vec![ParamDescriptor::new("value", well_known::INT32)],
            well_known::INT32,
            |ctx| {
                let value: i32 = ctx.arg(0)?;
                let abs = value.checked_abs().ok_or_else(|| {
                    ForeignFault::new(
                        "System.OverflowException",
                        "Negating the minimum value of a twos complement number is invalid.",
                    )
                })?;
                ctx.set_return(abs);
                Ok(())
            },
        )
        .static_method(
            "Abs",
            vec![ParamDescriptor::new("value", well_known::DOUBLE)],
            well_known::DOUBLE,
            |ctx| {
                let value: f64 = ctx.arg(0)?;
                ctx.set_return(value.abs());
                Ok(())
            },
        )
        .finish();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_module_defines_roots_and_primitives() {
        let names = module().type_names();
        for expected in [
            "System.Object",
            "System.Int32",
            "System.String",
            "System.Collections.Generic.List`1",
            "System.Collections.Generic.Dictionary`2",
            "System.Func`3",
            "System.Action`4",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }

    #[test]
    fn generic_parameters_are_not_listed() {
        let names = module().type_names();
        assert!(!names.iter().any(|n| n.ends_with(".T")));
    }

    #[test]
    fn func_type_param_naming() {
        assert_eq!(type_param_name(1, 1), "T");
        assert_eq!(type_param_name(3, 2), "T2");
    }
}
