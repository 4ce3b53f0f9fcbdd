//! End-to-end tests for the bridge.
//!
//! Every test drives a `Bridge` over a `MemoryRuntime` with the `System`
//! module plus a small `Shop` module, exercising the host-visible surface
//! only.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dynbridge::prelude::*;
use dynbridge::{BridgeConfig, NamespaceMember};
use dynbridge_core::{ObjectRef, ParamDescriptor, TypeFlags};
use dynbridge_runtime::{CallContext, ObjectData};

// =============================================================================
// Fixture
// =============================================================================

struct Shop {
    bridge: Bridge,
    closed_receipts: Arc<AtomicUsize>,
}

impl Shop {
    fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    fn with_config(config: BridgeConfig) -> Self {
        let runtime = Arc::new(MemoryRuntime::new());
        let closed_receipts = Arc::new(AtomicUsize::new(0));
        runtime
            .load_module(shop_module(closed_receipts.clone()))
            .expect("shop module loads");
        let bridge = Bridge::with_config(runtime, config);
        Self {
            bridge,
            closed_receipts,
        }
    }

    fn type_handle(&self, name: &str) -> TypeHandle {
        self.bridge.lookup_type(name).expect("registered type")
    }

    fn ty(&self, name: &str) -> HostValue {
        HostValue::Type(self.type_handle(name))
    }

    fn product(&self, name: &str, price: f64) -> HostValue {
        self.bridge
            .call(
                &self.ty("Shop.Product"),
                &[HostValue::str(name), HostValue::Float(price)],
            )
            .expect("product constructs")
    }

    fn handling(&self, name: &str) -> HostValue {
        self.bridge
            .get_attr(&self.ty("Shop.Handling"), name)
            .expect("enum value")
    }

    fn closed_receipts(&self) -> usize {
        self.closed_receipts.load(Ordering::SeqCst)
    }
}

fn p(name: &str, ty: TypeHash) -> ParamDescriptor {
    ParamDescriptor::new(name, ty)
}

fn shop_module(closed_receipts: Arc<AtomicUsize>) -> ModuleBuilder {
    let mut module = ModuleBuilder::new("Shop");

    module.enumeration(
        "Shop.Handling",
        &[("None", 0), ("Fragile", 1), ("Heavy", 2), ("Perishable", 4)],
    );

    module
        .class("Shop.Product")
        .field("Name", well_known::STRING)
        .field("Price", well_known::DOUBLE)
        .constructor(
            vec![p("name", well_known::STRING), p("price", well_known::DOUBLE)],
            |ctx| {
                let name: String = ctx.arg(0)?;
                let price: f64 = ctx.arg(1)?;
                let instance = ctx.new_instance()?;
                let runtime = ctx.runtime();
                runtime.write_field_by_name(&instance, "Name", ForeignValue::string(&name))?;
                runtime.write_field_by_name(&instance, "Price", ForeignValue::Float64(price))?;
                ctx.set_return(instance);
                Ok(())
            },
        )
        .property_get("Label", well_known::STRING, |ctx| {
            let name: String = ctx.field("Name")?;
            let price: f64 = ctx.field("Price")?;
            ctx.set_return(format!("{name} @ {price}"));
            Ok(())
        })
        .method(
            "Discount",
            vec![p("percent", well_known::INT32)],
            well_known::DOUBLE,
            |ctx| {
                let percent: i32 = ctx.arg(0)?;
                if !(0..=100).contains(&percent) {
                    return Err(ForeignFault::new(
                        "System.ArgumentOutOfRangeException",
                        "percent must be between 0 and 100",
                    ));
                }
                let price: f64 = ctx.field("Price")?;
                ctx.set_return(price * f64::from(100 - percent) / 100.0);
                Ok(())
            },
        )
        .method(
            "Discount",
            vec![p("amount", well_known::DOUBLE)],
            well_known::DOUBLE,
            |ctx| {
                let amount: f64 = ctx.arg(0)?;
                let price: f64 = ctx.field("Price")?;
                ctx.set_return(price - amount);
                Ok(())
            },
        )
        .method("ToString", Vec::new(), well_known::STRING, |ctx| {
            let name: String = ctx.field("Name")?;
            ctx.set_return(name);
            Ok(())
        })
        .finish();

    let doubles = module.constructed(well_known::ILIST, &[well_known::DOUBLE]);
    let pricing_fn = module.constructed(
        TypeHash::from_name("System.Func`2"),
        &[well_known::DOUBLE, well_known::DOUBLE],
    );
    let identity_t = module.generic_param("Shop.Pricing.Identity", "T");

    module
        .class("Shop.Pricing")
        .flags(TypeFlags::ABSTRACT)
        .static_field("TaxRate", well_known::DOUBLE, ForeignValue::Float64(0.2))
        .static_method("Total", vec![p("prices", doubles)], well_known::DOUBLE, |ctx| {
            let list: ObjectRef = ctx.arg(0)?;
            let total = ctx.runtime().with_object(list, |data| match data {
                ObjectData::List(items) => Ok(items.iter().filter_map(ForeignValue::as_f64).sum::<f64>()),
                _ => Err(ForeignFault::invalid_cast("not a list")),
            })?;
            ctx.set_return(total);
            Ok(())
        })
        .static_method(
            "Apply",
            vec![p("rule", pricing_fn), p("price", well_known::DOUBLE)],
            well_known::DOUBLE,
            |ctx| {
                let rule = ctx.arg_value(0)?.clone();
                let price = ctx.arg_value(1)?.clone();
                let result = ctx.invoke_delegate(&rule, &[price])?;
                ctx.set_return(result);
                Ok(())
            },
        )
        .static_method(
            "TryParsePrice",
            vec![
                p("text", well_known::STRING),
                ParamDescriptor::out("price", well_known::DOUBLE),
            ],
            well_known::BOOLEAN,
            |ctx: &mut CallContext<'_>| {
                let text: String = ctx.arg(0)?;
                let parsed = text.parse::<f64>().ok();
                ctx.set_arg(1, parsed.unwrap_or(0.0))?;
                ctx.set_return(parsed.is_some());
                Ok(())
            },
        )
        .static_method(
            "Clamp",
            vec![
                p("value", well_known::INT32),
                ParamDescriptor::optional("min", well_known::INT32, ForeignValue::Int32(0)),
                ParamDescriptor::optional("max", well_known::INT32, ForeignValue::Int32(100)),
            ],
            well_known::INT32,
            |ctx| {
                let (value, min, max): (i32, i32, i32) = (ctx.arg(0)?, ctx.arg(1)?, ctx.arg(2)?);
                ctx.set_return(value.clamp(min, max));
                Ok(())
            },
        )
        .generic_method(
            "Identity",
            vec![identity_t],
            vec![p("value", identity_t)],
            identity_t,
            |ctx| {
                let value = ctx.arg_value(0)?.clone();
                ctx.set_return(value);
                Ok(())
            },
        )
        .finish();

    module
        .class("Shop.Receipt")
        .implements(TypeHash::from_name("System.IDisposable"))
        .default_constructor()
        .method("Dispose", Vec::new(), well_known::VOID, move |_| {
            closed_receipts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .finish();

    module
        .class("Shop.Internal.Ledger")
        .default_constructor()
        .finish();

    module
        .class("Shop.Cache")
        .flags(TypeFlags::COMPILER_GENERATED)
        .default_constructor()
        .finish();

    let product = TypeHash::from_name("Shop.Product");
    module
        .class("Promotions.ProductExtensions")
        .flags(TypeFlags::ABSTRACT)
        .extension_method("WithTax", vec![p("product", product)], well_known::DOUBLE, |ctx| {
            let product = ctx.arg_value(0)?.clone();
            let price = ctx.runtime().read_field_by_name(&product, "Price")?;
            ctx.set_return(price.as_f64().unwrap_or_default() * 1.2);
            Ok(())
        })
        .finish();

    module
}

// =============================================================================
// Type registry
// =============================================================================

#[test]
fn registry_lists_loaded_modules() {
    let shop = Shop::new();
    let modules = shop.bridge.modules();
    assert_eq!(modules.first().map(String::as_str), Some("System"));
    assert!(modules.iter().any(|name| name == "Shop"));
    assert!(shop.bridge.namespaces().iter().any(|ns| ns == "Shop.Internal"));
}

#[test]
fn refresh_without_new_modules_changes_nothing() {
    let shop = Shop::new();
    let before = shop.bridge.type_names();
    assert!(shop.bridge.refresh().is_empty());
    assert_eq!(shop.bridge.type_names(), before);
}

#[test]
fn missing_type_is_an_attribute_error() {
    let shop = Shop::new();
    let err = shop.bridge.lookup_type("Shop.Nope").unwrap_err();
    assert_eq!(err.to_string(), "Type not found: Shop.Nope");
    assert_eq!(err.host_kind(), HostErrorKind::AttributeError);
}

#[test]
fn namespaces_nest() {
    let shop = Shop::new();
    let ns = shop.bridge.namespace("Shop").unwrap();
    assert_eq!(ns.namespaces(), vec!["Internal".to_string()]);

    let NamespaceMember::Namespace(internal) = ns.member("Internal").unwrap() else {
        panic!("Internal should be a namespace");
    };
    match internal.member("Ledger").unwrap() {
        NamespaceMember::Type(ty) => assert_eq!(ty.name(), "Shop.Internal.Ledger"),
        other => panic!("expected a type, got {other:?}"),
    }
}

// =============================================================================
// Construction and members
// =============================================================================

#[test]
fn construct_and_read_members() {
    let shop = Shop::new();
    let tea = shop.product("Tea", 2.5);

    assert_eq!(shop.bridge.get_attr(&tea, "Name").unwrap(), HostValue::str("Tea"));
    assert_eq!(shop.bridge.get_attr(&tea, "Price").unwrap(), HostValue::Float(2.5));
    assert_eq!(
        shop.bridge.get_attr(&tea, "Label").unwrap(),
        HostValue::str("Tea @ 2.5")
    );
}

#[test]
fn write_fields_and_reject_read_only_properties() {
    let shop = Shop::new();
    let tea = shop.product("Tea", 2.5);

    shop.bridge
        .set_attr(&tea, "Price", &HostValue::Int(3))
        .unwrap();
    assert_eq!(shop.bridge.get_attr(&tea, "Price").unwrap(), HostValue::Float(3.0));

    let err = shop
        .bridge
        .set_attr(&tea, "Label", &HostValue::str("x"))
        .unwrap_err();
    assert!(matches!(err, BridgeError::InvalidCast { .. }));
    assert_eq!(err.host_kind(), HostErrorKind::TypeError);
}

#[test]
fn static_fields_through_the_type() {
    let shop = Shop::new();
    let pricing = shop.ty("Shop.Pricing");

    assert_eq!(shop.bridge.get_attr(&pricing, "TaxRate").unwrap(), HostValue::Float(0.2));
    shop.bridge
        .set_attr(&pricing, "TaxRate", &HostValue::Float(0.25))
        .unwrap();
    assert_eq!(shop.bridge.get_attr(&pricing, "TaxRate").unwrap(), HostValue::Float(0.25));
}

#[test]
fn abstract_type_without_constructors_cannot_be_built() {
    let shop = Shop::new();
    let err = shop.bridge.call(&shop.ty("Shop.Pricing"), &[]).unwrap_err();
    assert_eq!(err.to_string(), "No constructor available");
}

#[test]
fn unknown_attribute_consults_the_fallback_hook() {
    let shop = Shop::new();
    let tea = shop.product("Tea", 2.5);
    assert!(matches!(
        shop.bridge.get_attr(&tea, "Weight"),
        Err(BridgeError::NotFound(_))
    ));

    let hooked = shop.bridge.clone().with_attribute_fallback(HostCallable::new(
        "fallback",
        |args| {
            let getter = match &args[2] {
                HostValue::Callable(getter) => getter.clone(),
                other => panic!("expected the plain getter, got {other:?}"),
            };
            match args[1].as_str() {
                Some("Title") => getter.call(&[args[0].clone(), HostValue::str("Name")]),
                Some(name) => Ok(HostValue::str(format!("missing:{name}"))),
                None => Ok(HostValue::None),
            }
        },
    ));
    assert_eq!(
        hooked.get_attr(&tea, "Weight").unwrap(),
        HostValue::str("missing:Weight")
    );
    assert_eq!(hooked.get_attr(&tea, "Title").unwrap(), HostValue::str("Tea"));
}

#[test]
fn dir_lists_public_members() {
    let shop = Shop::new();
    let names = shop.bridge.dir(&shop.product("Tea", 2.5)).unwrap();
    for expected in ["Discount", "Label", "Name", "Price", "ToString"] {
        assert!(names.iter().any(|name| name == expected), "missing {expected}");
    }
    let mut sorted = names.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(names, sorted);
}

// =============================================================================
// Overloads
// =============================================================================

#[test]
fn best_fit_takes_the_first_numeric_overload() {
    let shop = Shop::new();
    let coat = shop.product("Coat", 200.0);

    let by_percent = shop
        .bridge
        .call_method(&coat, "Discount", &[HostValue::Int(10)])
        .unwrap();
    assert_eq!(by_percent, HostValue::Float(180.0));

    // Discount(int) is declared first, so a float reaches it and fails to convert.
    let err = shop
        .bridge
        .call_method(&coat, "Discount", &[HostValue::Float(2.5)])
        .unwrap_err();
    assert!(matches!(err, BridgeError::InvalidCast { .. }));
    assert_eq!(err.host_kind(), HostErrorKind::TypeError);
}

#[test]
fn out_of_range_numbers_fail_conversion_not_resolution() {
    let shop = Shop::new();
    let coat = shop.product("Coat", 200.0);
    let err = shop
        .bridge
        .call_method(&coat, "Discount", &[HostValue::Int(1 << 40)])
        .unwrap_err();
    assert!(matches!(err, BridgeError::InvalidCast { .. }));
}

#[test]
fn no_overload_accepts_a_string() {
    let shop = Shop::new();
    let coat = shop.product("Coat", 200.0);
    let err = shop
        .bridge
        .call_method(&coat, "Discount", &[HostValue::str("ten")])
        .unwrap_err();
    assert!(matches!(err, BridgeError::NoSuitableOverload { .. }));
    assert_eq!(err.host_kind(), HostErrorKind::TypeError);
}

#[test]
fn explicit_selection_overrides_best_fit() {
    let shop = Shop::new();
    let coat = shop.product("Coat", 200.0);
    let discount = shop.bridge.get_attr(&coat, "Discount").unwrap();

    let double = shop.ty("System.Double");
    let by_amount = shop.bridge.select_overload(&discount, &double).unwrap();
    assert_eq!(
        shop.bridge.call_instance(&by_amount, &[HostValue::Int(10)]).unwrap(),
        HostValue::Float(190.0)
    );

    let first = shop.bridge.select_overload(&discount, &HostValue::Int(0)).unwrap();
    assert_eq!(
        shop.bridge.call_instance(&first, &[HostValue::Int(10)]).unwrap(),
        HostValue::Float(180.0)
    );

    assert!(matches!(
        shop.bridge.select_overload(&discount, &HostValue::Int(7)),
        Err(BridgeError::IndexOutOfRange { index: 7, len: 2 })
    ));
    assert!(matches!(
        shop.bridge.select_overload(&discount, &shop.ty("System.String")),
        Err(BridgeError::NoSuchOverload { .. })
    ));
}

#[test]
fn signatures_are_listed_in_declaration_order() {
    let shop = Shop::new();
    let discount = shop
        .bridge
        .get_attr(&shop.product("Coat", 200.0), "Discount")
        .unwrap();
    assert_eq!(
        shop.bridge.signatures(&discount).unwrap(),
        vec![
            "Discount(System.Int32 percent) -> System.Double".to_string(),
            "Discount(System.Double amount) -> System.Double".to_string(),
        ]
    );
    assert_eq!(shop.bridge.repr(&discount).unwrap(), "<Method Product.Discount>");
}

// =============================================================================
// Invocation
// =============================================================================

#[test]
fn out_parameters_come_back_before_the_result() {
    let shop = Shop::new();
    let pricing = shop.ty("Shop.Pricing");

    let ok = shop
        .bridge
        .call_method(&pricing, "TryParsePrice", &[HostValue::str("3.5")])
        .unwrap();
    assert_eq!(
        ok,
        HostValue::List(vec![HostValue::Float(3.5), HostValue::Bool(true)])
    );

    let bad = shop
        .bridge
        .call_method(&pricing, "TryParsePrice", &[HostValue::str("abc")])
        .unwrap();
    assert_eq!(
        bad,
        HostValue::List(vec![HostValue::Float(0.0), HostValue::Bool(false)])
    );
}

#[test]
fn optional_parameters_take_their_defaults() {
    let shop = Shop::new();
    let pricing = shop.ty("Shop.Pricing");
    let clamp = |args: &[HostValue]| shop.bridge.call_method(&pricing, "Clamp", args);

    assert_eq!(clamp(&[HostValue::Int(150)]).unwrap(), HostValue::Int(100));
    assert_eq!(
        clamp(&[HostValue::Int(-5), HostValue::Int(1), HostValue::Int(10)]).unwrap(),
        HostValue::Int(1)
    );
    assert!(matches!(
        clamp(&[]),
        Err(BridgeError::InvalidArgumentCount {
            expected: 3,
            actual: 0
        })
    ));
}

#[test]
fn generic_methods_infer_their_type_arguments() {
    let shop = Shop::new();
    let pricing = shop.ty("Shop.Pricing");

    assert_eq!(
        shop.bridge
            .call_method(&pricing, "Identity", &[HostValue::str("x")])
            .unwrap(),
        HostValue::str("x")
    );
    assert_eq!(
        shop.bridge
            .call_method(&pricing, "Identity", &[HostValue::Int(5)])
            .unwrap(),
        HostValue::Int(5)
    );
}

#[test]
fn foreign_faults_keep_their_type_and_detail() {
    let shop = Shop::new();
    let coat = shop.product("Coat", 200.0);
    let first = shop
        .bridge
        .select_overload(&shop.bridge.get_attr(&coat, "Discount").unwrap(), &HostValue::Int(0))
        .unwrap();

    match shop.bridge.call_instance(&first, &[HostValue::Int(150)]) {
        Err(BridgeError::ForeignFault(fault)) => {
            assert_eq!(fault.type_name, "System.ArgumentOutOfRangeException");
            assert_eq!(fault.message, "percent must be between 0 and 100");
        }
        other => panic!("expected a foreign fault, got {other:?}"),
    }
}

#[test]
fn calling_a_plain_value_fails() {
    let shop = Shop::new();
    let err = shop.bridge.call(&HostValue::Int(3), &[]).unwrap_err();
    assert_eq!(err.to_string(), "'int' object is not callable");
}

// =============================================================================
// Collections
// =============================================================================

#[test]
fn host_lists_convert_to_foreign_lists() {
    let shop = Shop::new();
    let total = shop
        .bridge
        .call_method(
            &shop.ty("Shop.Pricing"),
            "Total",
            &[HostValue::List(vec![HostValue::Int(1), HostValue::Float(2.5)])],
        )
        .unwrap();
    assert_eq!(total, HostValue::Float(3.5));
}

#[test]
fn specialized_list_supports_the_collection_protocol() {
    let shop = Shop::new();
    let open = shop.type_handle("System.Collections.Generic.List");
    let HostValue::Type(doubles) = shop.bridge.specialize(&open, &shop.ty("System.Double")).unwrap()
    else {
        panic!("specializing a generic definition yields a type");
    };

    let list = shop.bridge.construct(&doubles, &[]).unwrap();
    shop.bridge.call_method(&list, "Add", &[HostValue::Int(1)]).unwrap();
    shop.bridge.call_method(&list, "Add", &[HostValue::Float(2.5)]).unwrap();

    assert_eq!(shop.bridge.len(&list).unwrap(), 2);
    assert_eq!(
        shop.bridge.get_item(&list, &HostValue::Int(1)).unwrap(),
        HostValue::Float(2.5)
    );
    shop.bridge
        .set_item(&list, &HostValue::Int(0), &HostValue::Float(4.0))
        .unwrap();
    assert_eq!(shop.bridge.repr(&list).unwrap(), "[4.0, 2.5]");

    let items: Vec<HostValue> = shop.bridge.iter(&list).unwrap().collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(items, vec![HostValue::Float(4.0), HostValue::Float(2.5)]);
}

#[test]
fn iteration_is_single_pass() {
    let shop = Shop::new();
    let open = shop.type_handle("System.Collections.Generic.List");
    let HostValue::Type(ints) = shop.bridge.specialize(&open, &shop.ty("System.Int32")).unwrap()
    else {
        panic!("specializing a generic definition yields a type");
    };
    let list = shop.bridge.construct(&ints, &[]).unwrap();
    shop.bridge.call_method(&list, "Add", &[HostValue::Int(7)]).unwrap();

    let mut iter = shop.bridge.iter(&list).unwrap();
    assert_eq!(iter.next_value().unwrap(), HostValue::Int(7));
    assert!(matches!(iter.next_value(), Err(BridgeError::StopIteration)));
    assert!(matches!(iter.next_value(), Err(BridgeError::StopIteration)));
}

#[test]
fn generic_definitions_must_be_specialized_before_construction() {
    let shop = Shop::new();
    let open = shop.type_handle("System.Collections.Generic.List");
    let err = shop.bridge.construct(&open, &[]).unwrap_err();
    assert_eq!(err.to_string(), "Unspecialized generic type");
}

// =============================================================================
// Callbacks
// =============================================================================

#[test]
fn host_callables_become_delegates() {
    let shop = Shop::new();
    let half = HostCallable::with_arity("half", 1, |args| match args {
        [HostValue::Float(price)] => Ok(HostValue::Float(price / 2.0)),
        other => Err(BridgeError::Host(format!("unexpected {other:?}"))),
    });

    let result = shop
        .bridge
        .call_method(
            &shop.ty("Shop.Pricing"),
            "Apply",
            &[HostValue::Callable(half), HostValue::Float(9.0)],
        )
        .unwrap();
    assert_eq!(result, HostValue::Float(4.5));
}

#[test]
fn wrapped_delegates_can_be_passed_around() {
    let shop = Shop::new();
    let func = shop.type_handle("System.Func`2");
    let double = shop.ty("System.Double");
    let HostValue::Type(rule_type) = shop
        .bridge
        .specialize(&func, &HostValue::List(vec![double.clone(), double]))
        .unwrap()
    else {
        panic!("specializing a generic definition yields a type");
    };

    let add_tax = HostCallable::with_arity("add_tax", 1, |args| match args {
        [HostValue::Float(price)] => Ok(HostValue::Float(price + 1.0)),
        _ => Ok(HostValue::Float(0.0)),
    });
    let delegate = shop
        .bridge
        .wrap_callback(&HostValue::Callable(add_tax), &rule_type)
        .unwrap();
    assert!(matches!(delegate, HostValue::Object(_)));

    let result = shop
        .bridge
        .call_method(
            &shop.ty("Shop.Pricing"),
            "Apply",
            &[delegate, HostValue::Float(2.0)],
        )
        .unwrap();
    assert_eq!(result, HostValue::Float(3.0));
}

#[test]
fn host_errors_inside_callbacks_reach_the_caller() {
    let shop = Shop::new();
    let broken = HostCallable::with_arity("broken", 1, |_| {
        Err(BridgeError::Host("rule exploded".into()))
    });
    let err = shop
        .bridge
        .call_method(
            &shop.ty("Shop.Pricing"),
            "Apply",
            &[HostValue::Callable(broken), HostValue::Float(1.0)],
        )
        .unwrap_err();

    let BridgeError::ForeignFault(fault) = err else {
        panic!("expected a foreign fault, got {err:?}");
    };
    assert_eq!(fault.type_name, "Host.Exception");
    assert_eq!(fault.message, "rule exploded");
}

#[test]
fn callbacks_run_with_the_host_lock_held() {
    let lock = Arc::new(SerialHostLock::held());
    let shop = Shop::new();
    let bridge = shop.bridge.clone().with_host_lock(lock.clone());

    let observed = lock.clone();
    let rule = HostCallable::with_arity("rule", 1, move |_| {
        Ok(HostValue::Float(if observed.is_held_by_current_thread() {
            1.0
        } else {
            0.0
        }))
    });
    let result = bridge
        .call_method(
            &shop.ty("Shop.Pricing"),
            "Apply",
            &[HostValue::Callable(rule), HostValue::Float(0.0)],
        )
        .unwrap();

    assert_eq!(result, HostValue::Float(1.0));
    assert!(lock.is_held_by_current_thread());
}

#[test]
fn callback_arity_is_checked_up_front() {
    let shop = Shop::new();
    let binary = HostCallable::with_arity("binary", 2, |_| Ok(HostValue::Float(0.0)));
    let err = shop
        .bridge
        .call_method(
            &shop.ty("Shop.Pricing"),
            "Apply",
            &[HostValue::Callable(binary), HostValue::Float(1.0)],
        )
        .unwrap_err();
    assert!(matches!(err, BridgeError::InvalidArgumentCount { .. }));
}

// =============================================================================
// Formatting and equality
// =============================================================================

#[test]
fn str_and_repr() {
    let shop = Shop::new();
    let tea = shop.product("Tea", 2.5);

    assert_eq!(shop.bridge.str(&tea).unwrap(), "Tea");
    assert_eq!(shop.bridge.repr(&tea).unwrap(), "<Product instance>");
    assert_eq!(shop.bridge.repr(&shop.ty("Shop.Product")).unwrap(), "<class Product>");
    assert_eq!(
        shop.bridge
            .repr(&HostValue::List(vec![
                HostValue::None,
                HostValue::Bool(true),
                HostValue::str("a"),
            ]))
            .unwrap(),
        "[None, True, 'a']"
    );
}

#[test]
fn pretty_lists_fields_and_properties() {
    let shop = Shop::new();
    let text = shop.bridge.pretty(&shop.product("Tea", 2.5)).unwrap();

    assert!(text.starts_with("Shop.Product:"));
    assert!(text.contains("\n\tName:\tTea"));
    assert!(text.contains("\n\tPrice:\t2.5"));
    assert!(text.contains("\n\tLabel:\tTea @ 2.5"));
}

#[test]
fn equality_is_identity_of_the_foreign_object() {
    let shop = Shop::new();
    let tea = shop.product("Tea", 2.5);
    let again = shop.product("Tea", 2.5);

    assert!(shop.bridge.equals(&tea, &tea.clone()));
    assert!(!shop.bridge.equals(&tea, &again));
    assert!(shop.bridge.equals(&HostValue::Int(1), &HostValue::Int(1)));
}

// =============================================================================
// Enums
// =============================================================================

#[test]
fn enum_values_combine_bitwise() {
    let shop = Shop::new();
    let fragile = shop.handling("Fragile");
    let heavy = shop.handling("Heavy");

    let both = shop.bridge.bit_or(&fragile, &heavy).unwrap();
    assert_eq!(shop.bridge.enum_to_int(&both).unwrap(), 3);
    assert_eq!(shop.bridge.repr(&both).unwrap(), "<enum Handling.3>");

    let masked = shop.bridge.bit_and(&both, &HostValue::Int(2)).unwrap();
    assert_eq!(shop.bridge.repr(&masked).unwrap(), "<enum Handling.Heavy>");

    let toggled = shop.bridge.bit_xor(&both, &fragile).unwrap();
    assert_eq!(shop.bridge.enum_to_int(&toggled).unwrap(), 2);

    let inverted = shop.bridge.bit_not(&fragile).unwrap();
    assert_eq!(shop.bridge.enum_to_int(&inverted).unwrap(), !1);
}

#[test]
fn enums_from_integers() {
    let shop = Shop::new();
    let handling = shop.type_handle("Shop.Handling");
    let perishable = shop.bridge.enum_from_int(&handling, &HostValue::Int(4)).unwrap();
    assert_eq!(shop.bridge.repr(&perishable).unwrap(), "<enum Handling.Perishable>");
    assert_eq!(
        shop.bridge.pretty(&perishable).unwrap(),
        "Perishable value of Handling"
    );

    let product = shop.type_handle("Shop.Product");
    let err = shop
        .bridge
        .enum_from_int(&product, &HostValue::Int(4))
        .unwrap_err();
    assert_eq!(err.to_string(), "Cannot convert Shop.Product to Enum");
}

// =============================================================================
// Disposal
// =============================================================================

#[test]
fn dispose_is_explicit() {
    let shop = Shop::new();
    let receipt = shop.bridge.call(&shop.ty("Shop.Receipt"), &[]).unwrap();

    drop(receipt.clone());
    assert_eq!(shop.closed_receipts(), 0);

    shop.bridge.dispose(&receipt).unwrap();
    assert_eq!(shop.closed_receipts(), 1);
    shop.bridge.dispose(&HostValue::None).unwrap();
    assert_eq!(shop.closed_receipts(), 1);
}

#[test]
fn dispose_scope_disposes_on_exit() {
    let shop = Shop::new();
    let receipt = shop.bridge.call(&shop.ty("Shop.Receipt"), &[]).unwrap();
    {
        let scope = shop.bridge.dispose_scope(&receipt).unwrap();
        assert!(scope.handle().is_some());
        assert_eq!(shop.closed_receipts(), 0);
    }
    assert_eq!(shop.closed_receipts(), 1);
}

// =============================================================================
// Namespace import
// =============================================================================

#[test]
fn import_brings_in_public_types() {
    let shop = Shop::new();
    let mut scope = ImportScope::new();
    shop.bridge.import("Shop", &mut scope, None).unwrap();

    assert_eq!(
        scope.names(),
        vec!["Handling", "Pricing", "Product", "Receipt"]
    );
    assert!(matches!(scope.get("Product"), Some(HostValue::Type(_))));
}

#[test]
fn importing_twice_is_already_defined() {
    let shop = Shop::new();
    let mut scope = ImportScope::new();
    shop.bridge.import("Shop", &mut scope, Some(&["Product"])).unwrap();

    let err = shop.bridge.import("Shop", &mut scope, None).unwrap_err();
    assert_eq!(err.to_string(), "Product already defined");
    assert_eq!(scope.len(), 1);
}

#[test]
fn import_allow_list_skips_hidden_and_unknown_names() {
    let shop = Shop::new();
    let mut scope = ImportScope::new();
    let count = shop
        .bridge
        .import("Shop", &mut scope, Some(&["Cache", "Product", "Nowhere"]))
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(scope.names(), vec!["Product"]);
}

// =============================================================================
// Extension methods
// =============================================================================

#[test]
fn imported_extension_methods_read_like_members() {
    let config = BridgeConfig::parse("[dispatch]\nextension_methods = true\n").unwrap();
    let shop = Shop::with_config(config);
    let tea = shop.product("Tea", 10.0);

    // Nothing is registered until the namespace is imported.
    assert!(matches!(
        shop.bridge.get_attr(&tea, "WithTax"),
        Err(BridgeError::NotFound(_))
    ));

    let mut scope = ImportScope::new();
    shop.bridge.import("Promotions", &mut scope, None).unwrap();
    let with_tax = shop.bridge.get_attr(&tea, "WithTax").unwrap();
    assert!(matches!(&with_tax, HostValue::Callable(c) if c.arity() == Some(0)));
    assert_eq!(shop.bridge.call(&with_tax, &[]).unwrap(), HostValue::Float(10.0 * 1.2));
    // Declared members are untouched.
    assert_eq!(shop.bridge.get_attr(&tea, "Label").unwrap(), HostValue::str("Tea @ 10"));
}

#[test]
fn extension_methods_stay_off_unless_enabled() {
    let shop = Shop::new();
    assert!(!shop.bridge.config().dispatch.extension_methods);
    assert_eq!(shop.bridge.register_extensions("Promotions").unwrap(), 1);
    let tea = shop.product("Tea", 10.0);
    assert!(matches!(
        shop.bridge.get_attr(&tea, "WithTax"),
        Err(BridgeError::NotFound(_))
    ));

    let extended = shop.bridge.clone().with_extension_methods();
    assert!(matches!(extended.get_attr(&tea, "WithTax"), Ok(HostValue::Callable(_))));
    assert!(matches!(
        shop.bridge.register_extensions("Nowhere"),
        Err(BridgeError::NotFound(_))
    ));
}

#[test]
fn host_fallback_sees_names_extensions_miss() {
    let shop = Shop::new();
    let bridge = shop
        .bridge
        .clone()
        .with_attribute_fallback(HostCallable::new("fallback", |args| {
            Ok(HostValue::str(format!("missing:{}", args[1].as_str().unwrap_or("?"))))
        }))
        .with_extension_methods();
    bridge.register_extensions("Promotions").unwrap();
    let tea = shop.product("Tea", 10.0);

    assert!(matches!(bridge.get_attr(&tea, "WithTax"), Ok(HostValue::Callable(_))));
    assert_eq!(bridge.get_attr(&tea, "Weight").unwrap(), HostValue::str("missing:Weight"));
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn configuration_reaches_dispatch() {
    let config = BridgeConfig::parse("[dispatch]\ntrace_invocations = true\n").unwrap();
    let shop = Shop::with_config(config);
    assert!(shop.bridge.context().options().trace_invocations);
    assert!(shop.bridge.config().dispatch.trace_invocations);

    let clamp = shop
        .bridge
        .call_method(&shop.ty("Shop.Pricing"), "Clamp", &[HostValue::Int(5)])
        .unwrap();
    assert_eq!(clamp, HostValue::Int(5));
}
