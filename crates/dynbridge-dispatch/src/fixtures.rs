//! Sample foreign types shared by the dispatch tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use dynbridge_core::{
    ForeignFault, ForeignRuntime, ForeignValue, ObjectRef, ParamDescriptor, TypeHandle, TypeHash,
    well_known,
};
use dynbridge_runtime::{CallContext, MemoryRuntime, ModuleBuilder, ObjectData};

use crate::BridgeContext;

pub(crate) struct Fixture {
    pub runtime: Arc<MemoryRuntime>,
    pub ctx: BridgeContext,
    pub disposed: Arc<AtomicUsize>,
}

impl Fixture {
    pub fn new() -> Self {
        let runtime = Arc::new(MemoryRuntime::new());
        let disposed = Arc::new(AtomicUsize::new(0));
        runtime
            .load_module(acme_module(disposed.clone()))
            .expect("acme module loads");
        let ctx = BridgeContext::new(runtime.clone());
        ctx.refresh();
        Self {
            runtime,
            ctx,
            disposed,
        }
    }

    pub fn type_handle(&self, name: &str) -> TypeHandle {
        TypeHandle::new(self.ctx.lookup_type(name).expect("registered type"))
    }

    pub fn disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

fn p(name: &str, ty: TypeHash) -> ParamDescriptor {
    ParamDescriptor::new(name, ty)
}

fn label(
    text: &'static str,
) -> impl Fn(&mut CallContext<'_>) -> Result<(), ForeignFault> + Send + Sync + 'static {
    move |ctx| {
        ctx.set_return(text);
        Ok(())
    }
}

fn construct_widget(
    ctx: &mut CallContext<'_>,
    size: i32,
    name: &str,
) -> Result<(), ForeignFault> {
    let instance = ctx.new_instance()?;
    let runtime = ctx.runtime();
    runtime.write_field_by_name(&instance, "size", ForeignValue::Int32(size))?;
    runtime.write_field_by_name(&instance, "Id", ForeignValue::Int32(7))?;
    runtime.write_field_by_name(&instance, "label", ForeignValue::string(name))?;
    ctx.set_return(instance);
    Ok(())
}

pub(crate) fn acme_module(disposed: Arc<AtomicUsize>) -> ModuleBuilder {
    let mut module = ModuleBuilder::new("Acme");

    let shape = module
        .class("Acme.Shape")
        .default_constructor()
        .auto_property("Name", well_known::STRING)
        .method("Area", Vec::new(), well_known::DOUBLE, |ctx| {
            ctx.set_return(0.0f64);
            Ok(())
        })
        .method("Describe", Vec::new(), well_known::STRING, label("shape"))
        .static_field("Created", well_known::INT32, ForeignValue::Int32(0))
        .finish();

    let circle = TypeHash::from_name("Acme.Circle");
    module
        .class("Acme.Circle")
        .base(shape)
        .field("Radius", well_known::DOUBLE)
        .constructor(vec![p("radius", well_known::DOUBLE)], |ctx| {
            let radius: f64 = ctx.arg(0)?;
            let instance = ctx.new_instance()?;
            ctx.runtime()
                .write_field_by_name(&instance, "Radius", ForeignValue::Float64(radius))?;
            ctx.set_return(instance);
            Ok(())
        })
        .method("Area", Vec::new(), well_known::DOUBLE, |ctx| {
            let radius: f64 = ctx.field("Radius")?;
            ctx.set_return(3.0 * radius * radius);
            Ok(())
        })
        .method("ToString", Vec::new(), well_known::STRING, |ctx| {
            let radius: f64 = ctx.field("Radius")?;
            ctx.set_return(format!("Circle({radius})"));
            Ok(())
        })
        .static_method("Unit", Vec::new(), circle, |ctx| {
            let instance = ctx.runtime().new_instance(ctx.callable().return_type)?;
            ctx.runtime()
                .write_field_by_name(&instance, "Radius", ForeignValue::Float64(1.0))?;
            ctx.set_return(instance);
            Ok(())
        })
        .finish();

    let color = module.enumeration("Acme.Color", &[("Red", 1), ("Green", 2), ("Blue", 4)]);

    module
        .value_type("Acme.Point")
        .field("X", well_known::INT32)
        .field("Y", well_known::INT32)
        .finish();

    let combine = module.delegate(
        "Acme.Combine",
        vec![
            p("a", well_known::INT32),
            p("b", well_known::INT32),
            p("c", well_known::INT32),
        ],
        well_known::INT32,
    );

    let part = module.class("Acme.WidgetPart").default_constructor().finish();
    let func_int_int = module.constructed(
        TypeHash::from_name("System.Func`2"),
        &[well_known::INT32, well_known::INT32],
    );
    let ilist_int = module.constructed(well_known::ILIST, &[well_known::INT32]);
    let echo_t = module.generic_param("Acme.Widget.Echo", "T");

    module
        .class("Acme.Widget")
        .field("size", well_known::INT32)
        .field("label", well_known::STRING)
        .readonly_field("Id", well_known::INT32)
        .constructor(Vec::new(), |ctx| construct_widget(ctx, 1, "default"))
        .constructor(vec![p("size", well_known::INT32)], |ctx| {
            let size: i32 = ctx.arg(0)?;
            construct_widget(ctx, size, "sized")
        })
        .constructor(vec![p("name", well_known::STRING)], |ctx| {
            let name: String = ctx.arg(0)?;
            construct_widget(ctx, 1, &name)
        })
        .property(
            "Size",
            well_known::INT32,
            |ctx| {
                let size: i32 = ctx.field("size")?;
                ctx.set_return(size);
                Ok(())
            },
            |ctx| {
                let size: i32 = ctx.arg(0)?;
                ctx.set_field("size", size)
            },
        )
        .property_get("Label", well_known::STRING, |ctx| {
            let text: ForeignValue = ctx.field("label")?;
            ctx.set_return(text);
            Ok(())
        })
        .method("Move", vec![p("x", well_known::INT32)], well_known::STRING, label("int"))
        .method("Move", vec![p("x", well_known::DOUBLE)], well_known::STRING, label("double"))
        .method("Move", vec![p("x", well_known::STRING)], well_known::STRING, label("string"))
        .method(
            "Move",
            vec![p("x", well_known::INT32), p("y", well_known::INT32)],
            well_known::STRING,
            label("int,int"),
        )
        .method(
            "TryLookup",
            vec![
                p("key", well_known::INT32),
                ParamDescriptor::out("value", well_known::STRING),
            ],
            well_known::BOOLEAN,
            |ctx| {
                let key: i32 = ctx.arg(0)?;
                if key > 0 {
                    ctx.set_arg(1, format!("v{key}"))?;
                }
                ctx.set_return(key > 0);
                Ok(())
            },
        )
        .method(
            "Swap",
            vec![
                ParamDescriptor::in_out("a", well_known::INT32),
                ParamDescriptor::in_out("b", well_known::INT32),
            ],
            well_known::VOID,
            |ctx| {
                let (a, b): (i32, i32) = (ctx.arg(0)?, ctx.arg(1)?);
                ctx.set_arg(0, b)?;
                ctx.set_arg(1, a)
            },
        )
        .method(
            "Scale",
            vec![
                p("factor", well_known::INT32),
                ParamDescriptor::optional("offset", well_known::INT32, ForeignValue::Int32(0)),
            ],
            well_known::INT32,
            |ctx| {
                let size: i32 = ctx.field("size")?;
                let (factor, offset): (i32, i32) = (ctx.arg(0)?, ctx.arg(1)?);
                ctx.set_return(size * factor + offset);
                Ok(())
            },
        )
        .method(
            "Apply",
            vec![p("f", func_int_int), p("x", well_known::INT32)],
            well_known::INT32,
            |ctx| {
                let f = ctx.arg_value(0)?.clone();
                let x = ctx.arg_value(1)?.clone();
                let result = ctx.invoke_delegate(&f, &[x])?;
                ctx.set_return(result);
                Ok(())
            },
        )
        .method("Fold", vec![p("f", combine)], well_known::INT32, |ctx| {
            let f = ctx.arg_value(0)?.clone();
            let args = [1, 2, 3].map(ForeignValue::Int32);
            let result = ctx.invoke_delegate(&f, &args)?;
            ctx.set_return(result);
            Ok(())
        })
        .method("Sum", vec![p("items", ilist_int)], well_known::INT32, |ctx| {
            let list: ObjectRef = ctx.arg(0)?;
            let total = ctx.runtime().with_object(list, |data| match data {
                ObjectData::List(items) => Ok(items
                    .iter()
                    .filter_map(ForeignValue::as_integer)
                    .sum::<i128>()),
                _ => Err(ForeignFault::invalid_cast("not a list")),
            })?;
            ctx.set_return(total as i32);
            Ok(())
        })
        .method("Paint", vec![p("color", color)], well_known::STRING, |ctx| {
            let color = ctx.arg_value(0)?.clone();
            let text = ctx.runtime().display(&color)?;
            ctx.set_return(text);
            Ok(())
        })
        .method("Fail", Vec::new(), well_known::VOID, |_| {
            Err(ForeignFault::with_detail(
                "Acme.WidgetException",
                "boom",
                "Acme.WidgetException: boom\n   at Acme.Widget.Fail()",
            ))
        })
        .generic_method("Echo", vec![echo_t], vec![p("value", echo_t)], echo_t, |ctx| {
            let value = ctx.arg_value(0)?.clone();
            ctx.set_return(value);
            Ok(())
        })
        .nested("Part", part)
        .finish();

    module
        .class("Acme.Resource")
        .implements(TypeHash::from_name("System.IDisposable"))
        .default_constructor()
        .method("Dispose", Vec::new(), well_known::VOID, move |_| {
            disposed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .finish();

    module
        .class("Acme.Extensions.ShapeExtensions")
        .extension_method("Tag", vec![p("shape", shape)], well_known::STRING, label("tag"))
        .extension_method(
            "Tag",
            vec![p("shape", shape), p("times", well_known::INT32)],
            well_known::STRING,
            |ctx| {
                let times: i32 = ctx.arg(1)?;
                ctx.set_return(format!("tag x{times}"));
                Ok(())
            },
        )
        .extension_method(
            "Close",
            vec![p("resource", TypeHash::from_name("System.IDisposable"))],
            well_known::STRING,
            label("closed"),
        )
        .extension_method("Kind", vec![p("value", well_known::OBJECT)], well_known::STRING, label("object"))
        .finish();

    module
}
