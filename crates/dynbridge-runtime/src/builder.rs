//! Fluent description of modules and the types they define.
//!
//! ```ignore
//! let mut module = ModuleBuilder::new("Acme");
//! let widget = module
//!     .class("Acme.Widget")
//!     .field("count", well_known::INT32)
//!     .default_constructor()
//!     .method("Bump", vec![ParamDescriptor::new("by", well_known::INT32)], well_known::VOID, |ctx| {
//!         let count: i32 = ctx.field("count")?;
//!         ctx.set_field("count", count + ctx.arg::<i32>(0)?)
//!     })
//!     .finish();
//! runtime.load_module(module)?;
//! ```
//!
//! Constructed generic types and array types can be referenced before they
//! exist: [`ModuleBuilder::constructed`] and [`ModuleBuilder::array_of`]
//! return the deterministic hash and the runtime builds the type on first use.

use dynbridge_core::{
    CallableDescriptor, FieldInfo, ForeignFault, ForeignValue, MemberInfo, NestedTypeInfo, ParamDescriptor,
    PropertyInfo, QualifiedName, TypeFlags, TypeHash, TypeInfo, well_known,
};

use crate::native::{CallContext, NativeFn};

/// A type referenced by hash before it has been built.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PendingType {
    Generic {
        definition: TypeHash,
        args: Vec<TypeHash>,
    },
    Array(TypeHash),
}

/// Hash of the array type over `element`.
pub fn array_type_hash(element: TypeHash) -> TypeHash {
    TypeHash::from_generic_instance(well_known::ARRAY, &[element])
}

/// Collects the types, native bodies and forward references of one module.
#[derive(Debug)]
pub struct ModuleBuilder {
    pub(crate) name: String,
    pub(crate) types: Vec<TypeInfo>,
    /// Generic parameter stand-ins; resolvable but not listed as module types.
    pub(crate) hidden_types: Vec<TypeInfo>,
    pub(crate) natives: Vec<(TypeHash, NativeFn)>,
    pub(crate) pending: Vec<(TypeHash, PendingType)>,
    pub(crate) statics: Vec<(TypeHash, ForeignValue)>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
            hidden_types: Vec::new(),
            natives: Vec::new(),
            pending: Vec::new(),
            statics: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Start a reference type deriving from `System.Object`.
    pub fn class(&mut self, qname: &str) -> TypeBuilder<'_> {
        let mut info = TypeInfo::new(qname, TypeFlags::CLASS);
        info.base_type = Some(well_known::OBJECT);
        TypeBuilder { module: self, info }
    }

    /// Start a value type deriving from `System.ValueType`.
    pub fn value_type(&mut self, qname: &str) -> TypeBuilder<'_> {
        let mut info = TypeInfo::new(qname, TypeFlags::VALUE_TYPE);
        info.base_type = Some(well_known::VALUE_TYPE);
        TypeBuilder { module: self, info }
    }

    pub fn interface(&mut self, qname: &str) -> TypeBuilder<'_> {
        let info = TypeInfo::new(qname, TypeFlags::INTERFACE | TypeFlags::ABSTRACT);
        TypeBuilder { module: self, info }
    }

    /// Declare an enum type with its named values.
    pub fn enumeration(&mut self, qname: &str, values: &[(&str, i64)]) -> TypeHash {
        let mut info = TypeInfo::new(qname, TypeFlags::ENUM);
        info.base_type = Some(well_known::ENUM);
        info.enum_values = values.iter().map(|(n, v)| (n.to_string(), *v)).collect();
        let hash = info.type_hash;
        for (name, value) in values {
            let mut field = FieldInfo::new(hash, *name, hash);
            field.is_static = true;
            field.is_readonly = true;
            self.statics.push((field.id, ForeignValue::Enum { ty: hash, value: *value }));
            info.members.push(MemberInfo::Field(field));
        }
        self.types.push(info);
        hash
    }

    /// Declare a delegate type with the given `Invoke` signature.
    pub fn delegate(
        &mut self,
        qname: &str,
        params: Vec<ParamDescriptor>,
        return_type: TypeHash,
    ) -> TypeHash {
        let info = delegate_info(qname, Vec::new(), params, return_type);
        let hash = info.type_hash;
        self.types.push(info);
        hash
    }

    /// Declare a generic delegate definition over `generic_params`.
    pub fn generic_delegate(
        &mut self,
        qname: &str,
        generic_params: Vec<TypeHash>,
        params: Vec<ParamDescriptor>,
        return_type: TypeHash,
    ) -> TypeHash {
        let info = delegate_info(qname, generic_params, params, return_type);
        let hash = info.type_hash;
        self.types.push(info);
        hash
    }

    /// Declare a generic parameter stand-in named `owner.name`.
    pub fn generic_param(&mut self, owner: &str, name: &str) -> TypeHash {
        let qname = QualifiedName::from_qualified_string(owner).child(name);
        let info = TypeInfo::new(qname, TypeFlags::GENERIC_PARAMETER);
        let hash = info.type_hash;
        self.hidden_types.push(info);
        hash
    }

    /// Reference the specialization `definition<args>`.
    pub fn constructed(&mut self, definition: TypeHash, args: &[TypeHash]) -> TypeHash {
        let hash = TypeHash::from_generic_instance(definition, args);
        self.pending.push((
            hash,
            PendingType::Generic {
                definition,
                args: args.to_vec(),
            },
        ));
        hash
    }

    /// Reference the array type over `element`.
    pub fn array_of(&mut self, element: TypeHash) -> TypeHash {
        let hash = array_type_hash(element);
        self.pending.push((hash, PendingType::Array(element)));
        hash
    }

    /// Qualified names of the types declared so far.
    pub fn type_names(&self) -> Vec<String> {
        self.types.iter().map(TypeInfo::name).collect()
    }
}

fn delegate_info(
    qname: &str,
    generic_params: Vec<TypeHash>,
    params: Vec<ParamDescriptor>,
    return_type: TypeHash,
) -> TypeInfo {
    let mut flags = TypeFlags::CLASS | TypeFlags::DELEGATE;
    if !generic_params.is_empty() {
        flags |= TypeFlags::GENERIC_DEFINITION;
    }
    let mut info = TypeInfo::new(qname, flags);
    info.base_type = Some(well_known::DELEGATE);
    info.generic_params = generic_params;
    let invoke = CallableDescriptor::method(info.type_hash, "Invoke", params, return_type);
    info.members.push(MemberInfo::Method(invoke.clone()));
    info.delegate_invoke = Some(invoke);
    info
}

/// Builder for one type; [`TypeBuilder::finish`] adds it to the module.
pub struct TypeBuilder<'m> {
    module: &'m mut ModuleBuilder,
    info: TypeInfo,
}

impl<'m> TypeBuilder<'m> {
    pub fn type_hash(&self) -> TypeHash {
        self.info.type_hash
    }

    /// Drop the implicit base type.
    pub fn root(mut self) -> Self {
        self.info.base_type = None;
        self
    }

    pub fn base(mut self, base: TypeHash) -> Self {
        self.info.base_type = Some(base);
        self
    }

    pub fn implements(mut self, interface: TypeHash) -> Self {
        self.info.interfaces.push(interface);
        self
    }

    pub fn flags(mut self, flags: TypeFlags) -> Self {
        self.info.flags |= flags;
        self
    }

    /// Make this a generic definition over `params`.
    pub fn generic_params(mut self, params: Vec<TypeHash>) -> Self {
        self.info.generic_params = params;
        self.info.flags |= TypeFlags::GENERIC_DEFINITION;
        self
    }

    pub fn field(mut self, name: &str, ty: TypeHash) -> Self {
        let field = FieldInfo::new(self.info.type_hash, name, ty);
        self.info.members.push(MemberInfo::Field(field));
        self
    }

    pub fn readonly_field(mut self, name: &str, ty: TypeHash) -> Self {
        let mut field = FieldInfo::new(self.info.type_hash, name, ty);
        field.is_readonly = true;
        self.info.members.push(MemberInfo::Field(field));
        self
    }

    pub fn static_field(mut self, name: &str, ty: TypeHash, initial: ForeignValue) -> Self {
        let mut field = FieldInfo::new(self.info.type_hash, name, ty);
        field.is_static = true;
        self.module.statics.push((field.id, initial));
        self.info.members.push(MemberInfo::Field(field));
        self
    }

    /// Read-only property backed by a native getter.
    pub fn property_get<G>(self, name: &str, ty: TypeHash, getter: G) -> Self
    where
        G: Fn(&mut CallContext<'_>) -> Result<(), ForeignFault> + Send + Sync + 'static,
    {
        self.add_property(name, ty, false, NativeFn::new(getter), None)
    }

    /// Read-write property.
    pub fn property<G, S>(self, name: &str, ty: TypeHash, getter: G, setter: S) -> Self
    where
        G: Fn(&mut CallContext<'_>) -> Result<(), ForeignFault> + Send + Sync + 'static,
        S: Fn(&mut CallContext<'_>) -> Result<(), ForeignFault> + Send + Sync + 'static,
    {
        self.add_property(name, ty, false, NativeFn::new(getter), Some(NativeFn::new(setter)))
    }

    pub fn static_property_get<G>(self, name: &str, ty: TypeHash, getter: G) -> Self
    where
        G: Fn(&mut CallContext<'_>) -> Result<(), ForeignFault> + Send + Sync + 'static,
    {
        self.add_property(name, ty, true, NativeFn::new(getter), None)
    }

    /// Read-write property stored in a compiler-generated backing field.
    pub fn auto_property(self, name: &str, ty: TypeHash) -> Self {
        let backing = format!("<{name}>k__BackingField");
        let read = backing.clone();
        let write = backing.clone();
        let mut this = self.add_property(
            name,
            ty,
            false,
            NativeFn::new(move |ctx: &mut CallContext<'_>| {
                let value: ForeignValue = ctx.field(&read)?;
                ctx.set_return(value);
                Ok(())
            }),
            Some(NativeFn::new(move |ctx: &mut CallContext<'_>| {
                let value = ctx.arg_value(0)?.clone();
                ctx.set_field(&write, value)
            })),
        );
        let field = FieldInfo::new(this.info.type_hash, backing, ty);
        this.info.members.push(MemberInfo::Field(field));
        this
    }

    fn add_property(
        mut self,
        name: &str,
        ty: TypeHash,
        is_static: bool,
        getter: NativeFn,
        setter: Option<NativeFn>,
    ) -> Self {
        let owner = self.info.type_hash;
        let make = |accessor: &str, params: Vec<ParamDescriptor>, ret: TypeHash| {
            let mut callable = CallableDescriptor::method(owner, accessor, params, ret);
            callable.is_static = is_static;
            callable
        };
        let get = make(&format!("get_{name}"), Vec::new(), ty);
        self.module.natives.push((get.id, getter));
        let set = setter.map(|native| {
            let set = make(
                &format!("set_{name}"),
                vec![ParamDescriptor::new("value", ty)],
                well_known::VOID,
            );
            self.module.natives.push((set.id, native));
            set
        });
        self.info.members.push(MemberInfo::Property(PropertyInfo {
            name: name.to_string(),
            property_type: ty,
            is_static,
            getter: Some(get),
            setter: set,
        }));
        self
    }

    /// Indexer: an `Item` property plus `get_Item`/`set_Item` methods.
    pub fn indexer<G, S>(mut self, key: TypeHash, value: TypeHash, getter: G, setter: S) -> Self
    where
        G: Fn(&mut CallContext<'_>) -> Result<(), ForeignFault> + Send + Sync + 'static,
        S: Fn(&mut CallContext<'_>) -> Result<(), ForeignFault> + Send + Sync + 'static,
    {
        let owner = self.info.type_hash;
        let get = CallableDescriptor::method(
            owner,
            "get_Item",
            vec![ParamDescriptor::new("index", key)],
            value,
        );
        let set = CallableDescriptor::method(
            owner,
            "set_Item",
            vec![
                ParamDescriptor::new("index", key),
                ParamDescriptor::new("value", value),
            ],
            well_known::VOID,
        );
        self.module.natives.push((get.id, NativeFn::new(getter)));
        self.module.natives.push((set.id, NativeFn::new(setter)));
        self.info.members.push(MemberInfo::Property(PropertyInfo {
            name: "Item".to_string(),
            property_type: value,
            is_static: false,
            getter: Some(get.clone()),
            setter: Some(set.clone()),
        }));
        self.info.members.push(MemberInfo::Method(get));
        self.info.members.push(MemberInfo::Method(set));
        self
    }

    pub fn method<F>(
        self,
        name: &str,
        params: Vec<ParamDescriptor>,
        return_type: TypeHash,
        body: F,
    ) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), ForeignFault> + Send + Sync + 'static,
    {
        let callable = CallableDescriptor::method(self.info.type_hash, name, params, return_type);
        self.add_method(callable, NativeFn::new(body))
    }

    pub fn static_method<F>(
        self,
        name: &str,
        params: Vec<ParamDescriptor>,
        return_type: TypeHash,
        body: F,
    ) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), ForeignFault> + Send + Sync + 'static,
    {
        let callable =
            CallableDescriptor::static_method(self.info.type_hash, name, params, return_type);
        self.add_method(callable, NativeFn::new(body))
    }

    /// Static method usable as an instance method of its first parameter's
    /// type once registered with the dispatch layer.
    pub fn extension_method<F>(
        self,
        name: &str,
        params: Vec<ParamDescriptor>,
        return_type: TypeHash,
        body: F,
    ) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), ForeignFault> + Send + Sync + 'static,
    {
        let callable =
            CallableDescriptor::extension_method(self.info.type_hash, name, params, return_type);
        self.add_method(callable, NativeFn::new(body))
    }

    /// Static generic method definition over `generic_params`.
    pub fn generic_method<F>(
        self,
        name: &str,
        generic_params: Vec<TypeHash>,
        params: Vec<ParamDescriptor>,
        return_type: TypeHash,
        body: F,
    ) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), ForeignFault> + Send + Sync + 'static,
    {
        let callable =
            CallableDescriptor::static_method(self.info.type_hash, name, params, return_type)
                .with_generic_params(generic_params);
        self.add_method(callable, NativeFn::new(body))
    }

    fn add_method(mut self, callable: CallableDescriptor, body: NativeFn) -> Self {
        self.module.natives.push((callable.id, body));
        self.info.members.push(MemberInfo::Method(callable));
        self
    }

    pub fn constructor<F>(mut self, params: Vec<ParamDescriptor>, body: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<(), ForeignFault> + Send + Sync + 'static,
    {
        let ctor = CallableDescriptor::constructor(self.info.type_hash, params);
        self.module.natives.push((ctor.id, NativeFn::new(body)));
        self.info.constructors.push(ctor);
        self
    }

    /// Parameterless constructor allocating an instance with default fields.
    pub fn default_constructor(self) -> Self {
        self.constructor(Vec::new(), |ctx: &mut CallContext<'_>| {
            let instance = ctx.new_instance()?;
            ctx.set_return(instance);
            Ok(())
        })
    }

    /// Expose another type as a nested type member.
    pub fn nested(mut self, name: &str, ty: TypeHash) -> Self {
        self.info.members.push(MemberInfo::NestedType(NestedTypeInfo {
            name: name.to_string(),
            nested_type: ty,
        }));
        self
    }

    pub fn finish(self) -> TypeHash {
        let hash = self.info.type_hash;
        self.module.types.push(self.info);
        hash
    }
}
