//! Member resolution on handles.
//!
//! A name resolves against the public instance and static members of the
//! handle's type, flattened across the base chain. Overridden base methods
//! are hidden by the derived declaration with the same signature; any other
//! member hides same-named members further up.
//!
//! Methods and nested types are cached on the handle after the first lookup.
//! Properties and fields are resolved afresh every time.

use dynbridge_core::{
    BoundCallable, BridgeError, BridgeResult, CallableDescriptor, ForeignHandle, HostCallable,
    HostValue, MemberBinding, MemberInfo, OverloadSet, TypeHandle, TypeHash,
};
use rustc_hash::FxHashSet;

use crate::BridgeContext;

/// Resolves, reads and writes named members.
#[derive(Clone, Copy)]
pub struct MemberResolver<'a> {
    ctx: &'a BridgeContext,
}

impl<'a> MemberResolver<'a> {
    pub fn new(ctx: &'a BridgeContext) -> Self {
        Self { ctx }
    }

    /// Resolve `name` on `target` into a binding.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn resolve(&self, target: &ForeignHandle, name: &str) -> BridgeResult<MemberBinding> {
        if !target.has_type() {
            return Err(BridgeError::NullReference(format!(
                "cannot resolve '{name}' on None"
            )));
        }
        if let Some(binding) = target.cached_member(name) {
            return Ok(binding);
        }

        let members: Vec<MemberInfo> = self
            .flattened(target.type_hash())?
            .into_iter()
            .filter(|member| member.name() == name)
            .collect();
        if members.is_empty() {
            let info = self.ctx.type_info(target.type_hash())?;
            return Err(BridgeError::not_found(format!(
                "'{}' object has no attribute '{name}'",
                info.simple_name()
            )));
        }

        let binding = self.bind(target, name, members);
        tracing::trace!(member = name, kind = ?binding.kind(), "resolved member");
        if binding.is_constant() {
            target.cache_member(name, binding.clone());
        }
        Ok(binding)
    }

    fn bind(&self, target: &ForeignHandle, name: &str, members: Vec<MemberInfo>) -> MemberBinding {
        let receiver = target.receiver();
        let (methods, others): (Vec<_>, Vec<_>) = members
            .into_iter()
            .partition(|member| matches!(member, MemberInfo::Method(_)));
        let methods: Vec<CallableDescriptor> = methods
            .into_iter()
            .filter_map(|member| match member {
                MemberInfo::Method(method) => Some(method),
                _ => None,
            })
            .collect();

        let method_binding = match methods.len() {
            0 => None,
            1 => methods
                .into_iter()
                .next()
                .map(|method| MemberBinding::Method(BoundCallable::new(method, receiver.clone()))),
            _ => {
                let mut set = OverloadSet::new(name, target.type_hash(), receiver.clone());
                for method in methods {
                    set.push(method);
                }
                Some(MemberBinding::Overloads(set))
            }
        };

        let mut bindings: Vec<MemberBinding> = others
            .into_iter()
            .map(|member| match member {
                MemberInfo::Property(info) => MemberBinding::Property {
                    info,
                    receiver: receiver.clone(),
                },
                MemberInfo::Field(info) => MemberBinding::Field {
                    info,
                    receiver: receiver.clone(),
                },
                MemberInfo::NestedType(nested) => MemberBinding::NestedType(nested.nested_type),
                MemberInfo::Method(method) => {
                    MemberBinding::Method(BoundCallable::new(method, receiver.clone()))
                }
            })
            .collect();
        bindings.extend(method_binding);

        if bindings.len() == 1 {
            bindings.remove(0)
        } else {
            MemberBinding::Mixed(bindings)
        }
    }

    /// Public members of `ty` and its bases, most derived first, with
    /// overridden and shadowed members removed.
    pub fn flattened(&self, ty: TypeHash) -> BridgeResult<Vec<MemberInfo>> {
        let mut members: Vec<MemberInfo> = Vec::new();
        let mut shadowed: FxHashSet<String> = FxHashSet::default();
        for info in self.ancestry(ty)? {
            let mut declared_here: FxHashSet<String> = FxHashSet::default();
            for member in &info.members {
                let hidden = match member {
                    MemberInfo::Method(method) => members.iter().any(|existing| {
                        matches!(existing, MemberInfo::Method(m) if m.same_signature(method))
                    }),
                    _ => shadowed.contains(member.name()),
                };
                if !hidden {
                    declared_here.insert(member.name().to_string());
                    members.push(member.clone());
                }
            }
            shadowed.extend(
                declared_here
                    .into_iter()
                    .filter(|name| info.members_named(name).any(|m| !matches!(m, MemberInfo::Method(_)))),
            );
        }
        Ok(members)
    }

    /// `ty` followed by its base types; interfaces also contribute the
    /// interfaces they extend.
    fn ancestry(&self, ty: TypeHash) -> BridgeResult<Vec<dynbridge_core::TypeDescriptor>> {
        let mut chain = Vec::new();
        let mut seen: FxHashSet<TypeHash> = FxHashSet::default();
        let mut pending = vec![ty];
        while let Some(hash) = pending.pop() {
            if !seen.insert(hash) {
                continue;
            }
            let info = self.ctx.type_info(hash)?;
            if info.is_interface() {
                pending.extend(info.interfaces.iter().rev().copied());
            }
            if let Some(base) = info.base_type {
                pending.push(base);
            }
            chain.push(info);
        }
        Ok(chain)
    }

    /// Read a member, consulting the attribute fallback hook when it does
    /// not exist.
    pub fn get(&self, target: &ForeignHandle, name: &str) -> BridgeResult<HostValue> {
        match self.get_direct(target, name) {
            Err(BridgeError::NotFound(message)) => match self.ctx.attribute_fallback() {
                Some(hook) => {
                    tracing::trace!(member = name, hook = hook.name(), "attribute fallback");
                    hook.call(&[
                        HostValue::Object(target.clone()),
                        HostValue::str(name),
                        HostValue::Callable(self.plain_getter()),
                    ])
                }
                None => Err(BridgeError::NotFound(message)),
            },
            other => other,
        }
    }

    /// Read a member without the fallback hook.
    pub fn get_direct(&self, target: &ForeignHandle, name: &str) -> BridgeResult<HostValue> {
        let binding = self.resolve(target, name)?;
        self.read(&binding)
    }

    /// Host value of a resolved binding.
    pub fn read(&self, binding: &MemberBinding) -> BridgeResult<HostValue> {
        match binding {
            MemberBinding::Property { info, receiver } => {
                let getter = info.getter.as_ref().ok_or_else(|| {
                    BridgeError::invalid_operation(format!("property '{}' has no getter", info.name))
                })?;
                let bound = BoundCallable::new(getter.clone(), receiver.clone());
                self.ctx.invoker().invoke(&bound, &[])
            }
            MemberBinding::Field { info, receiver } => {
                if !info.is_static && receiver.is_none() {
                    return Err(BridgeError::NullReference(format!(
                        "instance field '{}' read without an instance",
                        info.name
                    )));
                }
                let value = self
                    .ctx
                    .foreign_call(|rt| rt.get_field(info, receiver.as_ref()))?;
                Ok(self.ctx.conversion().to_host(&value))
            }
            MemberBinding::Method(bound) => Ok(HostValue::Method(bound.clone())),
            MemberBinding::Overloads(set) => Ok(HostValue::Overloads(set.clone())),
            MemberBinding::NestedType(ty) => {
                Ok(HostValue::Type(TypeHandle::new(self.ctx.type_info(*ty)?)))
            }
            MemberBinding::Mixed(all) => match all.first() {
                Some(first) => self.read(first),
                None => Err(BridgeError::not_found("empty member set")),
            },
        }
    }

    /// Assign `value` to member `name` of `target`.
    ///
    /// Only properties with a setter and writable fields accept values;
    /// anything else is an invalid cast.
    pub fn set(&self, target: &ForeignHandle, name: &str, value: &HostValue) -> BridgeResult<()> {
        let binding = self.resolve(target, name)?;
        let writable = match binding {
            MemberBinding::Mixed(all) => all.into_iter().find(MemberBinding::is_writable),
            single if single.is_writable() => Some(single),
            _ => None,
        };
        match writable {
            Some(MemberBinding::Property { info, receiver }) => {
                let Some(setter) = info.setter else {
                    return Err(self.read_only(target, name, value));
                };
                let bound = BoundCallable::new(setter, receiver);
                self.ctx
                    .invoker()
                    .invoke(&bound, std::slice::from_ref(value))
                    .map(|_| ())
            }
            Some(MemberBinding::Field { info, receiver }) => {
                if !info.is_static && receiver.is_none() {
                    return Err(BridgeError::NullReference(format!(
                        "instance field '{name}' written without an instance"
                    )));
                }
                let converted = self.ctx.conversion().to_foreign(value, info.field_type)?;
                tracing::trace!(field = name, "set field");
                self.ctx
                    .foreign_call(|rt| rt.set_field(&info, receiver.as_ref(), converted))
            }
            _ => Err(self.read_only(target, name, value)),
        }
    }

    fn read_only(&self, target: &ForeignHandle, name: &str, value: &HostValue) -> BridgeError {
        BridgeError::invalid_cast(
            value.type_name(),
            format!(
                "read-only member {}.{name}",
                self.ctx.type_name(target.type_hash())
            ),
        )
    }

    /// Sorted, unique public member names of the handle's type.
    pub fn member_names(&self, target: &ForeignHandle) -> BridgeResult<Vec<String>> {
        if !target.has_type() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = self
            .flattened(target.type_hash())?
            .iter()
            .map(|member| member.name().to_string())
            .filter(|name| !name.starts_with('<'))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Getter handed to the fallback hook: `(handle, name)` without the hook.
    fn plain_getter(&self) -> HostCallable {
        let ctx = self.ctx.clone();
        HostCallable::with_arity("getattr", 2, move |args| match args {
            [HostValue::Object(handle), HostValue::Str(name)] => {
                ctx.members().get_direct(handle, name)
            }
            [other, _] => Err(BridgeError::invalid_cast(other.type_name(), "ForeignHandle")),
            _ => Err(BridgeError::InvalidArgumentCount {
                expected: 2,
                actual: args.len(),
            }),
        })
    }
}

/// Instance or static method `name` with `arity` parameters on `ty` or a base.
pub(crate) fn find_method(
    ctx: &BridgeContext,
    ty: TypeHash,
    name: &str,
    arity: usize,
) -> Option<CallableDescriptor> {
    let members = ctx.members().flattened(ty).ok()?;
    members.into_iter().find_map(|member| match member {
        MemberInfo::Method(method) if method.name == name && method.params.len() == arity => {
            Some(method)
        }
        _ => None,
    })
}
