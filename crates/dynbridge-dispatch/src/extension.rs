//! Extension methods.
//!
//! A static method marked as an extension can be called as an instance
//! method of its first parameter's type. Methods are registered per type or
//! per namespace and keyed by the type they extend: constructed generics by
//! their definition, generic parameters by `System.Object`.
//!
//! Lookup starts at the receiver's runtime type and walks its interfaces,
//! then its base type, returning the first type that declares an extension
//! of that name. Results are remembered until the next registration.
//!
//! Lookups are served through the attribute fallback hook, so extensions
//! never shadow a real member.

use std::sync::Arc;

use dynbridge_core::{
    BoundCallable, BridgeError, BridgeResult, CallableDescriptor, ForeignHandle, HostCallable,
    HostValue, MemberInfo, OverloadSet, TypeDescriptor, TypeHash, well_known,
};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::BridgeContext;

type MethodsByName = FxHashMap<String, Vec<CallableDescriptor>>;

/// Registered extension methods, shared by every clone of a bridge.
#[derive(Debug, Default)]
pub struct ExtensionMethods {
    by_type: RwLock<FxHashMap<TypeHash, MethodsByName>>,
    resolved: RwLock<FxHashMap<(TypeHash, String), Vec<CallableDescriptor>>>,
}

impl ExtensionMethods {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the extension methods `ty` declares; returns how many were new.
    pub fn register_type(&self, ctx: &BridgeContext, ty: &TypeDescriptor) -> usize {
        let mut added = 0;
        let mut by_type = self.by_type.write();
        for member in &ty.members {
            let MemberInfo::Method(method) = member else {
                continue;
            };
            let Some(extended) = method.extended_type() else {
                continue;
            };
            let methods = by_type
                .entry(extension_key(ctx, extended))
                .or_default()
                .entry(method.name.clone())
                .or_default();
            if methods.iter().any(|known| known.id == method.id) {
                continue;
            }
            methods.push(method.clone());
            added += 1;
        }
        if added > 0 {
            self.resolved.write().clear();
        }
        added
    }

    /// Register every extension method declared directly in `namespace`.
    pub fn register_namespace(&self, ctx: &BridgeContext, namespace: &str) -> usize {
        let types = ctx.registry().read().types_in_namespace(namespace);
        let mut seen = FxHashSet::default();
        let added = types
            .iter()
            .filter(|(_, ty)| seen.insert(ty.type_hash))
            .map(|(_, ty)| self.register_type(ctx, ty))
            .sum();
        tracing::debug!(namespace, added, "registered extension methods");
        added
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.read().is_empty()
    }

    /// Extensions named `name` applicable to values of type `ty`.
    pub fn find(
        &self,
        ctx: &BridgeContext,
        ty: TypeHash,
        name: &str,
    ) -> Option<Vec<CallableDescriptor>> {
        let key = (extension_key(ctx, ty), name.to_string());
        if let Some(found) = self.resolved.read().get(&key) {
            return Some(found.clone());
        }
        let found = self.search(ctx, key.0, name, &mut FxHashSet::default())?;
        self.resolved.write().insert(key, found.clone());
        Some(found)
    }

    fn search(
        &self,
        ctx: &BridgeContext,
        ty: TypeHash,
        name: &str,
        visited: &mut FxHashSet<TypeHash>,
    ) -> Option<Vec<CallableDescriptor>> {
        if !visited.insert(ty) {
            return None;
        }
        if let Some(methods) = self.by_type.read().get(&ty).and_then(|named| named.get(name)) {
            return Some(methods.clone());
        }
        let info = ctx.type_info(ty).ok()?;
        for interface in &info.interfaces {
            let found = self.search(ctx, extension_key(ctx, *interface), name, visited);
            if found.is_some() {
                return found;
            }
        }
        let base = info.base_type?;
        self.search(ctx, extension_key(ctx, base), name, visited)
    }

    /// Attribute fallback serving extension methods.
    ///
    /// Names with no extension go to `next` when given, otherwise to the
    /// plain lookup the hook receives, which reports the missing member.
    pub fn fallback(
        self: &Arc<Self>,
        ctx: &BridgeContext,
        next: Option<HostCallable>,
    ) -> HostCallable {
        let extensions = Arc::clone(self);
        let weak = ctx.downgrade();
        HostCallable::with_arity("extension_methods", 3, move |args| {
            let [HostValue::Object(target), HostValue::Str(name), base] = args else {
                return Err(BridgeError::invalid_operation(
                    "attribute fallback expects (handle, name, getattr)",
                ));
            };
            if let (Some(ctx), Some(ty)) = (weak.upgrade(), target.value().runtime_type()) {
                if let Some(methods) = extensions.find(&ctx, ty, name) {
                    tracing::trace!(member = %name, overloads = methods.len(), "extension method");
                    return Ok(HostValue::Callable(bind(&ctx, target, name, methods)));
                }
            }
            match (&next, base) {
                (Some(hook), _) => hook.call(args),
                (None, HostValue::Callable(getattr)) => getattr.call(&args[..2]),
                (None, _) => Err(BridgeError::not_found(format!("No such member: {name}"))),
            }
        })
    }
}

/// Registry key of an extended type.
fn extension_key(ctx: &BridgeContext, ty: TypeHash) -> TypeHash {
    match ctx.type_info(ty) {
        Ok(info) if info.is_generic_parameter() => well_known::OBJECT,
        Ok(info) => info.generic_definition.unwrap_or(ty),
        Err(_) => ty,
    }
}

/// `methods` as a callable with `target` bound as the first argument.
fn bind(
    ctx: &BridgeContext,
    target: &ForeignHandle,
    name: &str,
    methods: Vec<CallableDescriptor>,
) -> HostCallable {
    // One overload fixes the arity the host sees; several leave it open.
    let arity = match methods.as_slice() {
        [single] => single.input_count().checked_sub(1),
        _ => None,
    };
    let weak = ctx.downgrade();
    let receiver = HostValue::Object(target.clone());
    let call = move |args: &[HostValue]| -> BridgeResult<HostValue> {
        let ctx = weak.upgrade().ok_or_else(|| {
            BridgeError::invalid_operation("Extension method outlived its foreign runtime")
        })?;
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(receiver.clone());
        full.extend_from_slice(args);
        match methods.as_slice() {
            [single] => ctx
                .invoker()
                .invoke(&BoundCallable::new(single.clone(), None), &full),
            several => {
                let Some(first) = several.first() else {
                    return Err(BridgeError::not_found("No extension overloads"));
                };
                let mut set = OverloadSet::new(first.name.clone(), first.declaring_type, None);
                for method in several {
                    set.push(method.clone());
                }
                ctx.invoker().call_overloads(&set, &full)
            }
        }
    };
    match arity {
        Some(arity) => HostCallable::with_arity(name, arity, call),
        None => HostCallable::new(name, call),
    }
}
