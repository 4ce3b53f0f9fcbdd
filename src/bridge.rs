//! The host-facing bridge.
//!
//! [`Bridge`] owns a [`BridgeContext`] plus its configuration and exposes the
//! operations a host binding layer needs: attribute access, calls, indexing,
//! iteration, formatting, enum arithmetic, disposal and registry queries.
//! Every operation takes and returns [`HostValue`]s.

use std::sync::Arc;

use dynbridge_core::{
    BridgeError, BridgeResult, ForeignHandle, ForeignRuntime, HostCallable, HostLock, HostValue,
    OverloadSet, TypeHandle,
};
use dynbridge_dispatch::{
    BitOp, BridgeContext, CallableInstance, DisposeScope, ExtensionMethods, HostIterator,
    OverloadResolver, OverloadSelector,
};
use dynbridge_registry::RefreshStats;
use dynbridge_runtime::MemoryRuntime;

use crate::config::BridgeConfig;
use crate::namespace::{ImportScope, Namespace};

/// Entry point for host code.
///
/// Cheap to clone; clones share the runtime and the type registry.
#[derive(Clone, Debug)]
pub struct Bridge {
    ctx: BridgeContext,
    config: BridgeConfig,
    extensions: Arc<ExtensionMethods>,
    /// Fallback installed by the host, consulted after extension methods.
    fallback: Option<HostCallable>,
}

impl Bridge {
    /// Bridge over `runtime` with the default configuration.
    pub fn new(runtime: Arc<dyn ForeignRuntime>) -> Self {
        Self::with_config(runtime, BridgeConfig::default())
    }

    pub fn with_config(runtime: Arc<dyn ForeignRuntime>, config: BridgeConfig) -> Self {
        let ctx = BridgeContext::new(runtime).with_options(config.dispatch_options());
        if config.registry.refresh_on_init {
            let stats = ctx.refresh();
            tracing::debug!(
                modules = stats.modules_added,
                types = stats.types_added,
                "bridge initialized"
            );
        }
        let bridge = Self {
            ctx,
            config,
            extensions: Arc::new(ExtensionMethods::new()),
            fallback: None,
        };
        bridge.install_fallback()
    }

    /// Bridge over a fresh [`MemoryRuntime`] holding only the `System` module.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRuntime::new()))
    }

    /// Serialize foreign calls and callbacks through `lock`.
    pub fn with_host_lock(mut self, lock: Arc<dyn HostLock>) -> Self {
        self.ctx = self.ctx.with_host_lock(lock);
        self.install_fallback()
    }

    /// Consult `hook` when attribute lookup finds nothing.
    ///
    /// With extension methods enabled the hook only sees names no extension
    /// method answers.
    pub fn with_attribute_fallback(mut self, hook: HostCallable) -> Self {
        self.fallback = Some(hook);
        self.install_fallback()
    }

    /// Resolve missing attributes against registered extension methods.
    ///
    /// Extension methods are registered per namespace, on [`import`](Self::import)
    /// or through [`register_extensions`](Self::register_extensions).
    pub fn with_extension_methods(mut self) -> Self {
        self.config.dispatch.extension_methods = true;
        self.install_fallback()
    }

    /// Rebuild the attribute fallback chain against the current context.
    fn install_fallback(mut self) -> Self {
        let hook = if self.config.dispatch.extension_methods {
            Some(self.extensions.fallback(&self.ctx, self.fallback.clone()))
        } else {
            self.fallback.clone()
        };
        if let Some(hook) = hook {
            self.ctx = self.ctx.with_attribute_fallback(hook);
        }
        self
    }

    pub fn context(&self) -> &BridgeContext {
        &self.ctx
    }

    pub fn runtime(&self) -> &dyn ForeignRuntime {
        self.ctx.runtime()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    // =========================================================================
    // Registry queries
    // =========================================================================

    /// Pick up modules loaded into the runtime since the last refresh.
    pub fn refresh(&self) -> RefreshStats {
        self.ctx.refresh()
    }

    /// Every registered qualified type name, sorted.
    pub fn type_names(&self) -> Vec<String> {
        self.ctx.registry().read().type_names()
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.ctx.registry().read().namespaces()
    }

    /// Names of the modules seen so far, in load order.
    pub fn modules(&self) -> Vec<String> {
        self.ctx.registry().read().modules().to_vec()
    }

    pub fn lookup_type(&self, name: &str) -> BridgeResult<TypeHandle> {
        self.ctx.lookup_type(name).map(TypeHandle::new)
    }

    /// View over the namespace at `path`.
    pub fn namespace(&self, path: &str) -> BridgeResult<Namespace<'_>> {
        if !self.ctx.registry().read().has_namespace(path) {
            return Err(BridgeError::not_found(format!("No such namespace: {path}")));
        }
        Ok(Namespace::new(self, path))
    }

    /// Import the types of `path` into `scope`. See [`Namespace::import_into`].
    ///
    /// Extension methods declared in `path` are registered as well.
    pub fn import(
        &self,
        path: &str,
        scope: &mut ImportScope,
        allow: Option<&[&str]>,
    ) -> BridgeResult<usize> {
        let imported = self.namespace(path)?.import_into(scope, allow)?;
        self.extensions.register_namespace(&self.ctx, path);
        Ok(imported)
    }

    /// Register the extension methods declared in `path` without importing.
    pub fn register_extensions(&self, path: &str) -> BridgeResult<usize> {
        self.namespace(path)?;
        Ok(self.extensions.register_namespace(&self.ctx, path))
    }

    pub fn extensions(&self) -> &ExtensionMethods {
        &self.extensions
    }

    // =========================================================================
    // Members and calls
    // =========================================================================

    /// Attribute `name` of an object or type.
    pub fn get_attr(&self, target: &HostValue, name: &str) -> BridgeResult<HostValue> {
        self.ctx.members().get(foreign_target(target)?, name)
    }

    pub fn set_attr(&self, target: &HostValue, name: &str, value: &HostValue) -> BridgeResult<()> {
        self.ctx.members().set(foreign_target(target)?, name, value)
    }

    /// Call any callable value: a bound method, an overload set, a type
    /// (construction) or a host callable.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn call(&self, target: &HostValue, args: &[HostValue]) -> BridgeResult<HostValue> {
        self.ctx.invoker().call(target, args)
    }

    /// `target.name(args...)`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn call_method(
        &self,
        target: &HostValue,
        name: &str,
        args: &[HostValue],
    ) -> BridgeResult<HostValue> {
        let member = self.get_attr(target, name)?;
        self.call(&member, args)
    }

    pub fn construct(&self, ty: &TypeHandle, args: &[HostValue]) -> BridgeResult<HostValue> {
        self.ctx.objects().construct(ty, args)
    }

    /// `Type[selector]`: specialize a generic definition, or pick a constructor.
    pub fn specialize(&self, ty: &TypeHandle, selector: &HostValue) -> BridgeResult<HostValue> {
        self.ctx.objects().specialize(ty, selector)
    }

    /// `method[selector]`: fix one overload of a method value.
    pub fn select_overload(
        &self,
        target: &HostValue,
        selector: &HostValue,
    ) -> BridgeResult<CallableInstance> {
        let selector = OverloadSelector::from_host(selector)?;
        let set = overload_set(target)?;
        OverloadResolver::new(&self.ctx, &set).choose(&selector)
    }

    /// Call an explicitly selected overload.
    pub fn call_instance(
        &self,
        instance: &CallableInstance,
        args: &[HostValue],
    ) -> BridgeResult<HostValue> {
        instance.call(&self.ctx, args)
    }

    /// Human-readable signatures of a method value, one per overload.
    pub fn signatures(&self, target: &HostValue) -> BridgeResult<Vec<String>> {
        let set = overload_set(target)?;
        Ok(OverloadResolver::new(&self.ctx, &set).signatures())
    }

    /// Wrap a host callable or foreign method as a delegate of `delegate_type`.
    pub fn wrap_callback(
        &self,
        value: &HostValue,
        delegate_type: &TypeHandle,
    ) -> BridgeResult<HostValue> {
        let delegate = self.ctx.callbacks().wrap(value, delegate_type.type_hash())?;
        Ok(self.ctx.conversion().to_host(&delegate))
    }

    // =========================================================================
    // Collections
    // =========================================================================

    pub fn get_item(&self, target: &HostValue, index: &HostValue) -> BridgeResult<HostValue> {
        self.ctx.objects().get_item(object_target(target)?, index)
    }

    pub fn set_item(
        &self,
        target: &HostValue,
        index: &HostValue,
        value: &HostValue,
    ) -> BridgeResult<()> {
        self.ctx.objects().set_item(object_target(target)?, index, value)
    }

    pub fn len(&self, target: &HostValue) -> BridgeResult<usize> {
        self.ctx.objects().len(object_target(target)?)
    }

    /// Single-pass iterator over an enumerable object.
    pub fn iter(&self, target: &HostValue) -> BridgeResult<HostIterator> {
        self.ctx.objects().iter(object_target(target)?)
    }

    // =========================================================================
    // Formatting and comparison
    // =========================================================================

    pub fn str(&self, target: &HostValue) -> BridgeResult<String> {
        match target {
            HostValue::Object(handle) => self.ctx.objects().str(handle),
            HostValue::Type(ty) => Ok(ty.name()),
            other => self.ctx.objects().repr(other),
        }
    }

    pub fn repr(&self, value: &HostValue) -> BridgeResult<String> {
        self.ctx.objects().repr(value)
    }

    /// Multi-line dump of an object's public properties and fields.
    pub fn pretty(&self, target: &HostValue) -> BridgeResult<String> {
        self.ctx.objects().pretty(object_target(target)?)
    }

    pub fn equals(&self, a: &HostValue, b: &HostValue) -> bool {
        self.ctx.objects().equals(a, b)
    }

    /// Sorted public member names.
    pub fn dir(&self, target: &HostValue) -> BridgeResult<Vec<String>> {
        self.ctx.objects().dir(foreign_target(target)?)
    }

    // =========================================================================
    // Enums
    // =========================================================================

    pub fn enum_to_int(&self, value: &HostValue) -> BridgeResult<i64> {
        self.ctx.objects().to_int(object_target(value)?)
    }

    pub fn enum_from_int(&self, ty: &TypeHandle, value: &HostValue) -> BridgeResult<HostValue> {
        self.ctx.objects().from_int(ty, value)
    }

    pub fn bit_or(&self, a: &HostValue, b: &HostValue) -> BridgeResult<HostValue> {
        self.ctx.objects().binary(object_target(a)?, b, BitOp::Or)
    }

    pub fn bit_and(&self, a: &HostValue, b: &HostValue) -> BridgeResult<HostValue> {
        self.ctx.objects().binary(object_target(a)?, b, BitOp::And)
    }

    pub fn bit_xor(&self, a: &HostValue, b: &HostValue) -> BridgeResult<HostValue> {
        self.ctx.objects().binary(object_target(a)?, b, BitOp::Xor)
    }

    pub fn bit_not(&self, a: &HostValue) -> BridgeResult<HostValue> {
        self.ctx.objects().enum_not(object_target(a)?)
    }

    // =========================================================================
    // Disposal
    // =========================================================================

    /// Release an object's foreign resources now.
    pub fn dispose(&self, target: &HostValue) -> BridgeResult<()> {
        match target {
            HostValue::None => Ok(()),
            other => self.ctx.objects().dispose(object_target(other)?),
        }
    }

    /// Guard disposing `target` when it goes out of scope.
    pub fn dispose_scope(&self, target: &HostValue) -> BridgeResult<DisposeScope<'_>> {
        let handle = object_target(target)?.clone();
        Ok(self.ctx.objects().scope(handle))
    }
}

/// Handle used for member access: objects and static access through types.
fn foreign_target(value: &HostValue) -> BridgeResult<&ForeignHandle> {
    match value {
        HostValue::Object(handle) => Ok(handle),
        HostValue::Type(ty) => Ok(ty.handle()),
        other => Err(BridgeError::invalid_cast(other.type_name(), "System.Object")),
    }
}

fn object_target(value: &HostValue) -> BridgeResult<&ForeignHandle> {
    match value {
        HostValue::Object(handle) => Ok(handle),
        other => Err(BridgeError::invalid_cast(other.type_name(), "System.Object")),
    }
}

fn overload_set(target: &HostValue) -> BridgeResult<OverloadSet> {
    match target {
        HostValue::Overloads(set) => Ok(set.clone()),
        HostValue::Method(bound) => {
            let callable = &bound.callable;
            let mut set =
                OverloadSet::new(&callable.name, callable.declaring_type, bound.receiver.clone());
            set.push(callable.clone());
            Ok(set)
        }
        other => Err(BridgeError::invalid_operation(format!(
            "'{}' object has no overloads",
            other.type_name()
        ))),
    }
}
