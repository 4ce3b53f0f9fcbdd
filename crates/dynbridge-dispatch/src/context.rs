//! Shared state every dispatch component works against.

use std::fmt;
use std::sync::{Arc, Weak};

use dynbridge_core::{
    BridgeError, BridgeResult, ForeignFault, ForeignRuntime, HostCallable, HostLock, NoHostLock,
    ReleasedLock, TypeDescriptor, TypeHash,
};
use dynbridge_registry::{RefreshStats, TypeRegistry};
use parking_lot::RwLock;

use crate::{
    CallbackMarshaller, ConversionEngine, InvocationEngine, MemberResolver, ObjectOps,
};

/// Tuning knobs for dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Log every foreign call at debug level instead of trace.
    pub trace_invocations: bool,
}

/// The runtime, the type registry and the host lock, bundled.
///
/// Cheap to clone; clones share everything. Anything the runtime itself
/// keeps alive, such as a delegate proxy, holds a [`WeakBridgeContext`]
/// instead so the runtime can still be dropped.
#[derive(Clone)]
pub struct BridgeContext {
    runtime: Arc<dyn ForeignRuntime>,
    registry: Arc<RwLock<TypeRegistry>>,
    host_lock: Arc<dyn HostLock>,
    options: DispatchOptions,
    attribute_fallback: Option<HostCallable>,
}

impl BridgeContext {
    /// Context over `runtime` with an empty registry and no host lock.
    pub fn new(runtime: Arc<dyn ForeignRuntime>) -> Self {
        Self {
            runtime,
            registry: Arc::new(RwLock::new(TypeRegistry::new())),
            host_lock: Arc::new(NoHostLock),
            options: DispatchOptions::default(),
            attribute_fallback: None,
        }
    }

    pub fn with_host_lock(mut self, lock: Arc<dyn HostLock>) -> Self {
        self.host_lock = lock;
        self
    }

    pub fn with_registry(mut self, registry: Arc<RwLock<TypeRegistry>>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Install a hook consulted when attribute lookup finds nothing.
    ///
    /// The hook receives the handle, the attribute name and a callable
    /// performing the plain lookup.
    pub fn with_attribute_fallback(mut self, hook: HostCallable) -> Self {
        self.attribute_fallback = Some(hook);
        self
    }

    /// A copy that does not keep the runtime alive.
    pub fn downgrade(&self) -> WeakBridgeContext {
        WeakBridgeContext {
            runtime: Arc::downgrade(&self.runtime),
            registry: Arc::clone(&self.registry),
            host_lock: Arc::clone(&self.host_lock),
            options: self.options,
            attribute_fallback: self.attribute_fallback.clone(),
        }
    }

    pub fn runtime(&self) -> &dyn ForeignRuntime {
        self.runtime.as_ref()
    }

    pub fn runtime_arc(&self) -> &Arc<dyn ForeignRuntime> {
        &self.runtime
    }

    pub fn registry(&self) -> &Arc<RwLock<TypeRegistry>> {
        &self.registry
    }

    pub fn host_lock(&self) -> &dyn HostLock {
        self.host_lock.as_ref()
    }

    pub fn options(&self) -> DispatchOptions {
        self.options
    }

    pub fn attribute_fallback(&self) -> Option<&HostCallable> {
        self.attribute_fallback.as_ref()
    }

    /// Pick up modules loaded since the last refresh.
    ///
    /// Callers serialize refreshes with module loading, normally by calling
    /// this from host code holding the host lock.
    pub fn refresh(&self) -> RefreshStats {
        self.registry.write().refresh(self.runtime.as_ref())
    }

    /// Registered type by qualified name.
    pub fn lookup_type(&self, name: &str) -> BridgeResult<TypeDescriptor> {
        self.registry.read().lookup(name)
    }

    /// Metadata straight from the runtime; covers constructed generics and
    /// arrays the registry never sees.
    pub fn type_info(&self, ty: TypeHash) -> BridgeResult<TypeDescriptor> {
        self.runtime
            .type_info(ty)
            .ok_or_else(|| BridgeError::not_found(format!("Type not found: {ty}")))
    }

    pub fn type_name(&self, ty: TypeHash) -> String {
        self.runtime.type_name(ty)
    }

    pub fn is_assignable(&self, target: TypeHash, source: TypeHash) -> bool {
        target == source || self.runtime.is_assignable(target, source)
    }

    /// Run a foreign operation with the host lock released.
    ///
    /// The lock is reacquired before returning, whether the operation
    /// succeeded or faulted.
    pub fn foreign_call<R>(
        &self,
        f: impl FnOnce(&dyn ForeignRuntime) -> Result<R, ForeignFault>,
    ) -> BridgeResult<R> {
        let result = {
            let _released = ReleasedLock::release(self.host_lock.as_ref());
            f(self.runtime.as_ref())
        };
        result.map_err(|fault| {
            tracing::warn!(fault = %fault.type_name, message = %fault.message, "foreign fault");
            BridgeError::ForeignFault(fault)
        })
    }

    pub fn conversion(&self) -> ConversionEngine<'_> {
        ConversionEngine::new(self)
    }

    pub fn members(&self) -> MemberResolver<'_> {
        MemberResolver::new(self)
    }

    pub fn invoker(&self) -> InvocationEngine<'_> {
        InvocationEngine::new(self)
    }

    pub fn callbacks(&self) -> CallbackMarshaller<'_> {
        CallbackMarshaller::new(self)
    }

    pub fn objects(&self) -> ObjectOps<'_> {
        ObjectOps::new(self)
    }
}

impl fmt::Debug for BridgeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeContext")
            .field("types", &self.registry.read().len())
            .field("options", &self.options)
            .field("attribute_fallback", &self.attribute_fallback.is_some())
            .finish_non_exhaustive()
    }
}

/// [`BridgeContext`] holding its runtime weakly.
#[derive(Clone)]
pub struct WeakBridgeContext {
    runtime: Weak<dyn ForeignRuntime>,
    registry: Arc<RwLock<TypeRegistry>>,
    host_lock: Arc<dyn HostLock>,
    options: DispatchOptions,
    attribute_fallback: Option<HostCallable>,
}

impl WeakBridgeContext {
    /// The full context, or `None` once the runtime is gone.
    pub fn upgrade(&self) -> Option<BridgeContext> {
        Some(BridgeContext {
            runtime: self.runtime.upgrade()?,
            registry: Arc::clone(&self.registry),
            host_lock: Arc::clone(&self.host_lock),
            options: self.options,
            attribute_fallback: self.attribute_fallback.clone(),
        })
    }

    pub fn host_lock(&self) -> &dyn HostLock {
        self.host_lock.as_ref()
    }
}

impl fmt::Debug for WeakBridgeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakBridgeContext")
            .field("live", &(self.runtime.strong_count() > 0))
            .finish_non_exhaustive()
    }
}
