//! dynbridge - dynamic invocation and type bridging.
//!
//! A dynamically typed host calls into a reflective, statically typed
//! foreign runtime through this crate. Values cross the boundary through
//! conversion rules; members are resolved by name at call time; overloads
//! are chosen by best fit or by explicit signature; host callables can be
//! handed to the foreign side as delegates.
//!
//! # Crates
//!
//! - `dynbridge-core`: values, descriptors, handles, the runtime seam, errors
//! - `dynbridge-registry`: the type registry
//! - `dynbridge-dispatch`: conversion, member and overload resolution,
//!   invocation, callbacks
//! - `dynbridge-runtime`: an in-process reflective runtime
//!
//! # Example
//!
//! ```ignore
//! use dynbridge::prelude::*;
//!
//! dynbridge::logging::init();
//! let bridge = Bridge::in_memory();
//! let math = HostValue::Type(bridge.lookup_type("System.Math")?);
//! let max = bridge.call_method(&math, "Max", &[HostValue::Int(3), HostValue::Int(9)])?;
//! assert_eq!(max, HostValue::Int(9));
//! ```

mod bridge;
pub mod config;
pub mod logging;
mod namespace;

pub use bridge::Bridge;
pub use config::{BridgeConfig, ConfigError, LogFormat};
pub use namespace::{ImportScope, Namespace, NamespaceMember};

pub use dynbridge_core as core;
pub use dynbridge_dispatch as dispatch;
pub use dynbridge_registry as registry;
pub use dynbridge_runtime as runtime;

use once_cell::sync::OnceCell;

static DEFAULT_BRIDGE: OnceCell<Bridge> = OnceCell::new();

/// Process-scoped bridge over an in-memory runtime.
///
/// Created on first use with the environment's log configuration. Embedders
/// with their own runtime should construct a [`Bridge`] instead and pass it
/// around explicitly.
pub fn default_bridge() -> &'static Bridge {
    DEFAULT_BRIDGE.get_or_init(|| {
        let config = BridgeConfig::default().with_env_overrides();
        logging::init_with_config(&config.log);
        Bridge::with_config(
            std::sync::Arc::new(dynbridge_runtime::MemoryRuntime::new()),
            config,
        )
    })
}

pub mod prelude {
    pub use crate::{Bridge, BridgeConfig, ImportScope, Namespace, NamespaceMember};
    pub use dynbridge_core::{
        BridgeError, BridgeResult, ForeignFault, ForeignHandle, ForeignRuntime, ForeignValue,
        HostCallable, HostErrorKind, HostLock, HostValue, NoHostLock, SerialHostLock, TypeHandle,
        TypeHash, well_known,
    };
    pub use dynbridge_dispatch::{
        CallableInstance, DispatchOptions, DisposeScope, HostIterator, OverloadSelector,
    };
    pub use dynbridge_runtime::{MemoryRuntime, ModuleBuilder};
}
