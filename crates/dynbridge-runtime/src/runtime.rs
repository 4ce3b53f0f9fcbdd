//! In-process implementation of [`ForeignRuntime`].
//!
//! `MemoryRuntime` holds type metadata, native method bodies and a
//! generational object heap. It behaves like a small reflective runtime:
//! generic types are specialized on demand, arrays and delegates are
//! intrinsic, and method bodies are Rust closures registered through
//! [`ModuleBuilder`].
//!
//! Locks are never held while a native body runs, so natives may call back
//! into the runtime (and through delegates, into the host).

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use dynbridge_core::{
    CallableDescriptor, CanonicalType, DelegateTarget, FieldInfo, ForeignEnumerator, ForeignFault,
    ForeignRuntime, ForeignValue, MemberInfo, ModuleId, ModuleInfo, ObjectRef, ParamDescriptor,
    PropertyInfo, QualifiedName, RegistrationError, TypeDescriptor, TypeFlags, TypeHash, TypeInfo,
    well_known,
};

use crate::builder::{ModuleBuilder, PendingType, array_type_hash};
use crate::heap::{ObjectData, ObjectHeap};
use crate::native::{CallContext, NativeFn};
use crate::system;

/// Metadata and code shared by every call.
#[derive(Default)]
struct RuntimeState {
    types: FxHashMap<TypeHash, TypeDescriptor>,
    /// Types referenced by hash but not yet built.
    pending: FxHashMap<TypeHash, PendingType>,
    modules: Vec<ModuleInfo>,
    natives: FxHashMap<TypeHash, NativeFn>,
    /// Static field values keyed by field id.
    statics: FxHashMap<TypeHash, ForeignValue>,
    next_module: u64,
}

/// A reflective runtime living in the current process.
pub struct MemoryRuntime {
    state: RwLock<RuntimeState>,
    heap: Mutex<ObjectHeap>,
}

impl MemoryRuntime {
    /// A runtime with the `System` module loaded.
    pub fn new() -> Self {
        let runtime = Self::empty();
        runtime.state.write().install(system::module());
        runtime
    }

    /// A runtime with no modules at all.
    pub fn empty() -> Self {
        Self {
            state: RwLock::new(RuntimeState::default()),
            heap: Mutex::new(ObjectHeap::new()),
        }
    }

    /// Load a module.
    ///
    /// A type whose name is already defined keeps its first definition; the
    /// module still lists it.
    pub fn load_module(&self, module: ModuleBuilder) -> Result<ModuleId, RegistrationError> {
        let mut state = self.state.write();
        if state.modules.iter().any(|m| m.name == module.name) {
            return Err(RegistrationError::DuplicateModule(module.name));
        }
        Ok(state.install(module))
    }

    /// Free an object's heap slot. Later uses of the reference fault.
    pub fn release(&self, value: &ForeignValue) -> bool {
        match value.as_object() {
            Some(obj) => self.heap.lock().free(obj),
            None => false,
        }
    }

    pub fn live_objects(&self) -> usize {
        self.heap.lock().live_count()
    }

    /// Whether the object has been disposed.
    pub fn is_disposed(&self, value: &ForeignValue) -> bool {
        value
            .as_object()
            .and_then(|obj| self.heap.lock().get(obj).map(|o| o.disposed))
            .unwrap_or(false)
    }

    /// Run `f` on an object's payload with the heap locked.
    ///
    /// `f` must not call back into the runtime.
    pub fn with_object<R>(
        &self,
        obj: ObjectRef,
        f: impl FnOnce(&mut ObjectData) -> Result<R, ForeignFault>,
    ) -> Result<R, ForeignFault> {
        let mut heap = self.heap.lock();
        let object = heap
            .get_mut(obj)
            .ok_or_else(|| ForeignFault::null_reference("released object"))?;
        f(&mut object.data)
    }

    pub fn allocate(&self, ty: TypeHash, data: ObjectData) -> ForeignValue {
        ForeignValue::Object(self.heap.lock().allocate(ty, data))
    }

    /// Allocate an instance of `ty` with every instance field at its default.
    pub fn new_instance(&self, ty: TypeHash) -> Result<ForeignValue, ForeignFault> {
        let mut fields = FxHashMap::default();
        let mut current = Some(ty);
        while let Some(hash) = current {
            let info = self.require_type(hash)?;
            for member in &info.members {
                if let MemberInfo::Field(field) = member
                    && !field.is_static
                {
                    fields
                        .entry(field.id)
                        .or_insert_with(|| default_value(&kind_of_type(self, field.field_type)));
                }
            }
            current = info.base_type;
        }
        Ok(self.allocate(ty, ObjectData::Fields(fields)))
    }

    /// Instance field of `target` named `name`, searched along the base chain.
    pub fn read_field_by_name(
        &self,
        target: &ForeignValue,
        name: &str,
    ) -> Result<ForeignValue, ForeignFault> {
        let field = self.instance_field(target, name)?;
        self.get_field(&field, Some(target))
    }

    pub fn write_field_by_name(
        &self,
        target: &ForeignValue,
        name: &str,
        value: ForeignValue,
    ) -> Result<(), ForeignFault> {
        let field = self.instance_field(target, name)?;
        let obj = object_ref(target, &field.name)?;
        self.with_object(obj, |data| store_field(data, &field, value))
    }

    fn instance_field(&self, target: &ForeignValue, name: &str) -> Result<FieldInfo, ForeignFault> {
        let obj = object_ref(target, name)?;
        let mut current = Some(obj.type_hash);
        while let Some(hash) = current {
            let info = self.require_type(hash)?;
            let found = info.members.iter().find_map(|member| match member {
                MemberInfo::Field(field) if !field.is_static && field.name == name => {
                    Some(field.clone())
                }
                _ => None,
            });
            if let Some(field) = found {
                return Ok(field);
            }
            current = info.base_type;
        }
        Err(ForeignFault::new(
            "System.MissingFieldException",
            format!("Field not found: '{}.{name}'", self.type_name(obj.type_hash)),
        ))
    }

    /// Invoke a delegate object with `args`.
    pub fn invoke_delegate(
        &self,
        delegate: &ForeignValue,
        args: &[ForeignValue],
    ) -> Result<ForeignValue, ForeignFault> {
        let obj = object_ref(delegate, "delegate")?;
        let target = self.with_object(obj, |data| match data {
            ObjectData::Delegate(target) => Ok(target.clone()),
            other => Err(ForeignFault::invalid_cast(format!(
                "cannot invoke a {} object",
                other.kind_name()
            ))),
        })?;
        match target {
            DelegateTarget::Native(entry) => entry.call(args),
            DelegateTarget::Method { callable, receiver } => {
                let mut args = args.to_vec();
                self.invoke(&callable, receiver.as_ref(), &mut args)
            }
        }
    }

    fn require_type(&self, ty: TypeHash) -> Result<TypeDescriptor, ForeignFault> {
        self.type_info(ty).ok_or_else(|| {
            ForeignFault::new(
                "System.TypeLoadException",
                format!("Could not load type {ty}"),
            )
        })
    }

    /// Instance method `name` taking `arity` parameters, searched along the base chain.
    fn find_method(&self, ty: TypeHash, name: &str, arity: usize) -> Option<CallableDescriptor> {
        let mut current = Some(ty);
        while let Some(hash) = current {
            let info = self.type_info(hash)?;
            let found = info.members.iter().find_map(|member| match member {
                MemberInfo::Method(m) if !m.is_static && m.name == name && m.params.len() == arity => {
                    Some(m.clone())
                }
                _ => None,
            });
            if found.is_some() {
                return found;
            }
            current = info.base_type;
        }
        None
    }

    fn check_receiver(
        &self,
        callable: &CallableDescriptor,
        receiver: Option<&ForeignValue>,
    ) -> Result<(), ForeignFault> {
        let Some(value) = receiver.filter(|v| !v.is_null()) else {
            return Err(ForeignFault::null_reference(&callable.name));
        };
        let Some(obj) = value.as_object() else {
            // Inline values (primitives, strings, enums) are always live.
            return Ok(());
        };
        let heap = self.heap.lock();
        match heap.get(obj) {
            None => Err(ForeignFault::null_reference("released object")),
            Some(object) if object.disposed && callable.name != "Dispose" => Err(
                ForeignFault::new(
                    "System.ObjectDisposedException",
                    format!(
                        "Cannot access a disposed object. Object name: '{}'.",
                        self.type_name(object.type_hash)
                    ),
                ),
            ),
            Some(_) => Ok(()),
        }
    }

    fn delegate_target(&self, value: &ForeignValue) -> Option<DelegateTarget> {
        let obj = value.as_object()?;
        let heap = self.heap.lock();
        match &heap.get(obj)?.data {
            ObjectData::Delegate(target) => Some(target.clone()),
            _ => None,
        }
    }

    fn ensure_array_type(&self, element: TypeHash) -> Result<TypeHash, ForeignFault> {
        let hash = array_type_hash(element);
        if self.state.read().types.contains_key(&hash) {
            return Ok(hash);
        }
        self.state.write().construct_array(element)
    }
}

impl Default for MemoryRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("MemoryRuntime")
            .field("modules", &state.modules.len())
            .field("types", &state.types.len())
            .field("live_objects", &self.heap.lock().live_count())
            .finish()
    }
}

// ============================================================================
// ForeignRuntime
// ============================================================================

impl ForeignRuntime for MemoryRuntime {
    fn modules(&self) -> Vec<ModuleInfo> {
        self.state.read().modules.clone()
    }

    fn type_info(&self, ty: TypeHash) -> Option<TypeDescriptor> {
        {
            let state = self.state.read();
            if let Some(info) = state.types.get(&ty) {
                return Some(info.clone());
            }
            if !state.pending.contains_key(&ty) {
                return None;
            }
        }
        self.state.write().resolve(ty)
    }

    fn is_assignable(&self, target: TypeHash, source: TypeHash) -> bool {
        if target == source || target == well_known::OBJECT {
            return true;
        }
        let Some(info) = self.type_info(source) else {
            return false;
        };
        info.base_type
            .into_iter()
            .chain(info.interfaces.iter().copied())
            .any(|parent| self.is_assignable(target, parent))
    }

    fn make_generic_type(
        &self,
        definition: TypeHash,
        args: &[TypeHash],
    ) -> Result<TypeHash, ForeignFault> {
        let hash = TypeHash::from_generic_instance(definition, args);
        if self.state.read().types.contains_key(&hash) {
            return Ok(hash);
        }
        self.state.write().construct_generic(definition, args)
    }

    fn make_generic_method(
        &self,
        method: &CallableDescriptor,
        args: &[TypeHash],
    ) -> Result<CallableDescriptor, ForeignFault> {
        if !method.is_generic_definition() {
            return Err(ForeignFault::new(
                "System.InvalidOperationException",
                format!("{} is not a GenericMethodDefinition.", method.name),
            ));
        }
        if method.generic_params.len() != args.len() {
            return Err(ForeignFault::argument(format!(
                "The number of generic arguments provided doesn't equal the arity of the generic method definition {} (expected {}, got {})",
                method.name,
                method.generic_params.len(),
                args.len()
            )));
        }
        let map: Vec<(TypeHash, TypeHash)> = method
            .generic_params
            .iter()
            .copied()
            .zip(args.iter().copied())
            .collect();
        let mut state = self.state.write();
        let mut instance = method.clone();
        for param in &mut instance.params {
            param.param_type = state.substitute(param.param_type, &map);
        }
        instance.return_type = state.substitute(method.return_type, &map);
        instance.id = TypeHash::from_generic_instance(method.id, args);
        instance.generic_args = args.to_vec();
        instance.definition = Some(method.definition.unwrap_or(method.id));
        Ok(instance)
    }

    fn invoke(
        &self,
        callable: &CallableDescriptor,
        receiver: Option<&ForeignValue>,
        args: &mut [ForeignValue],
    ) -> Result<ForeignValue, ForeignFault> {
        if args.len() != callable.params.len() {
            return Err(ForeignFault::new(
                "System.Reflection.TargetParameterCountException",
                format!(
                    "Parameter count mismatch calling {} (expected {}, got {})",
                    callable.name,
                    callable.params.len(),
                    args.len()
                ),
            ));
        }
        if !callable.is_static {
            self.check_receiver(callable, receiver)?;
            if callable.name == "Invoke"
                && let Some(delegate) = receiver
                && self.delegate_target(delegate).is_some()
            {
                return self.invoke_delegate(delegate, args);
            }
        }

        let native = {
            let state = self.state.read();
            state
                .natives
                .get(&callable.id)
                .or_else(|| callable.definition.and_then(|d| state.natives.get(&d)))
                .cloned()
        };
        let Some(native) = native else {
            return Err(ForeignFault::new(
                "System.MissingMethodException",
                format!(
                    "Method not found: '{}.{}'",
                    self.type_name(callable.declaring_type),
                    callable.name
                ),
            ));
        };

        tracing::trace!(method = %callable.name, args = args.len(), "native invoke");
        let mut ctx = CallContext::new(self, callable, receiver, args);
        native.call(&mut ctx)?;
        Ok(ctx.into_return())
    }

    fn get_field(
        &self,
        field: &FieldInfo,
        receiver: Option<&ForeignValue>,
    ) -> Result<ForeignValue, ForeignFault> {
        if field.is_static {
            if let Some(value) = self.state.read().statics.get(&field.id) {
                return Ok(value.clone());
            }
            return Ok(default_value(&kind_of_type(self, field.field_type)));
        }
        let target = receiver.ok_or_else(|| ForeignFault::null_reference(&field.name))?;
        let obj = object_ref(target, &field.name)?;
        let fallback = default_value(&kind_of_type(self, field.field_type));
        self.with_object(obj, |data| match data {
            ObjectData::Fields(values) => Ok(values.get(&field.id).cloned().unwrap_or(fallback)),
            other => Err(ForeignFault::invalid_cast(format!(
                "{} objects have no field {}",
                other.kind_name(),
                field.name
            ))),
        })
    }

    fn set_field(
        &self,
        field: &FieldInfo,
        receiver: Option<&ForeignValue>,
        value: ForeignValue,
    ) -> Result<(), ForeignFault> {
        if field.is_readonly {
            return Err(ForeignFault::new(
                "System.FieldAccessException",
                format!("Cannot set a constant field '{}'", field.name),
            ));
        }
        if field.is_static {
            self.state.write().statics.insert(field.id, value);
            return Ok(());
        }
        let target = receiver.ok_or_else(|| ForeignFault::null_reference(&field.name))?;
        let obj = object_ref(target, &field.name)?;
        self.with_object(obj, |data| store_field(data, field, value))
    }

    fn create_default(&self, ty: TypeHash) -> Result<ForeignValue, ForeignFault> {
        let kind = kind_of_type(self, ty);
        match kind {
            TypeKind::Primitive(_) | TypeKind::Enum(_) => Ok(default_value(&kind)),
            TypeKind::Struct => self.new_instance(ty),
            TypeKind::Reference => Err(ForeignFault::new(
                "System.MissingMethodException",
                format!("No parameterless constructor defined for type '{}'", self.type_name(ty)),
            )),
        }
    }

    fn create_array(
        &self,
        element: TypeHash,
        items: Vec<ForeignValue>,
    ) -> Result<ForeignValue, ForeignFault> {
        let ty = self.ensure_array_type(element)?;
        Ok(self.allocate(ty, ObjectData::Array(items)))
    }

    fn array_length(&self, array: &ForeignValue) -> Result<usize, ForeignFault> {
        let obj = object_ref(array, "array")?;
        self.with_object(obj, |data| match data {
            ObjectData::Array(items) => Ok(items.len()),
            other => Err(not_an_array(other)),
        })
    }

    fn array_get(&self, array: &ForeignValue, index: usize) -> Result<ForeignValue, ForeignFault> {
        let obj = object_ref(array, "array")?;
        self.with_object(obj, |data| match data {
            ObjectData::Array(items) => items
                .get(index)
                .cloned()
                .ok_or_else(|| ForeignFault::index_out_of_range(index as i64, items.len())),
            other => Err(not_an_array(other)),
        })
    }

    fn array_set(
        &self,
        array: &ForeignValue,
        index: usize,
        value: ForeignValue,
    ) -> Result<(), ForeignFault> {
        let obj = object_ref(array, "array")?;
        self.with_object(obj, |data| match data {
            ObjectData::Array(items) => {
                let len = items.len();
                let slot = items
                    .get_mut(index)
                    .ok_or_else(|| ForeignFault::index_out_of_range(index as i64, len))?;
                *slot = value;
                Ok(())
            }
            other => Err(not_an_array(other)),
        })
    }

    fn enumerate(&self, value: &ForeignValue) -> Result<Box<dyn ForeignEnumerator>, ForeignFault> {
        let obj = object_ref(value, "enumerable")?;
        let snapshot = self.with_object(obj, |data| match data {
            ObjectData::Array(items) | ObjectData::List(items) => Ok(Snapshot::Items(items.clone())),
            ObjectData::Dict(entries) => Ok(Snapshot::Entries(entries.clone())),
            other => Err(ForeignFault::not_supported(format!(
                "{} objects are not enumerable",
                other.kind_name()
            ))),
        })?;
        let items = match snapshot {
            Snapshot::Items(items) => items,
            Snapshot::Entries(entries) => {
                let info = self.require_type(obj.type_hash)?;
                let key = info.generic_args.first().copied().unwrap_or(well_known::OBJECT);
                let val = info.generic_args.get(1).copied().unwrap_or(well_known::OBJECT);
                let pair = self.make_generic_type(well_known::KEY_VALUE_PAIR, &[key, val])?;
                entries
                    .into_iter()
                    .map(|(k, v)| self.allocate(pair, ObjectData::Pair(k, v)))
                    .collect()
            }
        };
        Ok(Box::new(SnapshotEnumerator {
            items: items.into_iter(),
        }))
    }

    fn create_delegate(
        &self,
        delegate_type: TypeHash,
        target: DelegateTarget,
    ) -> Result<ForeignValue, ForeignFault> {
        let info = self.require_type(delegate_type)?;
        if !info.is_delegate() || info.is_generic_definition() {
            return Err(ForeignFault::argument(format!(
                "Type must derive from Delegate: {}",
                info.name()
            )));
        }
        Ok(self.allocate(delegate_type, ObjectData::Delegate(target)))
    }

    fn display(&self, value: &ForeignValue) -> Result<String, ForeignFault> {
        Ok(match value {
            ForeignValue::Null => String::new(),
            ForeignValue::Bool(true) => "True".to_string(),
            ForeignValue::Bool(false) => "False".to_string(),
            ForeignValue::Int8(v) => v.to_string(),
            ForeignValue::Int16(v) => v.to_string(),
            ForeignValue::Int32(v) => v.to_string(),
            ForeignValue::Int64(v) => v.to_string(),
            ForeignValue::UInt8(v) => v.to_string(),
            ForeignValue::UInt16(v) => v.to_string(),
            ForeignValue::UInt32(v) => v.to_string(),
            ForeignValue::UInt64(v) => v.to_string(),
            ForeignValue::Float32(v) => v.to_string(),
            ForeignValue::Float64(v) => v.to_string(),
            ForeignValue::String(s) => s.to_string(),
            ForeignValue::Enum { ty, value } => self
                .type_info(*ty)
                .and_then(|info| info.enum_name_of(*value).map(str::to_string))
                .unwrap_or_else(|| value.to_string()),
            ForeignValue::Object(obj) => match self.find_method(obj.type_hash, "ToString", 0) {
                Some(to_string) => {
                    let result = self.invoke(&to_string, Some(value), &mut [])?;
                    match result {
                        ForeignValue::String(s) => s.to_string(),
                        other => self.display(&other)?,
                    }
                }
                None => {
                    if self.heap.lock().get(*obj).is_none() {
                        return Err(ForeignFault::null_reference("released object"));
                    }
                    self.type_name(obj.type_hash)
                }
            },
        })
    }

    fn equals(&self, a: &ForeignValue, b: &ForeignValue) -> bool {
        match (a, b) {
            (ForeignValue::Object(x), ForeignValue::Object(y)) => x == y,
            (ForeignValue::Enum { .. }, _) | (_, ForeignValue::Enum { .. }) => a == b,
            _ => {
                if let (Some(x), Some(y)) = (integral(a), integral(b)) {
                    return x == y;
                }
                match (a, b) {
                    (
                        ForeignValue::Float32(_) | ForeignValue::Float64(_),
                        _,
                    )
                    | (
                        _,
                        ForeignValue::Float32(_) | ForeignValue::Float64(_),
                    ) => match (a.as_f64(), b.as_f64()) {
                        (Some(x), Some(y)) => x == y,
                        _ => false,
                    },
                    _ => a == b,
                }
            }
        }
    }

    fn enum_from_integer(&self, ty: TypeHash, value: i64) -> Result<ForeignValue, ForeignFault> {
        let info = self.require_type(ty)?;
        if !info.is_enum() {
            return Err(ForeignFault::argument(format!(
                "Type provided must be an Enum: {}",
                info.name()
            )));
        }
        Ok(ForeignValue::Enum { ty, value })
    }

    fn dispose(&self, value: &ForeignValue) -> Result<(), ForeignFault> {
        let Some(obj) = value.as_object() else {
            return Ok(());
        };
        if let Some(dispose) = self.find_method(obj.type_hash, "Dispose", 0) {
            self.invoke(&dispose, Some(value), &mut [])?;
        }
        if let Some(object) = self.heap.lock().get_mut(obj) {
            object.disposed = true;
        }
        Ok(())
    }
}

// ============================================================================
// Type construction
// ============================================================================

impl RuntimeState {
    fn install(&mut self, module: ModuleBuilder) -> ModuleId {
        let id = ModuleId(self.next_module);
        self.next_module += 1;

        for info in module.hidden_types {
            self.types
                .entry(info.type_hash)
                .or_insert_with(|| TypeDescriptor::new(info));
        }
        let mut listed = Vec::with_capacity(module.types.len());
        for info in module.types {
            let descriptor = TypeDescriptor::new(info);
            match self.types.get(&descriptor.type_hash) {
                Some(_) => tracing::debug!(
                    module = %module.name,
                    ty = %descriptor.name(),
                    "type already defined, keeping first definition"
                ),
                None => {
                    self.types.insert(descriptor.type_hash, descriptor.clone());
                }
            }
            listed.push(descriptor);
        }
        for (id, native) in module.natives {
            self.natives.entry(id).or_insert(native);
        }
        for (hash, pending) in module.pending {
            if !self.types.contains_key(&hash) {
                self.pending.entry(hash).or_insert(pending);
            }
        }
        for (id, value) in module.statics {
            self.statics.entry(id).or_insert(value);
        }

        tracing::debug!(module = %module.name, types = listed.len(), "module loaded");
        self.modules.push(ModuleInfo {
            id,
            name: module.name,
            types: listed,
        });
        id
    }

    /// Fetch a type, building it first if it is pending.
    fn resolve(&mut self, ty: TypeHash) -> Option<TypeDescriptor> {
        if let Some(info) = self.types.get(&ty) {
            return Some(info.clone());
        }
        let built = match self.pending.remove(&ty)? {
            PendingType::Generic { definition, args } => self.construct_generic(definition, &args),
            PendingType::Array(element) => self.construct_array(element),
        };
        match built {
            Ok(hash) => self.types.get(&hash).cloned(),
            Err(fault) => {
                tracing::warn!(ty = %ty, error = %fault, "failed to build referenced type");
                None
            }
        }
    }

    fn name_of(&mut self, ty: TypeHash) -> Result<TypeDescriptor, ForeignFault> {
        self.resolve(ty).ok_or_else(|| {
            ForeignFault::new(
                "System.TypeLoadException",
                format!("Could not load type {ty}"),
            )
        })
    }

    fn construct_generic(
        &mut self,
        definition: TypeHash,
        args: &[TypeHash],
    ) -> Result<TypeHash, ForeignFault> {
        let hash = TypeHash::from_generic_instance(definition, args);
        if self.types.contains_key(&hash) {
            return Ok(hash);
        }
        let def = self.name_of(definition)?;
        if !def.is_generic_definition() {
            return Err(ForeignFault::new(
                "System.InvalidOperationException",
                format!("{} is not a GenericTypeDefinition.", def.name()),
            ));
        }
        if def.generic_params.len() != args.len() {
            return Err(ForeignFault::argument(format!(
                "The number of generic arguments provided doesn't equal the arity of the generic type definition {} (expected {}, got {})",
                def.name(),
                def.generic_params.len(),
                args.len()
            )));
        }

        let mut arg_names = Vec::with_capacity(args.len());
        for arg in args {
            arg_names.push(self.name_of(*arg)?.name());
        }
        let name = format!("{}[{}]", def.simple_name(), arg_names.join(","));
        let mut info = TypeInfo::new(
            QualifiedName::new(name, def.qname.namespace_path().to_vec()),
            def.flags - TypeFlags::GENERIC_DEFINITION,
        );
        info.type_hash = hash;
        info.generic_args = args.to_vec();
        info.generic_definition = Some(definition);
        info.enum_values = def.enum_values.clone();

        let map: Vec<(TypeHash, TypeHash)> = def
            .generic_params
            .iter()
            .copied()
            .zip(args.iter().copied())
            .collect();
        info.base_type = def.base_type.map(|base| self.substitute(base, &map));
        info.interfaces = def
            .interfaces
            .iter()
            .map(|iface| self.substitute(*iface, &map))
            .collect();
        info.constructors = def
            .constructors
            .iter()
            .map(|ctor| self.substitute_callable(ctor, hash, &map))
            .collect();
        info.members = def
            .members
            .iter()
            .map(|member| self.substitute_member(member, hash, &map))
            .collect();
        info.delegate_invoke = def
            .delegate_invoke
            .as_ref()
            .map(|invoke| self.substitute_callable(invoke, hash, &map));

        tracing::trace!(ty = %info.qname, "constructed generic type");
        self.types.insert(hash, TypeDescriptor::new(info));
        Ok(hash)
    }

    fn construct_array(&mut self, element: TypeHash) -> Result<TypeHash, ForeignFault> {
        let hash = array_type_hash(element);
        if self.types.contains_key(&hash) {
            return Ok(hash);
        }
        let elem = self.name_of(element)?;
        let mut info = TypeInfo::new(
            QualifiedName::new(
                format!("{}[]", elem.simple_name()),
                elem.qname.namespace_path().to_vec(),
            ),
            TypeFlags::ARRAY | TypeFlags::CLASS,
        );
        info.type_hash = hash;
        info.base_type = Some(well_known::ARRAY);
        info.element_type = Some(element);
        info.interfaces = vec![
            self.reference_generic(well_known::ILIST, &[element]),
            self.reference_generic(well_known::IENUMERABLE, &[element]),
            well_known::NONGENERIC_ILIST,
        ];

        let getter = CallableDescriptor::method(hash, "get_Length", Vec::new(), well_known::INT32);
        self.natives.insert(
            getter.id,
            NativeFn::new(|ctx: &mut CallContext<'_>| {
                let len = ctx.with_this(|data| match data {
                    ObjectData::Array(items) => Ok(items.len()),
                    other => Err(not_an_array(other)),
                })?;
                ctx.set_return(len as i32);
                Ok(())
            }),
        );
        info.members.push(MemberInfo::Property(PropertyInfo {
            name: "Length".to_string(),
            property_type: well_known::INT32,
            is_static: false,
            getter: Some(getter),
            setter: None,
        }));

        self.types.insert(hash, TypeDescriptor::new(info));
        Ok(hash)
    }

    /// Hash of `definition<args>`, recorded as pending when not yet built.
    fn reference_generic(&mut self, definition: TypeHash, args: &[TypeHash]) -> TypeHash {
        let hash = TypeHash::from_generic_instance(definition, args);
        if !self.types.contains_key(&hash) {
            self.pending.entry(hash).or_insert_with(|| PendingType::Generic {
                definition,
                args: args.to_vec(),
            });
        }
        hash
    }

    /// Replace generic parameters in `ty`. Never builds types eagerly.
    fn substitute(&mut self, ty: TypeHash, map: &[(TypeHash, TypeHash)]) -> TypeHash {
        if let Some((_, arg)) = map.iter().find(|(param, _)| *param == ty) {
            return *arg;
        }
        let shape = match self.pending.get(&ty) {
            Some(pending) => pending.clone(),
            None => match self.types.get(&ty) {
                Some(info) if info.is_array() => match info.element_type {
                    Some(element) => PendingType::Array(element),
                    None => return ty,
                },
                Some(info) => match info.generic_definition {
                    Some(definition) => PendingType::Generic {
                        definition,
                        args: info.generic_args.clone(),
                    },
                    None => return ty,
                },
                None => return ty,
            },
        };
        match shape {
            PendingType::Generic { definition, args } => {
                let substituted: Vec<TypeHash> =
                    args.iter().map(|arg| self.substitute(*arg, map)).collect();
                if substituted == args {
                    return ty;
                }
                self.reference_generic(definition, &substituted)
            }
            PendingType::Array(element) => {
                let substituted = self.substitute(element, map);
                if substituted == element {
                    return ty;
                }
                let hash = array_type_hash(substituted);
                if !self.types.contains_key(&hash) {
                    self.pending
                        .entry(hash)
                        .or_insert(PendingType::Array(substituted));
                }
                hash
            }
        }
    }

    fn substitute_callable(
        &mut self,
        callable: &CallableDescriptor,
        owner: TypeHash,
        map: &[(TypeHash, TypeHash)],
    ) -> CallableDescriptor {
        let params: Vec<ParamDescriptor> = callable
            .params
            .iter()
            .map(|param| ParamDescriptor {
                param_type: self.substitute(param.param_type, map),
                ..param.clone()
            })
            .collect();
        let mut result = if callable.is_constructor() {
            CallableDescriptor::constructor(owner, params)
        } else {
            let return_type = self.substitute(callable.return_type, map);
            let mut method = CallableDescriptor::method(owner, &callable.name, params, return_type);
            method.is_static = callable.is_static;
            method.kind = callable.kind;
            method
        };
        result.generic_params = callable.generic_params.clone();
        result.definition = Some(callable.definition.unwrap_or(callable.id));
        result
    }

    fn substitute_member(
        &mut self,
        member: &MemberInfo,
        owner: TypeHash,
        map: &[(TypeHash, TypeHash)],
    ) -> MemberInfo {
        match member {
            MemberInfo::Property(prop) => MemberInfo::Property(PropertyInfo {
                name: prop.name.clone(),
                property_type: self.substitute(prop.property_type, map),
                is_static: prop.is_static,
                getter: prop
                    .getter
                    .as_ref()
                    .map(|g| self.substitute_callable(g, owner, map)),
                setter: prop
                    .setter
                    .as_ref()
                    .map(|s| self.substitute_callable(s, owner, map)),
            }),
            MemberInfo::Field(field) => {
                let mut substituted =
                    FieldInfo::new(owner, &field.name, self.substitute(field.field_type, map));
                substituted.is_static = field.is_static;
                substituted.is_readonly = field.is_readonly;
                if let Some(value) = self.statics.get(&field.id).cloned() {
                    self.statics.entry(substituted.id).or_insert(value);
                }
                MemberInfo::Field(substituted)
            }
            MemberInfo::Method(method) => {
                MemberInfo::Method(self.substitute_callable(method, owner, map))
            }
            MemberInfo::NestedType(nested) => MemberInfo::NestedType(nested.clone()),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// How a type's default value is formed.
enum TypeKind {
    Primitive(CanonicalType),
    Enum(TypeHash),
    Struct,
    Reference,
}

fn kind_of_type(runtime: &MemoryRuntime, ty: TypeHash) -> TypeKind {
    let canonical = CanonicalType::of(ty);
    if canonical.is_primitive() {
        return TypeKind::Primitive(canonical);
    }
    match runtime.type_info(ty) {
        Some(info) if info.is_enum() => TypeKind::Enum(ty),
        Some(info) if info.is_value_type() && !info.is_primitive() => TypeKind::Struct,
        _ => TypeKind::Reference,
    }
}

/// Zero value stored in fresh fields. Struct fields start out null.
fn default_value(kind: &TypeKind) -> ForeignValue {
    match kind {
        TypeKind::Primitive(canonical) => match canonical {
            CanonicalType::Bool => ForeignValue::Bool(false),
            CanonicalType::Int8 => ForeignValue::Int8(0),
            CanonicalType::Int16 => ForeignValue::Int16(0),
            CanonicalType::Int32 => ForeignValue::Int32(0),
            CanonicalType::Int64 => ForeignValue::Int64(0),
            CanonicalType::UInt8 => ForeignValue::UInt8(0),
            CanonicalType::UInt16 => ForeignValue::UInt16(0),
            CanonicalType::UInt32 => ForeignValue::UInt32(0),
            CanonicalType::UInt64 => ForeignValue::UInt64(0),
            CanonicalType::Float32 => ForeignValue::Float32(0.0),
            CanonicalType::Float64 => ForeignValue::Float64(0.0),
            CanonicalType::String | CanonicalType::Object => ForeignValue::Null,
        },
        TypeKind::Enum(ty) => ForeignValue::Enum { ty: *ty, value: 0 },
        TypeKind::Struct | TypeKind::Reference => ForeignValue::Null,
    }
}

fn object_ref(value: &ForeignValue, what: &str) -> Result<ObjectRef, ForeignFault> {
    match value {
        ForeignValue::Object(obj) => Ok(*obj),
        ForeignValue::Null => Err(ForeignFault::null_reference(what)),
        _ => Err(ForeignFault::invalid_cast(format!(
            "{what} requires an object receiver"
        ))),
    }
}

fn store_field(
    data: &mut ObjectData,
    field: &FieldInfo,
    value: ForeignValue,
) -> Result<(), ForeignFault> {
    match data {
        ObjectData::Fields(values) => {
            values.insert(field.id, value);
            Ok(())
        }
        other => Err(ForeignFault::invalid_cast(format!(
            "{} objects have no field {}",
            other.kind_name(),
            field.name
        ))),
    }
}

fn not_an_array(data: &ObjectData) -> ForeignFault {
    ForeignFault::invalid_cast(format!("expected an array, found a {} object", data.kind_name()))
}

fn integral(value: &ForeignValue) -> Option<i128> {
    match value {
        ForeignValue::Enum { .. } | ForeignValue::Bool(_) => None,
        other => other.as_integer(),
    }
}

enum Snapshot {
    Items(Vec<ForeignValue>),
    Entries(Vec<(ForeignValue, ForeignValue)>),
}

struct SnapshotEnumerator {
    items: std::vec::IntoIter<ForeignValue>,
}

impl ForeignEnumerator for SnapshotEnumerator {
    fn next_value(&mut self) -> Result<Option<ForeignValue>, ForeignFault> {
        Ok(self.items.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn list_of_int(runtime: &MemoryRuntime) -> TypeDescriptor {
        let hash = runtime
            .make_generic_type(well_known::LIST, &[well_known::INT32])
            .unwrap();
        runtime.type_info(hash).unwrap()
    }

    fn method(info: &TypeDescriptor, name: &str) -> CallableDescriptor {
        info.members
            .iter()
            .find_map(|m| match m {
                MemberInfo::Method(c) if c.name == name => Some(c.clone()),
                _ => None,
            })
            .unwrap()
    }

    fn property_getter(info: &TypeDescriptor, name: &str) -> CallableDescriptor {
        info.members
            .iter()
            .find_map(|m| match m {
                MemberInfo::Property(p) if p.name == name => p.getter.clone(),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn constructed_generic_is_named_and_cached() {
        let runtime = MemoryRuntime::new();
        let list = list_of_int(&runtime);
        assert_eq!(list.name(), "System.Collections.Generic.List`1[System.Int32]");
        assert_eq!(list.generic_args, vec![well_known::INT32]);
        assert_eq!(list.generic_definition, Some(well_known::LIST));
        assert!(!list.is_generic_definition());

        let again = runtime
            .make_generic_type(well_known::LIST, &[well_known::INT32])
            .unwrap();
        assert_eq!(again, list.type_hash);
    }

    #[test]
    fn generic_arity_mismatch_faults() {
        let runtime = MemoryRuntime::new();
        let err = runtime
            .make_generic_type(well_known::LIST, &[well_known::INT32, well_known::STRING])
            .unwrap_err();
        assert_eq!(err.type_name, "System.ArgumentException");

        let err = runtime
            .make_generic_type(well_known::INT32, &[well_known::INT32])
            .unwrap_err();
        assert_eq!(err.type_name, "System.InvalidOperationException");
    }

    #[test]
    fn list_methods_run_through_definition_natives() {
        let runtime = MemoryRuntime::new();
        let list = list_of_int(&runtime);
        let ctor = list.constructors[0].clone();
        let instance = runtime.invoke(&ctor, None, &mut []).unwrap();

        let add = method(&list, "Add");
        assert_eq!(add.params[0].param_type, well_known::INT32);
        runtime
            .invoke(&add, Some(&instance), &mut [ForeignValue::Int32(7)])
            .unwrap();
        runtime
            .invoke(&add, Some(&instance), &mut [ForeignValue::Int32(9)])
            .unwrap();

        let count = property_getter(&list, "Count");
        assert_eq!(
            runtime.invoke(&count, Some(&instance), &mut []).unwrap(),
            ForeignValue::Int32(2)
        );
        let get_item = method(&list, "get_Item");
        assert_eq!(
            runtime
                .invoke(&get_item, Some(&instance), &mut [ForeignValue::Int32(1)])
                .unwrap(),
            ForeignValue::Int32(9)
        );
        let err = runtime
            .invoke(&get_item, Some(&instance), &mut [ForeignValue::Int32(5)])
            .unwrap_err();
        assert_eq!(err.type_name, "System.ArgumentOutOfRangeException");
    }

    #[test]
    fn constructed_list_is_assignable_to_its_interfaces() {
        let runtime = MemoryRuntime::new();
        let list = list_of_int(&runtime);
        let ilist = runtime
            .make_generic_type(well_known::ILIST, &[well_known::INT32])
            .unwrap();
        let ienumerable = runtime
            .make_generic_type(well_known::IENUMERABLE, &[well_known::INT32])
            .unwrap();
        assert!(runtime.is_assignable(ilist, list.type_hash));
        assert!(runtime.is_assignable(ienumerable, list.type_hash));
        assert!(runtime.is_assignable(well_known::NONGENERIC_ILIST, list.type_hash));
        assert!(runtime.is_assignable(well_known::OBJECT, list.type_hash));
        assert!(!runtime.is_assignable(list.type_hash, well_known::OBJECT));
    }

    #[test]
    fn out_parameters_are_written_back() {
        let runtime = MemoryRuntime::new();
        let int32 = runtime.type_info(well_known::INT32).unwrap();
        let try_parse = method(&int32, "TryParse");

        let mut args = [ForeignValue::string("42"), ForeignValue::Null];
        let ok = runtime.invoke(&try_parse, None, &mut args).unwrap();
        assert_eq!(ok, ForeignValue::Bool(true));
        assert_eq!(args[1], ForeignValue::Int32(42));

        let mut args = [ForeignValue::string("nope"), ForeignValue::Null];
        let ok = runtime.invoke(&try_parse, None, &mut args).unwrap();
        assert_eq!(ok, ForeignValue::Bool(false));
        assert_eq!(args[1], ForeignValue::Int32(0));
    }

    #[test]
    fn parameter_count_is_checked() {
        let runtime = MemoryRuntime::new();
        let int32 = runtime.type_info(well_known::INT32).unwrap();
        let parse = method(&int32, "Parse");
        let err = runtime.invoke(&parse, None, &mut []).unwrap_err();
        assert_eq!(err.type_name, "System.Reflection.TargetParameterCountException");
    }

    #[test]
    fn arrays_are_intrinsic() {
        let runtime = MemoryRuntime::new();
        let array = runtime
            .create_array(
                well_known::STRING,
                vec![ForeignValue::string("a"), ForeignValue::string("b")],
            )
            .unwrap();
        let ty = array.runtime_type().unwrap();
        let info = runtime.type_info(ty).unwrap();
        assert!(info.is_array());
        assert_eq!(info.name(), "System.String[]");
        assert_eq!(runtime.array_length(&array).unwrap(), 2);

        runtime
            .array_set(&array, 1, ForeignValue::string("z"))
            .unwrap();
        assert_eq!(
            runtime.array_get(&array, 1).unwrap(),
            ForeignValue::string("z")
        );
        let err = runtime.array_get(&array, 2).unwrap_err();
        assert_eq!(err.type_name, "System.IndexOutOfRangeException");

        let length = property_getter(&info, "Length");
        assert_eq!(
            runtime.invoke(&length, Some(&array), &mut []).unwrap(),
            ForeignValue::Int32(2)
        );
        let ilist = runtime
            .make_generic_type(well_known::ILIST, &[well_known::STRING])
            .unwrap();
        assert!(runtime.is_assignable(ilist, ty));
    }

    #[test]
    fn native_delegates_are_invoked() {
        let runtime = MemoryRuntime::new();
        let func = runtime
            .make_generic_type(
                TypeHash::from_name("System.Func`2"),
                &[well_known::INT32, well_known::INT32],
            )
            .unwrap();
        let target = DelegateTarget::Native(Arc::new(|args: &[ForeignValue]| {
            let x = args[0].as_integer().unwrap_or(0) as i32;
            Ok::<_, ForeignFault>(ForeignValue::Int32(x * 2))
        }));
        let delegate = runtime.create_delegate(func, target).unwrap();

        let invoke = runtime.type_info(func).unwrap().delegate_invoke.clone().unwrap();
        assert_eq!(invoke.params[0].param_type, well_known::INT32);
        assert_eq!(invoke.return_type, well_known::INT32);
        let result = runtime
            .invoke(&invoke, Some(&delegate), &mut [ForeignValue::Int32(21)])
            .unwrap();
        assert_eq!(result, ForeignValue::Int32(42));
    }

    #[test]
    fn create_delegate_rejects_non_delegate_types() {
        let runtime = MemoryRuntime::new();
        let target = DelegateTarget::Native(Arc::new(|_: &[ForeignValue]| {
            Ok::<_, ForeignFault>(ForeignValue::Null)
        }));
        assert!(runtime.create_delegate(well_known::STRING, target).is_err());
    }

    #[test]
    fn dictionary_enumerates_key_value_pairs() {
        let runtime = MemoryRuntime::new();
        let dict_ty = runtime
            .make_generic_type(well_known::DICTIONARY, &[well_known::STRING, well_known::INT32])
            .unwrap();
        let dict = runtime.type_info(dict_ty).unwrap();
        let instance = runtime.invoke(&dict.constructors[0], None, &mut []).unwrap();
        let add = method(&dict, "Add");
        runtime
            .invoke(
                &add,
                Some(&instance),
                &mut [ForeignValue::string("one"), ForeignValue::Int32(1)],
            )
            .unwrap();
        let dup = runtime
            .invoke(
                &add,
                Some(&instance),
                &mut [ForeignValue::string("one"), ForeignValue::Int32(2)],
            )
            .unwrap_err();
        assert_eq!(dup.type_name, "System.ArgumentException");

        let mut entries = runtime.enumerate(&instance).unwrap();
        let pair = entries.next_value().unwrap().unwrap();
        assert!(entries.next_value().unwrap().is_none());

        let pair_info = runtime.type_info(pair.runtime_type().unwrap()).unwrap();
        assert_eq!(pair_info.generic_definition, Some(well_known::KEY_VALUE_PAIR));
        let key = property_getter(&pair_info, "Key");
        assert_eq!(
            runtime.invoke(&key, Some(&pair), &mut []).unwrap(),
            ForeignValue::string("one")
        );
    }

    #[test]
    fn stale_and_disposed_receivers_fault() {
        let runtime = MemoryRuntime::new();
        let list = list_of_int(&runtime);
        let count = property_getter(&list, "Count");

        let instance = runtime.invoke(&list.constructors[0], None, &mut []).unwrap();
        runtime.dispose(&instance).unwrap();
        assert!(runtime.is_disposed(&instance));
        let err = runtime.invoke(&count, Some(&instance), &mut []).unwrap_err();
        assert_eq!(err.type_name, "System.ObjectDisposedException");

        assert!(runtime.release(&instance));
        let err = runtime.invoke(&count, Some(&instance), &mut []).unwrap_err();
        assert_eq!(err.type_name, "System.NullReferenceException");

        let err = runtime.invoke(&count, None, &mut []).unwrap_err();
        assert_eq!(err.type_name, "System.NullReferenceException");
    }

    #[test]
    fn first_definition_wins_but_module_lists_both() {
        let runtime = MemoryRuntime::new();
        let mut first = ModuleBuilder::new("First");
        first.class("Acme.Widget").field("a", well_known::INT32).finish();
        let mut second = ModuleBuilder::new("Second");
        second.class("Acme.Widget").field("b", well_known::INT32).finish();
        runtime.load_module(first).unwrap();
        runtime.load_module(second).unwrap();

        let widget = runtime.type_info(TypeHash::from_name("Acme.Widget")).unwrap();
        assert_eq!(widget.members[0].name(), "a");
        let modules = runtime.modules();
        assert_eq!(modules.len(), 3);
        assert_eq!(modules[2].types[0].members[0].name(), "b");
    }

    #[test]
    fn duplicate_module_names_are_rejected() {
        let runtime = MemoryRuntime::new();
        let err = runtime.load_module(ModuleBuilder::new("System")).unwrap_err();
        assert_eq!(err, RegistrationError::DuplicateModule("System".to_string()));
    }

    #[test]
    fn fields_and_statics() {
        let runtime = MemoryRuntime::new();
        let mut module = ModuleBuilder::new("Acme");
        let widget = module
            .class("Acme.Widget")
            .field("count", well_known::INT32)
            .static_field("Limit", well_known::INT32, ForeignValue::Int32(10))
            .default_constructor()
            .method("Bump", Vec::new(), well_known::VOID, |ctx| {
                let count: i32 = ctx.field("count")?;
                ctx.set_field("count", count + 1)
            })
            .finish();
        runtime.load_module(module).unwrap();

        let info = runtime.type_info(widget).unwrap();
        let instance = runtime.invoke(&info.constructors[0], None, &mut []).unwrap();
        let bump = method(&info, "Bump");
        runtime.invoke(&bump, Some(&instance), &mut []).unwrap();
        runtime.invoke(&bump, Some(&instance), &mut []).unwrap();
        assert_eq!(
            runtime.read_field_by_name(&instance, "count").unwrap(),
            ForeignValue::Int32(2)
        );

        let limit = info
            .members
            .iter()
            .find_map(|m| match m {
                MemberInfo::Field(f) if f.name == "Limit" => Some(f.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(runtime.get_field(&limit, None).unwrap(), ForeignValue::Int32(10));
        runtime.set_field(&limit, None, ForeignValue::Int32(3)).unwrap();
        assert_eq!(runtime.get_field(&limit, None).unwrap(), ForeignValue::Int32(3));
    }

    #[test]
    fn enums_display_by_name() {
        let runtime = MemoryRuntime::new();
        let mut module = ModuleBuilder::new("Acme");
        let color = module.enumeration("Acme.Color", &[("Red", 1), ("Green", 2)]);
        runtime.load_module(module).unwrap();

        let green = runtime.enum_from_integer(color, 2).unwrap();
        assert_eq!(runtime.display(&green).unwrap(), "Green");
        let odd = runtime.enum_from_integer(color, 7).unwrap();
        assert_eq!(runtime.display(&odd).unwrap(), "7");
        assert!(runtime.enum_from_integer(well_known::INT32, 1).is_err());
        assert_eq!(
            runtime.create_default(color).unwrap(),
            ForeignValue::Enum { ty: color, value: 0 }
        );
    }

    #[test]
    fn display_and_equality_follow_value_semantics() {
        let runtime = MemoryRuntime::new();
        assert_eq!(runtime.display(&ForeignValue::Bool(true)).unwrap(), "True");
        assert_eq!(runtime.display(&ForeignValue::Float64(2.5)).unwrap(), "2.5");
        assert!(runtime.equals(&ForeignValue::Int32(3), &ForeignValue::Int64(3)));
        assert!(!runtime.equals(&ForeignValue::Int32(3), &ForeignValue::Bool(true)));

        let object = runtime.new_instance(well_known::OBJECT).unwrap();
        let other = runtime.new_instance(well_known::OBJECT).unwrap();
        assert!(runtime.equals(&object, &object));
        assert!(!runtime.equals(&object, &other));
        assert_eq!(runtime.display(&object).unwrap(), "System.Object");
    }

    #[test]
    fn generic_methods_are_instantiated() {
        let runtime = MemoryRuntime::new();
        let mut module = ModuleBuilder::new("Acme");
        let t = module.generic_param("Acme.Util.Echo", "T");
        let util = module
            .class("Acme.Util")
            .generic_method(
                "Echo",
                vec![t],
                vec![ParamDescriptor::new("value", t)],
                t,
                |ctx| {
                    let value = ctx.arg_value(0)?.clone();
                    ctx.set_return(value);
                    Ok(())
                },
            )
            .finish();
        runtime.load_module(module).unwrap();

        let echo = method(&runtime.type_info(util).unwrap(), "Echo");
        assert!(echo.is_generic_definition());
        let echo_int = runtime.make_generic_method(&echo, &[well_known::INT32]).unwrap();
        assert_eq!(echo_int.params[0].param_type, well_known::INT32);
        assert_eq!(echo_int.return_type, well_known::INT32);
        assert!(!echo_int.is_generic_definition());
        assert_eq!(
            runtime
                .invoke(&echo_int, None, &mut [ForeignValue::Int32(5)])
                .unwrap(),
            ForeignValue::Int32(5)
        );
        assert!(runtime.make_generic_method(&echo_int, &[well_known::INT32]).is_err());
    }
}
