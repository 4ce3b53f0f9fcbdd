//! The operations a host performs on foreign objects and types.
//!
//! Indexing, length, iteration, formatting, equality, enum arithmetic,
//! explicit disposal and construction. Each takes handles and host values
//! and reports failures through [`BridgeError`].

use dynbridge_core::{
    BoundCallable, BridgeError, BridgeResult, ForeignEnumerator, ForeignHandle, ForeignValue,
    HostValue, MemberInfo, OverloadSet, TypeDescriptor, TypeHandle, TypeHash, well_known,
};

use crate::conversion::host_integer;
use crate::generic::specialize_type;
use crate::{BridgeContext, OverloadResolver, OverloadSelector, display_callable};

/// Bitwise operators available on enum handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
    Or,
    And,
    Xor,
}

impl BitOp {
    fn apply(self, a: i64, b: i64) -> i64 {
        match self {
            BitOp::Or => a | b,
            BitOp::And => a & b,
            BitOp::Xor => a ^ b,
        }
    }
}

/// Host-visible object operations bound to a context.
#[derive(Clone, Copy)]
pub struct ObjectOps<'a> {
    ctx: &'a BridgeContext,
}

impl<'a> ObjectOps<'a> {
    pub fn new(ctx: &'a BridgeContext) -> Self {
        Self { ctx }
    }

    // ------------------------------------------------------------------
    // Indexing and length
    // ------------------------------------------------------------------

    /// `target[index]`: array elements, otherwise the type's indexer.
    pub fn get_item(&self, target: &ForeignHandle, index: &HostValue) -> BridgeResult<HostValue> {
        let info = self.instance_type(target, "subscript")?;
        if info.is_array() {
            let len = self.ctx.foreign_call(|rt| rt.array_length(target.value()))?;
            let slot = array_index(index, len)?;
            let item = self.ctx.foreign_call(|rt| rt.array_get(target.value(), slot))?;
            return Ok(self.ctx.conversion().to_host(&item));
        }
        let getter = self.indexer(target, &info, "get_Item")?;
        self.ctx.invoker().call(&getter, std::slice::from_ref(index))
    }

    /// `target[index] = value`.
    pub fn set_item(
        &self,
        target: &ForeignHandle,
        index: &HostValue,
        value: &HostValue,
    ) -> BridgeResult<()> {
        let info = self.instance_type(target, "subscript")?;
        if info.is_array() {
            let len = self.ctx.foreign_call(|rt| rt.array_length(target.value()))?;
            let slot = array_index(index, len)?;
            let element = info.element_type.unwrap_or(well_known::OBJECT);
            let item = self.ctx.conversion().to_foreign(value, element)?;
            return self
                .ctx
                .foreign_call(|rt| rt.array_set(target.value(), slot, item));
        }
        let setter = self.indexer(target, &info, "set_Item")?;
        self.ctx
            .invoker()
            .call(&setter, &[index.clone(), value.clone()])
            .map(|_| ())
    }

    fn indexer(
        &self,
        target: &ForeignHandle,
        info: &TypeDescriptor,
        accessor: &str,
    ) -> BridgeResult<HostValue> {
        self.ctx
            .members()
            .get_direct(target, accessor)
            .map_err(|err| match err {
                BridgeError::NotFound(_) => BridgeError::invalid_operation(format!(
                    "'{}' object is not subscriptable",
                    info.simple_name()
                )),
                other => other,
            })
    }

    /// Element count of an array or of anything exposing `Count`.
    pub fn len(&self, target: &ForeignHandle) -> BridgeResult<usize> {
        let info = self.instance_type(target, "len")?;
        if info.is_array() {
            return self.ctx.foreign_call(|rt| rt.array_length(target.value()));
        }
        let count = match self.ctx.members().get_direct(target, "Count") {
            Ok(count) => count,
            Err(BridgeError::NotFound(_)) => {
                return Err(BridgeError::invalid_operation(format!(
                    "object of type '{}' has no len()",
                    info.simple_name()
                )));
            }
            Err(err) => return Err(err),
        };
        count
            .as_int()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| BridgeError::invalid_cast(count.type_name(), "System.Int32"))
    }

    // ------------------------------------------------------------------
    // Iteration
    // ------------------------------------------------------------------

    /// Single-pass iteration over an enumerable object.
    pub fn iter(&self, target: &ForeignHandle) -> BridgeResult<HostIterator> {
        self.instance_type(target, "iterate")?;
        let inner = self.ctx.foreign_call(|rt| rt.enumerate(target.value()))?;
        Ok(HostIterator {
            ctx: self.ctx.clone(),
            inner,
            done: false,
        })
    }

    fn foreign_items(&self, value: &ForeignValue) -> BridgeResult<Vec<ForeignValue>> {
        let mut inner = self.ctx.foreign_call(|rt| rt.enumerate(value))?;
        let mut items = Vec::new();
        while let Some(item) = self.ctx.foreign_call(|_| inner.next_value())? {
            items.push(item);
        }
        Ok(items)
    }

    // ------------------------------------------------------------------
    // Formatting
    // ------------------------------------------------------------------

    /// The object's own string conversion.
    pub fn str(&self, target: &ForeignHandle) -> BridgeResult<String> {
        if target.is_null() {
            if !target.has_type() {
                return Ok(String::new());
            }
            return Ok(self.ctx.type_name(target.type_hash()));
        }
        self.ctx.foreign_call(|rt| rt.display(target.value()))
    }

    /// Debug representation of any host value.
    pub fn repr(&self, value: &HostValue) -> BridgeResult<String> {
        Ok(match value {
            HostValue::None => "None".to_string(),
            HostValue::Bool(true) => "True".to_string(),
            HostValue::Bool(false) => "False".to_string(),
            HostValue::Int(v) => v.to_string(),
            HostValue::Float(v) => float_text(*v),
            HostValue::Str(s) => format!("'{}'", s.replace('\'', "\\'")),
            HostValue::List(items) => format!("[{}]", self.repr_all(items)?),
            HostValue::Dict(pairs) => {
                let entries = pairs
                    .iter()
                    .map(|(k, v)| Ok(format!("{}: {}", self.repr(k)?, self.repr(v)?)))
                    .collect::<BridgeResult<Vec<_>>>()?;
                format!("{{{}}}", entries.join(", "))
            }
            HostValue::Object(handle) => self.repr_handle(handle)?,
            HostValue::Type(ty) => format!("<class {}>", ty.descriptor().simple_name()),
            HostValue::Method(bound) => display_callable(
                self.ctx,
                bound.callable.declaring_type,
                &bound.callable.name,
            ),
            HostValue::Overloads(set) => {
                display_callable(self.ctx, set.declaring_type(), set.name())
            }
            HostValue::Callable(callable) => format!("<function {}>", callable.name()),
        })
    }

    fn repr_all(&self, items: &[HostValue]) -> BridgeResult<String> {
        Ok(items
            .iter()
            .map(|item| self.repr(item))
            .collect::<BridgeResult<Vec<_>>>()?
            .join(", "))
    }

    fn repr_handle(&self, handle: &ForeignHandle) -> BridgeResult<String> {
        if handle.is_null() {
            if !handle.has_type() {
                return Ok("None".to_string());
            }
            let info = self.ctx.type_info(handle.type_hash())?;
            return Ok(format!("<class {}>", info.simple_name()));
        }

        let value = handle.value();
        let ty = value.runtime_type().unwrap_or(handle.type_hash());
        let info = self.ctx.type_info(ty)?;

        if let ForeignValue::Enum { value, .. } = value {
            let name = info
                .enum_name_of(*value)
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string());
            return Ok(format!("<enum {}.{}>", info.simple_name(), name));
        }

        if info.generic_definition == Some(well_known::KEY_VALUE_PAIR) {
            return Ok(format!("{{{}}}", self.repr_pair(handle)?));
        }

        if let Some(arity) = self.tuple_arity(&info) {
            let items = (1..=arity)
                .map(|i| self.ctx.members().get_direct(handle, &format!("Item{i}")))
                .collect::<BridgeResult<Vec<_>>>()?;
            let inner = self.repr_all(&items)?;
            return Ok(if arity == 1 {
                format!("({inner},)")
            } else {
                format!("({inner})")
            });
        }

        if info.is_array() || self.ctx.is_assignable(well_known::NONGENERIC_ILIST, ty) {
            let items = self.ctx.conversion().to_host_all(&self.foreign_items(value)?);
            return Ok(format!("[{}]", self.repr_all(&items)?));
        }

        if self.ctx.is_assignable(well_known::NONGENERIC_IDICTIONARY, ty) {
            let entries = self
                .foreign_items(value)?
                .into_iter()
                .map(|pair| self.repr_pair(&ForeignHandle::from_value(pair)))
                .collect::<BridgeResult<Vec<_>>>()?;
            return Ok(format!("{{{}}}", entries.join(", ")));
        }

        Ok(format!("<{} instance>", info.simple_name()))
    }

    fn repr_pair(&self, pair: &ForeignHandle) -> BridgeResult<String> {
        let members = self.ctx.members();
        let key = members.get_direct(pair, "Key")?;
        let value = members.get_direct(pair, "Value")?;
        Ok(format!("{}: {}", self.repr(&key)?, self.repr(&value)?))
    }

    fn tuple_arity(&self, info: &TypeDescriptor) -> Option<usize> {
        let definition = self.ctx.type_info(info.generic_definition?).ok()?;
        let name = definition.name();
        let arity = name.strip_prefix("System.Tuple`")?.parse::<usize>().ok()?;
        (1..=4).contains(&arity).then_some(arity)
    }

    /// Multi-line listing of an object's public properties and fields.
    pub fn pretty(&self, target: &ForeignHandle) -> BridgeResult<String> {
        let value = target.value();
        let ty = value.runtime_type().unwrap_or(target.type_hash());
        let info = self.ctx.type_info(ty)?;

        if let ForeignValue::Enum { value, .. } = value {
            let name = info
                .enum_name_of(*value)
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string());
            return Ok(format!("{name} value of {}", info.simple_name()));
        }

        let mut out = format!("{}:", info.name());
        if target.is_null() {
            return Ok(out);
        }
        let members = self.ctx.members();
        for member in members.flattened(ty)? {
            let readable = match &member {
                MemberInfo::Property(p) => {
                    !p.is_static && p.getter.as_ref().is_some_and(|g| g.input_count() == 0)
                }
                MemberInfo::Field(f) => !f.is_static,
                _ => false,
            };
            if !readable || member.name().starts_with('<') {
                continue;
            }
            let shown = match members.get_direct(target, member.name())? {
                HostValue::None => "None".to_string(),
                HostValue::Str(s) => s,
                HostValue::Float(v) => float_text(v),
                HostValue::Object(handle) => {
                    let member_type = handle.value().runtime_type().unwrap_or(handle.type_hash());
                    format!("instance of {}", self.ctx.type_name(member_type))
                }
                other => self.repr(&other)?,
            };
            out.push_str(&format!("\n\t{}:\t{shown}", member.name()));
        }
        Ok(out)
    }

    /// Member names for interactive listing.
    pub fn dir(&self, target: &ForeignHandle) -> BridgeResult<Vec<String>> {
        self.ctx.members().member_names(target)
    }

    // ------------------------------------------------------------------
    // Equality
    // ------------------------------------------------------------------

    /// Host `==`: foreign equality for handles, structural otherwise.
    pub fn equals(&self, a: &HostValue, b: &HostValue) -> bool {
        match (a, b) {
            (HostValue::Object(x), HostValue::Object(y)) => match (x.is_null(), y.is_null()) {
                (true, true) => true,
                (false, false) => self.ctx.runtime().equals(x.value(), y.value()),
                _ => false,
            },
            (HostValue::Object(handle), HostValue::None)
            | (HostValue::None, HostValue::Object(handle)) => handle.is_null(),
            _ => a == b,
        }
    }

    // ------------------------------------------------------------------
    // Enums
    // ------------------------------------------------------------------

    /// Underlying integer of an enum handle.
    pub fn to_int(&self, target: &ForeignHandle) -> BridgeResult<i64> {
        match target.value() {
            ForeignValue::Enum { value, .. } => Ok(*value),
            _ => Err(BridgeError::invalid_cast(self.handle_type_name(target), "Enum")),
        }
    }

    /// Enum value of type `ty` with the integer `value`.
    pub fn from_int(&self, ty: &TypeHandle, value: &HostValue) -> BridgeResult<HostValue> {
        if !ty.descriptor().is_enum() {
            return Err(BridgeError::invalid_cast(ty.name(), "Enum"));
        }
        let raw = host_integer(value)
            .and_then(|n| i64::try_from(n).ok())
            .ok_or_else(|| BridgeError::invalid_cast(value.type_name(), "System.Int64"))?;
        self.make_enum(ty.type_hash(), raw)
    }

    /// `a | b`, `a & b` or `a ^ b` on enum handles of one type.
    ///
    /// The right operand may also be a host int.
    pub fn binary(&self, a: &ForeignHandle, b: &HostValue, op: BitOp) -> BridgeResult<HostValue> {
        let (ty, lhs) = self.enum_parts(a)?;
        let rhs = match b {
            HostValue::Object(handle) => match handle.value() {
                ForeignValue::Enum { ty: other, value } if *other == ty => *value,
                _ => {
                    return Err(BridgeError::invalid_cast(
                        self.handle_type_name(handle),
                        self.ctx.type_name(ty),
                    ));
                }
            },
            other => host_integer(other)
                .and_then(|n| i64::try_from(n).ok())
                .ok_or_else(|| BridgeError::invalid_cast(other.type_name(), self.ctx.type_name(ty)))?,
        };
        self.make_enum(ty, op.apply(lhs, rhs))
    }

    /// `~a` on an enum handle.
    pub fn enum_not(&self, a: &ForeignHandle) -> BridgeResult<HostValue> {
        let (ty, value) = self.enum_parts(a)?;
        self.make_enum(ty, !value)
    }

    fn enum_parts(&self, target: &ForeignHandle) -> BridgeResult<(TypeHash, i64)> {
        match target.value() {
            ForeignValue::Enum { ty, value } => Ok((*ty, *value)),
            _ => Err(BridgeError::invalid_cast(self.handle_type_name(target), "Enum")),
        }
    }

    fn make_enum(&self, ty: TypeHash, value: i64) -> BridgeResult<HostValue> {
        let value = self.ctx.foreign_call(|rt| rt.enum_from_integer(ty, value))?;
        Ok(self.ctx.conversion().to_host(&value))
    }

    // ------------------------------------------------------------------
    // Disposal
    // ------------------------------------------------------------------

    /// Release the object's resources. Null handles are ignored.
    pub fn dispose(&self, target: &ForeignHandle) -> BridgeResult<()> {
        if target.is_null() {
            return Ok(());
        }
        tracing::debug!(ty = %self.handle_type_name(target), "dispose");
        self.ctx.foreign_call(|rt| rt.dispose(target.value()))
    }

    /// Guard disposing `target` when it goes out of scope.
    pub fn scope(&self, target: ForeignHandle) -> DisposeScope<'a> {
        DisposeScope {
            ctx: self.ctx,
            target: Some(target),
        }
    }

    // ------------------------------------------------------------------
    // Construction and specialization
    // ------------------------------------------------------------------

    /// Create an instance of `ty` from host arguments.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn construct(&self, ty: &TypeHandle, args: &[HostValue]) -> BridgeResult<HostValue> {
        let info = ty.descriptor();
        if info.is_generic_definition() {
            return Err(BridgeError::invalid_operation("Unspecialized generic type"));
        }
        match info.constructors.as_slice() {
            [] if info.is_value_type() => {
                if !args.is_empty() {
                    return Err(BridgeError::InvalidArgumentCount {
                        expected: 0,
                        actual: args.len(),
                    });
                }
                let value = self.ctx.foreign_call(|rt| rt.create_default(ty.type_hash()))?;
                Ok(self.ctx.conversion().to_host(&value))
            }
            [] => Err(BridgeError::invalid_operation("No constructor available")),
            [only] => self
                .ctx
                .invoker()
                .invoke(&BoundCallable::unbound(only.clone()), args),
            ctors => {
                let set = OverloadSet::constructors(ty.type_hash(), ctors.to_vec());
                self.ctx.invoker().call_overloads(&set, args)
            }
        }
    }

    /// `ty[selector]`: specialize a generic definition, or pick a constructor.
    pub fn specialize(&self, ty: &TypeHandle, selector: &HostValue) -> BridgeResult<HostValue> {
        let info = ty.descriptor();
        let selector = OverloadSelector::from_host(selector)?;
        if info.is_generic_definition() {
            let OverloadSelector::Witnesses(args) = selector else {
                return Err(BridgeError::invalid_cast("int", "Type"));
            };
            let constructed = specialize_type(self.ctx, info, &args)?;
            return Ok(HostValue::Type(TypeHandle::new(constructed)));
        }
        let set = OverloadSet::constructors(ty.type_hash(), info.constructors.clone());
        let chosen = OverloadResolver::new(self.ctx, &set).choose(&selector)?;
        Ok(HostValue::Method(chosen.into_bound()))
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn instance_type(&self, target: &ForeignHandle, action: &str) -> BridgeResult<TypeDescriptor> {
        if target.is_null() {
            return Err(BridgeError::NullReference(format!(
                "cannot {action} a null object"
            )));
        }
        let ty = target.value().runtime_type().unwrap_or(target.type_hash());
        self.ctx.type_info(ty)
    }

    fn handle_type_name(&self, target: &ForeignHandle) -> String {
        if !target.has_type() {
            return "NoneType".to_string();
        }
        let ty = target.value().runtime_type().unwrap_or(target.type_hash());
        self.ctx.type_name(ty)
    }
}

fn array_index(index: &HostValue, len: usize) -> BridgeResult<usize> {
    let raw = host_integer(index)
        .ok_or_else(|| BridgeError::invalid_cast(index.type_name(), "System.Int32"))?;
    usize::try_from(raw)
        .ok()
        .filter(|i| *i < len)
        .ok_or(BridgeError::IndexOutOfRange {
            index: i64::try_from(raw).unwrap_or(i64::MAX),
            len,
        })
}

fn float_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Lazy host view of a foreign enumeration.
///
/// Single pass: once exhausted it keeps reporting `StopIteration`.
pub struct HostIterator {
    ctx: BridgeContext,
    inner: Box<dyn ForeignEnumerator>,
    done: bool,
}

impl HostIterator {
    /// Next element, or `StopIteration` at the end.
    pub fn next_value(&mut self) -> BridgeResult<HostValue> {
        if self.done {
            return Err(BridgeError::StopIteration);
        }
        let inner = &mut self.inner;
        match self.ctx.foreign_call(|_| inner.next_value())? {
            Some(item) => Ok(self.ctx.conversion().to_host(&item)),
            None => {
                self.done = true;
                Err(BridgeError::StopIteration)
            }
        }
    }
}

impl Iterator for HostIterator {
    type Item = BridgeResult<HostValue>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_value() {
            Err(BridgeError::StopIteration) => None,
            other => Some(other),
        }
    }
}

/// Disposes its handle when dropped, unless finished first.
///
/// Disposal errors on drop are logged; call [`DisposeScope::finish`] to
/// observe them.
pub struct DisposeScope<'a> {
    ctx: &'a BridgeContext,
    target: Option<ForeignHandle>,
}

impl DisposeScope<'_> {
    pub fn handle(&self) -> Option<&ForeignHandle> {
        self.target.as_ref()
    }

    /// Dispose now and report the outcome.
    pub fn finish(mut self) -> BridgeResult<()> {
        match self.target.take() {
            Some(target) => self.ctx.objects().dispose(&target),
            None => Ok(()),
        }
    }
}

impl Drop for DisposeScope<'_> {
    fn drop(&mut self) {
        if let Some(target) = self.target.take()
            && let Err(err) = self.ctx.objects().dispose(&target)
        {
            tracing::warn!(error = %err, "dispose on scope exit failed");
        }
    }
}
