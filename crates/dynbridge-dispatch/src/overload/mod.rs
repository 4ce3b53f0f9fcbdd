//! Overload resolution over reflected callables.
//!
//! Two modes serve different call sites:
//!
//! - **best fit** ([`OverloadResolver::find_best_match`]): the first candidate,
//!   in declaration order, whose input count equals the argument count and
//!   whose every parameter accepts its argument. There is no scoring; an
//!   ambiguous call picks whichever overload the runtime declared first.
//! - **exact** ([`OverloadResolver::find_exact`]): parameter types equal to
//!   explicit type witnesses, generic parameters skipped.
//!
//! Both fail before anything is converted or invoked.

mod matching;
mod selector;

pub(crate) use matching::accepts;
pub use selector::OverloadSelector;

use dynbridge_core::{
    BoundCallable, BridgeError, BridgeResult, CallableDescriptor, HostValue, OverloadSet, TypeHash,
};

use crate::generic::specialize_method;
use crate::{BridgeContext, CallableInstance};

/// Narrows an [`OverloadSet`] to one candidate.
pub struct OverloadResolver<'a> {
    ctx: &'a BridgeContext,
    set: &'a OverloadSet,
}

impl<'a> OverloadResolver<'a> {
    pub fn new(ctx: &'a BridgeContext, set: &'a OverloadSet) -> Self {
        Self { ctx, set }
    }

    /// Index of the first candidate accepting `args`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn find_best_match(&self, args: &[HostValue]) -> BridgeResult<usize> {
        let found = self.set.iter().position(|candidate| {
            candidate.input_count() == args.len()
                && candidate
                    .params
                    .iter()
                    .filter(|param| !param.is_out_only())
                    .zip(args)
                    .all(|(param, arg)| accepts(self.ctx, param.param_type, arg))
        });
        match found {
            Some(index) => {
                tracing::debug!(overload = self.set.name(), index, "best-fit overload");
                Ok(index)
            }
            None => Err(BridgeError::NoSuitableOverload {
                name: self.set.name().to_string(),
                args: args
                    .iter()
                    .map(HostValue::type_name)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Index of the candidate whose parameter types equal `witnesses`.
    pub fn find_exact(&self, witnesses: &[TypeHash]) -> BridgeResult<usize> {
        let found = self.set.iter().position(|candidate| {
            candidate.params.len() == witnesses.len()
                && candidate
                    .params
                    .iter()
                    .zip(witnesses)
                    .all(|(param, witness)| {
                        self.is_generic_parameter(param.param_type) || param.param_type == *witness
                    })
        });
        found.ok_or_else(|| BridgeError::NoSuchOverload {
            name: self.set.name().to_string(),
        })
    }

    /// Positional selection; negative and past-the-end indices fail.
    pub fn select(&self, index: i128) -> BridgeResult<usize> {
        usize::try_from(index)
            .ok()
            .filter(|i| *i < self.set.len())
            .ok_or(BridgeError::IndexOutOfRange {
                index: index.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
                len: self.set.len(),
            })
    }

    /// Apply an explicit selector.
    ///
    /// Witnesses instantiate the first generic definition of matching generic
    /// arity; when there is none they name parameter types exactly.
    pub fn choose(&self, selector: &OverloadSelector) -> BridgeResult<CallableInstance> {
        let bound = match selector {
            OverloadSelector::Index(index) => self.bind(self.select(*index)?)?,
            OverloadSelector::Witnesses(witnesses) => {
                let generic = self.set.iter().find(|candidate| {
                    candidate.is_generic_definition()
                        && candidate.generic_params.len() == witnesses.len()
                });
                match generic {
                    Some(definition) if !witnesses.is_empty() => {
                        let method = specialize_method(self.ctx, definition, witnesses)?;
                        BoundCallable::new(method, self.set.receiver().cloned())
                    }
                    _ => self.bind(self.find_exact(witnesses)?)?,
                }
            }
        };
        tracing::debug!(overload = self.set.name(), selector = ?selector, "explicit overload");
        Ok(CallableInstance::new(bound))
    }

    fn bind(&self, index: usize) -> BridgeResult<BoundCallable> {
        self.set.bind(index).ok_or(BridgeError::IndexOutOfRange {
            index: index as i64,
            len: self.set.len(),
        })
    }

    fn is_generic_parameter(&self, ty: TypeHash) -> bool {
        self.ctx
            .type_info(ty)
            .is_ok_and(|info| info.is_generic_parameter())
    }

    /// One human-readable signature per candidate, in order.
    pub fn signatures(&self) -> Vec<String> {
        self.set
            .iter()
            .map(|candidate| signature(self.ctx, candidate))
            .collect()
    }
}

/// `static Name(Type p, out Type q) -> Ret`.
pub fn signature(ctx: &BridgeContext, callable: &CallableDescriptor) -> String {
    let params = callable
        .params
        .iter()
        .map(|param| {
            let mode = match (param.is_out_only(), param.is_out()) {
                (true, _) => "out ",
                (false, true) => "ref ",
                _ => "",
            };
            format!("{mode}{} {}", ctx.type_name(param.param_type), param.name)
        })
        .collect::<Vec<_>>()
        .join(", ");
    let prefix = if callable.is_static && !callable.is_constructor() {
        "static "
    } else {
        ""
    };
    let mut text = format!("{prefix}{}({params})", callable.name);
    if !callable.is_constructor() {
        text.push_str(" -> ");
        text.push_str(&ctx.type_name(callable.return_type));
    }
    text
}

/// `<Method Type.Name>`.
pub fn display_callable(ctx: &BridgeContext, declaring_type: TypeHash, name: &str) -> String {
    let owner = ctx
        .type_info(declaring_type)
        .map(|info| info.simple_name().to_string())
        .unwrap_or_else(|_| declaring_type.to_string());
    format!("<Method {owner}.{name}>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::Fixture;
    use dynbridge_core::{ForeignRuntime, MemberBinding, ParamDescriptor, well_known};
    use proptest::prelude::*;

    fn moves(fx: &Fixture) -> OverloadSet {
        let widget = fx.type_handle("Acme.Widget");
        match fx.ctx.members().resolve(widget.handle(), "Move") {
            Ok(MemberBinding::Overloads(set)) => set,
            other => panic!("expected overloads, got {other:?}"),
        }
    }

    #[test]
    fn first_eligible_candidate_wins() {
        let fx = Fixture::new();
        let set = moves(&fx);
        let resolver = OverloadResolver::new(&fx.ctx, &set);
        assert_eq!(resolver.find_best_match(&[HostValue::Int(1)]), Ok(0));
        // A float still lands on the first numeric overload.
        assert_eq!(resolver.find_best_match(&[HostValue::Float(1.5)]), Ok(0));
        assert_eq!(resolver.find_best_match(&[HostValue::str("a")]), Ok(2));
        assert_eq!(resolver.find_best_match(&[HostValue::None]), Ok(0));
        assert_eq!(
            resolver.find_best_match(&[HostValue::Int(1), HostValue::Int(2)]),
            Ok(3)
        );
    }

    fn single_param_set(params: &[TypeHash]) -> OverloadSet {
        let owner = TypeHash::from_name("Acme.Widget");
        let mut set = OverloadSet::new("Run", owner, None);
        for ty in params {
            set.push(CallableDescriptor::static_method(
                owner,
                "Run",
                vec![ParamDescriptor::new("x", *ty)],
                well_known::VOID,
            ));
        }
        set
    }

    #[test]
    fn numeric_range_is_left_to_conversion() {
        let fx = Fixture::new();
        let set = single_param_set(&[well_known::INT32, well_known::DOUBLE]);
        let resolver = OverloadResolver::new(&fx.ctx, &set);
        assert_eq!(resolver.find_best_match(&[HostValue::Float(2.5)]), Ok(0));

        let set = single_param_set(&[well_known::INT32, well_known::STRING]);
        let resolver = OverloadResolver::new(&fx.ctx, &set);
        assert_eq!(resolver.find_best_match(&[HostValue::Int(1 << 40)]), Ok(0));
        assert!(matches!(
            fx.ctx.invoker().call_overloads(&set, &[HostValue::Int(1 << 40)]),
            Err(BridgeError::InvalidCast { .. })
        ));
    }

    #[test]
    fn dicts_skip_two_argument_delegates() {
        let fx = Fixture::new();
        let args = [well_known::STRING, well_known::INT32];
        let func = fx
            .runtime
            .make_generic_type(TypeHash::from_name("System.Func`2"), &args)
            .unwrap();
        let dictionary = fx
            .runtime
            .make_generic_type(well_known::DICTIONARY, &args)
            .unwrap();
        let set = single_param_set(&[func, dictionary]);
        let dict = HostValue::Dict(vec![(HostValue::str("a"), HostValue::Int(1))]);
        assert_eq!(
            OverloadResolver::new(&fx.ctx, &set).find_best_match(&[dict]),
            Ok(1)
        );
    }

    #[test]
    fn no_candidate_is_no_suitable_overload() {
        let fx = Fixture::new();
        let set = moves(&fx);
        let resolver = OverloadResolver::new(&fx.ctx, &set);
        let err = resolver
            .find_best_match(&[HostValue::Int(1), HostValue::str("b")])
            .unwrap_err();
        assert_eq!(
            err,
            BridgeError::NoSuitableOverload {
                name: "Move".into(),
                args: "int, str".into(),
            }
        );
        assert!(resolver.find_best_match(&[]).is_err());
    }

    #[test]
    fn out_only_parameters_are_not_counted() {
        let fx = Fixture::new();
        let int32 = fx.type_handle("System.Int32");
        let parse = match fx.ctx.members().resolve(int32.handle(), "TryParse") {
            Ok(MemberBinding::Method(bound)) => bound.callable,
            other => panic!("expected TryParse, got {other:?}"),
        };
        let mut set = OverloadSet::new("TryParse", well_known::INT32, None);
        set.push(parse);
        let resolver = OverloadResolver::new(&fx.ctx, &set);
        assert_eq!(resolver.find_best_match(&[HostValue::str("12")]), Ok(0));
        assert!(
            resolver
                .find_best_match(&[HostValue::str("12"), HostValue::Int(0)])
                .is_err()
        );
    }

    #[test]
    fn exact_lookup_round_trips_every_signature() {
        let fx = Fixture::new();
        let set = moves(&fx);
        let resolver = OverloadResolver::new(&fx.ctx, &set);
        for (index, candidate) in set.iter().enumerate() {
            assert_eq!(resolver.find_exact(&candidate.param_types()), Ok(index));
        }
        assert_eq!(
            resolver.find_exact(&[well_known::INT64]),
            Err(BridgeError::NoSuchOverload { name: "Move".into() })
        );
        // Assignable is not enough.
        assert!(resolver.find_exact(&[well_known::OBJECT]).is_err());
    }

    #[test]
    fn positional_selection_is_bounds_checked() {
        let fx = Fixture::new();
        let set = moves(&fx);
        let resolver = OverloadResolver::new(&fx.ctx, &set);
        assert_eq!(resolver.select(3), Ok(3));
        assert_eq!(
            resolver.select(4),
            Err(BridgeError::IndexOutOfRange { index: 4, len: 4 })
        );
        assert!(resolver.select(-1).is_err());
    }

    #[test]
    fn choosing_by_witnesses_or_index() {
        let fx = Fixture::new();
        let set = moves(&fx);
        let resolver = OverloadResolver::new(&fx.ctx, &set);
        let chosen = resolver
            .choose(&OverloadSelector::witnesses([well_known::DOUBLE]))
            .unwrap();
        assert_eq!(chosen.bound().callable.params[0].param_type, well_known::DOUBLE);
        let chosen = resolver.choose(&OverloadSelector::Index(2)).unwrap();
        assert_eq!(chosen.bound().callable.params[0].param_type, well_known::STRING);
    }

    #[test]
    fn witnesses_instantiate_generic_definitions() {
        let fx = Fixture::new();
        let widget = fx.type_handle("Acme.Widget");
        let echo = match fx.ctx.members().resolve(widget.handle(), "Echo") {
            Ok(MemberBinding::Method(bound)) => bound.callable,
            other => panic!("expected Echo, got {other:?}"),
        };
        let mut set = OverloadSet::new("Echo", widget.type_hash(), None);
        set.push(echo);
        let chosen = OverloadResolver::new(&fx.ctx, &set)
            .choose(&OverloadSelector::witnesses([well_known::STRING]))
            .unwrap();
        assert_eq!(chosen.bound().callable.params[0].param_type, well_known::STRING);
        assert_eq!(chosen.bound().callable.return_type, well_known::STRING);
    }

    #[test]
    fn signatures_read_like_declarations() {
        let fx = Fixture::new();
        let method = CallableDescriptor::static_method(
            TypeHash::from_name("Acme.Widget"),
            "TryLookup",
            vec![
                ParamDescriptor::new("key", well_known::INT32),
                ParamDescriptor::out("value", well_known::STRING),
            ],
            well_known::BOOLEAN,
        );
        assert_eq!(
            signature(&fx.ctx, &method),
            "static TryLookup(System.Int32 key, out System.String value) -> System.Boolean"
        );
        assert_eq!(
            display_callable(&fx.ctx, TypeHash::from_name("Acme.Widget"), "Move"),
            "<Method Widget.Move>"
        );
    }

    fn arity_set(arities: &[usize]) -> OverloadSet {
        let owner = TypeHash::from_name("Acme.Widget");
        let mut set = OverloadSet::new("Run", owner, None);
        for arity in arities {
            let params = (0..*arity)
                .map(|i| ParamDescriptor::new(format!("p{i}"), well_known::INT32))
                .collect();
            set.push(CallableDescriptor::static_method(
                owner,
                "Run",
                params,
                well_known::VOID,
            ));
        }
        set
    }

    proptest! {
        #[test]
        fn distinct_arities_select_by_count(
            arities in proptest::sample::subsequence((0usize..6).collect::<Vec<_>>(), 1..6),
            k in 0usize..6,
        ) {
            let fx = Fixture::new();
            let set = arity_set(&arities);
            let args = vec![HostValue::Int(1); k];
            let result = OverloadResolver::new(&fx.ctx, &set).find_best_match(&args);
            match arities.iter().position(|a| *a == k) {
                Some(index) => prop_assert_eq!(result, Ok(index)),
                None => prop_assert!(result.is_err()),
            }
        }

        #[test]
        fn ambiguous_calls_take_the_first_declared(copies in 2usize..5, first in 0usize..3) {
            let fx = Fixture::new();
            let owner = TypeHash::from_name("Acme.Widget");
            let mut set = OverloadSet::new("Run", owner, None);
            for i in 0..(first + copies) {
                let ty = if i < first { well_known::STRING } else { well_known::INT64 };
                set.push(CallableDescriptor::static_method(
                    owner,
                    "Run",
                    vec![ParamDescriptor::new("x", ty)],
                    well_known::VOID,
                ));
            }
            let result = OverloadResolver::new(&fx.ctx, &set).find_best_match(&[HostValue::Int(7)]);
            prop_assert_eq!(result, Ok(first));
        }
    }
}
