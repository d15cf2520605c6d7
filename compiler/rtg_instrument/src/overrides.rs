//! Per-function policies from decorator keywords.
//!
//! `@typechecked(collection_check_strategy=..., forward_ref_policy=...)`
//! bakes its policies into the function's check plan. Values are written
//! either as the policy member (`CollectionCheckStrategy.ALL_ITEMS`) or as
//! its name in a string.

use rtg_ir::{
    print_expr, CollectionCheckStrategy, ExprId, ExprKind, ExprRange, ForwardRefPolicy, IrArena,
    PlanOverrides,
};

use crate::error::InstrumentationError;
use crate::names::{NameScopes, TYPECHECKED_NAMES};

const COLLECTION_CHECK_STRATEGY: &str = "collection_check_strategy";
const FORWARD_REF_POLICY: &str = "forward_ref_policy";

/// Collect the policies named by the function's checking decorator.
pub(crate) fn parse_overrides(
    arena: &IrArena,
    names: &NameScopes,
    decorators: ExprRange,
    function: &str,
) -> Result<PlanOverrides, InstrumentationError> {
    let mut overrides = PlanOverrides::default();
    for decorator in arena.expr_list(decorators) {
        let ExprKind::Call { func, keywords, .. } = arena.expr(*decorator) else {
            continue;
        };
        if !names.matches(arena, func, &TYPECHECKED_NAMES) {
            continue;
        }
        for keyword in arena.keywords(keywords) {
            let option = keyword.name.as_str();
            let member = member_name(arena, keyword.value);
            let invalid = || InstrumentationError::InvalidOverride {
                function: function.to_string(),
                option: option.to_string(),
                value: print_expr(arena, keyword.value),
            };
            match option {
                COLLECTION_CHECK_STRATEGY => {
                    let strategy = member
                        .and_then(CollectionCheckStrategy::from_name)
                        .ok_or_else(invalid)?;
                    overrides.collection_check_strategy = Some(strategy);
                }
                FORWARD_REF_POLICY => {
                    let policy = member.and_then(ForwardRefPolicy::from_name).ok_or_else(invalid)?;
                    overrides.forward_ref_policy = Some(policy);
                }
                _ => return Err(invalid()),
            }
        }
    }
    Ok(overrides)
}

/// `Enum.MEMBER` or `'MEMBER'`.
fn member_name(arena: &IrArena, expr: ExprId) -> Option<&'static str> {
    match arena.expr(expr) {
        ExprKind::Attribute { attr, .. } => Some(attr.as_str()),
        ExprKind::Str(text) | ExprKind::Name(text) => Some(text.as_str()),
        _ => None,
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rtg_ir::{IrBuilder, Module};

    fn decorated(keywords: &[(&str, &str)]) -> (Module, ExprRange, NameScopes) {
        let mut b = IrBuilder::new();
        let import = b.import_from("rtguard", &[("typechecked", None)]);
        let func = b.name("typechecked");
        let values: Vec<(&str, ExprId)> = keywords
            .iter()
            .map(|(name, value)| {
                let value = if let Some(member) = value.strip_prefix('\'') {
                    b.str(member.trim_end_matches('\''))
                } else {
                    b.path(value)
                };
                (*name, value)
            })
            .collect();
        let call = b.call(func, &[], &values);
        let decorators = b.arena_mut().push_expr_list(&[call]);
        let module = b.finish("m", &[import]);
        let mut names = NameScopes::new();
        names.record(&module.arena, module.arena.stmt(import));
        (module, decorators, names)
    }

    #[test]
    fn test_member_and_string_values() {
        let (module, decorators, names) = decorated(&[
            ("collection_check_strategy", "CollectionCheckStrategy.ALL_ITEMS"),
            ("forward_ref_policy", "'ERROR'"),
        ]);
        let overrides = parse_overrides(&module.arena, &names, decorators, "f").unwrap();
        assert_eq!(
            overrides,
            PlanOverrides {
                collection_check_strategy: Some(CollectionCheckStrategy::AllItems),
                forward_ref_policy: Some(ForwardRefPolicy::Error),
            }
        );
    }

    #[test]
    fn test_bare_call_has_no_overrides() {
        let (module, decorators, names) = decorated(&[]);
        let overrides = parse_overrides(&module.arena, &names, decorators, "f").unwrap();
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_unknown_member_is_rejected() {
        let (module, decorators, names) =
            decorated(&[("forward_ref_policy", "ForwardRefPolicy.SOMETIMES")]);
        let err = parse_overrides(&module.arena, &names, decorators, "f").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid forward_ref_policy for f: ForwardRefPolicy.SOMETIMES"
        );
    }

    #[test]
    fn test_unknown_keyword_is_rejected() {
        let (module, decorators, names) = decorated(&[("debug_instrumentation", "True")]);
        assert!(matches!(
            parse_overrides(&module.arena, &names, decorators, "f"),
            Err(InstrumentationError::InvalidOverride { .. })
        ));
    }
}
