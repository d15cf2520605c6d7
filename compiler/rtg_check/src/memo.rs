//! Resolution context.
//!
//! A [`TypeCheckMemo`] is created for one checked call (or one direct
//! check) and dropped when it returns. It snapshots the configuration and
//! the checker registry, so later changes to either never affect a check in
//! flight, and it caches every deferred reference it resolves.

use rustc_hash::FxHashMap;
use rtg_ir::{ForwardRefPolicy, Name};
use rtg_types::{
    build_descriptor_in, evaluate_annotation, ClassRef, NameLookup, Origin, RuntimeErrorKind,
    ScopeHandle, TypeDesc,
};

use crate::config::TypeCheckConfiguration;
use crate::diagnostics::{emit, Diagnostic};
use crate::errors::CheckError;
use crate::registry::{checker_lookups, LookupRef};

/// Per-check resolution context.
pub struct TypeCheckMemo {
    /// Scope deferred references without a scope of their own resolve in.
    pub scope: Option<ScopeHandle>,
    pub config: TypeCheckConfiguration,
    /// Class `Self` stands for.
    pub self_type: Option<ClassRef>,
    lookups: Vec<LookupRef>,
    /// `None` marks a reference that failed and was accepted by policy.
    resolved: FxHashMap<(Name, usize), Option<TypeDesc>>,
}

impl TypeCheckMemo {
    pub fn new(scope: Option<ScopeHandle>, config: TypeCheckConfiguration) -> Self {
        TypeCheckMemo {
            scope,
            config,
            self_type: None,
            lookups: checker_lookups(),
            resolved: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn with_self_type(mut self, self_type: Option<ClassRef>) -> Self {
        self.self_type = self_type;
        self
    }

    /// Lookups captured when the memo was created.
    pub fn lookups(&self) -> &[LookupRef] {
        &self.lookups
    }

    /// Run `f` with `Self` bound to `class`, restoring the previous binding.
    pub(crate) fn with_self<T>(&mut self, class: &ClassRef, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = self.self_type.replace(class.clone());
        let out = f(self);
        self.self_type = previous;
        out
    }

    /// Resolve a deferred reference, once per memo.
    ///
    /// Returns `Ok(None)` when the reference cannot be resolved and the
    /// forward-reference policy accepts the value anyway.
    pub fn resolve_deferred(
        &mut self,
        source: Name,
        scope: Option<&ScopeHandle>,
    ) -> Result<Option<TypeDesc>, CheckError> {
        let scope = scope.or(self.scope.as_ref()).cloned();
        let key = (source, scope.as_ref().map_or(0, ScopeHandle::key));
        if let Some(cached) = self.resolved.get(&key) {
            return Ok(cached.clone());
        }

        let lookup: Option<&dyn NameLookup> = scope.as_ref().map(|s| s.0.as_ref());
        let failure = match evaluate_annotation(source.as_str(), lookup) {
            Ok(value) => {
                let desc = build_descriptor_in(&value, scope.as_ref())?;
                let refers_to_itself = matches!(
                    &desc.origin,
                    Origin::Deferred { source: again, .. } if *again == source
                );
                if !refers_to_itself {
                    tracing::trace!(reference = %source, resolved = %desc, "resolved forward reference");
                    self.resolved.insert(key, Some(desc.clone()));
                    return Ok(Some(desc));
                }
                "reference resolves to itself".to_string()
            }
            Err(err) => {
                if !matches!(
                    err.kind,
                    RuntimeErrorKind::NameNotFound { .. } | RuntimeErrorKind::AttributeNotFound { .. }
                ) {
                    return Err(err.into());
                }
                err.message
            }
        };

        match self.config.forward_ref_policy {
            ForwardRefPolicy::Error => Err(CheckError::ForwardRef {
                source_text: source.as_str().to_string(),
                reason: failure,
            }),
            ForwardRefPolicy::Warn => {
                emit(&Diagnostic::ForwardRef {
                    reference: source.as_str().to_string(),
                    reason: failure,
                });
                self.resolved.insert(key, None);
                Ok(None)
            }
            ForwardRefPolicy::Ignore => {
                self.resolved.insert(key, None);
                Ok(None)
            }
        }
    }
}

impl Default for TypeCheckMemo {
    fn default() -> Self {
        TypeCheckMemo::new(None, TypeCheckConfiguration::default())
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use crate::diagnostics::{set_diagnostic_sink, CollectingSink};
    use crate::test_support;
    use pretty_assertions::assert_eq;
    use rtg_types::{builtin_class, BuiltinKind, StaticScope, Value};
    use std::sync::Arc;

    fn scope_with_node() -> ScopeHandle {
        let node = builtin_class(BuiltinKind::Int);
        ScopeHandle::new(
            StaticScope::new("mod", [(Name::intern("Node"), Value::Class(node))]).into_ref(),
        )
    }

    #[test]
    fn test_resolves_in_memo_scope_and_caches() {
        let mut memo = TypeCheckMemo::new(Some(scope_with_node()), TypeCheckConfiguration::default());
        let first = memo.resolve_deferred(Name::intern("Node"), None).unwrap();
        assert_eq!(first.map(|d| d.to_string()), Some("int".to_string()));
        assert_eq!(memo.resolved.len(), 1);
        let again = memo.resolve_deferred(Name::intern("Node"), None).unwrap();
        assert!(again.is_some());
        assert_eq!(memo.resolved.len(), 1);
    }

    #[test]
    fn test_error_policy_fails() {
        let config = TypeCheckConfiguration {
            forward_ref_policy: ForwardRefPolicy::Error,
            ..TypeCheckConfiguration::default()
        };
        let mut memo = TypeCheckMemo::new(None, config);
        let err = memo
            .resolve_deferred(Name::intern("Missing"), None)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot resolve forward reference \"Missing\": name 'Missing' is not defined"
        );
    }

    #[test]
    fn test_warn_policy_reports_once() {
        let _serial = test_support::exclusive();
        let sink = Arc::new(CollectingSink::default());
        let previous = set_diagnostic_sink(sink.clone());
        let mut memo = TypeCheckMemo::default();
        assert!(memo
            .resolve_deferred(Name::intern("Missing"), None)
            .unwrap()
            .is_none());
        assert!(memo
            .resolve_deferred(Name::intern("Missing"), None)
            .unwrap()
            .is_none());
        set_diagnostic_sink(previous);
        assert_eq!(sink.take().len(), 1);
    }

    #[test]
    fn test_ignore_policy_is_silent() {
        let config = TypeCheckConfiguration {
            forward_ref_policy: ForwardRefPolicy::Ignore,
            ..TypeCheckConfiguration::default()
        };
        let mut memo = TypeCheckMemo::new(None, config);
        assert!(memo
            .resolve_deferred(Name::intern("Missing"), None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_with_self_restores_binding() {
        let mut memo = TypeCheckMemo::default();
        let int = builtin_class(BuiltinKind::Int);
        let inside = memo.with_self(&int, |m| m.self_type.clone());
        assert_eq!(inside, Some(int));
        assert!(memo.self_type.is_none());
    }
}
