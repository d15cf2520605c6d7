//! Process-wide suppression of type checks.
//!
//! Suppression is a counter, not a flag: nested scopes compose, and checks
//! resume only when the outermost scope exits. The counter is shared by all
//! threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rtg_types::{
    call_value, CallArgs, FunctionMarks, FunctionValue, Invoke, Name, RuntimeResult, Signature,
    Value,
};

static SUPPRESSION_DEPTH: AtomicUsize = AtomicUsize::new(0);

/// Keeps checks suppressed while alive.
#[must_use = "checks are only suppressed while the guard is alive"]
pub struct SuppressionGuard {
    _private: (),
}

impl Drop for SuppressionGuard {
    fn drop(&mut self) {
        let previous = SUPPRESSION_DEPTH.fetch_sub(1, Ordering::SeqCst);
        tracing::trace!(depth = previous - 1, "leaving suppressed scope");
    }
}

/// Suppress all type checks until the returned guard is dropped.
pub fn suppress_type_checks() -> SuppressionGuard {
    let previous = SUPPRESSION_DEPTH.fetch_add(1, Ordering::SeqCst);
    tracing::trace!(depth = previous + 1, "entering suppressed scope");
    SuppressionGuard { _private: () }
}

/// Whether checks are currently suppressed.
#[inline]
pub fn type_checks_suppressed() -> bool {
    SUPPRESSION_DEPTH.load(Ordering::SeqCst) > 0
}

/// Run `f` with checks suppressed.
pub fn suppressed<T>(f: impl FnOnce() -> T) -> T {
    let _guard = suppress_type_checks();
    f()
}

struct SuppressingBody {
    target: Value,
}

impl Invoke for SuppressingBody {
    fn invoke(&self, _func: &FunctionValue, args: CallArgs) -> RuntimeResult {
        suppressed(|| call_value(&self.target, args))
    }
}

/// A callable that runs `func` with checks suppressed.
///
/// The wrapper keeps the name, annotations and documentation of `func`.
pub fn suppress_wrapper(func: Value) -> Value {
    let mut wrapper = match &func {
        Value::Function(inner) => {
            let mut wrapper = FunctionValue::clone(inner);
            wrapper.body = Arc::new(SuppressingBody {
                target: func.clone(),
            });
            wrapper.marks.remove(FunctionMarks::INSTRUMENTED);
            wrapper
        }
        other => FunctionValue::new(
            Name::intern("suppressed"),
            Signature::variadic(),
            Arc::new(SuppressingBody {
                target: other.clone(),
            }),
        ),
    };
    wrapper.lazy = None;
    wrapper.wrapped = Some(func);
    Value::function(wrapper)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn test_suppression_nests_by_count() {
        let _serial = test_support::exclusive();
        assert!(!type_checks_suppressed());
        let outer = suppress_type_checks();
        let inner = suppress_type_checks();
        drop(inner);
        assert!(type_checks_suppressed());
        drop(outer);
        assert!(!type_checks_suppressed());
    }

    fn report(_args: CallArgs) -> RuntimeResult {
        Ok(Value::Bool(type_checks_suppressed()))
    }

    #[test]
    fn test_wrapper_suppresses_during_call_only() {
        let _serial = test_support::exclusive();
        let wrapped = suppress_wrapper(Value::native("report", report));
        let inside = call_value(&wrapped, CallArgs::default()).unwrap();
        assert!(inside.is_truthy());
        assert!(!type_checks_suppressed());
        let Value::Function(func) = &wrapped else {
            panic!("expected function");
        };
        assert_eq!(func.name, Name::intern("report"));
    }
}
