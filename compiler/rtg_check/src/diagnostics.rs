//! Non-fatal conditions reported while checking or instrumenting.
//!
//! The default sink forwards everything to `tracing`. Embedders replace it
//! with [`set_diagnostic_sink`] to collect diagnostics themselves.

use std::fmt;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;

/// A non-fatal condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// A deferred reference could not be resolved under the warn policy.
    ForwardRef { reference: String, reason: String },
    /// A check failure reported instead of raised.
    TypeCheckWarning { message: String },
    /// Rewritten code printed for debugging.
    InstrumentationDump { module: String, text: String },
    /// A plugin could not be loaded.
    Plugin { name: String, message: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::ForwardRef { reference, reason } => {
                write!(f, "Cannot resolve forward reference {reference:?}: {reason}")
            }
            Diagnostic::TypeCheckWarning { message } => f.write_str(message),
            Diagnostic::InstrumentationDump { module, text } => {
                write!(f, "Source code of {module:?} after instrumentation:\n{text}")
            }
            Diagnostic::Plugin { name, message } => {
                write!(f, "Failed to load plugin {name:?}: {message}")
            }
        }
    }
}

/// Receives diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to `tracing` as warnings; instrumentation dumps go
/// to the `rtguard::instrumentation` target at info level.
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::InstrumentationDump { module, text } => {
                tracing::info!(target: "rtguard::instrumentation", module = %module, "\n{text}");
            }
            other => tracing::warn!("{other}"),
        }
    }
}

static SINK: LazyLock<RwLock<Arc<dyn DiagnosticSink>>> =
    LazyLock::new(|| RwLock::new(Arc::new(TracingSink)));

/// Replace the process-wide sink, returning the previous one.
pub fn set_diagnostic_sink(sink: Arc<dyn DiagnosticSink>) -> Arc<dyn DiagnosticSink> {
    std::mem::replace(&mut *SINK.write(), sink)
}

/// Report a diagnostic to the current sink.
pub fn emit(diagnostic: &Diagnostic) {
    let sink = Arc::clone(&SINK.read());
    sink.report(diagnostic);
}

/// A sink that keeps every diagnostic. Useful in tests.
#[derive(Default)]
pub struct CollectingSink {
    collected: parking_lot::Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.collected.lock())
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.collected.lock().push(diagnostic.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sink_replacement_collects() {
        let _serial = test_support::exclusive();
        let sink = Arc::new(CollectingSink::default());
        let previous = set_diagnostic_sink(sink.clone());
        emit(&Diagnostic::TypeCheckWarning {
            message: "x".into(),
        });
        set_diagnostic_sink(previous);
        assert_eq!(
            sink.take(),
            vec![Diagnostic::TypeCheckWarning {
                message: "x".into()
            }]
        );
    }

    #[test]
    fn test_forward_ref_text() {
        let d = Diagnostic::ForwardRef {
            reference: "Node".into(),
            reason: "name 'Node' is not defined".into(),
        };
        assert_eq!(
            d.to_string(),
            "Cannot resolve forward reference \"Node\": name 'Node' is not defined"
        );
    }
}
