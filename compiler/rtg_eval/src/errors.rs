//! Evaluator and loader errors.
//!
//! Host execution fails with [`RuntimeError`]; the factories here cover the
//! conditions only the evaluator can hit. Loading a module fails with
//! [`LoaderError`], which converts into the host's import failure.

use rtg_instrument::InstrumentationError;
use rtg_types::{import_failed, RuntimeError, Value};

/// Why a module could not be loaded.
#[derive(Clone, Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("no module named '{module}'")]
    NotFound { module: String },
    #[error("cannot instrument module '{module}': {source}")]
    Instrumentation {
        module: String,
        #[source]
        source: InstrumentationError,
    },
    #[error("error while executing module '{module}': {source}")]
    Execution {
        module: String,
        #[source]
        source: RuntimeError,
    },
}

impl LoaderError {
    pub fn module(&self) -> &str {
        match self {
            LoaderError::NotFound { module }
            | LoaderError::Instrumentation { module, .. }
            | LoaderError::Execution { module, .. } => module,
        }
    }
}

impl From<LoaderError> for RuntimeError {
    fn from(err: LoaderError) -> Self {
        match err {
            // Failures raised by module code propagate unchanged.
            LoaderError::Execution { source, .. } => source,
            LoaderError::NotFound { module } => import_failed(&module, "module not found"),
            LoaderError::Instrumentation { module, source } => {
                let mut err = RuntimeError::from(source);
                err.message = format!("cannot instrument module '{module}': {}", err.message);
                err
            }
        }
    }
}

#[cold]
pub fn unsupported_construct(description: &str) -> RuntimeError {
    RuntimeError::new(format!("cannot execute {description}"))
}

#[cold]
pub fn bare_raise() -> RuntimeError {
    RuntimeError::new("no active exception to re-raise")
}

#[cold]
pub fn not_an_exception(value: &Value) -> RuntimeError {
    RuntimeError::new(format!(
        "exceptions must derive from BaseException, not '{}'",
        value.type_name()
    ))
}

#[cold]
pub fn yield_outside_sequence() -> RuntimeError {
    RuntimeError::new("'yield' outside a lazily-produced sequence")
}

#[cold]
pub fn check_outside_call() -> RuntimeError {
    RuntimeError::new("injected check executed outside an instrumented call")
}

#[cold]
pub fn sequence_closed() -> RuntimeError {
    RuntimeError::new("lazily-produced sequence was closed")
}

#[cold]
pub fn integer_overflow(op: &str) -> RuntimeError {
    RuntimeError::new(format!("integer overflow in {op}"))
}
