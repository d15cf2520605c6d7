//! Instrumentation errors.
//!
//! Instrumentation fails closed: anything the rewriter cannot handle
//! safely is an error, never a silently unchecked function.

use rtg_types::{instrumentation_failed, RuntimeError, UnsupportedAnnotationError};
use thiserror::Error;

/// Why a module or function could not be instrumented.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InstrumentationError {
    #[error("module {module} carries IR version {found}, expected {expected}")]
    IrVersion {
        module: String,
        found: u32,
        expected: u32,
    },

    #[error("cannot instrument {function}: {construct} is not supported")]
    UnsupportedConstruct { function: String, construct: String },

    #[error("cannot instrument {function}: empty {block} block")]
    EmptyBlock {
        function: String,
        block: &'static str,
    },

    #[error("invalid {option} for {function}: {value}")]
    InvalidOverride {
        function: String,
        option: String,
        value: String,
    },

    #[error("{function} is already instrumented")]
    AlreadyInstrumented { function: String },

    #[error("{type_name} object cannot be instrumented")]
    NotAFunction { type_name: String },

    #[error(transparent)]
    Annotation(#[from] UnsupportedAnnotationError),
}

impl From<InstrumentationError> for RuntimeError {
    fn from(err: InstrumentationError) -> Self {
        match err {
            InstrumentationError::Annotation(inner) => inner.into(),
            other => instrumentation_failed(other.to_string()),
        }
    }
}
