//! Error types shared by the checker, the rewriter and the evaluator.
//!
//! # Structured Error Categories
//!
//! [`RuntimeErrorKind`] gives typed categories for everything that can go
//! wrong while executing host code. Factory functions on [`RuntimeError`]
//! populate both `kind` and `message`; the `Display` impl of the kind is the
//! message.
//!
//! [`TypeCheckError`] is the one user-facing failure: a value did not conform
//! to its declared type. It carries the path from the failing element out to
//! the checked argument or return value.

use std::fmt;

use crate::value::Value;

/// A value failed to conform to its declared type.
///
/// The message describes the innermost failure; the path lists the enclosing
/// elements from the inside out (`item 0`, `argument "x" (list)`, ...).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeCheckError {
    message: String,
    path: Vec<String>,
}

impl TypeCheckError {
    pub fn new(message: impl Into<String>) -> Self {
        TypeCheckError {
            message: message.into(),
            path: Vec::new(),
        }
    }

    /// Add an enclosing element to the failure path.
    pub fn append_path_element(&mut self, element: impl Into<String>) {
        self.path.push(element.into());
    }

    /// Builder-style [`Self::append_path_element`].
    #[must_use]
    pub fn with_path_element(mut self, element: impl Into<String>) -> Self {
        self.append_path_element(element);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }
}

impl fmt::Display for TypeCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            return f.write_str(&self.message);
        }
        write!(f, "{} {}", self.path.join(" of "), self.message)
    }
}

impl std::error::Error for TypeCheckError {}

/// An annotation whose shape cannot be turned into a type descriptor.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unsupported annotation {annotation}: {reason}")]
pub struct UnsupportedAnnotationError {
    pub annotation: String,
    pub reason: String,
}

impl UnsupportedAnnotationError {
    pub fn new(annotation: impl Into<String>, reason: impl Into<String>) -> Self {
        UnsupportedAnnotationError {
            annotation: annotation.into(),
            reason: reason.into(),
        }
    }
}

/// Typed error category for host execution.
#[derive(Clone, Debug)]
pub enum RuntimeErrorKind {
    // Checking
    TypeCheck(TypeCheckError),
    UnsupportedAnnotation(UnsupportedAnnotationError),
    /// A check could not run (unresolvable reference under the error policy,
    /// missing checker, `Self` outside a class).
    Check {
        message: String,
    },
    Instrumentation {
        message: String,
    },

    // Access
    NameNotFound {
        name: String,
    },
    AttributeNotFound {
        type_name: String,
        attr: String,
    },
    KeyNotFound {
        key: String,
    },
    IndexOutOfRange {
        index: i64,
    },

    // Calls
    NotCallable {
        type_name: String,
    },
    Arguments {
        function: String,
        message: String,
    },

    // Operations
    NotIterable {
        type_name: String,
    },
    NotSubscriptable {
        type_name: String,
    },
    InvalidOperation {
        op: String,
        left: String,
        right: String,
    },

    // Control
    /// An exception raised by host code.
    Raised {
        value: Value,
    },
    /// A lazily-produced sequence was resumed after it finished.
    Exhausted {
        value: Value,
    },

    Import {
        module: String,
        message: String,
    },

    Custom {
        message: String,
    },
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeCheck(err) => write!(f, "{err}"),
            Self::UnsupportedAnnotation(err) => write!(f, "{err}"),
            Self::Check { message }
            | Self::Instrumentation { message }
            | Self::Custom { message } => f.write_str(message),

            Self::NameNotFound { name } => write!(f, "name '{name}' is not defined"),
            Self::AttributeNotFound { type_name, attr } => {
                write!(f, "'{type_name}' object has no attribute '{attr}'")
            }
            Self::KeyNotFound { key } => write!(f, "key not found: {key}"),
            Self::IndexOutOfRange { index } => write!(f, "index {index} out of range"),

            Self::NotCallable { type_name } => write!(f, "'{type_name}' object is not callable"),
            Self::Arguments { function, message } => write!(f, "{function}() {message}"),

            Self::NotIterable { type_name } => write!(f, "'{type_name}' object is not iterable"),
            Self::NotSubscriptable { type_name } => {
                write!(f, "'{type_name}' object is not subscriptable")
            }
            Self::InvalidOperation { op, left, right } => write!(
                f,
                "unsupported operand type(s) for {op}: '{left}' and '{right}'"
            ),

            Self::Raised { value } => write!(f, "{}", value.exception_text()),
            Self::Exhausted { .. } => f.write_str("StopIteration"),

            Self::Import { module, message } => {
                write!(f, "cannot import module '{module}': {message}")
            }
        }
    }
}

/// Host execution error.
#[derive(Clone, Debug)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub message: String,
}

/// Result of host execution.
pub type RuntimeResult = Result<Value, RuntimeError>;

impl RuntimeError {
    /// Create an error with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::from_kind(RuntimeErrorKind::Custom {
            message: message.into(),
        })
    }

    pub fn from_kind(kind: RuntimeErrorKind) -> Self {
        let message = kind.to_string();
        RuntimeError { kind, message }
    }

    /// The wrapped type-check failure, if this is one.
    pub fn as_type_check(&self) -> Option<&TypeCheckError> {
        match &self.kind {
            RuntimeErrorKind::TypeCheck(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_type_check(&self) -> bool {
        self.as_type_check().is_some()
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RuntimeError {}

impl From<TypeCheckError> for RuntimeError {
    fn from(err: TypeCheckError) -> Self {
        Self::from_kind(RuntimeErrorKind::TypeCheck(err))
    }
}

impl From<UnsupportedAnnotationError> for RuntimeError {
    fn from(err: UnsupportedAnnotationError) -> Self {
        Self::from_kind(RuntimeErrorKind::UnsupportedAnnotation(err))
    }
}

// Factory functions

#[cold]
pub fn name_not_found(name: &str) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::NameNotFound {
        name: name.to_string(),
    })
}

#[cold]
pub fn attribute_not_found(type_name: &str, attr: &str) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::AttributeNotFound {
        type_name: type_name.to_string(),
        attr: attr.to_string(),
    })
}

#[cold]
pub fn key_not_found(key: &Value) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::KeyNotFound { key: key.repr() })
}

#[cold]
pub fn index_out_of_range(index: i64) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::IndexOutOfRange { index })
}

#[cold]
pub fn not_callable(value: &Value) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::NotCallable {
        type_name: value.type_name(),
    })
}

#[cold]
pub fn bad_arguments(function: &str, message: impl Into<String>) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::Arguments {
        function: function.to_string(),
        message: message.into(),
    })
}

#[cold]
pub fn not_iterable(value: &Value) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::NotIterable {
        type_name: value.type_name(),
    })
}

#[cold]
pub fn not_subscriptable(value: &Value) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::NotSubscriptable {
        type_name: value.type_name(),
    })
}

#[cold]
pub fn invalid_operation(op: &str, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::InvalidOperation {
        op: op.to_string(),
        left: left.type_name(),
        right: right.type_name(),
    })
}

#[cold]
pub fn raised(value: Value) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::Raised { value })
}

#[cold]
pub fn exhausted(value: Value) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::Exhausted { value })
}

#[cold]
pub fn check_failed(message: impl Into<String>) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::Check {
        message: message.into(),
    })
}

#[cold]
pub fn instrumentation_failed(message: impl Into<String>) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::Instrumentation {
        message: message.into(),
    })
}

#[cold]
pub fn import_failed(module: &str, message: impl Into<String>) -> RuntimeError {
    RuntimeError::from_kind(RuntimeErrorKind::Import {
        module: module.to_string(),
        message: message.into(),
    })
}

#[cfg(test)]
mod tests;
