//! Errors produced while checking a value.

use rtg_types::{
    check_failed, RuntimeError, RuntimeErrorKind, TypeCheckError, UnsupportedAnnotationError,
};

/// Why a check did not pass.
///
/// Only [`CheckError::TypeCheck`] means the value is wrong; every other
/// variant means the check itself could not be carried out.
#[derive(Clone, Debug, thiserror::Error)]
pub enum CheckError {
    #[error("{0}")]
    TypeCheck(TypeCheckError),

    #[error(transparent)]
    UnsupportedAnnotation(#[from] UnsupportedAnnotationError),

    /// No registered lookup produced a checker for the descriptor.
    #[error("no checker is registered for {desc}")]
    UnsupportedType { desc: String },

    /// A deferred reference could not be resolved under the error policy.
    #[error("cannot resolve forward reference {source_text:?}: {reason}")]
    ForwardRef { source_text: String, reason: String },

    /// `Self` was checked outside of any class context.
    #[error("'Self' used outside of a class context")]
    SelfWithoutContext,

    /// Host code run by a check (a property getter, annotation evaluation)
    /// failed.
    #[error("{0}")]
    Runtime(RuntimeError),
}

impl CheckError {
    pub fn as_type_check(&self) -> Option<&TypeCheckError> {
        match self {
            CheckError::TypeCheck(err) => Some(err),
            _ => None,
        }
    }

    /// Add an enclosing element to the path of a type-check failure.
    /// Other variants carry no path and pass through unchanged.
    #[must_use]
    pub fn with_path_element(mut self, element: impl Into<String>) -> Self {
        if let CheckError::TypeCheck(err) = &mut self {
            err.append_path_element(element);
        }
        self
    }
}

impl From<TypeCheckError> for CheckError {
    fn from(err: TypeCheckError) -> Self {
        CheckError::TypeCheck(err)
    }
}

impl From<RuntimeError> for CheckError {
    fn from(err: RuntimeError) -> Self {
        match err.kind {
            RuntimeErrorKind::TypeCheck(err) => CheckError::TypeCheck(err),
            RuntimeErrorKind::UnsupportedAnnotation(err) => CheckError::UnsupportedAnnotation(err),
            _ => CheckError::Runtime(err),
        }
    }
}

impl From<CheckError> for RuntimeError {
    fn from(err: CheckError) -> Self {
        match err {
            CheckError::TypeCheck(err) => err.into(),
            CheckError::UnsupportedAnnotation(err) => err.into(),
            CheckError::Runtime(err) => err,
            other => check_failed(other.to_string()),
        }
    }
}

/// Shorthand for a fresh type-check failure.
#[cold]
pub(crate) fn mismatch(message: impl Into<String>) -> CheckError {
    CheckError::TypeCheck(TypeCheckError::new(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rtg_types::name_not_found;

    #[test]
    fn test_path_elements_only_touch_type_check_failures() {
        let err = mismatch("is not a list").with_path_element("item 0");
        assert_eq!(err.to_string(), "item 0 is not a list");

        let err = CheckError::SelfWithoutContext.with_path_element("item 0");
        assert_eq!(err.to_string(), "'Self' used outside of a class context");
    }

    #[test]
    fn test_runtime_round_trip_keeps_type_check_kind() {
        let runtime: RuntimeError = mismatch("is not a dict").into();
        assert!(runtime.is_type_check());
        let back = CheckError::from(runtime);
        assert!(back.as_type_check().is_some());
    }

    #[test]
    fn test_other_failures_become_check_kind() {
        let runtime: RuntimeError = CheckError::UnsupportedType {
            desc: "Foo".into(),
        }
        .into();
        assert!(matches!(runtime.kind, RuntimeErrorKind::Check { .. }));
        assert_eq!(runtime.message, "no checker is registered for Foo");

        let host = CheckError::from(name_not_found("x"));
        assert!(matches!(host, CheckError::Runtime(_)));
    }
}
