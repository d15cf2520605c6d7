//! Function values, signatures and argument binding.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use rtg_ir::{LazyKind, Name, ParamKind};
use smallvec::SmallVec;

use super::Value;
use crate::errors::{bad_arguments, RuntimeError, RuntimeResult};
use crate::scope::ScopeRef;

bitflags! {
    /// Side markers on a function value.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FunctionMarks: u8 {
        /// Body was rewritten with injected checks.
        const INSTRUMENTED = 1;
        /// Value is a generated checking wrapper around another function.
        const WRAPPED = 1 << 1;
        /// Opted out of instrumentation.
        const NO_CHECK = 1 << 2;
    }
}

/// Arguments of one call, before binding.
#[derive(Clone, Debug, Default)]
pub struct CallArgs {
    pub positional: SmallVec<[Value; 4]>,
    pub keywords: Vec<(Name, Value)>,
}

impl CallArgs {
    pub fn new(positional: impl IntoIterator<Item = Value>) -> Self {
        CallArgs {
            positional: positional.into_iter().collect(),
            keywords: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_keyword(mut self, name: &str, value: Value) -> Self {
        self.keywords.push((Name::intern(name), value));
        self
    }

    /// Insert a leading positional argument (a method receiver).
    #[must_use]
    pub fn prepend(mut self, value: Value) -> Self {
        self.positional.insert(0, value);
        self
    }

    /// Positional argument `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    /// Keyword argument `name`, if present.
    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keywords
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, v)| v)
    }
}

/// One parameter of a callable's signature.
#[derive(Clone, Debug)]
pub struct SigParam {
    pub name: Name,
    pub kind: ParamKind,
    pub default: Option<Value>,
}

impl SigParam {
    pub fn new(name: &str, kind: ParamKind) -> Self {
        SigParam {
            name: Name::intern(name),
            kind,
            default: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn is_positional(&self) -> bool {
        matches!(
            self.kind,
            ParamKind::PositionalOnly | ParamKind::PositionalOrKeyword
        )
    }
}

/// Arguments bound to parameter names, in declaration order.
///
/// `*args` are bound as a tuple and `**kwargs` as a dict with string keys.
#[derive(Clone, Debug, Default)]
pub struct BoundArguments {
    pub values: Vec<(Name, Value)>,
}

impl BoundArguments {
    pub fn get(&self, name: Name) -> Option<&Value> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

/// A callable's parameter list.
#[derive(Clone, Debug, Default)]
pub struct Signature {
    pub params: Vec<SigParam>,
}

impl Signature {
    pub fn new(params: Vec<SigParam>) -> Self {
        Signature { params }
    }

    /// `(*args, **kwargs)`.
    pub fn variadic() -> Self {
        Signature::new(vec![
            SigParam::new("args", ParamKind::VarPositional),
            SigParam::new("kwargs", ParamKind::VarKeyword),
        ])
    }

    pub fn param(&self, name: Name) -> Option<&SigParam> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Positional parameters that have no default.
    pub fn required_positional(&self) -> usize {
        self.params
            .iter()
            .filter(|p| p.is_positional() && p.default.is_none())
            .count()
    }

    /// Most positional arguments accepted, `None` when `*args` is present.
    pub fn max_positional(&self) -> Option<usize> {
        if self
            .params
            .iter()
            .any(|p| p.kind == ParamKind::VarPositional)
        {
            return None;
        }
        Some(self.params.iter().filter(|p| p.is_positional()).count())
    }

    /// Whether some keyword-only parameter has no default.
    pub fn has_required_keyword_only(&self) -> bool {
        self.params
            .iter()
            .any(|p| p.kind == ParamKind::KeywordOnly && p.default.is_none())
    }

    /// The signature left after `positional` leading arguments and the named
    /// keywords are supplied in advance (bound methods, partials).
    pub fn without_supplied(&self, positional: usize, keywords: &[Name]) -> Signature {
        let mut skipped = 0;
        let params = self
            .params
            .iter()
            .filter(|p| {
                if p.is_positional() && skipped < positional {
                    skipped += 1;
                    return false;
                }
                !keywords.contains(&p.name)
            })
            .cloned()
            .collect();
        Signature { params }
    }

    /// Bind call arguments to parameters.
    pub fn bind(&self, function: &str, args: CallArgs) -> Result<BoundArguments, RuntimeError> {
        let mut slots: Vec<Option<Value>> = vec![None; self.params.len()];
        let mut extra_positional = Vec::new();
        let mut extra_keywords = Vec::new();

        let mut positional = args.positional.into_iter();
        for (slot, param) in slots.iter_mut().zip(&self.params) {
            if !param.is_positional() {
                continue;
            }
            match positional.next() {
                Some(value) => *slot = Some(value),
                None => break,
            }
        }
        extra_positional.extend(positional);
        let var_positional = self
            .params
            .iter()
            .position(|p| p.kind == ParamKind::VarPositional);
        if !extra_positional.is_empty() && var_positional.is_none() {
            let max = self.params.iter().filter(|p| p.is_positional()).count();
            return Err(bad_arguments(
                function,
                format!(
                    "takes {max} positional arguments but {} were given",
                    max + extra_positional.len()
                ),
            ));
        }

        let var_keyword = self
            .params
            .iter()
            .position(|p| p.kind == ParamKind::VarKeyword);
        for (name, value) in args.keywords {
            let target = self.params.iter().position(|p| {
                p.name == name
                    && matches!(
                        p.kind,
                        ParamKind::PositionalOrKeyword | ParamKind::KeywordOnly
                    )
            });
            match target {
                Some(index) if slots[index].is_some() => {
                    return Err(bad_arguments(
                        function,
                        format!("got multiple values for argument '{name}'"),
                    ));
                }
                Some(index) => slots[index] = Some(value),
                None if var_keyword.is_some() => {
                    extra_keywords.push((Value::string(name.as_str()), value));
                }
                None => {
                    return Err(bad_arguments(
                        function,
                        format!("got an unexpected keyword argument '{name}'"),
                    ));
                }
            }
        }

        let mut values = Vec::with_capacity(self.params.len());
        for (slot, param) in slots.into_iter().zip(&self.params) {
            let value = match param.kind {
                ParamKind::VarPositional => Value::tuple(std::mem::take(&mut extra_positional)),
                ParamKind::VarKeyword => Value::dict(std::mem::take(&mut extra_keywords)),
                _ => match slot.or_else(|| param.default.clone()) {
                    Some(value) => value,
                    None => {
                        return Err(bad_arguments(
                            function,
                            format!("missing required argument: '{}'", param.name),
                        ));
                    }
                },
            };
            values.push((param.name, value));
        }
        Ok(BoundArguments { values })
    }
}

/// Body of a callable.
pub trait Invoke: Send + Sync {
    fn invoke(&self, func: &FunctionValue, args: CallArgs) -> RuntimeResult;

    /// Lets a host recognise bodies it created.
    fn as_any(&self) -> Option<&dyn std::any::Any> {
        None
    }
}

/// A builtin implemented in Rust. Receives the raw call arguments.
pub type NativeFn = fn(CallArgs) -> RuntimeResult;

struct NativeBody(NativeFn);

impl Invoke for NativeBody {
    fn invoke(&self, _func: &FunctionValue, args: CallArgs) -> RuntimeResult {
        (self.0)(args)
    }
}

/// A function value: signature, declared metadata and a body.
#[derive(Clone)]
pub struct FunctionValue {
    pub name: Name,
    pub qualname: Name,
    pub module: Name,
    pub signature: Signature,
    /// Declared annotations in declaration order; the return annotation is
    /// stored under `return`.
    pub annotations: Vec<(Name, Value)>,
    pub doc: Option<Name>,
    /// Scope the function was defined in.
    pub globals: Option<ScopeRef>,
    pub is_async: bool,
    /// Set for functions whose calls produce a lazily-produced sequence.
    pub lazy: Option<LazyKind>,
    pub marks: FunctionMarks,
    /// The function this one wraps, if it is a wrapper.
    pub wrapped: Option<Value>,
    pub body: Arc<dyn Invoke>,
}

impl FunctionValue {
    pub fn new(name: Name, signature: Signature, body: Arc<dyn Invoke>) -> Self {
        FunctionValue {
            name,
            qualname: name,
            module: Name::EMPTY,
            signature,
            annotations: Vec::new(),
            doc: None,
            globals: None,
            is_async: false,
            lazy: None,
            marks: FunctionMarks::empty(),
            wrapped: None,
            body,
        }
    }

    pub fn native(name: &str, func: NativeFn) -> Self {
        let mut value = FunctionValue::new(
            Name::intern(name),
            Signature::variadic(),
            Arc::new(NativeBody(func)),
        );
        value.module = Name::intern("builtins");
        value
    }

    pub fn annotation(&self, name: Name) -> Option<&Value> {
        self.annotations
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    pub fn return_annotation(&self) -> Option<&Value> {
        self.annotation(Name::intern("return"))
    }

    pub fn has_annotations(&self) -> bool {
        !self.annotations.is_empty()
    }

    /// Whether an instrumentation layer already covers this function.
    pub fn is_checked(&self) -> bool {
        self.marks
            .intersects(FunctionMarks::INSTRUMENTED | FunctionMarks::WRAPPED)
    }

    pub fn call(&self, args: CallArgs) -> RuntimeResult {
        self.body.invoke(self, args)
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionValue")
            .field("qualname", &self.qualname)
            .field("params", &self.signature.params.len())
            .field("marks", &self.marks)
            .finish_non_exhaustive()
    }
}

/// A function bound to a receiver.
pub struct BoundMethod {
    pub receiver: Value,
    pub func: Value,
}

/// `functools.partial`: a callable with leading arguments supplied.
pub struct PartialObj {
    pub func: Value,
    pub args: Vec<Value>,
    pub keywords: Vec<(Name, Value)>,
}

/// A `property` stored in a class namespace.
pub struct PropertyObj {
    pub getter: Value,
    pub setter: Option<Value>,
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
