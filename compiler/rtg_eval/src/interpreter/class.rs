//! Class definitions.
//!
//! A class body runs in its own frame; the frame's bindings become the
//! class attributes. Two base markers change what kind of class results:
//!
//! - `TypedDict` (or a typed-record base): a typed record whose fields
//!   are the annotated names of the body, after the inherited ones
//! - `Protocol`: a structural interface whose members are the methods and
//!   annotated attributes of the body, after the inherited ones

use std::sync::Arc;

use rtg_check::global_config;
use rtg_ir::{ClassId, Name, ParamKind};
use rtg_types::{
    call_value, CallArgs, ClassKind, ClassObj, ClassRef, InterfaceDef, MemberKind, MemberSig,
    RecordDef, RecordField, RuntimeError, RuntimeResult, SpecialForm, Value,
};

use super::{Flow, Interpreter};

/// Namespace entries that never count as interface members.
const NON_MEMBERS: [&str; 14] = [
    "__init__",
    "__new__",
    "__module__",
    "__qualname__",
    "__doc__",
    "__annotations__",
    "__dict__",
    "__slots__",
    "__weakref__",
    "__class_getitem__",
    "__subclasshook__",
    "__abstractmethods__",
    "__parameters__",
    "__orig_bases__",
];

impl Interpreter {
    /// Evaluate a `class` statement into a class object, decorators applied.
    pub(super) fn define_class(&mut self, id: ClassId) -> RuntimeResult {
        let def = *self.module.arena.class(id);
        let decorators = self.eval_list(def.decorators)?;
        let bases = self.eval_list(def.bases)?;
        let keyword_defs = self.module.arena.keywords(def.keywords).to_vec();
        let mut keywords = Vec::with_capacity(keyword_defs.len());
        for keyword in keyword_defs {
            keywords.push((keyword.name, self.eval(keyword.value)?));
        }

        let qualname = self.qualname_for(def.name);
        let namespace = self.env.class_child(def.name);
        let mut body = Interpreter::new(Arc::clone(&self.module), namespace.clone());
        body.path = self.child_path(def.name);
        body.qual_prefix = Some(qualname.as_str().to_string());
        if let Flow::Return(_) = body.exec_block(def.body)? {
            return Err(RuntimeError::new("'return' outside function"));
        }

        let attrs = namespace.bindings();
        let kind = class_kind(&bases, &keywords, &body.annotations, &attrs)?;
        let class_bases: Vec<ClassRef> = bases.iter().filter_map(base_class).collect();
        let class = ClassObj::new(def.name, self.module.name, class_bases, kind)
            .with_qualname(qualname)
            .with_doc(def.doc)
            .with_scope(self.env.closure_scope().scope_ref())
            .with_attrs(attrs);
        tracing::trace!(class = %qualname, "defined class");

        let mut value = Value::class(class);
        for decorator in decorators.iter().rev() {
            value = call_value(decorator, CallArgs::new([value]))?;
        }
        Ok(value)
    }
}

/// The class a base expression contributes to the MRO, if any.
///
/// Parameterized user generics contribute their origin; typing markers
/// contribute nothing.
fn base_class(base: &Value) -> Option<ClassRef> {
    match base {
        Value::Class(class) => Some(class.clone()),
        Value::Alias(alias) => alias.origin.as_class().cloned(),
        _ => None,
    }
}

fn is_form(base: &Value, form: SpecialForm) -> bool {
    match base {
        Value::Form(f) => *f == form,
        Value::Alias(alias) => matches!(alias.origin, Value::Form(f) if f == form),
        _ => false,
    }
}

fn class_kind(
    bases: &[Value],
    keywords: &[(Name, Value)],
    annotations: &[(Name, Value)],
    attrs: &[(Name, Value)],
) -> Result<ClassKind, RuntimeError> {
    let record_bases: Vec<ClassRef> = bases
        .iter()
        .filter_map(base_class)
        .filter(|class| class.record().is_some())
        .collect();
    if bases.iter().any(|b| is_form(b, SpecialForm::TypedDict)) || !record_bases.is_empty() {
        return record_kind(&record_bases, keywords, annotations).map(ClassKind::Record);
    }

    let interface_bases: Vec<ClassRef> = bases
        .iter()
        .filter_map(base_class)
        .filter(|class| class.interface().is_some())
        .collect();
    if bases.iter().any(|b| is_form(b, SpecialForm::Protocol)) {
        return Ok(ClassKind::Interface(interface_kind(
            &interface_bases,
            annotations,
            attrs,
        )));
    }
    Ok(ClassKind::Plain)
}

fn record_kind(
    bases: &[ClassRef],
    keywords: &[(Name, Value)],
    annotations: &[(Name, Value)],
) -> Result<RecordDef, RuntimeError> {
    let total = match keywords.iter().find(|(name, _)| name.as_str() == "total") {
        Some((_, Value::Bool(total))) => *total,
        Some((_, other)) => {
            return Err(RuntimeError::new(format!(
                "TypedDict 'total' must be a bool, not '{}'",
                other.type_name()
            )))
        }
        None => global_config().typed_record_default_total,
    };

    let mut fields: Vec<RecordField> = Vec::new();
    for base in bases {
        if let Some(record) = base.record() {
            for field in &record.fields {
                if !fields.iter().any(|f| f.name == field.name) {
                    fields.push(field.clone());
                }
            }
        }
    }
    for (name, annotation) in annotations {
        let field = RecordField {
            name: *name,
            annotation: annotation.clone(),
            required: total,
        };
        match fields.iter_mut().find(|f| f.name == *name) {
            Some(slot) => *slot = field,
            None => fields.push(field),
        }
    }
    Ok(RecordDef { fields, total })
}

fn interface_kind(
    bases: &[ClassRef],
    annotations: &[(Name, Value)],
    attrs: &[(Name, Value)],
) -> InterfaceDef {
    let mut members: Vec<MemberSig> = Vec::new();
    let mut add = |member: MemberSig| match members.iter_mut().find(|m| m.name == member.name) {
        Some(slot) => *slot = member,
        None => members.push(member),
    };

    for base in bases {
        if let Some(interface) = base.interface() {
            for member in &interface.members {
                add(member.clone());
            }
        }
    }
    for (name, annotation) in annotations {
        add(MemberSig {
            name: *name,
            kind: MemberKind::Attribute {
                annotation: Some(annotation.clone()),
            },
        });
    }
    for (name, value) in attrs {
        if NON_MEMBERS.contains(&name.as_str()) {
            continue;
        }
        let kind = match value {
            Value::Function(_) => method_kind(value, true),
            Value::ClassMethod(func) => method_kind(func, true),
            Value::StaticMethod(func) => method_kind(func, false),
            _ if annotations.iter().any(|(n, _)| n == name) => continue,
            _ => MemberKind::Attribute { annotation: None },
        };
        add(MemberSig { name: *name, kind });
    }

    InterfaceDef {
        members,
        strict: false,
    }
}

/// Positional parameters a member method takes, excluding the receiver.
fn method_kind(func: &Value, has_receiver: bool) -> MemberKind {
    let positional = func.as_function().map_or(0, |f| {
        f.signature
            .params
            .iter()
            .filter(|p| matches!(p.kind, ParamKind::PositionalOnly | ParamKind::PositionalOrKeyword))
            .count()
    });
    MemberKind::Method {
        positional: if has_receiver {
            positional.saturating_sub(1)
        } else {
            positional
        },
    }
}
