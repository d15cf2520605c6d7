//! Operators, subscripts and iteration.

use std::cmp::Ordering;

use rtg_ir::{BinaryOp, CompareOp, Name, UnaryOp};
use rtg_types::{
    call_value, index_out_of_range, invalid_operation, key_not_found, lookup_attribute,
    not_subscriptable, subscript_annotation, union_of, CallArgs, RuntimeError, RuntimeResult,
    Step, Value,
};

use super::Flow;
use crate::errors::integer_overflow;

#[derive(Copy, Clone)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Number::Int(i64::from(*b))),
            Value::Int(n) => Some(Number::Int(*n)),
            Value::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    fn as_float(self) -> f64 {
        match self {
            Number::Int(n) => int_to_float(n),
            Number::Float(f) => f,
        }
    }
}

#[expect(clippy::cast_precision_loss, reason = "host int/float promotion")]
fn int_to_float(n: i64) -> f64 {
    n as f64
}

/// Values that stand for types in annotation position.
fn is_annotation_object(value: &Value) -> bool {
    matches!(
        value,
        Value::None
            | Value::Class(_)
            | Value::Form(_)
            | Value::Alias(_)
            | Value::Union(_)
            | Value::TypeVar(_)
            | Value::NewType(_)
    )
}

pub(super) fn binary(op: BinaryOp, left: &Value, right: &Value) -> RuntimeResult {
    let symbol = op.as_symbol();
    if let (Some(a), Some(b)) = (Number::of(left), Number::of(right)) {
        return arithmetic(op, a, b, left, right);
    }
    match (op, left, right) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => {
            Ok(Value::string(format!("{}{}", a.as_str(), b.as_str())))
        }
        (BinaryOp::Add, Value::Bytes(a), Value::Bytes(b)) => {
            Ok(Value::bytes([a.as_slice(), b.as_slice()].concat()))
        }
        (BinaryOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            Ok(Value::tuple([a.as_slice(), b.as_slice()].concat()))
        }
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.read().clone();
            items.extend(b.read().iter().cloned());
            Ok(Value::list(items))
        }
        (BinaryOp::Mul, Value::Str(s), Value::Int(n))
        | (BinaryOp::Mul, Value::Int(n), Value::Str(s)) => {
            Ok(Value::string(s.repeat(repeat_count(*n))))
        }
        (BinaryOp::Mul, Value::List(items), Value::Int(n))
        | (BinaryOp::Mul, Value::Int(n), Value::List(items)) => {
            let items = items.read();
            let mut out = Vec::with_capacity(items.len() * repeat_count(*n));
            for _ in 0..repeat_count(*n) {
                out.extend(items.iter().cloned());
            }
            Ok(Value::list(out))
        }
        (BinaryOp::BitOr, _, _) if is_annotation_object(left) && is_annotation_object(right) => {
            Ok(union_of(vec![left.clone(), right.clone()]))
        }
        (BinaryOp::BitOr, Value::Set(a), Value::Set(b)) => {
            let mut items = a.read().clone();
            for item in b.read().iter() {
                if !items.iter().any(|existing| existing.equals(item)) {
                    items.push(item.clone());
                }
            }
            Ok(Value::set(items))
        }
        _ => Err(invalid_operation(symbol, left, right)),
    }
}

fn repeat_count(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}

fn arithmetic(op: BinaryOp, a: Number, b: Number, left: &Value, right: &Value) -> RuntimeResult {
    let symbol = op.as_symbol();
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => {
            let result = match op {
                BinaryOp::Add => x.checked_add(y),
                BinaryOp::Sub => x.checked_sub(y),
                BinaryOp::Mul => x.checked_mul(y),
                BinaryOp::BitOr => {
                    if matches!((left, right), (Value::Bool(_), Value::Bool(_))) {
                        return Ok(Value::Bool((x | y) != 0));
                    }
                    Some(x | y)
                }
            };
            result.map(Value::Int).ok_or_else(|| integer_overflow(symbol))
        }
        _ => {
            let (x, y) = (a.as_float(), b.as_float());
            match op {
                BinaryOp::Add => Ok(Value::Float(x + y)),
                BinaryOp::Sub => Ok(Value::Float(x - y)),
                BinaryOp::Mul => Ok(Value::Float(x * y)),
                BinaryOp::BitOr => Err(invalid_operation(symbol, left, right)),
            }
        }
    }
}

pub(super) fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, RuntimeError> {
    match op {
        CompareOp::Eq => Ok(left.equals(right)),
        CompareOp::NotEq => Ok(!left.equals(right)),
        CompareOp::Is => Ok(left.is(right)),
        CompareOp::IsNot => Ok(!left.is(right)),
        CompareOp::Lt | CompareOp::LtE | CompareOp::Gt | CompareOp::GtE => {
            let ordering = order(left, right)
                .ok_or_else(|| invalid_operation(op.as_symbol(), left, right))?;
            Ok(match op {
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::LtE => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
    }
}

fn order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::Bytes(a), Value::Bytes(b)) => Some(a.as_slice().cmp(b.as_slice())),
        _ => match (Number::of(left)?, Number::of(right)?) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_float().partial_cmp(&b.as_float()),
        },
    }
}

pub(super) fn unary(op: UnaryOp, operand: &Value) -> RuntimeResult {
    match (op, operand) {
        (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_truthy())),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Neg, value) => match Number::of(value) {
            Some(Number::Int(n)) => n
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| integer_overflow("unary -")),
            _ => Err(RuntimeError::new(format!(
                "bad operand type for unary -: '{}'",
                value.type_name()
            ))),
        },
    }
}

/// Resolve a possibly negative index against a length.
fn position(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

pub(super) fn get_item(value: &Value, index: &Value) -> RuntimeResult {
    match value {
        Value::Class(_) | Value::Form(_) | Value::Alias(_) => subscript_annotation(value, index),
        Value::Dict(_) => value.dict_get(index).ok_or_else(|| key_not_found(index)),
        Value::Tuple(items) => indexed(items, index),
        Value::List(items) => indexed(&items.read(), index),
        Value::Str(s) => {
            let chars: Vec<Value> = s.chars().map(|c| Value::string(c.to_string())).collect();
            indexed(&chars, index)
        }
        Value::Bytes(b) => {
            let n = index.as_int().ok_or_else(|| not_subscriptable(value))?;
            position(n, b.len())
                .map(|i| Value::Int(i64::from(b[i])))
                .ok_or_else(|| index_out_of_range(n))
        }
        Value::Instance(_) => match lookup_attribute(value, Name::intern("__getitem__"))? {
            Some(method) => call_value(&method, CallArgs::new([index.clone()])),
            None => Err(not_subscriptable(value)),
        },
        _ => Err(not_subscriptable(value)),
    }
}

fn indexed(items: &[Value], index: &Value) -> RuntimeResult {
    let Some(n) = index.as_int() else {
        return Err(RuntimeError::new(format!(
            "indices must be integers, not {}",
            index.type_name()
        )));
    };
    position(n, items.len())
        .map(|i| items[i].clone())
        .ok_or_else(|| index_out_of_range(n))
}

pub(super) fn set_item(container: &Value, index: Value, value: Value) -> Result<(), RuntimeError> {
    match container {
        Value::Dict(_) => {
            container.dict_set(index, value);
            Ok(())
        }
        Value::List(items) => {
            let n = index.as_int().ok_or_else(|| {
                RuntimeError::new(format!(
                    "list indices must be integers, not {}",
                    index.type_name()
                ))
            })?;
            let mut items = items.write();
            let slot = position(n, items.len()).ok_or_else(|| index_out_of_range(n))?;
            items[slot] = value;
            Ok(())
        }
        Value::Instance(_) => match lookup_attribute(container, Name::intern("__setitem__"))? {
            Some(method) => call_value(&method, CallArgs::new([index, value])).map(drop),
            None => Err(RuntimeError::new(format!(
                "'{}' object does not support item assignment",
                container.type_name()
            ))),
        },
        _ => Err(RuntimeError::new(format!(
            "'{}' object does not support item assignment",
            container.type_name()
        ))),
    }
}

/// Run `body` for each element of `iterable`.
///
/// Lazily-produced sequences are driven one element at a time and closed
/// when the body returns early.
pub(super) fn for_each(
    iterable: &Value,
    mut body: impl FnMut(Value) -> Result<Flow, RuntimeError>,
) -> Result<Flow, RuntimeError> {
    if let Value::Generator(generator) = iterable {
        while let Step::Yielded(item) = generator.next()? {
            if let Flow::Return(value) = body(item)? {
                generator.close()?;
                return Ok(Flow::Return(value));
            }
        }
        return Ok(Flow::Normal);
    }
    for item in iterable.iter_snapshot()? {
        if let Flow::Return(value) = body(item)? {
            return Ok(Flow::Return(value));
        }
    }
    Ok(Flow::Normal)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rtg_types::{builtin_class, BuiltinKind};

    #[test]
    fn test_int_arithmetic_is_checked() {
        let big = Value::int(i64::MAX);
        let err = binary(BinaryOp::Add, &big, &Value::int(1)).unwrap_err();
        assert_eq!(err.to_string(), "integer overflow in +");
        assert_eq!(
            binary(BinaryOp::Mul, &Value::int(6), &Value::int(7)).unwrap().as_int(),
            Some(42)
        );
    }

    #[test]
    fn test_string_and_sequence_concatenation() {
        let joined = binary(BinaryOp::Add, &Value::string("ab"), &Value::string("cd")).unwrap();
        assert_eq!(joined.as_str(), Some("abcd"));
        let tuple = binary(
            BinaryOp::Add,
            &Value::tuple(vec![Value::int(1)]),
            &Value::tuple(vec![Value::int(2)]),
        )
        .unwrap();
        assert_eq!(tuple.len(), Some(2));
    }

    #[test]
    fn test_mixed_numbers_promote_to_float() {
        let result = binary(BinaryOp::Add, &Value::int(1), &Value::Float(0.5)).unwrap();
        assert!(matches!(result, Value::Float(f) if (f - 1.5).abs() < f64::EPSILON));
        assert!(compare(CompareOp::Lt, &Value::int(1), &Value::Float(1.5)).unwrap());
    }

    #[test]
    fn test_bitor_on_types_builds_a_union() {
        let int = Value::Class(builtin_class(BuiltinKind::Int));
        let union = binary(BinaryOp::BitOr, &int, &Value::None).unwrap();
        assert!(matches!(union, Value::Union(_)));
        assert_eq!(
            binary(BinaryOp::BitOr, &Value::int(4), &Value::int(1)).unwrap().as_int(),
            Some(5)
        );
    }

    #[test]
    fn test_negative_indices() {
        let list = Value::list(vec![Value::int(1), Value::int(2), Value::int(3)]);
        assert_eq!(get_item(&list, &Value::int(-1)).unwrap().as_int(), Some(3));
        assert!(get_item(&list, &Value::int(3)).is_err());
        set_item(&list, Value::int(0), Value::int(9)).unwrap();
        assert_eq!(get_item(&list, &Value::int(0)).unwrap().as_int(), Some(9));
    }

    #[test]
    fn test_unsupported_operands_name_both_types() {
        let err = binary(BinaryOp::Sub, &Value::string("a"), &Value::int(1)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported operand type(s) for -: 'str' and 'int'"
        );
    }
}
