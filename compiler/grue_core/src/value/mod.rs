//! The tagged script value.

use std::fmt;

use crate::heap::Heap;
use crate::object::{ObjRef, Object, UpvalueState};

/// A script value.
///
/// `Copy`: assignment copies the tag and payload. Object variants carry a
/// handle into the [`Heap`]; ownership stays with the heap.
#[derive(Clone, Copy, Debug, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i32),
    Double(f64),
    Obj(ObjRef),
}

impl Value {
    /// `nil` and `false` are falsey; everything else is truthy.
    #[inline]
    pub fn is_falsey(self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }

    #[inline]
    pub fn is_nil(self) -> bool {
        matches!(self, Value::Nil)
    }

    #[inline]
    pub fn is_number(self) -> bool {
        matches!(self, Value::Int(_) | Value::Double(_))
    }

    /// Numeric value widened to `f64`.
    #[inline]
    pub fn as_f64(self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(f64::from(i)),
            Value::Double(d) => Some(d),
            _ => None,
        }
    }

    #[inline]
    pub fn as_obj(self) -> Option<ObjRef> {
        match self {
            Value::Obj(r) => Some(r),
            _ => None,
        }
    }

    /// Script-facing type name, as reported by `type()` and error messages.
    pub fn type_name(self, heap: &Heap) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::Obj(r) => match heap.try_get(r) {
                Some(object) => object.kind().name(),
                None => "collected object",
            },
        }
    }

    /// Render for `print`, interpolation and `str()`.
    pub fn display(self, heap: &Heap) -> ValueDisplay<'_> {
        ValueDisplay { value: self, heap }
    }
}

impl PartialEq for Value {
    /// Numbers compare by numeric value across `Int`/`Double`; objects by
    /// identity. Interned strings make identity content equality.
    fn eq(&self, other: &Self) -> bool {
        match (*self, *other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(a), Value::Double(b)) | (Value::Double(b), Value::Int(a)) => {
                f64::from(a) == b
            }
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Obj(a), Value::Obj(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<ObjRef> for Value {
    fn from(r: ObjRef) -> Self {
        Value::Obj(r)
    }
}

/// Maximum nesting printed for arrays before eliding, so a self-containing
/// array terminates.
const MAX_DISPLAY_DEPTH: usize = 8;

/// [`fmt::Display`] adapter returned by [`Value::display`].
pub struct ValueDisplay<'h> {
    value: Value,
    heap: &'h Heap,
}

impl fmt::Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self.heap, self.value, 0)
    }
}

fn write_value(f: &mut fmt::Formatter<'_>, heap: &Heap, value: Value, depth: usize) -> fmt::Result {
    match value {
        Value::Nil => f.write_str("nil"),
        Value::Bool(b) => write!(f, "{b}"),
        Value::Int(i) => write!(f, "{i}"),
        Value::Double(d) => write!(f, "{d}"),
        Value::Obj(r) => match heap.try_get(r) {
            Some(object) => write_object(f, heap, object, depth),
            None => f.write_str("<collected>"),
        },
    }
}

fn write_object(
    f: &mut fmt::Formatter<'_>,
    heap: &Heap,
    object: &Object,
    depth: usize,
) -> fmt::Result {
    match object {
        Object::String(s) => f.write_str(s.as_str()),
        Object::Function(function) => match function.name {
            Some(name) => write!(f, "<fn {}>", heap.str(name)),
            None => f.write_str("<script>"),
        },
        Object::Closure(closure) => write_object(f, heap, heap.get(closure.function), depth),
        Object::Native(native) => write!(f, "<native fn {}>", heap.str(native.name)),
        Object::Class(class) => f.write_str(heap.str(class.name)),
        Object::Instance(instance) => {
            let name = match heap.get(instance.class) {
                Object::Class(class) => heap.str(class.name),
                _ => "?",
            };
            write!(f, "{name} instance")
        }
        Object::BoundMethod(bound) => write_object(f, heap, heap.get(bound.method), depth),
        Object::BoundNative(bound) => write_object(f, heap, heap.get(bound.native), depth),
        Object::Upvalue(upvalue) => match upvalue.state {
            UpvalueState::Open(slot) => write!(f, "<upvalue @{slot}>"),
            UpvalueState::Closed(value) => write_value(f, heap, value, depth),
        },
        Object::Array(items) => {
            if depth >= MAX_DISPLAY_DEPTH {
                return f.write_str("[...]");
            }
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_value(f, heap, *item, depth + 1)?;
            }
            f.write_str("]")
        }
        Object::Table(table) => write!(f, "<table {}>", table.len()),
        Object::List(list) => write!(f, "<list {}>", list.len()),
        Object::NativeField(field) => write!(f, "<native field {}>", field.type_name()),
        Object::Entity(entity) => write!(f, "<{} {}>", entity.kind.name(), heap.str(entity.name)),
    }
}
