//! Heap object variants.
//!
//! Every object lives in one [`Heap`](crate::Heap) slot. What the slot's
//! bookkeeping records (type, mark, allocation order) replaces the per-object
//! header: the type is the [`Object`] discriminant, marks live in the heap's
//! bitmap, and the slot arena is the allocation list.

mod entity;

pub use entity::{Accessor, Entity, EntityKind, NativeField};

use std::mem::size_of;

use crate::chunk::Chunk;
use crate::collections::ValueList;
use crate::table::Table;
use crate::value::Value;

/// Handle to a heap object.
///
/// `generation` is bumped whenever the slot is freed, so a handle that
/// outlives its object is detected on use instead of aliasing whatever is
/// allocated into the slot next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef {
    index: u32,
    generation: u32,
}

impl ObjRef {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index.
    #[inline]
    pub const fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// An interned string.
#[derive(Debug)]
pub struct ObjString {
    chars: Box<str>,
    hash: u32,
}

impl ObjString {
    pub(crate) fn new(chars: Box<str>, hash: u32) -> Self {
        Self { chars, hash }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.chars
    }

    #[inline]
    pub fn hash(&self) -> u32 {
        self.hash
    }
}

/// A compiled function. Immutable once the compiler hands it over.
#[derive(Debug, Default)]
pub struct Function {
    pub arity: u8,
    pub upvalue_count: usize,
    pub chunk: Chunk,
    /// `None` for the top-level script.
    pub name: Option<ObjRef>,
}

/// A function plus its captured variables.
///
/// Invariant: `upvalues.len() == function.upvalue_count`.
#[derive(Debug)]
pub struct Closure {
    pub function: ObjRef,
    pub upvalues: Box<[ObjRef]>,
}

/// Index into the VM's native function registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeId(pub u32);

/// Whether a native takes a receiver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NativeKind {
    /// Called as `name(args)`.
    Function,
    /// Called as `receiver.name(args)`.
    Method,
}

/// A host-registered native. The function pointer itself lives in the VM
/// registry under `id`; the heap only records identity and arity.
#[derive(Debug)]
pub struct Native {
    pub name: ObjRef,
    /// `None` accepts any argument count.
    pub arity: Option<u8>,
    pub kind: NativeKind,
    pub id: NativeId,
}

#[derive(Debug)]
pub struct Class {
    pub name: ObjRef,
    /// Method name → closure. After `Inherit`, a full copy of the
    /// superclass table plus the subclass's own definitions.
    pub methods: Table,
}

#[derive(Debug)]
pub struct Instance {
    pub class: ObjRef,
    pub fields: Table,
}

/// A closure bound to its receiver by a property read.
#[derive(Debug)]
pub struct BoundMethod {
    pub receiver: Value,
    pub method: ObjRef,
}

/// A native method bound to its receiver by a property read.
#[derive(Debug)]
pub struct BoundNative {
    pub receiver: Value,
    pub native: ObjRef,
}

/// Where a captured variable currently lives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UpvalueState {
    /// Still on the VM stack at this absolute slot.
    Open(usize),
    /// Moved off the stack when its frame returned.
    Closed(Value),
}

#[derive(Debug)]
pub struct Upvalue {
    pub state: UpvalueState,
}

/// Object kind, for type names and dispatch on shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjKind {
    String,
    Function,
    Closure,
    Native,
    Class,
    Instance,
    BoundMethod,
    BoundNative,
    Upvalue,
    Array,
    Table,
    List,
    NativeField,
    Entity(EntityKind),
}

impl ObjKind {
    /// Script-facing type name.
    pub fn name(self) -> &'static str {
        match self {
            ObjKind::String => "string",
            ObjKind::Function | ObjKind::Closure => "function",
            ObjKind::Native | ObjKind::BoundNative => "native",
            ObjKind::Class => "class",
            ObjKind::Instance => "instance",
            ObjKind::BoundMethod => "method",
            ObjKind::Upvalue => "upvalue",
            ObjKind::Array => "array",
            ObjKind::Table => "table",
            ObjKind::List => "list",
            ObjKind::NativeField => "native field",
            ObjKind::Entity(kind) => kind.name(),
        }
    }
}

/// A heap object.
#[derive(Debug)]
pub enum Object {
    String(ObjString),
    Function(Function),
    Closure(Closure),
    Native(Native),
    Class(Class),
    Instance(Instance),
    BoundMethod(BoundMethod),
    BoundNative(BoundNative),
    Upvalue(Upvalue),
    Array(Vec<Value>),
    Table(Table),
    List(ValueList),
    NativeField(NativeField),
    Entity(Entity),
}

impl Object {
    pub fn kind(&self) -> ObjKind {
        match self {
            Object::String(_) => ObjKind::String,
            Object::Function(_) => ObjKind::Function,
            Object::Closure(_) => ObjKind::Closure,
            Object::Native(_) => ObjKind::Native,
            Object::Class(_) => ObjKind::Class,
            Object::Instance(_) => ObjKind::Instance,
            Object::BoundMethod(_) => ObjKind::BoundMethod,
            Object::BoundNative(_) => ObjKind::BoundNative,
            Object::Upvalue(_) => ObjKind::Upvalue,
            Object::Array(_) => ObjKind::Array,
            Object::Table(_) => ObjKind::Table,
            Object::List(_) => ObjKind::List,
            Object::NativeField(_) => ObjKind::NativeField,
            Object::Entity(entity) => ObjKind::Entity(entity.kind),
        }
    }

    /// Approximate bytes owned by this object, for collection pacing.
    pub fn heap_size(&self) -> usize {
        let dynamic = match self {
            Object::String(s) => s.chars.len(),
            Object::Function(function) => {
                function.chunk.code.capacity()
                    + function.chunk.lines.capacity() * size_of::<u32>()
                    + function.chunk.constants.capacity() * size_of::<Value>()
            }
            Object::Closure(closure) => closure.upvalues.len() * size_of::<ObjRef>(),
            Object::Class(class) => class.methods.heap_size(),
            Object::Instance(instance) => instance.fields.heap_size(),
            Object::Array(items) => items.capacity() * size_of::<Value>(),
            Object::Table(table) => table.heap_size(),
            Object::List(list) => list.heap_size(),
            Object::Entity(entity) => entity.fields.heap_size(),
            Object::Native(_)
            | Object::BoundMethod(_)
            | Object::BoundNative(_)
            | Object::Upvalue(_)
            | Object::NativeField(_) => 0,
        };
        size_of::<Object>() + dynamic
    }

    #[inline]
    pub fn as_string(&self) -> Option<&ObjString> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }
}
