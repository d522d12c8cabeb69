use super::Slot;
use crate::chunk::Chunk;
use crate::collections::{SegVec, ValueList};
use crate::object::{Entity, ObjRef, Object, UpvalueState};
use crate::table::{Key, SortedTable, Table};
use crate::value::Value;

/// Something that can report the heap objects it keeps alive.
///
/// Implemented by every object payload for the mark phase, and by the
/// root sets the VM, the compiler and the host hand to allocating calls.
pub trait Trace {
    fn trace(&self, tracer: &mut Tracer<'_>);
}

/// Mark-phase visitor handed to [`Trace::trace`].
pub struct Tracer<'h> {
    slots: &'h SegVec<Slot>,
    marks: &'h mut Vec<bool>,
    gray: &'h mut Vec<ObjRef>,
}

impl<'h> Tracer<'h> {
    pub(super) fn new(
        slots: &'h SegVec<Slot>,
        marks: &'h mut Vec<bool>,
        gray: &'h mut Vec<ObjRef>,
    ) -> Self {
        Self { slots, marks, gray }
    }

    /// Mark `r` live and queue its children.
    pub fn mark(&mut self, r: ObjRef) {
        let index = r.index();
        let live = self
            .slots
            .get(index)
            .is_some_and(|slot| slot.resolve(r).is_some());
        if !live {
            tracing::warn!(index, generation = r.generation(), "root holds a stale handle");
            return;
        }
        if self.marks[index] {
            return;
        }
        self.marks[index] = true;
        self.gray.push(r);
    }

    #[inline]
    pub fn mark_value(&mut self, value: Value) {
        if let Value::Obj(r) = value {
            self.mark(r);
        }
    }

    pub fn trace<T: Trace + ?Sized>(&mut self, item: &T) {
        item.trace(self);
    }

    /// Blacken gray objects until none are left.
    pub(super) fn drain(&mut self) {
        let slots = self.slots;
        while let Some(r) = self.gray.pop() {
            if let Some(object) = slots.get(r.index()).and_then(|slot| slot.resolve(r)) {
                object.trace(self);
            }
        }
    }
}

// ─── Root combinators ───

impl Trace for () {
    fn trace(&self, _: &mut Tracer<'_>) {}
}

impl<T: Trace + ?Sized> Trace for &T {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        (**self).trace(tracer);
    }
}

impl<A: Trace, B: Trace> Trace for (A, B) {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        self.0.trace(tracer);
        self.1.trace(tracer);
    }
}

impl<T: Trace> Trace for Option<T> {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        if let Some(item) = self {
            item.trace(tracer);
        }
    }
}

impl<T: Trace> Trace for [T] {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        for item in self {
            item.trace(tracer);
        }
    }
}

impl<T: Trace> Trace for Vec<T> {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        self.as_slice().trace(tracer);
    }
}

// ─── Leaves ───

impl Trace for ObjRef {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        tracer.mark(*self);
    }
}

impl Trace for Value {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        tracer.mark_value(*self);
    }
}

impl Trace for Key {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        if let Key::Str { obj, .. } = *self {
            tracer.mark(obj);
        }
    }
}

// ─── Containers ───

impl Trace for Table {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        for (key, value) in self.iter() {
            key.trace(tracer);
            tracer.mark_value(value);
        }
    }
}

impl Trace for SortedTable {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        self.table().trace(tracer);
    }
}

impl Trace for ValueList {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        for value in self.iter() {
            tracer.mark_value(value);
        }
    }
}

impl Trace for Chunk {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        self.constants.trace(tracer);
    }
}

impl Trace for Entity {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        tracer.mark(self.name);
        self.fields.trace(tracer);
        self.class.trace(tracer);
        self.script.trace(tracer);
    }
}

impl Trace for Object {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        match self {
            Object::String(_) | Object::NativeField(_) => {}
            Object::Function(function) => {
                function.name.trace(tracer);
                function.chunk.trace(tracer);
            }
            Object::Closure(closure) => {
                tracer.mark(closure.function);
                closure.upvalues.trace(tracer);
            }
            Object::Native(native) => tracer.mark(native.name),
            Object::Class(class) => {
                tracer.mark(class.name);
                class.methods.trace(tracer);
            }
            Object::Instance(instance) => {
                tracer.mark(instance.class);
                instance.fields.trace(tracer);
            }
            Object::BoundMethod(bound) => {
                tracer.mark_value(bound.receiver);
                tracer.mark(bound.method);
            }
            Object::BoundNative(bound) => {
                tracer.mark_value(bound.receiver);
                tracer.mark(bound.native);
            }
            Object::Upvalue(upvalue) => {
                if let UpvalueState::Closed(value) = upvalue.state {
                    tracer.mark_value(value);
                }
            }
            Object::Array(items) => items.trace(tracer),
            Object::Table(table) => table.trace(tracer),
            Object::List(list) => list.trace(tracer),
            Object::Entity(entity) => entity.trace(tracer),
        }
    }
}
