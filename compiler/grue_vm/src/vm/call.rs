//! Calls, method invocation and upvalue capture.

use grue_core::{
    BoundMethod, BoundNative, Instance, Key, NativeId, NativeKind, ObjRef, Object, Table,
    Upvalue, UpvalueState, Value,
};
use smallvec::SmallVec;

use super::{CallFrame, Vm};
use crate::error::RuntimeError;
use crate::natives::NativeImpl;

/// What a property lookup on a receiver found.
pub(crate) enum Member {
    Value(Value),
    Method(ObjRef),
    Native(ObjRef),
}

impl Vm {
    /// Start a call to `callee` whose arguments are the top `argc` stack
    /// slots (with `callee` just below them).
    ///
    /// Closures push a frame for the run loop to execute. Everything else
    /// completes immediately and leaves its result in the callee's slot.
    pub(crate) fn call(&mut self, callee: Value, argc: usize) -> Result<(), RuntimeError> {
        let Value::Obj(r) = callee else {
            return Err(RuntimeError::not_callable());
        };
        match self.heap.try_get(r) {
            Some(Object::Closure(_)) => self.call_closure(r, argc),
            Some(Object::BoundMethod(bound)) => {
                let (receiver, method) = (bound.receiver, bound.method);
                self.set_top(argc, receiver);
                self.call_closure(method, argc)
            }
            Some(Object::Class(class)) => {
                let initializer = class.methods.get(self.heap.key(self.init_string));
                let instance = self.alloc(Object::Instance(Instance {
                    class: r,
                    fields: Table::new(),
                }));
                self.set_top(argc, Value::Obj(instance));
                match initializer {
                    Some(Value::Obj(init)) => self.call_closure(init, argc),
                    _ if argc != 0 => Err(RuntimeError::arity(0, argc)),
                    _ => Ok(()),
                }
            }
            Some(Object::Native(native)) => {
                let (id, arity, kind) = (native.id, native.arity, native.kind);
                if kind == NativeKind::Method {
                    return Err(RuntimeError::not_callable());
                }
                self.call_native(id, arity, None, argc)
            }
            Some(Object::BoundNative(bound)) => {
                let (receiver, native) = (bound.receiver, bound.native);
                let Some(Object::Native(native)) = self.heap.try_get(native) else {
                    return Err(RuntimeError::not_callable());
                };
                let (id, arity) = (native.id, native.arity);
                self.call_native(id, arity, Some(receiver), argc)
            }
            _ => Err(RuntimeError::not_callable()),
        }
    }

    pub(crate) fn call_closure(
        &mut self,
        closure: ObjRef,
        argc: usize,
    ) -> Result<(), RuntimeError> {
        let function = match self.heap.get(closure) {
            Object::Closure(c) => c.function,
            _ => return Err(RuntimeError::not_callable()),
        };
        let arity = match self.heap.get(function) {
            Object::Function(f) => usize::from(f.arity),
            _ => return Err(RuntimeError::not_callable()),
        };
        if argc != arity {
            return Err(RuntimeError::arity(arity, argc));
        }
        if self.frames.len() >= self.config.frames_max {
            return Err(RuntimeError::stack_overflow());
        }
        let base = self.stack.len() - argc - 1;
        self.frames.push(CallFrame::new(closure, function, base));
        Ok(())
    }

    /// Run a native with the top `argc` slots as arguments and replace the
    /// callee slot and arguments with its result.
    fn call_native(
        &mut self,
        id: NativeId,
        arity: Option<u8>,
        receiver: Option<Value>,
        argc: usize,
    ) -> Result<(), RuntimeError> {
        if let Some(arity) = arity {
            if argc != usize::from(arity) {
                return Err(RuntimeError::arity(usize::from(arity), argc));
            }
        }
        let Some(native) = self.natives.get(id.0 as usize).cloned() else {
            return Err(RuntimeError::not_callable());
        };
        // Arguments stay on the stack, and so rooted, for the whole call.
        let start = self.stack.len() - argc;
        let args: SmallVec<[Value; 8]> = SmallVec::from_slice(&self.stack[start..]);
        let result = match (native, receiver) {
            (NativeImpl::Function(f), None) => f(self, &args)?,
            (NativeImpl::Method(f), Some(receiver)) => f(self, receiver, &args)?,
            _ => return Err(RuntimeError::not_callable()),
        };
        let callee_slot = self.stack.len() - argc - 1;
        self.stack.truncate(callee_slot);
        self.push(result);
        Ok(())
    }

    // ─── Members ───

    /// Look `name` up on `receiver`: fields first, then class methods, then
    /// native methods.
    pub(crate) fn find_member(&self, receiver: Value, name: ObjRef) -> Option<Member> {
        let key = self.heap.key(name);
        let Value::Obj(r) = receiver else {
            return None;
        };
        match self.heap.try_get(r)? {
            Object::Instance(instance) => {
                if let Some(value) = instance.fields.get(key) {
                    return Some(Member::Value(value));
                }
                self.class_method(instance.class, key).map(Member::Method)
            }
            Object::Entity(entity) => {
                if let Some(value) = entity.fields.get(key) {
                    return Some(Member::Value(value));
                }
                let method = entity.class.and_then(|class| self.class_method(class, key));
                if let Some(method) = method {
                    return Some(Member::Method(method));
                }
                self.native_method(key).map(Member::Native)
            }
            Object::Array(_) | Object::List(_) | Object::Table(_) => {
                self.native_method(key).map(Member::Native)
            }
            _ => None,
        }
    }

    pub(crate) fn class_method(&self, class: ObjRef, key: Key) -> Option<ObjRef> {
        match self.heap.try_get(class)? {
            Object::Class(class) => class.methods.get(key)?.as_obj(),
            _ => None,
        }
    }

    fn native_method(&self, key: Key) -> Option<ObjRef> {
        self.methods.get(key)?.as_obj()
    }

    /// Replace the receiver on top of the stack with `method` bound to it.
    pub(crate) fn bind_method(&mut self, method: ObjRef) {
        let receiver = self.peek(0);
        let bound = self.alloc(Object::BoundMethod(BoundMethod { receiver, method }));
        self.set_top(0, Value::Obj(bound));
    }

    pub(crate) fn bind_native(&mut self, native: ObjRef) {
        let receiver = self.peek(0);
        let bound = self.alloc(Object::BoundNative(BoundNative { receiver, native }));
        self.set_top(0, Value::Obj(bound));
    }

    /// `receiver.name(args)` without materializing a bound method.
    pub(crate) fn invoke(&mut self, name: ObjRef, argc: usize) -> Result<(), RuntimeError> {
        let receiver = self.peek(argc);
        if !self.has_members(receiver) {
            return Err(RuntimeError::operand("Only instances have methods."));
        }
        match self.find_member(receiver, name) {
            Some(Member::Value(value)) => {
                let value = self.read_field(value);
                self.set_top(argc, value);
                self.call(value, argc)
            }
            Some(Member::Method(method)) => self.call_closure(method, argc),
            Some(Member::Native(native)) => {
                let Object::Native(native) = self.heap.get(native) else {
                    return Err(RuntimeError::not_callable());
                };
                let (id, arity) = (native.id, native.arity);
                self.call_native(id, arity, Some(receiver), argc)
            }
            None => Err(RuntimeError::undefined_property(self.heap.str(name))),
        }
    }

    /// `super.name(args)` with the superclass popped off the stack.
    pub(crate) fn super_invoke(
        &mut self,
        superclass: ObjRef,
        name: ObjRef,
        argc: usize,
    ) -> Result<(), RuntimeError> {
        match self.class_method(superclass, self.heap.key(name)) {
            Some(method) => self.call_closure(method, argc),
            None => Err(RuntimeError::undefined_property(self.heap.str(name))),
        }
    }

    /// Whether `value` can have properties looked up on it.
    pub(crate) fn has_members(&self, value: Value) -> bool {
        matches!(
            value.as_obj().and_then(|r| self.heap.try_get(r)),
            Some(
                Object::Instance(_)
                    | Object::Entity(_)
                    | Object::Array(_)
                    | Object::List(_)
                    | Object::Table(_)
            )
        )
    }

    // ─── Upvalues ───

    /// The open upvalue for stack `slot`, created if no closure has
    /// captured it yet.
    pub(crate) fn capture_upvalue(&mut self, slot: usize) -> ObjRef {
        let position = match self.open_upvalues.binary_search_by_key(&slot, |&(s, _)| s) {
            Ok(found) => return self.open_upvalues[found].1,
            Err(position) => position,
        };
        let upvalue = self.alloc(Object::Upvalue(Upvalue {
            state: UpvalueState::Open(slot),
        }));
        self.open_upvalues.insert(position, (slot, upvalue));
        upvalue
    }

    /// Close every open upvalue at or above stack slot `last`.
    pub(crate) fn close_upvalues(&mut self, last: usize) {
        let split = self.open_upvalues.partition_point(|&(slot, _)| slot < last);
        for (slot, upvalue) in self.open_upvalues.drain(split..) {
            let value = self.stack.get(slot).copied().unwrap_or_default();
            if let Some(Object::Upvalue(upvalue)) = self.heap.try_get_mut(upvalue) {
                upvalue.state = UpvalueState::Closed(value);
            }
        }
    }
}
