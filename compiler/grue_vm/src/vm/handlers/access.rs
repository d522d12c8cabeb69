//! Properties, indexing and array literals.
//!
//! Three receiver shapes have properties: script instances, host entities
//! and the builtin collections. Collections expose a read-only `count` and
//! whatever native methods the host registered.

use grue_core::{Key, ObjRef, Object, OpCode, Value};

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::vm::call::Member;
use crate::vm::Vm;

impl Vm {
    pub(crate) fn execute_access(&mut self, op: OpCode) -> Result<(), RuntimeError> {
        match op {
            OpCode::GetProperty => {
                let name = self.read_string();
                self.get_property(name)?;
            }
            OpCode::SetProperty => {
                let name = self.read_string();
                let (receiver, value) = (self.peek(1), self.peek(0));
                self.set_property(receiver, name, value)?;
                self.pop();
                self.set_top(0, value);
            }
            OpCode::GetSuper => {
                let name = self.read_string();
                let Value::Obj(superclass) = self.pop() else {
                    return Err(RuntimeError::operand("Superclass must be a class."));
                };
                match self.class_method(superclass, self.heap.key(name)) {
                    Some(method) => self.bind_method(method),
                    None => return Err(RuntimeError::undefined_property(self.heap.str(name))),
                }
            }
            OpCode::GetIndex => {
                let (target, index) = (self.peek(1), self.peek(0));
                let value = self.index_get(target, index)?;
                self.pop();
                self.set_top(0, value);
            }
            OpCode::SetIndex => {
                let (target, index, value) = (self.peek(2), self.peek(1), self.peek(0));
                self.index_set(target, index, value)?;
                self.stack.truncate(self.stack.len() - 2);
                self.set_top(0, value);
            }
            OpCode::Array => {
                let count = usize::from(self.read_byte());
                let start = self.stack.len() - count;
                let items = self.stack[start..].to_vec();
                let array = self.alloc(Object::Array(items));
                self.stack.truncate(start);
                self.push(Value::Obj(array));
            }
            _ => unreachable!("{op:?} is not an access instruction"),
        }
        Ok(())
    }

    /// Replace the receiver on top of the stack with its property `name`.
    pub(crate) fn get_property(&mut self, name: ObjRef) -> Result<(), RuntimeError> {
        let receiver = self.peek(0);
        if name == self.count_string {
            if let Some(count) = self.collection_count(receiver) {
                self.set_top(0, Value::Int(count));
                return Ok(());
            }
        }
        if !self.has_members(receiver) {
            return Err(RuntimeError::operand("Only instances have properties."));
        }
        match self.find_member(receiver, name) {
            Some(Member::Value(value)) => {
                let value = self.read_field(value);
                self.set_top(0, value);
            }
            Some(Member::Method(method)) => self.bind_method(method),
            Some(Member::Native(native)) => self.bind_native(native),
            None => return Err(RuntimeError::undefined_property(self.heap.str(name))),
        }
        Ok(())
    }

    fn set_property(
        &mut self,
        receiver: Value,
        name: ObjRef,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let key = self.heap.key(name);
        let Some(target) = receiver.as_obj() else {
            return Err(RuntimeError::operand("Only instances have fields."));
        };
        if matches!(self.heap.try_get(target), Some(Object::Entity(_))) {
            return self.write_entity_field(target, key, value);
        }
        match self.heap.try_get_mut(target) {
            Some(Object::Instance(instance)) => {
                instance.fields.set(key, value);
                Ok(())
            }
            _ => Err(RuntimeError::operand("Only instances have fields.")),
        }
    }

    fn collection_count(&self, value: Value) -> Option<i32> {
        let len = match self.heap.try_get(value.as_obj()?)? {
            Object::Array(items) => items.len(),
            Object::List(list) => list.len(),
            Object::Table(table) => table.len(),
            _ => return None,
        };
        Some(i32::try_from(len).unwrap_or(i32::MAX))
    }

    // ─── Indexing ───

    pub(crate) fn index_get(&self, target: Value, index: Value) -> Result<Value, RuntimeError> {
        let object = target.as_obj().and_then(|r| self.heap.try_get(r));
        match object {
            Some(Object::Array(items)) => {
                let i = element_index(index, items.len())?;
                Ok(items[i])
            }
            Some(Object::List(list)) => {
                let i = element_index(index, list.len())?;
                Ok(list.get(i).unwrap_or_default())
            }
            Some(Object::Table(table)) => {
                let key = self.table_key(index)?;
                Ok(table.get(key).unwrap_or_default())
            }
            _ => Err(RuntimeError::operand("Can only index arrays, lists and tables.")),
        }
    }

    fn index_set(
        &mut self,
        target: Value,
        index: Value,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let Some(target) = target.as_obj() else {
            return Err(RuntimeError::operand(
                "Can only assign into arrays, lists and tables.",
            ));
        };
        // Resolve the key before borrowing the target mutably.
        let key = match self.heap.try_get(target) {
            Some(Object::Table(_)) => Some(self.table_key(index)?),
            _ => None,
        };
        match self.heap.try_get_mut(target) {
            Some(Object::Array(items)) => {
                let i = element_index(index, items.len())?;
                items[i] = value;
                Ok(())
            }
            Some(Object::List(list)) => {
                let i = element_index(index, list.len())?;
                list.set(i, value);
                Ok(())
            }
            Some(Object::Table(table)) => {
                if let Some(key) = key {
                    table.set(key, value);
                }
                Ok(())
            }
            _ => Err(RuntimeError::operand(
                "Can only assign into arrays, lists and tables.",
            )),
        }
    }

    /// Table key for a script value: interned strings and integers.
    pub(crate) fn table_key(&self, value: Value) -> Result<Key, RuntimeError> {
        match value {
            Value::Int(i) => Ok(Key::Int(i)),
            Value::Obj(r) if self.heap.as_str(r).is_some() => Ok(self.heap.key(r)),
            _ => Err(RuntimeError::new(
                RuntimeErrorKind::InvalidIndex,
                "Table key must be a string or integer.",
            )),
        }
    }
}

/// Bounds-checked element position for an integer index.
fn element_index(index: Value, len: usize) -> Result<usize, RuntimeError> {
    let Value::Int(i) = index else {
        return Err(RuntimeError::new(
            RuntimeErrorKind::InvalidIndex,
            "Index must be an integer.",
        ));
    };
    usize::try_from(i)
        .ok()
        .filter(|&i| i < len)
        .ok_or_else(|| {
            RuntimeError::new(
                RuntimeErrorKind::IndexOutOfBounds,
                format!("Index {i} out of bounds for length {len}."),
            )
        })
}
