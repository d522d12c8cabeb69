//! Class construction.

use grue_core::{Class, Object, OpCode, Table, Value};

use crate::error::RuntimeError;
use crate::vm::Vm;

impl Vm {
    pub(crate) fn execute_class(&mut self, op: OpCode) -> Result<(), RuntimeError> {
        match op {
            OpCode::Class => {
                let name = self.read_string();
                let class = self.alloc(Object::Class(Class {
                    name,
                    methods: Table::new(),
                }));
                self.push(Value::Obj(class));
            }
            OpCode::Inherit => {
                // Stack: superclass, subclass.
                let inherited = match self.peek(1).as_obj().and_then(|r| self.heap.try_get(r)) {
                    Some(Object::Class(superclass)) => superclass.methods.clone(),
                    _ => return Err(RuntimeError::operand("Superclass must be a class.")),
                };
                if let Some(Object::Class(subclass)) =
                    self.peek(0).as_obj().and_then(|r| self.heap.try_get_mut(r))
                {
                    inherited.add_all(&mut subclass.methods);
                }
                self.pop();
            }
            OpCode::Method => {
                let name = self.read_string();
                let key = self.heap.key(name);
                let method = self.peek(0);
                if let Some(Object::Class(class)) =
                    self.peek(1).as_obj().and_then(|r| self.heap.try_get_mut(r))
                {
                    class.methods.set(key, method);
                }
                self.pop();
            }
            _ => unreachable!("{op:?} is not a class instruction"),
        }
        Ok(())
    }
}
