//! Locals, globals and upvalues.

use grue_core::{ObjRef, Object, OpCode, UpvalueState};

use crate::error::RuntimeError;
use crate::vm::Vm;

impl Vm {
    pub(crate) fn execute_variables(&mut self, op: OpCode) -> Result<(), RuntimeError> {
        match op {
            OpCode::GetLocal => {
                let offset = usize::from(self.read_byte());
                let slot = self.frame().base + offset;
                let value = self.stack[slot];
                self.push(value);
            }
            OpCode::SetLocal => {
                let offset = usize::from(self.read_byte());
                let slot = self.frame().base + offset;
                self.stack[slot] = self.peek(0);
            }
            OpCode::GetGlobal => {
                let name = self.read_string();
                match self.globals.get(self.heap.key(name)) {
                    Some(value) => self.push(value),
                    None => return Err(RuntimeError::undefined_variable(self.heap.str(name))),
                }
            }
            OpCode::DefineGlobal => {
                let name = self.read_string();
                let key = self.heap.key(name);
                let value = self.pop();
                self.globals.set(key, value);
            }
            OpCode::SetGlobal => {
                let name = self.read_string();
                let key = self.heap.key(name);
                let value = self.peek(0);
                if self.globals.set(key, value) {
                    self.globals.delete(key);
                    return Err(RuntimeError::undefined_variable(self.heap.str(name)));
                }
            }
            OpCode::GetUpvalue => {
                let index = usize::from(self.read_byte());
                let value = match self.upvalue_state(index) {
                    UpvalueState::Open(slot) => self.stack[slot],
                    UpvalueState::Closed(value) => value,
                };
                self.push(value);
            }
            OpCode::SetUpvalue => {
                let index = usize::from(self.read_byte());
                let value = self.peek(0);
                let upvalue = self.upvalue_ref(index);
                match self.heap.get_mut(upvalue) {
                    Object::Upvalue(upvalue) => match &mut upvalue.state {
                        UpvalueState::Open(slot) => {
                            let slot = *slot;
                            self.stack[slot] = value;
                        }
                        UpvalueState::Closed(closed) => *closed = value,
                    },
                    other => panic!("upvalue slot holds a {}", other.kind().name()),
                }
            }
            _ => unreachable!("{op:?} is not a variable instruction"),
        }
        Ok(())
    }

    fn upvalue_ref(&self, index: usize) -> ObjRef {
        match self.heap.get(self.frame().closure) {
            Object::Closure(closure) => closure.upvalues[index],
            other => panic!("frame closure is a {}", other.kind().name()),
        }
    }

    fn upvalue_state(&self, index: usize) -> UpvalueState {
        match self.heap.get(self.upvalue_ref(index)) {
            Object::Upvalue(upvalue) => upvalue.state,
            other => panic!("upvalue slot holds a {}", other.kind().name()),
        }
    }
}
