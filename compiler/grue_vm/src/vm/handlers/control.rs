//! Calls, closures and returns.

use grue_core::{Closure, Object, OpCode, Value};
use smallvec::SmallVec;

use crate::error::RuntimeError;
use crate::vm::run::ControlFlow;
use crate::vm::Vm;

impl Vm {
    pub(crate) fn execute_control(
        &mut self,
        op: OpCode,
        entry_depth: usize,
    ) -> Result<ControlFlow, RuntimeError> {
        match op {
            OpCode::Call => {
                let argc = usize::from(self.read_byte());
                let callee = self.peek(argc);
                self.call(callee, argc)?;
            }
            OpCode::Invoke => {
                let name = self.read_string();
                let argc = usize::from(self.read_byte());
                self.invoke(name, argc)?;
            }
            OpCode::SuperInvoke => {
                let name = self.read_string();
                let argc = usize::from(self.read_byte());
                let Value::Obj(superclass) = self.pop() else {
                    return Err(RuntimeError::operand("Superclass must be a class."));
                };
                self.super_invoke(superclass, name, argc)?;
            }
            OpCode::Closure => self.make_closure(),
            OpCode::CloseUpvalue => {
                self.close_upvalues(self.stack.len() - 1);
                self.pop();
            }
            OpCode::Return => {
                let result = self.pop();
                let Some(frame) = self.frames.pop() else {
                    return Ok(ControlFlow::Return(result));
                };
                self.close_upvalues(frame.base);
                self.stack.truncate(frame.base);
                if self.frames.len() <= entry_depth {
                    return Ok(ControlFlow::Return(result));
                }
                self.push(result);
            }
            _ => unreachable!("{op:?} is not a control instruction"),
        }
        Ok(ControlFlow::Continue)
    }

    /// Build a closure for the function constant operand, capturing the
    /// variables its descriptor pairs name.
    fn make_closure(&mut self) {
        let Value::Obj(function) = self.read_constant() else {
            return;
        };
        let count = match self.heap.get(function) {
            Object::Function(f) => f.upvalue_count,
            _ => 0,
        };
        // Each captured upvalue is rooted by the open-upvalue list or by the
        // enclosing closure, so none can be collected before the closure
        // holds it.
        let mut upvalues: SmallVec<[_; 8]> = SmallVec::with_capacity(count);
        for _ in 0..count {
            let is_local = self.read_byte() == 1;
            let index = usize::from(self.read_byte());
            let upvalue = if is_local {
                let slot = self.frame().base + index;
                self.capture_upvalue(slot)
            } else {
                match self.heap.get(self.frame().closure) {
                    Object::Closure(enclosing) => enclosing.upvalues[index],
                    other => panic!("frame closure is a {}", other.kind().name()),
                }
            };
            upvalues.push(upvalue);
        }
        let closure = self.alloc(Object::Closure(Closure {
            function,
            upvalues: upvalues.into_vec().into_boxed_slice(),
        }));
        self.push(Value::Obj(closure));
    }
}
