//! The dispatch loop.

use grue_core::{disassemble_instruction, ObjRef, OpCode, Value};

use super::{chunk_of, Vm};
use crate::error::{RuntimeError, RuntimeErrorKind};

/// Whether the loop keeps going after an instruction.
pub(crate) enum ControlFlow {
    Continue,
    /// The entry frame returned this value.
    Return(Value),
}

impl Vm {
    /// Execute until the frame stack drops back to `entry_depth`.
    pub(crate) fn run(&mut self, entry_depth: usize) -> Result<Value, RuntimeError> {
        loop {
            if tracing::enabled!(tracing::Level::TRACE) {
                self.trace_instruction();
            }
            let byte = self.read_byte();
            let op = OpCode::try_from(byte).map_err(|err| {
                RuntimeError::new(
                    RuntimeErrorKind::InvalidBytecode,
                    format!("Unknown opcode {}.", err.0),
                )
            })?;

            match op {
                OpCode::Constant => {
                    let value = self.read_constant();
                    self.push(value);
                }
                OpCode::Nil => self.push(Value::Nil),
                OpCode::True => self.push(Value::Bool(true)),
                OpCode::False => self.push(Value::Bool(false)),
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::Dup => self.push(self.peek(0)),
                OpCode::Dup2 => {
                    let (a, b) = (self.peek(1), self.peek(0));
                    self.push(a);
                    self.push(b);
                }
                OpCode::Bury => {
                    let depth = usize::from(self.read_byte());
                    let value = self.pop();
                    let at = self.stack.len().saturating_sub(depth);
                    self.stack.insert(at, value);
                }

                OpCode::GetLocal
                | OpCode::SetLocal
                | OpCode::GetGlobal
                | OpCode::DefineGlobal
                | OpCode::SetGlobal
                | OpCode::GetUpvalue
                | OpCode::SetUpvalue => self.execute_variables(op)?,

                OpCode::GetProperty
                | OpCode::SetProperty
                | OpCode::GetSuper
                | OpCode::GetIndex
                | OpCode::SetIndex
                | OpCode::Array => self.execute_access(op)?,

                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(a == b));
                }
                OpCode::Not => {
                    let value = self.pop();
                    self.push(Value::Bool(value.is_falsey()));
                }
                OpCode::Greater
                | OpCode::Less
                | OpCode::Add
                | OpCode::Subtract
                | OpCode::Multiply
                | OpCode::Divide
                | OpCode::Modulo
                | OpCode::Negate
                | OpCode::Stringify => self.execute_arithmetic(op)?,

                OpCode::Print => {
                    let value = self.pop();
                    let text = value.display(&self.heap).to_string();
                    self.print.println(&text);
                }

                OpCode::Jump => {
                    let offset = self.read_u16();
                    self.frame_mut().ip += usize::from(offset);
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_u16();
                    if self.peek(0).is_falsey() {
                        self.frame_mut().ip += usize::from(offset);
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_u16();
                    self.frame_mut().ip -= usize::from(offset);
                }

                OpCode::Call
                | OpCode::Invoke
                | OpCode::SuperInvoke
                | OpCode::Closure
                | OpCode::CloseUpvalue
                | OpCode::Return => {
                    if let ControlFlow::Return(value) = self.execute_control(op, entry_depth)? {
                        return Ok(value);
                    }
                }

                OpCode::Class | OpCode::Inherit | OpCode::Method => self.execute_class(op)?,
            }
        }
    }

    fn trace_instruction(&self) {
        let Some(frame) = self.frames.last() else {
            return;
        };
        let stack = self
            .stack
            .iter()
            .map(|value| format!("[ {} ]", value.display(&self.heap)))
            .collect::<String>();
        let mut text = String::new();
        let chunk = chunk_of(&self.heap, frame.function);
        disassemble_instruction(&self.heap, chunk, frame.ip, &mut text);
        tracing::trace!(stack = %stack, "{}", text.trim_end());
    }

    // ─── Operand decoding ───

    pub(crate) fn frame_mut(&mut self) -> &mut super::CallFrame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    pub(crate) fn frame(&self) -> &super::CallFrame {
        &self.frames[self.frames.len() - 1]
    }

    #[inline]
    pub(crate) fn read_byte(&mut self) -> u8 {
        let last = self.frames.len() - 1;
        let frame = &mut self.frames[last];
        let byte = chunk_of(&self.heap, frame.function).code[frame.ip];
        frame.ip += 1;
        byte
    }

    #[inline]
    pub(crate) fn read_u16(&mut self) -> u16 {
        let high = self.read_byte();
        let low = self.read_byte();
        u16::from_be_bytes([high, low])
    }

    pub(crate) fn read_constant(&mut self) -> Value {
        let index = usize::from(self.read_byte());
        chunk_of(&self.heap, self.frame().function).constants[index]
    }

    /// A name operand: a string constant.
    pub(crate) fn read_string(&mut self) -> ObjRef {
        match self.read_constant() {
            Value::Obj(r) => r,
            other => panic!("name operand is a {}", other.type_name(&self.heap)),
        }
    }
}
