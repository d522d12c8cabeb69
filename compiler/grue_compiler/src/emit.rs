//! Bytecode emission into the innermost function's chunk.

use grue_core::{ObjRef, OpCode, Value};

use crate::compiler::Compiler;
use crate::state::{ConstKey, FunctionKind, MAX_CONSTANTS};

impl Compiler<'_, '_> {
    pub fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.state_mut().function.chunk.write(byte, line);
    }

    pub fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op as u8);
    }

    pub fn emit_op_arg(&mut self, op: OpCode, arg: u8) {
        self.emit_op(op);
        self.emit_byte(arg);
    }

    pub fn emit_return(&mut self) {
        if self.state().kind == FunctionKind::Initializer {
            self.emit_op_arg(OpCode::GetLocal, 0);
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.emit_op(OpCode::Return);
    }

    /// Constant pool index for `value`, reusing an equal existing entry.
    pub fn make_constant(&mut self, value: Value) -> u8 {
        let key = match value {
            Value::Int(i) => Some(ConstKey::Int(i)),
            Value::Double(d) => Some(ConstKey::Double(d.to_bits())),
            Value::Obj(r) => Some(ConstKey::Obj(r)),
            Value::Nil | Value::Bool(_) => None,
        };
        if let Some(index) = key.and_then(|k| self.state().constants.get(&k).copied()) {
            return index;
        }
        let state = self.state_mut();
        if state.function.chunk.constants.len() >= MAX_CONSTANTS {
            self.error("Too many constants in one chunk.");
            return 0;
        }
        let index = state.function.chunk.add_constant(value) as u8;
        if let Some(key) = key {
            state.constants.insert(key, index);
        }
        index
    }

    pub fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_op_arg(OpCode::Constant, index);
    }

    /// Constant holding the interned name `name`.
    pub fn identifier_constant(&mut self, name: &str) -> u8 {
        let r: ObjRef = self.intern(name);
        self.make_constant(Value::Obj(r))
    }

    /// Emit a forward jump with a placeholder distance; returns the operand
    /// offset for [`Compiler::patch_jump`].
    pub fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.state().function.chunk.code.len() - 2
    }

    pub fn patch_jump(&mut self, offset: usize) {
        let code_len = self.state().function.chunk.code.len();
        let Ok(distance) = u16::try_from(code_len - offset - 2) else {
            self.error("Too much code to jump over.");
            return;
        };
        let [hi, lo] = distance.to_be_bytes();
        let code = &mut self.state_mut().function.chunk.code;
        code[offset] = hi;
        code[offset + 1] = lo;
    }

    pub fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(OpCode::Loop);
        let distance = self.state().function.chunk.code.len() - loop_start + 2;
        let distance = u16::try_from(distance).unwrap_or_else(|_| {
            self.error("Loop body too large.");
            0
        });
        let [hi, lo] = distance.to_be_bytes();
        self.emit_byte(hi);
        self.emit_byte(lo);
    }
}
