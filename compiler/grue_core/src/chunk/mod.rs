//! Bytecode chunks.
//!
//! A chunk is a flat byte array of opcodes and their inline operands, a
//! parallel array giving the source line of every byte, and the constant
//! pool the `Constant`-family operands index into.

mod disasm;

pub use disasm::{disassemble, disassemble_instruction};

use crate::value::Value;

/// Bytecode instructions.
///
/// Operand layout, after the opcode byte:
/// - constant index (1 byte): `Constant`, globals, properties, `GetSuper`,
///   `Class`, `Method`;
/// - slot/count (1 byte): locals, upvalues, `Call`, `Array`, `Bury`;
/// - jump distance (2 bytes, big-endian): `Jump`, `JumpIfFalse`, `Loop`;
/// - constant index + argument count: `Invoke`, `SuperInvoke`;
/// - `Closure`: constant index, then `(is_local, index)` byte pairs, one per
///   upvalue of the function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    // ─── Literals and stack ───
    Constant,
    Nil,
    True,
    False,
    Pop,
    /// Duplicate the top value.
    Dup,
    /// Duplicate the top two values, preserving order.
    Dup2,
    /// Move the top value down under the `n` values beneath it.
    Bury,

    // ─── Variables ───
    GetLocal,
    SetLocal,
    GetGlobal,
    DefineGlobal,
    SetGlobal,
    GetUpvalue,
    SetUpvalue,

    // ─── Properties and indexing ───
    GetProperty,
    SetProperty,
    GetSuper,
    GetIndex,
    SetIndex,
    /// Collect the top `n` values into a new array.
    Array,

    // ─── Arithmetic and comparison ───
    Equal,
    Greater,
    Less,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Not,
    Negate,
    /// Replace the top value with its string rendering.
    Stringify,

    Print,

    // ─── Control flow ───
    Jump,
    JumpIfFalse,
    Loop,

    // ─── Calls and closures ───
    Call,
    Invoke,
    SuperInvoke,
    Closure,
    CloseUpvalue,
    Return,

    // ─── Classes ───
    Class,
    Inherit,
    Method,
}

impl OpCode {
    const ALL: [OpCode; 45] = [
        OpCode::Constant,
        OpCode::Nil,
        OpCode::True,
        OpCode::False,
        OpCode::Pop,
        OpCode::Dup,
        OpCode::Dup2,
        OpCode::Bury,
        OpCode::GetLocal,
        OpCode::SetLocal,
        OpCode::GetGlobal,
        OpCode::DefineGlobal,
        OpCode::SetGlobal,
        OpCode::GetUpvalue,
        OpCode::SetUpvalue,
        OpCode::GetProperty,
        OpCode::SetProperty,
        OpCode::GetSuper,
        OpCode::GetIndex,
        OpCode::SetIndex,
        OpCode::Array,
        OpCode::Equal,
        OpCode::Greater,
        OpCode::Less,
        OpCode::Add,
        OpCode::Subtract,
        OpCode::Multiply,
        OpCode::Divide,
        OpCode::Modulo,
        OpCode::Not,
        OpCode::Negate,
        OpCode::Stringify,
        OpCode::Print,
        OpCode::Jump,
        OpCode::JumpIfFalse,
        OpCode::Loop,
        OpCode::Call,
        OpCode::Invoke,
        OpCode::SuperInvoke,
        OpCode::Closure,
        OpCode::CloseUpvalue,
        OpCode::Return,
        OpCode::Class,
        OpCode::Inherit,
        OpCode::Method,
    ];

    /// Upper-case mnemonic for disassembly.
    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Constant => "OP_CONSTANT",
            OpCode::Nil => "OP_NIL",
            OpCode::True => "OP_TRUE",
            OpCode::False => "OP_FALSE",
            OpCode::Pop => "OP_POP",
            OpCode::Dup => "OP_DUP",
            OpCode::Dup2 => "OP_DUP2",
            OpCode::Bury => "OP_BURY",
            OpCode::GetLocal => "OP_GET_LOCAL",
            OpCode::SetLocal => "OP_SET_LOCAL",
            OpCode::GetGlobal => "OP_GET_GLOBAL",
            OpCode::DefineGlobal => "OP_DEFINE_GLOBAL",
            OpCode::SetGlobal => "OP_SET_GLOBAL",
            OpCode::GetUpvalue => "OP_GET_UPVALUE",
            OpCode::SetUpvalue => "OP_SET_UPVALUE",
            OpCode::GetProperty => "OP_GET_PROPERTY",
            OpCode::SetProperty => "OP_SET_PROPERTY",
            OpCode::GetSuper => "OP_GET_SUPER",
            OpCode::GetIndex => "OP_GET_INDEX",
            OpCode::SetIndex => "OP_SET_INDEX",
            OpCode::Array => "OP_ARRAY",
            OpCode::Equal => "OP_EQUAL",
            OpCode::Greater => "OP_GREATER",
            OpCode::Less => "OP_LESS",
            OpCode::Add => "OP_ADD",
            OpCode::Subtract => "OP_SUBTRACT",
            OpCode::Multiply => "OP_MULTIPLY",
            OpCode::Divide => "OP_DIVIDE",
            OpCode::Modulo => "OP_MODULO",
            OpCode::Not => "OP_NOT",
            OpCode::Negate => "OP_NEGATE",
            OpCode::Stringify => "OP_STRINGIFY",
            OpCode::Print => "OP_PRINT",
            OpCode::Jump => "OP_JUMP",
            OpCode::JumpIfFalse => "OP_JUMP_IF_FALSE",
            OpCode::Loop => "OP_LOOP",
            OpCode::Call => "OP_CALL",
            OpCode::Invoke => "OP_INVOKE",
            OpCode::SuperInvoke => "OP_SUPER_INVOKE",
            OpCode::Closure => "OP_CLOSURE",
            OpCode::CloseUpvalue => "OP_CLOSE_UPVALUE",
            OpCode::Return => "OP_RETURN",
            OpCode::Class => "OP_CLASS",
            OpCode::Inherit => "OP_INHERIT",
            OpCode::Method => "OP_METHOD",
        }
    }
}

/// Byte that does not decode to an [`OpCode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidOpCode(pub u8);

impl TryFrom<u8> for OpCode {
    type Error = InvalidOpCode;

    #[inline]
    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        OpCode::ALL
            .get(usize::from(byte))
            .copied()
            .ok_or(InvalidOpCode(byte))
    }
}

/// A compiled bytecode sequence.
#[derive(Debug, Default)]
pub struct Chunk {
    pub code: Vec<u8>,
    /// Source line of each byte in `code`.
    pub lines: Vec<u32>,
    pub constants: Vec<Value>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn write(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    #[inline]
    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write(op as u8, line);
    }

    /// Append to the constant pool, returning the new index. Limits are the
    /// compiler's concern.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Source line of the byte at `offset`, or 0 if out of range.
    pub fn line_at(&self, offset: usize) -> u32 {
        self.lines.get(offset).copied().unwrap_or(0)
    }

    /// Big-endian `u16` operand at `offset`.
    #[inline]
    pub fn read_u16(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.code[offset], self.code[offset + 1]])
    }
}

#[cfg(test)]
mod tests;
