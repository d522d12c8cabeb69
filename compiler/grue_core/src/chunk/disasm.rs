use std::fmt::Write;

use super::{Chunk, OpCode};
use crate::heap::Heap;
use crate::object::Object;

/// Render every instruction of `chunk` under a `== name ==` header.
pub fn disassemble(heap: &Heap, chunk: &Chunk, name: &str) -> String {
    let mut out = format!("== {name} ==\n");
    let mut offset = 0;
    while offset < chunk.code.len() {
        offset = disassemble_instruction(heap, chunk, offset, &mut out);
    }
    out
}

/// Render the instruction at `offset` into `out`, returning the offset of
/// the next instruction.
pub fn disassemble_instruction(heap: &Heap, chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let _ = write!(out, "{offset:04} ");
    if offset > 0 && chunk.line_at(offset) == chunk.line_at(offset - 1) {
        out.push_str("   | ");
    } else {
        let _ = write!(out, "{:4} ", chunk.line_at(offset));
    }

    let byte = chunk.code[offset];
    let Ok(op) = OpCode::try_from(byte) else {
        let _ = writeln!(out, "Unknown opcode {byte}");
        return offset + 1;
    };
    let name = op.mnemonic();

    match op {
        OpCode::Constant
        | OpCode::GetGlobal
        | OpCode::DefineGlobal
        | OpCode::SetGlobal
        | OpCode::GetProperty
        | OpCode::SetProperty
        | OpCode::GetSuper
        | OpCode::Class
        | OpCode::Method => constant(heap, chunk, name, offset, out),
        OpCode::GetLocal
        | OpCode::SetLocal
        | OpCode::GetUpvalue
        | OpCode::SetUpvalue
        | OpCode::Call
        | OpCode::Array
        | OpCode::Bury => {
            let _ = writeln!(out, "{name:<16} {:4}", chunk.code[offset + 1]);
            offset + 2
        }
        OpCode::Jump | OpCode::JumpIfFalse => jump(chunk, name, true, offset, out),
        OpCode::Loop => jump(chunk, name, false, offset, out),
        OpCode::Invoke | OpCode::SuperInvoke => {
            let index = chunk.code[offset + 1];
            let argc = chunk.code[offset + 2];
            let value = chunk.constants[usize::from(index)];
            let _ = writeln!(out, "{name:<16} ({argc} args) {index:4} '{}'", value.display(heap));
            offset + 3
        }
        OpCode::Closure => {
            let index = chunk.code[offset + 1];
            let value = chunk.constants[usize::from(index)];
            let _ = writeln!(out, "{name:<16} {index:4} {}", value.display(heap));
            let upvalue_count = match value.as_obj().and_then(|r| heap.try_get(r)) {
                Some(Object::Function(function)) => function.upvalue_count,
                _ => 0,
            };
            let mut next = offset + 2;
            for _ in 0..upvalue_count {
                let is_local = chunk.code[next];
                let slot = chunk.code[next + 1];
                let kind = if is_local == 1 { "local" } else { "upvalue" };
                let _ = writeln!(out, "{next:04}    |                     {kind} {slot}");
                next += 2;
            }
            next
        }
        _ => {
            let _ = writeln!(out, "{name}");
            offset + 1
        }
    }
}

fn constant(heap: &Heap, chunk: &Chunk, name: &str, offset: usize, out: &mut String) -> usize {
    let index = chunk.code[offset + 1];
    let value = chunk.constants[usize::from(index)];
    let _ = writeln!(out, "{name:<16} {index:4} '{}'", value.display(heap));
    offset + 2
}

fn jump(chunk: &Chunk, name: &str, forward: bool, offset: usize, out: &mut String) -> usize {
    let distance = usize::from(chunk.read_u16(offset + 1));
    let next = offset + 3;
    let target = if forward { next + distance } else { next.saturating_sub(distance) };
    let _ = writeln!(out, "{name:<16} {offset:4} -> {target}");
    next
}
