use pretty_assertions::assert_eq;

use super::{disassemble, Chunk, OpCode};
use crate::heap::Heap;
use crate::value::Value;

#[test]
fn every_opcode_round_trips_through_its_byte() {
    for op in OpCode::ALL {
        assert_eq!(OpCode::try_from(op as u8), Ok(op));
    }
    assert!(OpCode::try_from(OpCode::ALL.len() as u8).is_err());
}

#[test]
fn lines_track_bytes() {
    let mut chunk = Chunk::new();
    chunk.write_op(OpCode::Nil, 1);
    chunk.write_op(OpCode::Return, 2);
    assert_eq!(chunk.line_at(0), 1);
    assert_eq!(chunk.line_at(1), 2);
    assert_eq!(chunk.line_at(9), 0);
}

#[test]
fn disassembles_constants_and_jumps() {
    let heap = Heap::default();
    let mut chunk = Chunk::new();
    let index = chunk.add_constant(Value::Int(42));
    chunk.write_op(OpCode::Constant, 1);
    chunk.write(index as u8, 1);
    chunk.write_op(OpCode::JumpIfFalse, 1);
    chunk.write(0, 1);
    chunk.write(1, 1);
    chunk.write_op(OpCode::Print, 2);
    chunk.write_op(OpCode::Return, 2);

    let text = disassemble(&heap, &chunk, "test");
    let expected = "\
== test ==
0000    1 OP_CONSTANT         0 '42'
0002    | OP_JUMP_IF_FALSE    2 -> 6
0005    2 OP_PRINT
0006    | OP_RETURN
";
    assert_eq!(text, expected);
}
