//! Grue Core - the data model shared by the script compiler and VM.
//!
//! # Contents
//!
//! - [`Value`]: the tagged value every script expression evaluates to.
//! - [`Object`]: heap object variants, from strings and closures to the host
//!   entities (rooms, mobs, items) the game world exposes to scripts.
//! - [`Heap`]: slot arena with index+generation handles ([`ObjRef`]), string
//!   interning, and the mark-sweep collector.
//! - [`Table`] / [`SortedTable`]: open-addressing hash table used for
//!   globals, fields, method tables and interning.
//! - [`Chunk`] / [`OpCode`]: compiled bytecode and its disassembler.
//! - [`SegVec`] / [`ValueList`]: auxiliary collections.
//!
//! # Garbage collection
//!
//! Every allocation names its roots through the [`Trace`] trait. The heap
//! collects before inserting when the allocation threshold is crossed, so a
//! caller can never observe a collection it did not supply roots for.

pub mod chunk;
pub mod collections;
pub mod heap;
pub mod object;
pub mod table;
mod value;

pub use chunk::{disassemble, disassemble_instruction, Chunk, OpCode};
pub use collections::{SegVec, ValueList};
pub use heap::{GcConfig, GcStats, Heap, HeapError, SlotFlags, Trace, Tracer};
pub use object::{
    Accessor, BoundMethod, BoundNative, Class, Closure, Entity, EntityKind, Function, Instance,
    Native, NativeField, NativeId, NativeKind, ObjKind, ObjRef, ObjString, Object, Upvalue,
    UpvalueState,
};
pub use table::{Key, SortedTable, Table};
pub use value::{Value, ValueDisplay};
