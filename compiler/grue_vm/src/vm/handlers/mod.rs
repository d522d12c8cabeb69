//! Opcode handlers, grouped by category.

mod access;
mod arithmetic;
mod classes;
mod control;
mod variables;
