//! Grue Compiler - single-pass bytecode compiler for entity scripts.
//!
//! There is no syntax tree. The compiler pulls tokens from the lexer and
//! emits bytecode directly: a Pratt table drives expressions, recursive
//! descent drives statements, and names are resolved to local slots,
//! upvalues or global name constants as they are seen.
//!
//! Every object the compiler creates (interned names, string constants,
//! nested function objects) is allocated into the caller's [`Heap`]. Those
//! allocations can trigger a collection, so [`compile`] takes the caller's
//! roots and adds the constant pools of every function still being compiled.
//!
//! # Errors
//!
//! The compiler reports an error, synchronizes at the next statement
//! boundary and keeps going, so a single [`CompileError`] can carry several
//! [`Diagnostic`]s.

mod compiler;
mod emit;
mod error;
mod grammar;
mod recovery;
mod resolve;
mod state;

pub use error::{CompileError, Diagnostic, ErrorLocation};
pub use recovery::TokenSet;

use grue_core::{Heap, ObjRef, Trace};
use grue_lexer::TokenKind;

use compiler::Compiler;

/// Compile `source` into a top-level script function.
///
/// The returned function is not rooted: the caller must make it reachable
/// before allocating again.
#[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
pub fn compile(source: &str, heap: &mut Heap, roots: &dyn Trace) -> Result<ObjRef, CompileError> {
    let mut compiler = Compiler::new(source, heap, roots);
    compiler.advance();
    while !compiler.match_token(TokenKind::Eof) {
        compiler.declaration();
    }
    let (script, _) = compiler.end_function();
    if compiler.had_error() {
        return Err(CompileError::new(compiler.into_diagnostics()));
    }
    Ok(compiler.finish_function(script))
}

#[cfg(test)]
mod tests;
