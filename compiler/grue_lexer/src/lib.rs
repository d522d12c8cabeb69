//! Grue Lexer - tokenizer for entity scripts.
//!
//! Produces a lazy token stream over a single source buffer. The compiler
//! pulls one token at a time; there is no lookahead buffer and no restart.
//!
//! # Layers
//!
//! - [`Cursor`]: byte cursor with line tracking and `memchr`-accelerated
//!   skipping of comments and string bodies.
//! - [`Lexer`]: turns cursor positions into [`Token`]s, resolves keywords,
//!   and drives the string interpolation state machine.
//!
//! # Errors
//!
//! Lexical errors never panic and never return `Err`. They are produced as
//! [`TokenKind::Error`] tokens whose lexeme is the message, so the compiler
//! reports them through its ordinary diagnostic path.

mod cursor;
mod keywords;
mod scanner;
mod token;

pub use cursor::Cursor;
pub use keywords::keyword;
pub use scanner::{InterpState, Lexer};
pub use token::{Token, TokenKind};

/// Collect every token of `source`, including the terminating `Eof` or
/// `Error`.
///
/// Convenience for tooling and tests; the compiler uses [`Lexer`] directly.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return tokens;
        }
    }
}
