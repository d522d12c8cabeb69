//! The lexer proper: cursor positions to tokens.
//!
//! # String interpolation
//!
//! `"hp ${mob.hp} of ${mob.max_hp}"` lexes as
//!
//! ```text
//! InterpStart("hp ")  Identifier(mob) Dot Identifier(hp)
//! InterpMid(" of ")   Identifier(mob) Dot Identifier(max_hp)
//! InterpEnd("")
//! ```
//!
//! The lexer carries [`InterpState`]: `None → Start → Expr → End`. `Start`
//! is entered when a string body reaches `${`; the following call moves to
//! `Expr` and lexes ordinary tokens while counting braces. A `}` at brace
//! depth zero moves to `End` and resumes the string body, which yields
//! `InterpMid` (back to `Start`) or `InterpEnd` (back to `None`).

use crate::keywords::keyword;
use crate::{Cursor, Token, TokenKind};

/// Interpolation state carried between [`Lexer::next_token`] calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterpState {
    /// Not inside an interpolated string.
    None,
    /// Just emitted `InterpStart`/`InterpMid`; the expression begins next.
    Start,
    /// Lexing the embedded expression; `depth` counts open braces.
    Expr { depth: u32 },
    /// The expression closed; the string body resumes.
    End,
}

/// Which token a string body produces when it reaches its closing quote.
#[derive(Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    /// A fresh literal: `String` or `InterpStart`.
    Fresh,
    /// Resumed after `}`: `InterpEnd` or `InterpMid`.
    Resumed,
    /// A literal nested inside an interpolated expression; may not
    /// interpolate itself.
    Nested,
}

/// Single-pass lexer over one source buffer.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    interp: InterpState,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            interp: InterpState::None,
        }
    }

    /// Current interpolation state.
    pub fn interp_state(&self) -> InterpState {
        self.interp
    }

    /// Produce the next token.
    ///
    /// After `Eof` has been returned every further call returns `Eof` again.
    pub fn next_token(&mut self) -> Token<'src> {
        if self.interp == InterpState::Start {
            self.interp = InterpState::Expr { depth: 0 };
        }

        self.skip_trivia();
        let start = self.cursor.pos();

        if self.cursor.is_eof() {
            if matches!(self.interp, InterpState::Expr { .. }) {
                self.interp = InterpState::None;
                return self.error(start, "Unterminated string interpolation.");
            }
            return self.make(TokenKind::Eof, start);
        }

        let byte = self.cursor.bump();
        match byte {
            b'(' => self.make(TokenKind::LeftParen, start),
            b')' => self.make(TokenKind::RightParen, start),
            b'{' => {
                if let InterpState::Expr { depth } = &mut self.interp {
                    *depth += 1;
                }
                self.make(TokenKind::LeftBrace, start)
            }
            b'}' => self.right_brace(start),
            b'[' => self.make(TokenKind::LeftBracket, start),
            b']' => self.make(TokenKind::RightBracket, start),
            b',' => self.make(TokenKind::Comma, start),
            b'.' => self.make(TokenKind::Dot, start),
            b';' => self.make(TokenKind::Semicolon, start),
            b'%' => self.make(TokenKind::Percent, start),
            b'-' => {
                let repeat = Some((b'-', TokenKind::MinusMinus));
                self.arith(start, TokenKind::Minus, TokenKind::MinusEqual, repeat)
            }
            b'+' => {
                let repeat = Some((b'+', TokenKind::PlusPlus));
                self.arith(start, TokenKind::Plus, TokenKind::PlusEqual, repeat)
            }
            b'*' => self.arith(start, TokenKind::Star, TokenKind::StarEqual, None),
            b'/' => self.arith(start, TokenKind::Slash, TokenKind::SlashEqual, None),
            b'!' => self.with_equal(start, TokenKind::Bang, TokenKind::BangEqual),
            b'=' => self.with_equal(start, TokenKind::Equal, TokenKind::EqualEqual),
            b'<' => self.with_equal(start, TokenKind::Less, TokenKind::LessEqual),
            b'>' => self.with_equal(start, TokenKind::Greater, TokenKind::GreaterEqual),
            b'"' => {
                let kind = if matches!(self.interp, InterpState::Expr { .. }) {
                    BodyKind::Nested
                } else {
                    BodyKind::Fresh
                };
                self.string_body(start, kind)
            }
            b'0'..=b'9' => self.number(start),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(start),
            _ => {
                // Re-consume the rest of a multi-byte character so the error
                // span covers it and the next token starts on a boundary.
                if byte >= 0x80 {
                    self.cursor.eat_while(|b| (0x80..0xC0).contains(&b));
                }
                self.error(start, "Unexpected character.")
            }
        }
    }

    // ─── Trivia ─────────────────────────────────────────────────────────

    fn skip_trivia(&mut self) {
        loop {
            match self.cursor.current() {
                b' ' | b'\t' | b'\r' | b'\n' if !self.cursor.is_eof() => {
                    self.cursor.bump();
                }
                b'/' if self.cursor.peek() == b'/' => self.cursor.eat_until_newline(),
                _ => return,
            }
        }
    }

    // ─── Operators ──────────────────────────────────────────────────────

    fn with_equal(&mut self, start: u32, single: TokenKind, double: TokenKind) -> Token<'src> {
        let kind = if self.cursor.eat(b'=') { double } else { single };
        self.make(kind, start)
    }

    fn arith(
        &mut self,
        start: u32,
        single: TokenKind,
        assign: TokenKind,
        repeat: Option<(u8, TokenKind)>,
    ) -> Token<'src> {
        if self.cursor.eat(b'=') {
            return self.make(assign, start);
        }
        if let Some((byte, kind)) = repeat {
            if self.cursor.eat(byte) {
                return self.make(kind, start);
            }
        }
        self.make(single, start)
    }

    fn right_brace(&mut self, start: u32) -> Token<'src> {
        match self.interp {
            InterpState::Expr { depth: 0 } => {
                self.interp = InterpState::End;
                self.string_body(start, BodyKind::Resumed)
            }
            InterpState::Expr { depth } => {
                self.interp = InterpState::Expr { depth: depth - 1 };
                self.make(TokenKind::RightBrace, start)
            }
            _ => self.make(TokenKind::RightBrace, start),
        }
    }

    // ─── Literals ───────────────────────────────────────────────────────

    /// Scan a string body whose opening delimiter (`"` or `}`) at `start`
    /// is already consumed.
    fn string_body(&mut self, start: u32, kind: BodyKind) -> Token<'src> {
        let content_start = self.cursor.pos();
        loop {
            if !self.cursor.eat_string_body() {
                self.interp = InterpState::None;
                return self.error(start, "Unterminated string.");
            }
            match self.cursor.current() {
                b'\\' => {
                    self.cursor.bump();
                    if !self.cursor.is_eof() {
                        self.cursor.bump_char();
                    }
                }
                b'$' if self.cursor.peek() == b'{' => {
                    let content_end = self.cursor.pos();
                    self.cursor.bump();
                    self.cursor.bump();
                    if kind == BodyKind::Nested {
                        return self.error(start, "Nested string interpolation is not supported.");
                    }
                    self.interp = InterpState::Start;
                    let token_kind = match kind {
                        BodyKind::Resumed => TokenKind::InterpMid,
                        _ => TokenKind::InterpStart,
                    };
                    return self.make_with_lexeme(token_kind, start, content_start, content_end);
                }
                b'$' => {
                    self.cursor.bump();
                }
                _ => {
                    // Closing quote.
                    let content_end = self.cursor.pos();
                    self.cursor.bump();
                    let token_kind = match kind {
                        BodyKind::Resumed => {
                            self.interp = InterpState::None;
                            TokenKind::InterpEnd
                        }
                        BodyKind::Fresh | BodyKind::Nested => TokenKind::String,
                    };
                    return self.make_with_lexeme(token_kind, start, content_start, content_end);
                }
            }
        }
    }

    fn number(&mut self, start: u32) -> Token<'src> {
        self.cursor.eat_while(|b| b.is_ascii_digit());
        let mut kind = TokenKind::Int;
        if self.cursor.current() == b'.' && self.cursor.peek().is_ascii_digit() {
            self.cursor.bump();
            self.cursor.eat_while(|b| b.is_ascii_digit());
            kind = TokenKind::Double;
        }
        // Integers outside i32 are carried as doubles rather than rejected.
        if kind == TokenKind::Int && self.cursor.slice_from(start).parse::<i32>().is_err() {
            kind = TokenKind::Double;
        }
        self.make(kind, start)
    }

    fn identifier(&mut self, start: u32) -> Token<'src> {
        self.cursor.eat_while(|b| b.is_ascii_alphanumeric() || b == b'_');
        let text = self.cursor.slice_from(start);
        let kind = keyword(text).unwrap_or(TokenKind::Identifier);
        self.make(kind, start)
    }

    // ─── Construction ───────────────────────────────────────────────────

    fn make(&self, kind: TokenKind, start: u32) -> Token<'src> {
        Token {
            kind,
            lexeme: self.cursor.slice_from(start),
            line: self.cursor.line(),
            offset: start,
            len: self.cursor.pos() - start,
        }
    }

    fn make_with_lexeme(
        &self,
        kind: TokenKind,
        start: u32,
        content_start: u32,
        content_end: u32,
    ) -> Token<'src> {
        Token {
            kind,
            lexeme: self.cursor.slice(content_start, content_end),
            line: self.cursor.line(),
            offset: start,
            len: self.cursor.pos() - start,
        }
    }

    fn error(&self, start: u32, message: &'static str) -> Token<'src> {
        Token {
            kind: TokenKind::Error,
            lexeme: message,
            line: self.cursor.line(),
            offset: start,
            len: self.cursor.pos() - start,
        }
    }
}
