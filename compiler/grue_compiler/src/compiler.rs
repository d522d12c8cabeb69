//! Compiler state and token plumbing shared by the grammar modules.

use grue_core::{disassemble, Function, Heap, ObjRef, Object, Trace, Value};
use grue_lexer::{Lexer, Token, TokenKind};
use smallvec::SmallVec;

use crate::error::{Diagnostic, ErrorLocation};
use crate::recovery::STATEMENT_START;
use crate::state::{ClassState, CompileRoots, FunctionKind, FunctionState, UpvalueDesc};

pub(crate) struct Compiler<'src, 'h> {
    lexer: Lexer<'src>,
    pub current: Token<'src>,
    pub previous: Token<'src>,
    panic_mode: bool,
    diagnostics: Vec<Diagnostic>,
    heap: &'h mut Heap,
    roots: &'h dyn Trace,
    /// Innermost function last.
    pub states: Vec<FunctionState<'src>>,
    /// Innermost class last.
    pub classes: Vec<ClassState>,
}

impl<'src, 'h> Compiler<'src, 'h> {
    pub fn new(source: &'src str, heap: &'h mut Heap, roots: &'h dyn Trace) -> Self {
        Self {
            lexer: Lexer::new(source),
            current: Token::synthetic(""),
            previous: Token::synthetic(""),
            panic_mode: false,
            diagnostics: Vec::new(),
            heap,
            roots,
            states: vec![FunctionState::new(FunctionKind::Script, None)],
            classes: Vec::new(),
        }
    }

    pub fn had_error(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    // ─── Tokens ───

    pub fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.lexer.next_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            let token = self.current;
            self.error_at(token, token.lexeme);
        }
    }

    pub fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    #[inline]
    pub fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    pub fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    // ─── Diagnostics ───

    pub fn error(&mut self, message: &str) {
        self.error_at(self.previous, message);
    }

    pub fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        let location = match token.kind {
            TokenKind::Eof => ErrorLocation::End,
            TokenKind::Error => ErrorLocation::Lexical,
            _ => ErrorLocation::Token(token.lexeme.to_string()),
        };
        tracing::debug!(line = token.line, message, "compile error");
        self.diagnostics.push(Diagnostic {
            line: token.line,
            offset: token.offset,
            len: token.len,
            location,
            message: message.to_string(),
        });
    }

    /// Leave panic mode at the next statement boundary.
    pub fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon || STATEMENT_START.contains(self.current.kind) {
                return;
            }
            self.advance();
        }
    }

    pub fn in_panic_mode(&self) -> bool {
        self.panic_mode
    }

    // ─── Heap ───

    /// Intern `s`, rooting every unfinished function.
    pub fn intern(&mut self, s: &str) -> ObjRef {
        let roots = CompileRoots {
            outer: self.roots,
            states: &self.states,
        };
        self.heap.intern(s, &roots)
    }

    fn alloc(&mut self, object: Object) -> ObjRef {
        let roots = CompileRoots {
            outer: self.roots,
            states: &self.states,
        };
        self.heap.alloc(object, &roots)
    }

    // ─── Function states ───

    /// Innermost function. The script state is pushed on construction and
    /// popped only by the final `end_function`.
    #[inline]
    pub fn state(&self) -> &FunctionState<'src> {
        &self.states[self.states.len() - 1]
    }

    #[inline]
    pub fn state_mut(&mut self) -> &mut FunctionState<'src> {
        let last = self.states.len() - 1;
        &mut self.states[last]
    }

    pub fn begin_function(&mut self, kind: FunctionKind) {
        let name = self.intern(self.previous.lexeme);
        self.states.push(FunctionState::new(kind, Some(name)));
    }

    /// Emit the implicit return and pop the innermost function state.
    pub fn end_function(&mut self) -> (Function, SmallVec<[UpvalueDesc; 8]>) {
        self.emit_return();
        let mut state = self.states.pop().unwrap_or_else(|| {
            unreachable!("function state stack underflow")
        });
        state.function.upvalue_count = state.upvalues.len();
        (state.function, state.upvalues)
    }

    /// Move a finished function into the heap.
    pub fn finish_function(&mut self, function: Function) -> ObjRef {
        let name = function.name;
        let code_len = function.chunk.code.len();
        let constants = function.chunk.constants.len();
        let r = self.alloc(Object::Function(function));
        let label = name.and_then(|n| self.heap.as_str(n)).unwrap_or("<script>");
        tracing::debug!(function = label, code_len, constants, "compiled function");
        if tracing::enabled!(tracing::Level::TRACE) {
            if let Object::Function(function) = self.heap.get(r) {
                tracing::trace!("\n{}", disassemble(&*self.heap, &function.chunk, label));
            }
        }
        r
    }

    /// Value for a string literal, decoding escapes.
    pub fn string_value(&mut self, raw: &str) -> Value {
        match decode_escapes(raw) {
            Ok(text) => Value::Obj(self.intern(&text)),
            Err(message) => {
                self.error(message);
                Value::Nil
            }
        }
    }
}

/// Decode `\n \t \r \" \\ \$ \0` escapes.
pub(crate) fn decode_escapes(raw: &str) -> Result<String, &'static str> {
    if !raw.contains('\\') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let decoded = match chars.next() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('"') => '"',
            Some('\\') => '\\',
            Some('$') => '$',
            Some('0') => '\0',
            _ => return Err("Invalid escape sequence."),
        };
        out.push(decoded);
    }
    Ok(out)
}
