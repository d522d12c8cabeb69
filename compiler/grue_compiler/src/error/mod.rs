//! Compile diagnostics.
//!
//! The compiler keeps going after an error (see [`crate::recovery`]) so one
//! compile can report several problems. A [`CompileError`] carries all of
//! them, in source order.

use std::fmt;

/// What the diagnostic points at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorLocation {
    /// A token, shown by its lexeme.
    Token(String),
    /// End of input.
    End,
    /// A lexical error; the message already describes the text.
    Lexical,
}

/// One compile error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based source line.
    pub line: u32,
    /// Byte offset of the offending text.
    pub offset: u32,
    /// Byte length of the offending text.
    pub len: u32,
    pub location: ErrorLocation,
    pub message: String,
}

impl Diagnostic {
    /// Byte range in the source.
    pub fn span(&self) -> std::ops::Range<usize> {
        let start = self.offset as usize;
        start..start + self.len as usize
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error", self.line)?;
        match &self.location {
            ErrorLocation::Token(lexeme) => write!(f, " at '{lexeme}'")?,
            ErrorLocation::End => f.write_str(" at end")?,
            ErrorLocation::Lexical => {}
        }
        write!(f, ": {}", self.message)
    }
}

/// Compilation failed. Holds at least one diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileError {
    diagnostics: Vec<Diagnostic>,
}

impl CompileError {
    pub(crate) fn new(diagnostics: Vec<Diagnostic>) -> Self {
        debug_assert!(!diagnostics.is_empty());
        Self { diagnostics }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}
