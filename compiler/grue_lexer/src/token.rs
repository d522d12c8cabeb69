//! Token kinds and the token record handed to the compiler.

/// Kind of a lexical token.
///
/// `#[repr(u8)]` so that recovery sets in the compiler can use the
/// discriminant as a bit index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenKind {
    // Punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    Semicolon,

    // Operators
    Minus,
    MinusEqual,
    MinusMinus,
    Plus,
    PlusEqual,
    PlusPlus,
    Slash,
    SlashEqual,
    Star,
    StarEqual,
    Percent,
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals
    Identifier,
    String,
    Int,
    Double,
    /// Text before the first `${` of an interpolated string.
    InterpStart,
    /// Text between a `}` and the next `${`.
    InterpMid,
    /// Text between the last `}` and the closing quote.
    InterpEnd,

    // Keywords
    And,
    Class,
    Else,
    False,
    For,
    Fun,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    Error,
    Eof,
}

impl TokenKind {
    /// Number of token kinds. Must stay below 64 for `u64` token sets.
    pub const COUNT: usize = TokenKind::Eof as usize + 1;

    /// Discriminant as a bit index.
    #[inline]
    pub const fn index(self) -> u32 {
        self as u32
    }

    /// Whether this kind begins or continues a string literal.
    pub const fn is_string_part(self) -> bool {
        matches!(
            self,
            TokenKind::String | TokenKind::InterpStart | TokenKind::InterpMid | TokenKind::InterpEnd
        )
    }
}

const _: () = assert!(TokenKind::COUNT <= 64);

/// A token borrowed from the source buffer.
///
/// For string-like tokens the lexeme is the raw text between delimiters,
/// escapes not yet decoded. For [`TokenKind::Error`] the lexeme is the error
/// message; `offset`/`len` still locate the offending source text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub lexeme: &'src str,
    /// 1-based source line of the token start.
    pub line: u32,
    /// Byte offset of the token start.
    pub offset: u32,
    /// Length in bytes of the source text the token covers.
    pub len: u32,
}

impl<'src> Token<'src> {
    /// A placeholder used before the first token is read.
    pub const fn synthetic(lexeme: &'src str) -> Self {
        Token {
            kind: TokenKind::Error,
            lexeme,
            line: 0,
            offset: 0,
            len: 0,
        }
    }

    /// Byte range of the token in its source.
    pub fn span(&self) -> std::ops::Range<usize> {
        let start = self.offset as usize;
        start..start + self.len as usize
    }
}
