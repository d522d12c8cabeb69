//! Error recovery.
//!
//! After reporting an error the compiler enters panic mode, suppressing
//! further diagnostics, and skips tokens until it reaches a statement
//! boundary. Membership tests use a `u64` bitset over token discriminants.

use grue_lexer::TokenKind;

/// A set of token kinds with O(1) membership.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct TokenSet(u64);

impl TokenSet {
    #[inline]
    pub const fn new() -> Self {
        Self(0)
    }

    #[inline]
    #[must_use]
    pub const fn with(self, kind: TokenKind) -> Self {
        Self(self.0 | (1u64 << kind.index()))
    }

    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn contains(self, kind: TokenKind) -> bool {
        self.0 & (1u64 << kind.index()) != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Tokens that begin a statement; recovery stops in front of them.
pub const STATEMENT_START: TokenSet = TokenSet::new()
    .with(TokenKind::Class)
    .with(TokenKind::Fun)
    .with(TokenKind::Var)
    .with(TokenKind::For)
    .with(TokenKind::If)
    .with(TokenKind::While)
    .with(TokenKind::Print)
    .with(TokenKind::Return);

/// Binary operators that may follow `=` on an assignment target.
pub const COMPOUND_ASSIGN: TokenSet = TokenSet::new()
    .with(TokenKind::PlusEqual)
    .with(TokenKind::MinusEqual)
    .with(TokenKind::StarEqual)
    .with(TokenKind::SlashEqual);

#[cfg(test)]
mod tests;
