use grue_lexer::TokenKind;

use super::{TokenSet, COMPOUND_ASSIGN, STATEMENT_START};

#[test]
fn membership() {
    assert!(STATEMENT_START.contains(TokenKind::Return));
    assert!(STATEMENT_START.contains(TokenKind::Class));
    assert!(!STATEMENT_START.contains(TokenKind::Semicolon));
    assert!(!STATEMENT_START.contains(TokenKind::Eof));
}

#[test]
fn union_and_empty() {
    assert!(TokenSet::new().is_empty());
    let both = STATEMENT_START.union(COMPOUND_ASSIGN);
    assert!(both.contains(TokenKind::PlusEqual));
    assert!(both.contains(TokenKind::While));
    assert!(!both.contains(TokenKind::Equal));
}

#[test]
fn last_token_kind_fits() {
    let set = TokenSet::new().with(TokenKind::Eof);
    assert!(set.contains(TokenKind::Eof));
    assert!(!set.contains(TokenKind::Error));
}
