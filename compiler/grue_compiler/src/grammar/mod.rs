//! Grammar: a Pratt parser for expressions and recursive descent for
//! statements, emitting bytecode as it goes.

mod expr;
mod stmt;

use grue_lexer::TokenKind;

use crate::compiler::Compiler;
use crate::recovery::COMPOUND_ASSIGN;

/// Binding power, lowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
    Primary,
}

impl Precedence {
    fn next(self) -> Self {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

/// `can_assign` is true when the expression may be an assignment target.
type ParseFn<'src, 'h> = fn(&mut Compiler<'src, 'h>, bool);

struct ParseRule<'src, 'h> {
    prefix: Option<ParseFn<'src, 'h>>,
    infix: Option<ParseFn<'src, 'h>>,
    precedence: Precedence,
}

impl<'src, 'h> ParseRule<'src, 'h> {
    const fn new(
        prefix: Option<ParseFn<'src, 'h>>,
        infix: Option<ParseFn<'src, 'h>>,
        precedence: Precedence,
    ) -> Self {
        Self {
            prefix,
            infix,
            precedence,
        }
    }
}

fn rule<'src, 'h>(kind: TokenKind) -> ParseRule<'src, 'h> {
    use Precedence as P;
    use TokenKind as T;
    match kind {
        T::LeftParen => ParseRule::new(Some(Compiler::grouping), Some(Compiler::call), P::Call),
        T::LeftBracket => ParseRule::new(Some(Compiler::array), Some(Compiler::index), P::Call),
        T::Dot => ParseRule::new(None, Some(Compiler::dot), P::Call),
        T::Minus => ParseRule::new(Some(Compiler::unary), Some(Compiler::binary), P::Term),
        T::Plus => ParseRule::new(None, Some(Compiler::binary), P::Term),
        T::Slash | T::Star | T::Percent => ParseRule::new(None, Some(Compiler::binary), P::Factor),
        T::Bang => ParseRule::new(Some(Compiler::unary), None, P::None),
        T::BangEqual | T::EqualEqual => ParseRule::new(None, Some(Compiler::binary), P::Equality),
        T::Greater | T::GreaterEqual | T::Less | T::LessEqual => {
            ParseRule::new(None, Some(Compiler::binary), P::Comparison)
        }
        T::PlusPlus | T::MinusMinus => ParseRule::new(Some(Compiler::pre_increment), None, P::None),
        T::Identifier => ParseRule::new(Some(Compiler::variable), None, P::None),
        T::String => ParseRule::new(Some(Compiler::string), None, P::None),
        T::InterpStart => ParseRule::new(Some(Compiler::interpolation), None, P::None),
        T::Int | T::Double => ParseRule::new(Some(Compiler::number), None, P::None),
        T::And => ParseRule::new(None, Some(Compiler::and), P::And),
        T::Or => ParseRule::new(None, Some(Compiler::or), P::Or),
        T::False | T::True | T::Nil => ParseRule::new(Some(Compiler::literal), None, P::None),
        T::This => ParseRule::new(Some(Compiler::this), None, P::None),
        T::Super => ParseRule::new(Some(Compiler::super_), None, P::None),
        _ => ParseRule::new(None, None, P::None),
    }
}

impl Compiler<'_, '_> {
    pub fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        grue_stack::ensure_sufficient_stack(|| self.parse_precedence_inner(precedence));
    }

    fn parse_precedence_inner(&mut self, precedence: Precedence) {
        self.advance();
        let Some(prefix) = rule(self.previous.kind).prefix else {
            self.error("Expect expression.");
            return;
        };
        let can_assign = precedence <= Precedence::Assignment;
        prefix(self, can_assign);

        while precedence <= rule(self.current.kind).precedence {
            self.advance();
            if let Some(infix) = rule(self.previous.kind).infix {
                infix(self, can_assign);
            }
        }

        if can_assign && (self.check(TokenKind::Equal) || COMPOUND_ASSIGN.contains(self.current.kind)) {
            self.advance();
            self.error("Invalid assignment target.");
        }
    }
}
