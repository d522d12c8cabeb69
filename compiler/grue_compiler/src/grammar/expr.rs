//! Expression parse functions referenced from the rule table.

use grue_core::{OpCode, Value};
use grue_lexer::{Token, TokenKind};

use super::Precedence;
use crate::compiler::Compiler;
use crate::recovery::COMPOUND_ASSIGN;
use crate::resolve::Resolved;

/// Most arguments, parameters or array elements one instruction can carry.
const MAX_ARGS: usize = 255;

/// A read-modify-write target after its receiver (and index) are on the
/// stack.
#[derive(Clone, Copy)]
enum Place {
    Variable(Resolved),
    /// Receiver on the stack; property name constant.
    Property(u8),
    /// Receiver and index on the stack.
    Index,
}

impl<'src> Compiler<'src, '_> {
    // ─── Literals ───

    pub(super) fn number(&mut self, _can_assign: bool) {
        let lexeme = self.previous.lexeme;
        let value = match self.previous.kind {
            TokenKind::Int => lexeme
                .parse::<i32>()
                .map(Value::Int)
                .or_else(|_| lexeme.parse::<f64>().map(Value::Double)),
            _ => lexeme.parse::<f64>().map(Value::Double),
        };
        match value {
            Ok(value) => self.emit_constant(value),
            Err(_) => self.error("Invalid number literal."),
        }
    }

    pub(super) fn string(&mut self, _can_assign: bool) {
        let value = self.string_value(self.previous.lexeme);
        self.emit_constant(value);
    }

    /// `"a ${x} b ${y} c"` compiles to `"a " + str(x) + " b " + str(y) + " c"`.
    pub(super) fn interpolation(&mut self, _can_assign: bool) {
        let head = self.string_value(self.previous.lexeme);
        self.emit_constant(head);
        loop {
            self.expression();
            self.emit_op(OpCode::Stringify);
            self.emit_op(OpCode::Add);

            let more = match self.current.kind {
                TokenKind::InterpMid => true,
                TokenKind::InterpEnd => false,
                _ => {
                    self.error_at_current("Expect '}' after interpolated expression.");
                    return;
                }
            };
            self.advance();
            if !self.previous.lexeme.is_empty() {
                let text = self.string_value(self.previous.lexeme);
                self.emit_constant(text);
                self.emit_op(OpCode::Add);
            }
            if !more {
                return;
            }
        }
    }

    pub(super) fn literal(&mut self, _can_assign: bool) {
        match self.previous.kind {
            TokenKind::False => self.emit_op(OpCode::False),
            TokenKind::True => self.emit_op(OpCode::True),
            _ => self.emit_op(OpCode::Nil),
        }
    }

    pub(super) fn array(&mut self, _can_assign: bool) {
        let mut count = 0usize;
        if !self.check(TokenKind::RightBracket) {
            loop {
                self.expression();
                if count == MAX_ARGS {
                    self.error("Can't have more than 255 elements in an array literal.");
                }
                count += 1;
                if !self.match_token(TokenKind::Comma) || self.check(TokenKind::RightBracket) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightBracket, "Expect ']' after array elements.");
        self.emit_op_arg(OpCode::Array, count.min(MAX_ARGS) as u8);
    }

    // ─── Operators ───

    pub(super) fn grouping(&mut self, _can_assign: bool) {
        self.expression();
        self.consume(TokenKind::RightParen, "Expect ')' after expression.");
    }

    pub(super) fn unary(&mut self, _can_assign: bool) {
        let operator = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            _ => self.emit_op(OpCode::Not),
        }
    }

    pub(super) fn binary(&mut self, _can_assign: bool) {
        let operator = self.previous.kind;
        self.parse_precedence(super::rule(operator).precedence.next());
        match operator {
            TokenKind::BangEqual => {
                self.emit_op(OpCode::Equal);
                self.emit_op(OpCode::Not);
            }
            TokenKind::EqualEqual => self.emit_op(OpCode::Equal),
            TokenKind::Greater => self.emit_op(OpCode::Greater),
            TokenKind::GreaterEqual => {
                self.emit_op(OpCode::Less);
                self.emit_op(OpCode::Not);
            }
            TokenKind::Less => self.emit_op(OpCode::Less),
            TokenKind::LessEqual => {
                self.emit_op(OpCode::Greater);
                self.emit_op(OpCode::Not);
            }
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            _ => self.emit_op(OpCode::Modulo),
        }
    }

    pub(super) fn and(&mut self, _can_assign: bool) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    pub(super) fn or(&mut self, _can_assign: bool) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(else_jump);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    // ─── Calls and access ───

    pub(super) fn call(&mut self, _can_assign: bool) {
        let argc = self.argument_list();
        self.emit_op_arg(OpCode::Call, argc);
    }

    fn argument_list(&mut self) -> u8 {
        let mut count = 0usize;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression();
                if count == MAX_ARGS {
                    self.error("Can't have more than 255 arguments.");
                }
                count += 1;
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after arguments.");
        count.min(MAX_ARGS) as u8
    }

    pub(super) fn dot(&mut self, can_assign: bool) {
        self.consume(TokenKind::Identifier, "Expect property name after '.'.");
        let name = self.identifier_constant(self.previous.lexeme);
        if self.match_token(TokenKind::LeftParen) {
            let argc = self.argument_list();
            self.emit_op_arg(OpCode::Invoke, name);
            self.emit_byte(argc);
        } else {
            self.access(Place::Property(name), can_assign);
        }
    }

    pub(super) fn index(&mut self, can_assign: bool) {
        self.expression();
        self.consume(TokenKind::RightBracket, "Expect ']' after index.");
        self.access(Place::Index, can_assign);
    }

    pub(super) fn variable(&mut self, can_assign: bool) {
        self.named_variable(self.previous, can_assign);
    }

    pub(super) fn named_variable(&mut self, name: Token<'src>, can_assign: bool) {
        let resolved = self.resolve(name.lexeme);
        self.access(Place::Variable(resolved), can_assign);
    }

    /// Finish a read, plain assignment, compound assignment or postfix
    /// increment of `place`.
    fn access(&mut self, place: Place, can_assign: bool) {
        if can_assign && self.match_token(TokenKind::Equal) {
            self.expression();
            self.store(place);
        } else if can_assign && COMPOUND_ASSIGN.contains(self.current.kind) {
            self.advance();
            let op = match self.previous.kind {
                TokenKind::PlusEqual => OpCode::Add,
                TokenKind::MinusEqual => OpCode::Subtract,
                TokenKind::StarEqual => OpCode::Multiply,
                _ => OpCode::Divide,
            };
            self.load_for_update(place);
            self.expression();
            self.emit_op(op);
            self.store(place);
        } else if self.check(TokenKind::PlusPlus) || self.check(TokenKind::MinusMinus) {
            // Postfix: bury a copy of the old value under the receiver (and
            // index), update, then drop the stored value.
            self.advance();
            let step = step(self.previous.kind);
            self.load_for_update(place);
            self.emit_op(OpCode::Dup);
            match place {
                Place::Variable(_) => {}
                Place::Property(_) => self.emit_op_arg(OpCode::Bury, 2),
                Place::Index => self.emit_op_arg(OpCode::Bury, 3),
            }
            self.emit_constant(Value::Int(1));
            self.emit_op(step);
            self.store(place);
            self.emit_op(OpCode::Pop);
        } else {
            self.load(place);
        }
    }

    fn load(&mut self, place: Place) {
        match place {
            Place::Variable(resolved) => {
                let (op, arg) = resolved.get_op();
                self.emit_op_arg(op, arg);
            }
            Place::Property(name) => self.emit_op_arg(OpCode::GetProperty, name),
            Place::Index => self.emit_op(OpCode::GetIndex),
        }
    }

    /// Read `place` while keeping its receiver (and index) for the store.
    fn load_for_update(&mut self, place: Place) {
        match place {
            Place::Variable(_) => {}
            Place::Property(_) => self.emit_op(OpCode::Dup),
            Place::Index => self.emit_op(OpCode::Dup2),
        }
        self.load(place);
    }

    fn store(&mut self, place: Place) {
        match place {
            Place::Variable(resolved) => {
                let (op, arg) = resolved.set_op();
                self.emit_op_arg(op, arg);
            }
            Place::Property(name) => self.emit_op_arg(OpCode::SetProperty, name),
            Place::Index => self.emit_op(OpCode::SetIndex),
        }
    }

    /// `++x`, `--a.b`, `++a[i].c[j]`: an identifier followed by any chain of
    /// property and index accesses; the last access is updated.
    pub(super) fn pre_increment(&mut self, _can_assign: bool) {
        let step = step(self.previous.kind);
        self.consume(TokenKind::Identifier, "Expect variable after increment operator.");
        let mut place = Place::Variable(self.resolve(self.previous.lexeme));
        loop {
            let next = if self.match_token(TokenKind::Dot) {
                self.consume(TokenKind::Identifier, "Expect property name after '.'.");
                Place::Property(self.identifier_constant(self.previous.lexeme))
            } else if self.match_token(TokenKind::LeftBracket) {
                // The receiver must be on the stack before the index.
                self.load(place);
                self.expression();
                self.consume(TokenKind::RightBracket, "Expect ']' after index.");
                place = Place::Index;
                continue;
            } else {
                break;
            };
            self.load(place);
            place = next;
        }
        self.load_for_update(place);
        self.emit_constant(Value::Int(1));
        self.emit_op(step);
        self.store(place);
    }

    // ─── Classes ───

    pub(super) fn this(&mut self, _can_assign: bool) {
        if self.classes.is_empty() {
            self.error("Can't use 'this' outside of a class.");
            return;
        }
        self.variable_named("this");
    }

    pub(super) fn super_(&mut self, _can_assign: bool) {
        match self.classes.last() {
            None => self.error("Can't use 'super' outside of a class."),
            Some(class) if !class.has_superclass => {
                self.error("Can't use 'super' in a class with no superclass.");
            }
            Some(_) => {}
        }
        self.consume(TokenKind::Dot, "Expect '.' after 'super'.");
        self.consume(TokenKind::Identifier, "Expect superclass method name.");
        let name = self.identifier_constant(self.previous.lexeme);

        self.variable_named("this");
        if self.match_token(TokenKind::LeftParen) {
            let argc = self.argument_list();
            self.variable_named("super");
            self.emit_op_arg(OpCode::SuperInvoke, name);
            self.emit_byte(argc);
        } else {
            self.variable_named("super");
            self.emit_op_arg(OpCode::GetSuper, name);
        }
    }

    /// Load a compiler-introduced name (`this`, `super`).
    fn variable_named(&mut self, name: &'static str) {
        let resolved = self.resolve(name);
        self.load(Place::Variable(resolved));
    }
}

/// Opcode applying `++` or `--`.
fn step(kind: TokenKind) -> OpCode {
    if kind == TokenKind::PlusPlus {
        OpCode::Add
    } else {
        OpCode::Subtract
    }
}
