//! Scopes and name resolution: locals, upvalues, globals.

use grue_core::OpCode;
use grue_lexer::TokenKind;

use crate::compiler::Compiler;
use crate::state::{Local, UpvalueDesc, MAX_LOCALS, MAX_UPVALUES};

/// Where a name resolved to, with the operand to address it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Resolved {
    Local(u8),
    Upvalue(u8),
    Global(u8),
}

impl Resolved {
    pub fn get_op(self) -> (OpCode, u8) {
        match self {
            Resolved::Local(i) => (OpCode::GetLocal, i),
            Resolved::Upvalue(i) => (OpCode::GetUpvalue, i),
            Resolved::Global(i) => (OpCode::GetGlobal, i),
        }
    }

    pub fn set_op(self) -> (OpCode, u8) {
        match self {
            Resolved::Local(i) => (OpCode::SetLocal, i),
            Resolved::Upvalue(i) => (OpCode::SetUpvalue, i),
            Resolved::Global(i) => (OpCode::SetGlobal, i),
        }
    }
}

impl<'src> Compiler<'src, '_> {
    pub fn begin_scope(&mut self) {
        self.state_mut().scope_depth += 1;
    }

    /// Pop the scope's locals, closing the captured ones.
    pub fn end_scope(&mut self) {
        self.state_mut().scope_depth -= 1;
        loop {
            let state = self.state();
            let Some(local) = state.locals.last() else {
                break;
            };
            if local.depth.map_or(true, |d| d <= state.scope_depth) {
                break;
            }
            let op = if local.is_captured {
                OpCode::CloseUpvalue
            } else {
                OpCode::Pop
            };
            self.state_mut().locals.pop();
            self.emit_op(op);
        }
    }

    pub fn resolve(&mut self, name: &'src str) -> Resolved {
        let innermost = self.states.len() - 1;
        if let Some(slot) = self.resolve_local(innermost, name) {
            Resolved::Local(slot)
        } else if let Some(index) = self.resolve_upvalue(innermost, name) {
            Resolved::Upvalue(index)
        } else {
            Resolved::Global(self.identifier_constant(name))
        }
    }

    fn resolve_local(&mut self, state: usize, name: &str) -> Option<u8> {
        let (slot, local) = self.states[state]
            .locals
            .iter()
            .enumerate()
            .rev()
            .find(|(_, local)| local.name == name)?;
        if local.depth.is_none() {
            self.error("Can't read local variable in its own initializer.");
        }
        Some(slot as u8)
    }

    /// Capture `name` from an enclosing function, threading it through every
    /// function in between.
    fn resolve_upvalue(&mut self, state: usize, name: &str) -> Option<u8> {
        if state == 0 {
            return None;
        }
        if let Some(slot) = self.resolve_local(state - 1, name) {
            self.states[state - 1].locals[usize::from(slot)].is_captured = true;
            return Some(self.add_upvalue(state, slot, true));
        }
        let index = self.resolve_upvalue(state - 1, name)?;
        Some(self.add_upvalue(state, index, false))
    }

    fn add_upvalue(&mut self, state: usize, index: u8, is_local: bool) -> u8 {
        let desc = UpvalueDesc { index, is_local };
        let upvalues = &self.states[state].upvalues;
        if let Some(existing) = upvalues.iter().position(|u| *u == desc) {
            return existing as u8;
        }
        if upvalues.len() == MAX_UPVALUES {
            self.error("Too many closure variables in function.");
            return 0;
        }
        let upvalues = &mut self.states[state].upvalues;
        upvalues.push(desc);
        (upvalues.len() - 1) as u8
    }

    pub fn add_local(&mut self, name: &'src str) {
        if self.state().locals.len() == MAX_LOCALS {
            self.error("Too many local variables in function.");
            return;
        }
        self.state_mut().locals.push(Local {
            name,
            depth: None,
            is_captured: false,
        });
    }

    /// Record a local for the identifier just consumed. Globals are late
    /// bound and need no declaration.
    pub fn declare_variable(&mut self) {
        let state = self.state();
        if state.scope_depth == 0 {
            return;
        }
        let name = self.previous.lexeme;
        let duplicate = state
            .locals
            .iter()
            .rev()
            .take_while(|local| local.depth.map_or(true, |d| d >= state.scope_depth))
            .any(|local| local.name == name);
        if duplicate {
            self.error("Already a variable with this name in this scope.");
        }
        self.add_local(name);
    }

    /// Consume a variable name; returns its global name constant, or 0 for
    /// locals.
    pub fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenKind::Identifier, message);
        self.declare_variable();
        if self.state().scope_depth > 0 {
            return 0;
        }
        self.identifier_constant(self.previous.lexeme)
    }

    pub fn mark_initialized(&mut self) {
        let state = self.state_mut();
        if state.scope_depth == 0 {
            return;
        }
        let depth = state.scope_depth;
        if let Some(local) = state.locals.last_mut() {
            local.depth = Some(depth);
        }
    }

    pub fn define_variable(&mut self, global: u8) {
        if self.state().scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_op_arg(OpCode::DefineGlobal, global);
    }
}
