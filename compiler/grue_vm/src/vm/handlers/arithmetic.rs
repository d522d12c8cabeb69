//! Arithmetic, comparison and string building.
//!
//! `Int op Int` stays an integer unless it overflows, in which case the
//! result is computed in `f64`. Any `Double` operand promotes the whole
//! operation.

use grue_core::{Object, OpCode, Value};

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::vm::Vm;

impl Vm {
    pub(crate) fn execute_arithmetic(&mut self, op: OpCode) -> Result<(), RuntimeError> {
        match op {
            OpCode::Negate => {
                let value = match self.peek(0) {
                    Value::Int(i) => i
                        .checked_neg()
                        .map_or(Value::Double(-f64::from(i)), Value::Int),
                    Value::Double(d) => Value::Double(-d),
                    _ => return Err(RuntimeError::operand("Operand must be a number.")),
                };
                self.set_top(0, value);
            }
            OpCode::Stringify => self.stringify_top(),
            OpCode::Add if self.both_strings() => self.concatenate(),
            OpCode::Greater | OpCode::Less => {
                let (a, b) = (self.peek(1), self.peek(0));
                let result = match (a, b) {
                    (Value::Int(a), Value::Int(b)) => compare(op, a, b),
                    _ => match (a.as_f64(), b.as_f64()) {
                        (Some(a), Some(b)) => compare(op, a, b),
                        _ => return Err(RuntimeError::operand("Operands must be numbers.")),
                    },
                };
                self.pop();
                self.set_top(0, Value::Bool(result));
            }
            _ => {
                let (a, b) = (self.peek(1), self.peek(0));
                let result = match (a, b) {
                    (Value::Int(a), Value::Int(b)) => int_binary(op, a, b)?,
                    _ => match (a.as_f64(), b.as_f64()) {
                        (Some(a), Some(b)) => Value::Double(double_binary(op, a, b)),
                        _ if op == OpCode::Add => {
                            return Err(RuntimeError::operand(
                                "Operands must be two numbers or two strings.",
                            ));
                        }
                        _ => return Err(RuntimeError::operand("Operands must be numbers.")),
                    },
                };
                self.pop();
                self.set_top(0, result);
            }
        }
        Ok(())
    }

    fn both_strings(&self) -> bool {
        let is_string = |value: Value| {
            value
                .as_obj()
                .and_then(|r| self.heap.try_get(r))
                .is_some_and(|object| matches!(object, Object::String(_)))
        };
        is_string(self.peek(0)) && is_string(self.peek(1))
    }

    /// Join the two strings on top of the stack. Both stay on the stack
    /// until the result is interned.
    fn concatenate(&mut self) {
        let (a, b) = (self.peek(1), self.peek(0));
        let joined = {
            let a = a.as_obj().and_then(|r| self.heap.as_str(r)).unwrap_or_default();
            let b = b.as_obj().and_then(|r| self.heap.as_str(r)).unwrap_or_default();
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            joined
        };
        let result = self.intern(&joined);
        self.pop();
        self.set_top(0, Value::Obj(result));
    }

    /// Replace the top of the stack with its display string.
    fn stringify_top(&mut self) {
        let value = self.peek(0);
        if let Some(Object::String(_)) = value.as_obj().and_then(|r| self.heap.try_get(r)) {
            return;
        }
        let text = value.display(&self.heap).to_string();
        let string = self.intern(&text);
        self.set_top(0, Value::Obj(string));
    }
}

fn compare<T: PartialOrd>(op: OpCode, a: T, b: T) -> bool {
    if op == OpCode::Greater {
        a > b
    } else {
        a < b
    }
}

fn int_binary(op: OpCode, a: i32, b: i32) -> Result<Value, RuntimeError> {
    let checked = match op {
        OpCode::Add => a.checked_add(b),
        OpCode::Subtract => a.checked_sub(b),
        OpCode::Multiply => a.checked_mul(b),
        OpCode::Divide => {
            if b == 0 {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::DivisionByZero,
                    "Division by zero.",
                ));
            }
            a.checked_div(b)
        }
        OpCode::Modulo => {
            if b == 0 {
                return Err(RuntimeError::new(
                    RuntimeErrorKind::DivisionByZero,
                    "Modulo by zero.",
                ));
            }
            // `i32::MIN % -1` is 0.
            Some(a.wrapping_rem(b))
        }
        _ => unreachable!("{op:?} is not an arithmetic instruction"),
    };
    Ok(checked.map_or_else(
        || Value::Double(double_binary(op, f64::from(a), f64::from(b))),
        Value::Int,
    ))
}

fn double_binary(op: OpCode, a: f64, b: f64) -> f64 {
    match op {
        OpCode::Add => a + b,
        OpCode::Subtract => a - b,
        OpCode::Multiply => a * b,
        OpCode::Divide => a / b,
        OpCode::Modulo => a % b,
        _ => unreachable!("{op:?} is not an arithmetic instruction"),
    }
}
