//! Per-function and per-class compile state.

use grue_core::{Function, ObjRef, Trace, Tracer};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Locals and upvalues are addressed by one byte.
pub(crate) const MAX_LOCALS: usize = 256;
pub(crate) const MAX_UPVALUES: usize = 256;
pub(crate) const MAX_CONSTANTS: usize = 256;

/// What kind of body is being compiled. Decides slot 0 and implicit returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FunctionKind {
    Script,
    Function,
    Method,
    /// A class's `init`: returns `this` implicitly, may not return a value.
    Initializer,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Local<'src> {
    pub name: &'src str,
    /// Scope depth, or `None` between declaration and initialization.
    pub depth: Option<u32>,
    /// Captured by a closure; closed rather than popped at scope exit.
    pub is_captured: bool,
}

/// How a closure obtains one captured variable: from the enclosing
/// function's local slot, or from the enclosing function's own upvalue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct UpvalueDesc {
    pub index: u8,
    pub is_local: bool,
}

/// Constant pool key for de-duplication. Doubles compare by bit pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum ConstKey {
    Int(i32),
    Double(u64),
    Obj(ObjRef),
}

pub(crate) struct FunctionState<'src> {
    pub function: Function,
    pub kind: FunctionKind,
    pub locals: Vec<Local<'src>>,
    pub upvalues: SmallVec<[UpvalueDesc; 8]>,
    pub scope_depth: u32,
    pub constants: FxHashMap<ConstKey, u8>,
}

impl<'src> FunctionState<'src> {
    pub fn new(kind: FunctionKind, name: Option<ObjRef>) -> Self {
        let mut locals = Vec::with_capacity(MAX_LOCALS);
        // Slot 0 holds the callee, or the receiver inside methods.
        let slot_zero = match kind {
            FunctionKind::Method | FunctionKind::Initializer => "this",
            FunctionKind::Script | FunctionKind::Function => "",
        };
        locals.push(Local {
            name: slot_zero,
            depth: Some(0),
            is_captured: false,
        });
        Self {
            function: Function {
                name,
                ..Function::default()
            },
            kind,
            locals,
            upvalues: SmallVec::new(),
            scope_depth: 0,
            constants: FxHashMap::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct ClassState {
    pub has_superclass: bool,
}

/// Roots while compiling: the caller's roots plus everything the unfinished
/// functions already reference (names and constant pools).
pub(crate) struct CompileRoots<'a, 'src> {
    pub outer: &'a dyn Trace,
    pub states: &'a [FunctionState<'src>],
}

impl Trace for CompileRoots<'_, '_> {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        self.outer.trace(tracer);
        for state in self.states {
            tracer.trace(&state.function.name);
            tracer.trace(&state.function.chunk);
        }
    }
}
