//! The VM's root set.

use grue_core::{ObjRef, Table, Trace, Tracer, Value};

use super::CallFrame;
use crate::host::Host;

/// Borrowed view of everything the VM keeps alive, handed to every
/// allocating heap call.
pub(crate) struct VmRoots<'a> {
    pub stack: &'a [Value],
    pub frames: &'a [CallFrame],
    pub globals: &'a Table,
    pub open_upvalues: &'a [(usize, ObjRef)],
    pub methods: &'a Table,
    pub host: Option<&'a dyn Host>,
}

impl Trace for VmRoots<'_> {
    fn trace(&self, tracer: &mut Tracer<'_>) {
        self.stack.trace(tracer);
        for frame in self.frames {
            tracer.mark(frame.closure);
        }
        self.globals.trace(tracer);
        for &(_, upvalue) in self.open_upvalues {
            tracer.mark(upvalue);
        }
        self.methods.trace(tracer);
        if let Some(host) = self.host {
            host.trace_roots(tracer);
        }
    }
}
