//! The bytecode interpreter.
//!
//! A [`Vm`] owns the heap, the value stack, the call frames and the
//! globals. Everything a host does with scripts goes through it: compiling
//! source, calling script functions, building entities and registering
//! natives.
//!
//! # Re-entrancy
//!
//! A native may call back into the VM with [`Vm::call_value`]. The nested
//! call runs on top of the current frames and stops when its own entry frame
//! returns, so the outer run loop resumes exactly where it left off.

mod call;
mod frame;
mod handlers;
mod roots;
mod run;

#[cfg(test)]
mod tests;

pub use frame::CallFrame;
pub(crate) use roots::VmRoots;

use std::time::Instant;

use grue_compiler::CompileError;
use grue_core::{Chunk, Closure, GcStats, Heap, ObjRef, Object, Table, Trace, Value};

use crate::config::{VmBuilder, VmConfig};
use crate::error::{InterpretError, RuntimeError, StackTrace, TraceFrame};
use crate::host::Host;
use crate::natives::NativeImpl;
use crate::print_handler::SharedPrintHandler;

/// A script virtual machine.
pub struct Vm {
    pub(crate) heap: Heap,
    pub(crate) stack: Vec<Value>,
    pub(crate) frames: Vec<CallFrame>,
    pub(crate) globals: Table,
    /// Open upvalues as `(stack slot, upvalue)`, sorted by slot.
    pub(crate) open_upvalues: Vec<(usize, ObjRef)>,
    /// Native methods callable on entities and builtin collections.
    pub(crate) methods: Table,
    pub(crate) natives: Vec<NativeImpl>,
    pub(crate) init_string: ObjRef,
    pub(crate) count_string: ObjRef,
    pub(crate) config: VmConfig,
    pub(crate) print: SharedPrintHandler,
    pub(crate) host: Option<Box<dyn Host>>,
    pub(crate) started: Instant,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    /// A VM with default configuration, builtins and stdout output.
    pub fn new() -> Self {
        VmBuilder::new().build()
    }

    pub fn builder() -> VmBuilder {
        VmBuilder::new()
    }

    pub(crate) fn with_parts(
        config: VmConfig,
        print: SharedPrintHandler,
        host: Option<Box<dyn Host>>,
    ) -> Self {
        let mut heap = Heap::new(config.gc.clone());
        let init_string = heap.intern_permanent("init");
        let count_string = heap.intern_permanent("count");
        Self {
            heap,
            stack: Vec::with_capacity(config.frames_max * 16),
            frames: Vec::with_capacity(config.frames_max),
            globals: Table::new(),
            open_upvalues: Vec::new(),
            methods: Table::new(),
            natives: Vec::new(),
            init_string,
            count_string,
            config,
            print,
            host,
            started: Instant::now(),
        }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn gc_stats(&self) -> GcStats {
        self.heap.stats()
    }

    pub fn print_handler(&self) -> &SharedPrintHandler {
        &self.print
    }

    /// Values currently on the stack. Zero between top-level calls.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// The heap plus the VM's roots, borrowed disjointly so allocation can
    /// run a collection.
    pub(crate) fn split(&mut self) -> (&mut Heap, VmRoots<'_>) {
        (
            &mut self.heap,
            VmRoots {
                stack: &self.stack,
                frames: &self.frames,
                globals: &self.globals,
                open_upvalues: &self.open_upvalues,
                methods: &self.methods,
                host: self.host.as_deref(),
            },
        )
    }

    // ─── Allocation ───

    pub(crate) fn alloc(&mut self, object: Object) -> ObjRef {
        let (heap, roots) = self.split();
        heap.alloc(object, &roots)
    }

    /// Allocate while keeping `extra` alive alongside the VM roots.
    pub(crate) fn alloc_with(&mut self, object: Object, extra: &dyn Trace) -> ObjRef {
        let (heap, roots) = self.split();
        heap.alloc(object, &(roots, extra))
    }

    pub(crate) fn alloc_host(&mut self, object: Object) -> ObjRef {
        let (heap, roots) = self.split();
        heap.alloc_host(object, &roots)
    }

    /// Intern `s`.
    ///
    /// The returned string is unrooted: store it somewhere reachable (a
    /// global, a field, the stack) or [`protect`](Vm::protect) it before the
    /// next allocation.
    pub fn intern(&mut self, s: &str) -> ObjRef {
        let (heap, roots) = self.split();
        heap.intern(s, &roots)
    }

    pub(crate) fn intern_with(&mut self, s: &str, extra: &dyn Trace) -> ObjRef {
        let (heap, roots) = self.split();
        heap.intern(s, &(roots, extra))
    }

    /// Run a full collection now.
    pub fn collect_garbage(&mut self) {
        let (heap, roots) = self.split();
        heap.collect(&roots);
    }

    /// Keep `value` alive until a matching [`Vm::unprotect`]. Calls nest.
    pub fn protect(&mut self, value: Value) {
        if let Value::Obj(r) = value {
            self.heap.pin(r);
        }
    }

    pub fn unprotect(&mut self, value: Value) {
        if let Value::Obj(r) = value {
            self.heap.unpin(r);
        }
    }

    // ─── Globals ───

    pub fn get_global(&self, name: &str) -> Option<Value> {
        let name = self.heap.find_interned(name)?;
        self.globals.get(self.heap.key(name))
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        let name = self.intern_with(name, &value);
        let key = self.heap.key(name);
        self.globals.set(key, value);
    }

    // ─── Values ───

    /// Render `value` the way `print` does.
    pub fn display(&self, value: Value) -> String {
        value.display(&self.heap).to_string()
    }

    /// Contents of `value` if it is a string.
    pub fn as_str(&self, value: Value) -> Option<&str> {
        value.as_obj().and_then(|r| self.heap.as_str(r))
    }

    pub fn type_name(&self, value: Value) -> &'static str {
        value.type_name(&self.heap)
    }

    /// Allocate a script array. The result is unrooted.
    pub fn new_array(&mut self, items: Vec<Value>) -> ObjRef {
        self.alloc(Object::Array(items))
    }

    /// Elements of `value` if it is an array.
    pub fn array_items(&self, value: Value) -> Option<&[Value]> {
        match self.heap.try_get(value.as_obj()?)? {
            Object::Array(items) => Some(items),
            _ => None,
        }
    }

    // ─── Compile and run ───

    /// Compile `source` into a script function.
    ///
    /// The function is unrooted; pass it straight to [`Vm::run_function`] or
    /// protect it.
    pub fn compile(&mut self, source: &str) -> Result<ObjRef, CompileError> {
        let (heap, roots) = self.split();
        grue_compiler::compile(source, heap, &roots)
    }

    /// Compile and run `source` as a top-level script.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn interpret(&mut self, source: &str) -> Result<(), InterpretError> {
        let function = self.compile(source)?;
        self.run_function(function)?;
        Ok(())
    }

    /// Wrap a compiled script function in a closure and run it.
    pub fn run_function(&mut self, function: ObjRef) -> Result<Value, RuntimeError> {
        self.stack.push(Value::Obj(function));
        let closure = self.alloc(Object::Closure(Closure {
            function,
            upvalues: Box::new([]),
        }));
        self.stack.pop();
        self.call_value(Value::Obj(closure), &[])
    }

    /// Call the global function `name`.
    pub fn call_function(&mut self, name: &str, args: &[Value]) -> Result<Value, InterpretError> {
        let callee = self
            .get_global(name)
            .ok_or_else(|| RuntimeError::undefined_variable(name))?;
        Ok(self.call_value(callee, args)?)
    }

    /// Call a closure the host holds.
    pub fn invoke_closure(&mut self, closure: ObjRef, args: &[Value]) -> Result<Value, RuntimeError> {
        self.call_value(Value::Obj(closure), args)
    }

    /// Call any callable value and run it to completion.
    ///
    /// Safe to call from inside a native. On error the frames and stack
    /// slots this call pushed are discarded and the error carries the trace
    /// at the point of failure.
    pub fn call_value(&mut self, callee: Value, args: &[Value]) -> Result<Value, RuntimeError> {
        let base = self.stack.len();
        let depth = self.frames.len();
        self.stack.push(callee);
        self.stack.extend_from_slice(args);

        let result = grue_stack::ensure_sufficient_stack(|| {
            self.call(callee, args.len())?;
            if self.frames.len() > depth {
                self.run(depth)
            } else {
                Ok(self.pop())
            }
        });

        result.map_err(|error| {
            let error = if error.trace.is_empty() {
                let trace = self.stack_trace();
                error.with_trace(trace)
            } else {
                error
            };
            tracing::debug!(kind = %error.kind, message = %error.message, "runtime error");
            self.unwind(base, depth);
            error
        })
    }

    /// Drop everything above `base` and `depth` after a failed call.
    fn unwind(&mut self, base: usize, depth: usize) {
        self.close_upvalues(base);
        self.frames.truncate(depth);
        self.stack.truncate(base);
    }

    pub(crate) fn stack_trace(&self) -> StackTrace {
        let frames = self
            .frames
            .iter()
            .rev()
            .map(|frame| {
                let (line, name) = match self.heap.try_get(frame.function) {
                    Some(Object::Function(function)) => (
                        function.chunk.line_at(frame.ip.saturating_sub(1)),
                        function.name.and_then(|n| self.heap.as_str(n)).map(str::to_owned),
                    ),
                    _ => (0, None),
                };
                TraceFrame {
                    line,
                    function: name,
                }
            })
            .collect();
        StackTrace::new(frames)
    }

    // ─── Stack ───

    #[inline]
    pub(crate) fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or_default()
    }

    #[inline]
    pub(crate) fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    #[inline]
    pub(crate) fn set_top(&mut self, distance: usize, value: Value) {
        let index = self.stack.len() - 1 - distance;
        self.stack[index] = value;
    }
}

/// Bytecode of a function object.
///
/// # Panics
///
/// If `function` is not a live function. Frames only ever hold functions.
pub(crate) fn chunk_of(heap: &Heap, function: ObjRef) -> &Chunk {
    match heap.get(function) {
        Object::Function(f) => &f.chunk,
        other => panic!("frame function is a {}", other.kind().name()),
    }
}
