//! Grue VM - the runtime side of the entity scripting language.
//!
//! # Architecture
//!
//! - [`Vm`]: the interpreter. Owns the heap, stack, frames and globals.
//! - [`Host`]: root enumeration hook the game world installs so the
//!   collector can see handles it holds.
//! - Entities ([`Vm::new_entity`], [`Vm::set_named_field`]): script-visible
//!   headers for rooms, mobs and items, with [`FieldSlot::Native`] proxies
//!   for typed host fields.
//! - Natives ([`Vm::define_native`], [`Vm::define_method`]).
//! - [`PrintHandler`]: where `print` output goes.
//!
//! ```ignore
//! let mut vm = Vm::builder().print_handler(buffer_handler()).build();
//! vm.interpret("var a = [1, 2, 3]; a[1] = 100; print a[1];")?;
//! assert_eq!(vm.print_handler().output(), "100\n");
//! ```

mod config;
mod error;
mod host;
mod natives;
mod print_handler;
mod vm;

pub use config::{VmBuilder, VmConfig, FRAMES_MAX};
pub use error::{
    InterpretError, NativeError, RuntimeError, RuntimeErrorKind, StackTrace, TraceFrame,
};
pub use host::{ExecOrder, FieldSlot, Host, HostError, ScriptLoadError, ScriptSource};
pub use natives::{NativeFn, NativeMethodFn};
pub use print_handler::{
    buffer_handler, log_handler, silent_handler, stdout_handler, BufferedOutput, PrintHandler,
    SharedPrintHandler,
};
pub use vm::{CallFrame, Vm};

pub use grue_compiler::{CompileError, Diagnostic, ErrorLocation};
pub use grue_core::{
    Accessor, EntityKind, GcConfig, GcStats, NativeField, ObjRef, Trace, Tracer, Value,
};
