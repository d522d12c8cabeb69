//! Host-registered natives.
//!
//! A native function becomes a global; a native method becomes a property
//! of every entity and builtin collection (bound to its receiver on read,
//! called directly on `receiver.name(args)`). Natives receive the VM so
//! they can allocate, reach the host with [`Vm::host_mut`], or call back
//! into scripts with [`Vm::call_value`].

mod builtins;


pub(crate) use builtins::register_builtins;

use std::rc::Rc;

use grue_core::{Key, Native, NativeId, NativeKind, ObjRef, Object, Value};

use crate::error::NativeError;
use crate::vm::Vm;

/// A native function: `name(args)`.
pub type NativeFn = Rc<dyn Fn(&mut Vm, &[Value]) -> Result<Value, NativeError>>;

/// A native method: `receiver.name(args)`.
pub type NativeMethodFn = Rc<dyn Fn(&mut Vm, Value, &[Value]) -> Result<Value, NativeError>>;

#[derive(Clone)]
pub(crate) enum NativeImpl {
    Function(NativeFn),
    Method(NativeMethodFn),
}

impl Vm {
    /// Register `f` as the global function `name`.
    ///
    /// `arity` of `None` accepts any number of arguments.
    pub fn define_native<F>(&mut self, name: &str, arity: Option<u8>, f: F) -> ObjRef
    where
        F: Fn(&mut Vm, &[Value]) -> Result<Value, NativeError> + 'static,
    {
        let imp = NativeImpl::Function(Rc::new(f));
        let native = self.register_native(name, arity, NativeKind::Function, imp);
        let key = self.native_key(native);
        self.globals.set(key, Value::Obj(native));
        native
    }

    /// Register `f` as the method `name` on entities and collections.
    ///
    /// Class methods and fields of the same name take precedence on
    /// entities. Natives share one method table across receiver kinds, so
    /// a host method named like a builtin (`get`, `keys`, `push`) replaces
    /// that builtin for every receiver; `f` must then handle or reject
    /// each kind itself.
    pub fn define_method<F>(&mut self, name: &str, arity: Option<u8>, f: F) -> ObjRef
    where
        F: Fn(&mut Vm, Value, &[Value]) -> Result<Value, NativeError> + 'static,
    {
        let imp = NativeImpl::Method(Rc::new(f));
        let native = self.register_native(name, arity, NativeKind::Method, imp);
        let key = self.native_key(native);
        self.methods.set(key, Value::Obj(native));
        native
    }

    fn register_native(
        &mut self,
        name: &str,
        arity: Option<u8>,
        kind: NativeKind,
        imp: NativeImpl,
    ) -> ObjRef {
        let id = NativeId(u32::try_from(self.natives.len()).unwrap_or(u32::MAX));
        self.natives.push(imp);
        let name = self.intern(name);
        tracing::trace!(name = self.heap.str(name), ?kind, "registered native");
        self.alloc(Object::Native(Native {
            name,
            arity,
            kind,
            id,
        }))
    }

    fn native_key(&self, native: ObjRef) -> Key {
        match self.heap.get(native) {
            Object::Native(native) => self.heap.key(native.name),
            other => panic!("registered native is a {}", other.kind().name()),
        }
    }
}
