//! The host boundary.
//!
//! The game server owns rooms, mobs and items; scripts see them as
//! [`Entity`] objects. This module is how the host installs its root hook,
//! creates and frees entities, exposes typed fields through
//! [`NativeField`] proxies, and attaches classes and scripts.
//!
//! Entities are host-owned heap slots. The collector never sweeps them, but
//! it still walks their fields, so a value stored on a mob stays alive for
//! as long as the mob does. The host frees an entity exactly once with
//! [`Vm::free_entity`]; a second free is reported as an error.

mod fields;
mod script;

pub use script::{ExecOrder, ScriptLoadError, ScriptSource};

use std::any::Any;

use grue_core::{Entity, EntityKind, HeapError, NativeField, ObjRef, Object, Tracer, Value};

use crate::error::{InterpretError, RuntimeError};
use crate::vm::Vm;

/// The host simulation, as the VM sees it.
///
/// `trace_roots` is called during every mark phase and must report every
/// heap handle the host holds outside entity field tables: entity handles
/// in the world's registries, closures stored for later callbacks, and so
/// on. Entities it misses are still traced, with a warning.
pub trait Host: 'static {
    fn trace_roots(&self, tracer: &mut Tracer<'_>);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// What a named entity field holds.
#[derive(Debug)]
pub enum FieldSlot {
    /// An ordinary script value.
    Value(Value),
    /// A proxy reading and writing a typed host field.
    Native(NativeField),
}

impl From<Value> for FieldSlot {
    fn from(value: Value) -> Self {
        FieldSlot::Value(value)
    }
}

impl From<NativeField> for FieldSlot {
    fn from(field: NativeField) -> Self {
        FieldSlot::Native(field)
    }
}

/// Misuse of an entity handle.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("{0:?} is not a live entity")]
    NotAnEntity(ObjRef),
    #[error("{0:?} is not a class")]
    NotAClass(ObjRef),
    #[error(transparent)]
    Heap(#[from] HeapError),
}

impl Vm {
    // ─── Host hook ───

    /// Install the host root hook, returning the previous one.
    pub fn set_host(&mut self, host: Box<dyn Host>) -> Option<Box<dyn Host>> {
        self.host.replace(host)
    }

    pub fn take_host(&mut self) -> Option<Box<dyn Host>> {
        self.host.take()
    }

    /// The installed host, if it is a `T`.
    pub fn host<T: Host>(&self) -> Option<&T> {
        self.host.as_deref()?.as_any().downcast_ref()
    }

    pub fn host_mut<T: Host>(&mut self) -> Option<&mut T> {
        self.host.as_deref_mut()?.as_any_mut().downcast_mut()
    }

    // ─── Entities ───

    /// Allocate the script header for a host object.
    ///
    /// The entity is never collected; free it with [`Vm::free_entity`].
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn new_entity(&mut self, kind: EntityKind, name: &str) -> ObjRef {
        let name = self.intern(name);
        self.alloc_host(Object::Entity(Entity::new(kind, name)))
    }

    pub fn free_entity(&mut self, entity: ObjRef) -> Result<(), HostError> {
        self.entity(entity)?;
        self.heap.free_host_object(entity)?;
        Ok(())
    }

    pub fn entity(&self, entity: ObjRef) -> Result<&Entity, HostError> {
        match self.heap.try_get(entity) {
            Some(Object::Entity(e)) => Ok(e),
            Some(_) => Err(HostError::NotAnEntity(entity)),
            None => Err(HostError::Heap(HeapError::Stale(entity))),
        }
    }

    fn entity_mut(&mut self, entity: ObjRef) -> Result<&mut Entity, HostError> {
        match self.heap.try_get_mut(entity) {
            Some(Object::Entity(e)) => Ok(e),
            Some(_) => Err(HostError::NotAnEntity(entity)),
            None => Err(HostError::Heap(HeapError::Stale(entity))),
        }
    }

    /// Define or replace the field `name` on `entity`.
    pub fn set_named_field(
        &mut self,
        entity: ObjRef,
        name: &str,
        slot: impl Into<FieldSlot>,
    ) -> Result<(), HostError> {
        self.entity(entity)?;
        let field = match slot.into() {
            FieldSlot::Value(value) => {
                let name = self.intern_with(name, &value);
                return self.store_field(entity, name, value);
            }
            FieldSlot::Native(field) => field,
        };
        let name = self.intern(name);
        let proxy = self.alloc_with(Object::NativeField(field), &name);
        self.store_field(entity, name, Value::Obj(proxy))
    }

    fn store_field(
        &mut self,
        entity: ObjRef,
        name: ObjRef,
        value: Value,
    ) -> Result<(), HostError> {
        let key = self.heap.key(name);
        self.entity_mut(entity)?.fields.set(key, value);
        Ok(())
    }

    /// Read the field `name`, marshaling native fields into script values.
    pub fn get_named_field(
        &mut self,
        entity: ObjRef,
        name: &str,
    ) -> Result<Option<Value>, HostError> {
        self.entity(entity)?;
        let Some(name) = self.heap.find_interned(name) else {
            return Ok(None);
        };
        let key = self.heap.key(name);
        let stored = self.entity(entity)?.fields.get(key);
        Ok(stored.map(|value| self.read_field(value)))
    }

    /// Script-assign `value` to `entity.name`, with the same type checks a
    /// script assignment gets.
    pub fn assign_field(
        &mut self,
        entity: ObjRef,
        name: &str,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let name = self.intern_with(name, &value);
        let key = self.heap.key(name);
        self.write_entity_field(entity, key, value)
    }

    /// Make `entity` respond to `class`'s methods.
    pub fn set_entity_class(&mut self, entity: ObjRef, class: ObjRef) -> Result<(), HostError> {
        if !matches!(self.heap.try_get(class), Some(Object::Class(_))) {
            return Err(HostError::NotAClass(class));
        }
        self.entity_mut(entity)?.class = Some(class);
        Ok(())
    }

    /// Attach a script object (closure or instance) to `entity`.
    pub fn attach_script(&mut self, entity: ObjRef, script: ObjRef) -> Result<(), HostError> {
        self.entity_mut(entity)?.script = Some(script);
        Ok(())
    }

    /// The script attached to `entity`.
    pub fn entity_script(&self, entity: ObjRef) -> Result<Option<ObjRef>, HostError> {
        Ok(self.entity(entity)?.script)
    }

    /// Compile `class <name> { <body> }` and return the class.
    ///
    /// Templates (mob and item prototypes) carry the method bodies builders
    /// write; each instance entity is then pointed at the class with
    /// [`Vm::set_entity_class`]. The class is also bound to the global
    /// `name`, which keeps it alive.
    #[tracing::instrument(level = "debug", skip(self, body))]
    pub fn create_class_from_template(
        &mut self,
        name: &str,
        body: &str,
    ) -> Result<ObjRef, InterpretError> {
        let source = format!("class {name} {{\n{body}\n}}");
        self.interpret(&source)?;
        match self.get_global(name) {
            Some(Value::Obj(class))
                if matches!(self.heap.try_get(class), Some(Object::Class(_))) =>
            {
                Ok(class)
            }
            _ => Err(RuntimeError::undefined_variable(name).into()),
        }
    }

    /// Instantiate the class attached to `entity`, passing `args` to `init`,
    /// and attach the instance as the entity's script.
    pub fn instantiate_script(
        &mut self,
        entity: ObjRef,
        args: &[Value],
    ) -> Result<ObjRef, InterpretError> {
        let class = self
            .entity(entity)
            .ok()
            .and_then(|e| e.class)
            .ok_or_else(RuntimeError::not_callable)?;
        let instance = self.call_value(Value::Obj(class), args)?;
        let Value::Obj(instance) = instance else {
            return Err(RuntimeError::not_callable().into());
        };
        if let Ok(e) = self.entity_mut(entity) {
            e.script = Some(instance);
        }
        Ok(instance)
    }

    /// Call `receiver.name(args)` from the host, with the same lookup order
    /// a script gets: fields, then class methods, then native methods.
    pub fn call_method(
        &mut self,
        receiver: Value,
        name: &str,
        args: &[Value],
    ) -> Result<Value, RuntimeError> {
        let name = self.intern_with(name, &(receiver, args));
        // Binding a method allocates; keep the arguments rooted meanwhile.
        let base = self.stack.len();
        self.stack.extend_from_slice(args);
        let callee = self.member_value(receiver, name);
        self.stack.truncate(base);
        self.call_value(callee?, args)
    }
}
