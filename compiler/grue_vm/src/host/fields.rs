//! Marshaling between script values and typed host fields.

use grue_core::{Key, NativeField, ObjRef, Object, Value};

use crate::error::RuntimeError;
use crate::vm::Vm;

impl Vm {
    /// The proxy `value` refers to, if it is a native field.
    fn native_field(&self, value: Value) -> Option<NativeField> {
        match self.heap.try_get(value.as_obj()?)? {
            Object::NativeField(field) => Some(field.clone()),
            _ => None,
        }
    }

    /// A stored field value as scripts see it: native fields are read
    /// through their accessor, anything else is returned as is.
    ///
    /// Reading a string field interns the host string; the caller must have
    /// the owning entity rooted.
    pub(crate) fn read_field(&mut self, value: Value) -> Value {
        let Some(field) = self.native_field(value) else {
            return value;
        };
        match field {
            NativeField::Int(accessor) => Value::Int(accessor.get()),
            NativeField::Double(accessor) => Value::Double(accessor.get()),
            NativeField::Bool(accessor) => Value::Bool(accessor.get()),
            NativeField::Str(accessor) => {
                let text = accessor.get();
                Value::Obj(self.intern(&text))
            }
        }
    }

    /// Assign `entity.key = value`, writing through a native field if one is
    /// installed under `key`.
    pub(crate) fn write_entity_field(
        &mut self,
        entity: ObjRef,
        key: Key,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let existing = match self.heap.try_get(entity) {
            Some(Object::Entity(e)) => e.fields.get(key),
            _ => return Err(RuntimeError::operand("Only instances have fields.")),
        };
        if let Some(field) = existing.and_then(|v| self.native_field(v)) {
            return self.write_native_field(&field, key, value);
        }
        if let Some(Object::Entity(e)) = self.heap.try_get_mut(entity) {
            e.fields.set(key, value);
        }
        Ok(())
    }

    fn write_native_field(
        &self,
        field: &NativeField,
        key: Key,
        value: Value,
    ) -> Result<(), RuntimeError> {
        match (field, value) {
            (NativeField::Int(accessor), Value::Int(i)) => accessor.set(i),
            (NativeField::Double(accessor), Value::Int(i)) => accessor.set(f64::from(i)),
            (NativeField::Double(accessor), Value::Double(d)) => accessor.set(d),
            (NativeField::Bool(accessor), Value::Bool(b)) => accessor.set(b),
            (NativeField::Str(accessor), Value::Obj(r)) if self.heap.as_str(r).is_some() => {
                accessor.set(self.heap.str(r).to_owned());
            }
            _ => {
                let name = match key {
                    Key::Str { obj, .. } => self.heap.str(obj).to_owned(),
                    Key::Int(i) => i.to_string(),
                };
                return Err(RuntimeError::operand(format!(
                    "Field '{name}' expects {}, got {}.",
                    field.type_name(),
                    value.type_name(&self.heap)
                )));
            }
        }
        Ok(())
    }

    /// `receiver.name` as a value, binding methods.
    pub(crate) fn member_value(
        &mut self,
        receiver: Value,
        name: ObjRef,
    ) -> Result<Value, RuntimeError> {
        self.push(receiver);
        let result = self.get_property(name);
        let value = self.pop();
        result.map(|()| value)
    }
}
