//! Natives every VM starts with.

use grue_core::{Object, Table, Value, ValueList};

use crate::error::NativeError;
use crate::vm::Vm;

pub(crate) fn register_builtins(vm: &mut Vm) {
    vm.define_native("clock", Some(0), |vm, _| {
        Ok(Value::Double(vm.started.elapsed().as_secs_f64()))
    });
    vm.define_native("str", Some(1), |vm, args| {
        let text = vm.display(args[0]);
        Ok(Value::Obj(vm.intern(&text)))
    });
    vm.define_native("type", Some(1), |vm, args| {
        let name = vm.type_name(args[0]);
        Ok(Value::Obj(vm.intern(name)))
    });
    vm.define_native("list", Some(0), |vm, _| {
        Ok(Value::Obj(vm.alloc(Object::List(ValueList::new()))))
    });
    vm.define_native("table", Some(0), |vm, _| {
        Ok(Value::Obj(vm.alloc(Object::Table(Table::new()))))
    });
    vm.define_native("gc", Some(0), |vm, _| {
        let before = vm.gc_stats().objects_freed;
        vm.collect_garbage();
        let freed = vm.gc_stats().objects_freed - before;
        Ok(Value::Int(i32::try_from(freed).unwrap_or(i32::MAX)))
    });

    vm.define_method("push", Some(1), push);
    vm.define_method("pop", Some(0), pop);
    vm.define_method("push_front", Some(1), push_front);
    vm.define_method("pop_front", Some(0), pop_front);
    vm.define_method("get", Some(1), table_get);
    vm.define_method("set", Some(2), table_set);
    vm.define_method("has", Some(1), table_has);
    vm.define_method("remove", Some(1), table_remove);
    vm.define_method("keys", Some(0), table_keys);
}

fn receiver_error(vm: &Vm, method: &str, expected: &str, receiver: Value) -> NativeError {
    NativeError::new(format!(
        "{method} expects {expected} receiver, got {}.",
        vm.type_name(receiver)
    ))
}

fn object_mut(vm: &mut Vm, receiver: Value) -> Option<&mut Object> {
    vm.heap.try_get_mut(receiver.as_obj()?)
}

fn push(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, NativeError> {
    match object_mut(vm, receiver) {
        Some(Object::Array(items)) => items.push(args[0]),
        Some(Object::List(list)) => list.push_back(args[0]),
        _ => return Err(receiver_error(vm, "push", "an array or list", receiver)),
    }
    Ok(Value::Nil)
}

fn pop(vm: &mut Vm, receiver: Value, _: &[Value]) -> Result<Value, NativeError> {
    match object_mut(vm, receiver) {
        Some(Object::Array(items)) => Ok(items.pop().unwrap_or_default()),
        Some(Object::List(list)) => Ok(list.pop_back().unwrap_or_default()),
        _ => Err(receiver_error(vm, "pop", "an array or list", receiver)),
    }
}

fn push_front(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, NativeError> {
    match object_mut(vm, receiver) {
        Some(Object::List(list)) => {
            list.push_front(args[0]);
            Ok(Value::Nil)
        }
        _ => Err(receiver_error(vm, "push_front", "a list", receiver)),
    }
}

fn pop_front(vm: &mut Vm, receiver: Value, _: &[Value]) -> Result<Value, NativeError> {
    match object_mut(vm, receiver) {
        Some(Object::List(list)) => Ok(list.pop_front().unwrap_or_default()),
        _ => Err(receiver_error(vm, "pop_front", "a list", receiver)),
    }
}

fn table_get(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, NativeError> {
    let key = vm.table_key(args[0])?;
    match object_mut(vm, receiver) {
        Some(Object::Table(table)) => Ok(table.get(key).unwrap_or_default()),
        _ => Err(receiver_error(vm, "get", "a table", receiver)),
    }
}

fn table_set(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, NativeError> {
    let key = vm.table_key(args[0])?;
    match object_mut(vm, receiver) {
        Some(Object::Table(table)) => Ok(Value::Bool(table.set(key, args[1]))),
        _ => Err(receiver_error(vm, "set", "a table", receiver)),
    }
}

fn table_has(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, NativeError> {
    let key = vm.table_key(args[0])?;
    match object_mut(vm, receiver) {
        Some(Object::Table(table)) => Ok(Value::Bool(table.contains(key))),
        _ => Err(receiver_error(vm, "has", "a table", receiver)),
    }
}

fn table_remove(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, NativeError> {
    let key = vm.table_key(args[0])?;
    match object_mut(vm, receiver) {
        Some(Object::Table(table)) => Ok(table.delete(key).unwrap_or_default()),
        _ => Err(receiver_error(vm, "remove", "a table", receiver)),
    }
}

/// Keys as a new array; string keys stay alive through the table.
fn table_keys(vm: &mut Vm, receiver: Value, _: &[Value]) -> Result<Value, NativeError> {
    let keys: Vec<Value> = match object_mut(vm, receiver) {
        Some(Object::Table(table)) => table.iter().map(|(key, _)| key.to_value()).collect(),
        _ => return Err(receiver_error(vm, "keys", "a table", receiver)),
    };
    Ok(Value::Obj(vm.alloc(Object::Array(keys))))
}
