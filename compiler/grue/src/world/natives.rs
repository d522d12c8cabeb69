//! Natives that let scripts see the world.

use grue_vm::{NativeError, Value, Vm};

use super::World;

pub(crate) fn register(vm: &mut Vm) {
    vm.define_method("say", Some(1), say);
    vm.define_native("room", Some(1), |vm, args| {
        let vnum = vnum_arg(args[0], "room")?;
        Ok(world(vm)?.room(vnum).map_or(Value::Nil, Value::Obj))
    });
    vm.define_native("mobs_in", Some(1), |vm, args| {
        let vnum = vnum_arg(args[0], "mobs_in")?;
        let mobs: Vec<Value> = world(vm)?
            .mobs_in(vnum)
            .map(|m| Value::Obj(m.entity))
            .collect();
        Ok(Value::Obj(vm.new_array(mobs)))
    });
    vm.define_native("areas", Some(0), |vm, _| {
        let names: Vec<Value> = world(vm)?
            .areas()
            .filter_map(|area| vm.entity(area).ok())
            .map(|area| Value::Obj(area.name))
            .collect();
        Ok(Value::Obj(vm.new_array(names)))
    });
    vm.define_native("census", Some(0), |vm, _| {
        let count = world(vm)?.mobs().count();
        Ok(Value::Int(i32::try_from(count).unwrap_or(i32::MAX)))
    });
    vm.define_native("spawn", Some(2), |vm, args| {
        let template = vnum_arg(args[0], "spawn")?;
        let room = vnum_arg(args[1], "spawn")?;
        let index =
            super::spawn(vm, template, room).map_err(|e| NativeError::new(e.to_string()))?;
        let mob = world(vm)?.mob(index).map(|m| m.entity);
        Ok(mob.map_or(Value::Nil, Value::Obj))
    });
}

fn world(vm: &Vm) -> Result<&World, NativeError> {
    vm.host::<World>()
        .ok_or_else(|| NativeError::new("No world is loaded."))
}

fn vnum_arg(value: Value, native: &str) -> Result<i32, NativeError> {
    match value {
        Value::Int(vnum) => Ok(vnum),
        _ => Err(NativeError::new(format!("{native} expects a vnum."))),
    }
}

fn say(vm: &mut Vm, receiver: Value, args: &[Value]) -> Result<Value, NativeError> {
    let Some(speaker) = receiver.as_obj().and_then(|r| vm.entity(r).ok()) else {
        return Err(NativeError::new(format!(
            "say expects an entity receiver, got {}.",
            vm.type_name(receiver)
        )));
    };
    let line = format!(
        "{} says '{}'",
        vm.heap().str(speaker.name),
        vm.display(args[0])
    );
    vm.print_handler().println(&line);
    Ok(Value::Nil)
}
