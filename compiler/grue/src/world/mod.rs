//! A miniature host world.
//!
//! Stands in for the game server at the VM boundary: areas, rooms and mob
//! templates are registered by vnum in [`SortedTable`]s, live mobs sit in a
//! [`SegVec`] with stable indices, and the whole lot is reported to the
//! collector through [`Host::trace_roots`]. Mob hit points are host memory
//! exposed to scripts as a native field.

mod natives;
mod scripts;


use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use grue_core::{Object, SegVec, SortedTable};
use grue_vm::{
    EntityKind, ExecOrder, Host, HostError, InterpretError, NativeField, ObjRef,
    ScriptLoadError, Trace, Tracer, Value, Vm, VmBuilder,
};

/// A live mob.
pub struct Mob {
    pub entity: ObjRef,
    pub template: i32,
    pub room: i32,
    pub hp: Rc<Cell<i32>>,
    pub alive: bool,
}

#[derive(Default)]
pub struct World {
    areas: SortedTable,
    rooms: SortedTable,
    templates: SortedTable,
    mobs: SegVec<Mob>,
    /// Indices of slain mobs, reused by the next spawn.
    free: Vec<usize>,
}

impl Host for World {
    fn trace_roots(&self, tracer: &mut Tracer<'_>) {
        self.areas.trace(tracer);
        self.rooms.trace(tracer);
        self.templates.trace(tracer);
        for mob in self.mobs.iter().filter(|m| m.alive) {
            tracer.mark(mob.entity);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl World {
    pub fn area(&self, vnum: i32) -> Option<ObjRef> {
        self.areas.get(vnum)?.as_obj()
    }

    pub fn room(&self, vnum: i32) -> Option<ObjRef> {
        self.rooms.get(vnum)?.as_obj()
    }

    pub fn template(&self, vnum: i32) -> Option<ObjRef> {
        self.templates.get(vnum)?.as_obj()
    }

    /// Areas in ascending vnum order.
    pub fn areas(&self) -> impl Iterator<Item = ObjRef> + '_ {
        self.areas.iter().filter_map(|(_, v)| v.as_obj())
    }

    pub fn mobs(&self) -> impl Iterator<Item = &Mob> + '_ {
        self.mobs.iter().filter(|m| m.alive)
    }

    pub fn mob(&self, index: usize) -> Option<&Mob> {
        self.mobs.get(index).filter(|m| m.alive)
    }

    pub fn mobs_in(&self, room: i32) -> impl Iterator<Item = &Mob> + '_ {
        self.mobs().filter(move |m| m.room == room)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("no world is installed in this VM")]
    NoWorld,
    #[error("no area with vnum {0}")]
    UnknownArea(i32),
    #[error("no room with vnum {0}")]
    UnknownRoom(i32),
    #[error("no mob template with vnum {0}")]
    UnknownTemplate(i32),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Interpret(#[from] InterpretError),
    #[error(transparent)]
    Script(#[from] ScriptLoadError),
}

/// Outcome of one world tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Mobs whose `on_tick` ran to completion.
    pub ran: usize,
    /// Mobs whose `on_tick` raised an error.
    pub failed: usize,
    pub slain: usize,
}

/// Install an empty world and its natives into a VM built from `builder`.
pub fn install(builder: VmBuilder) -> Vm {
    let mut vm = builder.host(Box::new(World::default())).build();
    natives::register(&mut vm);
    vm
}

pub fn world(vm: &Vm) -> Result<&World, WorldError> {
    vm.host::<World>().ok_or(WorldError::NoWorld)
}

fn world_mut(vm: &mut Vm) -> Result<&mut World, WorldError> {
    vm.host_mut::<World>().ok_or(WorldError::NoWorld)
}

/// Boot the demonstration world: library scripts, Midgaard, its mobs, then
/// the post-load scripts.
#[tracing::instrument(level = "debug", skip_all)]
pub fn load_demo(vm: &mut Vm) -> Result<(), WorldError> {
    let stored = scripts::stored_scripts();
    first_failure(vm.load_scripts(&stored, ExecOrder::Pre))?;

    add_area(vm, 30, "Midgaard")?;
    add_room(vm, 3001, 30, "Temple Square", "A wide square before the temple.")?;
    add_room(vm, 3014, 30, "Market Square", "Stalls crowd every corner.")?;
    add_template(vm, 3060, "cityguard", "Cityguard", scripts::CITYGUARD, 20)?;
    add_template(vm, 3062, "fido", "Fido", scripts::FIDO, 10)?;
    spawn(vm, 3060, 3001)?;
    spawn(vm, 3060, 3014)?;
    spawn(vm, 3062, 3014)?;

    first_failure(vm.load_scripts(&stored, ExecOrder::Post))
}

fn first_failure(failures: Vec<ScriptLoadError>) -> Result<(), WorldError> {
    match failures.into_iter().next() {
        Some(failure) => Err(failure.into()),
        None => Ok(()),
    }
}

pub fn add_area(vm: &mut Vm, vnum: i32, name: &str) -> Result<ObjRef, WorldError> {
    let area = vm.new_entity(EntityKind::Area, name);
    world_mut(vm)?.areas.insert(vnum, Value::Obj(area));
    vm.set_named_field(area, "vnum", Value::Int(vnum))?;
    Ok(area)
}

pub fn add_room(
    vm: &mut Vm,
    vnum: i32,
    area: i32,
    name: &str,
    description: &str,
) -> Result<ObjRef, WorldError> {
    let area = world(vm)?.area(area).ok_or(WorldError::UnknownArea(area))?;
    let room = vm.new_entity(EntityKind::Room, name);
    world_mut(vm)?.rooms.insert(vnum, Value::Obj(room));
    vm.set_named_field(room, "vnum", Value::Int(vnum))?;
    vm.set_named_field(room, "area", Value::Obj(area))?;
    let description = Rc::new(RefCell::new(description.to_string()));
    vm.set_named_field(room, "description", NativeField::Str(description))?;
    Ok(room)
}

/// Register a mob template whose behavior is the class `class` with the
/// given method bodies.
pub fn add_template(
    vm: &mut Vm,
    vnum: i32,
    name: &str,
    class: &str,
    body: &str,
    max_hp: i32,
) -> Result<ObjRef, WorldError> {
    let class = vm.create_class_from_template(class, body)?;
    let template = vm.new_entity(EntityKind::MobTemplate, name);
    world_mut(vm)?.templates.insert(vnum, Value::Obj(template));
    vm.set_entity_class(template, class)?;
    vm.set_named_field(template, "vnum", Value::Int(vnum))?;
    vm.set_named_field(template, "max_hp", Value::Int(max_hp))?;
    Ok(template)
}

/// Create a live mob from a template, place it in `room`, and run its
/// `on_spawn` hook if it has one. Returns the mob's index.
#[tracing::instrument(level = "debug", skip(vm))]
pub fn spawn(vm: &mut Vm, template: i32, room: i32) -> Result<usize, WorldError> {
    let registry = world(vm)?;
    let template_ref = registry
        .template(template)
        .ok_or(WorldError::UnknownTemplate(template))?;
    let room_ref = registry.room(room).ok_or(WorldError::UnknownRoom(room))?;

    let (name, class) = {
        let entity = vm.entity(template_ref)?;
        (vm.heap().str(entity.name).to_owned(), entity.class)
    };
    let max_hp = match vm.get_named_field(template_ref, "max_hp")? {
        Some(Value::Int(hp)) => hp,
        _ => 1,
    };

    let entity = vm.new_entity(EntityKind::Mob, &name);
    let hp = Rc::new(Cell::new(max_hp));
    let mob = Mob {
        entity,
        template,
        room,
        hp: Rc::clone(&hp),
        alive: true,
    };
    let registry = world_mut(vm)?;
    let index = match registry.free.pop() {
        Some(index) => match registry.mobs.get_mut(index) {
            Some(slot) => {
                *slot = mob;
                index
            }
            None => registry.mobs.push(mob),
        },
        None => registry.mobs.push(mob),
    };
    vm.set_named_field(entity, "hp", NativeField::Int(hp))?;
    vm.set_named_field(entity, "room", Value::Obj(room_ref))?;
    if let Some(class) = class {
        vm.set_entity_class(entity, class)?;
    }

    if responds_to(vm, entity, "on_spawn") {
        vm.call_method(Value::Obj(entity), "on_spawn", &[])
            .map_err(InterpretError::from)?;
    }
    Ok(index)
}

/// Whether `entity`'s class defines `method`.
pub fn responds_to(vm: &Vm, entity: ObjRef, method: &str) -> bool {
    let Some(class) = vm.entity(entity).ok().and_then(|e| e.class) else {
        return false;
    };
    let Some(name) = vm.heap().find_interned(method) else {
        return false;
    };
    match vm.heap().try_get(class) {
        Some(Object::Class(class)) => class.methods.contains(vm.heap().key(name)),
        _ => false,
    }
}

/// Run every live mob's `on_tick`, then remove the mobs that died.
///
/// A failing hook is logged and skipped; the rest of the tick goes on.
#[tracing::instrument(level = "debug", skip_all)]
pub fn tick(vm: &mut Vm) -> Result<TickReport, WorldError> {
    let mut report = TickReport::default();
    let live: Vec<ObjRef> = world(vm)?.mobs().map(|m| m.entity).collect();

    for entity in live {
        if !responds_to(vm, entity, "on_tick") {
            continue;
        }
        match vm.call_method(Value::Obj(entity), "on_tick", &[]) {
            Ok(_) => report.ran += 1,
            Err(error) => {
                tracing::warn!(%error, "on_tick failed");
                report.failed += 1;
            }
        }
    }

    let dead: Vec<(usize, ObjRef)> = world(vm)?
        .mobs
        .iter()
        .enumerate()
        .filter(|(_, m)| m.alive && m.hp.get() <= 0)
        .map(|(i, m)| (i, m.entity))
        .collect();
    for (index, entity) in dead {
        let name = vm.heap().str(vm.entity(entity)?.name).to_owned();
        vm.print_handler().println(&format!("{name} is slain."));
        let registry = world_mut(vm)?;
        if let Some(mob) = registry.mobs.get_mut(index) {
            mob.alive = false;
            registry.free.push(index);
        }
        vm.free_entity(entity)?;
        report.slain += 1;
    }
    Ok(report)
}
