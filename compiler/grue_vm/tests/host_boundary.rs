//! The game-server side of the VM: entities, native fields, templates,
//! host natives and stored scripts.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use grue_core::HeapError;
use grue_vm::{
    buffer_handler, EntityKind, ExecOrder, Host, HostError, InterpretError, NativeError,
    NativeField, ObjRef, RuntimeErrorKind, ScriptSource, Trace, Tracer, Value, Vm,
};
use pretty_assertions::assert_eq;

/// A tiny world: the rooms and mobs the server has loaded, plus whatever
/// mobs said this tick.
#[derive(Default)]
struct World {
    rooms: Vec<ObjRef>,
    mobs: Vec<ObjRef>,
    said: Vec<String>,
}

impl Host for World {
    fn trace_roots(&self, tracer: &mut Tracer<'_>) {
        self.rooms.trace(tracer);
        self.mobs.trace(tracer);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn world_vm() -> Vm {
    Vm::builder()
        .print_handler(buffer_handler())
        .host(Box::new(World::default()))
        .build()
}

fn spawn(vm: &mut Vm, kind: EntityKind, name: &str) -> ObjRef {
    let entity = vm.new_entity(kind, name);
    vm.host_mut::<World>().unwrap().mobs.push(entity);
    entity
}

// ─── Native fields ───

#[test]
fn int_field_round_trips_through_host_memory() {
    let mut vm = world_vm();
    let troll = spawn(&mut vm, EntityKind::Mob, "troll");
    let hp = Rc::new(Cell::new(30));
    vm.set_named_field(troll, "hp", NativeField::Int(hp.clone()))
        .unwrap();
    vm.set_global("troll", Value::Obj(troll));

    vm.interpret("print troll.hp; troll.hp -= 12; troll.hp++;").unwrap();
    assert_eq!(vm.print_handler().output(), "30\n");
    assert_eq!(hp.get(), 19);

    // Host-side changes are visible on the next read.
    hp.set(5);
    assert_eq!(vm.get_named_field(troll, "hp").unwrap(), Some(Value::Int(5)));
}

#[test]
fn string_and_double_fields() {
    let mut vm = world_vm();
    let sword = spawn(&mut vm, EntityKind::Thing, "sword");
    let short = Rc::new(RefCell::new(String::from("a rusty sword")));
    let weight = Rc::new(Cell::new(2.5));
    vm.set_named_field(sword, "short", NativeField::Str(short.clone()))
        .unwrap();
    vm.set_named_field(sword, "weight", NativeField::Double(weight.clone()))
        .unwrap();
    vm.set_global("sword", Value::Obj(sword));

    vm.interpret("print sword.short; sword.short = \"a gleaming sword\"; sword.weight = 4;")
        .unwrap();
    assert_eq!(vm.print_handler().output(), "a rusty sword\n");
    assert_eq!(*short.borrow(), "a gleaming sword");
    assert!((weight.get() - 4.0).abs() < f64::EPSILON);
}

#[test]
fn native_field_rejects_wrong_type() {
    let mut vm = world_vm();
    let troll = spawn(&mut vm, EntityKind::Mob, "troll");
    let hp = Rc::new(Cell::new(30));
    vm.set_named_field(troll, "hp", NativeField::Int(hp.clone()))
        .unwrap();
    vm.set_global("troll", Value::Obj(troll));

    let Err(InterpretError::Runtime(error)) = vm.interpret("troll.hp = \"lots\";") else {
        panic!("expected a type error");
    };
    assert_eq!(error.kind, RuntimeErrorKind::OperandType);
    assert_eq!(error.message, "Field 'hp' expects int, got string.");
    assert_eq!(hp.get(), 30);

    let error = vm.assign_field(troll, "hp", Value::Double(1.5)).unwrap_err();
    assert_eq!(error.message, "Field 'hp' expects int, got double.");
}

#[test]
fn plain_fields_hold_script_values() {
    let mut vm = world_vm();
    let room = vm.new_entity(EntityKind::Room, "tavern");
    vm.host_mut::<World>().unwrap().rooms.push(room);
    vm.set_named_field(room, "lit", Value::Bool(true)).unwrap();
    vm.set_global("room", Value::Obj(room));

    vm.interpret("room.exits = [\"north\", \"east\"]; print room.lit; print room;")
        .unwrap();
    assert_eq!(vm.print_handler().output(), "true\n<Room tavern>\n");

    let exits = vm.get_named_field(room, "exits").unwrap().unwrap();
    assert_eq!(vm.display(exits), "[north, east]");
    assert_eq!(vm.get_named_field(room, "nothing_here").unwrap(), None);
}

#[test]
fn entity_fields_survive_collection() {
    let mut vm = world_vm();
    let room = vm.new_entity(EntityKind::Room, "vault");
    vm.host_mut::<World>().unwrap().rooms.push(room);
    let loot = vm.new_array(vec![Value::Int(100)]);
    vm.set_named_field(room, "loot", Value::Obj(loot)).unwrap();

    vm.collect_garbage();
    assert!(vm.heap().is_live(loot));
}

#[test]
fn entity_missed_by_the_root_hook_is_still_traced() {
    let mut vm = world_vm();
    // Never registered with the world.
    let orphan = vm.new_entity(EntityKind::Mob, "stray cat");
    let toy = vm.new_array(vec![]);
    vm.set_named_field(orphan, "toy", Value::Obj(toy)).unwrap();

    vm.collect_garbage();
    assert!(vm.heap().is_live(orphan));
    assert!(vm.heap().is_live(toy));
}

// ─── Lifecycle ───

#[test]
fn entities_are_freed_exactly_once() {
    let mut vm = world_vm();
    let mob = vm.new_entity(EntityKind::Mob, "rat");
    vm.free_entity(mob).unwrap();
    assert!(!vm.heap().is_live(mob));

    let error = vm.free_entity(mob).unwrap_err();
    assert!(matches!(error, HostError::Heap(HeapError::Stale(_))), "{error}");
    assert!(vm.set_named_field(mob, "hp", Value::Int(1)).is_err());
}

#[test]
fn only_entities_can_be_freed() {
    let mut vm = world_vm();
    let array = vm.new_array(vec![]);
    let error = vm.free_entity(array).unwrap_err();
    assert!(matches!(error, HostError::NotAnEntity(_)));
}

#[test]
fn entities_are_not_collected() {
    let mut vm = world_vm();
    let item = vm.new_entity(EntityKind::Thing, "coin");
    vm.collect_garbage();
    assert!(vm.heap().is_live(item));
    assert_eq!(vm.entity(item).unwrap().kind, EntityKind::Thing);
}

#[test]
fn hosts_can_be_swapped_out() {
    let mut vm = world_vm();
    spawn(&mut vm, EntityKind::Mob, "rat");

    let previous = vm.set_host(Box::new(World::default())).unwrap();
    let previous = previous.as_any().downcast_ref::<World>().unwrap();
    assert_eq!(previous.mobs.len(), 1);
    assert_eq!(vm.host::<World>().unwrap().mobs.len(), 0);

    assert!(vm.take_host().is_some());
    assert!(vm.host::<World>().is_none());
    vm.interpret("print 1 + 1;").unwrap();
    assert_eq!(vm.print_handler().output(), "2\n");
}

// ─── Classes and templates ───

#[test]
fn template_class_drives_entity_methods() {
    let mut vm = world_vm();
    let class = vm
        .create_class_from_template(
            "Guard",
            "greet(who) { return \"The \" + this.title + \" nods at \" + who + \".\"; }",
        )
        .unwrap();
    let guard = spawn(&mut vm, EntityKind::Mob, "guard");
    let title = vm.intern("city guard");
    vm.set_named_field(guard, "title", Value::Obj(title)).unwrap();
    vm.set_entity_class(guard, class).unwrap();

    let who = vm.intern("Frodo");
    let greeting = vm
        .call_method(Value::Obj(guard), "greet", &[Value::Obj(who)])
        .unwrap();
    assert_eq!(vm.display(greeting), "The city guard nods at Frodo.");

    // Scripts see the same method.
    vm.set_global("guard", Value::Obj(guard));
    vm.interpret("print guard.greet(\"Sam\");").unwrap();
    assert_eq!(vm.print_handler().output(), "The city guard nods at Sam.\n");
}

#[test]
fn template_compile_errors_are_reported() {
    let mut vm = world_vm();
    let result = vm.create_class_from_template("Broken", "greet( { }");
    assert!(matches!(result, Err(InterpretError::Compile(_))));
    assert_eq!(vm.get_global("Broken"), None);
}

#[test]
fn set_entity_class_requires_a_class() {
    let mut vm = world_vm();
    let mob = spawn(&mut vm, EntityKind::Mob, "wolf");
    let not_class = vm.new_array(vec![]);
    let error = vm.set_entity_class(mob, not_class).unwrap_err();
    assert!(matches!(error, HostError::NotAClass(_)));
}

#[test]
fn instantiate_script_attaches_an_instance() {
    let mut vm = world_vm();
    let class = vm
        .create_class_from_template(
            "Shopkeeper",
            "init(markup) { this.markup = markup; } price(base) { return base * this.markup; }",
        )
        .unwrap();
    let shop = spawn(&mut vm, EntityKind::Mob, "shopkeeper");
    vm.set_entity_class(shop, class).unwrap();

    let script = vm.instantiate_script(shop, &[Value::Int(3)]).unwrap();
    assert_eq!(vm.entity_script(shop).unwrap(), Some(script));
    let price = vm
        .call_method(Value::Obj(script), "price", &[Value::Int(7)])
        .unwrap();
    assert_eq!(price, Value::Int(21));
}

#[test]
fn attached_closure_script_runs_on_demand() {
    let mut vm = world_vm();
    vm.interpret("fun on_enter(who) { print who + \" steps inside.\"; }")
        .unwrap();
    let room = vm.new_entity(EntityKind::Room, "hall");
    vm.host_mut::<World>().unwrap().rooms.push(room);
    let hook = vm.get_global("on_enter").unwrap().as_obj().unwrap();
    vm.attach_script(room, hook).unwrap();
    vm.interpret("on_enter = nil;").unwrap();
    vm.collect_garbage();

    let hook = vm.entity_script(room).unwrap().unwrap();
    let who = vm.intern("Merry");
    vm.invoke_closure(hook, &[Value::Obj(who)]).unwrap();
    assert_eq!(vm.print_handler().output(), "Merry steps inside.\n");
}

// ─── Host natives ───

#[test]
fn native_method_reaches_the_host() {
    let mut vm = world_vm();
    vm.define_method("say", Some(1), |vm, receiver, args| {
        let name = match receiver.as_obj().map(|r| vm.entity(r)) {
            Some(Ok(entity)) => vm.heap().str(entity.name).to_owned(),
            _ => return Err(NativeError::new("say expects an entity receiver.")),
        };
        let line = format!("{name} says '{}'", vm.display(args[0]));
        vm.host_mut::<World>().unwrap().said.push(line);
        Ok(Value::Nil)
    });
    let parrot = spawn(&mut vm, EntityKind::Mob, "parrot");
    vm.set_global("parrot", Value::Obj(parrot));

    vm.interpret("parrot.say(\"hello\"); parrot.say(42);").unwrap();
    assert_eq!(
        vm.host::<World>().unwrap().said,
        vec!["parrot says 'hello'", "parrot says '42'"]
    );
}

#[test]
fn unknown_spell_is_a_script_visible_error() {
    let mut vm = world_vm();
    vm.define_native("cast", Some(1), |vm, args| match vm.as_str(args[0]) {
        Some("heal") => Ok(Value::Int(10)),
        Some(other) => Err(NativeError::new(format!("Unknown spell '{other}'."))),
        None => Err(NativeError::new("cast expects a spell name.")),
    });
    vm.interpret("print cast(\"heal\");").unwrap();
    let Err(InterpretError::Runtime(error)) = vm.interpret("cast(\"meteor\");") else {
        panic!("expected the native to fail");
    };
    assert_eq!(error.kind, RuntimeErrorKind::Native);
    assert_eq!(error.message, "Unknown spell 'meteor'.");
    assert_eq!(vm.print_handler().output(), "10\n");
}

#[test]
fn class_methods_shadow_native_methods_on_entities() {
    let mut vm = world_vm();
    vm.define_method("describe", Some(0), |vm, _, _| Ok(Value::Obj(vm.intern("native"))));
    let class = vm
        .create_class_from_template("Statue", "describe() { return \"scripted\"; }")
        .unwrap();
    let statue = spawn(&mut vm, EntityKind::Thing, "statue");
    let rock = spawn(&mut vm, EntityKind::Thing, "rock");
    vm.set_entity_class(statue, class).unwrap();
    vm.set_global("statue", Value::Obj(statue));
    vm.set_global("rock", Value::Obj(rock));

    vm.interpret("print statue.describe(); print rock.describe();")
        .unwrap();
    assert_eq!(vm.print_handler().output(), "scripted\nnative\n");
}

// ─── Stored scripts ───

#[test]
fn scripts_load_in_category_then_filename_order() {
    let mut vm = world_vm();
    let scripts = vec![
        ScriptSource::new("zone", "b.grue", ExecOrder::Pre, "print \"zone/b\";"),
        ScriptSource::new("area", "z.grue", ExecOrder::Pre, "print \"area/z\";"),
        ScriptSource::new("zone", "a.grue", ExecOrder::Pre, "print \"zone/a\";"),
        ScriptSource::new("area", "late.grue", ExecOrder::Post, "print \"late\";"),
    ];

    let failures = vm.load_scripts(&scripts, ExecOrder::Pre);
    assert!(failures.is_empty());
    assert_eq!(vm.print_handler().take_output(), "area/z\nzone/a\nzone/b\n");

    let failures = vm.load_scripts(&scripts, ExecOrder::Post);
    assert!(failures.is_empty());
    assert_eq!(vm.print_handler().take_output(), "late\n");
}

#[test]
fn failing_script_does_not_stop_the_rest() {
    let mut vm = world_vm();
    let scripts = vec![
        ScriptSource::new("mobs", "a.grue", ExecOrder::Pre, "print undefined_thing;"),
        ScriptSource::new("mobs", "b.grue", ExecOrder::Pre, "print \"b ran\";"),
        ScriptSource::new("mobs", "c.grue", ExecOrder::Pre, "print ;"),
    ];

    let failures = vm.load_scripts(&scripts, ExecOrder::Pre);
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].filename, "a.grue");
    assert!(failures[0]
        .to_string()
        .starts_with("mobs/a.grue: Undefined variable 'undefined_thing'."));
    assert!(matches!(failures[1].error, InterpretError::Compile(_)));
    assert_eq!(vm.print_handler().output(), "b ran\n");
}
