//! End-to-end scripts run through a fresh VM.
//!
//! Each test compiles and runs source text the way the game server does
//! and checks what the script printed or what error it raised.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use grue_core::Object;
use grue_vm::{buffer_handler, InterpretError, RuntimeErrorKind, Value, Vm};
use pretty_assertions::assert_eq;

fn vm() -> Vm {
    Vm::builder().print_handler(buffer_handler()).build()
}

fn run(source: &str) -> String {
    let mut vm = vm();
    vm.interpret(source).unwrap();
    vm.print_handler().output()
}

#[test]
fn array_element_assignment() {
    assert_eq!(
        run("var a = [0,1,2,3,5,8,13,21]; a[2] = 100; print a[2];"),
        "100\n"
    );
}

#[test]
fn initializer_stores_and_method_reads() {
    let mut vm = vm();
    vm.interpret("class Box { init(x) { this.x = x; } get() { return this.x; } }")
        .unwrap();
    vm.interpret("print Box(7).get();").unwrap();
    assert_eq!(vm.print_handler().output(), "7\n");

    // The same call made from the host.
    let class = vm.get_global("Box").unwrap();
    let instance = vm.call_value(class, &[Value::Int(7)]).unwrap();
    let got = vm.call_method(instance, "get", &[]).unwrap();
    assert_eq!(got, Value::Int(7));
}

#[test]
fn closure_sees_local_mutated_after_capture() {
    let source = "
        var reader;
        fun make() {
            var hp = 10;
            fun read() { return hp; }
            reader = read;
            hp = 25;
            print read();
        }
        make();
        print reader();
    ";
    assert_eq!(run(source), "25\n25\n");
}

#[test]
fn closed_upvalue_keeps_last_written_value() {
    let source = "
        fun make() {
            var n = 0;
            fun bump() { n = n + 1; return n; }
            fun peek() { return n; }
            bump();
            return [bump, peek];
        }
        var pair = make();
        var bump = pair[0];
        var peek = pair[1];
        bump();
        bump();
        print peek();
    ";
    assert_eq!(run(source), "3\n");
}

#[test]
fn undefined_function_names_the_identifier() {
    let mut vm = vm();
    let result = vm.interpret("cast_fireball(3);");
    let Err(InterpretError::Runtime(error)) = result else {
        panic!("expected a runtime error, got {result:?}");
    };
    assert_eq!(error.kind, RuntimeErrorKind::UndefinedVariable);
    assert!(error.message.contains("cast_fireball"), "{}", error.message);

    // The VM is still usable.
    vm.interpret("print 1;").unwrap();
    assert_eq!(vm.print_handler().output(), "1\n");
    assert_eq!(vm.stack_depth(), 0);
}

#[test]
fn identical_literals_are_the_same_object() {
    let mut vm = vm();
    vm.interpret("var a = \"goblin\"; var b = \"gob\" + \"lin\"; var c = \"goblin\";")
        .unwrap();
    let a = vm.get_global("a").unwrap();
    let b = vm.get_global("b").unwrap();
    let c = vm.get_global("c").unwrap();
    assert_eq!(a.as_obj(), b.as_obj());
    assert_eq!(a.as_obj(), c.as_obj());
}

#[test]
fn compilation_is_deterministic() {
    let source = "
        fun hit(a, b) { var d = a * 2 - b; if (d < 0) return 0; return d; }
        class Orc { roar() { print \"grr\"; } }
        for (var i = 0; i < 3; i++) print hit(i, 1);
    ";
    let mut vm = vm();
    let first = vm.compile(source).unwrap();
    vm.protect(Value::Obj(first));
    let second = vm.compile(source).unwrap();

    let (Object::Function(f1), Object::Function(f2)) =
        (vm.heap().get(first), vm.heap().get(second))
    else {
        panic!("compile did not return functions");
    };
    assert_eq!(f1.chunk.code, f2.chunk.code);
    assert_eq!(f1.chunk.constants.len(), f2.chunk.constants.len());
    // Interned names in the pool are shared.
    for (a, b) in f1.chunk.constants.iter().zip(&f2.chunk.constants) {
        if vm.as_str(*a).is_some() {
            assert_eq!(a, b);
        }
    }
}

#[test]
fn subclass_overrides_textually() {
    let source = "
        class Weapon {
            damage() { return 1; }
            name() { return \"weapon\"; }
        }
        class Axe < Weapon {
            damage() { return 5; }
            damage() { return 8; }
        }
        var axe = Axe();
        print axe.damage();
        print axe.name();
    ";
    assert_eq!(run(source), "8\nweapon\n");
}

#[test]
fn mud_style_event_script() {
    let source = "
        class Room {
            init(name) { this.name = name; this.visitors = list(); }
            enter(who) {
                this.visitors.push(who);
                return \"${who} enters ${this.name} (${this.visitors.count} here)\";
            }
        }
        var tavern = Room(\"the tavern\");
        print tavern.enter(\"Bilbo\");
        print tavern.enter(\"Gandalf\");
        var tally = table();
        for (var i = 0; i < 6; i++) {
            var key = \"odd\";
            if (i % 2 == 0) key = \"even\";
            if (tally.has(key)) tally[key] += 1; else tally[key] = 1;
        }
        var even = tally[\"even\"];
        var odd = tally[\"odd\"];
        print \"${even} even, ${odd} odd\";
    ";
    assert_eq!(
        run(source),
        "Bilbo enters the tavern (1 here)\n\
         Gandalf enters the tavern (2 here)\n\
         3 even, 3 odd\n"
    );
}

#[test]
fn compile_errors_are_batched() {
    let mut vm = vm();
    let result = vm.interpret("var = 1;\nprint ;\nvar ok = 2;");
    let Err(InterpretError::Compile(error)) = result else {
        panic!("expected a compile error");
    };
    assert!(error.diagnostics().len() >= 2, "{error}");
}
