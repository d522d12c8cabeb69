//! Collector behavior seen from the VM: roots survive, garbage goes.
//!
//! Stress mode collects before every allocation, so any value the VM
//! forgets to root shows up as a wrong answer or a stale-handle panic.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use std::any::Any;

use grue_vm::{buffer_handler, Host, ObjRef, Trace, Tracer, Value, Vm};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const PROGRAM: &str = "
    class Node {
        init(value, next) { this.value = value; this.next = next; }
        sum() {
            var rest = 0;
            if (this.next != nil) rest = this.next.sum();
            return this.value + rest;
        }
    }
    var head = nil;
    for (var i = 1; i <= 20; i++) head = Node(i, head);
    print head.sum();

    fun adder(n) { fun add(x) { return x + n; } return add; }
    var adders = [];
    for (var i = 0; i < 5; i++) adders.push(adder(i));
    var total = 0;
    for (var i = 0; i < adders.count; i++) total += adders[i](10);
    print total;

    var words = list();
    for (var i = 0; i < 10; i++) words.push(\"w${i}\");
    print words.pop_front() + words.pop();

    var index = table();
    for (var i = 0; i < 50; i++) index[\"k${i}\"] = [i, str(i)];
    print index[\"k42\"];
    print index.count;
";

fn output(stress: bool) -> String {
    let mut vm = Vm::builder()
        .print_handler(buffer_handler())
        .stress_gc(stress)
        .build();
    vm.interpret(PROGRAM).unwrap();
    vm.print_handler().output()
}

#[test]
fn stress_mode_matches_normal_run() {
    let normal = output(false);
    assert_eq!(normal, "210\n60\nw0w9\n[42, 42]\n50\n");
    assert_eq!(output(true), normal);
}

#[test]
fn stress_mode_collects() {
    let mut vm = Vm::builder()
        .print_handler(buffer_handler())
        .stress_gc(true)
        .build();
    vm.interpret("var a = []; for (var i = 0; i < 10; i++) a.push(\"s${i}\");")
        .unwrap();
    assert!(vm.gc_stats().collections > 10);
}

#[test]
fn unreachable_objects_are_reclaimed() {
    let mut vm = Vm::builder().print_handler(buffer_handler()).build();
    vm.interpret("var keep = [1, 2, 3]; { var drop = [[1], [2], [3]]; }")
        .unwrap();
    let keep = vm.get_global("keep").unwrap().as_obj().unwrap();
    vm.collect_garbage();
    let stats = vm.gc_stats();
    assert!(stats.objects_freed >= 4, "{stats:?}");
    assert!(vm.heap().is_live(keep));
}

#[test]
fn protect_pins_until_unprotect() {
    let mut vm = Vm::builder().print_handler(buffer_handler()).build();
    let array = vm.new_array(vec![Value::Int(1)]);
    vm.protect(Value::Obj(array));
    vm.collect_garbage();
    assert!(vm.heap().is_live(array));

    vm.unprotect(Value::Obj(array));
    vm.collect_garbage();
    assert!(!vm.heap().is_live(array));
}

#[test]
fn globals_and_open_upvalues_are_roots() {
    let mut vm = Vm::builder()
        .print_handler(buffer_handler())
        .stress_gc(true)
        .build();
    let source = "
        fun outer() {
            var captured = \"still here\";
            fun inner() { return captured; }
            gc();
            var noise = [1, 2, 3];
            return inner;
        }
        var f = outer();
        gc();
        print f();
    ";
    vm.interpret(source).unwrap();
    assert_eq!(vm.print_handler().output(), "still here\n");
}

/// A host that keeps script callbacks outside the VM.
#[derive(Default)]
struct Callbacks {
    held: Vec<ObjRef>,
}

impl Host for Callbacks {
    fn trace_roots(&self, tracer: &mut Tracer<'_>) {
        self.held.trace(tracer);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[test]
fn host_root_hook_keeps_callbacks_alive() {
    let mut vm = Vm::builder()
        .print_handler(buffer_handler())
        .host(Box::new(Callbacks::default()))
        .build();
    vm.interpret("fun on_tick(n) { return \"tick ${n}\"; }").unwrap();
    let callback = vm.get_global("on_tick").unwrap().as_obj().unwrap();
    vm.host_mut::<Callbacks>().unwrap().held.push(callback);

    // Drop the only script-side reference.
    vm.interpret("on_tick = nil;").unwrap();
    vm.collect_garbage();
    assert!(vm.heap().is_live(callback));

    let result = vm.invoke_closure(callback, &[Value::Int(3)]).unwrap();
    assert_eq!(vm.display(result), "tick 3");

    vm.host_mut::<Callbacks>().unwrap().held.clear();
    vm.collect_garbage();
    assert!(!vm.heap().is_live(callback));
}

fn reference(a: i32, b: i32, op: char) -> String {
    let (wide, float) = match op {
        '+' => (i64::from(a) + i64::from(b), f64::from(a) + f64::from(b)),
        '-' => (i64::from(a) - i64::from(b), f64::from(a) - f64::from(b)),
        _ => (i64::from(a) * i64::from(b), f64::from(a) * f64::from(b)),
    };
    match i32::try_from(wide) {
        Ok(narrow) => narrow.to_string(),
        Err(_) => float.to_string(),
    }
}

proptest! {
    #[test]
    fn integer_ops_promote_only_on_overflow(a in any::<i32>(), b in any::<i32>()) {
        let mut vm = Vm::builder().print_handler(buffer_handler()).build();
        vm.set_global("a", Value::Int(a));
        vm.set_global("b", Value::Int(b));
        vm.interpret("print a + b; print a - b; print a * b;").unwrap();
        let expected = format!(
            "{}\n{}\n{}\n",
            reference(a, b, '+'),
            reference(a, b, '-'),
            reference(a, b, '*'),
        );
        prop_assert_eq!(vm.print_handler().output(), expected);
    }

    #[test]
    fn integer_division_truncates(a in any::<i32>(), b in any::<i32>().prop_filter("nonzero", |b| *b != 0)) {
        let mut vm = Vm::builder().print_handler(buffer_handler()).build();
        vm.set_global("a", Value::Int(a));
        vm.set_global("b", Value::Int(b));
        vm.interpret("print a / b; print a % b;").unwrap();
        let quotient = a
            .checked_div(b)
            .map_or_else(|| (f64::from(a) / f64::from(b)).to_string(), |q| q.to_string());
        let expected = format!("{quotient}\n{}\n", a.wrapping_rem(b));
        prop_assert_eq!(vm.print_handler().output(), expected);
    }
}
