use pretty_assertions::assert_eq;

use crate::error::{InterpretError, RuntimeError, RuntimeErrorKind};
use crate::print_handler::buffer_handler;
use crate::{Value, Vm};

fn vm() -> Vm {
    Vm::builder().print_handler(buffer_handler()).build()
}

fn run(source: &str) -> String {
    let mut vm = vm();
    if let Err(error) = vm.interpret(source) {
        panic!("script failed:\n{error}");
    }
    vm.print_handler().output()
}

fn run_err(source: &str) -> RuntimeError {
    let mut vm = vm();
    match vm.interpret(source) {
        Err(InterpretError::Runtime(error)) => error,
        Err(other) => panic!("expected a runtime error, got:\n{other}"),
        Ok(()) => panic!("expected a runtime error"),
    }
}

// ─── Arithmetic ───

#[test]
fn integer_arithmetic_stays_integral() {
    assert_eq!(
        run("print 7 / 2; print -7 / 2; print 7 % 3; print 2 * 3 - 1;"),
        "3\n-3\n1\n5\n"
    );
}

#[test]
fn doubles_promote_mixed_operands() {
    assert_eq!(run("print 1 + 2.5; print 7.0 / 2; print 3 * 0.5;"), "3.5\n3.5\n1.5\n");
}

#[test]
fn integer_overflow_promotes_to_double() {
    assert_eq!(
        run("print 2147483647 + 1; var m = -2147483647 - 1; print m; print -m;"),
        "2147483648\n-2147483648\n2147483648\n"
    );
}

#[test]
fn integer_division_by_zero_is_an_error() {
    let error = run_err("print 1 / 0;");
    assert_eq!(error.kind, RuntimeErrorKind::DivisionByZero);
    assert_eq!(error.message, "Division by zero.");

    let error = run_err("print 5 % 0;");
    assert_eq!(error.kind, RuntimeErrorKind::DivisionByZero);
}

#[test]
fn double_division_by_zero_is_infinite() {
    assert_eq!(run("print 1.0 / 0 > 1000000;"), "true\n");
}

#[test]
fn comparisons_cross_numeric_types() {
    assert_eq!(
        run("print 1 < 2.5; print 3 > 4; print 2 <= 2; print 1 == 1.0; print 1 != 2;"),
        "true\nfalse\ntrue\ntrue\ntrue\n"
    );
}

#[test]
fn arithmetic_on_non_numbers_is_an_operand_error() {
    let error = run_err("print 1 - \"a\";");
    assert_eq!(error.kind, RuntimeErrorKind::OperandType);
    assert_eq!(error.message, "Operands must be numbers.");

    let error = run_err("print 1 + nil;");
    assert_eq!(error.message, "Operands must be two numbers or two strings.");

    let error = run_err("print -\"sword\";");
    assert_eq!(error.message, "Operand must be a number.");
}

// ─── Strings ───

#[test]
fn strings_concatenate_and_intern() {
    assert_eq!(
        run("var a = \"tro\" + \"ll\"; print a; print a == \"troll\";"),
        "troll\ntrue\n"
    );
}

#[test]
fn interpolation_stringifies_each_part() {
    assert_eq!(
        run("var hp = 3; var name = \"troll\"; print \"${name} has ${hp * 2} hp\";"),
        "troll has 6 hp\n"
    );
}

#[test]
fn truthiness() {
    assert_eq!(
        run("print !nil; print !0; print !\"\"; print !false;"),
        "true\nfalse\nfalse\ntrue\n"
    );
}

// ─── Variables ───

#[test]
fn undefined_global_read_is_an_error() {
    let error = run_err("print mana;");
    assert_eq!(error.kind, RuntimeErrorKind::UndefinedVariable);
    assert_eq!(error.message, "Undefined variable 'mana'.");
}

#[test]
fn assigning_an_undefined_global_does_not_define_it() {
    let mut vm = vm();
    let error = vm.interpret("mana = 3;");
    assert!(matches!(error, Err(InterpretError::Runtime(_))));
    assert_eq!(vm.get_global("mana"), None);
}

#[test]
fn increments_and_compound_assignment() {
    assert_eq!(
        run("var i = 1; print i++; print i; print ++i; print i--; print i; i += 10; print i;"),
        "1\n2\n3\n3\n2\n12\n"
    );
}

#[test]
fn postfix_keeps_the_original_value() {
    assert_eq!(run("var x = 0.1; print x++; print x;"), "0.1\n1.1\n");
    assert_eq!(
        run("var x = 2147483647; var y = x++; print y; print type(y); print x; print type(x);"),
        "2147483647\nint\n2147483648\ndouble\n"
    );
    assert_eq!(
        run("var x = -2147483647 - 1; var y = x--; print y; print type(y); print x;"),
        "-2147483648\nint\n-2147483649\n"
    );
}

#[test]
fn increments_on_doubles_and_at_the_int_boundary() {
    let source = "
        var z = 2147483647;
        print ++z;
        print type(z);
        var c = 2147483647;
        c += 1;
        print type(c);
        var d = 0.5;
        d *= 3;
        print d;
        print --d;
    ";
    assert_eq!(run(source), "2147483648\ndouble\ndouble\n1.5\n0.5\n");
}

#[test]
fn increments_through_property_and_index_targets() {
    let source = "
        class P {}
        var p = P();
        p.v = 0.5;
        print p.v++;
        print p.v;
        p.v = 2147483647;
        print p.v++;
        print type(p.v);
        p.v = 2147483647;
        print ++p.v;
        var a = [0.5, 2147483647];
        print a[0]--;
        print a[0];
        print a[1]++;
        print a[1];
        a[1] = 2147483647;
        a[1] += 1;
        print type(a[1]);
    ";
    assert_eq!(
        run(source),
        "0.5\n1.5\n2147483647\ndouble\n2147483648\n0.5\n-0.5\n2147483647\n2147483648\ndouble\n"
    );
}

#[test]
fn postfix_statement_leaves_the_stack_balanced() {
    let source = "
        class C {}
        var c = C();
        c.n = 0;
        var a = [0];
        for (var i = 0; i < 3; i++) { c.n++; a[0]--; }
        print c.n;
        print a[0];
    ";
    assert_eq!(run(source), "3\n-3\n");
}

#[test]
fn compound_assignment_through_index_and_property() {
    let source = "
        class Bag {}
        var b = Bag();
        b.gold = 5;
        b.gold += 3;
        b.gold++;
        var a = [1, 2];
        a[1] *= 10;
        ++a[0];
        print b.gold;
        print a;
    ";
    assert_eq!(run(source), "9\n[2, 20]\n");
}

#[test]
fn loops_and_locals() {
    let source = "
        var sum = 0;
        for (var i = 0; i < 5; i++) { sum += i; }
        var n = 3;
        while (n > 0) { sum = sum + n; n = n - 1; }
        print sum;
    ";
    assert_eq!(run(source), "16\n");
}

// ─── Functions and closures ───

#[test]
fn functions_return_values() {
    assert_eq!(
        run("fun add(a, b) { return a + b; } print add(2, 3); fun none() {} print none();"),
        "5\nnil\n"
    );
}

#[test]
fn arity_mismatch_is_reported() {
    let error = run_err("fun hit(target) {} hit();");
    assert_eq!(error.kind, RuntimeErrorKind::ArityMismatch);
    assert_eq!(error.message, "Expected 1 arguments but got 0.");
}

#[test]
fn calling_a_non_callable_is_an_error() {
    let error = run_err("var x = 3; x();");
    assert_eq!(error.kind, RuntimeErrorKind::NotCallable);
    assert_eq!(error.message, "Can only call functions and classes.");
}

#[test]
fn closures_keep_their_own_state() {
    let source = "
        fun counter() {
            var n = 0;
            fun inc() { n = n + 1; return n; }
            return inc;
        }
        var a = counter();
        var b = counter();
        print a(); print a(); print b();
    ";
    assert_eq!(run(source), "1\n2\n1\n");
}

#[test]
fn closures_share_a_captured_variable() {
    let source = "
        var get; var set;
        fun make() {
            var x = 1;
            fun g() { return x; }
            fun s(v) { x = v; }
            get = g; set = s;
        }
        make();
        set(5);
        print get();
    ";
    assert_eq!(run(source), "5\n");
}

#[test]
fn captured_local_sees_updates_before_close() {
    let source = "
        fun outer() {
            var x = \"before\";
            fun show() { print x; }
            x = \"after\";
            show();
        }
        outer();
    ";
    assert_eq!(run(source), "after\n");
}

#[test]
fn deep_recursion_overflows_the_frame_stack() {
    let mut vm = vm();
    let error = vm.interpret("fun f(n) { return f(n + 1); } f(0);");
    let Err(InterpretError::Runtime(error)) = error else {
        panic!("expected stack overflow");
    };
    assert_eq!(error.kind, RuntimeErrorKind::StackOverflow);
    assert_eq!(vm.stack_depth(), 0);
}

#[test]
fn frames_max_is_configurable() {
    let mut vm = Vm::builder()
        .print_handler(buffer_handler())
        .frames_max(4)
        .build();
    let source = "fun depth(n) { if (n == 0) return 0; return depth(n - 1); } depth(10);";
    let error = vm.interpret(source);
    assert!(matches!(
        error,
        Err(InterpretError::Runtime(RuntimeError {
            kind: RuntimeErrorKind::StackOverflow,
            ..
        }))
    ));
}

// ─── Classes ───

#[test]
fn initializer_and_methods() {
    let source = "
        class Counter {
            init(start) { this.n = start; }
            bump() { this.n = this.n + 1; return this; }
        }
        var c = Counter(7);
        print c.bump().bump().n;
        print c;
    ";
    assert_eq!(run(source), "9\nCounter instance\n");
}

#[test]
fn class_without_init_rejects_arguments() {
    let error = run_err("class Rock {} Rock(1);");
    assert_eq!(error.kind, RuntimeErrorKind::ArityMismatch);
    assert_eq!(error.message, "Expected 0 arguments but got 1.");
}

#[test]
fn bound_methods_remember_their_receiver() {
    let source = "
        class Mob { init(name) { this.name = name; } greet() { return \"I am \" + this.name; } }
        var m = Mob(\"orc\");
        var g = m.greet;
        print g();
    ";
    assert_eq!(run(source), "I am orc\n");
}

#[test]
fn fields_shadow_methods_on_invoke() {
    let source = "
        fun five() { return 5; }
        class A { f() { return 1; } }
        var a = A();
        print a.f();
        a.f = five;
        print a.f();
    ";
    assert_eq!(run(source), "1\n5\n");
}

#[test]
fn inheritance_and_super() {
    let source = "
        class Creature {
            init(name) { this.name = name; }
            describe() { return \"a \" + this.name; }
        }
        class Dragon < Creature {
            init(name) { super.init(name); this.wings = 2; }
            describe() { return super.describe() + \" with wings\"; }
        }
        var d = Dragon(\"wyrm\");
        print d.describe();
        print d.wings;
    ";
    assert_eq!(run(source), "a wyrm with wings\n2\n");
}

#[test]
fn inherited_methods_are_copied_at_declaration() {
    let source = "
        class A { f() { return \"old\"; } }
        class B < A {}
        class A { f() { return \"new\"; } }
        print B().f();
        print A().f();
    ";
    assert_eq!(run(source), "old\nnew\n");
}

#[test]
fn inheriting_from_a_non_class_is_an_error() {
    let error = run_err("var NotAClass = 3; class B < NotAClass {}");
    assert_eq!(error.message, "Superclass must be a class.");
}

#[test]
fn missing_property_names_the_property() {
    let error = run_err("class A {} print A().missing;");
    assert_eq!(error.kind, RuntimeErrorKind::UndefinedProperty);
    assert!(error.message.contains("missing"), "{}", error.message);
}

#[test]
fn properties_on_primitives_are_rejected() {
    assert_eq!(run_err("print 3.x;").message, "Only instances have properties.");
    assert_eq!(run_err("var s = \"a\"; s.x = 1;").message, "Only instances have fields.");
    assert_eq!(run_err("var n = 1; n.go();").message, "Only instances have methods.");
}

// ─── Collections ───

#[test]
fn array_literals_index_and_count() {
    let source = "
        var a = [1, \"two\", 3.5];
        print a[1];
        a[0] = 10;
        print a;
        print a.count;
        print [].count;
    ";
    assert_eq!(run(source), "two\n[10, two, 3.5]\n3\n0\n");
}

#[test]
fn array_index_errors() {
    let error = run_err("var a = [1]; print a[1];");
    assert_eq!(error.kind, RuntimeErrorKind::IndexOutOfBounds);
    assert_eq!(error.message, "Index 1 out of bounds for length 1.");

    let error = run_err("var a = [1]; print a[-1];");
    assert_eq!(error.kind, RuntimeErrorKind::IndexOutOfBounds);

    let error = run_err("var a = [1]; print a[\"x\"];");
    assert_eq!(error.kind, RuntimeErrorKind::InvalidIndex);
    assert_eq!(error.message, "Index must be an integer.");

    let error = run_err("var n = 1; print n[0];");
    assert_eq!(error.message, "Can only index arrays, lists and tables.");
}

#[test]
fn count_is_read_only() {
    let error = run_err("var a = [1]; a.count = 4;");
    assert_eq!(error.message, "Only instances have fields.");
}

#[test]
fn list_index_assignment() {
    let source = "
        var l = list();
        l.push(1);
        l.push(2);
        l[0] = 5;
        l[1]++;
        print l[0];
        print l[1];
    ";
    assert_eq!(run(source), "5\n3\n");

    let error = run_err("var l = list(); l.push(1); l[1] = 2;");
    assert_eq!(error.kind, RuntimeErrorKind::IndexOutOfBounds);

    let error = run_err("var n = 1; n[0] = 2;");
    assert_eq!(error.message, "Can only assign into arrays, lists and tables.");
}

#[test]
fn table_indexing_by_string_and_int() {
    let source = "
        var t = table();
        t[\"exits\"] = 2;
        t[7] = \"seven\";
        print t[\"exits\"];
        print t[7];
        print t[\"missing\"];
        print t.count;
    ";
    assert_eq!(run(source), "2\nseven\nnil\n2\n");
}

#[test]
fn table_keys_must_be_strings_or_ints() {
    let error = run_err("var t = table(); t[1.5] = 1;");
    assert_eq!(error.kind, RuntimeErrorKind::InvalidIndex);
    assert_eq!(error.message, "Table key must be a string or integer.");
}

// ─── Errors and recovery ───

#[test]
fn runtime_error_carries_a_trace_innermost_first() {
    let source = "fun inner() { return nope; }\nfun outer() { return inner(); }\nouter();";
    let error = run_err(source);
    assert_eq!(
        error.to_string(),
        "Undefined variable 'nope'.\n[line 1] in inner()\n[line 2] in outer()\n[line 3] in script"
    );
}

#[test]
fn vm_is_reusable_after_a_runtime_error() {
    let mut vm = vm();
    assert!(vm.interpret("var x = 1; fun boom() { return 1 / 0; } boom();").is_err());
    assert_eq!(vm.stack_depth(), 0);
    assert!(vm.interpret("print x + 1;").is_ok());
    assert_eq!(vm.print_handler().output(), "2\n");
}

#[test]
fn compile_errors_do_not_run_anything() {
    let mut vm = vm();
    let result = vm.interpret("print 1; print ;");
    assert!(matches!(result, Err(InterpretError::Compile(_))));
    assert_eq!(vm.print_handler().output(), "");
}

// ─── Host calls ───

#[test]
fn call_function_runs_a_global() {
    let mut vm = vm();
    assert!(vm.interpret("fun damage(base, bonus) { return base * 2 + bonus; }").is_ok());
    let result = vm.call_function("damage", &[Value::Int(4), Value::Int(1)]);
    assert!(matches!(result, Ok(Value::Int(9))));
    assert_eq!(vm.stack_depth(), 0);
}

#[test]
fn call_function_reports_a_missing_global() {
    let mut vm = vm();
    let result = vm.call_function("on_enter", &[]);
    let Err(error) = result else {
        panic!("expected an error");
    };
    assert_eq!(
        error.as_runtime().map(|e| e.kind),
        Some(RuntimeErrorKind::UndefinedVariable)
    );
}

#[test]
fn invoke_closure_calls_a_held_closure() {
    let mut vm = vm();
    let source = "
        var hook;
        {
            var greeting = \"hi\";
            fun h(who) { return greeting + \" \" + who; }
            hook = h;
        }
    ";
    assert!(vm.interpret(source).is_ok());
    let Some(Value::Obj(hook)) = vm.get_global("hook") else {
        panic!("hook not defined");
    };
    let name = vm.intern("bob");
    let result = vm.invoke_closure(hook, &[Value::Obj(name)]);
    let Ok(value) = result else {
        panic!("call failed");
    };
    assert_eq!(vm.display(value), "hi bob");
}

#[test]
fn nested_native_calls_resume_the_outer_script() {
    let mut vm = vm();
    vm.define_native("apply", Some(2), |vm, args| {
        Ok(vm.call_value(args[0], &args[1..])?)
    });
    let source = "
        fun twice(n) { return n * 2; }
        fun outer() { return apply(twice, 5) + 1; }
        print outer();
        print apply(outer, nil);
    ";
    // `outer` takes no arguments: the nested call fails and the native
    // reports it.
    let result = vm.interpret(source);
    assert_eq!(vm.print_handler().output(), "11\n");
    let Err(InterpretError::Runtime(error)) = result else {
        panic!("expected an arity error");
    };
    assert_eq!(error.kind, RuntimeErrorKind::Native);
    assert_eq!(error.message, "Expected 0 arguments but got 1.");
    assert_eq!(vm.stack_depth(), 0);
}
