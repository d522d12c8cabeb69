use grue_core::{Function, GcConfig, Heap, ObjRef, Object, OpCode, Value};
use pretty_assertions::assert_eq;

use crate::{compile, CompileError};

fn compile_ok(heap: &mut Heap, source: &str) -> ObjRef {
    match compile(source, heap, &()) {
        Ok(function) => function,
        Err(error) => panic!("compile failed:\n{error}"),
    }
}

fn compile_err(source: &str) -> CompileError {
    let mut heap = Heap::default();
    match compile(source, &mut heap, &()) {
        Ok(_) => panic!("expected a compile error"),
        Err(error) => error,
    }
}

fn messages(source: &str) -> Vec<String> {
    compile_err(source)
        .diagnostics()
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn function(heap: &Heap, r: ObjRef) -> &Function {
    match heap.get(r) {
        Object::Function(function) => function,
        other => panic!("expected a function, got {:?}", other.kind()),
    }
}

/// Nested function constants of `r`, in pool order.
fn nested(heap: &Heap, r: ObjRef) -> Vec<ObjRef> {
    function(heap, r)
        .chunk
        .constants
        .iter()
        .filter_map(|v| v.as_obj())
        .filter(|&o| matches!(heap.get(o), Object::Function(_)))
        .collect()
}

fn op(op: OpCode) -> u8 {
    op as u8
}

// ─── Code shape ───

#[test]
fn arithmetic_print() {
    let mut heap = Heap::default();
    let script = compile_ok(&mut heap, "print 1 + 2;");
    let f = function(&heap, script);
    assert_eq!(
        f.chunk.code,
        vec![
            op(OpCode::Constant),
            0,
            op(OpCode::Constant),
            1,
            op(OpCode::Add),
            op(OpCode::Print),
            op(OpCode::Nil),
            op(OpCode::Return),
        ]
    );
    assert_eq!(f.chunk.constants, vec![Value::Int(1), Value::Int(2)]);
    assert_eq!(f.name, None);
}

#[test]
fn derived_comparisons() {
    let mut heap = Heap::default();
    let script = compile_ok(&mut heap, "1 <= 2;");
    let code = &function(&heap, script).chunk.code;
    assert_eq!(
        &code[4..7],
        &[op(OpCode::Greater), op(OpCode::Not), op(OpCode::Pop)]
    );
}

#[test]
fn constants_are_deduplicated() {
    let mut heap = Heap::default();
    let script = compile_ok(&mut heap, "print 7; print 7; print \"x\"; print \"x\";");
    assert_eq!(function(&heap, script).chunk.constants.len(), 2);
}

#[test]
fn large_integers_become_doubles() {
    let mut heap = Heap::default();
    let script = compile_ok(&mut heap, "print 3000000000;");
    assert_eq!(
        function(&heap, script).chunk.constants,
        vec![Value::Double(3_000_000_000.0)]
    );
}

#[test]
fn string_escapes_are_decoded() {
    let mut heap = Heap::default();
    let script = compile_ok(&mut heap, r#"print "a\tb\n\$\"";"#);
    let constant = function(&heap, script).chunk.constants[0];
    let text = constant.as_obj().and_then(|r| heap.as_str(r));
    assert_eq!(text, Some("a\tb\n$\""));
}

#[test]
fn interpolation_stringifies_and_concatenates() {
    let mut heap = Heap::default();
    let script = compile_ok(&mut heap, r#"var hp = 3; print "hp: ${hp}!";"#);
    let f = function(&heap, script);
    let stringify = f.chunk.code.iter().filter(|&&b| b == op(OpCode::Stringify)).count();
    let adds = f.chunk.code.iter().filter(|&&b| b == op(OpCode::Add)).count();
    assert_eq!(stringify, 1);
    assert_eq!(adds, 2);
    let strings: Vec<&str> = f
        .chunk
        .constants
        .iter()
        .filter_map(|v| v.as_obj().and_then(|r| heap.as_str(r)))
        .collect();
    assert_eq!(strings, vec!["hp", "hp: ", "!"]);
}

// ─── Interning and determinism ───

#[test]
fn equal_literals_share_one_string() {
    let mut heap = Heap::default();
    let script = compile_ok(
        &mut heap,
        r#"fun a() { return "goblin"; } fun b() { return "goblin"; }"#,
    );
    let functions = nested(&heap, script);
    assert_eq!(functions.len(), 2);
    let literal = |f: ObjRef| {
        function(&heap, f)
            .chunk
            .constants
            .iter()
            .find_map(|v| v.as_obj())
    };
    assert_eq!(literal(functions[0]), literal(functions[1]));
}

/// Structural equality of two compiled functions: same bytes, lines and
/// arity, constants equal by value (interned strings by handle) and nested
/// functions compared recursively.
fn same_function(heap: &Heap, a: ObjRef, b: ObjRef) -> bool {
    let (fa, fb) = (function(heap, a), function(heap, b));
    if fa.chunk.code != fb.chunk.code
        || fa.chunk.lines != fb.chunk.lines
        || fa.arity != fb.arity
        || fa.upvalue_count != fb.upvalue_count
        || fa.name != fb.name
        || fa.chunk.constants.len() != fb.chunk.constants.len()
    {
        return false;
    }
    fa.chunk
        .constants
        .iter()
        .zip(&fb.chunk.constants)
        .all(|(&x, &y)| match (x, y) {
            (Value::Obj(x), Value::Obj(y))
                if matches!(heap.get(x), Object::Function(_)) =>
            {
                same_function(heap, x, y)
            }
            _ => x == y,
        })
}

#[test]
fn compilation_is_deterministic() {
    let source = r#"
        class Mob {
            init(hp) { this.hp = hp; }
            hit(n) { this.hp -= n; return this.hp; }
        }
        fun make() {
            var count = 0;
            fun inc() { count++; return count; }
            return inc;
        }
        var m = Mob(10);
        print "hp ${m.hit(3)}";
    "#;
    let mut heap = Heap::default();
    let first = compile_ok(&mut heap, source);
    heap.pin(first);
    let second = compile_ok(&mut heap, source);
    assert!(same_function(&heap, first, second));
}

// ─── Resolution ───

#[test]
fn closures_capture_through_intermediate_functions() {
    let mut heap = Heap::default();
    let script = compile_ok(
        &mut heap,
        "fun outer() { var x = 1; fun middle() { fun inner() { return x; } return inner; } return middle; }",
    );
    let outer = nested(&heap, script)[0];
    let middle = nested(&heap, outer)[0];
    let inner = nested(&heap, middle)[0];
    assert_eq!(function(&heap, outer).upvalue_count, 0);
    assert_eq!(function(&heap, middle).upvalue_count, 1);
    assert_eq!(function(&heap, inner).upvalue_count, 1);

    // `middle` captures outer's local slot 1; `inner` captures middle's
    // upvalue 0.
    let outer_code = &function(&heap, outer).chunk.code;
    let at = outer_code
        .iter()
        .position(|&b| b == op(OpCode::Closure))
        .unwrap_or_default();
    assert_eq!(&outer_code[at + 2..at + 4], &[1, 1]);
    let middle_code = &function(&heap, middle).chunk.code;
    let at = middle_code
        .iter()
        .position(|&b| b == op(OpCode::Closure))
        .unwrap_or_default();
    assert_eq!(&middle_code[at + 2..at + 4], &[0, 0]);
}

#[test]
fn captured_locals_are_closed_at_scope_exit() {
    let mut heap = Heap::default();
    let script = compile_ok(&mut heap, "{ var a = 1; fun f() { return a; } }");
    let code = &function(&heap, script).chunk.code;
    let tail = &code[code.len() - 4..];
    assert_eq!(
        tail,
        &[op(OpCode::Pop), op(OpCode::CloseUpvalue), op(OpCode::Nil), op(OpCode::Return)]
    );
}

#[test]
fn duplicate_upvalues_share_a_slot() {
    let mut heap = Heap::default();
    let script = compile_ok(
        &mut heap,
        "fun f() { var a = 1; fun g() { return a + a + a; } }",
    );
    let f = nested(&heap, script)[0];
    let g = nested(&heap, f)[0];
    assert_eq!(function(&heap, g).upvalue_count, 1);
}

#[test]
fn methods_and_initializers() {
    let mut heap = Heap::default();
    let script = compile_ok(
        &mut heap,
        "class A { init(x) { this.x = x; } get() { return this.x; } } class B < A { get() { return super.get(); } }",
    );
    let methods = nested(&heap, script);
    assert_eq!(methods.len(), 3);
    let init = function(&heap, methods[0]);
    assert_eq!(init.arity, 1);
    // Initializers return `this` (slot 0).
    let code = &init.chunk.code;
    assert_eq!(
        &code[code.len() - 3..],
        &[op(OpCode::GetLocal), 0, op(OpCode::Return)]
    );
    let code = &function(&heap, script).chunk.code;
    assert!(code.contains(&op(OpCode::Inherit)));
    let sub_get = function(&heap, methods[2]);
    assert!(sub_get.chunk.code.contains(&op(OpCode::SuperInvoke)));
    assert_eq!(sub_get.upvalue_count, 1);
}

#[test]
fn compound_and_increment_targets() {
    let mut heap = Heap::default();
    let script = compile_ok(
        &mut heap,
        "var a = [1]; var t = table(); a[0] += 2; t.x = 1; t.x++; ++a[0]; var i = 0; i--;",
    );
    let code = &function(&heap, script).chunk.code;
    assert!(code.contains(&op(OpCode::Dup2)));
    assert!(code.contains(&op(OpCode::Dup)));
    assert!(code.contains(&op(OpCode::Bury)));
}

// ─── Errors ───

#[test]
fn error_messages_name_the_token() {
    assert_eq!(
        messages("1 + 2 = 3;"),
        vec!["[line 1] Error at '=': Invalid assignment target."]
    );
    assert_eq!(
        messages("print 1"),
        vec!["[line 1] Error at end: Expect ';' after value."]
    );
}

#[test]
fn errors_are_batched_across_statements() {
    let errors = messages("var = 1;\nprint ;\nreturn 1;");
    assert_eq!(
        errors,
        vec![
            "[line 1] Error at '=': Expect variable name.",
            "[line 2] Error at ';': Expect expression.",
            "[line 3] Error at 'return': Can't return from top-level code.",
        ]
    );
}

#[test]
fn lexical_errors_surface_as_diagnostics() {
    let error = compile_err("print \"open;");
    let first = &error.diagnostics()[0];
    assert_eq!(first.to_string(), "[line 1] Error: Unterminated string.");
    assert_eq!(first.offset, 6);
}

#[test]
fn scope_errors() {
    assert_eq!(
        messages("{ var a = a; }"),
        vec!["[line 1] Error at 'a': Can't read local variable in its own initializer."]
    );
    assert_eq!(
        messages("{ var a = 1; var a = 2; }"),
        vec!["[line 1] Error at 'a': Already a variable with this name in this scope."]
    );
}

#[test]
fn class_errors() {
    assert_eq!(
        messages("print this;"),
        vec!["[line 1] Error at 'this': Can't use 'this' outside of a class."]
    );
    assert_eq!(
        messages("class A < A {}"),
        vec!["[line 1] Error at 'A': A class can't inherit from itself."]
    );
    assert_eq!(
        messages("class A { f() { return super.f(); } }"),
        vec!["[line 1] Error at 'super': Can't use 'super' in a class with no superclass."]
    );
    assert_eq!(
        messages("class A { init() { return 1; } }"),
        vec!["[line 1] Error at 'return': Can't return a value from an initializer."]
    );
}

#[test]
fn too_many_constants() {
    let source: String = (0..300).map(|i| format!("print {i};")).collect();
    let errors = messages(&source);
    assert_eq!(
        errors[0],
        "[line 1] Error at '256': Too many constants in one chunk."
    );
    assert!(errors
        .iter()
        .all(|e| e.ends_with("Too many constants in one chunk.")));
}

#[test]
fn invalid_escape() {
    assert_eq!(
        messages(r#"print "\q";"#),
        vec![r#"[line 1] Error at '\q': Invalid escape sequence."#]
    );
}

// ─── Robustness ───

#[test]
fn deeply_nested_expressions_compile() {
    let depth = 5_000;
    let source = format!("print {}1{};", "(".repeat(depth), ")".repeat(depth));
    let mut heap = Heap::default();
    compile_ok(&mut heap, &source);
}

#[test]
fn survives_collection_on_every_allocation() {
    let mut heap = Heap::new(GcConfig {
        stress: true,
        ..GcConfig::default()
    });
    let source = r#"
        fun a() { var s = "alpha"; fun b() { return s + "beta"; } return b; }
        class C { m() { return "gamma ${1}"; } }
        print "delta";
    "#;
    let script = compile_ok(&mut heap, source);
    heap.pin(script);
    heap.collect(&());
    fn walk(heap: &Heap, r: ObjRef) {
        for value in &function(heap, r).chunk.constants {
            if let Some(obj) = value.as_obj() {
                assert!(heap.is_live(obj), "constant {obj:?} was collected");
                if matches!(heap.get(obj), Object::Function(_)) {
                    walk(heap, obj);
                }
            }
        }
    }
    walk(&heap, script);
    assert!(heap.find_interned("alpha").is_some());
    assert!(heap.find_interned("gamma ").is_some());
}
