//! The `disasm` command: print the bytecode of a script and every function
//! nested in it.

use grue_core::{disassemble, Heap, ObjRef, Object};
use grue_vm::InterpretError;

use super::{read_file, report_interpret_error, RunOptions};

pub fn disassemble_file(path: &str) {
    let source = read_file(path);
    let mut vm = RunOptions::default().builder().without_builtins().build();
    let script = match vm.compile(&source) {
        Ok(script) => script,
        Err(error) => {
            let code = report_interpret_error(path, &source, &InterpretError::Compile(error));
            std::process::exit(code);
        }
    };
    print!("{}", disassemble_all(vm.heap(), script));
}

/// Listings for `function` and its nested functions, depth first in
/// constant-pool order.
pub(crate) fn disassemble_all(heap: &Heap, function: ObjRef) -> String {
    let mut out = String::new();
    let mut pending = vec![function];
    while let Some(next) = pending.pop() {
        let Object::Function(f) = heap.get(next) else {
            continue;
        };
        let name = f.name.map_or("<script>", |n| heap.str(n));
        out.push_str(&disassemble(heap, &f.chunk, name));
        out.push('\n');

        let nested = f.chunk.constants.iter().rev().filter_map(|c| c.as_obj());
        pending.extend(nested.filter(|&c| matches!(heap.get(c), Object::Function(_))));
    }
    out
}
