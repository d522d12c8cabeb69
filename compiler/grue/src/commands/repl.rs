//! The `repl` command: one VM, one line at a time.
//!
//! Globals persist between lines. A failing line is reported and the
//! session carries on.

use std::io::{self, BufRead, Write};

use super::{report_interpret_error, RunOptions};

pub fn run_repl(options: RunOptions) {
    let mut vm = options.builder().build();
    let stdin = io::stdin();
    let mut line = String::new();

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            return;
        }
        line.clear();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => {
                println!();
                return;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("error reading input: {e}");
                return;
            }
        }
        if line.trim().is_empty() {
            continue;
        }
        if let Err(error) = vm.interpret(&line) {
            report_interpret_error("<repl>", &line, &error);
        }
    }
}
