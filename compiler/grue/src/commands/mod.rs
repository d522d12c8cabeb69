//! Command handlers for the `grue` CLI.
//!
//! Each submodule implements one command. Shared helpers (file reading,
//! VM construction, error reporting) live here.

mod disasm;
mod repl;
mod run;
mod world;


pub use disasm::disassemble_file;
pub use repl::run_repl;
pub use run::run_file;
pub use world::{run_world, WorldOptions};

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use grue_vm::{stdout_handler, CompileError, ErrorLocation, InterpretError, Vm, VmBuilder};

/// Exit status for a script that failed to compile.
pub const EXIT_COMPILE_ERROR: i32 = 65;
/// Exit status for a script that failed at runtime.
pub const EXIT_RUNTIME_ERROR: i32 = 70;

/// Options shared by every command that runs scripts.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunOptions {
    /// Collect before every allocation.
    pub stress_gc: bool,
}

impl RunOptions {
    /// Parse run flags, ignoring anything unrecognized.
    pub fn from_args(args: &[String]) -> Self {
        let mut options = RunOptions::default();
        for arg in args {
            if arg == "--stress-gc" {
                options.stress_gc = true;
            }
        }
        options
    }

    pub(crate) fn builder(self) -> VmBuilder {
        Vm::builder()
            .print_handler(stdout_handler())
            .stress_gc(self.stress_gc)
    }
}

/// Read a source file, exiting with a readable message if it can't be read.
pub(crate) fn read_file(path: &str) -> String {
    match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            let msg = match e.kind() {
                std::io::ErrorKind::NotFound => format!("cannot find file '{path}'"),
                std::io::ErrorKind::PermissionDenied => {
                    format!("permission denied reading '{path}'")
                }
                std::io::ErrorKind::InvalidData => {
                    format!("'{path}' contains invalid UTF-8 data")
                }
                _ => format!("error reading '{path}': {e}"),
            };
            eprintln!("{msg}");
            std::process::exit(1);
        }
    }
}

/// Render every diagnostic in `error` as an ariadne report.
pub fn render_compile_error(path: &str, source: &str, error: &CompileError, color: bool) -> String {
    let mut out = Vec::new();
    for diagnostic in error.diagnostics() {
        let span = diagnostic.span();
        let end = span.end.max(span.start + 1).min(source.len());
        let start = span.start.min(end);
        let label = match &diagnostic.location {
            ErrorLocation::Token(lexeme) => format!("at '{lexeme}'"),
            ErrorLocation::End => "at end of input".to_string(),
            ErrorLocation::Lexical => "here".to_string(),
        };
        let report = Report::build(ReportKind::Error, path, start)
            .with_config(Config::default().with_color(color))
            .with_message(format!("[line {}] {}", diagnostic.line, diagnostic.message))
            .with_label(
                Label::new((path, start..end))
                    .with_message(label)
                    .with_color(Color::Red),
            )
            .finish();
        if let Err(e) = report.write((path, Source::from(source)), &mut out) {
            tracing::warn!(error = %e, "failed to render diagnostic");
            out.extend_from_slice(format!("{diagnostic}\n").as_bytes());
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Report a failed `interpret` on stderr and return the exit status to use.
pub(crate) fn report_interpret_error(path: &str, source: &str, error: &InterpretError) -> i32 {
    match error {
        InterpretError::Compile(error) => {
            let color = std::io::IsTerminal::is_terminal(&std::io::stderr());
            eprint!("{}", render_compile_error(path, source, error, color));
            EXIT_COMPILE_ERROR
        }
        InterpretError::Runtime(error) => {
            eprintln!("runtime error in '{path}': {error}");
            EXIT_RUNTIME_ERROR
        }
    }
}
