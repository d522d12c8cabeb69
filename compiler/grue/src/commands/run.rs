//! The `run` command: compile and execute a script file.

use super::{read_file, report_interpret_error, RunOptions};

pub fn run_file(path: &str, options: RunOptions) {
    let source = read_file(path);
    let mut vm = options.builder().build();

    if let Err(error) = vm.interpret(&source) {
        let code = report_interpret_error(path, &source, &error);
        std::process::exit(code);
    }

    let stats = vm.gc_stats();
    tracing::debug!(
        collections = stats.collections,
        freed = stats.objects_freed,
        live = stats.live_objects,
        "run finished"
    );
}
