//! The `world` command: boot the demonstration world and let it tick.

use grue_vm::Vm;

use super::{read_file, report_interpret_error, RunOptions, EXIT_RUNTIME_ERROR};
use crate::world::{self, WorldError};

/// Options for `grue world`.
#[derive(Clone, Debug)]
pub struct WorldOptions {
    pub run: RunOptions,
    pub ticks: usize,
    /// Script to run once the world is loaded.
    pub script: Option<String>,
}

impl Default for WorldOptions {
    fn default() -> Self {
        Self {
            run: RunOptions::default(),
            ticks: 5,
            script: None,
        }
    }
}

impl WorldOptions {
    /// Parse `[script] [--ticks=N] [--stress-gc]`.
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        let mut options = WorldOptions {
            run: RunOptions::from_args(args),
            ..WorldOptions::default()
        };
        for arg in args {
            if let Some(n) = arg.strip_prefix("--ticks=") {
                options.ticks = n
                    .parse()
                    .map_err(|_| format!("invalid tick count '{n}'"))?;
            } else if !arg.starts_with("--") {
                options.script = Some(arg.clone());
            }
        }
        Ok(options)
    }
}

pub fn run_world(options: &WorldOptions) {
    let mut vm = world::install(options.run.builder());
    if let Err(error) = boot(&mut vm, options) {
        eprintln!("error: {error}");
        std::process::exit(EXIT_RUNTIME_ERROR);
    }

    for n in 1..=options.ticks {
        println!("-- tick {n} --");
        match world::tick(&mut vm) {
            Ok(report) => tracing::debug!(?report, "tick finished"),
            Err(error) => {
                eprintln!("error: {error}");
                std::process::exit(EXIT_RUNTIME_ERROR);
            }
        }
    }

    let stats = vm.gc_stats();
    println!(
        "gc: {} collections, {} objects freed, {} live",
        stats.collections, stats.objects_freed, stats.live_objects
    );
}

fn boot(vm: &mut Vm, options: &WorldOptions) -> Result<(), WorldError> {
    world::load_demo(vm)?;
    if let Some(path) = &options.script {
        let source = read_file(path);
        if let Err(error) = vm.interpret(&source) {
            let code = report_interpret_error(path, &source, &error);
            std::process::exit(code);
        }
    }
    Ok(())
}
