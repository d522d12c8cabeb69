//! Grue CLI
//!
//! Runs scripts, hosts a REPL, dumps bytecode and boots the demo world.

use grue::commands::{disassemble_file, run_file, run_repl, run_world, RunOptions, WorldOptions};

fn main() {
    grue::init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let command = &args[1];

    match command.as_str() {
        "run" => {
            let options = RunOptions::from_args(&args[2..]);
            let Some(path) = args.iter().skip(2).find(|a| !a.starts_with('-')) else {
                eprintln!("error: missing file path");
                eprintln!("Usage: grue run <file.grue> [--stress-gc]");
                std::process::exit(1);
            };
            run_file(path, options);
        }
        "repl" => {
            run_repl(RunOptions::from_args(&args[2..]));
        }
        "disasm" => {
            if args.len() < 3 {
                eprintln!("Usage: grue disasm <file.grue>");
                std::process::exit(1);
            }
            disassemble_file(&args[2]);
        }
        "world" => match WorldOptions::from_args(&args[2..]) {
            Ok(options) => run_world(&options),
            Err(msg) => {
                eprintln!("error: {msg}");
                eprintln!("Usage: grue world [script.grue] [--ticks=N] [--stress-gc]");
                std::process::exit(1);
            }
        },
        "help" | "--help" | "-h" => {
            print_usage();
        }
        "version" | "--version" | "-v" => {
            println!("Grue {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            // If it looks like a script, run it
            if std::path::Path::new(command)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("grue"))
            {
                run_file(command, RunOptions::from_args(&args[2..]));
            } else {
                eprintln!("Unknown command: {command}");
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }
}

fn print_usage() {
    println!("Grue - entity scripting runtime");
    println!();
    println!("Usage: grue <command> [options]");
    println!();
    println!("Commands:");
    println!("  run <file.grue>      Compile and run a script");
    println!("  repl                 Read and run one line at a time");
    println!("  disasm <file.grue>   Print the bytecode of a script");
    println!("  world [file.grue]    Boot the demo world, run a script in it, and tick");
    println!("  help                 Show this help message");
    println!("  version              Show version information");
    println!();
    println!("Options:");
    println!("  --stress-gc          Collect before every allocation");
    println!("  --ticks=<n>          World ticks to run (default: 5)");
    println!();
    println!("Examples:");
    println!("  grue run hello.grue");
    println!("  grue hello.grue                 # Same as run");
    println!("  grue run hello.grue --stress-gc");
    println!("  grue world --ticks=3");
    println!("  RUST_LOG=grue_vm=debug grue run hello.grue");
}
