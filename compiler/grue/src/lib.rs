//! Grue - command-line driver for the entity scripting runtime.
//!
//! The binary runs script files, hosts a REPL, dumps bytecode, and boots a
//! small demonstration world so the host boundary (root hook, entities,
//! native fields, vnum registries) can be exercised from the command line.
//!
//! ```text
//! source ──► grue_lexer ──► grue_compiler ──► Function
//!                                                │
//!                                                ▼
//!                                  grue_vm::Vm ◄── world::World (Host)
//! ```

pub mod commands;
pub mod world;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call more than once. Enable with `RUST_LOG=grue_vm=debug`, or
/// `RUST_LOG=grue_vm=trace` for per-instruction disassembly.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr),
                )
                .with(filter)
                .init();
        }
    });
}
