//! Destinations for the `print` statement.
//!
//! A MUD host rarely wants scripts writing to the server's stdout. The
//! handler lets it capture output (tests, a builder's preview pane),
//! forward it to the log, or drop it.

use std::sync::Arc;

use parking_lot::Mutex;

/// Captures printed lines in memory.
#[derive(Default)]
pub struct BufferedOutput {
    buffer: Mutex<String>,
}

impl BufferedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn println(&self, text: &str) {
        let mut buf = self.buffer.lock();
        buf.push_str(text);
        buf.push('\n');
    }

    pub fn contents(&self) -> String {
        self.buffer.lock().clone()
    }

    /// Takes the captured text, leaving the buffer empty.
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.buffer.lock())
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

/// Where script output goes.
pub enum PrintHandler {
    /// Writes each line to stdout.
    Stdout,
    /// Captures into a buffer the host drains.
    Buffer(BufferedOutput),
    /// Emits each line as an `info` event on the `grue::script` target.
    Log,
    /// Discards output.
    Silent,
}

impl PrintHandler {
    pub fn println(&self, text: &str) {
        match self {
            Self::Stdout => println!("{text}"),
            Self::Buffer(buf) => buf.println(text),
            Self::Log => tracing::info!(target: "grue::script", "{text}"),
            Self::Silent => {}
        }
    }

    /// Captured output so far. Empty for handlers that don't capture.
    pub fn output(&self) -> String {
        match self {
            Self::Buffer(buf) => buf.contents(),
            Self::Stdout | Self::Log | Self::Silent => String::new(),
        }
    }

    /// Drains captured output.
    pub fn take_output(&self) -> String {
        match self {
            Self::Buffer(buf) => buf.take(),
            Self::Stdout | Self::Log | Self::Silent => String::new(),
        }
    }

    pub fn clear(&self) {
        if let Self::Buffer(buf) = self {
            buf.clear();
        }
    }
}

/// Print handler shared between the VM and its host.
pub type SharedPrintHandler = Arc<PrintHandler>;

pub fn stdout_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Stdout)
}

pub fn buffer_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Buffer(BufferedOutput::new()))
}

pub fn log_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Log)
}

pub fn silent_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Silent)
}
