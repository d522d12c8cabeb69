//! VM configuration and the builder that assembles a [`Vm`].

use grue_core::GcConfig;

use crate::host::Host;
use crate::print_handler::{stdout_handler, SharedPrintHandler};
use crate::vm::Vm;

/// Default call-depth limit.
pub const FRAMES_MAX: usize = 64;

/// Runtime limits and collector settings.
#[derive(Clone, Debug)]
pub struct VmConfig {
    /// Maximum number of active call frames, nested host calls included.
    pub frames_max: usize,
    pub gc: GcConfig,
    /// Register `clock`, `str`, `type`, `list`, `table`, `gc` and the
    /// collection methods.
    pub builtins: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            frames_max: FRAMES_MAX,
            gc: GcConfig::default(),
            builtins: true,
        }
    }
}

/// Builder for [`Vm`] instances.
///
/// ```ignore
/// let vm = Vm::builder()
///     .print_handler(buffer_handler())
///     .stress_gc(true)
///     .build();
/// ```
#[derive(Default)]
pub struct VmBuilder {
    config: VmConfig,
    print_handler: Option<SharedPrintHandler>,
    host: Option<Box<dyn Host>>,
}

impl VmBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: VmConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn frames_max(mut self, frames: usize) -> Self {
        self.config.frames_max = frames;
        self
    }

    #[must_use]
    pub fn gc(mut self, gc: GcConfig) -> Self {
        self.config.gc = gc;
        self
    }

    /// Collect on every allocation.
    #[must_use]
    pub fn stress_gc(mut self, stress: bool) -> Self {
        self.config.gc.stress = stress;
        self
    }

    /// Skip the builtin natives, leaving an empty global namespace.
    #[must_use]
    pub fn without_builtins(mut self) -> Self {
        self.config.builtins = false;
        self
    }

    /// Where `print` output goes. Defaults to stdout.
    #[must_use]
    pub fn print_handler(mut self, handler: SharedPrintHandler) -> Self {
        self.print_handler = Some(handler);
        self
    }

    /// Install the host root hook up front.
    #[must_use]
    pub fn host(mut self, host: Box<dyn Host>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn build(self) -> Vm {
        let print = self.print_handler.unwrap_or_else(stdout_handler);
        let mut vm = Vm::with_parts(self.config, print, self.host);
        if vm.config().builtins {
            crate::natives::register_builtins(&mut vm);
        }
        vm
    }
}
