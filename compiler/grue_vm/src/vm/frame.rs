//! Call frames.

use grue_core::ObjRef;

/// One active function invocation.
#[derive(Clone, Copy, Debug)]
pub struct CallFrame {
    /// The closure being run. Rooting it roots the function and upvalues.
    pub closure: ObjRef,
    /// `closure`'s function, cached to skip one heap lookup per byte.
    pub function: ObjRef,
    /// Offset of the next byte to execute.
    pub ip: usize,
    /// Stack slot of the callee; locals start here, slot 0 holds the
    /// receiver for methods.
    pub base: usize,
}

impl CallFrame {
    pub fn new(closure: ObjRef, function: ObjRef, base: usize) -> Self {
        Self {
            closure,
            function,
            ip: 0,
            base,
        }
    }
}
