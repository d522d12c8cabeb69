//! Stack growth for deep recursion.
//!
//! The script compiler is a recursive-descent parser: every nested
//! parenthesis, block, or function literal costs one or more native frames.
//! The VM recurses on the native stack too, when a host native calls back
//! into a script closure. Area builders write generated scripts, so nesting
//! depth is not bounded by what a human would type.
//!
//! Wrap any recursive entry point with [`ensure_sufficient_stack`]:
//!
//! ```text
//! fn expression(&mut self) {
//!     ensure_sufficient_stack(|| self.parse_precedence(Precedence::Assignment));
//! }
//! ```
//!
//! On WASM the call is a passthrough.

/// Remaining stack below which a new segment is allocated (64KB).
const RED_ZONE: usize = 64 * 1024;

/// Size of each freshly allocated stack segment (1MB).
const SEGMENT_SIZE: usize = 1024 * 1024;

/// Run `f`, growing the native stack first if fewer than [`RED_ZONE`] bytes
/// remain.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests;
