//! Runtime errors.
//!
//! A runtime error aborts the current invocation only: the VM unwinds the
//! frames it pushed for that call, resets its stack and hands the error
//! back. The host decides whether to log it, report it to a builder, or
//! ignore it.

use std::fmt;

use grue_compiler::CompileError;

/// Category of a runtime error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuntimeErrorKind {
    /// Wrong number of arguments to a closure, class or native.
    ArityMismatch,
    UndefinedVariable,
    UndefinedProperty,
    /// Calling something that is not a function, class or method.
    NotCallable,
    /// Operand of the wrong type for an operator, property or field.
    OperandType,
    IndexOutOfBounds,
    /// Index or key of the wrong type.
    InvalidIndex,
    DivisionByZero,
    /// Call depth exceeded the configured frame limit.
    StackOverflow,
    /// A native function or method reported failure.
    Native,
    /// A byte that does not decode to an instruction.
    InvalidBytecode,
}

impl RuntimeErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeErrorKind::ArityMismatch => "arity mismatch",
            RuntimeErrorKind::UndefinedVariable => "undefined variable",
            RuntimeErrorKind::UndefinedProperty => "undefined property",
            RuntimeErrorKind::NotCallable => "not callable",
            RuntimeErrorKind::OperandType => "operand type",
            RuntimeErrorKind::IndexOutOfBounds => "index out of bounds",
            RuntimeErrorKind::InvalidIndex => "invalid index",
            RuntimeErrorKind::DivisionByZero => "division by zero",
            RuntimeErrorKind::StackOverflow => "stack overflow",
            RuntimeErrorKind::Native => "native failure",
            RuntimeErrorKind::InvalidBytecode => "invalid bytecode",
        }
    }
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One active call at the point of failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceFrame {
    /// Line of the instruction executing in this frame.
    pub line: u32,
    /// Function name, or `None` for top-level script code.
    pub function: Option<String>,
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.function {
            Some(name) => write!(f, "[line {}] in {name}()", self.line),
            None => write!(f, "[line {}] in script", self.line),
        }
    }
}

/// Call stack captured when a runtime error is raised, innermost first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackTrace {
    frames: Vec<TraceFrame>,
}

impl StackTrace {
    pub fn new(frames: Vec<TraceFrame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[TraceFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, frame) in self.frames.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{frame}")?;
        }
        Ok(())
    }
}

/// A script failed while running.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub message: String,
    pub trace: StackTrace,
}

impl RuntimeError {
    /// An error with no trace yet; the VM fills it in when it surfaces.
    pub fn new(kind: RuntimeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            trace: StackTrace::default(),
        }
    }

    #[must_use]
    pub fn with_trace(mut self, trace: StackTrace) -> Self {
        self.trace = trace;
        self
    }

    // ─── Factories ───

    pub fn arity(expected: usize, got: usize) -> Self {
        Self::new(
            RuntimeErrorKind::ArityMismatch,
            format!("Expected {expected} arguments but got {got}."),
        )
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::new(
            RuntimeErrorKind::UndefinedVariable,
            format!("Undefined variable '{name}'."),
        )
    }

    pub fn undefined_property(name: &str) -> Self {
        Self::new(
            RuntimeErrorKind::UndefinedProperty,
            format!("Undefined property '{name}'."),
        )
    }

    pub fn not_callable() -> Self {
        Self::new(
            RuntimeErrorKind::NotCallable,
            "Can only call functions and classes.",
        )
    }

    pub fn operand(message: impl Into<String>) -> Self {
        Self::new(RuntimeErrorKind::OperandType, message)
    }

    pub fn stack_overflow() -> Self {
        Self::new(RuntimeErrorKind::StackOverflow, "Stack overflow.")
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if !self.trace.is_empty() {
            write!(f, "\n{}", self.trace)?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

/// Failure reported by a native function. Surfaces to scripts as a
/// [`RuntimeError`] of kind [`RuntimeErrorKind::Native`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeError {
    pub message: String,
}

impl NativeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for NativeError {}

/// A script error raised inside a native's callback keeps its message; the
/// trace is rebuilt at the native's call site.
impl From<RuntimeError> for NativeError {
    fn from(error: RuntimeError) -> Self {
        NativeError::new(error.message)
    }
}

impl From<NativeError> for RuntimeError {
    fn from(error: NativeError) -> Self {
        RuntimeError::new(RuntimeErrorKind::Native, error.message)
    }
}

/// Outcome of compiling and running source text.
#[derive(Debug, thiserror::Error)]
pub enum InterpretError {
    #[error("{0}")]
    Compile(#[from] CompileError),
    #[error("{0}")]
    Runtime(#[from] RuntimeError),
}

impl InterpretError {
    pub fn as_runtime(&self) -> Option<&RuntimeError> {
        match self {
            InterpretError::Runtime(error) => Some(error),
            InterpretError::Compile(_) => None,
        }
    }

    pub fn as_compile(&self) -> Option<&CompileError> {
        match self {
            InterpretError::Compile(error) => Some(error),
            InterpretError::Runtime(_) => None,
        }
    }
}
