use thiserror::Error;

/// Runtime errors (§7 "Runtime errors"): raising any of these aborts the
/// current frame and unwinds out of `run_function`, per §4.5/§5 — there is
/// no exception mechanism, only `Result` propagation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    #[error(transparent)]
    Value(#[from] chrono_values::ValueError),

    #[error(transparent)]
    Heap(#[from] chrono_heap::HeapError),

    #[error(transparent)]
    Builtin(#[from] chrono_builtins::BuiltinError),

    /// Invoking a `Call` whose target never resolved during linking (§4.6
    /// "link warnings... not fatal; invoking the unresolved call at runtime
    /// is a runtime error").
    #[error("call to unresolved function '{0}'")]
    UnresolvedCall(String),

    #[error("no function named '{0}' in this program")]
    UnknownFunction(String),

    #[error("jump target {0} is out of range")]
    InvalidJumpTarget(u16),

    /// Guards against runaway recursion in a script; not named by the spec
    /// but required since the interpreter is a plain recursive descent over
    /// frames with no trampoline (§5).
    #[error("call stack depth exceeded {0} frames")]
    StackOverflow(usize),
}

pub type Result<T> = std::result::Result<T, VmError>;
