use thiserror::Error;

/// Runtime errors raised while dispatching or executing a builtin (§7
/// "runtime errors", §4.7).
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum BuiltinError {
    #[error("no builtin function at index {0}")]
    UnknownBuiltin(u32),

    #[error("no method at index {0}")]
    UnknownMethod(u32),

    #[error("'{name}' expects {expected} argument(s), got {actual}")]
    ArityMismatch { name: &'static str, expected: usize, actual: usize },

    #[error("unknown property '{0}' on this handle")]
    UnknownProperty(String),

    #[error(transparent)]
    Value(#[from] chrono_values::ValueError),

    #[error(transparent)]
    Heap(#[from] chrono_heap::HeapError),
}

pub type Result<T> = std::result::Result<T, BuiltinError>;
