use thiserror::Error;

/// Runtime errors for container access (§4.8 "Container get/set").
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum HeapError {
    #[error("object key must be a string")]
    NonStringObjectKey,

    #[error("object has no member named '{0}'")]
    MissingMember(String),

    #[error("list index {index} out of range (length {length})")]
    IndexOutOfRange { index: i64, length: usize },

    #[error("list index must be a non-negative integer")]
    InvalidListIndex,

    #[error("'get' is not defined on {0}")]
    NotIndexable(&'static str),

    #[error("writing to read-only property '{0}'")]
    ReadOnlyProperty(String),
}

pub type Result<T> = std::result::Result<T, HeapError>;
