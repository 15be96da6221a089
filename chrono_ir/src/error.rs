use thiserror::Error;

/// Compile-time IR errors (§7 "Compile errors") — distinct from parse
/// errors, which belong to the out-of-scope parser.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("unknown constant name '{0}'")]
    UnknownConstant(String),

    #[error("global variable '{0}' redefined")]
    GlobalRedefined(String),

    #[error("global variable '{0}' has a non-constant initializer")]
    NonConstantGlobalInit(String),

    #[error("variable '{0}' already declared in this scope")]
    DuplicateVariable(String),

    #[error("'break' used outside a loop or switch")]
    BreakOutsideLoop,

    #[error("'continue' used outside a loop")]
    ContinueOutsideLoop,

    #[error("read from block {0} before it was sealed and no definition was found")]
    UnsealedRead(u32),
}

pub type Result<T> = std::result::Result<T, IrError>;
