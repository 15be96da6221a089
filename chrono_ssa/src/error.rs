use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SsaError {
    #[error(transparent)]
    Ir(#[from] chrono_ir::IrError),

    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    /// §4.7/§4.6: method names resolve against the registry immediately,
    /// since (unlike a free `Call`) there is no cross-module ambiguity to
    /// defer to the linker.
    #[error("no method named '{0}'")]
    UnknownMethod(String),
}

pub type Result<T> = std::result::Result<T, SsaError>;
