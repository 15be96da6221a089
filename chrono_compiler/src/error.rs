use thiserror::Error;

/// Fatal compilation errors (§7 "Compile errors"/"Parse errors"): these
/// abort the compile for the module that raised them and produce no module.
/// Unlike link warnings (§4.6 step 5), which are logged but not fatal, these
/// stop the whole `import` recursion.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompilerError {
    #[error(transparent)]
    Ssa(#[from] chrono_ssa::SsaError),

    #[error("module not found: '{0}'")]
    UnknownModule(String),

    #[error("duplicate function '{0}' declared in module '{1}'")]
    DuplicateFunction(String, String),

    #[error("no function named '{0}' in module '{1}'")]
    UnknownEntryFunction(String, String),
}

pub type Result<T> = std::result::Result<T, CompilerError>;
