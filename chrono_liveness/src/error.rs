use thiserror::Error;

/// Liveness-analysis errors. All of these indicate a malformed function
/// handed in by an earlier pipeline stage (§8 structural invariants), not a
/// condition ChronoScript source text can trigger.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LivenessError {
    #[error("function was not finalized (call chrono_ssa::finalize first)")]
    NotFinalized,
}

pub type Result<T> = std::result::Result<T, LivenessError>;
