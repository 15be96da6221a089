//! C4 + C11: on-the-fly SSA construction (Braun et al.), scope discipline,
//! the control-flow helpers the parser drives, constant folding, and the
//! dead-code/phi-copy finalization pass that prepares a function for
//! liveness analysis (§4.1).

pub mod builder;
pub mod error;
pub mod finalize;

pub use builder::SsaBuilder;
pub use error::{Result, SsaError};
pub use finalize::finalize;
