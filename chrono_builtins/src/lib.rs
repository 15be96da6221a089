//! C10: the builtins registry — two sorted name tables (free functions and
//! methods) resolved to a stable index at SSA-build time and dispatched by
//! that index at runtime (§4.6 step 5, §4.7).

mod builtins;
mod convert;
mod error;
mod host;
mod methods;
mod registry;

pub use error::{BuiltinError, Result};
pub use host::Host;
pub use registry::{call_builtin, call_method, lookup_builtin, lookup_method, BuiltinFn};
